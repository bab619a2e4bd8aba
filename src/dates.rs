use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The widget displays all timestamps at a fixed +08:00 offset.
pub fn widget_offset() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).expect("valid utc+8 offset")
}

pub fn current_timestamp() -> String {
    Utc::now()
        .with_timezone(&widget_offset())
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Converts a remote RFC 3339 instant to widget-local display time. An
/// unparseable value is kept verbatim rather than dropped.
pub fn format_remote_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(instant) => instant
            .with_timezone(&widget_offset())
            .format(TIMESTAMP_FORMAT)
            .to_string(),
        Err(error) => {
            tracing::warn!(value = %raw, error = %error, "keeping unparseable remote timestamp");
            raw.to_string()
        }
    }
}

/// Current-date cursor backing the widget's previous/next-day buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateCursor {
    current: NaiveDate,
}

impl DateCursor {
    pub fn today() -> Self {
        Self {
            current: Utc::now().with_timezone(&widget_offset()).date_naive(),
        }
    }

    pub fn at(current: NaiveDate) -> Self {
        Self { current }
    }

    pub fn current(&self) -> NaiveDate {
        self.current
    }

    pub fn formatted(&self) -> String {
        self.current.format(DATE_FORMAT).to_string()
    }

    pub fn previous_day(&mut self) {
        self.current -= Duration::days(1);
    }

    pub fn next_day(&mut self) {
        self.current += Duration::days(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{format_remote_timestamp, DateCursor};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn cursor_steps_across_month_boundary() {
        let mut cursor = DateCursor::at(date(2024, 3, 1));
        cursor.previous_day();
        assert_eq!(cursor.formatted(), "2024-02-29");
        cursor.next_day();
        assert_eq!(cursor.current(), date(2024, 3, 1));
    }

    #[test]
    fn cursor_steps_across_year_boundary() {
        let mut cursor = DateCursor::at(date(2023, 12, 31));
        cursor.next_day();
        assert_eq!(cursor.formatted(), "2024-01-01");
    }

    #[test]
    fn remote_timestamp_is_shifted_to_widget_offset() {
        let formatted = format_remote_timestamp("2024-01-10T02:30:00.000Z");
        assert_eq!(formatted, "2024-01-10 10:30:00");
    }

    #[test]
    fn unparseable_timestamp_is_kept_verbatim() {
        assert_eq!(format_remote_timestamp("not-a-time"), "not-a-time");
    }
}
