use crate::models::{BlockType, ContentBlock, DatabaseEntry, RichTextRun, TaskRecord};

/// Flattens one date's remote entry and its child blocks into local task
/// records. Pure; the entry's date and edit time are stamped onto every
/// record, and correlation handles are assigned by block ordinal.
pub fn remote_to_records(entry: &DatabaseEntry, blocks: &[ContentBlock]) -> Vec<TaskRecord> {
    blocks
        .iter()
        .enumerate()
        .map(|(ordinal, block)| {
            let recognized = !matches!(block.block_type, BlockType::Other(_));
            let mut record = TaskRecord {
                record_id: None,
                block_id: block.block_id.clone(),
                task_date: entry.task_date,
                last_edited_time: entry.last_edited_time.clone(),
                parent_ref: block.parent_ref.clone(),
                block_type: block.block_type.clone(),
                checked: match block.block_type {
                    BlockType::ToDo => Some(block.checked.unwrap_or(false)),
                    _ => None,
                },
                // Unrecognized kinds keep only the common fields.
                content_text: if recognized {
                    block
                        .rich_text
                        .first()
                        .and_then(|run| run.plain_text.clone())
                } else {
                    None
                },
                checkbox_object_name: None,
                content_object_name: None,
                label_object_name: None,
            };
            record.assign_handles(ordinal);
            record
        })
        .collect()
}

/// Inverse direction for pushes: wraps the record's text into a single-run
/// rich-text sequence; `checked` (default false) only for to-dos.
pub fn record_to_block(record: &TaskRecord) -> ContentBlock {
    ContentBlock {
        block_id: record.block_id.clone(),
        parent_ref: record.parent_ref.clone(),
        block_type: record.block_type.clone(),
        rich_text: record
            .content_text
            .as_ref()
            .map(|text| {
                vec![RichTextRun {
                    plain_text: Some(text.clone()),
                }]
            })
            .unwrap_or_default(),
        checked: match record.block_type {
            BlockType::ToDo => Some(record.checked.unwrap_or(false)),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{record_to_block, remote_to_records};
    use crate::models::{BlockType, ContentBlock, DatabaseEntry, RichTextRun};
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use std::collections::HashSet;

    fn entry(task_date: NaiveDate) -> DatabaseEntry {
        DatabaseEntry {
            task_date,
            page_id: "p1".to_string(),
            last_edited_time: "2024-01-10 10:30:00".to_string(),
            icon: Value::Null,
            parent_ref: json!({ "type": "database_id", "database_id": "db-1" }),
            properties: Value::Null,
        }
    }

    fn block(block_type: BlockType, text: Option<&str>) -> ContentBlock {
        ContentBlock {
            block_id: Some("b1".to_string()),
            parent_ref: json!({ "type": "page_id", "page_id": "p1" }),
            block_type: block_type.clone(),
            rich_text: text
                .map(|value| {
                    vec![RichTextRun {
                        plain_text: Some(value.to_string()),
                    }]
                })
                .unwrap_or_default(),
            checked: match block_type {
                BlockType::ToDo => Some(false),
                _ => None,
            },
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn entry_date_is_stamped_onto_every_record() {
        let day = date(2024, 1, 10);
        let blocks = vec![
            block(BlockType::ToDo, Some("buy milk")),
            block(BlockType::Paragraph, Some("notes")),
            block(BlockType::BulletedListItem, Some("point")),
        ];

        let records = remote_to_records(&entry(day), &blocks);
        assert_eq!(records.len(), 3);
        for record in &records {
            assert_eq!(record.task_date, day);
            assert_eq!(record.last_edited_time, "2024-01-10 10:30:00");
        }
    }

    #[test]
    fn round_trip_preserves_type_and_text() {
        let blocks = vec![block(BlockType::ToDo, Some("buy milk"))];
        let records = remote_to_records(&entry(date(2024, 1, 10)), &blocks);

        let pushed = record_to_block(&records[0]);
        assert_eq!(pushed.block_type, blocks[0].block_type);
        assert_eq!(
            pushed.rich_text[0].plain_text,
            blocks[0].rich_text[0].plain_text
        );
    }

    #[test]
    fn empty_rich_text_yields_absent_content() {
        let blocks = vec![block(BlockType::Paragraph, None)];
        let records = remote_to_records(&entry(date(2024, 1, 10)), &blocks);
        assert_eq!(records[0].content_text, None);

        let pushed = record_to_block(&records[0]);
        assert!(pushed.rich_text.is_empty());
    }

    #[test]
    fn only_todos_carry_a_checked_flag() {
        let blocks = vec![
            block(BlockType::ToDo, Some("task")),
            block(BlockType::Paragraph, Some("notes")),
            block(BlockType::BulletedListItem, Some("point")),
        ];
        let records = remote_to_records(&entry(date(2024, 1, 10)), &blocks);

        assert_eq!(records[0].checked, Some(false));
        assert_eq!(records[1].checked, None);
        assert_eq!(records[2].checked, None);
    }

    #[test]
    fn todo_with_missing_upstream_checked_defaults_to_false() {
        let mut todo = block(BlockType::ToDo, Some("task"));
        todo.checked = None;
        let records = remote_to_records(&entry(date(2024, 1, 10)), &[todo]);
        assert_eq!(records[0].checked, Some(false));
    }

    #[test]
    fn unrecognized_blocks_keep_only_common_fields() {
        let mut unknown = block(BlockType::Other("synced_block".to_string()), None);
        unknown.rich_text = vec![RichTextRun {
            plain_text: Some("hidden".to_string()),
        }];
        let records = remote_to_records(&entry(date(2024, 1, 10)), &[unknown]);

        let record = &records[0];
        assert_eq!(record.block_type, BlockType::Other("synced_block".to_string()));
        assert_eq!(record.content_text, None);
        assert_eq!(record.checked, None);
        assert!(record.handle_names().is_empty());
    }

    #[test]
    fn handles_are_unique_within_a_materialized_set() {
        let blocks = vec![
            block(BlockType::ToDo, Some("a")),
            block(BlockType::ToDo, Some("b")),
            block(BlockType::BulletedListItem, Some("c")),
            block(BlockType::Paragraph, Some("d")),
        ];
        let records = remote_to_records(&entry(date(2024, 1, 10)), &blocks);

        let mut seen = HashSet::new();
        for record in &records {
            for name in record.handle_names() {
                assert!(seen.insert(name.to_string()), "duplicate handle {name}");
            }
        }
        assert_eq!(records[0].checkbox_object_name.as_deref(), Some("0-to_do-checkbox"));
        assert_eq!(records[2].label_object_name.as_deref(), Some("2-bulleted_list-label"));
    }
}
