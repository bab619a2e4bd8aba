use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Closed set of remote block kinds the widget understands. Anything else
/// round-trips through `Other` with only the common fields populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockType {
    ToDo,
    Paragraph,
    BulletedListItem,
    Other(String),
}

impl BlockType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ToDo => "to_do",
            Self::Paragraph => "paragraph",
            Self::BulletedListItem => "bulleted_list_item",
            Self::Other(tag) => tag,
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "to_do" => Self::ToDo,
            "paragraph" => Self::Paragraph,
            "bulleted_list_item" => Self::BulletedListItem,
            other => Self::Other(other.to_string()),
        }
    }

    // The widget's object names historically use the short bulleted tag.
    pub fn handle_tag(&self) -> &str {
        match self {
            Self::BulletedListItem => "bulleted_list",
            other => other.as_str(),
        }
    }

    pub fn handle_elements(&self) -> &'static [HandleElement] {
        match self {
            Self::ToDo => &[HandleElement::Checkbox, HandleElement::Content],
            Self::Paragraph => &[HandleElement::Content],
            Self::BulletedListItem => &[HandleElement::Label, HandleElement::Content],
            Self::Other(_) => &[],
        }
    }
}

impl Serialize for BlockType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BlockType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandleElement {
    Checkbox,
    Content,
    Label,
}

impl HandleElement {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checkbox => "checkbox",
            Self::Content => "content",
            Self::Label => "label",
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::Checkbox => "checkbox_object_name",
            Self::Content => "content_object_name",
            Self::Label => "label_object_name",
        }
    }
}

/// Structured correlation handle routing UI edit events back to one record.
/// Rendered as `{ordinal}-{handle_tag}-{element}`, e.g. `0-to_do-checkbox`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHandle {
    pub ordinal: usize,
    pub block_type: BlockType,
    pub element: HandleElement,
}

impl ObjectHandle {
    pub fn render(&self) -> String {
        format!(
            "{}-{}-{}",
            self.ordinal,
            self.block_type.handle_tag(),
            self.element.as_str()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseEntry {
    pub task_date: NaiveDate,
    pub page_id: String,
    pub last_edited_time: String,
    pub icon: Value,
    pub parent_ref: Value,
    pub properties: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichTextRun {
    pub plain_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    pub block_id: Option<String>,
    pub parent_ref: Value,
    pub block_type: BlockType,
    pub rich_text: Vec<RichTextRun>,
    pub checked: Option<bool>,
}

/// The local flattened representation of a block, the unit the UI edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub record_id: Option<String>,
    pub block_id: Option<String>,
    pub task_date: NaiveDate,
    pub last_edited_time: String,
    pub parent_ref: Value,
    pub block_type: BlockType,
    pub checked: Option<bool>,
    pub content_text: Option<String>,
    pub checkbox_object_name: Option<String>,
    pub content_object_name: Option<String>,
    pub label_object_name: Option<String>,
}

impl TaskRecord {
    /// Replaces any previous handle assignment with the ones this record's
    /// block kind carries.
    pub fn assign_handles(&mut self, ordinal: usize) {
        self.checkbox_object_name = None;
        self.content_object_name = None;
        self.label_object_name = None;
        for element in self.block_type.handle_elements() {
            let rendered = ObjectHandle {
                ordinal,
                block_type: self.block_type.clone(),
                element: *element,
            }
            .render();
            match element {
                HandleElement::Checkbox => self.checkbox_object_name = Some(rendered),
                HandleElement::Content => self.content_object_name = Some(rendered),
                HandleElement::Label => self.label_object_name = Some(rendered),
            }
        }
    }

    pub fn handle_names(&self) -> Vec<&str> {
        [
            &self.checkbox_object_name,
            &self.content_object_name,
            &self.label_object_name,
        ]
        .into_iter()
        .filter_map(|name| name.as_deref())
        .collect()
    }
}

/// Exact-match constraints ANDed together; an empty filter matches all rows.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub task_date: Option<NaiveDate>,
    pub block_type: Option<BlockType>,
    pub object_name: Option<(HandleElement, String)>,
}

impl RecordFilter {
    pub fn for_date(task_date: NaiveDate) -> Self {
        Self {
            task_date: Some(task_date),
            ..Self::default()
        }
    }
}

/// Field-level merge applied by `update`; only named fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    pub checked: Option<bool>,
    pub content_text: Option<String>,
    pub last_edited_time: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskSource {
    Remote,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedTasks {
    pub source: TaskSource,
    pub records: Vec<TaskRecord>,
}
