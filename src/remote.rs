use crate::config::{require_env, ENV_API_KEY, ENV_DATABASE_ID};
use crate::dates;
use crate::errors::{AppError, AppResult};
use crate::models::{BlockType, ContentBlock, DatabaseEntry, RichTextRun};
use chrono::NaiveDate;
use reqwest::blocking::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::time::Duration;

const NOTION_API_BASE_URL: &str = "https://api.notion.com/v1";
const NOTION_API_VERSION: &str = "2022-06-28";
// The tracked database keys every page by this date property.
const DATE_PROPERTY: &str = "Date";

/// Stateless boundary to the remote task database. `NotionClient` is the
/// production implementation; tests substitute scripted fakes.
pub trait RemoteApi: Send + Sync {
    /// Lists database entries, one per tracked date. A single page of
    /// results (100 entries); no auto-pagination.
    fn list_entries(&self) -> AppResult<Vec<DatabaseEntry>>;

    /// Lists a page's immediate child blocks, capped at 100.
    fn fetch_blocks(&self, page_id: &str) -> AppResult<Vec<ContentBlock>>;

    /// Appends blocks to a page and returns the raw transport status code.
    /// No retry; the caller decides what a non-success status means.
    fn append_blocks(&self, page_id: &str, blocks: &[ContentBlock]) -> AppResult<u16>;
}

#[derive(Debug)]
pub struct NotionClient {
    client: Client,
    api_key: String,
    database_id: String,
}

impl NotionClient {
    pub fn from_env() -> AppResult<Self> {
        let api_key = require_env(ENV_API_KEY)?;
        let database_id = require_env(ENV_DATABASE_ID)?;
        Self::new(api_key, database_id)
    }

    pub fn new(api_key: String, database_id: String) -> AppResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(50)).build()?;
        Ok(Self {
            client,
            api_key,
            database_id,
        })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Notion-Version", NOTION_API_VERSION)
            .header("Content-Type", "application/json")
    }

    fn results(&self, response: reqwest::blocking::Response, endpoint: &str) -> AppResult<Vec<Value>> {
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(AppError::Transport(format!(
                "Notion {endpoint} API {}: {body}",
                status.as_u16()
            )));
        }
        let value: Value = serde_json::from_str(&body)?;
        // has_more / next_cursor are present in the reply but unconsumed.
        Ok(value
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

impl RemoteApi for NotionClient {
    fn list_entries(&self) -> AppResult<Vec<DatabaseEntry>> {
        let url = format!("{NOTION_API_BASE_URL}/databases/{}/query", self.database_id);
        let response = self.authed(self.client.post(url)).send()?;
        let results = self.results(response, "query")?;

        let mut entries = Vec::with_capacity(results.len());
        for raw in &results {
            match parse_entry(raw) {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    tracing::warn!(error = %error, "skipping malformed database entry");
                }
            }
        }
        Ok(entries)
    }

    fn fetch_blocks(&self, page_id: &str) -> AppResult<Vec<ContentBlock>> {
        let url = format!("{NOTION_API_BASE_URL}/blocks/{page_id}/children");
        let response = self.authed(self.client.get(url)).send()?;
        let results = self.results(response, "block children")?;

        let mut blocks = Vec::with_capacity(results.len());
        for raw in &results {
            match parse_block(raw) {
                Ok(block) => blocks.push(block),
                Err(error) => {
                    tracing::warn!(page_id = %page_id, error = %error, "skipping malformed content block");
                }
            }
        }
        Ok(blocks)
    }

    fn append_blocks(&self, page_id: &str, blocks: &[ContentBlock]) -> AppResult<u16> {
        let url = format!("{NOTION_API_BASE_URL}/blocks/{page_id}/children");
        let children: Vec<Value> = blocks.iter().map(block_to_json).collect();
        let response = self
            .authed(self.client.patch(url))
            .json(&json!({ "children": children }))
            .send()?;
        Ok(response.status().as_u16())
    }
}

pub(crate) fn parse_entry(value: &Value) -> AppResult<DatabaseEntry> {
    let page_id = value
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Parse("database entry missing id".to_string()))?;

    let date_raw = value
        .pointer(&format!("/properties/{DATE_PROPERTY}/date/start"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            AppError::Parse(format!("entry {page_id} missing {DATE_PROPERTY} property"))
        })?;
    // The date property may carry a full datetime; the calendar day is the key.
    let date_prefix = date_raw.get(..10).unwrap_or(date_raw);
    let task_date = NaiveDate::parse_from_str(date_prefix, dates::DATE_FORMAT)
        .map_err(|error| AppError::Parse(format!("entry {page_id} has invalid date: {error}")))?;

    let last_edited = value
        .get("last_edited_time")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Parse(format!("entry {page_id} missing last_edited_time")))?;

    Ok(DatabaseEntry {
        task_date,
        page_id: page_id.to_string(),
        last_edited_time: dates::format_remote_timestamp(last_edited),
        icon: value.get("icon").cloned().unwrap_or(Value::Null),
        parent_ref: value.get("parent").cloned().unwrap_or(Value::Null),
        properties: value.get("properties").cloned().unwrap_or(Value::Null),
    })
}

pub(crate) fn parse_block(value: &Value) -> AppResult<ContentBlock> {
    let block_id = value
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Parse("content block missing id".to_string()))?;
    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Parse(format!("block {block_id} missing type")))?;

    let block_type = BlockType::parse(tag);
    let payload = value.get(tag).cloned().unwrap_or_else(|| json!({}));

    let rich_text = payload
        .get("rich_text")
        .and_then(Value::as_array)
        .map(|runs| {
            runs.iter()
                .map(|run| RichTextRun {
                    plain_text: run.get("plain_text").and_then(Value::as_str).map(str::to_string),
                })
                .collect()
        })
        .unwrap_or_default();

    let checked = match block_type {
        BlockType::ToDo => Some(payload.get("checked").and_then(Value::as_bool).unwrap_or(false)),
        _ => None,
    };

    Ok(ContentBlock {
        block_id: Some(block_id.to_string()),
        parent_ref: value.get("parent").cloned().unwrap_or(Value::Null),
        block_type,
        rich_text,
        checked,
    })
}

pub(crate) fn block_to_json(block: &ContentBlock) -> Value {
    let rich_text: Vec<Value> = block
        .rich_text
        .iter()
        .filter_map(|run| run.plain_text.as_deref())
        .map(|text| json!({ "type": "text", "text": { "content": text, "link": null } }))
        .collect();

    let mut payload = serde_json::Map::new();
    payload.insert("rich_text".to_string(), Value::Array(rich_text));
    if matches!(block.block_type, BlockType::ToDo) {
        payload.insert("checked".to_string(), json!(block.checked.unwrap_or(false)));
    }

    let tag = block.block_type.as_str().to_string();
    let mut root = serde_json::Map::new();
    root.insert("object".to_string(), json!("block"));
    root.insert("type".to_string(), Value::String(tag.clone()));
    root.insert(tag, Value::Object(payload));
    Value::Object(root)
}

#[cfg(test)]
mod tests {
    use super::{block_to_json, parse_block, parse_entry, NotionClient};
    use crate::errors::AppError;
    use crate::models::{BlockType, ContentBlock, RichTextRun};
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    #[test]
    fn entry_fixture_parses_with_widget_local_timestamp() {
        let fixture = json!({
            "id": "page-1",
            "last_edited_time": "2024-01-10T02:30:00.000Z",
            "icon": { "type": "emoji", "emoji": "✅" },
            "parent": { "type": "database_id", "database_id": "db-1" },
            "properties": { "Date": { "date": { "start": "2024-01-10" } } }
        });

        let entry = parse_entry(&fixture).expect("parse entry");
        assert_eq!(
            entry.task_date,
            NaiveDate::from_ymd_opt(2024, 1, 10).expect("valid date")
        );
        assert_eq!(entry.page_id, "page-1");
        assert_eq!(entry.last_edited_time, "2024-01-10 10:30:00");
        assert_eq!(entry.properties["Date"]["date"]["start"], "2024-01-10");
    }

    #[test]
    fn entry_without_date_property_is_rejected() {
        let fixture = json!({
            "id": "page-2",
            "last_edited_time": "2024-01-10T02:30:00.000Z",
            "properties": { "Name": { "title": [] } }
        });

        let error = parse_entry(&fixture).expect_err("missing date property");
        assert!(matches!(error, AppError::Parse(_)));
    }

    #[test]
    fn todo_block_defaults_checked_to_false() {
        let fixture = json!({
            "id": "block-1",
            "type": "to_do",
            "parent": { "type": "page_id", "page_id": "page-1" },
            "to_do": { "rich_text": [{ "plain_text": "buy milk" }] }
        });

        let block = parse_block(&fixture).expect("parse block");
        assert_eq!(block.block_type, BlockType::ToDo);
        assert_eq!(block.checked, Some(false));
        assert_eq!(block.rich_text[0].plain_text.as_deref(), Some("buy milk"));
    }

    #[test]
    fn non_todo_block_carries_no_checked_flag() {
        let fixture = json!({
            "id": "block-2",
            "type": "paragraph",
            "paragraph": { "rich_text": [{ "plain_text": "notes" }] }
        });

        let block = parse_block(&fixture).expect("parse block");
        assert_eq!(block.checked, None);
    }

    #[test]
    fn unknown_block_type_passes_through() {
        let fixture = json!({
            "id": "block-3",
            "type": "synced_block",
            "synced_block": {}
        });

        let block = parse_block(&fixture).expect("parse block");
        assert_eq!(block.block_type, BlockType::Other("synced_block".to_string()));
        assert!(block.rich_text.is_empty());
        assert_eq!(block.checked, None);
    }

    #[test]
    fn todo_block_serializes_to_expected_wire_shape() {
        let block = ContentBlock {
            block_id: None,
            parent_ref: Value::Null,
            block_type: BlockType::ToDo,
            rich_text: vec![RichTextRun {
                plain_text: Some("buy milk".to_string()),
            }],
            checked: Some(false),
        };

        assert_eq!(
            block_to_json(&block),
            json!({
                "object": "block",
                "type": "to_do",
                "to_do": {
                    "rich_text": [
                        { "type": "text", "text": { "content": "buy milk", "link": null } }
                    ],
                    "checked": false
                }
            })
        );
    }

    #[test]
    fn passthrough_block_serializes_with_empty_rich_text() {
        let block = ContentBlock {
            block_id: None,
            parent_ref: Value::Null,
            block_type: BlockType::Other("divider".to_string()),
            rich_text: Vec::new(),
            checked: None,
        };

        assert_eq!(
            block_to_json(&block),
            json!({ "object": "block", "type": "divider", "divider": { "rich_text": [] } })
        );
    }

    #[test]
    fn client_construction_requires_api_key() {
        std::env::remove_var("NOTION_API_KEY");
        let error = NotionClient::from_env().expect_err("api key is unset");
        assert!(matches!(error, AppError::Config(_)));
    }
}
