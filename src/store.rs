use crate::config::{require_env, ENV_STORE_PATH};
use crate::errors::{AppError, AppResult};
use crate::models::{BlockType, RecordFilter, RecordPatch, TaskRecord};
use rusqlite::{params, Connection, ToSql};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS task_records (
  record_id TEXT PRIMARY KEY,
  block_id TEXT,
  task_date TEXT NOT NULL,
  block_type TEXT NOT NULL,
  checked INTEGER,
  content_text TEXT,
  last_edited_time TEXT NOT NULL,
  parent_ref TEXT NOT NULL,
  checkbox_object_name TEXT,
  content_object_name TEXT,
  label_object_name TEXT
);
CREATE INDEX IF NOT EXISTS idx_task_records_date ON task_records (task_date);
";

const RECORD_COLUMNS: &str = "record_id, block_id, task_date, block_type, checked, content_text, last_edited_time, parent_ref, checkbox_object_name, content_object_name, label_object_name";

/// Document-style CRUD façade over the widget's SQLite mirror. Exclusively
/// owns persisted task records.
#[derive(Debug)]
pub struct TaskStore {
    conn: Mutex<Connection>,
}

impl TaskStore {
    pub fn open_from_env() -> AppResult<Self> {
        let path = require_env(ENV_STORE_PATH)?;
        Self::open(Path::new(&path))
    }

    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| AppError::Store(error.to_string()))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Store("store mutex poisoned".to_string()))
    }

    /// Returns matching records in insertion order.
    pub fn find(&self, filter: &RecordFilter) -> AppResult<Vec<TaskRecord>> {
        let conn = self.lock()?;
        let mut query = format!("SELECT {RECORD_COLUMNS} FROM task_records WHERE 1 = 1");
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();
        apply_filter(filter, &mut query, &mut params_vec);
        query.push_str(" ORDER BY rowid ASC");

        let mut statement = conn.prepare(&query)?;
        let dyn_params: Vec<&dyn ToSql> = params_vec.iter().map(|param| param.as_ref()).collect();
        let rows = statement.query_map(rusqlite::params_from_iter(dyn_params), parse_record_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Appends records and returns their generated ids. Never upserts;
    /// callers that want replacement semantics delete first.
    pub fn insert(&self, records: &[TaskRecord]) -> AppResult<Vec<String>> {
        let conn = self.lock()?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let record_id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO task_records (record_id, block_id, task_date, block_type, checked, content_text, last_edited_time, parent_ref, checkbox_object_name, content_object_name, label_object_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record_id,
                    record.block_id,
                    record.task_date,
                    record.block_type.as_str(),
                    record.checked,
                    record.content_text,
                    record.last_edited_time,
                    serde_json::to_string(&record.parent_ref)?,
                    record.checkbox_object_name,
                    record.content_object_name,
                    record.label_object_name,
                ],
            )?;
            ids.push(record_id);
        }
        Ok(ids)
    }

    /// Merges only the fields named by the patch into every matching record.
    pub fn update(&self, filter: &RecordFilter, patch: &RecordPatch) -> AppResult<usize> {
        let mut set_clauses: Vec<&str> = Vec::new();
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(checked) = patch.checked {
            set_clauses.push("checked = ?");
            params_vec.push(Box::new(checked));
        }
        if let Some(content_text) = &patch.content_text {
            set_clauses.push("content_text = ?");
            params_vec.push(Box::new(content_text.clone()));
        }
        if let Some(last_edited_time) = &patch.last_edited_time {
            set_clauses.push("last_edited_time = ?");
            params_vec.push(Box::new(last_edited_time.clone()));
        }
        if set_clauses.is_empty() {
            return Ok(0);
        }

        let mut query = format!(
            "UPDATE task_records SET {} WHERE 1 = 1",
            set_clauses.join(", ")
        );
        apply_filter(filter, &mut query, &mut params_vec);

        let conn = self.lock()?;
        let dyn_params: Vec<&dyn ToSql> = params_vec.iter().map(|param| param.as_ref()).collect();
        let changed = conn.execute(&query, rusqlite::params_from_iter(dyn_params))?;
        Ok(changed)
    }

    pub fn delete(&self, filter: &RecordFilter) -> AppResult<usize> {
        let mut query = "DELETE FROM task_records WHERE 1 = 1".to_string();
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();
        apply_filter(filter, &mut query, &mut params_vec);

        let conn = self.lock()?;
        let dyn_params: Vec<&dyn ToSql> = params_vec.iter().map(|param| param.as_ref()).collect();
        let deleted = conn.execute(&query, rusqlite::params_from_iter(dyn_params))?;
        Ok(deleted)
    }
}

fn apply_filter(filter: &RecordFilter, query: &mut String, params_vec: &mut Vec<Box<dyn ToSql>>) {
    if let Some(task_date) = filter.task_date {
        query.push_str(" AND task_date = ?");
        params_vec.push(Box::new(task_date));
    }
    if let Some(block_type) = &filter.block_type {
        query.push_str(" AND block_type = ?");
        params_vec.push(Box::new(block_type.as_str().to_string()));
    }
    if let Some((element, value)) = &filter.object_name {
        query.push_str(&format!(" AND {} = ?", element.column()));
        params_vec.push(Box::new(value.clone()));
    }
}

fn parse_record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRecord> {
    Ok(TaskRecord {
        record_id: Some(row.get(0)?),
        block_id: row.get(1)?,
        task_date: row.get(2)?,
        block_type: BlockType::parse(&row.get::<_, String>(3)?),
        checked: row.get(4)?,
        content_text: row.get(5)?,
        last_edited_time: row.get(6)?,
        parent_ref: serde_json::from_str(&row.get::<_, String>(7)?).unwrap_or(Value::Null),
        checkbox_object_name: row.get(8)?,
        content_object_name: row.get(9)?,
        label_object_name: row.get(10)?,
    })
}
