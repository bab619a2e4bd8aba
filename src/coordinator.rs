use crate::dates;
use crate::errors::{AppError, AppResult};
use crate::mapper;
use crate::models::{
    BlockType, ContentBlock, DatabaseEntry, HandleElement, LoadedTasks, ObjectHandle,
    RecordFilter, RecordPatch, TaskRecord, TaskSource,
};
use crate::remote::{NotionClient, RemoteApi};
use crate::store::TaskStore;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Which side owns the truth for a date right now. Remote wins only while
/// the local mirror has nothing for that date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    Remote,
    Local,
}

/// Orchestrates the store, the remote boundary and the mapper behind the
/// verbs the desktop UI consumes. One UI session drives one date at a time;
/// no internal mutual exclusion beyond the store's own connection lock.
pub struct SyncCoordinator {
    store: TaskStore,
    remote: Arc<dyn RemoteApi>,
}

impl SyncCoordinator {
    pub fn new(store: TaskStore, remote: Arc<dyn RemoteApi>) -> Self {
        Self { store, remote }
    }

    pub fn from_env() -> AppResult<Self> {
        let store = TaskStore::open_from_env()?;
        let remote = NotionClient::from_env()?;
        Ok(Self::new(store, Arc::new(remote)))
    }

    pub fn authority_for_date(&self, date: NaiveDate) -> AppResult<Authority> {
        let local = self.store.find(&RecordFilter::for_date(date))?;
        Ok(if local.is_empty() {
            Authority::Remote
        } else {
            Authority::Local
        })
    }

    /// Returns the date's record set, importing it from the remote database
    /// first when the local mirror has nothing for that date.
    pub fn load_for_date(&self, date: NaiveDate) -> AppResult<LoadedTasks> {
        let local = self.store.find(&RecordFilter::for_date(date))?;
        if !local.is_empty() {
            return Ok(LoadedTasks {
                source: TaskSource::Local,
                records: local,
            });
        }

        let entry = self.entry_for_date(date)?;
        let blocks = self.remote.fetch_blocks(&entry.page_id)?;
        self.store.insert(&mapper::remote_to_records(&entry, &blocks))?;

        let records = self.store.find(&RecordFilter::for_date(date))?;
        tracing::info!(date = %date, count = records.len(), "imported remote task set");
        Ok(LoadedTasks {
            source: TaskSource::Remote,
            records,
        })
    }

    /// Discards the date's local mirror so the next load re-imports from
    /// remote. Destructive of unsynced edits; the UI confirms before calling.
    pub fn resync_from_remote(&self, date: NaiveDate) -> AppResult<usize> {
        let deleted = self.store.delete(&RecordFilter::for_date(date))?;
        tracing::info!(date = %date, deleted, "cleared local records for remote resync");
        Ok(deleted)
    }

    /// Pushes the date's local records to the remote page in one append
    /// call. Append-only: nothing remote is diffed or deleted, so repeated
    /// pushes duplicate content remotely.
    pub fn push_to_remote(&self, date: NaiveDate) -> AppResult<u16> {
        let records = self.store.find(&RecordFilter::for_date(date))?;
        if records.is_empty() {
            return Err(AppError::DateNotFound(format!(
                "no local records to push for {date}"
            )));
        }

        let page_id = self.page_id_for(date, &records)?;
        let blocks: Vec<ContentBlock> = records.iter().map(mapper::record_to_block).collect();
        let status = self.remote.append_blocks(&page_id, &blocks)?;
        if !(200..300).contains(&status) {
            return Err(AppError::Transport(format!(
                "block append returned status {status}"
            )));
        }
        tracing::info!(date = %date, count = blocks.len(), status, "pushed local records to remote");
        Ok(status)
    }

    /// Routes a UI edit event back to the one record its handle names and
    /// merges the changed fields plus a refreshed edit time.
    pub fn apply_edit(
        &self,
        date: NaiveDate,
        block_type: BlockType,
        field: HandleElement,
        handle: &str,
        mut patch: RecordPatch,
    ) -> AppResult<usize> {
        patch.last_edited_time = Some(dates::current_timestamp());
        let filter = RecordFilter {
            task_date: Some(date),
            block_type: Some(block_type),
            object_name: Some((field, handle.to_string())),
        };
        self.store.update(&filter, &patch)
    }

    /// Appends one new record for the date with freshly assigned handles.
    pub fn create_record(
        &self,
        date: NaiveDate,
        block_type: BlockType,
        initial: RecordPatch,
    ) -> AppResult<TaskRecord> {
        let existing = self.store.find(&RecordFilter::for_date(date))?;
        let ordinal = next_free_ordinal(&existing, &block_type);

        let mut record = TaskRecord {
            record_id: None,
            block_id: None,
            task_date: date,
            last_edited_time: initial
                .last_edited_time
                .unwrap_or_else(dates::current_timestamp),
            parent_ref: Value::Null,
            block_type: block_type.clone(),
            checked: match block_type {
                BlockType::ToDo => Some(initial.checked.unwrap_or(false)),
                _ => None,
            },
            content_text: match block_type {
                BlockType::Other(_) => None,
                _ => initial.content_text,
            },
            checkbox_object_name: None,
            content_object_name: None,
            label_object_name: None,
        };
        record.assign_handles(ordinal);

        let ids = self.store.insert(std::slice::from_ref(&record))?;
        record.record_id = ids.into_iter().next();
        Ok(record)
    }

    fn entry_for_date(&self, date: NaiveDate) -> AppResult<DatabaseEntry> {
        let entries = self.remote.list_entries()?;
        entries
            .into_iter()
            .find(|entry| entry.task_date == date)
            .ok_or_else(|| AppError::DateNotFound(format!("no database entry for {date}")))
    }

    // Blocks remember the page they came from; locally created records
    // fall back to a fresh listing lookup.
    fn page_id_for(&self, date: NaiveDate, records: &[TaskRecord]) -> AppResult<String> {
        records
            .iter()
            .find_map(|record| {
                record
                    .parent_ref
                    .get("page_id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .map(Ok)
            .unwrap_or_else(|| self.entry_for_date(date).map(|entry| entry.page_id))
    }
}

fn next_free_ordinal(existing: &[TaskRecord], block_type: &BlockType) -> usize {
    let taken: HashSet<&str> = existing
        .iter()
        .flat_map(TaskRecord::handle_names)
        .collect();

    let mut candidate = existing.len();
    loop {
        let collision = block_type.handle_elements().iter().any(|element| {
            let rendered = ObjectHandle {
                ordinal: candidate,
                block_type: block_type.clone(),
                element: *element,
            }
            .render();
            taken.contains(rendered.as_str())
        });
        if !collision {
            return candidate;
        }
        candidate += 1;
    }
}
