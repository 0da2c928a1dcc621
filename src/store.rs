use chrono::Utc;

use crate::backend::KeyValueBackend;
use crate::models::{ErrorCode, OpOutcome, StoreRecord, Task, STORAGE_VERSION};

pub const STORAGE_KEY: &str = "simple-todo-app-data";
const PROBE_KEY: &str = "__storage_probe__";

/// Durable single-record store over a key-value backend. Every operation
/// degrades instead of raising: reads fall back to the zero-value record,
/// writes report a coded failure through [`OpOutcome`].
pub struct TodoStore {
    backend: Box<dyn KeyValueBackend>,
}

impl TodoStore {
    pub fn new(backend: Box<dyn KeyValueBackend>) -> Self {
        Self { backend }
    }

    pub(crate) fn backend(&self) -> &dyn KeyValueBackend {
        self.backend.as_ref()
    }

    /// Probes the backend by writing and removing a throwaway marker key.
    pub fn is_available(&self) -> bool {
        if self.backend.set(PROBE_KEY, PROBE_KEY).is_err() {
            return false;
        }
        self.backend.remove(PROBE_KEY).is_ok()
    }

    /// Reads the current record. Absent, unreadable, or unparseable data all
    /// fall back to the zero-value record; this never fails.
    pub fn read(&self) -> StoreRecord {
        if !self.is_available() {
            return StoreRecord::default_now();
        }

        let raw = match self.backend.get(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return StoreRecord::default_now(),
            Err(err) => {
                log::error!("error reading storage: {err}");
                return StoreRecord::default_now();
            }
        };

        let parsed: StoreRecord = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                log::error!("corrupt storage record, falling back to defaults: {err}");
                return StoreRecord::default_now();
            }
        };

        if parsed.version != STORAGE_VERSION {
            log::warn!(
                "storage version mismatch (found {}, expected {STORAGE_VERSION}), migrating",
                parsed.version
            );
            return Self::migrate(parsed);
        }

        parsed
    }

    /// Version migration. No field-level migration rules exist for the
    /// current schema, so a mismatch resets to the zero-value record.
    fn migrate(_old: StoreRecord) -> StoreRecord {
        StoreRecord::default_now()
    }

    pub fn todos(&self) -> Vec<Task> {
        self.read().todos
    }

    /// Replaces the todo collection, restamps `lastModified`, and writes the
    /// whole record back under the fixed key.
    pub fn save_todos(&self, todos: Vec<Task>) -> OpOutcome<StoreRecord> {
        let mut record = self.read();
        record.todos = todos;
        self.write_record(record)
    }

    /// Resets the store to the zero-value record.
    pub fn clear(&self) -> OpOutcome<StoreRecord> {
        self.write_record(StoreRecord::default_now())
    }

    pub fn last_modified(&self) -> String {
        self.read().last_modified
    }

    /// Byte length of the raw stored value, 0 when absent or unavailable.
    pub fn storage_size(&self) -> usize {
        match self.backend.get(STORAGE_KEY) {
            Ok(Some(raw)) => raw.len(),
            _ => 0,
        }
    }

    pub(crate) fn write_record(&self, mut record: StoreRecord) -> OpOutcome<StoreRecord> {
        if !self.is_available() {
            return OpOutcome::err("storage is not available", ErrorCode::StorageUnavailable);
        }

        record.last_modified = Utc::now().to_rfc3339();
        let raw = match serde_json::to_string(&record) {
            Ok(raw) => raw,
            Err(err) => {
                return OpOutcome::err(format!("{err}"), ErrorCode::StorageSaveError);
            }
        };

        match self.backend.set(STORAGE_KEY, &raw) {
            Ok(()) => OpOutcome::ok(record),
            Err(err) => {
                log::error!("error saving storage record: {err}");
                OpOutcome::err(format!("{err}"), ErrorCode::StorageSaveError)
            }
        }
    }
}
