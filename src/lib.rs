//! Persistence and data-interchange core for a single-user todo list:
//! durable storage over a pluggable key-value backend, JSON/CSV/text export,
//! validated JSON import, and a rolling backup history.

mod backend;
mod backup;
mod export;
mod logging;
mod models;
mod store;
mod transfer;
mod validate;

pub use backend::{BackendError, FileBackend, KeyValueBackend, MemoryBackend};
pub use backup::{BackupInfo, BACKUP_LIMIT};
pub use export::export_record;
pub use logging::init_logging;
pub use models::{
    validate_task_text, ErrorCode, ExportEnvelope, ExportFormat, ExportMetadata, ExportOptions,
    OpError, OpOutcome, StoreRecord, Task, APP_NAME, APP_VERSION, MAX_TEXT_LENGTH, STORAGE_VERSION,
};
pub use store::{TodoStore, STORAGE_KEY};
pub use transfer::{
    export_filename, DialogError, FileCapabilities, FileDialog, FileTransfer, NullDialog,
    OpenOutcome,
};
pub use validate::{validate_import_data, ValidationReport};
