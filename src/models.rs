use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const STORAGE_VERSION: &str = "1.0";
pub const APP_NAME: &str = "Simple Todo App";
pub const APP_VERSION: &str = "1.0.0";

/// One todo entry. `created_at` is an ISO-8601 string because that is the
/// persisted wire shape; it is validated, not re-parsed, on the hot path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub created_at: String,
}

impl Task {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            completed: false,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

/// The full persisted record. Written wholesale on every save; never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRecord {
    pub version: String,
    pub todos: Vec<Task>,
    pub last_modified: String,
}

impl StoreRecord {
    /// Zero-value record: current schema version, no todos, stamped now.
    pub fn default_now() -> Self {
        Self {
            version: STORAGE_VERSION.to_string(),
            todos: Vec::new(),
            last_modified: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub app_name: String,
    pub app_version: String,
    pub export_version: String,
    pub exported_at: String,
    pub total_todos: usize,
    pub completed_todos: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Metadata-wrapped export shape. Only ever exists in export strings and
/// backup values, never under the live storage key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    pub metadata: ExportMetadata,
    pub data: StoreRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
    Txt,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Txt => "txt",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            // CSV is deliberately served as plain text, matching the export UI.
            ExportFormat::Csv | ExportFormat::Txt => "text/plain",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub include_metadata: bool,
    pub include_completed: bool,
    pub include_created_date: bool,
    pub pretty_print: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Json,
            include_metadata: true,
            include_completed: true,
            include_created_date: true,
            pretty_print: true,
        }
    }
}

/// Machine-readable failure codes carried by [`OpError`]. Serialized in the
/// SCREAMING_SNAKE_CASE form the persisted wire contract uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    StorageUnavailable,
    StorageSaveError,
    ValidationError,
    ImportError,
    BackupNotFound,
    RestoreError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpError {
    pub message: String,
    pub code: ErrorCode,
}

/// Tagged outcome of every fallible store operation. Nothing in this crate
/// raises across the public boundary; failures travel here instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpOutcome<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<OpError>,
}

impl<T> OpOutcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(OpError {
                message: message.into(),
                code,
            }),
        }
    }
}

pub const MAX_TEXT_LENGTH: usize = 500;

/// Checks user-authored task text: non-empty and at most 500 characters after
/// trimming. Import validation has its own field checks; this is for callers
/// creating or editing tasks.
pub fn validate_task_text(text: &str) -> Result<(), String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("Todo text cannot be empty".to_string());
    }
    if trimmed.chars().count() > MAX_TEXT_LENGTH {
        return Err(format!(
            "Todo text cannot exceed {MAX_TEXT_LENGTH} characters"
        ));
    }
    Ok(())
}
