use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::models::ExportFormat;

/// What the environment's file dialog provider can do. Probed once and used
/// for UI affordance decisions only; the save path branches on outcomes, not
/// on these flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileCapabilities {
    pub native_dialog: bool,
    pub drag_and_drop: bool,
    pub file_read: bool,
}

/// Three-way outcome of an open dialog. Cancellation is a first-class
/// outcome here, not an error dressed up as an exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Content { content: String, filename: String },
    Cancelled,
    Unsupported,
}

#[derive(Debug)]
pub enum DialogError {
    Cancelled,
    Unsupported,
    Failed(String),
}

impl std::fmt::Display for DialogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DialogError::Cancelled => write!(f, "dialog cancelled"),
            DialogError::Unsupported => write!(f, "dialog unsupported"),
            DialogError::Failed(reason) => write!(f, "dialog failed: {reason}"),
        }
    }
}

impl std::error::Error for DialogError {}

/// Native save/open dialog seam. The embedding application provides the
/// real implementation; headless callers use [`NullDialog`].
pub trait FileDialog {
    fn capabilities(&self) -> FileCapabilities;
    fn save(&self, data: &str, filename: &str, mime_type: &str) -> Result<(), DialogError>;
    fn open(&self) -> OpenOutcome;
}

/// Dialog provider for environments with no dialog at all.
#[derive(Debug, Default)]
pub struct NullDialog;

impl FileDialog for NullDialog {
    fn capabilities(&self) -> FileCapabilities {
        FileCapabilities {
            native_dialog: false,
            drag_and_drop: false,
            file_read: false,
        }
    }

    fn save(&self, _data: &str, _filename: &str, _mime_type: &str) -> Result<(), DialogError> {
        Err(DialogError::Unsupported)
    }

    fn open(&self) -> OpenOutcome {
        OpenOutcome::Unsupported
    }
}

/// Bridges export strings to the local filesystem: native dialog first,
/// plain write into the fallback directory when the dialog is missing or
/// fails. Open has no adapter-side fallback; the caller owns that path.
pub struct FileTransfer<D: FileDialog> {
    dialog: D,
    fallback_dir: PathBuf,
}

impl<D: FileDialog> FileTransfer<D> {
    pub fn new(dialog: D, fallback_dir: PathBuf) -> Self {
        Self {
            dialog,
            fallback_dir,
        }
    }

    pub fn capabilities(&self) -> FileCapabilities {
        self.dialog.capabilities()
    }

    /// Saves an export string. Never raises; returns whether anything was
    /// written. A cancelled dialog still falls back to the plain write, the
    /// same way the original treats any dialog failure.
    pub fn save_file(&self, data: &str, filename: &str, mime_type: &str) -> bool {
        match self.dialog.save(data, filename, mime_type) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("native save dialog failed, using fallback: {err}");
                self.fallback_save(data, filename)
            }
        }
    }

    pub fn open_file(&self) -> OpenOutcome {
        self.dialog.open()
    }

    fn fallback_save(&self, data: &str, filename: &str) -> bool {
        match write_atomic(&self.fallback_dir.join(filename), data.as_bytes()) {
            Ok(()) => true,
            Err(err) => {
                log::error!("fallback file save failed: {err}");
                false
            }
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("invalid export path"))?;
    fs::create_dir_all(parent)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(tmp, path)?;
    Ok(())
}

/// Timestamped default filename for an export, e.g. `todos-20250601-120000.csv`.
pub fn export_filename(format: ExportFormat) -> String {
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    format!("todos-{stamp}.{}", format.extension())
}
