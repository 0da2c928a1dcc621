use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug)]
pub enum BackendError {
    Io(std::io::Error),
    Unavailable(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Io(err) => write!(f, "io error: {err}"),
            BackendError::Unavailable(reason) => write!(f, "backend unavailable: {reason}"),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(value: std::io::Error) -> Self {
        BackendError::Io(value)
    }
}

/// The key-value seam under the store. Mirrors a browser-profile key-value
/// store: flat string keys, string values, full namespace enumeration.
pub trait KeyValueBackend: Send {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError>;
    fn set(&self, key: &str, value: &str) -> Result<(), BackendError>;
    fn remove(&self, key: &str) -> Result<(), BackendError>;
    fn keys(&self) -> Result<Vec<String>, BackendError>;
}

const VALUE_SUFFIX: &str = ".json";

/// File-per-key backend rooted at a data directory. Writes go through a
/// temp file and rename so a crash never leaves a half-written value.
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn ensure_dirs(&self) -> Result<(), BackendError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}{VALUE_SUFFIX}"))
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let path = self.value_path(key);
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(Some(buf))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        self.ensure_dirs()?;
        let path = self.value_path(key);
        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        match fs::remove_file(self.value_path(key)) {
            Ok(()) => Ok(()),
            // Removing an absent key matches key-value store semantics.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut keys = Vec::new();
        for entry in entries.filter_map(|entry| entry.ok()) {
            if let Some(name) = entry.file_name().to_str() {
                if let Some(key) = name.strip_suffix(VALUE_SUFFIX) {
                    keys.push(key.to_string());
                }
            }
        }
        Ok(keys)
    }
}

/// In-memory backend. Used as the test double throughout the crate; the
/// `set_unavailable` switch simulates a disabled or quota-exhausted store.
#[derive(Default)]
pub struct MemoryBackend {
    values: Mutex<BTreeMap<String, String>>,
    unavailable: Mutex<bool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().expect("backend poisoned") = unavailable;
    }

    fn check_available(&self) -> Result<(), BackendError> {
        if *self.unavailable.lock().expect("backend poisoned") {
            return Err(BackendError::Unavailable("storage disabled".to_string()));
        }
        Ok(())
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        self.check_available()?;
        Ok(self
            .values
            .lock()
            .expect("backend poisoned")
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        self.check_available()?;
        self.values
            .lock()
            .expect("backend poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        self.check_available()?;
        self.values.lock().expect("backend poisoned").remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        self.check_available()?;
        Ok(self
            .values
            .lock()
            .expect("backend poisoned")
            .keys()
            .cloned()
            .collect())
    }
}
