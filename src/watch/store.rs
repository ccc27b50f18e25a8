//! Durable subscriber → URL mapping.
//!
//! The persisted file is a flat JSON object keyed by subscriber id. It is
//! read in full at resume and rewritten in full on every start/stop, always
//! through a temp file and a rename so a crash mid-write never leaves a
//! truncated file behind.

use crate::error::{Result, WatchError};
use crate::watch::types::SubscriberId;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Full persisted mapping.
pub type TaskRecords = BTreeMap<SubscriberId, String>;

/// Storage backend for watch records.
///
/// Callers serialize access; implementations need not guard against
/// concurrent read-modify-write cycles.
pub trait TaskStore: Send + Sync {
    /// Load every record. A store that was never written is empty.
    fn load_all(&self) -> Result<TaskRecords>;

    /// Replace the whole mapping.
    fn save(&self, records: &TaskRecords) -> Result<()>;

    /// Insert or replace one record.
    fn upsert(&self, subscriber: &SubscriberId, url: &str) -> Result<()> {
        let mut records = self.load_all()?;
        records.insert(subscriber.clone(), url.to_owned());
        self.save(&records)
    }

    /// Remove one record. Returns `true` if it existed.
    fn remove(&self, subscriber: &SubscriberId) -> Result<bool> {
        let mut records = self.load_all()?;
        if records.remove(subscriber).is_none() {
            return Ok(false);
        }
        self.save(&records)?;
        Ok(true)
    }
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct JsonTaskStore {
    path: PathBuf,
}

impl JsonTaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let tmp_name = format!(
            ".{}.tmp-{}",
            self.path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("tasks"),
            std::process::id()
        );
        self.path
            .parent()
            .map(|p| p.join(&tmp_name))
            .unwrap_or_else(|| PathBuf::from(&tmp_name))
    }
}

impl TaskStore for JsonTaskStore {
    fn load_all(&self) -> Result<TaskRecords> {
        let bytes = match std::fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(TaskRecords::new());
            }
            Err(e) => {
                return Err(WatchError::Persistence(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )));
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(TaskRecords::new());
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            WatchError::Persistence(format!("cannot parse {}: {e}", self.path.display()))
        })
    }

    fn save(&self, records: &TaskRecords) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| WatchError::Persistence(format!("cannot create state dir: {e}")))?;
        }

        let json = serde_json::to_string_pretty(records)
            .map_err(|e| WatchError::Persistence(format!("cannot serialize state: {e}")))?;

        let tmp_path = self.temp_path();
        std::fs::write(&tmp_path, json)
            .map_err(|e| WatchError::Persistence(format!("cannot write state: {e}")))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            WatchError::Persistence(format!("cannot replace state file: {e}"))
        })?;

        debug!(path = %self.path.display(), watches = records.len(), "persisted watch state");
        Ok(())
    }
}

/// In-process store. Nothing survives the process.
///
/// Writes can be made to fail on demand to exercise persistence error paths.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    records: Mutex<TaskRecords>,
    fail_writes: AtomicBool,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: TaskRecords) -> Self {
        Self {
            records: Mutex::new(records),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `save` fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl TaskStore for MemoryTaskStore {
    fn load_all(&self) -> Result<TaskRecords> {
        self.records
            .lock()
            .map(|records| records.clone())
            .map_err(|_| WatchError::Persistence("memory store lock poisoned".into()))
    }

    fn save(&self, records: &TaskRecords) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(WatchError::Persistence("simulated write failure".into()));
        }
        let mut guard = self
            .records
            .lock()
            .map_err(|_| WatchError::Persistence("memory store lock poisoned".into()))?;
        *guard = records.clone();
        Ok(())
    }
}

impl<S: TaskStore + ?Sized> TaskStore for std::sync::Arc<S> {
    fn load_all(&self) -> Result<TaskRecords> {
        (**self).load_all()
    }

    fn save(&self, records: &TaskRecords) -> Result<()> {
        (**self).save(records)
    }
}
