//! Durable slot holding the identifier of the thread the user is in.

use log::info;
use serde::{ Deserialize, Serialize };
use std::fs;
use std::io::ErrorKind;
use std::path::{ Path, PathBuf };
use std::sync::Mutex;

use crate::error::StoreError;

pub trait ThreadStore: Send + Sync {
    fn current(&self) -> Result<Option<String>, StoreError>;
    fn set(&self, thread_id: &str) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

#[derive(Serialize, Deserialize)]
struct StoredThread {
    thread_id: String,
}

/// Keeps the current thread in a small JSON file so it survives restarts.
pub struct FileThreadStore {
    path: PathBuf,
}

impl FileThreadStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ThreadStore for FileThreadStore {
    fn current(&self) -> Result<Option<String>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredThread = serde_json::from_str(&raw)?;
        Ok(Some(stored.thread_id).filter(|id| !id.is_empty()))
    }

    fn set(&self, thread_id: &str) -> Result<(), StoreError> {
        if thread_id.is_empty() {
            return self.clear();
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(&StoredThread { thread_id: thread_id.to_string() })?;
        fs::write(&self.path, json)?;
        info!("Current thread set to {}", thread_id);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
pub struct MemoryThreadStore {
    slot: Mutex<Option<String>>,
}

impl MemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thread(thread_id: &str) -> Self {
        Self { slot: Mutex::new(Some(thread_id.to_string())) }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ThreadStore for MemoryThreadStore {
    fn current(&self) -> Result<Option<String>, StoreError> {
        Ok(self.slot().clone())
    }

    fn set(&self, thread_id: &str) -> Result<(), StoreError> {
        *self.slot() = Some(thread_id.to_string()).filter(|id| !id.is_empty());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.slot() = None;
        Ok(())
    }
}
