use std::path::{Path, PathBuf};

use super::{StoreData, StoreError};

/// Where the store's data lives between runs.
pub trait Storage {
    fn load(&self) -> Result<StoreData, StoreError>;
    fn persist(&mut self, data: &StoreData) -> Result<(), StoreError>;
}

/// Pretty-printed JSON document on disk. A missing file loads as empty data.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for JsonFileStorage {
    fn load(&self) -> Result<StoreData, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No store at {}, starting empty", self.path.display());
                return Ok(StoreData::default());
            }
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(StoreData::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn persist(&mut self, data: &StoreData) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Keeps the last persisted snapshot in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    snapshot: StoreData,
    persist_count: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(snapshot: StoreData) -> Self {
        Self {
            snapshot,
            persist_count: 0,
        }
    }

    pub fn snapshot(&self) -> &StoreData {
        &self.snapshot
    }

    pub fn persist_count(&self) -> usize {
        self.persist_count
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<StoreData, StoreError> {
        Ok(self.snapshot.clone())
    }

    fn persist(&mut self, data: &StoreData) -> Result<(), StoreError> {
        self.snapshot = data.clone();
        self.persist_count += 1;
        Ok(())
    }
}
