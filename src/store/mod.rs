pub mod observer;
pub mod storage;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::core::event::Event;
use crate::core::project::Project;
pub use observer::{StoreChange, StoreObserver};
pub use storage::{JsonFileStorage, MemoryStorage, Storage};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store data is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("no event with id {0}")]
    EventNotFound(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointsEntry {
    pub amount: i64,
    pub reason: String,
    pub at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointsLedger {
    pub total: i64,
    #[serde(default)]
    pub entries: Vec<PointsEntry>,
}

/// Everything the store persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub points: PointsLedger,
}

/// Resolves a project name to an id, creating the project if needed.
pub trait ProjectRegistry {
    fn get_or_create_project(&mut self, name: &str) -> Result<String, StoreError>;
}

/// Canonical list of events, projects and points.
///
/// Every mutation is persisted through the backend before observers hear
/// about it.
pub struct EventStore<S: Storage> {
    storage: S,
    data: StoreData,
    observers: Vec<Box<dyn StoreObserver>>,
}

impl<S: Storage> EventStore<S> {
    pub fn open(storage: S) -> Result<Self, StoreError> {
        let data = storage.load()?;
        log::debug!(
            "Opened store with {} events, {} projects",
            data.events.len(),
            data.projects.len()
        );
        Ok(Self {
            storage,
            data,
            observers: Vec::new(),
        })
    }

    pub fn subscribe(&mut self, observer: impl StoreObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn get_data(&self) -> &StoreData {
        &self.data
    }

    pub fn get_events(&self) -> &[Event] {
        &self.data.events
    }

    pub fn get_event(&self, id: &str) -> Option<&Event> {
        self.data.events.iter().find(|e| e.id == id)
    }

    /// Insert, or replace the event with the same id.
    pub fn save_event(&mut self, event: Event) -> Result<(), StoreError> {
        let id = event.id.clone();
        match self.data.events.iter_mut().find(|e| e.id == event.id) {
            Some(existing) => *existing = event,
            None => self.data.events.push(event),
        }
        self.commit(StoreChange::EventSaved { id })
    }

    /// Upsert many events with a single write to the backend. Observers
    /// hear one `EventSaved` per event, in order. Returns how many were saved.
    pub fn save_events(&mut self, events: impl IntoIterator<Item = Event>) -> Result<usize, StoreError> {
        let mut changes = Vec::new();
        for event in events {
            changes.push(StoreChange::EventSaved { id: event.id.clone() });
            match self.data.events.iter_mut().find(|e| e.id == event.id) {
                Some(existing) => *existing = event,
                None => self.data.events.push(event),
            }
        }
        if changes.is_empty() {
            return Ok(0);
        }
        let count = changes.len();
        self.commit_all(changes)?;
        Ok(count)
    }

    /// Returns false when no event had that id.
    pub fn delete_event(&mut self, id: &str) -> Result<bool, StoreError> {
        let before = self.data.events.len();
        self.data.events.retain(|e| e.id != id);
        if self.data.events.len() == before {
            return Ok(false);
        }
        self.commit(StoreChange::EventDeleted { id: id.to_string() })?;
        Ok(true)
    }

    pub fn mark_event_completed(&mut self, id: &str, completed: bool) -> Result<(), StoreError> {
        let event = self
            .data
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| StoreError::EventNotFound(id.to_string()))?;
        event.completed = completed;
        self.commit(StoreChange::EventCompleted {
            id: id.to_string(),
            completed,
        })
    }

    pub fn add_points(&mut self, amount: i64, reason: impl Into<String>) -> Result<i64, StoreError> {
        let ledger = &mut self.data.points;
        ledger.total += amount;
        ledger.entries.push(PointsEntry {
            amount,
            reason: reason.into(),
            at: chrono::Local::now().naive_local(),
        });
        let total = ledger.total;
        self.commit(StoreChange::PointsAdded { amount, total })?;
        Ok(total)
    }

    fn commit(&mut self, change: StoreChange) -> Result<(), StoreError> {
        self.commit_all(vec![change])
    }

    fn commit_all(&mut self, changes: Vec<StoreChange>) -> Result<(), StoreError> {
        self.storage.persist(&self.data)?;
        for change in &changes {
            for observer in &self.observers {
                observer.on_change(change);
            }
        }
        Ok(())
    }
}

impl<S: Storage> ProjectRegistry for EventStore<S> {
    fn get_or_create_project(&mut self, name: &str) -> Result<String, StoreError> {
        if let Some(project) = self.data.projects.iter().find(|p| p.matches(name)) {
            return Ok(project.id.clone());
        }
        let project = Project::new(name.trim());
        let id = project.id.clone();
        log::info!("Created project '{}' ({})", project.name, id);
        let change = StoreChange::ProjectCreated {
            id: id.clone(),
            name: project.name.clone(),
        };
        self.data.projects.push(project);
        self.commit(change)?;
        Ok(id)
    }
}
