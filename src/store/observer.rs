use serde::Serialize;

/// A mutation the store has just persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StoreChange {
    EventSaved { id: String },
    EventDeleted { id: String },
    EventCompleted { id: String, completed: bool },
    ProjectCreated { id: String, name: String },
    PointsAdded { amount: i64, total: i64 },
}

/// Receives store changes, e.g. a UI layer re-rendering its agenda.
pub trait StoreObserver {
    fn on_change(&self, change: &StoreChange);
}

impl<F> StoreObserver for F
where
    F: Fn(&StoreChange),
{
    fn on_change(&self, change: &StoreChange) {
        self(change)
    }
}
