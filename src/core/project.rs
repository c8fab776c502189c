use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named grouping that events point at through `project_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: format!("project_{}", Uuid::new_v4().simple()),
            name: name.into(),
            color: None,
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.name == name.trim()
    }
}
