use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Upper bound accepted for `repeat.count`.
pub const MAX_REPEAT_COUNT: u32 = 100;

/// Eisenhower-matrix priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    UrgentImportant,
    ImportantNotUrgent,
    UrgentNotImportant,
    NotUrgentNotImportant,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Self::UrgentImportant,
        Self::ImportantNotUrgent,
        Self::UrgentNotImportant,
        Self::NotUrgentNotImportant,
    ];

    pub fn as_token(&self) -> &'static str {
        match self {
            Self::UrgentImportant => "urgent-important",
            Self::ImportantNotUrgent => "important-not-urgent",
            Self::UrgentNotImportant => "urgent-not-important",
            Self::NotUrgentNotImportant => "not-urgent-not-important",
        }
    }

    /// Case-insensitive match against the four fixed tokens.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_token().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatType {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RepeatType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Some(Self::None),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repeat {
    #[serde(rename = "type")]
    pub kind: RepeatType,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub count: Option<u32>,
}

impl Repeat {
    pub fn new(kind: RepeatType) -> Self {
        Self {
            kind,
            end_date: None,
            count: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.kind != RepeatType::None
    }
}

/// Reasons an event fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("event name is empty")]
    EmptyName,
    #[error("event has no start time")]
    MissingStart,
    #[error("end time {end} is not after start time {start}")]
    EndNotAfterStart {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    #[error("repeat count {0} is outside 1..=100")]
    RepeatCountOutOfRange(u32),
}

/// A task or calendar item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub start_time: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub end_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub repeat: Repeat,
}

impl Event {
    pub fn new(name: impl Into<String>, start_time: Option<NaiveDateTime>) -> Self {
        Self {
            id: generate_event_id(),
            name: name.into(),
            start_time,
            end_time: None,
            location: String::new(),
            description: String::new(),
            participants: Vec::new(),
            tags: Vec::new(),
            color: None,
            completed: false,
            project_id: None,
            priority: None,
            repeat: Repeat::default(),
        }
    }

    pub fn validate(&self) -> Result<(), EventError> {
        if self.name.trim().is_empty() {
            return Err(EventError::EmptyName);
        }
        let start = self.start_time.ok_or(EventError::MissingStart)?;
        if let Some(end) = self.end_time {
            if end <= start {
                return Err(EventError::EndNotAfterStart { start, end });
            }
        }
        if let Some(count) = self.repeat.count {
            if !(1..=MAX_REPEAT_COUNT).contains(&count) {
                return Err(EventError::RepeatCountOutOfRange(count));
            }
        }
        Ok(())
    }
}

/// Opaque id of the form `event_<millis>_<random>`.
pub fn generate_event_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let random = Uuid::new_v4().simple().to_string();
    format!("event_{}_{}", millis, &random[..9])
}

/// Accepts anything in the `startTime` slot; values that are not a datetime
/// become `None` instead of failing the whole record.
fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|v| v.as_str()).and_then(parse_stored_datetime))
}

fn parse_stored_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&chrono::Local).naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}
