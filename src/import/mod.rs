//! Importing events from CSV, iCalendar (.ics) and vCalendar (.vcs) files.

pub mod csv;
pub mod ical;
pub mod ics;
pub mod vcs;

use serde::Serialize;
use std::path::Path;

use crate::core::event::Event;
use crate::core::recurrence::{self, DEFAULT_OCCURRENCE_CAP};
use crate::store::{EventStore, Storage, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("unsupported file type '{0}', expected .csv, .ics or .vcs")]
    UnsupportedFormat(String),
    #[error("CSV file needs a header row and at least one data row")]
    TooShort,
    #[error("CSV header is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("could not read CSV: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Csv,
    Ics,
    Vcs,
}

impl ImportFormat {
    /// Pick a format from the file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "ics" => Ok(Self::Ics),
            "vcs" => Ok(Self::Vcs),
            _ => Err(ImportError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Outcome handed to the UI layer; import never fails any other way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ImportResult {
    Success { count: usize },
    Failure { error: String },
}

impl ImportResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn count(&self) -> usize {
        match self {
            Self::Success { count } => *count,
            Self::Failure { .. } => 0,
        }
    }
}

impl From<Result<usize, ImportError>> for ImportResult {
    fn from(result: Result<usize, ImportError>) -> Self {
        match result {
            Ok(count) => Self::Success { count },
            Err(e) => Self::Failure {
                error: e.to_string(),
            },
        }
    }
}

/// Parses import files and persists the resulting events into a store.
pub struct Importer<'a, S: Storage> {
    store: &'a mut EventStore<S>,
    occurrence_cap: u32,
}

impl<'a, S: Storage> Importer<'a, S> {
    pub fn new(store: &'a mut EventStore<S>) -> Self {
        Self {
            store,
            occurrence_cap: DEFAULT_OCCURRENCE_CAP,
        }
    }

    /// Instances generated for a repeating event with no end date or count.
    pub fn with_occurrence_cap(mut self, cap: u32) -> Self {
        self.occurrence_cap = cap.max(1);
        self
    }

    /// Import one file, dispatching on its extension.
    pub async fn handle_file_import(&mut self, path: impl AsRef<Path>) -> ImportResult {
        let path = path.as_ref();
        let result = self.import_file(path).await;
        match &result {
            Ok(count) => log::info!("Imported {} events from {}", count, path.display()),
            Err(e) => log::warn!("Import of {} failed: {}", path.display(), e),
        }
        result.into()
    }

    async fn import_file(&mut self, path: &Path) -> Result<usize, ImportError> {
        let format = ImportFormat::from_path(path)?;
        let text = tokio::fs::read_to_string(path).await?;
        self.import_text(format, &text)
    }

    /// Parse `text` and persist every event in input order. Repeating events
    /// are stored as their expanded instances. Returns the number stored.
    pub fn import_text(&mut self, format: ImportFormat, text: &str) -> Result<usize, ImportError> {
        let events = match format {
            ImportFormat::Csv => self::csv::parse_csv(text, &mut *self.store)?,
            ImportFormat::Ics => ics::parse_ics(text),
            ImportFormat::Vcs => vcs::parse_vcs(text),
        };
        self.persist(events)
    }

    fn persist(&mut self, events: Vec<Event>) -> Result<usize, ImportError> {
        let mut batch = Vec::with_capacity(events.len());
        for event in events {
            if event.repeat.is_active() {
                let instances = recurrence::expand(&event, self.occurrence_cap);
                log::debug!(
                    "Expanded {} series '{}' into {} instances",
                    event.repeat.kind.as_str(),
                    event.name,
                    instances.len()
                );
                batch.extend(instances);
            } else {
                batch.push(event);
            }
        }
        Ok(self.store.save_events(batch)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStorage;
    use std::io::Write;

    fn store() -> EventStore<MemoryStorage> {
        EventStore::open(MemoryStorage::new()).unwrap()
    }

    fn write_temp(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            ImportFormat::from_path(Path::new("a/b/Export.CSV")).unwrap(),
            ImportFormat::Csv
        );
        assert_eq!(
            ImportFormat::from_path(Path::new("cal.ics")).unwrap(),
            ImportFormat::Ics
        );
        assert_eq!(
            ImportFormat::from_path(Path::new("old.vcs")).unwrap(),
            ImportFormat::Vcs
        );
        assert!(matches!(
            ImportFormat::from_path(Path::new("notes.txt")),
            Err(ImportError::UnsupportedFormat(_))
        ));
        assert!(ImportFormat::from_path(Path::new("no_extension")).is_err());
    }

    #[test]
    fn repeating_csv_rows_are_expanded() {
        let mut store = store();
        let text = "事件名称,开始时间,重复设置\nStandup,2024-03-20 09:00,\"daily,,3\"\nLunch,2024-03-20 12:00,\n";
        let count = Importer::new(&mut store)
            .import_text(ImportFormat::Csv, text)
            .unwrap();
        assert_eq!(count, 4);

        let names: Vec<&str> = store.get_events().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Standup", "Standup", "Standup", "Lunch"]);
        assert!(store.get_events().iter().all(|e| !e.repeat.is_active()));
        assert_eq!(store.storage().persist_count(), 1);
    }

    #[test]
    fn repeat_end_before_start_still_imports_the_row() {
        let mut store = store();
        let text = "事件名称,开始时间,重复设置\nStandup,2024-03-20 09:00,\"daily,2024-03-01,5\"\n";
        let count = Importer::new(&mut store)
            .import_text(ImportFormat::Csv, text)
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.get_events()[0].name, "Standup");
    }

    #[test]
    fn reversed_ics_event_is_not_stored() {
        let mut store = store();
        let text = "BEGIN:VEVENT\r\nSUMMARY:Backwards\r\nDTSTART:20251008T100000\r\nDTEND:20251008T090000\r\nEND:VEVENT\r\n";
        let count = Importer::new(&mut store)
            .import_text(ImportFormat::Ics, text)
            .unwrap();
        assert_eq!(count, 0);
        assert!(store.get_events().is_empty());
    }

    #[test]
    fn occurrence_cap_bounds_open_series() {
        let mut store = store();
        let text = "事件名称,开始时间,重复设置\nForever,2024-03-20 09:00,weekly\n";
        let count = Importer::new(&mut store)
            .with_occurrence_cap(5)
            .import_text(ImportFormat::Csv, text)
            .unwrap();
        assert_eq!(count, 5);
    }

    #[tokio::test]
    async fn csv_file_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "plan.csv",
            "事件名称,开始时间,结束时间\nReview,2024-03-20 14:00,2024-03-20 16:00\nBroken,2024-03-20 14:00,2024-03-20 13:00\n".as_bytes(),
        );
        let mut store = store();
        let result = Importer::new(&mut store).handle_file_import(&path).await;
        assert_eq!(result, ImportResult::Success { count: 1 });
        assert_eq!(store.get_events()[0].name, "Review");
    }

    #[tokio::test]
    async fn ics_file_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "cal.ics",
            b"BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nSUMMARY:Demo\r\nDTSTART:20251008T093000\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n",
        );
        let mut store = store();
        let result = Importer::new(&mut store).handle_file_import(&path).await;
        assert!(result.is_success());
        assert_eq!(result.count(), 1);
    }

    #[tokio::test]
    async fn failures_become_results() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store();
        let mut importer = Importer::new(&mut store);

        let unsupported = write_temp(&dir, "notes.txt", b"hello");
        match importer.handle_file_import(&unsupported).await {
            ImportResult::Failure { error } => assert!(error.contains("unsupported")),
            other => panic!("unexpected: {other:?}"),
        }

        let missing = dir.path().join("missing.csv");
        assert!(!importer.handle_file_import(&missing).await.is_success());

        let not_utf8 = write_temp(&dir, "bad.ics", &[0xff, 0xfe, 0x00, 0x42]);
        assert!(!importer.handle_file_import(&not_utf8).await.is_success());

        let header_only = write_temp(&dir, "empty.csv", "事件名称,开始时间\n".as_bytes());
        match importer.handle_file_import(&header_only).await {
            ImportResult::Failure { error } => assert!(error.contains("header row")),
            other => panic!("unexpected: {other:?}"),
        }

        let wrong_header = write_temp(&dir, "wrong.csv", "name,start\nx,y\n".as_bytes());
        match importer.handle_file_import(&wrong_header).await {
            ImportResult::Failure { error } => assert!(error.contains("开始时间")),
            other => panic!("unexpected: {other:?}"),
        }

        assert!(store.get_events().is_empty());
    }

    #[test]
    fn result_serializes_with_status_tag() {
        let json = serde_json::to_value(ImportResult::Success { count: 3 }).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["count"], 3);
    }
}
