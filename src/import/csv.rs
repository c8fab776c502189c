use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, StringRecord};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::ImportError;
use crate::core::event::{Event, EventError, MAX_REPEAT_COUNT, Priority, Repeat, RepeatType};
use crate::store::{ProjectRegistry, StoreError};

pub const COL_NAME: &str = "事件名称";
pub const COL_START: &str = "开始时间";
pub const COL_END: &str = "结束时间";
pub const COL_LOCATION: &str = "地点";
pub const COL_PARTICIPANTS: &str = "参与人员";
pub const COL_TAGS: &str = "标签";
pub const COL_PROJECT: &str = "所属项目";
pub const COL_REPEAT: &str = "重复设置";
pub const COL_PRIORITY: &str = "重要等级";

const PARTICIPANT_SEPARATOR: char = '、';

static DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<y>\d{4})(?P<s1>[-/])(?P<m>\d{1,2})(?P<s2>[-/])(?P<d>\d{1,2})[ T](?P<h>\d{1,2}):(?P<min>\d{2})(?::(?P<sec>\d{2}))?$",
    )
    .unwrap()
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<y>\d{4})(?P<s1>[-/])(?P<m>\d{1,2})(?P<s2>[-/])(?P<d>\d{1,2})$").unwrap()
});

/// Why a single row was skipped.
#[derive(Debug, thiserror::Error)]
enum RowError {
    #[error("missing event name")]
    MissingName,
    #[error("missing start time")]
    MissingStart,
    #[error("invalid start time '{0}'")]
    InvalidStart(String),
    #[error("invalid end time '{0}'")]
    InvalidEnd(String),
    #[error(transparent)]
    Invalid(#[from] EventError),
    #[error("could not resolve project: {0}")]
    Project(#[from] StoreError),
}

/// Header positions, resolved once per file.
struct Columns {
    name: usize,
    start: usize,
    end: Option<usize>,
    location: Option<usize>,
    participants: Option<usize>,
    tags: Option<usize>,
    project: Option<usize>,
    repeat: Option<usize>,
    priority: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, ImportError> {
        let find = |label: &str| headers.iter().position(|h| h.trim() == label);

        let missing: Vec<String> = [COL_NAME, COL_START]
            .into_iter()
            .filter(|label| find(*label).is_none())
            .map(str::to_string)
            .collect();
        let (Some(name), Some(start)) = (find(COL_NAME), find(COL_START)) else {
            return Err(ImportError::MissingColumns(missing));
        };

        Ok(Self {
            name,
            start,
            end: find(COL_END),
            location: find(COL_LOCATION),
            participants: find(COL_PARTICIPANTS),
            tags: find(COL_TAGS),
            project: find(COL_PROJECT),
            repeat: find(COL_REPEAT),
            priority: find(COL_PRIORITY),
        })
    }
}

fn cell(record: &StringRecord, index: Option<usize>) -> &str {
    index.and_then(|i| record.get(i)).map(str::trim).unwrap_or("")
}

/// Parse a CSV export with the Chinese column headers into events.
///
/// The header row must contain the name and start-time columns; column
/// order does not matter. Rows that fail validation are logged and skipped.
pub fn parse_csv<R>(text: &str, projects: &mut R) -> Result<Vec<Event>, ImportError>
where
    R: ProjectRegistry + ?Sized,
{
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let non_empty_lines = text.lines().filter(|l| !l.trim().is_empty()).count();
    if non_empty_lines < 2 {
        return Err(ImportError::TooShort);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let columns = Columns::from_headers(reader.headers()?)?;

    let mut events = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let row = index + 2;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                log::warn!("CSV row {}: unreadable, skipping: {}", row, e);
                continue;
            }
        };
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        match parse_row(&record, &columns, projects) {
            Ok(event) => events.push(event),
            Err(e) => log::warn!("CSV row {}: {}, skipping", row, e),
        }
    }

    log::debug!("Parsed {} events from CSV", events.len());
    Ok(events)
}

fn parse_row<R>(record: &StringRecord, columns: &Columns, projects: &mut R) -> Result<Event, RowError>
where
    R: ProjectRegistry + ?Sized,
{
    let name = cell(record, Some(columns.name));
    if name.is_empty() {
        return Err(RowError::MissingName);
    }

    let start_raw = cell(record, Some(columns.start));
    if start_raw.is_empty() {
        return Err(RowError::MissingStart);
    }
    let start = parse_datetime(start_raw).ok_or_else(|| RowError::InvalidStart(start_raw.to_string()))?;

    let mut event = Event::new(name, Some(start));

    let end_raw = cell(record, columns.end);
    if !end_raw.is_empty() {
        let end = parse_datetime(end_raw).ok_or_else(|| RowError::InvalidEnd(end_raw.to_string()))?;
        event.end_time = Some(end);
    }

    event.location = cell(record, columns.location).to_string();
    event.participants = split_list(cell(record, columns.participants), PARTICIPANT_SEPARATOR);
    event.tags = split_list(cell(record, columns.tags), ',');
    let mut seen = HashSet::new();
    event.tags.retain(|tag| seen.insert(tag.clone()));

    let repeat = cell(record, columns.repeat);
    if !repeat.is_empty() {
        event.repeat = parse_repeat(repeat);
    }

    let priority = cell(record, columns.priority);
    if !priority.is_empty() {
        event.priority = Priority::parse(priority);
        if event.priority.is_none() {
            log::warn!("Ignoring unknown priority '{}' for '{}'", priority, event.name);
        }
    }

    event.validate()?;

    // Only rows that will be imported may create projects.
    let project = cell(record, columns.project);
    if !project.is_empty() {
        event.project_id = Some(projects.get_or_create_project(project)?);
    }
    Ok(event)
}

fn split_list(value: &str, separator: char) -> Vec<String> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `YYYY-MM-DD HH:mm[:ss]`, with `-` or `/` between date parts and a space
/// or `T` before the time. Anything else, including impossible dates, is
/// `None`.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let caps = DATETIME_RE.captures(value.trim())?;
    if caps["s1"] != caps["s2"] {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(
        caps["y"].parse().ok()?,
        caps["m"].parse().ok()?,
        caps["d"].parse().ok()?,
    )?;
    let seconds = caps.name("sec").map_or(Some(0), |m| m.as_str().parse().ok())?;
    let time = NaiveTime::from_hms_opt(caps["h"].parse().ok()?, caps["min"].parse().ok()?, seconds)?;
    Some(date.and_time(time))
}

/// `YYYY-MM-DD` or `YYYY/MM/DD`; a full datetime is accepted and truncated.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let Some(caps) = DATE_RE.captures(value) else {
        return parse_datetime(value).map(|dt| dt.date());
    };
    if caps["s1"] != caps["s2"] {
        return None;
    }
    NaiveDate::from_ymd_opt(
        caps["y"].parse().ok()?,
        caps["m"].parse().ok()?,
        caps["d"].parse().ok()?,
    )
}

/// The `type,endDate,count` sub-format of the repeat column. Unknown types
/// disable repetition; a bad end date or out-of-range count is dropped.
pub fn parse_repeat(value: &str) -> Repeat {
    let mut parts = value.split(',').map(str::trim);

    let kind_raw = parts.next().unwrap_or("");
    let Some(kind) = RepeatType::parse(kind_raw) else {
        log::warn!("Unknown repeat type '{}', not repeating", kind_raw);
        return Repeat::default();
    };

    let end_date = match parts.next().filter(|s| !s.is_empty()) {
        Some(raw) => {
            let parsed = parse_date(raw);
            if parsed.is_none() {
                log::warn!("Ignoring invalid repeat end date '{}'", raw);
            }
            parsed
        }
        None => None,
    };

    let count = match parts.next().filter(|s| !s.is_empty()) {
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if (1..=MAX_REPEAT_COUNT).contains(&n) => Some(n),
            _ => {
                log::warn!("Ignoring repeat count '{}' outside 1..={}", raw, MAX_REPEAT_COUNT);
                None
            }
        },
        None => None,
    };

    Repeat {
        kind,
        end_date,
        count,
    }
}
