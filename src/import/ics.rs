use chrono::NaiveDateTime;

use super::ical::{parse_calendar_time, parse_property_line, unescape_text, unfold_lines};
use crate::core::event::{Event, EventError};

/// Fields collected from one VEVENT block.
#[derive(Debug, Default)]
pub(super) struct VeventFields {
    summary: Option<String>,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    location: String,
    description: String,
}

impl VeventFields {
    /// Record a property; names other than the five we model are ignored.
    pub(super) fn apply(&mut self, name: &str, value: &str) {
        match name.to_ascii_uppercase().as_str() {
            "SUMMARY" => self.summary = Some(unescape_text(value).trim().to_string()),
            "DTSTART" => self.start = parse_calendar_time(value),
            "DTEND" => self.end = parse_calendar_time(value),
            "LOCATION" => self.location = unescape_text(value),
            "DESCRIPTION" => self.description = unescape_text(value),
            _ => {}
        }
    }

    /// Build the event; it needs a summary, a start time, and an end (if
    /// any) after the start.
    pub(super) fn finish(self) -> Result<Event, EventError> {
        let name = self.summary.filter(|s| !s.is_empty()).ok_or(EventError::EmptyName)?;
        let start = self.start.ok_or(EventError::MissingStart)?;
        let mut event = Event::new(name, Some(start));
        event.end_time = self.end;
        event.location = self.location;
        event.description = self.description;
        event.validate()?;
        Ok(event)
    }
}

/// Parse iCalendar text into events, one per complete VEVENT.
pub fn parse_ics(text: &str) -> Vec<Event> {
    let mut events = Vec::new();
    let mut current: Option<VeventFields> = None;

    for line in unfold_lines(text) {
        let line = line.trim();
        if line.eq_ignore_ascii_case("BEGIN:VEVENT") {
            current = Some(VeventFields::default());
            continue;
        }
        if line.eq_ignore_ascii_case("END:VEVENT") {
            if let Some(fields) = current.take() {
                match fields.finish() {
                    Ok(event) => events.push(event),
                    Err(e) => log::warn!("Skipping VEVENT: {}", e),
                }
            }
            continue;
        }
        let Some(fields) = current.as_mut() else {
            continue;
        };
        if let Some(property) = parse_property_line(line) {
            fields.apply(property.name, property.value);
        }
    }

    log::debug!("Parsed {} events from iCalendar text", events.len());
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    const TWO_EVENTS: &str = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Test//EN\r\nBEGIN:VEVENT\r\nUID:one\r\nSUMMARY:Team sync\r\nDTSTART:20251008T093000\r\nDTEND:20251008T103000\r\nLOCATION:Room 4\\, north wing\r\nDESCRIPTION:Weekly\\nstatus\r\nEND:VEVENT\r\nBEGIN:VEVENT\r\nUID:two\r\nSUMMARY:Launch\r\nDTSTART;TZID=Asia/Shanghai:20251010T140000\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";

    #[test]
    fn parses_all_vevents() {
        let events = parse_ics(TWO_EVENTS);
        assert_eq!(events.len(), 2);

        let sync = &events[0];
        assert_eq!(sync.name, "Team sync");
        assert_eq!(sync.location, "Room 4, north wing");
        assert_eq!(sync.description, "Weekly\nstatus");
        assert!(sync.end_time.unwrap() > sync.start_time.unwrap());

        assert_eq!(events[1].name, "Launch");
        assert_eq!(events[1].end_time, None);
        assert_ne!(events[0].id, events[1].id);
    }

    #[test]
    fn local_time_is_not_shifted() {
        let ics = "BEGIN:VEVENT\nSUMMARY:Standup\nDTSTART:20251008T093000\nEND:VEVENT\n";
        let events = parse_ics(ics);
        let start = events[0].start_time.unwrap();
        assert_eq!(start.date(), NaiveDate::from_ymd_opt(2025, 10, 8).unwrap());
        assert_eq!((start.hour(), start.minute()), (9, 30));
    }

    #[test]
    fn events_missing_summary_or_start_are_dropped() {
        let ics = "BEGIN:VEVENT\nDTSTART:20251008T093000\nEND:VEVENT\nBEGIN:VEVENT\nSUMMARY:No start\nEND:VEVENT\nBEGIN:VEVENT\nSUMMARY:Bad start\nDTSTART:tomorrow\nEND:VEVENT\n";
        assert!(parse_ics(ics).is_empty());
    }

    #[test]
    fn end_before_start_is_dropped() {
        let ics = "BEGIN:VEVENT\nSUMMARY:Backwards\nDTSTART:20251008T100000\nDTEND:20251008T090000\nEND:VEVENT\nBEGIN:VEVENT\nSUMMARY:Zero length\nDTSTART:20251008T100000\nDTEND:20251008T100000\nEND:VEVENT\nBEGIN:VEVENT\nSUMMARY:Fine\nDTSTART:20251008T100000\nDTEND:20251008T110000\nEND:VEVENT\n";
        let events = parse_ics(ics);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Fine");
        assert!(events.iter().all(|e| e.validate().is_ok()));
    }

    #[test]
    fn properties_outside_vevent_are_ignored() {
        let ics = "SUMMARY:Calendar name\nBEGIN:VEVENT\nSUMMARY:Inside\nDTSTART:20251008\nEND:VEVENT\nSUMMARY:After\n";
        let events = parse_ics(ics);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Inside");
    }

    #[test]
    fn unterminated_vevent_is_discarded() {
        let ics = "BEGIN:VEVENT\nSUMMARY:Cut off\nDTSTART:20251008T093000\n";
        assert!(parse_ics(ics).is_empty());
    }
}
