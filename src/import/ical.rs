//! Line-level helpers shared by the iCalendar and vCalendar readers.

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};

/// A content line split into its name, parameters and raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyLine<'a> {
    pub name: &'a str,
    pub params: Vec<&'a str>,
    pub value: &'a str,
}

impl PropertyLine<'_> {
    /// Case-insensitive lookup of a `KEY=VALUE` parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.iter().find_map(|p| {
            let (k, v) = p.split_once('=')?;
            k.eq_ignore_ascii_case(key).then_some(v)
        })
    }

    /// Bare `QUOTED-PRINTABLE` is the vCalendar 1.0 shorthand for the parameter.
    pub fn is_quoted_printable(&self) -> bool {
        self.param("ENCODING")
            .is_some_and(|v| v.eq_ignore_ascii_case("QUOTED-PRINTABLE"))
            || self
                .params
                .iter()
                .any(|p| p.eq_ignore_ascii_case("QUOTED-PRINTABLE"))
    }
}

/// Parse a line like "KEY;PARAM=VAL:value", splitting at the first colon.
pub fn parse_property_line(line: &str) -> Option<PropertyLine<'_>> {
    let (key_part, value) = line.split_once(':')?;
    let mut parts = key_part.split(';');
    let name = parts.next()?.trim();
    if name.is_empty() {
        return None;
    }
    Some(PropertyLine {
        name,
        params: parts.collect(),
        value,
    })
}

/// Unfold RFC 5545 continuation lines and drop blank ones. CRLF and LF are
/// both accepted.
pub fn unfold_lines(input: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for line in input.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(rest) = line.strip_prefix(' ').or_else(|| line.strip_prefix('\t')) {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        if line.trim().is_empty() {
            continue;
        }
        lines.push(line.to_string());
    }
    lines
}

pub fn unescape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Calendar time values, as local wall-clock time.
///
/// - `YYYYMMDDThhmmssZ` is UTC and gets converted to local time.
/// - `YYYYMMDDThhmmss` is floating and is taken as local time unchanged.
/// - `YYYYMMDD` is a date and becomes local midnight.
pub fn parse_calendar_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Some(utc) = value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) {
        let naive = parse_floating(utc)?;
        return Some(
            Utc.from_utc_datetime(&naive)
                .with_timezone(&chrono::Local)
                .naive_local(),
        );
    }
    if value.len() == 8 {
        return parse_date(value)?.and_hms_opt(0, 0, 0);
    }
    parse_floating(value)
}

fn parse_floating(value: &str) -> Option<NaiveDateTime> {
    if value.len() != 15 || value.as_bytes()[8] != b'T' {
        return None;
    }
    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y%m%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn property_line_with_params() {
        let line = parse_property_line("DTSTART;TZID=Asia/Shanghai:20251008T093000").unwrap();
        assert_eq!(line.name, "DTSTART");
        assert_eq!(line.param("tzid"), Some("Asia/Shanghai"));
        assert_eq!(line.value, "20251008T093000");
    }

    #[test]
    fn value_keeps_later_colons() {
        let line = parse_property_line("DESCRIPTION:Agenda: 1. intro").unwrap();
        assert_eq!(line.value, "Agenda: 1. intro");
        assert!(parse_property_line("no colon here").is_none());
    }

    #[test]
    fn quoted_printable_detection() {
        let long = parse_property_line("SUMMARY;ENCODING=QUOTED-PRINTABLE;CHARSET=UTF-8:=E9").unwrap();
        let short = parse_property_line("SUMMARY;QUOTED-PRINTABLE:=E9").unwrap();
        let plain = parse_property_line("SUMMARY;CHARSET=UTF-8:x").unwrap();
        assert!(long.is_quoted_printable());
        assert!(short.is_quoted_printable());
        assert!(!plain.is_quoted_printable());
    }

    #[test]
    fn unfold_and_drop_blank_lines() {
        let input = "BEGIN:VEVENT\r\n\r\nSUMMARY:Long\r\n  title\r\nEND:VEVENT\r\n";
        assert_eq!(
            unfold_lines(input),
            vec!["BEGIN:VEVENT", "SUMMARY:Long title", "END:VEVENT"]
        );
    }

    #[test]
    fn unescape() {
        assert_eq!(unescape_text(r"a\, b\; c\nd\\e"), "a, b; c\nd\\e");
    }

    #[test]
    fn floating_time_stays_local() {
        let dt = parse_calendar_time("20251008T093000").unwrap();
        assert_eq!((dt.hour(), dt.minute()), (9, 30));
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2025, 10, 8).unwrap());
    }

    #[test]
    fn utc_time_converts_to_local() {
        let dt = parse_calendar_time("20251008T093000Z").unwrap();
        let expected = Utc
            .with_ymd_and_hms(2025, 10, 8, 9, 30, 0)
            .unwrap()
            .with_timezone(&chrono::Local)
            .naive_local();
        assert_eq!(dt, expected);
    }

    #[test]
    fn date_only_is_midnight() {
        let dt = parse_calendar_time("20251008").unwrap();
        assert_eq!((dt.hour(), dt.minute()), (0, 0));
    }

    #[test]
    fn malformed_times() {
        assert!(parse_calendar_time("2025-10-08").is_none());
        assert!(parse_calendar_time("20251008X093000").is_none());
        assert!(parse_calendar_time("20251340T093000").is_none());
        assert!(parse_calendar_time("").is_none());
    }
}
