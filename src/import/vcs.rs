use super::ical::{parse_property_line, unfold_lines};
use super::ics::VeventFields;
use crate::core::event::Event;

/// Parse vCalendar text (1.0 or 2.0) into events.
///
/// Accepts everything `parse_ics` does, and additionally skips VALARM blocks
/// and decodes quoted-printable values, including ones continued over soft
/// line breaks.
pub fn parse_vcs(text: &str) -> Vec<Event> {
    let lines = unfold_lines(text);
    let mut events = Vec::new();
    let mut current: Option<VeventFields> = None;
    let mut in_alarm = false;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        i += 1;

        if line.eq_ignore_ascii_case("VERSION:1.0") {
            log::debug!("vCalendar 1.0 document");
            continue;
        }
        if line.eq_ignore_ascii_case("BEGIN:VALARM") {
            in_alarm = true;
            continue;
        }
        if line.eq_ignore_ascii_case("END:VALARM") {
            in_alarm = false;
            continue;
        }
        if in_alarm {
            continue;
        }
        if line.eq_ignore_ascii_case("BEGIN:VEVENT") {
            current = Some(VeventFields::default());
            continue;
        }
        if line.eq_ignore_ascii_case("END:VEVENT") {
            if let Some(fields) = current.take() {
                match fields.finish() {
                    Ok(event) => events.push(event),
                    Err(e) => log::warn!("Skipping vCalendar event: {}", e),
                }
            }
            continue;
        }
        let Some(fields) = current.as_mut() else {
            continue;
        };
        let Some(property) = parse_property_line(line) else {
            continue;
        };

        if property.is_quoted_printable() {
            let mut raw = property.value.to_string();
            while raw.ends_with('=') && i < lines.len() {
                raw.push('\n');
                raw.push_str(lines[i].trim_end());
                i += 1;
            }
            fields.apply(property.name, &decode_quoted_printable(&raw));
        } else {
            fields.apply(property.name, property.value);
        }
    }

    log::debug!("Parsed {} events from vCalendar text", events.len());
    events
}

/// Decode a quoted-printable value.
///
/// `=XX` becomes the byte 0xXX and `=` before a line break (or at the very
/// end) is a soft break and disappears. Anything else passes through. The
/// bytes are read as UTF-8; if they are not valid UTF-8 each byte becomes
/// one char.
pub fn decode_quoted_printable(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'=' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        match &bytes[i + 1..] {
            [] => i += 1,
            [b'\r', b'\n', ..] => i += 3,
            [b'\n', ..] => i += 2,
            [hi, lo, ..] if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                out.push((hex_value(*hi) << 4) | hex_value(*lo));
                i += 3;
            }
            _ => {
                out.push(b'=');
                i += 1;
            }
        }
    }

    match String::from_utf8(out) {
        Ok(text) => text,
        Err(e) => e.into_bytes().into_iter().map(char::from).collect(),
    }
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}
