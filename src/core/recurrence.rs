use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use super::event::{Event, Repeat, RepeatType, generate_event_id};

/// Instances generated when a series has neither an end date nor a count.
pub const DEFAULT_OCCURRENCE_CAP: u32 = 100;

/// Expand a repeating event into its concrete instances.
///
/// Occurrence `n` is `start + n * unit`, computed from the original start so
/// month-end clamping does not drift (Jan 31 -> Feb 28 -> Mar 31). The series
/// stops at whichever comes first: the inclusive `end_date`, `count`
/// instances, or `cap` instances. The first occurrence is always produced,
/// even when `end_date` falls before it.
///
/// Every instance gets a fresh id and a cleared repeat rule. A non-repeating
/// event comes back unchanged as the only element.
pub fn expand(event: &Event, cap: u32) -> Vec<Event> {
    let Some(start) = event.start_time else {
        return vec![event.clone()];
    };
    if !event.repeat.is_active() {
        return vec![event.clone()];
    }

    let limit = event.repeat.count.map_or(cap, |c| c.min(cap)).max(1);
    let duration = event.end_time.map(|end| end - start);

    let mut instances = Vec::new();
    for n in 0..limit {
        let Some(occurrence) = shift(start, event.repeat.kind, n) else {
            break;
        };
        if let Some(end_date) = event.repeat.end_date {
            if n > 0 && occurrence.date() > end_date {
                break;
            }
        }
        instances.push(Event {
            id: generate_event_id(),
            start_time: Some(occurrence),
            end_time: duration.map(|d| occurrence + d),
            repeat: Repeat::default(),
            ..event.clone()
        });
    }
    instances
}

/// Move `start` forward by `n` units of `kind`, keeping the time of day.
pub fn shift(start: NaiveDateTime, kind: RepeatType, n: u32) -> Option<NaiveDateTime> {
    let date = start.date();
    let shifted = match kind {
        RepeatType::None => Some(date),
        RepeatType::Daily => date.checked_add_signed(Duration::days(n as i64)),
        RepeatType::Weekly => date.checked_add_signed(Duration::weeks(n as i64)),
        RepeatType::Monthly => add_months(date, n),
        RepeatType::Yearly => add_months(date, n.checked_mul(12)?),
    }?;
    Some(shifted.and_time(start.time()))
}

fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let total_months = date.month0() + months;
    let new_year = date.year() + (total_months / 12) as i32;
    let new_month = (total_months % 12) + 1;
    // Clamp day to valid range for the new month
    let max_day = days_in_month(new_year, new_month)?;
    NaiveDate::from_ymd_opt(new_year, new_month, date.day().min(max_day))
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first_of_next = NaiveDate::from_ymd_opt(
        if month == 12 { year + 1 } else { year },
        if month == 12 { 1 } else { month + 1 },
        1,
    )?;
    Some(first_of_next.pred_opt()?.day())
}
