use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::event::Event;

/// Named temporal partitions, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Bucket {
    Yesterday,
    Today,
    Tomorrow,
    DayAfterTomorrow,
    /// 3 to 7 days ahead.
    NearFuture,
    /// More than 7 days ahead.
    FarFuture,
    /// Before yesterday.
    Past,
}

impl Bucket {
    pub const ALL: [Bucket; 7] = [
        Self::Yesterday,
        Self::Today,
        Self::Tomorrow,
        Self::DayAfterTomorrow,
        Self::NearFuture,
        Self::FarFuture,
        Self::Past,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Yesterday => "Yesterday",
            Self::Today => "Today",
            Self::Tomorrow => "Tomorrow",
            Self::DayAfterTomorrow => "Day after tomorrow",
            Self::NearFuture => "This week",
            Self::FarFuture => "Later",
            Self::Past => "Past",
        }
    }
}

/// Which bucket an event starting at `start` falls in, relative to `today`.
///
/// Comparison is by calendar day, never by elapsed time.
pub fn bucket_for(start: Option<NaiveDateTime>, today: NaiveDate) -> Bucket {
    let Some(start) = start else {
        return Bucket::Today;
    };
    let day = start.date();
    let yesterday = today - Duration::days(1);
    let tomorrow = today + Duration::days(1);
    let day_after_tomorrow = today + Duration::days(2);
    let one_week_later = today + Duration::days(7);

    if day == today {
        Bucket::Today
    } else if day == yesterday {
        Bucket::Yesterday
    } else if day == tomorrow {
        Bucket::Tomorrow
    } else if day == day_after_tomorrow {
        Bucket::DayAfterTomorrow
    } else if day > day_after_tomorrow && day <= one_week_later {
        Bucket::NearFuture
    } else if day > one_week_later {
        Bucket::FarFuture
    } else {
        Bucket::Past
    }
}

/// Derived agenda view; rebuilt from the store contents on every render.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketedEvents {
    pub yesterday: Vec<Event>,
    pub today: Vec<Event>,
    pub tomorrow: Vec<Event>,
    pub day_after_tomorrow: Vec<Event>,
    pub near_future: Vec<Event>,
    pub far_future: Vec<Event>,
    pub past: Vec<Event>,
}

impl BucketedEvents {
    pub fn build(events: &[Event], now: NaiveDateTime) -> Self {
        let today = now.date();
        let mut view = Self::default();

        for event in events {
            view.bucket_mut(bucket_for(event.start_time, today))
                .push(event.clone());
        }

        for bucket in Bucket::ALL {
            // Incomplete first, then by start; undated sorts as the epoch.
            view.bucket_mut(bucket)
                .sort_by_key(|e| (e.completed, e.start_time.unwrap_or_default()));
        }

        view
    }

    pub fn get(&self, bucket: Bucket) -> &[Event] {
        match bucket {
            Bucket::Yesterday => &self.yesterday,
            Bucket::Today => &self.today,
            Bucket::Tomorrow => &self.tomorrow,
            Bucket::DayAfterTomorrow => &self.day_after_tomorrow,
            Bucket::NearFuture => &self.near_future,
            Bucket::FarFuture => &self.far_future,
            Bucket::Past => &self.past,
        }
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<Event> {
        match bucket {
            Bucket::Yesterday => &mut self.yesterday,
            Bucket::Today => &mut self.today,
            Bucket::Tomorrow => &mut self.tomorrow,
            Bucket::DayAfterTomorrow => &mut self.day_after_tomorrow,
            Bucket::NearFuture => &mut self.near_future,
            Bucket::FarFuture => &mut self.far_future,
            Bucket::Past => &mut self.past,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Bucket, &[Event])> {
        Bucket::ALL.into_iter().map(move |b| (b, self.get(b)))
    }

    pub fn total_count(&self) -> usize {
        self.iter().map(|(_, events)| events.len()).sum()
    }
}
