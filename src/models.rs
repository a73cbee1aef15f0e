use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GeoPosition { latitude, longitude }
    }

    /// Bit-exact key, so positions can live in hash sets.
    pub fn key(&self) -> (u64, u64) {
        (self.latitude.to_bits(), self.longitude.to_bits())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaceLocation {
    pub id: Option<String>,
    pub name: String,
    pub address: String,
    pub position: Option<GeoPosition>,
    pub types: Vec<String>,
    pub tags: Vec<String>,
    pub cost_level: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    pub id: String,
    pub date: Option<DateTime<Utc>>,
    pub rating: Option<f64>,
    pub comment: Option<String>,
    pub location: PlaceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Photo {
    pub id: String,
    pub url: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub location: PlaceLocation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Person {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub is_self: bool,
}

/// Either a timed instant or an all-day date, with the zone it was set in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventTime {
    pub date_time: Option<DateTime<Utc>>,
    pub date: Option<NaiveDate>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderOverride {
    pub method: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    pub id: String,
    pub status: String,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub summary: String,
    pub description: String,
    pub location: String,
    pub creator: Person,
    pub organizer: Person,
    pub start: EventTime,
    pub end: EventTime,
    pub recurring_event_id: Option<String>,
    pub recurrence: Vec<String>,
    pub reminders_use_default: bool,
    pub reminder_overrides: Vec<ReminderOverride>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Calendar {
    pub id: String,
    pub summary: String,
    pub time_zone: Option<String>,
}
