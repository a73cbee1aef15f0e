use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::error::RecordSkipped;
use crate::maps::extract_batch;
use crate::models::{Calendar, CalendarEvent, EventTime, Person, ReminderOverride};
use crate::paging::Page;
use crate::payload::Node;

/// An events page carries an `items` sequence; anything else means the
/// calendar exposes no events.
pub fn read_page(tree: &Value) -> Option<Page<CalendarEvent>> {
    let root = Node::new(tree);
    let items = root.key("items");
    if !items.is_list() {
        return None;
    }
    let (records, skipped) = extract_batch(items, extract);
    Some(Page {
        records,
        skipped,
        next_token: root.key("nextPageToken").text(),
    })
}

pub fn extract(item: Node) -> Result<CalendarEvent, RecordSkipped> {
    if item.value().and_then(Value::as_object).is_none() {
        return Err(RecordSkipped::new("event is not an object"));
    }
    let id = item
        .key("id")
        .text()
        .ok_or_else(|| RecordSkipped::new("event has no id"))?;

    let reminders = item.key("reminders");
    Ok(CalendarEvent {
        id,
        status: item.key("status").text().unwrap_or_default(),
        created: timestamp(item.key("created")),
        updated: timestamp(item.key("updated")),
        summary: item.key("summary").text().unwrap_or_default(),
        description: item.key("description").text().unwrap_or_default(),
        location: item.key("location").text().unwrap_or_default(),
        creator: person(item.key("creator")),
        organizer: person(item.key("organizer")),
        start: event_time(item.key("start")),
        end: event_time(item.key("end")),
        recurring_event_id: item.key("recurringEventId").text(),
        recurrence: item.key("recurrence").items().filter_map(|r| r.text()).collect(),
        reminders_use_default: reminders.key("useDefault").bool().unwrap_or(false),
        reminder_overrides: reminders
            .key("overrides")
            .items()
            .filter_map(|o| {
                Some(ReminderOverride {
                    method: o.key("method").text()?,
                    minutes: o.key("minutes").i64()?,
                })
            })
            .collect(),
    })
}

/// Calendar resource metadata.
pub fn read_calendar(tree: &Value) -> Option<Calendar> {
    let root = Node::new(tree);
    Some(Calendar {
        id: root.key("id").text()?,
        summary: root.key("summary").text().unwrap_or_default(),
        time_zone: root.key("timeZone").text(),
    })
}

fn timestamp(node: Node) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(node.str()?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn person(node: Node) -> Person {
    Person {
        email: node.key("email").text(),
        display_name: node.key("displayName").text(),
        is_self: node.key("self").bool().unwrap_or(false),
    }
}

fn event_time(node: Node) -> EventTime {
    EventTime {
        date_time: timestamp(node.key("dateTime")),
        date: node
            .key("date")
            .str()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
        time_zone: node.key("timeZone").text(),
    }
}
