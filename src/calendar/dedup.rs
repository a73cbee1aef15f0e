use std::collections::HashMap;

use crate::models::CalendarEvent;

const CONFIRMED: &str = "confirmed";

/// One confirmed event per summary: the most recently updated one.
///
/// Summaries appear in the order they were first seen. An event without an
/// `updated` timestamp never displaces one that has it.
pub fn latest_confirmed(events: &[CalendarEvent]) -> Vec<&CalendarEvent> {
    let mut order: Vec<&str> = Vec::new();
    let mut best: HashMap<&str, &CalendarEvent> = HashMap::new();

    for event in events.iter().filter(|e| e.status == CONFIRMED) {
        let key = event.summary.as_str();
        match best.get(key) {
            None => {
                order.push(key);
                best.insert(key, event);
            }
            Some(kept) if event.updated > kept.updated => {
                best.insert(key, event);
            }
            Some(_) => {}
        }
    }

    order.into_iter().filter_map(|k| best.get(k).copied()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventTime, Person};
    use chrono::{DateTime, TimeZone, Utc};

    fn event(id: &str, summary: &str, status: &str, updated: Option<DateTime<Utc>>) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            status: status.to_string(),
            created: None,
            updated,
            summary: summary.to_string(),
            description: String::new(),
            location: String::new(),
            creator: Person::default(),
            organizer: Person::default(),
            start: EventTime::default(),
            end: EventTime::default(),
            recurring_event_id: None,
            recurrence: Vec::new(),
            reminders_use_default: false,
            reminder_overrides: Vec::new(),
        }
    }

    fn at(day: u32) -> Option<DateTime<Utc>> {
        Utc.with_ymd_and_hms(2023, 1, day, 9, 0, 0).single()
    }

    fn ids<'a>(events: &[&'a CalendarEvent]) -> Vec<&'a str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn later_update_wins() {
        let events = vec![
            event("t1", "Standup", CONFIRMED, at(1)),
            event("t2", "Standup", CONFIRMED, at(2)),
        ];
        assert_eq!(ids(&latest_confirmed(&events)), vec!["t2"]);

        let reversed = vec![events[1].clone(), events[0].clone()];
        assert_eq!(ids(&latest_confirmed(&reversed)), vec!["t2"]);
    }

    #[test]
    fn undated_event_never_displaces_a_dated_one() {
        let events = vec![
            event("undated", "Standup", CONFIRMED, None),
            event("dated", "Standup", CONFIRMED, at(1)),
            event("undated-again", "Standup", CONFIRMED, None),
        ];
        assert_eq!(ids(&latest_confirmed(&events)), vec!["dated"]);
    }

    #[test]
    fn undated_event_survives_alone() {
        let events = vec![event("solo", "", CONFIRMED, None)];
        assert_eq!(ids(&latest_confirmed(&events)), vec!["solo"]);
    }

    #[test]
    fn only_confirmed_events_count() {
        let events = vec![
            event("a", "Offsite", "cancelled", at(5)),
            event("b", "Offsite", "tentative", at(6)),
            event("c", "Lunch", CONFIRMED, at(1)),
            event("d", "", CONFIRMED, at(2)),
        ];
        assert_eq!(ids(&latest_confirmed(&events)), vec!["c", "d"]);
    }
}
