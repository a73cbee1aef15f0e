pub mod client;
pub mod dedup;
pub mod extract;

use itertools::Itertools;
use serde::Serialize;
use tracing::info;

use crate::error::FetchError;
use crate::models::{Calendar, CalendarEvent};
use crate::paging::{Collected, PageSource, Pager};

/// Events endpoint plus the calendar resource it belongs to.
pub trait CalendarSource: PageSource {
    /// Raw calendar resource, `None` when the calendar does not exist or is
    /// not shared.
    async fn calendar(&mut self) -> Result<Option<String>, FetchError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarReport {
    pub calendar: Calendar,
    pub events: Collected<CalendarEvent>,
}

/// Calendar metadata and every event page. `Ok(None)` when there is no
/// public calendar for the address.
pub async fn collect<S: CalendarSource>(
    source: &mut S,
    pager: &Pager,
) -> Result<Option<CalendarReport>, FetchError> {
    let Some(body) = source.calendar().await? else {
        info!("No public calendar");
        return Ok(None);
    };
    let Some(calendar) = extract::read_calendar(&pager.decode(&body)?) else {
        info!("Calendar resource has no id");
        return Ok(None);
    };

    let events = pager.collect(source, extract::read_page).await?;
    info!(
        "Calendar {}: {} events over {} pages ({} skipped)",
        calendar.id,
        events.records.len(),
        events.pages,
        events.skipped
    );
    Ok(Some(CalendarReport { calendar, events }))
}

/// Display names the address has created events under, other than `known`.
pub fn other_names(events: &[CalendarEvent], email: &str, known: Option<&str>) -> Vec<String> {
    events
        .iter()
        .filter(|e| e.creator.email.as_deref() == Some(email))
        .filter_map(|e| e.creator.display_name.as_deref())
        .filter(|name| Some(*name) != known)
        .unique()
        .sorted()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paging::PageEnd;
    use std::collections::HashMap;
    use tokio_util::sync::CancellationToken;

    struct FakeCalendar {
        resource: Option<String>,
        pages: HashMap<String, String>,
        requested: Vec<String>,
    }

    impl FakeCalendar {
        fn new(resource: Option<&str>, pages: &[(&str, String)]) -> Self {
            FakeCalendar {
                resource: resource.map(str::to_string),
                pages: pages.iter().map(|(t, b)| (t.to_string(), b.clone())).collect(),
                requested: Vec::new(),
            }
        }
    }

    impl PageSource for FakeCalendar {
        async fn fetch(&mut self, token: &str) -> Result<String, FetchError> {
            self.requested.push(token.to_string());
            self.pages.get(token).cloned().ok_or(FetchError::Status(404))
        }
    }

    impl CalendarSource for FakeCalendar {
        async fn calendar(&mut self) -> Result<Option<String>, FetchError> {
            Ok(self.resource.clone())
        }
    }

    const RESOURCE: &str = r#"{"id":"jane.doe@example.com","summary":"jane.doe@example.com","timeZone":"Europe/Paris"}"#;

    fn pager() -> Pager {
        Pager::new(0, CancellationToken::new())
            .raw_tokens()
            .follow_empty_pages()
    }

    fn events_fixture() -> String {
        std::fs::read_to_string("tests/fixtures/calendar_events.json").unwrap()
    }

    #[tokio::test]
    async fn follows_page_tokens_until_exhausted() {
        let last = r#"{"items":[{"id":"evt-late","status":"confirmed","summary":"Standup","updated":"2023-06-01T00:00:00Z"}]}"#;
        let mut source = FakeCalendar::new(
            Some(RESOURCE),
            &[("", events_fixture()), ("EjYKKzBtc2RoZzQ=", last.to_string())],
        );

        let report = collect(&mut source, &pager()).await.unwrap().unwrap();
        assert_eq!(report.calendar.time_zone.as_deref(), Some("Europe/Paris"));
        assert_eq!(report.events.records.len(), 5);
        assert_eq!(report.events.skipped, 2);
        assert_eq!(report.events.end, PageEnd::Exhausted);
        assert_eq!(source.requested, vec!["", "EjYKKzBtc2RoZzQ="]);

        let kept = dedup::latest_confirmed(&report.events.records);
        let ids: Vec<&str> = kept.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["evt-late", "evt-holiday"]);
    }

    #[tokio::test]
    async fn empty_page_with_a_token_is_not_the_end() {
        let first = r#"{"items":[],"nextPageToken":"t2"}"#;
        let second = r#"{"items":[{"id":"evt-1","status":"confirmed","summary":"Dentist","updated":"2023-02-01T09:00:00Z"}]}"#;
        let mut source = FakeCalendar::new(
            Some(RESOURCE),
            &[("", first.to_string()), ("t2", second.to_string())],
        );

        let report = collect(&mut source, &pager()).await.unwrap().unwrap();
        assert_eq!(report.events.records.len(), 1);
        assert_eq!(report.events.records[0].id, "evt-1");
        assert_eq!(report.events.end, PageEnd::Exhausted);
        assert_eq!(source.requested, vec!["", "t2"]);
    }

    #[tokio::test]
    async fn missing_calendar_fetches_no_events() {
        let mut source = FakeCalendar::new(None, &[("", events_fixture())]);
        assert!(collect(&mut source, &pager()).await.unwrap().is_none());
        assert!(source.requested.is_empty());
    }

    #[test]
    fn other_names_skip_the_known_one() {
        let raw = events_fixture();
        let page = extract::read_page(&crate::payload::decode(&raw, 0).unwrap()).unwrap();

        let names = other_names(&page.records, "jane.doe@example.com", Some("Jane D."));
        assert_eq!(names, vec!["Janie"]);

        let names = other_names(&page.records, "jane.doe@example.com", None);
        assert_eq!(names, vec!["Jane D.", "Janie"]);

        assert!(other_names(&page.records, "someone@else.org", None).is_empty());
    }
}
