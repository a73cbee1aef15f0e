pub mod client;
pub mod layout;
pub mod photos;
pub mod place;
pub mod preferences;
pub mod reviews;
pub mod stats;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{FetchError, RecordSkipped};
use crate::models::{Photo, PlaceLocation, Review};
use crate::paging::{Collected, PageSource, Pager};
use crate::payload::Node;
use layout::Category;
use stats::Stats;

/// Raw bodies for one contributor profile.
pub trait MapsSource {
    async fn stats(&mut self) -> Result<String, FetchError>;
    async fn page(&mut self, category: Category, token: &str) -> Result<String, FetchError>;
}

/// One category of a [`MapsSource`], seen as a page stream.
struct CategoryPages<'a, S> {
    source: &'a mut S,
    category: Category,
}

impl<S: MapsSource> PageSource for CategoryPages<'_, S> {
    async fn fetch(&mut self, token: &str) -> Result<String, FetchError> {
        self.source.page(self.category, token).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapsStatus {
    /// Upstream redirected to its block page.
    Failed,
    /// No statistics, or nothing to page through.
    Empty,
    /// Statistics exist but a category's detail payload is structurally absent.
    Private,
    Ok,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapsReport {
    pub status: MapsStatus,
    pub stats: Stats,
    pub reviews: Collected<Review>,
    pub photos: Collected<Photo>,
}

impl MapsReport {
    fn new(status: MapsStatus, stats: Stats) -> Self {
        MapsReport {
            status,
            stats,
            reviews: Collected::not_requested(),
            photos: Collected::not_requested(),
        }
    }

    pub fn places(&self) -> impl Iterator<Item = &PlaceLocation> {
        self.reviews
            .records
            .iter()
            .map(|r| &r.location)
            .chain(self.photos.records.iter().map(|p| &p.location))
    }
}

/// Map every card through `extract`, counting the ones that do not fit
/// instead of failing the page.
pub(crate) fn extract_batch<R, F>(cards: Node, extract: F) -> (Vec<R>, usize)
where
    F: Fn(Node) -> Result<R, RecordSkipped>,
{
    let mut records = Vec::with_capacity(cards.len());
    let mut skipped = 0;
    for (i, card) in cards.items().enumerate() {
        match extract(card) {
            Ok(record) => records.push(record),
            Err(e) => {
                debug!("Card {}: {}", i, e);
                skipped += 1;
            }
        }
    }
    (records, skipped)
}

/// Fetch statistics, then reviews and photos, page by page.
///
/// Blocking is reported as [`MapsStatus::Failed`] rather than an error so it
/// is never confused with an empty or private profile. A first page that
/// cannot be fetched or decoded is an error the caller may retry.
pub async fn collect<S: MapsSource>(source: &mut S, pager: &Pager) -> Result<MapsReport, FetchError> {
    let stats = match source.stats().await.and_then(|body| pager.decode(&body)) {
        Ok(tree) => stats::parse(&tree),
        Err(e) if e.is_blocked() => {
            warn!("Statistics request was blocked: {}", e);
            return Ok(MapsReport::new(MapsStatus::Failed, Stats::default()));
        }
        Err(e) => return Err(e),
    };

    let Some(stats) = stats.filter(|s| s.contributions() > 0) else {
        info!("Profile has no reviews, ratings or photos");
        return Ok(MapsReport::new(MapsStatus::Empty, Stats::default()));
    };
    info!("Profile advertises {} contributions", stats.contributions());

    let mut report = MapsReport::new(MapsStatus::Ok, stats);

    let reviews = pager
        .collect(&mut CategoryPages { source: &mut *source, category: Category::Reviews }, reviews::read_page)
        .await;
    match reviews {
        Ok(reviews) => report.reviews = reviews,
        Err(e) if e.is_blocked() => return Ok(blocked(report, e)),
        Err(e) => return Err(e),
    }

    let photos = pager
        .collect(&mut CategoryPages { source: &mut *source, category: Category::Photos }, photos::read_page)
        .await;
    match photos {
        Ok(photos) => report.photos = photos,
        Err(e) if e.is_blocked() => return Ok(blocked(report, e)),
        Err(e) => return Err(e),
    }

    info!(
        "Reviews: {} over {} pages ({} skipped), photos: {} over {} pages ({} skipped)",
        report.reviews.records.len(),
        report.reviews.pages,
        report.reviews.skipped,
        report.photos.records.len(),
        report.photos.pages,
        report.photos.skipped
    );

    if report.reviews.is_absent() || report.photos.is_absent() {
        report.status = MapsStatus::Private;
    }
    Ok(report)
}

fn blocked(mut report: MapsReport, e: FetchError) -> MapsReport {
    warn!("Paging was blocked: {}", e);
    report.status = MapsStatus::Failed;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paging::PageEnd;
    use crate::payload::DEFAULT_PREFIX_LEN;
    use std::collections::HashMap;
    use tokio_util::sync::CancellationToken;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.txt", name)).unwrap()
    }

    #[derive(Default)]
    struct FakeProfile {
        stats: Option<String>,
        pages: HashMap<(Category, String), String>,
        blocked: Option<(Category, String)>,
        requested: Vec<(Category, String)>,
    }

    impl FakeProfile {
        fn page(mut self, category: Category, token: &str, body: String) -> Self {
            self.pages.insert((category, token.to_string()), body);
            self
        }
    }

    impl MapsSource for FakeProfile {
        async fn stats(&mut self) -> Result<String, FetchError> {
            self.stats
                .clone()
                .ok_or_else(|| FetchError::BlockedByUpstream("https://www.google.com/sorry/index".into()))
        }

        async fn page(&mut self, category: Category, token: &str) -> Result<String, FetchError> {
            let key = (category, token.to_string());
            self.requested.push(key.clone());
            if self.blocked.as_ref() == Some(&key) {
                return Err(FetchError::BlockedByUpstream("https://www.google.com/sorry/index".into()));
            }
            self.pages.get(&key).cloned().ok_or(FetchError::Status(404))
        }
    }

    fn pager() -> Pager {
        Pager::new(DEFAULT_PREFIX_LEN, CancellationToken::new())
    }

    fn absent_page() -> String {
        ")]}'\n[null,null]".to_string()
    }

    #[tokio::test]
    async fn legacy_reviews_with_empty_follow_up_page() {
        let mut source = FakeProfile {
            stats: Some(fixture("stats")),
            ..Default::default()
        }
        .page(Category::Reviews, "", fixture("reviews_legacy"))
        .page(Category::Reviews, "CAESBkVnSUlDZw", fixture("reviews_empty"))
        .page(Category::Photos, "", fixture("photos_legacy"));

        let report = collect(&mut source, &pager()).await.unwrap();
        assert_eq!(report.status, MapsStatus::Ok);
        assert_eq!(report.reviews.records.len(), 2);
        assert_eq!(report.reviews.skipped, 1);
        assert_eq!(report.reviews.end, PageEnd::EmptyPage);
        assert_eq!(report.photos.records.len(), 2);
        assert_eq!(source.requested.len(), 3);
    }

    #[tokio::test]
    async fn reviews_then_photos() {
        let mut source = FakeProfile {
            stats: Some(fixture("stats")),
            ..Default::default()
        }
        .page(Category::Reviews, "", fixture("reviews_current"))
        .page(Category::Photos, "", fixture("photos_legacy"));

        let report = collect(&mut source, &pager()).await.unwrap();
        assert_eq!(report.status, MapsStatus::Ok);
        assert_eq!(report.reviews.end, PageEnd::Exhausted);
        assert_eq!(report.photos.records.len(), 2);
        assert_eq!(report.places().count(), 4);
        assert_eq!(
            source.requested,
            vec![(Category::Reviews, String::new()), (Category::Photos, String::new())]
        );
    }

    #[tokio::test]
    async fn blocked_stats_is_failed() {
        let mut source = FakeProfile::default();
        let report = collect(&mut source, &pager()).await.unwrap();
        assert_eq!(report.status, MapsStatus::Failed);
        assert!(source.requested.is_empty());
    }

    #[tokio::test]
    async fn blocked_page_is_failed_not_empty() {
        let mut source = FakeProfile {
            stats: Some(fixture("stats")),
            blocked: Some((Category::Photos, String::new())),
            ..Default::default()
        }
        .page(Category::Reviews, "", fixture("reviews_current"));

        let report = collect(&mut source, &pager()).await.unwrap();
        assert_eq!(report.status, MapsStatus::Failed);
        assert_eq!(report.reviews.records.len(), 2);
    }

    #[tokio::test]
    async fn zero_counters_are_empty() {
        let mut source = FakeProfile {
            stats: Some(fixture("stats_empty")),
            ..Default::default()
        };
        let report = collect(&mut source, &pager()).await.unwrap();
        assert_eq!(report.status, MapsStatus::Empty);
        assert!(source.requested.is_empty());
    }

    #[tokio::test]
    async fn missing_detail_payloads_are_private() {
        let mut source = FakeProfile {
            stats: Some(fixture("stats")),
            ..Default::default()
        }
        .page(Category::Reviews, "", absent_page())
        .page(Category::Photos, "", absent_page());

        let report = collect(&mut source, &pager()).await.unwrap();
        assert_eq!(report.status, MapsStatus::Private);
    }

    #[tokio::test]
    async fn one_missing_category_is_private() {
        let mut source = FakeProfile {
            stats: Some(fixture("stats")),
            ..Default::default()
        }
        .page(Category::Reviews, "", absent_page())
        .page(Category::Photos, "", fixture("photos_legacy"));

        let report = collect(&mut source, &pager()).await.unwrap();
        assert_eq!(report.status, MapsStatus::Private);
        assert!(report.reviews.is_absent());
        assert_eq!(report.photos.records.len(), 2);
    }

    #[tokio::test]
    async fn empty_legacy_first_page_is_private() {
        let mut source = FakeProfile {
            stats: Some(fixture("stats")),
            ..Default::default()
        }
        .page(Category::Reviews, "", fixture("reviews_empty"))
        .page(Category::Photos, "", fixture("photos_legacy"));

        let report = collect(&mut source, &pager()).await.unwrap();
        assert_eq!(report.status, MapsStatus::Private);
        assert_eq!(report.reviews.end, PageEnd::Absent);
        assert_eq!(report.reviews.pages, 0);
    }

    #[tokio::test]
    async fn malformed_first_page_is_an_error() {
        let mut source = FakeProfile {
            stats: Some(fixture("stats")),
            ..Default::default()
        }
        .page(Category::Reviews, "", ")]}'\n[[".to_string());

        let err = collect(&mut source, &pager()).await.unwrap_err();
        assert!(matches!(err, FetchError::MalformedPayload(_)));
    }
}
