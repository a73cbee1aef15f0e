use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::payload;

/// Records pulled from one page, plus the raw cursor it advertises.
#[derive(Debug)]
pub struct Page<R> {
    pub records: Vec<R>,
    pub skipped: usize,
    pub next_token: Option<String>,
}

/// Hands out raw bodies for a paginated category. The first page is
/// requested with an empty token.
pub trait PageSource {
    async fn fetch(&mut self, token: &str) -> Result<String, FetchError>;
}

/// Why a category stopped paging.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum PageEnd {
    /// The last page carried no cursor.
    Exhausted,
    /// A page produced zero records.
    EmptyPage,
    /// The first page had no recognizable layout.
    Absent,
    Cancelled,
    /// A later page failed; earlier pages are kept.
    Aborted(String),
    /// The run stopped before this category was requested.
    NotRequested,
}

#[derive(Debug, Clone, Serialize)]
pub struct Collected<R> {
    pub records: Vec<R>,
    pub skipped: usize,
    pub pages: usize,
    pub end: PageEnd,
}

impl<R> Collected<R> {
    pub fn not_requested() -> Self {
        Collected {
            records: Vec::new(),
            skipped: 0,
            pages: 0,
            end: PageEnd::NotRequested,
        }
    }

    pub fn is_absent(&self) -> bool {
        self.end == PageEnd::Absent
    }
}

/// Cursors are reused as request parameters without their base64 padding.
pub fn normalize_token(raw: &str) -> Option<String> {
    let token = raw.trim_end_matches('=');
    (!token.is_empty()).then(|| token.to_string())
}

/// Sequential page walker: page N+1 is only requested once page N has been
/// decoded, since its cursor lives inside page N.
#[derive(Debug, Clone)]
pub struct Pager {
    skip: usize,
    cancel: CancellationToken,
    trim_tokens: bool,
    stop_on_empty: bool,
}

impl Pager {
    pub fn new(skip: usize, cancel: CancellationToken) -> Self {
        Pager {
            skip,
            cancel,
            trim_tokens: true,
            stop_on_empty: true,
        }
    }

    /// Send cursors back exactly as the page advertised them.
    pub fn raw_tokens(mut self) -> Self {
        self.trim_tokens = false;
        self
    }

    /// Keep following the cursor past pages with no records.
    pub fn follow_empty_pages(mut self) -> Self {
        self.stop_on_empty = false;
        self
    }

    pub fn decode(&self, body: &str) -> Result<Value, FetchError> {
        Ok(payload::decode(body, self.skip)?)
    }

    /// Walk every page of `source`, reading each decoded tree with `read`.
    ///
    /// `read` returns `None` when the tree has no layout it recognizes. A block
    /// redirect on any page, or any failure on the first page, is returned as
    /// an error; failures on later pages end the walk with
    /// [`PageEnd::Aborted`] and keep what was already collected.
    pub async fn collect<S, R, F>(&self, source: &mut S, read: F) -> Result<Collected<R>, FetchError>
    where
        S: PageSource,
        F: Fn(&Value) -> Option<Page<R>>,
    {
        let mut out = Collected {
            records: Vec::new(),
            skipped: 0,
            pages: 0,
            end: PageEnd::Exhausted,
        };
        let mut token = String::new();

        loop {
            if self.cancel.is_cancelled() {
                out.end = PageEnd::Cancelled;
                break;
            }

            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                body = source.fetch(&token) => Some(body),
            };
            let Some(body) = fetched else {
                info!("Paging cancelled after {} pages", out.pages);
                out.end = PageEnd::Cancelled;
                break;
            };

            let tree = body.and_then(|b| self.decode(&b));
            let tree = match tree {
                Ok(tree) => tree,
                Err(e) if e.is_blocked() || out.pages == 0 => return Err(e),
                Err(e) => {
                    warn!("Page {} failed, keeping {} records: {}", out.pages + 1, out.records.len(), e);
                    out.end = PageEnd::Aborted(e.to_string());
                    break;
                }
            };

            let Some(page) = read(&tree) else {
                out.end = if out.pages == 0 {
                    PageEnd::Absent
                } else {
                    PageEnd::EmptyPage
                };
                break;
            };
            out.pages += 1;
            out.skipped += page.skipped;

            if page.records.is_empty() && self.stop_on_empty {
                debug!("Page {} is empty, stopping", out.pages);
                out.end = PageEnd::EmptyPage;
                break;
            }
            debug!(
                "Page {}: {} records ({} skipped)",
                out.pages,
                page.records.len(),
                page.skipped
            );
            out.records.extend(page.records);

            let next = match page.next_token {
                Some(raw) if self.trim_tokens => normalize_token(&raw),
                other => other.filter(|t| !t.is_empty()),
            };
            match next {
                Some(next) => token = next,
                None => {
                    out.end = PageEnd::Exhausted;
                    break;
                }
            }
        }

        Ok(out)
    }
}
