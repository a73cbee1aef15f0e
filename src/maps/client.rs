use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use tracing::debug;

use super::layout::Category;
use super::MapsSource;
use crate::config::{self, MapsSettings};
use crate::error::FetchError;

const USER_AGENT: &str = concat!("geotrace/", env!("CARGO_PKG_VERSION"));
const BLOCK_PAGE: &str = "https://www.google.com/sorry/index";

static GAIA_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{21}$").unwrap());

/// Whether `id` looks like a 21-digit account identifier.
pub fn is_gaia_id(id: &str) -> bool {
    GAIA_ID.is_match(id)
}

/// Maps contributions endpoint for one profile.
pub struct MapsClient {
    http: reqwest::Client,
    settings: MapsSettings,
    gaia_id: String,
}

impl MapsClient {
    pub fn new(settings: MapsSettings, gaia_id: &str) -> Result<Self, FetchError> {
        // Redirects stay visible: the block signal is a 302.
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(MapsClient {
            http,
            settings,
            gaia_id: gaia_id.to_string(),
        })
    }

    fn pb(&self, template: &str, token: &str) -> String {
        let vars = HashMap::from([("gaia_id", self.gaia_id.as_str()), ("token", token)]);
        config::render(template, &vars)
    }

    async fn get(&self, pb: &str) -> Result<String, FetchError> {
        debug!("GET {} pb={}", self.settings.base_url, pb);
        let response = self
            .http
            .get(&self.settings.base_url)
            .query(&[("authuser", "0"), ("hl", "en"), ("gl", "us"), ("pb", pb)])
            .send()
            .await?;

        let status = response.status();
        let location = response.headers().get(LOCATION).and_then(|v| v.to_str().ok());
        if let Some(target) = block_target(status.as_u16(), location) {
            return Err(FetchError::BlockedByUpstream(target));
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

impl MapsSource for MapsClient {
    async fn stats(&mut self) -> Result<String, FetchError> {
        let pb = self.pb(&self.settings.templates.stats, "");
        self.get(&pb).await
    }

    async fn page(&mut self, category: Category, token: &str) -> Result<String, FetchError> {
        let templates = self.settings.templates.category(category);
        let template = if token.is_empty() { &templates.first } else { &templates.page };
        debug!("{} page, token {:?}", category.name(), token);
        let pb = self.pb(template, token);
        self.get(&pb).await
    }
}

/// The redirect target when a response is the block redirect.
fn block_target(status: u16, location: Option<&str>) -> Option<String> {
    match location {
        Some(target) if status == 302 && target.starts_with(BLOCK_PAGE) => Some(target.to_string()),
        _ => None,
    }
}
