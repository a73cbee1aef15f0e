use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;

use super::CalendarSource;
use crate::config::CalendarSettings;
use crate::error::FetchError;
use crate::paging::PageSource;

const USER_AGENT: &str = concat!("geotrace/", env!("CARGO_PKG_VERSION"));
const MAX_RESULTS: &str = "2500";
const TIME_MIN: &str = "1970-01-01T00:00:00Z";

/// Calendar API access for one address.
pub struct CalendarClient {
    http: reqwest::Client,
    settings: CalendarSettings,
    email: String,
}

impl CalendarClient {
    pub fn new(settings: CalendarSettings, email: &str) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(CalendarClient {
            http,
            settings,
            email: email.to_string(),
        })
    }

    fn url(&self, suffix: &str) -> String {
        format!(
            "{}/calendars/{}{}",
            self.settings.base_url.trim_end_matches('/'),
            self.email,
            suffix
        )
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<reqwest::Response, FetchError> {
        debug!("GET {}", url);
        let mut request = self.http.get(url).query(query);
        if let Some(token) = &self.settings.access_token {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }
}

impl CalendarSource for CalendarClient {
    async fn calendar(&mut self) -> Result<Option<String>, FetchError> {
        let response = self.get(&self.url(""), &[]).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(response.text().await?)),
            s => Err(FetchError::Status(s.as_u16())),
        }
    }
}

impl PageSource for CalendarClient {
    async fn fetch(&mut self, token: &str) -> Result<String, FetchError> {
        let mut query = vec![
            ("singleEvents", "true"),
            ("maxResults", MAX_RESULTS),
            ("timeMin", TIME_MIN),
        ];
        if !token.is_empty() {
            query.push(("pageToken", token));
        }
        let response = self.get(&self.url("/events"), &query).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}
