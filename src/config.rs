use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use config::Config;
use serde::Deserialize;

use crate::maps::layout::Category;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub maps: MapsSettings,
    pub calendar: CalendarSettings,
    pub geocode: GeocodeSettings,
    pub radius_km: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapsSettings {
    pub base_url: String,
    /// Anti-hijacking prefix in front of every body.
    pub prefix_len: usize,
    pub timeout_secs: u64,
    /// `pb` request templates keyed `stats`, `reviews.first`, `reviews.page`,
    /// `photos.first`, `photos.page`.
    pub templates: MapsTemplates,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapsTemplates {
    pub stats: String,
    pub reviews: PageTemplates,
    pub photos: PageTemplates,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageTemplates {
    pub first: String,
    pub page: String,
}

impl MapsTemplates {
    pub fn category(&self, category: Category) -> &PageTemplates {
        match category {
            Category::Reviews => &self.reviews,
            Category::Photos => &self.photos,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarSettings {
    pub base_url: String,
    #[serde(default)]
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeSettings {
    pub base_url: String,
    pub user_agent: String,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub attempt_timeout_secs: u64,
    pub overall_timeout_secs: u64,
}

impl GeocodeSettings {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_secs(self.overall_timeout_secs)
    }
}

const DEFAULTS: &[(&str, &str)] = &[
    ("maps.base_url", "https://www.google.com/locationhistory/preview/mas"),
    ("maps.templates.stats", "!1s{gaia_id}!2m3!1s!7e81!15i14416!6m2!4b1!7b1!9m0"),
    ("maps.templates.reviews.first", "!1s{gaia_id}!2m3!1s!7e81!15i14416!6m2!4b1!7b1!9m0!16m4!1i100!4b1!5b1!6b0"),
    ("maps.templates.reviews.page", "!1s{gaia_id}!2m3!1s!7e81!15i14416!6m2!4b1!7b1!9m0!16m4!1i100!4b1!5b1!6s{token}"),
    ("maps.templates.photos.first", "!1s{gaia_id}!2m3!1s!7e81!15i14416!6m2!4b1!7b1!9m0!16m4!1i100!4b1!5b1!6b0!17m1!1b1"),
    ("maps.templates.photos.page", "!1s{gaia_id}!2m3!1s!7e81!15i14416!6m2!4b1!7b1!9m0!16m4!1i100!4b1!5b1!6s{token}!17m1!1b1"),
    ("calendar.base_url", "https://clients6.google.com/calendar/v3"),
    ("geocode.base_url", "https://nominatim.openstreetmap.org"),
    ("geocode.user_agent", concat!("geotrace/", env!("CARGO_PKG_VERSION"))),
];

/// Built-in defaults, overridden by `GEOTRACE_*` environment variables
/// (`GEOTRACE_MAPS__PREFIX_LEN=5`, `GEOTRACE_RADIUS_KM=50`, ...).
pub fn load() -> Result<Settings> {
    let mut builder = Config::builder()
        .set_default("maps.prefix_len", 5)?
        .set_default("maps.timeout_secs", 30)?
        .set_default("calendar.timeout_secs", 30)?
        .set_default("geocode.max_retries", 3)?
        .set_default("geocode.base_backoff_ms", 1000)?
        .set_default("geocode.attempt_timeout_secs", 10)?
        .set_default("geocode.overall_timeout_secs", 60)?
        .set_default("radius_km", 30.0)?;
    for (key, value) in DEFAULTS {
        builder = builder.set_default(*key, *value)?;
    }

    builder
        .add_source(
            config::Environment::with_prefix("GEOTRACE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to read settings")?
        .try_deserialize()
        .context("Invalid settings")
}

/// Fill `{name}` placeholders in a request template.
pub fn render(template: &str, vars: &HashMap<&str, &str>) -> String {
    vars.iter().fold(template.to_string(), |out, (name, value)| {
        out.replace(&format!("{{{}}}", name), value)
    })
}
