use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::GeocodeSettings;
use crate::error::GeocodeError;
use crate::models::GeoPosition;

/// Address fields tried for the town, in order.
const TOWN_FIELDS: &[&str] = &["city", "village", "town", "municipality"];

/// Turns coordinates into raw address components.
pub trait ReverseGeocoder {
    async fn reverse(&self, position: GeoPosition) -> Result<HashMap<String, String>, GeocodeError>;
}

pub struct NominatimClient {
    http: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(settings: &GeocodeSettings) -> Result<Self, GeocodeError> {
        // Nominatim's usage policy requires an identifying agent.
        let http = reqwest::Client::builder()
            .user_agent(&settings.user_agent)
            .build()?;
        Ok(NominatimClient {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl ReverseGeocoder for NominatimClient {
    async fn reverse(&self, position: GeoPosition) -> Result<HashMap<String, String>, GeocodeError> {
        let lat = position.latitude.to_string();
        let lon = position.longitude.to_string();
        let response = self
            .http
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("format", "jsonv2"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("accept-language", "en"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }
        let body: Value = response.json().await?;
        Ok(address_fields(&body))
    }
}

/// String components of the response's `address` object; empty when the
/// point has no address (open sea, for instance).
fn address_fields(body: &Value) -> HashMap<String, String> {
    body.get("address")
        .and_then(Value::as_object)
        .map(|address| {
            address
                .iter()
                .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub town: Option<String>,
    pub country: Option<String>,
}

/// Best-effort (town, country). `None` when the address has neither.
pub fn sanitize_address(address: &HashMap<String, String>) -> Option<Place> {
    let town = TOWN_FIELDS.iter().find_map(|f| address.get(*f)).cloned();
    let country = address.get("country").cloned();
    if town.is_none() && country.is_none() {
        return None;
    }
    Some(Place { town, country })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Resolution {
    Resolved { place: Place },
    /// The geocoder answered with nothing usable.
    Unnamed,
    /// Every attempt failed or the overall deadline passed.
    GeocodeUnavailable,
}

impl Resolution {
    pub fn place(&self) -> Option<&Place> {
        match self {
            Resolution::Resolved { place } => Some(place),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub attempt_timeout: Duration,
    pub overall_timeout: Duration,
}

impl From<&GeocodeSettings> for RetryPolicy {
    fn from(settings: &GeocodeSettings) -> Self {
        RetryPolicy {
            max_retries: settings.max_retries,
            base_backoff: Duration::from_millis(settings.base_backoff_ms),
            attempt_timeout: settings.attempt_timeout(),
            overall_timeout: settings.overall_timeout(),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Reverse-geocode `position` with bounded retry.
pub async fn resolve<G: ReverseGeocoder>(geocoder: &G, position: GeoPosition, policy: &RetryPolicy) -> Resolution {
    let attempts = async {
        for attempt in 0..=policy.max_retries {
            let result = match tokio::time::timeout(policy.attempt_timeout, geocoder.reverse(position)).await {
                Ok(result) => result,
                Err(_) => Err(GeocodeError::Timeout),
            };
            match result {
                Ok(address) => {
                    return match sanitize_address(&address) {
                        Some(place) => Resolution::Resolved { place },
                        None => {
                            debug!("No town or country at {:?}", position);
                            Resolution::Unnamed
                        }
                    };
                }
                Err(e) if attempt < policy.max_retries => {
                    let backoff = policy.backoff(attempt);
                    warn!(
                        "Geocoding failed (attempt {}/{}), backing off {:.1}s: {}",
                        attempt + 1,
                        policy.max_retries + 1,
                        backoff.as_secs_f64(),
                        e
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => warn!("Geocoding gave up after {} attempts: {}", attempt + 1, e),
            }
        }
        Resolution::GeocodeUnavailable
    };

    tokio::time::timeout(policy.overall_timeout, attempts)
        .await
        .unwrap_or_else(|_| {
            warn!("Geocoding {:?} exceeded {:?}", position, policy.overall_timeout);
            Resolution::GeocodeUnavailable
        })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails `failures` times, then answers with `address`.
    pub(crate) struct FlakyGeocoder {
        pub failures: u32,
        pub address: HashMap<String, String>,
        pub calls: AtomicU32,
    }

    impl FlakyGeocoder {
        pub(crate) fn new(failures: u32, address: &[(&str, &str)]) -> Self {
            FlakyGeocoder {
                failures,
                address: address.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                calls: AtomicU32::new(0),
            }
        }
    }

    impl ReverseGeocoder for FlakyGeocoder {
        async fn reverse(&self, _: GeoPosition) -> Result<HashMap<String, String>, GeocodeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(GeocodeError::Status(503));
            }
            Ok(self.address.clone())
        }
    }

    pub(crate) fn quick_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_backoff: Duration::from_millis(1),
            attempt_timeout: Duration::from_secs(1),
            overall_timeout: Duration::from_secs(5),
        }
    }

    fn address(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn town_prefers_city_then_village() {
        let place = sanitize_address(&address(&[("village", "Giverny"), ("city", "Vernon"), ("country", "France")]));
        assert_eq!(place.unwrap().town.as_deref(), Some("Vernon"));

        let place = sanitize_address(&address(&[("municipality", "Pontoise"), ("village", "Auvers")])).unwrap();
        assert_eq!(place.town.as_deref(), Some("Auvers"));
        assert_eq!(place.country, None);

        let place = sanitize_address(&address(&[("country", "Iceland")])).unwrap();
        assert_eq!(place.town, None);

        assert_eq!(sanitize_address(&address(&[("road", "A1")])), None);
    }

    #[test]
    fn address_fields_ignore_non_strings() {
        let body = json!({"address": {"city": "Lyon", "country": "France", "extra": 3}});
        let fields = address_fields(&body);
        assert_eq!(fields.len(), 2);
        assert!(address_fields(&json!({"error": "Unable to geocode"})).is_empty());
    }

    #[tokio::test]
    async fn retries_until_the_geocoder_answers() {
        let geocoder = FlakyGeocoder::new(2, &[("city", "Lyon"), ("country", "France")]);
        let got = resolve(&geocoder, GeoPosition::new(45.76, 4.83), &quick_policy(3)).await;
        assert_eq!(got.place().and_then(|p| p.town.as_deref()), Some("Lyon"));
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_are_unavailable() {
        let geocoder = FlakyGeocoder::new(10, &[("city", "Lyon")]);
        let got = resolve(&geocoder, GeoPosition::new(45.76, 4.83), &quick_policy(2)).await;
        assert_eq!(got, Resolution::GeocodeUnavailable);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_address_is_unnamed() {
        let geocoder = FlakyGeocoder::new(0, &[]);
        let got = resolve(&geocoder, GeoPosition::new(0.0, -30.0), &quick_policy(2)).await;
        assert_eq!(got, Resolution::Unnamed);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        let policy = quick_policy(3);
        assert_eq!(policy.backoff(0), Duration::from_millis(1));
        assert_eq!(policy.backoff(3), Duration::from_millis(8));
        assert_eq!(policy.backoff(64), Duration::from_millis(1).saturating_mul(u32::MAX));
    }
}
