pub mod cluster;
pub mod confidence;
pub mod geocode;

use serde::Serialize;
use tracing::info;

use crate::models::{GeoPosition, Photo, Review};
use cluster::Sighting;
use confidence::Confidence;
use geocode::{Resolution, ReverseGeocoder, RetryPolicy};

/// Located reviews, then located photos.
pub fn sightings(reviews: &[Review], photos: &[Photo]) -> Vec<Sighting> {
    let reviews = reviews.iter().map(|r| (&r.location, r.date));
    let photos = photos.iter().map(|p| (&p.location, p.date));
    reviews
        .chain(photos)
        .filter_map(|(place, date)| {
            Some(Sighting {
                place_id: place.id.clone(),
                position: place.position?,
                date,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterReport {
    pub members_count: usize,
    pub span_secs: i64,
    pub centroid: GeoPosition,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationGuess {
    pub confidence: Confidence,
    pub percent: f64,
    pub clusters: Vec<ClusterReport>,
}

/// Infers where a profile's owner most likely lives.
pub struct Locator<G> {
    geocoder: G,
    radius_km: f64,
    retry: RetryPolicy,
}

impl<G: ReverseGeocoder> Locator<G> {
    pub fn new(geocoder: G, radius_km: f64, retry: RetryPolicy) -> Self {
        Locator {
            geocoder,
            radius_km,
            retry,
        }
    }

    /// `None` when no record carries a position.
    pub async fn locate(&self, sightings: &[Sighting]) -> Option<LocationGuess> {
        let ranked = cluster::rank(sightings, self.radius_km);
        let panel = confidence::top_panel(&ranked, sightings.len())?;
        info!(
            "{} clusters, top panel holds {} at {:.0}%",
            ranked.len(),
            panel.clusters.len(),
            panel.percent
        );

        let mut clusters = Vec::with_capacity(panel.clusters.len());
        for c in &panel.clusters {
            let centroid = c.centroid();
            let resolution = geocode::resolve(&self.geocoder, centroid, &self.retry).await;
            clusters.push(ClusterReport {
                members_count: c.len(),
                span_secs: c.span.num_seconds(),
                centroid,
                resolution,
            });
        }

        Some(LocationGuess {
            confidence: panel.confidence,
            percent: panel.percent,
            clusters,
        })
    }
}
