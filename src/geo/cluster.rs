//! Distance clustering over located reviews and photos.
//!
//! Every distinct place seeds one cluster holding all sightings within the
//! radius. Seeds from the same physical area produce clusters that contain
//! each other; those are filtered out before scoring.

use std::cmp::Reverse;
use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};
use itertools::{Itertools, MinMaxResult};
use rayon::prelude::*;
use serde::Serialize;

use crate::models::GeoPosition;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Points per scoring step; the four criteria are worth 4, 3, 2 and 1 steps.
pub const SCORE_STEP: u32 = 4;
pub const MAX_SCORE: u32 = SCORE_STEP * (4 + 3 + 2 + 1);

const MIN_MEMBERS: usize = 3;
const MIN_GROUPS: usize = 3;

/// A located record.
#[derive(Debug, Clone, PartialEq)]
pub struct Sighting {
    pub place_id: Option<String>,
    pub position: GeoPosition,
    pub date: Option<DateTime<Utc>>,
}

impl Sighting {
    fn seed_key(&self) -> (Option<&str>, (u64, u64)) {
        match &self.place_id {
            Some(id) => (Some(id.as_str()), (0, 0)),
            None => (None, self.position.key()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub seed: GeoPosition,
    /// Positions of every sighting within the radius of the seed, the seed
    /// included. A place seen twice appears twice.
    pub members: Vec<GeoPosition>,
    /// Time between the oldest and newest dated member.
    #[serde(serialize_with = "span_secs")]
    pub span: TimeDelta,
    pub score: u32,
}

fn span_secs<S: serde::Serializer>(span: &TimeDelta, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(span.num_seconds())
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn centroid(&self) -> GeoPosition {
        let n = self.members.len().max(1) as f64;
        let (lat, lon) = self
            .members
            .iter()
            .fold((0.0, 0.0), |(lat, lon), p| (lat + p.latitude, lon + p.longitude));
        GeoPosition::new(lat / n, lon / n)
    }

    fn locations(&self) -> HashSet<(u64, u64)> {
        self.members.iter().map(GeoPosition::key).collect()
    }
}

pub fn haversine_km(a: GeoPosition, b: GeoPosition) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// One cluster per distinct place, in first-seen order.
pub fn seed_clusters(sightings: &[Sighting], radius_km: f64) -> Vec<Cluster> {
    let seeds: Vec<&Sighting> = sightings.iter().unique_by(|s| s.seed_key()).collect();

    seeds
        .par_iter()
        .map(|seed| {
            let near: Vec<&Sighting> = sightings
                .iter()
                .filter(|s| haversine_km(seed.position, s.position) <= radius_km)
                .collect();
            let span = match near.iter().filter_map(|s| s.date).minmax() {
                MinMaxResult::MinMax(min, max) => max - min,
                _ => TimeDelta::zero(),
            };
            Cluster {
                seed: seed.position,
                members: near.iter().map(|s| s.position).collect(),
                span,
                score: 0,
            }
        })
        .collect()
}

/// Largest clusters first; drops every cluster whose locations all belong to
/// a cluster kept before it.
pub fn drop_redundant(mut clusters: Vec<Cluster>) -> Vec<Cluster> {
    clusters.sort_by_key(|c| Reverse(c.len()));
    let sets: Vec<HashSet<(u64, u64)>> = clusters.iter().map(Cluster::locations).collect();

    let mut dropped = vec![false; clusters.len()];
    for keep in 0..clusters.len() {
        if dropped[keep] {
            continue;
        }
        for other in 0..clusters.len() {
            if other != keep && !dropped[other] && sets[other].is_subset(&sets[keep]) {
                dropped[other] = true;
            }
        }
    }

    clusters
        .into_iter()
        .zip(dropped)
        .filter_map(|(c, gone)| (!gone).then_some(c))
        .collect()
}

/// Score survivors against each other.
pub fn score(clusters: Vec<Cluster>) -> Vec<Cluster> {
    let max_len = clusters.iter().map(Cluster::len).max().unwrap_or(0);
    let max_span = clusters.iter().map(|c| c.span).max().unwrap_or(TimeDelta::zero());
    let total: usize = clusters.iter().map(Cluster::len).sum();
    let groups = clusters.len();

    clusters
        .into_iter()
        .map(|mut c| {
            let mut score = 0;
            if c.len() == max_len {
                score += SCORE_STEP * 4;
            }
            if c.span == max_span {
                score += SCORE_STEP * 3;
            }
            if groups >= MIN_GROUPS && c.len() > total - c.len() {
                score += SCORE_STEP * 2;
            }
            if c.len() >= MIN_MEMBERS {
                score += SCORE_STEP;
            }
            c.score = score;
            c
        })
        .collect()
}

/// Seed, filter, score and order clusters, best score first.
pub fn rank(sightings: &[Sighting], radius_km: f64) -> Vec<Cluster> {
    let mut clusters = score(drop_redundant(seed_clusters(sightings, radius_km)));
    clusters.sort_by_key(|c| Reverse(c.score));
    clusters
}
