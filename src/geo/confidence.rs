use itertools::Itertools;
use serde::Serialize;

use super::cluster::{Cluster, MAX_SCORE};

/// Corpora smaller than this halve the confidence.
const MIN_CORPUS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Confidence {
    ExtremelyLow,
    VeryLow,
    Low,
    Okay,
    LittleHigh,
    VeryHigh,
    ExtremelyHigh,
}

impl Confidence {
    pub fn from_percent(percent: f64) -> Self {
        match percent {
            p if p >= 100.0 => Confidence::ExtremelyHigh,
            p if p >= 80.0 => Confidence::VeryHigh,
            p if p >= 60.0 => Confidence::LittleHigh,
            p if p >= 40.0 => Confidence::Okay,
            p if p >= 20.0 => Confidence::Low,
            p if p >= 10.0 => Confidence::VeryLow,
            _ => Confidence::ExtremelyLow,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Confidence::ExtremelyHigh => "Extremely high",
            Confidence::VeryHigh => "Very high",
            Confidence::LittleHigh => "Little high",
            Confidence::Okay => "Okay",
            Confidence::Low => "Low",
            Confidence::VeryLow => "Very low",
            Confidence::ExtremelyLow => "Extremely low",
        }
    }
}

/// The clusters sharing the best score, with the confidence they earn.
#[derive(Debug, Clone)]
pub struct Panel<'a> {
    pub clusters: Vec<&'a Cluster>,
    pub percent: f64,
    pub confidence: Confidence,
}

/// `corpus` is the number of located records the clusters were built from.
pub fn top_panel(ranked: &[Cluster], corpus: usize) -> Option<Panel<'_>> {
    let clusters = ranked.iter().max_set_by_key(|c| c.score);
    let first = clusters.first()?;

    let mut score = f64::from(first.score);
    if first.len() == 1 {
        score /= 2.0;
    }
    if corpus < MIN_CORPUS {
        score /= 2.0;
    }
    let percent = score / f64::from(MAX_SCORE) * 100.0;

    Some(Panel {
        clusters,
        percent,
        confidence: Confidence::from_percent(percent),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::cluster::{rank, tests::sighting};

    #[test]
    fn bands() {
        assert_eq!(Confidence::from_percent(100.0), Confidence::ExtremelyHigh);
        assert_eq!(Confidence::from_percent(80.0), Confidence::VeryHigh);
        assert_eq!(Confidence::from_percent(79.9), Confidence::LittleHigh);
        assert_eq!(Confidence::from_percent(40.0), Confidence::Okay);
        assert_eq!(Confidence::from_percent(35.0), Confidence::Low);
        assert_eq!(Confidence::from_percent(10.0), Confidence::VeryLow);
        assert_eq!(Confidence::from_percent(0.0).label(), "Extremely low");
    }

    #[test]
    fn dominant_home_is_extremely_high() {
        let mut sightings: Vec<_> = (0..4)
            .map(|i| sighting(&format!("h{i}"), 45.0, 5.0 + i as f64 * 0.001, Some(i + 1)))
            .collect();
        sightings.push(sighting("a", 10.0, 10.0, Some(1)));
        sightings.push(sighting("b", -20.0, 30.0, None));

        let ranked = rank(&sightings, 5.0);
        let panel = top_panel(&ranked, sightings.len()).unwrap();
        assert_eq!(panel.clusters.len(), 1);
        assert_eq!(panel.percent, 100.0);
        assert_eq!(panel.confidence, Confidence::ExtremelyHigh);
    }

    #[test]
    fn lone_points_in_a_small_corpus_are_halved_twice() {
        let sightings = vec![sighting("a", 0.0, 0.0, Some(1)), sighting("b", 50.0, 50.0, Some(1))];
        let ranked = rank(&sightings, 1.0);
        let panel = top_panel(&ranked, sightings.len()).unwrap();
        // Both tie on size and span: 16 + 12 = 28, then /2 /2 = 7 of 40.
        assert_eq!(panel.clusters.len(), 2);
        assert_eq!(panel.percent, 17.5);
        assert_eq!(panel.confidence, Confidence::VeryLow);
    }

    #[test]
    fn nothing_ranked_no_panel() {
        assert!(top_panel(&[], 0).is_none());
    }
}
