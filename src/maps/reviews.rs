use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::RecordSkipped;
use crate::maps::layout::{self, Category, ReviewFields};
use crate::maps::{extract_batch, place};
use crate::models::Review;
use crate::paging::Page;
use crate::payload::Node;

/// Detect the layout of a reviews page and extract every card on it.
pub fn read_page(tree: &Value) -> Option<Page<Review>> {
    let probe = layout::detect(Category::Reviews, tree)?;
    let root = Node::new(tree);
    let fields = ReviewFields::for_layout(probe.layout);
    let (records, skipped) = extract_batch(probe.card_list(root), |card| extract(card, fields));
    Some(Page {
        records,
        skipped,
        next_token: probe.next_token(root),
    })
}

pub fn extract(card: Node, fields: &ReviewFields) -> Result<Review, RecordSkipped> {
    layout::check_skeleton(card, fields.skeleton)?;

    Ok(Review {
        id: card.path(fields.id).text_or_number().unwrap_or_default(),
        date: card.path(fields.timestamp).i64().and_then(from_micros),
        rating: card.first_of(fields.rating, |n| n.f64()),
        comment: card.path(fields.comment).text(),
        location: place::extract(card.path(fields.place), fields.place_fields),
    })
}

/// Timestamps are microseconds since the epoch; zero means unset.
pub fn from_micros(micros: i64) -> Option<DateTime<Utc>> {
    if micros == 0 {
        return None;
    }
    DateTime::from_timestamp_micros(micros)
}

/// Mean of the ratings that are present, to one decimal.
pub fn average_rating(reviews: &[Review]) -> Option<f64> {
    let ratings: Vec<f64> = reviews.iter().filter_map(|r| r.rating).filter(|r| *r > 0.0).collect();
    if ratings.is_empty() {
        return None;
    }
    let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}
