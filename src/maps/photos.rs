use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::error::RecordSkipped;
use crate::maps::layout::{self, Category, PhotoFields};
use crate::maps::{extract_batch, place};
use crate::models::Photo;
use crate::paging::Page;
use crate::payload::Node;

pub fn read_page(tree: &Value) -> Option<Page<Photo>> {
    let probe = layout::detect(Category::Photos, tree)?;
    let root = Node::new(tree);
    let fields = PhotoFields::for_layout(probe.layout);
    let (records, skipped) = extract_batch(probe.card_list(root), |card| extract(card, fields));
    Some(Page {
        records,
        skipped,
        next_token: probe.next_token(root),
    })
}

pub fn extract(card: Node, fields: &PhotoFields) -> Result<Photo, RecordSkipped> {
    layout::check_skeleton(card, fields.skeleton)?;

    Ok(Photo {
        id: card.path(fields.id).text_or_number().unwrap_or_default(),
        // Sizing options follow the first '='; keep the bare image URL.
        url: fields
            .url
            .and_then(|p| card.path(p).text())
            .and_then(|u| u.split('=').next().map(str::to_string)),
        date: fields.date.and_then(|p| hour_stamp(card.path(p))),
        location: place::extract(card.path(fields.place), fields.place_fields),
    })
}

/// `[year, month, day, hour]`, UTC.
fn hour_stamp(parts: Node) -> Option<DateTime<Utc>> {
    if parts.len() < 4 {
        return None;
    }
    let year = i32::try_from(parts.at(0).i64()?).ok()?;
    let month = u32::try_from(parts.at(1).i64()?).ok()?;
    let day = u32::try_from(parts.at(2).i64()?).ok()?;
    let hour = u32::try_from(parts.at(3).i64()?).ok()?;
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).single()
}
