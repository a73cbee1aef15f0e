use crate::maps::layout::{KindFields, PlaceFields};
use crate::models::{GeoPosition, PlaceLocation};
use crate::payload::Node;

/// Read a place block. Never fails: missing fields stay empty.
pub fn extract(place: Node, fields: &PlaceFields) -> PlaceLocation {
    let (types, tags) = match fields.kinds {
        KindFields::Split { tags, types } => (
            strings(place.path(types)),
            place.path(tags).items().filter_map(|n| n.text()).collect(),
        ),
        KindFields::Paired { entries } => paired_kinds(place.path(entries)),
    };

    PlaceLocation {
        id: place.first_of(fields.id, |n| n.text_or_number()),
        name: place.path(fields.name).text().unwrap_or_default(),
        address: place.path(fields.address).text().unwrap_or_default(),
        position: coordinates(place.path(fields.coordinates)),
        types,
        tags,
        cost_level: fields.cost.and_then(|p| cost_level(place.path(p))),
    }
}

/// Latitude and longitude are read together or not at all.
fn coordinates(block: Node) -> Option<GeoPosition> {
    if block.len() < 4 {
        return None;
    }
    Some(GeoPosition::new(block.at(2).f64()?, block.at(3).f64()?))
}

fn strings(list: Node) -> Vec<String> {
    list.items().filter_map(|n| n.text()).collect()
}

fn paired_kinds(entries: Node) -> (Vec<String>, Vec<String>) {
    let mut types = Vec::new();
    let mut tags = Vec::new();
    for entry in entries.items() {
        if entry.len() > 1 {
            if let Some(kind) = entry.at(1).text() {
                types.push(kind);
                if let Some(tag) = entry.at(0).text() {
                    tags.push(tag);
                }
            }
        } else if let Some(kind) = entry.text() {
            types.push(kind);
        }
    }
    (types, tags)
}

/// One marker per price step, capped at the top level.
fn cost_level(markers: Node) -> Option<u8> {
    match markers.len() {
        0 => None,
        n => Some(n.min(4) as u8),
    }
}
