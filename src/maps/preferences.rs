use std::collections::HashMap;

use itertools::Itertools;
use serde::Serialize;

use crate::models::PlaceLocation;

const MAX_TAGS: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KindPreference {
    pub code: String,
    pub label: Option<String>,
    pub count: usize,
    pub tags: Vec<(String, usize)>,
}

/// What kinds of places the target reviews and photographs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Preferences {
    pub kinds: Vec<KindPreference>,
    /// Type codes the label lookup did not know.
    pub unknown: Vec<String>,
}

/// Count type codes across places, most frequent first, with the tags seen
/// alongside each one. `label` maps a type code to a human label.
pub fn summarize<'a, I, L>(places: I, label: L) -> Preferences
where
    I: IntoIterator<Item = &'a PlaceLocation>,
    L: Fn(&str) -> Option<String>,
{
    let places: Vec<&PlaceLocation> = places.into_iter().collect();
    let kind_counts = places.iter().flat_map(|p| p.types.iter()).counts();

    let mut tag_counts: HashMap<&str, HashMap<&str, usize>> = HashMap::new();
    for place in &places {
        for kind in &place.types {
            let per_kind = tag_counts.entry(kind).or_default();
            for tag in &place.tags {
                *per_kind.entry(tag).or_default() += 1;
            }
        }
    }

    let kinds: Vec<KindPreference> = kind_counts
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        .map(|(code, count)| {
            let tags = tag_counts
                .get(code.as_str())
                .map(|tags| {
                    tags.iter()
                        .filter(|(tag, _)| !tag.eq_ignore_ascii_case(code))
                        .sorted_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)))
                        .take(MAX_TAGS)
                        .map(|(tag, n)| (tag.to_string(), *n))
                        .collect()
                })
                .unwrap_or_default();
            KindPreference {
                code: code.clone(),
                label: label(code),
                count,
                tags,
            }
        })
        .collect();

    let unknown = kinds
        .iter()
        .filter(|k| k.label.is_none())
        .map(|k| k.code.clone())
        .collect();

    Preferences { kinds, unknown }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(types: &[&str], tags: &[&str]) -> PlaceLocation {
        PlaceLocation {
            types: types.iter().map(|s| s.to_string()).collect(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn label(code: &str) -> Option<String> {
        (code == "cafe").then(|| "Café".to_string())
    }

    #[test]
    fn ranks_kinds_and_tags() {
        let places = vec![
            place(&["cafe"], &["Wifi", "Cafe"]),
            place(&["cafe", "bakery"], &["Wifi", "Croissants"]),
            place(&["museum"], &[]),
        ];
        let prefs = summarize(&places, label);

        let codes: Vec<&str> = prefs.kinds.iter().map(|k| k.code.as_str()).collect();
        assert_eq!(codes, vec!["cafe", "bakery", "museum"]);

        let cafe = &prefs.kinds[0];
        assert_eq!(cafe.count, 2);
        assert_eq!(cafe.label.as_deref(), Some("Café"));
        // The tag spelling the type itself is left out.
        assert_eq!(
            cafe.tags,
            vec![("Wifi".to_string(), 2), ("Croissants".to_string(), 1)]
        );
        assert!(prefs.kinds[2].tags.is_empty());
        assert_eq!(prefs.unknown, vec!["bakery", "museum"]);
    }

    #[test]
    fn caps_tags_per_kind() {
        let tags: Vec<String> = (0..10).map(|i| format!("t{}", i)).collect();
        let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();
        let places = vec![place(&["bar"], &tag_refs)];
        let prefs = summarize(&places, |_| None);
        assert_eq!(prefs.kinds[0].tags.len(), MAX_TAGS);
    }

    #[test]
    fn no_places_no_kinds() {
        let prefs = summarize(&Vec::<PlaceLocation>::new(), label);
        assert_eq!(prefs, Preferences::default());
    }
}
