use serde::Serialize;
use serde_json::Value;

use crate::payload::Node;

const SECTIONS: &[usize] = &[16, 8, 0];
const NAME_SLOT: usize = 6;
const COUNT_SLOT: usize = 7;

/// Contribution counters from the profile's statistics page, in page order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats(pub Vec<(String, i64)>);

impl Stats {
    pub fn get(&self, name: &str) -> i64 {
        self.0.iter().find(|(n, _)| n == name).map_or(0, |(_, c)| *c)
    }

    /// Reviews, ratings and photos: the counters that have paginated detail.
    pub fn contributions(&self) -> i64 {
        self.get("Reviews") + self.get("Ratings") + self.get("Photos")
    }

    pub fn nonzero(&self) -> impl Iterator<Item = &(String, i64)> {
        self.0.iter().filter(|(_, c)| *c != 0)
    }
}

/// `None` when the statistics block is missing altogether.
pub fn parse(tree: &Value) -> Option<Stats> {
    let sections = Node::new(tree).path(SECTIONS);
    if !sections.is_list() {
        return None;
    }
    let stats = sections
        .items()
        .filter(|s| s.len() > COUNT_SLOT)
        .filter_map(|s| Some((s.at(NAME_SLOT).text()?, s.at(COUNT_SLOT).i64().unwrap_or(0))))
        .collect();
    Some(Stats(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{decode, DEFAULT_PREFIX_LEN};
    use serde_json::json;

    #[test]
    fn reads_sections_in_order() {
        let raw = std::fs::read_to_string("tests/fixtures/stats.txt").unwrap();
        let stats = parse(&decode(&raw, DEFAULT_PREFIX_LEN).unwrap()).unwrap();
        let names: Vec<&str> = stats.0.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Reviews", "Ratings", "Photos", "Answers"]);
        assert_eq!(stats.contributions(), 8);
        assert_eq!(stats.nonzero().count(), 3);
    }

    #[test]
    fn missing_block_is_none() {
        assert_eq!(parse(&json!([1, 2, 3])), None);
        assert_eq!(parse(&json!("x")), None);
    }
}
