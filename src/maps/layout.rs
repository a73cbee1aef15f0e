//! Positional layouts of the contributions payload.
//!
//! The service never says which schema it is speaking, so each category has an
//! ordered list of probes. The first probe whose shape matches decides the
//! layout for the whole page; extractors then read fields through the static
//! tables below instead of re-deciding per field.

use serde::Serialize;
use serde_json::Value;

use crate::error::RecordSkipped;
use crate::payload::Node;

pub type Path = &'static [usize];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    Legacy,
    Current,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Reviews,
    Photos,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::Reviews => "reviews",
            Category::Photos => "photos",
        }
    }

    fn probes(self) -> &'static [Probe] {
        match self {
            Category::Reviews => REVIEW_PROBES,
            Category::Photos => PHOTO_PROBES,
        }
    }
}

/// Where a category's card list may live: `tree[container][cards]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub layout: Layout,
    pub container: usize,
    pub cards: usize,
}

const REVIEW_PROBES: &[Probe] = &[
    Probe { layout: Layout::Current, container: 22, cards: 0 },
    // Shape served to signed-in sessions.
    Probe { layout: Layout::Current, container: 45, cards: 0 },
    Probe { layout: Layout::Legacy, container: 24, cards: 0 },
];

const PHOTO_PROBES: &[Probe] = &[
    Probe { layout: Layout::Current, container: 22, cards: 0 },
    Probe { layout: Layout::Legacy, container: 22, cards: 1 },
];

/// Offset of the next-page cursor inside the container.
const TOKEN_SLOT: usize = 3;

impl Probe {
    fn matches(&self, root: Node) -> bool {
        let container = root.at(self.container);
        let cards = container.at(self.cards);
        match self.layout {
            // A card list whose first card is itself a structured sequence,
            // not an incidental scalar.
            Layout::Current => container.len() > 0 && cards.len() > 0 && cards.at(0).len() >= 2,
            Layout::Legacy => cards.is_list() && cards.len() > 0,
        }
    }

    pub fn card_list<'a>(&self, root: Node<'a>) -> Node<'a> {
        root.path(&[self.container, self.cards])
    }

    pub fn next_token(&self, root: Node) -> Option<String> {
        root.path(&[self.container, TOKEN_SLOT]).text()
    }
}

/// Pick the layout of `category` in this page, or `None` when no probe fits.
pub fn detect(category: Category, tree: &Value) -> Option<Probe> {
    let root = Node::new(tree);
    category.probes().iter().copied().find(|p| p.matches(root))
}

/// Minimum shape an entry must have before any field is read: each path must
/// be a sequence of at least the given length.
pub fn check_skeleton(entry: Node, skeleton: &[(Path, usize)]) -> Result<(), RecordSkipped> {
    for &(path, arity) in skeleton {
        let node = entry.path(path);
        if !node.is_list() || node.len() < arity {
            return Err(RecordSkipped::new(format!(
                "expected a sequence of at least {} at {:?}",
                arity, path
            )));
        }
    }
    Ok(())
}

pub enum KindFields {
    /// Tags and type codes in two parallel lists.
    Split { tags: Path, types: Path },
    /// One list of `[tag, type]` pairs or bare type strings.
    Paired { entries: Path },
}

pub struct PlaceFields {
    pub id: &'static [Path],
    pub name: Path,
    pub address: Path,
    /// Block holding latitude at 2 and longitude at 3.
    pub coordinates: Path,
    pub kinds: KindFields,
    /// Cost level is the length of this list.
    pub cost: Option<Path>,
}

pub const LEGACY_PLACE: PlaceFields = PlaceFields {
    id: &[&[14, 0]],
    name: &[2],
    address: &[3],
    coordinates: &[0],
    kinds: KindFields::Split { tags: &[4], types: &[8] },
    cost: Some(&[31]),
};

pub const CURRENT_PLACE: PlaceFields = PlaceFields {
    id: &[&[14, 0], &[14], &[1]],
    name: &[4],
    address: &[5],
    coordinates: &[3],
    kinds: KindFields::Paired { entries: &[9] },
    cost: None,
};

/// Photo cards only carry the place id at `[14]`; `[1]` is something else.
pub const CURRENT_PHOTO_PLACE: PlaceFields = PlaceFields {
    id: &[&[14]],
    ..CURRENT_PLACE
};

pub struct ReviewFields {
    pub skeleton: &'static [(Path, usize)],
    pub place: Path,
    pub place_fields: &'static PlaceFields,
    pub id: Path,
    pub timestamp: Path,
    pub rating: &'static [Path],
    pub comment: Path,
}

pub const LEGACY_REVIEW: ReviewFields = ReviewFields {
    skeleton: &[(&[], 7), (&[6], 0)],
    place: &[1],
    place_fields: &LEGACY_PLACE,
    id: &[6, 0],
    timestamp: &[6, 1, 3],
    rating: &[&[6, 2, 0, 0]],
    comment: &[6, 2, 15, 0, 0],
};

pub const CURRENT_REVIEW: ReviewFields = ReviewFields {
    skeleton: &[(&[], 2), (&[0], 2), (&[1], 1)],
    place: &[0, 1],
    place_fields: &CURRENT_PLACE,
    id: &[1, 0],
    timestamp: &[1, 1, 2],
    rating: &[&[1, 2, 0, 0], &[1, 2, 0]],
    comment: &[1, 2, 15, 0, 0],
};

impl ReviewFields {
    pub fn for_layout(layout: Layout) -> &'static ReviewFields {
        match layout {
            Layout::Legacy => &LEGACY_REVIEW,
            Layout::Current => &CURRENT_REVIEW,
        }
    }
}

pub struct PhotoFields {
    pub skeleton: &'static [(Path, usize)],
    pub place: Path,
    pub place_fields: &'static PlaceFields,
    pub id: Path,
    pub url: Option<Path>,
    /// `[year, month, day, hour]` in UTC.
    pub date: Option<Path>,
}

pub const LEGACY_PHOTO: PhotoFields = PhotoFields {
    skeleton: &[(&[], 1), (&[0], 11)],
    place: &[1],
    place_fields: &LEGACY_PLACE,
    id: &[0, 10],
    url: Some(&[0, 6, 0]),
    date: Some(&[0, 21, 6, 8]),
};

pub const CURRENT_PHOTO: PhotoFields = PhotoFields {
    skeleton: &[(&[], 2), (&[0], 2), (&[1], 1)],
    place: &[0, 1],
    place_fields: &CURRENT_PHOTO_PLACE,
    id: &[1, 0],
    url: None,
    date: None,
};

impl PhotoFields {
    pub fn for_layout(layout: Layout) -> &'static PhotoFields {
        match layout {
            Layout::Legacy => &LEGACY_PHOTO,
            Layout::Current => &CURRENT_PHOTO,
        }
    }
}
