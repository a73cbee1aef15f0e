use serde_json::Value;

use crate::error::PayloadError;

/// Length of the anti-hijacking prefix (`)]}'` plus newline) the maps service
/// puts in front of every body.
pub const DEFAULT_PREFIX_LEN: usize = 5;

/// Strip `skip` leading characters and parse the rest as a nested value tree.
pub fn decode(text: &str, skip: usize) -> Result<Value, PayloadError> {
    let body = match text.char_indices().nth(skip) {
        Some((offset, _)) => &text[offset..],
        None => {
            return Err(PayloadError::Truncated {
                len: text.chars().count(),
                skip,
            })
        }
    };
    Ok(serde_json::from_str(body)?)
}

/// Bounds-checked cursor over a decoded tree.
///
/// Every step returns another `Node`, so a path can be walked without
/// checking each level: a missing index, a key on a non-object or an index on
/// a scalar all collapse into an empty node whose accessors return `None`.
#[derive(Debug, Clone, Copy)]
pub struct Node<'a>(Option<&'a Value>);

impl<'a> Node<'a> {
    pub fn new(value: &'a Value) -> Self {
        Node(Some(value))
    }

    pub fn value(self) -> Option<&'a Value> {
        self.0.filter(|v| !v.is_null())
    }

    pub fn at(self, index: usize) -> Node<'a> {
        Node(self.0.and_then(|v| v.as_array()).and_then(|a| a.get(index)))
    }

    pub fn path(self, path: &[usize]) -> Node<'a> {
        path.iter().fold(self, |node, &i| node.at(i))
    }

    pub fn key(self, key: &str) -> Node<'a> {
        Node(self.0.and_then(|v| v.as_object()).and_then(|o| o.get(key)))
    }

    pub fn list(self) -> Option<&'a [Value]> {
        self.0.and_then(|v| v.as_array()).map(|a| a.as_slice())
    }

    pub fn is_list(self) -> bool {
        self.list().is_some()
    }

    /// Number of children; zero for scalars and missing nodes.
    pub fn len(self) -> usize {
        self.list().map_or(0, |a| a.len())
    }

    pub fn items(self) -> impl Iterator<Item = Node<'a>> {
        self.list().unwrap_or_default().iter().map(Node::new)
    }

    pub fn str(self) -> Option<&'a str> {
        self.0.and_then(|v| v.as_str())
    }

    /// Non-empty string content.
    pub fn text(self) -> Option<String> {
        self.str().filter(|s| !s.is_empty()).map(str::to_string)
    }

    /// String content, or the textual form of a number.
    pub fn text_or_number(self) -> Option<String> {
        match self.0? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn f64(self) -> Option<f64> {
        self.0.and_then(|v| v.as_f64())
    }

    pub fn i64(self) -> Option<i64> {
        let v = self.0?;
        v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
    }

    pub fn bool(self) -> Option<bool> {
        self.0.and_then(|v| v.as_bool())
    }

    /// First candidate path whose node yields a value through `read`.
    pub fn first_of<T>(self, paths: &[&[usize]], read: impl Fn(Node<'a>) -> Option<T>) -> Option<T> {
        paths.iter().find_map(|p| read(self.path(p)))
    }
}
