//! Key extraction for indexes, kept separate from the (out-of-scope) BSON
//! expression compiler: the storage engine only ever needs "pull the value(s)
//! named by this index's expression out of a document", not the full
//! expression language. `CollectionIndex` stores the expression source
//! verbatim for display/serialization; extracting keys from a document goes
//! through this trait instead.

use crate::bson::{Document, Value};

/// Pulls zero or more index-key values out of a document.
///
/// An index over an array-valued path yields one key per element (see
/// `PathSelector`), which is how the engine implements multi-key indexes
/// without interpreting arbitrary expressions.
pub(crate) trait KeySelector: Send + Sync {
    fn select<'a>(&self, root: &'a Document) -> Vec<&'a Value>;
}

/// Resolves a simple dotted field path such as `$.Name` or `$.Address.City`.
///
/// This is the default selector used for every index the engine creates
/// itself (including `_id`, whose expression is always `$._id`). It does not
/// support the full BSON expression grammar (method calls, arithmetic,
/// `MAP`/`FILTER`) on purpose: the engine never parses indexed expressions,
/// per the storage engine's contract with the query layer above it.
#[derive(Debug, Clone)]
pub(crate) struct PathSelector {
    segments: Vec<String>,
    source: String,
}

impl PathSelector {
    pub fn parse(source: &str) -> Self {
        let trimmed = source.strip_prefix('$').unwrap_or(source);
        let trimmed = trimmed.strip_prefix('.').unwrap_or(trimmed);
        let segments = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('.').map(|s| s.to_string()).collect()
        };
        PathSelector { segments, source: source.to_string() }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// A path expression is scalar when it cannot ever descend into an
    /// array, i.e. produces at most one key per document.
    pub fn is_scalar(&self) -> bool {
        true
    }
}

fn walk<'a>(value: &'a Value, segments: &[String], out: &mut Vec<&'a Value>) {
    if segments.is_empty() {
        match value {
            Value::Array(arr) => out.extend(arr.iter()),
            other => out.push(other),
        }
        return;
    }
    match value {
        Value::Document(doc) => {
            if let Some(next) = doc.get(&segments[0]) {
                walk(next, &segments[1..], out);
            }
        }
        Value::Array(arr) => {
            for item in arr.iter() {
                walk(item, segments, out);
            }
        }
        _ => {}
    }
}

impl KeySelector for PathSelector {
    fn select<'a>(&self, root: &'a Document) -> Vec<&'a Value> {
        let mut out = Vec::new();
        match self.segments.split_first() {
            Some((head, rest)) => {
                if let Some(next) = root.get(head) {
                    walk(next, rest, &mut out);
                }
            }
            None => {}
        }
        out
    }
}

/// Extracts the key(s) a `doc`'s document value yields for `selector`,
/// returning nothing for non-document values (same behavior as indexing a
/// collection whose stored value somehow isn't a document).
pub(crate) fn get_index_keys<'a>(
    selector: &impl KeySelector,
    doc: &'a Value,
) -> Vec<&'a Value> {
    match doc {
        Value::Document(d) => selector.select(d),
        _ => Vec::new(),
    }
}
