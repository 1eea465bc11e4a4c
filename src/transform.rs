//! Regrouping of populated columns.
//!
//! `find` projects populated columns as `<table>_<column>`. These helpers move such
//! keys into a nested object under `<table>` and drop the flattened keys.

use serde_json::{Map, Value};

use crate::results::Document;

/// Longest prefix `p` such that `key` is `p_<something>`.
fn matching_prefix<'p, S: AsRef<str>>(key: &str, prefixes: &'p [S]) -> Option<&'p str> {
    prefixes
        .iter()
        .map(AsRef::as_ref)
        .filter(|prefix| {
            key.len() > prefix.len() + 1
                && key.starts_with(prefix)
                && key.as_bytes()[prefix.len()] == b'_'
        })
        .max_by_key(|prefix| prefix.len())
}

/// Regroup one row. With no prefixes the row comes back untouched.
#[must_use]
pub fn transform_response_one<S: AsRef<str>>(mut row: Document, prefixes: &[S]) -> Document {
    if prefixes.is_empty() {
        return row;
    }

    let moves: Vec<(String, String)> = row
        .keys()
        .filter_map(|key| {
            matching_prefix(key, prefixes).map(|prefix| (key.clone(), prefix.to_string()))
        })
        .collect();

    for (key, prefix) in moves {
        let Some(value) = row.remove(&key) else {
            continue;
        };
        let field = key[prefix.len() + 1..].to_string();
        let nested = row
            .entry(prefix)
            .or_insert_with(|| Value::Object(Map::new()));
        if !nested.is_object() {
            *nested = Value::Object(Map::new());
        }
        if let Value::Object(map) = nested {
            map.insert(field, value);
        }
    }
    row
}

/// Regroup every row; see [`transform_response_one`].
#[must_use]
pub fn transform_response<S: AsRef<str>>(rows: Vec<Document>, prefixes: &[S]) -> Vec<Document> {
    if prefixes.is_empty() {
        return rows;
    }
    rows.into_iter()
        .map(|row| transform_response_one(row, prefixes))
        .collect()
}
