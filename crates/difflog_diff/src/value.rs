//! Document values and path helpers.
//!
//! Documents are dynamic JSON values. The helpers here operate on dotted
//! field paths already split into segments; they are used by the field
//! filter and by partial-update assembly in `difflog_core`.

use serde_json::{Map, Value};

/// A JSON-like document value.
pub type Document = Value;

/// Returns the empty document `{}`.
#[must_use]
pub fn empty_document() -> Document {
    Value::Object(Map::new())
}

/// Looks up the value at a field path.
///
/// Each segment descends into an object field. Returns `None` if any
/// segment is missing or the intermediate value is not an object.
#[must_use]
pub fn get_path<'a>(doc: &'a Document, path: &[&str]) -> Option<&'a Document> {
    let mut current = doc;
    for segment in path {
        match current {
            Value::Object(map) => current = map.get(*segment)?,
            _ => return None,
        }
    }
    Some(current)
}

/// Sets the value at a field path, creating intermediate objects.
///
/// Intermediate values that are not objects are replaced by fresh objects,
/// mirroring how document stores apply dotted field-set updates.
pub fn set_path(doc: &mut Document, path: &[&str], value: Document) {
    let Some((last, parents)) = path.split_last() else {
        *doc = value;
        return;
    };

    let mut current = doc;
    for segment in parents {
        if !current.is_object() {
            *current = empty_document();
        }
        let map = current.as_object_mut().expect("just ensured object");
        current = map
            .entry((*segment).to_string())
            .or_insert_with(empty_document);
    }
    if !current.is_object() {
        *current = empty_document();
    }
    current
        .as_object_mut()
        .expect("just ensured object")
        .insert((*last).to_string(), value);
}

/// Removes the value at a field path.
///
/// Returns `true` if a value was removed. Empty parent objects left behind
/// are not pruned; callers that need collapse semantics handle it at the
/// delta level.
pub fn strip_path(doc: &mut Document, path: &[&str]) -> bool {
    let Some((last, parents)) = path.split_last() else {
        return false;
    };

    let mut current = doc;
    for segment in parents {
        match current {
            Value::Object(map) => match map.get_mut(*segment) {
                Some(next) => current = next,
                None => return false,
            },
            _ => return false,
        }
    }
    match current {
        Value::Object(map) => map.remove(*last).is_some(),
        _ => false,
    }
}
