//! Field filtering of captured deltas.
//!
//! Filtering runs between diffing and persistence: omitted paths are
//! stripped first, then the pick list restricts the remaining top-level
//! fields. A delta hollowed out by filtering collapses to `None` and is
//! treated exactly like "no change": no record is persisted for it.

use difflog_diff::value::strip_path;
use difflog_diff::Delta;

/// Applies omit and pick rules to a computed delta.
///
/// `omit` entries are dotted field paths; `pick`, when present, is a list
/// of top-level field names. Omission is applied before picking.
#[must_use]
pub fn apply(delta: Delta, omit: &[String], pick: Option<&[String]>) -> Option<Delta> {
    let mut current = Some(delta);
    for path in omit {
        let segments: Vec<&str> = path.split('.').collect();
        current = current.and_then(|delta| omit_path(delta, &segments));
    }
    let delta = current?;
    match pick {
        Some(fields) => pick_fields(delta, fields),
        None => Some(delta),
    }
}

/// Strips one field path from a delta, collapsing emptied containers.
///
/// Path segments walk nested object deltas; whatever remains of the path
/// is also stripped inside the document values embedded in leaves and in
/// array operations, so an omitted field never survives inside a captured
/// snapshot fragment. Array containers are walked element-wise without
/// consuming a segment.
fn omit_path(delta: Delta, path: &[&str]) -> Option<Delta> {
    let Some((head, rest)) = path.split_first() else {
        return Some(delta);
    };

    match delta {
        Delta::Object { mut fields } => {
            if rest.is_empty() {
                fields.remove(*head);
            } else if let Some(child) = fields.remove(*head) {
                if let Some(kept) = omit_path(child, rest) {
                    fields.insert((*head).to_string(), kept);
                }
            }
            if fields.is_empty() {
                None
            } else {
                Some(Delta::Object { fields })
            }
        }
        Delta::Updated { mut old, mut new } => {
            strip_path(&mut old, path);
            strip_path(&mut new, path);
            if old == new {
                None
            } else {
                Some(Delta::Updated { old, new })
            }
        }
        Delta::Added { mut value } => {
            strip_path(&mut value, path);
            Some(Delta::Added { value })
        }
        Delta::Removed { mut old } => {
            strip_path(&mut old, path);
            Some(Delta::Removed { old })
        }
        Delta::Array { mut ops } => {
            for (_, value) in &mut ops.inserted {
                strip_path(value, path);
            }
            for (_, value) in &mut ops.removed {
                strip_path(value, path);
            }
            ops.changed = ops
                .changed
                .into_iter()
                .filter_map(|(index, child)| omit_path(child, path).map(|kept| (index, kept)))
                .collect();
            if ops.is_empty() {
                None
            } else {
                Some(Delta::Array { ops })
            }
        }
    }
}

/// Restricts a delta to the named top-level fields.
///
/// Only an object root has top-level fields; any other root is dropped
/// entirely.
fn pick_fields(delta: Delta, pick: &[String]) -> Option<Delta> {
    match delta {
        Delta::Object { mut fields } => {
            fields.retain(|key, _| pick.iter().any(|name| name == key));
            if fields.is_empty() {
                None
            } else {
                Some(Delta::Object { fields })
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use difflog_diff::Differ;
    use serde_json::json;

    fn diff(before: serde_json::Value, after: serde_json::Value) -> Delta {
        Differ::new().diff(&before, &after).unwrap()
    }

    fn omit(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn no_rules_is_identity() {
        let delta = diff(json!({"a": 1}), json!({"a": 2}));
        assert_eq!(apply(delta.clone(), &[], None), Some(delta));
    }

    #[test]
    fn omitting_the_only_field_collapses() {
        let delta = diff(json!({"a": 1}), json!({"a": 2}));
        assert_eq!(apply(delta, &omit(&["a"]), None), None);
    }

    #[test]
    fn omit_nested_path_collapses_emptied_parent() {
        let delta = diff(json!({"b": {"c": 1}}), json!({"b": {"c": 2}}));
        assert_eq!(apply(delta, &omit(&["b.c"]), None), None);
    }

    #[test]
    fn omit_keeps_sibling_changes() {
        let delta = diff(
            json!({"a": 1, "b": {"c": 1, "d": 1}}),
            json!({"a": 2, "b": {"c": 2, "d": 2}}),
        );
        let filtered = apply(delta, &omit(&["b.c"]), None).unwrap();
        let fields = filtered.as_object().unwrap();
        assert!(fields.contains_key("a"));
        let nested = fields["b"].as_object().unwrap();
        assert!(nested.contains_key("d"));
        assert!(!nested.contains_key("c"));
    }

    #[test]
    fn omit_reaches_into_replaced_subtrees() {
        // "b" changes kind, so its delta embeds whole snapshots; the
        // omitted path must be stripped from them too.
        let delta = diff(json!({"b": 5}), json!({"b": {"c": 2, "e": 5}}));
        let filtered = apply(delta, &omit(&["b.c"]), None).unwrap();
        let fields = filtered.as_object().unwrap();
        match &fields["b"] {
            Delta::Updated { new, .. } => assert_eq!(new, &json!({"e": 5})),
            other => panic!("expected updated leaf, got {other:?}"),
        }
    }

    #[test]
    fn omit_collapses_updated_leaf_when_sides_coincide() {
        let delta = Delta::Updated {
            old: json!({"etag": "a", "n": 1}),
            new: json!({"etag": "b", "n": 1}),
        };
        assert_eq!(apply(delta, &omit(&["etag"]), None), None);

        let nested = diff(
            json!({"meta": {"etag": "a", "n": 1}}),
            json!({"meta": {"etag": "b", "n": 1}}),
        );
        assert_eq!(apply(nested, &omit(&["meta.etag"]), None), None);
    }

    #[test]
    fn omit_is_idempotent() {
        let delta = diff(
            json!({"a": 1, "x": 1}),
            json!({"a": 2, "x": 2}),
        );
        let once = apply(delta.clone(), &omit(&["x"]), None);
        let twice = once
            .clone()
            .and_then(|d| apply(d, &omit(&["x"]), None));
        assert_eq!(once, twice);
    }

    #[test]
    fn omit_then_pick_same_field_yields_nothing() {
        let delta = diff(json!({"x": 1, "y": 1}), json!({"x": 2, "y": 2}));
        let picked = vec!["x".to_string()];
        assert_eq!(apply(delta, &omit(&["x"]), Some(&picked)), None);
    }

    #[test]
    fn pick_restricts_top_level_fields() {
        let delta = diff(
            json!({"a": 1, "b": 1, "c": 1}),
            json!({"a": 2, "b": 2, "c": 2}),
        );
        let picked = vec!["a".to_string(), "c".to_string()];
        let filtered = apply(delta, &[], Some(&picked)).unwrap();
        let fields = filtered.as_object().unwrap();
        assert_eq!(fields.len(), 2);
        assert!(fields.contains_key("a") && fields.contains_key("c"));
    }

    #[test]
    fn pick_on_non_object_root_drops_delta() {
        let delta = diff(json!("a"), json!("b"));
        let picked = vec!["a".to_string()];
        assert_eq!(apply(delta, &[], Some(&picked)), None);
    }

    #[test]
    fn omit_applies_inside_array_ops() {
        let delta = diff(
            json!([{"id": 1, "v": "a", "tmp": 1}]),
            json!([{"id": 1, "v": "b", "tmp": 2}]),
        );
        let filtered = apply(delta, &omit(&["tmp"]), None).unwrap();
        let Delta::Array { ops } = &filtered else {
            panic!("expected array delta");
        };
        let (_, nested) = &ops.changed[0];
        let fields = nested.as_object().unwrap();
        assert!(fields.contains_key("v"));
        assert!(!fields.contains_key("tmp"));
    }
}
