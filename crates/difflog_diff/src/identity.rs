//! Array element identity.
//!
//! Array diffing matches elements across the before/after sides by a
//! stable identity rather than by position, so reordering becomes a set
//! of moves instead of a wholesale replacement. The matching strategy is
//! injectable because it depends entirely on the documents being stored.

use crate::value::Document;
use serde_json::Value;

/// Stable identity of an array element within one diff.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    /// Identity derived from the element itself (e.g. its id field).
    Id(String),
    /// Positional fallback for elements with no intrinsic identity.
    Index(usize),
}

/// Strategy mapping an array element to its identity.
///
/// Elements with equal keys on the two sides of a diff are treated as the
/// same element; a changed position becomes a move, changed content a
/// nested delta.
pub trait ElementIdentity: Send + Sync {
    /// Returns the identity of `element`, which sits at `index` in its array.
    fn identity(&self, element: &Document, index: usize) -> IdentityKey;
}

/// Default identity: an id field on the element, falling back to position.
///
/// Looks for the first configured field (by default `_id`, then `id`)
/// holding a scalar, and renders it to a string. Elements that are not
/// objects or carry none of the fields are matched by index, which
/// degrades array diffing to positional comparison for them.
#[derive(Debug, Clone)]
pub struct IdFieldIdentity {
    fields: Vec<String>,
}

impl IdFieldIdentity {
    /// Creates an identity strategy over the given id fields, in order.
    #[must_use]
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }
}

impl Default for IdFieldIdentity {
    fn default() -> Self {
        Self::new(vec!["_id".to_string(), "id".to_string()])
    }
}

impl ElementIdentity for IdFieldIdentity {
    fn identity(&self, element: &Document, index: usize) -> IdentityKey {
        if let Value::Object(map) = element {
            for field in &self.fields {
                match map.get(field) {
                    Some(Value::String(s)) => return IdentityKey::Id(s.clone()),
                    Some(Value::Number(n)) => return IdentityKey::Id(n.to_string()),
                    Some(Value::Bool(b)) => return IdentityKey::Id(b.to_string()),
                    _ => {}
                }
            }
        }
        IdentityKey::Index(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefers_underscore_id() {
        let identity = IdFieldIdentity::default();
        let element = json!({"_id": "abc", "id": "other"});
        assert_eq!(
            identity.identity(&element, 3),
            IdentityKey::Id("abc".to_string())
        );
    }

    #[test]
    fn falls_back_to_id_then_index() {
        let identity = IdFieldIdentity::default();
        assert_eq!(
            identity.identity(&json!({"id": 7}), 0),
            IdentityKey::Id("7".to_string())
        );
        assert_eq!(
            identity.identity(&json!({"name": "x"}), 2),
            IdentityKey::Index(2)
        );
        assert_eq!(identity.identity(&json!("scalar"), 1), IdentityKey::Index(1));
    }

    #[test]
    fn non_scalar_id_is_ignored() {
        let identity = IdFieldIdentity::default();
        assert_eq!(
            identity.identity(&json!({"id": {"nested": 1}}), 4),
            IdentityKey::Index(4)
        );
    }

    #[test]
    fn custom_fields() {
        let identity = IdFieldIdentity::new(vec!["sku".to_string()]);
        assert_eq!(
            identity.identity(&json!({"sku": "A-1", "id": "ignored"}), 0),
            IdentityKey::Id("A-1".to_string())
        );
    }
}
