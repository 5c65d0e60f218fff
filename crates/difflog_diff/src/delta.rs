//! The structural delta type.

use crate::value::Document;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A structural description of the difference between two documents.
///
/// Presence transitions are encoded one-sided and exclusively so:
/// [`Delta::Added`] for absent→present, [`Delta::Removed`] for
/// present→absent, [`Delta::Updated`] for value→value (including
/// replacements where the container kind changes). `diff`, `patch` and
/// `unpatch` all honor this encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Delta {
    /// The field was absent and is now `value`.
    Added {
        /// The newly present value.
        value: Document,
    },
    /// The field was `old` and is now absent.
    Removed {
        /// The previously present value.
        old: Document,
    },
    /// The value changed from `old` to `new`.
    Updated {
        /// Value on the before side.
        old: Document,
        /// Value on the after side.
        new: Document,
    },
    /// A nested object; only changed fields appear.
    Object {
        /// Per-field deltas, keyed by field name.
        fields: BTreeMap<String, Delta>,
    },
    /// An identity-aware sequence delta.
    Array {
        /// The array operations.
        ops: ArrayDelta,
    },
}

impl Delta {
    /// Returns true if the delta describes no effective change.
    ///
    /// Field filtering can hollow out containers; an empty container must
    /// be treated as "no change" rather than persisted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Delta::Object { fields } => fields.is_empty(),
            Delta::Array { ops } => ops.is_empty(),
            Delta::Updated { old, new } => old == new,
            Delta::Added { .. } | Delta::Removed { .. } => false,
        }
    }

    /// Returns the per-field deltas if this is an object delta.
    #[must_use]
    pub fn as_object(&self) -> Option<&BTreeMap<String, Delta>> {
        match self {
            Delta::Object { fields } => Some(fields),
            _ => None,
        }
    }
}

/// Operations transforming one array into another.
///
/// Indices in `inserted` and `changed` refer to positions in the *after*
/// array; indices in `removed` to positions in the *before* array; `moved`
/// pairs map a before position to an after position. Elements matched by
/// identity whose relative order survives are not mentioned at all; their
/// positions shift implicitly as surrounding operations apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayDelta {
    /// Elements appearing only on the after side: `(after index, value)`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inserted: Vec<(usize, Document)>,
    /// Elements appearing only on the before side: `(before index, value)`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<(usize, Document)>,
    /// Matched elements that changed position: `(before index, after index)`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub moved: Vec<(usize, usize)>,
    /// Matched elements whose content changed: `(after index, delta)`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed: Vec<(usize, Delta)>,
}

impl ArrayDelta {
    /// Returns true if no operations are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
            && self.removed.is_empty()
            && self.moved.is_empty()
            && self.changed.is_empty()
    }
}
