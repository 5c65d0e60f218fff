//! Diff computation and delta application.

use crate::delta::{ArrayDelta, Delta};
use crate::error::{DiffError, DiffResult};
use crate::identity::{ElementIdentity, IdFieldIdentity};
use crate::value::Document;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Computes structural deltas and applies them forward or in reverse.
///
/// `patch` is the exact right inverse of `diff` and `unpatch` the exact
/// left inverse: for any representable documents `a` and `b`,
/// `patch(a, diff(a, b)) == b` and `unpatch(b, diff(a, b)) == a`.
///
/// The array matching strategy is injectable; see [`ElementIdentity`].
#[derive(Clone)]
pub struct Differ {
    identity: Arc<dyn ElementIdentity>,
}

impl Differ {
    /// Creates a differ with the default id-field identity strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_identity(Arc::new(IdFieldIdentity::default()))
    }

    /// Creates a differ with a custom array element identity strategy.
    #[must_use]
    pub fn with_identity(identity: Arc<dyn ElementIdentity>) -> Self {
        Self { identity }
    }

    /// Computes the delta from `before` to `after`.
    ///
    /// Returns `None` when the documents are deep-equal. Unchanged object
    /// fields are omitted entirely; array reordering is expressed as moves,
    /// never as a whole-array replacement.
    #[must_use]
    pub fn diff(&self, before: &Document, after: &Document) -> Option<Delta> {
        if before == after {
            return None;
        }
        match (before, after) {
            (Value::Object(b), Value::Object(a)) => self.diff_objects(b, a),
            (Value::Array(b), Value::Array(a)) => self.diff_arrays(b, a),
            _ => Some(Delta::Updated {
                old: before.clone(),
                new: after.clone(),
            }),
        }
    }

    fn diff_objects(
        &self,
        before: &Map<String, Value>,
        after: &Map<String, Value>,
    ) -> Option<Delta> {
        let mut fields = BTreeMap::new();
        for (key, old) in before {
            match after.get(key) {
                Some(new) => {
                    if let Some(delta) = self.diff(old, new) {
                        fields.insert(key.clone(), delta);
                    }
                }
                None => {
                    fields.insert(key.clone(), Delta::Removed { old: old.clone() });
                }
            }
        }
        for (key, new) in after {
            if !before.contains_key(key) {
                fields.insert(key.clone(), Delta::Added { value: new.clone() });
            }
        }
        if fields.is_empty() {
            None
        } else {
            Some(Delta::Object { fields })
        }
    }

    fn diff_arrays(&self, before: &[Document], after: &[Document]) -> Option<Delta> {
        let before_keys: Vec<_> = before
            .iter()
            .enumerate()
            .map(|(i, v)| self.identity.identity(v, i))
            .collect();
        let after_keys: Vec<_> = after
            .iter()
            .enumerate()
            .map(|(j, v)| self.identity.identity(v, j))
            .collect();

        // Match each after element to the first unused before element
        // carrying the same identity.
        let mut used = vec![false; before.len()];
        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for (j, key) in after_keys.iter().enumerate() {
            if let Some(i) = (0..before.len()).find(|&i| !used[i] && before_keys[i] == *key) {
                used[i] = true;
                pairs.push((i, j));
            }
        }
        pairs.sort_unstable();

        let stable = stable_pairs(&pairs);
        let mut after_matched = vec![false; after.len()];
        for &(_, j) in &pairs {
            after_matched[j] = true;
        }

        let mut ops = ArrayDelta::default();
        for (i, value) in before.iter().enumerate() {
            if !used[i] {
                ops.removed.push((i, value.clone()));
            }
        }
        for (j, value) in after.iter().enumerate() {
            if !after_matched[j] {
                ops.inserted.push((j, value.clone()));
            }
        }
        for &(i, j) in &pairs {
            if !stable.contains(&(i, j)) {
                ops.moved.push((i, j));
            }
            if let Some(delta) = self.diff(&before[i], &after[j]) {
                ops.changed.push((j, delta));
            }
        }
        ops.moved.sort_unstable_by_key(|entry| entry.1);
        ops.changed.sort_unstable_by_key(|entry| entry.0);

        if ops.is_empty() {
            None
        } else {
            Some(Delta::Array { ops })
        }
    }

    /// Applies `delta` forward, producing the after-state of `doc`.
    ///
    /// # Errors
    ///
    /// Returns a [`DiffError`] when the delta does not fit the document:
    /// container kind mismatches, out-of-range array positions, or
    /// presence markers contradicting the document. Leaf values that
    /// differ from the delta's recorded old value are tolerated.
    pub fn patch(&self, doc: &Document, delta: &Delta) -> DiffResult<Document> {
        self.patch_slot(Some(doc.clone()), delta)?
            .ok_or_else(|| DiffError::shape_mismatch("delta removes the document root"))
    }

    /// Applies `delta` in reverse, reconstructing the before-state of `doc`.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Differ::patch`].
    pub fn unpatch(&self, doc: &Document, delta: &Delta) -> DiffResult<Document> {
        self.unpatch_slot(Some(doc.clone()), delta)?
            .ok_or_else(|| DiffError::shape_mismatch("delta removes the document root"))
    }

    fn patch_slot(&self, slot: Option<Document>, delta: &Delta) -> DiffResult<Option<Document>> {
        match delta {
            Delta::Added { value } => match slot {
                None => Ok(Some(value.clone())),
                Some(_) => Err(DiffError::shape_mismatch(
                    "addition targets a field that is already present",
                )),
            },
            Delta::Removed { .. } => match slot {
                Some(_) => Ok(None),
                None => Err(DiffError::shape_mismatch(
                    "removal targets a field that is already absent",
                )),
            },
            Delta::Updated { new, .. } => match slot {
                Some(_) => Ok(Some(new.clone())),
                None => Err(DiffError::shape_mismatch("update targets an absent field")),
            },
            Delta::Object { fields } => {
                let Some(Value::Object(mut map)) = slot else {
                    return Err(DiffError::shape_mismatch(
                        "object delta applied to a non-object value",
                    ));
                };
                for (key, field_delta) in fields {
                    let entry = map.remove(key);
                    if let Some(value) = self.patch_slot(entry, field_delta)? {
                        map.insert(key.clone(), value);
                    }
                }
                Ok(Some(Value::Object(map)))
            }
            Delta::Array { ops } => {
                let Some(Value::Array(items)) = slot else {
                    return Err(DiffError::shape_mismatch(
                        "array delta applied to a non-array value",
                    ));
                };
                Ok(Some(Value::Array(self.patch_array(items, ops)?)))
            }
        }
    }

    fn unpatch_slot(&self, slot: Option<Document>, delta: &Delta) -> DiffResult<Option<Document>> {
        match delta {
            Delta::Added { .. } => match slot {
                Some(_) => Ok(None),
                None => Err(DiffError::shape_mismatch(
                    "reversed addition targets an absent field",
                )),
            },
            Delta::Removed { old } => match slot {
                None => Ok(Some(old.clone())),
                Some(_) => Err(DiffError::shape_mismatch(
                    "reversed removal targets a field that is already present",
                )),
            },
            Delta::Updated { old, .. } => match slot {
                Some(_) => Ok(Some(old.clone())),
                None => Err(DiffError::shape_mismatch("update targets an absent field")),
            },
            Delta::Object { fields } => {
                let Some(Value::Object(mut map)) = slot else {
                    return Err(DiffError::shape_mismatch(
                        "object delta applied to a non-object value",
                    ));
                };
                for (key, field_delta) in fields {
                    let entry = map.remove(key);
                    if let Some(value) = self.unpatch_slot(entry, field_delta)? {
                        map.insert(key.clone(), value);
                    }
                }
                Ok(Some(Value::Object(map)))
            }
            Delta::Array { ops } => {
                let Some(Value::Array(items)) = slot else {
                    return Err(DiffError::shape_mismatch(
                        "array delta applied to a non-array value",
                    ));
                };
                Ok(Some(Value::Array(self.unpatch_array(items, ops)?)))
            }
        }
    }

    fn patch_array(&self, items: Vec<Document>, ops: &ArrayDelta) -> DiffResult<Vec<Document>> {
        let mut out = items;

        // Pull removed and moved elements out of their before positions,
        // highest index first so earlier positions stay valid.
        let mut extracts: Vec<(usize, Option<usize>)> =
            ops.removed.iter().map(|entry| (entry.0, None)).collect();
        extracts.extend(ops.moved.iter().map(|&(from, to)| (from, Some(to))));
        extracts.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        check_distinct(extracts.iter().map(|entry| entry.0))?;

        let mut carried: Vec<(usize, Document)> = Vec::new();
        for (index, target) in extracts {
            if index >= out.len() {
                return Err(DiffError::IndexOutOfBounds {
                    index,
                    len: out.len(),
                });
            }
            let value = out.remove(index);
            if let Some(to) = target {
                carried.push((to, value));
            }
        }

        // Place inserted and moved elements at their after positions,
        // lowest index first.
        let mut inserts: Vec<(usize, Document)> = ops.inserted.clone();
        inserts.append(&mut carried);
        inserts.sort_unstable_by_key(|entry| entry.0);
        check_distinct(inserts.iter().map(|entry| entry.0))?;

        for (index, value) in inserts {
            if index > out.len() {
                return Err(DiffError::IndexOutOfBounds {
                    index,
                    len: out.len(),
                });
            }
            out.insert(index, value);
        }

        for (index, delta) in &ops.changed {
            if *index >= out.len() {
                return Err(DiffError::IndexOutOfBounds {
                    index: *index,
                    len: out.len(),
                });
            }
            let patched = self.patch(&out[*index], delta)?;
            out[*index] = patched;
        }
        Ok(out)
    }

    fn unpatch_array(&self, items: Vec<Document>, ops: &ArrayDelta) -> DiffResult<Vec<Document>> {
        let mut out = items;

        // Content changes are recorded against after positions, so they are
        // reversed before any element leaves its after position.
        for (index, delta) in &ops.changed {
            if *index >= out.len() {
                return Err(DiffError::IndexOutOfBounds {
                    index: *index,
                    len: out.len(),
                });
            }
            let restored = self.unpatch(&out[*index], delta)?;
            out[*index] = restored;
        }

        let mut extracts: Vec<(usize, Option<usize>)> =
            ops.inserted.iter().map(|entry| (entry.0, None)).collect();
        extracts.extend(ops.moved.iter().map(|&(from, to)| (to, Some(from))));
        extracts.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        check_distinct(extracts.iter().map(|entry| entry.0))?;

        let mut carried: Vec<(usize, Document)> = Vec::new();
        for (index, origin) in extracts {
            if index >= out.len() {
                return Err(DiffError::IndexOutOfBounds {
                    index,
                    len: out.len(),
                });
            }
            let value = out.remove(index);
            if let Some(from) = origin {
                carried.push((from, value));
            }
        }

        let mut inserts: Vec<(usize, Document)> = ops.removed.clone();
        inserts.append(&mut carried);
        inserts.sort_unstable_by_key(|entry| entry.0);
        check_distinct(inserts.iter().map(|entry| entry.0))?;

        for (index, value) in inserts {
            if index > out.len() {
                return Err(DiffError::IndexOutOfBounds {
                    index,
                    len: out.len(),
                });
            }
            out.insert(index, value);
        }
        Ok(out)
    }
}

impl Default for Differ {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Differ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Differ").finish_non_exhaustive()
    }
}

/// Longest run of matched pairs whose relative order is preserved on both
/// sides. These elements are never recorded as moves; everything matched
/// outside the run is. Ties resolve toward earlier before-elements.
fn stable_pairs(pairs: &[(usize, usize)]) -> HashSet<(usize, usize)> {
    let n = pairs.len();
    let mut by_after: Vec<(usize, usize)> = pairs.to_vec();
    by_after.sort_unstable_by_key(|entry| entry.1);

    let mut table = vec![vec![0usize; n + 1]; n + 1];
    for x in 1..=n {
        for y in 1..=n {
            table[x][y] = if pairs[x - 1] == by_after[y - 1] {
                table[x - 1][y - 1] + 1
            } else {
                table[x - 1][y].max(table[x][y - 1])
            };
        }
    }

    let mut stable = HashSet::new();
    let (mut x, mut y) = (n, n);
    while x > 0 && y > 0 {
        if pairs[x - 1] == by_after[y - 1] {
            stable.insert(pairs[x - 1]);
            x -= 1;
            y -= 1;
        } else if table[x - 1][y] >= table[x][y - 1] {
            x -= 1;
        } else {
            y -= 1;
        }
    }
    stable
}

fn check_distinct(indices: impl Iterator<Item = usize>) -> DiffResult<()> {
    let mut seen = HashSet::new();
    for index in indices {
        if !seen.insert(index) {
            return Err(DiffError::DuplicatePosition { index });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn differ() -> Differ {
        Differ::new()
    }

    fn round_trip(before: &Document, after: &Document) {
        let d = differ();
        match d.diff(before, after) {
            Some(delta) => {
                assert_eq!(&d.patch(before, &delta).unwrap(), after, "patch");
                assert_eq!(&d.unpatch(after, &delta).unwrap(), before, "unpatch");
            }
            None => assert_eq!(before, after),
        }
    }

    #[test]
    fn equal_documents_yield_none() {
        let doc = json!({"a": 1, "b": [1, 2, {"c": null}]});
        assert_eq!(differ().diff(&doc, &doc), None);
    }

    #[test]
    fn scalar_change_is_updated() {
        let delta = differ().diff(&json!("hi"), &json!("ho")).unwrap();
        assert_eq!(
            delta,
            Delta::Updated {
                old: json!("hi"),
                new: json!("ho"),
            }
        );
    }

    #[test]
    fn kind_change_is_whole_replacement() {
        let delta = differ().diff(&json!({"a": 1}), &json!([1])).unwrap();
        assert!(matches!(delta, Delta::Updated { .. }));
    }

    #[test]
    fn object_diff_covers_only_changed_fields() {
        let before = json!({"a": "hi", "b": {"c": "c"}, "keep": 1});
        let after = json!({"a": "ho", "b": {"c": "c"}, "keep": 1});
        let delta = differ().diff(&before, &after).unwrap();

        let fields = delta.as_object().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(
            fields["a"],
            Delta::Updated {
                old: json!("hi"),
                new: json!("ho"),
            }
        );
        round_trip(&before, &after);
    }

    #[test]
    fn field_addition_and_removal_markers() {
        let before = json!({"gone": 1, "kept": 2});
        let after = json!({"kept": 2, "fresh": 3});
        let delta = differ().diff(&before, &after).unwrap();

        let fields = delta.as_object().unwrap();
        assert_eq!(fields["gone"], Delta::Removed { old: json!(1) });
        assert_eq!(fields["fresh"], Delta::Added { value: json!(3) });
        round_trip(&before, &after);
    }

    #[test]
    fn deletion_diff_removes_every_field() {
        let before = json!({"a": "hi", "b": {"c": "c"}});
        let after = json!({});
        let delta = differ().diff(&before, &after).unwrap();
        let fields = delta.as_object().unwrap();
        assert_eq!(fields.len(), 2);
        assert!(fields.values().all(|d| matches!(d, Delta::Removed { .. })));
        round_trip(&before, &after);
    }

    #[test]
    fn array_reorder_with_content_change() {
        // Reordering plus one content change must yield moves and a nested
        // delta, never a whole-array replacement.
        let before = json!([
            {"id": 1, "v": "a"},
            {"id": 2, "v": "b"},
            {"id": 3, "v": "c"},
        ]);
        let after = json!([
            {"id": 3, "v": "c"},
            {"id": 2, "v": "b"},
            {"id": 1, "v": "new"},
        ]);
        let delta = differ().diff(&before, &after).unwrap();
        let Delta::Array { ops } = &delta else {
            panic!("expected array delta, got {delta:?}");
        };

        assert!(ops.inserted.is_empty());
        assert!(ops.removed.is_empty());
        // ids 2 and 3 move; id 1 stays the anchor and only changes content
        assert_eq!(ops.moved, vec![(2, 0), (1, 1)]);
        assert_eq!(ops.changed.len(), 1);
        let (index, nested) = &ops.changed[0];
        assert_eq!(*index, 2);
        let fields = nested.as_object().unwrap();
        assert_eq!(
            fields["v"],
            Delta::Updated {
                old: json!("a"),
                new: json!("new"),
            }
        );

        round_trip(&before, &after);
    }

    #[test]
    fn array_removal_produces_no_spurious_moves() {
        let before = json!([{"id": "a"}, {"id": "b"}, {"id": "c"}]);
        let after = json!([{"id": "a"}, {"id": "c"}]);
        let delta = differ().diff(&before, &after).unwrap();
        let Delta::Array { ops } = &delta else {
            panic!("expected array delta");
        };
        assert_eq!(ops.removed, vec![(1, json!({"id": "b"}))]);
        assert!(ops.moved.is_empty());
        assert!(ops.inserted.is_empty());
        round_trip(&before, &after);
    }

    #[test]
    fn array_insertion() {
        let before = json!([{"id": "a"}, {"id": "c"}]);
        let after = json!([{"id": "a"}, {"id": "b"}, {"id": "c"}]);
        let delta = differ().diff(&before, &after).unwrap();
        let Delta::Array { ops } = &delta else {
            panic!("expected array delta");
        };
        assert_eq!(ops.inserted, vec![(1, json!({"id": "b"}))]);
        assert!(ops.moved.is_empty());
        round_trip(&before, &after);
    }

    #[test]
    fn scalar_arrays_fall_back_to_positional() {
        round_trip(&json!([1, 2, 3]), &json!([1, 9, 3, 4]));
        round_trip(&json!(["a", "b", "c"]), &json!(["b"]));
        round_trip(&json!([]), &json!([1, 2]));
    }

    #[test]
    fn move_combined_with_insert_and_remove() {
        let before = json!([{"id": "a", "n": 0}, {"id": "b"}]);
        let after = json!([{"id": "b"}, {"id": "x"}, {"id": "a", "n": 1}]);
        round_trip(&before, &after);
    }

    #[test]
    fn duplicate_identities_match_in_order() {
        let before = json!([{"id": 1, "v": "a"}, {"id": 1, "v": "b"}]);
        let after = json!([{"id": 1, "v": "b"}]);
        round_trip(&before, &after);
    }

    #[test]
    fn patch_rejects_shape_mismatch() {
        let d = differ();
        let delta = d
            .diff(&json!({"a": {"b": 1}}), &json!({"a": {"b": 2}}))
            .unwrap();
        let err = d.patch(&json!({"a": 5}), &delta).unwrap_err();
        assert!(matches!(err, DiffError::ShapeMismatch { .. }));
    }

    #[test]
    fn patch_rejects_out_of_range_index() {
        let d = differ();
        let delta = Delta::Array {
            ops: ArrayDelta {
                removed: vec![(4, json!(1))],
                ..ArrayDelta::default()
            },
        };
        let err = d.patch(&json!([1, 2]), &delta).unwrap_err();
        assert_eq!(err, DiffError::IndexOutOfBounds { index: 4, len: 2 });
    }

    #[test]
    fn patch_rejects_duplicate_positions() {
        let d = differ();
        let delta = Delta::Array {
            ops: ArrayDelta {
                removed: vec![(0, json!(1)), (0, json!(2))],
                ..ArrayDelta::default()
            },
        };
        let err = d.patch(&json!([1, 2]), &delta).unwrap_err();
        assert_eq!(err, DiffError::DuplicatePosition { index: 0 });
    }

    #[test]
    fn unpatch_rejects_presence_contradiction() {
        let d = differ();
        let mut fields = BTreeMap::new();
        fields.insert("a".to_string(), Delta::Added { value: json!(1) });
        let delta = Delta::Object { fields };
        // Reversing an addition requires the field to be present.
        let err = d.unpatch(&json!({}), &delta).unwrap_err();
        assert!(matches!(err, DiffError::ShapeMismatch { .. }));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn document_strategy() -> impl Strategy<Value = Document> {
            let leaf = prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::from),
                any::<i32>().prop_map(Value::from),
                "[a-z]{0,6}".prop_map(Value::from),
            ];
            leaf.prop_recursive(3, 32, 4, |inner| {
                prop_oneof![
                    prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                    prop::collection::btree_map("[a-z]{1,3}", inner, 0..4)
                        .prop_map(|map| Value::Object(map.into_iter().collect())),
                ]
            })
        }

        // Arrays of id-bearing objects in a shuffled order, to exercise the
        // move path rather than the positional fallback.
        fn keyed_array_strategy() -> impl Strategy<Value = (Document, Document)> {
            let items = prop::collection::vec(("[a-z]{1,4}", any::<i16>()), 0..6);
            (items, any::<u64>(), any::<u64>()).prop_map(|(items, seed_a, seed_b)| {
                let build = |seed: u64, drop_one: bool| {
                    let mut docs: Vec<Document> = items
                        .iter()
                        .enumerate()
                        .map(|(i, (name, n))| {
                            serde_json::json!({"id": i, "name": name, "n": n})
                        })
                        .collect();
                    // cheap deterministic shuffle
                    let len = docs.len();
                    for i in 0..len {
                        let j = (seed as usize).wrapping_mul(31).wrapping_add(i * 7) % len.max(1);
                        docs.swap(i, j);
                    }
                    if drop_one && !docs.is_empty() {
                        docs.remove(seed as usize % docs.len());
                    }
                    Value::Array(docs)
                };
                (build(seed_a, false), build(seed_b, seed_b % 3 == 0))
            })
        }

        proptest! {
            #[test]
            fn diff_of_identical_documents_is_none(doc in document_strategy()) {
                prop_assert_eq!(Differ::new().diff(&doc, &doc), None);
            }

            #[test]
            fn patch_and_unpatch_invert_diff(
                before in document_strategy(),
                after in document_strategy(),
            ) {
                let d = Differ::new();
                if let Some(delta) = d.diff(&before, &after) {
                    prop_assert_eq!(d.patch(&before, &delta).unwrap(), after.clone());
                    prop_assert_eq!(d.unpatch(&after, &delta).unwrap(), before);
                } else {
                    prop_assert_eq!(before, after);
                }
            }

            #[test]
            fn keyed_arrays_round_trip((before, after) in keyed_array_strategy()) {
                let d = Differ::new();
                if let Some(delta) = d.diff(&before, &after) {
                    prop_assert_eq!(d.patch(&before, &delta).unwrap(), after.clone());
                    prop_assert_eq!(d.unpatch(&after, &delta).unwrap(), before);
                }
            }
        }
    }
}
