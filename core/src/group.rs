//! Group-by over key-extraction closures, shared by the matcher rules
//! and the retention engine's per-customer pass.

use std::collections::BTreeMap;

/// Bucket `items` by the key `key_fn` extracts. Items for which `key_fn`
/// returns `None` are left out. Buckets keep input order and iterate in
/// key order, so callers get deterministic output.
pub fn group_by<I, T, K, F>(items: I, mut key_fn: F) -> BTreeMap<K, Vec<T>>
where
    I: IntoIterator<Item = T>,
    K: Ord,
    F: FnMut(&T) -> Option<K>,
{
    let mut groups: BTreeMap<K, Vec<T>> = BTreeMap::new();
    for item in items {
        if let Some(key) = key_fn(&item) {
            groups.entry(key).or_default().push(item);
        }
    }
    groups
}
