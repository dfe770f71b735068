/*++

Licensed under the Apache-2.0 license.

File Name:

    sort.rs

Abstract:

    File contains iterator ordering helpers.

--*/

/// Collects `iter` and yields it ordered by the key function. The result
/// iterates from both ends, so callers can walk descending with `rev()`.
pub fn sorted_by_key<K: Ord, T>(
    iter: impl Iterator<Item = T>,
    f: impl FnMut(&T) -> K,
) -> impl DoubleEndedIterator<Item = T> {
    let mut result: Vec<T> = iter.collect();
    result.sort_unstable_by_key(f);
    result.into_iter()
}
