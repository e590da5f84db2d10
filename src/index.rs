//! Uniform query façade over both index variants.

use crate::metrics::MemoryBreakdown;
use crate::types::{Edge, TaggedWord, MAX_COMPLETIONS};

/// Containment + completion enumeration in one call.
///
/// `query` is the partial fact under consideration and `mutation_index` the
/// position at which the search engine may insert a word: `-1` means before
/// the current position (emit completions immediately), `k >= 0` means after
/// position `k`. `out` is a caller-owned buffer of at least
/// `MAX_COMPLETIONS + 1` slots; up to `MAX_COMPLETIONS` records are written,
/// followed by a `source = 0` terminator. Returns whether the exact word
/// sequence is a stored fact.
///
/// Queries never fail and are safe for unbounded concurrent readers once
/// the index is built.
pub trait FactIndex {
    fn contains(&self, query: &[TaggedWord], mutation_index: i32, out: &mut [Edge]) -> bool;

    /// Accumulates a memory breakdown into `out` and returns the total.
    fn memory_usage(&self, out: &mut MemoryBreakdown) -> u64;
}

/// Shared precondition check for the query entry points.
#[inline]
pub(crate) fn check_query(query: &[TaggedWord], mutation_index: i32, out: &[Edge]) {
    debug_assert!(
        out.len() > MAX_COMPLETIONS,
        "output buffer must hold MAX_COMPLETIONS + 1 slots"
    );
    debug_assert!(
        (query.len() as i32) > mutation_index,
        "mutation index past the end of the query"
    );
}
