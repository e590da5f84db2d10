#![forbid(unsafe_code)]

//! Insertion-completion fact index.
//!
//! Stores a corpus of short word-id sequences ("facts") and answers, in a
//! single call, whether an exact sequence is a known fact and which
//! word+sense+edge-type triples could extend a partial one at a given
//! insertion position. Two build-once/read-many variants share the query
//! shape: [`FactTrie`] is exact, [`LossyFactIndex`] trades possible
//! fingerprint-collision false positives for a flat pre-sized buffer.

pub mod build;
pub mod count_map;
pub mod error;
pub mod fingerprint;
pub mod index;
pub mod lossy;
pub mod metrics;
pub mod trie;
pub mod types;

pub use crate::build::{
    build_fact_trie, build_lossy_index, BuildOptions, DeletionFilter, FactSource,
    MemoryFactSource, ScanStep, SenseEntry, SenseTable,
};
pub use crate::count_map::{CountMap, PointerMap};
pub use crate::error::{IndexError, Result};
pub use crate::fingerprint::{fingerprint, Fingerprint};
pub use crate::index::FactIndex;
pub use crate::lossy::LossyFactIndex;
pub use crate::metrics::MemoryBreakdown;
pub use crate::trie::FactTrie;
pub use crate::types::{
    Edge, EdgeKind, Sense, TaggedWord, Word, MAX_COMPLETIONS, MAX_FACT_LENGTH, NULL_WORD,
};
