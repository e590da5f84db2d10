//! Builder pipeline and the external interfaces it consumes.
//!
//! The fact corpus arrives as `(gloss, weight)` rows in descending weight
//! order. Building the lossy index takes two passes over the stream (pass 1
//! counts completions per fingerprinted prefix, pass 2 fills the pre-sized
//! buffer), so the driver parses and filters identically on every pass.
//! The lossless trie needs a single pass.

use std::str::FromStr;

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::count_map::CountMap;
use crate::error::{IndexError, Result};
use crate::fingerprint::fingerprint;
use crate::lossy::LossyFactIndex;
use crate::trie::FactTrie;
use crate::types::{Edge, EdgeKind, Sense, Word, MAX_COMPLETIONS, MAX_FACT_LENGTH};


/// Facts logged between progress lines while streaming.
const PROGRESS_INTERVAL: u64 = 1_000_000;

/// Visitor verdict for [`FactSource::scan`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScanStep {
    Continue,
    Stop,
}

/// A stream of weighted fact glosses, ordered by weight descending.
///
/// `scan` may be called more than once per build; each call replays the
/// stream from the top in the same order.
pub trait FactSource {
    fn scan(&self, visit: &mut dyn FnMut(&str, u32) -> Result<ScanStep>) -> Result<()>;
}

/// In-memory fact source; rows are sorted by weight descending on
/// construction. Stands in for the relational corpus in tests.
pub struct MemoryFactSource {
    rows: Vec<(String, u32)>,
}

impl MemoryFactSource {
    pub fn new(mut rows: Vec<(String, u32)>) -> Self {
        rows.sort_by(|a, b| b.1.cmp(&a.1));
        Self { rows }
    }

    /// Convenience constructor from raw word-id facts, all at one weight.
    pub fn from_facts(facts: &[&[u32]]) -> Self {
        let rows = facts
            .iter()
            .map(|fact| {
                let ids: Vec<String> = fact.iter().map(u32::to_string).collect();
                (format!("^{}", ids.join(",")), 1)
            })
            .collect();
        Self::new(rows)
    }
}

impl FactSource for MemoryFactSource {
    fn scan(&self, visit: &mut dyn FnMut(&str, u32) -> Result<ScanStep>) -> Result<()> {
        for (gloss, weight) in &self.rows {
            if visit(gloss, *weight)? == ScanStep::Stop {
                break;
            }
        }
        Ok(())
    }
}

/// One insertion variant of a word: the sense and edge type under which the
/// word may be inserted into a fact.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SenseEntry {
    pub sense: Sense,
    pub kind: EdgeKind,
}

/// Word -> ordered insertion variants. A word absent from the table has the
/// single default variant (sense 0, kind 0).
#[derive(Debug, Default)]
pub struct SenseTable {
    entries: std::collections::BTreeMap<Word, SmallVec<[SenseEntry; 4]>>,
}

impl SenseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, word: Word, sense: Sense, kind: EdgeKind) {
        self.entries
            .entry(word)
            .or_default()
            .push(SenseEntry { sense, kind });
    }

    /// Registered variants, in insertion order; empty for unlisted words.
    pub fn variants(&self, word: Word) -> &[SenseEntry] {
        match self.entries.get(&word) {
            Some(entries) => entries,
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Predicate over build-time edges; only permitted edges register their
/// metadata on trie nodes.
pub trait DeletionFilter {
    fn permits(&self, edge: &Edge) -> bool;
}

/// Runtime build tunables, in the spirit of a database config block.
#[derive(Clone, Debug)]
pub struct BuildOptions {
    /// Slot count of the count/pointer map.
    pub map_capacity: usize,
    /// Facts below this weight are skipped; the stream is weight-ordered,
    /// so the first sub-threshold row stops the scan.
    pub min_weight: u32,
    /// Cap on facts consumed per pass.
    pub max_facts: u64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            map_capacity: crate::count_map::DEFAULT_CAPACITY,
            min_weight: 1,
            max_facts: u64::MAX,
        }
    }
}

impl BuildOptions {
    /// Small map for unit-scale corpora.
    pub fn small() -> Self {
        Self {
            map_capacity: 1 << 10,
            ..Self::default()
        }
    }
}

/// Parses a fact gloss: a sentinel character, then comma-separated word ids.
/// Facts longer than `MAX_FACT_LENGTH` are truncated.
fn parse_gloss(gloss: &str) -> Result<SmallVec<[Word; 8]>> {
    let mut words = SmallVec::new();
    let body = match gloss.chars().next() {
        Some(sentinel) => &gloss[sentinel.len_utf8()..],
        None => return Ok(words),
    };
    if body.is_empty() {
        return Ok(words);
    }
    for token in body.split(',') {
        let id = u32::from_str(token.trim())
            .map_err(|_| IndexError::MalformedGloss(format!("bad word id {token:?} in {gloss:?}")))?;
        if id == 0 {
            return Err(IndexError::MalformedGloss(format!(
                "reserved null word id in {gloss:?}"
            )));
        }
        if words.len() >= MAX_FACT_LENGTH {
            break;
        }
        words.push(Word(id));
    }
    Ok(words)
}

/// Streams parsed facts through `f`, applying the weight threshold and fact
/// cap identically on every pass.
fn for_each_fact<S: FactSource>(
    source: &S,
    options: &BuildOptions,
    f: &mut dyn FnMut(&[Word]) -> Result<()>,
) -> Result<u64> {
    let mut consumed = 0u64;
    source.scan(&mut |gloss, weight| {
        if weight < options.min_weight || consumed >= options.max_facts {
            return Ok(ScanStep::Stop);
        }
        let words = parse_gloss(gloss)?;
        if words.is_empty() {
            return Ok(ScanStep::Continue);
        }
        consumed += 1;
        f(&words)?;
        if consumed % PROGRESS_INTERVAL == 0 {
            debug!(facts = consumed, "streamed facts");
        }
        Ok(ScanStep::Continue)
    })?;
    Ok(consumed)
}

/// Pass 1: completion counts per fingerprinted prefix, plus a flag-only
/// bucket reservation for every whole fact.
fn completion_counts<S: FactSource>(
    source: &S,
    senses: &SenseTable,
    options: &BuildOptions,
) -> Result<CountMap> {
    debug!("pass 1: collecting completion statistics");
    let counts = Mutex::new(CountMap::with_capacity(options.map_capacity));
    let consumed = for_each_fact(source, options, &mut |fact| {
        let mut counts = counts.lock();
        for len in 1..fact.len() {
            let next = fact[len];
            let variants = senses.variants(next).len() as u32;
            counts.increment(fingerprint(&fact[..len]), variants, MAX_COMPLETIONS as u32)?;
        }
        counts.increment(fingerprint(fact), 0, u32::MAX)?;
        Ok(())
    })?;
    debug!(facts = consumed, "pass 1 done");
    Ok(counts.into_inner())
}

/// Pass 2: begin-insertions, per-prefix completion records, and fact marks.
fn add_facts<S: FactSource>(
    source: &S,
    senses: &SenseTable,
    options: &BuildOptions,
    index: &mut LossyFactIndex,
) -> Result<()> {
    debug!("pass 2: filling completion records");
    let consumed = for_each_fact(source, options, &mut |fact| {
        if fact.len() > 1 {
            let variants = senses.variants(fact[0]);
            if variants.len() > 1 {
                for variant in variants {
                    index.add_begin_insertion(fact[0], variant.sense, variant.kind, fact[1]);
                }
            }
        }
        for len in 1..fact.len() {
            let variants = senses.variants(fact[len]);
            if variants.len() > 1 {
                for variant in variants {
                    index.add_completion(&fact[..len], fact[len], variant.sense, variant.kind)?;
                }
            }
        }
        index.mark_fact(fact)
    })?;
    info!(facts = consumed, "lossy index populated");
    Ok(())
}

/// Builds the lossy packed index with two passes over the fact stream.
pub fn build_lossy_index<S: FactSource>(
    source: &S,
    senses: &SenseTable,
    options: &BuildOptions,
) -> Result<LossyFactIndex> {
    let counts = completion_counts(source, senses, options)?;
    let mut index = LossyFactIndex::with_counts(counts)?;
    add_facts(source, senses, options, &mut index)?;
    Ok(index)
}

/// Builds the lossless trie in one pass, expanding sense variants: each fact
/// is added canonically, then once more per alternate variant at every
/// position that has more than one.
pub fn build_fact_trie<S: FactSource>(
    source: &S,
    senses: &SenseTable,
    deletions: Option<&dyn DeletionFilter>,
    options: &BuildOptions,
) -> Result<FactTrie> {
    let mut trie = FactTrie::new();
    let consumed = for_each_fact(source, options, &mut |fact| {
        let mut edges: SmallVec<[Edge; 8]> = fact
            .iter()
            .map(|&word| canonical_edge(senses, word))
            .collect();
        trie.add(&edges, deletions);
        for position in 0..fact.len() {
            let variants = senses.variants(fact[position]);
            if variants.len() > 1 {
                let canonical = edges[position];
                for variant in &variants[1..] {
                    edges[position] =
                        Edge::insertion(fact[position], variant.sense, variant.kind);
                    trie.add(&edges, deletions);
                }
                edges[position] = canonical;
            }
        }
        Ok(())
    })?;
    info!(facts = consumed, "fact trie populated");
    Ok(trie)
}

/// First registered variant, or the default (sense 0, kind 0) for unlisted
/// words.
fn canonical_edge(senses: &SenseTable, word: Word) -> Edge {
    match senses.variants(word).first() {
        Some(variant) => Edge::insertion(word, variant.sense, variant.kind),
        None => Edge::insertion(word, Sense(0), EdgeKind(0)),
    }
}
