//! Lossless fact trie.
//!
//! Facts are stored exactly, one edge-labeled node per word. A single
//! traversal answers containment and fills the caller's completion buffer.
//! The root additionally owns the skip-gram index used for sentence-initial
//! insertions: for a query starting at word `w`, it proposes the first words
//! observed to precede `w` in the corpus.
//!
//! Children are stored by value in an ordered map keyed by word id, so
//! enumeration order, and therefore completion output order, is total and
//! reproducible.

use std::collections::BTreeMap;
#[cfg(feature = "high-memory")]
use std::collections::BTreeSet;
use std::mem::size_of;

use smallvec::SmallVec;

use crate::build::DeletionFilter;
use crate::index::{check_query, FactIndex};
use crate::metrics::MemoryBreakdown;
use crate::types::{Edge, EdgeKind, Sense, TaggedWord, Word, MAX_COMPLETIONS, MAX_EDGE_VARIANTS};


/// Inner-traversal sentinel meaning "completions already emitted at the
/// root"; any value that stays below -1 for the whole walk works.
const MUTATION_DONE: i32 = -9000;

/// Insertion variant registered on a node: the sense and edge type a fact
/// carried when it passed through here.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct EdgeMeta {
    pub sense: Sense,
    pub kind: EdgeKind,
}

#[derive(Debug, Default)]
pub(crate) struct TrieNode {
    children: BTreeMap<Word, TrieNode>,
    /// Deduplicated variants, capped at `MAX_EDGE_VARIANTS`.
    variants: SmallVec<[EdgeMeta; MAX_EDGE_VARIANTS]>,
    is_leaf: bool,
    /// Direct children that terminate a fact, consulted when this node has
    /// more children than one query may return.
    #[cfg(feature = "high-memory")]
    leaf_children: BTreeSet<Word>,
}

impl TrieNode {
    fn add(&mut self, edges: &[Edge], deletions: Option<&dyn DeletionFilter>) {
        let Some((first, rest)) = edges.split_first() else {
            return;
        };
        let word = first.source;
        debug_assert!(!word.is_null(), "null word inside a fact");
        let child = self.children.entry(word).or_default();
        if deletions.map_or(true, |filter| filter.permits(first)) {
            child.register_variant(EdgeMeta {
                sense: first.source_sense,
                kind: first.kind,
            });
        }
        if rest.is_empty() {
            child.is_leaf = true;
            #[cfg(feature = "high-memory")]
            self.leaf_children.insert(word);
        } else {
            child.add(rest, deletions);
        }
    }

    fn register_variant(&mut self, meta: EdgeMeta) {
        if self.variants.len() < MAX_EDGE_VARIANTS && !self.variants.contains(&meta) {
            self.variants.push(meta);
        }
    }

    /// One completion record per registered variant of `child`, bounded so
    /// the output ends exactly at the cap.
    fn push_child(child: &TrieNode, source: Word, out: &mut [Edge], filled: &mut usize) {
        for meta in &child.variants {
            if *filled >= MAX_COMPLETIONS {
                return;
            }
            out[*filled] = Edge::insertion(source, meta.sense, meta.kind);
            *filled += 1;
        }
    }

    /// Enumerates completions available at this node. With more children
    /// than the cap, falls back to the leaf-child cache when built with it.
    fn push_completions(&self, out: &mut [Edge], filled: &mut usize) {
        if self.children.len() <= MAX_COMPLETIONS {
            for (&word, child) in &self.children {
                Self::push_child(child, word, out, filled);
                if *filled >= MAX_COMPLETIONS {
                    break;
                }
            }
        } else {
            #[cfg(feature = "high-memory")]
            for &word in &self.leaf_children {
                if let Some(child) = self.children.get(&word) {
                    Self::push_child(child, word, out, filled);
                }
                if *filled >= MAX_COMPLETIONS {
                    break;
                }
            }
        }
    }

    /// Completion fill + containment in one downward walk. The mutation
    /// index decrements per step; completions are emitted at the node where
    /// it reaches -1.
    fn contains_from(
        &self,
        query: &[TaggedWord],
        mutation_index: i32,
        out: &mut [Edge],
        filled: &mut usize,
    ) -> bool {
        if mutation_index == -1 {
            self.push_completions(out, filled);
        }
        match query.split_first() {
            None => self.is_leaf,
            Some((head, rest)) => match self.children.get(&head.word) {
                None => false,
                Some(child) => child.contains_from(rest, mutation_index - 1, out, filled),
            },
        }
    }

    fn memory_usage(&self, out: &mut MemoryBreakdown) {
        out.on_structure += size_of::<Self>() as u64;
        #[cfg(feature = "high-memory")]
        {
            out.on_completion_caching +=
                (self.leaf_children.len() * size_of::<Word>()) as u64;
        }
        for child in self.children.values() {
            out.on_facts += size_of::<Word>() as u64;
            child.memory_usage(out);
        }
    }
}

/// The lossless index: trie root plus the skip-gram prefix index.
#[derive(Debug, Default)]
pub struct FactTrie {
    root: TrieNode,
    /// second word -> first words observed to precede it.
    skip_grams: BTreeMap<Word, Vec<Word>>,
}

impl FactTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts one fact, given as one edge per word. Re-adding a fact (or a
    /// sense variant of one) only registers new metadata; the fact set is
    /// unchanged.
    pub fn add(&mut self, edges: &[Edge], deletions: Option<&dyn DeletionFilter>) {
        if edges.is_empty() {
            return;
        }
        self.root.add(edges, deletions);
        if edges.len() > 1 {
            let first = edges[0].source;
            let second = edges[1].source;
            debug_assert!(!second.is_null(), "null word inside a fact");
            let firsts = self.skip_grams.entry(second).or_default();
            if !firsts.contains(&first) {
                firsts.push(first);
            }
        }
    }

    fn contains_impl(&self, query: &[TaggedWord], mutation_index: i32, out: &mut [Edge]) -> bool {
        check_query(query, mutation_index, out);
        let mut filled = 0usize;
        let found = if mutation_index == -1 {
            if let Some(head) = query.first() {
                match self.skip_grams.get(&head.word) {
                    Some(firsts) => {
                        // Propose anything observed to lead into the query's
                        // first word.
                        for &word in firsts {
                            if let Some(child) = self.root.children.get(&word) {
                                TrieNode::push_child(child, word, out, &mut filled);
                            }
                            if filled >= MAX_COMPLETIONS {
                                break;
                            }
                        }
                    }
                    None => {
                        // No skip-gram matches; fall back to every first word.
                        for (&word, child) in &self.root.children {
                            TrieNode::push_child(child, word, out, &mut filled);
                            if filled >= MAX_COMPLETIONS {
                                break;
                            }
                        }
                    }
                }
            } else {
                // Empty query: single-word facts are the only completions.
                for (&word, child) in &self.root.children {
                    if child.is_leaf {
                        TrieNode::push_child(child, word, out, &mut filled);
                        if filled >= MAX_COMPLETIONS {
                            break;
                        }
                    }
                }
            }
            self.root
                .contains_from(query, MUTATION_DONE, out, &mut filled)
        } else {
            self.root
                .contains_from(query, mutation_index, out, &mut filled)
        };
        out[filled] = Edge::terminator();
        found
    }
}

impl FactIndex for FactTrie {
    fn contains(&self, query: &[TaggedWord], mutation_index: i32, out: &mut [Edge]) -> bool {
        self.contains_impl(query, mutation_index, out)
    }

    fn memory_usage(&self, out: &mut MemoryBreakdown) -> u64 {
        self.root.memory_usage(out);
        for firsts in self.skip_grams.values() {
            out.on_completion_caching += size_of::<Word>() as u64;
            out.on_completion_caching +=
                (size_of::<Vec<Word>>() + firsts.len() * size_of::<Word>()) as u64;
        }
        out.total()
    }
}
