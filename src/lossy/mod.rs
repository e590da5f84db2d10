//! Lossy packed fact index.
//!
//! Facts and their completions live in one flat byte buffer, partitioned
//! up front by the count map's pointer pass. Each bucket is addressed by the
//! double-FNV fingerprint of a word-id prefix and holds a flag byte followed
//! by up to `MAX_COMPLETIONS` packed records. Distinct facts whose
//! fingerprints collide on both hashes are conflated (the lossy regime),
//! but a stored fact is never missed.
//!
//! The layout is frozen at construction: pointers never move, and records
//! are edited in place only while the bucket's saturation flag is unset.

use std::collections::BTreeMap;
use std::mem::size_of;

use smallvec::SmallVec;
use tracing::info;

use crate::count_map::{CountMap, PointerMap};
use crate::error::{IndexError, Result};
use crate::fingerprint::fingerprint;
use crate::index::{check_query, FactIndex};
use crate::metrics::MemoryBreakdown;
use crate::types::{Edge, EdgeKind, Sense, TaggedWord, Word, MAX_COMPLETIONS};

mod record;
pub(crate) use record::{PackedInsertion, RECORD_LEN};

#[cfg(test)]
mod tests;

/// Flag byte stored at `pointer - 1` of every bucket.
const FLAG_IS_FACT: u8 = 0x1;
const FLAG_HAS_COMPLETIONS: u8 = 0x2;
const FLAG_BUCKET_FULL: u8 = 0x4;

pub struct LossyFactIndex {
    /// Fingerprint -> first-record offset, frozen at construction.
    pointers: PointerMap,
    /// Null-guard byte, then per-bucket `[flag][records...]` regions.
    data: Box<[u8]>,
    /// Sentence-initial completions: second word -> insertable first words.
    begin_insertions: BTreeMap<Word, Vec<PackedInsertion>>,
}

impl LossyFactIndex {
    /// Sizes and partitions the completion buffer from pass-1 counts.
    /// Consuming the map is the counts-to-pointers phase transition; the
    /// returned index is the only remaining handle on the directory.
    pub fn with_counts(counts: CountMap) -> Result<Self> {
        let sum = counts.sum();
        let buckets = counts.len();
        let size = sum * RECORD_LEN as u64 + buckets as u64 + 1;
        // Bucket pointers are 32-bit offsets into the buffer.
        if size > u64::from(u32::MAX) {
            return Err(IndexError::CapacityExceeded(format!(
                "completion buffer needs {size} bytes for {sum} records"
            )));
        }
        let size = size as usize;
        if sum > 1024 {
            info!(
                completions = sum,
                buckets,
                bytes = size,
                "allocating completion buffer"
            );
        }
        let data = vec![0u8; size].into_boxed_slice();

        let mut cursor: u32 = 1;
        let pointers = counts.into_pointers(|count| {
            let pointer = cursor;
            cursor += count * RECORD_LEN as u32 + 1;
            pointer + 1
        });
        debug_assert_eq!(cursor as usize, size);

        Ok(Self {
            pointers,
            data,
            begin_insertions: BTreeMap::new(),
        })
    }

    fn record_at(&self, pointer: usize, index: usize) -> PackedInsertion {
        let offset = pointer + index * RECORD_LEN;
        let mut bytes = [0u8; RECORD_LEN];
        bytes.copy_from_slice(&self.data[offset..offset + RECORD_LEN]);
        PackedInsertion::from_le_bytes(bytes)
    }

    fn write_record(&mut self, pointer: usize, index: usize, record: PackedInsertion) {
        let offset = pointer + index * RECORD_LEN;
        self.data[offset..offset + RECORD_LEN].copy_from_slice(&record.to_le_bytes());
    }

    fn bucket(&self, words: &[Word]) -> Result<usize> {
        self.pointers
            .get(fingerprint(words))
            .map(|pointer| pointer as usize)
            .ok_or(IndexError::Corruption(
                "no pointer allocated for completion bucket",
            ))
    }

    /// Appends one completion record to the bucket of `prefix`. A full
    /// bucket is marked saturated and silently drops the record; the last
    /// in-bounds record keeps its end-of-list bit so readers stay bounded.
    pub(crate) fn add_completion(
        &mut self,
        prefix: &[Word],
        source: Word,
        sense: Sense,
        kind: EdgeKind,
    ) -> Result<()> {
        let pointer = self.bucket(prefix)?;
        self.data[pointer - 1] |= FLAG_HAS_COMPLETIONS;
        if self.data[pointer - 1] & FLAG_BUCKET_FULL != 0 {
            return Ok(());
        }

        let mut index = 0usize;
        if !self.record_at(pointer, 0).is_empty() {
            while index < MAX_COMPLETIONS && !self.record_at(pointer, index).end_of_list() {
                index += 1;
            }
            if index + 1 >= MAX_COMPLETIONS {
                self.data[pointer - 1] |= FLAG_BUCKET_FULL;
                return Ok(());
            }
            let mut last = self.record_at(pointer, index);
            last.clear_end_of_list();
            self.write_record(pointer, index, last);
            index += 1;
        }
        self.write_record(pointer, index, PackedInsertion::new(source, sense, kind, true));
        Ok(())
    }

    /// Registers a sentence-initial insertion: `first` (with the given
    /// variant) may be prepended to any fact whose first word is `second`.
    pub(crate) fn add_begin_insertion(
        &mut self,
        first: Word,
        sense: Sense,
        kind: EdgeKind,
        second: Word,
    ) {
        self.begin_insertions
            .entry(second)
            .or_default()
            .push(PackedInsertion::new(first, sense, kind, false));
    }

    /// Marks the exact sequence as a stored fact.
    pub(crate) fn mark_fact(&mut self, words: &[Word]) -> Result<()> {
        let pointer = self.bucket(words)?;
        self.data[pointer - 1] |= FLAG_IS_FACT;
        Ok(())
    }

    /// Raw buffer access for determinism checks.
    #[cfg(test)]
    pub(crate) fn completion_data(&self) -> &[u8] {
        &self.data
    }

    fn contains_impl(&self, query: &[TaggedWord], mutation_index: i32, out: &mut [Edge]) -> bool {
        check_query(query, mutation_index, out);
        let words: SmallVec<[Word; 16]> = query.iter().map(|tagged| tagged.word).collect();

        let mut found = false;
        if let Some(pointer) = self.pointers.get(fingerprint(&words)) {
            found = self.data[pointer as usize - 1] & FLAG_IS_FACT != 0;
        }

        let mut filled = 0usize;
        if mutation_index >= 0 {
            // Mid-fact insertion: the bucket of the prefix ending at the
            // mutation position.
            let prefix = &words[..mutation_index as usize + 1];
            if let Some(pointer) = self.pointers.get(fingerprint(prefix)) {
                let pointer = pointer as usize;
                if self.data[pointer - 1] & FLAG_HAS_COMPLETIONS != 0 {
                    loop {
                        let record = self.record_at(pointer, filled);
                        out[filled] = record.to_edge();
                        filled += 1;
                        if record.end_of_list() || filled >= MAX_COMPLETIONS {
                            break;
                        }
                    }
                }
            }
        } else if let Some(first) = words.first() {
            // Sentence-initial insertion, keyed by the query's first word.
            if let Some(records) = self.begin_insertions.get(first) {
                for record in records.iter().take(MAX_COMPLETIONS) {
                    out[filled] = record.to_edge();
                    filled += 1;
                }
            }
        }
        out[filled] = Edge::terminator();
        found
    }
}

impl FactIndex for LossyFactIndex {
    fn contains(&self, query: &[TaggedWord], mutation_index: i32, out: &mut [Edge]) -> bool {
        self.contains_impl(query, mutation_index, out)
    }

    fn memory_usage(&self, out: &mut MemoryBreakdown) -> u64 {
        out.on_facts += self.data.len() as u64;
        out.on_structure += self.pointers.slot_bytes();
        for records in self.begin_insertions.values() {
            out.on_completion_caching += size_of::<Word>() as u64;
            out.on_completion_caching +=
                (size_of::<Vec<PackedInsertion>>() + records.len() * RECORD_LEN) as u64;
        }
        out.total()
    }
}
