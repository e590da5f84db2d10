//! Packed insertion record: one completion candidate in four bytes.
//!
//! Bit layout, low to high: source word id (22), sense (4), edge kind (4),
//! end-of-list (1), reserved (1). A record whose source field is zero is an
//! empty slot. The explicit shift/mask accessors keep the layout independent
//! of struct representation rules.

use crate::types::{Edge, EdgeKind, Sense, Word, NULL_WORD};

pub(crate) const RECORD_LEN: usize = 4;

const SOURCE_BITS: u32 = 22;
const SENSE_BITS: u32 = 4;
const KIND_BITS: u32 = 4;

const SOURCE_MASK: u32 = (1 << SOURCE_BITS) - 1;
const SENSE_MASK: u32 = (1 << SENSE_BITS) - 1;
const KIND_MASK: u32 = (1 << KIND_BITS) - 1;

const SENSE_SHIFT: u32 = SOURCE_BITS;
const KIND_SHIFT: u32 = SENSE_SHIFT + SENSE_BITS;
const END_SHIFT: u32 = KIND_SHIFT + KIND_BITS;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct PackedInsertion(u32);

impl PackedInsertion {
    pub fn new(source: Word, sense: Sense, kind: EdgeKind, end_of_list: bool) -> Self {
        debug_assert!(source.0 <= SOURCE_MASK, "word id exceeds packed width");
        debug_assert!(u32::from(sense.0) <= SENSE_MASK, "sense exceeds packed width");
        debug_assert!(u32::from(kind.0) <= KIND_MASK, "edge kind exceeds packed width");
        let mut bits = source.0 & SOURCE_MASK;
        bits |= (u32::from(sense.0) & SENSE_MASK) << SENSE_SHIFT;
        bits |= (u32::from(kind.0) & KIND_MASK) << KIND_SHIFT;
        bits |= u32::from(end_of_list) << END_SHIFT;
        Self(bits)
    }

    #[inline]
    pub fn source(self) -> Word {
        Word(self.0 & SOURCE_MASK)
    }

    #[inline]
    pub fn sense(self) -> Sense {
        Sense(((self.0 >> SENSE_SHIFT) & SENSE_MASK) as u8)
    }

    #[inline]
    pub fn kind(self) -> EdgeKind {
        EdgeKind(((self.0 >> KIND_SHIFT) & KIND_MASK) as u8)
    }

    #[inline]
    pub fn end_of_list(self) -> bool {
        (self.0 >> END_SHIFT) & 1 != 0
    }

    pub fn clear_end_of_list(&mut self) {
        self.0 &= !(1 << END_SHIFT);
    }

    /// An all-zero record: the slot has never been written.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.source().is_null()
    }

    pub fn to_le_bytes(self) -> [u8; RECORD_LEN] {
        self.0.to_le_bytes()
    }

    pub fn from_le_bytes(bytes: [u8; RECORD_LEN]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }

    /// Expands into the caller-facing completion slot.
    pub fn to_edge(self) -> Edge {
        Edge {
            source: self.source(),
            source_sense: self.sense(),
            sink: NULL_WORD,
            sink_sense: Sense(0),
            kind: self.kind(),
            cost: 1.0,
        }
    }
}
