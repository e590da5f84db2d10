//! Core identifier types and compile-time limits shared by both index
//! variants.

/// Hard cap on completion records returned by a single query.
pub const MAX_COMPLETIONS: usize = 25;

/// Longest fact the builders will accept; glosses are truncated past this.
pub const MAX_FACT_LENGTH: usize = 256;

/// Most edge-metadata variants a trie node retains for one child word.
pub const MAX_EDGE_VARIANTS: usize = 4;

/// Word identifier. `Word(0)` is the reserved null sentinel ("no word /
/// end of list") and never appears inside a stored fact.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Word(pub u32);

pub const NULL_WORD: Word = Word(0);

impl Word {
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Word-sense tag. Senses never participate in fact identity; they
/// parameterize which insertion variants a completion may carry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Sense(pub u8);

/// Edge-type tag carried by an insertion variant.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct EdgeKind(pub u8);

/// One element of a query sequence. Only `word` matters for containment.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub struct TaggedWord {
    pub word: Word,
    pub sense: Sense,
}

impl TaggedWord {
    #[inline]
    pub const fn new(word: Word) -> Self {
        Self {
            word,
            sense: Sense(0),
        }
    }
}

/// Fact element at build time and completion slot at query time.
///
/// Completion outputs always carry `sink = 0`, `sink_sense = 0` and
/// `cost = 1.0`; a `source` of zero marks the end of the output list.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Edge {
    pub source: Word,
    pub source_sense: Sense,
    pub sink: Word,
    pub sink_sense: Sense,
    pub kind: EdgeKind,
    pub cost: f32,
}

impl Edge {
    /// Build-side element for a word with an explicit insertion variant.
    pub fn insertion(source: Word, sense: Sense, kind: EdgeKind) -> Self {
        Self {
            source,
            source_sense: sense,
            sink: NULL_WORD,
            sink_sense: Sense(0),
            kind,
            cost: 1.0,
        }
    }

    /// End-of-list marker written after the last completion record.
    pub fn terminator() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_terminator(&self) -> bool {
        self.source.is_null()
    }
}
