use super::*;
use crate::count_map::CountMap;
use crate::types::MAX_FACT_LENGTH;

fn words(ids: &[u32]) -> Vec<Word> {
    ids.iter().map(|&w| Word(w)).collect()
}

fn query(ids: &[u32]) -> Vec<TaggedWord> {
    ids.iter().map(|&w| TaggedWord::new(Word(w))).collect()
}

fn out_buffer() -> Vec<Edge> {
    vec![Edge::default(); MAX_COMPLETIONS + 1]
}

fn sources(out: &[Edge]) -> Vec<u32> {
    out.iter()
        .take_while(|edge| !edge.is_terminator())
        .map(|edge| edge.source.0)
        .collect()
}

/// Counts buckets for one fact the way pass 1 does: `senses` completions per
/// proper prefix, plus a flag-only bucket for the whole fact.
fn count_fact(counts: &mut CountMap, fact: &[Word], senses: u32) {
    for len in 1..fact.len() {
        counts
            .increment(fingerprint(&fact[..len]), senses, MAX_COMPLETIONS as u32)
            .unwrap();
    }
    counts
        .increment(fingerprint(fact), 0, u32::MAX)
        .unwrap();
}

#[test]
fn empty_index_answers_false_with_terminator() {
    let index = LossyFactIndex::with_counts(CountMap::with_capacity(16)).unwrap();
    let mut out = out_buffer();
    assert!(!index.contains(&query(&[7]), -1, &mut out));
    assert!(out[0].is_terminator());
}

#[test]
fn marked_fact_is_contained() {
    let fact = words(&[10, 20, 30]);
    let mut counts = CountMap::with_capacity(64);
    count_fact(&mut counts, &fact, 1);
    let mut index = LossyFactIndex::with_counts(counts).unwrap();
    index.mark_fact(&fact).unwrap();

    let mut out = out_buffer();
    assert!(index.contains(&query(&[10, 20, 30]), -1, &mut out));
    assert!(!index.contains(&query(&[10, 20]), -1, &mut out));
    assert!(!index.contains(&query(&[10, 20, 30, 40]), -1, &mut out));
}

#[test]
fn flag_only_fact_bucket_has_no_records() {
    // A single-word fact allocates only its own flag byte.
    let fact = words(&[42]);
    let mut counts = CountMap::with_capacity(16);
    count_fact(&mut counts, &fact, 1);
    let mut index = LossyFactIndex::with_counts(counts).unwrap();
    index.mark_fact(&fact).unwrap();

    assert_eq!(index.completion_data().len(), 2);
    let mut out = out_buffer();
    assert!(index.contains(&query(&[42]), -1, &mut out));
}

#[test]
fn completions_are_read_back_in_bucket_order() {
    let fact = words(&[10, 20, 30]);
    let mut counts = CountMap::with_capacity(64);
    count_fact(&mut counts, &fact, 2);
    let mut index = LossyFactIndex::with_counts(counts).unwrap();
    index
        .add_completion(&fact[..2], Word(30), Sense(0), EdgeKind(1))
        .unwrap();
    index
        .add_completion(&fact[..2], Word(30), Sense(1), EdgeKind(1))
        .unwrap();
    index.mark_fact(&fact).unwrap();

    let mut out = out_buffer();
    assert!(index.contains(&query(&[10, 20, 30]), 1, &mut out));
    assert_eq!(sources(&out), vec![30, 30]);
    assert_eq!(out[0].source_sense, Sense(0));
    assert_eq!(out[1].source_sense, Sense(1));
    assert_eq!(out[0].sink, Word(0));
    assert_eq!(out[0].cost, 1.0);
}

#[test]
fn missing_completion_bucket_is_a_build_error() {
    let mut index = LossyFactIndex::with_counts(CountMap::with_capacity(16)).unwrap();
    let fact = words(&[1, 2]);
    assert!(matches!(
        index.add_completion(&fact[..1], Word(2), Sense(0), EdgeKind(0)),
        Err(IndexError::Corruption(_))
    ));
    assert!(matches!(
        index.mark_fact(&fact),
        Err(IndexError::Corruption(_))
    ));
}

#[test]
fn bucket_saturates_at_cap_and_drops_extras() {
    let fact = words(&[10, 20]);
    let mut counts = CountMap::with_capacity(64);
    // Thirty duplicate adds of a two-sense word saturate the count at the cap.
    for _ in 0..30 {
        count_fact(&mut counts, &fact, 2);
    }
    let mut index = LossyFactIndex::with_counts(counts).unwrap();
    for _ in 0..30 {
        for sense in 0..2u8 {
            index
                .add_completion(&fact[..1], Word(20), Sense(sense), EdgeKind(0))
                .unwrap();
        }
        index.mark_fact(&fact).unwrap();
    }

    let mut out = out_buffer();
    assert!(!index.contains(&query(&[10]), 0, &mut out));
    assert_eq!(sources(&out).len(), MAX_COMPLETIONS);
    assert!(out[MAX_COMPLETIONS].is_terminator());
}

#[test]
fn begin_insertions_cover_sentence_initial_mutation() {
    let fact = words(&[10, 20, 30]);
    let mut counts = CountMap::with_capacity(64);
    count_fact(&mut counts, &fact, 2);
    let mut index = LossyFactIndex::with_counts(counts).unwrap();
    index.add_begin_insertion(Word(10), Sense(0), EdgeKind(3), Word(20));
    index.add_begin_insertion(Word(10), Sense(1), EdgeKind(3), Word(20));
    index.mark_fact(&fact).unwrap();

    // Query starting at the fact's second word proposes the first word.
    let mut out = out_buffer();
    assert!(!index.contains(&query(&[20, 30]), -1, &mut out));
    assert_eq!(sources(&out), vec![10, 10]);
    assert_eq!(out[0].kind, EdgeKind(3));

    // No begin insertions registered for word 10 itself.
    let mut out = out_buffer();
    assert!(index.contains(&query(&[10, 20, 30]), -1, &mut out));
    assert_eq!(sources(&out), Vec::<u32>::new());
}

#[test]
fn empty_query_yields_empty_list() {
    let index = LossyFactIndex::with_counts(CountMap::with_capacity(16)).unwrap();
    let mut out = out_buffer();
    assert!(!index.contains(&query(&[]), -1, &mut out));
    assert!(out[0].is_terminator());
}

#[test]
fn identical_builds_produce_identical_buffers() {
    let build = || {
        let facts = [words(&[10, 20, 30]), words(&[10, 20, 40]), words(&[5, 6])];
        let mut counts = CountMap::with_capacity(256);
        for fact in &facts {
            count_fact(&mut counts, fact, 2);
        }
        let mut index = LossyFactIndex::with_counts(counts).unwrap();
        for fact in &facts {
            for len in 1..fact.len() {
                for sense in 0..2u8 {
                    index
                        .add_completion(&fact[..len], fact[len], Sense(sense), EdgeKind(1))
                        .unwrap();
                }
            }
            index.mark_fact(fact).unwrap();
        }
        index
    };
    let first = build();
    let second = build();
    assert_eq!(first.completion_data(), second.completion_data());
}

#[test]
fn memory_usage_counts_buffer_directory_and_side_table() {
    let fact = words(&[10, 20]);
    let mut counts = CountMap::with_capacity(16);
    count_fact(&mut counts, &fact, 1);
    let mut index = LossyFactIndex::with_counts(counts).unwrap();
    index.add_begin_insertion(Word(10), Sense(0), EdgeKind(0), Word(20));
    index.mark_fact(&fact).unwrap();

    let mut breakdown = MemoryBreakdown::default();
    let total = index.memory_usage(&mut breakdown);
    assert_eq!(total, breakdown.total());
    assert_eq!(breakdown.on_facts, index.completion_data().len() as u64);
    assert!(breakdown.on_structure > 0);
    assert!(breakdown.on_completion_caching > 0);
}

#[test]
fn long_facts_stay_within_bounds() {
    let ids: Vec<u32> = (1..=MAX_FACT_LENGTH as u32).collect();
    let fact = words(&ids);
    let mut counts = CountMap::with_capacity(1024);
    count_fact(&mut counts, &fact, 1);
    let mut index = LossyFactIndex::with_counts(counts).unwrap();
    index.mark_fact(&fact).unwrap();

    let tagged = query(&ids);
    let mut out = out_buffer();
    assert!(index.contains(&tagged, -1, &mut out));
}
