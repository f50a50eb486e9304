//! Positional alignment of two child sequences by content hash.
//!
//! This module is pure: it sees children only as `(family, hash)` elements
//! and produces the aligned shape of the primary side, leaving all tree
//! mutation to the engine.

use arbor_types::Hash64;

/// Which matching stream an element belongs to. The two families never
/// match each other: declaration children align on their source identity,
/// everything else on its full content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    /// Declaration child, hashed by [`source_hash`].
    ///
    /// [`source_hash`]: arbor_tree::Tree::source_hash
    Source,
    /// Extension, primitive, or empty child, hashed by [`total_hash`].
    ///
    /// [`total_hash`]: arbor_tree::Tree::total_hash
    Extension,
}

/// One child as the aligner sees it.
#[derive(Clone, Copy, Debug)]
pub struct Element {
    pub family: Family,
    pub hash: Hash64,
}

/// One slot of the aligned primary shape. Indices refer back into the
/// element slices given to [`align`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlignedSlot {
    /// A primary element matched to a secondary element.
    Pair { pri: usize, sec: usize },
    /// A primary element with no counterpart.
    PriOnly(usize),
    /// A secondary element recovered as a pure insertion.
    SecInsert(usize),
}

impl AlignedSlot {
    fn sec_index(self) -> Option<usize> {
        match self {
            AlignedSlot::Pair { sec, .. } => Some(sec),
            AlignedSlot::SecInsert(sec) => Some(sec),
            AlignedSlot::PriOnly(_) => None,
        }
    }
}

/// Align `sec` against `pri`, producing the primary shape with matched
/// pairs and recovered insertions.
///
/// Matching alternates greedy passes from the front and from the back
/// within each family, pairing next-unmatched elements on equal hash and
/// stopping a pass at the first mismatch, until a full round finds nothing
/// new. When every primary element matched and the only leftovers are
/// secondary extension-family elements, those are pure insertions and are
/// recovered next to their matched neighbors (an end element with no
/// matched neighbor attaches to the corresponding end). `None` means a
/// recovery round made no progress with elements still left over; the
/// topologies cannot be reconciled.
pub fn align(pri: &[Element], sec: &[Element]) -> Option<Vec<AlignedSlot>> {
    let mut pri_match: Vec<Option<usize>> = vec![None; pri.len()];
    let mut sec_match: Vec<Option<usize>> = vec![None; sec.len()];

    for family in [Family::Source, Family::Extension] {
        loop {
            let forward = greedy_pass(pri, sec, &mut pri_match, &mut sec_match, family, false);
            let backward = greedy_pass(pri, sec, &mut pri_match, &mut sec_match, family, true);
            if !forward && !backward {
                break;
            }
        }
    }

    let mut slots: Vec<AlignedSlot> = pri_match
        .iter()
        .enumerate()
        .map(|(i, m)| match m {
            Some(j) => AlignedSlot::Pair { pri: i, sec: *j },
            None => AlignedSlot::PriOnly(i),
        })
        .collect();

    let all_pri_matched = pri_match.iter().all(Option::is_some);
    let mut sec_done: Vec<bool> = sec_match.iter().map(Option::is_some).collect();
    let leftovers_are_insertions = sec_match
        .iter()
        .zip(sec)
        .all(|(m, e)| m.is_some() || e.family == Family::Extension);
    let any_leftover = sec_done.iter().any(|d| !d);

    if !(all_pri_matched && leftovers_are_insertions && any_leftover) {
        return Some(slots);
    }

    // Insertion recovery: place each leftover next to a placed neighbor.
    loop {
        let mut added = 0;
        for i in 1..sec.len() {
            if !sec_done[i] && sec_done[i - 1] {
                if let Some(pos) = slot_of(&slots, i - 1) {
                    slots.insert(pos + 1, AlignedSlot::SecInsert(i));
                    sec_done[i] = true;
                    added += 1;
                }
            }
        }
        for i in (0..sec.len().saturating_sub(1)).rev() {
            if !sec_done[i] && sec_done[i + 1] {
                if let Some(pos) = slot_of(&slots, i + 1) {
                    slots.insert(pos, AlignedSlot::SecInsert(i));
                    sec_done[i] = true;
                    added += 1;
                }
            }
        }
        if sec_done.iter().all(|&d| d) {
            return Some(slots);
        }
        if added > 0 {
            continue;
        }
        // End attachment: a leftover at either end with no placed neighbor
        // attaches to the corresponding end unconditionally.
        for i in 0..sec.len() {
            if sec_done[i] {
                continue;
            }
            let placed = if i > 0 && sec_done[i - 1] {
                slot_of(&slots, i - 1).map(|pos| pos + 1)
            } else if i + 1 < sec.len() && sec_done[i + 1] {
                slot_of(&slots, i + 1)
            } else if i == 0 {
                Some(0)
            } else if i == sec.len() - 1 {
                Some(slots.len())
            } else {
                None
            };
            if let Some(pos) = placed {
                slots.insert(pos, AlignedSlot::SecInsert(i));
                sec_done[i] = true;
                added += 1;
            }
        }
        if added == 0 {
            return None;
        }
    }
}

/// One greedy pass over both sequences, front-to-back or back-to-front.
/// Returns `true` if it matched anything.
fn greedy_pass(
    pri: &[Element],
    sec: &[Element],
    pri_match: &mut [Option<usize>],
    sec_match: &mut [Option<usize>],
    family: Family,
    reverse: bool,
) -> bool {
    let pri_order: Vec<usize> = order(pri.len(), reverse);
    let sec_order: Vec<usize> = order(sec.len(), reverse);
    let mut found = false;
    let mut pi = 0;
    let mut si = 0;
    while pi < pri_order.len() && si < sec_order.len() {
        let i = pri_order[pi];
        let j = sec_order[si];
        if pri[i].family != family || pri_match[i].is_some() {
            pi += 1;
            continue;
        }
        if sec[j].family != family || sec_match[j].is_some() {
            si += 1;
            continue;
        }
        if pri[i].hash == sec[j].hash {
            pri_match[i] = Some(j);
            sec_match[j] = Some(i);
            found = true;
            pi += 1;
            si += 1;
        } else {
            break;
        }
    }
    found
}

fn order(len: usize, reverse: bool) -> Vec<usize> {
    if reverse {
        (0..len).rev().collect()
    } else {
        (0..len).collect()
    }
}

fn slot_of(slots: &[AlignedSlot], sec: usize) -> Option<usize> {
    slots.iter().position(|s| s.sec_index() == Some(sec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn src(v: u64) -> Element {
        Element {
            family: Family::Source,
            hash: Hash64::from_u64(v),
        }
    }

    fn ext(v: u64) -> Element {
        Element {
            family: Family::Extension,
            hash: Hash64::from_u64(v),
        }
    }

    fn sec_sequence(slots: &[AlignedSlot]) -> Vec<usize> {
        slots.iter().filter_map(|s| s.sec_index()).collect()
    }

    #[test]
    fn identical_sequences_fully_pair() {
        let a = [src(1), src(2), ext(3)];
        let slots = align(&a, &a).unwrap();
        assert_eq!(
            slots,
            vec![
                AlignedSlot::Pair { pri: 0, sec: 0 },
                AlignedSlot::Pair { pri: 1, sec: 1 },
                AlignedSlot::Pair { pri: 2, sec: 2 },
            ]
        );
    }

    #[test]
    fn families_never_match_each_other() {
        // Same hash, different family: no pair forms, and with an unmatched
        // primary element there is no insertion recovery either.
        let slots = align(&[src(1)], &[ext(1)]).unwrap();
        assert_eq!(slots, vec![AlignedSlot::PriOnly(0)]);
    }

    #[test]
    fn middle_insertion_lands_after_its_neighbor() {
        // pri [a, b, c]; sec [a, b, x, c] with x extension-kind.
        let pri = [ext(1), ext(2), ext(3)];
        let sec = [ext(1), ext(2), ext(99), ext(3)];
        let slots = align(&pri, &sec).unwrap();
        assert_eq!(
            slots,
            vec![
                AlignedSlot::Pair { pri: 0, sec: 0 },
                AlignedSlot::Pair { pri: 1, sec: 1 },
                AlignedSlot::SecInsert(2),
                AlignedSlot::Pair { pri: 2, sec: 3 },
            ]
        );
    }

    #[test]
    fn appended_element_attaches_to_the_end() {
        let pri = [ext(1), ext(2)];
        let sec = [ext(1), ext(2), ext(60)];
        let slots = align(&pri, &sec).unwrap();
        assert_eq!(
            slots,
            vec![
                AlignedSlot::Pair { pri: 0, sec: 0 },
                AlignedSlot::Pair { pri: 1, sec: 1 },
                AlignedSlot::SecInsert(2),
            ]
        );
    }

    #[test]
    fn prepended_element_attaches_to_the_start() {
        let pri = [ext(1), ext(2)];
        let sec = [ext(50), ext(1), ext(2)];
        let slots = align(&pri, &sec).unwrap();
        assert_eq!(
            slots,
            vec![
                AlignedSlot::SecInsert(0),
                AlignedSlot::Pair { pri: 0, sec: 1 },
                AlignedSlot::Pair { pri: 1, sec: 2 },
            ]
        );
    }

    #[test]
    fn insertion_into_empty_primary_attaches_by_ends() {
        let slots = align(&[], &[ext(1), ext(2)]).unwrap();
        assert_eq!(sec_sequence(&slots), vec![0, 1]);
    }

    #[test]
    fn unmatched_source_leftovers_block_recovery() {
        // A leftover declaration child is not a pure insertion; the shape
        // is just the primary side.
        let pri = [src(1)];
        let sec = [src(1), src(2)];
        let slots = align(&pri, &sec).unwrap();
        assert_eq!(slots, vec![AlignedSlot::Pair { pri: 0, sec: 0 }]);
    }

    #[test]
    fn matching_resumes_after_backward_pass() {
        // Forward stops at the first mismatch; the backward pass matches
        // the tail, and the next round closes the gap.
        let pri = [ext(1), ext(2), ext(3), ext(4)];
        let sec = [ext(1), ext(9), ext(3), ext(4)];
        let slots = align(&pri, &sec).unwrap();
        assert_eq!(slots[0], AlignedSlot::Pair { pri: 0, sec: 0 });
        assert_eq!(slots[2], AlignedSlot::Pair { pri: 2, sec: 2 });
        assert_eq!(slots[3], AlignedSlot::Pair { pri: 3, sec: 3 });
    }

    proptest! {
        /// A run of insertions at one position of a unique base sequence
        /// always recovers the secondary order exactly.
        #[test]
        fn pure_insertion_run_recovers_secondary_order(
            base_len in 0usize..8,
            pos in 0usize..9,
            count in 0usize..4,
        ) {
            let pri: Vec<Element> = (0..base_len as u64).map(|v| ext(v + 1)).collect();
            let mut sec = pri.clone();
            let at = pos.min(sec.len());
            for k in 0..count {
                sec.insert(at + k, ext(1000 + k as u64));
            }
            let slots = align(&pri, &sec).expect("pure insertions must align");
            prop_assert_eq!(sec_sequence(&slots), (0..sec.len()).collect::<Vec<_>>());
            // Primary order is preserved within the shape.
            let pri_seq: Vec<usize> = slots.iter().filter_map(|s| match s {
                AlignedSlot::Pair { pri, .. } => Some(*pri),
                AlignedSlot::PriOnly(p) => Some(*p),
                AlignedSlot::SecInsert(_) => None,
            }).collect();
            prop_assert_eq!(pri_seq, (0..pri.len()).collect::<Vec<_>>());
        }

        /// Whatever the inputs, every primary element appears exactly once
        /// and in order, and pairs only join equal hashes within a family.
        #[test]
        fn shape_invariants_hold(
            pri_vals in proptest::collection::vec((0u64..6, proptest::bool::ANY), 0..8),
            sec_vals in proptest::collection::vec((0u64..6, proptest::bool::ANY), 0..8),
        ) {
            let mk = |(v, is_src): &(u64, bool)| if *is_src { src(*v + 1) } else { ext(*v + 1) };
            let pri: Vec<Element> = pri_vals.iter().map(mk).collect();
            let sec: Vec<Element> = sec_vals.iter().map(mk).collect();
            if let Some(slots) = align(&pri, &sec) {
                let pri_seq: Vec<usize> = slots.iter().filter_map(|s| match s {
                    AlignedSlot::Pair { pri, .. } => Some(*pri),
                    AlignedSlot::PriOnly(p) => Some(*p),
                    AlignedSlot::SecInsert(_) => None,
                }).collect();
                prop_assert_eq!(pri_seq, (0..pri.len()).collect::<Vec<_>>());
                for s in &slots {
                    if let AlignedSlot::Pair { pri: i, sec: j } = s {
                        prop_assert_eq!(pri[*i].hash, sec[*j].hash);
                        prop_assert_eq!(pri[*i].family, sec[*j].family);
                    }
                }
            }
        }
    }
}
