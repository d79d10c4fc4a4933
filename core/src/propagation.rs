use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::glyph::GlyphId;
use crate::grid_config::GridConfig;
use crate::slot::{CrossingId, SlotId};
use crate::word::WordId;
use crate::word_list::WordList;

/// Why a propagation call is being made. Initial seeds every non-fixed
/// slot; Choice/Elimination seed only the slot that just changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropagationMode {
    Initial,
    Choice(SlotId),
    Elimination(SlotId),
}

/// A dense boolean add/contains set plus an ordered log of what was added,
/// so a caller can both test membership in O(1) and iterate exactly what
/// changed during one propagation call.
#[derive(Debug, Clone, Default)]
pub struct EliminationSet {
    present: Vec<bool>,
    order: Vec<WordId>,
}

impl EliminationSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            present: vec![false; capacity],
            order: Vec::new(),
        }
    }

    pub fn contains(&self, id: WordId) -> bool {
        self.present.get(id.index()).copied().unwrap_or(false)
    }

    pub fn insert(&mut self, id: WordId) -> bool {
        if id.index() >= self.present.len() {
            self.present.resize(id.index() + 1, false);
        }
        if self.present[id.index()] {
            return false;
        }
        self.present[id.index()] = true;
        self.order.push(id);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = WordId> + '_ {
        self.order.iter().copied()
    }
}

/// Live, per-slot state the search maintains across propagation calls:
/// which words are eliminated (and which slot is blamed for each), the
/// remaining option count, per-cell glyph-count summaries, and the word
/// fixed at the current search depth (if any).
#[derive(Debug, Clone)]
pub struct LiveSlotState {
    pub initial_option_count: usize,
    pub remaining: usize,
    pub blamed_slot: Vec<Option<SlotId>>,
    pub eliminated: Vec<bool>,
    pub glyph_counts_by_cell: Vec<HashMap<GlyphId, usize>>,
    pub fixed: Option<WordId>,
}

impl LiveSlotState {
    /// Builds live state for a slot whose initial option list is
    /// `initial_words`. Every other word in the length-`length` bucket
    /// (excluded by pre-fill, score, or regex) starts pre-eliminated with no
    /// blame, so it can never be picked by the search or surface as a
    /// surviving singleton.
    ///
    /// Callers must ensure `words`' length-`length` bucket is at its final
    /// size before calling this (i.e. every slot's initial option list —
    /// which may append hidden words — has already been computed); otherwise
    /// a hidden word appended afterward would fall outside this slot's
    /// elimination bitmap and default to "not eliminated".
    pub fn new(initial_words: &[WordId], length: usize, words: &WordList) -> Self {
        let mut glyph_counts_by_cell = vec![HashMap::new(); length];
        let bucket = words.bucket(length);
        let bucket_len = bucket.len().max(1);
        let mut eliminated = vec![true; bucket_len];
        for &id in initial_words {
            let word = &bucket[id.index()];
            for (cell, &glyph) in word.glyphs.iter().enumerate() {
                *glyph_counts_by_cell[cell].entry(glyph).or_insert(0) += 1;
            }
            eliminated[id.index()] = false;
        }
        Self {
            initial_option_count: initial_words.len(),
            remaining: initial_words.len(),
            blamed_slot: vec![None; bucket_len],
            eliminated,
            glyph_counts_by_cell,
            fixed: None,
        }
    }

    pub fn is_eliminated(&self, id: WordId) -> bool {
        self.eliminated.get(id.index()).copied().unwrap_or(false)
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed.is_some()
    }
}

/// Map from crossing id to the increment its blame contributed on a
/// propagation failure. Combined into the crossing-weight update formula by
/// the search (`crate::search`).
pub type WeightUpdates = HashMap<CrossingId, f64>;

/// The result of one propagation call.
pub enum PropagationOutcome {
    /// Per-slot elimination sets to commit to the live state.
    Success(HashMap<SlotId, EliminationSet>),
    /// The grid became unsatisfiable; carries the blame-weighted increments
    /// to apply to crossing weights before backtracking or retrying.
    Failure(WeightUpdates),
}

struct WorkingSlot {
    eliminations: EliminationSet,
    blame_counts: Vec<usize>,
    option_count: usize,
    glyph_counts_by_cell: Vec<HashMap<GlyphId, usize>>,
    queued_cells: Vec<usize>,
    needs_singleton_propagation: bool,
}

/// Runs arc-consistency propagation to a fixpoint (or failure) for one
/// tentative change to the grid, per the seeding rules for `mode`.
///
/// `crossing_weights[c]` biases which queued slot is drained first (via a
/// derived per-slot weight) and which of a slot's cells is probed first; it
/// is recomputed by the search on every step (see `crate::search`).
pub fn propagate(
    config: &GridConfig,
    words: &mut WordList,
    live: &[LiveSlotState],
    crossing_weights: &[f64],
    mode: PropagationMode,
) -> PropagationOutcome {
    let slots = config.slots();
    let mut working: Vec<WorkingSlot> = slots
        .iter()
        .enumerate()
        .map(|(i, slot)| WorkingSlot {
            eliminations: EliminationSet::with_capacity(live[i].eliminated.len()),
            blame_counts: vec![0; slot.length],
            option_count: live[i].remaining,
            glyph_counts_by_cell: Vec::new(),
            queued_cells: Vec::new(),
            needs_singleton_propagation: false,
        })
        .collect();

    let peer_is_fixed = |slot_idx: usize, cell: usize| -> bool {
        slots[slot_idx].crossings[cell]
            .map(|c| live[c.other_slot.index()].is_fixed())
            .unwrap_or(true)
    };

    // Per-slot weight (sum of crossing weights over crossings whose peer
    // isn't already down to a singleton), used to pick which queued slot to
    // drain next.
    let per_slot_weight: Vec<f64> = slots
        .iter()
        .map(|slot| {
            slot.crossings.iter().flatten().fold(0.0, |acc, crossing| {
                if live[crossing.other_slot.index()].remaining > 1 {
                    acc + crossing_weight_lookup(crossing_weights, crossing.crossing_id)
                } else {
                    acc
                }
            })
        })
        .collect();

    match mode {
        PropagationMode::Initial => {
            for (i, slot) in slots.iter().enumerate() {
                if live[i].is_fixed() {
                    continue;
                }
                if working[i].option_count == 0 {
                    return PropagationOutcome::Failure(WeightUpdates::new());
                }
                if working[i].option_count == 1 {
                    working[i].needs_singleton_propagation = true;
                }
                for cell in 0..slot.length {
                    if !peer_is_fixed(i, cell) {
                        working[i].queued_cells.push(cell);
                    }
                }
            }
        }
        PropagationMode::Choice(slot_id) => {
            working[slot_id.index()].needs_singleton_propagation = true;
            for cell in 0..slots[slot_id.index()].length {
                working[slot_id.index()].queued_cells.push(cell);
            }
        }
        PropagationMode::Elimination(slot_id) => {
            let i = slot_id.index();
            if working[i].option_count == 1 {
                working[i].needs_singleton_propagation = true;
            }
            for cell in 0..slots[i].length {
                if !peer_is_fixed(i, cell) {
                    working[i].queued_cells.push(cell);
                }
            }
        }
    }

    loop {
        let next = working
            .iter()
            .enumerate()
            .filter(|(_, w)| !w.queued_cells.is_empty())
            .min_by(|(a_idx, a), (b_idx, b)| {
                let a_priority = a.option_count as f64 / per_slot_weight[*a_idx].max(f64::MIN_POSITIVE);
                let b_priority = b.option_count as f64 / per_slot_weight[*b_idx].max(f64::MIN_POSITIVE);
                a_priority.partial_cmp(&b_priority).unwrap()
            })
            .map(|(idx, _)| idx);

        let Some(slot_idx) = next else {
            let singleton_idx = working.iter().position(|w| w.needs_singleton_propagation);
            let Some(slot_idx) = singleton_idx else {
                break;
            };
            working[slot_idx].needs_singleton_propagation = false;
            if let Some(outcome) = propagate_singleton(config, words, live, &mut working, slot_idx) {
                return outcome;
            }
            continue;
        };

        let mut cells: Vec<usize> = std::mem::take(&mut working[slot_idx].queued_cells);
        cells.sort_by(|&a, &b| {
            let weight_of = |cell: usize| {
                slots[slot_idx].crossings[cell]
                    .map(|c| crossing_weight_lookup(crossing_weights, c.crossing_id))
                    .unwrap_or(0.0)
            };
            weight_of(b).partial_cmp(&weight_of(a)).unwrap()
        });

        for cell in cells {
            let Some(crossing) = slots[slot_idx].crossings[cell] else {
                continue;
            };
            let other_idx = crossing.other_slot.index();
            if live[other_idx].is_fixed() {
                continue;
            }
            let peer_cell = crossing.other_cell;

            let live_glyphs_at_cell: Vec<(GlyphId, usize)> =
                glyph_counts_for(&working[slot_idx], &live[slot_idx], cell)
                    .into_iter()
                    .collect();
            let support = |g: GlyphId| -> bool {
                live_glyphs_at_cell
                    .iter()
                    .find(|&&(glyph, _)| glyph == g)
                    .map(|&(_, count)| count > 0)
                    .unwrap_or(false)
            };

            let other_bucket = words.bucket(slots[other_idx].length).to_vec();
            for (id_index, word) in other_bucket.iter().enumerate() {
                let id = WordId(id_index as u32);
                if live[other_idx].is_eliminated(id) || working[other_idx].eliminations.contains(id) {
                    continue;
                }
                let g = word.glyphs[peer_cell];
                if support(g) {
                    continue;
                }

                if !working[other_idx].eliminations.insert(id) {
                    continue;
                }
                ensure_cloned(&mut working[other_idx], &live[other_idx]);
                if let Some(count) = working[other_idx].glyph_counts_by_cell[peer_cell].get_mut(&g) {
                    debug_assert!(*count > 0, "eliminating a word whose glyph has no live support");
                    *count = count.saturating_sub(1);
                }
                working[other_idx].blame_counts[peer_cell] += 1;
                debug_assert!(working[other_idx].option_count > 0, "option_count underflow");
                working[other_idx].option_count -= 1;

                for other_cell in 0..slots[other_idx].length {
                    if other_cell == peer_cell {
                        continue;
                    }
                    let zero = working[other_idx].glyph_counts_by_cell[other_cell]
                        .values()
                        .all(|&c| c == 0);
                    if zero && !peer_is_fixed(other_idx, other_cell) {
                        working[other_idx].queued_cells.push(other_cell);
                    }
                }

                if working[other_idx].option_count == 0 {
                    let mut updates = WeightUpdates::new();
                    let initial = live[other_idx].initial_option_count.max(1) as f64;
                    for (cell_in_x, crossing) in slots[other_idx].crossings.iter().enumerate() {
                        let Some(crossing) = crossing else { continue };
                        let contribution = working[other_idx].blame_counts[cell_in_x] as f64 / initial;
                        *updates.entry(crossing.crossing_id).or_insert(0.0) += contribution;
                    }
                    return PropagationOutcome::Failure(updates);
                }
                if working[other_idx].option_count == 1 {
                    working[other_idx].needs_singleton_propagation = true;
                }
            }
        }
    }

    let mut result = HashMap::new();
    for (idx, w) in working.into_iter().enumerate() {
        if !w.eliminations.is_empty() {
            result.insert(SlotId(idx as u32), w.eliminations);
        }
    }
    PropagationOutcome::Success(result)
}

fn crossing_weight_lookup(crossing_weights: &[f64], crossing: CrossingId) -> f64 {
    crossing_weights.get(crossing.index()).copied().unwrap_or(1.0)
}

fn ensure_cloned(working: &mut WorkingSlot, live: &LiveSlotState) {
    if working.glyph_counts_by_cell.is_empty() {
        working.glyph_counts_by_cell = live.glyph_counts_by_cell.clone();
    }
}

fn glyph_counts_for<'a>(
    working: &'a WorkingSlot,
    live: &'a LiveSlotState,
    cell: usize,
) -> HashMap<GlyphId, usize> {
    if working.glyph_counts_by_cell.is_empty() {
        live.glyph_counts_by_cell[cell].clone()
    } else {
        working.glyph_counts_by_cell[cell].clone()
    }
}

/// Propagates the unique surviving word of `slot_idx` through the Dupe
/// Index: any word elsewhere that counts as a duplicate is eliminated
/// (blame = none).
fn propagate_singleton(
    config: &GridConfig,
    words: &WordList,
    live: &[LiveSlotState],
    working: &mut [WorkingSlot],
    slot_idx: usize,
) -> Option<PropagationOutcome> {
    let slots = config.slots();
    let length = slots[slot_idx].length;

    let sole_id = if let Some(fixed) = live[slot_idx].fixed {
        fixed
    } else {
        let bucket_len = words.bucket(length).len();
        (0..bucket_len)
            .map(WordId)
            .find(|&id| !live[slot_idx].is_eliminated(id) && !working[slot_idx].eliminations.contains(id))?
    };

    let global = crate::word::GlobalWordId::new(length, sole_id);
    let word = words.get(global);
    let dupes = words.dupe_index().get_dupes(global, &word.glyphs);

    for (dupe_length, dupe_ids) in dupes {
        for (other_idx, other_slot) in slots.iter().enumerate() {
            if other_slot.length != dupe_length || other_idx == slot_idx {
                continue;
            }
            if live[other_idx].is_fixed() {
                continue;
            }
            for &dupe_id in &dupe_ids {
                if live[other_idx].is_eliminated(dupe_id) || working[other_idx].eliminations.contains(dupe_id) {
                    continue;
                }
                if !working[other_idx].eliminations.insert(dupe_id) {
                    continue;
                }
                ensure_cloned(&mut working[other_idx], &live[other_idx]);
                let dupe_word = &words.bucket(other_slot.length)[dupe_id.index()];
                for (cell, &g) in dupe_word.glyphs.iter().enumerate() {
                    if let Some(count) = working[other_idx].glyph_counts_by_cell[cell].get_mut(&g) {
                        debug_assert!(*count > 0, "eliminating a dupe whose glyph has no live support");
                        *count = count.saturating_sub(1);
                    }
                }
                debug_assert!(working[other_idx].option_count > 0, "option_count underflow");
                working[other_idx].option_count -= 1;

                for cell in 0..other_slot.length {
                    let zero = working[other_idx].glyph_counts_by_cell[cell].values().all(|&c| c == 0);
                    let peer_fixed = other_slot.crossings[cell]
                        .map(|c| live[c.other_slot.index()].is_fixed())
                        .unwrap_or(true);
                    if zero && !peer_fixed {
                        working[other_idx].queued_cells.push(cell);
                    }
                }

                if working[other_idx].option_count == 0 {
                    let mut updates = WeightUpdates::new();
                    for crossing in other_slot.crossings.iter().flatten() {
                        updates.entry(crossing.crossing_id).or_insert(0.0);
                    }
                    return Some(PropagationOutcome::Failure(updates));
                }
                if working[other_idx].option_count == 1 {
                    working[other_idx].needs_singleton_propagation = true;
                }
            }
        }
    }

    None
}
