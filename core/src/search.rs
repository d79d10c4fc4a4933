use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::glyph::GlyphId;
use crate::grid_config::GridConfig;
use crate::propagation::{propagate, LiveSlotState, PropagationMode};
use crate::slot::SlotId;
use crate::slot_options::initial_options_for_slot;
use crate::word::{GlobalWordId, WordId};
use crate::word_list::WordList;

const AGE_FACTOR: f64 = 0.99;
const TOP_K: usize = 3;
const SAMPLE_WEIGHTS: [u32; TOP_K] = [4, 2, 1];
const ADAPTIVE_BRANCHING_TOLERANCE: f64 = 0.15;
const INTERRUPT_CHECK_INTERVAL: u64 = 10;
const INITIAL_MAX_BACKTRACKS: u64 = 500;
const MAX_BACKTRACKS_GROWTH: f64 = 1.1;

/// Cooperative cancellation handle shared between a caller and an in-flight
/// search. Checked only at bounded intervals (see [`INTERRUPT_CHECK_INTERVAL`]).
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Counters accumulated over one search attempt (one restart cycle's worth,
/// summed across inner attempts in [`run`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub states: u64,
    pub backtracks: u64,
    pub restricted_branchings: u64,
    pub retries: u64,
    pub elapsed: Duration,
    pub initial_propagation_time: Duration,
    pub choice_propagation_time: Duration,
    pub elimination_propagation_time: Duration,
}

/// One committed (slot, word) pair in a successful fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotChoice {
    pub slot: SlotId,
    pub word: GlobalWordId,
}

/// Terminal result of a search attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SearchOutcome {
    Success {
        choices: Vec<SlotChoice>,
        statistics: Statistics,
    },
    HardFailure,
    Timeout,
    Abort,
    ExceededBacktrackLimit {
        limit: u64,
    },
}

/// Caller-supplied knobs for one [`run`] invocation.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub seed: u64,
    pub retry_number: u64,
    pub deadline: Option<Instant>,
    pub abort: AbortFlag,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            seed: 0,
            retry_number: 0,
            deadline: None,
            abort: AbortFlag::new(),
        }
    }
}

struct ChoiceFrame {
    slot: SlotId,
    word: WordId,
    propagated_eliminations: HashMap<SlotId, Vec<WordId>>,
    /// The slot's `remaining`/`glyph_counts_by_cell` from just before it was
    /// collapsed to `word`'s singleton, restored on backtrack.
    prev_remaining: usize,
    prev_glyph_counts: Vec<HashMap<GlyphId, usize>>,
}

/// Outcome of [`Attempt::try_choice`].
enum ChoiceResult {
    /// The choice propagated cleanly; push this frame and continue.
    Pushed(ChoiceFrame),
    /// The choice failed but the retried elimination succeeded; pick again.
    Retry,
    /// The retried elimination itself cascaded into a wipeout; the caller
    /// must unwind the choice stack via [`Attempt::backtrack`].
    Backtrack,
}

struct Attempt<'a> {
    config: &'a GridConfig,
    words: &'a mut WordList,
    live: Vec<LiveSlotState>,
    crossing_weights: Vec<f64>,
    rng: StdRng,
    last_chosen_slot: Option<SlotId>,
    stats: Statistics,
}

impl<'a> Attempt<'a> {
    fn new(config: &'a GridConfig, words: &'a mut WordList, seed: u64, retry_number: u64) -> Self {
        let slot_count = config.slots().len();
        // Compute every slot's initial option list before building any live
        // state: a fully pre-filled slot may append a hidden word to its
        // length bucket, which must land before any same-length slot's
        // elimination bitmap is sized (see `LiveSlotState::new`).
        let initial_ids: Vec<Vec<WordId>> = (0..slot_count)
            .map(|i| initial_options_for_slot(config, words, SlotId(i as u32)))
            .collect();
        let live = (0..slot_count)
            .map(|i| LiveSlotState::new(&initial_ids[i], config.slots()[i].length, words))
            .collect();
        Self {
            config,
            words,
            live,
            crossing_weights: vec![1.0; config.crossing_count().max(1)],
            rng: StdRng::seed_from_u64(seed ^ retry_number),
            last_chosen_slot: None,
            stats: Statistics::default(),
        }
    }

    fn slot_weight(&self, slot_id: SlotId) -> f64 {
        self.config.slot(slot_id).crossings.iter().flatten().fold(0.0, |acc, crossing| {
            let peer_remaining = self.live[crossing.other_slot.index()].remaining;
            if peer_remaining > 1 {
                acc + self.crossing_weights[crossing.crossing_id.index()]
            } else {
                acc
            }
        })
    }

    fn crossing_weights_snapshot(&self) -> Vec<f64> {
        self.crossing_weights.clone()
    }

    fn eligible_slots(&self) -> Vec<SlotId> {
        self.config
            .slots()
            .iter()
            .enumerate()
            .filter_map(|(i, _)| {
                let state = &self.live[i];
                if !state.is_fixed() && state.remaining > 1 {
                    Some(SlotId(i as u32))
                } else {
                    None
                }
            })
            .collect()
    }

    fn pick_slot(&mut self) -> Option<SlotId> {
        let mut candidates = self.eligible_slots();
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_by(|&a, &b| {
            let pa = self.live[a.index()].remaining as f64 / self.slot_weight(a).max(f64::MIN_POSITIVE);
            let pb = self.live[b.index()].remaining as f64 / self.slot_weight(b).max(f64::MIN_POSITIVE);
            pa.partial_cmp(&pb).unwrap()
        });

        if let Some(last) = self.last_chosen_slot {
            if candidates.contains(&last) {
                let best_priority =
                    self.live[candidates[0].index()].remaining as f64 / self.slot_weight(candidates[0]).max(f64::MIN_POSITIVE);
                let last_priority =
                    self.live[last.index()].remaining as f64 / self.slot_weight(last).max(f64::MIN_POSITIVE);
                if (last_priority - best_priority).abs() <= ADAPTIVE_BRANCHING_TOLERANCE {
                    self.stats.restricted_branchings += 1;
                    return Some(last);
                }
            }
        }

        let top: Vec<SlotId> = candidates.into_iter().take(TOP_K).collect();
        let weights = &SAMPLE_WEIGHTS[..top.len()];
        let chosen = *top
            .choose_weighted(&mut self.rng, |s| weights[top.iter().position(|x| x == s).unwrap()])
            .unwrap();
        Some(chosen)
    }

    fn pick_word(&mut self, slot: SlotId) -> Option<WordId> {
        let length = self.config.slot(slot).length;
        let bucket_len = self.words.bucket(length).len();
        let state = &self.live[slot.index()];
        let candidates: Vec<WordId> = (0..bucket_len)
            .map(WordId)
            .filter(|&id| !state.is_eliminated(id))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let top: Vec<WordId> = candidates.into_iter().take(TOP_K).collect();
        let weights = &SAMPLE_WEIGHTS[..top.len()];
        let chosen = *top
            .choose_weighted(&mut self.rng, |w| weights[top.iter().position(|x| x == w).unwrap()])
            .unwrap();
        Some(chosen)
    }

    fn apply_weight_updates(&mut self, updates: &crate::propagation::WeightUpdates) {
        for (&crossing, &delta) in updates {
            let w = &mut self.crossing_weights[crossing.index()];
            *w = 1.0 + (*w - 1.0) * AGE_FACTOR + delta;
        }
    }

    /// Tries fixing `(slot, word)`; on propagation success commits
    /// eliminations and pushes a choice frame, on failure retries eliminating
    /// the word (blamed on the previous choice). If that retried elimination
    /// *also* wipes out some slot, the failure cascades: the caller must run
    /// [`Attempt::backtrack`] to unwind the choice stack.
    fn try_choice(&mut self, slot: SlotId, word: WordId, stack: &[ChoiceFrame]) -> ChoiceResult {
        let length = self.config.slot(slot).length;
        let global = GlobalWordId::new(length, word);
        let glyphs = self.words.get(global).glyphs.clone();

        let prev_remaining = self.live[slot.index()].remaining;
        let prev_glyph_counts = std::mem::replace(
            &mut self.live[slot.index()].glyph_counts_by_cell,
            glyphs
                .iter()
                .map(|&g| HashMap::from([(g, 1usize)]))
                .collect(),
        );
        self.live[slot.index()].remaining = 1;
        self.live[slot.index()].fixed = Some(word);

        let weights = self.crossing_weights_snapshot();
        let started = Instant::now();
        let outcome = propagate(
            self.config,
            self.words,
            &self.live,
            &weights,
            PropagationMode::Choice(slot),
        );
        self.stats.choice_propagation_time += started.elapsed();

        match outcome {
            crate::propagation::PropagationOutcome::Success(eliminations) => {
                let mut propagated = HashMap::new();
                for (slot_id, set) in eliminations {
                    let mut ids = Vec::new();
                    for id in set.iter() {
                        if !self.live[slot_id.index()].is_eliminated(id) {
                            self.live[slot_id.index()].eliminated[id.index()] = true;
                            self.live[slot_id.index()].blamed_slot[id.index()] = Some(slot);
                            self.live[slot_id.index()].remaining -= 1;
                            ids.push(id);
                        }
                    }
                    propagated.insert(slot_id, ids);
                }
                self.last_chosen_slot = Some(slot);
                ChoiceResult::Pushed(ChoiceFrame {
                    slot,
                    word,
                    propagated_eliminations: propagated,
                    prev_remaining,
                    prev_glyph_counts,
                })
            }
            crate::propagation::PropagationOutcome::Failure(updates) => {
                self.apply_weight_updates(&updates);
                self.live[slot.index()].fixed = None;
                self.live[slot.index()].remaining = prev_remaining;
                self.live[slot.index()].glyph_counts_by_cell = prev_glyph_counts;
                let blame = stack.last().map(|frame| frame.slot);
                if self.eliminate_blamed(slot, word, blame) {
                    ChoiceResult::Retry
                } else {
                    ChoiceResult::Backtrack
                }
            }
        }
    }

    /// Eliminates `word` from `slot` (blamed on `blame`) and propagates that
    /// elimination. Returns `false` if the propagation itself wipes out some
    /// slot — a cascading failure the caller must resolve by backtracking
    /// further, per the retry loop in §4.6.
    fn eliminate_blamed(&mut self, slot: SlotId, word: WordId, blame: Option<SlotId>) -> bool {
        if !self.live[slot.index()].is_eliminated(word) {
            self.live[slot.index()].eliminated[word.index()] = true;
            self.live[slot.index()].blamed_slot[word.index()] = blame;
            self.live[slot.index()].remaining -= 1;
        }
        let weights = self.crossing_weights_snapshot();
        let started = Instant::now();
        let outcome = propagate(
            self.config,
            self.words,
            &self.live,
            &weights,
            PropagationMode::Elimination(slot),
        );
        self.stats.elimination_propagation_time += started.elapsed();
        match outcome {
            crate::propagation::PropagationOutcome::Success(eliminations) => {
                for (slot_id, set) in eliminations {
                    for id in set.iter() {
                        if !self.live[slot_id.index()].is_eliminated(id) {
                            self.live[slot_id.index()].eliminated[id.index()] = true;
                            self.live[slot_id.index()].blamed_slot[id.index()] = blame;
                            self.live[slot_id.index()].remaining -= 1;
                        }
                    }
                }
                true
            }
            crate::propagation::PropagationOutcome::Failure(updates) => {
                self.apply_weight_updates(&updates);
                false
            }
        }
    }

    fn undo_eliminations_blamed_on(&mut self, slot: SlotId) {
        for state in self.live.iter_mut() {
            let mut restored = 0;
            for (id_index, blamed) in state.blamed_slot.iter_mut().enumerate() {
                if *blamed == Some(slot) && state.eliminated[id_index] {
                    state.eliminated[id_index] = false;
                    *blamed = None;
                    restored += 1;
                }
            }
            state.remaining += restored;
        }
    }

    /// Pops the choice stack, undoing the popped choice's effects, then
    /// retries eliminating its word blamed on the new top of stack. If that
    /// retried elimination itself cascades into another wipeout, pops again
    /// and repeats — per §4.6, "repeat until one succeeds or the choice stack
    /// empties". Returns `false` only once the stack has been drained with no
    /// successful elimination (hard failure).
    fn backtrack(&mut self, stack: &mut Vec<ChoiceFrame>) -> bool {
        loop {
            let Some(frame) = stack.pop() else {
                return false;
            };
            self.stats.backtracks += 1;
            self.live[frame.slot.index()].fixed = None;
            self.live[frame.slot.index()].remaining = frame.prev_remaining;
            self.live[frame.slot.index()].glyph_counts_by_cell = frame.prev_glyph_counts;
            for (slot_id, ids) in &frame.propagated_eliminations {
                for &id in ids {
                    if self.live[slot_id.index()].blamed_slot[id.index()] == Some(frame.slot) {
                        self.live[slot_id.index()].eliminated[id.index()] = false;
                        self.live[slot_id.index()].blamed_slot[id.index()] = None;
                        self.live[slot_id.index()].remaining += 1;
                    }
                }
            }
            self.undo_eliminations_blamed_on(frame.slot);

            let blame = stack.last().map(|f| f.slot);
            if self.eliminate_blamed(frame.slot, frame.word, blame) {
                return true;
            }
        }
    }

    fn collect_choices(&self) -> Vec<SlotChoice> {
        self.config
            .slots()
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                let state = &self.live[i];
                let word_id = state.fixed.unwrap_or_else(|| {
                    let bucket_len = self.words.bucket(slot.length).len();
                    (0..bucket_len)
                        .map(WordId)
                        .find(|&id| !state.is_eliminated(id))
                        .expect("a slot with remaining > 0 has a surviving word")
                });
                SlotChoice {
                    slot: SlotId(i as u32),
                    word: GlobalWordId::new(slot.length, word_id),
                }
            })
            .collect()
    }
}

/// Runs one inner attempt (fixed seed, fixed `max_backtracks`) of the
/// choice/elimination/retry loop described in the crossing-weight design.
fn run_attempt(
    attempt: &mut Attempt,
    params: &SearchParams,
    max_backtracks: u64,
) -> SearchOutcome {
    let weights = attempt.crossing_weights_snapshot();
    let started = Instant::now();
    let initial = propagate(
        attempt.config,
        attempt.words,
        &attempt.live,
        &weights,
        PropagationMode::Initial,
    );
    attempt.stats.initial_propagation_time += started.elapsed();

    match initial {
        crate::propagation::PropagationOutcome::Failure(_) => return SearchOutcome::HardFailure,
        crate::propagation::PropagationOutcome::Success(eliminations) => {
            for (slot_id, set) in eliminations {
                for id in set.iter() {
                    if !attempt.live[slot_id.index()].is_eliminated(id) {
                        attempt.live[slot_id.index()].eliminated[id.index()] = true;
                        attempt.live[slot_id.index()].remaining -= 1;
                    }
                }
            }
        }
    }

    let mut stack: Vec<ChoiceFrame> = Vec::new();
    let mut state_count: u64 = 0;

    loop {
        state_count += 1;
        attempt.stats.states += 1;

        if state_count % INTERRUPT_CHECK_INTERVAL == 0 {
            if params.abort.is_aborted() {
                return SearchOutcome::Abort;
            }
            if let Some(deadline) = params.deadline {
                if Instant::now() >= deadline {
                    return SearchOutcome::Timeout;
                }
            }
        }

        let Some(slot) = attempt.pick_slot() else {
            return SearchOutcome::Success {
                choices: attempt.collect_choices(),
                statistics: attempt.stats,
            };
        };

        let Some(word) = attempt.pick_word(slot) else {
            if !attempt.backtrack(&mut stack) {
                return SearchOutcome::HardFailure;
            }
            continue;
        };

        match attempt.try_choice(slot, word, &stack) {
            ChoiceResult::Pushed(frame) => {
                stack.push(frame);
                if stack.len() as u64 > max_backtracks {
                    return SearchOutcome::ExceededBacktrackLimit { limit: max_backtracks };
                }
            }
            ChoiceResult::Retry => {
                attempt.stats.retries += 1;
            }
            ChoiceResult::Backtrack => {
                attempt.stats.retries += 1;
                if !attempt.backtrack(&mut stack) {
                    return SearchOutcome::HardFailure;
                }
            }
        }

        if attempt.stats.backtracks >= max_backtracks {
            return SearchOutcome::ExceededBacktrackLimit { limit: max_backtracks };
        }
    }
}

/// Runs the full search, restarting with a growing backtrack budget and an
/// incremented retry number (and thus a fresh PRNG seed) whenever an inner
/// attempt exceeds its budget.
pub fn run(config: &GridConfig, words: &mut WordList, mut params: SearchParams) -> SearchOutcome {
    let mut max_backtracks = INITIAL_MAX_BACKTRACKS;
    let overall_start = Instant::now();

    loop {
        let mut attempt = Attempt::new(config, words, params.seed, params.retry_number);
        let outcome = run_attempt(&mut attempt, &params, max_backtracks);

        match outcome {
            SearchOutcome::ExceededBacktrackLimit { .. } => {
                max_backtracks = (max_backtracks as f64 * MAX_BACKTRACKS_GROWTH).ceil() as u64;
                params.retry_number += 1;
                if let Some(deadline) = params.deadline {
                    if Instant::now() >= deadline {
                        return SearchOutcome::Timeout;
                    }
                }
                continue;
            }
            SearchOutcome::Success {
                choices,
                mut statistics,
            } => {
                statistics.elapsed = overall_start.elapsed();
                return SearchOutcome::Success { choices, statistics };
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid_config::{Cell, GridConfig};

    fn two_by_two_config() -> GridConfig {
        let rows = vec![
            vec![Cell::Open(None), Cell::Open(None)],
            vec![Cell::Open(None), Cell::Open(None)],
        ];
        GridConfig::from_rows(rows).unwrap()
    }

    #[test]
    fn unsolvable_micro_grid_is_hard_failure() {
        let config = two_by_two_config();
        let mut words = WordList::new(0);
        for w in ["ab", "cd"] {
            words.add_word(w.into(), w.to_uppercase(), 50, None, false).unwrap();
        }
        let outcome = run(&config, &mut words, SearchParams::default());
        assert_eq!(outcome, SearchOutcome::HardFailure);
    }

    #[test]
    fn solvable_micro_grid_succeeds() {
        let config = two_by_two_config();
        let mut words = WordList::new(0);
        for w in ["at", "as", "to", "ts"] {
            words.add_word(w.into(), w.to_uppercase(), 50, None, false).unwrap();
        }
        let outcome = run(&config, &mut words, SearchParams::default());
        match outcome {
            SearchOutcome::Success { choices, .. } => assert_eq!(choices.len(), 4),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn crossing_weights_never_drop_below_one() {
        let config = two_by_two_config();
        let mut words = WordList::new(0);
        for w in ["ab", "cd"] {
            words.add_word(w.into(), w.to_uppercase(), 50, None, false).unwrap();
        }
        let attempt = Attempt::new(&config, &mut words, 0, 0);
        assert!(attempt.crossing_weights.iter().all(|&w| w >= 1.0));
    }
}
