use std::collections::HashSet;

use regex::Regex;

use crate::glyph::GlyphId;
use crate::grid_config::{Cell, GridConfig};
use crate::slot::SlotId;
use crate::word::{GlobalWordId, WordId};
use crate::word_list::WordList;

/// Per-cell pre-fill for a slot: `Some(g)` where a glyph is already fixed,
/// `None` where the cell is still open.
pub type PreFill<'a> = &'a [Option<GlyphId>];

/// Reads a slot's pre-filled letters (if any) straight off the grid,
/// interning them into `words`' glyph store as needed.
pub fn slot_prefill(config: &GridConfig, words: &mut WordList, slot_id: SlotId) -> Vec<Option<GlyphId>> {
    let slot = config.slot(slot_id);
    (0..slot.length)
        .map(|i| {
            let (row, col) = slot.cell(i);
            match config.cell(row, col) {
                Cell::Open(Some(c)) => Some(words.glyphs_mut().intern(c)),
                _ => None,
            }
        })
        .collect()
}

/// Enumerates the WordIds a slot may still take, given its current pre-fill
/// and constraints.
///
/// If every cell of `pre_fill` is filled, the slot's fill spells exactly one
/// string; the single matching (or newly hidden) id is returned regardless
/// of `min_score`/`regex`/`allow`. Otherwise every word in the length bucket
/// is checked against the pre-fill letters plus the score/regex gate (unless
/// exempted by `allow`), in the bucket's natural order.
pub fn enumerate_allowed_words(
    words: &mut WordList,
    pre_fill: PreFill,
    min_score: u8,
    regex: Option<&Regex>,
    allow: Option<&HashSet<WordId>>,
) -> Vec<WordId> {
    let length = pre_fill.len();

    if pre_fill.iter().all(Option::is_some) {
        let normalized: String = pre_fill
            .iter()
            .map(|g| words.glyphs().char_of(g.unwrap()))
            .collect();
        let id = words.lookup_or_add_hidden(&normalized);
        debug_assert_eq!(id.length, length);
        return vec![id.id];
    }

    let mut result = Vec::new();
    for (index, word) in words.bucket(length).iter().enumerate() {
        let id = WordId(index as u32);

        let matches_prefill = pre_fill
            .iter()
            .enumerate()
            .all(|(i, g)| g.is_none_or(|g| word.glyphs[i] == g));
        if !matches_prefill {
            continue;
        }

        let exempt = allow.is_some_and(|a| a.contains(&id));
        if exempt {
            result.push(id);
            continue;
        }

        if word.hidden {
            continue;
        }
        if word.score < min_score {
            continue;
        }
        if let Some(re) = regex {
            if !re.is_match(&word.normalized) {
                continue;
            }
        }
        result.push(id);
    }
    result
}

/// Computes a slot's initial option list per the Grid Config contract: its
/// current pre-fill, its constraint override's minimum score (or the grid's
/// global minimum), its constraint override's regex (if any), and no
/// allow-set exemption.
pub fn initial_options_for_slot(config: &GridConfig, words: &mut WordList, slot_id: SlotId) -> Vec<WordId> {
    let pre_fill = slot_prefill(config, words, slot_id);
    let constraint = config.slot_constraint(slot_id);
    let min_score = constraint.min_score.unwrap_or_else(|| config.min_score());
    enumerate_allowed_words(words, &pre_fill, min_score, constraint.regex.as_ref(), None)
}
