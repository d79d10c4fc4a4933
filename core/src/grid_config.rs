use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConstructionError;
use crate::slot::{Crossing, CrossingId, Direction, Slot, SlotId};

/// One cell of the grid: either blocked (no letter ever goes here) or open,
/// carrying an optional pre-filled letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Blocked,
    Open(Option<char>),
}

impl Cell {
    pub fn is_blocked(self) -> bool {
        matches!(self, Cell::Blocked)
    }
}

/// Per-slot overrides consulted by Slot Options (`crate::slot_options`) when
/// computing a slot's initial option list: a stricter minimum score than the
/// grid's global floor, and/or a regex the word's normalized form must match.
///
/// Not `Serialize`/`Deserialize` (a compiled `Regex` isn't); `GridConfig`
/// skips this field when (de)serialized, so a round-tripped config loses any
/// constraints that had been set and falls back to the global minimum score.
#[derive(Debug, Clone, Default)]
pub struct SlotConstraint {
    pub min_score: Option<u8>,
    pub regex: Option<Regex>,
}

/// The static shape of a grid: its cells, the slots carved out of them, and
/// the crossings between those slots.
///
/// Built once via [`GridConfig::from_rows`] and never mutated afterward;
/// everything position-dependent that changes during search (candidate sets,
/// committed letters) lives alongside it, not inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    slots: Vec<Slot>,
    crossing_count: usize,
    min_score: u8,
    #[serde(skip)]
    slot_constraints: Vec<SlotConstraint>,
}

impl GridConfig {
    /// Builds a grid from a rectangular array of cells (row-major).
    ///
    /// Slots are maximal runs of non-blocked cells of length &ge; 2: across
    /// slots scanned row-major, down slots scanned column-major, ids handed
    /// out in that order. Crossings get a dense id shared by both slots that
    /// meet at that cell, keyed by the unordered pair of slot ids so the same
    /// physical crossing always gets the same id regardless of which slot is
    /// visited first.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Self, ConstructionError> {
        Self::from_rows_with_min_score(rows, 0)
    }

    /// Like [`GridConfig::from_rows`], but sets the global minimum score
    /// Slot Options enforces for every slot that doesn't carry its own
    /// [`SlotConstraint::min_score`] override (see [`GridConfig::set_slot_constraint`]).
    pub fn from_rows_with_min_score(rows: Vec<Vec<Cell>>, min_score: u8) -> Result<Self, ConstructionError> {
        if rows.is_empty() {
            return Err(ConstructionError::EmptyGrid);
        }
        let width = rows[0].len();
        if width == 0 {
            return Err(ConstructionError::ZeroWidthGrid);
        }
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != width {
                return Err(ConstructionError::InconsistentRowWidth {
                    row,
                    expected: width,
                    actual: cells.len(),
                });
            }
        }
        let height = rows.len();
        let mut cells = Vec::with_capacity(width * height);
        for row in &rows {
            cells.extend_from_slice(row);
        }

        let mut slots = Vec::new();
        let mut across_id_at: HashMap<(usize, usize), SlotId> = HashMap::new();
        let mut down_id_at: HashMap<(usize, usize), SlotId> = HashMap::new();

        for row in 0..height {
            let mut col = 0;
            while col < width {
                if cells[row * width + col].is_blocked() {
                    col += 1;
                    continue;
                }
                let start = col;
                while col < width && !cells[row * width + col].is_blocked() {
                    col += 1;
                }
                let length = col - start;
                if length >= 2 {
                    let id = SlotId(slots.len() as u32);
                    for c in start..col {
                        across_id_at.insert((row, c), id);
                    }
                    slots.push(Slot {
                        id,
                        direction: Direction::Across,
                        row,
                        col: start,
                        length,
                        crossings: vec![None; length],
                    });
                } else if length == 1 {
                    return Err(ConstructionError::SlotTooShort {
                        row,
                        col: start,
                        direction: Direction::Across,
                        length,
                    });
                }
            }
        }

        for col in 0..width {
            let mut row = 0;
            while row < height {
                if cells[row * width + col].is_blocked() {
                    row += 1;
                    continue;
                }
                let start = row;
                while row < height && !cells[row * width + col].is_blocked() {
                    row += 1;
                }
                let length = row - start;
                if length >= 2 {
                    let id = SlotId(slots.len() as u32);
                    for r in start..row {
                        down_id_at.insert((r, col), id);
                    }
                    slots.push(Slot {
                        id,
                        direction: Direction::Down,
                        row: start,
                        col,
                        length,
                        crossings: vec![None; length],
                    });
                } else if length == 1 {
                    return Err(ConstructionError::SlotTooShort {
                        row: start,
                        col,
                        direction: Direction::Down,
                        length,
                    });
                }
            }
        }

        let mut crossing_id_by_pair: HashMap<(u32, u32), CrossingId> = HashMap::new();
        let mut next_crossing_id = 0u32;

        for row in 0..height {
            for col in 0..width {
                let (Some(&a_id), Some(&b_id)) =
                    (across_id_at.get(&(row, col)), down_id_at.get(&(row, col)))
                else {
                    continue;
                };
                let key = (a_id.0.min(b_id.0), a_id.0.max(b_id.0));
                let crossing_id = *crossing_id_by_pair.entry(key).or_insert_with(|| {
                    let id = CrossingId(next_crossing_id);
                    next_crossing_id += 1;
                    id
                });

                let a_slot = &slots[a_id.index()];
                let a_cell_index = col - a_slot.col;
                let b_slot = &slots[b_id.index()];
                let b_cell_index = row - b_slot.row;

                slots[a_id.index()].crossings[a_cell_index] = Some(Crossing {
                    other_slot: b_id,
                    other_cell: b_cell_index,
                    crossing_id,
                });
                slots[b_id.index()].crossings[b_cell_index] = Some(Crossing {
                    other_slot: a_id,
                    other_cell: a_cell_index,
                    crossing_id,
                });
            }
        }

        let slot_count = slots.len();
        Ok(Self {
            width,
            height,
            cells,
            slots,
            crossing_count: next_crossing_id as usize,
            min_score,
            slot_constraints: vec![SlotConstraint::default(); slot_count],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.cells[row * self.width + col]
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, id: SlotId) -> &Slot {
        &self.slots[id.index()]
    }

    /// The global minimum score Slot Options enforces for a slot with no
    /// constraint override, set at construction (default 0).
    pub fn min_score(&self) -> u8 {
        self.min_score
    }

    /// `slot_id`'s current constraint override (min-score and/or regex), if any.
    pub fn slot_constraint(&self, slot_id: SlotId) -> &SlotConstraint {
        &self.slot_constraints[slot_id.index()]
    }

    /// Installs a per-slot constraint override, consulted thereafter by
    /// Slot Options in place of the grid's global minimum score.
    pub fn set_slot_constraint(&mut self, slot_id: SlotId, constraint: SlotConstraint) {
        self.slot_constraints[slot_id.index()] = constraint;
    }

    pub fn crossing_count(&self) -> usize {
        self.crossing_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(c: Option<char>) -> Cell {
        Cell::Open(c)
    }

    #[test]
    fn rejects_empty_grid() {
        assert_eq!(GridConfig::from_rows(vec![]), Err(ConstructionError::EmptyGrid));
    }

    #[test]
    fn rejects_inconsistent_row_width() {
        let rows = vec![vec![open(None); 3], vec![open(None); 2]];
        assert_eq!(
            GridConfig::from_rows(rows),
            Err(ConstructionError::InconsistentRowWidth {
                row: 1,
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn rejects_length_one_slot() {
        let rows = vec![vec![Cell::Blocked, open(None), Cell::Blocked]];
        assert!(matches!(
            GridConfig::from_rows(rows),
            Err(ConstructionError::SlotTooShort { length: 1, .. })
        ));
    }

    #[test]
    fn two_by_two_open_grid_has_two_across_two_down_and_four_crossings() {
        let rows = vec![vec![open(None); 2], vec![open(None); 2]];
        let config = GridConfig::from_rows(rows).unwrap();
        assert_eq!(config.slots().len(), 4);
        assert_eq!(config.crossing_count(), 4);
        for slot in config.slots() {
            assert_eq!(slot.crossing_count(), 2);
        }
    }

    #[test]
    fn corner_blocked_grid_carves_expected_slots() {
        // . # .
        // . . .
        // . # .
        let rows = vec![
            vec![open(None), Cell::Blocked, open(None)],
            vec![open(None), open(None), open(None)],
            vec![open(None), Cell::Blocked, open(None)],
        ];
        let config = GridConfig::from_rows(rows).unwrap();
        // across: row1 only (length 3); down: col0 (length 3), col2 (length 3)
        let across = config.slots().iter().filter(|s| s.direction == Direction::Across).count();
        let down = config.slots().iter().filter(|s| s.direction == Direction::Down).count();
        assert_eq!(across, 1);
        assert_eq!(down, 2);
    }
}
