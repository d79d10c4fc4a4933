use serde::{Deserialize, Serialize};

/// Orientation of a run of unblocked cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Across,
    Down,
}

/// A slot's index within [`GridConfig::slots`](crate::grid_config::GridConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(pub u32);

impl SlotId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A dense id shared by both slots that meet at a crossing cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CrossingId(pub u32);

impl CrossingId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One cell's worth of crossing information, from the perspective of the
/// slot that owns this entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crossing {
    pub other_slot: SlotId,
    pub other_cell: usize,
    pub crossing_id: CrossingId,
}

/// A maximal run of unblocked cells in one direction, length &ge; 2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub direction: Direction,
    pub row: usize,
    pub col: usize,
    pub length: usize,
    /// `crossings[i]` is `Some` when this slot's `i`-th cell is shared with
    /// a slot running the other direction.
    pub crossings: Vec<Option<Crossing>>,
}

impl Slot {
    pub fn crossing_count(&self) -> usize {
        self.crossings.iter().filter(|c| c.is_some()).count()
    }

    /// The (row, col) of this slot's `i`-th cell.
    pub fn cell(&self, i: usize) -> (usize, usize) {
        match self.direction {
            Direction::Across => (self.row, self.col + i),
            Direction::Down => (self.row + i, self.col),
        }
    }
}
