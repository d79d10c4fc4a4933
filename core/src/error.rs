use thiserror::Error;

/// Failures that can occur while building a [`crate::grid_config::GridConfig`].
///
/// Construction failures are reported immediately and never produce a value;
/// they are distinct from solver outcomes (see [`crate::search::SearchOutcome`]),
/// which always receive a valid `GridConfig` to work with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("grid template has no rows")]
    EmptyGrid,

    #[error("grid template has zero-width rows")]
    ZeroWidthGrid,

    #[error("row {row} has width {actual}, expected {expected}")]
    InconsistentRowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("slot at row {row}, col {col} ({direction:?}) has length {length}, minimum is 2")]
    SlotTooShort {
        row: usize,
        col: usize,
        direction: crate::slot::Direction,
        length: usize,
    },
}

/// Failures raised while adding a single word to a [`crate::word_list::WordList`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WordError {
    #[error("normalized word is empty")]
    EmptyNormalized,
}
