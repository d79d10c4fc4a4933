use thiserror::Error;

/// Failures parsing a single word-list line. Always carries the 1-based line
/// number it came from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WordListEntryError {
    #[error("line {line}: score {raw:?} is not a valid integer")]
    InvalidScore { line: usize, raw: String },

    #[error("line {line}: score {score} is out of range 0..=100")]
    ScoreOutOfRange { line: usize, score: i64 },
}

/// Raised by [`crate::grid_template::parse_grid_template`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridTemplateError {
    #[error("grid template has no rows")]
    Empty,

    #[error(transparent)]
    Construction(#[from] gridfill_core::ConstructionError),
}
