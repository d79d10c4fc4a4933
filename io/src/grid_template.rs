use gridfill_core::{Cell, GridConfig};

use crate::error::GridTemplateError;

/// Parses a grid template: one line per row, equal widths, `#` for a
/// blocked cell, `.` for an empty cell, any other single character for a
/// pre-filled letter. Leading and trailing blank lines are trimmed.
pub fn parse_grid_template(text: &str) -> Result<GridConfig, GridTemplateError> {
    let lines: Vec<&str> = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .collect();

    let start = lines.iter().position(|l| !l.trim().is_empty());
    let Some(start) = start else {
        return Err(GridTemplateError::Empty);
    };
    let end = lines.iter().rposition(|l| !l.trim().is_empty()).unwrap();

    let rows: Vec<Vec<Cell>> = lines[start..=end]
        .iter()
        .map(|line| {
            line.chars()
                .map(|c| match c {
                    '#' => Cell::Blocked,
                    '.' => Cell::Open(None),
                    letter => Cell::Open(Some(letter.to_ascii_lowercase())),
                })
                .collect()
        })
        .collect();

    Ok(GridConfig::from_rows(rows)?)
}
