use gridfill_core::{Cell, GridConfig, SlotChoice, Word, WordList};

/// Overlays a successful search's chosen words onto the grid's fill,
/// producing a grid-shaped string: one line per row, `#` for blocked cells,
/// the grid's own pre-filled letters where present, `.` for any other open
/// cell left unfilled (should not happen for a fully resolved [`SlotChoice`]
/// list), and the chosen letter otherwise.
pub fn render_fill(config: &GridConfig, words: &WordList, choices: &[SlotChoice]) -> String {
    let width = config.width();
    let height = config.height();
    let mut grid = vec![vec!['.'; width]; height];

    for row in 0..height {
        for col in 0..width {
            match config.cell(row, col) {
                Cell::Blocked => grid[row][col] = '#',
                Cell::Open(Some(c)) => grid[row][col] = c,
                Cell::Open(None) => {}
            }
        }
    }

    for choice in choices {
        let slot = config.slot(choice.slot);
        let word: &Word = words.get(choice.word);
        for (i, &glyph) in word.glyphs.iter().enumerate() {
            let (row, col) = slot.cell(i);
            grid[row][col] = words.glyphs().char_of(glyph);
        }
    }

    grid.into_iter()
        .map(|row| row.into_iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}
