pub mod error;
pub mod grid_template;
pub mod render;
pub mod word_list_file;

pub use error::{GridTemplateError, WordListEntryError};
pub use grid_template::parse_grid_template;
pub use render::render_fill;
pub use word_list_file::parse_word_list;
