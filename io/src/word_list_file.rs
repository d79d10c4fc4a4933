use gridfill_core::{WordSource, WordSourceEntry};

use crate::error::WordListEntryError;

const MAX_COLLECTED_ERRORS: usize = 100;
const DEFAULT_SCORE: u8 = 50;

/// Parses a word-list text file: one entry per line, `canonical` optionally
/// followed by `;score`. Missing scores default to 50. Lines that end up
/// with an empty normalized string are silently skipped (the caller's
/// `WordList::replace_list` would reject them anyway). Collects up to 100
/// parse errors before giving up on the remainder of the file.
pub fn parse_word_list(text: &str) -> (WordSource, Vec<WordListEntryError>) {
    let mut entries = Vec::new();
    let mut errors = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        if errors.len() >= MAX_COLLECTED_ERRORS {
            break;
        }
        let line_number = index + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        let (canonical, score) = match line.split_once(';') {
            None => (line, DEFAULT_SCORE),
            Some((word, raw_score)) => {
                let raw_score = raw_score.trim();
                if raw_score.is_empty() {
                    (word, DEFAULT_SCORE)
                } else {
                    match raw_score.parse::<i64>() {
                        Ok(score) if (0..=100).contains(&score) => (word, score as u8),
                        Ok(score) => {
                            errors.push(WordListEntryError::ScoreOutOfRange {
                                line: line_number,
                                score,
                            });
                            continue;
                        }
                        Err(_) => {
                            errors.push(WordListEntryError::InvalidScore {
                                line: line_number,
                                raw: raw_score.to_string(),
                            });
                            continue;
                        }
                    }
                }
            }
        };

        if gridfill_core::normalize(canonical).is_empty() {
            continue;
        }

        entries.push(WordSourceEntry {
            canonical: canonical.to_string(),
            score,
            source_index: Some(line_number),
        });
    }

    (WordSource { entries }, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_with_and_without_score() {
        let (source, errors) = parse_word_list("cat;80\ndog\n");
        assert!(errors.is_empty());
        assert_eq!(source.entries.len(), 2);
        assert_eq!(source.entries[0].score, 80);
        assert_eq!(source.entries[1].score, 50);
    }

    #[test]
    fn skips_blank_lines_and_empty_normalizations() {
        let (source, errors) = parse_word_list("\n   \ncat\n");
        assert!(errors.is_empty());
        assert_eq!(source.entries.len(), 1);
    }

    #[test]
    fn collects_invalid_score_errors() {
        let (source, errors) = parse_word_list("cat;notanumber\ndog;200\n");
        assert_eq!(source.entries.len(), 0);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn stops_collecting_after_100_errors() {
        let body = "x;oops\n".repeat(150);
        let (_, errors) = parse_word_list(&body);
        assert_eq!(errors.len(), 100);
    }
}
