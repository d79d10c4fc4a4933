use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::dupe_index::DupeIndex;
use crate::error::WordError;
use crate::glyph::GlyphStore;
use crate::word::{GlobalWordId, Word, WordId};

/// Strips whitespace, lowercases, and composes to canonical Unicode form
/// (NFC). This is the form used for deduplication and glyph lookups.
pub fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .nfc()
        .collect()
}

/// One raw entry destined for the word list: a canonical display string, a
/// score, and an optional index back into whatever external source produced
/// it (e.g. a line number in a word-list file).
#[derive(Debug, Clone)]
pub struct WordSourceEntry {
    pub canonical: String,
    pub score: u8,
    pub source_index: Option<usize>,
}

impl WordSourceEntry {
    pub fn new(canonical: impl Into<String>, score: u8) -> Self {
        Self {
            canonical: canonical.into(),
            score,
            source_index: None,
        }
    }
}

/// An ordered batch of entries, used by [`WordList::replace_list`]. When
/// several sources disagree on a normalized string, the earliest source in
/// the slice wins.
#[derive(Debug, Clone, Default)]
pub struct WordSource {
    pub entries: Vec<WordSourceEntry>,
}

/// Glyph interning plus length-bucketed word storage.
///
/// A [`WordId`] is only meaningful alongside the bucket length it was handed
/// out in; use [`GlobalWordId`] to carry both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordList {
    glyphs: GlyphStore,
    buckets: Vec<Vec<Word>>,
    word_id_by_string: HashMap<String, GlobalWordId>,
    dupe_index: DupeIndex,
}

impl WordList {
    pub fn new(dupe_window: usize) -> Self {
        Self {
            glyphs: GlyphStore::new(),
            buckets: Vec::new(),
            word_id_by_string: HashMap::new(),
            dupe_index: DupeIndex::new(dupe_window),
        }
    }

    pub fn glyphs(&self) -> &GlyphStore {
        &self.glyphs
    }

    pub fn glyphs_mut(&mut self) -> &mut GlyphStore {
        &mut self.glyphs
    }

    pub fn dupe_index(&self) -> &DupeIndex {
        &self.dupe_index
    }

    pub fn dupe_index_mut(&mut self) -> &mut DupeIndex {
        &mut self.dupe_index
    }

    /// The bucket for a given length, or an empty slice if no words of that
    /// length have been added.
    pub fn bucket(&self, length: usize) -> &[Word] {
        self.buckets.get(length).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn max_length(&self) -> usize {
        self.buckets.len().saturating_sub(1)
    }

    pub fn get(&self, id: GlobalWordId) -> &Word {
        &self.buckets[id.length][id.id.index()]
    }

    pub fn lookup_by_string(&self, normalized: &str) -> Option<GlobalWordId> {
        self.word_id_by_string.get(normalized).copied()
    }

    /// Interns `normalized`'s characters, grows buckets as needed, appends
    /// the word, and registers it for string lookup and dupe tracking.
    ///
    /// Idempotent: if `normalized` is already present, the existing id is
    /// returned and no new entry is created (first-writer-wins, matching the
    /// word-list invariant that every normalized string appears at most once).
    pub fn add_word(
        &mut self,
        normalized: String,
        canonical: String,
        score: u8,
        source_index: Option<usize>,
        hidden: bool,
    ) -> Result<GlobalWordId, WordError> {
        if normalized.is_empty() {
            return Err(WordError::EmptyNormalized);
        }
        if let Some(&existing) = self.word_id_by_string.get(&normalized) {
            return Ok(existing);
        }

        let glyphs: Vec<_> = normalized.chars().map(|c| self.glyphs.intern(c)).collect();
        let length = glyphs.len();
        if self.buckets.len() <= length {
            self.buckets.resize_with(length + 1, Vec::new);
        }

        let id = WordId(self.buckets[length].len() as u32);
        let global = GlobalWordId::new(length, id);
        let word = Word::new(normalized.clone(), canonical, glyphs.clone(), score, hidden, source_index);

        self.buckets[length].push(word);
        self.word_id_by_string.insert(normalized, global);
        self.dupe_index.add_word(global, &glyphs);

        Ok(global)
    }

    /// Returns the existing entry for `normalized` if present, otherwise adds
    /// it as a hidden, zero-scored entry and returns the new id.
    ///
    /// `normalized` must be non-empty; callers only reach this with the
    /// letters of an already length-checked, fully pre-filled slot.
    pub fn lookup_or_add_hidden(&mut self, normalized: &str) -> GlobalWordId {
        if let Some(existing) = self.lookup_by_string(normalized) {
            return existing;
        }
        self.add_word(normalized.to_string(), normalized.to_string(), 0, None, true)
            .expect("slot fills are never empty")
    }

    /// Clears the list and re-ingests from `sources` in order; the first
    /// source where a normalized string appears owns it.
    pub fn replace_list(&mut self, sources: &[WordSource]) {
        self.glyphs = GlyphStore::new();
        self.buckets.clear();
        self.word_id_by_string.clear();
        self.dupe_index = DupeIndex::new(self.dupe_index.window());

        for source in sources {
            for entry in &source.entries {
                let normalized = normalize(&entry.canonical);
                if normalized.is_empty() {
                    continue;
                }
                let _ = self.add_word(
                    normalized,
                    entry.canonical.clone(),
                    entry.score,
                    entry.source_index,
                    false,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_whitespace_and_lowercases() {
        assert_eq!(normalize("  Cross Word "), "crossword");
    }

    #[test]
    fn add_word_is_first_writer_wins() {
        let mut list = WordList::new(3);
        let first = list
            .add_word("cat".into(), "CAT".into(), 50, Some(0), false)
            .unwrap();
        let second = list
            .add_word("cat".into(), "CAT (again)".into(), 90, Some(1), false)
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(list.get(first).score, 50);
    }

    #[test]
    fn buckets_contain_only_matching_length() {
        let mut list = WordList::new(3);
        list.add_word("cat".into(), "CAT".into(), 50, None, false).unwrap();
        list.add_word("cats".into(), "CATS".into(), 50, None, false).unwrap();
        assert_eq!(list.bucket(3).len(), 1);
        assert_eq!(list.bucket(4).len(), 1);
    }

    #[test]
    fn lookup_or_add_hidden_reuses_existing() {
        let mut list = WordList::new(3);
        let visible = list.add_word("cat".into(), "CAT".into(), 50, None, false).unwrap();
        let looked_up = list.lookup_or_add_hidden("cat");
        assert_eq!(visible, looked_up);
        assert!(!list.get(looked_up).hidden);
    }

    #[test]
    fn lookup_or_add_hidden_creates_invisible_entry() {
        let mut list = WordList::new(3);
        let hidden = list.lookup_or_add_hidden("zzz");
        assert!(list.get(hidden).hidden);
        assert_eq!(list.get(hidden).score, 0);
    }

    #[test]
    fn replace_list_first_source_wins() {
        let mut list = WordList::new(0);
        let sources = vec![
            WordSource {
                entries: vec![WordSourceEntry::new("cat", 10)],
            },
            WordSource {
                entries: vec![WordSourceEntry::new("cat", 99), WordSourceEntry::new("dog", 50)],
            },
        ];
        list.replace_list(&sources);
        let cat = list.lookup_by_string("cat").unwrap();
        assert_eq!(list.get(cat).score, 10);
        assert!(list.lookup_by_string("dog").is_some());
    }
}
