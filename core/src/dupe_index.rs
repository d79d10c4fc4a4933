use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::glyph::GlyphId;
use crate::word::{GlobalWordId, WordId};

/// Groups words by shared length-`window` glyph subsequences, plus an
/// explicit symmetric pair map, so the solver can cheaply ask "what else
/// counts as the same word as this one".
///
/// Window size 0 disables substring-based grouping entirely; explicit pairs
/// still work.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DupeIndex {
    window: usize,
    groups: HashMap<Vec<GlyphId>, Vec<GlobalWordId>>,
    explicit_pairs: HashMap<GlobalWordId, HashSet<GlobalWordId>>,
}

impl DupeIndex {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            groups: HashMap::new(),
            explicit_pairs: HashMap::new(),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Registers `id`'s subsequence groups. Called once, right after the
    /// word is appended to its bucket.
    pub fn add_word(&mut self, id: GlobalWordId, glyphs: &[GlyphId]) {
        if self.window == 0 || glyphs.len() < self.window {
            return;
        }
        for start in 0..=(glyphs.len() - self.window) {
            let key = glyphs[start..start + self.window].to_vec();
            self.groups.entry(key).or_default().push(id);
        }
    }

    pub fn add_dupe_pair(&mut self, a: GlobalWordId, b: GlobalWordId) {
        self.explicit_pairs.entry(a).or_default().insert(b);
        self.explicit_pairs.entry(b).or_default().insert(a);
    }

    pub fn remove_dupe_pair(&mut self, a: GlobalWordId, b: GlobalWordId) {
        if let Some(mates) = self.explicit_pairs.get_mut(&a) {
            mates.remove(&b);
        }
        if let Some(mates) = self.explicit_pairs.get_mut(&b) {
            mates.remove(&a);
        }
    }

    /// Returns every word considered a dupe of `id` (including `id` itself),
    /// bucketed by length so the caller only probes relevant slots.
    pub fn get_dupes(
        &self,
        id: GlobalWordId,
        glyphs: &[GlyphId],
    ) -> HashMap<usize, HashSet<WordId>> {
        let mut result: HashMap<usize, HashSet<WordId>> = HashMap::new();
        result.entry(id.length).or_default().insert(id.id);

        if self.window > 0 && glyphs.len() >= self.window {
            for start in 0..=(glyphs.len() - self.window) {
                let key = &glyphs[start..start + self.window];
                if let Some(group) = self.groups.get(key) {
                    for &other in group {
                        result.entry(other.length).or_default().insert(other.id);
                    }
                }
            }
        }

        if let Some(mates) = self.explicit_pairs.get(&id) {
            for &mate in mates {
                result.entry(mate.length).or_default().insert(mate.id);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyphs(s: &str) -> Vec<GlyphId> {
        s.bytes().map(|b| GlyphId((b - b'a') as u32)).collect()
    }

    #[test]
    fn shares_window_are_dupes() {
        let mut index = DupeIndex::new(3);
        let cat = GlobalWordId::new(3, WordId(0));
        let cats = GlobalWordId::new(4, WordId(0));
        index.add_word(cat, &glyphs("cat"));
        index.add_word(cats, &glyphs("cats"));

        let dupes = index.get_dupes(cat, &glyphs("cat"));
        assert!(dupes.get(&4).unwrap().contains(&WordId(0)));
    }

    #[test]
    fn window_zero_disables_substring_dupes() {
        let mut index = DupeIndex::new(0);
        let cat = GlobalWordId::new(3, WordId(0));
        let cats = GlobalWordId::new(4, WordId(0));
        index.add_word(cat, &glyphs("cat"));
        index.add_word(cats, &glyphs("cats"));

        let dupes = index.get_dupes(cat, &glyphs("cat"));
        assert!(dupes.get(&4).is_none());
    }

    #[test]
    fn explicit_pairs_are_symmetric() {
        let mut index = DupeIndex::new(0);
        let a = GlobalWordId::new(3, WordId(0));
        let b = GlobalWordId::new(3, WordId(1));
        index.add_dupe_pair(a, b);

        assert!(index.get_dupes(a, &glyphs("cat")).get(&3).unwrap().contains(&WordId(1)));
        assert!(index.get_dupes(b, &glyphs("dog")).get(&3).unwrap().contains(&WordId(0)));

        index.remove_dupe_pair(a, b);
        assert!(!index.get_dupes(a, &glyphs("cat")).get(&3).map(|s| s.contains(&WordId(1))).unwrap_or(false));
    }
}
