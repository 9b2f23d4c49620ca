//! Declared tag sets.
//!
//! Tags are case-insensitive; everything here works on lowercased tags
//! and keeps the original spellings only for re-emitting headers.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub fn normalize_tag(tag: &str) -> String {
    tag.to_lowercase()
}

/// One `# tags: [ ... ]` declaration.
///
/// Tags are kept in declaration order, which by convention runs from least
/// to most specific.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclaredTagSet {
    pub tags: Vec<String>,
    pub raw_tags: Vec<String>,
    /// Line of the directive, or 0 for synthesized sets.
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagSets {
    sets: Vec<DeclaredTagSet>,
    #[serde(skip)]
    index: BTreeMap<String, usize>,
}

impl TagSets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeclaredTagSet> {
        self.sets.iter()
    }

    /// Add a tag set. Fails with the offending tag when it is already part
    /// of another set, or repeated within this one.
    pub fn declare(&mut self, raw_tags: Vec<String>, line: usize) -> Result<(), String> {
        let set_index = self.sets.len();
        let mut tags = Vec::with_capacity(raw_tags.len());
        for raw in &raw_tags {
            let tag = normalize_tag(raw);
            if self.index.contains_key(&tag) || tags.contains(&tag) {
                return Err(tag);
            }
            tags.push(tag);
        }
        for tag in &tags {
            self.index.insert(tag.clone(), set_index);
        }
        self.sets.push(DeclaredTagSet {
            tags,
            raw_tags,
            line,
        });
        Ok(())
    }

    /// Append tags to an existing set. Tags already present are skipped.
    pub(crate) fn extend_set(&mut self, set_index: usize, raw_tags: &[String]) {
        for raw in raw_tags {
            let tag = normalize_tag(raw);
            if self.index.contains_key(&tag) {
                continue;
            }
            self.index.insert(tag.clone(), set_index);
            self.sets[set_index].tags.push(tag);
            self.sets[set_index].raw_tags.push(raw.clone());
        }
    }

    /// Index of the set declaring `tag` (lowercased).
    pub fn set_index(&self, tag: &str) -> Option<usize> {
        self.index.get(tag).copied()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.index.contains_key(tag)
    }

    /// Whether two distinct tags are declared in the same set, and so can
    /// never be active together.
    pub fn mutually_exclusive(&self, a: &str, b: &str) -> bool {
        if a == b {
            return false;
        }
        match (self.set_index(a), self.set_index(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// Tags that no set declares and that are not ignored, sorted and
    /// deduplicated.
    pub fn undeclared<'a, I>(&self, tags: I, ignored: &BTreeSet<String>) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let unknown: BTreeSet<String> = tags
            .into_iter()
            .map(|t| normalize_tag(t))
            .filter(|t| !self.contains(t) && !ignored.contains(t))
            .collect();
        unknown.into_iter().collect()
    }

    /// Keep, within each declared set, only the most specific of the given
    /// tags (the one declared last). Fails with the first tag that no set
    /// declares.
    pub fn most_specific(&self, tags: &BTreeSet<String>) -> Result<BTreeSet<String>, String> {
        let mut best: BTreeMap<usize, (usize, String)> = BTreeMap::new();
        for tag in tags {
            let tag = normalize_tag(tag);
            let Some((set_index, position)) = self.set_index(&tag).and_then(|set_index| {
                self.sets[set_index]
                    .tags
                    .iter()
                    .position(|t| *t == tag)
                    .map(|position| (set_index, position))
            }) else {
                return Err(tag);
            };
            match best.get(&set_index) {
                Some((kept, _)) if *kept >= position => {}
                _ => {
                    best.insert(set_index, (position, tag));
                }
            }
        }
        Ok(best.into_values().map(|(_, tag)| tag).collect())
    }
}
