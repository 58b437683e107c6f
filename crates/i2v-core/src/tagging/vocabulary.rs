//! Tag vocabulary: the ordered tag list aligned with the probability layer.
//!
//! Column `i` of the network's `prob` output scores `tags[i]`. The list is
//! split into groups by a [`GroupLayout`] whose total must equal the list
//! length.

use std::collections::HashMap;
use std::path::Path;

use crate::error::ConfigError;

use super::groups::{GroupLayout, TagGroup};

/// An immutable tag list with its lookup index.
#[derive(Debug, Clone)]
pub struct TagVocabulary {
    tags: Vec<String>,
    index: HashMap<String, usize>,
    layout: GroupLayout,
}

impl TagVocabulary {
    /// Build a vocabulary from tags in column order.
    ///
    /// Fails if the number of tags differs from `layout.total()`. When a tag
    /// string occurs more than once, lookups resolve to its last column.
    pub fn new(tags: Vec<String>, layout: GroupLayout) -> Result<Self, ConfigError> {
        if tags.len() != layout.total() {
            return Err(ConfigError::VocabularyMismatch {
                expected: layout.total(),
                actual: tags.len(),
            });
        }

        let mut index: HashMap<String, usize> = HashMap::with_capacity(tags.len());
        for (i, tag) in tags.iter().enumerate() {
            if let Some(previous) = index.insert(tag.clone(), i) {
                tracing::warn!(
                    "Duplicate tag {:?} at columns {} and {}; lookups use column {}",
                    tag,
                    previous,
                    i,
                    i
                );
            }
        }

        Ok(Self {
            tags,
            index,
            layout,
        })
    }

    /// Load a tag list file.
    ///
    /// `.json` files hold a JSON array of strings (the published
    /// `tag_list.json`). Any other file is read as one tag per line; blank
    /// lines are skipped.
    pub fn load(path: &Path, layout: GroupLayout) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let tags: Vec<String> = if is_json {
            serde_json::from_str(&content)?
        } else {
            content
                .lines()
                .map(|l| l.trim_end_matches('\r'))
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect()
        };

        let vocabulary = Self::new(tags, layout)?;

        tracing::info!(
            "Loaded vocabulary from {:?}: {} tags ({} general, {} character, {} copyright, {} rating), hash {}",
            path,
            vocabulary.len(),
            layout.general,
            layout.character,
            layout.copyright,
            layout.rating,
            &vocabulary.content_hash()[..12],
        );

        Ok(vocabulary)
    }

    /// All tags in column order.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Tag at column `index`.
    pub fn tag(&self, index: usize) -> Option<&str> {
        self.tags.get(index).map(String::as_str)
    }

    /// Column of `tag`, if present.
    pub fn index_of(&self, tag: &str) -> Option<usize> {
        self.index.get(tag).copied()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.index.contains_key(tag)
    }

    /// Number of tags (equals the probability layer width).
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn layout(&self) -> &GroupLayout {
        &self.layout
    }

    /// Tags belonging to `group`, in column order.
    pub fn group_tags(&self, group: TagGroup) -> &[String] {
        &self.tags[self.layout.range(group)]
    }

    /// BLAKE3 hash of all tags in order.
    ///
    /// Identifies the vocabulary a set of results was produced with.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for tag in &self.tags {
            hasher.update(tag.as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }
}
