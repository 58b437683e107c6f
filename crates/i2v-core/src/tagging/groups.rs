//! Tag groups and their column ranges in the probability layer.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Semantic partition of the tag vocabulary.
///
/// Groups occupy contiguous column ranges in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagGroup {
    General,
    Character,
    Copyright,
    Rating,
}

impl TagGroup {
    /// All groups in column order.
    pub const ALL: [TagGroup; 4] = [
        TagGroup::General,
        TagGroup::Character,
        TagGroup::Copyright,
        TagGroup::Rating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TagGroup::General => "general",
            TagGroup::Character => "character",
            TagGroup::Copyright => "copyright",
            TagGroup::Rating => "rating",
        }
    }

    /// Whether rank truncation and threshold filtering apply to this group.
    ///
    /// Ratings are few and mutually exclusive, so they are always reported
    /// in full.
    pub fn is_ranked(&self) -> bool {
        !matches!(self, TagGroup::Rating)
    }
}

impl fmt::Display for TagGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of tags in each group.
///
/// Column ranges are derived from these sizes, so a vocabulary with
/// different group sizes only needs a different layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupLayout {
    /// General content tags
    pub general: usize,
    /// Character tags
    pub character: usize,
    /// Copyright / series tags
    pub copyright: usize,
    /// Content rating tags
    pub rating: usize,
}

impl Default for GroupLayout {
    /// The published illustration2vec layout: 1539 tags.
    fn default() -> Self {
        Self {
            general: 512,
            character: 512,
            copyright: 512,
            rating: 3,
        }
    }
}

impl GroupLayout {
    pub fn new(general: usize, character: usize, copyright: usize, rating: usize) -> Self {
        Self {
            general,
            character,
            copyright,
            rating,
        }
    }

    /// Total vocabulary length covered by the layout.
    pub fn total(&self) -> usize {
        self.general + self.character + self.copyright + self.rating
    }

    /// Number of tags in `group`.
    pub fn size(&self, group: TagGroup) -> usize {
        match group {
            TagGroup::General => self.general,
            TagGroup::Character => self.character,
            TagGroup::Copyright => self.copyright,
            TagGroup::Rating => self.rating,
        }
    }

    /// Column range occupied by `group`.
    pub fn range(&self, group: TagGroup) -> Range<usize> {
        let start: usize = TagGroup::ALL
            .iter()
            .take_while(|g| **g != group)
            .map(|g| self.size(*g))
            .sum();
        start..start + self.size(group)
    }

    /// Size of the widest group.
    pub fn max_group_size(&self) -> usize {
        TagGroup::ALL
            .iter()
            .map(|g| self.size(*g))
            .max()
            .unwrap_or(0)
    }

    /// Group owning column `index`, if it is inside the layout.
    pub fn group_of(&self, index: usize) -> Option<TagGroup> {
        TagGroup::ALL
            .into_iter()
            .find(|g| self.range(*g).contains(&index))
    }
}
