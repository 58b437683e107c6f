//! Per-image estimation results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::groups::TagGroup;

/// A tag with its estimated probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTag {
    /// The tag label (e.g., "long hair", "hatsune miku", "safe")
    pub tag: String,

    /// Sigmoid output of the network, 0.0 to 1.0
    pub probability: f32,
}

impl ScoredTag {
    pub fn new(tag: impl Into<String>, probability: f32) -> Self {
        Self {
            tag: tag.into(),
            probability,
        }
    }
}

/// Ranked tags for one image, split by group.
///
/// Every group is ordered by descending probability, ties in vocabulary
/// order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaggedResult {
    pub general: Vec<ScoredTag>,
    pub character: Vec<ScoredTag>,
    pub copyright: Vec<ScoredTag>,
    pub rating: Vec<ScoredTag>,
}

impl TaggedResult {
    /// Tags reported for `group`.
    pub fn group(&self, group: TagGroup) -> &[ScoredTag] {
        match group {
            TagGroup::General => &self.general,
            TagGroup::Character => &self.character,
            TagGroup::Copyright => &self.copyright,
            TagGroup::Rating => &self.rating,
        }
    }

    pub(crate) fn group_mut(&mut self, group: TagGroup) -> &mut Vec<ScoredTag> {
        match group {
            TagGroup::General => &mut self.general,
            TagGroup::Character => &mut self.character,
            TagGroup::Copyright => &mut self.copyright,
            TagGroup::Rating => &mut self.rating,
        }
    }

    /// All reported tags, group by group.
    pub fn iter(&self) -> impl Iterator<Item = (TagGroup, &ScoredTag)> {
        TagGroup::ALL
            .into_iter()
            .flat_map(move |g| self.group(g).iter().map(move |t| (g, t)))
    }

    /// Probability reported for `tag` in any group.
    pub fn probability(&self, tag: &str) -> Option<f32> {
        self.iter()
            .find(|(_, t)| t.tag == tag)
            .map(|(_, t)| t.probability)
    }

    /// Total number of reported tags.
    pub fn len(&self) -> usize {
        TagGroup::ALL.iter().map(|g| self.group(*g).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most probable rating, if the layout has a rating group.
    pub fn top_rating(&self) -> Option<&ScoredTag> {
        self.rating.first()
    }
}

/// Probabilities of explicitly requested tags for one image, keyed by tag.
pub type SpecificTags = BTreeMap<String, f32>;
