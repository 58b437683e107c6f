//! Tag estimation from the network's probability layer.
//!
//! The `prob` layer scores every tag of a fixed vocabulary. Its columns are
//! split into general, character, copyright and rating groups, which are
//! ranked, truncated or thresholded independently.

pub mod estimator;
pub mod groups;
pub mod ranking;
pub mod result;
pub mod vocabulary;

pub use estimator::{TagEstimator, DEFAULT_THRESHOLD, DEFAULT_TOP_N};
pub use groups::{GroupLayout, TagGroup};
pub use result::{ScoredTag, SpecificTags, TaggedResult};
pub use vocabulary::TagVocabulary;
