//! i2v Core - tag estimation and feature postprocessing for illustration
//! tagging networks.
//!
//! A pretrained network (behind the [`FeatureExtractor`] trait) scores a
//! fixed vocabulary of tags per image. This crate turns those scores into
//! structured results and turns embeddings into compact binary fingerprints.
//!
//! # Architecture
//!
//! ```text
//! images → FeatureExtractor::extract(layer) → TagEstimator → TaggedResult / BinaryFingerprint → JSON
//! ```
//!
//! The estimator never runs a network itself: model loading, image decoding
//! and the forward pass belong to the extractor implementation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use i2v_core::{Config, TagEstimator};
//!
//! fn main() -> i2v_core::Result<()> {
//!     let config = Config::load()?;
//!     let vocabulary = config.load_vocabulary()?;
//!     let network = MyOnnxExtractor::load("illust2vec_tag.onnx")?;
//!
//!     let estimator = TagEstimator::with_vocabulary(&network, vocabulary);
//!     let tags = estimator.estimate_plausible_tags(&images, config.estimation.threshold)?;
//!     println!("Rating: {:?}", tags[0].top_rating());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod extractor;
pub mod feature;
pub mod logging;
pub mod output;
pub mod tagging;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, EstimateError, EstimateResult, I2vError, Result};
pub use extractor::{ExtractorError, FeatureExtractor, ImageTensor, Layer, StaticExtractor};
pub use feature::{BinaryFingerprint, FingerprintError, BINARIZE_THRESHOLD};
pub use output::{OutputFormat, OutputWriter};
pub use tagging::{
    GroupLayout, ScoredTag, SpecificTags, TagEstimator, TagGroup, TagVocabulary, TaggedResult,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
