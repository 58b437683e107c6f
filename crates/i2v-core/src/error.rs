//! Error types for tag estimation and feature extraction.
//!
//! Errors are split by origin: configuration (vocabulary, config file),
//! estimation (precondition and shape checks performed by the estimator),
//! and extractor failures, which are propagated untouched.

use thiserror::Error;

pub use crate::extractor::ExtractorError;

/// Top-level error type for i2v operations.
#[derive(Error, Debug)]
pub enum I2vError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Estimation errors
    #[error("Estimation error: {0}")]
    Estimate(#[from] EstimateError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration and vocabulary errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read a config or tag list file from disk
    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Tag list file is not a JSON array of strings
    #[error("Failed to parse tag list: {0}")]
    VocabularyFormat(#[from] serde_json::Error),

    /// Vocabulary length does not match the group layout
    #[error("Vocabulary has {actual} tags but the group layout expects {expected}")]
    VocabularyMismatch { expected: usize, actual: usize },

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised by [`TagEstimator`](crate::tagging::TagEstimator) operations.
#[derive(Error, Debug)]
pub enum EstimateError {
    /// A tag operation was invoked on an estimator built without a vocabulary.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A requested tag is not part of the vocabulary.
    #[error("Tag not found in vocabulary: {0:?}")]
    TagNotFound(String),

    /// The extractor failed; surfaced unchanged.
    #[error(transparent)]
    Extractor(#[from] ExtractorError),

    /// The extractor returned a tensor whose shape disagrees with the batch
    /// or the vocabulary.
    #[error("Unexpected shape for layer {layer}: expected {expected}, got {actual}")]
    ShapeMismatch {
        layer: String,
        expected: String,
        actual: String,
    },

    /// Operations require at least one image.
    #[error("Image batch is empty")]
    EmptyBatch,

    /// An argument is outside its accepted range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience type alias for i2v results.
pub type Result<T> = std::result::Result<T, I2vError>;

/// Convenience type alias for estimator results.
pub type EstimateResult<T> = std::result::Result<T, EstimateError>;
