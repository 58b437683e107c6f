//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::tagging::{GroupLayout, DEFAULT_THRESHOLD, DEFAULT_TOP_N};

/// Tag vocabulary settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    /// Tag list file (`.json` array or one tag per line)
    pub tag_list: PathBuf,

    /// Group sizes, in column order
    pub layout: GroupLayout,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            tag_list: PathBuf::from("~/.i2v/tag_list.json"),
            layout: GroupLayout::default(),
        }
    }
}

/// Defaults for estimation calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationConfig {
    /// Tags per group for top-tag estimation
    pub top_n: usize,

    /// Probability a tag must exceed for plausible-tag estimation
    pub threshold: f32,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
