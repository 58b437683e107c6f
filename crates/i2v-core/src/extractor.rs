//! The network boundary.
//!
//! A [`FeatureExtractor`] runs the forward pass of an illustration tagging
//! network and returns the activations of one named layer for a whole batch.
//! Everything downstream of that call (slicing, ranking, thresholding,
//! packing) lives in [`crate::tagging`] and [`crate::feature`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ndarray::{ArrayD, Axis, Slice};
use thiserror::Error;

/// A single decoded image, already converted to a dense float array.
///
/// Shape and normalization are whatever the extractor expects; the
/// estimator never inspects pixels.
pub type ImageTensor = ArrayD<f32>;

/// Network layers consumed by the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Sigmoid outputs, one column per vocabulary tag.
    Prob,
    /// Continuous embedding.
    Encode1,
    /// Embedding before binarization; same width as [`Layer::Encode1`].
    Encode1Neuron,
}

impl Layer {
    /// Layer name as exported by the network.
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Prob => "prob",
            Layer::Encode1 => "encode1",
            Layer::Encode1Neuron => "encode1neuron",
        }
    }

    /// Parse a layer name (exact match).
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "prob" => Some(Layer::Prob),
            "encode1" => Some(Layer::Encode1),
            "encode1neuron" => Some(Layer::Encode1Neuron),
            _ => None,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures reported by a [`FeatureExtractor`].
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// The extractor does not provide the requested layer.
    #[error("Layer not available: {layer}")]
    MissingLayer { layer: String },

    /// An input image could not be processed.
    #[error("Invalid image at batch index {index}: {message}")]
    InvalidImage { index: usize, message: String },

    /// The inference backend failed.
    #[error("Extraction of layer {layer} failed: {message}")]
    Backend { layer: String, message: String },
}

/// Runs a network forward pass and returns one layer's activations.
///
/// Implementations must return a tensor whose first axis has one entry per
/// input image, in input order. Trailing axes are flattened by the caller,
/// so `(N, L)` and `(N, L, 1, 1)` are equivalent. An implementation must
/// fail rather than substitute values for an image it cannot process.
pub trait FeatureExtractor {
    /// Extract the activations of `layer` for every image in `images`.
    fn extract(&self, images: &[ImageTensor], layer: Layer) -> Result<ArrayD<f32>, ExtractorError>;
}

impl<E: FeatureExtractor + ?Sized> FeatureExtractor for &E {
    fn extract(&self, images: &[ImageTensor], layer: Layer) -> Result<ArrayD<f32>, ExtractorError> {
        (**self).extract(images, layer)
    }
}

impl<E: FeatureExtractor + ?Sized> FeatureExtractor for Box<E> {
    fn extract(&self, images: &[ImageTensor], layer: Layer) -> Result<ArrayD<f32>, ExtractorError> {
        (**self).extract(images, layer)
    }
}

impl<E: FeatureExtractor + ?Sized> FeatureExtractor for Arc<E> {
    fn extract(&self, images: &[ImageTensor], layer: Layer) -> Result<ArrayD<f32>, ExtractorError> {
        (**self).extract(images, layer)
    }
}

/// Replays precomputed activations instead of running a network.
///
/// Each registered layer holds a tensor whose first axis is the image axis.
/// A call with `n` images returns the first `n` rows of that tensor; image
/// contents are ignored.
#[derive(Debug, Clone, Default)]
pub struct StaticExtractor {
    layers: HashMap<Layer, ArrayD<f32>>,
}

impl StaticExtractor {
    /// Create an extractor with no layers registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the activations served for `layer`.
    pub fn with_layer<D: ndarray::Dimension>(
        mut self,
        layer: Layer,
        activations: ndarray::Array<f32, D>,
    ) -> Self {
        self.layers.insert(layer, activations.into_dyn());
        self
    }

    /// Number of rows stored for `layer`, if registered.
    pub fn rows(&self, layer: Layer) -> Option<usize> {
        self.layers
            .get(&layer)
            .and_then(|t| t.shape().first().copied())
    }
}

impl FeatureExtractor for StaticExtractor {
    fn extract(&self, images: &[ImageTensor], layer: Layer) -> Result<ArrayD<f32>, ExtractorError> {
        let tensor = self
            .layers
            .get(&layer)
            .ok_or_else(|| ExtractorError::MissingLayer {
                layer: layer.to_string(),
            })?;

        let stored = tensor.shape().first().copied().unwrap_or(0);
        if tensor.ndim() == 0 || stored < images.len() {
            return Err(ExtractorError::Backend {
                layer: layer.to_string(),
                message: format!(
                    "{} rows stored but {} images requested",
                    stored,
                    images.len()
                ),
            });
        }

        Ok(tensor
            .slice_axis(Axis(0), Slice::from(0..images.len()))
            .to_owned())
    }
}
