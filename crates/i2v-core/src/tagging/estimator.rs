//! Tag estimation over a borrowed [`FeatureExtractor`].
//!
//! The estimator turns raw layer activations into ranked, grouped tags and
//! binary fingerprints. It holds no state besides the vocabulary, so every
//! operation is a pure function of the extractor output.

use std::time::Instant;

use ndarray::{Array2, ArrayD};

use crate::error::{EstimateError, EstimateResult};
use crate::extractor::{FeatureExtractor, ImageTensor, Layer};
use crate::feature::{pack_bits, BinaryFingerprint, BINARIZE_THRESHOLD};

use super::groups::TagGroup;
use super::ranking::top_k;
use super::result::{ScoredTag, SpecificTags, TaggedResult};
use super::vocabulary::TagVocabulary;

/// Number of tags per group returned by [`TagEstimator::estimate_top_tags`]
/// when the caller has no preference.
pub const DEFAULT_TOP_N: usize = 10;

/// Probability a tag must exceed to be reported by
/// [`TagEstimator::estimate_plausible_tags`] when the caller has no preference.
pub const DEFAULT_THRESHOLD: f32 = 0.25;

/// Estimates tags and features for batches of images.
///
/// Borrows its extractor, so one network can back many estimators. Without a
/// vocabulary only [`extract_feature`](Self::extract_feature) and
/// [`extract_binary_feature`](Self::extract_binary_feature) are available.
pub struct TagEstimator<'e, E: FeatureExtractor + ?Sized> {
    extractor: &'e E,
    vocabulary: Option<TagVocabulary>,
}

impl<'e, E: FeatureExtractor + ?Sized> TagEstimator<'e, E> {
    /// Create an estimator over `extractor`, optionally with a vocabulary.
    pub fn new(extractor: &'e E, vocabulary: Option<TagVocabulary>) -> Self {
        if let Some(vocab) = &vocabulary {
            tracing::debug!("Tag estimator ready with {} tags", vocab.len());
        } else {
            tracing::debug!("Tag estimator ready without vocabulary (feature extraction only)");
        }
        Self {
            extractor,
            vocabulary,
        }
    }

    pub fn with_vocabulary(extractor: &'e E, vocabulary: TagVocabulary) -> Self {
        Self::new(extractor, Some(vocabulary))
    }

    pub fn feature_only(extractor: &'e E) -> Self {
        Self::new(extractor, None)
    }

    /// The vocabulary, if one was supplied.
    pub fn vocabulary(&self) -> Option<&TagVocabulary> {
        self.vocabulary.as_ref()
    }

    fn require_vocabulary(&self) -> EstimateResult<&TagVocabulary> {
        self.vocabulary.as_ref().ok_or_else(|| {
            EstimateError::Configuration(
                "tag estimation requires a vocabulary; construct the estimator with one".into(),
            )
        })
    }

    /// Run `layer` for the batch and flatten the result to `(images, width)`.
    fn run_layer(&self, images: &[ImageTensor], layer: Layer) -> EstimateResult<Array2<f32>> {
        if images.is_empty() {
            return Err(EstimateError::EmptyBatch);
        }

        let start = Instant::now();
        let raw = self.extractor.extract(images, layer)?;
        tracing::trace!("  Extract {}: {:?}", layer, start.elapsed());

        flatten_rows(raw, images.len(), layer)
    }

    /// Probability matrix `(images, vocabulary length)`.
    fn probabilities(
        &self,
        images: &[ImageTensor],
        vocabulary: &TagVocabulary,
    ) -> EstimateResult<Array2<f32>> {
        let prob = self.run_layer(images, Layer::Prob)?;
        if prob.ncols() != vocabulary.len() {
            return Err(EstimateError::ShapeMismatch {
                layer: Layer::Prob.to_string(),
                expected: format!("{} columns (vocabulary size)", vocabulary.len()),
                actual: format!("{} columns", prob.ncols()),
            });
        }
        Ok(prob)
    }

    /// Probabilities of specific tags for each image.
    ///
    /// Every tag is resolved before the network runs; the first unknown tag
    /// fails the call with [`EstimateError::TagNotFound`]. Repeated tags
    /// appear once in each result.
    pub fn estimate_specific_tags<S: AsRef<str>>(
        &self,
        images: &[ImageTensor],
        tags: &[S],
    ) -> EstimateResult<Vec<SpecificTags>> {
        let vocabulary = self.require_vocabulary()?;

        let columns = tags
            .iter()
            .map(|t| {
                let tag = t.as_ref();
                vocabulary
                    .index_of(tag)
                    .map(|i| (tag, i))
                    .ok_or_else(|| EstimateError::TagNotFound(tag.to_string()))
            })
            .collect::<EstimateResult<Vec<_>>>()?;

        tracing::debug!(
            "Estimating {} specific tags for {} images",
            columns.len(),
            images.len()
        );

        let prob = self.probabilities(images, vocabulary)?;

        Ok(prob
            .rows()
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|&(tag, i)| (tag.to_string(), row[i]))
                    .collect()
            })
            .collect())
    }

    /// The `n_tag` most probable general, character and copyright tags for
    /// each image, plus every rating tag.
    ///
    /// `n_tag` larger than a group is clamped to the group size; zero is
    /// rejected.
    pub fn estimate_top_tags(
        &self,
        images: &[ImageTensor],
        n_tag: usize,
    ) -> EstimateResult<Vec<TaggedResult>> {
        if n_tag == 0 {
            return Err(EstimateError::InvalidArgument(
                "n_tag must be at least 1".into(),
            ));
        }

        let vocabulary = self.require_vocabulary()?;
        tracing::debug!("Estimating top {} tags for {} images", n_tag, images.len());

        let prob = self.probabilities(images, vocabulary)?;

        let start = Instant::now();
        let results = prob
            .rows()
            .into_iter()
            .map(|row| {
                let row = row.to_vec();
                rank_row(&row, vocabulary, n_tag)
            })
            .collect();
        tracing::trace!("  Rank: {:?}", start.elapsed());

        Ok(results)
    }

    /// Every general, character and copyright tag whose probability is
    /// strictly above `threshold`, plus every rating tag.
    ///
    /// Rating tags are never filtered.
    pub fn estimate_plausible_tags(
        &self,
        images: &[ImageTensor],
        threshold: f32,
    ) -> EstimateResult<Vec<TaggedResult>> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(EstimateError::InvalidArgument(format!(
                "threshold must be between 0.0 and 1.0, got {threshold}"
            )));
        }

        let vocabulary = self.require_vocabulary()?;
        let n_tag = vocabulary.layout().max_group_size().max(1);
        let mut results = self.estimate_top_tags(images, n_tag)?;

        for result in &mut results {
            for group in TagGroup::ALL.into_iter().filter(TagGroup::is_ranked) {
                result
                    .group_mut(group)
                    .retain(|t| t.probability > threshold);
            }
        }

        Ok(results)
    }

    /// Continuous embedding (`encode1`), one row per image.
    pub fn extract_feature(&self, images: &[ImageTensor]) -> EstimateResult<Array2<f32>> {
        tracing::debug!("Extracting features for {} images", images.len());
        self.run_layer(images, Layer::Encode1)
    }

    /// Binary fingerprint of the `encode1neuron` embedding for each image.
    ///
    /// See [`crate::feature`] for the bit layout.
    pub fn extract_binary_feature(
        &self,
        images: &[ImageTensor],
    ) -> EstimateResult<Vec<BinaryFingerprint>> {
        tracing::debug!("Extracting binary features for {} images", images.len());
        let feature = self.run_layer(images, Layer::Encode1Neuron)?;

        Ok(feature
            .rows()
            .into_iter()
            .map(|row| pack_bits(row.iter().copied(), BINARIZE_THRESHOLD))
            .collect())
    }
}

/// Rank one probability row into grouped tags.
fn rank_row(row: &[f32], vocabulary: &TagVocabulary, n_tag: usize) -> TaggedResult {
    let layout = vocabulary.layout();
    let mut result = TaggedResult::default();

    for group in TagGroup::ALL {
        let range = layout.range(group);
        let offset = range.start;
        let probs = &row[range];
        let k = if group.is_ranked() { n_tag } else { probs.len() };

        *result.group_mut(group) = top_k(probs, k)
            .into_iter()
            .map(|i| ScoredTag::new(vocabulary.tags()[offset + i].as_str(), probs[i]))
            .collect();
    }

    result
}

/// Reshape extractor output to `(rows, rest)`, checking the row count.
fn flatten_rows(raw: ArrayD<f32>, rows: usize, layer: Layer) -> EstimateResult<Array2<f32>> {
    let shape = raw.shape().to_vec();
    if shape.first().copied() != Some(rows) {
        return Err(EstimateError::ShapeMismatch {
            layer: layer.to_string(),
            expected: format!("{rows} rows (one per image)"),
            actual: format!("shape {shape:?}"),
        });
    }

    let width: usize = shape[1..].iter().product();
    let data: Vec<f32> = raw.iter().copied().collect();
    Array2::from_shape_vec((rows, width), data).map_err(|e| EstimateError::ShapeMismatch {
        layer: layer.to_string(),
        expected: format!("({rows}, {width})"),
        actual: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{ExtractorError, StaticExtractor};
    use crate::tagging::groups::GroupLayout;
    use ndarray::{array, Array4};

    fn images(n: usize) -> Vec<ImageTensor> {
        (0..n).map(|_| ArrayD::zeros(vec![4, 4, 3])).collect()
    }

    fn vocab(layout: GroupLayout) -> TagVocabulary {
        let tags = (0..layout.total()).map(|i| format!("tag{i}")).collect();
        TagVocabulary::new(tags, layout).unwrap()
    }

    /// L = 10: general 4, character 2, copyright 1, rating 3.
    fn small_fixture() -> (StaticExtractor, TagVocabulary) {
        let prob = array![
            [0.1, 0.9, 0.3, 0.9, 0.2, 0.7, 0.05, 0.6, 0.3, 0.1],
            [0.8, 0.0, 0.26, 0.25, 0.5, 0.5, 0.95, 0.1, 0.2, 0.7],
        ];
        let extractor = StaticExtractor::new().with_layer(Layer::Prob, prob);
        (extractor, vocab(GroupLayout::new(4, 2, 1, 3)))
    }

    fn names(tags: &[ScoredTag]) -> Vec<&str> {
        tags.iter().map(|t| t.tag.as_str()).collect()
    }

    #[test]
    fn test_reference_example() {
        let extractor =
            StaticExtractor::new().with_layer(Layer::Prob, array![[0.1_f32, 0.9, 0.6, 0.4]]);
        let estimator =
            TagEstimator::with_vocabulary(&extractor, vocab(GroupLayout::new(2, 0, 0, 2)));

        let result = estimator.estimate_top_tags(&images(1), 1).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].general, vec![ScoredTag::new("tag1", 0.9)]);
        assert!(result[0].character.is_empty());
        assert!(result[0].copyright.is_empty());
        assert_eq!(
            result[0].rating,
            vec![ScoredTag::new("tag2", 0.6), ScoredTag::new("tag3", 0.4)]
        );
    }

    #[test]
    fn test_top_tags_truncates_ranked_groups_only() {
        let (extractor, vocabulary) = small_fixture();
        let estimator = TagEstimator::with_vocabulary(&extractor, vocabulary);

        let results = estimator.estimate_top_tags(&images(2), 2).unwrap();
        let first = &results[0];
        // ties (0.9, 0.9) keep column order
        assert_eq!(names(&first.general), vec!["tag1", "tag3"]);
        assert_eq!(names(&first.character), vec!["tag5", "tag4"]);
        assert_eq!(names(&first.copyright), vec!["tag6"]);
        assert_eq!(names(&first.rating), vec!["tag7", "tag8", "tag9"]);

        let second = &results[1];
        assert_eq!(names(&second.general), vec!["tag0", "tag2"]);
        assert_eq!(names(&second.rating), vec!["tag9", "tag8", "tag7"]);
    }

    #[test]
    fn test_top_tags_counts_and_order() {
        let (extractor, vocabulary) = small_fixture();
        let layout = *vocabulary.layout();
        let estimator = TagEstimator::with_vocabulary(&extractor, vocabulary);

        for k in 1..=6 {
            for result in estimator.estimate_top_tags(&images(2), k).unwrap() {
                for group in TagGroup::ALL {
                    let tags = result.group(group);
                    let expected = if group.is_ranked() {
                        k.min(layout.size(group))
                    } else {
                        layout.size(group)
                    };
                    assert_eq!(tags.len(), expected, "group {group}, k {k}");
                    assert!(tags
                        .windows(2)
                        .all(|w| w[0].probability >= w[1].probability));
                }
            }
        }
    }

    #[test]
    fn test_top_tags_rejects_zero() {
        let (extractor, vocabulary) = small_fixture();
        let estimator = TagEstimator::with_vocabulary(&extractor, vocabulary);
        let err = estimator.estimate_top_tags(&images(1), 0).unwrap_err();
        assert!(matches!(err, EstimateError::InvalidArgument(_)));
    }

    #[test]
    fn test_plausible_tags_filter_strictly() {
        let (extractor, vocabulary) = small_fixture();
        let estimator = TagEstimator::with_vocabulary(&extractor, vocabulary);

        let results = estimator.estimate_plausible_tags(&images(2), 0.25).unwrap();
        let second = &results[1];
        // 0.25 is not strictly greater than the threshold
        assert_eq!(names(&second.general), vec!["tag0", "tag2"]);
        assert_eq!(names(&second.character), vec!["tag4", "tag5"]);
        assert_eq!(names(&second.copyright), vec!["tag6"]);
        // rating passes through even below the threshold
        assert_eq!(names(&second.rating), vec!["tag9", "tag8", "tag7"]);

        let first = &results[0];
        assert!(first.copyright.is_empty());
    }

    #[test]
    fn test_plausible_is_filtered_top_all() {
        let (extractor, vocabulary) = small_fixture();
        let max = vocabulary.layout().max_group_size();
        let estimator = TagEstimator::with_vocabulary(&extractor, vocabulary);

        for threshold in [0.0, 0.1, 0.25, 0.5, 0.9, 1.0] {
            let plausible = estimator
                .estimate_plausible_tags(&images(2), threshold)
                .unwrap();
            let top = estimator.estimate_top_tags(&images(2), max).unwrap();

            for (p, t) in plausible.iter().zip(&top) {
                for group in TagGroup::ALL {
                    let expected: Vec<ScoredTag> = if group.is_ranked() {
                        t.group(group)
                            .iter()
                            .filter(|s| s.probability > threshold)
                            .cloned()
                            .collect()
                    } else {
                        t.group(group).to_vec()
                    };
                    assert_eq!(p.group(group), &expected[..]);
                }
            }
        }
    }

    #[test]
    fn test_plausible_rejects_out_of_range_threshold() {
        let (extractor, vocabulary) = small_fixture();
        let estimator = TagEstimator::with_vocabulary(&extractor, vocabulary);
        for threshold in [-0.1, 1.5, f32::NAN] {
            let err = estimator
                .estimate_plausible_tags(&images(1), threshold)
                .unwrap_err();
            assert!(matches!(err, EstimateError::InvalidArgument(_)));
        }
    }

    #[test]
    fn test_specific_tags_match_top_tags() {
        let (extractor, vocabulary) = small_fixture();
        let all_tags: Vec<String> = vocabulary.tags().to_vec();
        let estimator = TagEstimator::with_vocabulary(&extractor, vocabulary);

        let specific = estimator
            .estimate_specific_tags(&images(2), &all_tags)
            .unwrap();
        let top = estimator.estimate_top_tags(&images(2), 10).unwrap();

        for (s, t) in specific.iter().zip(&top) {
            assert_eq!(s.len(), all_tags.len());
            for (tag, p) in s {
                assert_eq!(t.probability(tag), Some(*p), "tag {tag}");
            }
        }
    }

    #[test]
    fn test_specific_tags_collapse_duplicates() {
        let (extractor, vocabulary) = small_fixture();
        let estimator = TagEstimator::with_vocabulary(&extractor, vocabulary);

        let result = estimator
            .estimate_specific_tags(&images(1), &["tag9", "tag1", "tag9"])
            .unwrap();
        assert_eq!(result[0].len(), 2);
        assert_eq!(result[0]["tag1"], 0.9);
        assert_eq!(result[0]["tag9"], 0.1);
    }

    #[test]
    fn test_specific_tags_unknown_tag() {
        let (extractor, vocabulary) = small_fixture();
        let estimator = TagEstimator::with_vocabulary(&extractor, vocabulary);

        let err = estimator
            .estimate_specific_tags(&images(1), &["tag1", "blue hair", "red eyes"])
            .unwrap_err();
        assert!(matches!(err, EstimateError::TagNotFound(ref t) if t == "blue hair"));
    }

    #[test]
    fn test_tag_operations_need_vocabulary() {
        let (extractor, _) = small_fixture();
        let estimator = TagEstimator::feature_only(&extractor);

        assert!(matches!(
            estimator.estimate_top_tags(&images(1), 3),
            Err(EstimateError::Configuration(_))
        ));
        assert!(matches!(
            estimator.estimate_plausible_tags(&images(1), 0.25),
            Err(EstimateError::Configuration(_))
        ));
        assert!(matches!(
            estimator.estimate_specific_tags(&images(1), &["tag0"]),
            Err(EstimateError::Configuration(_))
        ));
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let (extractor, vocabulary) = small_fixture();
        let estimator = TagEstimator::with_vocabulary(&extractor, vocabulary);
        assert!(matches!(
            estimator.estimate_top_tags(&[], 3),
            Err(EstimateError::EmptyBatch)
        ));
        assert!(matches!(
            estimator.extract_feature(&[]),
            Err(EstimateError::EmptyBatch)
        ));
        assert!(matches!(
            estimator.extract_binary_feature(&[]),
            Err(EstimateError::EmptyBatch)
        ));
        assert!(matches!(
            estimator.estimate_specific_tags(&[], &["tag0"]),
            Err(EstimateError::EmptyBatch)
        ));
        assert!(matches!(
            estimator.estimate_plausible_tags(&[], 0.25),
            Err(EstimateError::EmptyBatch)
        ));
    }

    #[test]
    fn test_probability_width_must_match_vocabulary() {
        let extractor =
            StaticExtractor::new().with_layer(Layer::Prob, Array2::<f32>::zeros((1, 5)));
        let estimator =
            TagEstimator::with_vocabulary(&extractor, vocab(GroupLayout::new(2, 1, 1, 2)));

        let err = estimator.estimate_top_tags(&images(1), 1).unwrap_err();
        assert!(matches!(err, EstimateError::ShapeMismatch { ref layer, .. } if layer == "prob"));
    }

    #[test]
    fn test_row_count_must_match_batch() {
        struct OneRow;
        impl FeatureExtractor for OneRow {
            fn extract(
                &self,
                _images: &[ImageTensor],
                _layer: Layer,
            ) -> Result<ArrayD<f32>, ExtractorError> {
                Ok(ArrayD::zeros(vec![1, 16]))
            }
        }

        let estimator = TagEstimator::feature_only(&OneRow);
        let err = estimator.extract_feature(&images(3)).unwrap_err();
        assert!(err.to_string().contains("3 rows"));
    }

    #[test]
    fn test_extractor_failure_propagates() {
        struct Broken;
        impl FeatureExtractor for Broken {
            fn extract(
                &self,
                _images: &[ImageTensor],
                _layer: Layer,
            ) -> Result<ArrayD<f32>, ExtractorError> {
                Err(ExtractorError::InvalidImage {
                    index: 1,
                    message: "expected 3 channels".into(),
                })
            }
        }

        let estimator = TagEstimator::with_vocabulary(&Broken, vocab(GroupLayout::new(1, 0, 0, 1)));
        let err = estimator.estimate_top_tags(&images(2), 1).unwrap_err();
        assert!(matches!(
            err,
            EstimateError::Extractor(ExtractorError::InvalidImage { index: 1, .. })
        ));
    }

    #[test]
    fn test_four_dimensional_output_is_flattened() {
        let mut prob = Array4::<f32>::zeros((1, 4, 1, 1));
        prob[[0, 1, 0, 0]] = 0.8;
        prob[[0, 3, 0, 0]] = 0.3;
        let extractor = StaticExtractor::new().with_layer(Layer::Prob, prob);
        let estimator =
            TagEstimator::with_vocabulary(&extractor, vocab(GroupLayout::new(2, 0, 0, 2)));

        let result = estimator.estimate_top_tags(&images(1), 1).unwrap();
        assert_eq!(result[0].general, vec![ScoredTag::new("tag1", 0.8)]);
        assert_eq!(names(&result[0].rating), vec!["tag3", "tag2"]);
    }

    #[test]
    fn test_estimation_is_idempotent() {
        let (extractor, vocabulary) = small_fixture();
        let estimator = TagEstimator::with_vocabulary(&extractor, vocabulary);
        let a = estimator.estimate_top_tags(&images(2), 3).unwrap();
        let b = estimator.estimate_top_tags(&images(2), 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_extract_feature_passes_through() {
        let embedding = array![[0.1_f32, -0.4, 2.0], [1.0, 0.0, 0.5]];
        let extractor = StaticExtractor::new().with_layer(Layer::Encode1, embedding.clone());
        let estimator = TagEstimator::feature_only(&extractor);

        let feature = estimator.extract_feature(&images(2)).unwrap();
        assert_eq!(feature, embedding);
    }

    #[test]
    fn test_binary_feature_packs_thresholded_rows() {
        let neuron = array![
            [0.9_f32, 0.1, 0.6, 0.0, 0.0, 0.0, 0.0, 0.7, 0.8, 0.5],
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.51],
        ];
        let extractor = StaticExtractor::new().with_layer(Layer::Encode1Neuron, neuron);
        let estimator = TagEstimator::feature_only(&extractor);

        let fingerprints = estimator.extract_binary_feature(&images(2)).unwrap();
        assert_eq!(fingerprints.len(), 2);
        assert_eq!(fingerprints[0].as_bytes(), &[0b1010_0001, 0b1000_0000]);
        assert_eq!(fingerprints[1].as_bytes(), &[0b0000_0000, 0b0100_0000]);
        assert_eq!(fingerprints[0].width(), 10);
    }

    #[test]
    fn test_shared_extractor_across_estimators() {
        let (extractor, vocabulary) = small_fixture();
        let tagger = TagEstimator::with_vocabulary(&extractor, vocabulary);
        let features = TagEstimator::feature_only(&extractor);

        assert!(tagger.estimate_top_tags(&images(1), 1).is_ok());
        assert!(matches!(
            features.extract_feature(&images(1)),
            Err(EstimateError::Extractor(ExtractorError::MissingLayer { .. }))
        ));
    }
}
