//! The data generator: featurize a corpus once, then serve padded batches.
//!
//! Featurization happens entirely at construction, so `batch()` does no I/O.
//! The only cross-call mutable state is the dataset order and the seeded
//! shuffle source; both sit behind `&mut self` on [`DataGenerator::on_epoch_end`],
//! which makes the epoch-end reshuffle a barrier no in-flight batch fetch can
//! interleave with.

use crate::audio::{SpecgramType, SpectrogramConfig};
use crate::augment::AugmentationPipeline;
use crate::error::{ConfigError, InvariantError, Result};
use crate::featurizer::SpeechFeaturizer;
use crate::manifest::{Partition, filter_records, read_manifest};
use crate::normalizer::FeatureNormalizer;
use crate::types::{PaddedUtterance, ProcessedUtterance};
use crate::vocab::{VocabType, Vocabulary};
use ndarray::{Array2, s};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::PathBuf;

/// Construction parameters for [`DataGenerator::from_manifest`].
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// Corpus manifest path (tab-separated, with header).
    pub manifest_path: PathBuf,
    /// Partition to serve.
    pub partition: Partition,
    /// Utterances per batch. Must be positive.
    pub batch_size: usize,
    /// Vocabulary file path.
    pub vocab_path: PathBuf,
    /// Transcript column and tokenization scheme.
    pub vocab_type: VocabType,
    /// Precomputed mean/stddev statistics path.
    pub mean_std_path: PathBuf,
    /// Augmentation pipeline config, a JSON array. `"[]"` disables.
    pub augmentation_config: String,
    /// Discard records longer than this many seconds.
    pub max_duration: f64,
    /// Discard records shorter than this many seconds.
    pub min_duration: f64,
    /// Frame stride in milliseconds.
    pub stride_ms: f32,
    /// Analysis window in milliseconds.
    pub window_ms: f32,
    /// Optional frequency cutoff for linear spectrograms.
    pub max_freq: Option<f32>,
    /// Spectrogram feature type.
    pub specgram_type: SpecgramType,
    /// Normalize loudness to −20 dBFS before spectral extraction.
    pub use_db_normalization: bool,
    /// Master seed for augmentation and epoch shuffling.
    pub random_seed: u64,
    /// Reshuffle the dataset at each epoch end.
    pub shuffle: bool,
    /// Pass raw transcription text through instead of token indices.
    pub keep_transcription_text: bool,
}

impl GeneratorConfig {
    /// Config with the conventional defaults: unbounded durations, 10/20ms
    /// framing, dB normalization on, shuffling on, tokenized labels.
    pub fn new(
        manifest_path: impl Into<PathBuf>,
        partition: Partition,
        batch_size: usize,
        vocab_path: impl Into<PathBuf>,
        mean_std_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            partition,
            batch_size,
            vocab_path: vocab_path.into(),
            vocab_type: VocabType::Han,
            mean_std_path: mean_std_path.into(),
            augmentation_config: "[]".to_string(),
            max_duration: f64::INFINITY,
            min_duration: 0.0,
            stride_ms: 10.0,
            window_ms: 20.0,
            max_freq: None,
            specgram_type: SpecgramType::Linear,
            use_db_normalization: true,
            random_seed: 0,
            shuffle: true,
            keep_transcription_text: false,
        }
    }
}

/// Serves fixed-size, zero-padded batches over a featurized corpus.
///
/// Batch `i` covers dataset indices `[i * batch_size, (i+1) * batch_size)`.
/// The final partial batch, when the dataset size is not divisible by the
/// batch size, is dropped: [`DataGenerator::num_batches`] is the floor
/// division and indexing past it is an invariant violation.
pub struct DataGenerator {
    data: Vec<ProcessedUtterance>,
    feature_dim: usize,
    batch_size: usize,
    rng: StdRng,
    shuffle: bool,
}

impl DataGenerator {
    /// Build a generator by reading, filtering, and featurizing a manifest.
    ///
    /// Every surviving record is processed exactly once here; batches are
    /// cut from the in-memory dataset afterwards.
    ///
    /// # Errors
    ///
    /// Fails fast on invalid duration bounds or batch size, an empty
    /// post-filter dataset, and any per-record featurization failure.
    /// Individual record failures are never skipped: silently dropping
    /// utterances would bias the dataset without signal.
    pub fn from_manifest(config: &GeneratorConfig) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize.into());
        }

        if config.min_duration < 0.0 || config.max_duration < config.min_duration {
            return Err(ConfigError::InvalidDurationBounds {
                min: config.min_duration,
                max: config.max_duration,
            }
            .into());
        }

        let records = read_manifest(&config.manifest_path, config.vocab_type)?;
        let records = filter_records(
            records,
            config.partition,
            config.min_duration,
            config.max_duration,
        );

        if records.is_empty() {
            return Err(ConfigError::EmptyPartition {
                partition: config.partition.to_string(),
                min: config.min_duration,
                max: config.max_duration,
            }
            .into());
        }

        let vocabulary = Vocabulary::from_file(&config.vocab_path)?;
        let normalizer = FeatureNormalizer::from_file(&config.mean_std_path)?;
        let augmentation =
            AugmentationPipeline::from_json(&config.augmentation_config, config.random_seed)?;
        let spectrogram = SpectrogramConfig {
            stride_ms: config.stride_ms,
            window_ms: config.window_ms,
            max_freq: config.max_freq,
            specgram_type: config.specgram_type,
        };

        let mut featurizer = SpeechFeaturizer::new(
            augmentation,
            spectrogram,
            normalizer,
            vocabulary,
            config.vocab_type,
            config.use_db_normalization,
            config.keep_transcription_text,
        );

        let mut data = Vec::with_capacity(records.len());
        for record in &records {
            let utterance = featurizer.process(&record.src, &record.transcript)?;
            data.push(utterance);
        }

        tracing::info!(
            utterances = data.len(),
            partition = %config.partition,
            "featurized corpus"
        );

        Self::from_utterances(data, config.batch_size, config.random_seed, config.shuffle)
    }

    /// Build a generator over already-featurized utterances.
    ///
    /// # Errors
    ///
    /// Fails for a zero batch size or an empty dataset.
    pub fn from_utterances(
        data: Vec<ProcessedUtterance>,
        batch_size: usize,
        seed: u64,
        shuffle: bool,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize.into());
        }

        let feature_dim = match data.first() {
            Some(utterance) => utterance.feature_dim(),
            None => return Err(ConfigError::EmptyDataset.into()),
        };

        Ok(Self {
            data,
            feature_dim,
            batch_size,
            rng: StdRng::seed_from_u64(seed),
            shuffle,
        })
    }

    /// Number of utterances in the dataset.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Feature dimension `F` shared by every utterance.
    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of full batches: `len / batch_size`, floor. Remainder
    /// utterances are never emitted.
    pub fn num_batches(&self) -> usize {
        self.data.len() / self.batch_size
    }

    /// The utterances in their current epoch order.
    pub fn utterances(&self) -> &[ProcessedUtterance] {
        &self.data
    }

    /// Fetch batch `index`, padded to the batch's natural maximum length.
    pub fn batch(&self, index: usize) -> Result<Vec<PaddedUtterance>> {
        self.batch_with(index, None)
    }

    /// Fetch batch `index`, padded to `padding_to` if given.
    ///
    /// # Errors
    ///
    /// `padding_to` below the batch's natural maximum is a configuration
    /// error and produces no partial output. An index at or past
    /// [`Self::num_batches`] is an invariant violation: the caller is asking
    /// for a batch the truncation rule says does not exist.
    pub fn batch_with(
        &self,
        index: usize,
        padding_to: Option<usize>,
    ) -> Result<Vec<PaddedUtterance>> {
        let num_batches = self.num_batches();
        if index >= num_batches {
            return Err(InvariantError::BatchOutOfRange { index, num_batches }.into());
        }

        let start = index * self.batch_size;
        let slice = &self.data[start..start + self.batch_size];

        pad_batch(slice, padding_to, self.feature_dim)
    }

    /// Epoch-end hook: reshuffle the dataset order if shuffling is enabled.
    ///
    /// Uses the generator's dedicated random source, seeded once at
    /// construction, so successive epochs see different but reproducible
    /// orders for a fixed master seed.
    pub fn on_epoch_end(&mut self) {
        if self.shuffle {
            self.data.shuffle(&mut self.rng);
            tracing::debug!(utterances = self.data.len(), "reshuffled dataset");
        }
    }
}

/// Pad a batch slice to a common time dimension, left-aligned, zero-filled.
///
/// Each padded utterance carries its pre-padding length; the alignment loss
/// downstream needs it to mask out the zero fill.
fn pad_batch(
    batch: &[ProcessedUtterance],
    padding_to: Option<usize>,
    feature_dim: usize,
) -> Result<Vec<PaddedUtterance>> {
    let max_length = batch
        .iter()
        .map(ProcessedUtterance::time_steps)
        .max()
        .ok_or(InvariantError::EmptyBatch)?;

    let target = match padding_to {
        Some(padding_to) if padding_to < max_length => {
            return Err(ConfigError::PaddingTooSmall {
                padding_to,
                max_length,
            }
            .into());
        }
        Some(padding_to) => padding_to,
        None => max_length,
    };

    batch
        .iter()
        .map(|utterance| {
            if utterance.feature_dim() != feature_dim {
                return Err(InvariantError::FeatureDimMismatch {
                    expected: feature_dim,
                    got: utterance.feature_dim(),
                }
                .into());
            }

            let true_length = utterance.time_steps();
            let mut features = Array2::<f32>::zeros((feature_dim, target));
            features
                .slice_mut(s![.., ..true_length])
                .assign(&utterance.features);

            Ok(PaddedUtterance {
                features,
                label: utterance.label.clone(),
                true_length,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::Label;
    use ndarray::Array2;

    fn utterance(time_steps: usize, fill: f32) -> ProcessedUtterance {
        ProcessedUtterance {
            features: Array2::from_elem((3, time_steps), fill),
            label: Label::TokenIds(vec![time_steps]),
        }
    }

    fn generator(lengths: &[usize], batch_size: usize, seed: u64, shuffle: bool) -> DataGenerator {
        let data = lengths
            .iter()
            .enumerate()
            .map(|(i, &t)| utterance(t, i as f32 + 1.0))
            .collect();
        DataGenerator::from_utterances(data, batch_size, seed, shuffle).unwrap()
    }

    #[test]
    fn batch_count_is_floor_division() {
        let generator = generator(&[5, 6, 7, 8, 9, 10, 11], 3, 0, false);

        assert_eq!(generator.num_batches(), 2);
    }

    #[test]
    fn remainder_is_never_emitted() {
        let generator = generator(&[5, 6, 7, 8, 9, 10, 11], 3, 0, false);

        let result = generator.batch(2);

        assert!(matches!(
            result,
            Err(Error::Invariant(InvariantError::BatchOutOfRange {
                index: 2,
                num_batches: 2
            }))
        ));
    }

    #[test]
    fn padding_round_trip() {
        let generator = generator(&[4, 7, 5], 3, 0, false);

        let batch = generator.batch(0).unwrap();

        assert_eq!(batch.len(), 3);
        for (padded, original) in batch.iter().zip(generator.utterances()) {
            assert_eq!(padded.features.shape(), &[3, 7]);
            assert_eq!(padded.true_length, original.time_steps());

            // Left-aligned region equals the original exactly
            let region = padded.features.slice(s![.., ..padded.true_length]);
            assert_eq!(region, original.features.view());

            // Everything past the true length is zero fill
            let fill = padded.features.slice(s![.., padded.true_length..]);
            assert!(fill.iter().all(|&x| x == 0.0));
        }
    }

    #[test]
    fn single_item_batch_pads_to_itself() {
        let generator = generator(&[9], 1, 0, false);

        let batch = generator.batch(0).unwrap();

        assert_eq!(batch[0].features.shape(), &[3, 9]);
        assert_eq!(batch[0].true_length, 9);
    }

    #[test]
    fn explicit_padding_to_widens_the_batch() {
        let generator = generator(&[4, 7], 2, 0, false);

        let batch = generator.batch_with(0, Some(12)).unwrap();

        assert_eq!(batch[0].features.shape(), &[3, 12]);
        assert_eq!(batch[1].features.shape(), &[3, 12]);
        assert_eq!(batch[1].true_length, 7);
    }

    #[test]
    fn padding_to_below_natural_max_fails() {
        let generator = generator(&[4, 7], 2, 0, false);

        let result = generator.batch_with(0, Some(6));

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::PaddingTooSmall {
                padding_to: 6,
                max_length: 7
            }))
        ));
    }

    #[test]
    fn labels_travel_with_the_batch() {
        let generator = generator(&[4, 7], 2, 0, false);

        let batch = generator.batch(0).unwrap();

        assert_eq!(batch[0].label, Label::TokenIds(vec![4]));
        assert_eq!(batch[1].label, Label::TokenIds(vec![7]));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let result = DataGenerator::from_utterances(vec![utterance(4, 1.0)], 0, 0, false);

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::ZeroBatchSize))
        ));
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let result = DataGenerator::from_utterances(Vec::new(), 2, 0, false);

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::EmptyDataset))
        ));
    }

    #[test]
    fn mixed_feature_dims_fail_at_batch_time() {
        let data = vec![
            utterance(4, 1.0),
            ProcessedUtterance {
                features: Array2::zeros((5, 4)),
                label: Label::TokenIds(vec![]),
            },
        ];
        let generator = DataGenerator::from_utterances(data, 2, 0, false).unwrap();

        let result = generator.batch(0);

        assert!(matches!(
            result,
            Err(Error::Invariant(InvariantError::FeatureDimMismatch {
                expected: 3,
                got: 5
            }))
        ));
    }

    #[test]
    fn shuffle_is_deterministic_per_seed() {
        let lengths = [3, 4, 5, 6, 7, 8, 9, 10];
        let mut a = generator(&lengths, 2, 99, true);
        let mut b = generator(&lengths, 2, 99, true);

        for _ in 0..5 {
            a.on_epoch_end();
            b.on_epoch_end();

            let order_a: Vec<usize> =
                a.utterances().iter().map(|u| u.time_steps()).collect();
            let order_b: Vec<usize> =
                b.utterances().iter().map(|u| u.time_steps()).collect();
            assert_eq!(order_a, order_b);
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let lengths = [3, 4, 5, 6, 7, 8, 9, 10];
        let mut a = generator(&lengths, 2, 1, true);
        let mut b = generator(&lengths, 2, 2, true);

        a.on_epoch_end();
        b.on_epoch_end();

        let order_a: Vec<usize> = a.utterances().iter().map(|u| u.time_steps()).collect();
        let order_b: Vec<usize> = b.utterances().iter().map(|u| u.time_steps()).collect();
        assert_ne!(order_a, order_b);
    }

    #[test]
    fn shuffle_disabled_keeps_epoch_order() {
        let lengths = [3, 4, 5, 6];
        let mut generator = generator(&lengths, 2, 7, false);

        generator.on_epoch_end();

        let order: Vec<usize> = generator
            .utterances()
            .iter()
            .map(|u| u.time_steps())
            .collect();
        assert_eq!(order, lengths);
    }
}
