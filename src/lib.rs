//! melgen: data preparation and batching for CTC speech recognition training.
//!
//! The pipeline reads a labeled corpus manifest, augments and featurizes each
//! utterance once, and serves fixed-size zero-padded batches whose true
//! (unpadded) lengths travel with them — the lengths a CTC loss needs to mask
//! padding out of the alignment window.
//!
//! # Architecture
//!
//! - [`manifest`]: tabular corpus loading and typed partition/duration filtering
//! - [`audio`]: WAV segments, loudness normalization, linear spectrograms
//! - [`augment`]: JSON-configured randomized signal transforms
//! - [`vocab`] / [`normalizer`]: transcript tokenization and feature statistics
//! - [`featurizer`]: per-utterance processing composed from the above
//! - [`generator`]: the sequence batcher, the core of the crate
//! - [`ctc`]: true-length adjustment through downsampling, greedy decoding
//! - [`metrics`]: edit-distance scoring for decoded output
//!
//! # Quick start
//!
//! ```ignore
//! use melgen::generator::{DataGenerator, GeneratorConfig};
//! use melgen::manifest::Partition;
//!
//! let config = GeneratorConfig::new(
//!     "corpus.tsv",
//!     Partition::Train,
//!     16,
//!     "vocab.txt",
//!     "mean_std.json",
//! );
//! let mut generator = DataGenerator::from_manifest(&config)?;
//!
//! for epoch in 0..epochs {
//!     for index in 0..generator.num_batches() {
//!         let batch = generator.batch(index)?;
//!         // feed (features, label, true_length) triples to the trainer
//!     }
//!     generator.on_epoch_end();
//! }
//! ```

pub mod audio;
pub mod augment;
pub mod ctc;
pub mod error;
pub mod featurizer;
pub mod generator;
pub mod manifest;
pub mod metrics;
pub mod normalizer;
pub mod types;
pub mod vocab;
