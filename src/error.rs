//! Error types for melgen organized by pipeline stage.

use ndarray_stats::errors::MinMaxError;
use thiserror::Error;

/// Pipeline error variants organized by stage.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration defect, caught at construction or batch-fetch time
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Corpus or signal defect in the data itself
    #[error(transparent)]
    Data(#[from] DataError),

    /// Internal invariant violated (indicates a bug, not bad input)
    #[error(transparent)]
    Invariant(#[from] InvariantError),
}

/// Configuration errors (generator parameters, framing, augmentation config).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Duration filter bounds are inconsistent
    #[error("invalid duration bounds: min {min}s, max {max}s")]
    InvalidDurationBounds { min: f64, max: f64 },

    /// Batch size must be positive
    #[error("batch size must be positive")]
    ZeroBatchSize,

    /// No records survived partition/duration filtering
    #[error("no {partition} records within [{min}s, {max}s] after filtering")]
    EmptyPartition {
        partition: String,
        min: f64,
        max: f64,
    },

    /// Generator constructed over zero utterances
    #[error("dataset contains no utterances")]
    EmptyDataset,

    /// Explicit padding target below the batch's natural maximum
    #[error("padding_to {padding_to} is smaller than the longest utterance in the batch ({max_length} frames)")]
    PaddingTooSmall { padding_to: usize, max_length: usize },

    /// Augmentation config names an unsupported augmentor
    #[error("unknown augmentor type: {0}")]
    UnknownAugmentor(String),

    /// Augmentor probability outside [0, 1]
    #[error("augmentor probability {0} is outside [0, 1]")]
    InvalidProbability(f64),

    /// Augmentor parameter range with min above max
    #[error("invalid augmentor range: min {min} > max {max}")]
    InvalidAugmentorRange { min: f32, max: f32 },

    /// Time downsampling factor must be positive
    #[error("downsample factor must be positive")]
    ZeroDownsampleFactor,

    /// Frame sizes must be positive
    #[error("frame sizes must be positive: stride {stride_ms}ms, window {window_ms}ms")]
    NonPositiveFraming { stride_ms: f32, window_ms: f32 },

    /// Frame stride larger than the analysis window
    #[error("stride {stride_ms}ms exceeds window {window_ms}ms")]
    StrideExceedsWindow { stride_ms: f32, window_ms: f32 },

    /// Frame sizes round down to zero samples at this rate
    #[error(
        "framing of stride {stride_ms}ms / window {window_ms}ms is below one sample at {sample_rate}Hz"
    )]
    FramingBelowOneSample {
        stride_ms: f32,
        window_ms: f32,
        sample_rate: u32,
    },

    /// Frequency cutoff above what the sample rate can represent
    #[error("max_freq {max_freq}Hz exceeds the Nyquist frequency {nyquist}Hz")]
    MaxFreqAboveNyquist { max_freq: f32, nyquist: f32 },

    /// Vocabulary file contained no tokens
    #[error("vocabulary file contains no tokens")]
    EmptyVocabulary,

    /// Normalizer statistics requested over an empty sample
    #[error("cannot compute normalizer statistics from an empty sample")]
    EmptyNormalizerSample,

    /// Malformed JSON in a config or stats file
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Corpus and signal errors.
#[derive(Debug, Error)]
pub enum DataError {
    /// Manifest row that cannot be parsed
    #[error("malformed manifest row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    /// Manifest header missing a required column
    #[error("manifest is missing column: {0}")]
    MissingColumn(String),

    /// Partition tag not one of train/dev/test
    #[error("unknown partition tag: {0:?}")]
    UnknownPartition(String),

    /// Transcript token absent from the vocabulary
    #[error("token not in vocabulary: {token:?}")]
    UnknownToken { token: String },

    /// Channel count validation failed
    #[error("invalid channel count: expected mono or stereo, got {0} channels")]
    InvalidChannels(u16),

    /// WAV header declares a zero sample rate
    #[error("audio has a zero sample rate")]
    ZeroSampleRate,

    /// Loudness normalization requested on an all-zero signal
    #[error("cannot dB-normalize a silent segment")]
    SilentSegment,

    /// Audio shorter than a single analysis window
    #[error("segment of {samples} samples is shorter than one {window}-sample window")]
    SegmentTooShort { samples: usize, window: usize },

    /// Normalizer statistics do not match the feature dimension
    #[error("normalizer has {expected} feature bins but features have {got}")]
    NormalizerShape { expected: usize, got: usize },

    /// Error-rate metric against an empty reference
    #[error("error rate is undefined for an empty reference")]
    EmptyReference,

    /// IO error reading a manifest, vocabulary, or audio source
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// WAV file format error
    #[error(transparent)]
    Hound(#[from] hound::Error),
}

/// Invariant violations. These indicate a bug in the caller or in melgen.
#[derive(Debug, Error)]
pub enum InvariantError {
    /// Batch index at or past the floor batch count
    #[error("batch index {index} out of range (num_batches {num_batches})")]
    BatchOutOfRange { index: usize, num_batches: usize },

    /// Padding requested over an empty slice
    #[error("cannot pad an empty batch slice")]
    EmptyBatch,

    /// Utterances in one dataset disagree on the feature dimension
    #[error("feature dimension mismatch: expected {expected}, got {got}")]
    FeatureDimMismatch { expected: usize, got: usize },

    /// ndarray-stats argmax error (empty frame or undefined ordering)
    #[error(transparent)]
    MinMax(#[from] MinMaxError),
}

/// Result type alias for melgen operations.
pub type Result<T> = std::result::Result<T, Error>;

// Nested From implementations for automatic error conversion chains

// std::io::Error → DataError → Error
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Data(DataError::Io(e))
    }
}

// hound::Error → DataError → Error
impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        Error::Data(DataError::Hound(e))
    }
}

// serde_json::Error → ConfigError → Error
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(ConfigError::Json(e))
    }
}

// MinMaxError → InvariantError → Error
impl From<MinMaxError> for Error {
    fn from(e: MinMaxError) -> Self {
        Error::Invariant(InvariantError::MinMax(e))
    }
}
