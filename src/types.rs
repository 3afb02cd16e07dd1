//! Core types shared across the pipeline.

use ndarray::{Array1, Array2};

/// Transcript representation attached to an utterance.
///
/// Selected once by the `keep_transcription_text` generator flag: training
/// wants token indices, evaluation harnesses sometimes want the raw text.
#[derive(Clone, Debug, PartialEq)]
pub enum Label {
    /// Vocabulary indices of the tokenized transcript.
    TokenIds(Vec<usize>),
    /// Raw transcription text, kept when tokenization is bypassed.
    RawText(String),
}

/// One featurized utterance: a `[F, T]` feature matrix plus its label.
///
/// `F` is the feature dimension, fixed per generator; `T` is the number of
/// time frames, which varies with the utterance duration.
#[derive(Clone, Debug)]
pub struct ProcessedUtterance {
    /// Normalized features, shape `[F, T]`.
    pub features: Array2<f32>,
    /// Transcript representation.
    pub label: Label,
}

impl ProcessedUtterance {
    /// Feature dimension `F`.
    pub fn feature_dim(&self) -> usize {
        self.features.shape()[0]
    }

    /// Time dimension `T`.
    pub fn time_steps(&self) -> usize {
        self.features.shape()[1]
    }
}

/// One utterance inside a padded batch.
///
/// Columns `..true_length` hold the original features exactly; columns
/// `true_length..` are zero fill. The true length travels with the batch
/// because the alignment loss must not count padding.
#[derive(Clone, Debug)]
pub struct PaddedUtterance {
    /// Zero-padded features, shape `[F, target_width]`.
    pub features: Array2<f32>,
    /// Transcript representation.
    pub label: Label,
    /// Time dimension before padding.
    pub true_length: usize,
}

impl PaddedUtterance {
    /// Flattened 1-D copy of the padded features, for consumers that take
    /// flat feature vectors.
    pub fn flat_features(&self) -> Array1<f32> {
        Array1::from_iter(self.features.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn flat_features_is_row_major() {
        let padded = PaddedUtterance {
            features: array![[1.0, 2.0], [3.0, 4.0]],
            label: Label::TokenIds(vec![0]),
            true_length: 2,
        };

        let flat = padded.flat_features();

        assert_eq!(flat.to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
    }
}
