//! Utterance processing: augment, featurize, normalize, encode.

use crate::audio::{SpecgramType, SpectrogramConfig, SpeechSegment, TARGET_DB, linear_spectrogram};
use crate::augment::AugmentationPipeline;
use crate::error::Result;
use crate::normalizer::FeatureNormalizer;
use crate::types::{Label, ProcessedUtterance};
use crate::vocab::{VocabType, Vocabulary};
use std::path::Path;

/// Composes augmentation, loudness normalization, spectral extraction,
/// mean/stddev normalization, and label encoding for one utterance.
pub struct SpeechFeaturizer {
    augmentation: AugmentationPipeline,
    spectrogram: SpectrogramConfig,
    normalizer: FeatureNormalizer,
    vocabulary: Vocabulary,
    vocab_type: VocabType,
    use_db_normalization: bool,
    keep_transcription_text: bool,
}

impl SpeechFeaturizer {
    pub fn new(
        augmentation: AugmentationPipeline,
        spectrogram: SpectrogramConfig,
        normalizer: FeatureNormalizer,
        vocabulary: Vocabulary,
        vocab_type: VocabType,
        use_db_normalization: bool,
        keep_transcription_text: bool,
    ) -> Self {
        Self {
            augmentation,
            spectrogram,
            normalizer,
            vocabulary,
            vocab_type,
            use_db_normalization,
            keep_transcription_text,
        }
    }

    /// Load, augment, featurize, and normalize one (audio, transcript) pair.
    ///
    /// Takes `&mut self` because augmentation draws from the pipeline's
    /// seeded random source; no other state is mutated.
    ///
    /// # Errors
    ///
    /// Returns an error for an unreadable or invalid audio source, or a
    /// transcript containing tokens outside the vocabulary.
    pub fn process(&mut self, path: impl AsRef<Path>, transcript: &str) -> Result<ProcessedUtterance> {
        let mut segment = SpeechSegment::from_file(path, transcript)?;

        self.augmentation.transform(&mut segment);

        if self.use_db_normalization {
            segment.normalize_to_db(TARGET_DB)?;
        }

        let features = match self.spectrogram.specgram_type {
            SpecgramType::Linear => {
                linear_spectrogram(segment.samples(), segment.sample_rate(), &self.spectrogram)?
            }
        };
        let features = self.normalizer.apply(&features)?;

        let label = if self.keep_transcription_text {
            Label::RawText(transcript.to_string())
        } else {
            Label::TokenIds(
                self.vocabulary
                    .tokenize(transcript, self.vocab_type.separator())?,
            )
        };

        Ok(ProcessedUtterance { features, label })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DataError, Error};
    use hound::{SampleFormat, WavWriter};
    use std::f32::consts::PI;
    use std::path::PathBuf;

    fn write_sine_wav(name: &str, duration_sec: f32) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        let n = (duration_sec * 16000.0) as usize;
        for i in 0..n {
            let sample = 0.3 * (2.0 * PI * 440.0 * i as f32 / 16000.0).sin();
            writer.write_sample((sample * 32767.0) as i16).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    fn featurizer(keep_text: bool) -> SpeechFeaturizer {
        // 20ms window at 16kHz → 161 bins
        let normalizer = FeatureNormalizer::new(vec![0.0; 161], vec![1.0; 161]).unwrap();
        let vocabulary = Vocabulary::from_tokens(["a", "b", "c", "_"]).unwrap();

        SpeechFeaturizer::new(
            AugmentationPipeline::empty(0),
            SpectrogramConfig::default(),
            normalizer,
            vocabulary,
            VocabType::Han,
            true,
            keep_text,
        )
    }

    #[test]
    fn processes_one_utterance() {
        let path = write_sine_wav("melgen_feat.wav", 0.5);
        let mut featurizer = featurizer(false);

        let utterance = featurizer.process(&path, "cab").unwrap();

        assert_eq!(utterance.feature_dim(), 161);
        assert_eq!(utterance.time_steps(), 49);
        assert_eq!(utterance.label, Label::TokenIds(vec![2, 0, 1]));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn keep_text_bypasses_tokenization() {
        let path = write_sine_wav("melgen_feat_text.wav", 0.5);
        let mut featurizer = featurizer(true);

        // "xyz" is outside the vocabulary, but raw text passes through
        let utterance = featurizer.process(&path, "xyz").unwrap();

        assert_eq!(utterance.label, Label::RawText("xyz".to_string()));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn out_of_vocabulary_token_fails() {
        let path = write_sine_wav("melgen_feat_oov.wav", 0.5);
        let mut featurizer = featurizer(false);

        let result = featurizer.process(&path, "axe");

        assert!(matches!(
            result,
            Err(Error::Data(DataError::UnknownToken { token })) if token == "x"
        ));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_audio_file_fails() {
        let mut featurizer = featurizer(false);

        let result = featurizer.process("/nonexistent/melgen.wav", "ab");

        assert!(result.is_err());
    }
}
