//! Speech segments: WAV loading, loudness normalization, spectral features.

use crate::error::{ConfigError, DataError, Result};
use hound::{SampleFormat, WavReader};
use ndarray::Array2;
use std::f32::consts::PI;
use std::path::Path;

/// Loudness target applied before spectral extraction (dBFS).
pub const TARGET_DB: f32 = -20.0;

/// Floor applied before log compression of spectrogram power.
const LOG_EPS: f32 = 1e-10;

/// One audio recording paired with its transcript.
///
/// Samples are mono f32 at whatever rate the source file carries; framing
/// parameters are specified in milliseconds, so no fixed rate is required.
#[derive(Clone, Debug)]
pub struct SpeechSegment {
    samples: Vec<f32>,
    sample_rate: u32,
    transcript: String,
}

impl SpeechSegment {
    /// Create a segment from raw samples.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample rate is zero.
    pub fn new(samples: Vec<f32>, sample_rate: u32, transcript: impl Into<String>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(DataError::ZeroSampleRate.into());
        }

        Ok(Self {
            samples,
            sample_rate,
            transcript: transcript.into(),
        })
    }

    /// Load a segment from a WAV file.
    ///
    /// Float and 16-bit integer formats are accepted; stereo is downmixed to
    /// mono by averaging.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the channel layout is
    /// not mono or stereo, or the declared sample rate is zero.
    pub fn from_file(path: impl AsRef<Path>, transcript: &str) -> Result<Self> {
        let mut reader = WavReader::open(path)?;
        let spec = reader.spec();

        let mut samples: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader.samples::<f32>().collect::<hound::Result<_>>()?,
            SampleFormat::Int => reader
                .samples::<i16>()
                .map(|s| s.map(|s| s as f32 / i16::MAX as f32))
                .collect::<hound::Result<_>>()?,
        };

        if spec.channels == 0 || spec.channels > 2 {
            return Err(DataError::InvalidChannels(spec.channels).into());
        }

        if spec.channels == 2 {
            samples = samples
                .chunks(2)
                .map(|chunk| chunk.iter().sum::<f32>() / 2.0)
                .collect();
        }

        Self::new(samples, spec.sample_rate, transcript)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Mutable sample access for in-place augmentation.
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Root-mean-square level in dBFS. Silence yields negative infinity.
    pub fn rms_db(&self) -> f32 {
        if self.samples.is_empty() {
            return f32::NEG_INFINITY;
        }

        let mean_square =
            self.samples.iter().map(|&s| s * s).sum::<f32>() / self.samples.len() as f32;
        10.0 * mean_square.log10()
    }

    /// Apply a gain in decibels.
    pub fn gain_db(&mut self, gain: f32) {
        let scale = 10f32.powf(gain / 20.0);
        for sample in &mut self.samples {
            *sample *= scale;
        }
    }

    /// Scale the signal so its RMS level matches `target_db`.
    ///
    /// # Errors
    ///
    /// Returns an error for an all-zero signal, whose level is undefined.
    pub fn normalize_to_db(&mut self, target_db: f32) -> Result<()> {
        let rms = self.rms_db();
        if !rms.is_finite() {
            return Err(DataError::SilentSegment.into());
        }

        self.gain_db(target_db - rms);
        Ok(())
    }
}

/// Spectrogram feature type. Only the linear (FFT-bin) variant exists today.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpecgramType {
    #[default]
    Linear,
}

/// Framing and cutoff parameters for spectral extraction.
#[derive(Clone, Debug)]
pub struct SpectrogramConfig {
    /// Frame stride in milliseconds.
    pub stride_ms: f32,
    /// Analysis window in milliseconds.
    pub window_ms: f32,
    /// Keep only FFT bins at or below this frequency, if set.
    pub max_freq: Option<f32>,
    /// Feature type.
    pub specgram_type: SpecgramType,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            stride_ms: 10.0,
            window_ms: 20.0,
            max_freq: None,
            specgram_type: SpecgramType::Linear,
        }
    }
}

impl SpectrogramConfig {
    /// Check framing parameters against a concrete sample rate.
    pub fn validate(&self, sample_rate: u32) -> Result<()> {
        if self.stride_ms <= 0.0 || self.window_ms <= 0.0 {
            return Err(ConfigError::NonPositiveFraming {
                stride_ms: self.stride_ms,
                window_ms: self.window_ms,
            }
            .into());
        }

        if self.stride_ms > self.window_ms {
            return Err(ConfigError::StrideExceedsWindow {
                stride_ms: self.stride_ms,
                window_ms: self.window_ms,
            }
            .into());
        }

        if let Some(max_freq) = self.max_freq {
            let nyquist = sample_rate as f32 / 2.0;
            if max_freq > nyquist {
                return Err(ConfigError::MaxFreqAboveNyquist { max_freq, nyquist }.into());
            }
        }

        // The ms -> samples conversion truncates, so a sub-sample stride or
        // window would leave the framing loop with a zero hop or window.
        if self.hop_samples(sample_rate) == 0 || self.window_samples(sample_rate) == 0 {
            return Err(ConfigError::FramingBelowOneSample {
                stride_ms: self.stride_ms,
                window_ms: self.window_ms,
                sample_rate,
            }
            .into());
        }

        Ok(())
    }

    fn hop_samples(&self, sample_rate: u32) -> usize {
        (self.stride_ms / 1000.0 * sample_rate as f32) as usize
    }

    fn window_samples(&self, sample_rate: u32) -> usize {
        (self.window_ms / 1000.0 * sample_rate as f32) as usize
    }
}

/// Extract a log-power linear spectrogram, shape `[F, T]`.
///
/// `F` is the number of FFT bins kept after the optional `max_freq` cutoff;
/// `T = (samples - window) / hop + 1`.
///
/// # Errors
///
/// Returns an error for invalid framing parameters or a signal shorter than
/// one analysis window.
pub fn linear_spectrogram(
    samples: &[f32],
    sample_rate: u32,
    config: &SpectrogramConfig,
) -> Result<Array2<f32>> {
    config.validate(sample_rate)?;

    let hop = config.hop_samples(sample_rate);
    let win = config.window_samples(sample_rate);

    if samples.len() < win {
        return Err(DataError::SegmentTooShort {
            samples: samples.len(),
            window: win,
        }
        .into());
    }

    let mut spectrogram = stft(samples, win, hop);

    if let Some(max_freq) = config.max_freq {
        // Bin k covers k * rate / n_fft Hz; keep bins at or below the cutoff.
        let bin_width = sample_rate as f32 / win as f32;
        let keep = ((max_freq / bin_width) as usize + 1).min(spectrogram.shape()[0]);
        spectrogram = spectrogram.slice_move(ndarray::s![..keep, ..]);
    }

    Ok(spectrogram.mapv(|x| x.max(LOG_EPS).ln()))
}

/// Create a Hann window.
fn hann_window(window_length: usize) -> Vec<f32> {
    (0..window_length)
        .map(|i| 0.5 - 0.5 * ((2.0 * PI * i as f32) / (window_length as f32 - 1.0)).cos())
        .collect()
}

/// Short-Time Fourier Transform power spectrogram, shape `[bins, frames]`.
///
/// The FFT length equals the window length, so bins span `win / 2 + 1`.
fn stft(audio: &[f32], win: usize, hop: usize) -> Array2<f32> {
    use rustfft::{FftPlanner, num_complex::Complex};

    let window = hann_window(win);
    let num_frames = (audio.len() - win) / hop + 1;
    let freq_bins = win / 2 + 1;
    let mut spectrogram = Array2::<f32>::zeros((freq_bins, num_frames));

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(win);

    for frame_idx in 0..num_frames {
        let start = frame_idx * hop;

        let mut frame: Vec<Complex<f32>> = audio[start..start + win]
            .iter()
            .zip(&window)
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();

        fft.process(&mut frame);

        for k in 0..freq_bins {
            let magnitude = frame[k].norm();
            spectrogram[[k, frame_idx]] = magnitude * magnitude;
        }
    }

    spectrogram
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use hound::WavWriter;

    fn create_test_wav(
        path: &Path,
        sample_rate: u32,
        channels: u16,
        samples: &[f32],
    ) -> hound::Result<()> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec)?;
        for &sample in samples {
            writer.write_sample((sample * 32767.0) as i16)?;
        }
        writer.finalize()?;
        Ok(())
    }

    fn sine(freq: f32, duration_sec: f32, sample_rate: u32) -> Vec<f32> {
        let n = (duration_sec * sample_rate as f32) as usize;
        (0..n)
            .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn loads_mono_wav() {
        let path = std::env::temp_dir().join("melgen_mono.wav");
        create_test_wav(&path, 16000, 1, &[0.1, 0.2, 0.3]).unwrap();

        let segment = SpeechSegment::from_file(&path, "abc").unwrap();

        assert_eq!(segment.sample_rate(), 16000);
        assert_eq!(segment.transcript(), "abc");
        assert_eq!(segment.samples().len(), 3);
        assert!((segment.samples()[1] - 0.2).abs() < 0.01);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn downmixes_stereo() {
        let path = std::env::temp_dir().join("melgen_stereo.wav");
        create_test_wav(&path, 16000, 2, &[0.2, 0.4, 0.6, 0.8]).unwrap();

        let segment = SpeechSegment::from_file(&path, "").unwrap();

        assert_eq!(segment.samples().len(), 2);
        assert!((segment.samples()[0] - 0.3).abs() < 0.01);
        assert!((segment.samples()[1] - 0.7).abs() < 0.01);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn rejects_invalid_channels() {
        let path = std::env::temp_dir().join("melgen_surround.wav");
        create_test_wav(&path, 16000, 6, &[0.0; 12]).unwrap();

        let result = SpeechSegment::from_file(&path, "");

        assert!(matches!(
            result,
            Err(Error::Data(DataError::InvalidChannels(6)))
        ));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn duration_from_rate() {
        let segment = SpeechSegment::new(vec![0.0; 8000], 16000, "").unwrap();
        assert!((segment.duration() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn normalize_hits_target_level() {
        let mut segment = SpeechSegment::new(sine(440.0, 0.5, 16000), 16000, "").unwrap();

        segment.normalize_to_db(TARGET_DB).unwrap();

        assert!((segment.rms_db() - TARGET_DB).abs() < 0.1);
    }

    #[test]
    fn normalize_rejects_silence() {
        let mut segment = SpeechSegment::new(vec![0.0; 100], 16000, "").unwrap();

        let result = segment.normalize_to_db(TARGET_DB);

        assert!(matches!(result, Err(Error::Data(DataError::SilentSegment))));
    }

    #[test]
    fn spectrogram_shape_arithmetic() {
        // 0.5s at 16kHz with 20ms window / 10ms stride:
        // win = 320, hop = 160, frames = (8000 - 320) / 160 + 1 = 49
        let samples = sine(300.0, 0.5, 16000);
        let config = SpectrogramConfig::default();

        let specgram = linear_spectrogram(&samples, 16000, &config).unwrap();

        assert_eq!(specgram.shape(), &[161, 49]);
    }

    #[test]
    fn max_freq_truncates_bins() {
        let samples = sine(300.0, 0.5, 16000);
        let config = SpectrogramConfig {
            max_freq: Some(4000.0),
            ..Default::default()
        };

        let specgram = linear_spectrogram(&samples, 16000, &config).unwrap();

        // bin width = 16000 / 320 = 50Hz; bins 0..=80 stay
        assert_eq!(specgram.shape()[0], 81);
    }

    #[test]
    fn rejects_max_freq_above_nyquist() {
        let config = SpectrogramConfig {
            max_freq: Some(9000.0),
            ..Default::default()
        };

        let result = linear_spectrogram(&[0.0; 8000], 16000, &config);

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::MaxFreqAboveNyquist { .. }))
        ));
    }

    #[test]
    fn rejects_stride_over_window() {
        let config = SpectrogramConfig {
            stride_ms: 30.0,
            ..Default::default()
        };

        let result = linear_spectrogram(&[0.0; 8000], 16000, &config);

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::StrideExceedsWindow { .. }))
        ));
    }

    #[test]
    fn rejects_sub_sample_stride() {
        // 0.05ms at 16kHz truncates to zero hop samples.
        let config = SpectrogramConfig {
            stride_ms: 0.05,
            ..Default::default()
        };

        let result = linear_spectrogram(&[0.1; 8000], 16000, &config);

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::FramingBelowOneSample { .. }))
        ));
    }

    #[test]
    fn rejects_sub_sample_window() {
        let config = SpectrogramConfig {
            stride_ms: 0.01,
            window_ms: 0.05,
            ..Default::default()
        };

        let result = linear_spectrogram(&[0.1; 8000], 16000, &config);

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::FramingBelowOneSample { .. }))
        ));
    }

    #[test]
    fn rejects_short_segment() {
        let config = SpectrogramConfig::default();

        let result = linear_spectrogram(&[0.0; 100], 16000, &config);

        assert!(matches!(
            result,
            Err(Error::Data(DataError::SegmentTooShort { .. }))
        ));
    }

    #[test]
    fn spectral_energy_lands_in_the_right_bin() {
        // 1kHz tone with 50Hz bins: bin 20 should dominate.
        let samples = sine(1000.0, 0.5, 16000);
        let config = SpectrogramConfig::default();

        let specgram = linear_spectrogram(&samples, 16000, &config).unwrap();

        let frame = specgram.column(24);
        let peak = frame
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .map(|(k, _)| k)
            .unwrap();

        assert_eq!(peak, 20);
    }
}
