//! Randomized signal augmentation applied before featurization.
//!
//! The pipeline is configured from a JSON array of augmentor entries:
//!
//! ```json
//! [
//!   {"type": "volume", "params": {"min_gain_db": -6.0, "max_gain_db": 6.0}, "prob": 0.5},
//!   {"type": "shift", "params": {"min_shift_ms": -5.0, "max_shift_ms": 5.0}, "prob": 1.0}
//! ]
//! ```
//!
//! Each entry fires independently with its configured probability, drawing
//! from the pipeline's own seeded random source so results are reproducible
//! for a fixed seed and call order.

use crate::audio::SpeechSegment;
use crate::error::{ConfigError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct AugmentorEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    params: serde_json::Value,
    #[serde(default = "default_prob")]
    prob: f64,
}

fn default_prob() -> f64 {
    1.0
}

#[derive(Clone, Copy, Debug, Deserialize)]
struct VolumeParams {
    min_gain_db: f32,
    max_gain_db: f32,
}

#[derive(Clone, Copy, Debug, Deserialize)]
struct ShiftParams {
    min_shift_ms: f32,
    max_shift_ms: f32,
}

#[derive(Clone, Copy, Debug)]
enum Augmentor {
    /// Uniform gain perturbation in decibels.
    Volume(VolumeParams),
    /// Time shift with zero fill of the vacated region.
    Shift(ShiftParams),
}

/// A configured sequence of randomized audio transforms.
pub struct AugmentationPipeline {
    augmentors: Vec<(Augmentor, f64)>,
    rng: StdRng,
}

impl AugmentationPipeline {
    /// Parse a pipeline from a JSON config string.
    ///
    /// An empty JSON object is accepted as an empty pipeline, matching the
    /// common `"{}"` placeholder in existing configs.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON, an unknown augmentor type, a
    /// probability outside `[0, 1]`, or a parameter range with min above max.
    pub fn from_json(config: &str, seed: u64) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(config)?;
        let entries: Vec<AugmentorEntry> = match value {
            serde_json::Value::Object(map) if map.is_empty() => Vec::new(),
            other => serde_json::from_value(other)?,
        };

        let mut augmentors = Vec::with_capacity(entries.len());
        for entry in entries {
            if !(0.0..=1.0).contains(&entry.prob) {
                return Err(ConfigError::InvalidProbability(entry.prob).into());
            }

            let augmentor = match entry.kind.as_str() {
                "volume" => {
                    let params: VolumeParams = serde_json::from_value(entry.params)?;
                    validate_range(params.min_gain_db, params.max_gain_db)?;
                    Augmentor::Volume(params)
                }
                "shift" => {
                    let params: ShiftParams = serde_json::from_value(entry.params)?;
                    validate_range(params.min_shift_ms, params.max_shift_ms)?;
                    Augmentor::Shift(params)
                }
                other => return Err(ConfigError::UnknownAugmentor(other.to_string()).into()),
            };

            augmentors.push((augmentor, entry.prob));
        }

        Ok(Self {
            augmentors,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// A pipeline that applies no transforms.
    pub fn empty(seed: u64) -> Self {
        Self {
            augmentors: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Apply the configured transforms to a segment in place.
    pub fn transform(&mut self, segment: &mut SpeechSegment) {
        for (augmentor, prob) in &self.augmentors {
            if !self.rng.gen_bool(*prob) {
                continue;
            }

            match augmentor {
                Augmentor::Volume(params) => {
                    let gain = self.rng.gen_range(params.min_gain_db..=params.max_gain_db);
                    segment.gain_db(gain);
                }
                Augmentor::Shift(params) => {
                    let shift_ms = self.rng.gen_range(params.min_shift_ms..=params.max_shift_ms);
                    let shift =
                        (shift_ms / 1000.0 * segment.sample_rate() as f32).round() as isize;
                    shift_in_place(segment.samples_mut(), shift);
                }
            }
        }
    }
}

fn validate_range(min: f32, max: f32) -> Result<()> {
    if min > max {
        return Err(ConfigError::InvalidAugmentorRange { min, max }.into());
    }
    Ok(())
}

/// Shift samples by `k` positions (positive = later), zero-filling the
/// vacated region. Length is preserved.
fn shift_in_place(samples: &mut [f32], k: isize) {
    let len = samples.len();
    let k = k.clamp(-(len as isize), len as isize);

    if k > 0 {
        let k = k as usize;
        samples.copy_within(..len - k, k);
        samples[..k].fill(0.0);
    } else if k < 0 {
        let k = (-k) as usize;
        samples.copy_within(k.., 0);
        samples[len - k..].fill(0.0);
    }
}
