//! Precomputed per-feature mean/stddev normalization.

use crate::error::{ConfigError, DataError, InvariantError, Result};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Guard against division by a zero stddev.
const STD_EPS: f32 = 1e-20;

#[derive(Debug, Deserialize, Serialize)]
struct Stats {
    mean: Vec<f32>,
    std: Vec<f32>,
}

/// Applies precomputed per-feature-bin mean/stddev normalization.
#[derive(Clone, Debug)]
pub struct FeatureNormalizer {
    mean: Array1<f32>,
    std: Array1<f32>,
}

impl FeatureNormalizer {
    /// Build a normalizer from mean and stddev vectors of equal length.
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> Result<Self> {
        if mean.len() != std.len() {
            return Err(DataError::NormalizerShape {
                expected: mean.len(),
                got: std.len(),
            }
            .into());
        }

        Ok(Self {
            mean: Array1::from(mean),
            std: Array1::from(std),
        })
    }

    /// Load precomputed statistics from a JSON file `{"mean": [..], "std": [..]}`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path).map_err(DataError::Io)?;
        let stats: Stats = serde_json::from_reader(BufReader::new(file))?;
        Self::new(stats.mean, stats.std)
    }

    /// Persist the statistics as JSON.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let stats = Stats {
            mean: self.mean.to_vec(),
            std: self.std.to_vec(),
        };
        let file = File::create(path).map_err(DataError::Io)?;
        serde_json::to_writer(BufWriter::new(file), &stats)?;
        Ok(())
    }

    /// Compute mean/stddev per feature bin across a sample of utterances.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty sample or for utterances that disagree
    /// on the feature dimension.
    pub fn compute<'a, I>(sample: I) -> Result<Self>
    where
        I: IntoIterator<Item = ArrayView2<'a, f32>>,
    {
        let mut iter = sample.into_iter();
        let first = iter.next().ok_or(ConfigError::EmptyNormalizerSample)?;

        let feature_dim = first.shape()[0];
        let mut count = 0usize;
        let mut sum = Array1::<f64>::zeros(feature_dim);
        let mut sum_sq = Array1::<f64>::zeros(feature_dim);

        for features in std::iter::once(first).chain(iter) {
            if features.shape()[0] != feature_dim {
                return Err(InvariantError::FeatureDimMismatch {
                    expected: feature_dim,
                    got: features.shape()[0],
                }
                .into());
            }

            count += features.shape()[1];
            for (bin, row) in features.axis_iter(Axis(0)).enumerate() {
                for &x in row {
                    sum[bin] += x as f64;
                    sum_sq[bin] += (x as f64) * (x as f64);
                }
            }
        }

        let n = count as f64;
        let mean: Vec<f32> = sum.iter().map(|&s| (s / n) as f32).collect();
        let std: Vec<f32> = sum
            .iter()
            .zip(sum_sq.iter())
            .map(|(&s, &sq)| {
                let m = s / n;
                ((sq / n - m * m).max(0.0)).sqrt() as f32
            })
            .collect();

        Self::new(mean, std)
    }

    /// Normalize a `[F, T]` feature matrix: `(x - mean) / (std + eps)` per bin.
    ///
    /// # Errors
    ///
    /// Returns an error if `F` does not match the statistics.
    pub fn apply(&self, features: &Array2<f32>) -> Result<Array2<f32>> {
        if features.shape()[0] != self.mean.len() {
            return Err(DataError::NormalizerShape {
                expected: self.mean.len(),
                got: features.shape()[0],
            }
            .into());
        }

        let mut normalized = features.clone();
        for (bin, mut row) in normalized.axis_iter_mut(Axis(0)).enumerate() {
            let mean = self.mean[bin];
            let std = self.std[bin] + STD_EPS;
            row.mapv_inplace(|x| (x - mean) / std);
        }

        Ok(normalized)
    }

    /// Feature dimension the statistics were computed for.
    pub fn feature_dim(&self) -> usize {
        self.mean.len()
    }
}
