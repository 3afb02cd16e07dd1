//! CTC support: true-length adjustment through time downsampling, and
//! greedy decoding of output probability sequences.

use crate::error::{ConfigError, Result};
use ndarray::ArrayView2;
use ndarray_stats::QuantileExt;

/// Rescale a true (unpadded) input length through the network's time
/// downsampling.
///
/// The feature matrix fed to the network is `max_time_steps` wide after
/// padding, of which only `true_input_length` is signal. The network's
/// output is `output_time_steps` wide. Padding shares no information with
/// the signal, so the valid output span scales proportionally:
///
/// `floor(true_input_length * output_time_steps / max_time_steps)`
///
/// This — not the raw input length and not the padded length — is the
/// sequence length handed to the alignment loss. The multiply runs in `f64`
/// before the floor; fractional discrepancies here shift the alignment
/// window and silently corrupt gradients.
pub fn ctc_input_length(
    max_time_steps: usize,
    output_time_steps: usize,
    true_input_length: usize,
) -> usize {
    debug_assert!(max_time_steps > 0, "padded width cannot be zero");

    ((true_input_length as f64 * output_time_steps as f64) / max_time_steps as f64).floor()
        as usize
}

/// The network's fixed time-downsampling factor.
///
/// Set once at model construction (e.g. stride-2 pooling applied three times
/// gives a factor of 8) and consumed uniformly wherever lengths cross the
/// downsampling boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeScale {
    downsample_factor: usize,
}

impl TimeScale {
    /// # Errors
    ///
    /// Returns an error for a zero factor.
    pub fn new(downsample_factor: usize) -> Result<Self> {
        if downsample_factor == 0 {
            return Err(ConfigError::ZeroDownsampleFactor.into());
        }

        Ok(Self { downsample_factor })
    }

    pub fn downsample_factor(&self) -> usize {
        self.downsample_factor
    }

    /// Output time steps for a padded input width.
    pub fn output_steps(&self, padded_length: usize) -> usize {
        padded_length / self.downsample_factor
    }

    /// Loss-ready sequence length for one utterance: rescale its true length
    /// through this downsampling.
    pub fn ctc_input_length(&self, padded_length: usize, true_length: usize) -> usize {
        ctc_input_length(padded_length, self.output_steps(padded_length), true_length)
    }
}

/// Greedy CTC decode of a `[T, V]` probability sequence.
///
/// Per time step, take the argmax over the vocabulary dimension; then
/// collapse consecutive repeats and drop every occurrence of `blank`.
/// Deterministic, no search.
///
/// # Errors
///
/// Returns an error if a frame is empty or contains values with no defined
/// ordering (NaN).
pub fn greedy_decode(probs: ArrayView2<'_, f32>, blank: usize) -> Result<Vec<usize>> {
    let mut decoded = Vec::new();
    let mut previous = None;

    for frame in probs.rows() {
        let best = frame.argmax()?;

        if best != blank && Some(best) != previous {
            decoded.push(best);
        }

        previous = Some(best);
    }

    Ok(decoded)
}
