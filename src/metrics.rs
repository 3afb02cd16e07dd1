//! Edit-distance metrics for scoring decoded transcripts.

use crate::error::{DataError, Result};

/// Levenshtein distance between two token slices.
pub fn levenshtein<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, x) in a.iter().enumerate() {
        current[0] = i + 1;

        for (j, y) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(x != y);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }

        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Word error rate: word-level edit distance over the reference word count.
///
/// # Errors
///
/// Returns an error for an empty reference.
pub fn word_error_rate(hypothesis: &str, reference: &str) -> Result<f64> {
    let hyp: Vec<&str> = hypothesis.split_whitespace().collect();
    let reference: Vec<&str> = reference.split_whitespace().collect();

    if reference.is_empty() {
        return Err(DataError::EmptyReference.into());
    }

    Ok(levenshtein(&hyp, &reference) as f64 / reference.len() as f64)
}

/// Character error rate: character-level edit distance over the reference
/// character count, whitespace ignored on both sides.
///
/// # Errors
///
/// Returns an error for an empty reference.
pub fn char_error_rate(hypothesis: &str, reference: &str) -> Result<f64> {
    let hyp: Vec<char> = hypothesis.chars().filter(|c| !c.is_whitespace()).collect();
    let reference: Vec<char> = reference.chars().filter(|c| !c.is_whitespace()).collect();

    if reference.is_empty() {
        return Err(DataError::EmptyReference.into());
    }

    Ok(levenshtein(&hyp, &reference) as f64 / reference.len() as f64)
}

/// Token error rate over index sequences, e.g. greedy-decoder output against
/// a tokenized ground truth.
///
/// # Errors
///
/// Returns an error for an empty reference.
pub fn token_error_rate(hypothesis: &[usize], reference: &[usize]) -> Result<f64> {
    if reference.is_empty() {
        return Err(DataError::EmptyReference.into());
    }

    Ok(levenshtein(hypothesis, reference) as f64 / reference.len() as f64)
}
