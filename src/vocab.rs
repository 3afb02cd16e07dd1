//! Vocabulary loading and transcript tokenization.

use crate::error::{ConfigError, DataError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Transcript column and tokenization scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VocabType {
    /// Pinyin syllables, separated by `-` in the manifest.
    Pinyin,
    /// Han characters, tokenized per Unicode scalar value.
    Han,
}

impl VocabType {
    /// Manifest column holding this vocabulary's transcript.
    pub fn column(&self) -> &'static str {
        match self {
            VocabType::Pinyin => "pny",
            VocabType::Han => "han",
        }
    }

    /// Token separator within a transcript, if any.
    pub fn separator(&self) -> Option<&'static str> {
        match self {
            VocabType::Pinyin => Some("-"),
            VocabType::Han => None,
        }
    }
}

/// Fixed ordered vocabulary: token → index bijection plus the inverse list.
///
/// Line order in the vocabulary file defines index order. By convention the
/// last line holds the blank symbol used by the alignment loss.
#[derive(Clone, Debug)]
pub struct Vocabulary {
    index: HashMap<String, usize>,
    tokens: Vec<String>,
}

impl Vocabulary {
    /// Load a vocabulary from a UTF-8 file, one token per line.
    ///
    /// Trailing newlines are stripped and empty lines skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains no tokens.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(DataError::Io)?;
        Self::from_tokens(text.lines().filter(|line| !line.is_empty()))
    }

    /// Build a vocabulary from an ordered token sequence.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty sequence.
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        if tokens.is_empty() {
            return Err(ConfigError::EmptyVocabulary.into());
        }

        let index = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| (token.clone(), i))
            .collect();

        Ok(Self { index, tokens })
    }

    /// Convert a transcript into token indices.
    ///
    /// With a separator, the transcript is split on it; without, each Unicode
    /// scalar value is one token.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first token missing from the vocabulary.
    pub fn tokenize(&self, text: &str, sep: Option<&str>) -> Result<Vec<usize>> {
        match sep {
            Some(sep) => text
                .trim()
                .split(sep)
                .filter(|token| !token.is_empty())
                .map(|token| self.lookup(token))
                .collect(),
            None => {
                let mut buf = [0u8; 4];
                text.trim()
                    .chars()
                    .map(|c| self.lookup(c.encode_utf8(&mut buf)))
                    .collect()
            }
        }
    }

    fn lookup(&self, token: &str) -> Result<usize> {
        self.index.get(token).copied().ok_or_else(|| {
            DataError::UnknownToken {
                token: token.to_string(),
            }
            .into()
        })
    }

    /// Token at `index`, if in range.
    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// All tokens in index order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn size(&self) -> usize {
        self.tokens.len()
    }

    /// Index of the blank symbol (the last vocabulary entry, by convention).
    pub fn blank_index(&self) -> usize {
        self.tokens.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn indexes_follow_line_order() {
        let path = std::env::temp_dir().join("melgen_vocab.txt");
        std::fs::write(&path, "a\nb\nc\n_\n").unwrap();

        let vocab = Vocabulary::from_file(&path).unwrap();

        assert_eq!(vocab.size(), 4);
        assert_eq!(vocab.tokenize("cab", None).unwrap(), vec![2, 0, 1]);
        assert_eq!(vocab.token(3), Some("_"));
        assert_eq!(vocab.blank_index(), 3);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn skips_empty_lines() {
        let path = std::env::temp_dir().join("melgen_vocab_gaps.txt");
        std::fs::write(&path, "a\n\nb\n\n").unwrap();

        let vocab = Vocabulary::from_file(&path).unwrap();

        assert_eq!(vocab.size(), 2);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn rejects_empty_vocabulary() {
        let result = Vocabulary::from_tokens(Vec::<String>::new());

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::EmptyVocabulary))
        ));
    }

    #[test]
    fn tokenizes_with_separator() {
        let vocab = Vocabulary::from_tokens(["ni3", "hao3", "_"]).unwrap();

        let ids = vocab.tokenize("ni3-hao3", Some("-")).unwrap();

        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn unknown_token_is_an_error() {
        let vocab = Vocabulary::from_tokens(["a", "b", "_"]).unwrap();

        let result = vocab.tokenize("abx", None);

        assert!(matches!(
            result,
            Err(Error::Data(DataError::UnknownToken { token })) if token == "x"
        ));
    }

    #[test]
    fn multibyte_tokens_round_trip() {
        let vocab = Vocabulary::from_tokens(["你", "好", "_"]).unwrap();

        let ids = vocab.tokenize("好你", None).unwrap();

        assert_eq!(ids, vec![1, 0]);
        assert_eq!(vocab.token(0), Some("你"));
    }
}
