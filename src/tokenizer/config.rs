//! Tokenizer configuration types.

use serde::{Deserialize, Serialize};

/// Special tokens
///
/// [`super::WordPiece`] assigns these the first four vocabulary ids in
/// declaration order, so padding is always id 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialTokens {
    /// Padding token
    pub pad: String,
    /// Unknown token
    pub unk: String,
    /// Sequence-start token
    pub cls: String,
    /// Sequence-end token
    pub sep: String,
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self {
            pad: "[PAD]".to_string(),
            unk: "[UNK]".to_string(),
            cls: "[CLS]".to_string(),
            sep: "[SEP]".to_string(),
        }
    }
}

/// Tokenizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// Target vocabulary size
    pub vocab_size: usize,
    /// Minimum pair frequency for a merge during training
    pub min_frequency: usize,
    /// Special tokens
    pub special_tokens: SpecialTokens,
    /// Whether to lowercase input
    pub lowercase: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            vocab_size: 30000,
            min_frequency: 2,
            special_tokens: SpecialTokens::default(),
            lowercase: true,
        }
    }
}

impl TokenizerConfig {
    /// Set vocabulary size
    pub fn with_vocab_size(mut self, size: usize) -> Self {
        self.vocab_size = size;
        self
    }

    /// Set minimum merge frequency
    pub fn with_min_frequency(mut self, freq: usize) -> Self {
        self.min_frequency = freq;
        self
    }

    /// Enable or disable lowercase preprocessing
    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenizer_config_default() {
        let config = TokenizerConfig::default();
        assert_eq!(config.vocab_size, 30000);
        assert_eq!(config.min_frequency, 2);
        assert!(config.lowercase);
    }

    #[test]
    fn test_tokenizer_config_builders() {
        let config = TokenizerConfig::default()
            .with_vocab_size(1000)
            .with_min_frequency(1)
            .with_lowercase(false);
        assert_eq!(config.vocab_size, 1000);
        assert_eq!(config.min_frequency, 1);
        assert!(!config.lowercase);
    }

    #[test]
    fn test_special_tokens_default() {
        let special = SpecialTokens::default();
        assert_eq!(special.pad, "[PAD]");
        assert_eq!(special.unk, "[UNK]");
        assert_eq!(special.cls, "[CLS]");
        assert_eq!(special.sep, "[SEP]");
    }
}
