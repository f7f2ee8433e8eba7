//! Subword tokenization for the semantic modality.
//!
//! A WordPiece vocabulary is either trained on the texture corpus or loaded
//! from a saved JSON file at startup. Encoding happens once per snippet
//! during dataset assembly, not inside the training loop.
//!
//! # Example
//!
//! ```
//! use legible::tokenizer::{Tokenizer, TokenizerConfig, WordPiece};
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TokenizerConfig::default().with_vocab_size(1000);
//!     let mut tokenizer = WordPiece::new(config);
//!
//!     let corpus = vec!["public static void main", "static int count"];
//!     tokenizer.train(&corpus)?;
//!
//!     let ids = tokenizer.encode("static void")?;
//!     let text = tokenizer.decode(&ids)?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod traits;
mod wordpiece;

pub use config::{SpecialTokens, TokenizerConfig};
pub use error::{Result, TokenizerError};
pub use traits::{TokenId, Tokenizer};
pub use wordpiece::WordPiece;

/// Padding id, fixed by the special-token insertion order.
pub const PAD_ID: TokenId = 0;
/// Unknown-word id.
pub const UNK_ID: TokenId = 1;
/// Sequence-start id.
pub const CLS_ID: TokenId = 2;
/// Sequence-end id.
pub const SEP_ID: TokenId = 3;
