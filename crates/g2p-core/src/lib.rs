//! Shared data model for grapheme-to-phoneme conversion.
//!
//! # Architecture
//!
//! - [`word`] -- Immutable gram sequences (graphemes or phonemes)
//! - [`symbols`] -- Reserved symbols and graphone token encoding
//! - [`options`] -- Gram-length bounds and EM settings ([`GramOptions`])
//! - [`prob_table`] -- Sparse joint probability table over graphones
//! - [`alignment`] -- Scored graphone sequences produced by the aligner
//! - [`config`] -- TOML configuration for alignment and decoding

pub mod alignment;
pub mod config;
pub mod options;
pub mod prob_table;
pub mod symbols;
pub mod word;

pub use alignment::{Alignment, Graphone};
pub use config::{Config, DecoderOptions};
pub use options::{GramOptions, Maximizer};
pub use prob_table::ProbTable;
pub use word::Word;

/// Error type for the shared data model.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("a word must contain at least one gram")]
    EmptyWord,
    #[error("gram {gram:?} is a reserved symbol or contains a separator")]
    ReservedGram { gram: String },
    #[error("invalid graphone token {token:?}: {reason}")]
    InvalidGraphone { token: String, reason: &'static str },
    #[error("configuration parse error: {0}")]
    ConfigParse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidOption { field: &'static str, reason: String },
}
