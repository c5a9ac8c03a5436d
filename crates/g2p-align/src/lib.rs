//! K-best grapheme/phoneme alignment.
//!
//! # Architecture
//!
//! - [`beam`] -- Fixed-capacity K-best memo table over DP coordinates
//! - [`aligner`] -- Viterbi alignment search and path reconstruction
//! - [`trainer`] -- EM estimation of the graphone probability table
//! - [`corpus`] -- Reader for `word<TAB>phonemes` training pairs

pub mod aligner;
pub mod beam;
pub mod corpus;
pub mod trainer;

pub use aligner::Aligner;
pub use beam::{BeamEntry, BeamTable, Transition};
pub use trainer::{AlignerTrainer, TrainingReport};

use g2p_core::CoreError;

/// Error type for corpus loading and aligner training.
#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    #[error("corpus line {line}: {reason}")]
    Corpus { line: usize, reason: String },
    #[error("training corpus is empty")]
    EmptyCorpus,
    #[error("no training pair could be aligned under the current gram options")]
    NoViableAlignments,
    #[error(transparent)]
    Core(#[from] CoreError),
}
