//! Weighted-automaton decoding of joint graphone n-gram models.
//!
//! A trained backoff n-gram model over graphone tokens is compiled once into
//! a tropical-semiring transducer (grapheme side on the input tape, phoneme
//! side on the output tape). Each lookup builds an acceptor for the word,
//! composes it with the model, and reads the best phoneme sequences off the
//! pruned lattice.
//!
//! # Architecture
//!
//! - [`prefix`] -- Prefix matching against registered multi-symbol clusters
//! - [`entry`] -- Per-word acceptor with cluster shortcut arcs
//! - [`ngram`] -- N-gram model interface and ARPA reader
//! - [`compiler`] -- Backoff n-gram model to automaton compilation
//! - [`transducer`] -- Compiled model, lookup pipeline, persistence
//! - [`lattice`] -- Path enumeration over pruned lattices

pub mod compiler;
pub mod entry;
pub mod lattice;
pub mod ngram;
pub mod prefix;
pub mod transducer;

pub use compiler::LmCompiler;
pub use entry::ClusterEntryBuilder;
pub use lattice::{CandidatePath, LatticeDecoder};
pub use ngram::{ArpaModel, NgramEntry, NgramModel};
pub use prefix::PrefixSetMatcher;
pub use transducer::SequenceTransducer;

use g2p_core::CoreError;
use rustfst::prelude::{TropicalWeight, VectorFst};

/// Mutable tropical-semiring automaton used throughout the crate.
pub type StdFst = VectorFst<TropicalWeight>;

/// Error type for compilation, lookup and persistence.
#[derive(Debug, thiserror::Error)]
pub enum FstError {
    #[error("invalid input symbol {symbol:?}: not in the transducer's input vocabulary")]
    InvalidInput { symbol: String },
    #[error("model {which} sentinel is {found:?}, expected {expected:?}")]
    SentinelMismatch {
        which: &'static str,
        found: String,
        expected: &'static str,
    },
    #[error("model order {0} is too low: at least 2 is required")]
    OrderTooLow(usize),
    #[error("ARPA line {line}: {reason}")]
    Arpa { line: usize, reason: String },
    #[error("malformed transducer data: {0}")]
    Format(String),
    #[error("transducer has no {0} symbol table")]
    MissingSymbols(&'static str),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("automaton operation failed: {0}")]
    Automaton(#[from] anyhow::Error),
    #[error(transparent)]
    Core(#[from] CoreError),
}
