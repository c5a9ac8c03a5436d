//! Per-word entry acceptor.
//!
//! A linear chain with one state per grapheme position, framed by the start
//! and end sentinels. Every composite symbol of the input vocabulary whose
//! constituents occur at a position adds a zero-weight shortcut arc that
//! jumps over the whole cluster, so the model can pick either the single
//! graphemes or the cluster.

use std::sync::Arc;

use g2p_core::Word;
use g2p_core::symbols::{self, END, START};
use rustfst::prelude::*;

use crate::prefix::PrefixSetMatcher;
use crate::{FstError, StdFst};

/// Builds entry acceptors for one fixed input vocabulary.
#[derive(Debug)]
pub struct ClusterEntryBuilder {
    symbols: Arc<SymbolTable>,
    clusters: PrefixSetMatcher<Label>,
    start: Label,
    end: Label,
}

impl ClusterEntryBuilder {
    /// Index the composite symbols of `symbols`.
    ///
    /// The vocabulary must contain both sentinels.
    pub fn new(symbols: Arc<SymbolTable>) -> Result<Self, FstError> {
        let start = symbols
            .get_label(START)
            .ok_or_else(|| FstError::Format(format!("input vocabulary has no {START} symbol")))?;
        let end = symbols
            .get_label(END)
            .ok_or_else(|| FstError::Format(format!("input vocabulary has no {END} symbol")))?;

        let mut clusters = PrefixSetMatcher::new();
        for label in 0..symbols.len() {
            let label = label as Label;
            let Some(symbol) = symbols.get_symbol(label) else {
                continue;
            };
            if symbols::is_composite(symbol) {
                let units = symbols::split_gram(symbol)
                    .into_iter()
                    .map(String::from)
                    .collect();
                clusters.insert(units, label);
            }
        }
        tracing::debug!(clusters = clusters.len(), "indexed input clusters");

        Ok(Self {
            symbols,
            clusters,
            start,
            end,
        })
    }

    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    fn label(&self, gram: &str) -> Result<Label, FstError> {
        match self.symbols.get_label(gram) {
            Some(label) if !symbols::is_marker(gram) => Ok(label),
            _ => Err(FstError::InvalidInput {
                symbol: gram.to_string(),
            }),
        }
    }

    /// Build the acceptor for `word`.
    pub fn build(&self, word: &Word) -> Result<StdFst, FstError> {
        let grams = word.grams();
        let labels = grams
            .iter()
            .map(|g| self.label(g))
            .collect::<Result<Vec<_>, _>>()?;

        let mut fst = StdFst::new();
        let initial = fst.add_state();
        fst.set_start(initial)?;

        let positions: Vec<StateId> = (0..=labels.len()).map(|_| fst.add_state()).collect();
        let last = positions[labels.len()];
        let accept = fst.add_state();
        fst.set_final(accept, TropicalWeight::one())?;

        fst.add_tr(
            initial,
            Tr::new(self.start, self.start, TropicalWeight::one(), positions[0]),
        )?;
        for (i, &label) in labels.iter().enumerate() {
            fst.add_tr(
                positions[i],
                Tr::new(label, label, TropicalWeight::one(), positions[i + 1]),
            )?;
        }
        fst.add_tr(
            last,
            Tr::new(self.end, self.end, TropicalWeight::one(), accept),
        )?;

        let mut shortcuts = 0usize;
        for i in 0..grams.len() {
            for m in self.clusters.accept(&grams[i..]) {
                let label = *m.value;
                fst.add_tr(
                    positions[i],
                    Tr::new(label, label, TropicalWeight::one(), positions[i + m.len()]),
                )?;
                shortcuts += 1;
            }
        }
        tracing::debug!(word = %word, shortcuts, "built entry acceptor");

        fst.set_input_symbols(Arc::clone(&self.symbols));
        fst.set_output_symbols(Arc::clone(&self.symbols));
        Ok(fst)
    }
}
