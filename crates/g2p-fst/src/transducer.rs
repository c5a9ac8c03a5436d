//! The compiled grapheme-to-phoneme transducer.
//!
//! A [`SequenceTransducer`] is immutable once built and is shared freely
//! between threads; every [`translate`](SequenceTransducer::translate) call
//! works on its own scratch automata.
//!
//! Persisted layout: the model order as a little-endian `u32`, followed by
//! the automaton in the library's binary format (symbol tables included).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use g2p_core::{DecoderOptions, Word};
use hashbrown::HashSet;
use rustfst::algorithms::compose::compose;
use rustfst::algorithms::rm_epsilon::rm_epsilon;
use rustfst::algorithms::tr_compares::{ILabelCompare, OLabelCompare};
use rustfst::algorithms::{
    ProjectType, ShortestPathConfig, project, shortest_path_with_config, tr_sort,
};
use rustfst::fst_traits::SerializableFst;
use rustfst::prelude::*;

use crate::entry::ClusterEntryBuilder;
use crate::lattice::{CandidatePath, LatticeDecoder};
use crate::{FstError, StdFst};

#[derive(Debug)]
pub struct SequenceTransducer {
    fst: StdFst,
    order: u32,
    input_symbols: Arc<SymbolTable>,
    output_symbols: Arc<SymbolTable>,
    entry: ClusterEntryBuilder,
    options: DecoderOptions,
}

impl SequenceTransducer {
    /// Wrap a compiled model automaton. Both symbol tables must be attached.
    pub fn new(mut fst: StdFst, order: u32, options: DecoderOptions) -> Result<Self, FstError> {
        let input_symbols = fst
            .input_symbols()
            .cloned()
            .ok_or(FstError::MissingSymbols("input"))?;
        let output_symbols = fst
            .output_symbols()
            .cloned()
            .ok_or(FstError::MissingSymbols("output"))?;
        tr_sort(&mut fst, ILabelCompare {});
        let entry = ClusterEntryBuilder::new(Arc::clone(&input_symbols))?;
        Ok(Self {
            fst,
            order,
            input_symbols,
            output_symbols,
            entry,
            options,
        })
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn fst(&self) -> &StdFst {
        &self.fst
    }

    pub fn input_symbols(&self) -> &SymbolTable {
        &self.input_symbols
    }

    pub fn output_symbols(&self) -> &SymbolTable {
        &self.output_symbols
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// The `top_k` best pronunciations of `word`, best first.
    ///
    /// Fails with [`FstError::InvalidInput`] if a grapheme is outside the
    /// input vocabulary. A word the model cannot cover yields an empty list.
    pub fn translate(&self, word: &Word, top_k: usize) -> Result<Vec<CandidatePath>, FstError> {
        let _span = tracing::debug_span!("translate", word = %word, top_k).entered();

        let mut entry = self.entry.build(word)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }
        tr_sort(&mut entry, OLabelCompare {});

        let mut lattice: StdFst =
            compose::<TropicalWeight, StdFst, StdFst, StdFst, _, _>(&entry, &self.fst)?;
        project(&mut lattice, ProjectType::ProjectOutput);

        let beam = if top_k == 1 {
            1
        } else {
            self.options.nbest_beam.max(top_k)
        };
        let config = ShortestPathConfig::default()
            .with_nshortest(beam)
            .with_unique(false);
        let mut best: StdFst = shortest_path_with_config(&lattice, config)?;
        rm_epsilon(&mut best)?;
        tracing::debug!(
            lattice_states = lattice.num_states(),
            pruned_states = best.num_states(),
            beam,
            "pruned lattice"
        );

        let mut candidates = LatticeDecoder::new(&self.output_symbols).decode(&best)?;
        candidates.sort_by(CandidatePath::rank);
        let mut seen = HashSet::new();
        candidates.retain(|c| seen.insert(c.symbols.clone()));
        candidates.truncate(top_k);
        Ok(candidates)
    }

    pub fn store<W: Write>(&self, mut writer: W) -> Result<(), FstError> {
        writer.write_all(&self.order.to_le_bytes())?;
        self.fst.store(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), FstError> {
        let file = File::create(path.as_ref())?;
        self.store(BufWriter::new(file))?;
        tracing::debug!(path = %path.as_ref().display(), "wrote transducer");
        Ok(())
    }

    pub fn load(bytes: &[u8], options: DecoderOptions) -> Result<Self, FstError> {
        let Some((order, body)) = bytes.split_first_chunk::<4>() else {
            return Err(FstError::Format(format!(
                "{} bytes is too short for the order header",
                bytes.len()
            )));
        };
        let order = u32::from_le_bytes(*order);
        if order < 2 {
            return Err(FstError::Format(format!("stored model order {order} is below 2")));
        }
        let fst = StdFst::load(body).map_err(|e| FstError::Format(e.to_string()))?;
        Self::new(fst, order, options)
    }

    pub fn read<P: AsRef<Path>>(path: P, options: DecoderOptions) -> Result<Self, FstError> {
        let bytes = std::fs::read(path.as_ref())?;
        let transducer = Self::load(&bytes, options)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            order = transducer.order,
            states = transducer.fst.num_states(),
            "read transducer"
        );
        Ok(transducer)
    }
}
