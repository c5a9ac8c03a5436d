// Path enumeration over a pruned, epsilon-free lattice.
//
// Every accepting path becomes one candidate. Markers are consumed for their
// cost but never emitted, and composite output symbols are split on the gram
// separator into individual phonemes.

use std::cmp::Ordering;

use g2p_core::symbols::{self, GRAM_SEPARATOR};
use hashbrown::HashSet;
use rustfst::EPS_LABEL;
use rustfst::prelude::*;

use crate::FstError;

/// One decoded output sequence with its accumulated tropical cost.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePath {
    pub symbols: Vec<String>,
    pub cost: f32,
}

impl CandidatePath {
    pub fn new(symbols: Vec<String>, cost: f32) -> Self {
        Self { symbols, cost }
    }

    /// Ascending cost, then fewer symbols, then lexicographic.
    pub fn rank(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.symbols.len().cmp(&other.symbols.len()))
            .then_with(|| self.symbols.cmp(&other.symbols))
    }

    pub fn to_line(&self) -> String {
        self.symbols.join(" ")
    }
}

impl std::fmt::Display for CandidatePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\t{:.4}", self.to_line(), self.cost)
    }
}

/// Reads candidates off a lattice whose output labels belong to `symbols`.
pub struct LatticeDecoder<'a> {
    symbols: &'a SymbolTable,
}

impl<'a> LatticeDecoder<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self { symbols }
    }

    /// Enumerate every path from the start state, depth first.
    ///
    /// Paths that produce the same output sequence are kept only once, at
    /// the first one found.
    ///
    /// # Panics
    ///
    /// If a final state has outgoing arcs. A pruned n-best lattice never
    /// has one.
    pub fn decode<F: Fst<TropicalWeight>>(&self, lattice: &F) -> Result<Vec<CandidatePath>, FstError> {
        let _span = tracing::debug_span!("decode").entered();
        let mut walk = Walk {
            lattice,
            symbols: self.symbols,
            output: Vec::new(),
            stack: Vec::new(),
            seen: HashSet::new(),
            found: Vec::new(),
        };
        if let Some(start) = lattice.start() {
            walk.run(start)?;
        }
        tracing::debug!(candidates = walk.found.len(), "decoded lattice");
        Ok(walk.found)
    }
}

/// A state on the current path and the next arc to try from it.
struct Frame {
    state: StateId,
    next_arc: usize,
    cost: f32,
    /// Output length on arrival.
    depth: usize,
}

struct Walk<'a, F> {
    lattice: &'a F,
    symbols: &'a SymbolTable,
    output: Vec<String>,
    stack: Vec<Frame>,
    seen: HashSet<Vec<String>>,
    found: Vec<CandidatePath>,
}

impl<F: Fst<TropicalWeight>> Walk<'_, F> {
    fn run(&mut self, start: StateId) -> Result<(), FstError> {
        self.enter(start, 0.0)?;
        while let Some(top) = self.stack.last_mut() {
            let trs = self.lattice.get_trs(top.state)?;
            let Some(tr) = trs.trs().get(top.next_arc) else {
                self.stack.pop();
                continue;
            };
            top.next_arc += 1;
            let cost = top.cost + *tr.weight.value();
            self.output.truncate(top.depth);
            let (olabel, nextstate) = (tr.olabel, tr.nextstate);
            self.push_output(olabel)?;
            self.enter(nextstate, cost)?;
        }
        Ok(())
    }

    /// Record a candidate at a final state, otherwise descend into `state`.
    fn enter(&mut self, state: StateId, cost: f32) -> Result<(), FstError> {
        let final_weight = self
            .lattice
            .final_weight(state)?
            .filter(|w| w.value().is_finite());
        if let Some(weight) = final_weight {
            let arcs = self.lattice.num_trs(state)?;
            assert!(
                arcs == 0,
                "lattice state {state} is final but has {arcs} outgoing arcs"
            );
            if self.seen.insert(self.output.clone()) {
                self.found
                    .push(CandidatePath::new(self.output.clone(), cost + *weight.value()));
            }
            return Ok(());
        }
        self.stack.push(Frame {
            state,
            next_arc: 0,
            cost,
            depth: self.output.len(),
        });
        Ok(())
    }

    fn push_output(&mut self, olabel: Label) -> Result<(), FstError> {
        if olabel == EPS_LABEL {
            return Ok(());
        }
        let symbol = self.symbols.get_symbol(olabel).ok_or_else(|| {
            FstError::Format(format!("lattice label {olabel} has no output symbol"))
        })?;
        if !symbols::is_marker(symbol) {
            self.output
                .extend(symbol.split(GRAM_SEPARATOR).map(String::from));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StdFst;
    use g2p_core::symbols::{END, START};

    fn table(symbols: &[&str]) -> SymbolTable {
        let mut t = SymbolTable::new();
        for s in symbols {
            t.add_symbol(*s);
        }
        t
    }

    #[test]
    fn single_arc_lattice() {
        let symbols = table(&["a"]);
        let a = symbols.get_label("a").unwrap();
        let mut fst = StdFst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        fst.set_start(s0).unwrap();
        fst.set_final(s1, TropicalWeight::one()).unwrap();
        fst.add_tr(s0, Tr::new(a, a, 1.0, s1)).unwrap();

        let found = LatticeDecoder::new(&symbols).decode(&fst).unwrap();
        assert_eq!(found, vec![CandidatePath::new(vec!["a".to_string()], 1.0)]);
    }

    #[test]
    fn markers_are_skipped_and_clusters_split() {
        let symbols = table(&[START, END, "K|S", "T"]);
        let label = |s: &str| symbols.get_label(s).unwrap();
        let mut fst = StdFst::new();
        let states: Vec<StateId> = (0..5).map(|_| fst.add_state()).collect();
        fst.set_start(states[0]).unwrap();
        fst.set_final(states[4], 0.5).unwrap();
        fst.add_tr(states[0], Tr::new(label(START), label(START), 0.0, states[1])).unwrap();
        fst.add_tr(states[1], Tr::new(label("K|S"), label("K|S"), 1.0, states[2])).unwrap();
        fst.add_tr(states[2], Tr::new(EPS_LABEL, EPS_LABEL, 0.25, states[3])).unwrap();
        fst.add_tr(states[3], Tr::new(label(END), label(END), 2.0, states[4])).unwrap();

        let found = LatticeDecoder::new(&symbols).decode(&fst).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].symbols, vec!["K", "S"]);
        assert!((found[0].cost - 3.75).abs() < 1e-6);
    }

    #[test]
    fn duplicate_outputs_keep_first() {
        let symbols = table(&["x", "y"]);
        let x = symbols.get_label("x").unwrap();
        let y = symbols.get_label("y").unwrap();
        let mut fst = StdFst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        let s2 = fst.add_state();
        fst.set_start(s0).unwrap();
        fst.set_final(s1, TropicalWeight::one()).unwrap();
        fst.set_final(s2, TropicalWeight::one()).unwrap();
        fst.add_tr(s0, Tr::new(x, x, 2.0, s1)).unwrap();
        fst.add_tr(s0, Tr::new(x, x, 1.0, s2)).unwrap();
        fst.add_tr(s0, Tr::new(y, y, 3.0, s1)).unwrap();

        let found = LatticeDecoder::new(&symbols).decode(&fst).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], CandidatePath::new(vec!["x".to_string()], 2.0));
        assert_eq!(found[1].symbols, vec!["y"]);
    }

    #[test]
    fn empty_lattice_has_no_candidates() {
        let symbols = table(&[]);
        let fst = StdFst::new();
        assert!(LatticeDecoder::new(&symbols).decode(&fst).unwrap().is_empty());
    }

    #[test]
    #[should_panic(expected = "final but has")]
    fn final_state_with_arcs_panics() {
        let symbols = table(&["a"]);
        let a = symbols.get_label("a").unwrap();
        let mut fst = StdFst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        fst.set_start(s0).unwrap();
        fst.set_final(s0, TropicalWeight::one()).unwrap();
        fst.add_tr(s0, Tr::new(a, a, 1.0, s1)).unwrap();
        let _ = LatticeDecoder::new(&symbols).decode(&fst);
    }

    #[test]
    fn long_chain_does_not_exhaust_the_stack() {
        let symbols = table(&["a"]);
        let a = symbols.get_label("a").unwrap();
        let mut fst = StdFst::new();
        let mut prev = fst.add_state();
        fst.set_start(prev).unwrap();
        for _ in 0..20_000 {
            let next = fst.add_state();
            fst.add_tr(prev, Tr::new(a, a, 0.5, next)).unwrap();
            prev = next;
        }
        fst.set_final(prev, TropicalWeight::one()).unwrap();

        let found = LatticeDecoder::new(&symbols).decode(&fst).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].symbols.len(), 20_000);
        assert!((found[0].cost - 10_000.0).abs() < 1e-2);
    }

    #[test]
    fn branches_restore_output_prefix() {
        let symbols = table(&["a", "b", "c"]);
        let label = |s: &str| symbols.get_label(s).unwrap();
        let mut fst = StdFst::new();
        let states: Vec<StateId> = (0..4).map(|_| fst.add_state()).collect();
        fst.set_start(states[0]).unwrap();
        fst.set_final(states[2], TropicalWeight::one()).unwrap();
        fst.set_final(states[3], TropicalWeight::one()).unwrap();
        fst.add_tr(states[0], Tr::new(label("a"), label("a"), 1.0, states[1])).unwrap();
        fst.add_tr(states[1], Tr::new(label("b"), label("b"), 1.0, states[2])).unwrap();
        fst.add_tr(states[1], Tr::new(label("c"), label("c"), 2.0, states[3])).unwrap();

        let found = LatticeDecoder::new(&symbols).decode(&fst).unwrap();
        let lines: Vec<String> = found.iter().map(CandidatePath::to_line).collect();
        assert_eq!(lines, vec!["a b", "a c"]);
        assert_eq!(found[1].cost, 3.0);
    }

    #[test]
    fn rank_orders_cost_then_length_then_text() {
        let mut paths = vec![
            CandidatePath::new(vec!["b".into()], 1.0),
            CandidatePath::new(vec!["a".into(), "a".into()], 1.0),
            CandidatePath::new(vec!["a".into()], 1.0),
            CandidatePath::new(vec!["z".into()], 0.5),
        ];
        paths.sort_by(CandidatePath::rank);
        let lines: Vec<String> = paths.iter().map(CandidatePath::to_line).collect();
        assert_eq!(lines, vec!["z", "a", "b", "a a"]);
    }
}
