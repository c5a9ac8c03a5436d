//! Compile a backoff n-gram model over graphone tokens into a transducer.
//!
//! Every n-gram context gets its own state. Emitting arcs consume the
//! grapheme side of a token and output its phoneme side; backoff arcs are
//! epsilon-labelled and lead to the next-shorter context. The empty context
//! is the backoff target of all unigram contexts.
//!
//! Weights are `-ln(10) * log10_prob` (tropical cost). Non-finite weights are
//! replaced by the configured clamp value.

use std::sync::Arc;

use g2p_core::DecoderOptions;
use g2p_core::symbols::{self, END, EPSILON, START};
use hashbrown::{HashMap, HashSet};
use rustfst::algorithms::tr_compares::ILabelCompare;
use rustfst::algorithms::tr_sort;
use rustfst::EPS_LABEL;
use rustfst::prelude::*;

use crate::ngram::{NgramEntry, NgramModel};
use crate::transducer::SequenceTransducer;
use crate::{FstError, StdFst};

/// Out-of-vocabulary token written by LM toolkits; it has no graphone sides.
const UNKNOWN: &str = "<unk>";

/// Convert a log10 probability to a tropical cost.
pub fn to_weight(log10_prob: f64, clamp: f32) -> f32 {
    let w = (-std::f64::consts::LN_10 * log10_prob) as f32;
    if w.is_finite() { w } else { clamp }
}

#[derive(Debug, Clone, Default)]
pub struct LmCompiler {
    options: DecoderOptions,
}

impl LmCompiler {
    pub fn new(options: DecoderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Compile `model` into a ready-to-use transducer.
    ///
    /// The model must use the `<s>` / `</s>` sentinels and have order 2 or
    /// more.
    pub fn compile(&self, model: &dyn NgramModel) -> Result<SequenceTransducer, FstError> {
        let _span = tracing::debug_span!("compile", order = model.order()).entered();

        if model.start_symbol() != START {
            return Err(FstError::SentinelMismatch {
                which: "start",
                found: model.start_symbol().to_string(),
                expected: START,
            });
        }
        if model.end_symbol() != END {
            return Err(FstError::SentinelMismatch {
                which: "end",
                found: model.end_symbol().to_string(),
                expected: END,
            });
        }
        if model.order() < 2 {
            return Err(FstError::OrderTooLow(model.order()));
        }

        let mut graph = Graph::new(self.options.clamp_weight)?;
        let mut failure: Option<FstError> = None;
        let mut skipped = 0usize;
        model.walk(&mut |entry| {
            if failure.is_some() {
                return;
            }
            if entry.tokens.iter().any(|t| t.eq_ignore_ascii_case(UNKNOWN)) {
                skipped += 1;
                return;
            }
            if let Err(e) = graph.add_entry(entry) {
                failure = Some(e);
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }
        if skipped > 0 {
            tracing::debug!(skipped, "skipped n-grams over {UNKNOWN}");
        }
        graph.add_fallback_arcs(self.options.fallback_weight)?;

        let Graph {
            mut fst,
            isyms,
            osyms,
            contexts,
            ..
        } = graph;
        tracing::debug!(
            states = fst.num_states(),
            contexts = contexts.len(),
            input_symbols = isyms.len(),
            output_symbols = osyms.len(),
            "compiled n-gram model"
        );
        drop(contexts);

        tr_sort(&mut fst, ILabelCompare {});
        fst.set_input_symbols(Arc::new(isyms));
        fst.set_output_symbols(Arc::new(osyms));
        SequenceTransducer::new(fst, model.order() as u32, self.options.clone())
    }
}

struct Graph {
    fst: StdFst,
    isyms: SymbolTable,
    osyms: SymbolTable,
    /// Context state per token history; the empty history is the root.
    contexts: HashMap<Vec<String>, StateId>,
    labels: HashMap<String, (Label, Label)>,
    root: StateId,
    end: StateId,
    clamp: f32,
}

impl Graph {
    fn new(clamp: f32) -> Result<Self, FstError> {
        let mut fst = StdFst::new();
        let mut isyms = SymbolTable::new();
        let mut osyms = SymbolTable::new();
        let start_label = isyms.add_symbol(START);
        osyms.add_symbol(START);
        isyms.add_symbol(END);
        osyms.add_symbol(END);

        let initial = fst.add_state();
        fst.set_start(initial)?;
        let root = fst.add_state();
        let after_start = fst.add_state();
        let end = fst.add_state();
        fst.set_final(end, TropicalWeight::one())?;
        fst.add_tr(
            initial,
            Tr::new(start_label, start_label, TropicalWeight::one(), after_start),
        )?;

        let mut contexts = HashMap::new();
        contexts.insert(Vec::new(), root);
        contexts.insert(vec![START.to_string()], after_start);

        Ok(Self {
            fst,
            isyms,
            osyms,
            contexts,
            labels: HashMap::new(),
            root,
            end,
            clamp,
        })
    }

    fn context(&mut self, history: &[String]) -> StateId {
        if let Some(&s) = self.contexts.get(history) {
            return s;
        }
        let s = self.fst.add_state();
        self.contexts.insert(history.to_vec(), s);
        s
    }

    /// Input and output labels of a graphone token.
    fn labels(&mut self, token: &str) -> Result<(Label, Label), FstError> {
        if let Some(&pair) = self.labels.get(token) {
            return Ok(pair);
        }
        let (grapheme, phoneme) = symbols::parse_graphone_token(token)?;
        let ilabel = if grapheme == EPSILON {
            EPS_LABEL
        } else {
            self.isyms.add_symbol(grapheme)
        };
        let olabel = if phoneme == EPSILON {
            EPS_LABEL
        } else {
            self.osyms.add_symbol(phoneme)
        };
        self.labels.insert(token.to_string(), (ilabel, olabel));
        Ok((ilabel, olabel))
    }

    fn emit(&mut self, from: StateId, token: &str, weight: f32, to: StateId) -> Result<(), FstError> {
        let (ilabel, olabel) = self.labels(token)?;
        self.fst.add_tr(from, Tr::new(ilabel, olabel, weight, to))?;
        Ok(())
    }

    fn backoff(&mut self, from: StateId, weight: f32, to: StateId) -> Result<(), FstError> {
        self.fst
            .add_tr(from, Tr::new(EPS_LABEL, EPS_LABEL, weight, to))?;
        Ok(())
    }

    fn add_entry(&mut self, entry: &NgramEntry<'_>) -> Result<(), FstError> {
        let tokens = entry.tokens;
        let n = tokens.len();
        if n == 0 {
            return Ok(());
        }
        let last = tokens[n - 1].as_str();
        let score = to_weight(entry.score, self.clamp);
        let backoff = to_weight(entry.backoff, self.clamp);

        if n == 1 {
            if last == START {
                let from = self.context(tokens);
                self.backoff(from, backoff, self.root)
            } else if last == END {
                self.emit(self.root, END, score, self.end)
            } else {
                let ctx = self.context(tokens);
                self.backoff(ctx, backoff, self.root)?;
                self.emit(self.root, last, score, ctx)
            }
        } else if last == END {
            let from = self.context(&tokens[..n - 1]);
            self.emit(from, END, score, self.end)
        } else if entry.is_last_order {
            let from = self.context(&tokens[..n - 1]);
            let to = self.context(&tokens[1..]);
            self.emit(from, last, score, to)
        } else {
            let ctx = self.context(tokens);
            let shorter = self.context(&tokens[1..]);
            self.backoff(ctx, backoff, shorter)?;
            let from = self.context(&tokens[..n - 1]);
            self.emit(from, last, score, ctx)
        }
    }

    /// Give every constituent of a composite input symbol an arc out of the
    /// root, so that words spelling out a cluster one grapheme at a time
    /// still have a path.
    fn add_fallback_arcs(&mut self, weight: f32) -> Result<(), FstError> {
        let mut covered: HashSet<Label> = self
            .fst
            .get_trs(self.root)?
            .trs()
            .iter()
            .map(|tr| tr.ilabel)
            .collect();

        let composites: Vec<String> = (0..self.isyms.len())
            .filter_map(|l| self.isyms.get_symbol(l as Label))
            .filter(|s| symbols::is_composite(s))
            .map(String::from)
            .collect();

        let mut added = 0usize;
        for composite in &composites {
            for unit in symbols::split_gram(composite) {
                let label = self.isyms.add_symbol(unit);
                if covered.insert(label) {
                    self.fst.add_tr(
                        self.root,
                        Tr::new(label, EPS_LABEL, weight, self.root),
                    )?;
                    added += 1;
                }
            }
        }
        tracing::debug!(added, composites = composites.len(), "added fallback arcs");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ngram::ArpaModel;

    const MODEL: &str = "\
\\data\\
ngram 1=5
ngram 2=3

\\1-grams:
-99 <s> 0
-1.0 </s>
-0.5 A}EY -0.2
-0.5 B}B -0.3
-0.7 P|H}F -0.1

\\2-grams:
-0.1 <s> A}EY
-0.2 A}EY B}B
-0.3 B}B </s>

\\end\\
";

    fn compile(text: &str) -> SequenceTransducer {
        let model = ArpaModel::parse(text).unwrap();
        LmCompiler::default().compile(&model).unwrap()
    }

    #[test]
    fn weight_conversion() {
        assert_eq!(to_weight(0.0, 999.0), 0.0);
        let w = to_weight(-1.0, 999.0);
        assert!((w - std::f32::consts::LN_10).abs() < 1e-6);
        assert_eq!(to_weight(f64::NEG_INFINITY, 999.0), 999.0);
        assert_eq!(to_weight(f64::NAN, 42.0), 42.0);
    }

    #[test]
    fn vocabulary_splits_graphone_sides() {
        let t = compile(MODEL);
        let isyms = t.input_symbols();
        let osyms = t.output_symbols();
        for g in ["A", "B", "P|H", START, END] {
            assert!(isyms.get_label(g).is_some(), "missing input {g}");
        }
        for p in ["EY", "B", "F", START, END] {
            assert!(osyms.get_label(p).is_some(), "missing output {p}");
        }
        assert!(osyms.get_label("A").is_none());
        assert_eq!(isyms.get_label(EPSILON), Some(EPS_LABEL));
    }

    #[test]
    fn cluster_constituents_get_fallback_arcs() {
        let t = compile(MODEL);
        let isyms = t.input_symbols();
        let p = isyms.get_label("P").unwrap();
        let h = isyms.get_label("H").unwrap();

        let fst = t.fst();
        let mut fallback = Vec::new();
        for s in fst.states_iter() {
            for tr in fst.get_trs(s).unwrap().trs() {
                if tr.ilabel == p || tr.ilabel == h {
                    fallback.push((s, tr.olabel, *tr.weight.value(), tr.nextstate));
                }
            }
        }
        assert_eq!(fallback.len(), 2);
        for (s, olabel, w, next) in fallback {
            assert_eq!(s, next);
            assert_eq!(olabel, EPS_LABEL);
            assert_eq!(w, 99.0);
        }
    }

    #[test]
    fn arcs_are_input_sorted() {
        let t = compile(MODEL);
        let fst = t.fst();
        for s in fst.states_iter() {
            let trs = fst.get_trs(s).unwrap();
            assert!(trs.trs().windows(2).all(|w| w[0].ilabel <= w[1].ilabel));
        }
    }

    #[test]
    fn single_final_state() {
        let t = compile(MODEL);
        let fst = t.fst();
        let finals: Vec<_> = fst
            .states_iter()
            .filter(|&s| fst.is_final(s).unwrap())
            .collect();
        assert_eq!(finals.len(), 1);
        assert_eq!(
            fst.final_weight(finals[0]).unwrap(),
            Some(TropicalWeight::one())
        );
        assert_eq!(fst.num_trs(finals[0]).unwrap(), 0);
    }

    #[test]
    fn reject_wrong_sentinels() {
        let model = ArpaModel::parse(MODEL)
            .unwrap()
            .with_sentinels("<S>", END);
        let err = LmCompiler::default().compile(&model).unwrap_err();
        assert!(matches!(err, FstError::SentinelMismatch { which: "start", .. }));
    }

    #[test]
    fn reject_unigram_model() {
        let text = "\\data\\\nngram 1=2\n\n\\1-grams:\n-1 </s>\n-1 A}AH\n\n\\end\\\n";
        let model = ArpaModel::parse(text).unwrap();
        assert!(matches!(
            LmCompiler::default().compile(&model),
            Err(FstError::OrderTooLow(1))
        ));
    }

    #[test]
    fn unknown_token_is_skipped() {
        let text = MODEL
            .replace("ngram 1=5", "ngram 1=7")
            .replace("-1.0 </s>\n", "-1.0 </s>\n-1.5 <unk> 0\n-1.5 <UNK>\n");
        let with_unk = compile(&text);
        let plain = compile(MODEL);
        assert!(with_unk.input_symbols().get_label(UNKNOWN).is_none());
        assert_eq!(with_unk.fst().num_states(), plain.fst().num_states());
        assert_eq!(with_unk.input_symbols().len(), plain.input_symbols().len());
    }

    #[test]
    fn reject_malformed_token() {
        let text = MODEL.replace("-0.5 B}B -0.3", "-0.5 BB -0.3");
        let model = ArpaModel::parse(&text).unwrap();
        assert!(matches!(
            LmCompiler::default().compile(&model),
            Err(FstError::Core(_))
        ));
    }
}
