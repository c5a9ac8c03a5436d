// EM estimation of the graphone probability table.
//
// Initialization counts every graphone any training pair could use under
// the gram options. Each iteration then aligns the whole corpus with the
// current table (E-step, in parallel), collects the K best alignments per
// pair weighted by their relative likelihood, and renormalizes the counts
// with the configured maximizer (M-step).

use g2p_core::symbols::EPSILON;
use g2p_core::{GramOptions, Maximizer, ProbTable, Word};
use rayon::prelude::*;
use tracing::{debug, debug_span, info};

use crate::AlignError;
use crate::aligner::Aligner;

/// Summary of a finished training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub iterations: usize,
    /// Summed absolute probability change of the last iteration.
    pub final_delta: f64,
    pub converged: bool,
    /// Pairs without any alignment in the last E-step.
    pub unaligned_pairs: usize,
}

pub struct AlignerTrainer {
    opts: GramOptions,
}

impl AlignerTrainer {
    pub fn new(opts: GramOptions) -> Result<Self, AlignError> {
        opts.validate()?;
        Ok(Self { opts })
    }

    pub fn options(&self) -> &GramOptions {
        &self.opts
    }

    /// Run EM until the table stops changing or the iteration cap is hit.
    pub fn train(&self, corpus: &[(Word, Word)]) -> Result<(Aligner, TrainingReport), AlignError> {
        let _span = debug_span!("train", pairs = corpus.len()).entered();
        if corpus.is_empty() {
            return Err(AlignError::EmptyCorpus);
        }

        let mut probs = self.maximize(&self.initial_counts(corpus));
        debug!(graphones = probs.len(), "initialized");

        let mut report = TrainingReport {
            iterations: 0,
            final_delta: f64::INFINITY,
            converged: false,
            unaligned_pairs: 0,
        };

        while report.iterations < self.opts.max_iterations {
            let aligner = Aligner::new(probs, self.opts.clone());
            let (counts, unaligned) = self.expectation(&aligner, corpus);
            if counts.is_empty() {
                return Err(AlignError::NoViableAlignments);
            }
            let next = self.maximize(&counts);
            let delta = next.abs_delta(aligner.probs());

            report.iterations += 1;
            report.final_delta = delta;
            report.unaligned_pairs = unaligned;
            info!(
                iteration = report.iterations,
                delta,
                unaligned,
                graphones = next.len(),
                "em iteration"
            );

            probs = next;
            if delta < self.opts.prob_delta_threshold {
                report.converged = true;
                break;
            }
        }

        Ok((Aligner::new(probs, self.opts.clone()), report))
    }

    /// One count for every graphone occurrence that fits inside some pair.
    pub fn initial_counts(&self, corpus: &[(Word, Word)]) -> ProbTable {
        let mut counts = ProbTable::new();
        for (x, y) in corpus {
            self.enumerate_graphones(x, y, |xg, yg| counts.add(xg, yg, 1.0));
        }
        counts
    }

    fn enumerate_graphones(&self, x: &Word, y: &Word, mut visit: impl FnMut(&str, &str)) {
        let opts = &self.opts;
        let x_len = x.unigram_count();
        let y_len = y.unigram_count();
        for xx in 0..=x_len {
            for yy in 0..=y_len {
                if opts.include_x_to_epsilon {
                    for i in 1..=opts.max_x_gram {
                        if let Some(xg) = x.gram(xx, i) {
                            visit(&xg, EPSILON);
                        }
                    }
                }
                if opts.include_epsilon_to_y {
                    for j in 1..=opts.max_y_gram {
                        if let Some(yg) = y.gram(yy, j) {
                            visit(EPSILON, &yg);
                        }
                    }
                }
                for (i, j) in opts.joint_steps() {
                    if let (Some(xg), Some(yg)) = (x.gram(xx, i), y.gram(yy, j)) {
                        visit(&xg, &yg);
                    }
                }
            }
        }
    }

    /// Expected graphone counts under `aligner`, plus the number of pairs
    /// that had no alignment.
    fn expectation(&self, aligner: &Aligner, corpus: &[(Word, Word)]) -> (ProbTable, usize) {
        // Per-pair results are collected in corpus order so the summation
        // order, and thus the trained table, does not depend on scheduling.
        let per_pair: Vec<Vec<(String, String, f64)>> = corpus
            .par_iter()
            .map(|(x, y)| {
                let alignments = aligner.align(x, y, self.opts.training_k);
                let Some(best) = alignments.first().map(|a| a.score()) else {
                    return Vec::new();
                };
                let weights: Vec<f64> = alignments
                    .iter()
                    .map(|a| (a.score() - best).exp2())
                    .collect();
                let norm: f64 = weights.iter().sum();
                alignments
                    .iter()
                    .zip(weights)
                    .flat_map(|(a, w)| {
                        a.graphones()
                            .iter()
                            .map(move |g| (g.grapheme.clone(), g.phoneme.clone(), w / norm))
                    })
                    .collect()
            })
            .collect();

        let mut counts = ProbTable::new();
        let mut unaligned = 0;
        for pair in &per_pair {
            if pair.is_empty() {
                unaligned += 1;
            }
            for (xg, yg, w) in pair {
                counts.add(xg, yg, *w);
            }
        }
        (counts, unaligned)
    }

    /// Normalize counts into probabilities.
    pub fn maximize(&self, counts: &ProbTable) -> ProbTable {
        let mut probs = ProbTable::new();
        match self.opts.maximizer {
            Maximizer::Joint => {
                let total = counts.total();
                if total > 0.0 {
                    for (x, y, c) in counts.iter() {
                        probs.set(x, y, c / total);
                    }
                }
            }
            Maximizer::Conditional => {
                let rows = counts.row_sums();
                for (x, y, c) in counts.iter() {
                    let row = rows.get(x).copied().unwrap_or(0.0);
                    if row > 0.0 {
                        probs.set(x, y, c / row);
                    }
                }
            }
        }
        probs
    }
}
