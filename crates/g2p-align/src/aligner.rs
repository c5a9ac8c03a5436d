// Viterbi alignment search over a 2-D bounded beam table.
//
// Coordinates are (graphemes consumed, phonemes consumed). Cells are filled
// with the grapheme index as the outer loop and the phoneme index as the
// inner loop, so every predecessor a transition reads from is final before
// it is extended.

use g2p_core::symbols::EPSILON;
use g2p_core::{Alignment, GramOptions, Graphone, ProbTable, Word};
use rayon::prelude::*;
use tracing::{debug, debug_span};

use crate::beam::{BeamEntry, BeamTable, Coord, Transition};

/// Alignments scoring below this are treated as "no viable alignment".
pub const SCORE_FLOOR: f64 = -1.0e12;

/// Finds the K best graphone alignments of word pairs under a fixed
/// probability table.
///
/// The aligner is read-only; every call builds its own beam table, so one
/// aligner can serve many threads.
#[derive(Debug, Clone)]
pub struct Aligner {
    probs: ProbTable,
    opts: GramOptions,
}

impl Aligner {
    pub fn new(probs: ProbTable, opts: GramOptions) -> Self {
        Self { probs, opts }
    }

    pub fn probs(&self) -> &ProbTable {
        &self.probs
    }

    pub fn options(&self) -> &GramOptions {
        &self.opts
    }

    /// Up to `k` alignments of `x` with `y`, best first.
    ///
    /// An empty result means no alignment reaches the end of both words
    /// with a usable score.
    pub fn align(&self, x: &Word, y: &Word, k: usize) -> Vec<Alignment> {
        let x_len = x.unigram_count();
        let y_len = y.unigram_count();
        let _span = debug_span!("align", x_len, y_len, k).entered();
        if k == 0 {
            return Vec::new();
        }

        let table = self.fill(x, y, k);
        let end = (x_len, y_len);
        let mut alignments: Vec<Alignment> = table
            .entries(end)
            .into_iter()
            .filter(|e| e.score >= SCORE_FLOOR)
            .map(|e| reconstruct(&table, x, y, end, e))
            .collect();
        alignments.sort_by(|a, b| b.score().total_cmp(&a.score()));

        debug!(
            result_count = alignments.len(),
            best_score = alignments.first().map(Alignment::score)
        );
        alignments
    }

    /// Align every pair in parallel. Results keep the input order.
    pub fn align_batch(&self, pairs: &[(Word, Word)], k: usize) -> Vec<Vec<Alignment>> {
        pairs.par_iter().map(|(x, y)| self.align(x, y, k)).collect()
    }

    fn fill(&self, x: &Word, y: &Word, k: usize) -> BeamTable {
        let x_len = x.unigram_count();
        let y_len = y.unigram_count();
        let opts = &self.opts;
        let mut table = BeamTable::new(x_len + 1, y_len + 1, k);
        table.seed((0, 0));

        for xx in 0..=x_len {
            for yy in 0..=y_len {
                if xx == 0 && yy == 0 {
                    continue;
                }

                if opts.include_x_to_epsilon {
                    for i in 1..=opts.max_x_gram.min(xx) {
                        if let Some(gram) = x.gram(xx - i, i) {
                            let p = self.probs.prob(&gram, EPSILON);
                            self.extend(&mut table, (xx, yy), (xx - i, yy), p, i, 0);
                        }
                    }
                }

                if opts.include_epsilon_to_y {
                    for j in 1..=opts.max_y_gram.min(yy) {
                        if let Some(gram) = y.gram(yy - j, j) {
                            let p = self.probs.prob(EPSILON, &gram);
                            self.extend(&mut table, (xx, yy), (xx, yy - j), p, 0, j);
                        }
                    }
                }

                for (i, j) in opts.joint_steps() {
                    if i > xx || j > yy {
                        continue;
                    }
                    if let (Some(xg), Some(yg)) = (x.gram(xx - i, i), y.gram(yy - j, j)) {
                        let p = self.probs.prob(&xg, &yg);
                        self.extend(&mut table, (xx, yy), (xx - i, yy - j), p, i, j);
                    }
                }
            }
        }
        table
    }

    fn extend(
        &self,
        table: &mut BeamTable,
        dst: Coord,
        src: Coord,
        prob: f64,
        x_step: usize,
        y_step: usize,
    ) {
        // A zero-mass transition can only produce paths below the floor.
        if prob <= 0.0 || table.len_at(src) == 0 {
            return;
        }
        let score = prob.log2() * x_step.max(y_step) as f64;
        table.extend_path(dst, src, Transition { score, x_step, y_step });
    }
}

/// Walk back-references from `entry` at `end` to the origin cell.
fn reconstruct(table: &BeamTable, x: &Word, y: &Word, end: Coord, entry: BeamEntry) -> Alignment {
    let score = entry.score;
    let mut graphones = Vec::new();
    let mut coord = end;
    let mut current = entry;

    while !current.is_origin() {
        let (xx, yy) = coord;
        let grapheme = side_gram(x, xx, current.x_step);
        let phoneme = side_gram(y, yy, current.y_step);
        graphones.push(Graphone::new(grapheme, phoneme));

        let prev = (xx - current.x_step, yy - current.y_step);
        current = match table.find(prev, current.back_id) {
            Some(e) => e,
            None => panic!(
                "beam table corrupted: entry {} missing at ({}, {})",
                current.back_id, prev.0, prev.1
            ),
        };
        coord = prev;
    }

    graphones.reverse();
    Alignment::new(graphones, score)
}

fn side_gram(word: &Word, end: usize, step: usize) -> String {
    if step == 0 {
        return EPSILON.to_string();
    }
    match word.gram(end - step, step) {
        Some(gram) => gram,
        None => panic!("beam step of {step} ending at {end} exceeds word `{word}`"),
    }
}
