//! Property-based tests for the alignment engine and its beam table.
//!
//! Random word pairs are aligned under a table built from all graphones the
//! pair could use; every returned alignment must reproduce both words.

use g2p_align::beam::NO_PREDECESSOR;
use g2p_align::{AlignerTrainer, BeamEntry, BeamTable};
use g2p_core::{GramOptions, Word};
use proptest::prelude::*;

fn arb_word(alphabet: &'static [&'static str], max_len: usize) -> impl Strategy<Value = Word> {
    prop::collection::vec(prop::sample::select(alphabet), 1..=max_len)
        .prop_map(|grams| Word::new(grams).unwrap())
}

fn arb_options() -> impl Strategy<Value = GramOptions> {
    (1usize..=2, 1usize..=2, any::<bool>(), any::<bool>()).prop_map(
        |(max_x, max_y, x_eps, y_eps)| GramOptions {
            max_x_gram: max_x,
            max_y_gram: max_y,
            include_x_to_epsilon: x_eps,
            include_epsilon_to_y: y_eps,
            ..GramOptions::default()
        },
    )
}

const GRAPHEMES: &[&str] = &["A", "B", "C", "H"];
const PHONEMES: &[&str] = &["AH", "B", "K", "CH"];

proptest! {
    #[test]
    fn alignments_are_bounded_and_sorted(
        x in arb_word(GRAPHEMES, 5),
        y in arb_word(PHONEMES, 5),
        opts in arb_options(),
        k in 1usize..6,
    ) {
        let trainer = AlignerTrainer::new(opts).unwrap();
        let corpus = vec![(x.clone(), y.clone())];
        let probs = trainer.maximize(&trainer.initial_counts(&corpus));
        let aligner = g2p_align::Aligner::new(probs, trainer.options().clone());

        let result = aligner.align(&x, &y, k);
        prop_assert!(result.len() <= k);
        for pair in result.windows(2) {
            prop_assert!(pair[0].score() >= pair[1].score());
        }
    }

    #[test]
    fn alignments_reproduce_both_words(
        x in arb_word(GRAPHEMES, 5),
        y in arb_word(PHONEMES, 5),
        opts in arb_options(),
        k in 1usize..6,
    ) {
        let trainer = AlignerTrainer::new(opts).unwrap();
        let corpus = vec![(x.clone(), y.clone())];
        let probs = trainer.maximize(&trainer.initial_counts(&corpus));
        let aligner = g2p_align::Aligner::new(probs, trainer.options().clone());

        for alignment in aligner.align(&x, &y, k) {
            let xs: Vec<String> = alignment.x_units().into_iter().map(String::from).collect();
            let ys: Vec<String> = alignment.y_units().into_iter().map(String::from).collect();
            prop_assert_eq!(xs.as_slice(), x.grams());
            prop_assert_eq!(ys.as_slice(), y.grams());
        }
    }

    #[test]
    fn beam_cell_never_exceeds_capacity(
        capacity in 0usize..6,
        scores in prop::collection::vec(-100.0f64..0.0, 0..40),
    ) {
        let mut table = BeamTable::linear(1, capacity);
        for (i, score) in scores.iter().enumerate() {
            table.offer((0, 0), BeamEntry::new(*score, 1, 0, i));
            prop_assert!(table.len_at((0, 0)) <= capacity);
        }
    }

    #[test]
    fn beam_keeps_the_best_scores(
        capacity in 1usize..6,
        scores in prop::collection::vec(-100.0f64..0.0, 1..40),
    ) {
        let mut table = BeamTable::linear(1, capacity);
        for score in &scores {
            table.offer((0, 0), BeamEntry::new(*score, 1, 0, NO_PREDECESSOR));
        }
        let mut expected = scores.clone();
        expected.sort_by(|a, b| b.total_cmp(a));
        expected.truncate(capacity);
        let kept: Vec<f64> = table.entries((0, 0)).iter().map(|e| e.score).collect();
        prop_assert_eq!(kept, expected);
    }
}

#[test]
fn identical_inputs_align_identically() {
    let opts = GramOptions::default();
    let trainer = AlignerTrainer::new(opts).unwrap();
    let x = Word::from_chars("CHAB").unwrap();
    let y = Word::from_space_separated("CH AH B").unwrap();
    let corpus = vec![(x.clone(), y.clone())];
    let probs = trainer.maximize(&trainer.initial_counts(&corpus));
    let aligner = g2p_align::Aligner::new(probs, trainer.options().clone());
    assert_eq!(aligner.align(&x, &y, 4), aligner.align(&x, &y, 4));
}
