// g2p-align: Train a graphone aligner and print aligned training data.
//
// Reads a pronunciation dictionary (`SPELLING<TAB>PH O NE MES` per line),
// estimates graphone probabilities by EM, and prints each pair's best
// alignment as a line of graphone tokens, ready for an n-gram LM trainer.
//
// Usage:
//   g2p-align [-c CONFIG] [-k N] [--scores] CORPUS
//
// Options:
//   -c, --config PATH   TOML configuration (default: built-in)
//   -k, --nbest N       Alignments printed per pair (default: 1)
//   --scores            Append the alignment score to each line
//   -h, --help          Print help

use std::fs::File;
use std::io::{self, BufReader, Write};

use g2p_align::AlignerTrainer;
use g2p_align::corpus::read_pairs;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if g2p_cli::wants_help(&args) {
        println!("g2p-align: Train an aligner and print graphone-aligned pairs.");
        println!();
        println!("Usage: g2p-align [-c CONFIG] [-k N] [--scores] CORPUS");
        println!();
        println!("CORPUS holds one `SPELLING<TAB>PHONEMES` pair per line.");
        println!();
        println!("Options:");
        println!("  -c, --config PATH  TOML configuration (default: built-in)");
        println!("  -k, --nbest N      Alignments printed per pair (default: 1)");
        println!("  --scores           Append the alignment score to each line");
        println!("  -h, --help         Print this help");
        return;
    }

    g2p_cli::init_logging();
    let (config_path, args) = g2p_cli::parse_option(&args, "--config", "-c");
    let (nbest, args) = g2p_cli::parse_option(&args, "--nbest", "-k");
    let nbest = match nbest {
        Some(v) => g2p_cli::parse_count(&v, "--nbest").unwrap_or_else(|e| g2p_cli::fatal(&e)),
        None => 1,
    };
    let scores = args.iter().any(|a| a == "--scores");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with('-')).collect();
    let [corpus_path] = positional.as_slice() else {
        g2p_cli::fatal("expected exactly one CORPUS argument (see --help)");
    };

    let config = g2p_cli::load_config(config_path.as_deref()).unwrap_or_else(|e| g2p_cli::fatal(&e));
    let file = File::open(corpus_path.as_str())
        .unwrap_or_else(|e| g2p_cli::fatal(&format!("failed to open {corpus_path}: {e}")));
    let pairs = read_pairs(BufReader::new(file)).unwrap_or_else(|e| g2p_cli::fatal(&e.to_string()));

    let trainer = AlignerTrainer::new(config.alignment).unwrap_or_else(|e| g2p_cli::fatal(&e.to_string()));
    let (aligner, report) = trainer
        .train(&pairs)
        .unwrap_or_else(|e| g2p_cli::fatal(&e.to_string()));
    eprintln!(
        "trained on {} pairs: {} iterations, delta {:.3e}{}",
        pairs.len(),
        report.iterations,
        report.final_delta,
        if report.converged { "" } else { " (not converged)" }
    );

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let mut unaligned = 0usize;
    for ((x, y), alignments) in pairs.iter().zip(aligner.align_batch(&pairs, nbest)) {
        if alignments.is_empty() {
            tracing::warn!(spelling = %x, pronunciation = %y, "no alignment");
            unaligned += 1;
            continue;
        }
        for alignment in &alignments {
            let written = if scores {
                writeln!(out, "{}\t{:.4}", alignment.to_token_line(), alignment.score())
            } else {
                writeln!(out, "{}", alignment.to_token_line())
            };
            if let Err(e) = written {
                g2p_cli::fatal(&format!("failed to write output: {e}"));
            }
        }
    }
    if let Err(e) = out.flush() {
        g2p_cli::fatal(&format!("failed to write output: {e}"));
    }
    if unaligned > 0 {
        eprintln!("{unaligned} pairs had no alignment");
    }
}
