// g2p-translate: Print the best pronunciations of words.
//
// Reads words from the command line, or from stdin (one per line), and
// prints `WORD<TAB>COST<TAB>PHONEMES` for each of the top-N results.
//
// Usage:
//   g2p-translate [-c CONFIG] [-n N] MODEL [WORD...]
//
// Options:
//   -c, --config PATH   TOML configuration (default: built-in)
//   -n, --nbest N       Pronunciations per word (default: 1)
//   -h, --help          Print help

use std::io::{self, BufRead, Write};

use g2p_fst::{FstError, SequenceTransducer};

fn translate_word(
    text: &str,
    transducer: &SequenceTransducer,
    nbest: usize,
    out: &mut impl Write,
) -> io::Result<()> {
    let word = match g2p_cli::parse_word(text) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("warning: skipping {e}");
            return Ok(());
        }
    };
    match transducer.translate(&word, nbest) {
        Ok(results) if results.is_empty() => writeln!(out, "{text}\t-\t(no pronunciation)"),
        Ok(results) => {
            for r in &results {
                writeln!(out, "{text}\t{:.4}\t{}", r.cost, r.to_line())?;
            }
            Ok(())
        }
        Err(FstError::InvalidInput { symbol }) => {
            eprintln!("warning: {text}: grapheme {symbol:?} is not in the model");
            Ok(())
        }
        Err(e) => g2p_cli::fatal(&format!("{text}: {e}")),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if g2p_cli::wants_help(&args) {
        println!("g2p-translate: Print the best pronunciations of words.");
        println!();
        println!("Usage: g2p-translate [-c CONFIG] [-n N] MODEL [WORD...]");
        println!();
        println!("If WORD arguments are given, translates each word.");
        println!("Otherwise reads words from stdin (one per line).");
        println!();
        println!("Options:");
        println!("  -c, --config PATH  TOML configuration (default: built-in)");
        println!("  -n, --nbest N      Pronunciations per word (default: 1)");
        println!("  -h, --help         Print this help");
        return;
    }

    g2p_cli::init_logging();
    let (config_path, args) = g2p_cli::parse_option(&args, "--config", "-c");
    let (nbest, args) = g2p_cli::parse_option(&args, "--nbest", "-n");
    let nbest = match nbest {
        Some(v) => g2p_cli::parse_count(&v, "--nbest").unwrap_or_else(|e| g2p_cli::fatal(&e)),
        None => 1,
    };
    let Some((model_path, words)) = args.split_first() else {
        g2p_cli::fatal("expected a MODEL argument (see --help)");
    };

    let config = g2p_cli::load_config(config_path.as_deref()).unwrap_or_else(|e| g2p_cli::fatal(&e));
    let transducer = SequenceTransducer::read(model_path, config.decoder)
        .unwrap_or_else(|e| g2p_cli::fatal(&format!("{model_path}: {e}")));

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    let written = if words.is_empty() {
        let stdin = io::stdin();
        let mut result = Ok(());
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("error reading stdin: {e}");
                    break;
                }
            };
            let word = line.trim();
            if word.is_empty() {
                continue;
            }
            result = translate_word(word, &transducer, nbest, &mut out);
            if result.is_err() {
                break;
            }
        }
        result
    } else {
        words
            .iter()
            .try_for_each(|w| translate_word(w, &transducer, nbest, &mut out))
    };

    if let Err(e) = written.and_then(|()| out.flush()) {
        g2p_cli::fatal(&format!("failed to write output: {e}"));
    }
}
