// g2p-cli: shared utilities for CLI tools.

use std::process;

use g2p_core::{Config, Word};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `G2P_LOG=debug`.
pub const LOG_ENV: &str = "G2P_LOG";

/// Environment variable naming a TOML configuration file.
pub const CONFIG_ENV: &str = "G2P_CONFIG";

/// Install the stderr log subscriber. Defaults to warnings only.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load settings from `path`, or from `G2P_CONFIG` when no path is given.
/// Without either, the built-in defaults apply.
pub fn load_config(path: Option<&str>) -> Result<Config, String> {
    let path = match path {
        Some(p) => p.to_string(),
        None => match std::env::var(CONFIG_ENV) {
            Ok(p) => p,
            Err(_) => return Ok(Config::default()),
        },
    };
    let text =
        std::fs::read_to_string(&path).map_err(|e| format!("failed to read {path}: {e}"))?;
    Config::from_toml_str(&text).map_err(|e| format!("{path}: {e}"))
}

/// Pull `--long=VALUE`, `--long VALUE` or `-s VALUE` out of `args`.
///
/// Returns `(value, remaining_args)`. The last occurrence wins.
pub fn parse_option(args: &[String], long: &str, short: &str) -> (Option<String>, Vec<String>) {
    let mut value = None;
    let mut remaining = Vec::new();
    let mut skip_next = false;
    let with_eq = format!("{long}=");

    for (i, arg) in args.iter().enumerate() {
        if skip_next {
            skip_next = false;
            continue;
        }
        if let Some(val) = arg.strip_prefix(&with_eq) {
            value = Some(val.to_string());
        } else if arg == long || arg == short {
            if i + 1 < args.len() {
                value = Some(args[i + 1].clone());
                skip_next = true;
            } else {
                fatal(&format!("{arg} requires a value"));
            }
        } else {
            remaining.push(arg.clone());
        }
    }

    (value, remaining)
}

/// Parse a positive count given to `flag`.
pub fn parse_count(value: &str, flag: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("invalid number for {flag}: {value:?}")),
    }
}

/// A spelling without spaces is one grapheme per character; with spaces,
/// one grapheme per field.
pub fn parse_word(text: &str) -> Result<Word, String> {
    let word = if text.contains(char::is_whitespace) {
        Word::from_space_separated(text)
    } else {
        Word::from_chars(text)
    };
    word.map_err(|e| format!("{text:?}: {e}"))
}

/// Print an error message and exit with code 1.
pub fn fatal(msg: &str) -> ! {
    eprintln!("error: {msg}");
    process::exit(1);
}

/// Check if `--help` or `-h` is in the args.
pub fn wants_help(args: &[String]) -> bool {
    args.iter().any(|a| a == "--help" || a == "-h")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn option_with_separate_value() {
        let (value, rest) = parse_option(&args(&["-c", "g2p.toml", "model"]), "--config", "-c");
        assert_eq!(value.as_deref(), Some("g2p.toml"));
        assert_eq!(rest, args(&["model"]));
    }

    #[test]
    fn option_with_equals() {
        let (value, rest) = parse_option(&args(&["a", "--config=x.toml", "b"]), "--config", "-c");
        assert_eq!(value.as_deref(), Some("x.toml"));
        assert_eq!(rest, args(&["a", "b"]));
    }

    #[test]
    fn option_absent() {
        let (value, rest) = parse_option(&args(&["a", "b"]), "--top", "-n");
        assert!(value.is_none());
        assert_eq!(rest.len(), 2);
    }

    #[test]
    fn count_must_be_positive() {
        assert_eq!(parse_count("3", "-n"), Ok(3));
        assert!(parse_count("0", "-n").is_err());
        assert!(parse_count("x", "-n").is_err());
    }

    #[test]
    fn word_splitting() {
        assert_eq!(parse_word("CAT").unwrap().grams(), &["C", "A", "T"]);
        assert_eq!(parse_word("PH O").unwrap().grams(), &["PH", "O"]);
        assert!(parse_word("").is_err());
    }

    #[test]
    fn help_flag() {
        assert!(wants_help(&args(&["x", "-h"])));
        assert!(!wants_help(&args(&["x"])));
    }

    #[test]
    fn config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g2p.toml");
        std::fs::write(&path, "[decoder]\nnbest_beam = 7\n").unwrap();
        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.decoder.nbest_beam, 7);
        assert_eq!(config.alignment, g2p_core::GramOptions::default());
    }

    #[test]
    fn invalid_config_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[alignment]\nmin_x_gram = 0\n").unwrap();
        let err = load_config(path.to_str()).unwrap_err();
        assert!(err.contains("bad.toml"));
    }
}
