// Reserved symbols and the textual encoding of grams and graphones.
//
// A gram spanning several units is written as its units joined by
// GRAM_SEPARATOR ("P|H"). A graphone token joins its grapheme side and
// phoneme side with GRAPHONE_SEPARATOR ("P|H}F"); an empty side is written
// as EPSILON ("E}<eps>").

use crate::CoreError;

/// Start-of-word sentinel shared by the entry acceptor and the n-gram model.
pub const START: &str = "<s>";

/// End-of-word sentinel shared by the entry acceptor and the n-gram model.
pub const END: &str = "</s>";

/// The empty gram: an insertion or deletion on one side of a graphone.
pub const EPSILON: &str = "<eps>";

/// Joins constituent units of a multi-unit gram.
pub const GRAM_SEPARATOR: char = '|';

/// Joins the grapheme side and the phoneme side of a graphone token.
pub const GRAPHONE_SEPARATOR: char = '}';

/// Backoff-skip marker. Reserved; never emitted in decoded output.
pub const SKIP: &str = "_";

/// Returns `true` for symbols that carry cost but never appear in output.
pub fn is_marker(symbol: &str) -> bool {
    symbol == START
        || symbol == END
        || symbol == EPSILON
        || symbol == SKIP
        || (symbol.len() == 1 && symbol.starts_with(GRAM_SEPARATOR))
}

/// Join units into a single gram symbol.
pub fn join_gram<S: AsRef<str>>(units: &[S]) -> String {
    let mut out = String::new();
    for (i, unit) in units.iter().enumerate() {
        if i > 0 {
            out.push(GRAM_SEPARATOR);
        }
        out.push_str(unit.as_ref());
    }
    out
}

/// Split a gram symbol into its constituent units.
///
/// The epsilon gram splits into no units.
pub fn split_gram(gram: &str) -> Vec<&str> {
    if gram == EPSILON || gram.is_empty() {
        return Vec::new();
    }
    gram.split(GRAM_SEPARATOR).collect()
}

/// Whether `gram` is a composite of two or more units.
pub fn is_composite(gram: &str) -> bool {
    gram != EPSILON && gram.len() > 1 && gram.contains(GRAM_SEPARATOR)
}

/// Encode a graphone as a single token for the joint n-gram model.
pub fn graphone_token(grapheme: &str, phoneme: &str) -> String {
    let mut token = String::with_capacity(grapheme.len() + phoneme.len() + 1);
    token.push_str(grapheme);
    token.push(GRAPHONE_SEPARATOR);
    token.push_str(phoneme);
    token
}

/// Split a graphone token into its (grapheme, phoneme) sides.
///
/// The start and end sentinels stand for themselves on both sides.
pub fn parse_graphone_token(token: &str) -> Result<(&str, &str), CoreError> {
    if token == START || token == END {
        return Ok((token, token));
    }
    let Some((grapheme, phoneme)) = token.split_once(GRAPHONE_SEPARATOR) else {
        return Err(CoreError::InvalidGraphone {
            token: token.to_string(),
            reason: "missing graphone separator",
        });
    };
    if grapheme.is_empty() || phoneme.is_empty() {
        return Err(CoreError::InvalidGraphone {
            token: token.to_string(),
            reason: "empty side (use <eps>)",
        });
    }
    if grapheme == EPSILON && phoneme == EPSILON {
        return Err(CoreError::InvalidGraphone {
            token: token.to_string(),
            reason: "both sides are epsilon",
        });
    }
    Ok((grapheme, phoneme))
}
