// Reader for pronunciation dictionaries used as training corpora.
//
// One pair per line: `SPELLING<TAB>PH O NE MES`. A spelling without spaces
// is split into characters; a spelling with spaces is taken field by field.
// Blank lines and lines starting with `#` are skipped.

use std::io::BufRead;

use g2p_core::Word;

use crate::AlignError;

/// Parse a single corpus line. Returns `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str, line_no: usize) -> Result<Option<(Word, Word)>, AlignError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let Some((spelling, pron)) = trimmed.split_once('\t') else {
        return Err(AlignError::Corpus {
            line: line_no,
            reason: "expected `spelling<TAB>phonemes`".to_string(),
        });
    };

    let spelling = spelling.trim();
    let x = if spelling.contains(char::is_whitespace) {
        Word::from_space_separated(spelling)
    } else {
        Word::from_chars(spelling)
    };
    let x = x.map_err(|e| AlignError::Corpus {
        line: line_no,
        reason: format!("spelling: {e}"),
    })?;
    let y = Word::from_space_separated(pron).map_err(|e| AlignError::Corpus {
        line: line_no,
        reason: format!("pronunciation: {e}"),
    })?;
    Ok(Some((x, y)))
}

/// Read every pair from `reader`. Line numbers in errors are 1-based.
pub fn read_pairs<R: BufRead>(reader: R) -> Result<Vec<(Word, Word)>, AlignError> {
    let mut pairs = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| AlignError::Corpus {
            line: i + 1,
            reason: e.to_string(),
        })?;
        if let Some(pair) = parse_line(&line, i + 1)? {
            pairs.push(pair);
        }
    }
    Ok(pairs)
}
