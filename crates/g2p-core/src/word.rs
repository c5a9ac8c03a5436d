// Word: an immutable, non-empty sequence of grams.

use std::fmt;

use crate::CoreError;
use crate::symbols;

/// An ordered sequence of graphemes or phonemes.
///
/// Each element is kept as written; adjacent grams are never merged, so
/// `["A", "E"]` and `["AE"]` are different words.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Word {
    grams: Vec<String>,
}

impl Word {
    /// Build a word from explicit grams.
    ///
    /// A gram may not be a sentinel or the epsilon symbol, and may not
    /// contain a separator or whitespace.
    pub fn new<I, S>(grams: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let grams: Vec<String> = grams.into_iter().map(Into::into).collect();
        if grams.is_empty() || grams.iter().any(String::is_empty) {
            return Err(CoreError::EmptyWord);
        }
        if let Some(gram) = grams.iter().find(|g| is_reserved(g)) {
            return Err(CoreError::ReservedGram { gram: gram.clone() });
        }
        Ok(Self { grams })
    }

    /// One gram per character, e.g. a spelled word `"CAT"`.
    pub fn from_chars(text: &str) -> Result<Self, CoreError> {
        Self::new(text.chars().map(String::from))
    }

    /// One gram per whitespace-separated field, e.g. `"K AE T"`.
    pub fn from_space_separated(text: &str) -> Result<Self, CoreError> {
        Self::new(text.split_whitespace())
    }

    /// Number of unigrams.
    pub fn unigram_count(&self) -> usize {
        self.grams.len()
    }

    /// Gram at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.grams.get(index).map(String::as_str)
    }

    /// All grams, in order.
    pub fn grams(&self) -> &[String] {
        &self.grams
    }

    /// Contiguous run of `len` grams starting at `start`, joined into one
    /// gram symbol.
    ///
    /// Returns `None` when the run falls outside the word.
    pub fn gram(&self, start: usize, len: usize) -> Option<String> {
        let end = start.checked_add(len)?;
        if len == 0 || end > self.grams.len() {
            return None;
        }
        Some(symbols::join_gram(&self.grams[start..end]))
    }

    /// All n-grams of length `n`, left to right.
    pub fn ngrams(&self, n: usize) -> impl Iterator<Item = String> + '_ {
        let count = if n == 0 {
            0
        } else {
            (self.grams.len() + 1).saturating_sub(n)
        };
        (0..count).filter_map(move |start| self.gram(start, n))
    }
}

fn is_reserved(gram: &str) -> bool {
    gram == symbols::START
        || gram == symbols::END
        || gram == symbols::EPSILON
        || gram.contains(|c: char| {
            c == symbols::GRAM_SEPARATOR || c == symbols::GRAPHONE_SEPARATOR || c.is_whitespace()
        })
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.grams.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_empty() {
        assert!(matches!(Word::from_chars(""), Err(CoreError::EmptyWord)));
        assert!(matches!(
            Word::from_space_separated("   "),
            Err(CoreError::EmptyWord)
        ));
    }

    #[test]
    fn reject_reserved_grams() {
        for text in ["C|", "A}B", "A B"] {
            assert!(
                matches!(Word::from_chars(text), Err(CoreError::ReservedGram { .. })),
                "accepted {text:?}"
            );
        }
        for gram in ["<s>", "</s>", "<eps>", "P|H"] {
            match Word::new(["A", gram]) {
                Err(CoreError::ReservedGram { gram: g }) => assert_eq!(g, gram),
                other => panic!("expected ReservedGram for {gram:?}, got {other:?}"),
            }
        }
        assert!(Word::new(["_", "<S>"]).is_ok());
    }

    #[test]
    fn chars_and_fields() {
        let x = Word::from_chars("CAT").unwrap();
        assert_eq!(x.unigram_count(), 3);
        assert_eq!(x.get(1), Some("A"));
        let y = Word::from_space_separated("K AE T").unwrap();
        assert_eq!(y.grams(), &["K", "AE", "T"]);
        assert_eq!(y.to_string(), "K AE T");
    }

    #[test]
    fn gram_extraction() {
        let x = Word::from_chars("PHONE").unwrap();
        assert_eq!(x.gram(0, 2).as_deref(), Some("P|H"));
        assert_eq!(x.gram(4, 1).as_deref(), Some("E"));
        assert_eq!(x.gram(4, 2), None);
        assert_eq!(x.gram(0, 0), None);
    }

    #[test]
    fn ngram_iteration() {
        let x = Word::from_chars("ABC").unwrap();
        let bigrams: Vec<String> = x.ngrams(2).collect();
        assert_eq!(bigrams, vec!["A|B", "B|C"]);
        assert_eq!(x.ngrams(4).count(), 0);
        assert_eq!(x.ngrams(0).count(), 0);
    }

    #[test]
    fn grams_are_not_merged() {
        let a = Word::new(["A", "E"]).unwrap();
        let b = Word::new(["AE"]).unwrap();
        assert_ne!(a, b);
    }
}
