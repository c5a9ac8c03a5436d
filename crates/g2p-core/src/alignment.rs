// Alignment: a scored sequence of graphones.

use std::fmt;

use crate::symbols::{self, EPSILON};

/// One aligned unit: a grapheme gram paired with a phoneme gram.
///
/// Either side may be [`EPSILON`], never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Graphone {
    pub grapheme: String,
    pub phoneme: String,
}

impl Graphone {
    pub fn new(grapheme: impl Into<String>, phoneme: impl Into<String>) -> Self {
        Self {
            grapheme: grapheme.into(),
            phoneme: phoneme.into(),
        }
    }

    /// Token form used as a vocabulary entry of the joint n-gram model.
    pub fn token(&self) -> String {
        symbols::graphone_token(&self.grapheme, &self.phoneme)
    }
}

impl fmt::Display for Graphone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.grapheme, self.phoneme)
    }
}

/// A complete alignment of one grapheme word with one phoneme word.
///
/// Concatenating the non-epsilon grapheme grams reproduces the source word,
/// and likewise for the phoneme side. The score is a cumulative log2
/// probability (higher is better).
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    graphones: Vec<Graphone>,
    score: f64,
}

impl Alignment {
    pub fn new(graphones: Vec<Graphone>, score: f64) -> Self {
        Self { graphones, score }
    }

    pub fn graphones(&self) -> &[Graphone] {
        &self.graphones
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn len(&self) -> usize {
        self.graphones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphones.is_empty()
    }

    /// Flattened grapheme units, epsilons removed.
    pub fn x_units(&self) -> Vec<&str> {
        self.graphones
            .iter()
            .flat_map(|g| symbols::split_gram(&g.grapheme))
            .collect()
    }

    /// Flattened phoneme units, epsilons removed.
    pub fn y_units(&self) -> Vec<&str> {
        self.graphones
            .iter()
            .flat_map(|g| symbols::split_gram(&g.phoneme))
            .collect()
    }

    /// Space-separated graphone tokens, one training sentence for the
    /// joint n-gram model.
    pub fn to_token_line(&self) -> String {
        self.graphones
            .iter()
            .map(Graphone::token)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether any graphone has an empty side.
    pub fn has_epsilon(&self) -> bool {
        self.graphones
            .iter()
            .any(|g| g.grapheme == EPSILON || g.phoneme == EPSILON)
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, g) in self.graphones.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{g}")?;
        }
        write!(f, " ({:.4})", self.score)
    }
}
