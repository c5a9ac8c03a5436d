//! Backoff n-gram models over graphone tokens.
//!
//! [`NgramModel`] is the read-only view the compiler needs: the order, the
//! sentinel tokens, and an ascending-order walk over every stored n-gram.
//! [`ArpaModel`] implements it for the ARPA text format written by the
//! common LM toolkits:
//!
//! ```text
//! \data\
//! ngram 1=<count>
//! ngram 2=<count>
//!
//! \1-grams:
//! <log10_prob> <token> [<log10_backoff>]
//!
//! \2-grams:
//! <log10_prob> <token1> <token2> [<log10_backoff>]
//!
//! \end\
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use g2p_core::symbols::{END, START};
use hashbrown::{HashMap, HashSet};

use crate::FstError;

/// One stored n-gram, as seen during [`NgramModel::walk`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NgramEntry<'a> {
    pub order: usize,
    /// Context tokens followed by the predicted token.
    pub tokens: &'a [String],
    /// log10 probability.
    pub score: f64,
    /// log10 backoff weight; 0 when absent.
    pub backoff: f64,
    /// Whether some (order+1)-gram extends this one.
    pub has_children: bool,
    pub is_last_order: bool,
}

impl NgramEntry<'_> {
    pub fn last(&self) -> &str {
        self.tokens.last().map(String::as_str).unwrap_or_default()
    }
}

pub trait NgramModel {
    fn order(&self) -> usize;
    fn start_symbol(&self) -> &str;
    fn end_symbol(&self) -> &str;
    /// Visit every n-gram, all unigrams first, then bigrams, and so on.
    fn walk(&self, visit: &mut dyn FnMut(&NgramEntry<'_>));
}

#[derive(Debug, Clone, PartialEq)]
struct ArpaGram {
    tokens: Vec<String>,
    score: f64,
    backoff: f64,
    has_children: bool,
}

/// An n-gram model read from ARPA text.
#[derive(Debug, Clone, PartialEq)]
pub struct ArpaModel {
    /// `orders[n - 1]` holds the n-grams, in file order.
    orders: Vec<Vec<ArpaGram>>,
    /// Position of each n-gram in `orders`, per order.
    index: Vec<HashMap<Vec<String>, usize>>,
    start_symbol: String,
    end_symbol: String,
}

enum Section {
    Preamble,
    Data,
    Grams(usize),
    End,
}

impl ArpaModel {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, FstError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn parse(text: &str) -> Result<Self, FstError> {
        Self::from_reader(text.as_bytes())
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, FstError> {
        let mut section = Section::Preamble;
        let mut declared: Vec<usize> = Vec::new();
        let mut orders: Vec<Vec<ArpaGram>> = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line_no = i + 1;
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let arpa_err = |reason: String| FstError::Arpa {
                line: line_no,
                reason,
            };

            if line == "\\data\\" {
                section = Section::Data;
                continue;
            }
            if line == "\\end\\" {
                section = Section::End;
                break;
            }
            if let Some(n) = line
                .strip_prefix('\\')
                .and_then(|l| l.strip_suffix("-grams:"))
            {
                let n: usize = n
                    .parse()
                    .map_err(|_| arpa_err(format!("bad section header {line:?}")))?;
                if n == 0 || n != orders.len() + 1 {
                    return Err(arpa_err(format!(
                        "expected the {}-grams section, found {line:?}",
                        orders.len() + 1
                    )));
                }
                orders.push(Vec::new());
                section = Section::Grams(n);
                continue;
            }

            match section {
                Section::Preamble | Section::End => {}
                Section::Data => {
                    let Some((n, count)) = line
                        .strip_prefix("ngram ")
                        .and_then(|rest| rest.split_once('='))
                    else {
                        return Err(arpa_err(format!("expected `ngram N=count`, found {line:?}")));
                    };
                    let n: usize = n
                        .trim()
                        .parse()
                        .map_err(|_| arpa_err(format!("bad order in {line:?}")))?;
                    let count: usize = count
                        .trim()
                        .parse()
                        .map_err(|_| arpa_err(format!("bad count in {line:?}")))?;
                    if n != declared.len() + 1 {
                        return Err(arpa_err(format!("order {n} declared out of sequence")));
                    }
                    declared.push(count);
                }
                Section::Grams(n) => {
                    let gram = parse_gram(line, n).map_err(arpa_err)?;
                    orders[n - 1].push(gram);
                }
            }
        }

        if !matches!(section, Section::End) {
            return Err(FstError::Arpa {
                line: 0,
                reason: "missing \\end\\ marker".to_string(),
            });
        }
        if orders.is_empty() {
            return Err(FstError::Arpa {
                line: 0,
                reason: "model has no n-gram sections".to_string(),
            });
        }
        for (n, grams) in orders.iter().enumerate() {
            match declared.get(n) {
                Some(&count) if count != grams.len() => tracing::warn!(
                    order = n + 1,
                    declared = count,
                    found = grams.len(),
                    "ARPA n-gram count mismatch"
                ),
                _ => {}
            }
        }

        let index = orders
            .iter()
            .map(|grams| {
                grams
                    .iter()
                    .enumerate()
                    .map(|(i, g)| (g.tokens.clone(), i))
                    .collect()
            })
            .collect();
        let mut model = Self {
            orders,
            index,
            start_symbol: START.to_string(),
            end_symbol: END.to_string(),
        };
        model.mark_children();
        tracing::debug!(
            order = model.order(),
            unigrams = model.orders[0].len(),
            "read ARPA model"
        );
        Ok(model)
    }

    /// Override the sentinel tokens, for models trained with other markers.
    pub fn with_sentinels(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_symbol = start.into();
        self.end_symbol = end.into();
        self
    }

    /// Number of n-grams stored for `order`.
    pub fn count(&self, order: usize) -> usize {
        order
            .checked_sub(1)
            .and_then(|i| self.orders.get(i))
            .map_or(0, Vec::len)
    }

    fn find(&self, tokens: &[String]) -> Option<&ArpaGram> {
        let n = tokens.len().checked_sub(1)?;
        let &i = self.index.get(n)?.get(tokens)?;
        self.orders[n].get(i)
    }

    /// log10 probability of the last token of `tokens` given the ones
    /// before it, backing off to shorter contexts.
    pub fn score(&self, tokens: &[String]) -> Option<f64> {
        if tokens.is_empty() {
            return None;
        }
        if let Some(gram) = self.find(tokens) {
            return Some(gram.score);
        }
        if tokens.len() == 1 {
            return None;
        }
        let backoff = self
            .find(&tokens[..tokens.len() - 1])
            .map_or(0.0, |g| g.backoff);
        Some(backoff + self.score(&tokens[1..])?)
    }

    fn mark_children(&mut self) {
        for n in 1..self.orders.len() {
            let prefixes: HashSet<Vec<String>> = self.orders[n]
                .iter()
                .map(|g| g.tokens[..n].to_vec())
                .collect();
            for gram in &mut self.orders[n - 1] {
                gram.has_children = prefixes.contains(&gram.tokens);
            }
        }
    }
}

fn parse_gram(line: &str, n: usize) -> Result<ArpaGram, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != n + 1 && fields.len() != n + 2 {
        return Err(format!(
            "expected {} or {} fields for a {n}-gram, found {}",
            n + 1,
            n + 2,
            fields.len()
        ));
    }
    let score: f64 = fields[0]
        .parse()
        .map_err(|_| format!("bad log probability {:?}", fields[0]))?;
    let backoff: f64 = match fields.get(n + 1) {
        Some(b) => b.parse().map_err(|_| format!("bad backoff weight {b:?}"))?,
        None => 0.0,
    };
    Ok(ArpaGram {
        tokens: fields[1..=n].iter().map(|s| s.to_string()).collect(),
        score,
        backoff,
        has_children: false,
    })
}

impl NgramModel for ArpaModel {
    fn order(&self) -> usize {
        self.orders.len()
    }

    fn start_symbol(&self) -> &str {
        &self.start_symbol
    }

    fn end_symbol(&self) -> &str {
        &self.end_symbol
    }

    fn walk(&self, visit: &mut dyn FnMut(&NgramEntry<'_>)) {
        let highest = self.orders.len();
        for (i, grams) in self.orders.iter().enumerate() {
            for gram in grams {
                visit(&NgramEntry {
                    order: i + 1,
                    tokens: &gram.tokens,
                    score: gram.score,
                    backoff: gram.backoff,
                    has_children: gram.has_children,
                    is_last_order: i + 1 == highest,
                });
            }
        }
    }
}
