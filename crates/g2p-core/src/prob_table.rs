// Sparse probability mass over (grapheme gram, phoneme gram) pairs.

use std::hash::{BuildHasherDefault, DefaultHasher, Hash, Hasher};

use hashbrown::{Equivalent, HashMap};

// Fixed-key hasher: identical insertion sequences iterate identically, so
// marginal sums come out bit-for-bit reproducible across runs.
type CellMap = HashMap<(String, String), f64, BuildHasherDefault<DefaultHasher>>;

/// Borrowed lookup key; hashes exactly like `(String, String)`.
struct KeyRef<'a>(&'a str, &'a str);

impl Hash for KeyRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
        self.1.hash(state);
    }
}

impl Equivalent<(String, String)> for KeyRef<'_> {
    fn equivalent(&self, key: &(String, String)) -> bool {
        self.0 == key.0 && self.1 == key.1
    }
}

/// Sparse `(x gram, y gram) -> mass` table.
///
/// Holds expected counts while the EM trainer accumulates them and
/// probabilities once normalized. The aligner only reads from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbTable {
    cells: CellMap,
}

impl ProbTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mass stored for `(x, y)`, or 0 when absent.
    pub fn prob(&self, x: &str, y: &str) -> f64 {
        self.lookup(x, y).unwrap_or(0.0)
    }

    fn lookup(&self, x: &str, y: &str) -> Option<f64> {
        self.cells.get(&KeyRef(x, y)).copied()
    }

    pub fn set(&mut self, x: impl Into<String>, y: impl Into<String>, mass: f64) {
        self.cells.insert((x.into(), y.into()), mass);
    }

    /// Add `mass` to whatever is already stored for `(x, y)`.
    pub fn add(&mut self, x: &str, y: &str, mass: f64) {
        *self
            .cells
            .entry((x.to_string(), y.to_string()))
            .or_insert(0.0) += mass;
    }

    /// Accumulate every cell of `other` into this table.
    pub fn merge(&mut self, other: &ProbTable) {
        for ((x, y), mass) in &other.cells {
            self.add(x, y, *mass);
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.cells
            .iter()
            .map(|((x, y), mass)| (x.as_str(), y.as_str(), *mass))
    }

    /// Sum of all cells sharing x gram `x`.
    pub fn row_sum(&self, x: &str) -> f64 {
        self.iter().filter(|(cx, _, _)| *cx == x).map(|(_, _, m)| m).sum()
    }

    /// Sum of all cells sharing y gram `y`.
    pub fn col_sum(&self, y: &str) -> f64 {
        self.iter().filter(|(_, cy, _)| *cy == y).map(|(_, _, m)| m).sum()
    }

    /// Sum of every cell.
    pub fn total(&self) -> f64 {
        self.cells.values().sum()
    }

    /// All row sums at once, keyed by x gram.
    pub fn row_sums(&self) -> HashMap<&str, f64> {
        let mut sums: HashMap<&str, f64> = HashMap::new();
        for (x, _, mass) in self.iter() {
            *sums.entry(x).or_insert(0.0) += mass;
        }
        sums
    }

    /// All column sums at once, keyed by y gram.
    pub fn col_sums(&self) -> HashMap<&str, f64> {
        let mut sums: HashMap<&str, f64> = HashMap::new();
        for (_, y, mass) in self.iter() {
            *sums.entry(y).or_insert(0.0) += mass;
        }
        sums
    }

    /// Summed absolute difference to `other` over the union of both tables.
    pub fn abs_delta(&self, other: &ProbTable) -> f64 {
        let mut delta = 0.0;
        for ((x, y), mass) in &self.cells {
            delta += (mass - other.lookup(x, y).unwrap_or(0.0)).abs();
        }
        for ((x, y), mass) in &other.cells {
            if self.lookup(x, y).is_none() {
                delta += mass.abs();
            }
        }
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProbTable {
        let mut t = ProbTable::new();
        t.set("C", "K", 2.0);
        t.set("C", "S", 1.0);
        t.set("K", "K", 1.0);
        t
    }

    #[test]
    fn missing_cell_is_zero() {
        assert_eq!(sample().prob("Q", "K"), 0.0);
    }

    #[test]
    fn marginals() {
        let t = sample();
        assert_eq!(t.row_sum("C"), 3.0);
        assert_eq!(t.col_sum("K"), 3.0);
        assert_eq!(t.total(), 4.0);
        let rows = t.row_sums();
        assert_eq!(rows["C"], 3.0);
        assert_eq!(rows["K"], 1.0);
        assert_eq!(t.col_sums()["S"], 1.0);
    }

    #[test]
    fn add_accumulates() {
        let mut t = sample();
        t.add("C", "K", 0.5);
        t.add("X", "K|S", 1.0);
        assert_eq!(t.prob("C", "K"), 2.5);
        assert_eq!(t.prob("X", "K|S"), 1.0);
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn merge_and_delta() {
        let mut a = sample();
        let b = sample();
        assert_eq!(a.abs_delta(&b), 0.0);
        a.merge(&b);
        assert_eq!(a.prob("C", "K"), 4.0);
        let mut c = ProbTable::new();
        c.set("Z", "Z", 0.25);
        assert_eq!(b.abs_delta(&c), 4.25);
    }
}
