// Bounded beam table: per-coordinate K-best memo cells for DP search.
//
// Each cell is a min-heap of at most K entries, grown on demand, so the
// worst retained entry is always at the top and can be compared against (and
// evicted by) a new candidate in O(log K). Entries carry a table-unique id; a successor refers
// to the exact entry it extends, not just to the predecessor coordinate.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// `back_id` of an entry that starts a path.
pub const NO_PREDECESSOR: usize = usize::MAX;

// Cells start this small and grow towards `capacity` as paths arrive.
const INITIAL_CELL_CAPACITY: usize = 16;

/// Table coordinate: (grapheme index, phoneme index). Single-sequence
/// searches use a second index of 0.
pub type Coord = (usize, usize);

/// One retained partial path.
#[derive(Debug, Clone, Copy)]
pub struct BeamEntry {
    /// Cumulative log2 score (higher is better).
    pub score: f64,
    /// Grapheme units consumed by the last step.
    pub x_step: usize,
    /// Phoneme units consumed by the last step.
    pub y_step: usize,
    /// Id of the entry this one extends, or [`NO_PREDECESSOR`].
    pub back_id: usize,
    id: usize,
}

impl BeamEntry {
    pub fn new(score: f64, x_step: usize, y_step: usize, back_id: usize) -> Self {
        Self {
            score,
            x_step,
            y_step,
            back_id,
            id: 0,
        }
    }

    /// Table-unique id, assigned when the entry was offered.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_origin(&self) -> bool {
        self.back_id == NO_PREDECESSOR
    }
}

// Score, then step lengths, then predecessor id. The id only separates
// entries that agree on everything else, which keeps the order total.
impl Ord for BeamEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then(self.x_step.cmp(&other.x_step))
            .then(self.y_step.cmp(&other.y_step))
            .then(other.back_id.cmp(&self.back_id))
            .then(other.id.cmp(&self.id))
    }
}

impl PartialOrd for BeamEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for BeamEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BeamEntry {}

/// Score and step shape of one DP transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub score: f64,
    pub x_step: usize,
    pub y_step: usize,
}

/// A grid of K-best cells.
pub struct BeamTable {
    rows: usize,
    cols: usize,
    capacity: usize,
    cells: Vec<BinaryHeap<Reverse<BeamEntry>>>,
    next_id: usize,
}

impl std::fmt::Debug for BeamTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeamTable")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("capacity", &self.capacity)
            .field("entries", &self.cells.iter().map(BinaryHeap::len).sum::<usize>())
            .finish()
    }
}

impl BeamTable {
    /// A `rows x cols` grid whose cells each keep the best `capacity` entries.
    pub fn new(rows: usize, cols: usize, capacity: usize) -> Self {
        Self {
            rows,
            cols,
            capacity,
            cells: (0..rows * cols)
                .map(|_| BinaryHeap::with_capacity(capacity.min(INITIAL_CELL_CAPACITY)))
                .collect(),
            next_id: 0,
        }
    }

    /// A one-dimensional table, addressed as `(i, 0)`.
    pub fn linear(len: usize, capacity: usize) -> Self {
        Self::new(len, 1, capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    fn index(&self, (row, col): Coord) -> usize {
        assert!(
            row < self.rows && col < self.cols,
            "coordinate ({row}, {col}) outside {}x{} beam table",
            self.rows,
            self.cols
        );
        row * self.cols + col
    }

    /// Start a path at `coord` with score 0.
    pub fn seed(&mut self, coord: Coord) -> bool {
        self.offer(coord, BeamEntry::new(0.0, 0, 0, NO_PREDECESSOR))
    }

    /// Insert `entry` if the cell has room, or if it beats the cell's worst
    /// entry, which is then discarded. Returns whether `entry` was kept.
    pub fn offer(&mut self, coord: Coord, mut entry: BeamEntry) -> bool {
        if self.capacity == 0 {
            return false;
        }
        entry.id = self.next_id;
        self.next_id += 1;

        let idx = self.index(coord);
        let cell = &mut self.cells[idx];
        if cell.len() < self.capacity {
            cell.push(Reverse(entry));
            return true;
        }
        match cell.peek() {
            Some(Reverse(worst)) if entry > *worst => {
                cell.pop();
                cell.push(Reverse(entry));
                true
            }
            _ => false,
        }
    }

    /// Extend every entry retained at `src` by `transition` and offer the
    /// results to `dst`.
    pub fn extend_path(&mut self, dst: Coord, src: Coord, transition: Transition) {
        let sources = self.entries(src);
        for prev in sources {
            let candidate = BeamEntry::new(
                prev.score + transition.score,
                transition.x_step,
                transition.y_step,
                prev.id,
            );
            self.offer(dst, candidate);
        }
    }

    /// Entries retained at `coord`, best first.
    pub fn entries(&self, coord: Coord) -> Vec<BeamEntry> {
        let idx = self.index(coord);
        let mut entries: Vec<BeamEntry> = self.cells[idx].iter().map(|r| r.0).collect();
        entries.sort_unstable_by(|a, b| b.cmp(a));
        entries
    }

    /// The entry with table id `id` at `coord`, if it is still retained.
    pub fn find(&self, coord: Coord, id: usize) -> Option<BeamEntry> {
        let idx = self.index(coord);
        self.cells[idx].iter().map(|r| r.0).find(|e| e.id == id)
    }

    /// Number of entries retained at `coord`.
    pub fn len_at(&self, coord: Coord) -> usize {
        self.cells[self.index(coord)].len()
    }
}
