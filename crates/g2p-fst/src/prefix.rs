// Prefix matching against a registered set of multi-symbol sequences.
//
// Sequences are bucketed by their first element, so a query only compares
// against sequences that can possibly match.

use hashbrown::HashMap;

struct Registered<V> {
    sequence: Vec<String>,
    value: V,
}

/// One registered sequence that is a prefix of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixMatch<'a, V> {
    pub sequence: &'a [String],
    pub value: &'a V,
}

impl<V> PrefixMatch<'_, V> {
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// A set of symbol sequences, each mapped to a value.
pub struct PrefixSetMatcher<V> {
    buckets: HashMap<String, Vec<Registered<V>>>,
    len: usize,
}

impl<V> Default for PrefixSetMatcher<V> {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
            len: 0,
        }
    }
}

impl<V> std::fmt::Debug for PrefixSetMatcher<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefixSetMatcher")
            .field("sequences", &self.len)
            .field("buckets", &self.buckets.len())
            .finish()
    }
}

impl<V> PrefixSetMatcher<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sequence`. Empty sequences can never match and are ignored.
    pub fn insert(&mut self, sequence: Vec<String>, value: V) -> bool {
        let Some(first) = sequence.first() else {
            return false;
        };
        self.buckets
            .entry(first.clone())
            .or_default()
            .push(Registered { sequence, value });
        self.len += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Every registered sequence that is a prefix of `query`, in
    /// registration order.
    pub fn accept<S: AsRef<str>>(&self, query: &[S]) -> Vec<PrefixMatch<'_, V>> {
        let Some(first) = query.first() else {
            return Vec::new();
        };
        let Some(bucket) = self.buckets.get(first.as_ref()) else {
            return Vec::new();
        };
        bucket
            .iter()
            .filter(|r| {
                r.sequence.len() <= query.len()
                    && r.sequence.iter().zip(query).all(|(a, b)| a == b.as_ref())
            })
            .map(|r| PrefixMatch {
                sequence: &r.sequence,
                value: &r.value,
            })
            .collect()
    }
}
