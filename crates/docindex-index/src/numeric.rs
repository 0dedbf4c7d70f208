//! Numeric range index for one numeric field.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use docindex_types::DocId;

/// Order-preserving key for an `f64`.
///
/// Flips the sign bit of positives and every bit of negatives so the
/// resulting `u64` sorts like the float. `-0.0` is folded into `0.0`.
fn sort_key(value: f64) -> u64 {
    let value = if value == 0.0 { 0.0 } else { value };
    let bits = value.to_bits();
    if bits >> 63 == 1 {
        !bits
    } else {
        bits | (1 << 63)
    }
}

/// Sorted map from value to the documents holding it.
#[derive(Debug, Default)]
pub struct NumericRangeTree {
    values: BTreeMap<u64, (f64, BTreeSet<DocId>)>,
    entries: usize,
}

impl NumericRangeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` for `doc_id`. Returns false if the pair was already present.
    pub fn add(&mut self, doc_id: DocId, value: f64) -> bool {
        let (_, docs) = self
            .values
            .entry(sort_key(value))
            .or_insert_with(|| (value, BTreeSet::new()));
        let inserted = docs.insert(doc_id);
        if inserted {
            self.entries += 1;
        }
        inserted
    }

    /// Documents with a value in `[min, max]`, in value order.
    pub fn range(&self, min: f64, max: f64) -> Vec<(f64, DocId)> {
        if min > max || min.is_nan() || max.is_nan() {
            return Vec::new();
        }
        self.values
            .range((Bound::Included(sort_key(min)), Bound::Included(sort_key(max))))
            .flat_map(|(_, (value, docs))| docs.iter().map(move |id| (*value, *id)))
            .collect()
    }

    /// Number of (value, document) pairs.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn num_values(&self) -> usize {
        self.values.len()
    }
}
