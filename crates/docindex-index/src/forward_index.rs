//! Per-document forward index.
//!
//! Terms are accumulated here while a document's full-text fields are
//! tokenized, then committed into the shared [`InvertedIndex`] in one step.
//! Nothing in this structure is visible to other documents until commit.
//!
//! [`InvertedIndex`]: crate::InvertedIndex

use std::collections::HashMap;

/// Accumulated occurrences of one term in one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardIndexEntry {
    pub term: String,
    pub freq: u32,
    /// Bit `text_id` is set for every text field the term occurred in
    pub field_mask: u128,
    /// Token positions, ascending
    pub positions: Vec<u32>,
    /// Entry was produced by stemming rather than taken from the text
    pub is_stem: bool,
}

/// Builder for the terms of a single document.
#[derive(Debug, Default)]
pub struct ForwardIndex {
    entries: HashMap<String, ForwardIndexEntry>,
    max_freq: u32,
    total_freq: u32,
}

impl ForwardIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `term` in the text field `text_id`.
    ///
    /// `weight` is the field weight; each occurrence adds at least 1 to the
    /// term frequency.
    pub fn add_term(&mut self, term: &str, text_id: u32, pos: u32, weight: f64, is_stem: bool) {
        let inc = (weight as u32).max(1);
        let entry = self
            .entries
            .entry(term.to_string())
            .or_insert_with(|| ForwardIndexEntry {
                term: term.to_string(),
                freq: 0,
                field_mask: 0,
                positions: Vec::new(),
                is_stem,
            });

        entry.freq += inc;
        if text_id < u128::BITS {
            entry.field_mask |= 1u128 << text_id;
        }
        if entry.positions.last().map_or(true, |last| *last < pos) {
            entry.positions.push(pos);
        }

        self.max_freq = self.max_freq.max(entry.freq);
        self.total_freq += inc;
    }

    pub fn get(&self, term: &str) -> Option<&ForwardIndexEntry> {
        self.entries.get(term)
    }

    /// Entries in term order, so commits are deterministic.
    pub fn entries(&self) -> Vec<&ForwardIndexEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by(|a, b| a.term.cmp(&b.term));
        entries
    }

    pub fn num_terms(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest frequency of any single term.
    pub fn max_freq(&self) -> u32 {
        self.max_freq
    }

    pub fn total_freq(&self) -> u32 {
        self.total_freq
    }

    /// Drop all terms but keep the allocated table.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.max_freq = 0;
        self.total_freq = 0;
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_terms() {
        let mut fw = ForwardIndex::new();
        fw.add_term("hello", 0, 1, 1.0, false);
        fw.add_term("world", 0, 2, 1.0, false);
        fw.add_term("hello", 1, 3, 1.0, false);

        let hello = fw.get("hello").unwrap();
        assert_eq!(hello.freq, 2);
        assert_eq!(hello.field_mask, 0b11);
        assert_eq!(hello.positions, vec![1, 3]);
        assert_eq!(fw.num_terms(), 2);
        assert_eq!(fw.max_freq(), 2);
        assert_eq!(fw.total_freq(), 3);
    }

    #[test]
    fn test_weight_scales_frequency() {
        let mut fw = ForwardIndex::new();
        fw.add_term("x", 0, 1, 3.0, false);
        fw.add_term("y", 0, 2, 0.5, false);
        assert_eq!(fw.get("x").unwrap().freq, 3);
        assert_eq!(fw.get("y").unwrap().freq, 1);
    }

    #[test]
    fn test_stem_shares_position() {
        let mut fw = ForwardIndex::new();
        fw.add_term("+run", 0, 1, 1.0, true);
        fw.add_term("+run", 0, 1, 1.0, true);
        let entry = fw.get("+run").unwrap();
        assert!(entry.is_stem);
        assert_eq!(entry.positions, vec![1]);
    }

    #[test]
    fn test_reset_keeps_capacity() {
        let mut fw = ForwardIndex::new();
        for i in 0..100 {
            fw.add_term(&format!("t{}", i), 0, i + 1, 1.0, false);
        }
        let cap = fw.capacity();
        fw.reset();
        assert!(fw.is_empty());
        assert_eq!(fw.max_freq(), 0);
        assert_eq!(fw.capacity(), cap);
    }

    #[test]
    fn test_entries_sorted() {
        let mut fw = ForwardIndex::new();
        fw.add_term("b", 0, 1, 1.0, false);
        fw.add_term("a", 0, 2, 1.0, false);
        let terms: Vec<_> = fw.entries().iter().map(|e| e.term.as_str()).collect();
        assert_eq!(terms, vec!["a", "b"]);
    }
}
