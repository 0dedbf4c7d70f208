//! Tag index for one tag field.

use std::collections::{BTreeSet, HashMap};

use docindex_types::DocId;

/// Exact-match index from tag value to documents.
#[derive(Debug, Default)]
pub struct TagIndex {
    values: HashMap<String, BTreeSet<DocId>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a raw tag string into normalized values.
    ///
    /// Values are trimmed and, unless `case_sensitive`, lowercased. Empty
    /// values are dropped. Returns `None` when nothing remains.
    pub fn preprocess(raw: &str, separator: char, case_sensitive: bool) -> Option<Vec<String>> {
        let tags: Vec<String> = raw
            .split(separator)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| {
                if case_sensitive {
                    t.to_string()
                } else {
                    t.to_lowercase()
                }
            })
            .collect();

        if tags.is_empty() {
            None
        } else {
            Some(tags)
        }
    }

    /// Add every tag for `doc_id`. Returns the number of new entries.
    pub fn index(&mut self, doc_id: DocId, tags: &[String]) -> usize {
        tags.iter()
            .filter(|tag| self.values.entry((*tag).clone()).or_default().insert(doc_id))
            .count()
    }

    pub fn docs_for(&self, tag: &str) -> Vec<DocId> {
        self.values
            .get(tag)
            .map(|docs| docs.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn num_values(&self) -> usize {
        self.values.len()
    }
}
