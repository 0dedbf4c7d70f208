//! Shared inverted index: term -> postings.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::trace;

use docindex_types::DocId;

use crate::error::IndexError;
use crate::forward_index::ForwardIndex;

/// One document's entry in a term's posting list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    pub field_mask: u128,
    pub freq: u32,
    pub positions: Vec<u32>,
}

/// Term dictionary shared by every document of an index.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    terms: RwLock<HashMap<String, Vec<Posting>>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a document's forward index. Returns the number of terms written.
    pub fn commit(&self, doc_id: DocId, fw: &ForwardIndex) -> Result<usize, IndexError> {
        let mut terms = self.terms.write()?;
        let entries = fw.entries();
        for entry in &entries {
            terms.entry(entry.term.clone()).or_default().push(Posting {
                doc_id,
                field_mask: entry.field_mask,
                freq: entry.freq,
                positions: entry.positions.clone(),
            });
        }
        trace!(doc_id, terms = entries.len(), "Committed forward index");
        Ok(entries.len())
    }

    /// Postings of `term`, empty if the term is unknown.
    pub fn postings(&self, term: &str) -> Result<Vec<Posting>, IndexError> {
        let terms = self.terms.read()?;
        Ok(terms.get(term).cloned().unwrap_or_default())
    }

    pub fn num_terms(&self) -> Result<usize, IndexError> {
        Ok(self.terms.read()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_and_lookup() {
        let index = InvertedIndex::new();

        let mut fw = ForwardIndex::new();
        fw.add_term("hello", 0, 1, 1.0, false);
        fw.add_term("world", 1, 2, 1.0, false);
        assert_eq!(index.commit(1, &fw).unwrap(), 2);

        fw.reset();
        fw.add_term("hello", 0, 1, 1.0, false);
        index.commit(2, &fw).unwrap();

        let postings = index.postings("hello").unwrap();
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].doc_id, 1);
        assert_eq!(postings[1].doc_id, 2);

        let world = index.postings("world").unwrap();
        assert_eq!(world[0].field_mask, 0b10);
        assert_eq!(index.num_terms().unwrap(), 2);
        assert!(index.postings("missing").unwrap().is_empty());
    }
}
