//! Document representation submitted to the ingestion pipeline.
//!
//! A document is what the wire layer produces: a key, a score, an optional
//! opaque payload, a language tag and an ordered list of named raw values.

use serde::{Deserialize, Serialize};

/// Internal numeric document identifier assigned by the metadata table.
///
/// `0` is never a valid id.
pub type DocId = u64;

/// A single named raw value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentField {
    pub name: String,
    pub value: String,
}

impl DocumentField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A document submitted for indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// External document key
    pub key: String,

    /// Relevance score in [0, 1]
    #[serde(default = "default_score")]
    pub score: f32,

    /// Opaque payload stored alongside the metadata
    #[serde(default)]
    pub payload: Option<Vec<u8>>,

    /// Language used for stemming (e.g. "english")
    #[serde(default)]
    pub language: Option<String>,

    /// Field values in submission order
    #[serde(default)]
    pub fields: Vec<DocumentField>,
}

fn default_score() -> f32 {
    1.0
}

impl Document {
    /// Create an empty document with the default score.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            score: default_score(),
            payload: None,
            language: None,
            fields: Vec::new(),
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Append a field value. Field order is preserved.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(DocumentField::new(name, value));
        self
    }

    /// Look up a field by name, ignoring ASCII case.
    pub fn field(&self, name: &str) -> Option<&DocumentField> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Reset to an empty document, keeping allocations.
    pub fn clear(&mut self) {
        self.key.clear();
        self.score = default_score();
        self.payload = None;
        self.language = None;
        self.fields.clear();
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let doc = Document::new("doc:1")
            .with_score(0.5)
            .with_payload(b"abc".to_vec())
            .with_language("french")
            .with_field("title", "bonjour")
            .with_field("body", "le monde");

        assert_eq!(doc.key, "doc:1");
        assert_eq!(doc.score, 0.5);
        assert_eq!(doc.payload.as_deref(), Some(&b"abc"[..]));
        assert_eq!(doc.language.as_deref(), Some("french"));
        assert_eq!(doc.fields.len(), 2);
        assert_eq!(doc.fields[1].name, "body");
    }

    #[test]
    fn test_field_lookup_is_case_insensitive() {
        let doc = Document::new("k").with_field("Title", "x");
        assert_eq!(doc.field("title").map(|f| f.value.as_str()), Some("x"));
        assert!(doc.field("missing").is_none());
    }

    #[test]
    fn test_clear() {
        let mut dst = Document::new("old")
            .with_score(0.3)
            .with_field("g", "w")
            .with_field("h", "u");
        dst.clear();
        assert!(dst.key.is_empty());
        assert!(dst.fields.is_empty());
        assert_eq!(dst.score, 1.0);
    }

    #[test]
    fn test_deserialize_defaults() {
        let doc: Document =
            serde_json::from_str(r#"{"key":"d","fields":[{"name":"a","value":"1"}]}"#).unwrap();
        assert_eq!(doc.score, 1.0);
        assert!(doc.payload.is_none());
        assert_eq!(doc.fields[0], DocumentField::new("a", "1"));
    }
}
