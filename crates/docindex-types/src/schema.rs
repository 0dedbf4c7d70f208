//! Index schema: the immutable set of field specs a document is resolved against.
//!
//! A schema is built once from a [`SchemaDefinition`] (typically deserialized
//! from JSON) and shared behind an `Arc` by every ingestion context. Building
//! assigns each field its ordinal, its sort-vector slot and, for full-text
//! fields, its text id.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DocIndexError;

/// Maximum number of fields a schema may declare.
pub const MAX_FIELDS: usize = 1024;

/// Maximum number of full-text fields (text ids must fit a 128-bit field mask).
pub const MAX_TEXT_FIELDS: usize = 128;

/// Declared type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[serde(rename = "text")]
    FullText,
    Numeric,
    Geo,
    Tag,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::FullText => "text",
            FieldType::Numeric => "numeric",
            FieldType::Geo => "geo",
            FieldType::Tag => "tag",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved, immutable schema entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub sortable: bool,
    pub no_stem: bool,
    pub phonetic: bool,
    pub no_index: bool,
    /// Ordinal of this field within the schema
    pub index: usize,
    /// Reserved slot in the sort vector, if sortable
    pub sort_idx: Option<usize>,
    /// Bit position in the text field mask (full-text fields only)
    pub text_id: u32,
    /// Scoring weight (full-text fields only)
    pub weight: f64,
    /// Tag separator (tag fields only)
    pub tag_separator: char,
    /// Whether tag values keep their case (tag fields only)
    pub tag_case_sensitive: bool,
}

impl FieldSpec {
    pub fn is_sortable(&self) -> bool {
        self.sortable
    }

    pub fn is_indexable(&self) -> bool {
        !self.no_index
    }

    pub fn is_no_stem(&self) -> bool {
        self.no_stem
    }

    pub fn is_phonetic(&self) -> bool {
        self.phonetic
    }
}

/// Serializable field declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default)]
    pub sortable: bool,

    #[serde(default)]
    pub no_stem: bool,

    #[serde(default)]
    pub phonetic: bool,

    #[serde(default)]
    pub no_index: bool,

    #[serde(default = "default_weight")]
    pub weight: f64,

    #[serde(default = "default_separator")]
    pub separator: char,

    #[serde(default)]
    pub case_sensitive: bool,
}

fn default_weight() -> f64 {
    1.0
}

fn default_separator() -> char {
    ','
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            sortable: false,
            no_stem: false,
            phonetic: false,
            no_index: false,
            weight: default_weight(),
            separator: default_separator(),
            case_sensitive: false,
        }
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn no_stem(mut self) -> Self {
        self.no_stem = true;
        self
    }

    pub fn phonetic(mut self) -> Self {
        self.phonetic = true;
        self
    }

    pub fn no_index(mut self) -> Self {
        self.no_index = true;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }
}

/// Serializable schema declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub name: String,

    #[serde(default)]
    pub fields: Vec<FieldDefinition>,

    /// Keep per-token byte offsets for full-text fields
    #[serde(default = "default_store_byte_offsets")]
    pub store_byte_offsets: bool,

    /// Custom stop-word list; `None` selects the default list
    #[serde(default)]
    pub stopwords: Option<Vec<String>>,
}

fn default_store_byte_offsets() -> bool {
    true
}

impl SchemaDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            store_byte_offsets: default_store_byte_offsets(),
            stopwords: None,
        }
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_byte_offsets(mut self, enabled: bool) -> Self {
        self.store_byte_offsets = enabled;
        self
    }

    pub fn with_stopwords(mut self, words: Vec<String>) -> Self {
        self.stopwords = Some(words);
        self
    }
}

/// Immutable, validated schema.
#[derive(Debug, Clone)]
pub struct IndexSchema {
    name: String,
    fields: Vec<Arc<FieldSpec>>,
    sortables: usize,
    store_byte_offsets: bool,
    stopwords: Option<Vec<String>>,
}

impl IndexSchema {
    /// Validate a definition and resolve ordinals, sort slots and text ids.
    pub fn from_definition(def: SchemaDefinition) -> Result<Self, DocIndexError> {
        if def.fields.len() > MAX_FIELDS {
            return Err(DocIndexError::InvalidSchema(format!(
                "too many fields: {} (max {})",
                def.fields.len(),
                MAX_FIELDS
            )));
        }

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(def.fields.len());
        let mut sortables = 0;
        let mut text_fields = 0u32;

        for (index, fd) in def.fields.into_iter().enumerate() {
            if fd.name.is_empty() {
                return Err(DocIndexError::InvalidSchema("empty field name".into()));
            }
            if !seen.insert(fd.name.to_ascii_lowercase()) {
                return Err(DocIndexError::InvalidSchema(format!(
                    "duplicate field `{}`",
                    fd.name
                )));
            }
            if fd.field_type != FieldType::FullText && (fd.no_stem || fd.phonetic) {
                return Err(DocIndexError::InvalidSchema(format!(
                    "field `{}`: NOSTEM and PHONETIC apply to text fields only",
                    fd.name
                )));
            }
            if fd.field_type == FieldType::Tag
                && (fd.separator.is_alphanumeric() || fd.separator.is_whitespace())
            {
                return Err(DocIndexError::InvalidSchema(format!(
                    "field `{}`: invalid tag separator {:?}",
                    fd.name, fd.separator
                )));
            }

            let text_id = if fd.field_type == FieldType::FullText {
                if text_fields as usize >= MAX_TEXT_FIELDS {
                    return Err(DocIndexError::InvalidSchema(format!(
                        "too many text fields (max {})",
                        MAX_TEXT_FIELDS
                    )));
                }
                text_fields += 1;
                text_fields - 1
            } else {
                0
            };

            let sort_idx = if fd.sortable {
                sortables += 1;
                Some(sortables - 1)
            } else {
                None
            };

            fields.push(Arc::new(FieldSpec {
                name: fd.name,
                field_type: fd.field_type,
                sortable: fd.sortable,
                no_stem: fd.no_stem,
                phonetic: fd.phonetic,
                no_index: fd.no_index,
                index,
                sort_idx,
                text_id,
                weight: fd.weight,
                tag_separator: fd.separator,
                tag_case_sensitive: fd.case_sensitive,
            }));
        }

        Ok(Self {
            name: def.name,
            fields,
            sortables,
            store_byte_offsets: def.store_byte_offsets,
            stopwords: def.stopwords,
        })
    }

    /// Parse a JSON schema definition.
    pub fn from_json(json: &str) -> Result<Self, DocIndexError> {
        let def: SchemaDefinition = serde_json::from_str(json)?;
        Self::from_definition(def)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve a field by name, ignoring ASCII case.
    pub fn field(&self, name: &str) -> Option<&Arc<FieldSpec>> {
        self.fields
            .iter()
            .find(|fs| fs.name.eq_ignore_ascii_case(name))
    }

    pub fn field_at(&self, ordinal: usize) -> Option<&Arc<FieldSpec>> {
        self.fields.get(ordinal)
    }

    pub fn fields(&self) -> &[Arc<FieldSpec>] {
        &self.fields
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Number of slots a sort vector needs for this schema.
    pub fn sortable_count(&self) -> usize {
        self.sortables
    }

    /// Sort-vector slot of a field, if it is sortable.
    pub fn field_sorting_index(&self, name: &str) -> Option<usize> {
        self.field(name).and_then(|fs| fs.sort_idx)
    }

    pub fn store_byte_offsets(&self) -> bool {
        self.store_byte_offsets
    }

    pub fn stopwords(&self) -> Option<&[String]> {
        self.stopwords.as_deref()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|fs| fs.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IndexSchema {
        IndexSchema::from_definition(
            SchemaDefinition::new("products")
                .with_field(FieldDefinition::new("title", FieldType::FullText).sortable())
                .with_field(FieldDefinition::new("body", FieldType::FullText).no_stem())
                .with_field(FieldDefinition::new("price", FieldType::Numeric).sortable())
                .with_field(FieldDefinition::new("loc", FieldType::Geo))
                .with_field(FieldDefinition::new("tags", FieldType::Tag).with_separator(';')),
        )
        .unwrap()
    }

    #[test]
    fn test_ordinals_and_slots() {
        let schema = sample();
        assert_eq!(schema.num_fields(), 5);
        assert_eq!(schema.sortable_count(), 2);

        let title = schema.field("title").unwrap();
        assert_eq!(title.index, 0);
        assert_eq!(title.sort_idx, Some(0));
        assert_eq!(title.text_id, 0);

        let body = schema.field("body").unwrap();
        assert_eq!(body.text_id, 1);
        assert!(body.is_no_stem());
        assert_eq!(body.sort_idx, None);

        assert_eq!(schema.field_sorting_index("price"), Some(1));
        assert_eq!(schema.field("tags").unwrap().tag_separator, ';');
    }

    #[test]
    fn test_lookup_ignores_case() {
        let schema = sample();
        assert_eq!(schema.field("PRICE").unwrap().name, "price");
        assert!(schema.field("nope").is_none());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let def = SchemaDefinition::new("dup")
            .with_field(FieldDefinition::new("a", FieldType::Numeric))
            .with_field(FieldDefinition::new("A", FieldType::Tag));
        let err = IndexSchema::from_definition(def).unwrap_err();
        assert!(err.to_string().contains("duplicate field"));
    }

    #[test]
    fn test_text_only_flags_rejected_on_numeric() {
        let def = SchemaDefinition::new("bad")
            .with_field(FieldDefinition::new("n", FieldType::Numeric).no_stem());
        assert!(IndexSchema::from_definition(def).is_err());
    }

    #[test]
    fn test_invalid_tag_separator() {
        let def = SchemaDefinition::new("bad")
            .with_field(FieldDefinition::new("t", FieldType::Tag).with_separator('x'));
        assert!(IndexSchema::from_definition(def).is_err());
    }

    #[test]
    fn test_from_json() {
        let schema = IndexSchema::from_json(
            r#"{
                "name": "idx",
                "store_byte_offsets": false,
                "fields": [
                    {"name": "title", "type": "text", "weight": 2.0},
                    {"name": "year", "type": "numeric", "sortable": true},
                    {"name": "cat", "type": "tag"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(schema.name(), "idx");
        assert!(!schema.store_byte_offsets());
        assert_eq!(schema.field("title").unwrap().weight, 2.0);
        assert_eq!(schema.field("cat").unwrap().tag_separator, ',');
        assert_eq!(schema.field_names(), vec!["title", "year", "cat"]);
    }
}
