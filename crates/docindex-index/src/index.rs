//! The per-schema bundle of index structures.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use docindex_types::{FieldSpec, FieldType, IndexSchema};

use crate::doc_table::DocTable;
use crate::error::IndexError;
use crate::geo::GeoIndex;
use crate::inverted::InvertedIndex;
use crate::numeric::NumericRangeTree;
use crate::tag::TagIndex;

/// Lazily created per-field structures, keyed by field ordinal.
#[derive(Debug)]
struct FieldStructures<T> {
    by_field: RwLock<HashMap<usize, Arc<RwLock<T>>>>,
}

impl<T: Default> FieldStructures<T> {
    fn new() -> Self {
        Self {
            by_field: RwLock::new(HashMap::new()),
        }
    }

    fn open(&self, ordinal: usize, create: bool) -> Result<Option<Arc<RwLock<T>>>, IndexError> {
        if let Some(existing) = self.by_field.read()?.get(&ordinal) {
            return Ok(Some(Arc::clone(existing)));
        }
        if !create {
            return Ok(None);
        }
        let mut by_field = self.by_field.write()?;
        Ok(Some(Arc::clone(by_field.entry(ordinal).or_default())))
    }

    fn len(&self) -> Result<usize, IndexError> {
        Ok(self.by_field.read()?.len())
    }
}

/// Counters describing an index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub num_docs: usize,
    pub max_doc_id: u64,
    pub num_terms: usize,
    pub numeric_fields: usize,
    pub tag_fields: usize,
    pub geo_fields: usize,
}

/// Every structure written for one schema.
#[derive(Debug)]
pub struct SearchIndex {
    schema: Arc<IndexSchema>,
    docs: DocTable,
    inverted: InvertedIndex,
    numeric: FieldStructures<NumericRangeTree>,
    tags: FieldStructures<TagIndex>,
    geo: FieldStructures<GeoIndex>,
}

impl SearchIndex {
    pub fn new(schema: Arc<IndexSchema>) -> Self {
        debug!(index = schema.name(), fields = schema.num_fields(), "Creating index");
        Self {
            schema,
            docs: DocTable::new(),
            inverted: InvertedIndex::new(),
            numeric: FieldStructures::new(),
            tags: FieldStructures::new(),
            geo: FieldStructures::new(),
        }
    }

    pub fn schema(&self) -> &Arc<IndexSchema> {
        &self.schema
    }

    pub fn docs(&self) -> &DocTable {
        &self.docs
    }

    pub fn inverted(&self) -> &InvertedIndex {
        &self.inverted
    }

    /// Open the range tree of a numeric field.
    ///
    /// Returns `None` if `fs` is not numeric, or if the tree does not exist
    /// yet and `create` is false.
    pub fn open_numeric(
        &self,
        fs: &FieldSpec,
        create: bool,
    ) -> Result<Option<Arc<RwLock<NumericRangeTree>>>, IndexError> {
        if fs.field_type != FieldType::Numeric {
            return Ok(None);
        }
        self.numeric.open(fs.index, create)
    }

    pub fn open_tag(
        &self,
        fs: &FieldSpec,
        create: bool,
    ) -> Result<Option<Arc<RwLock<TagIndex>>>, IndexError> {
        if fs.field_type != FieldType::Tag {
            return Ok(None);
        }
        self.tags.open(fs.index, create)
    }

    pub fn open_geo(
        &self,
        fs: &FieldSpec,
        create: bool,
    ) -> Result<Option<Arc<RwLock<GeoIndex>>>, IndexError> {
        if fs.field_type != FieldType::Geo {
            return Ok(None);
        }
        self.geo.open(fs.index, create)
    }

    pub fn stats(&self) -> Result<IndexStats, IndexError> {
        Ok(IndexStats {
            num_docs: self.docs.len()?,
            max_doc_id: self.docs.max_id()?,
            num_terms: self.inverted.num_terms()?,
            numeric_fields: self.numeric.len()?,
            tag_fields: self.tags.len()?,
            geo_fields: self.geo.len()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docindex_types::{FieldDefinition, SchemaDefinition};

    fn test_index() -> SearchIndex {
        let schema = IndexSchema::from_definition(
            SchemaDefinition::new("idx")
                .with_field(FieldDefinition::new("body", FieldType::FullText))
                .with_field(FieldDefinition::new("price", FieldType::Numeric))
                .with_field(FieldDefinition::new("tags", FieldType::Tag))
                .with_field(FieldDefinition::new("loc", FieldType::Geo)),
        )
        .unwrap();
        SearchIndex::new(Arc::new(schema))
    }

    #[test]
    fn test_open_creates_once() {
        let index = test_index();
        let price = Arc::clone(index.schema().field("price").unwrap());

        assert!(index.open_numeric(&price, false).unwrap().is_none());
        let a = index.open_numeric(&price, true).unwrap().unwrap();
        let b = index.open_numeric(&price, false).unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        a.write().unwrap().add(1, 5.0);
        assert_eq!(b.read().unwrap().len(), 1);
    }

    #[test]
    fn test_open_rejects_type_mismatch() {
        let index = test_index();
        let body = Arc::clone(index.schema().field("body").unwrap());
        assert!(index.open_numeric(&body, true).unwrap().is_none());
        assert!(index.open_tag(&body, true).unwrap().is_none());
        assert!(index.open_geo(&body, true).unwrap().is_none());
    }

    #[test]
    fn test_stats() {
        let index = test_index();
        let tags = Arc::clone(index.schema().field("tags").unwrap());
        let loc = Arc::clone(index.schema().field("loc").unwrap());
        index.open_tag(&tags, true).unwrap();
        index.open_geo(&loc, true).unwrap();
        index.docs().put("a", 1.0, None).unwrap();

        let stats = index.stats().unwrap();
        assert_eq!(stats.num_docs, 1);
        assert_eq!(stats.max_doc_id, 1);
        assert_eq!(stats.tag_fields, 1);
        assert_eq!(stats.geo_fields, 1);
        assert_eq!(stats.numeric_fields, 0);
    }
}
