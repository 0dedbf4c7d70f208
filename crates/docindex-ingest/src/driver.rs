//! Indexing driver: preprocess every field, then hand off to the indexer.

use tracing::debug;

use docindex_types::{ErrorCode, IngestError};

use crate::context::AddDocumentCtx;
use crate::field_type::FieldIndexer;
use crate::indexer::DocumentIndexer;

/// Run each resolved field's preprocessor in document order.
///
/// Stops at the first failure. Nothing outside the context has been
/// touched at that point.
pub fn preprocess_fields(ctx: &mut AddDocumentCtx) -> Result<(), IngestError> {
    for idx in 0..ctx.fspecs.len() {
        let Some(fs) = ctx.fspecs[idx].clone() else {
            debug!(field = %ctx.doc.fields[idx].name, "Skipping field not in schema");
            continue;
        };
        let data = FieldIndexer::for_type(fs.field_type).preprocess(ctx, idx, &fs)?;
        ctx.fdatas[idx] = data;
    }
    Ok(())
}

/// Preprocess and index one attached document.
///
/// The outcome is left in the context's status; returns whether it
/// succeeded. The caller still owns completion.
pub fn add_to_indexes(ctx: &mut AddDocumentCtx, indexer: &DocumentIndexer) -> bool {
    let result = preprocess_fields(ctx).and_then(|()| indexer.add(ctx));
    match result {
        Ok(()) => true,
        Err(e) => {
            if ctx.status.is_ok() {
                ctx.status.set_error(e);
            }
            ctx.status.set_code(ErrorCode::IndexGeneric);
            debug!(key = %ctx.doc.key, status = ?ctx.status.error(), "Document not indexed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use docindex_index::SearchIndex;
    use docindex_types::{Document, FieldDefinition, FieldType, IndexSchema, SchemaDefinition};

    fn setup() -> (Arc<IndexSchema>, DocumentIndexer) {
        let schema = Arc::new(
            IndexSchema::from_definition(
                SchemaDefinition::new("idx")
                    .with_field(FieldDefinition::new("body", FieldType::FullText))
                    .with_field(FieldDefinition::new("price", FieldType::Numeric).sortable())
                    .with_field(FieldDefinition::new("loc", FieldType::Geo)),
            )
            .unwrap(),
        );
        let index = Arc::new(SearchIndex::new(Arc::clone(&schema)));
        (schema, DocumentIndexer::new(index))
    }

    #[test]
    fn test_preprocess_error_aborts_before_indexing() {
        let (schema, indexer) = setup();
        let mut ctx = AddDocumentCtx::new();
        ctx.attach(
            Arc::clone(&schema),
            Document::new("k")
                .with_field("body", "hello")
                .with_field("price", "abc")
                .with_field("loc", "1,2"),
        )
        .unwrap();

        assert!(!add_to_indexes(&mut ctx, &indexer));
        assert_eq!(ctx.status().code(), Some(ErrorCode::ParseError));
        assert!(ctx.doc_id().is_none());
        assert!(ctx.sort_vector().unwrap().get(0).unwrap().is_nil());

        let index = indexer.index();
        assert!(index.docs().is_empty().unwrap());
        assert!(index.inverted().postings("hello").unwrap().is_empty());
        assert!(index
            .open_geo(schema.field("loc").unwrap(), false)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let (schema, indexer) = setup();
        let mut ctx = AddDocumentCtx::new();
        ctx.attach(
            schema,
            Document::new("k")
                .with_field("other", "abc")
                .with_field("body", "hello"),
        )
        .unwrap();

        assert!(add_to_indexes(&mut ctx, &indexer));
        assert!(ctx.status().is_ok());
        assert_eq!(ctx.field_data()[0], crate::context::FieldData::None);
    }

    #[test]
    fn test_geo_format_error() {
        let (schema, indexer) = setup();
        let mut ctx = AddDocumentCtx::new();
        ctx.attach(Arc::clone(&schema), Document::new("k").with_field("loc", "not-a-pair"))
            .unwrap();

        assert!(!add_to_indexes(&mut ctx, &indexer));
        assert_eq!(ctx.status().code(), Some(ErrorCode::GeoFormat));
        assert!(indexer
            .index()
            .open_geo(schema.field("loc").unwrap(), false)
            .unwrap()
            .is_none());
    }
}
