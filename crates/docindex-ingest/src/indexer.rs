//! Document indexer: assigns ids and applies preprocessed documents to the
//! shared index structures.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use docindex_index::{IndexError, SearchIndex};
use docindex_types::{ErrorCode, FieldType, IngestError};

use crate::context::AddDocumentCtx;
use crate::field_type::{BulkHandle, FieldIndexer};

/// Applies batches of preprocessed contexts to one [`SearchIndex`].
#[derive(Debug, Clone)]
pub struct DocumentIndexer {
    index: Arc<SearchIndex>,
}

impl DocumentIndexer {
    pub fn new(index: Arc<SearchIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &Arc<SearchIndex> {
        &self.index
    }

    /// Index a single context.
    pub fn add(&self, ctx: &mut AddDocumentCtx) -> Result<(), IngestError> {
        self.add_batch(&mut [&mut *ctx]);
        ctx.status.to_result()
    }

    /// Index a batch of contexts.
    ///
    /// Every context's outcome is left in its status. A failing document
    /// skips its remaining field adds and is removed from the metadata
    /// table; the other documents of the batch are unaffected. Returns the
    /// number of documents indexed successfully.
    pub fn add_batch(&self, ctxs: &mut [&mut AddDocumentCtx]) -> usize {
        for ctx in ctxs.iter_mut() {
            if ctx.status.is_ok() {
                self.assign_id(ctx);
            }
        }

        for ctx in ctxs.iter_mut() {
            if ctx.status.has_error() || !ctx.state.has_indexable_text {
                continue;
            }
            let Some(doc_id) = ctx.doc_id else { continue };
            match self.index.inverted().commit(doc_id, &ctx.fw_idx) {
                Ok(_) => ctx.state.text_indexed = true,
                Err(e) => ctx
                    .status
                    .set_error(IngestError::new(ErrorCode::IndexGeneric, e.to_string())),
            }
        }

        // One handle per schema field, opened on first use in the batch
        let mut handles: HashMap<usize, BulkHandle> = HashMap::new();
        for ctx in ctxs.iter_mut() {
            if ctx.status.has_error() {
                continue;
            }
            let Some(doc_id) = ctx.doc_id else { continue };

            let mut failed = None;
            for (fs, data) in ctx.fspecs.iter().zip(ctx.fdatas.iter()) {
                let Some(fs) = fs else { continue };
                if fs.field_type == FieldType::FullText || !fs.is_indexable() {
                    continue;
                }
                let handle = handles.entry(fs.index).or_insert_with(|| {
                    FieldIndexer::for_type(fs.field_type)
                        .bulk()
                        .init(&self.index, fs)
                });
                if let Err(e) = handle.add(&self.index, fs, doc_id, data) {
                    failed = Some(e);
                    break;
                }
            }

            match failed {
                Some(e) => ctx.status.set_error(e),
                None => ctx.state.other_indexed = true,
            }
        }
        handles.into_values().for_each(BulkHandle::finalize);

        let mut indexed = 0;
        for ctx in ctxs.iter_mut() {
            if self.store_metadata(ctx) {
                indexed += 1;
            }
        }
        debug!(batch = ctxs.len(), indexed, "Indexed batch");
        indexed
    }

    fn assign_id(&self, ctx: &mut AddDocumentCtx) {
        let docs = self.index.docs();
        let key = ctx.doc.key.as_str();

        if ctx.options.is_replace() {
            match docs.pop(key) {
                Ok(old) => ctx.old_md = old,
                Err(e) => {
                    ctx.status
                        .set_error(IngestError::new(ErrorCode::IndexGeneric, e.to_string()));
                    return;
                }
            }
        }

        match docs.put(key, ctx.doc.score, ctx.doc.payload.clone()) {
            Ok(id) => ctx.doc_id = Some(id),
            Err(IndexError::DocumentExists(_)) => ctx.status.set_error(IngestError::new(
                ErrorCode::DocumentExists,
                "Document already exists",
            )),
            Err(e) => ctx
                .status
                .set_error(IngestError::new(ErrorCode::IndexGeneric, e.to_string())),
        }
    }

    /// Publish per-document metadata, or hide a failed document.
    fn store_metadata(&self, ctx: &mut AddDocumentCtx) -> bool {
        let Some(doc_id) = ctx.doc_id else {
            return false;
        };
        let docs = self.index.docs();

        if ctx.status.is_ok() {
            let sv = ctx.sv.clone();
            let byte_offsets = ctx.byte_offsets.clone();
            let max_freq = ctx.fw_idx.max_freq();
            let len = ctx.total_tokens;
            let stored = docs.update(doc_id, move |md| {
                md.sort_vector = sv;
                md.byte_offsets = byte_offsets;
                md.max_freq = max_freq;
                md.len = len;
            });
            match stored {
                Ok(()) => return true,
                Err(e) => ctx
                    .status
                    .set_error(IngestError::new(ErrorCode::IndexGeneric, e.to_string())),
            }
        }

        if let Err(e) = docs.delete(doc_id) {
            warn!(doc_id, error = %e, "Could not remove failed document");
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AddOptions;
    use crate::driver::preprocess_fields;
    use docindex_types::{Document, FieldDefinition, IndexSchema, SchemaDefinition};

    fn setup() -> (Arc<IndexSchema>, DocumentIndexer) {
        let schema = Arc::new(
            IndexSchema::from_definition(
                SchemaDefinition::new("idx")
                    .with_field(FieldDefinition::new("body", FieldType::FullText))
                    .with_field(FieldDefinition::new("price", FieldType::Numeric).sortable())
                    .with_field(FieldDefinition::new("loc", FieldType::Geo))
                    .with_field(FieldDefinition::new("tags", FieldType::Tag)),
            )
            .unwrap(),
        );
        let index = Arc::new(SearchIndex::new(Arc::clone(&schema)));
        (schema, DocumentIndexer::new(index))
    }

    fn prepared(schema: &Arc<IndexSchema>, doc: Document, options: AddOptions) -> AddDocumentCtx {
        let mut ctx = AddDocumentCtx::new();
        ctx.options = options;
        ctx.attach(Arc::clone(schema), doc).unwrap();
        preprocess_fields(&mut ctx).unwrap();
        ctx
    }

    #[test]
    fn test_add_indexes_all_structures() {
        let (schema, indexer) = setup();
        let mut ctx = prepared(
            &schema,
            Document::new("doc:1")
                .with_score(0.5)
                .with_field("body", "quick fox")
                .with_field("price", "12")
                .with_field("loc", "10,20")
                .with_field("tags", "a,b"),
            AddOptions::default(),
        );
        indexer.add(&mut ctx).unwrap();

        let index = indexer.index();
        let id = ctx.doc_id().unwrap();
        assert_eq!(index.inverted().postings("quick").unwrap()[0].doc_id, id);

        let md = index.docs().get(id).unwrap().unwrap();
        assert_eq!(md.score, 0.5);
        assert_eq!(md.len, 2);
        assert_eq!(md.max_freq, 1);
        assert_eq!(md.sort_vector.unwrap().get(0).unwrap().as_num(), Some(12.0));

        let tags = index.open_tag(schema.field("tags").unwrap(), false).unwrap().unwrap();
        assert_eq!(tags.read().unwrap().docs_for("b"), vec![id]);
        let geo = index.open_geo(schema.field("loc").unwrap(), false).unwrap().unwrap();
        assert_eq!(geo.read().unwrap().position(id), Some((10.0, 20.0)));
        assert!(ctx.state().text_indexed && ctx.state().other_indexed);
    }

    #[test]
    fn test_existing_key_without_replace() {
        let (schema, indexer) = setup();
        let mut first = prepared(&schema, Document::new("k").with_field("body", "a"), AddOptions::default());
        indexer.add(&mut first).unwrap();

        let mut second = prepared(&schema, Document::new("k").with_field("body", "b"), AddOptions::default());
        let err = indexer.add(&mut second).unwrap_err();
        assert_eq!(err.code, ErrorCode::DocumentExists);
        assert_eq!(err.detail.as_deref(), Some("Document already exists"));
        assert_eq!(indexer.index().docs().get_id("k").unwrap(), first.doc_id());
    }

    #[test]
    fn test_replace_assigns_new_id() {
        let (schema, indexer) = setup();
        let mut first = prepared(&schema, Document::new("k").with_field("body", "a"), AddOptions::default());
        indexer.add(&mut first).unwrap();

        let replace = AddOptions {
            replace: true,
            ..Default::default()
        };
        let mut second = prepared(&schema, Document::new("k").with_field("body", "b"), replace);
        indexer.add(&mut second).unwrap();

        assert_ne!(first.doc_id(), second.doc_id());
        assert_eq!(second.old_metadata().unwrap().id, first.doc_id().unwrap());
        assert_eq!(indexer.index().docs().len().unwrap(), 1);
    }

    #[test]
    fn test_failed_document_does_not_affect_batch() {
        let (schema, indexer) = setup();
        let mut good = prepared(
            &schema,
            Document::new("good").with_field("price", "1").with_field("loc", "1,1"),
            AddOptions::default(),
        );
        let mut bad = prepared(
            &schema,
            Document::new("bad").with_field("loc", "999,1").with_field("price", "2"),
            AddOptions::default(),
        );

        let indexed = indexer.add_batch(&mut [&mut good, &mut bad]);
        assert_eq!(indexed, 1);
        assert!(good.status().is_ok());
        assert_eq!(bad.status().code(), Some(ErrorCode::IndexGeneric));

        let index = indexer.index();
        assert!(!index.docs().exists("bad").unwrap());
        assert!(index.docs().exists("good").unwrap());

        // The failing geo add stopped the numeric add that followed it
        let tree = index.open_numeric(schema.field("price").unwrap(), false).unwrap().unwrap();
        assert_eq!(tree.read().unwrap().range(0.0, 10.0), vec![(1.0, good.doc_id().unwrap())]);
        assert!(!bad.state().other_indexed);
    }
}
