//! Partial updates.
//!
//! A partial update that touches an indexable field is turned into a full
//! reindex: every schema field is reloaded from the document store, the
//! supplied fields are merged over it and the result is attached again.
//! One that touches only score, payload or sortable values patches the
//! metadata table directly and completes without indexing.

use std::sync::Arc;

use tracing::{debug, warn};

use docindex_index::{IndexError, SearchIndex};
use docindex_types::{
    Document, DocumentField, ErrorCode, FieldType, IngestError, SortVector,
    SortableValue,
};

use crate::completion::{Completion, ExecutionScope};
use crate::context::AddDocumentCtx;
use crate::dedup::FieldDedup;
use crate::field_type::parse_numeric;
use crate::store::DocumentStore;

/// What the caller does after [`handle_partial_update`].
#[derive(Debug)]
pub enum PartialOutcome {
    /// Continue with scheduling and indexing of the re-attached context
    Reindex(Box<AddDocumentCtx>),
    /// The request was completed, successfully or not
    Completed,
}

/// Route a partial update to the reindex or metadata-only path.
///
/// Unless the request is `no_save`, the supplied fields are written to the
/// document store only once the target document is known to exist and, on
/// the metadata-only path, once every change was applied.
pub fn handle_partial_update(
    mut ctx: Box<AddDocumentCtx>,
    index: &SearchIndex,
    store: &dyn DocumentStore,
    completion: &Completion,
) -> PartialOutcome {
    if ctx.state.has_indexables() {
        match reload_and_merge(&mut ctx, index, store) {
            Ok(()) => PartialOutcome::Reindex(ctx),
            Err(err) => {
                ctx.status.set_error(err);
                completion.finish(ctx, ExecutionScope::Caller);
                PartialOutcome::Completed
            }
        }
    } else {
        let result = update_metadata_only(&ctx, index).and_then(|()| save_supplied(&ctx, store));
        if let Err(err) = result {
            ctx.status.set_error(err);
        }
        completion.finish(ctx, ExecutionScope::Caller);
        PartialOutcome::Completed
    }
}

fn missing_document() -> IngestError {
    IngestError::new(ErrorCode::MissingDocument, "Could not load existing document")
}

/// Write the request's fields to the document store unless it is `no_save`.
fn save_supplied(ctx: &AddDocumentCtx, store: &dyn DocumentStore) -> Result<(), IngestError> {
    if ctx.options.no_save {
        return Ok(());
    }
    store
        .save_fields(&ctx.doc.key, &ctx.doc.fields)
        .map(|_| ())
        .map_err(|e| {
            warn!(key = %ctx.doc.key, error = %e, "Document store write failed");
            IngestError::new(ErrorCode::IndexGeneric, e.to_string())
        })
}

/// Replace the context's document with the stored one plus the supplied fields.
fn reload_and_merge(
    ctx: &mut AddDocumentCtx,
    index: &SearchIndex,
    store: &dyn DocumentStore,
) -> Result<(), IngestError> {
    let key = ctx.doc.key.clone();
    let indexed = index
        .docs()
        .exists(&key)
        .map_err(|e| IngestError::new(ErrorCode::IndexGeneric, e.to_string()))?;
    if !indexed {
        return Err(missing_document());
    }

    let schema = index.schema();
    let names = schema.field_names();
    let loaded = match store.load_fields(&key, &names) {
        Ok(Some(fields)) => fields,
        Ok(None) => return Err(missing_document()),
        Err(e) => {
            warn!(key = %key, error = %e, "Document store read failed");
            return Err(missing_document());
        }
    };
    save_supplied(ctx, store)?;

    let supplied = std::mem::take(&mut ctx.doc.fields);
    let mut merged = Document {
        fields: loaded,
        ..std::mem::take(&mut ctx.doc)
    };
    for field in supplied {
        merge_field(&mut merged.fields, field);
    }
    debug!(key = %key, fields = merged.fields.len(), "Reloaded document for reindex");

    ctx.attach(Arc::clone(schema), merged)
}

fn merge_field(fields: &mut Vec<DocumentField>, field: DocumentField) {
    match fields
        .iter_mut()
        .find(|f| f.name.eq_ignore_ascii_case(&field.name))
    {
        Some(existing) => existing.value = field.value,
        None => fields.push(field),
    }
}

/// A validated sort-vector write.
struct StagedSortable {
    slot: usize,
    value: SortableValue,
}

/// Update score, payload and sortable values of an indexed document.
///
/// Every change is validated before any is applied.
pub(crate) fn update_metadata_only(
    ctx: &AddDocumentCtx,
    index: &SearchIndex,
) -> Result<(), IngestError> {
    let schema = index.schema();
    let doc = &ctx.doc;

    let doc_id = index
        .docs()
        .get_id(&doc.key)
        .map_err(|e| IngestError::new(ErrorCode::IndexGeneric, e.to_string()))?
        .ok_or_else(|| IngestError::new(ErrorCode::MissingDocument, "Couldn't load old document"))?;

    let mut staged = Vec::new();
    if ctx.state.has_sortables {
        let mut dedup = FieldDedup::new(schema.num_fields());
        for field in &doc.fields {
            let Some(fs) = schema.field(&field.name) else { continue };
            if !fs.is_sortable() {
                continue;
            }
            if !dedup.insert(fs.index) {
                return Err(IngestError::new(
                    ErrorCode::DuplicateField,
                    "Requested to index field twice",
                ));
            }
            let Some(slot) = schema.field_sorting_index(&field.name) else { continue };

            let value = match fs.field_type {
                FieldType::FullText => SortableValue::Str(field.value.clone()),
                FieldType::Numeric => {
                    let num = parse_numeric(&field.value).ok_or_else(|| {
                        IngestError::new(ErrorCode::ParseError, "Could not parse numeric index value")
                    })?;
                    SortableValue::Num(num)
                }
                _ => {
                    return Err(IngestError::new(
                        ErrorCode::UnsupportedType,
                        "Unsupported sortable type",
                    ))
                }
            };
            staged.push(StagedSortable { slot, value });
        }
    }

    let score = doc.score;
    let payload = doc.payload.clone();
    let sortables = schema.sortable_count();
    let writes = staged.len();
    index
        .docs()
        .update(doc_id, move |md| {
            md.score = score;
            if payload.is_some() {
                md.payload = payload;
            }
            if !staged.is_empty() {
                let sv = md
                    .sort_vector
                    .get_or_insert_with(|| SortVector::new(sortables));
                for write in staged {
                    match write.value {
                        SortableValue::Str(s) => sv.put_str(write.slot, &s),
                        other => sv.put(write.slot, other),
                    }
                }
            }
        })
        .map_err(|e| match e {
            IndexError::UnknownDocument(_) => IngestError::new(
                ErrorCode::MissingDocument,
                "Couldn't load document metadata",
            ),
            other => IngestError::new(ErrorCode::IndexGeneric, other.to_string()),
        })?;

    debug!(key = %doc.key, doc_id, sortables = writes, "Updated document metadata");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docindex_types::{FieldDefinition, IndexSchema, SchemaDefinition};

    fn index() -> SearchIndex {
        let schema = IndexSchema::from_definition(
            SchemaDefinition::new("idx")
                .with_field(FieldDefinition::new("title", FieldType::FullText).sortable().no_index())
                .with_field(FieldDefinition::new("price", FieldType::Numeric).sortable().no_index())
                .with_field(FieldDefinition::new("color", FieldType::Tag).sortable().no_index()),
        )
        .unwrap();
        SearchIndex::new(Arc::new(schema))
    }

    fn ctx_with(doc: Document) -> AddDocumentCtx {
        let mut ctx = AddDocumentCtx::new();
        ctx.doc = doc;
        ctx.state.has_sortables = true;
        ctx
    }

    #[test]
    fn test_updates_score_payload_and_sortables() {
        let index = index();
        let id = index.docs().put("k", 1.0, Some(b"old".to_vec())).unwrap();

        let ctx = ctx_with(
            Document::new("k")
                .with_score(0.3)
                .with_field("title", "New Title")
                .with_field("price", "42"),
        );
        update_metadata_only(&ctx, &index).unwrap();

        let md = index.docs().get(id).unwrap().unwrap();
        assert_eq!(md.score, 0.3);
        assert_eq!(md.payload, Some(b"old".to_vec()));
        let sv = md.sort_vector.unwrap();
        assert_eq!(sv.get(0).unwrap().as_str(), Some("new title"));
        assert_eq!(sv.get(1).unwrap().as_num(), Some(42.0));
    }

    #[test]
    fn test_unknown_key() {
        let index = index();
        let ctx = ctx_with(Document::new("missing"));
        let err = update_metadata_only(&ctx, &index).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingDocument);
        assert_eq!(err.detail.as_deref(), Some("Couldn't load old document"));
    }

    #[test]
    fn test_second_write_to_slot_rejected_without_changes() {
        let index = index();
        let id = index.docs().put("k", 1.0, None).unwrap();

        let ctx = ctx_with(
            Document::new("k")
                .with_score(0.1)
                .with_field("price", "1")
                .with_field("PRICE", "2"),
        );
        let err = update_metadata_only(&ctx, &index).unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateField);

        let md = index.docs().get(id).unwrap().unwrap();
        assert_eq!(md.score, 1.0);
        assert!(md.sort_vector.is_none());
    }

    #[test]
    fn test_parse_and_type_errors() {
        let index = index();
        index.docs().put("k", 1.0, None).unwrap();

        let ctx = ctx_with(Document::new("k").with_field("price", "abc"));
        let err = update_metadata_only(&ctx, &index).unwrap_err();
        assert_eq!(err.code, ErrorCode::ParseError);
        assert_eq!(err.detail.as_deref(), Some("Could not parse numeric index value"));

        let ctx = ctx_with(Document::new("k").with_field("color", "red"));
        let err = update_metadata_only(&ctx, &index).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedType);
    }

    #[test]
    fn test_merge_field_case_insensitive() {
        let mut fields = vec![DocumentField::new("Title", "old"), DocumentField::new("body", "b")];
        merge_field(&mut fields, DocumentField::new("title", "new"));
        merge_field(&mut fields, DocumentField::new("extra", "e"));
        assert_eq!(fields[0].value, "new");
        assert_eq!(fields.len(), 3);
    }
}
