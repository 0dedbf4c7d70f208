//! The ingestion context: per-document state from attach to completion.

use std::sync::{Arc, Weak};

use tracing::{trace, warn};

use docindex_index::{ForwardIndex, Tokenizer};
use docindex_types::{
    ByteOffsets, DocId, Document, DocumentMetadata, ErrorCode, FieldSpec, FieldType, IndexSchema,
    IngestError, IngestStatus, SortVector,
};

use crate::completion::DoneCallback;
use crate::dedup::FieldDedup;

/// Request options for one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddOptions {
    /// Patch an existing document with the supplied fields
    pub partial: bool,
    /// Replace an existing document with the same key
    pub replace: bool,
    /// Do not write the fields to the document store
    pub no_save: bool,
    /// Never run off the calling thread
    pub no_block: bool,
}

impl AddOptions {
    /// A partial update always replaces.
    pub fn is_replace(&self) -> bool {
        self.replace || self.partial
    }
}

/// Typed per-field scratch value produced by preprocessing.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FieldData {
    #[default]
    None,
    Numeric(f64),
    Geo { lon: String, lat: String },
    Tags(Vec<String>),
}

/// Summary flags computed at attach time and updated while indexing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateFlags {
    pub has_sortables: bool,
    pub has_indexable_text: bool,
    pub has_indexable_other: bool,
    pub no_block: bool,
    /// All full-text fields are committed (trivially true with none)
    pub text_indexed: bool,
    /// All non-text fields are indexed (trivially true with none)
    pub other_indexed: bool,
}

impl StateFlags {
    pub fn has_indexables(&self) -> bool {
        self.has_indexable_text || self.has_indexable_other
    }
}

/// Mutable state for ingesting one document.
///
/// Contexts come from a [`ContextPool`](crate::ContextPool) and are owned by
/// exactly one pipeline stage at a time.
pub struct AddDocumentCtx {
    pub(crate) schema: Option<Arc<IndexSchema>>,
    pub(crate) doc: Document,
    /// Resolved spec per document field; `None` for unknown fields
    pub(crate) fspecs: Vec<Option<Arc<FieldSpec>>>,
    pub(crate) fdatas: Vec<FieldData>,
    pub(crate) fw_idx: ForwardIndex,
    pub(crate) sv: Option<SortVector>,
    pub(crate) byte_offsets: Option<ByteOffsets>,
    pub(crate) status: IngestStatus,
    pub(crate) state: StateFlags,
    pub(crate) options: AddOptions,
    pub(crate) num_indexable: usize,
    pub(crate) total_tokens: u32,
    pub(crate) done: Option<DoneCallback>,
    pub(crate) old_md: Option<DocumentMetadata>,
    pub(crate) doc_id: Option<DocId>,
    pub(crate) tokenizer: Option<Tokenizer>,
    tokenizer_key: Option<(Weak<IndexSchema>, Option<String>)>,
}

impl Default for AddDocumentCtx {
    fn default() -> Self {
        Self::new()
    }
}

impl AddDocumentCtx {
    pub fn new() -> Self {
        Self {
            schema: None,
            doc: Document::default(),
            fspecs: Vec::new(),
            fdatas: Vec::new(),
            fw_idx: ForwardIndex::new(),
            sv: None,
            byte_offsets: None,
            status: IngestStatus::new(),
            state: StateFlags::default(),
            options: AddOptions::default(),
            num_indexable: 0,
            total_tokens: 0,
            done: None,
            old_md: None,
            doc_id: None,
            tokenizer: None,
            tokenizer_key: None,
        }
    }

    /// Bind `document` to this context and resolve its fields.
    ///
    /// Unknown fields get no spec. A schema field named twice fails with
    /// [`ErrorCode::DuplicateField`]; the error is also left in the status.
    pub fn attach(&mut self, schema: Arc<IndexSchema>, document: Document) -> Result<(), IngestError> {
        self.doc = document;
        let n = self.doc.fields.len();

        self.fspecs.clear();
        self.fspecs.resize(n, None);
        self.fdatas.clear();
        self.fdatas.resize_with(n, FieldData::default);
        self.num_indexable = 0;

        let mut dedup = FieldDedup::new(schema.num_fields());
        let mut has_text = false;
        let mut has_other = false;

        for (i, field) in self.doc.fields.iter().enumerate() {
            let fs = match schema.field(&field.name) {
                Some(fs) if !field.name.is_empty() => fs,
                _ => continue,
            };

            if !dedup.insert(fs.index) {
                let err = IngestError::new(
                    ErrorCode::DuplicateField,
                    format!("Tried to insert `{}` twice", fs.name),
                );
                warn!(key = %self.doc.key, field = %fs.name, "Duplicate field in document");
                self.status.set_error(err.clone());
                return Err(err);
            }
            self.fspecs[i] = Some(Arc::clone(fs));

            if fs.is_sortable() {
                self.state.has_sortables = true;
            }
            if fs.is_indexable() {
                if fs.field_type == FieldType::FullText {
                    self.num_indexable += 1;
                    has_text = true;
                } else {
                    has_other = true;
                }
            }
        }

        self.state.has_indexable_text = has_text;
        self.state.has_indexable_other = has_other;
        self.state.text_indexed = !has_text;
        self.state.other_indexed = !has_other;

        if self.state.has_sortables && self.sv.is_none() {
            self.sv = Some(SortVector::new(schema.sortable_count()));
        }

        if !self.options.no_save && self.num_indexable > 0 && schema.store_byte_offsets() {
            self.byte_offsets
                .get_or_insert_with(ByteOffsets::new)
                .reserve_fields(self.num_indexable);
        }

        if has_text {
            self.prepare_tokenizer(&schema);
        }
        self.fw_idx.reset();
        self.doc_id = None;
        self.schema = Some(schema);

        trace!(key = %self.doc.key, fields = n, "Attached document");
        Ok(())
    }

    fn prepare_tokenizer(&mut self, schema: &Arc<IndexSchema>) {
        let language = self.doc.language.clone();
        let cached = matches!(
            &self.tokenizer_key,
            Some((weak, lang))
                if *lang == language && weak.upgrade().is_some_and(|s| Arc::ptr_eq(&s, schema))
        );
        if !cached || self.tokenizer.is_none() {
            self.tokenizer = Some(Tokenizer::new(language.as_deref(), schema.stopwords()));
            self.tokenizer_key = Some((Arc::downgrade(schema), language));
        }
    }

    /// Tear down per-document state, keeping reusable allocations.
    ///
    /// The forward index, scratch vectors and tokenizer keep their capacity.
    pub fn reset(&mut self) {
        self.schema = None;
        self.doc.clear();
        self.fspecs.clear();
        self.fdatas.clear();
        self.fw_idx.reset();
        self.sv = None;
        self.byte_offsets = None;
        self.status.clear();
        self.state = StateFlags::default();
        self.options = AddOptions::default();
        self.num_indexable = 0;
        self.total_tokens = 0;
        self.done = None;
        self.old_md = None;
        self.doc_id = None;
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn key(&self) -> &str {
        &self.doc.key
    }

    pub fn schema(&self) -> Option<&Arc<IndexSchema>> {
        self.schema.as_ref()
    }

    pub fn status(&self) -> &IngestStatus {
        &self.status
    }

    pub fn state(&self) -> StateFlags {
        self.state
    }

    pub fn options(&self) -> AddOptions {
        self.options
    }

    /// Id assigned by the indexer, once indexing has started.
    pub fn doc_id(&self) -> Option<DocId> {
        self.doc_id
    }

    pub fn field_specs(&self) -> &[Option<Arc<FieldSpec>>] {
        &self.fspecs
    }

    pub fn field_data(&self) -> &[FieldData] {
        &self.fdatas
    }

    pub fn forward_index(&self) -> &ForwardIndex {
        &self.fw_idx
    }

    pub fn sort_vector(&self) -> Option<&SortVector> {
        self.sv.as_ref()
    }

    pub fn byte_offsets(&self) -> Option<&ByteOffsets> {
        self.byte_offsets.as_ref()
    }

    pub fn num_indexable(&self) -> usize {
        self.num_indexable
    }

    pub fn total_tokens(&self) -> u32 {
        self.total_tokens
    }

    /// Metadata of the document this one replaced.
    pub fn old_metadata(&self) -> Option<&DocumentMetadata> {
        self.old_md.as_ref()
    }
}

impl std::fmt::Debug for AddDocumentCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddDocumentCtx")
            .field("key", &self.doc.key)
            .field("doc_id", &self.doc_id)
            .field("status", &self.status)
            .field("state", &self.state)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
