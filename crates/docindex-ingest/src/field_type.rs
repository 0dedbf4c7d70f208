//! Per-type field processing.
//!
//! Each [`FieldType`] maps to a preprocessor and a bulk indexer:
//!
//! | type     | preprocess                           | bulk init      | bulk add             |
//! |----------|--------------------------------------|----------------|----------------------|
//! | FullText | sortable copy, tokenize into fw idx  | none           | none                 |
//! | Numeric  | parse `f64`, sortable copy           | open tree      | insert value         |
//! | Geo      | split "lon,lat"                      | none           | open index, insert   |
//! | Tag      | split and normalize, sortable copy   | open tag index | insert tags          |
//!
//! Preprocessors only touch the context. Bulk adds mutate the shared
//! structures and run after every field of the document preprocessed.

use std::sync::{Arc, RwLock};

use tracing::warn;

use docindex_index::{NumericRangeTree, SearchIndex, TagIndex, TokenizeOptions};
use docindex_types::{DocId, ErrorCode, FieldSpec, FieldType, IngestError};

use crate::context::{AddDocumentCtx, FieldData};

/// Parse a numeric field value. Rejects empty input, trailing garbage and NaN.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Preprocessor selected by field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldIndexer {
    FullText,
    Numeric,
    Geo,
    Tag,
}

impl FieldIndexer {
    pub fn for_type(field_type: FieldType) -> Self {
        match field_type {
            FieldType::FullText => FieldIndexer::FullText,
            FieldType::Numeric => FieldIndexer::Numeric,
            FieldType::Geo => FieldIndexer::Geo,
            FieldType::Tag => FieldIndexer::Tag,
        }
    }

    /// Bulk indexer paired with this field type.
    pub fn bulk(&self) -> BulkIndexer {
        match self {
            FieldIndexer::FullText => BulkIndexer::None,
            FieldIndexer::Numeric => BulkIndexer::Numeric,
            FieldIndexer::Geo => BulkIndexer::Geo,
            FieldIndexer::Tag => BulkIndexer::Tag,
        }
    }

    /// Transform document field `idx` into its typed value.
    ///
    /// Full-text fields write into the context's private forward index and
    /// byte offsets. Sortable values are written only once the raw value is
    /// known to be valid.
    pub fn preprocess(
        &self,
        ctx: &mut AddDocumentCtx,
        idx: usize,
        fs: &FieldSpec,
    ) -> Result<FieldData, IngestError> {
        let raw = ctx.doc.fields[idx].value.as_str();

        match self {
            FieldIndexer::FullText => {
                if let (Some(sv), Some(slot)) = (ctx.sv.as_mut(), fs.sort_idx) {
                    sv.put_str(slot, raw);
                }
                if !fs.is_indexable() {
                    return Ok(FieldData::None);
                }

                let tokenizer = ctx.tokenizer.as_mut().ok_or_else(|| {
                    IngestError::new(ErrorCode::IndexGeneric, "Tokenizer not initialized")
                })?;
                let base = ctx.total_tokens;
                let slot = ctx
                    .byte_offsets
                    .as_mut()
                    .map(|bo| bo.add_field(fs.text_id, base + 1));

                let fw = &mut ctx.fw_idx;
                let offsets = &mut ctx.byte_offsets;
                let options = TokenizeOptions {
                    no_stem: fs.is_no_stem(),
                    phonetic: fs.is_phonetic(),
                };
                let count = tokenizer.tokenize(raw, options, |tok| {
                    let pos = base + tok.pos;
                    fw.add_term(tok.term, fs.text_id, pos, fs.weight, false);
                    if let Some(stem) = tok.stem {
                        fw.add_term(&format!("+{}", stem), fs.text_id, pos, fs.weight, true);
                    }
                    if let Some(bo) = offsets.as_mut() {
                        bo.push_offset(tok.byte_offset);
                    }
                });

                if let (Some(bo), Some(slot)) = (ctx.byte_offsets.as_mut(), slot) {
                    bo.set_last_pos(slot, base + count);
                }
                ctx.total_tokens = base + count;
                Ok(FieldData::None)
            }

            FieldIndexer::Numeric => {
                let value = parse_numeric(raw).ok_or_else(|| {
                    IngestError::new(
                        ErrorCode::ParseError,
                        format!("Could not parse `{}` as a number for field `{}`", raw, fs.name),
                    )
                })?;
                if let (Some(sv), Some(slot)) = (ctx.sv.as_mut(), fs.sort_idx) {
                    sv.put_num(slot, value);
                }
                Ok(FieldData::Numeric(value))
            }

            FieldIndexer::Geo => {
                let sep = raw.find(|c| c == ' ' || c == ',').ok_or_else(|| {
                    IngestError::new(
                        ErrorCode::GeoFormat,
                        format!("Invalid geo value `{}` for field `{}`", raw, fs.name),
                    )
                })?;
                Ok(FieldData::Geo {
                    lon: raw[..sep].to_string(),
                    lat: raw[sep + 1..].to_string(),
                })
            }

            FieldIndexer::Tag => {
                let Some(tags) = TagIndex::preprocess(raw, fs.tag_separator, fs.tag_case_sensitive)
                else {
                    return Ok(FieldData::None);
                };
                if let (Some(sv), Some(slot)) = (ctx.sv.as_mut(), fs.sort_idx) {
                    sv.put_str(slot, raw);
                }
                Ok(FieldData::Tags(tags))
            }
        }
    }
}

/// Bulk-indexer selector. `init` opens a [`BulkHandle`] for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkIndexer {
    /// Types with no shared structure (full text commits via the forward index)
    None,
    Numeric,
    Geo,
    Tag,
}

impl BulkIndexer {
    /// Open the structure for `fs` once per batch.
    ///
    /// A structure that cannot be opened yields a handle whose `add` fails.
    pub fn init(&self, index: &SearchIndex, fs: &FieldSpec) -> BulkHandle {
        match self {
            BulkIndexer::None => BulkHandle::None,
            BulkIndexer::Geo => BulkHandle::Geo,
            BulkIndexer::Numeric => BulkHandle::Numeric(open_or_warn(index.open_numeric(fs, true), fs)),
            BulkIndexer::Tag => BulkHandle::Tag(open_or_warn(index.open_tag(fs, true), fs)),
        }
    }
}

fn open_or_warn<T>(
    opened: Result<Option<Arc<RwLock<T>>>, docindex_index::IndexError>,
    fs: &FieldSpec,
) -> Option<Arc<RwLock<T>>> {
    match opened {
        Ok(handle) => handle,
        Err(e) => {
            warn!(field = %fs.name, error = %e, "Could not open field index");
            None
        }
    }
}

/// An opened per-field structure, live for one indexing batch.
#[derive(Debug)]
pub enum BulkHandle {
    None,
    Numeric(Option<Arc<RwLock<NumericRangeTree>>>),
    /// Geo opens its index on each add
    Geo,
    Tag(Option<Arc<RwLock<TagIndex>>>),
}

fn generic(detail: &str) -> IngestError {
    IngestError::new(ErrorCode::IndexGeneric, detail)
}

impl BulkHandle {
    /// Insert one document's value for this field.
    pub fn add(
        &mut self,
        index: &SearchIndex,
        fs: &FieldSpec,
        doc_id: DocId,
        data: &FieldData,
    ) -> Result<(), IngestError> {
        match self {
            BulkHandle::None => Ok(()),

            BulkHandle::Numeric(tree) => {
                let tree = tree
                    .as_ref()
                    .ok_or_else(|| generic("Could not open numeric index for indexing"))?;
                let FieldData::Numeric(value) = data else {
                    return Err(generic("Missing numeric value"));
                };
                tree.write()
                    .map_err(|_| generic("Numeric index is locked"))?
                    .add(doc_id, *value);
                Ok(())
            }

            BulkHandle::Geo => {
                let FieldData::Geo { lon, lat } = data else {
                    return Err(generic("Could not index geo value"));
                };
                let geo = index
                    .open_geo(fs, true)
                    .ok()
                    .flatten()
                    .ok_or_else(|| generic("Could not index geo value"))?;
                let mut geo = geo.write().map_err(|_| generic("Could not index geo value"))?;
                geo.add_strings(doc_id, lon, lat)
                    .map_err(|_| generic("Could not index geo value"))?;
                Ok(())
            }

            BulkHandle::Tag(tags_index) => {
                let tags_index = tags_index
                    .as_ref()
                    .ok_or_else(|| generic("Could not open tag index for indexing"))?;
                if let FieldData::Tags(tags) = data {
                    tags_index
                        .write()
                        .map_err(|_| generic("Tag index is locked"))?
                        .index(doc_id, tags);
                }
                Ok(())
            }
        }
    }

    /// Release the handle at the end of the batch.
    pub fn finalize(self) {}
}
