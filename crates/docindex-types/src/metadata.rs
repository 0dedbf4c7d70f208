//! Per-document metadata kept by the document table.

use serde::{Deserialize, Serialize};

use crate::document::DocId;
use crate::sortable::SortVector;

/// Token position range of one full-text field inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteOffsetField {
    pub field_id: u32,
    /// Position of the first token of the field (1-based, document-wide)
    pub first_tok_pos: u32,
    /// Position of the last token of the field
    pub last_tok_pos: u32,
}

/// Byte offsets of every token in a document, grouped by field.
///
/// `offsets[pos - 1]` is the byte offset of the token at position `pos`
/// within its field's raw value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ByteOffsets {
    fields: Vec<ByteOffsetField>,
    offsets: Vec<u32>,
}

impl ByteOffsets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve room for `n` more fields.
    pub fn reserve_fields(&mut self, n: usize) {
        self.fields.reserve(n);
    }

    /// Start a new field whose first token will sit at `first_tok_pos`.
    ///
    /// Returns the field's slot for [`ByteOffsets::set_last_pos`].
    pub fn add_field(&mut self, field_id: u32, first_tok_pos: u32) -> usize {
        self.fields.push(ByteOffsetField {
            field_id,
            first_tok_pos,
            last_tok_pos: first_tok_pos.saturating_sub(1),
        });
        self.fields.len() - 1
    }

    pub fn set_last_pos(&mut self, slot: usize, last_tok_pos: u32) {
        if let Some(f) = self.fields.get_mut(slot) {
            f.last_tok_pos = last_tok_pos;
        }
    }

    /// Record the byte offset of the next token.
    pub fn push_offset(&mut self, offset: u32) {
        self.offsets.push(offset);
    }

    pub fn field(&self, field_id: u32) -> Option<&ByteOffsetField> {
        self.fields.iter().find(|f| f.field_id == field_id)
    }

    pub fn fields(&self) -> &[ByteOffsetField] {
        &self.fields
    }

    /// Byte offset of the token at document position `pos` (1-based).
    pub fn offset_of(&self, pos: u32) -> Option<u32> {
        if pos == 0 {
            return None;
        }
        self.offsets.get(pos as usize - 1).copied()
    }

    pub fn num_offsets(&self) -> usize {
        self.offsets.len()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
        self.offsets.clear();
    }
}

/// Metadata record for an indexed document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub id: DocId,
    pub key: String,
    pub score: f32,
    pub payload: Option<Vec<u8>>,
    pub sort_vector: Option<SortVector>,
    pub byte_offsets: Option<ByteOffsets>,
    /// Highest term frequency in the document
    pub max_freq: u32,
    /// Number of tokens in the document
    pub len: u32,
    pub deleted: bool,
}

impl DocumentMetadata {
    pub fn new(id: DocId, key: impl Into<String>, score: f32) -> Self {
        Self {
            id,
            key: key.into(),
            score,
            ..Default::default()
        }
    }
}
