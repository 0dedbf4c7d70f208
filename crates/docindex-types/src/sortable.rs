//! Sort vector: fixed-slot per-document values for sort-by-value queries.

use serde::{Deserialize, Serialize};

/// A single sort-vector slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum SortableValue {
    #[default]
    Nil,
    Str(String),
    Num(f64),
}

impl SortableValue {
    pub fn is_nil(&self) -> bool {
        matches!(self, SortableValue::Nil)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SortableValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            SortableValue::Num(n) => Some(*n),
            _ => None,
        }
    }
}

/// Fixed-size vector with one slot per sortable schema field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SortVector {
    values: Vec<SortableValue>,
}

impl SortVector {
    /// Allocate `len` empty slots.
    pub fn new(len: usize) -> Self {
        Self {
            values: vec![SortableValue::Nil; len],
        }
    }

    /// Store a string value. Strings are case-folded so they sort case-insensitively.
    ///
    /// Out-of-range slots are ignored.
    pub fn put_str(&mut self, idx: usize, value: &str) {
        if let Some(slot) = self.values.get_mut(idx) {
            *slot = SortableValue::Str(value.to_lowercase());
        }
    }

    /// Store a numeric value. Out-of-range slots are ignored.
    pub fn put_num(&mut self, idx: usize, value: f64) {
        if let Some(slot) = self.values.get_mut(idx) {
            *slot = SortableValue::Num(value);
        }
    }

    /// Store an already-built value. Out-of-range slots are ignored.
    pub fn put(&mut self, idx: usize, value: SortableValue) {
        if let Some(slot) = self.values.get_mut(idx) {
            *slot = value;
        }
    }

    pub fn get(&self, idx: usize) -> Option<&SortableValue> {
        self.values.get(idx)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of slots holding a value.
    pub fn filled(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nil()).count()
    }
}
