//! Per-document duplicate detection over schema field ordinals.

/// Bitmap with one bit per schema field.
#[derive(Debug, Clone, Default)]
pub struct FieldDedup {
    bits: Vec<u64>,
}

impl FieldDedup {
    pub fn new(num_fields: usize) -> Self {
        Self {
            bits: vec![0; num_fields.div_ceil(64)],
        }
    }

    /// Mark `ordinal` as seen. Returns false if it was already marked.
    ///
    /// Ordinals beyond the sized range grow the bitmap.
    pub fn insert(&mut self, ordinal: usize) -> bool {
        let (word, bit) = (ordinal / 64, ordinal % 64);
        if word >= self.bits.len() {
            self.bits.resize(word + 1, 0);
        }
        let mask = 1u64 << bit;
        let fresh = self.bits[word] & mask == 0;
        self.bits[word] |= mask;
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_detects_duplicates() {
        let mut dedup = FieldDedup::new(130);
        assert!(dedup.insert(0));
        assert!(dedup.insert(129));
        assert!(!dedup.insert(0));
        assert!(!dedup.insert(129));
        assert!(dedup.insert(64));
    }

    #[test]
    fn test_grows_past_size() {
        let mut dedup = FieldDedup::new(0);
        assert!(dedup.insert(200));
        assert!(!dedup.insert(200));
    }
}
