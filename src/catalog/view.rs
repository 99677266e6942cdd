//! Zero-copy tensor views and the insertion-ordered metadata table.

use crate::catalog::decoder::Dtype;
use std::collections::HashMap;

/// Read-only view of one tensor inside the mapped buffer.
///
/// Borrows the catalog that issued it: the `data` slice points straight into
/// the mapping, so the view can never outlive the catalog (and therefore the
/// mapping) by construction. Copy the bytes out if they must survive longer.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
    name: &'a str,
    shape: &'a [usize],
    dtype: Dtype,
    data: &'a [u8],
    data_offsets: (usize, usize),
}

impl<'a> TensorView<'a> {
    pub(crate) fn new(
        name: &'a str,
        shape: &'a [usize],
        dtype: Dtype,
        data: &'a [u8],
        data_offsets: (usize, usize),
    ) -> Self {
        Self {
            name,
            shape,
            dtype,
            data,
            data_offsets,
        }
    }

    /// Tensor name.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Dimension sizes, outermost first.
    pub fn shape(&self) -> &'a [usize] {
        self.shape
    }

    /// Element type tag.
    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    /// The payload bytes, borrowed from the mapping.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Payload length in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Half-open byte sub-range of the payload within the original file.
    pub fn data_offsets(&self) -> (usize, usize) {
        self.data_offsets
    }
}

/// String metadata with insertion order preserved.
///
/// Built once at catalog construction and immutable afterwards. Re-inserting
/// an existing key keeps its original position and updates the value.
#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl MetadataTable {
    /// Build the table from decoder-ordered pairs.
    pub(crate) fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut table = Self {
            entries: Vec::with_capacity(pairs.len()),
            index: HashMap::with_capacity(pairs.len()),
        };
        for (key, value) in pairs {
            match table.index.get(&key) {
                Some(&pos) => table.entries[pos].1 = value,
                None => {
                    table.index.insert(key.clone(), table.entries.len());
                    table.entries.push((key, value));
                }
            }
        }
        table
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index.get(key).map(|&pos| self.entries[pos].1.as_str())
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Key/value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no metadata was reported.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_preserves_insertion_order() {
        let table = MetadataTable::from_pairs(vec![
            ("format".to_string(), "pt".to_string()),
            ("arch".to_string(), "llama".to_string()),
            ("version".to_string(), "2".to_string()),
        ]);

        let keys: Vec<&str> = table.keys().collect();
        assert_eq!(keys, vec!["format", "arch", "version"]);
        assert_eq!(table.get("arch"), Some("llama"));
        assert_eq!(table.get("missing"), None);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_metadata_duplicate_key_keeps_position_updates_value() {
        let table = MetadataTable::from_pairs(vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "3".to_string()),
        ]);

        let pairs: Vec<(&str, &str)> = table.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_metadata_empty() {
        let table = MetadataTable::from_pairs(Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.keys().count(), 0);
    }

    #[test]
    fn test_view_accessors() {
        let shape = [2usize, 4];
        let data = [0u8; 16];
        let view = TensorView::new("bias", &shape, Dtype::F16, &data, (32, 48));

        assert_eq!(view.name(), "bias");
        assert_eq!(view.shape(), &[2, 4]);
        assert_eq!(view.dtype(), Dtype::F16);
        assert_eq!(view.byte_len(), 16);
        assert_eq!(view.data_offsets(), (32, 48));

        // Views are cheap copies sharing the same borrow
        let copy = view;
        assert_eq!(copy.data().as_ptr(), view.data().as_ptr());
    }
}
