//! Name-indexed catalog of zero-copy tensor views over one mapped file.
//!
//! This module provides the TensorCatalog orchestrator: it owns the
//! [`FileHandle`] and the [`MemoryMap`] built from it, runs the external
//! [`HeaderDecoder`] over the mapped buffer, and serves read-only
//! [`TensorView`]s that borrow the mapping directly. Construction is
//! all-or-nothing: any failure unwinds the file and mapping before a caller
//! can observe a partial catalog.

pub mod decoder;
pub mod view;

use crate::catalog::decoder::{Dtype, HeaderDecoder};
use crate::catalog::view::{MetadataTable, TensorView};
use crate::error::{Result, TensorMapError};
use crate::file::{FileHandle, OpenMode};
use crate::mmap::{MapOptions, MemoryMap};
use std::collections::HashMap;
use std::path::Path;

/// Smallest buffer the decoder can be handed: the 8-byte length prefix every
/// supported file starts with.
pub const MIN_HEADER_LEN: usize = 8;

/// Validated descriptor retained for the catalog's lifetime.
#[derive(Debug)]
struct TensorRecord {
    name: String,
    shape: Vec<usize>,
    dtype: Dtype,
    data_offsets: (usize, usize),
}

/// Catalog of named, typed, shape-annotated views into one mapped tensor file.
///
/// Exclusively owns its file handle and mapping; both are released together
/// when the catalog is dropped. Every [`TensorView`] borrows the catalog, so
/// no view can outlive the mapping it points into.
#[derive(Debug)]
pub struct TensorCatalog {
    file: FileHandle,
    map: MemoryMap,
    records: Vec<TensorRecord>,
    index: HashMap<String, usize>,
    metadata: MetadataTable,
}

impl TensorCatalog {
    /// Open `path` with default mapping options.
    pub fn open(path: impl AsRef<Path>, decoder: &dyn HeaderDecoder) -> Result<Self> {
        Self::open_with(path, decoder, &MapOptions::default())
    }

    /// Open `path`, map it and decode its header.
    ///
    /// # Process
    /// 1. Open the file read-only
    /// 2. Refuse files below the minimum header size (Format error)
    /// 3. Map the whole file with `options`
    /// 4. Run `decoder` over the mapped buffer and validate its descriptors
    /// 5. Build the ordered name index and metadata table
    ///
    /// # Errors
    /// * Io error if the file cannot be opened
    /// * Format error for undersized files, decoder failures, out-of-bounds
    ///   or size-inconsistent descriptors, and duplicate tensor names
    /// * Map error if the native mapping call fails
    pub fn open_with(
        path: impl AsRef<Path>,
        decoder: &dyn HeaderDecoder,
        options: &MapOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = FileHandle::open(path, OpenMode::Read)?;

        // A zero-length file cannot be mapped at all, so the minimum-size
        // check has to run against the file size, before mapping.
        if file.size() < MIN_HEADER_LEN as u64 {
            return Err(TensorMapError::format(format!(
                "file {} is too small: {} < {} bytes",
                path.display(),
                file.size(),
                MIN_HEADER_LEN
            )));
        }

        let map = MemoryMap::map(&file, options)?;
        if map.len() < MIN_HEADER_LEN {
            return Err(TensorMapError::format(format!(
                "mapped buffer of {} is too small: {} < {} bytes",
                path.display(),
                map.len(),
                MIN_HEADER_LEN
            )));
        }

        let decoded = decoder.decode(map.data())?;

        let mut records = Vec::with_capacity(decoded.tensors.len());
        let mut index = HashMap::with_capacity(decoded.tensors.len());
        for desc in decoded.tensors {
            let (start, end) = desc.data_offsets;
            if start > end || end > map.len() {
                return Err(TensorMapError::format(format!(
                    "tensor '{}' declares byte range [{start}, {end}) outside the \
                     {}-byte buffer",
                    desc.name,
                    map.len()
                )));
            }

            let elements = desc
                .shape
                .iter()
                .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
                .ok_or_else(|| {
                    TensorMapError::format(format!(
                        "tensor '{}' shape {:?} overflows",
                        desc.name, desc.shape
                    ))
                })?;
            let expected = elements
                .checked_mul(desc.dtype.size_in_bytes())
                .ok_or_else(|| {
                    TensorMapError::format(format!(
                        "tensor '{}' byte size overflows",
                        desc.name
                    ))
                })?;
            if expected != end - start {
                return Err(TensorMapError::format(format!(
                    "tensor '{}' declares {} bytes but shape {:?} of {} requires {}",
                    desc.name,
                    end - start,
                    desc.shape,
                    desc.dtype,
                    expected
                )));
            }

            if index.insert(desc.name.clone(), records.len()).is_some() {
                return Err(TensorMapError::format(format!(
                    "duplicate tensor name '{}'",
                    desc.name
                )));
            }
            records.push(TensorRecord {
                name: desc.name,
                shape: desc.shape,
                dtype: desc.dtype,
                data_offsets: desc.data_offsets,
            });
        }

        Ok(Self {
            file,
            map,
            records,
            index,
            metadata: MetadataTable::from_pairs(decoded.metadata),
        })
    }

    /// Tensor names in decoder order, each exactly once.
    pub fn keys(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    /// Look up one tensor by name.
    ///
    /// The returned view borrows this catalog; its payload slice points
    /// straight into the mapping.
    ///
    /// # Errors
    /// * TensorNotFound if no tensor of that name was decoded
    pub fn get_tensor(&self, name: &str) -> Result<TensorView<'_>> {
        let &pos = self
            .index
            .get(name)
            .ok_or_else(|| TensorMapError::tensor_not_found(name))?;
        Ok(self.view_at(pos))
    }

    /// The metadata table, in decoder order.
    pub fn get_metadata(&self) -> &MetadataTable {
        &self.metadata
    }

    /// Views over every tensor, in decoder order.
    pub fn iter(&self) -> impl Iterator<Item = TensorView<'_>> {
        (0..self.records.len()).map(|pos| self.view_at(pos))
    }

    /// Number of tensors in the catalog.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the decoder reported no tensors.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The mapping backing this catalog (e.g. to attach a `MemoryLock`).
    pub fn map(&self) -> &MemoryMap {
        &self.map
    }

    /// Mutable access to the mapping, for releasing consumed ranges.
    pub fn map_mut(&mut self) -> &mut MemoryMap {
        &mut self.map
    }

    /// Path the catalog was opened from.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    fn view_at(&self, pos: usize) -> TensorView<'_> {
        let record = &self.records[pos];
        let (start, end) = record.data_offsets;
        TensorView::new(
            &record.name,
            &record.shape,
            record.dtype,
            &self.map.data()[start..end],
            record.data_offsets,
        )
    }
}
