//! Owned file handle with positioned raw and fixed-width access.
//!
//! This module provides the FileHandle wrapper that the mapping layer builds on.
//! It owns exactly one OS file descriptor for its lifetime, caches the byte size
//! observed at open, and exposes raw and fixed-width read/write helpers with
//! consistent error reporting.

use crate::error::{Result, TensorMapError};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// How a [`FileHandle`] is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Open an existing file for reading only
    Read,
    /// Create (or truncate) a file for reading and writing
    Write,
}

/// Exclusive owner of one OS file descriptor.
///
/// The handle caches the file size observed at open time. Writers that need to
/// observe the size of bytes they just produced reopen the file in `Read` mode.
/// The descriptor is closed deterministically when the handle is dropped.
#[derive(Debug)]
pub struct FileHandle {
    file: File,
    path: PathBuf,
    size: u64,
}

impl FileHandle {
    /// Open a file in the given mode.
    ///
    /// # Errors
    /// * Io error carrying the OS diagnostic if the file cannot be opened
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref();

        let file = match mode {
            OpenMode::Read => File::open(path),
            OpenMode::Write => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(path),
        }
        .map_err(|e| {
            TensorMapError::io(format!("failed to open file: {}", path.display()), e)
        })?;

        let size = file
            .metadata()
            .map_err(|e| TensorMapError::io("failed to read file metadata", e))?
            .len();

        Ok(Self {
            file,
            path: path.to_path_buf(),
            size,
        })
    }

    /// File size in bytes, as observed when the handle was opened.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Path this handle was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current position of the file cursor.
    pub fn tell(&mut self) -> Result<u64> {
        self.file
            .stream_position()
            .map_err(|e| TensorMapError::io(format!("tell failed: {}", self.path.display()), e))
    }

    /// Move the file cursor, returning the new position from the start.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.file
            .seek(pos)
            .map_err(|e| TensorMapError::io(format!("seek failed: {}", self.path.display()), e))
    }

    /// Fill `dest` exactly from the current position.
    ///
    /// A zero-length `dest` is a no-op. A short read (end of file before the
    /// buffer is full) or a stream error is an Io error.
    pub fn read_raw(&mut self, dest: &mut [u8]) -> Result<()> {
        if dest.is_empty() {
            return Ok(());
        }

        self.file.read_exact(dest).map_err(|e| {
            let message = if e.kind() == std::io::ErrorKind::UnexpectedEof {
                format!(
                    "unexpectedly reached end of file: {}",
                    self.path.display()
                )
            } else {
                format!("read failed: {}", self.path.display())
            };
            TensorMapError::io(message, e)
        })
    }

    /// Write all of `src` at the current position.
    ///
    /// A zero-length `src` is a no-op. A short write is an Io error.
    pub fn write_raw(&mut self, src: &[u8]) -> Result<()> {
        if src.is_empty() {
            return Ok(());
        }

        self.file.write_all(src).map_err(|e| {
            TensorMapError::io(format!("write failed: {}", self.path.display()), e)
        })
    }

    /// Read one `u32` in native byte order.
    ///
    /// Together with [`write_u32`](Self::write_u32) this is a fixed-width
    /// convenience wrapper, not a portable wire format by itself.
    pub fn read_u32(&mut self) -> Result<u32> {
        let mut bytes = [0u8; 4];
        self.read_raw(&mut bytes)?;
        Ok(u32::from_ne_bytes(bytes))
    }

    /// Write one `u32` in native byte order.
    pub fn write_u32(&mut self, val: u32) -> Result<()> {
        self.write_raw(&val.to_ne_bytes())
    }

    /// Borrow the underlying `std::fs::File` (used by the mapping layer).
    pub fn as_file(&self) -> &File {
        &self.file
    }
}
