//! # tensormap - Zero-Copy Tensor File Access
//!
//! Memory-mapped, read-only access to large binary tensor files: open a file,
//! map its bytes, hand the buffer to an external header decoder, and serve
//! named, typed, shape-annotated views that point straight into the mapping -
//! tensor payloads are never copied.
//!
//! ## Features
//!
//! - **Zero-copy views**: tensor payloads are borrowed slices of the mapping
//! - **Resident-range tracking**: release pages for byte ranges already
//!   consumed while the rest of the mapping stays valid
//! - **Incremental page locking**: pin a growing prefix of the mapping so
//!   sequential scans never stall on swapped-out pages
//! - **Portable**: a heap-copy fallback keeps the same semantics on platforms
//!   without a native mapping primitive
//!
//! ## Architecture
//!
//! The library is organized into focused modules, leaf-first:
//!
//! - [`error`] - Centralized error types and handling
//! - [`file`] - Owned file handle with raw and fixed-width access
//! - [`mmap`] - Read-only mapping with fragment tracking
//! - [`mlock`] - Progressive pinning of a mapped region
//! - [`catalog`] - Decoder orchestration and the name-indexed view catalog
//!
//! The catalog emits warnings through the [`log`] facade on best-effort
//! paths (advisory hints, teardown); install any `log`-compatible logger to
//! see them.

// Core modules
pub mod error;
pub mod file;

// Mapping and page management
pub mod mlock;
pub mod mmap;

// Catalog orchestration
pub mod catalog;

// Re-export commonly used types for convenience
pub use error::{Result, TensorMapError};

// Public API surface for external usage
pub use catalog::decoder::{DecodedContents, Dtype, HeaderDecoder, TensorDescriptor};
pub use catalog::view::{MetadataTable, TensorView};
pub use catalog::{TensorCatalog, MIN_HEADER_LEN};
pub use file::{FileHandle, OpenMode};
pub use mlock::MemoryLock;
pub use mmap::{MapOptions, MemoryMap};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
