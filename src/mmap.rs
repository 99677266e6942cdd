//! Read-only memory mapping with resident-range tracking.
//!
//! This module provides the MemoryMap wrapper over the platform mapping
//! primitive. The whole file is mapped read-only and shared; sub-ranges that
//! are no longer needed can be released back to the OS while the logical
//! mapping stays valid elsewhere. Which bytes remain physically backed is
//! tracked in a [`FragmentSet`].
//!
//! Platform selection happens once, inside the mapping factory: platforms
//! with a native mapping primitive get a zero-copy `memmap2` mapping with
//! sequential/prefetch advisory hints; anything else falls back to copying the
//! file into a heap buffer, trading zero-copy for portability.

pub mod fragments;

use crate::error::{Result, TensorMapError};
use crate::file::FileHandle;
use crate::mmap::fragments::FragmentSet;
#[cfg(unix)]
use memmap2::{Advice, UncheckedAdvice};
use memmap2::{Mmap, MmapOptions};
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;

/// Lock/unlock and release granularity assumed when the OS page size cannot
/// be queried.
const DEFAULT_PAGE_SIZE: usize = 65536;

/// The platform's page size, probed once per construction.
pub(crate) fn os_page_size() -> usize {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is always safe to call.
        let ret = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if ret > 0 {
            ret as usize
        } else {
            DEFAULT_PAGE_SIZE
        }
    }
    #[cfg(not(unix))]
    {
        DEFAULT_PAGE_SIZE
    }
}

/// Mapping behavior knobs, applied once at map time.
#[derive(Debug, Clone)]
pub struct MapOptions {
    /// How many leading bytes to ask the OS to fault in ahead of first use.
    /// `None` prefetches the whole file.
    pub prefetch: Option<usize>,
    /// Request NUMA-friendly placement: demotes prefetch to zero and advises
    /// random access so pages fault in where they are first touched.
    pub numa: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            prefetch: None,
            numa: false,
        }
    }
}

/// Internal byte source strategy for [`MemoryMap`].
///
/// Selected once at construction; every later operation dispatches on the
/// variant instead of sprinkling platform conditionals through the methods.
#[derive(Debug)]
enum MapSource {
    /// Native read-only shared mapping
    Mapped(Mmap),
    /// Whole-file heap copy for platforms without a native mapping primitive
    #[allow(dead_code)]
    Buffered(Vec<u8>),
}

impl MapSource {
    /// Get the underlying bytes as a slice regardless of storage strategy
    fn as_bytes(&self) -> &[u8] {
        match self {
            MapSource::Mapped(mmap) => &mmap[..],
            MapSource::Buffered(buf) => buf.as_slice(),
        }
    }

    /// One-time capability selection for the current build target.
    fn acquire(file: &FileHandle, options: &MapOptions) -> Result<Self> {
        #[cfg(any(unix, windows))]
        {
            Self::map_native(file, options)
        }
        #[cfg(not(any(unix, windows)))]
        {
            let _ = options;
            Self::read_into_heap(file)
        }
    }

    #[cfg(any(unix, windows))]
    fn map_native(file: &FileHandle, options: &MapOptions) -> Result<Self> {
        let len = usize::try_from(file.size()).map_err(|_| {
            TensorMapError::map(format!(
                "file too large to map: {}",
                file.path().display()
            ))
        })?;
        if len == 0 {
            return Err(TensorMapError::map(format!(
                "cannot map empty file: {}",
                file.path().display()
            )));
        }

        let mut prefetch = options.prefetch.unwrap_or(len).min(len);
        if options.numa {
            // Prefetching would fault every page on one node, defeating the
            // first-touch placement the hint asks for.
            prefetch = 0;
        }

        // SAFETY: the mapping is read-only and shared; this crate never
        // truncates the file while a mapping is alive.
        #[cfg(target_os = "linux")]
        let mapped = unsafe {
            let mut opts = MmapOptions::new();
            if prefetch > 0 {
                opts.populate();
            }
            opts.map(file.as_file())
        };
        #[cfg(not(target_os = "linux"))]
        let mapped = unsafe { MmapOptions::new().map(file.as_file()) };

        let mmap = mapped.map_err(|e| {
            TensorMapError::map(format!("failed to map {}: {e}", file.path().display()))
        })?;

        #[cfg(unix)]
        {
            let advice = if options.numa {
                Advice::Random
            } else {
                Advice::Sequential
            };
            if let Err(e) = mmap.advise(advice) {
                log::warn!(
                    "madvise({advice:?}) failed for {}: {e}",
                    file.path().display()
                );
            }
            if prefetch > 0 {
                if let Err(e) = mmap.advise_range(Advice::WillNeed, 0, prefetch) {
                    log::warn!(
                        "madvise(WillNeed) over first {prefetch} bytes failed for {}: {e}",
                        file.path().display()
                    );
                }
            }
        }
        #[cfg(not(unix))]
        let _ = prefetch;

        Ok(MapSource::Mapped(mmap))
    }

    /// Portability fallback: copy the whole file into a heap buffer.
    #[allow(dead_code)]
    fn read_into_heap(file: &FileHandle) -> Result<Self> {
        let mut reader = file.as_file();
        reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| TensorMapError::io("seek failed before heap copy", e))?;

        let mut buffer = Vec::with_capacity(file.size() as usize);
        reader
            .read_to_end(&mut buffer)
            .map_err(|e| TensorMapError::io("failed to copy file into memory", e))?;

        Ok(MapSource::Buffered(buffer))
    }
}

/// Read-only, shared mapping of an entire file.
///
/// Tracks which byte ranges are still physically resident in a fragment set
/// that starts as the single range `[0, len)`. Releasing a sub-range only
/// drops its physical pages; the bytes stay addressable and fault back in
/// from the file on the next access.
///
/// `unmap_fragment` mutates the fragment set and therefore takes `&mut self`;
/// sharing one instance across threads requires external serialization, which
/// the borrow rules enforce.
#[derive(Debug)]
pub struct MemoryMap {
    source: MapSource,
    len: usize,
    page_size: usize,
    fragments: FragmentSet,
}

impl MemoryMap {
    /// Map `file` read-only in its entirety.
    ///
    /// # Errors
    /// * Map error carrying the OS diagnostic if the native mapping call fails
    /// * Io error if the heap-copy fallback cannot read the file
    pub fn map(file: &FileHandle, options: &MapOptions) -> Result<Self> {
        let source = MapSource::acquire(file, options)?;
        let len = source.as_bytes().len();

        Ok(Self {
            source,
            len,
            page_size: os_page_size(),
            fragments: FragmentSet::new(len),
        })
    }

    /// The mapped bytes.
    pub fn data(&self) -> &[u8] {
        self.source.as_bytes()
    }

    /// Total length of the mapping in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-length mapping (only reachable through the fallback).
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Release the physical pages backing `[first, last)`.
    ///
    /// `first` is rounded up and `last` rounded down to the page boundary; an
    /// empty or inverted aligned range is a no-op. Release failures are
    /// logged and swallowed; the fragment set is updated either way, and the
    /// affected bytes remain addressable.
    pub fn unmap_fragment(&mut self, first: usize, last: usize) {
        let Some((start, end)) = fragments::align_release_range(first, last, self.page_size)
        else {
            return;
        };

        #[cfg(unix)]
        if let MapSource::Mapped(mmap) = &self.source {
            let advise_end = end.min(self.len);
            if advise_end > start {
                // SAFETY: the mapping is a read-only shared view of the file,
                // so dropping resident pages cannot lose data; later accesses
                // fault the bytes back in from the file.
                let res = unsafe {
                    mmap.unchecked_advise_range(
                        UncheckedAdvice::DontNeed,
                        start,
                        advise_end - start,
                    )
                };
                if let Err(e) = res {
                    log::warn!("failed to release mapped pages [{start}, {advise_end}): {e}");
                }
            }
        }

        self.fragments.release(start, end);
    }

    /// The byte ranges still physically backed, sorted and disjoint.
    pub fn fragments(&self) -> &[Range<usize>] {
        self.fragments.ranges()
    }

    /// Number of bytes still physically backed.
    pub fn resident_bytes(&self) -> usize {
        self.fragments.covered_bytes()
    }

    /// Page granularity this mapping aligns release requests to.
    pub fn page_size(&self) -> usize {
        self.page_size
    }
}
