//! Decoder collaborator seam and the descriptor types it produces.
//!
//! The catalog treats the on-disk header as opaque: an external
//! [`HeaderDecoder`] consumes the mapped buffer and reports tensor
//! descriptors plus metadata pairs. Everything here is plain data; no
//! interpretation of header bytes happens in this crate.

use crate::error::Result;

/// Element type tag for a tensor's payload.
///
/// Declared in increasing alignment order. The mapping from tag to a native
/// type is the downstream consumer's responsibility; this crate only needs
/// the element width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dtype {
    /// Boolean, one byte per element
    Bool,
    /// Unsigned byte
    U8,
    /// Signed byte
    I8,
    /// Signed integer (16-bit)
    I16,
    /// Unsigned integer (16-bit)
    U16,
    /// Half-precision floating point
    F16,
    /// Brain floating point
    BF16,
    /// Signed integer (32-bit)
    I32,
    /// Unsigned integer (32-bit)
    U32,
    /// Floating point (32-bit)
    F32,
    /// Floating point (64-bit)
    F64,
    /// Signed integer (64-bit)
    I64,
    /// Unsigned integer (64-bit)
    U64,
}

impl Dtype {
    /// Width of one element in bytes.
    pub const fn size_in_bytes(self) -> usize {
        match self {
            Dtype::Bool | Dtype::U8 | Dtype::I8 => 1,
            Dtype::I16 | Dtype::U16 | Dtype::F16 | Dtype::BF16 => 2,
            Dtype::I32 | Dtype::U32 | Dtype::F32 => 4,
            Dtype::F64 | Dtype::I64 | Dtype::U64 => 8,
        }
    }

    /// Stable lowercase name of the tag.
    pub const fn name(self) -> &'static str {
        match self {
            Dtype::Bool => "bool",
            Dtype::U8 => "u8",
            Dtype::I8 => "i8",
            Dtype::I16 => "i16",
            Dtype::U16 => "u16",
            Dtype::F16 => "f16",
            Dtype::BF16 => "bf16",
            Dtype::I32 => "i32",
            Dtype::U32 => "u32",
            Dtype::F32 => "f32",
            Dtype::F64 => "f64",
            Dtype::I64 => "i64",
            Dtype::U64 => "u64",
        }
    }
}

impl std::fmt::Display for Dtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One tensor as reported by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorDescriptor {
    /// Tensor name, the lookup key in the catalog
    pub name: String,
    /// Dimension sizes, outermost first
    pub shape: Vec<usize>,
    /// Element type tag
    pub dtype: Dtype,
    /// Half-open byte sub-range of the payload within the mapped buffer
    pub data_offsets: (usize, usize),
}

impl TensorDescriptor {
    /// Declared payload length in bytes.
    pub fn byte_len(&self) -> usize {
        self.data_offsets.1 - self.data_offsets.0
    }
}

/// Everything a decoder reports for one file, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct DecodedContents {
    /// Tensor descriptors, ordered as declared in the header
    pub tensors: Vec<TensorDescriptor>,
    /// Metadata pairs, ordered as declared in the header
    pub metadata: Vec<(String, String)>,
}

/// External header decoder collaborator.
///
/// Receives the full mapped buffer and reports descriptors and metadata.
/// Implementations signal any malformed input through a Format error; the
/// catalog aborts construction on the first failure.
pub trait HeaderDecoder {
    /// Decode the header at the front of `buffer`.
    fn decode(&self, buffer: &[u8]) -> Result<DecodedContents>;
}
