//! Error types for container decoding and content reading.

use thiserror::Error;

/// Result type alias for decoding operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Decoding error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Container prologue is not a recognizable asset header.
    #[error("malformed header: {message}")]
    MalformedHeader { message: String },

    /// LZX window size outside the supported range.
    #[error("unsupported window size: 2^{bits} (supported: 2^15 to 2^21)")]
    UnsupportedWindowSize { bits: u32 },

    /// Code lengths do not describe a complete (or empty) prefix code.
    #[error("malformed {table} huffman table: {reason}")]
    MalformedHuffmanTable {
        table: &'static str,
        reason: &'static str,
    },

    /// Block header carried an unknown block type.
    #[error("invalid block type {block_type}")]
    InvalidBlockType { block_type: u8 },

    /// A run or match would write past the end of the sliding window.
    #[error("window overrun: {length} bytes at position {position} exceed window of {window_size}")]
    WindowOverrun {
        position: usize,
        length: usize,
        window_size: usize,
    },

    /// Compressed chunk ended before the decoder was done with it.
    #[error("truncated input: needed {needed} more bytes at offset {offset}")]
    TruncatedInput { offset: usize, needed: usize },

    /// Unexpected end of input stream.
    #[error("unexpected EOF after {bytes_read} bytes")]
    UnexpectedEof { bytes_read: u64 },

    /// A declared size disagrees with the data.
    #[error("{what} size mismatch: declared {expected}, found {actual}")]
    SizeMismatch {
        what: &'static str,
        expected: u64,
        actual: u64,
    },

    /// Decoder produced a different number of bytes than requested.
    #[error("length mismatch: requested {expected} bytes, produced {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Input data is corrupted or invalid.
    #[error("corrupted data: {message}")]
    CorruptedData {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialized reader version differs from the registered reader.
    #[error("type reader {reader} has version {actual}, asset expects {expected}")]
    TypeVersionMismatch {
        reader: String,
        expected: i32,
        actual: i32,
    },

    /// Two distinct readers claim the same target type.
    #[error("a reader for target type {target} is already registered")]
    DuplicateReaderForType { target: &'static str },

    /// Manifest names a reader nobody registered.
    #[error("no type reader registered for {name:?}")]
    UnknownTypeName { name: String },

    /// Object read as a type other than the one its reader produces.
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// A declared size exceeds a configured limit.
    #[error("{what} of {requested} bytes exceeds limit of {limit}")]
    LimitExceeded {
        what: &'static str,
        requested: u64,
        limit: u64,
    },

    /// Asset file could not be located.
    #[error("asset not found: {name}")]
    AssetNotFound {
        name: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// I/O error from underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a corrupted data error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Error::CorruptedData {
            message: message.into(),
            source: None,
        }
    }

    /// Create a corrupted data error with offset context.
    pub fn corrupted_at(message: impl Into<String>, offset: u64) -> Self {
        Error::CorruptedData {
            message: format!("{} at offset {}", message.into(), offset),
            source: None,
        }
    }

    /// Create a malformed header error.
    pub fn malformed_header(message: impl Into<String>) -> Self {
        Error::MalformedHeader {
            message: message.into(),
        }
    }

    /// Create a malformed huffman table error.
    pub fn malformed_table(table: &'static str, reason: &'static str) -> Self {
        Error::MalformedHuffmanTable { table, reason }
    }

    /// Create an unexpected EOF error.
    pub fn unexpected_eof(bytes_read: u64) -> Self {
        Error::UnexpectedEof { bytes_read }
    }

    /// Create an asset-not-found error.
    pub fn not_found(name: impl Into<String>, source: Option<std::io::Error>) -> Self {
        Error::AssetNotFound {
            name: name.into(),
            source,
        }
    }

    /// True when the bytes themselves are bad, as opposed to missing or unreadable.
    pub fn is_corrupt(&self) -> bool {
        !matches!(
            self,
            Error::AssetNotFound { .. } | Error::Io(_) | Error::LimitExceeded { .. }
        )
    }

    /// True when the asset does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::AssetNotFound { .. })
    }

    /// Get error category for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Error::MalformedHeader { .. } => "malformed_header",
            Error::UnsupportedWindowSize { .. } => "unsupported_window_size",
            Error::MalformedHuffmanTable { .. } => "malformed_huffman_table",
            Error::InvalidBlockType { .. } => "invalid_block_type",
            Error::WindowOverrun { .. } => "window_overrun",
            Error::TruncatedInput { .. } => "truncated_input",
            Error::UnexpectedEof { .. } => "unexpected_eof",
            Error::SizeMismatch { .. } => "size_mismatch",
            Error::LengthMismatch { .. } => "length_mismatch",
            Error::CorruptedData { .. } => "corrupted_data",
            Error::TypeVersionMismatch { .. } => "type_version_mismatch",
            Error::DuplicateReaderForType { .. } => "duplicate_reader_for_type",
            Error::UnknownTypeName { .. } => "unknown_type_name",
            Error::TypeMismatch { .. } => "type_mismatch",
            Error::LimitExceeded { .. } => "limit_exceeded",
            Error::AssetNotFound { .. } => "asset_not_found",
            Error::Io(_) => "io_error",
        }
    }
}
