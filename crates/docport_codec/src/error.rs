//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Not enough bytes are buffered to decode the next document.
    ///
    /// While reading a stream this only means "wait for the next chunk";
    /// it is a real failure only when the stream has ended.
    #[error("truncated stream: {available} bytes available, {}", describe_needed(.needed))]
    TruncatedStream {
        /// Total bytes the next document needs, when the length is known.
        needed: Option<usize>,
        /// Bytes currently available.
        available: usize,
    },

    /// A length prefix that no valid document can carry.
    #[error("invalid document length {length} (allowed {min}..={max})")]
    InvalidLength {
        /// The declared length.
        length: i64,
        /// Smallest allowed length.
        min: usize,
        /// Largest allowed length.
        max: usize,
    },

    /// Failed to encode a document.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode document bytes.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// Invalid UTF-8 string.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// Element type tag outside the BSON specification.
    #[error("unsupported element type: {type_name}")]
    UnsupportedType {
        /// Name or tag of the unsupported type.
        type_name: String,
    },

    /// A text line that is not a JSON object.
    #[error("malformed record: {message}")]
    MalformedRecord {
        /// Description of the syntax error.
        message: String,
    },
}

fn describe_needed(needed: &Option<usize>) -> String {
    match needed {
        Some(n) => format!("{n} needed"),
        None => "end of line not found".to_string(),
    }
}

impl CodecError {
    /// Create a truncated stream error.
    pub fn truncated(needed: Option<usize>, available: usize) -> Self {
        Self::TruncatedStream { needed, available }
    }

    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Create an unsupported type error.
    pub fn unsupported_type(type_name: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
        }
    }

    /// Create a malformed record error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            message: message.into(),
        }
    }

    /// Returns true for the "need more bytes" signal.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::TruncatedStream { .. })
    }
}
