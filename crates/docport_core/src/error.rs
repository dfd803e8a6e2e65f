//! Error types for docport core.

use docport_codec::CodecError;
use docport_store::StoreError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in backup, restore and import operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Store error, including connection failures.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Writing to the artifact sink failed.
    #[error("failed to write backup data for '{collection}': {source}")]
    WriteFailure {
        /// Collection being dumped.
        collection: String,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Reading the restore source failed.
    #[error("failed to read backup data: {source}")]
    ReadFailure {
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A stored document could not be encoded for the artifact.
    #[error("failed to encode document #{ordinal} of '{collection}': {source}")]
    EncodeFailure {
        /// Collection being dumped.
        collection: String,
        /// 1-based position of the document in the dump.
        ordinal: u64,
        /// Codec error.
        source: CodecError,
    },

    /// The stream ended in the middle of a document.
    #[error("backup data truncated after {documents} documents: {source}")]
    TruncatedStream {
        /// Documents decoded before the truncation.
        documents: u64,
        /// Codec error describing the leftover bytes.
        source: CodecError,
    },

    /// A binary document could not be decoded.
    #[error("failed to decode document #{ordinal}: {source}")]
    DecodeFailure {
        /// 1-based position of the document in the stream.
        ordinal: u64,
        /// Codec error.
        source: CodecError,
    },

    /// A text line is not a valid document.
    #[error("malformed record at document #{ordinal}: {source}")]
    MalformedRecord {
        /// 1-based position of the document in the stream.
        ordinal: u64,
        /// Codec error.
        source: CodecError,
    },

    /// A batch insert was rejected.
    #[error("failed to insert batch of {batch_size} documents into '{collection}': {source}")]
    InsertFailure {
        /// Target collection.
        collection: String,
        /// Size of the rejected batch.
        batch_size: usize,
        /// Store error.
        source: StoreError,
    },

    /// A backup artifact failed pre-restore validation.
    #[error("invalid backup file {}: {reason}", .path.display())]
    ValidationFailure {
        /// The artifact path.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// The database has no collections to back up.
    #[error("no collections found in database")]
    NoCollections,

    /// A whole-database backup stopped at a failing collection.
    #[error(
        "failed to back up collection '{collection}' ({} completed before it): {source}",
        .completed.len()
    )]
    BackupAborted {
        /// The collection that failed.
        collection: String,
        /// Artifacts written before the failure.
        completed: Vec<PathBuf>,
        /// Why the collection failed.
        source: Box<CoreError>,
    },

    /// I/O on an artifact path failed.
    #[error("{context} {}: {source}", .path.display())]
    Artifact {
        /// What was being attempted.
        context: &'static str,
        /// The path involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CoreError {
    /// Creates a validation failure.
    pub fn validation(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ValidationFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an artifact I/O error.
    pub fn artifact(context: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Artifact {
            context,
            path: path.into(),
            source,
        }
    }

    /// Returns true if the store could not be reached.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Store(StoreError::Connection { .. }))
    }
}
