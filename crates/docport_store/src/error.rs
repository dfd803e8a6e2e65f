//! Error types for store operations.

use docport_codec::CodecError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or refused the handshake.
    #[error("connection failed: {message}")]
    Connection {
        /// Driver message.
        message: String,
    },

    /// A driver call failed.
    #[error("{operation} failed: {message}")]
    Driver {
        /// The operation being performed.
        operation: &'static str,
        /// Driver message.
        message: String,
    },

    /// The store refused one or more documents of an insert.
    #[error("insert into '{collection}' rejected: {message}")]
    InsertRejected {
        /// Target collection.
        collection: String,
        /// Why the store refused.
        message: String,
    },

    /// Converting between the driver's document type and ours failed.
    #[error("document conversion failed: {0}")]
    Codec(#[from] CodecError),
}

impl StoreError {
    /// Creates a driver error for the given operation.
    pub fn driver(operation: &'static str, message: impl ToString) -> Self {
        Self::Driver {
            operation,
            message: message.to_string(),
        }
    }

    /// Creates an insert rejection.
    pub fn insert_rejected(collection: &str, message: impl ToString) -> Self {
        Self::InsertRejected {
            collection: collection.to_string(),
            message: message.to_string(),
        }
    }
}
