//! # docport codec
//!
//! Document model and the two artifact encodings used by docport backups.
//!
//! - **BSON**: each document is prefixed with its own little-endian `i32`
//!   total length, so an artifact is documents laid back to back with no
//!   header or trailer.
//! - **JSON lines**: one object per line, with extended-JSON wrappers for
//!   the types plain JSON cannot carry (`$oid`, `$date`, `$numberLong`,
//!   `$numberDecimal`, `$binary`, `$timestamp`, ...).
//!
//! [`Value`] has a variant for every BSON element type, so any document a
//! server hands out survives a backup in either format.
//!
//! Streams are read incrementally through [`FrameBuffer`], which never
//! assumes a single read holds a whole document.
//!
//! ## Usage
//!
//! ```
//! use docport_codec::{decode_one, encode, Document, Format};
//!
//! let doc = Document::new().with("Number", "42").with("Product", "widget");
//! let bytes = encode(&doc, Format::Bson).unwrap();
//! let (decoded, used) = decode_one(&bytes, Format::Bson).unwrap();
//! assert_eq!(decoded, doc);
//! assert_eq!(used, bytes.len());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decimal;
mod decoder;
mod document;
mod encoder;
mod error;
mod format;
mod frame;
mod json;
mod oid;
mod value;

pub use decimal::Decimal128;
pub use decoder::{from_bson, peek_length};
pub use document::Document;
pub use encoder::to_bson;
pub use error::{CodecError, CodecResult};
pub use format::{Format, UnknownFormat};
pub use frame::{decode_last, decode_one, encode, FrameBuffer};
pub use json::{from_json_line, to_json_line};
pub use oid::{ObjectId, OBJECT_ID_LEN};
pub use value::Value;

/// Smallest valid BSON document: length prefix plus terminator.
pub const MIN_DOCUMENT_SIZE: usize = 5;

/// Largest document accepted in either direction (16 MiB).
pub const MAX_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

/// Deepest nesting of documents and arrays, the top level included.
pub const MAX_NESTING_DEPTH: usize = 100;
