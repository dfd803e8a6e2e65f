//! # docport store
//!
//! Database driver abstraction for docport.
//!
//! The engine only needs a handful of operations from a database: list
//! collections, scan one, drop one, insert documents, and find/replace by a
//! single-field equality filter. [`DocumentStore`] captures exactly that.
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For tests and dry runs
//! - `MongoStore` - Real MongoDB via the official driver (feature `mongo`)
//!
//! ## Example
//!
//! ```rust
//! use docport_codec::Document;
//! use docport_store::{DocumentStore, Filter, InMemoryStore};
//!
//! let store = InMemoryStore::new();
//! store.insert_one("records", &Document::new().with("Number", "42")).unwrap();
//! let found = store.find_one("records", &Filter::eq("Number", "42")).unwrap();
//! assert!(found.is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
#[cfg(feature = "mongo")]
mod mongo;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
#[cfg(feature = "mongo")]
pub use mongo::MongoStore;
pub use store::{DocumentCursor, DocumentStore, Filter};
