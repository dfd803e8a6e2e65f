//! # docport testkit
//!
//! Test utilities for docport.
//!
//! This crate provides:
//! - Scratch directories and seeded in-memory stores
//! - Property-based document generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use docport_testkit::prelude::*;
//!
//! let store = seeded_store("records", 3);
//! assert_eq!(store.count("records"), 3);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::{artifact_bytes, product_documents, seeded_store, TestWorkspace};
    pub use crate::generators::{
        collection_name_strategy, document_strategy, documents_strategy, value_strategy,
    };
}
