//! # docport core
//!
//! Backup, restore and import engine for MongoDB collections.
//!
//! - [`Dumper`] streams a collection through the codec into any
//!   [`std::io::Write`] sink.
//! - [`Loader`] reads an artifact in fixed-size chunks, reassembles
//!   documents from the byte stream and bulk-inserts them in batches.
//! - [`Reconciler`] upserts imported records by `Number`, overwriting only
//!   the fields an import owns and keeping everything else.
//! - [`BackupService`] ties these to the filesystem: artifact naming,
//!   whole-database backups, pre-restore validation.
//!
//! All operations are synchronous and single-threaded. Nothing is retried.
//!
//! ## Example
//!
//! ```rust
//! use docport_codec::{Document, Format};
//! use docport_core::{BackupService, EngineConfig};
//! use docport_store::InMemoryStore;
//!
//! let dir = std::env::temp_dir().join("docport-doc-example");
//! let store = InMemoryStore::with_collection("records", vec![Document::new().with("Number", "1")]);
//! let service = BackupService::new(store, EngineConfig::default());
//!
//! let artifact = service.backup_one("records", &dir, Format::Bson, &mut ()).unwrap();
//! let restored = service.restore_one("copy", &artifact, Format::Bson, true, &mut ()).unwrap();
//! assert_eq!(restored, 1);
//! # std::fs::remove_file(artifact).ok();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dump;
mod error;
mod load;
mod progress;
mod reconcile;
mod service;

pub use config::EngineConfig;
pub use dump::Dumper;
pub use error::{CoreError, CoreResult};
pub use load::Loader;
pub use progress::ProgressObserver;
pub use reconcile::{
    import_records, merge_core_fields, ImportSummary, ReconcileOutcome, Reconciler, Record,
    CORE_FIELDS, NUMBER_FIELD,
};
pub use service::{
    artifact_file_name, collection_from_artifact_name, validate_artifact, BackupService,
};
