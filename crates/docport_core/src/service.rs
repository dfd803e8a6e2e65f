//! Backup service: artifact naming, whole-database backups, validation and
//! restore orchestration.
//!
//! ## Artifact naming
//!
//! ```text
//! backup_<collection>_<YYYYMMDD>_<HHMMSS>.<bson|json>
//! ```
//!
//! The timestamp is local time at the start of the dump. Artifacts carry no
//! header, so the collection name only survives in the file name.

use crate::config::EngineConfig;
use crate::dump::Dumper;
use crate::error::{CoreError, CoreResult};
use crate::load::Loader;
use crate::progress::ProgressObserver;
use crate::reconcile::{import_records, ImportSummary, Reconciler, Record};
use chrono::{DateTime, Local, TimeZone};
use docport_codec::Format;
use docport_store::DocumentStore;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const ARTIFACT_PREFIX: &str = "backup_";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Collections with this prefix are internal to the server.
const SYSTEM_PREFIX: &str = "system.";

/// File name for a backup of `collection` taken at `at`.
pub fn artifact_file_name<Tz: TimeZone>(collection: &str, format: Format, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{ARTIFACT_PREFIX}{collection}_{}.{}",
        at.format(TIMESTAMP_FORMAT),
        format.extension()
    )
}

/// Recovers the collection name from an artifact file name.
///
/// Names produced by [`artifact_file_name`] give back the full collection
/// name, underscores included. Other names starting with `backup_` and
/// holding at least three `_`-separated parts give their second part.
pub fn collection_from_artifact_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let rest = stem.strip_prefix(ARTIFACT_PREFIX)?;

    // backup_<collection>_<8 digits>_<6 digits>
    let mut tail = rest.rsplitn(3, '_');
    if let (Some(time), Some(date), Some(name)) = (tail.next(), tail.next(), tail.next()) {
        let digits = |s: &str, n: usize| s.len() == n && s.bytes().all(|b| b.is_ascii_digit());
        if digits(date, 8) && digits(time, 6) && !name.is_empty() {
            return Some(name.to_string());
        }
    }

    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() >= 3 && !parts[1].is_empty() {
        return Some(parts[1].to_string());
    }
    None
}

/// Checks that `path` looks like a restorable artifact of `expected` format.
///
/// This is a cheap pre-flight check: the file must exist, be non-empty and
/// carry the extension of the expected format. Contents are not decoded.
///
/// # Errors
///
/// Returns `ValidationFailure` describing the first problem found.
pub fn validate_artifact(path: &Path, expected: Format) -> CoreResult<()> {
    let metadata = fs::metadata(path)
        .map_err(|e| CoreError::validation(path, format!("cannot open backup file: {e}")))?;
    if !metadata.is_file() {
        return Err(CoreError::validation(path, "not a regular file"));
    }
    if metadata.len() == 0 {
        return Err(CoreError::validation(path, "backup file is empty"));
    }

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if !extension.eq_ignore_ascii_case(expected.extension()) {
        let found = if extension.is_empty() {
            "no extension".to_string()
        } else {
            format!(".{extension}")
        };
        return Err(CoreError::validation(
            path,
            format!(
                "expected {} file but got {found}",
                expected.extension().to_ascii_uppercase()
            ),
        ));
    }
    Ok(())
}

/// Orchestrates dumps and restores against one database.
pub struct BackupService<S> {
    store: S,
    config: EngineConfig,
}

impl<S: DocumentStore> BackupService<S> {
    /// Creates a service over `store`.
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Collection names, `system.*` excluded.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the listing fails.
    pub fn collections(&self) -> CoreResult<Vec<String>> {
        let mut names = self.store.list_collections()?;
        names.retain(|n| !n.starts_with(SYSTEM_PREFIX));
        names.sort();
        Ok(names)
    }

    /// Dumps one collection into a new artifact under `output_dir`.
    ///
    /// The directory is created if needed. If the dump fails the partial
    /// file is removed.
    ///
    /// # Errors
    ///
    /// `Artifact` for filesystem errors, otherwise whatever the dump
    /// reported.
    pub fn backup_one(
        &self,
        collection: &str,
        output_dir: &Path,
        format: Format,
        observer: &mut dyn ProgressObserver,
    ) -> CoreResult<PathBuf> {
        fs::create_dir_all(output_dir)
            .map_err(|e| CoreError::artifact("cannot create output directory", output_dir, e))?;

        let path = output_dir.join(artifact_file_name(collection, format, &Local::now()));
        let file = File::create(&path)
            .map_err(|e| CoreError::artifact("cannot create backup file", &path, e))?;
        let mut sink = BufWriter::new(file);

        let dumped = Dumper::new(&self.store, &self.config).dump(collection, &mut sink, format, observer);
        drop(sink);

        match dumped {
            Ok(count) => {
                info!(collection, documents = count, path = %path.display(), "backup written");
                Ok(path)
            }
            Err(e) => {
                if let Err(rm) = fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %rm, "failed to remove partial backup");
                }
                Err(e)
            }
        }
    }

    /// Dumps every non-system collection, one artifact each.
    ///
    /// # Errors
    ///
    /// - `NoCollections` if the database has no collections at all
    /// - `BackupAborted` at the first failing collection, carrying the
    ///   artifacts already written
    pub fn backup_all(
        &self,
        output_dir: &Path,
        format: Format,
        observer: &mut dyn ProgressObserver,
    ) -> CoreResult<Vec<PathBuf>> {
        let names = self.store.list_collections()?;
        if names.is_empty() {
            return Err(CoreError::NoCollections);
        }

        let mut completed = Vec::with_capacity(names.len());
        for collection in names {
            if collection.starts_with(SYSTEM_PREFIX) {
                debug!(collection = %collection, "skipping system collection");
                continue;
            }
            match self.backup_one(&collection, output_dir, format, observer) {
                Ok(path) => completed.push(path),
                Err(e) => {
                    return Err(CoreError::BackupAborted {
                        collection,
                        completed,
                        source: Box::new(e),
                    });
                }
            }
        }

        info!(artifacts = completed.len(), "database backup completed");
        Ok(completed)
    }

    /// Restores one artifact into `collection`.
    ///
    /// Returns the number of documents inserted.
    ///
    /// # Errors
    ///
    /// `Artifact` if the file cannot be opened, otherwise whatever the load
    /// reported.
    pub fn restore_one(
        &self,
        collection: &str,
        input: &Path,
        format: Format,
        drop_existing: bool,
        observer: &mut dyn ProgressObserver,
    ) -> CoreResult<u64> {
        let file =
            File::open(input).map_err(|e| CoreError::artifact("cannot open backup file", input, e))?;
        info!(collection, path = %input.display(), %format, drop_existing, "restoring");
        Loader::new(&self.store, &self.config).load(collection, file, format, drop_existing, observer)
    }

    /// Reconciles records into `collection`.
    pub fn import(&self, collection: &str, records: impl IntoIterator<Item = Record>) -> ImportSummary {
        let reconciler = Reconciler::new(&self.store, collection);
        import_records(&reconciler, records, self.config.import_progress_interval)
    }
}
