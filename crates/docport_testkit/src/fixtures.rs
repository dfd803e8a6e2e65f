//! Test fixtures and store helpers.

use docport_codec::{encode, Document, Format, ObjectId};
use docport_store::InMemoryStore;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch directory for artifacts, removed on drop.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh workspace.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Root of the workspace.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `name` inside the workspace (not created).
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Writes `bytes` to `name` and returns its path.
    pub fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.file(name);
        fs::write(&path, bytes).expect("Failed to write fixture file");
        path
    }

    /// Files currently in the workspace root, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(self.dir.path())
            .expect("Failed to list workspace")
            .map(|entry| entry.expect("Failed to read entry").path())
            .collect();
        files.sort();
        files
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// `n` product documents with distinct ids and numbers `N-0000`, `N-0001`, ...
///
/// Every document also carries an `extra` field that imports must not touch.
pub fn product_documents(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| {
            let mut id = [0u8; 12];
            id[4..12].copy_from_slice(&(i as u64).to_be_bytes());
            Document::new()
                .with("_id", ObjectId::from_bytes(id))
                .with("Product", format!("product {i}"))
                .with("Number", format!("N-{i:04}"))
                .with("Description", "seeded")
                .with("DisclaimerVerbiage", "")
                .with("AutoSelect", "")
                .with("extra", format!("keep-{i}"))
        })
        .collect()
}

/// A store holding `n` product documents in `collection`.
pub fn seeded_store(collection: &str, n: usize) -> InMemoryStore {
    InMemoryStore::with_collection(collection, product_documents(n))
}

/// Documents encoded back to back, as an artifact holds them.
pub fn artifact_bytes(documents: &[Document], format: Format) -> Vec<u8> {
    documents
        .iter()
        .flat_map(|d| encode(d, format).expect("Failed to encode fixture document"))
        .collect()
}
