//! In-memory document store for testing.

use crate::error::{StoreError, StoreResult};
use crate::store::{DocumentCursor, DocumentStore, Filter};
use docport_codec::{Document, ObjectId, Value};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default)]
struct State {
    collections: BTreeMap<String, Vec<Document>>,
    insert_batches: Vec<(String, usize)>,
    failing_scans: BTreeSet<String>,
    failing_drops: BTreeSet<String>,
}

/// An in-memory document store.
///
/// Behaves like a MongoDB database for everything the engine relies on:
/// documents keep insertion order, inserts assign a missing `_id`, a
/// duplicate `_id` is rejected, and an ordered bulk insert keeps the
/// documents before the rejected one.
///
/// Every `insert_many` call is recorded so tests can check batching, and
/// scans or drops of chosen collections can be made to fail.
///
/// # Example
///
/// ```rust
/// use docport_codec::Document;
/// use docport_store::{DocumentStore, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// store.insert_one("records", &Document::new().with("Number", "7")).unwrap();
/// assert_eq!(store.list_collections().unwrap(), vec!["records".to_string()]);
/// assert_eq!(store.count("records"), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with one pre-populated collection.
    ///
    /// Documents are taken as-is; no `_id` is assigned.
    #[must_use]
    pub fn with_collection(name: &str, documents: Vec<Document>) -> Self {
        let store = Self::new();
        store
            .state
            .write()
            .collections
            .insert(name.to_string(), documents);
        store
    }

    /// Returns a copy of a collection's documents in insertion order.
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.state
            .read()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of documents in a collection.
    #[must_use]
    pub fn count(&self, collection: &str) -> usize {
        self.state
            .read()
            .collections
            .get(collection)
            .map_or(0, Vec::len)
    }

    /// Sizes of every `insert_many` call made against `collection`.
    #[must_use]
    pub fn insert_batches(&self, collection: &str) -> Vec<usize> {
        self.state
            .read()
            .insert_batches
            .iter()
            .filter(|(name, _)| name == collection)
            .map(|(_, size)| *size)
            .collect()
    }

    /// Makes every later `scan` of `collection` fail.
    pub fn fail_scans_of(&self, collection: &str) {
        self.state
            .write()
            .failing_scans
            .insert(collection.to_string());
    }

    /// Makes every later `drop_collection` of `collection` fail, leaving
    /// its documents in place.
    pub fn fail_drops_of(&self, collection: &str) {
        self.state
            .write()
            .failing_drops
            .insert(collection.to_string());
    }
}

fn with_id(document: &Document) -> Document {
    if document.contains_key("_id") {
        return document.clone();
    }
    std::iter::once(("_id".to_string(), Value::ObjectId(ObjectId::new())))
        .chain(document.iter().map(|(k, v)| (k.to_string(), v.clone())))
        .collect()
}

fn insert_into(
    docs: &mut Vec<Document>,
    collection: &str,
    document: &Document,
) -> StoreResult<()> {
    let document = with_id(document);
    let id = document.get("_id");
    if docs.iter().any(|existing| existing.get("_id") == id) {
        return Err(StoreError::insert_rejected(
            collection,
            "E11000 duplicate key error on _id",
        ));
    }
    docs.push(document);
    Ok(())
}

impl DocumentStore for InMemoryStore {
    fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn list_collections(&self) -> StoreResult<Vec<String>> {
        Ok(self.state.read().collections.keys().cloned().collect())
    }

    fn scan(&self, collection: &str) -> StoreResult<DocumentCursor<'_>> {
        let state = self.state.read();
        if state.failing_scans.contains(collection) {
            return Err(StoreError::driver(
                "find",
                format!("cursor on '{collection}' was killed"),
            ));
        }
        // Snapshot so the cursor does not hold the lock.
        let snapshot = state.collections.get(collection).cloned().unwrap_or_default();
        Ok(Box::new(snapshot.into_iter().map(Ok)))
    }

    fn drop_collection(&self, collection: &str) -> StoreResult<()> {
        let mut state = self.state.write();
        if state.failing_drops.contains(collection) {
            return Err(StoreError::driver(
                "drop",
                format!("not authorized to drop '{collection}'"),
            ));
        }
        state.collections.remove(collection);
        Ok(())
    }

    fn insert_one(&self, collection: &str, document: &Document) -> StoreResult<()> {
        let mut state = self.state.write();
        let docs = state.collections.entry(collection.to_string()).or_default();
        insert_into(docs, collection, document)
    }

    fn insert_many(&self, collection: &str, documents: &[Document]) -> StoreResult<()> {
        let mut state = self.state.write();
        state
            .insert_batches
            .push((collection.to_string(), documents.len()));
        let docs = state.collections.entry(collection.to_string()).or_default();
        for document in documents {
            insert_into(docs, collection, document)?;
        }
        Ok(())
    }

    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        Ok(self
            .state
            .read()
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        document: &Document,
        upsert: bool,
    ) -> StoreResult<()> {
        let mut state = self.state.write();
        let docs = state.collections.entry(collection.to_string()).or_default();
        match docs.iter().position(|d| filter.matches(d)) {
            Some(idx) => {
                let mut replacement = document.clone();
                match (docs[idx].get("_id"), replacement.get("_id")) {
                    (Some(old), Some(new)) if old != new => {
                        return Err(StoreError::driver(
                            "replace",
                            "the (immutable) field '_id' was found to have been altered",
                        ));
                    }
                    (Some(old), None) => {
                        let old = old.clone();
                        replacement = std::iter::once(("_id".to_string(), old))
                            .chain(replacement)
                            .collect();
                    }
                    _ => {}
                }
                docs[idx] = replacement;
                Ok(())
            }
            None if upsert => insert_into(docs, collection, document),
            None => Ok(()),
        }
    }
}
