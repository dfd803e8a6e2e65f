//! Document store trait definition.

use crate::error::StoreResult;
use docport_codec::{Document, Value};

/// A forward-only cursor over the documents of one collection.
pub type DocumentCursor<'a> = Box<dyn Iterator<Item = StoreResult<Document>> + Send + 'a>;

/// Equality filter on a single top-level field.
///
/// This is the only query shape the engine issues: the reconciler looks
/// records up by their natural identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    field: String,
    value: Value,
}

impl Filter {
    /// Matches documents whose `field` equals `value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Field name this filter tests.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Value the field must equal.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns true if `document` satisfies the filter.
    pub fn matches(&self, document: &Document) -> bool {
        document.get(&self.field) == Some(&self.value)
    }

    /// The filter as a one-field document, the shape drivers expect.
    pub fn to_document(&self) -> Document {
        Document::new().with(self.field.clone(), self.value.clone())
    }
}

/// A database handle the engine reads collections from and writes them to.
///
/// Stores hold **schemaless documents**. The engine never interprets stored
/// documents beyond the identifier used in merges, so a store only has to
/// move them in and out faithfully.
///
/// # Invariants
///
/// - `scan` yields every document in the collection exactly once
/// - `insert_many` submits the batch in order; a rejection may leave a
///   prefix of the batch stored, but never reorders it
/// - inserts assign an `_id` when the document has none
/// - stores must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - `MongoStore` - Real MongoDB (feature `mongo`)
pub trait DocumentStore: Send + Sync {
    /// Round-trips to the server to prove the connection is usable.
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the server cannot be reached.
    fn ping(&self) -> StoreResult<()>;

    /// Lists collection names in the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    fn list_collections(&self) -> StoreResult<Vec<String>>;

    /// Opens an unfiltered cursor over a collection.
    ///
    /// A collection that does not exist scans as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the cursor cannot be opened. Errors while
    /// iterating are yielded by the cursor itself.
    fn scan(&self, collection: &str) -> StoreResult<DocumentCursor<'_>>;

    /// Drops a whole collection. Dropping a missing collection succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the drop fails.
    fn drop_collection(&self, collection: &str) -> StoreResult<()>;

    /// Inserts one document.
    ///
    /// # Errors
    ///
    /// Returns `InsertRejected` if the store refuses the document.
    fn insert_one(&self, collection: &str, document: &Document) -> StoreResult<()>;

    /// Inserts a batch of documents in one round trip.
    ///
    /// # Errors
    ///
    /// Returns `InsertRejected` if the store refuses any document.
    fn insert_many(&self, collection: &str, documents: &[Document]) -> StoreResult<()>;

    /// Finds the first document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>>;

    /// Replaces the first document matching `filter` wholesale.
    ///
    /// With `upsert`, inserts `document` when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the replace fails.
    fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        document: &Document,
        upsert: bool,
    ) -> StoreResult<()>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn ping(&self) -> StoreResult<()> {
        (**self).ping()
    }

    fn list_collections(&self) -> StoreResult<Vec<String>> {
        (**self).list_collections()
    }

    fn scan(&self, collection: &str) -> StoreResult<DocumentCursor<'_>> {
        (**self).scan(collection)
    }

    fn drop_collection(&self, collection: &str) -> StoreResult<()> {
        (**self).drop_collection(collection)
    }

    fn insert_one(&self, collection: &str, document: &Document) -> StoreResult<()> {
        (**self).insert_one(collection, document)
    }

    fn insert_many(&self, collection: &str, documents: &[Document]) -> StoreResult<()> {
        (**self).insert_many(collection, documents)
    }

    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        (**self).find_one(collection, filter)
    }

    fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        document: &Document,
        upsert: bool,
    ) -> StoreResult<()> {
        (**self).replace_one(collection, filter, document, upsert)
    }
}
