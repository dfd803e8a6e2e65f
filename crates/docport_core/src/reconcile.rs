//! Merge-upsert reconciliation of imported records.
//!
//! A record is keyed by its `Number`. When no stored document carries that
//! number a fresh document is inserted. When one does, only the core fields
//! are overwritten in place and every other stored field is kept, so columns
//! an operator added by hand survive re-imports.
//!
//! Lookup and write are two round trips; concurrent importers on the same
//! collection can race. Imports are expected to run single-writer.

use crate::error::CoreResult;
use docport_codec::Document;
use docport_store::{DocumentStore, Filter};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Stored name of the natural identifier.
pub const NUMBER_FIELD: &str = "Number";

/// Fields an import owns. Everything else in a stored document is preserved.
pub const CORE_FIELDS: [&str; 5] = [
    "Product",
    NUMBER_FIELD,
    "Description",
    "DisclaimerVerbiage",
    "AutoSelect",
];

/// One parsed input row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Product name.
    pub product: String,
    /// Natural identifier.
    pub number: String,
    /// Free-text description.
    pub description: String,
    /// Disclaimer read to customers; stored as `DisclaimerVerbiage`.
    pub verbal_disclaimer: String,
    /// Auto-select flag; the CSV importer always leaves it empty.
    pub auto_select: String,
}

impl Record {
    /// True when the identifier is blank and the record must be skipped.
    pub fn is_unkeyed(&self) -> bool {
        self.number.trim().is_empty()
    }

    /// The record as a stored document, core fields only.
    pub fn to_document(&self) -> Document {
        Document::new()
            .with("Product", self.product.as_str())
            .with(NUMBER_FIELD, self.number.as_str())
            .with("Description", self.description.as_str())
            .with("DisclaimerVerbiage", self.verbal_disclaimer.as_str())
            .with("AutoSelect", self.auto_select.as_str())
    }
}

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No stored document had the number; a new one was inserted.
    Inserted,
    /// A stored document was merged.
    Updated {
        /// Non-core fields kept from the stored document (`_id` excluded).
        preserved_fields: usize,
    },
    /// The record had no number and was not stored.
    Skipped,
}

/// Overwrites the core fields of `existing` with those of `incoming`.
///
/// Field order of `existing` is kept; core fields it lacked are appended.
/// Returns the merged document and the number of preserved non-core fields.
pub fn merge_core_fields(existing: &Document, incoming: &Document) -> (Document, usize) {
    let mut merged = existing.clone();
    for field in CORE_FIELDS {
        if let Some(value) = incoming.get(field) {
            merged.insert(field, value.clone());
        }
    }
    let preserved = existing
        .keys()
        .filter(|k| *k != "_id" && !CORE_FIELDS.contains(k))
        .count();
    (merged, preserved)
}

/// Applies records to one collection with the field-preserving merge.
pub struct Reconciler<'a, S: ?Sized> {
    store: &'a S,
    collection: String,
}

impl<'a, S: DocumentStore + ?Sized> Reconciler<'a, S> {
    /// Creates a reconciler writing to `collection`.
    pub fn new(store: &'a S, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Target collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Inserts or merges one record.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the lookup or the write fails.
    pub fn reconcile(&self, record: &Record) -> CoreResult<ReconcileOutcome> {
        if record.is_unkeyed() {
            debug!(collection = %self.collection, "skipping record without Number");
            return Ok(ReconcileOutcome::Skipped);
        }

        let filter = Filter::eq(NUMBER_FIELD, record.number.as_str());
        let incoming = record.to_document();

        match self.store.find_one(&self.collection, &filter)? {
            None => {
                self.store.insert_one(&self.collection, &incoming)?;
                debug!(number = %record.number, "inserted new record");
                Ok(ReconcileOutcome::Inserted)
            }
            Some(existing) => {
                let (merged, preserved_fields) = merge_core_fields(&existing, &incoming);
                self.store
                    .replace_one(&self.collection, &filter, &merged, true)?;
                debug!(
                    number = %record.number,
                    preserved_fields,
                    "updated existing record"
                );
                Ok(ReconcileOutcome::Updated { preserved_fields })
            }
        }
    }
}

/// Totals of one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Records stored as new documents.
    pub inserted: u64,
    /// Records merged into existing documents.
    pub updated: u64,
    /// Records without a number.
    pub skipped: u64,
    /// Records the store refused.
    pub failed: u64,
}

impl ImportSummary {
    /// Records that reached the store successfully.
    pub fn succeeded(&self) -> u64 {
        self.inserted + self.updated
    }

    /// All records seen.
    pub fn total(&self) -> u64 {
        self.succeeded() + self.skipped + self.failed
    }

    fn record(&mut self, outcome: ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Inserted => self.inserted += 1,
            ReconcileOutcome::Updated { .. } => self.updated += 1,
            ReconcileOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Reconciles every record, continuing past per-record failures.
///
/// A record the store refuses is logged and counted as failed; the rest of
/// the import proceeds. Progress is logged every `progress_interval`
/// successful records.
pub fn import_records<S, I>(
    reconciler: &Reconciler<'_, S>,
    records: I,
    progress_interval: u64,
) -> ImportSummary
where
    S: DocumentStore + ?Sized,
    I: IntoIterator<Item = Record>,
{
    let every = progress_interval.max(1);
    let mut summary = ImportSummary::default();

    for (idx, record) in records.into_iter().enumerate() {
        match reconciler.reconcile(&record) {
            Ok(outcome) => {
                summary.record(outcome);
                if !matches!(outcome, ReconcileOutcome::Skipped)
                    && summary.succeeded() % every == 0
                {
                    info!(processed = summary.succeeded(), "import progress");
                }
            }
            Err(e) => {
                warn!(row = idx + 1, number = %record.number, error = %e, "failed to import record");
                summary.failed += 1;
            }
        }
    }

    info!(
        collection = reconciler.collection(),
        inserted = summary.inserted,
        updated = summary.updated,
        skipped = summary.skipped,
        failed = summary.failed,
        "import completed"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use docport_codec::Value;
    use docport_store::InMemoryStore;

    fn record(number: &str, product: &str) -> Record {
        Record {
            product: product.to_string(),
            number: number.to_string(),
            description: "desc".to_string(),
            verbal_disclaimer: "say this".to_string(),
            auto_select: String::new(),
        }
    }

    #[test]
    fn record_document_uses_stored_names() {
        let doc = record("7", "widget").to_document();
        assert_eq!(doc.keys().collect::<Vec<_>>(), CORE_FIELDS.to_vec());
        assert_eq!(doc.get_str("DisclaimerVerbiage"), Some("say this"));
    }

    #[test]
    fn inserts_when_absent() {
        let store = InMemoryStore::new();
        let reconciler = Reconciler::new(&store, "records");
        let outcome = reconciler.reconcile(&record("1", "widget")).unwrap();
        assert_eq!(outcome, ReconcileOutcome::Inserted);
        let stored = store.documents("records");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].get_str("Product"), Some("widget"));
    }

    #[test]
    fn merge_preserves_extra_fields() {
        let existing = Document::new()
            .with("_id", 10)
            .with("Product", "old")
            .with("Number", "1")
            .with("extra", "keep-me");
        let store = InMemoryStore::with_collection("records", vec![existing]);
        let reconciler = Reconciler::new(&store, "records");

        let outcome = reconciler.reconcile(&record("1", "new")).unwrap();
        assert_eq!(outcome, ReconcileOutcome::Updated { preserved_fields: 1 });

        let stored = store.documents("records");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].get("_id"), Some(&Value::Int32(10)));
        assert_eq!(stored[0].get_str("Product"), Some("new"));
        assert_eq!(stored[0].get_str("extra"), Some("keep-me"));
        assert_eq!(stored[0].get_str("Description"), Some("desc"));
    }

    #[test]
    fn merge_keeps_field_order() {
        let existing = Document::new()
            .with("_id", 1)
            .with("Number", "1")
            .with("note", "x")
            .with("Product", "old");
        let (merged, preserved) = merge_core_fields(&existing, &record("1", "new").to_document());
        assert_eq!(preserved, 1);
        assert_eq!(
            merged.keys().collect::<Vec<_>>(),
            vec!["_id", "Number", "note", "Product", "Description", "DisclaimerVerbiage", "AutoSelect"]
        );
    }

    #[test]
    fn blank_number_is_skipped() {
        let store = InMemoryStore::new();
        let reconciler = Reconciler::new(&store, "records");
        assert_eq!(
            reconciler.reconcile(&record("   ", "widget")).unwrap(),
            ReconcileOutcome::Skipped
        );
        assert_eq!(store.count("records"), 0);
    }

    #[test]
    fn import_counts_every_outcome() {
        let store = InMemoryStore::with_collection(
            "records",
            vec![Document::new().with("_id", 1).with("Number", "2")],
        );
        let reconciler = Reconciler::new(&store, "records");
        let summary = import_records(
            &reconciler,
            vec![record("1", "a"), record("2", "b"), record("", "c"), record("3", "d")],
            1,
        );
        assert_eq!(
            summary,
            ImportSummary {
                inserted: 2,
                updated: 1,
                skipped: 1,
                failed: 0
            }
        );
        assert_eq!(summary.total(), 4);
        assert_eq!(store.count("records"), 3);
    }

    /// Refuses inserts of one particular number.
    struct Refusing {
        inner: InMemoryStore,
        number: &'static str,
    }

    impl DocumentStore for Refusing {
        fn ping(&self) -> docport_store::StoreResult<()> {
            self.inner.ping()
        }

        fn list_collections(&self) -> docport_store::StoreResult<Vec<String>> {
            self.inner.list_collections()
        }

        fn scan(&self, collection: &str) -> docport_store::StoreResult<docport_store::DocumentCursor<'_>> {
            self.inner.scan(collection)
        }

        fn drop_collection(&self, collection: &str) -> docport_store::StoreResult<()> {
            self.inner.drop_collection(collection)
        }

        fn insert_one(&self, collection: &str, document: &Document) -> docport_store::StoreResult<()> {
            if document.get_str(NUMBER_FIELD) == Some(self.number) {
                return Err(docport_store::StoreError::insert_rejected(collection, "refused"));
            }
            self.inner.insert_one(collection, document)
        }

        fn insert_many(&self, collection: &str, documents: &[Document]) -> docport_store::StoreResult<()> {
            self.inner.insert_many(collection, documents)
        }

        fn find_one(&self, collection: &str, filter: &Filter) -> docport_store::StoreResult<Option<Document>> {
            self.inner.find_one(collection, filter)
        }

        fn replace_one(
            &self,
            collection: &str,
            filter: &Filter,
            document: &Document,
            upsert: bool,
        ) -> docport_store::StoreResult<()> {
            self.inner.replace_one(collection, filter, document, upsert)
        }
    }

    #[test]
    fn import_continues_past_failures() {
        let store = Refusing {
            inner: InMemoryStore::new(),
            number: "2",
        };
        let reconciler = Reconciler::new(&store, "records");
        let summary = import_records(
            &reconciler,
            vec![record("1", "a"), record("2", "b"), record("3", "c"), record("1", "a2")],
            100,
        );
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(store.inner.count("records"), 2);
    }

    #[test]
    fn summary_serializes() {
        let summary = ImportSummary {
            inserted: 1,
            updated: 2,
            skipped: 3,
            failed: 0,
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert_eq!(json, r#"{"inserted":1,"updated":2,"skipped":3,"failed":0}"#);
    }
}
