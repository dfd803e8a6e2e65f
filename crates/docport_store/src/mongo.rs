//! MongoDB store over the official driver's blocking API.

use crate::error::{StoreError, StoreResult};
use crate::store::{DocumentCursor, DocumentStore, Filter};
use docport_codec::{from_bson, to_bson, Document};
use mongodb::bson::{self, doc};
use mongodb::options::ReplaceOptions;
use mongodb::sync::{Client, Collection, Database};
use tracing::{debug, info};

/// A document store backed by a MongoDB database.
///
/// Documents cross the driver boundary as raw BSON bytes, so the engine's
/// own codec decides exactly what is written to and read from artifacts.
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Connects to `uri`, selects `database` and pings the server.
    ///
    /// Timeouts come from the connection string (`connectTimeoutMS`,
    /// `serverSelectionTimeoutMS`, ...).
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the URI is invalid or the ping fails.
    pub fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri).map_err(|e| StoreError::Connection {
            message: e.to_string(),
        })?;
        let store = Self {
            database: client.database(database),
        };
        store.ping()?;
        info!(database, "connected to MongoDB");
        Ok(store)
    }

    fn collection(&self, name: &str) -> Collection<bson::Document> {
        self.database.collection(name)
    }
}

impl std::fmt::Debug for MongoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoStore")
            .field("database", &self.database.name())
            .finish_non_exhaustive()
    }
}

pub(crate) fn to_driver(document: &Document) -> StoreResult<bson::Document> {
    let bytes = to_bson(document)?;
    bson::Document::from_reader(bytes.as_slice()).map_err(|e| StoreError::driver("convert", e))
}

pub(crate) fn from_driver(document: &bson::Document) -> StoreResult<Document> {
    let mut bytes = Vec::new();
    document
        .to_writer(&mut bytes)
        .map_err(|e| StoreError::driver("convert", e))?;
    Ok(from_bson(&bytes)?)
}

impl DocumentStore for MongoStore {
    fn ping(&self) -> StoreResult<()> {
        self.database
            .run_command(doc! { "ping": 1 }, None)
            .map_err(|e| StoreError::Connection {
                message: format!("ping failed: {e}"),
            })?;
        Ok(())
    }

    fn list_collections(&self) -> StoreResult<Vec<String>> {
        self.database
            .list_collection_names(None)
            .map_err(|e| StoreError::driver("listCollections", e))
    }

    fn scan(&self, collection: &str) -> StoreResult<DocumentCursor<'_>> {
        let cursor = self
            .collection(collection)
            .find(None, None)
            .map_err(|e| StoreError::driver("find", e))?;
        Ok(Box::new(cursor.map(|item| {
            let raw = item.map_err(|e| StoreError::driver("cursor", e))?;
            from_driver(&raw)
        })))
    }

    fn drop_collection(&self, collection: &str) -> StoreResult<()> {
        self.collection(collection)
            .drop(None)
            .map_err(|e| StoreError::driver("drop", e))
    }

    fn insert_one(&self, collection: &str, document: &Document) -> StoreResult<()> {
        let raw = to_driver(document)?;
        self.collection(collection)
            .insert_one(raw, None)
            .map_err(|e| StoreError::insert_rejected(collection, e))?;
        Ok(())
    }

    fn insert_many(&self, collection: &str, documents: &[Document]) -> StoreResult<()> {
        if documents.is_empty() {
            return Ok(());
        }
        let raw = documents
            .iter()
            .map(to_driver)
            .collect::<StoreResult<Vec<_>>>()?;
        let result = self
            .collection(collection)
            .insert_many(raw, None)
            .map_err(|e| StoreError::insert_rejected(collection, e))?;
        debug!(
            collection,
            inserted = result.inserted_ids.len(),
            "insert_many acknowledged"
        );
        Ok(())
    }

    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        let query = to_driver(&filter.to_document())?;
        self.collection(collection)
            .find_one(query, None)
            .map_err(|e| StoreError::driver("findOne", e))?
            .as_ref()
            .map(from_driver)
            .transpose()
    }

    fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        document: &Document,
        upsert: bool,
    ) -> StoreResult<()> {
        let query = to_driver(&filter.to_document())?;
        let replacement = to_driver(document)?;
        let options = ReplaceOptions::builder().upsert(upsert).build();
        self.collection(collection)
            .replace_one(query, replacement, options)
            .map_err(|e| StoreError::driver("replaceOne", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docport_codec::{ObjectId, Value};

    #[test]
    fn conversion_roundtrip() {
        let ours = Document::new()
            .with("_id", ObjectId::from_bytes([3; 12]))
            .with("Number", "A-1")
            .with("count", Value::Int64(5))
            .with("nested", Document::new().with("ok", true));
        let raw = to_driver(&ours).unwrap();
        assert_eq!(raw.get_str("Number").unwrap(), "A-1");
        assert_eq!(raw.get_i64("count").unwrap(), 5);
        assert_eq!(from_driver(&raw).unwrap(), ours);
    }

    #[test]
    fn driver_documents_convert() {
        let raw = doc! { "Product": "widget", "qty": 3_i32, "tags": ["a", "b"] };
        let ours = from_driver(&raw).unwrap();
        assert_eq!(ours.get_str("Product"), Some("widget"));
        assert_eq!(ours.get("qty"), Some(&Value::Int32(3)));
        assert_eq!(ours.get("tags").and_then(Value::as_array).map(<[Value]>::len), Some(2));
    }

    #[test]
    fn server_only_types_convert_both_ways() {
        let mut one = [0u8; 16];
        one[0] = 1;
        one[14] = 0x40;
        one[15] = 0x30;
        let raw = doc! {
            "price": bson::Bson::Decimal128(bson::Decimal128::from_bytes(one)),
            "ts": bson::Bson::Timestamp(bson::Timestamp { time: 10, increment: 2 }),
            "re": bson::Bson::RegularExpression(bson::Regex {
                pattern: "^N-".to_string(),
                options: "i".to_string(),
            }),
            "code": bson::Bson::JavaScriptCode("return 1".to_string()),
            "lo": bson::Bson::MinKey,
            "hi": bson::Bson::MaxKey,
            "undef": bson::Bson::Undefined,
        };
        let ours = from_driver(&raw).unwrap();
        assert_eq!(
            ours.get("price"),
            Some(&Value::Decimal128(docport_codec::Decimal128::from_bytes(one)))
        );
        assert_eq!(
            ours.get("ts"),
            Some(&Value::Timestamp {
                time: 10,
                increment: 2
            })
        );
        assert_eq!(
            ours.get("re"),
            Some(&Value::Regex {
                pattern: "^N-".into(),
                options: "i".into()
            })
        );
        assert_eq!(ours.get("lo"), Some(&Value::MinKey));
        assert_eq!(ours.get("undef"), Some(&Value::Undefined));
        assert_eq!(to_driver(&ours).unwrap(), raw);
    }
}
