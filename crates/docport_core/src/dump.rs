//! Collection dumping.
//!
//! A dump walks a full, unfiltered cursor and writes each document through
//! the codec to a sink. Nothing else goes into the artifact: no header, no
//! collection name, no trailer.

use crate::config::EngineConfig;
use crate::error::{CoreError, CoreResult};
use crate::progress::ProgressObserver;
use docport_codec::{encode, Format};
use docport_store::DocumentStore;
use std::io::Write;
use tracing::{debug, info};

/// Writes whole collections to artifact streams.
pub struct Dumper<'a, S: ?Sized> {
    store: &'a S,
    progress_interval: u64,
}

impl<'a, S: DocumentStore + ?Sized> Dumper<'a, S> {
    /// Creates a dumper over `store`.
    #[must_use]
    pub fn new(store: &'a S, config: &EngineConfig) -> Self {
        Self {
            store,
            progress_interval: config.progress_interval.max(1),
        }
    }

    /// Dumps every document of `collection` into `sink`.
    ///
    /// Returns the number of documents written. An empty collection writes
    /// nothing and returns 0. The sink is flushed before returning.
    ///
    /// # Errors
    ///
    /// - `Store` if the cursor cannot be opened or fails mid-iteration
    /// - `EncodeFailure` if a document cannot be encoded in `format`
    /// - `WriteFailure` on the first sink error
    pub fn dump<W: Write + ?Sized>(
        &self,
        collection: &str,
        sink: &mut W,
        format: Format,
        observer: &mut dyn ProgressObserver,
    ) -> CoreResult<u64> {
        debug!(collection, %format, "opening cursor");
        let cursor = self.store.scan(collection)?;

        let mut count = 0u64;
        for item in cursor {
            let document = item?;
            let bytes = encode(&document, format).map_err(|source| CoreError::EncodeFailure {
                collection: collection.to_string(),
                ordinal: count + 1,
                source,
            })?;
            sink.write_all(&bytes)
                .map_err(|source| write_failure(collection, source))?;
            count += 1;

            if count % self.progress_interval == 0 {
                info!(collection, count, "backed up documents");
                observer.documents_dumped(collection, count);
            }
        }

        sink.flush().map_err(|source| write_failure(collection, source))?;
        info!(collection, count, %format, "backup completed");
        Ok(count)
    }
}

fn write_failure(collection: &str, source: std::io::Error) -> CoreError {
    CoreError::WriteFailure {
        collection: collection.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docport_codec::{decode_one, Document};
    use docport_store::InMemoryStore;
    use std::io;

    fn store_with(n: i32) -> InMemoryStore {
        let docs = (0..n).map(|i| Document::new().with("_id", i).with("v", i * 2)).collect();
        InMemoryStore::with_collection("items", docs)
    }

    #[derive(Default)]
    struct Counts(Vec<u64>);

    impl ProgressObserver for Counts {
        fn documents_dumped(&mut self, _collection: &str, count: u64) {
            self.0.push(count);
        }
    }

    struct FailingSink {
        accepted: usize,
    }

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.accepted == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.accepted -= 1;
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn dump_writes_back_to_back_documents() {
        let store = store_with(3);
        let dumper = Dumper::new(&store, &EngineConfig::default());
        let mut out = Vec::new();
        let count = dumper.dump("items", &mut out, Format::Bson, &mut ()).unwrap();
        assert_eq!(count, 3);

        let mut offset = 0;
        let mut decoded = Vec::new();
        while offset < out.len() {
            let (doc, used) = decode_one(&out[offset..], Format::Bson).unwrap();
            decoded.push(doc);
            offset += used;
        }
        assert_eq!(decoded, store.documents("items"));
    }

    #[test]
    fn json_dump_is_one_line_per_document() {
        let store = store_with(4);
        let dumper = Dumper::new(&store, &EngineConfig::default());
        let mut out = Vec::new();
        dumper.dump("items", &mut out, Format::Json, &mut ()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn empty_collection_writes_nothing() {
        let store = InMemoryStore::new();
        let dumper = Dumper::new(&store, &EngineConfig::default());
        let mut out = Vec::new();
        assert_eq!(dumper.dump("nothing", &mut out, Format::Bson, &mut ()).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn progress_every_interval() {
        let store = store_with(7);
        let config = EngineConfig::new().progress_interval(3);
        let mut counts = Counts::default();
        Dumper::new(&store, &config)
            .dump("items", &mut Vec::new(), Format::Bson, &mut counts)
            .unwrap();
        assert_eq!(counts.0, vec![3, 6]);
    }

    #[test]
    fn sink_error_fails_fast() {
        let store = store_with(5);
        let dumper = Dumper::new(&store, &EngineConfig::default());
        let mut sink = FailingSink { accepted: 2 };
        let err = dumper.dump("items", &mut sink, Format::Bson, &mut ()).unwrap_err();
        assert!(matches!(err, CoreError::WriteFailure { ref collection, .. } if collection == "items"));
    }

    #[test]
    fn cursor_error_surfaces_as_store_error() {
        let store = store_with(2);
        store.fail_scans_of("items");
        let dumper = Dumper::new(&store, &EngineConfig::default());
        let err = dumper.dump("items", &mut Vec::new(), Format::Json, &mut ()).unwrap_err();
        assert!(matches!(err, CoreError::Store(_)));
    }

    #[test]
    fn unencodable_document_reports_ordinal() {
        let docs = vec![
            Document::new().with("_id", 1),
            Document::new().with("bad\0name", 2),
        ];
        let store = InMemoryStore::with_collection("items", docs);
        let dumper = Dumper::new(&store, &EngineConfig::default());
        let err = dumper.dump("items", &mut Vec::new(), Format::Bson, &mut ()).unwrap_err();
        assert!(matches!(err, CoreError::EncodeFailure { ordinal: 2, .. }));
    }
}
