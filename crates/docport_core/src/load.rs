//! Collection loading.
//!
//! The source is read in fixed-size chunks; document boundaries are found by
//! the codec's [`FrameBuffer`], never by assuming a read returns whole
//! documents. Decoded documents are accumulated into batches and each full
//! batch goes to the store in one `insert_many`.

use crate::config::EngineConfig;
use crate::error::{CoreError, CoreResult};
use crate::progress::ProgressObserver;
use docport_codec::{CodecError, Document, Format, FrameBuffer};
use docport_store::DocumentStore;
use std::io::{ErrorKind, Read};
use tracing::{debug, info, warn};

/// Restores artifact streams into collections.
pub struct Loader<'a, S: ?Sized> {
    store: &'a S,
    batch_size: usize,
    chunk_size: usize,
}

impl<'a, S: DocumentStore + ?Sized> Loader<'a, S> {
    /// Creates a loader over `store`.
    #[must_use]
    pub fn new(store: &'a S, config: &EngineConfig) -> Self {
        Self {
            store,
            batch_size: config.batch_size.max(1),
            chunk_size: config.chunk_size.max(1),
        }
    }

    /// Loads every document in `source` into `collection`.
    ///
    /// With `drop_existing` the collection is dropped first; a failed drop is
    /// logged and the restore carries on. Returns the number of documents
    /// inserted.
    ///
    /// A failure aborts the restore where it happened: batches already
    /// inserted stay in the collection and the pending partial batch is
    /// discarded.
    ///
    /// # Errors
    ///
    /// - `ReadFailure` if the source cannot be read
    /// - `DecodeFailure` / `MalformedRecord` for an invalid document
    /// - `TruncatedStream` if the source ends inside a document
    /// - `InsertFailure` if the store rejects a batch
    pub fn load<R: Read>(
        &self,
        collection: &str,
        mut source: R,
        format: Format,
        drop_existing: bool,
        observer: &mut dyn ProgressObserver,
    ) -> CoreResult<u64> {
        if drop_existing {
            match self.store.drop_collection(collection) {
                Ok(()) => debug!(collection, "dropped collection before restore"),
                Err(e) => warn!(collection, error = %e, "failed to drop collection"),
            }
        }

        let mut frames = FrameBuffer::new(format);
        let mut batch: Vec<Document> = Vec::with_capacity(self.batch_size);
        let mut chunk = vec![0u8; self.chunk_size];
        let mut written = 0u64;

        loop {
            let n = match source.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => return Err(CoreError::ReadFailure { source }),
            };
            frames.extend(&chunk[..n]);

            loop {
                let next = frames
                    .next_document()
                    .map_err(|e| decode_error(e, frames.documents_decoded() + 1))?;
                let Some(document) = next else { break };
                batch.push(document);
                if batch.len() >= self.batch_size {
                    written += self.flush(collection, &mut batch, written, observer)?;
                }
            }
        }

        let decoded = frames.documents_decoded();
        match frames.finish() {
            Ok(Some(document)) => batch.push(document),
            Ok(None) => {}
            Err(source) if source.is_truncated() => {
                return Err(CoreError::TruncatedStream {
                    documents: decoded,
                    source,
                });
            }
            Err(e) => return Err(decode_error(e, decoded + 1)),
        }
        if !batch.is_empty() {
            written += self.flush(collection, &mut batch, written, observer)?;
        }

        info!(collection, documents = written, %format, "restore completed");
        Ok(written)
    }

    fn flush(
        &self,
        collection: &str,
        batch: &mut Vec<Document>,
        written: u64,
        observer: &mut dyn ProgressObserver,
    ) -> CoreResult<u64> {
        let size = batch.len();
        self.store
            .insert_many(collection, batch)
            .map_err(|source| CoreError::InsertFailure {
                collection: collection.to_string(),
                batch_size: size,
                source,
            })?;
        batch.clear();

        let total = written + size as u64;
        info!(collection, batch = size, total, "inserted batch");
        observer.batch_inserted(collection, size, total);
        Ok(size as u64)
    }
}

fn decode_error(source: CodecError, ordinal: u64) -> CoreError {
    match source {
        CodecError::MalformedRecord { .. } => CoreError::MalformedRecord { ordinal, source },
        _ => CoreError::DecodeFailure { ordinal, source },
    }
}
