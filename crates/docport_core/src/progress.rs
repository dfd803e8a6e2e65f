//! Progress notifications.

/// Receives progress from long-running dumps and restores.
///
/// Every method has an empty default, so an observer only implements what
/// it shows. `()` is the no-op observer.
pub trait ProgressObserver {
    /// `count` documents of `collection` have been written to the artifact.
    fn documents_dumped(&mut self, collection: &str, count: u64) {
        let _ = (collection, count);
    }

    /// A batch of `batch_size` documents was inserted; `total` so far.
    fn batch_inserted(&mut self, collection: &str, batch_size: usize, total: u64) {
        let _ = (collection, batch_size, total);
    }
}

impl ProgressObserver for () {}
