//! Engine configuration.

/// Tuning knobs for the backup, restore and import pipelines.
///
/// None of these change what ends up in an artifact or a collection; they
/// only trade memory for round trips and set how chatty progress is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Documents per bulk insert during restore.
    pub batch_size: usize,

    /// Bytes requested from the source per read during restore.
    pub chunk_size: usize,

    /// Dump progress is reported every this many documents.
    pub progress_interval: u64,

    /// Import progress is logged every this many reconciled records.
    pub import_progress_interval: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            chunk_size: 4096,
            progress_interval: 1000,
            import_progress_interval: 100,
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the restore batch size (at least 1).
    #[must_use]
    pub const fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = if size == 0 { 1 } else { size };
        self
    }

    /// Sets the restore read size (at least 1).
    #[must_use]
    pub const fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = if size == 0 { 1 } else { size };
        self
    }

    /// Sets the dump progress cadence (at least 1).
    #[must_use]
    pub const fn progress_interval(mut self, every: u64) -> Self {
        self.progress_interval = if every == 0 { 1 } else { every };
        self
    }

    /// Sets the import progress cadence (at least 1).
    #[must_use]
    pub const fn import_progress_interval(mut self, every: u64) -> Self {
        self.import_progress_interval = if every == 0 { 1 } else { every };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.progress_interval, 1000);
        assert_eq!(config.import_progress_interval, 100);
    }

    #[test]
    fn builder_pattern() {
        let config = EngineConfig::new().batch_size(10).chunk_size(1).progress_interval(5);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.progress_interval, 5);
    }

    #[test]
    fn zero_is_clamped() {
        let config = EngineConfig::new()
            .batch_size(0)
            .chunk_size(0)
            .progress_interval(0)
            .import_progress_interval(0);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.progress_interval, 1);
        assert_eq!(config.import_progress_interval, 1);
    }
}
