//! CLI command implementations.

pub mod backup;
pub mod collections;
pub mod import;
pub mod restore;

use docport_core::{BackupService, EngineConfig};
use docport_store::MongoStore;
use tracing::info;

/// Where commands connect.
pub struct Target {
    /// Connection URI.
    pub uri: String,
    /// Database name.
    pub database: String,
}

impl Target {
    /// Connects and wraps the store in a backup service.
    pub fn connect(&self) -> Result<BackupService<MongoStore>, Box<dyn std::error::Error>> {
        info!(database = %self.database, "connecting to MongoDB");
        let store = MongoStore::connect(&self.uri, &self.database)
            .map_err(|e| format!("failed to connect to MongoDB: {e}"))?;
        Ok(BackupService::new(store, EngineConfig::default()))
    }
}
