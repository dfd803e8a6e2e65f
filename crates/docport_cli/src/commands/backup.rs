//! Backup command.

use super::Target;
use docport_codec::Format;
use docport_core::CoreError;
use std::path::Path;
use tracing::info;

/// Backs up `collection`, or every collection when `None`.
pub fn run(
    target: &Target,
    output_dir: &Path,
    format: Format,
    collection: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = target.connect()?;

    match collection {
        Some(name) => {
            info!(collection = name, %format, "starting backup");
            let path = service.backup_one(name, output_dir, format, &mut ())?;
            println!("✓ Backup completed");
            println!("  File: {}", path.display());
        }
        None => {
            info!(database = %target.database, %format, "starting backup of all collections");
            match service.backup_all(output_dir, format, &mut ()) {
                Ok(files) => {
                    println!("✓ Backup completed: {} files", files.len());
                    for file in files {
                        println!("  - {}", file.display());
                    }
                }
                Err(CoreError::BackupAborted {
                    collection,
                    completed,
                    source,
                }) => {
                    if !completed.is_empty() {
                        println!("Completed before the failure:");
                        for file in &completed {
                            println!("  - {}", file.display());
                        }
                    }
                    return Err(format!("failed to back up collection {collection}: {source}").into());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}
