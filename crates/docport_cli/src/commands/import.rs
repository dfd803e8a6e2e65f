//! Import command.

use super::Target;
use crate::csv_records;
use std::path::Path;
use tracing::{info, warn};

/// Parses `csv` and upserts every row into `collection`.
pub fn run(
    target: &Target,
    csv: &Path,
    collection: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = csv_records::parse_file(csv)?;
    info!(records = records.len(), file = %csv.display(), "parsed product records");

    let service = target.connect()?;
    let summary = service.import(collection, records);

    if summary.failed > 0 {
        warn!(failed = summary.failed, "some records could not be imported");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "✓ Imported {}/{} records into {}.{}",
            summary.succeeded(),
            summary.total(),
            target.database,
            collection
        );
        println!("  Inserted: {}", summary.inserted);
        println!("  Updated:  {}", summary.updated);
        println!("  Skipped:  {}", summary.skipped);
        println!("  Failed:   {}", summary.failed);
    }
    Ok(())
}
