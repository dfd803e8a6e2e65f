//! Restore command.

use super::Target;
use docport_codec::Format;
use docport_core::{collection_from_artifact_name, validate_artifact};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Arguments of one restore.
pub struct Request {
    /// Backup file.
    pub input: PathBuf,
    /// Explicit format, else detected from the extension.
    pub format: Option<Format>,
    /// Explicit target, else derived from the file name.
    pub collection: Option<String>,
    /// Drop the target first.
    pub drop_existing: bool,
    /// Skip the confirmation prompt.
    pub assume_yes: bool,
}

/// Resolves the format of `input`.
fn resolve_format(input: &Path, explicit: Option<Format>) -> Result<Format, String> {
    explicit.or_else(|| Format::from_path(input)).ok_or_else(|| {
        let ext = input
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        format!("cannot auto-detect format from extension '{ext}'. Please specify --format")
    })
}

/// Resolves the target collection of `input`.
fn resolve_collection(input: &Path, explicit: Option<String>) -> Result<String, String> {
    explicit
        .or_else(|| collection_from_artifact_name(input))
        .ok_or_else(|| {
            "cannot determine target collection name. Please specify --collection".to_string()
        })
}

fn confirm(message: &str, input: &mut impl BufRead) -> bool {
    print!("{message} (y/N): ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut response = String::new();
    if input.read_line(&mut response).is_err() {
        return false;
    }
    matches!(response.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Restores one backup file.
pub fn run(target: &Target, request: Request) -> Result<(), Box<dyn std::error::Error>> {
    let input = request.input;
    if !input.exists() {
        return Err(format!("backup file does not exist: {}", input.display()).into());
    }
    let format = resolve_format(&input, request.format)?;
    let collection = resolve_collection(&input, request.collection)?;

    if !request.assume_yes {
        println!("About to restore:");
        println!("  Source file: {}", input.display());
        println!("  Target database: {}", target.database);
        println!("  Target collection: {collection}");
        println!("  Format: {format}");
        if request.drop_existing {
            println!("  WARNING: Existing collection will be DROPPED!");
        }
        if !confirm("Do you want to continue?", &mut io::stdin().lock()) {
            println!("Restore cancelled");
            return Ok(());
        }
    }

    let service = target.connect()?;
    validate_artifact(&input, format)?;

    info!(collection = %collection, path = %input.display(), "starting restore");
    let restored =
        service.restore_one(&collection, &input, format, request.drop_existing, &mut ())?;

    println!("✓ Restore completed");
    println!("  Collection: {collection}");
    println!("  Documents: {restored}");
    Ok(())
}
