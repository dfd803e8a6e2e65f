//! docport CLI
//!
//! Command-line backup, restore and CSV import for MongoDB.
//!
//! # Commands
//!
//! - `import` - Upsert CSV rows into a collection, keeping extra fields
//! - `backup` - Dump one or all collections to BSON or JSON-lines files
//! - `restore` - Load a backup file into a collection
//! - `collections` - List collections in the database

mod commands;
mod csv_records;

use clap::{Parser, Subcommand, ValueEnum};
use docport_codec::Format;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// MongoDB backup, restore and CSV import.
#[derive(Parser)]
#[command(name = "docport")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// MongoDB connection URI
    #[arg(
        global = true,
        short = 'u',
        long,
        env = "DB_URI",
        default_value = "mongodb://localhost:27017"
    )]
    db_uri: String,

    /// Database name
    #[arg(global = true, short, long, env = "DB_NAME", default_value = "csvprocessor")]
    database: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// How command results are printed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Output {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Import CSV rows, matching existing documents by Number
    Import {
        /// CSV file to import
        #[arg(short, long)]
        csv: PathBuf,

        /// Collection name
        #[arg(short = 't', long, env = "DB_COLLECTION", default_value = "records")]
        collection: String,

        /// Summary format
        #[arg(long, value_enum, default_value_t = Output::Text)]
        output: Output,
    },

    /// Back up one collection, or every collection
    Backup {
        /// Output directory for backup files
        #[arg(short, long, default_value = "./backups")]
        output: PathBuf,

        /// Backup format: bson or json
        #[arg(short, long, default_value_t = Format::Bson)]
        format: Format,

        /// Collection to back up (all collections if omitted)
        #[arg(short, long)]
        collection: Option<String>,
    },

    /// Restore a collection from a backup file
    Restore {
        /// Backup file to restore
        #[arg(short, long)]
        input: PathBuf,

        /// Backup format (detected from the extension if omitted)
        #[arg(short, long)]
        format: Option<Format>,

        /// Target collection (taken from the file name if omitted)
        #[arg(short, long)]
        collection: Option<String>,

        /// Drop the collection before restoring
        #[arg(long)]
        drop: bool,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// List collections in the database
    Collections {
        /// Listing format
        #[arg(long, value_enum, default_value_t = Output::Text)]
        output: Output,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let target = commands::Target {
        uri: cli.db_uri,
        database: cli.database,
    };

    match cli.command {
        Commands::Import {
            csv,
            collection,
            output,
        } => {
            commands::import::run(&target, &csv, &collection, output == Output::Json)?;
        }
        Commands::Backup {
            output,
            format,
            collection,
        } => {
            commands::backup::run(&target, &output, format, collection.as_deref())?;
        }
        Commands::Restore {
            input,
            format,
            collection,
            drop,
            yes,
        } => {
            let request = commands::restore::Request {
                input,
                format,
                collection,
                drop_existing: drop,
                assume_yes: yes,
            };
            commands::restore::run(&target, request)?;
        }
        Commands::Collections { output } => {
            commands::collections::run(&target, output == Output::Json)?;
        }
    }

    Ok(())
}
