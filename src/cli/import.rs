//! Batch subcommands, including CSV import.

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum BatchCommand {
    /// Create a batch of HITs from a CSV file (one HIT per data row)
    Create(BatchCreateArgs),

    /// List batches
    List {
        /// Only batches using this template
        #[arg(long)]
        template: Option<i64>,
    },

    /// Show completion progress for a batch
    Status {
        /// Batch ID
        id: i64,
    },
}

/// Arguments for `batch create`
#[derive(Args, Debug)]
pub struct BatchCreateArgs {
    /// Template the HITs are rendered with
    #[arg(long)]
    pub template: i64,

    /// CSV file; the first row is the header (.gz is decompressed)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Batch name (default: a generated name)
    #[arg(long)]
    pub name: Option<String>,

    /// Create at most this many HITs (overrides config)
    #[arg(long)]
    pub max_rows: Option<usize>,
}

impl BatchCreateArgs {
    /// Check if this is a gzipped file based on extension
    pub fn is_gzipped(&self) -> bool {
        self.file.extension().is_some_and(|ext| ext == "gz")
    }

    /// File name recorded on the batch, without the directory.
    pub fn upload_filename(&self) -> String {
        self.file
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
