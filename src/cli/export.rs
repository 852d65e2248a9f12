//! Export subcommands
//!
//! Writes completed HIT results as CSV. HITs with different column sets
//! are written as consecutive tables, each with its own header row.

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum ExportCommand {
    /// Export completed HITs of one batch (newest first)
    Batch {
        /// Batch ID
        id: i64,

        #[command(flatten)]
        args: ExportArgs,
    },

    /// Export completed HITs of every batch using a template
    Template {
        /// Template ID
        id: i64,

        #[command(flatten)]
        args: ExportArgs,
    },
}

/// Output options shared by both export targets
#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Output file path (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Force gzip compression (auto-detected from .gz extension otherwise)
    #[arg(long)]
    pub gzip: bool,

    /// Automatically compress if output exceeds this size
    ///
    /// Accepts human-readable sizes: 100KB, 1MB, etc.
    #[arg(long, value_name = "SIZE")]
    pub compress_threshold: Option<String>,

    /// Require a single column set; fail if there are no completed HITs
    /// or if they disagree on columns
    #[arg(long)]
    pub strict: bool,
}

impl ExportArgs {
    /// Parse the compress threshold into bytes
    pub fn compress_threshold_bytes(&self) -> Option<u64> {
        self.compress_threshold.as_ref().and_then(|s| parse_size(s))
    }

    /// Determine if output should be compressed based on args and filename
    pub fn should_compress(&self, output_size: Option<u64>) -> bool {
        if self.gzip {
            return true;
        }

        if let Some(ref path) = self.output
            && path.extension().is_some_and(|ext| ext == "gz")
        {
            return true;
        }

        if let (Some(threshold), Some(size)) = (self.compress_threshold_bytes(), output_size) {
            return size > threshold;
        }

        false
    }
}

/// Parse a human-readable size string into bytes
///
/// Supports: B, KB, MB, GB (case-insensitive)
pub fn parse_size(s: &str) -> Option<u64> {
    let s = s.trim().to_uppercase();

    let (num, scale) = if let Some(num) = s.strip_suffix("GB") {
        (num, 1024 * 1024 * 1024)
    } else if let Some(num) = s.strip_suffix("MB") {
        (num, 1024 * 1024)
    } else if let Some(num) = s.strip_suffix("KB") {
        (num, 1024)
    } else if let Some(num) = s.strip_suffix('B') {
        (num, 1)
    } else {
        (s.as_str(), 1)
    };

    num.trim().parse::<u64>().ok()?.checked_mul(scale)
}
