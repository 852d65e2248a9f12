//! CLI command definitions for hit-batch
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod export;
pub mod import;
pub mod task;
pub mod template;

use clap::{Parser, Subcommand};
use export::ExportCommand;
use import::BatchCommand;
use task::TaskCommand;
use template::TemplateCommand;

/// HIT batch manager: load forms, import CSV batches, export results
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage HIT templates (HTML forms with ${field} tokens)
    #[command(subcommand)]
    Template(TemplateCommand),

    /// Create and inspect batches of HITs
    #[command(subcommand)]
    Batch(BatchCommand),

    /// Render, hand out, and complete individual HITs
    #[command(subcommand)]
    Task(TaskCommand),

    /// Export completed HIT results as CSV
    #[command(subcommand)]
    Export(ExportCommand),
}
