//! HIT subcommands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Print the rendered HTML form for a HIT
    Render {
        /// HIT ID
        id: i64,
    },

    /// Show the oldest open HIT in a batch
    Next {
        /// Batch ID
        #[arg(long)]
        batch: i64,
    },

    /// Submit answers for a HIT and mark it complete
    Submit(SubmitArgs),
}

/// Arguments for `task submit`
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// HIT ID
    pub id: i64,

    /// Answers as a JSON object of strings, or @FILE to read one
    #[arg(long, value_name = "JSON|@FILE")]
    pub answers: String,
}

impl SubmitArgs {
    /// The raw JSON text of the answers, reading the file for `@FILE`.
    pub fn answers_json(&self) -> Result<String> {
        match self.answers.strip_prefix('@') {
            Some(path) => {
                let path = PathBuf::from(path);
                std::fs::read_to_string(&path)
                    .with_context(|| format!("reading answers from {}", path.display()))
            }
            None => Ok(self.answers.clone()),
        }
    }
}
