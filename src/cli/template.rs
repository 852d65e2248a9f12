//! Template subcommands.

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    /// Load an HTML form file as a new template
    Add(TemplateAddArgs),

    /// Replace a template's form with the contents of a file
    Update(TemplateUpdateArgs),

    /// Show a template and the field names it expects
    Show {
        /// Template ID
        id: i64,
    },

    /// List all templates
    List,
}

#[derive(Args, Debug)]
pub struct TemplateAddArgs {
    /// HTML form file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Template name (default: file stem)
    #[arg(long)]
    pub name: Option<String>,
}

impl TemplateAddArgs {
    /// Name to store: explicit, else the file stem.
    pub fn template_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "template".to_string())
        })
    }
}

#[derive(Args, Debug)]
pub struct TemplateUpdateArgs {
    /// Template ID
    pub id: i64,

    /// HTML form file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}
