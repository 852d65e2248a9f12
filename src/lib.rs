//! HIT batch library
//!
//! Turns CSV uploads into batches of HITs, renders each HIT's form from
//! its row, and aggregates completed answers back into CSV.
//!
//! - [`form`] extracts `${field}` tokens and renders forms
//! - [`ingest`] reads CSV uploads into header-keyed rows
//! - [`results`] groups completed HITs by column set for export
//! - [`db`] stores templates, batches and HITs in SQLite

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod form;
pub mod ingest;
pub mod results;
pub mod types;
