//! Batch creation from CSV uploads, and batch-level HIT queries.

use super::hits::parse_hit_row;
use super::templates::get_template_internal;
use super::{Database, now_ms};
use crate::error::{HitError, HitResult};
use crate::ingest::{CsvRecords, zip_shortest};
use crate::types::{Batch, BatchProgress, Task};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use std::io::Read;
use tracing::{info, warn};

/// Options for a CSV import.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Batch name. A readable random name is generated when absent.
    pub name: Option<String>,
    /// Name of the uploaded file, recorded on the batch.
    pub filename: String,
    /// Stop after this many HITs; remaining rows are ignored.
    pub max_rows: Option<usize>,
}

impl ImportOptions {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }

    /// Set the batch name (builder pattern).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Cap the number of HITs created (builder pattern).
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }
}

/// Outcome of a CSV import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub batch: Batch,
    /// CSV header, in file order.
    pub header: Vec<String>,
    pub hits_created: usize,
    /// Rows skipped because every cell was empty. Empty lines are dropped
    /// by the reader and not counted.
    pub blank_rows_skipped: usize,
    /// True if `max_rows` stopped the import before the end of the file.
    pub truncated: bool,
}

pub fn parse_batch_row(row: &Row) -> rusqlite::Result<Batch> {
    Ok(Batch {
        id: row.get("id")?,
        template_id: row.get("template_id")?,
        name: row.get("name")?,
        filename: row.get("filename")?,
        date_published: row.get("date_published")?,
    })
}

/// Generate a readable batch name.
fn generate_batch_name() -> String {
    use petname::{Generator, Petnames};

    Petnames::medium()
        .generate_one(2, "-")
        .unwrap_or_else(|| format!("batch-{}", now_ms()))
}

fn get_batch_internal(conn: &Connection, batch_id: i64) -> HitResult<Option<Batch>> {
    let batch = conn
        .query_row(
            "SELECT * FROM batches WHERE id = ?1",
            params![batch_id],
            parse_batch_row,
        )
        .optional()?;
    Ok(batch)
}

fn query_hits(conn: &Connection, sql: &str, batch_id: i64) -> HitResult<Vec<Task>> {
    let mut stmt = conn.prepare(sql)?;
    let hits = stmt
        .query_map(params![batch_id], parse_hit_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(hits)
}

impl Database {
    /// Create a batch with one HIT per non-blank CSV data row.
    ///
    /// Runs in a single transaction: if the stream fails to decode at any
    /// point, nothing is stored, not even the batch.
    pub fn create_batch_from_csv<R: Read>(
        &self,
        template_id: i64,
        reader: R,
        options: &ImportOptions,
    ) -> HitResult<ImportResult> {
        let mut records = CsvRecords::parse(reader)?;
        let header = records.header().to_vec();
        let name = options.name.clone().unwrap_or_else(generate_batch_name);
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if get_template_internal(&tx, template_id)?.is_none() {
                return Err(HitError::TemplateNotFound(template_id));
            }

            tx.execute(
                "INSERT INTO batches (template_id, name, filename, date_published)
                 VALUES (?1, ?2, ?3, ?4)",
                params![template_id, name, options.filename, now],
            )?;
            let batch_id = tx.last_insert_rowid();

            let mut hits_created = 0;
            let mut truncated = false;
            {
                let mut insert =
                    tx.prepare("INSERT INTO hits (batch_id, input_fields) VALUES (?1, ?2)")?;
                for row in records.by_ref() {
                    let row = row?;
                    if options.max_rows.is_some_and(|max| hits_created >= max) {
                        truncated = true;
                        break;
                    }
                    let input_fields = zip_shortest(&header, &row).to_json_string()?;
                    insert.execute(params![batch_id, input_fields])?;
                    hits_created += 1;
                }
            }

            tx.commit()?;

            if truncated {
                warn!(batch_id, max_rows = ?options.max_rows, "Row cap reached; remaining CSV rows ignored");
            }
            info!(batch_id, count = hits_created, "{} HITs created", hits_created);

            Ok(ImportResult {
                batch: Batch {
                    id: batch_id,
                    template_id,
                    name: name.clone(),
                    filename: options.filename.clone(),
                    date_published: now,
                },
                header: header.clone(),
                hits_created,
                blank_rows_skipped: records.blank_rows(),
                truncated,
            })
        })
    }

    pub fn get_batch(&self, batch_id: i64) -> HitResult<Option<Batch>> {
        self.with_conn(|conn| get_batch_internal(conn, batch_id))
    }

    /// Batches in publication order, optionally limited to one template.
    pub fn list_batches(&self, template_id: Option<i64>) -> HitResult<Vec<Batch>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM batches WHERE ?1 IS NULL OR template_id = ?1 ORDER BY id",
            )?;
            let batches = stmt
                .query_map(params![template_id], parse_batch_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(batches)
        })
    }

    /// Completed HITs of a batch, most recently created first.
    pub fn finished_tasks(&self, batch_id: i64) -> HitResult<Vec<Task>> {
        self.with_conn(|conn| {
            query_hits(
                conn,
                "SELECT * FROM hits WHERE batch_id = ?1 AND completed = 1 ORDER BY id DESC",
                batch_id,
            )
        })
    }

    /// Open HITs of a batch, oldest first.
    pub fn unfinished_tasks(&self, batch_id: i64) -> HitResult<Vec<Task>> {
        self.with_conn(|conn| {
            query_hits(
                conn,
                "SELECT * FROM hits WHERE batch_id = ?1 AND completed = 0 ORDER BY id",
                batch_id,
            )
        })
    }

    /// The oldest open HIT of a batch, if any remain.
    pub fn next_unfinished_task(&self, batch_id: i64) -> HitResult<Option<Task>> {
        self.with_conn(|conn| {
            let task = conn
                .query_row(
                    "SELECT * FROM hits WHERE batch_id = ?1 AND completed = 0 ORDER BY id LIMIT 1",
                    params![batch_id],
                    parse_hit_row,
                )
                .optional()?;
            Ok(task)
        })
    }

    /// Total and completed HIT counts for a batch.
    pub fn batch_progress(&self, batch_id: i64) -> HitResult<BatchProgress> {
        self.with_conn(|conn| {
            if get_batch_internal(conn, batch_id)?.is_none() {
                return Err(HitError::BatchNotFound(batch_id));
            }
            let (total, completed): (i64, i64) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM hits WHERE batch_id = ?1",
                params![batch_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(BatchProgress {
                total: total as usize,
                completed: completed as usize,
            })
        })
    }
}
