//! Result aggregation: completed HITs to column-ordered CSV tables.
//!
//! Every completed HIT induces an output schema, the sorted list of its
//! namespaced column names (`Input.<k>` for each input field,
//! `Answer.<k>` for each answer). HITs are grouped by identical schema and
//! each group becomes its own table with its own header row, so HITs with
//! different answer sets are never forced into one blank-filled table.

use crate::error::{HitError, HitResult};
use crate::types::Task;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

pub const INPUT_PREFIX: &str = "Input.";
pub const ANSWER_PREFIX: &str = "Answer.";

/// One output row: column name to cell value. Absent columns are absent.
pub type OutputRow = BTreeMap<String, String>;

/// Sorted, namespaced column names induced by one HIT.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct OutputSchema(Vec<String>);

impl OutputSchema {
    pub fn columns(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The output schema of a HIT.
pub fn output_schema(task: &Task) -> OutputSchema {
    let mut columns: Vec<String> = task
        .input_fields()
        .keys()
        .map(|k| format!("{INPUT_PREFIX}{k}"))
        .chain(task.answers().keys().map(|k| format!("{ANSWER_PREFIX}{k}")))
        .collect();
    columns.sort();
    OutputSchema(columns)
}

/// Merge a HIT's input fields and answers into one namespaced row.
pub fn output_row(task: &Task) -> OutputRow {
    let mut row = OutputRow::new();
    for (k, v) in task.input_fields().iter() {
        row.insert(format!("{INPUT_PREFIX}{k}"), v.to_string());
    }
    for (k, v) in task.answers().iter() {
        row.insert(format!("{ANSWER_PREFIX}{k}"), v.to_string());
    }
    row
}

/// A header plus the rows written under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultTable {
    pub fieldnames: OutputSchema,
    pub rows: Vec<OutputRow>,
}

impl ResultTable {
    /// Build a single table, requiring exactly one schema among the
    /// completed HITs.
    ///
    /// Fails with [`HitError::SchemaInference`] when there is nothing to
    /// infer columns from, or when the HITs disagree on columns.
    pub fn infer<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> HitResult<Self> {
        let mut tables = aggregate(tasks);
        match tables.len() {
            1 => Ok(tables.remove(0)),
            0 => Err(HitError::schema_inference(
                "no completed HITs to take columns from",
            )),
            n => Err(HitError::schema_inference(format!(
                "completed HITs span {} different column sets",
                n
            ))),
        }
    }

    /// Write the header row followed by every data row.
    ///
    /// A column missing from a row is written as an empty cell.
    pub fn write_to<W: Write>(&self, writer: &mut csv::Writer<W>) -> HitResult<()> {
        let columns = self.fieldnames.columns();
        writer.write_record(columns)?;
        for row in &self.rows {
            writer.write_record(
                columns
                    .iter()
                    .map(|c| row.get(c).map(String::as_str).unwrap_or("")),
            )?;
        }
        Ok(())
    }
}

/// Group completed HITs by output schema.
///
/// Open HITs are ignored. Tables come back ordered by schema; rows inside
/// a table keep the order of `tasks`. No completed HITs means no tables.
pub fn aggregate<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Vec<ResultTable> {
    let mut groups: BTreeMap<OutputSchema, Vec<OutputRow>> = BTreeMap::new();
    for task in tasks.into_iter().filter(|t| t.is_completed()) {
        groups
            .entry(output_schema(task))
            .or_default()
            .push(output_row(task));
    }

    groups
        .into_iter()
        .map(|(fieldnames, rows)| ResultTable { fieldnames, rows })
        .collect()
}

/// Write tables back to back, each starting with its own header row.
///
/// Returns the underlying writer so compressed sinks can be finished.
pub fn write_csv<W: Write>(tables: &[ResultTable], out: W) -> HitResult<W> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(out);
    for table in tables {
        table.write_to(&mut writer)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|err| HitError::Io(err.into_error()))
}
