//! HIT lookup, completion and rendering.

use super::templates::get_template_internal;
use super::{Database, json_column, now_ms};
use crate::error::{HitError, HitResult};
use crate::form::render_form;
use crate::types::{FieldMap, Task};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{info, warn};

pub fn parse_hit_row(row: &Row) -> rusqlite::Result<Task> {
    let completed: bool = row.get("completed")?;
    Ok(Task::restore(
        row.get("id")?,
        row.get("batch_id")?,
        json_column::<FieldMap>(row, "input_fields")?,
        json_column::<FieldMap>(row, "answers")?,
        completed,
    ))
}

/// Internal helper to get a HIT using an existing connection (avoids deadlock).
pub(crate) fn get_hit_internal(conn: &Connection, task_id: i64) -> HitResult<Option<Task>> {
    let task = conn
        .query_row(
            "SELECT * FROM hits WHERE id = ?1",
            params![task_id],
            parse_hit_row,
        )
        .optional()?;
    Ok(task)
}

impl Database {
    pub fn get_task(&self, task_id: i64) -> HitResult<Option<Task>> {
        self.with_conn(|conn| get_hit_internal(conn, task_id))
    }

    /// Store a worker's answers and mark the HIT complete, exactly once.
    ///
    /// The submission token is stripped before storing. A second submission
    /// for the same HIT fails with [`HitError::DoubleCompletion`] and leaves
    /// the first answers untouched.
    pub fn complete_task(&self, task_id: i64, answers: FieldMap) -> HitResult<Task> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let mut task = get_hit_internal(&tx, task_id)?.ok_or(HitError::TaskNotFound(task_id))?;
            if let Err(err) = task.complete(answers) {
                warn!(task_id, "Rejected answers for an already completed HIT");
                return Err(err);
            }

            let answers_json = task.answers().to_json_string()?;
            let updated = tx.execute(
                "UPDATE hits SET completed = 1, answers = ?1, completed_at = ?2
                 WHERE id = ?3 AND completed = 0",
                params![answers_json, now_ms(), task_id],
            )?;
            if updated == 0 {
                return Err(HitError::DoubleCompletion { task_id });
            }

            tx.commit()?;
            info!(task_id, answers = task.answers().len(), "HIT completed");
            Ok(task)
        })
    }

    /// Render a HIT with its batch's current template form.
    pub fn render_task(&self, task_id: i64) -> HitResult<String> {
        self.with_conn(|conn| {
            let task = get_hit_internal(conn, task_id)?.ok_or(HitError::TaskNotFound(task_id))?;
            let template_id: i64 = conn.query_row(
                "SELECT template_id FROM batches WHERE id = ?1",
                params![task.batch_id()],
                |row| row.get(0),
            )?;
            let template = get_template_internal(conn, template_id)?
                .ok_or(HitError::TemplateNotFound(template_id))?;
            Ok(render_form(&template.form, task.input_fields()))
        })
    }
}
