//! Result export queries.
//!
//! Row order follows the source of the rows:
//! - batch export: that batch's completed HITs, newest first
//! - template export: each batch in publication order, and within each
//!   batch its completed HITs newest first

use super::Database;
use crate::error::{HitError, HitResult};
use crate::results::{ResultTable, aggregate};
use crate::types::Task;
use tracing::debug;

impl Database {
    /// Completed HITs of a batch, in export order.
    pub fn batch_export_tasks(&self, batch_id: i64) -> HitResult<Vec<Task>> {
        if self.get_batch(batch_id)?.is_none() {
            return Err(HitError::BatchNotFound(batch_id));
        }
        self.finished_tasks(batch_id)
    }

    /// Completed HITs across every batch of a template, in export order.
    pub fn template_export_tasks(&self, template_id: i64) -> HitResult<Vec<Task>> {
        if self.get_template(template_id)?.is_none() {
            return Err(HitError::TemplateNotFound(template_id));
        }

        let mut tasks = Vec::new();
        for batch in self.list_batches(Some(template_id))? {
            tasks.extend(self.finished_tasks(batch.id)?);
        }
        Ok(tasks)
    }

    /// Result tables for one batch, one per distinct column set.
    pub fn batch_results(&self, batch_id: i64) -> HitResult<Vec<ResultTable>> {
        let tasks = self.batch_export_tasks(batch_id)?;
        let tables = aggregate(&tasks);
        debug!(batch_id, hits = tasks.len(), tables = tables.len(), "Aggregated batch results");
        Ok(tables)
    }

    /// Result tables for every batch of a template.
    pub fn template_results(&self, template_id: i64) -> HitResult<Vec<ResultTable>> {
        let tasks = self.template_export_tasks(template_id)?;
        let tables = aggregate(&tasks);
        debug!(template_id, hits = tasks.len(), tables = tables.len(), "Aggregated template results");
        Ok(tables)
    }
}
