//! Template storage.
//!
//! `fieldnames` is never edited directly: every write of the form text
//! re-runs token extraction and stores the result alongside it.

use super::{Database, json_column, now_ms};
use crate::error::{HitError, HitResult};
use crate::form::extract_fieldnames;
use crate::types::Template;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

pub fn parse_template_row(row: &Row) -> rusqlite::Result<Template> {
    Ok(Template {
        id: row.get("id")?,
        name: row.get("name")?,
        filename: row.get("filename")?,
        form: row.get("form")?,
        fieldnames: json_column(row, "fieldnames")?,
        date_modified: row.get("date_modified")?,
    })
}

/// Extract and serialize the field names of a form.
fn fieldnames_json(form: &str) -> HitResult<(Vec<String>, String)> {
    let fieldnames: Vec<String> = extract_fieldnames(form).into_iter().collect();
    let json = serde_json::to_string(&fieldnames)?;
    Ok((fieldnames, json))
}

pub(crate) fn get_template_internal(conn: &Connection, template_id: i64) -> HitResult<Option<Template>> {
    let template = conn
        .query_row(
            "SELECT * FROM templates WHERE id = ?1",
            params![template_id],
            parse_template_row,
        )
        .optional()?;
    Ok(template)
}

impl Database {
    /// Store a new template.
    pub fn create_template(&self, name: &str, filename: &str, form: &str) -> HitResult<Template> {
        let (fieldnames, fieldnames_json) = fieldnames_json(form)?;
        let now = now_ms();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO templates (name, filename, form, fieldnames, date_modified)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, filename, form, fieldnames_json, now],
            )?;
            let id = conn.last_insert_rowid();
            debug!(template_id = id, fields = fieldnames.len(), "Template created");

            Ok(Template {
                id,
                name: name.to_string(),
                filename: filename.to_string(),
                form: form.to_string(),
                fieldnames,
                date_modified: now,
            })
        })
    }

    /// Replace a template's form text, recomputing its field names.
    ///
    /// HITs already created keep their raw input fields; they pick up the
    /// new form the next time they are rendered.
    pub fn update_template_form(&self, template_id: i64, form: &str) -> HitResult<Template> {
        let (_, fieldnames_json) = fieldnames_json(form)?;
        let now = now_ms();

        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE templates SET form = ?1, fieldnames = ?2, date_modified = ?3 WHERE id = ?4",
                params![form, fieldnames_json, now, template_id],
            )?;
            if updated == 0 {
                return Err(HitError::TemplateNotFound(template_id));
            }
            get_template_internal(conn, template_id)?.ok_or(HitError::TemplateNotFound(template_id))
        })
    }

    pub fn get_template(&self, template_id: i64) -> HitResult<Option<Template>> {
        self.with_conn(|conn| get_template_internal(conn, template_id))
    }

    /// All templates, oldest first.
    pub fn list_templates(&self) -> HitResult<Vec<Template>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM templates ORDER BY id")?;
            let templates = stmt
                .query_map([], parse_template_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(templates)
        })
    }
}
