//! Core types: field maps, templates, batches and HITs.

use crate::error::{HitError, HitResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

/// Form-submission artifact that must never reach stored answers.
pub const CSRF_FIELD: &str = "csrfmiddlewaretoken";

/// Ordered mapping from field name to string value.
///
/// Used for both a HIT's input fields (one CSV row) and its submitted
/// answers. Keys iterate in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, String>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a field map from a JSON object, rejecting non-string values.
    pub fn from_json(value: &Value) -> HitResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| HitError::invalid_field("<root>", "expected a JSON object"))?;

        let mut fields = Self::new();
        for (key, value) in object {
            match value {
                Value::String(s) => {
                    fields.insert(key.clone(), s.clone());
                }
                other => {
                    return Err(HitError::invalid_field(
                        key,
                        format!("expected a string, got {}", other),
                    ));
                }
            }
        }
        Ok(fields)
    }

    /// Parse a field map from JSON text.
    pub fn from_json_str(text: &str) -> HitResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    pub fn to_json_string(&self) -> HitResult<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for FieldMap {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Strip submission artifacts from a freshly submitted answer map.
///
/// Called once, where answers are accepted; stored answers are never
/// re-filtered.
pub fn accept_answers(mut answers: FieldMap) -> FieldMap {
    answers.remove(CSRF_FIELD);
    answers
}

/// A reusable HTML form with `${field}` substitution tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,
    pub name: String,
    /// File the form was loaded from.
    pub filename: String,
    pub form: String,
    /// Sorted token names extracted from `form` when it was last written.
    pub fieldnames: Vec<String>,
    pub date_modified: i64,
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HIT Template: {}", self.name)
    }
}

/// HITs created from one CSV upload against one template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: i64,
    pub template_id: i64,
    pub name: String,
    /// Name of the uploaded CSV file.
    pub filename: String,
    pub date_published: i64,
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HIT Batch: {}", self.name)
    }
}

/// Completion counts for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub total: usize,
    pub completed: usize,
}

impl BatchProgress {
    pub fn remaining(&self) -> usize {
        self.total - self.completed
    }
}

/// A Human Intelligence Task: one CSV row awaiting (or holding) answers.
///
/// `input_fields` is fixed at creation. `answers` and `completed` change
/// exactly once, through [`Task::complete`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    id: i64,
    batch_id: i64,
    input_fields: FieldMap,
    answers: FieldMap,
    completed: bool,
}

impl Task {
    /// A new, open HIT.
    pub fn new(id: i64, batch_id: i64, input_fields: FieldMap) -> Self {
        Self {
            id,
            batch_id,
            input_fields,
            answers: FieldMap::new(),
            completed: false,
        }
    }

    /// Rebuild a HIT from stored state. Answers are taken as already accepted.
    pub fn restore(
        id: i64,
        batch_id: i64,
        input_fields: FieldMap,
        answers: FieldMap,
        completed: bool,
    ) -> Self {
        Self {
            id,
            batch_id,
            input_fields,
            answers,
            completed,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn batch_id(&self) -> i64 {
        self.batch_id
    }

    pub fn input_fields(&self) -> &FieldMap {
        &self.input_fields
    }

    pub fn answers(&self) -> &FieldMap {
        &self.answers
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Record a worker's answers and mark the HIT complete.
    ///
    /// Fails with [`HitError::DoubleCompletion`] if answers were already set.
    pub fn complete(&mut self, answers: FieldMap) -> HitResult<()> {
        if self.completed {
            return Err(HitError::DoubleCompletion { task_id: self.id });
        }
        self.answers = accept_answers(answers);
        self.completed = true;
        Ok(())
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HIT id:{}", self.id)
    }
}
