//! Integration tests for the database layer.
//!
//! These tests exercise template storage, CSV batch import, HIT completion
//! and result export against an in-memory SQLite database.

use hit_batch::db::Database;
use hit_batch::db::batches::ImportOptions;
use hit_batch::error::{ErrorCode, HitError};
use hit_batch::types::{CSRF_FIELD, FieldMap, Template};

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn fields(pairs: &[(&str, &str)]) -> FieldMap {
    pairs.iter().copied().collect()
}

fn add_template(db: &Database, form: &str) -> Template {
    db.create_template("greeting", "greeting.html", form)
        .expect("Failed to create template")
}

/// Import `csv` as a new batch and return the batch id.
fn import(db: &Database, template_id: i64, csv: &str) -> i64 {
    db.create_batch_from_csv(template_id, csv.as_bytes(), &ImportOptions::new("upload.csv"))
        .expect("Failed to import CSV")
        .batch
        .id
}

mod template_tests {
    use super::*;

    #[test]
    fn create_template_extracts_sorted_fieldnames() {
        let db = setup_db();

        let template = add_template(&db, "<p>${name} is ${age}, ${name} again, $name, ${}</p>");

        assert_eq!(template.fieldnames, vec!["age", "name"]);
        assert_eq!(template.filename, "greeting.html");
        assert!(template.date_modified > 0);

        let stored = db.get_template(template.id).unwrap().unwrap();
        assert_eq!(stored.fieldnames, template.fieldnames);
        assert_eq!(stored.form, template.form);
    }

    #[test]
    fn update_template_form_recomputes_fieldnames() {
        let db = setup_db();
        let template = add_template(&db, "${foo}");

        let updated = db
            .update_template_form(template.id, "${bar} and ${baz}")
            .expect("Failed to update template");

        assert_eq!(updated.fieldnames, vec!["bar", "baz"]);
        assert_eq!(updated.form, "${bar} and ${baz}");
        assert_eq!(db.get_template(template.id).unwrap().unwrap().fieldnames, vec!["bar", "baz"]);
    }

    #[test]
    fn update_missing_template_fails() {
        let db = setup_db();

        let err = db.update_template_form(42, "${x}").unwrap_err();

        assert!(matches!(err, HitError::TemplateNotFound(42)));
        assert_eq!(err.code(), ErrorCode::TemplateNotFound);
    }

    #[test]
    fn list_templates_in_creation_order() {
        let db = setup_db();
        let first = db.create_template("a", "a.html", "${a}").unwrap();
        let second = db.create_template("b", "b.html", "${b}").unwrap();

        let ids: Vec<i64> = db.list_templates().unwrap().iter().map(|t| t.id).collect();

        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[test]
    fn template_display() {
        let db = setup_db();
        let template = add_template(&db, "${x}");

        assert_eq!(template.to_string(), "HIT Template: greeting");
    }
}

mod batch_tests {
    use super::*;

    #[test]
    fn import_creates_one_hit_per_data_row() {
        let db = setup_db();
        let template = add_template(&db, "${foo} ${bar}");

        let result = db
            .create_batch_from_csv(
                template.id,
                "foo,bar\n1,2\n3,4\n".as_bytes(),
                &ImportOptions::new("upload.csv").with_name("first"),
            )
            .expect("Failed to import CSV");

        assert_eq!(result.hits_created, 2);
        assert_eq!(result.header, vec!["foo", "bar"]);
        assert_eq!(result.batch.name, "first");
        assert_eq!(result.batch.filename, "upload.csv");
        assert_eq!(result.batch.to_string(), "HIT Batch: first");
        assert!(!result.truncated);

        let open = db.unfinished_tasks(result.batch.id).unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(open[0].input_fields(), &fields(&[("foo", "1"), ("bar", "2")]));
        assert_eq!(open[1].input_fields(), &fields(&[("foo", "3"), ("bar", "4")]));
        assert!(open.iter().all(|t| !t.is_completed() && t.answers().is_empty()));
    }

    #[test]
    fn import_skips_blank_rows() {
        let db = setup_db();
        let template = add_template(&db, "${foo}");

        let result = db
            .create_batch_from_csv(
                template.id,
                "foo,bar\n1,2\n,\n\n3,4\n".as_bytes(),
                &ImportOptions::new("upload.csv"),
            )
            .unwrap();

        assert_eq!(result.hits_created, 2);
        assert_eq!(result.blank_rows_skipped, 1);
        assert_eq!(db.batch_progress(result.batch.id).unwrap().total, 2);
    }

    #[test]
    fn import_generates_batch_name_when_absent() {
        let db = setup_db();
        let template = add_template(&db, "${foo}");

        let batch_id = import(&db, template.id, "foo\n1\n");
        let batch = db.get_batch(batch_id).unwrap().unwrap();

        assert!(!batch.name.is_empty());
        assert_eq!(batch.template_id, template.id);
    }

    #[test]
    fn import_keeps_short_rows_without_trailing_keys() {
        let db = setup_db();
        let template = add_template(&db, "${a}${b}${c}");

        let batch_id = import(&db, template.id, "a,b,c\n1,2\n4,5,6,7\n");
        let open = db.unfinished_tasks(batch_id).unwrap();

        assert_eq!(open.len(), 2);
        assert_eq!(open[0].input_fields(), &fields(&[("a", "1"), ("b", "2")]));
        assert_eq!(
            open[1].input_fields(),
            &fields(&[("a", "4"), ("b", "5"), ("c", "6")])
        );
    }

    #[test]
    fn import_of_empty_csv_creates_no_hits() {
        let db = setup_db();
        let template = add_template(&db, "${foo}");

        let result = db
            .create_batch_from_csv(template.id, "".as_bytes(), &ImportOptions::new("empty.csv"))
            .unwrap();

        assert_eq!(result.hits_created, 0);
        assert!(result.header.is_empty());
        assert!(db.unfinished_tasks(result.batch.id).unwrap().is_empty());
    }

    #[test]
    fn import_with_invalid_utf8_stores_nothing() {
        let db = setup_db();
        let template = add_template(&db, "${foo}");

        let mut bytes = b"foo,bar\n1,2\n3,".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b"\n5,6\n");

        let err = db
            .create_batch_from_csv(template.id, bytes.as_slice(), &ImportOptions::new("bad.csv"))
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::DecodeError);
        assert!(db.list_batches(None).unwrap().is_empty());
    }

    #[test]
    fn import_respects_row_cap() {
        let db = setup_db();
        let template = add_template(&db, "${n}");

        let result = db
            .create_batch_from_csv(
                template.id,
                "n\n1\n2\n3\n4\n".as_bytes(),
                &ImportOptions::new("upload.csv").with_max_rows(2),
            )
            .unwrap();

        assert_eq!(result.hits_created, 2);
        assert!(result.truncated);
        assert_eq!(db.batch_progress(result.batch.id).unwrap().total, 2);
    }

    #[test]
    fn import_into_missing_template_fails() {
        let db = setup_db();

        let err = db
            .create_batch_from_csv(7, "foo\n1\n".as_bytes(), &ImportOptions::new("x.csv"))
            .unwrap_err();

        assert!(matches!(err, HitError::TemplateNotFound(7)));
        assert!(db.list_batches(None).unwrap().is_empty());
    }

    #[test]
    fn list_batches_filters_by_template() {
        let db = setup_db();
        let first = db.create_template("a", "a.html", "${x}").unwrap();
        let second = db.create_template("b", "b.html", "${x}").unwrap();

        let b1 = import(&db, first.id, "x\n1\n");
        let b2 = import(&db, second.id, "x\n2\n");
        let b3 = import(&db, first.id, "x\n3\n");

        let all: Vec<i64> = db.list_batches(None).unwrap().iter().map(|b| b.id).collect();
        let only_first: Vec<i64> = db
            .list_batches(Some(first.id))
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();

        assert_eq!(all, vec![b1, b2, b3]);
        assert_eq!(only_first, vec![b1, b3]);
    }

    #[test]
    fn progress_of_missing_batch_fails() {
        let db = setup_db();

        assert!(matches!(
            db.batch_progress(3).unwrap_err(),
            HitError::BatchNotFound(3)
        ));
    }
}

mod completion_tests {
    use super::*;

    #[test]
    fn complete_task_strips_csrf_token() {
        let db = setup_db();
        let template = add_template(&db, "${foo}");
        let batch_id = import(&db, template.id, "foo\nbar\n");
        let task = db.next_unfinished_task(batch_id).unwrap().unwrap();

        let done = db
            .complete_task(task.id(), fields(&[(CSRF_FIELD, "secret"), ("choice", "yes")]))
            .expect("Failed to complete HIT");

        assert!(done.is_completed());
        assert_eq!(done.answers(), &fields(&[("choice", "yes")]));

        let stored = db.get_task(task.id()).unwrap().unwrap();
        assert!(stored.is_completed());
        assert!(!stored.answers().contains_key(CSRF_FIELD));
        assert_eq!(stored.answers().get("choice"), Some("yes"));
        assert_eq!(stored.input_fields(), task.input_fields());
    }

    #[test]
    fn second_completion_is_rejected() {
        let db = setup_db();
        let template = add_template(&db, "${foo}");
        let batch_id = import(&db, template.id, "foo\nbar\n");
        let task = db.next_unfinished_task(batch_id).unwrap().unwrap();

        db.complete_task(task.id(), fields(&[("choice", "first")]))
            .unwrap();
        let err = db
            .complete_task(task.id(), fields(&[("choice", "second")]))
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::DoubleCompletion);
        let stored = db.get_task(task.id()).unwrap().unwrap();
        assert_eq!(stored.answers().get("choice"), Some("first"));
    }

    #[test]
    fn completing_missing_task_fails() {
        let db = setup_db();

        let err = db.complete_task(99, FieldMap::new()).unwrap_err();

        assert!(matches!(err, HitError::TaskNotFound(99)));
    }

    #[test]
    fn finished_and_unfinished_ordering() {
        let db = setup_db();
        let template = add_template(&db, "${n}");
        let batch_id = import(&db, template.id, "n\n1\n2\n3\n4\n");
        let ids: Vec<i64> = db
            .unfinished_tasks(batch_id)
            .unwrap()
            .iter()
            .map(|t| t.id())
            .collect();

        db.complete_task(ids[0], fields(&[("a", "x")])).unwrap();
        db.complete_task(ids[2], fields(&[("a", "y")])).unwrap();

        let finished: Vec<i64> = db
            .finished_tasks(batch_id)
            .unwrap()
            .iter()
            .map(|t| t.id())
            .collect();
        let unfinished: Vec<i64> = db
            .unfinished_tasks(batch_id)
            .unwrap()
            .iter()
            .map(|t| t.id())
            .collect();

        assert_eq!(finished, vec![ids[2], ids[0]]);
        assert_eq!(unfinished, vec![ids[1], ids[3]]);
        assert_eq!(db.next_unfinished_task(batch_id).unwrap().unwrap().id(), ids[1]);

        let progress = db.batch_progress(batch_id).unwrap();
        assert_eq!(progress.total, 4);
        assert_eq!(progress.completed, 2);
        assert_eq!(progress.remaining(), 2);
    }

    #[test]
    fn next_unfinished_is_none_when_all_done() {
        let db = setup_db();
        let template = add_template(&db, "${n}");
        let batch_id = import(&db, template.id, "n\n1\n");
        let task = db.next_unfinished_task(batch_id).unwrap().unwrap();

        db.complete_task(task.id(), FieldMap::new()).unwrap();

        assert!(db.next_unfinished_task(batch_id).unwrap().is_none());
    }
}

mod render_tests {
    use super::*;

    #[test]
    fn render_task_substitutes_row_into_form() {
        let db = setup_db();
        let template = add_template(&db, "<p>${foo} / ${missing}</p>");
        let batch_id = import(&db, template.id, "foo\nbar\n");
        let task = db.next_unfinished_task(batch_id).unwrap().unwrap();

        let html = db.render_task(task.id()).unwrap();

        assert_eq!(
            html,
            "<div style=\" width:100%; border:2px solid black; margin-top:10px\">\
             <div style=\"margin:10px\"><p>bar / ${missing}</p></div></div>"
        );
    }

    #[test]
    fn render_task_uses_current_template_form() {
        let db = setup_db();
        let template = add_template(&db, "old ${foo}");
        let batch_id = import(&db, template.id, "foo\nbar\n");
        let task = db.next_unfinished_task(batch_id).unwrap().unwrap();

        db.update_template_form(template.id, "new ${foo}").unwrap();

        assert!(db.render_task(task.id()).unwrap().contains("new bar"));
    }

    #[test]
    fn render_missing_task_fails() {
        let db = setup_db();

        assert!(matches!(
            db.render_task(5).unwrap_err(),
            HitError::TaskNotFound(5)
        ));
    }
}

mod export_tests {
    use super::*;

    #[test]
    fn batch_results_group_by_schema() {
        let db = setup_db();
        let template = add_template(&db, "${foo}");
        let batch_id = import(&db, template.id, "foo\n1\n2\n3\n");
        let tasks = db.unfinished_tasks(batch_id).unwrap();

        db.complete_task(tasks[0].id(), fields(&[("a", "x")])).unwrap();
        db.complete_task(tasks[1].id(), fields(&[("b", "y")])).unwrap();
        db.complete_task(tasks[2].id(), fields(&[("a", "z")])).unwrap();

        let tables = db.batch_results(batch_id).unwrap();

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].fieldnames.columns(), ["Answer.a", "Input.foo"]);
        assert_eq!(tables[0].rows.len(), 2);
        // Newest first within the batch.
        assert_eq!(tables[0].rows[0]["Input.foo"], "3");
        assert_eq!(tables[0].rows[1]["Input.foo"], "1");
        assert_eq!(tables[1].fieldnames.columns(), ["Answer.b", "Input.foo"]);
        assert_eq!(tables[1].rows.len(), 1);
    }

    #[test]
    fn batch_results_ignore_open_hits() {
        let db = setup_db();
        let template = add_template(&db, "${foo}");
        let batch_id = import(&db, template.id, "foo\n1\n2\n");

        assert!(db.batch_results(batch_id).unwrap().is_empty());
    }

    #[test]
    fn template_export_walks_batches_in_order() {
        let db = setup_db();
        let template = add_template(&db, "${n}");
        let first = import(&db, template.id, "n\n1\n2\n");
        let second = import(&db, template.id, "n\n3\n");

        for batch_id in [first, second] {
            for task in db.unfinished_tasks(batch_id).unwrap() {
                db.complete_task(task.id(), fields(&[("ok", "1")])).unwrap();
            }
        }

        let order: Vec<String> = db
            .template_export_tasks(template.id)
            .unwrap()
            .iter()
            .map(|t| t.input_fields().get("n").unwrap_or("").to_string())
            .collect();
        assert_eq!(order, vec!["2", "1", "3"]);

        let tables = db.template_results(template.id).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 3);
    }

    #[test]
    fn export_of_missing_targets_fails() {
        let db = setup_db();

        assert!(matches!(
            db.batch_export_tasks(1).unwrap_err(),
            HitError::BatchNotFound(1)
        ));
        assert!(matches!(
            db.template_export_tasks(1).unwrap_err(),
            HitError::TemplateNotFound(1)
        ));
    }
}

mod file_db_tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hits.db");

        let task_id = {
            let db = Database::open(&path).unwrap();
            let template = add_template(&db, "${foo}");
            let batch_id = import(&db, template.id, "foo\nbar\n");
            let task = db.next_unfinished_task(batch_id).unwrap().unwrap();
            db.complete_task(task.id(), fields(&[("done", "yes")]))
                .unwrap();
            task.id()
        };

        let db = Database::open(&path).unwrap();
        let task = db.get_task(task_id).unwrap().unwrap();
        assert!(task.is_completed());
        assert_eq!(task.answers().get("done"), Some("yes"));
    }
}
