//! hit-batch
//!
//! Command-line front end: load templates, import CSV batches, hand out
//! and complete HITs, and export results.

use anyhow::Result;
use clap::Parser;
use flate2::Compression;
use flate2::write::GzEncoder;
use hit_batch::cli::export::{ExportArgs, ExportCommand};
use hit_batch::cli::import::{BatchCommand, BatchCreateArgs};
use hit_batch::cli::task::TaskCommand;
use hit_batch::cli::template::TemplateCommand;
use hit_batch::cli::{Cli, Command};
use hit_batch::config::{Config, ConfigLoader};
use hit_batch::db::Database;
use hit_batch::db::batches::ImportOptions;
use hit_batch::error::HitError;
use hit_batch::ingest::open_csv_file;
use hit_batch::results::{ResultTable, aggregate, write_csv};
use hit_batch::types::FieldMap;
use serde::Serialize;
use serde_json::json;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let mut loader = match &cli.config {
        Some(path) => ConfigLoader::load_explicit(path)?,
        None => ConfigLoader::load()?,
    };
    if let Some(path) = loader.config_path() {
        debug!(config = %path.display(), "Using config file");
    }
    if let Some(db_path) = &cli.database {
        loader.config_mut().storage.db_path = db_path.into();
    }
    let config = loader.into_config();

    config.ensure_db_dir()?;
    let db = Database::open(&config.storage.db_path)?;

    match cli.command {
        Command::Template(cmd) => run_template(&db, cmd),
        Command::Batch(cmd) => run_batch(&db, &config, cmd),
        Command::Task(cmd) => run_task(&db, cmd),
        Command::Export(cmd) => run_export(&db, &config, cmd),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn run_template(db: &Database, cmd: TemplateCommand) -> Result<()> {
    match cmd {
        TemplateCommand::Add(args) => {
            let form = std::fs::read_to_string(&args.file)?;
            let template = db.create_template(&args.template_name(), &file_name(&args.file), &form)?;
            info!(template_id = template.id, "Added {}", template);
            print_json(&template)
        }
        TemplateCommand::Update(args) => {
            let form = std::fs::read_to_string(&args.file)?;
            let template = db.update_template_form(args.id, &form)?;
            info!(template_id = template.id, "Updated {}", template);
            print_json(&template)
        }
        TemplateCommand::Show { id } => {
            let template = db.get_template(id)?.ok_or(HitError::TemplateNotFound(id))?;
            print_json(&template)
        }
        TemplateCommand::List => print_json(&db.list_templates()?),
    }
}

fn run_batch(db: &Database, config: &Config, cmd: BatchCommand) -> Result<()> {
    match cmd {
        BatchCommand::Create(args) => create_batch(db, config, &args),
        BatchCommand::List { template } => print_json(&db.list_batches(template)?),
        BatchCommand::Status { id } => {
            let batch = db.get_batch(id)?.ok_or(HitError::BatchNotFound(id))?;
            let progress = db.batch_progress(id)?;
            print_json(&json!({
                "batch": batch,
                "total": progress.total,
                "completed": progress.completed,
                "remaining": progress.remaining(),
            }))
        }
    }
}

fn create_batch(db: &Database, config: &Config, args: &BatchCreateArgs) -> Result<()> {
    debug!(file = %args.file.display(), gzipped = args.is_gzipped(), "Reading CSV upload");
    let reader = open_csv_file(&args.file)?;

    let mut options = ImportOptions::new(args.upload_filename());
    if let Some(ref name) = args.name {
        options = options.with_name(name);
    }
    if let Some(max_rows) = args.max_rows.or(config.import.max_rows) {
        options = options.with_max_rows(max_rows);
    }

    let result = db.create_batch_from_csv(args.template, reader, &options)?;
    print_json(&result)
}

fn run_task(db: &Database, cmd: TaskCommand) -> Result<()> {
    match cmd {
        TaskCommand::Render { id } => {
            println!("{}", db.render_task(id)?);
            Ok(())
        }
        TaskCommand::Next { batch } => match db.next_unfinished_task(batch)? {
            Some(task) => print_json(&task),
            None => {
                eprintln!("No open HITs in batch {}", batch);
                Ok(())
            }
        },
        TaskCommand::Submit(args) => {
            let answers = FieldMap::from_json_str(&args.answers_json()?)?;
            let task = db.complete_task(args.id, answers)?;
            print_json(&task)
        }
    }
}

fn run_export(db: &Database, config: &Config, cmd: ExportCommand) -> Result<()> {
    let (tasks, mut args) = match cmd {
        ExportCommand::Batch { id, args } => (db.batch_export_tasks(id)?, args),
        ExportCommand::Template { id, args } => (db.template_export_tasks(id)?, args),
    };

    let tables = if args.strict {
        vec![ResultTable::infer(&tasks)?]
    } else {
        aggregate(&tasks)
    };
    if tables.is_empty() {
        warn!("No completed HITs to export");
    }
    if tables.len() > 1 {
        info!(tables = tables.len(), "Completed HITs have differing columns; writing one table per column set");
    }

    if args.compress_threshold.is_none() {
        args.compress_threshold = config.export.compress_threshold.clone();
    }

    let csv_bytes = write_csv(&tables, Vec::new())?;
    write_output(&args, &csv_bytes)
}

fn write_output(args: &ExportArgs, csv_bytes: &[u8]) -> Result<()> {
    let should_compress = args.should_compress(Some(csv_bytes.len() as u64));

    match args.output {
        Some(ref path) if should_compress => {
            let path = if path.extension().is_some_and(|ext| ext == "gz") {
                path.clone()
            } else {
                let mut name = path.clone().into_os_string();
                name.push(".gz");
                PathBuf::from(name)
            };
            let file = write_gzip(std::fs::File::create(&path)?, csv_bytes)?;
            file.sync_all()?;
            eprintln!("Exported to {} (gzipped)", path.display());
        }
        Some(ref path) => {
            std::fs::write(path, csv_bytes)?;
            eprintln!("Exported to {}", path.display());
        }
        None if should_compress => {
            let mut stdout = write_gzip(std::io::stdout().lock(), csv_bytes)?;
            stdout.flush()?;
        }
        None => {
            std::io::stdout().write_all(csv_bytes)?;
        }
    }

    Ok(())
}

/// Gzip `bytes` into `out`, handing the sink back once the stream is finished.
fn write_gzip<W: Write>(out: W, bytes: &[u8]) -> std::io::Result<W> {
    let mut encoder = GzEncoder::new(out, Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}
