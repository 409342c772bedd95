//! Command-line interface for Redload, a staged bulk loader for Amazon Redshift.
//!
//! This binary reads a local dataset with DataFusion and hands it to
//! [`redload_core::insert`], which stages it in S3, runs `COPY` and removes
//! the staged object again.
//!
//! # Architecture
//!
//! The CLI is built using [`clap`] for argument parsing and [`tracing`] for structured logging.
//! It parses arguments, configures logging, builds the S3 store and the
//! warehouse connection, and delegates to the library. The whole load runs in
//! one warehouse transaction that is committed only when every step succeeded.
//! Redshift commits implicitly at `TRUNCATE`, so with `--truncate` the emptied
//! table stays empty even when the later steps fail.
//!
//! # Available Commands
//!
//! - `load` - Load a CSV, Parquet or NDJSON file into a Redshift table
//! - `formats` - List the input formats that can be read

mod display;
mod sources;

use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use tracing::{Level, error, info};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use redload_core::warehouse::{InMemoryWarehouse, PostgresWarehouse};
use redload_core::{
    ColumnTypes, ConfigError, CopyCredentials, CredentialProvider, CsvWriterOptions, Dataset,
    EnvCredentials, InsertOptions, LoadOptions, ObjectStager, RedloadError, StaticCredentials,
    StorageConfig, TableRef, infer_column_types, insert,
};

use crate::display::{column_types_table, display_summary, formats_table};
use crate::sources::{get_formats, read_dataset, resolve_format};

#[derive(Parser)]
#[command(
    name = "redload",
    version,
    about = "Bulk-load tabular files into Amazon Redshift",
    long_about = "Redload stages a dataset as CSV in S3, loads it with a single COPY \
                  statement and deletes the staged object afterwards."
)]
/// Command-line arguments and options for the Redload CLI.
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the Redload CLI.
#[derive(Subcommand)]
enum Commands {
    /// Loads a local file into a Redshift table.
    Load(LoadArgs),

    /// Lists the input formats that can be read.
    Formats,
}

/// Options of the `load` subcommand.
#[derive(Args, Debug)]
struct LoadArgs {
    /// Path to the input file.
    #[arg(short, long, value_name = "FILE")]
    input: String,

    /// Input format (e.g., "CSV", "Parquet"); detected from the extension when omitted.
    #[arg(long, value_name = "FORMAT")]
    format: Option<String>,

    /// Target table name.
    #[arg(short, long, value_name = "TABLE")]
    table: String,

    /// Target schema name.
    #[arg(short, long, value_name = "SCHEMA", default_value = "public")]
    schema: String,

    /// Bucket the dataset is staged in.
    #[arg(long, env = "REDLOAD_BUCKET", value_name = "BUCKET")]
    bucket: String,

    /// Key prefix for staged objects.
    #[arg(long, value_name = "PREFIX")]
    root: Option<String>,

    /// Truncate the table before loading.
    #[arg(long)]
    truncate: bool,

    /// Create the table (and its schema) when it does not exist.
    #[arg(long)]
    create: bool,

    /// Delete the staged object even when COPY fails.
    #[arg(long)]
    cleanup_on_failure: bool,

    /// Field delimiter of the staged CSV; the default COPY clauses follow it.
    #[arg(long, value_name = "CHAR", default_value = ",", value_parser = parse_delimiter)]
    delimiter: u8,

    /// COPY clause, one per flag; replaces the default clauses.
    #[arg(long = "copy-option", value_name = "CLAUSE")]
    copy_options: Vec<String>,

    /// Explicit column declaration used with --create, e.g. `id=INTEGER`.
    #[arg(long = "column-type", value_name = "NAME=TYPE", value_parser = parse_column_type)]
    column_types: Vec<(String, String)>,

    /// IAM role COPY assumes; the AWS key pair from the environment is used otherwise.
    #[arg(long, env = "REDLOAD_IAM_ROLE", value_name = "ARN")]
    iam_role: Option<String>,

    /// Warehouse connection string.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true, value_name = "URL")]
    database_url: Option<String>,

    /// Print the statements a load would issue without touching S3 or Redshift.
    #[arg(long)]
    dry_run: bool,
}

impl LoadArgs {
    fn csv_options(&self) -> CsvWriterOptions {
        CsvWriterOptions::new().with_delimiter(self.delimiter)
    }

    fn insert_options(&self) -> Result<InsertOptions, ConfigError> {
        let load_options = if self.copy_options.is_empty() {
            LoadOptions::for_csv(&self.csv_options())?
        } else {
            LoadOptions::new(&self.copy_options)
        };
        let mut options = InsertOptions::new()
            .with_truncate(self.truncate)
            .with_ensure_exists(self.create)
            .with_cleanup_on_failure(self.cleanup_on_failure)
            .with_load_options(load_options);
        if !self.column_types.is_empty() {
            options = options.with_column_types(self.column_types.iter().cloned().collect());
        }
        Ok(options)
    }

    fn storage_config(&self) -> Result<StorageConfig, ConfigError> {
        let config = StorageConfig::new(&self.bucket)?;
        match &self.root {
            Some(root) => config.with_root(root),
            None => Ok(config),
        }
    }
}

fn parse_column_type(value: &str) -> Result<(String, String), String> {
    let (name, declaration) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=TYPE, got '{value}'"))?;
    let (name, declaration) = (name.trim(), declaration.trim());
    if name.is_empty() || declaration.is_empty() {
        return Err(format!("expected NAME=TYPE, got '{value}'"));
    }
    Ok((name.to_string(), declaration.to_string()))
}

fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "\\t" | "tab" => Ok(b'\t'),
        _ => match value.as_bytes() {
            [byte] => Ok(*byte),
            _ => Err(format!("expected a single ASCII character, got '{value}'")),
        },
    }
}

/// Entry point for the Redload command-line interface.
///
/// # Errors
///
/// Returns an error if command execution fails or if the logging system cannot be initialized.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity flags
    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Load(args) => {
            info!("Loading {} into {}.{}", args.input, args.schema, args.table);
            handle_load(&args).await?;
        },
        Commands::Formats => {
            handle_formats();
        },
    }

    Ok(())
}

/// Turns a library error into the message shown to the user.
fn report(err: impl Into<RedloadError>) -> anyhow::Error {
    let err = err.into();
    if let Some(staged) = err.orphaned_object() {
        error!("Staged object left in place: {staged}");
    }
    match err.recovery_suggestion() {
        Some(hint) => anyhow!("{}\nHint: {hint}", err.user_message()),
        None => anyhow!(err.user_message()),
    }
}

async fn handle_load(args: &LoadArgs) -> Result<()> {
    let target = TableRef::new(&args.schema, &args.table).map_err(report)?;
    let config = args.storage_config().map_err(report)?;
    let options = args.insert_options().map_err(report)?;
    if let Some(column_types) = &options.column_types {
        column_types.validate().map_err(report)?;
    }

    let format = resolve_format(&args.input, args.format.as_deref())?;
    let dataset = read_dataset(&args.input, &format).await?;

    if args.dry_run {
        let stager = ObjectStager::new(Arc::new(InMemory::new()), config)
            .with_csv_options(args.csv_options());
        return dry_run(&dataset, &target, &stager, &options, args.iam_role.as_deref()).await;
    }

    let database_url = args
        .database_url
        .as_deref()
        .ok_or_else(|| {
            report(ConfigError::MissingRequired {
                option: "database-url".to_string(),
            })
        })?;

    let store = AmazonS3Builder::from_env()
        .with_bucket_name(config.bucket())
        .build()
        .map_err(|e| anyhow!("Failed to configure S3 access: {e}"))?;
    let stager = ObjectStager::new(Arc::new(store), config).with_csv_options(args.csv_options());

    let credentials: Box<dyn CredentialProvider> = match &args.iam_role {
        Some(role) => Box::new(StaticCredentials::new(CopyCredentials::iam_role(role))),
        None => Box::new(EnvCredentials),
    };

    let (mut client, connection) = tokio_postgres::connect(database_url, tokio_postgres::NoTls)
        .await
        .map_err(|e| anyhow!("Failed to connect to the warehouse: {e}"))?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("Warehouse connection error: {e}");
        }
    });

    let transaction = client
        .transaction()
        .await
        .map_err(|e| anyhow!("Failed to open a transaction: {e}"))?;
    let warehouse = PostgresWarehouse::new(transaction);

    let summary = insert(
        &dataset,
        &target,
        &warehouse,
        &stager,
        credentials.as_ref(),
        &options,
    )
    .await
    .map_err(report)?;

    warehouse
        .into_inner()
        .commit()
        .await
        .map_err(|e| anyhow!("Failed to commit the load: {e}"))?;

    display_summary(&summary);
    Ok(())
}

/// Runs the pipeline against in-memory collaborators and prints the statements.
///
/// The target counts as missing when `--create` is given and as existing
/// otherwise.
async fn dry_run(
    dataset: &Dataset,
    target: &TableRef,
    stager: &ObjectStager,
    options: &InsertOptions,
    iam_role: Option<&str>,
) -> Result<()> {
    let warehouse = if options.ensure_exists {
        InMemoryWarehouse::new()
    } else {
        InMemoryWarehouse::new().with_table(target.schema().as_str(), target.table().as_str())
    };
    let credentials = StaticCredentials::new(match iam_role {
        Some(role) => CopyCredentials::iam_role(role),
        None => CopyCredentials::access_key("<AWS_ACCESS_KEY_ID>", "<AWS_SECRET_ACCESS_KEY>"),
    });

    if options.ensure_exists {
        let column_types: ColumnTypes = match &options.column_types {
            Some(explicit) if !explicit.is_empty() => explicit.clone(),
            _ => infer_column_types(dataset),
        };
        println!("\nColumns:\n{}", column_types_table(&column_types));
    }

    let outcome = insert(dataset, target, &warehouse, stager, &credentials, options).await;

    println!("\nStatements:\n");
    for statement in warehouse.statements() {
        println!("{statement};\n");
    }

    let summary = outcome.map_err(report)?;
    display_summary(&summary);
    Ok(())
}

/// Handles the `formats` subcommand by displaying a table of readable formats.
fn handle_formats() {
    let formats = get_formats();
    println!("\nAvailable Formats ({} total):\n", formats.len());
    println!("{}", formats_table(&formats));
}
