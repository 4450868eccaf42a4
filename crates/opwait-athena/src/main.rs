//! opwait-athena: run Athena queries and manage databases from the command line
//!
//! Every command submits one or more queries and waits for each to finish,
//! honouring Ctrl-C by stopping the query in flight.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use opwait_athena::aws::{
    AthenaClient, AwsContext, EncryptionOption, EncryptionSettings, ResultConfig, ResultRows,
    classify_anyhow_error,
};
use opwait_athena::config::AthenaConfig;
use opwait_athena::database::{DatabaseConfig, DatabaseManager};
use opwait_athena::query::{execute_query, query_poll_spec};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "opwait-athena")]
#[command(about = "Run Athena queries and manage databases, waiting for each to finish")]
#[command(version)]
struct Args {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

/// Options shared by every command; each overrides the config file
#[derive(clap::Args, Debug)]
struct GlobalArgs {
    /// JSON config file
    #[arg(long, global = true, env = "OPWAIT_CONFIG")]
    config: Option<PathBuf>,

    /// AWS region
    #[arg(long, global = true)]
    region: Option<String>,

    /// AWS profile to use (overrides AWS_PROFILE env var)
    #[arg(long, global = true)]
    aws_profile: Option<String>,

    /// Athena work group
    #[arg(long, global = true)]
    work_group: Option<String>,

    /// Encryption for query results (SSE_S3, SSE_KMS, CSE_KMS)
    #[arg(long, global = true)]
    encryption_option: Option<EncryptionOption>,

    /// KMS key for SSE_KMS or CSE_KMS
    #[arg(long, global = true, requires = "encryption_option")]
    kms_key: Option<String>,

    /// Total wait per query in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Delay before the first status check in seconds
    #[arg(long, global = true)]
    initial_delay: Option<u64>,

    /// Spacing between status checks in seconds
    #[arg(long, global = true)]
    poll_interval: Option<u64>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a query and print its rows
    Query {
        /// SQL to execute
        #[arg(long)]
        sql: String,

        /// S3 bucket for query results (defaults to the config file's bucket)
        #[arg(long)]
        bucket: Option<String>,
    },

    /// Manage an Athena database
    Database {
        #[command(subcommand)]
        action: DatabaseAction,
    },
}

#[derive(Subcommand, Debug)]
enum DatabaseAction {
    /// Create the database and confirm it exists
    Create(DatabaseArgs),
    /// Confirm the database exists
    Read(DatabaseArgs),
    /// Re-read the database (all settings force replacement)
    Update(DatabaseArgs),
    /// Drop the database
    Delete(DatabaseArgs),
}

#[derive(clap::Args, Debug)]
struct DatabaseArgs {
    /// Database name (lowercase letters, digits, underscores)
    #[arg(long)]
    name: String,

    /// S3 bucket for query results (defaults to the config file's bucket)
    #[arg(long)]
    bucket: Option<String>,

    /// Drop tables along with the database
    #[arg(long)]
    force_destroy: bool,
}

impl GlobalArgs {
    /// Load the config file, if any, and apply flag overrides
    fn resolve(&self) -> Result<AthenaConfig> {
        let mut config = match &self.config {
            Some(path) => AthenaConfig::load(path)?,
            None => AthenaConfig::default(),
        };

        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(profile) = &self.aws_profile {
            config.aws_profile = Some(profile.clone());
        }
        if let Some(work_group) = &self.work_group {
            config.work_group = Some(work_group.clone());
        }
        if let Some(encryption_option) = self.encryption_option {
            config.encryption = Some(EncryptionSettings {
                encryption_option,
                kms_key: self.kms_key.clone(),
            });
        }
        if let Some(timeout) = self.timeout {
            config.wait.timeout_secs = timeout;
        }
        if let Some(delay) = self.initial_delay {
            config.wait.initial_delay_secs = delay;
        }
        if let Some(interval) = self.poll_interval {
            config.wait.poll_interval_secs = interval;
            config.wait.max_delay_secs = config.wait.max_delay_secs.max(interval);
        }

        garde::Validate::validate(&config).context("Invalid settings")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if let Some(suggestion) = classify_anyhow_error(e).suggestion() {
        let _ = writeln!(stderr, "\n\x1b[36mHint:\x1b[0m {suggestion}");
    }

    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n\x1b[2mBacktrace:\x1b[0m\n{backtrace}");
        }
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
                .add_directive("aws_config=warn".parse()?)
                .add_directive("aws_sdk_athena=warn".parse()?)
                .add_directive("aws_smithy_runtime=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.global.resolve()?;
    let spec = query_poll_spec(&config.wait)?;

    if let Some(profile) = &config.aws_profile {
        info!(profile = %profile, "Using AWS profile");
    }
    let aws = AwsContext::with_profile(&config.region, config.aws_profile.as_deref()).await;
    let mut client = AthenaClient::from_context(&aws);
    if let Some(work_group) = &config.work_group {
        client = client.with_work_group(work_group);
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping query");
                cancel.cancel();
            }
        });
    }

    match args.command {
        Command::Query { sql, bucket } => {
            let bucket = bucket_or_default(bucket, &config)?;
            let result_config = ResultConfig::for_bucket(&bucket, config.encryption.clone());
            let rows = execute_query(&client, &sql, &result_config, &spec, Some(&cancel)).await?;
            print_rows(&rows, args.global.format)?;
        }

        Command::Database { action } => {
            let manager = DatabaseManager::new(&client, spec).with_cancellation(cancel.clone());
            let (verb, db_args) = match &action {
                DatabaseAction::Create(a) => ("created", a),
                DatabaseAction::Read(a) => ("exists", a),
                DatabaseAction::Update(a) => ("exists", a),
                DatabaseAction::Delete(a) => ("dropped", a),
            };
            let db = DatabaseConfig {
                name: db_args.name.clone(),
                bucket: bucket_or_default(db_args.bucket.clone(), &config)?,
                force_destroy: db_args.force_destroy,
                encryption: config.encryption.clone(),
            };

            match action {
                DatabaseAction::Create(_) => manager.create(&db).await?,
                DatabaseAction::Read(_) => manager.read(&db).await?,
                DatabaseAction::Update(_) => manager.update(&db).await?,
                DatabaseAction::Delete(_) => manager.delete(&db).await?,
            }

            match args.global.format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({ "database": db.name, "result": verb })
                ),
                OutputFormat::Table => println!("Database {} {verb}", db.name),
            }
        }
    }

    Ok(())
}

fn bucket_or_default(bucket: Option<String>, config: &AthenaConfig) -> Result<String> {
    bucket
        .or_else(|| config.bucket.clone())
        .context("No result bucket: pass --bucket or set \"bucket\" in the config file")
}

fn print_rows(rows: &ResultRows, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("Query returned no rows.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    for row in rows.rows() {
        table.add_row(
            row.iter()
                .map(|cell| Cell::new(cell.as_deref().unwrap_or("NULL")))
                .collect::<Vec<_>>(),
        );
    }

    println!("{table}");
    println!("\nTotal: {} rows", rows.len());
    Ok(())
}
