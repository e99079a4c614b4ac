//! # linkpost CLI
//!
//! Command-line front end for the import pipeline.
//!
//! ## Subcommands
//!
//! - `import`: fetch a page and reconcile its metadata into a record
//! - `show`: print a stored record
//! - `inspect`: print what a page would contribute, without touching a record
//!
//! Records are kept as XML files under `--store` (default `.linkpost/records`).
//! Logs go to stderr, filtered by `RUST_LOG`; `--log-file` and `--otel` add a
//! log file and OTLP export.

mod telemetry;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::{Args, CommandFactory, Parser, Subcommand};
use linkpost::fetcher::{Fetcher, FetcherConfig};
use linkpost::import::{Importer, Write};
use linkpost::reconcile::TitleDecision;
use linkpost::store::{RecordId, RecordStore, XmlStore, XmlStoreConfig};
use telemetry::TelemetryOptions;
use tracing::instrument;

#[derive(Parser)]
#[command(author, version, about = "Import Open Graph metadata from web pages into records", long_about = None)]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Export traces and metrics over OTLP
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import a page's metadata into a record
    Import(ImportArgs),

    /// Show a stored record
    Show(ShowArgs),

    /// Show what a page would contribute to a record
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Request timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// User agent to send
    #[arg(long)]
    user_agent: Option<String>,

    /// Maximum number of body bytes to read
    #[arg(long)]
    max_body_bytes: Option<usize>,

    /// Only fetch from this host or its subdomains (repeatable)
    #[arg(long = "allow-host")]
    allow_hosts: Vec<String>,
}

impl FetchArgs {
    fn fetcher(&self) -> anyhow::Result<Fetcher> {
        Ok(Fetcher::new(self.config())?)
    }

    /// Fetcher settings, leaving unset flags at the library defaults
    fn config(&self) -> FetcherConfig {
        let mut builder = FetcherConfig::builder().allowed_hosts(self.allow_hosts.clone());
        if let Some(secs) = self.timeout {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(max_body_bytes) = self.max_body_bytes {
            builder = builder.max_body_bytes(max_body_bytes);
        }
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        builder.build()
    }
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// Directory holding record files
    #[arg(long, default_value = ".linkpost/records")]
    store: PathBuf,
}

impl StoreArgs {
    fn store(&self) -> XmlStore {
        XmlStore::with_config(XmlStoreConfig {
            base_path: self.store.clone(),
        })
    }
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Record to update
    #[arg(required = true)]
    record_id: RecordId,

    /// Page to import from; an empty string skips the import
    #[arg(required = true)]
    url: String,

    /// Print the planned writes without applying them
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    #[command(flatten)]
    fetch: FetchArgs,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// Record to show
    #[arg(required = true)]
    record_id: RecordId,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Page to inspect
    #[arg(required = true)]
    url: String,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    #[command(flatten)]
    fetch: FetchArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _telemetry = telemetry::init_tracing_subscriber(&TelemetryOptions {
        log_file: cli.log_file.clone(),
        otel: cli.otel,
    })?;

    match cli.command {
        Some(Commands::Import(args)) => {
            import_command(args).await?;
        }
        Some(Commands::Show(args)) => {
            show_command(args).await?;
        }
        Some(Commands::Inspect(args)) => {
            inspect_command(args).await?;
        }
        None => {
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

#[instrument]
async fn import_command(args: ImportArgs) -> anyhow::Result<()> {
    let importer = Importer::new(args.fetch.fetcher()?);
    let store = args.store.store();

    if args.dry_run {
        let Some(plan) = importer.plan(&args.record_id, &args.url, &store).await? else {
            println!("No URL given, nothing to do");
            return Ok(());
        };

        if args.format == "json" {
            println!("{}", serde_json::to_string_pretty(&plan)?);
            return Ok(());
        }

        match &plan.title {
            TitleDecision::Set(title) => println!("set title = {:?}", title),
            TitleDecision::Keep => println!("keep title"),
        }
        for op in &plan.ops {
            println!("{}", Write::Field(op.clone()));
        }
        return Ok(());
    }

    let summary = importer.import(&args.record_id, &args.url, &store).await?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if summary.skipped {
        println!("No URL given, nothing to do");
    } else {
        println!("Imported {} into {}", summary.url, summary.record_id);
        for write in &summary.applied_ops {
            println!("  ok      {}", write);
        }
        for failed in &summary.failed_ops {
            println!("  failed  {} ({})", failed.write, failed.reason);
        }
    }

    if !summary.is_complete() {
        bail!(
            "{} of {} writes failed",
            summary.failed_ops.len(),
            summary.failed_ops.len() + summary.applied_ops.len()
        );
    }

    Ok(())
}

#[instrument]
async fn show_command(args: ShowArgs) -> anyhow::Result<()> {
    let store = args.store.store();
    let record = store.get_record(&args.record_id).await?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!(
        "{}: {}",
        args.record_id,
        record.title.as_deref().unwrap_or("(untitled)")
    );
    for (key, value) in record.fields.iter() {
        println!("  {} = {}", key, value);
    }

    Ok(())
}

#[instrument]
async fn inspect_command(args: InspectArgs) -> anyhow::Result<()> {
    let fetcher = args.fetch.fetcher()?;
    let inspection = linkpost::inspect(&args.url, &fetcher).await?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&inspection)?);
        return Ok(());
    }

    println!("URL:  {}", inspection.url);
    println!("Host: {}", inspection.host);
    println!("Open Graph properties:");
    for (property, content) in inspection.metadata.iter() {
        println!("  {} = {}", property, content);
    }
    println!("Fields:");
    for (key, value) in inspection.desired.iter() {
        println!("  {} = {}", key, value);
    }

    Ok(())
}
