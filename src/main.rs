use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clew::collection::Collection;
use clew::manifest;
use clew::report::IngestReport;
use clew::store::{HttpStore, MemoryStore, ResourceStore};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "clew")]
#[command(about = "Ingest CSV/FGDC metadata into a Fedora/LDP repository as ordered page hierarchies")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest one collection from CSV and/or XML sources
    Ingest(IngestArgs),
    /// Run several collection jobs from a JSON manifest
    Batch(BatchArgs),
    /// Delete a resource, or every child of the repository root
    Delete(DeleteArgs),
}

#[derive(Args)]
struct IngestArgs {
    /// Collection slug; also keys identifier-extraction rules
    #[arg(short, long)]
    collection: String,

    /// CSV files to ingest, in order
    #[arg(long)]
    csv: Vec<PathBuf>,

    /// FGDC XML files to ingest, in order
    #[arg(long)]
    xml: Vec<PathBuf>,

    /// Directory searched for binary attachments
    #[arg(short, long)]
    binary_path: Option<PathBuf>,

    /// Repository base URL
    #[arg(long, default_value = clew::config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Ingest into this existing container instead of creating one
    #[arg(long)]
    uri: Option<String>,

    /// Ingest directly under the repository base URL
    #[arg(long, conflicts_with = "uri")]
    root: bool,

    /// Assemble against an in-memory store; nothing reaches the repository
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct BatchArgs {
    /// JSON manifest describing the collection jobs
    manifest: PathBuf,

    /// Repository base URL
    #[arg(long, default_value = clew::config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Assemble against an in-memory store; nothing reaches the repository
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct DeleteArgs {
    /// URI of the resource to delete
    #[arg(required_unless_present = "all")]
    uri: Option<String>,

    /// Delete every child of the repository root instead
    #[arg(long)]
    all: bool,

    /// Repository base URL
    #[arg(long, default_value = clew::config::DEFAULT_BASE_URL)]
    base_url: String,
}

async fn make_store(base_url: &str, dry_run: bool) -> Result<Box<dyn ResourceStore>> {
    if dry_run {
        info!("Dry run: assembling against an in-memory store");
        Ok(Box::new(MemoryStore::with_base(base_url)))
    } else {
        let store = HttpStore::new(base_url)?;
        store.probe().await?;
        Ok(Box::new(store))
    }
}

async fn build_collection(
    store: &dyn ResourceStore,
    slug: &str,
    uri: Option<&str>,
    root: bool,
) -> Result<Collection> {
    if let Some(uri) = uri {
        Ok(Collection::existing(slug, uri))
    } else if root {
        Ok(Collection::at_root(store, slug))
    } else {
        Collection::create(store, slug).await
    }
}

async fn run_ingest(args: IngestArgs) -> Result<()> {
    if args.csv.is_empty() && args.xml.is_empty() {
        anyhow::bail!("Nothing to ingest: pass --csv and/or --xml");
    }
    let start = Instant::now();
    let store = make_store(&args.base_url, args.dry_run).await?;

    let mut col =
        build_collection(store.as_ref(), &args.collection, args.uri.as_deref(), args.root).await?;
    if let Some(path) = &args.binary_path {
        col.set_binary_root(path);
    }
    for path in &args.csv {
        col.ingest_csv(store.as_ref(), path).await?;
    }
    if !args.xml.is_empty() {
        col.ingest_xml(store.as_ref(), &args.xml).await?;
    }

    col.report().print_summary(col.slug(), col.uri());
    println!();
    println!("Total time:         {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

async fn run_batch(args: BatchArgs) -> Result<()> {
    let manifest = manifest::load(&args.manifest)?;
    let start = Instant::now();
    let store = make_store(&args.base_url, args.dry_run).await?;

    let mut totals = IngestReport::new();
    for job in &manifest.jobs {
        let mut col =
            build_collection(store.as_ref(), &job.slug, job.uri.as_deref(), job.root).await?;
        if let Some(path) = &job.binary_path {
            col.set_binary_root(path);
        }
        for path in &job.csv {
            col.ingest_csv(store.as_ref(), Path::new(path)).await?;
        }
        if !job.xml.is_empty() {
            let paths: Vec<PathBuf> = job.xml.iter().map(PathBuf::from).collect();
            col.ingest_xml(store.as_ref(), &paths).await?;
        }
        col.report().print_summary(&job.slug, col.uri());
        totals.merge(col.into_report());
    }

    println!();
    println!("============================================");
    println!("  Batch complete: {} job(s)", manifest.jobs.len());
    println!("============================================");
    println!("Resources created:  {}", totals.created.len());
    println!("Records processed:  {}", totals.records_processed);
    println!("Records skipped:    {}", totals.records_skipped);
    println!("Warnings:           {}", totals.warnings.len());
    println!("Total time:         {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

async fn run_delete(args: DeleteArgs) -> Result<()> {
    let store = HttpStore::new(&args.base_url)?;
    store.probe().await?;

    if args.all {
        // Listing the root container requires the trailing slash.
        let root = format!("{}/", args.base_url.trim_end_matches('/'));
        let children = store.list_children(&root).await?;
        for child in &children {
            store.delete(child).await?;
            println!("Deleted: {child}");
        }
        println!("Deleted {} resource(s).", children.len());
    } else if let Some(uri) = &args.uri {
        store.delete(uri).await?;
        println!("Deleted: {uri}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("clew-worker")
        .enable_io()
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Ingest(args) => rt.block_on(run_ingest(args)),
        Commands::Batch(args) => rt.block_on(run_batch(args)),
        Commands::Delete(args) => rt.block_on(run_delete(args)),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
