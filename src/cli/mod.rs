//! Command-line interface for the harvesting pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;

use naukriharvest::config::Settings;
use naukriharvest::engine::{CancelFlag, ScrapeEngine};
use naukriharvest::models::{RunStatus, RunSummary};
use naukriharvest::scheduler;
use naukriharvest::store::{
    memory_stores, MemoryJobStore, MemorySourceRegistry, SourceRegistry,
};

#[derive(Parser)]
#[command(name = "naukri", about = "Government job notice harvester", version)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (default: naukri.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape one source, or every source that is due
    Scrape {
        /// Source id to scrape
        #[arg(long, conflicts_with = "all_due")]
        source: Option<String>,

        /// Scrape all sources whose frequency window has elapsed
        #[arg(long)]
        all_due: bool,
    },
    /// List configured sources
    Sources,
}

/// Peek at argv for verbosity before the logger is initialized.
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Parse arguments and dispatch.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // -v itself is consumed by is_verbose() before the logger starts
    let _ = cli.verbose;
    let settings = Settings::load(cli.config.as_deref())?;

    let registry: Arc<dyn SourceRegistry> =
        Arc::new(MemorySourceRegistry::load_dir(&settings.sources_dir)?);

    match cli.command {
        Command::Scrape { source, all_due } => {
            scrape(&settings, registry, source, all_due).await
        }
        Command::Sources => list_sources(registry.as_ref()).await,
    }
}

async fn scrape(
    settings: &Settings,
    registry: Arc<dyn SourceRegistry>,
    source: Option<String>,
    all_due: bool,
) -> anyhow::Result<()> {
    let (jobs, audit) = memory_stores();
    let engine = Arc::new(ScrapeEngine::new(jobs.clone(), audit));

    // Ctrl-C finalizes the current run as cancelled instead of killing it
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("interrupt received, finishing current page...");
                cancel.cancel();
            }
        });
    }

    let summaries = if let Some(source_id) = source {
        vec![scheduler::scrape_source(&engine, registry.as_ref(), &source_id, &cancel).await?]
    } else if all_due {
        scheduler::scrape_all_due(engine.clone(), registry, settings.workers, cancel).await?
    } else {
        anyhow::bail!("pass --source <id> or --all-due");
    };

    for summary in &summaries {
        print_summary(summary);
    }
    print_store_totals(&jobs).await;

    if summaries.iter().all(RunSummary::is_success) {
        Ok(())
    } else {
        anyhow::bail!("one or more runs failed")
    }
}

fn print_summary(summary: &RunSummary) {
    let status = match summary.status {
        RunStatus::Completed => style(summary.status.as_str()).green(),
        RunStatus::Failed => style(summary.status.as_str()).red(),
        _ => style(summary.status.as_str()).yellow(),
    };
    println!(
        "{} [{}] {}: {} pages, {} found, {} created, {} updated, {} skipped, {} errors ({} ms avg)",
        style(&summary.source_id).bold(),
        summary.strategy.as_str(),
        status,
        summary.pages_scraped,
        summary.jobs_found,
        summary.jobs_created,
        summary.jobs_updated,
        summary.jobs_skipped,
        summary.error_count,
        summary.avg_response_ms,
    );
}

async fn print_store_totals(jobs: &Arc<MemoryJobStore>) {
    let postings = jobs.all().await;
    let high_quality = postings.iter().filter(|p| p.is_high_quality()).count();
    println!(
        "{} postings stored, {} high quality",
        style(postings.len()).bold(),
        high_quality
    );
}

async fn list_sources(registry: &dyn SourceRegistry) -> anyhow::Result<()> {
    let sources = registry.list().await?;
    if sources.is_empty() {
        println!("no sources configured");
        return Ok(());
    }

    let now = chrono::Utc::now();
    for source in sources {
        let due = if source.is_due(now) { "due" } else { "idle" };
        let state = if source.enabled {
            style(due).green()
        } else {
            style("disabled").dim()
        };
        println!(
            "{:<20} {} every {}h  {}",
            source.id,
            state,
            source.frequency_hours,
            style(&source.base_url).dim()
        );
    }
    Ok(())
}
