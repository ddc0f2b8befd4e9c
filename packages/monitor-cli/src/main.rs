//! Content change monitor
//!
//! Scans configured sources, records new, changed and removed documents in
//! Directus and runs pending documents through the extraction service.

mod config;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use change_monitor::{
    AnalyzeSummary, Analyzer, DirectusRepository, DryRunRepository, HttpExtractor, HttpFetcher,
    MonitorConfig, PageCache, RecordRepository, RunCoordinator, RunSummary, SourceDefinition,
};
use directus_client::DirectusClient;

use crate::config::{load_sources, Config};

#[derive(Parser)]
#[command(name = "change-monitor")]
#[command(about = "Detect changes in monitored web documents and version their records")]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every source and classify its documents
    Scan {
        #[command(flatten)]
        run: RunArgs,

        /// Documents per source (-1 = all)
        #[arg(long, default_value_t = 10, allow_hyphen_values = true)]
        max_items: i64,

        /// Empty the page cache before scanning
        #[arg(long)]
        clear_cache: bool,
    },

    /// Extract structured data for pending documents
    Analyze {
        /// Documents per status to process
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Log writes instead of performing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Full pass: scan all documents, analyze what is pending, report
    Monitor {
        #[command(flatten)]
        run: RunArgs,

        /// Documents per status to analyze after the scan
        #[arg(long, default_value_t = 100)]
        analyze_limit: usize,
    },

    /// Delete the page cache
    ClearCache {
        #[arg(long, default_value = ".cache")]
        cache_dir: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Sources file, created with a default source if missing
    #[arg(long, default_value = "sources.json")]
    config: PathBuf,

    #[arg(long, default_value = ".cache")]
    cache_dir: PathBuf,

    /// Always fetch live pages
    #[arg(long)]
    no_cache: bool,

    /// Log writes instead of performing them
    #[arg(long)]
    dry_run: bool,

    /// Write the run summary as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Serialize)]
struct MonitorReport<'a> {
    scan: &'a RunSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<&'a AnalyzeSummary>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose {
        "debug,change_monitor=debug"
    } else {
        "info,change_monitor=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    match cli.command {
        Commands::ClearCache { cache_dir } => {
            PageCache::in_dir(&cache_dir, MonitorConfig::default().cache_ttl()).clear();
            println!("Cache cleared: {}", cache_dir.display());
            Ok(())
        }
        Commands::Scan {
            run,
            max_items,
            clear_cache,
        } => {
            let config = Config::from_env()?;
            let sources = load_sources(&run.config)?;
            let monitor = monitor_config(&config, &run).with_max_items(max_items);
            let cache = page_cache(&run, &monitor, clear_cache)?;
            let repo = connect(config).await?;

            let summary = if run.dry_run {
                scan(DryRunRepository::new(repo), &sources, monitor, cache, None).await?
            } else {
                scan(repo, &sources, monitor, cache, None).await?
            };

            println!("{}", summary.scan);
            write_report(run.report.as_deref(), &summary.report())
        }
        Commands::Analyze { limit, dry_run } => {
            let config = Config::from_env()?;
            let extractor = extractor(&config)?.context("EXTRACTOR_URL must be set to analyze")?;
            let repo = connect(config).await?;

            let summary = if dry_run {
                analyze(&DryRunRepository::new(repo), &extractor, limit).await?
            } else {
                analyze(&repo, &extractor, limit).await?
            };

            println!("{}", summary);
            Ok(())
        }
        Commands::Monitor { run, analyze_limit } => {
            let config = Config::from_env()?;
            let sources = load_sources(&run.config)?;
            let monitor = monitor_config(&config, &run).with_max_items(-1);
            let cache = page_cache(&run, &monitor, false)?;
            let extractor = extractor(&config)?;
            if extractor.is_none() {
                warn!("EXTRACTOR_URL not set, documents stay pending after the scan");
            }
            let analysis = extractor.as_ref().map(|e| (e, analyze_limit));
            let repo = connect(config).await?;

            let summary = if run.dry_run {
                scan(DryRunRepository::new(repo), &sources, monitor, cache, analysis).await?
            } else {
                scan(repo, &sources, monitor, cache, analysis).await?
            };

            println!("{}", summary.scan);
            if let Some(analysis) = &summary.analysis {
                println!("{}", analysis);
            }
            write_report(run.report.as_deref(), &summary.report())
        }
    }
}

fn monitor_config(config: &Config, run: &RunArgs) -> MonitorConfig {
    MonitorConfig::new()
        .with_collections(config.collections.clone())
        .with_safety_buffer(config.safety_buffer)
        .with_dry_run(run.dry_run)
}

fn page_cache(run: &RunArgs, monitor: &MonitorConfig, clear: bool) -> Result<Option<PageCache>> {
    if run.no_cache {
        return Ok(None);
    }
    std::fs::create_dir_all(&run.cache_dir)
        .with_context(|| format!("Failed to create cache dir {}", run.cache_dir.display()))?;
    let cache = PageCache::in_dir(&run.cache_dir, monitor.cache_ttl());
    if clear {
        cache.clear();
    }
    Ok(Some(cache))
}

fn extractor(config: &Config) -> Result<Option<HttpExtractor>> {
    let Some(url) = &config.extractor_url else {
        return Ok(None);
    };
    let mut extractor = HttpExtractor::new(url.as_str())?;
    if let Some(key) = &config.extractor_api_key {
        extractor = extractor.with_api_key(key.as_str());
    }
    Ok(Some(extractor))
}

/// Authenticate and check the backend before any document is touched.
async fn connect(config: Config) -> Result<DirectusRepository> {
    let base_url = config.directus.base_url.clone();
    let client = DirectusClient::connect(config.directus)
        .await
        .with_context(|| format!("Failed to authenticate with Directus at {}", base_url))?;
    client
        .ping()
        .await
        .with_context(|| format!("Directus at {} is not reachable", base_url))?;
    info!(url = %base_url, "Connected to Directus");

    Ok(DirectusRepository::new(client, config.collections))
}

struct Outcome {
    scan: RunSummary,
    analysis: Option<AnalyzeSummary>,
}

impl Outcome {
    fn report(&self) -> MonitorReport<'_> {
        MonitorReport {
            scan: &self.scan,
            analysis: self.analysis.as_ref(),
        }
    }
}

async fn scan<R: RecordRepository>(
    repo: R,
    sources: &[SourceDefinition],
    monitor: MonitorConfig,
    cache: Option<PageCache>,
    analysis: Option<(&HttpExtractor, usize)>,
) -> Result<Outcome> {
    let mut coordinator = RunCoordinator::new(repo, HttpFetcher::new()?, monitor);
    if let Some(cache) = cache {
        coordinator = coordinator.with_cache(cache);
    }

    let summary = coordinator.run(sources).await.context("Monitoring run aborted")?;
    if summary.failed_sources() > 0 {
        warn!(failed = summary.failed_sources(), "Some sources could not be scanned");
    }

    let analysis = match analysis {
        Some((extractor, limit)) => Some(analyze(coordinator.repository(), extractor, limit).await?),
        None => None,
    };

    Ok(Outcome {
        scan: summary,
        analysis,
    })
}

async fn analyze<R: RecordRepository>(
    repo: &R,
    extractor: &HttpExtractor,
    limit: usize,
) -> Result<AnalyzeSummary> {
    info!(endpoint = %extractor.endpoint(), limit, "Analyzing pending documents");
    Analyzer::new(repo, extractor)
        .process_pending(limit)
        .await
        .context("Analysis aborted")
}

fn write_report(path: Option<&Path>, report: &MonitorReport<'_>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    info!(path = %path.display(), "Report written");
    Ok(())
}
