//! Linkprobe main entry point
//!
//! This is the command-line interface for the Linkprobe dead-link checker.

use anyhow::Context;
use clap::Parser;
use linkprobe::config::{load_config_with_hash, validate, Config};
use linkprobe::crawler::{resolve_target, Coordinator};
use linkprobe::output::{print_report, Completion, LogFileSink};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Linkprobe: a concurrent dead-link checker
///
/// Linkprobe crawls every page of one site starting at its root, checks each
/// discovered link exactly once, and writes per-run error, info and link
/// logs for review.
#[derive(Parser, Debug)]
#[command(name = "linkprobe")]
#[command(version = "1.0.0")]
#[command(about = "A concurrent dead-link checker", long_about = None)]
struct Cli {
    /// Host of the site to check (host, host:port or URL)
    #[arg(short = 'd', long = "domain", value_name = "HOST")]
    domain: Option<String>,

    /// Number of concurrent workers
    #[arg(short = 'n', long = "workers")]
    workers: Option<u32>,

    /// Fetch timeout in seconds
    #[arg(short = 't', long = "timeout")]
    timeout: Option<u64>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Directory the run's log files are written to
    #[arg(short = 'o', long = "log-dir", value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Re-enqueues allowed per URL after a timeout
    #[arg(long, conflicts_with = "retry_forever")]
    max_retries: Option<u32>,

    /// Retry timed-out URLs without limit
    #[arg(long)]
    retry_forever: bool,

    /// Stop the crawl after this many seconds
    #[arg(long, value_name = "SECS")]
    deadline: Option<u64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply(&self, config: &mut Config) {
        if let Some(domain) = &self.domain {
            config.crawler.target_host = domain.clone();
        }
        if let Some(workers) = self.workers {
            config.crawler.workers = workers;
        }
        if let Some(timeout) = self.timeout {
            config.crawler.timeout_secs = timeout;
        }
        if let Some(dir) = &self.log_dir {
            config.output.log_dir = dir.display().to_string();
        }
        if let Some(max_retries) = self.max_retries {
            config.crawler.max_retries = max_retries;
        }
        if self.retry_forever {
            config.crawler.retry_forever = true;
        }
        if let Some(deadline) = self.deadline {
            config.crawler.deadline_secs = Some(deadline);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    cli.apply(&mut config);
    validate(&config).context("invalid configuration")?;

    let completion = handle_crawl(&config).await?;
    if completion != Completion::Completed {
        tracing::warn!("Crawl stopped early: {}", completion);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("linkprobe=info,warn"),
            1 => EnvFilter::new("linkprobe=debug,info"),
            2 => EnvFilter::new("linkprobe=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Runs the crawl with log files and Ctrl-C handling, then prints the report
async fn handle_crawl(config: &Config) -> anyhow::Result<Completion> {
    let (_, host) = resolve_target(config)?;

    let sink = LogFileSink::create(Path::new(&config.output.log_dir), &host)?;
    let paths = sink.paths().clone();
    tracing::info!(
        "Writing logs to {}, {} and {}",
        paths.error.display(),
        paths.info.display(),
        paths.links.display()
    );

    let coordinator = Coordinator::new(config, Arc::new(sink))?;

    let shutdown = coordinator.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after in-flight fetches");
            shutdown.cancel();
        }
    });

    let report = coordinator.run().await;
    print_report(&report);

    Ok(report.completion)
}
