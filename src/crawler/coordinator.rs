//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the worker pool that drives a crawl:
//! - Seeding the work queue with the site's root
//! - Running N workers that fetch, decode, extract and classify
//! - Admitting discovered links through the visited registry
//! - Retrying timed-out fetches under the configured policy
//! - Stopping on completion, deadline or external cancellation

use crate::config::Config;
use crate::crawler::decoder::decode;
use crate::crawler::extractor::{build_extractor, LinkExtractor};
use crate::crawler::fetcher::{FetchOutcome, FetchedPage, Fetcher};
use crate::crawler::queue::{QueuedUrl, WorkQueue};
use crate::output::{Completion, CrawlEvent, CrawlReport, CrawlStats, EventSink};
use crate::state::{CrawlPhase, Partition, UrlState, VisitedRegistry};
use crate::url::{host_key, normalize_link, normalize_root};
use crate::{ProbeError, UrlError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Responses between two progress log lines
const PROGRESS_INTERVAL: usize = 100;

/// How timed-out fetches are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum re-enqueues per URL; `None` retries indefinitely
    pub limit: Option<u32>,

    /// Base delay, multiplied by the attempt number
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Returns whether a URL that has already been retried `attempt` times may be retried again
    pub fn allows(&self, attempt: u32) -> bool {
        self.limit.map_or(true, |max| attempt < max)
    }

    /// Delay before re-enqueueing for the given (1-based) retry
    pub fn delay(&self, retry: u32) -> Duration {
        self.backoff.saturating_mul(retry)
    }
}

/// Resolves the configured target into the root URL and its host key
pub fn resolve_target(config: &Config) -> Result<(Url, String), ProbeError> {
    let root = normalize_root(&config.crawler.target_host, &config.crawler.default_scheme)?;
    let host = host_key(&root).ok_or_else(|| UrlError::MissingHost(root.to_string()))?;
    Ok((root, host))
}

/// State shared by every worker
struct CrawlContext {
    target_host: String,
    default_scheme: String,
    fetcher: Fetcher,
    extractor: Arc<dyn LinkExtractor>,
    registry: VisitedRegistry,
    queue: WorkQueue,
    sink: Arc<dyn EventSink>,
    stats: CrawlStats,
    retry: RetryPolicy,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    ctx: Arc<CrawlContext>,
    root: Url,
    workers: usize,
    deadline: Option<Duration>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a coordinator with the root URL already admitted and enqueued
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `sink` - Receives every crawl event
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run, in the `Seeded` phase
    /// * `Err(ProbeError)` - Invalid target or HTTP client failure
    pub fn new(config: &Config, sink: Arc<dyn EventSink>) -> Result<Self, ProbeError> {
        let (root, target_host) = resolve_target(config)?;
        let fetcher = Fetcher::new(&config.user_agent.value, config.crawler.fetch_timeout())?;

        let cancel = CancellationToken::new();
        let queue = WorkQueue::new(config.crawler.max_queue_depth, cancel.child_token());
        let registry = VisitedRegistry::new();

        registry.admit(Partition::InSite, root.as_str());
        queue.push(QueuedUrl::new(root.clone()));
        tracing::info!("Seeded crawl of {} (host {})", root, target_host);

        let ctx = CrawlContext {
            target_host,
            default_scheme: config.crawler.default_scheme.clone(),
            fetcher,
            extractor: build_extractor(config.crawler.link_extractor),
            registry,
            queue,
            sink,
            stats: CrawlStats::new(),
            retry: RetryPolicy {
                limit: config.crawler.retry_limit(),
                backoff: config.crawler.retry_backoff(),
            },
        };

        Ok(Self {
            ctx: Arc::new(ctx),
            root,
            workers: config.crawler.workers.max(1) as usize,
            deadline: config.crawler.deadline(),
            cancel,
        })
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Host key links are compared against
    pub fn target_host(&self) -> &str {
        &self.ctx.target_host
    }

    pub fn phase(&self) -> CrawlPhase {
        self.ctx.queue.phase()
    }

    /// The visited registry; sizes are final once [`Coordinator::run`] returns
    pub fn registry(&self) -> &VisitedRegistry {
        &self.ctx.registry
    }

    /// Token that stops the crawl when cancelled
    ///
    /// Workers finish the URL they hold and exit; the report says `Cancelled`.
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the crawl until the queue drains, the deadline passes, or the
    /// shutdown handle is cancelled
    ///
    /// Individual fetch failures never end the run; they are reported to the
    /// event sink and counted in the report.
    pub async fn run(&self) -> CrawlReport {
        let start = Instant::now();
        tracing::info!(
            "Starting crawl of {} with {} workers",
            self.root,
            self.workers
        );

        self.ctx.queue.start();

        let deadline_hit = Arc::new(AtomicBool::new(false));
        let watchdog = self.deadline.map(|deadline| {
            let cancel = self.cancel.clone();
            let done = self.ctx.queue.shutdown_token();
            let deadline_hit = Arc::clone(&deadline_hit);
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(deadline) => {
                        tracing::warn!("Crawl deadline of {:?} reached, stopping workers", deadline);
                        deadline_hit.store(true, Ordering::SeqCst);
                        cancel.cancel();
                    }
                    _ = done.cancelled() => {}
                }
            })
        });

        let mut workers = JoinSet::new();
        for id in 0..self.workers {
            let ctx = Arc::clone(&self.ctx);
            workers.spawn(ctx.work(id));
        }

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }

        let completion = if self.ctx.queue.phase() == CrawlPhase::Done {
            Completion::Completed
        } else if deadline_hit.load(Ordering::SeqCst) {
            Completion::DeadlineExceeded
        } else {
            Completion::Cancelled
        };

        let report = self.ctx.stats.report(
            self.ctx.registry.len(Partition::InSite),
            self.ctx.registry.len(Partition::OutSite),
            start.elapsed(),
            completion,
        );

        tracing::info!(
            "Crawl {}: {} in-site and {} out-site links in {:?}",
            completion,
            report.insite_links,
            report.outsite_links,
            report.elapsed
        );

        report
    }
}

impl CrawlContext {
    /// Worker loop: take a URL, process it, release it
    async fn work(self: Arc<Self>, id: usize) {
        tracing::trace!(worker = id, "Worker started");

        while let Some(lease) = self.queue.pop().await {
            let Some(state) = self.process(lease.item()).await else {
                tracing::debug!(url = %lease.item().url, "Fetch interrupted by shutdown");
                break;
            };
            debug_assert!(UrlState::Fetching.can_transition_to(state));
            tracing::trace!(url = %lease.item().url, %state, "Processed");

            self.stats.record_state(state);
            drop(lease);
            self.log_progress();
        }

        tracing::trace!(worker = id, "Worker stopped");
    }

    /// Fetches one URL and classifies the outcome
    ///
    /// Returns `None` when the crawl was stopped before the fetch finished.
    async fn process(&self, item: &QueuedUrl) -> Option<UrlState> {
        let shutdown = self.queue.shutdown_token();
        let outcome = tokio::select! {
            outcome = self.fetcher.fetch(&item.url) => outcome,
            _ = shutdown.cancelled() => return None,
        };

        Some(self.classify(item, outcome).await)
    }

    async fn classify(&self, item: &QueuedUrl, outcome: FetchOutcome) -> UrlState {
        let url = &item.url;

        match outcome {
            FetchOutcome::Success(page) => {
                self.stats.record_response(page.status);

                let detail = if page.final_url == *url {
                    page.status_line()
                } else {
                    format!("{} (redirected to {})", page.status_line(), page.final_url)
                };
                self.sink.record(&CrawlEvent::info(url.as_str(), detail));

                // Off-host redirect targets are logged but never scanned
                if host_key(&page.final_url).as_deref() == Some(self.target_host.as_str()) {
                    self.scan(&page, url);
                }

                if self.is_target(url) {
                    UrlState::ClassifiedInSite
                } else {
                    UrlState::ClassifiedOutSite
                }
            }

            FetchOutcome::ClientError { cause } => {
                self.stats.record_client_error();
                self.sink.record(&CrawlEvent::error(url.as_str(), cause));
                UrlState::Errored
            }

            FetchOutcome::ProtocolError { cause } => {
                self.stats.record_protocol_error();
                self.sink.record(&CrawlEvent::error(url.as_str(), cause));
                UrlState::Errored
            }

            FetchOutcome::Timeout { cause } => self.handle_timeout(item, cause).await,
        }
    }

    /// Re-enqueues a timed-out URL, or gives up once the retry ceiling is reached
    ///
    /// The re-enqueue happens while the caller still holds the URL's lease, so
    /// the crawl cannot finish in between.
    async fn handle_timeout(&self, item: &QueuedUrl, cause: String) -> UrlState {
        let url = item.url.as_str();

        if !self.retry.allows(item.attempt) {
            self.stats.record_timeout(false);
            self.sink.record(&CrawlEvent::error(
                url,
                format!("{}. giving up after {} attempts", cause, item.attempt + 1),
            ));
            return UrlState::Errored;
        }

        self.stats.record_timeout(true);
        self.sink
            .record(&CrawlEvent::retry(url, format!("{}. retry later", cause)));

        let delay = self.retry.delay(item.attempt + 1);
        if !delay.is_zero() {
            let shutdown = self.queue.shutdown_token();
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.cancelled() => {}
            }
        }

        self.queue.push(item.next_attempt());
        UrlState::RetryQueued
    }

    /// Extracts links from a same-host page and enqueues the new ones
    fn scan(&self, page: &FetchedPage, source: &Url) {
        let Some(markup) = decode(&page.meta, &page.body) else {
            return;
        };
        self.stats.record_scan();

        for href in self.extractor.extract(&markup) {
            let Some(link) = normalize_link(
                &href,
                &page.final_url,
                &self.target_host,
                &self.default_scheme,
            ) else {
                continue;
            };

            if !self.registry.admit(link.partition(), link.url.as_str()) {
                continue;
            }

            let found = link.url.to_string();
            self.sink
                .record(&CrawlEvent::discovery(found.as_str(), source.as_str()));

            if self.queue.try_push(QueuedUrl::new(link.url)).is_err() {
                self.stats.record_dropped();
                self.sink
                    .record(&CrawlEvent::error(found, "queue full, link not checked"));
            }
        }
    }

    fn is_target(&self, url: &Url) -> bool {
        host_key(url).as_deref() == Some(self.target_host.as_str())
    }

    fn log_progress(&self) {
        let responses = self.stats.responses();
        if responses > 0 && responses % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                "Progress: {} responses, {} pending, {} in flight, {} in-site / {} out-site links",
                responses,
                self.queue.pending(),
                self.queue.in_flight(),
                self.registry.len(Partition::InSite),
                self.registry.len(Partition::OutSite)
            );
        }
    }
}

/// Runs a complete crawl with the given configuration and event sink
///
/// # Example
///
/// ```no_run
/// use linkprobe::config::Config;
/// use linkprobe::crawler::run_crawl;
/// use linkprobe::output::MemorySink;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), linkprobe::ProbeError> {
/// let sink = Arc::new(MemorySink::new());
/// let report = run_crawl(&Config::default(), sink.clone()).await?;
/// println!("{} in-site links", report.insite_links);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config, sink: Arc<dyn EventSink>) -> Result<CrawlReport, ProbeError> {
    let coordinator = Coordinator::new(config, sink)?;
    Ok(coordinator.run().await)
}
