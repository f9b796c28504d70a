//! Crawl statistics and the final report
//!
//! Workers update [`CrawlStats`] with relaxed atomic increments; once the pool
//! has stopped, the coordinator folds the counters and the registry sizes into a
//! [`CrawlReport`].

use crate::state::UrlState;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// How a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The queue drained with nothing in flight
    Completed,
    /// The configured deadline passed first
    DeadlineExceeded,
    /// The crawl was cancelled from outside (e.g. Ctrl-C)
    Cancelled,
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Completed => "completed",
            Self::DeadlineExceeded => "deadline exceeded",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Live counters shared by all workers
#[derive(Debug, Default)]
pub struct CrawlStats {
    responses: AtomicUsize,
    error_responses: AtomicUsize,
    pages_scanned: AtomicUsize,
    client_errors: AtomicUsize,
    protocol_errors: AtomicUsize,
    timeouts: AtomicUsize,
    retries: AtomicUsize,
    abandoned: AtomicUsize,
    dropped: AtomicUsize,
    checked_insite: AtomicUsize,
    checked_outsite: AtomicUsize,
    errored: AtomicUsize,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an HTTP response; statuses of 400 and above count as dead links
    pub fn record_response(&self, status: u16) {
        self.responses.fetch_add(1, Ordering::Relaxed);
        if status >= 400 {
            self.error_responses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a page whose markup was scanned for links
    pub fn record_scan(&self) {
        self.pages_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_client_error(&self) {
        self.client_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a timeout and whether it was retried or abandoned
    pub fn record_timeout(&self, retried: bool) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        if retried {
            self.retries.fetch_add(1, Ordering::Relaxed);
        } else {
            self.abandoned.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records an admitted link that could not be enqueued
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records the state a URL ended its processing step in
    pub fn record_state(&self, state: UrlState) {
        let counter = match state {
            UrlState::ClassifiedInSite => &self.checked_insite,
            UrlState::ClassifiedOutSite => &self.checked_outsite,
            UrlState::Errored => &self.errored,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn responses(&self) -> usize {
        self.responses.load(Ordering::Relaxed)
    }

    /// Builds the final report
    ///
    /// # Arguments
    ///
    /// * `insite_links` / `outsite_links` - Final registry partition sizes
    /// * `elapsed` - Wall-clock duration of the crawl
    /// * `completion` - How the crawl ended
    pub fn report(
        &self,
        insite_links: usize,
        outsite_links: usize,
        elapsed: Duration,
        completion: Completion,
    ) -> CrawlReport {
        let load = |counter: &AtomicUsize| counter.load(Ordering::Relaxed);

        CrawlReport {
            insite_links,
            outsite_links,
            responses: load(&self.responses),
            error_responses: load(&self.error_responses),
            pages_scanned: load(&self.pages_scanned),
            client_errors: load(&self.client_errors),
            protocol_errors: load(&self.protocol_errors),
            timeouts: load(&self.timeouts),
            retries: load(&self.retries),
            abandoned: load(&self.abandoned),
            dropped: load(&self.dropped),
            checked_insite: load(&self.checked_insite),
            checked_outsite: load(&self.checked_outsite),
            errored: load(&self.errored),
            elapsed,
            completion,
        }
    }
}

/// Final counts of a crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    /// Size of the in-site partition (root included)
    pub insite_links: usize,

    /// Size of the out-site partition
    pub outsite_links: usize,

    /// HTTP responses received, any status
    pub responses: usize,

    /// Responses with status 400 or above
    pub error_responses: usize,

    /// Same-host markup pages scanned for links
    pub pages_scanned: usize,

    pub client_errors: usize,
    pub protocol_errors: usize,
    pub timeouts: usize,
    pub retries: usize,

    /// URLs given up on after exhausting their retries
    pub abandoned: usize,

    /// Admitted links not enqueued because the queue was full
    pub dropped: usize,

    pub checked_insite: usize,
    pub checked_outsite: usize,
    pub errored: usize,

    pub elapsed: Duration,
    pub completion: Completion,
}

impl CrawlReport {
    /// Number of links that were reported as dead or unreachable
    pub fn dead_links(&self) -> usize {
        self.error_responses + self.errored
    }
}

/// Prints the report to stdout in a formatted manner
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ({}) ===\n", report.completion);

    println!("Links:");
    println!("  In-site:  {}", report.insite_links);
    println!("  Out-site: {}", report.outsite_links);
    println!();

    println!("Fetches:");
    println!("  Responses:          {}", report.responses);
    println!("  Error statuses:     {}", report.error_responses);
    println!("  Pages scanned:      {}", report.pages_scanned);
    println!("  Transport errors:   {}", report.client_errors);
    println!("  Protocol errors:    {}", report.protocol_errors);
    println!(
        "  Timeouts:           {} ({} retried, {} abandoned)",
        report.timeouts, report.retries, report.abandoned
    );
    if report.dropped > 0 {
        println!("  Dropped (queue full): {}", report.dropped);
    }
    println!();

    let rate = if report.elapsed.as_secs_f64() > 0.0 {
        report.responses as f64 / report.elapsed.as_secs_f64()
    } else {
        0.0
    };

    println!(
        "Dead links: {} | Elapsed: {:.1}s ({:.2} responses/sec)",
        report.dead_links(),
        report.elapsed.as_secs_f64(),
        rate
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_reflects_counters() {
        let stats = CrawlStats::new();
        stats.record_response(200);
        stats.record_response(404);
        stats.record_response(503);
        stats.record_scan();
        stats.record_client_error();
        stats.record_timeout(true);
        stats.record_timeout(false);
        stats.record_dropped();
        stats.record_state(UrlState::ClassifiedInSite);
        stats.record_state(UrlState::ClassifiedOutSite);
        stats.record_state(UrlState::Errored);
        stats.record_state(UrlState::RetryQueued);

        let report = stats.report(5, 3, Duration::from_secs(2), Completion::Completed);

        assert_eq!(report.insite_links, 5);
        assert_eq!(report.outsite_links, 3);
        assert_eq!(report.responses, 3);
        assert_eq!(report.error_responses, 2);
        assert_eq!(report.pages_scanned, 1);
        assert_eq!(report.client_errors, 1);
        assert_eq!(report.timeouts, 2);
        assert_eq!(report.retries, 1);
        assert_eq!(report.abandoned, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.checked_insite, 1);
        assert_eq!(report.checked_outsite, 1);
        assert_eq!(report.errored, 1);
        assert_eq!(report.dead_links(), 3);
    }

    #[test]
    fn test_completion_display() {
        assert_eq!(Completion::Completed.to_string(), "completed");
        assert_eq!(Completion::DeadlineExceeded.to_string(), "deadline exceeded");
    }
}
