/// Lifecycle definitions for URLs and for the crawl as a whole
use std::fmt;

/// Represents where a single URL is in its lifecycle
///
/// `Discovered → Queued → Fetching → {ClassifiedInSite | ClassifiedOutSite | Errored | RetryQueued}`;
/// a `RetryQueued` URL goes back to `Queued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlState {
    // ===== Active States =====
    /// Link found on a page and admitted to the registry
    Discovered,

    /// Waiting in the work queue
    Queued,

    /// Held by a worker
    Fetching,

    /// Timed out; put back on the queue for another attempt
    RetryQueued,

    // ===== Terminal States =====
    /// Fetched; the URL is on the target host
    ClassifiedInSite,

    /// Fetched; the URL is on another host
    ClassifiedOutSite,

    /// Transport or protocol failure, or retries exhausted
    Errored,
}

impl UrlState {
    /// Returns true if no further processing will happen for this URL
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ClassifiedInSite | Self::ClassifiedOutSite | Self::Errored
        )
    }

    /// Returns the state that follows this one when nothing goes wrong,
    /// or `None` for terminal states
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Discovered => Some(Self::Queued),
            Self::Queued => Some(Self::Fetching),
            Self::RetryQueued => Some(Self::Queued),
            Self::Fetching => None,
            Self::ClassifiedInSite | Self::ClassifiedOutSite | Self::Errored => None,
        }
    }

    /// Returns whether `to` is a legal successor of this state
    pub fn can_transition_to(&self, to: UrlState) -> bool {
        match self {
            Self::Fetching => matches!(
                to,
                Self::ClassifiedInSite | Self::ClassifiedOutSite | Self::Errored | Self::RetryQueued
            ),
            other => other.next() == Some(to),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::RetryQueued => "retry_queued",
            Self::ClassifiedInSite => "in_site",
            Self::ClassifiedOutSite => "out_site",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents the phase of the crawl as a whole
///
/// `Seeded → Running → Draining → Done`. `Draining` falls back to `Running`
/// when an in-flight page produces new work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Root URL enqueued, workers not started
    Seeded,

    /// Workers pulling from a non-empty queue
    Running,

    /// Queue observed empty while some URLs are still in flight
    Draining,

    /// Queue empty and nothing in flight; workers stop
    Done,
}

impl CrawlPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seeded => "seeded",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
