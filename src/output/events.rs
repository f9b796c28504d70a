//! Crawl events and the sink trait the crawler reports them through

use std::fmt;
use std::sync::Mutex;

/// What kind of outcome an event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    /// An HTTP response, whatever its status code
    Info,
    /// A transport or protocol failure, or a link that will not be checked
    Error,
    /// A timed-out fetch that was put back on the queue
    Retry,
    /// A newly admitted link, tagged with the page it was found on
    Discovery,
}

impl EventCategory {
    /// Severity label written to the log files
    pub fn level(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Info | Self::Retry | Self::Discovery => "INFO",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Info => "info",
            Self::Error => "error",
            Self::Retry => "retry",
            Self::Discovery => "discovery",
        };
        f.write_str(name)
    }
}

/// A single classified outcome for a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlEvent {
    pub url: String,
    pub category: EventCategory,
    pub detail: String,
}

impl CrawlEvent {
    pub fn new(url: impl Into<String>, category: EventCategory, detail: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            category,
            detail: detail.into(),
        }
    }

    pub fn info(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(url, EventCategory::Info, detail)
    }

    pub fn error(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(url, EventCategory::Error, detail)
    }

    pub fn retry(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(url, EventCategory::Retry, detail)
    }

    /// A link admitted for checking, found on `source`
    pub fn discovery(url: impl Into<String>, source: &str) -> Self {
        Self::new(url, EventCategory::Discovery, format!("found on {}", source))
    }
}

impl fmt::Display for CrawlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.url, self.detail)
    }
}

/// Receives crawl events for recording
///
/// Implementations are shared by every worker and must not block for long;
/// `record` is called from inside the crawl loop.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &CrawlEvent);
}

/// Keeps every event in memory
///
/// Useful when embedding the crawler or inspecting a run from tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<CrawlEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all events recorded so far
    pub fn events(&self) -> Vec<CrawlEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Returns the events of one category
    pub fn by_category(&self, category: EventCategory) -> Vec<CrawlEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.category == category)
            .collect()
    }

    /// Returns the events recorded for one URL
    pub fn for_url(&self, url: &str) -> Vec<CrawlEvent> {
        self.events().into_iter().filter(|e| e.url == url).collect()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &CrawlEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}
