use serde::Deserialize;
use std::time::Duration;

/// Default user agent: a mobile Safari string tagged as Googlebot, so sites
/// that serve bots different markup are checked as crawlers see them.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 8_3 like Mac OS X) \
     AppleWebKit/600.1.4 (KHTML, like Gecko) Version/8.0 Mobile/12F70 Safari/600.1.4 \
     (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

/// Main configuration structure for Linkprobe
///
/// Every section is optional in the TOML file; missing keys take the defaults
/// the command line uses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Which link extractor scans decoded markup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    /// Textual `href="..."` / `href='...'` pattern
    #[default]
    Pattern,
    /// Structural HTML parse
    Html,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Host (optionally `host:port`, or a full URL) of the site to check
    #[serde(rename = "target-host")]
    pub target_host: String,

    /// Number of concurrent workers
    pub workers: u32,

    /// End-to-end timeout for a single fetch (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Maximum number of re-enqueues after a timeout
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Ignore `max-retries` and retry timeouts indefinitely
    #[serde(rename = "retry-forever")]
    pub retry_forever: bool,

    /// Base delay before a timed-out URL is re-enqueued (milliseconds)
    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,

    /// Optional wall-clock limit for the whole crawl (seconds)
    #[serde(rename = "deadline-secs")]
    pub deadline_secs: Option<u64>,

    /// Optional bound on pending URLs
    #[serde(rename = "max-queue-depth")]
    pub max_queue_depth: Option<usize>,

    /// Scheme given to links that carry none
    #[serde(rename = "default-scheme")]
    pub default_scheme: String,

    #[serde(rename = "link-extractor")]
    pub link_extractor: ExtractorKind,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            target_host: "m.sohu.com".to_string(),
            workers: 100,
            timeout_secs: 100,
            max_retries: 3,
            retry_forever: false,
            retry_backoff_ms: 1000,
            deadline_secs: None,
            max_queue_depth: None,
            default_scheme: "http".to_string(),
            link_extractor: ExtractorKind::Pattern,
        }
    }
}

impl CrawlerConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    /// Retry ceiling, `None` when timeouts are retried indefinitely
    pub fn retry_limit(&self) -> Option<u32> {
        if self.retry_forever {
            None
        } else {
            Some(self.max_retries)
        }
    }
}

/// User agent configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Full `User-Agent` header value
    pub value: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            value: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the error/info/links log files
    #[serde(rename = "log-dir")]
    pub log_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_dir: ".".to_string(),
        }
    }
}
