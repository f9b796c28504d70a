//! Output module for crawl results
//!
//! This module handles:
//! - The event sink the crawler reports every outcome through
//! - Per-category log files for operator review
//! - Crawl statistics and the final report

mod events;
mod log_files;
pub mod stats;

pub use events::{CrawlEvent, EventCategory, EventSink, MemorySink};
pub use log_files::{LogFileSink, LogPaths};
pub use stats::{print_report, Completion, CrawlReport, CrawlStats};
