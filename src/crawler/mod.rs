//! Crawler module for link fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with timeout classification
//! - Body decompression and charset decoding
//! - Link extraction from markup
//! - The shared work queue and its completion detection
//! - Overall crawl coordination

mod coordinator;
mod decoder;
mod extractor;
mod fetcher;
mod queue;

pub use coordinator::{resolve_target, run_crawl, Coordinator, RetryPolicy};
pub use decoder::{decode, ContentMeta, MARKUP_TYPES};
pub use extractor::{build_extractor, HtmlExtractor, LinkExtractor, PatternExtractor};
pub use fetcher::{build_http_client, FetchOutcome, FetchedPage, Fetcher};
pub use queue::{Lease, QueuedUrl, WorkQueue};

pub use crate::output::CrawlReport;
