//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `VisitedRegistry`: The two-partition set deciding which URLs get checked
//! - `UrlState`: The lifecycle of a single URL (discovered, queued, fetching, classified, ...)
//! - `CrawlPhase`: The lifecycle of the crawl as a whole

mod registry;
mod url_state;

// Re-export main types
pub use registry::{Partition, VisitedRegistry};
pub use url_state::{CrawlPhase, UrlState};
