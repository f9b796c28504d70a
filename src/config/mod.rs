//! Configuration module for Linkprobe
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so the crawler also runs from command-line flags alone.
//!
//! # Example
//!
//! ```no_run
//! use linkprobe::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("linkprobe.toml")).unwrap();
//! println!("Checking {} with {} workers", config.crawler.target_host, config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, ExtractorKind, OutputConfig, UserAgentConfig, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
