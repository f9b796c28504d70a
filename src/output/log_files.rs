//! Line-oriented log files for crawl events
//!
//! A run writes three files into the log directory, named after the target
//! host, the category and the run's start time:
//!
//! - `<host>-error-<YYYY-MM-DD_HH-MM>.log`: transport/protocol failures
//! - `<host>-info-<YYYY-MM-DD_HH-MM>.log`: every HTTP response and every retry
//! - `<host>-links-<YYYY-MM-DD_HH-MM>.log`: every newly admitted link
//!
//! Each line reads `<timestamp> - <LEVEL> - <url> - <detail>`.

use crate::output::events::{CrawlEvent, EventCategory, EventSink};
use crate::ProbeError;
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const FILE_TIMESTAMP: &str = "%Y-%m-%d_%H-%M";
const LINE_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Paths of the three files a [`LogFileSink`] writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaths {
    pub error: PathBuf,
    pub info: PathBuf,
    pub links: PathBuf,
}

impl LogPaths {
    /// Computes the file paths for a run
    ///
    /// `:` in the host (from an explicit port) becomes `_` so the names are
    /// valid on every platform.
    pub fn new(dir: &Path, host: &str, started_at: &DateTime<Local>) -> Self {
        let host = host.replace(':', "_");
        let stamp = started_at.format(FILE_TIMESTAMP).to_string();
        let path = |category: &str| dir.join(format!("{}-{}-{}.log", host, category, stamp));

        Self {
            error: path("error"),
            info: path("info"),
            links: path("links"),
        }
    }
}

/// Event sink appending to the per-category log files
///
/// Every event is also mirrored to `tracing`, so the console shows the same
/// stream the files receive.
pub struct LogFileSink {
    error: Mutex<LineWriter<File>>,
    info: Mutex<LineWriter<File>>,
    links: Mutex<LineWriter<File>>,
    paths: LogPaths,
}

impl LogFileSink {
    /// Opens the log files for a run starting now
    pub fn create(dir: &Path, host: &str) -> Result<Self, ProbeError> {
        Self::create_at(dir, host, &Local::now())
    }

    /// Opens the log files for a run started at `started_at`
    pub fn create_at(dir: &Path, host: &str, started_at: &DateTime<Local>) -> Result<Self, ProbeError> {
        std::fs::create_dir_all(dir).map_err(|source| ProbeError::EventLog {
            path: dir.display().to_string(),
            source,
        })?;

        let paths = LogPaths::new(dir, host, started_at);

        Ok(Self {
            error: Mutex::new(open_log(&paths.error)?),
            info: Mutex::new(open_log(&paths.info)?),
            links: Mutex::new(open_log(&paths.links)?),
            paths,
        })
    }

    pub fn paths(&self) -> &LogPaths {
        &self.paths
    }

    fn writer(&self, category: EventCategory) -> &Mutex<LineWriter<File>> {
        match category {
            EventCategory::Error => &self.error,
            EventCategory::Info | EventCategory::Retry => &self.info,
            EventCategory::Discovery => &self.links,
        }
    }
}

impl EventSink for LogFileSink {
    fn record(&self, event: &CrawlEvent) {
        match event.category {
            EventCategory::Error => tracing::error!(url = %event.url, "{}", event.detail),
            EventCategory::Info | EventCategory::Retry => {
                tracing::info!(url = %event.url, "{}", event.detail)
            }
            EventCategory::Discovery => tracing::debug!(url = %event.url, "{}", event.detail),
        }

        let line = format!(
            "{} - {} - {} - {}\n",
            Local::now().format(LINE_TIMESTAMP),
            event.category.level(),
            event.url,
            event.detail
        );

        let mut writer = self
            .writer(event.category)
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writer.write_all(line.as_bytes()) {
            tracing::warn!("Failed to write {} event for {}: {}", event.category, event.url, e);
        }
    }
}

fn open_log(path: &Path) -> Result<LineWriter<File>, ProbeError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(LineWriter::new)
        .map_err(|source| ProbeError::EventLog {
            path: path.display().to_string(),
            source,
        })
}
