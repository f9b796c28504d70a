use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// The two disjoint halves of the visited registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// URLs on the crawled host; fetched and scanned for links
    InSite,
    /// URLs on any other host; fetched once, never scanned
    OutSite,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InSite => "insite",
            Self::OutSite => "outsite",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thread-safe record of every URL admitted during a crawl
///
/// Each partition has its own lock, so admissions to different partitions never
/// contend. The lock is held only for the check-then-insert step. Entries are
/// never removed and the sets are never iterated.
#[derive(Debug, Default)]
pub struct VisitedRegistry {
    insite: Mutex<HashSet<String>>,
    outsite: Mutex<HashSet<String>>,
}

impl VisitedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a URL into a partition
    ///
    /// # Returns
    ///
    /// * `true` - This call is the first admission of `url` into `partition`
    /// * `false` - The URL was already admitted
    pub fn admit(&self, partition: Partition, url: &str) -> bool {
        let mut set = self.lock(partition);
        if set.contains(url) {
            return false;
        }
        set.insert(url.to_string())
    }

    /// Returns whether a URL has been admitted into a partition
    pub fn contains(&self, partition: Partition, url: &str) -> bool {
        self.lock(partition).contains(url)
    }

    /// Returns the number of URLs admitted into a partition
    pub fn len(&self, partition: Partition) -> usize {
        self.lock(partition).len()
    }

    fn lock(&self, partition: Partition) -> MutexGuard<'_, HashSet<String>> {
        let mutex = match partition {
            Partition::InSite => &self.insite,
            Partition::OutSite => &self.outsite,
        };
        // A panic elsewhere cannot leave a HashSet half-inserted
        mutex.lock().unwrap_or_else(|e| e.into_inner())
    }
}
