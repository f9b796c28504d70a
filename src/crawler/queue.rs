//! Work queue shared by the crawl workers
//!
//! This module handles:
//! - A multi-producer/multi-consumer FIFO of URLs waiting to be fetched
//! - Tracking how many URLs are in flight (taken by a worker, not yet finished)
//! - Detecting completion: empty queue and nothing in flight
//! - Waking every blocked worker once the crawl is done or cancelled
//!
//! Workers block in [`WorkQueue::pop`] instead of polling. A popped URL is
//! wrapped in a [`Lease`]; dropping the lease marks the URL finished. Because
//! new links and retries are pushed while the lease is still held, the queue
//! can never look finished while a page is about to produce more work.

use crate::state::CrawlPhase;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A URL waiting in the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedUrl {
    pub url: Url,

    /// Timeouts this URL has already suffered
    pub attempt: u32,
}

impl QueuedUrl {
    pub fn new(url: Url) -> Self {
        Self { url, attempt: 0 }
    }

    /// The same URL, scheduled for its next attempt
    pub fn next_attempt(&self) -> Self {
        Self {
            url: self.url.clone(),
            attempt: self.attempt + 1,
        }
    }
}

#[derive(Debug)]
struct QueueState {
    items: VecDeque<QueuedUrl>,
    in_flight: usize,
    phase: CrawlPhase,
}

/// Shared, growing queue of URLs with completion detection
#[derive(Debug)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    shutdown: CancellationToken,
    max_depth: Option<usize>,
}

impl WorkQueue {
    /// Creates an empty queue
    ///
    /// # Arguments
    ///
    /// * `max_depth` - Optional bound on pending items for [`WorkQueue::try_push`]
    /// * `shutdown` - Cancelled when the crawl is done; cancelling it from
    ///   outside stops the workers early
    pub fn new(max_depth: Option<usize>, shutdown: CancellationToken) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                in_flight: 0,
                phase: CrawlPhase::Seeded,
            }),
            notify: Notify::new(),
            shutdown,
            max_depth,
        }
    }

    /// Enqueues a URL regardless of the depth bound
    ///
    /// Used for the seed and for retries, which must never be lost.
    pub fn push(&self, item: QueuedUrl) {
        let mut state = self.lock();
        Self::enqueue(&mut state, item);
        drop(state);
        self.notify.notify_one();
    }

    /// Enqueues a URL unless the queue is at its depth bound
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The URL was enqueued
    /// * `Err(QueuedUrl)` - The queue is full; the item is handed back
    pub fn try_push(&self, item: QueuedUrl) -> Result<(), QueuedUrl> {
        let mut state = self.lock();
        if let Some(max) = self.max_depth {
            if state.items.len() >= max {
                return Err(item);
            }
        }
        Self::enqueue(&mut state, item);
        drop(state);
        self.notify.notify_one();
        Ok(())
    }

    /// Moves the queue from `Seeded` to `Running`
    pub fn start(&self) {
        let mut state = self.lock();
        if state.phase == CrawlPhase::Seeded {
            state.phase = CrawlPhase::Running;
        }
    }

    /// Waits for the next URL
    ///
    /// # Returns
    ///
    /// * `Some(Lease)` - A URL to process; it stays in flight until the lease drops
    /// * `None` - The crawl is done or was cancelled; the worker should exit
    pub async fn pop(&self) -> Option<Lease<'_>> {
        loop {
            {
                let mut state = self.lock();

                if self.shutdown.is_cancelled() {
                    return None;
                }

                if let Some(item) = state.items.pop_front() {
                    state.in_flight += 1;
                    let more = !state.items.is_empty();
                    drop(state);
                    // notify_one stores a single permit; pass the wakeup along
                    if more {
                        self.notify.notify_one();
                    }
                    return Some(Lease { queue: self, item });
                }

                if state.in_flight == 0 {
                    self.finish(&mut state);
                    return None;
                }

                if state.phase == CrawlPhase::Running {
                    tracing::debug!(in_flight = state.in_flight, "Queue empty, draining");
                    state.phase = CrawlPhase::Draining;
                }
            }

            tokio::select! {
                _ = self.notify.notified() => {}
                _ = self.shutdown.cancelled() => return None,
            }
        }
    }

    /// Current phase of the crawl
    pub fn phase(&self) -> CrawlPhase {
        self.lock().phase
    }

    /// Number of URLs waiting
    pub fn pending(&self) -> usize {
        self.lock().items.len()
    }

    /// Number of URLs held by workers
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Token cancelled when the queue finishes
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn enqueue(state: &mut QueueState, item: QueuedUrl) {
        state.items.push_back(item);
        if state.phase == CrawlPhase::Draining {
            state.phase = CrawlPhase::Running;
        }
    }

    fn complete(&self) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        // A cancelled crawl stops early; it never counts as drained
        if state.items.is_empty() && state.in_flight == 0 && !self.shutdown.is_cancelled() {
            self.finish(&mut state);
        }
    }

    fn finish(&self, state: &mut QueueState) {
        if state.phase != CrawlPhase::Done {
            tracing::debug!("Queue drained with nothing in flight");
            state.phase = CrawlPhase::Done;
        }
        self.shutdown.cancel();
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A URL taken from the queue
///
/// The URL counts as in flight until the lease is dropped, including when the
/// worker holding it panics.
#[derive(Debug)]
pub struct Lease<'a> {
    queue: &'a WorkQueue,
    item: QueuedUrl,
}

impl Lease<'_> {
    pub fn item(&self) -> &QueuedUrl {
        &self.item
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        self.queue.complete();
    }
}
