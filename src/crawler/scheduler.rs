//! Scheduler for dispatching due crawl work
//!
//! This module handles:
//! - The frontier of due packages or persons, earliest schedule first
//! - Global concurrency limiting via a semaphore
//! - The run deadline, after which nothing new is dispatched
//!
//! Work that is already running when the deadline passes is never aborted;
//! the deadline only governs dispatching.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// A package path or person id queued for crawling
#[derive(Debug, Clone)]
pub struct QueuedItem {
    /// Import path or `site:username`
    pub key: String,

    /// When the item became due
    pub schedule_time: DateTime<Utc>,

    /// Etag to send with a conditional fetch (empty for a full fetch)
    pub etag: String,
}

impl QueuedItem {
    pub fn new(key: impl Into<String>, schedule_time: DateTime<Utc>, etag: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            schedule_time,
            etag: etag.into(),
        }
    }
}

// BinaryHeap is a max-heap: the earliest schedule time must compare greatest
impl Ord for QueuedItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .schedule_time
            .cmp(&self.schedule_time)
            .then_with(|| other.key.cmp(&self.key))
    }
}

impl PartialOrd for QueuedItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedItem {
    fn eq(&self, other: &Self) -> bool {
        self.schedule_time == other.schedule_time && self.key == other.key
    }
}

impl Eq for QueuedItem {}

/// A dispatched item holding its concurrency permit
///
/// The permit is released when this value (or the permit moved out of it)
/// is dropped.
pub struct ScheduledCrawl {
    pub item: QueuedItem,
    pub permit: OwnedSemaphorePermit,
}

/// Frontier plus the concurrency and deadline limits applied to it
pub struct Scheduler {
    /// Shared between the package and person schedulers of one run
    semaphore: Arc<Semaphore>,

    frontier: BinaryHeap<QueuedItem>,

    deadline: Instant,

    dispatched: usize,
}

impl Scheduler {
    /// Creates a scheduler drawing permits from an existing semaphore
    pub fn with_semaphore(
        semaphore: Arc<Semaphore>,
        deadline: Instant,
        initial: Vec<QueuedItem>,
    ) -> Self {
        Self {
            semaphore,
            frontier: BinaryHeap::from(initial),
            deadline,
            dispatched: 0,
        }
    }

    /// Gets the next item to crawl
    ///
    /// Waits for a concurrency permit, but never past the deadline.
    ///
    /// # Returns
    ///
    /// * `Some(ScheduledCrawl)` - An item that may be crawled now
    /// * `None` - The frontier is empty or the deadline has passed
    pub async fn next_item(&mut self) -> Option<ScheduledCrawl> {
        if self.frontier.is_empty() {
            return None;
        }
        if self.deadline_passed() {
            tracing::info!(
                "Run deadline reached, {} items left in frontier",
                self.frontier.len()
            );
            return None;
        }

        let acquire = self.semaphore.clone().acquire_owned();
        let permit = match tokio::time::timeout_at(self.deadline, acquire).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_closed)) => return None,
            Err(_elapsed) => {
                tracing::info!(
                    "Run deadline reached while waiting for a slot, {} items left in frontier",
                    self.frontier.len()
                );
                return None;
            }
        };

        let item = self.frontier.pop()?;
        self.dispatched += 1;
        tracing::trace!("Dispatching {}", item.key);
        Some(ScheduledCrawl { item, permit })
    }

    pub fn deadline_passed(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Returns the number of items in the frontier
    pub fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    /// Number of items handed out so far
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }
}
