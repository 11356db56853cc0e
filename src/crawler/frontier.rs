//! Frontier: the crawl work queue and its deduplication sets
//!
//! This module handles:
//! - FIFO ordering of pending URLs (breadth-first traversal)
//! - The visited and queued sets that guarantee termination on cyclic link graphs
//! - The page cap
//! - Blocking dequeue for a pool of workers
//!
//! Membership checks and insertions happen under a single lock, so two workers can
//! never both win the right to fetch the same URL.

use crate::url::CanonicalUrl;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

/// Result of a non-blocking dequeue attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dequeue {
    /// A URL to fetch; it is now in the visited set
    Ready(CanonicalUrl),
    /// The queue is empty but in-flight pages may still enqueue links
    Pending,
    /// Nothing queued and nothing in flight
    Exhausted,
    /// The page cap has been reached
    CapReached,
}

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<CanonicalUrl>,
    queued: HashSet<CanonicalUrl>,
    visited: HashSet<CanonicalUrl>,
    in_flight: usize,
    dispatched: u32,
}

/// The crawl frontier
///
/// Owned by one crawl run; a fresh run starts with empty sets.
#[derive(Debug)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    notify: Notify,
    max_pages: Option<u32>,
}

impl Frontier {
    /// Creates an empty frontier with an optional page cap
    pub fn new(max_pages: Option<u32>) -> Self {
        Self {
            state: Mutex::new(FrontierState::default()),
            notify: Notify::new(),
            max_pages,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a URL to the back of the queue
    ///
    /// Returns false (and does nothing) if the URL was already visited or is
    /// already waiting in the queue.
    pub fn enqueue(&self, url: CanonicalUrl) -> bool {
        let added = {
            let mut state = self.lock();
            if state.visited.contains(&url) || state.queued.contains(&url) {
                false
            } else {
                state.queued.insert(url.clone());
                state.queue.push_back(url);
                true
            }
        };

        if added {
            self.notify.notify_waiters();
        }
        added
    }

    /// Pops the next URL without waiting
    ///
    /// A popped URL moves from the queued set to the visited set and counts as
    /// in flight until [`Frontier::complete`] is called.
    pub fn try_next(&self) -> Dequeue {
        let mut state = self.lock();

        if let Some(cap) = self.max_pages {
            if state.dispatched >= cap {
                return Dequeue::CapReached;
            }
        }

        match state.queue.pop_front() {
            Some(url) => {
                state.queued.remove(&url);
                state.visited.insert(url.clone());
                state.in_flight += 1;
                state.dispatched += 1;
                Dequeue::Ready(url)
            }
            None if state.in_flight > 0 => Dequeue::Pending,
            None => Dequeue::Exhausted,
        }
    }

    /// Waits for the next URL to fetch
    ///
    /// Returns `None` once the page cap is reached, or once the queue is empty with
    /// no page in flight that could still enqueue links.
    pub async fn next(&self) -> Option<CanonicalUrl> {
        loop {
            // Register interest before checking so a wakeup between the check
            // and the await is not lost
            let notified = self.notify.notified();

            match self.try_next() {
                Dequeue::Ready(url) => return Some(url),
                Dequeue::Pending => notified.await,
                Dequeue::Exhausted | Dequeue::CapReached => {
                    self.notify.notify_waiters();
                    return None;
                }
            }
        }
    }

    /// Marks one in-flight page as finished
    pub fn complete(&self) {
        {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.notify.notify_waiters();
    }

    /// Returns true if the URL has already been dequeued
    pub fn is_visited(&self, url: &CanonicalUrl) -> bool {
        self.lock().visited.contains(url)
    }

    /// Returns true if the URL is waiting in the queue
    pub fn is_queued(&self, url: &CanonicalUrl) -> bool {
        self.lock().queued.contains(url)
    }

    /// Number of URLs dequeued so far
    pub fn visited_count(&self) -> usize {
        self.lock().visited.len()
    }

    /// Number of URLs waiting in the queue
    pub fn queued_count(&self) -> usize {
        self.lock().queue.len()
    }

    /// Returns true if the page cap has been reached
    pub fn cap_reached(&self) -> bool {
        match self.max_pages {
            Some(cap) => self.lock().dispatched >= cap,
            None => false,
        }
    }
}
