//! Rate-limited, deduplicating work queue
//!
//! Items are held in three places:
//! - `queue`: FIFO of items waiting to be handed out
//! - `dirty`: every item that needs processing (everything in `queue`, plus
//!   items re-added while being processed)
//! - `processing`: items handed out by `get` and not yet marked `done`
//!
//! An item is never in `queue` twice and never handed out while it is still
//! processing, so a key is reconciled by at most one consumer at a time.
//! Re-adding an item that is processing parks it in `dirty`; `done` puts it
//! back on the queue.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;

/// Exponential per-item failure backoff
#[derive(Clone, Debug)]
pub struct BackoffConfig {
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for each subsequent retry
    pub multiplier: f64,
    /// Random jitter factor (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_secs(1000),
            multiplier: 2.0,
            jitter: 0.0,
        }
    }
}

impl BackoffConfig {
    /// Calculate the backoff delay for a given retry attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let max_secs = self.max_delay.as_secs_f64();
        // Capped before jitter so overflow to infinity never reaches it.
        let base_delay_secs =
            (self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent)).min(max_secs);

        let jitter_range = base_delay_secs * self.jitter;
        let jitter = if jitter_range > 0.0 {
            rand::random::<f64>() * jitter_range * 2.0 - jitter_range
        } else {
            0.0
        };
        let delay_with_jitter = (base_delay_secs + jitter).max(0.0);

        let capped_delay = delay_with_jitter.min(max_secs);

        Duration::from_secs_f64(capped_delay)
    }
}

struct State<T> {
    queue: VecDeque<T>,
    dirty: HashSet<T>,
    processing: HashSet<T>,
    failures: HashMap<T, u32>,
    shutting_down: bool,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    notify: Notify,
    backoff: BackoffConfig,
}

/// Work queue shared between producers (watcher, delayed re-adds) and
/// consumers (workers). Cloning yields another handle to the same queue.
pub struct WorkQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for WorkQueue<T>
where
    T: Clone + Eq + Hash + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

impl<T> WorkQueue<T>
where
    T: Clone + Eq + Hash + Send + Sync + 'static,
{
    pub fn new(backoff: BackoffConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    dirty: HashSet::new(),
                    processing: HashSet::new(),
                    failures: HashMap::new(),
                    shutting_down: false,
                }),
                notify: Notify::new(),
                backoff,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        // State stays consistent across a panicking holder: every mutation
        // completes before the guard is dropped.
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `item` as needing processing; duplicates coalesce
    pub fn add(&self, item: T) {
        let mut state = self.lock();
        if state.shutting_down || state.dirty.contains(&item) {
            return;
        }
        state.dirty.insert(item.clone());
        if state.processing.contains(&item) {
            return;
        }
        state.queue.push_back(item);
        drop(state);
        self.inner.notify.notify_one();
    }

    /// Add `item` once `delay` has passed
    pub fn add_after(&self, item: T, delay: Duration) {
        if self.is_shutting_down() {
            return;
        }
        if delay.is_zero() {
            self.add(item);
            return;
        }
        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(item);
        });
    }

    /// Re-add `item` after its failure backoff and count the requeue
    pub fn add_rate_limited(&self, item: T) {
        let delay = {
            let mut state = self.lock();
            let failures = state.failures.entry(item.clone()).or_insert(0);
            let attempt = *failures;
            *failures = failures.saturating_add(1);
            self.inner.backoff.delay_for_attempt(attempt)
        };
        self.add_after(item, delay);
    }

    /// Clear the failure history of `item`
    pub fn forget(&self, item: &T) {
        self.lock().failures.remove(item);
    }

    /// Number of times `item` has been re-added through `add_rate_limited`
    /// since it was last forgotten
    pub fn num_requeues(&self, item: &T) -> u32 {
        self.lock().failures.get(item).copied().unwrap_or(0)
    }

    /// Wait for the next item. Returns `None` once the queue is shutting
    /// down; items still queued at that point are not handed out.
    pub async fn get(&self) -> Option<T> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before inspecting state so a concurrent add or shutdown
            // cannot slip between the check and the wait.
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.shutting_down {
                    return None;
                }
                if let Some(item) = state.queue.pop_front() {
                    state.dirty.remove(&item);
                    state.processing.insert(item.clone());
                    return Some(item);
                }
            }

            notified.await;
        }
    }

    /// Finish processing `item`; requeues it if it was re-added meanwhile
    pub fn done(&self, item: &T) {
        let mut state = self.lock();
        state.processing.remove(item);
        if state.dirty.contains(item) {
            state.queue.push_back(item.clone());
            drop(state);
            self.inner.notify.notify_one();
        }
    }

    /// Stop handing out items and wake every waiting consumer
    pub fn shut_down(&self) {
        self.lock().shutting_down = true;
        self.inner.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.lock().shutting_down
    }

    /// Number of items waiting to be handed out
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
