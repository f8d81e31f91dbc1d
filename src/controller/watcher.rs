//! Watch Database resources into a local cache and the work queue
//!
//! Every observed addition or change becomes an [`Event`] on the queue.
//! Deletions produce no event: deprovisioning is driven by the Update that
//! sets the deletion timestamp while the finalizer still holds the object.
//!
//! During a (re)list the reflector buffers objects and only swaps them into
//! the store at `InitDone`. Events from a list are held back until then, so
//! the worker never looks up a key the cache does not hold yet.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::Api;
use kube::runtime::reflector::{self, Store, store::Writer};
use kube::runtime::{WatchStreamExt, watcher};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::{Error, Result};
use super::event::{Event, ObjectKey};
use super::queue::WorkQueue;
use crate::crd::Database;

/// Read-only view of the watched Database resources
#[derive(Clone)]
pub struct ResourceCache {
    store: Store<Database>,
}

impl ResourceCache {
    pub fn new(store: Store<Database>) -> Self {
        Self { store }
    }

    pub fn get(&self, key: &ObjectKey) -> Option<Arc<Database>> {
        self.store.get(&key.object_ref())
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.get(key).is_some()
    }

    /// Keys of every cached resource
    pub fn keys(&self) -> Vec<ObjectKey> {
        let mut keys: Vec<ObjectKey> = self
            .store
            .state()
            .iter()
            .filter_map(|db| ObjectKey::from_resource(db))
            .collect();
        keys.sort();
        keys
    }

    /// Wait for the first complete list to land in the cache
    pub async fn wait_until_ready(&self) -> Result<()> {
        self.store
            .wait_until_ready()
            .await
            .map_err(|_| Error::CacheSyncFailed)
    }
}

/// Create an empty cache and the writer that fills it
pub fn cache() -> (ResourceCache, Writer<Database>) {
    let (store, writer) = reflector::store();
    (ResourceCache::new(store), writer)
}

/// Applies watch events to the cache and turns them into queue events
pub struct CacheWriter {
    writer: Writer<Database>,
    cache: ResourceCache,
    queue: WorkQueue<Event>,
    pending: Vec<Event>,
}

impl CacheWriter {
    pub fn new(writer: Writer<Database>, cache: ResourceCache, queue: WorkQueue<Event>) -> Self {
        Self {
            writer,
            cache,
            queue,
            pending: Vec::new(),
        }
    }

    /// Add when the key is new to the cache, Update otherwise. Objects
    /// without a name cannot be looked up again and are dropped.
    fn classify(&self, db: &Database) -> Option<Event> {
        let key = ObjectKey::from_resource(db)?;
        if self.cache.contains(&key) {
            Some(Event::update(key.clone(), key))
        } else {
            Some(Event::add(key))
        }
    }

    pub fn apply(&mut self, event: watcher::Event<Database>) {
        match &event {
            watcher::Event::Init => {
                debug!("Relisting Database resources");
                self.pending.clear();
            }
            watcher::Event::InitApply(db) => {
                if let Some(notification) = self.classify(db) {
                    self.pending.push(notification);
                }
            }
            watcher::Event::InitDone => {}
            watcher::Event::Apply(db) => {
                let notification = self.classify(db);
                self.writer.apply_watcher_event(&event);
                if let Some(notification) = notification {
                    debug!(event = %notification, "Enqueueing");
                    self.queue.add(notification);
                }
                return;
            }
            watcher::Event::Delete(db) => {
                debug!(name = ?db.metadata.name, "Database removed from cache");
            }
        }

        self.writer.apply_watcher_event(&event);

        if matches!(event, watcher::Event::InitDone) {
            debug!(count = self.pending.len(), "Cache synced");
            for notification in self.pending.drain(..) {
                self.queue.add(notification);
            }
        }
    }
}

/// Watch Database resources until `shutdown` fires or the stream ends
pub async fn run_watcher(
    api: Api<Database>,
    mut cache_writer: CacheWriter,
    shutdown: CancellationToken,
) {
    let stream = watcher(api, watcher::Config::default().any_semantic()).default_backoff();
    futures::pin_mut!(stream);

    info!("Watching Database resources");
    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = stream.next() => next,
        };
        match next {
            Some(Ok(event)) => cache_writer.apply(event),
            Some(Err(e)) => warn!(error = %e, "Watch stream error"),
            None => {
                error!("Watch stream ended");
                break;
            }
        }
    }
    info!("Watcher stopped");
}

/// Enqueue an Update for every cached resource each `interval`
pub async fn run_resync(
    cache: ResourceCache,
    queue: WorkQueue<Event>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let keys = cache.keys();
                debug!(count = keys.len(), "Periodic resync");
                for key in keys {
                    queue.add(Event::update(key.clone(), key));
                }
            }
        }
    }
}
