pub mod backend;
pub mod config;
pub mod controller;
pub mod crd;
pub mod health;

pub use backend::{BackendError, BackendRegistry, DatabaseBackend, NOOP_BACKEND_TYPE};
pub use config::{Args, ConfigError, OperatorConfig};
pub use controller::{
    Context, Error, Event, EventKind, FINALIZER, MAX_RETRIES, ObjectKey, Result, WorkQueue,
    reconcile,
};
pub use crd::{ConnectionState, Database, DatabaseSpec, DatabaseStatus};
pub use health::{HealthState, Metrics};

use std::sync::Arc;

use kube::{Api, Client};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use controller::{CacheWriter, KubeResourceClient, run_resync, run_watcher, run_worker};

/// Run the Database controller until `shutdown` fires.
///
/// Starts the watcher, waits for the first full list to land in the cache,
/// then starts the single worker. On shutdown the worker finishes the event
/// it is handling and stops without taking another.
pub async fn run_controller(
    client: Client,
    backends: BackendRegistry,
    config: &OperatorConfig,
    health_state: Option<Arc<HealthState>>,
    shutdown: CancellationToken,
) -> Result<()> {
    info!(
        backends = ?backends.types(),
        "Starting controller for Database resources (apiVersion: database-operator.io/v1alpha1)"
    );

    let queue: WorkQueue<Event> = WorkQueue::default();
    let (cache, writer) = controller::watcher::cache();
    let databases: Api<Database> = Api::all(client.clone());

    let watcher_handle = tokio::spawn(run_watcher(
        databases,
        CacheWriter::new(writer, cache.clone(), queue.clone()),
        shutdown.clone(),
    ));

    info!("Waiting for Database cache to sync");
    tokio::select! {
        _ = shutdown.cancelled() => {
            queue.shut_down();
            if let Err(e) = watcher_handle.await {
                error!("Watcher task panicked: {}", e);
            }
            return Ok(());
        }
        synced = cache.wait_until_ready() => synced?,
    }
    info!("Database cache synced");

    if let Some(interval) = config.resync_interval() {
        info!(interval_secs = interval.as_secs(), "Periodic resync enabled");
        tokio::spawn(run_resync(
            cache.clone(),
            queue.clone(),
            interval,
            shutdown.clone(),
        ));
    }

    let ctx = Context::new(
        cache,
        backends,
        Arc::new(KubeResourceClient::new(client)),
        health_state.clone(),
    );
    let worker_handle = tokio::spawn(run_worker(queue.clone(), ctx));

    if let Some(ref state) = health_state {
        state.set_ready(true).await;
    }

    shutdown.cancelled().await;
    info!("Stopping controller");

    if let Some(ref state) = health_state {
        state.set_ready(false).await;
    }
    queue.shut_down();

    if let Err(e) = worker_handle.await {
        error!("Worker task panicked: {}", e);
    }
    if let Err(e) = watcher_handle.await {
        error!("Watcher task panicked: {}", e);
    }
    Ok(())
}
