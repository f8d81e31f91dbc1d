pub mod client;
pub mod context;
pub mod credentials;
pub mod error;
pub mod event;
pub mod finalizer;
pub mod queue;
pub mod reconciler;
pub mod status;
pub mod watcher;
pub mod worker;

pub use client::{KubeResourceClient, ResourceClient};
pub use context::Context;
pub use credentials::{Credentials, fetch_credentials};
pub use error::{Error, Result};
pub use event::{Event, EventKind, ObjectKey};
pub use finalizer::{FINALIZER, credentials_finalizer};
pub use queue::{BackoffConfig, WorkQueue};
pub use reconciler::{ResourceState, reconcile};
pub use watcher::{CacheWriter, ResourceCache, run_resync, run_watcher};
pub use worker::{MAX_RETRIES, process_next_item, run_worker};
