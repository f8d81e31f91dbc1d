use std::sync::Arc;

use super::client::ResourceClient;
use super::watcher::ResourceCache;
use crate::backend::BackendRegistry;
use crate::health::HealthState;

/// Shared context for the controller
#[derive(Clone)]
pub struct Context {
    /// Local cache of Database resources fed by the watcher
    pub cache: ResourceCache,
    /// Configured database servers by type tag
    pub backends: BackendRegistry,
    /// Kubernetes API writes and Secret lookups
    pub client: Arc<dyn ResourceClient>,
    /// Health state for recording metrics
    pub health_state: Option<Arc<HealthState>>,
}

impl Context {
    pub fn new(
        cache: ResourceCache,
        backends: BackendRegistry,
        client: Arc<dyn ResourceClient>,
        health_state: Option<Arc<HealthState>>,
    ) -> Self {
        Self {
            cache,
            backends,
            client,
            health_state,
        }
    }
}
