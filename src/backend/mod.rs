//! Database backends
//!
//! A backend provisions databases and roles on one external server. Each
//! configured server is registered under a type tag; a Database resource
//! selects its backend through `spec.type`.
//!
//! `create` and `delete` are idempotent: creating an existing database and
//! deleting a missing one both succeed. Access is only granted from inside
//! `create`, which the reconciler calls once per provisioning (guarded by
//! the finalizer), so re-running it after a crash re-establishes the same
//! grant rather than handing out access on every pass.

pub mod noop;
pub mod postgres;
pub mod sql;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::info;

use crate::config::OperatorConfig;

pub use noop::NoopBackend;
pub use postgres::PostgresBackend;
pub use sql::sanitize_identifier;

/// Type tag that always maps to the no-op test backend
pub const NOOP_BACKEND_TYPE: &str = "test";

/// Errors surfaced by backend operations
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to connect to {host}:{port}: {source}")]
    Connection {
        host: String,
        port: u16,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("query failed: {0}")]
    Query(#[from] tokio_postgres::Error),

    #[error("TLS configuration error: {0}")]
    Tls(String),

    #[error("user '{user}' cannot connect to database '{database}'")]
    UserCannotConnect { database: String, user: String },
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Capability set implemented once per database technology
pub trait DatabaseBackend: Send + Sync {
    /// Create `name` and give `user` (created if missing) full access to it
    fn create<'a>(
        &'a self,
        name: &'a str,
        user: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, BackendResult<()>>;

    /// Remove `name`; a missing database is not an error
    fn delete<'a>(&'a self, name: &'a str) -> BoxFuture<'a, BackendResult<()>>;

    /// Whether `user` can open a connection to `name`
    fn ping<'a>(&'a self, name: &'a str, user: &'a str, password: &'a str) -> BoxFuture<'a, bool>;
}

/// Static mapping from type tag to backend, built once at startup
#[derive(Clone)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn DatabaseBackend>>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendRegistry {
    /// Registry holding only the no-op test backend
    pub fn new() -> Self {
        let mut backends: HashMap<String, Arc<dyn DatabaseBackend>> = HashMap::new();
        backends.insert(NOOP_BACKEND_TYPE.to_string(), Arc::new(NoopBackend));
        Self { backends }
    }

    /// Registry with one PostgreSQL backend per configured server
    pub fn from_config(config: &OperatorConfig) -> BackendResult<Self> {
        let mut registry = Self::new();
        for (type_tag, server) in &config.postgres {
            let backend = PostgresBackend::new(server.clone())?;
            info!(
                type_tag = %type_tag,
                server = %server.host,
                production = backend.is_production(),
                "Registered PostgreSQL backend"
            );
            registry.register(type_tag.clone(), Arc::new(backend));
        }
        Ok(registry)
    }

    /// Add or replace the backend for `type_tag`
    pub fn register(&mut self, type_tag: impl Into<String>, backend: Arc<dyn DatabaseBackend>) {
        self.backends.insert(type_tag.into(), backend);
    }

    pub fn get(&self, type_tag: &str) -> Option<Arc<dyn DatabaseBackend>> {
        self.backends.get(type_tag).cloned()
    }

    /// Registered type tags, sorted
    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.backends.keys().cloned().collect();
        types.sort();
        types
    }
}
