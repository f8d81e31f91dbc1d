//! Operator configuration
//!
//! Command-line flags select the configuration file; the file maps backend
//! type tags to the servers the operator provisions databases on.
//!
//! ```yaml
//! resyncIntervalSeconds: 600
//! postgres:
//!   postgres-main:
//!     host: pg.example.internal
//!     port: 5432
//!     user: postgres
//!     password: secret
//!     tls: verify-full
//!     caCertFile: /etc/database-operator/ca.crt
//!     production: true
//! ```

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use crate::backend::NOOP_BACKEND_TYPE;

/// Errors raised while loading or validating the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid configuration for backend '{backend}': {reason}")]
    InvalidBackend { backend: String, reason: String },
}

/// Command-line arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "database-operator", version, about)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(long, env = "DATABASE_OPERATOR_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Path to a kubeconfig file. Without it the in-cluster config or the
    /// default kubeconfig (including `KUBECONFIG`) is used.
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Listen address of the health and metrics server
    #[arg(long, env = "HEALTH_ADDR", default_value = "0.0.0.0:8080")]
    pub health_addr: SocketAddr,
}

/// Contents of the configuration file
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OperatorConfig {
    /// PostgreSQL servers keyed by backend type tag
    #[serde(default)]
    pub postgres: BTreeMap<String, PostgresServerConfig>,

    /// Re-enqueue every cached Database at this interval; disabled when unset
    #[serde(default)]
    pub resync_interval_seconds: Option<u64>,
}

/// Connection parameters of a PostgreSQL server
#[derive(Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PostgresServerConfig {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Administrative role used for provisioning
    pub user: String,

    pub password: String,

    #[serde(default)]
    pub tls: TlsMode,

    /// PEM bundle used to verify the server certificate in `verify-full` mode
    #[serde(default)]
    pub ca_cert_file: Option<PathBuf>,

    /// Rename databases on deletion instead of dropping them
    #[serde(default)]
    pub production: bool,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

// Keeps the admin password out of logs.
impl std::fmt::Debug for PostgresServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("tls", &self.tls)
            .field("ca_cert_file", &self.ca_cert_file)
            .field("production", &self.production)
            .field("connect_timeout_seconds", &self.connect_timeout_seconds)
            .finish_non_exhaustive()
    }
}

impl PostgresServerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// TLS mode for connections to a backend server
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TlsMode {
    /// Plain TCP
    #[default]
    Disable,
    /// TLS without certificate verification
    Require,
    /// TLS with CA and hostname verification
    VerifyFull,
}

fn default_port() -> u16 {
    5432
}

fn default_connect_timeout() -> u64 {
    10
}

impl OperatorConfig {
    /// Read and validate the configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse the configuration without validating it
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Reject configurations the operator cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (backend, server) in &self.postgres {
            let invalid = |reason: &str| ConfigError::InvalidBackend {
                backend: backend.clone(),
                reason: reason.to_string(),
            };

            if backend == NOOP_BACKEND_TYPE {
                return Err(invalid("type tag is reserved for the no-op test backend"));
            }
            if server.host.is_empty() {
                return Err(invalid("host must not be empty"));
            }
            if server.user.is_empty() {
                return Err(invalid("user must not be empty"));
            }
            if server.tls == TlsMode::VerifyFull && server.ca_cert_file.is_none() {
                return Err(invalid("tls mode verify-full requires caCertFile"));
            }
        }
        Ok(())
    }

    pub fn resync_interval(&self) -> Option<Duration> {
        self.resync_interval_seconds
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
