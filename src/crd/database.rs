//! Database CRD definition
//!
//! A Database resource names a backend type and a Secret holding the
//! credentials of the role that should own the database. The operator
//! creates the database and role on the configured server and reports
//! connectivity back into the status.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Database is the Schema for the databases API
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
#[kube(
    group = "database-operator.io",
    version = "v1alpha1",
    kind = "Database",
    plural = "databases",
    shortname = "db",
    namespaced,
    status = "DatabaseStatus",
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Error", "type":"string", "jsonPath":".status.error"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSpec {
    /// Backend type tag, selects one of the configured servers
    #[serde(rename = "type")]
    pub type_: String,

    /// Name of the Secret (same namespace) with `user` and `password` keys
    pub credentials_ref: String,
}

/// Status of the Database resource
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStatus {
    /// Whether the owning role can currently connect to the database
    #[serde(default)]
    pub state: ConnectionState,

    /// Last error message, empty when healthy. Always serialized so a merge
    /// patch clears a stale message.
    #[serde(default)]
    pub error: String,
}

/// Observed connectivity of a Database
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, JsonSchema, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    #[default]
    Disconnected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Disconnected => write!(f, "Disconnected"),
        }
    }
}
