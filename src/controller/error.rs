//! Error types for the Database controller

use thiserror::Error;

use crate::backend::BackendError;

/// Error variants are named with the `Error` suffix where they wrap another
/// crate's error, matching the call sites that produce them.
#[allow(clippy::enum_variant_names)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("{0}")]
    BackendError(#[from] BackendError),

    #[error("database type '{0}' is not supported")]
    UnsupportedType(String),

    #[error("credentials secret '{name}' not found in namespace '{namespace}'")]
    CredentialsNotFound { namespace: String, name: String },

    #[error("credentials secret '{name}' is invalid: {reason}")]
    InvalidCredentials { name: String, reason: String },

    #[error("Missing object key: {0}")]
    MissingObjectKey(&'static str),

    #[error("resource cache stopped before its initial sync")]
    CacheSyncFailed,
}

impl Error {
    /// Errors that persist until the Database spec or its Secret is fixed;
    /// retrying only exhausts the retry budget.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedType(_)
                | Error::InvalidCredentials { .. }
                | Error::MissingObjectKey(_)
        )
    }

    /// Optimistic concurrency failure on an update
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::KubeError(kube::Error::Api(resp)) if resp.code == 409)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
