//! Reconciler for Database resources
//!
//! Each event is handled against the latest cached copy of its resource:
//!
//! 1. an Add (or any event for an object already being deleted) provisions
//!    or deprovisions the remote database and moves the finalizers
//! 2. every other event only refreshes connectivity
//! 3. the status is then set from a ping with the owner's credentials, except
//!    right after deprovisioning when there is nothing left to reach
//!
//! The Database and its credentials Secret carry finalizers as a pair. While
//! provisioning, the Database is written first and every Add re-claims the
//! Secret, so a failed Secret write is repaired by the retry. While
//! deprovisioning, the Secret is released first, since clearing the Database
//! finalizers lets the object disappear and nothing would retry after that.
//! Nothing is written when an object already matches.

use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use tracing::{debug, info, warn};

use super::context::Context;
use super::credentials::fetch_credentials;
use super::error::{Error, Result};
use super::event::{Event, EventKind};
use super::finalizer::{
    FINALIZER, credentials_finalizer, has_finalizer, with_finalizer, without_all_finalizers,
    without_finalizer,
};
use super::status::{connected, disconnected, with_status};
use crate::backend::DatabaseBackend;
use crate::crd::{ConnectionState, Database, DatabaseStatus};

/// Lifecycle state of a Database as seen by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// No finalizer: the remote database has not been created
    Unprovisioned,
    /// Finalizer present and the last ping succeeded
    ProvisionedConnected,
    /// Finalizer present and the last ping failed or never ran
    ProvisionedDisconnected,
    /// Deletion timestamp set
    DeletionRequested,
}

impl ResourceState {
    pub fn of(db: &Database) -> Self {
        if db.metadata.deletion_timestamp.is_some() {
            return Self::DeletionRequested;
        }
        if !has_finalizer(db, FINALIZER) {
            return Self::Unprovisioned;
        }
        match db.status.as_ref().map(|s| s.state) {
            Some(ConnectionState::Connected) => Self::ProvisionedConnected,
            _ => Self::ProvisionedDisconnected,
        }
    }
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unprovisioned => write!(f, "Unprovisioned"),
            Self::ProvisionedConnected => write!(f, "ProvisionedConnected"),
            Self::ProvisionedDisconnected => write!(f, "ProvisionedDisconnected"),
            Self::DeletionRequested => write!(f, "DeletionRequested"),
        }
    }
}

/// Result of a provisioning or deprovisioning step
#[derive(Debug, Default)]
struct Transition {
    /// Database with updated finalizers
    database: Option<Database>,
    /// Secret with updated finalizers
    secret: Option<Secret>,
    /// The remote database is gone; skip the connectivity probe
    deprovisioned: bool,
}

/// Handle one event. A resource no longer in the cache needs no work.
pub async fn reconcile(ctx: &Context, event: &Event) -> Result<()> {
    let Some(cached) = ctx.cache.get(&event.new_key) else {
        debug!(event = %event, "Database no longer exists, nothing to do");
        return Ok(());
    };
    let db: &Database = &cached;
    let name = db.name_any();
    let namespace = db
        .namespace()
        .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;

    debug!(
        event = %event,
        state = %ResourceState::of(db),
        "Reconciling Database"
    );

    let Some(backend) = ctx.backends.get(&db.spec.type_) else {
        let err = Error::UnsupportedType(db.spec.type_.clone());
        warn!(name = %name, namespace = %namespace, error = %err, "No backend for Database");
        if let Some(updated) = with_status(db, disconnected(err.to_string())) {
            ctx.client.replace_database_status(&updated).await?;
        }
        return Err(err);
    };

    let transition = if db.metadata.deletion_timestamp.is_some() {
        deprovision(ctx, backend.as_ref(), db, &namespace).await
    } else {
        match event.kind {
            EventKind::Add => provision(ctx, backend.as_ref(), db, &namespace).await,
            EventKind::Update => Ok(Transition::default()),
        }
    };

    let (desired, mut secret, status, result) = match transition {
        Ok(transition) => {
            let desired = transition.database.unwrap_or_else(|| db.clone());
            let status = if transition.deprovisioned {
                None
            } else {
                Some(probe(ctx, backend.as_ref(), &desired, &namespace).await)
            };
            (desired, transition.secret, status, Ok(()))
        }
        Err(e) => {
            warn!(name = %name, namespace = %namespace, error = %e, "Reconciliation step failed");
            (db.clone(), None, Some(disconnected(e.to_string())), Err(e))
        }
    };

    if db.metadata.deletion_timestamp.is_some() {
        persist_secret(ctx, secret.take()).await?;
    }
    persist_database(ctx, db, desired, status).await?;
    persist_secret(ctx, secret).await?;
    result
}

/// Create the remote database on first sight and claim it and its Secret
/// with finalizers. An already-provisioned resource only has its Secret
/// claimed again if an earlier pass failed to do so.
async fn provision(
    ctx: &Context,
    backend: &dyn DatabaseBackend,
    db: &Database,
    namespace: &str,
) -> Result<Transition> {
    let name = db.name_any();
    let (secret, credentials) =
        fetch_credentials(ctx.client.as_ref(), namespace, &db.spec.credentials_ref).await?;

    let secret_finalizer = credentials_finalizer(namespace, &name);
    if has_finalizer(db, FINALIZER) {
        return Ok(Transition {
            secret: with_finalizer(&secret, &secret_finalizer),
            ..Transition::default()
        });
    }

    info!(
        name = %name,
        namespace = %namespace,
        database_type = %db.spec.type_,
        user = %credentials.user,
        "Provisioning database"
    );
    backend
        .create(&name, &credentials.user, &credentials.password)
        .await?;

    Ok(Transition {
        database: with_finalizer(db, FINALIZER),
        secret: with_finalizer(&secret, &secret_finalizer),
        deprovisioned: false,
    })
}

/// Remove the remote database and release the Database and its Secret.
/// A missing Secret does not block deletion.
async fn deprovision(
    ctx: &Context,
    backend: &dyn DatabaseBackend,
    db: &Database,
    namespace: &str,
) -> Result<Transition> {
    let name = db.name_any();
    let secret = ctx
        .client
        .get_secret(namespace, &db.spec.credentials_ref)
        .await?;
    if secret.is_none() {
        warn!(
            name = %name,
            namespace = %namespace,
            secret = %db.spec.credentials_ref,
            "Credentials secret missing during deletion"
        );
    }

    if !has_finalizer(db, FINALIZER) {
        debug!(name = %name, namespace = %namespace, "Deletion already completed");
        return Ok(Transition {
            deprovisioned: true,
            ..Transition::default()
        });
    }

    info!(
        name = %name,
        namespace = %namespace,
        database_type = %db.spec.type_,
        "Deprovisioning database"
    );
    backend.delete(&name).await?;

    let secret_finalizer = credentials_finalizer(namespace, &name);
    Ok(Transition {
        database: without_all_finalizers(db),
        secret: secret.and_then(|s| without_finalizer(&s, &secret_finalizer)),
        deprovisioned: true,
    })
}

/// Connectivity status from a ping with the owner's credentials
async fn probe(
    ctx: &Context,
    backend: &dyn DatabaseBackend,
    db: &Database,
    namespace: &str,
) -> DatabaseStatus {
    let name = db.name_any();
    let credentials =
        match fetch_credentials(ctx.client.as_ref(), namespace, &db.spec.credentials_ref).await {
            Ok((_, credentials)) => credentials,
            Err(e) => return disconnected(e.to_string()),
        };

    if backend
        .ping(&name, &credentials.user, &credentials.password)
        .await
    {
        connected()
    } else {
        disconnected(format!(
            "cannot connect to database '{}' as user '{}'",
            name, credentials.user
        ))
    }
}

async fn persist_secret(ctx: &Context, secret: Option<Secret>) -> Result<()> {
    if let Some(secret) = secret {
        debug!(
            secret = %secret.name_any(),
            finalizers = ?secret.finalizers(),
            "Updating credentials secret finalizers"
        );
        ctx.client.replace_secret(&secret).await?;
    }
    Ok(())
}

/// Write finalizer and status changes of `desired` over `current`.
///
/// Finalizers go through a full update of the object; the status through
/// the status subresource, based on the object returned by that update.
/// Once all finalizers of a deleting object are removed it is gone and its
/// status is not written.
async fn persist_database(
    ctx: &Context,
    current: &Database,
    desired: Database,
    status: Option<DatabaseStatus>,
) -> Result<()> {
    let mut latest = current.clone();

    if desired.finalizers() != current.finalizers() {
        debug!(
            name = %desired.name_any(),
            finalizers = ?desired.finalizers(),
            "Updating Database finalizers"
        );
        latest = ctx.client.replace_database(&desired).await?;
        if desired.metadata.deletion_timestamp.is_some() && desired.finalizers().is_empty() {
            return Ok(());
        }
    }

    let Some(status) = status else {
        return Ok(());
    };
    if let Some(updated) = with_status(&latest, status) {
        debug!(
            name = %updated.name_any(),
            status = ?updated.status,
            "Updating Database status"
        );
        ctx.client.replace_database_status(&updated).await?;
    }
    Ok(())
}
