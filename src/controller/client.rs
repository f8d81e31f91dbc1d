//! Writes and lookups against the Kubernetes API
//!
//! The reconciler only talks to the API through [`ResourceClient`], so it can
//! be driven against an in-memory implementation in tests.

use futures::future::BoxFuture;
use k8s_openapi::api::core::v1::Secret;
use kube::Client;
use kube::api::{Api, Patch, PatchParams, PostParams};
use serde_json::json;

use super::error::{Error, Result};
use crate::crd::Database;

/// Kubernetes API operations the reconciler depends on
pub trait ResourceClient: Send + Sync {
    /// Look up a Secret; `Ok(None)` when it does not exist
    fn get_secret<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<Secret>>>;

    /// Full update of a Secret, guarded by its resourceVersion
    fn replace_secret<'a>(&'a self, secret: &'a Secret) -> BoxFuture<'a, Result<Secret>>;

    /// Full update of a Database, guarded by its resourceVersion
    fn replace_database<'a>(&'a self, db: &'a Database) -> BoxFuture<'a, Result<Database>>;

    /// Write the status subresource of a Database, guarded by its
    /// resourceVersion
    fn replace_database_status<'a>(&'a self, db: &'a Database)
    -> BoxFuture<'a, Result<Database>>;
}

fn object_key(meta: &kube::core::ObjectMeta) -> Result<(&str, &str)> {
    let name = meta
        .name
        .as_deref()
        .ok_or(Error::MissingObjectKey(".metadata.name"))?;
    let namespace = meta
        .namespace
        .as_deref()
        .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;
    Ok((namespace, name))
}

/// [`ResourceClient`] backed by the cluster API server
#[derive(Clone)]
pub struct KubeResourceClient {
    client: Client,
}

impl KubeResourceClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl ResourceClient for KubeResourceClient {
    fn get_secret<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<Secret>>> {
        Box::pin(async move {
            let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
            Ok(api.get_opt(name).await?)
        })
    }

    fn replace_secret<'a>(&'a self, secret: &'a Secret) -> BoxFuture<'a, Result<Secret>> {
        Box::pin(async move {
            let (namespace, name) = object_key(&secret.metadata)?;
            let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
            Ok(api.replace(name, &PostParams::default(), secret).await?)
        })
    }

    fn replace_database<'a>(&'a self, db: &'a Database) -> BoxFuture<'a, Result<Database>> {
        Box::pin(async move {
            let (namespace, name) = object_key(&db.metadata)?;
            let api: Api<Database> = Api::namespaced(self.client.clone(), namespace);
            Ok(api.replace(name, &PostParams::default(), db).await?)
        })
    }

    fn replace_database_status<'a>(
        &'a self,
        db: &'a Database,
    ) -> BoxFuture<'a, Result<Database>> {
        Box::pin(async move {
            let (namespace, name) = object_key(&db.metadata)?;
            let api: Api<Database> = Api::namespaced(self.client.clone(), namespace);
            // A merge patch carrying resourceVersion is rejected with 409 if
            // the object changed since it was read.
            let patch = json!({
                "metadata": { "resourceVersion": db.metadata.resource_version },
                "status": db.status,
            });
            Ok(api
                .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
                .await?)
        })
    }
}
