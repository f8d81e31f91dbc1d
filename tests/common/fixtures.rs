//! Builders for Database and Secret resources
//!
//! ```rust,ignore
//! let db = DatabaseBuilder::new("orders", "shop")
//!     .with_type("fake")
//!     .provisioned()
//!     .build();
//! let secret = credentials_secret("shop", "orders-creds", "app", "pw");
//! ```

use std::collections::BTreeMap;

use database_operator::controller::finalizer::FINALIZER;
use database_operator::controller::status::connected;
use database_operator::crd::{Database, DatabaseSpec, DatabaseStatus};
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::core::ObjectMeta;

pub const TEST_NAMESPACE: &str = "shop";

/// Builder for Database resources
pub struct DatabaseBuilder {
    name: String,
    namespace: String,
    type_: String,
    credentials_ref: String,
    finalizers: Vec<String>,
    status: Option<DatabaseStatus>,
    deleting: bool,
}

impl DatabaseBuilder {
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            type_: "fake".to_string(),
            credentials_ref: format!("{}-creds", name),
            finalizers: Vec::new(),
            status: None,
            deleting: false,
        }
    }

    pub fn with_type(mut self, type_: &str) -> Self {
        self.type_ = type_.to_string();
        self
    }

    pub fn with_credentials_ref(mut self, credentials_ref: &str) -> Self {
        self.credentials_ref = credentials_ref.to_string();
        self
    }

    pub fn with_finalizer(mut self, finalizer: &str) -> Self {
        self.finalizers.push(finalizer.to_string());
        self
    }

    /// Carries the controller finalizer and a Connected status
    pub fn provisioned(self) -> Self {
        self.with_finalizer(FINALIZER).with_status(connected())
    }

    pub fn with_status(mut self, status: DatabaseStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn deleting(mut self) -> Self {
        self.deleting = true;
        self
    }

    pub fn build(self) -> Database {
        Database {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: Some(self.namespace),
                uid: Some("test-uid-12345".to_string()),
                resource_version: Some("1".to_string()),
                finalizers: (!self.finalizers.is_empty()).then_some(self.finalizers),
                deletion_timestamp: self.deleting.then(|| Time(chrono::Utc::now())),
                ..Default::default()
            },
            spec: DatabaseSpec {
                type_: self.type_,
                credentials_ref: self.credentials_ref,
            },
            status: self.status,
        }
    }
}

/// Secret with `user` and `password` keys
pub fn credentials_secret(namespace: &str, name: &str, user: &str, password: &str) -> Secret {
    let mut data = BTreeMap::new();
    data.insert("user".to_string(), ByteString(user.as_bytes().to_vec()));
    data.insert(
        "password".to_string(),
        ByteString(password.as_bytes().to_vec()),
    );
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

/// Secret carrying the given finalizers
pub fn secret_with_finalizers(mut secret: Secret, finalizers: &[&str]) -> Secret {
    secret.metadata.finalizers = Some(finalizers.iter().map(|f| f.to_string()).collect());
    secret
}
