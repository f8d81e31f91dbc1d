//! Finalizer helpers
//!
//! The controller finalizer on a Database is present exactly while the
//! remote database exists. The Secret holding its credentials carries a
//! per-database finalizer over the same span, so the credentials cannot be
//! deleted while the remote database still needs them.
//!
//! The helpers never mutate their input: they return the updated copy, or
//! `None` when the object is already in the requested state.

use kube::{Resource, ResourceExt};

/// Finalizer the controller places on Database resources
pub const FINALIZER: &str = "database-operator.io/database";

/// Finalizer placed on the credentials Secret of database `namespace/name`
pub fn credentials_finalizer(namespace: &str, name: &str) -> String {
    format!("{}-{}-{}", FINALIZER, namespace, name)
}

pub fn has_finalizer<K: Resource>(obj: &K, finalizer: &str) -> bool {
    obj.finalizers().iter().any(|f| f == finalizer)
}

/// Copy of `obj` with `finalizer` added
pub fn with_finalizer<K: Resource + Clone>(obj: &K, finalizer: &str) -> Option<K> {
    if has_finalizer(obj, finalizer) {
        return None;
    }
    let mut updated = obj.clone();
    updated.finalizers_mut().push(finalizer.to_string());
    Some(updated)
}

/// Copy of `obj` with every occurrence of `finalizer` removed
pub fn without_finalizer<K: Resource + Clone>(obj: &K, finalizer: &str) -> Option<K> {
    if !has_finalizer(obj, finalizer) {
        return None;
    }
    let mut updated = obj.clone();
    updated.finalizers_mut().retain(|f| f != finalizer);
    Some(updated)
}

/// Copy of `obj` with no finalizers; the control plane removes a deleting
/// object as soon as this is persisted
pub fn without_all_finalizers<K: Resource + Clone>(obj: &K) -> Option<K> {
    if obj.finalizers().is_empty() {
        return None;
    }
    let mut updated = obj.clone();
    updated.finalizers_mut().clear();
    Some(updated)
}
