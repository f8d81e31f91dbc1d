//! Change notifications passed from the watcher to the worker

use std::fmt;

use kube::ResourceExt;
use kube::runtime::reflector::ObjectRef;

use crate::crd::Database;

/// Stable `namespace/name` key of a Database
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self(format!("{}/{}", namespace, name))
    }

    /// Key of a resource; `None` when the object has no name and so cannot be
    /// looked up again
    pub fn from_resource(db: &Database) -> Option<Self> {
        let name = db.metadata.name.as_deref()?;
        match db.namespace() {
            Some(namespace) => Some(Self::new(&namespace, name)),
            None => Some(Self(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into `(namespace, name)`; the namespace is absent for bare names
    pub fn split(&self) -> (Option<&str>, &str) {
        match self.0.split_once('/') {
            Some((namespace, name)) => (Some(namespace), name),
            None => (None, self.0.as_str()),
        }
    }

    /// Reference used for reflector store lookups
    pub fn object_ref(&self) -> ObjectRef<Database> {
        match self.split() {
            (Some(namespace), name) => ObjectRef::new(name).within(namespace),
            (None, name) => ObjectRef::new(name),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of change that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Add,
    Update,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Add => write!(f, "Add"),
            EventKind::Update => write!(f, "Update"),
        }
    }
}

/// Unit of work on the queue. Carries keys only; the reconciler re-reads
/// the object from the cache when it processes the event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Event {
    pub kind: EventKind,
    pub old_key: Option<ObjectKey>,
    pub new_key: ObjectKey,
}

impl Event {
    pub fn add(key: ObjectKey) -> Self {
        Self {
            kind: EventKind::Add,
            old_key: None,
            new_key: key,
        }
    }

    pub fn update(old_key: ObjectKey, new_key: ObjectKey) -> Self {
        Self {
            kind: EventKind::Update,
            old_key: Some(old_key),
            new_key,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.new_key)
    }
}
