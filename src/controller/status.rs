//! Status helpers for Database resources
//!
//! `Connected` always carries an empty error and `Disconnected` always a
//! non-empty one; statuses are only built through these constructors.

use crate::crd::{ConnectionState, Database, DatabaseStatus};

/// Error recorded when a disconnect has no more specific cause
const UNKNOWN_DISCONNECT: &str = "database is not reachable";

pub fn connected() -> DatabaseStatus {
    DatabaseStatus {
        state: ConnectionState::Connected,
        error: String::new(),
    }
}

pub fn disconnected(error: impl Into<String>) -> DatabaseStatus {
    let mut error = error.into();
    if error.is_empty() {
        error = UNKNOWN_DISCONNECT.to_string();
    }
    DatabaseStatus {
        state: ConnectionState::Disconnected,
        error,
    }
}

/// Copy of `db` carrying `status`, or `None` if it already does
pub fn with_status(db: &Database, status: DatabaseStatus) -> Option<Database> {
    if db.status.as_ref() == Some(&status) {
        return None;
    }
    let mut updated = db.clone();
    updated.status = Some(status);
    Some(updated)
}
