// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for identifier handling, statuses and the work queue
//!
//! These tests use proptest to generate random inputs and verify that:
//! 1. Sanitized identifiers never contain `-` or `.`, and sanitizing twice
//!    changes nothing
//! 2. Quoted identifiers and escaped literals cannot terminate early
//! 3. Statuses built by the helpers keep state and error consistent
//! 4. The work queue never holds the same event twice

use std::collections::HashSet;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use database_operator::backend::sql::{
    deleted_database_name, escape_sql_string, quote_identifier, sanitize_identifier,
};
use database_operator::controller::status::{connected, disconnected};
use database_operator::controller::{Event, ObjectKey, WorkQueue};
use database_operator::crd::ConnectionState;

// =============================================================================
// Identifier properties
// =============================================================================

proptest! {
    #[test]
    fn sanitized_names_have_no_separators(name in "[a-zA-Z0-9._-]{1,63}") {
        let sanitized = sanitize_identifier(&name);
        prop_assert!(!sanitized.contains('-'));
        prop_assert!(!sanitized.contains('.'));
        prop_assert_eq!(sanitized.len(), name.len());
    }

    #[test]
    fn sanitize_is_idempotent(name in "\\PC{0,40}") {
        let once = sanitize_identifier(&name);
        prop_assert_eq!(sanitize_identifier(&once), once);
    }

    #[test]
    fn clean_names_are_unchanged(name in "[a-z_][a-z0-9_]{0,62}") {
        prop_assert_eq!(sanitize_identifier(&name), name);
    }

    #[test]
    fn quoted_identifier_round_trips(name in "\\PC{0,40}") {
        let quoted = quote_identifier(&name);
        prop_assert!(quoted.starts_with('"') && quoted.ends_with('"'));
        let inner = &quoted[1..quoted.len() - 1];
        prop_assert_eq!(inner.replace("\"\"", "\""), name);
    }

    #[test]
    fn escaped_literal_has_only_paired_quotes(value in "\\PC{0,40}") {
        let escaped = escape_sql_string(&value);
        prop_assert_eq!(escaped.replace("''", ""), value.replace('\'', ""));
    }

    #[test]
    fn deleted_name_keeps_original_suffix(
        name in "[a-z_][a-z0-9_]{0,30}",
        secs in 0i64..4_102_444_800,
    ) {
        let at = Utc.timestamp_opt(secs, 0).unwrap();
        let deleted = deleted_database_name(&name, at);
        prop_assert!(deleted.starts_with("DELETED_"));
        let suffix = format!("_{}", name);
        prop_assert!(deleted.ends_with(&suffix));
        // DELETED_ + YYYYMMDDTHHMMSS + _ + name
        prop_assert_eq!(deleted.len(), 8 + 15 + 1 + name.len());
    }
}

// =============================================================================
// Status properties
// =============================================================================

proptest! {
    #[test]
    fn disconnected_always_has_error(message in "\\PC{0,80}") {
        let status = disconnected(message);
        prop_assert_eq!(status.state, ConnectionState::Disconnected);
        prop_assert!(!status.error.is_empty());
    }
}

#[test]
fn connected_never_has_error() {
    let status = connected();
    assert_eq!(status.state, ConnectionState::Connected);
    assert!(status.error.is_empty());
}

// =============================================================================
// Work queue properties
// =============================================================================

fn event_strategy() -> impl Strategy<Value = Event> {
    ("[a-c]", any::<bool>()).prop_map(|(name, update)| {
        let key = ObjectKey::new("shop", &name);
        if update {
            Event::update(key.clone(), key)
        } else {
            Event::add(key)
        }
    })
}

proptest! {
    #[test]
    fn queue_holds_each_event_once(events in prop::collection::vec(event_strategy(), 0..50)) {
        let queue = WorkQueue::default();
        for event in &events {
            queue.add(event.clone());
        }
        let distinct: HashSet<_> = events.into_iter().collect();
        prop_assert_eq!(queue.len(), distinct.len());
    }
}
