// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Integration tests for database-operator
//!
//! These tests require a PostgreSQL server reachable with a superuser role.
//! Tests are marked with #[ignore] and must be run explicitly:
//!
//! ```bash
//! TEST_POSTGRES_HOST=localhost TEST_POSTGRES_PASSWORD=postgres \
//!     cargo test --test integration -- --ignored --test-threads=1
//! ```
//!
//! Connection settings come from `TEST_POSTGRES_HOST`, `TEST_POSTGRES_PORT`
//! (default 5432), `TEST_POSTGRES_USER` (default `postgres`) and
//! `TEST_POSTGRES_PASSWORD`.

mod postgres;

use database_operator::config::{PostgresServerConfig, TlsMode};

/// Server settings from the environment
pub fn server_config(production: bool) -> PostgresServerConfig {
    let env = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.to_string());
    PostgresServerConfig {
        host: env("TEST_POSTGRES_HOST", "localhost"),
        port: env("TEST_POSTGRES_PORT", "5432").parse().unwrap(),
        user: env("TEST_POSTGRES_USER", "postgres"),
        password: env("TEST_POSTGRES_PASSWORD", "postgres"),
        tls: TlsMode::Disable,
        ca_cert_file: None,
        production,
        connect_timeout_seconds: 5,
    }
}

/// Name unique to this test run, with characters that need sanitizing
pub fn unique_name(prefix: &str) -> String {
    let suffix: u32 = rand::random::<u32>() % 1_000_000;
    format!("{}-{}.it", prefix, suffix)
}
