// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Unit tests for the database operator
//!
//! This module contains tests for:
//! - Reconciliation of Add and Update events against fake backends
//! - Worker retry and drop behaviour
//! - Configuration files and the backend registry

#[path = "../common/mod.rs"]
mod common;

mod config;
mod worker;
