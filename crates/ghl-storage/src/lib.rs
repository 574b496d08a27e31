// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the GHL assistant.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed operations for tenants,
//! credentials, the model catalog, conversation sessions, and the immutable
//! usage and webhook logs.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::{Database, TIMESTAMP_FORMAT, now_timestamp};
pub use models::*;
