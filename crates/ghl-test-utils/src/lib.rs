// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for GHL assistant integration tests.
//!
//! Provides scripted vendors and a test harness for fast, deterministic,
//! CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`ScriptedProvider`] - Vendor stand-in answering from a FIFO script
//! - [`TestHarness`] - Full dispatch and assistant stack on a temp database

pub mod harness;
pub mod mock_provider;

pub use harness::{TestHarness, TestHarnessBuilder, scripted_registry};
pub use mock_provider::{DEFAULT_REPLY, OpenedWith, Scripted, ScriptedProvider, StreamStep};
