// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider dispatch for the GHL assistant.
//!
//! Resolves a client's active credentials into vendor clients and dispatches
//! chat requests with ordered, sequential failover:
//! [`ProviderRegistry`] maps provider tags to implementations,
//! [`ProviderSelector`] walks the candidates, and [`metered`] keeps streamed
//! responses accounted for.

pub mod metered;
pub mod registry;
pub mod selector;

pub use metered::{CANCELLED_BY_CALLER, UsageGuard};
pub use registry::{ProviderFactory, ProviderRegistry};
pub use selector::{DispatchOutcome, DispatchRequest, ProviderSelector, SelectedStream};
