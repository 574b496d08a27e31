// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage accounting and catalog-driven pricing for the GHL assistant.
//!
//! Every dispatch attempt, successful or not, becomes exactly one immutable
//! usage row. Costs come from the model catalog; unknown prices stay absent.

pub mod pricing;
pub mod recorder;

pub use pricing::{PricingUnit, calculate_cost};
pub use recorder::{UsageEntry, UsageRecorder};
