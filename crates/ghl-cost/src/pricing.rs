// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cost calculation from catalog pricing.
//!
//! Catalog prices are quoted per token, per thousand, or per million tokens.
//! An entry without a unit is quoted per million, the convention every vendor
//! price sheet uses.

use ghl_core::types::{ModelPricing, TokenUsage};
use strum::Display;

/// The token count a catalog price refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PricingUnit {
    #[strum(serialize = "token")]
    PerToken,
    #[strum(serialize = "1K tokens")]
    PerThousand,
    #[strum(serialize = "1M tokens")]
    PerMillion,
}

impl PricingUnit {
    /// Parses the catalog's free-form `unit` string.
    ///
    /// Returns `None` for units this crate does not understand, so that an
    /// unknown unit yields an absent cost rather than a wrong one.
    pub fn parse(unit: Option<&str>) -> Option<Self> {
        let Some(raw) = unit else {
            return Some(Self::PerMillion);
        };
        let lower = raw.trim().to_ascii_lowercase();
        let normalized: String = lower
            .trim_start_matches("per ")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        match normalized.as_str() {
            "token" | "tokens" | "1token" | "1tokens" => Some(Self::PerToken),
            "1ktokens" | "1ktoken" | "1k" | "1000tokens" | "ktok" => Some(Self::PerThousand),
            "1mtokens" | "1mtoken" | "1m" | "1000000tokens" | "mtok" => Some(Self::PerMillion),
            _ => None,
        }
    }

    /// Tokens covered by one quoted price.
    pub fn tokens(self) -> f64 {
        match self {
            Self::PerToken => 1.0,
            Self::PerThousand => 1_000.0,
            Self::PerMillion => 1_000_000.0,
        }
    }
}

/// Cost in USD of `usage` under `pricing`.
///
/// `None` when either price is missing or the unit is not understood.
pub fn calculate_cost(usage: &TokenUsage, pricing: &ModelPricing) -> Option<f64> {
    let unit = PricingUnit::parse(pricing.unit.as_deref())?;
    let input_price = pricing.input?;
    let output_price = pricing.output?;
    let per = unit.tokens();
    let input = f64::from(usage.input_tokens) / per * input_price;
    let output = f64::from(usage.output_tokens) / per * output_price;
    Some(input + output)
}
