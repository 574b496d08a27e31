// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage recorder: one immutable accounting row per dispatch attempt.
//!
//! Cost is looked up from the model catalog at write time. A model without a
//! catalog entry, or with pricing this crate cannot interpret, is recorded
//! with an absent cost, never with zero.

use std::sync::Arc;
use std::time::Duration;

use ghl_core::traits::{ModelCatalog, NewUsageLog, UsageRepository};
use ghl_core::types::{TokenUsage, UsageLog, UsageSummary};
use ghl_core::{GhlError, ProviderType};
use tracing::{debug, info, warn};

use crate::pricing::calculate_cost;

/// The outcome of one dispatch attempt, as seen by accounting.
#[derive(Debug, Clone, Default)]
pub struct UsageEntry {
    pub client_id: String,
    pub session_id: Option<String>,
    /// Absent when no candidate was attempted.
    pub provider_type: Option<ProviderType>,
    pub model_used: Option<String>,
    pub usage: Option<TokenUsage>,
    pub duration: Duration,
    pub error: Option<String>,
}

impl UsageEntry {
    /// Entry for an attempt against a concrete provider.
    pub fn attempt(
        client_id: impl Into<String>,
        session_id: Option<String>,
        provider_type: ProviderType,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            session_id,
            provider_type: Some(provider_type),
            model_used: Some(model_used.into()),
            ..Default::default()
        }
    }

    pub fn with_usage(mut self, usage: Option<TokenUsage>) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Prices and persists usage entries.
#[derive(Clone)]
pub struct UsageRecorder {
    usage: Arc<dyn UsageRepository>,
    catalog: Arc<dyn ModelCatalog>,
}

impl std::fmt::Debug for UsageRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageRecorder").finish_non_exhaustive()
    }
}

impl UsageRecorder {
    pub fn new(usage: Arc<dyn UsageRepository>, catalog: Arc<dyn ModelCatalog>) -> Self {
        Self { usage, catalog }
    }

    /// Writes exactly one row for `entry`.
    pub async fn record(&self, entry: UsageEntry) -> Result<UsageLog, GhlError> {
        let cost_usd = self.price(&entry).await;
        let duration_ms = u64::try_from(entry.duration.as_millis()).unwrap_or(u64::MAX);
        let usage = entry.usage;

        let row = self
            .usage
            .insert_usage(NewUsageLog {
                client_id: entry.client_id,
                session_id: entry.session_id,
                provider_type: entry.provider_type,
                model_used: entry.model_used,
                tokens_input: usage.map(|u| u.input_tokens),
                tokens_output: usage.map(|u| u.output_tokens),
                tokens_total: usage.map(|u| u.total_tokens),
                cost_usd,
                request_duration_ms: duration_ms,
                error_message: entry.error,
            })
            .await?;

        info!(
            client_id = %row.client_id,
            provider = ?row.provider_type,
            model = ?row.model_used,
            tokens_total = ?row.tokens_total,
            cost_usd = ?row.cost_usd,
            duration_ms,
            failed = row.error_message.is_some(),
            "usage recorded"
        );
        Ok(row)
    }

    /// Billing aggregate for the client, optionally from `since` onwards.
    pub async fn summary(
        &self,
        client_id: &str,
        since: Option<&str>,
    ) -> Result<UsageSummary, GhlError> {
        self.usage.usage_summary(client_id, since).await
    }

    /// Rows for the client, oldest first.
    pub async fn list(
        &self,
        client_id: &str,
        since: Option<&str>,
    ) -> Result<Vec<UsageLog>, GhlError> {
        self.usage.list_usage(client_id, since).await
    }

    async fn price(&self, entry: &UsageEntry) -> Option<f64> {
        let usage = entry.usage.as_ref()?;
        let provider_type = entry.provider_type?;
        let model = entry.model_used.as_deref()?;

        let catalog_entry = match self.catalog.find_model(provider_type, model).await {
            Ok(found) => found,
            Err(e) => {
                warn!(provider = %provider_type, model, error = %e, "catalog lookup failed");
                return None;
            }
        };
        let Some(pricing) = catalog_entry.and_then(|m| m.pricing) else {
            debug!(provider = %provider_type, model, "no catalog pricing; cost left unset");
            return None;
        };
        let cost = calculate_cost(usage, &pricing);
        if cost.is_none() {
            debug!(
                provider = %provider_type,
                model,
                unit = ?pricing.unit,
                "catalog pricing not interpretable; cost left unset"
            );
        }
        cost
    }
}
