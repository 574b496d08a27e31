// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ghl usage`: billing summary and per-attempt rows for one tenant.

use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use ghl_core::GhlError;
use ghl_core::types::{UsageLog, UsageSummary};
use ghl_storage::TIMESTAMP_FORMAT;
use serde::Serialize;

use crate::app::App;
use crate::clients::print_json;

#[derive(Args, Debug)]
pub struct UsageArgs {
    /// Client id or location id.
    #[arg(long)]
    pub client: String,
    /// Only rows from this date (YYYY-MM-DD) or instant (RFC 3339) onwards.
    #[arg(long)]
    pub since: Option<String>,
    /// Also print every attempt.
    #[arg(long)]
    pub rows: bool,
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UsageReport<'a> {
    client_id: &'a str,
    since: Option<&'a str>,
    summary: &'a UsageSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<&'a [UsageLog]>,
}

pub async fn run(app: &App, args: UsageArgs) -> Result<(), GhlError> {
    let client = app.resolve_client(&args.client).await?;
    let since = args.since.as_deref().map(parse_since).transpose()?;

    let summary = app.recorder.summary(&client.id, since.as_deref()).await?;
    let rows = if args.rows {
        Some(app.recorder.list(&client.id, since.as_deref()).await?)
    } else {
        None
    };

    if args.json {
        return print_json(&UsageReport {
            client_id: &client.id,
            since: since.as_deref(),
            summary: &summary,
            rows: rows.as_deref(),
        });
    }

    println!();
    println!("  usage for {} ({})", client.location_id, client.id);
    if let Some(since) = &since {
        println!("  since {since}");
    }
    println!("  {}", "-".repeat(50));
    println!("    requests        {}", summary.requests);
    println!("    failures        {}", summary.failures);
    println!(
        "    tokens          in {} / out {} / total {}",
        summary.tokens_input, summary.tokens_output, summary.tokens_total
    );
    println!("    cost            ${:.6}", summary.cost_usd);
    if summary.unpriced_requests > 0 {
        println!("    unpriced        {} requests", summary.unpriced_requests);
    }
    if let Some(rows) = &rows {
        println!();
        for row in rows {
            println!("    {}", row_line(row));
        }
    }
    println!();
    Ok(())
}

/// Normalizes `--since` to the stored timestamp format so the text
/// comparison in storage orders correctly.
fn parse_since(raw: &str) -> Result<String, GhlError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(start) = date.and_hms_opt(0, 0, 0) {
            return Ok(start.and_utc().format(TIMESTAMP_FORMAT).to_string());
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc).format(TIMESTAMP_FORMAT).to_string())
        .map_err(|_| GhlError::Config(format!("--since expects YYYY-MM-DD or RFC 3339, got {raw:?}")))
}

fn row_line(row: &UsageLog) -> String {
    let provider = row
        .provider_type
        .map_or_else(|| "-".to_string(), |p| p.to_string());
    let outcome = match &row.error_message {
        Some(e) => format!("error: {e}"),
        None => format!(
            "{} tokens, {}",
            row.tokens_total.unwrap_or(0),
            row.cost_usd
                .map_or_else(|| "unpriced".to_string(), |c| format!("${c:.6}"))
        ),
    };
    format!(
        "{}  {:<10} {:<28} {:>6}ms  {}",
        row.created_at,
        provider,
        row.model_used.as_deref().unwrap_or("-"),
        row.request_duration_ms,
        outcome
    )
}
