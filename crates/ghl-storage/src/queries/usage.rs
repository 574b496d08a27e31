// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage accounting rows. Insert-only; a trigger rejects updates.

use ghl_core::GhlError;
use ghl_core::traits::NewUsageLog;
use rusqlite::{Row, params};

use crate::database::{Constraint, Database, constraint_violation, map_tr_err, now_timestamp};
use crate::models::{UsageLog, UsageSummary, from_sql_int, provider_column, to_sql_int};

const COLUMNS: &str = "id, client_id, session_id, provider_type, model_used, tokens_input, \
                       tokens_output, tokens_total, cost_usd, request_duration_ms, \
                       error_message, created_at";

fn row_to_usage(row: &Row<'_>) -> rusqlite::Result<UsageLog> {
    let provider: Option<String> = row.get(3)?;
    Ok(UsageLog {
        id: row.get(0)?,
        client_id: row.get(1)?,
        session_id: row.get(2)?,
        provider_type: provider.map(|p| provider_column(3, &p)).transpose()?,
        model_used: row.get(4)?,
        tokens_input: row.get(5)?,
        tokens_output: row.get(6)?,
        tokens_total: row.get(7)?,
        cost_usd: row.get(8)?,
        request_duration_ms: from_sql_int(row.get(9)?),
        error_message: row.get(10)?,
        created_at: row.get(11)?,
    })
}

/// Append one accounting row.
pub async fn insert_usage(db: &Database, entry: NewUsageLog) -> Result<UsageLog, GhlError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_timestamp();
    let client_id = entry.client_id.clone();

    let result = db
        .connection()
        .call(move |conn| -> rusqlite::Result<UsageLog> {
            conn.execute(
                "INSERT INTO ghl_usage_logs
                    (id, client_id, session_id, provider_type, model_used, tokens_input,
                     tokens_output, tokens_total, cost_usd, request_duration_ms,
                     error_message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    id,
                    entry.client_id,
                    entry.session_id,
                    entry.provider_type.map(|p| p.to_string()),
                    entry.model_used,
                    entry.tokens_input,
                    entry.tokens_output,
                    entry.tokens_total,
                    entry.cost_usd,
                    to_sql_int(entry.request_duration_ms),
                    entry.error_message,
                    now,
                ],
            )?;
            Ok(UsageLog {
                id,
                client_id: entry.client_id,
                session_id: entry.session_id,
                provider_type: entry.provider_type,
                model_used: entry.model_used,
                tokens_input: entry.tokens_input,
                tokens_output: entry.tokens_output,
                tokens_total: entry.tokens_total,
                cost_usd: entry.cost_usd,
                request_duration_ms: entry.request_duration_ms,
                error_message: entry.error_message,
                created_at: now,
            })
        })
        .await;

    result.map_err(|e| match constraint_violation(&e) {
        Some(Constraint::ForeignKey) => GhlError::NotFound {
            entity: "client or session",
            id: client_id,
        },
        _ => map_tr_err(e),
    })
}

/// Rows for one client, oldest first, optionally from `since` onwards.
pub async fn list_usage(
    db: &Database,
    client_id: &str,
    since: Option<&str>,
) -> Result<Vec<UsageLog>, GhlError> {
    let client_id = client_id.to_string();
    let since = since.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM ghl_usage_logs
                 WHERE client_id = ?1 AND (?2 IS NULL OR created_at >= ?2)
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![client_id, since], row_to_usage)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Billing aggregate for one client.
///
/// `cost_usd` sums only priced rows; successful rows without a price are
/// counted separately instead of being treated as free.
pub async fn usage_summary(
    db: &Database,
    client_id: &str,
    since: Option<&str>,
) -> Result<UsageSummary, GhlError> {
    let client_id = client_id.to_string();
    let since = since.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(error_message IS NOT NULL), 0),
                        COALESCE(SUM(tokens_input), 0),
                        COALESCE(SUM(tokens_output), 0),
                        COALESCE(SUM(tokens_total), 0),
                        COALESCE(SUM(cost_usd), 0.0),
                        COALESCE(SUM(error_message IS NULL AND cost_usd IS NULL), 0)
                 FROM ghl_usage_logs
                 WHERE client_id = ?1 AND (?2 IS NULL OR created_at >= ?2)",
                params![client_id, since],
                |row| {
                    Ok(UsageSummary {
                        requests: from_sql_int(row.get(0)?),
                        failures: from_sql_int(row.get(1)?),
                        tokens_input: from_sql_int(row.get(2)?),
                        tokens_output: from_sql_int(row.get(3)?),
                        tokens_total: from_sql_int(row.get(4)?),
                        cost_usd: row.get(5)?,
                        unpriced_requests: from_sql_int(row.get(6)?),
                    })
                },
            )
        })
        .await
        .map_err(map_tr_err)
}
