// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound webhook audit rows. Insert-only.

use ghl_core::GhlError;
use ghl_core::traits::NewWebhookLog;
use rusqlite::{Row, params};

use crate::database::{Database, map_tr_err, now_timestamp};
use crate::models::{WebhookLog, opt_json_column, to_json};

const COLUMNS: &str = "id, client_id, event_type, payload, response_status, error_message, created_at";

fn row_to_webhook(row: &Row<'_>) -> rusqlite::Result<WebhookLog> {
    Ok(WebhookLog {
        id: row.get(0)?,
        client_id: row.get(1)?,
        event_type: row.get(2)?,
        payload: opt_json_column(3, row.get(3)?)?,
        response_status: row.get(4)?,
        error_message: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Append one webhook event.
///
/// An unknown `client_id` is stored as NULL rather than rejected: events are
/// logged even when they cannot be attributed.
pub async fn insert_webhook_log(
    db: &Database,
    entry: NewWebhookLog,
) -> Result<WebhookLog, GhlError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> rusqlite::Result<WebhookLog> {
            let payload = entry.payload.as_ref().map(to_json).transpose()?;
            let client_id: Option<String> = match &entry.client_id {
                Some(cid) => conn
                    .query_row(
                        "SELECT id FROM clients WHERE id = ?1",
                        params![cid],
                        |row| row.get(0),
                    )
                    .ok(),
                None => None,
            };
            conn.execute(
                "INSERT INTO ghl_webhook_logs
                    (id, client_id, event_type, payload, response_status, error_message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    client_id,
                    entry.event_type,
                    payload,
                    entry.response_status,
                    entry.error_message,
                    now,
                ],
            )?;
            Ok(WebhookLog {
                id,
                client_id,
                event_type: entry.event_type,
                payload: entry.payload,
                response_status: entry.response_status,
                error_message: entry.error_message,
                created_at: now,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent events first, optionally for one client.
pub async fn list_webhook_logs(
    db: &Database,
    client_id: Option<&str>,
    limit: usize,
) -> Result<Vec<WebhookLog>, GhlError> {
    let client_id = client_id.map(str::to_string);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM ghl_webhook_logs
                 WHERE ?1 IS NULL OR client_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![client_id, limit], row_to_webhook)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}
