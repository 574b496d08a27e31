// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant CRUD operations.

use ghl_core::GhlError;
use ghl_core::traits::NewClient;
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err, now_timestamp};
use crate::models::{Client, ClientSettings, json_column, to_json};

const COLUMNS: &str = "id, location_id, company_name, subscription_tier, is_active, settings, \
                       created_at, updated_at";

fn row_to_client(row: &Row<'_>) -> rusqlite::Result<Client> {
    let settings: String = row.get(5)?;
    Ok(Client {
        id: row.get(0)?,
        location_id: row.get(1)?,
        company_name: row.get(2)?,
        subscription_tier: row.get(3)?,
        is_active: row.get(4)?,
        settings: json_column(5, &settings)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn select_by_id(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<Option<Client>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM clients WHERE id = ?1"),
        params![id],
        row_to_client,
    )
    .optional()
}

fn not_found(id: &str) -> GhlError {
    GhlError::NotFound {
        entity: "client",
        id: id.to_string(),
    }
}

/// Insert a new tenant.
pub async fn create_client(db: &Database, client: NewClient) -> Result<Client, GhlError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> rusqlite::Result<Client> {
            conn.execute(
                "INSERT INTO clients
                    (id, location_id, company_name, subscription_tier, is_active, settings,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?6)",
                params![
                    id,
                    client.location_id,
                    client.company_name,
                    client.subscription_tier,
                    to_json(&client.settings)?,
                    now,
                ],
            )?;
            Ok(Client {
                id,
                location_id: client.location_id,
                company_name: client.company_name,
                subscription_tier: client.subscription_tier,
                is_active: true,
                settings: client.settings,
                created_at: now.clone(),
                updated_at: now,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Get a tenant by ID.
pub async fn get_client(db: &Database, id: &str) -> Result<Option<Client>, GhlError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| select_by_id(conn, &id))
        .await
        .map_err(map_tr_err)
}

/// Get a tenant by its external location ID.
pub async fn find_client_by_location(
    db: &Database,
    location_id: &str,
) -> Result<Option<Client>, GhlError> {
    let location_id = location_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM clients WHERE location_id = ?1"),
                params![location_id],
                row_to_client,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List all tenants, oldest first.
pub async fn list_clients(db: &Database) -> Result<Vec<Client>, GhlError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM clients ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map([], row_to_client)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Replace the settings map.
pub async fn update_client_settings(
    db: &Database,
    id: &str,
    settings: &ClientSettings,
) -> Result<Client, GhlError> {
    let id = id.to_string();
    let settings = settings.clone();
    let now = now_timestamp();
    let lookup = id.clone();
    db.connection()
        .call(move |conn| -> rusqlite::Result<Option<Client>> {
            let changed = conn.execute(
                "UPDATE clients SET settings = ?1, updated_at = ?2 WHERE id = ?3",
                params![to_json(&settings)?, now, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            select_by_id(conn, &id)
        })
        .await
        .map_err(map_tr_err)?
        .ok_or_else(|| not_found(&lookup))
}

/// Toggle the active flag.
pub async fn set_client_active(db: &Database, id: &str, active: bool) -> Result<Client, GhlError> {
    let id = id.to_string();
    let now = now_timestamp();
    let lookup = id.clone();
    db.connection()
        .call(move |conn| -> rusqlite::Result<Option<Client>> {
            let changed = conn.execute(
                "UPDATE clients SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
                params![active, now, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            select_by_id(conn, &id)
        })
        .await
        .map_err(map_tr_err)?
        .ok_or_else(|| not_found(&lookup))
}

/// Hard delete. Foreign keys cascade to credentials, sessions, and usage.
pub async fn delete_client(db: &Database, id: &str) -> Result<(), GhlError> {
    let id = id.to_string();
    let lookup = id.clone();
    let changed = db
        .connection()
        .call(move |conn| conn.execute("DELETE FROM clients WHERE id = ?1", params![id]))
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(not_found(&lookup));
    }
    Ok(())
}
