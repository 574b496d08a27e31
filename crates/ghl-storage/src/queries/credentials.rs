// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider credential CRUD operations.
//!
//! Secrets are stored as three hex columns and never decrypted here.

use ghl_core::GhlError;
use ghl_core::traits::NewCredential;
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Constraint, Database, constraint_violation, map_tr_err, now_timestamp};
use crate::models::{
    Credential, EncryptedSecret, ModelConfig, ProviderType, json_column, provider_column, to_json,
};

const COLUMNS: &str = "id, client_id, provider_type, api_key_encrypted, encryption_iv, \
                       encryption_tag, model_config, is_active, priority, last_used_at, \
                       created_at, updated_at";

/// Selection order: lower priority first, then most recently used, never-used
/// last, then insertion order.
const SELECTION_ORDER: &str = "ORDER BY priority ASC, last_used_at IS NULL ASC, \
                               last_used_at DESC, created_at ASC, rowid ASC";

fn row_to_credential(row: &Row<'_>) -> rusqlite::Result<Credential> {
    let provider: String = row.get(2)?;
    let model_config: String = row.get(6)?;
    Ok(Credential {
        id: row.get(0)?,
        client_id: row.get(1)?,
        provider_type: provider_column(2, &provider)?,
        secret: EncryptedSecret {
            ciphertext: row.get(3)?,
            iv: row.get(4)?,
            tag: row.get(5)?,
        },
        model_config: json_column(6, &model_config)?,
        is_active: row.get(7)?,
        priority: row.get(8)?,
        last_used_at: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn select_by_id(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<Option<Credential>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM ghl_ai_providers WHERE id = ?1"),
        params![id],
        row_to_credential,
    )
    .optional()
}

fn not_found(id: &str) -> GhlError {
    GhlError::NotFound {
        entity: "credential",
        id: id.to_string(),
    }
}

/// Insert a credential whose secret is already encrypted.
///
/// A unique violation on (client_id, provider_type) becomes
/// [`GhlError::DuplicateCredential`]; a missing client becomes
/// [`GhlError::NotFound`].
pub async fn insert_credential(
    db: &Database,
    credential: NewCredential,
) -> Result<Credential, GhlError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_timestamp();
    let client_id = credential.client_id.clone();
    let provider_type = credential.provider_type;

    let result = db
        .connection()
        .call(move |conn| -> rusqlite::Result<Credential> {
            conn.execute(
                "INSERT INTO ghl_ai_providers
                    (id, client_id, provider_type, api_key_encrypted, encryption_iv,
                     encryption_tag, model_config, is_active, priority, last_used_at,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, NULL, ?9, ?9)",
                params![
                    id,
                    credential.client_id,
                    credential.provider_type.to_string(),
                    credential.secret.ciphertext,
                    credential.secret.iv,
                    credential.secret.tag,
                    to_json(&credential.model_config)?,
                    credential.priority,
                    now,
                ],
            )?;
            Ok(Credential {
                id,
                client_id: credential.client_id,
                provider_type: credential.provider_type,
                secret: credential.secret,
                model_config: credential.model_config,
                is_active: true,
                priority: credential.priority,
                last_used_at: None,
                created_at: now.clone(),
                updated_at: now,
            })
        })
        .await;

    result.map_err(|e| match constraint_violation(&e) {
        Some(Constraint::Unique) => GhlError::DuplicateCredential {
            client_id,
            provider_type,
        },
        Some(Constraint::ForeignKey) => GhlError::NotFound {
            entity: "client",
            id: client_id,
        },
        None => map_tr_err(e),
    })
}

/// Get a credential by ID.
pub async fn get_credential(db: &Database, id: &str) -> Result<Option<Credential>, GhlError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| select_by_id(conn, &id))
        .await
        .map_err(map_tr_err)
}

/// Get the client's credential for one provider type.
pub async fn find_credential(
    db: &Database,
    client_id: &str,
    provider_type: ProviderType,
) -> Result<Option<Credential>, GhlError> {
    let client_id = client_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {COLUMNS} FROM ghl_ai_providers
                     WHERE client_id = ?1 AND provider_type = ?2"
                ),
                params![client_id, provider_type.to_string()],
                row_to_credential,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List the client's credentials in selection order.
pub async fn list_credentials(
    db: &Database,
    client_id: &str,
    active_only: bool,
) -> Result<Vec<Credential>, GhlError> {
    let client_id = client_id.to_string();
    db.connection()
        .call(move |conn| {
            let filter = if active_only { "AND is_active = 1" } else { "" };
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM ghl_ai_providers
                 WHERE client_id = ?1 {filter} {SELECTION_ORDER}"
            ))?;
            let rows = stmt.query_map(params![client_id], row_to_credential)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite the encrypted secret.
pub async fn update_secret(
    db: &Database,
    id: &str,
    secret: &EncryptedSecret,
) -> Result<Credential, GhlError> {
    let id = id.to_string();
    let secret = secret.clone();
    let now = now_timestamp();
    let lookup = id.clone();
    db.connection()
        .call(move |conn| -> rusqlite::Result<Option<Credential>> {
            let changed = conn.execute(
                "UPDATE ghl_ai_providers
                 SET api_key_encrypted = ?1, encryption_iv = ?2, encryption_tag = ?3,
                     updated_at = ?4
                 WHERE id = ?5",
                params![secret.ciphertext, secret.iv, secret.tag, now, id],
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

/// Replace the model configuration and/or priority. `None` leaves a field
/// unchanged.
pub async fn update_config(
    db: &Database,
    id: &str,
    model_config: Option<&ModelConfig>,
    priority: Option<i32>,
) -> Result<Credential, GhlError> {
    let id = id.to_string();
    let model_config = model_config.cloned();
    let now = now_timestamp();
    let lookup = id.clone();
    db.connection()
        .call(move |conn| -> rusqlite::Result<Option<Credential>> {
            let config_json = model_config.as_ref().map(to_json).transpose()?;
            let changed = conn.execute(
                "UPDATE ghl_ai_providers
                 SET model_config = COALESCE(?1, model_config),
                     priority = COALESCE(?2, priority),
                     updated_at = ?3
                 WHERE id = ?4",
                params![config_json, priority, now, id],
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
pub async fn set_active(db: &Database, id: &str, active: bool) -> Result<Credential, GhlError> {
    let id = id.to_string();
    let now = now_timestamp();
    let lookup = id.clone();
    db.connection()
        .call(move |conn| -> rusqlite::Result<Option<Credential>> {
            let changed = conn.execute(
                "UPDATE ghl_ai_providers SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
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

/// Record a use. A later timestamp never gets overwritten by an earlier one.
pub async fn touch(db: &Database, id: &str, used_at: &str) -> Result<(), GhlError> {
    let id = id.to_string();
    let used_at = used_at.to_string();
    let lookup = id.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE ghl_ai_providers
                 SET last_used_at = ?1
                 WHERE id = ?2 AND (last_used_at IS NULL OR last_used_at < ?1)",
                params![used_at, id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 && get_credential(db, &lookup).await?.is_none() {
        return Err(not_found(&lookup));
    }
    Ok(())
}

/// Hard delete.
pub async fn delete_credential(db: &Database, id: &str) -> Result<(), GhlError> {
    let id = id.to_string();
    let lookup = id.clone();
    let changed = db
        .connection()
        .call(move |conn| conn.execute("DELETE FROM ghl_ai_providers WHERE id = ?1", params![id]))
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(not_found(&lookup));
    }
    Ok(())
}
