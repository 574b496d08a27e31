// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model catalog operations.

use ghl_core::GhlError;
use ghl_core::traits::NewModel;
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err, now_timestamp};
use crate::models::{AvailableModel, ProviderType, opt_json_column, provider_column, to_json};

const COLUMNS: &str = "id, provider_type, model_id, display_name, description, capabilities, \
                       pricing, context_window, max_output_tokens, is_active, created_at, \
                       updated_at";

fn row_to_model(row: &Row<'_>) -> rusqlite::Result<AvailableModel> {
    let provider: String = row.get(1)?;
    Ok(AvailableModel {
        id: row.get(0)?,
        provider_type: provider_column(1, &provider)?,
        model_id: row.get(2)?,
        display_name: row.get(3)?,
        description: row.get(4)?,
        capabilities: opt_json_column(5, row.get(5)?)?,
        pricing: opt_json_column(6, row.get(6)?)?,
        context_window: row.get(7)?,
        max_output_tokens: row.get(8)?,
        is_active: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn select_pair(
    conn: &rusqlite::Connection,
    provider_type: &str,
    model_id: &str,
) -> rusqlite::Result<Option<AvailableModel>> {
    conn.query_row(
        &format!(
            "SELECT {COLUMNS} FROM ghl_available_models
             WHERE provider_type = ?1 AND model_id = ?2"
        ),
        params![provider_type, model_id],
        row_to_model,
    )
    .optional()
}

/// Insert a catalog entry or replace the descriptive fields of an existing
/// (provider, model) entry. The row id and creation time are kept.
pub async fn upsert_model(db: &Database, model: NewModel) -> Result<AvailableModel, GhlError> {
    let id = format!("model-{}", uuid::Uuid::new_v4());
    let now = now_timestamp();
    let provider = model.provider_type.to_string();
    let model_id = model.model_id.clone();
    let lookup = format!("{provider}/{model_id}");
    db.connection()
        .call(move |conn| -> rusqlite::Result<Option<AvailableModel>> {
            let capabilities = model.capabilities.as_ref().map(to_json).transpose()?;
            let pricing = model.pricing.as_ref().map(to_json).transpose()?;
            conn.execute(
                "INSERT INTO ghl_available_models
                    (id, provider_type, model_id, display_name, description, capabilities,
                     pricing, context_window, max_output_tokens, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?10)
                 ON CONFLICT (provider_type, model_id) DO UPDATE SET
                    display_name = excluded.display_name,
                    description = excluded.description,
                    capabilities = excluded.capabilities,
                    pricing = excluded.pricing,
                    context_window = excluded.context_window,
                    max_output_tokens = excluded.max_output_tokens,
                    is_active = 1,
                    updated_at = excluded.updated_at",
                params![
                    id,
                    provider,
                    model.model_id,
                    model.display_name,
                    model.description,
                    capabilities,
                    pricing,
                    model.context_window,
                    model.max_output_tokens,
                    now,
                ],
            )?;
            select_pair(conn, &provider, &model_id)
        })
        .await
        .map_err(map_tr_err)?
        .ok_or(GhlError::NotFound {
            entity: "model",
            id: lookup,
        })
}

/// Catalog entry for a (provider, model) pair, active or not.
pub async fn find_model(
    db: &Database,
    provider_type: ProviderType,
    model_id: &str,
) -> Result<Option<AvailableModel>, GhlError> {
    let model_id = model_id.to_string();
    db.connection()
        .call(move |conn| select_pair(conn, &provider_type.to_string(), &model_id))
        .await
        .map_err(map_tr_err)
}

/// List catalog entries, optionally for one provider.
pub async fn list_models(
    db: &Database,
    provider_type: Option<ProviderType>,
) -> Result<Vec<AvailableModel>, GhlError> {
    let provider = provider_type.map(|p| p.to_string());
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM ghl_available_models
                 WHERE ?1 IS NULL OR provider_type = ?1
                 ORDER BY provider_type ASC, model_id ASC"
            ))?;
            let rows = stmt.query_map(params![provider], row_to_model)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Toggle whether an entry is offered.
pub async fn set_model_active(db: &Database, id: &str, active: bool) -> Result<(), GhlError> {
    let id = id.to_string();
    let lookup = id.clone();
    let now = now_timestamp();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE ghl_available_models SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
                params![active, now, id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(GhlError::NotFound {
            entity: "model",
            id: lookup,
        });
    }
    Ok(())
}
