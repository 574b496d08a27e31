// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation session operations.
//!
//! The context column is a JSON array that only ever grows: entries are added
//! with `json_insert(context, '$[#]', ...)` and never rewritten.

use ghl_core::GhlError;
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Constraint, Database, constraint_violation, map_tr_err, now_timestamp};
use crate::models::{ContextEntry, ConversationSession, SessionMetadata, json_column, to_json};

const COLUMNS: &str = "id, client_id, conversation_id, contact_id, context, metadata, \
                       last_message_at, created_at, updated_at";

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<ConversationSession> {
    let context: String = row.get(4)?;
    let metadata: String = row.get(5)?;
    Ok(ConversationSession {
        id: row.get(0)?,
        client_id: row.get(1)?,
        conversation_id: row.get(2)?,
        contact_id: row.get(3)?,
        context: json_column(4, &context)?,
        metadata: json_column(5, &metadata)?,
        last_message_at: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn select_pair(
    conn: &rusqlite::Connection,
    client_id: &str,
    conversation_id: &str,
) -> rusqlite::Result<Option<ConversationSession>> {
    conn.query_row(
        &format!(
            "SELECT {COLUMNS} FROM ghl_conversation_sessions
             WHERE client_id = ?1 AND conversation_id = ?2"
        ),
        params![client_id, conversation_id],
        row_to_session,
    )
    .optional()
}

/// Fetch the session for (client, conversation), creating it when absent.
///
/// Concurrent callers for the same pair all receive the same row.
pub async fn get_or_create_session(
    db: &Database,
    client_id: &str,
    conversation_id: &str,
    contact_id: Option<&str>,
    metadata: &SessionMetadata,
) -> Result<ConversationSession, GhlError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_timestamp();
    let client_id = client_id.to_string();
    let conversation_id = conversation_id.to_string();
    let contact_id = contact_id.map(str::to_string);
    let metadata = metadata.clone();
    let missing = client_id.clone();

    let result = db
        .connection()
        .call(move |conn| -> rusqlite::Result<Option<ConversationSession>> {
            conn.execute(
                "INSERT INTO ghl_conversation_sessions
                    (id, client_id, conversation_id, contact_id, context, metadata,
                     last_message_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, '[]', ?5, ?6, ?6, ?6)
                 ON CONFLICT (client_id, conversation_id) DO NOTHING",
                params![id, client_id, conversation_id, contact_id, to_json(&metadata)?, now],
            )?;
            select_pair(conn, &client_id, &conversation_id)
        })
        .await;

    match result {
        Ok(Some(session)) => Ok(session),
        Ok(None) => Err(GhlError::Internal(
            "session row missing after insert".to_string(),
        )),
        Err(e) if constraint_violation(&e) == Some(Constraint::ForeignKey) => {
            Err(GhlError::NotFound {
                entity: "client",
                id: missing,
            })
        }
        Err(e) => Err(map_tr_err(e)),
    }
}

/// Get a session by ID.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<ConversationSession>, GhlError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM ghl_conversation_sessions WHERE id = ?1"),
                params![id],
                row_to_session,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Get the session for (client, conversation) without creating it.
pub async fn find_session(
    db: &Database,
    client_id: &str,
    conversation_id: &str,
) -> Result<Option<ConversationSession>, GhlError> {
    let client_id = client_id.to_string();
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| select_pair(conn, &client_id, &conversation_id))
        .await
        .map_err(map_tr_err)
}

/// Append one entry to the context log and bump `last_message_at`.
pub async fn append_context(
    db: &Database,
    session_id: &str,
    entry: &ContextEntry,
) -> Result<(), GhlError> {
    let id = session_id.to_string();
    let entry = entry.clone();
    let now = now_timestamp();
    let lookup = id.clone();
    let changed = db
        .connection()
        .call(move |conn| -> rusqlite::Result<usize> {
            conn.execute(
                "UPDATE ghl_conversation_sessions
                 SET context = json_insert(context, '$[#]', json(?1)),
                     last_message_at = ?2,
                     updated_at = ?2
                 WHERE id = ?3",
                params![to_json(&entry)?, now, id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(GhlError::NotFound {
            entity: "session",
            id: lookup,
        });
    }
    Ok(())
}

/// Delete a session. Usage rows that referenced it keep existing with a
/// cleared `session_id`.
pub async fn delete_session(db: &Database, id: &str) -> Result<(), GhlError> {
    let id = id.to_string();
    let lookup = id.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM ghl_conversation_sessions WHERE id = ?1",
                params![id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(GhlError::NotFound {
            entity: "session",
            id: lookup,
        });
    }
    Ok(())
}
