//! Database operations for the append-only `sync_log` audit table.
//!
//! Every orchestrator action writes one entry per branch taken, carrying the
//! raw request/response payloads for postmortem diagnostics. Rows are never
//! updated; the only delete path is the operator bulk clear.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use adsync_core::Marketplace;

use crate::DbError;

/// A row from the `sync_log` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncLogRow {
    pub id: i64,
    pub integration: String,
    pub action: String,
    pub outcome: String,
    pub message: Option<String>,
    pub request_payload: Option<serde_json::Value>,
    pub response_payload: Option<serde_json::Value>,
    pub ad_record_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when appending an audit entry.
#[derive(Debug, Clone)]
pub struct NewSyncLog {
    pub integration: Marketplace,
    pub action: String,
    pub outcome: String,
    pub message: Option<String>,
    pub request_payload: Option<serde_json::Value>,
    pub response_payload: Option<serde_json::Value>,
    pub ad_record_id: Option<i64>,
}

/// Appends one audit entry. Never fails the surrounding action: callers log
/// and continue if this errors, since losing a diagnostic row must not turn a
/// successful remote operation into a reported failure.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn append_sync_log(pool: &PgPool, entry: &NewSyncLog) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar::<_, i64>(
        "INSERT INTO sync_log \
             (integration, action, outcome, message, request_payload, response_payload, ad_record_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id",
    )
    .bind(entry.integration.as_str())
    .bind(&entry.action)
    .bind(&entry.outcome)
    .bind(&entry.message)
    .bind(&entry.request_payload)
    .bind(&entry.response_payload)
    .bind(entry.ad_record_id)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Lists audit entries, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sync_log(pool: &PgPool, limit: i64) -> Result<Vec<SyncLogRow>, DbError> {
    let rows = sqlx::query_as::<_, SyncLogRow>(
        "SELECT id, integration, action, outcome, message, request_payload, \
                response_payload, ad_record_id, created_at \
         FROM sync_log \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Deletes every audit entry unconditionally. Operator-triggered reset only.
///
/// Returns the number of rows deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn clear_sync_log(pool: &PgPool) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM sync_log").execute(pool).await?;
    Ok(result.rows_affected())
}
