//! Database operations for the `ad_records` table.
//!
//! Status writes go through [`transition_status`], which validates the move
//! against the lifecycle table in `adsync-core` and guards the UPDATE with the
//! expected current status, so a concurrent writer cannot sneak an illegal
//! transition past the check.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use adsync_core::{AdStatus, Marketplace};

use crate::DbError;

/// A row from the `ad_records` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdRecordRow {
    pub id: i64,
    pub public_id: Uuid,
    pub product_id: i64,
    pub integration: String,
    /// Resolved remote listing id, or the opaque import token while the
    /// remote platform is still processing the ad.
    pub remote_ad_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub status: String,
    pub error_message: Option<String>,
    pub synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdRecordRow {
    /// Parses the stored status string into the typed lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns the offending string if the column holds an unknown value.
    /// The guarded writes in this module keep that from happening; a failure
    /// here means the row was edited outside the application.
    pub fn ad_status(&self) -> Result<AdStatus, String> {
        self.status.parse()
    }
}

/// Fields accepted when creating an ad record.
#[derive(Debug, Clone)]
pub struct NewAdRecord {
    pub product_id: i64,
    pub integration: Marketplace,
    pub remote_ad_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub status: AdStatus,
}

const AD_COLUMNS: &str = "id, public_id, product_id, integration, remote_ad_id, title, \
     description, price, status, error_message, synced_at, created_at, updated_at";

/// Inserts a new ad record and returns the stored row.
///
/// The partial unique index on `(product_id, integration) WHERE status <>
/// 'removed'` makes a second live record for the same product a constraint
/// violation, surfaced as [`DbError::Sqlx`].
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_ad_record(pool: &PgPool, record: &NewAdRecord) -> Result<AdRecordRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, AdRecordRow>(&format!(
        "INSERT INTO ad_records \
             (public_id, product_id, integration, remote_ad_id, title, description, price, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {AD_COLUMNS}"
    ))
    .bind(public_id)
    .bind(record.product_id)
    .bind(record.integration.as_str())
    .bind(&record.remote_ad_id)
    .bind(&record.title)
    .bind(&record.description)
    .bind(record.price)
    .bind(record.status.as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetches an ad record by internal id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_ad_record(pool: &PgPool, id: i64) -> Result<Option<AdRecordRow>, DbError> {
    let row = sqlx::query_as::<_, AdRecordRow>(&format!(
        "SELECT {AD_COLUMNS} FROM ad_records WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns the live (non-removed) ad record for a product on an integration,
/// if any. This is the friendly pre-check before creating a new ad; the
/// partial unique index is the authoritative guard.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_live_ad_for_product(
    pool: &PgPool,
    product_id: i64,
    integration: Marketplace,
) -> Result<Option<AdRecordRow>, DbError> {
    let row = sqlx::query_as::<_, AdRecordRow>(&format!(
        "SELECT {AD_COLUMNS} FROM ad_records \
         WHERE product_id = $1 AND integration = $2 AND status <> 'removed'"
    ))
    .bind(product_id)
    .bind(integration.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Lists ad records for an integration, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_ad_records(
    pool: &PgPool,
    integration: Marketplace,
    limit: i64,
) -> Result<Vec<AdRecordRow>, DbError> {
    let rows = sqlx::query_as::<_, AdRecordRow>(&format!(
        "SELECT {AD_COLUMNS} FROM ad_records \
         WHERE integration = $1 \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2"
    ))
    .bind(integration.as_str())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Lists records still missing a resolved remote id: either no remote id at
/// all or stuck in `processing` with only an import token. These are the
/// candidates the migration matcher tries to backfill.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unresolved_ads(
    pool: &PgPool,
    integration: Marketplace,
) -> Result<Vec<AdRecordRow>, DbError> {
    let rows = sqlx::query_as::<_, AdRecordRow>(&format!(
        "SELECT {AD_COLUMNS} FROM ad_records \
         WHERE integration = $1 \
           AND status <> 'removed' \
           AND (remote_ad_id IS NULL OR status = 'processing') \
         ORDER BY created_at ASC, id ASC"
    ))
    .bind(integration.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Moves a record from `expected` to `next`, validating against the lifecycle
/// transition table first and guarding the UPDATE with the expected status.
///
/// # Errors
///
/// - [`DbError::InvalidAdStatusTransition`] if the lifecycle table forbids
///   the move.
/// - [`DbError::StaleAdStatus`] if the row no longer carries `expected`
///   (lost race with a concurrent action).
/// - [`DbError::Sqlx`] if the update fails.
pub async fn transition_status(
    pool: &PgPool,
    id: i64,
    expected: AdStatus,
    next: AdStatus,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    if !expected.can_transition_to(next) {
        return Err(DbError::InvalidAdStatusTransition {
            id,
            from: expected.as_str().to_string(),
            to: next.as_str().to_string(),
        });
    }

    let result = sqlx::query(
        "UPDATE ad_records \
         SET status = $1, error_message = $2, synced_at = NOW(), updated_at = NOW() \
         WHERE id = $3 AND status = $4",
    )
    .bind(next.as_str())
    .bind(error_message)
    .bind(id)
    .bind(expected.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::StaleAdStatus {
            id,
            expected_status: expected.as_str().to_string(),
        });
    }

    Ok(())
}

/// Moves a freshly created record into `processing`, storing the opaque
/// import token in the remote-id column as a temporary identifier until a
/// status poll resolves the real listing id.
///
/// # Errors
///
/// Returns [`DbError::StaleAdStatus`] if the row is not `pending`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_processing(pool: &PgPool, id: i64, import_token: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE ad_records \
         SET remote_ad_id = $1, status = 'processing', synced_at = NOW(), updated_at = NOW() \
         WHERE id = $2 AND status = 'pending'",
    )
    .bind(import_token)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::StaleAdStatus {
            id,
            expected_status: "pending".to_string(),
        });
    }

    Ok(())
}

/// Backfills the resolved remote id and marks the record `advertised`.
///
/// Used both by the create flow (import token resolved) and the migration
/// matcher. Only `pending` and `processing` rows are eligible.
///
/// # Errors
///
/// Returns [`DbError::StaleAdStatus`] if the row is not in an unresolved
/// state, or [`DbError::Sqlx`] if the update fails.
pub async fn resolve_remote_id(pool: &PgPool, id: i64, remote_ad_id: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE ad_records \
         SET remote_ad_id = $1, status = 'advertised', error_message = NULL, \
             synced_at = NOW(), updated_at = NOW() \
         WHERE id = $2 AND status IN ('pending', 'processing')",
    )
    .bind(remote_ad_id)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::StaleAdStatus {
            id,
            expected_status: "pending|processing".to_string(),
        });
    }

    Ok(())
}

/// Records a failure on an ad record, preserving the remote id if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_ad_error(pool: &PgPool, id: i64, message: &str) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE ad_records \
         SET status = 'error', error_message = $1, synced_at = NOW(), updated_at = NOW() \
         WHERE id = $2 AND status <> 'removed'",
    )
    .bind(message)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Hard-deletes an ad record. Local deletion is authoritative; the remote
/// removal attempt happens before this and its outcome does not gate it.
///
/// Returns `true` if a row was deleted, `false` if it was already gone —
/// deleting twice is not an error.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_ad_record(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM ad_records WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Deletes every ad record unconditionally. Operator-triggered reset only.
///
/// Returns the number of rows deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn clear_all_ads(pool: &PgPool) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM ad_records").execute(pool).await?;
    Ok(result.rows_affected())
}
