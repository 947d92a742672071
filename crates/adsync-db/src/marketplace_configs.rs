//! Database operations for the per-integration `marketplace_configs` table.
//!
//! One row per integration, keyed on the `integration` string. Orchestrator
//! actions read the row fresh at the start of every action and thread it
//! through as a value; nothing caches it in-process.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use adsync_core::Marketplace;

use crate::DbError;

/// A row from the `marketplace_configs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MarketplaceConfigRow {
    pub id: i64,
    pub integration: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub sync_enabled: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MarketplaceConfigRow {
    /// Whether the stored access token is past its recorded expiry.
    ///
    /// A missing expiry is treated as not expired; the remote call will
    /// surface a 401 if the platform disagrees.
    #[must_use]
    pub fn token_expired(&self, now: DateTime<Utc>) -> bool {
        self.token_expires_at.is_some_and(|expiry| expiry <= now)
    }
}

/// Fields accepted when creating or updating an integration config.
#[derive(Debug, Clone, Default)]
pub struct UpsertMarketplaceConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub sync_enabled: bool,
}

const CONFIG_COLUMNS: &str = "id, integration, client_id, client_secret, access_token, \
     refresh_token, token_expires_at, sync_enabled, last_sync_at, created_at, updated_at";

/// Fetches the config row for an integration, if one exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_config(
    pool: &PgPool,
    integration: Marketplace,
) -> Result<Option<MarketplaceConfigRow>, DbError> {
    let row = sqlx::query_as::<_, MarketplaceConfigRow>(&format!(
        "SELECT {CONFIG_COLUMNS} FROM marketplace_configs WHERE integration = $1"
    ))
    .bind(integration.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts or replaces the singleton config row for an integration.
///
/// Returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_config(
    pool: &PgPool,
    integration: Marketplace,
    config: &UpsertMarketplaceConfig,
) -> Result<MarketplaceConfigRow, DbError> {
    let row = sqlx::query_as::<_, MarketplaceConfigRow>(&format!(
        "INSERT INTO marketplace_configs \
             (integration, client_id, client_secret, access_token, refresh_token, \
              token_expires_at, sync_enabled) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (integration) DO UPDATE SET \
             client_id        = EXCLUDED.client_id, \
             client_secret    = EXCLUDED.client_secret, \
             access_token     = EXCLUDED.access_token, \
             refresh_token    = EXCLUDED.refresh_token, \
             token_expires_at = EXCLUDED.token_expires_at, \
             sync_enabled     = EXCLUDED.sync_enabled, \
             updated_at       = NOW() \
         RETURNING {CONFIG_COLUMNS}"
    ))
    .bind(integration.as_str())
    .bind(&config.client_id)
    .bind(&config.client_secret)
    .bind(&config.access_token)
    .bind(&config.refresh_token)
    .bind(config.token_expires_at)
    .bind(config.sync_enabled)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Persists tokens obtained from an OAuth refresh grant.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no config row exists for the integration,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn store_refreshed_tokens(
    pool: &PgPool,
    integration: Marketplace,
    access_token: &str,
    refresh_token: Option<&str>,
    token_expires_at: Option<DateTime<Utc>>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE marketplace_configs \
         SET access_token = $1, \
             refresh_token = COALESCE($2, refresh_token), \
             token_expires_at = $3, \
             updated_at = NOW() \
         WHERE integration = $4",
    )
    .bind(access_token)
    .bind(refresh_token)
    .bind(token_expires_at)
    .bind(integration.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Stamps `last_sync_at = NOW()` after a successful remote action.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn touch_last_sync(pool: &PgPool, integration: Marketplace) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE marketplace_configs SET last_sync_at = NOW(), updated_at = NOW() \
         WHERE integration = $1",
    )
    .bind(integration.as_str())
    .execute(pool)
    .await?;

    Ok(())
}
