//! Integration config routes. Secrets go in, never come back out: reads
//! expose presence flags instead of the stored values.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use adsync_core::Marketplace;
use adsync_db::UpsertMarketplaceConfig;
use adsync_sync::ActionReport;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct ConfigView {
    integration: String,
    client_id: Option<String>,
    has_client_secret: bool,
    has_access_token: bool,
    has_refresh_token: bool,
    token_expires_at: Option<DateTime<Utc>>,
    sync_enabled: bool,
    last_sync_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ConfigBody {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sync_enabled: bool,
}

fn parse_integration(request_id: &str, raw: &str) -> Result<Marketplace, ApiError> {
    raw.parse().map_err(|_| {
        ApiError::new(
            request_id.to_string(),
            "bad_request",
            format!("unknown integration: {raw}"),
        )
    })
}

fn view_of(row: adsync_db::MarketplaceConfigRow) -> ConfigView {
    ConfigView {
        integration: row.integration,
        client_id: row.client_id,
        has_client_secret: row.client_secret.is_some(),
        has_access_token: row.access_token.is_some(),
        has_refresh_token: row.refresh_token.is_some(),
        token_expires_at: row.token_expires_at,
        sync_enabled: row.sync_enabled,
        last_sync_at: row.last_sync_at,
    }
}

pub(super) async fn get_config(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(integration): Path<String>,
) -> Result<Json<ApiResponse<ConfigView>>, ApiError> {
    let integration = parse_integration(&req_id.0, &integration)?;

    let row = adsync_db::get_config(&state.pool, integration)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("no configuration stored for {integration}"),
            )
        })?;

    Ok(Json(ApiResponse {
        data: view_of(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn upsert_config(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(integration): Path<String>,
    Json(body): Json<ConfigBody>,
) -> Result<Json<ApiResponse<ConfigView>>, ApiError> {
    let integration = parse_integration(&req_id.0, &integration)?;

    let row = adsync_db::upsert_config(
        &state.pool,
        integration,
        &UpsertMarketplaceConfig {
            client_id: body.client_id,
            client_secret: body.client_secret,
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            token_expires_at: body.token_expires_at,
            sync_enabled: body.sync_enabled,
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: view_of(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn check_token(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(integration): Path<String>,
) -> Result<Json<ApiResponse<ActionReport>>, ApiError> {
    // Only the OLX-style integration has a live token-validation path.
    let integration = parse_integration(&req_id.0, &integration)?;
    if integration != Marketplace::Olx {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            format!("token validation is not available for {integration}"),
        ));
    }

    let report = adsync_sync::check_token(&state.pool, &state.sync).await;
    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}
