//! Ad lifecycle routes. Action handlers return the orchestrator's
//! [`adsync_sync::ActionReport`] inside the standard envelope: a failed
//! action is still HTTP 200 with `success: false` and a stable code, so the
//! admin UI renders toasts instead of error pages.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use adsync_core::Marketplace;
use adsync_sync::{ActionReport, PublishRequest};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct AdItem {
    id: i64,
    public_id: Uuid,
    product_id: i64,
    integration: String,
    remote_ad_id: Option<String>,
    title: String,
    price: Decimal,
    status: String,
    error_message: Option<String>,
    synced_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AdListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PublishBody {
    pub product_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

pub(super) async fn list_ads(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<AdListQuery>,
) -> Result<Json<ApiResponse<Vec<AdItem>>>, ApiError> {
    let rows = adsync_db::list_ad_records(
        &state.pool,
        Marketplace::Olx,
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| AdItem {
            id: row.id,
            public_id: row.public_id,
            product_id: row.product_id,
            integration: row.integration,
            remote_ad_id: row.remote_ad_id,
            title: row.title,
            price: row.price,
            status: row.status,
            error_message: row.error_message,
            synced_at: row.synced_at,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn publish_ad(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<PublishBody>,
) -> Json<ApiResponse<ActionReport>> {
    let request = PublishRequest {
        product_id: body.product_id,
        title: body.title,
        description: body.description,
        category: body.category,
    };
    let report = adsync_sync::publish_ad(&state.pool, &state.sync, &request).await;
    Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn remove_ad(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(ad_record_id): Path<i64>,
) -> Json<ApiResponse<ActionReport>> {
    let report = adsync_sync::remove_ad(&state.pool, &state.sync, ad_record_id).await;
    Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn refresh_ad(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(ad_record_id): Path<i64>,
) -> Json<ApiResponse<ActionReport>> {
    let report = adsync_sync::refresh_ad_status(&state.pool, &state.sync, ad_record_id).await;
    Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn migrate_ads(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<ActionReport>> {
    let report = adsync_sync::migrate_unresolved(&state.pool, &state.sync).await;
    Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn clear_all(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<ActionReport>> {
    let report = adsync_sync::bulk_clear(&state.pool).await;
    Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn get_balance(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<ActionReport>> {
    let report = adsync_sync::check_balance(&state.pool, &state.sync).await;
    Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    })
}
