use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct SyncLogItem {
    id: i64,
    integration: String,
    action: String,
    outcome: String,
    message: Option<String>,
    request_payload: Option<serde_json::Value>,
    response_payload: Option<serde_json::Value>,
    ad_record_id: Option<i64>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SyncLogQuery {
    pub limit: Option<i64>,
}

pub(super) async fn list_sync_log(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SyncLogQuery>,
) -> Result<Json<ApiResponse<Vec<SyncLogItem>>>, ApiError> {
    let rows = adsync_db::list_sync_log(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| SyncLogItem {
            id: row.id,
            integration: row.integration,
            action: row.action,
            outcome: row.outcome,
            message: row.message,
            request_payload: row.request_payload,
            response_payload: row.response_payload,
            ad_record_id: row.ad_record_id,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
