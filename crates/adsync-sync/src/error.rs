//! Orchestrator error type and the uniform action report.
//!
//! Every lifecycle operation ends in an [`ActionReport`]: failures are caught
//! at the orchestrator boundary and converted into a code plus an
//! operator-facing message. Nothing below the surface layers ever sees a raw
//! remote or database error.

use serde::Serialize;
use thiserror::Error;

use adsync_core::Marketplace;
use adsync_db::DbError;
use adsync_olx::OlxError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no marketplace configuration stored for {0}")]
    NotConfigured(Marketplace),

    #[error("synchronization is disabled for {0}")]
    SyncDisabled(Marketplace),

    #[error("no access token stored for {0}")]
    MissingToken(Marketplace),

    #[error("product {0} not found")]
    ProductNotFound(i64),

    #[error("product {0} is not listable (inactive, deleted, or out of stock)")]
    ProductNotListable(i64),

    #[error("product {product_id} already has a live ad (record {ad_record_id})")]
    AlreadyAdvertised { product_id: i64, ad_record_id: i64 },

    #[error("ad record {0} not found")]
    AdNotFound(i64),

    #[error("remote accepted the ad but returned no usable identifier")]
    NoRemoteIdentifier,

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Remote(#[from] OlxError),
}

/// Uniform result of an orchestrator action, shaped for the admin surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct ActionReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_record_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_ad_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<serde_json::Value>,
}

impl ActionReport {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: None,
            message: message.into(),
            ad_record_id: None,
            remote_ad_id: None,
            debug: None,
        }
    }

    #[must_use]
    pub fn failure(err: &SyncError) -> Self {
        let (code, message) = operator_message(err);
        Self {
            success: false,
            code: Some(code.to_string()),
            message,
            ad_record_id: None,
            remote_ad_id: None,
            debug: None,
        }
    }

    #[must_use]
    pub fn with_ad_record(mut self, id: i64) -> Self {
        self.ad_record_id = Some(id);
        self
    }

    #[must_use]
    pub fn with_remote_id(mut self, id: impl Into<String>) -> Self {
        self.remote_ad_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: serde_json::Value) -> Self {
        self.debug = Some(debug);
        self
    }
}

/// Maps a classified failure to a stable code and a message an operator can
/// act on without reading logs.
#[must_use]
pub fn operator_message(err: &SyncError) -> (&'static str, String) {
    match err {
        SyncError::NotConfigured(integration) => (
            "NOT_CONFIGURED",
            format!("no credentials stored for {integration}; fill in the integration settings first"),
        ),
        SyncError::SyncDisabled(integration) => (
            "SYNC_DISABLED",
            format!("synchronization with {integration} is switched off"),
        ),
        SyncError::MissingToken(integration) => (
            "NO_TOKEN",
            format!("no access token stored for {integration}; authorize the account first"),
        ),
        SyncError::ProductNotFound(id) => ("NOT_FOUND", format!("product {id} does not exist")),
        SyncError::ProductNotListable(id) => (
            "NOT_LISTABLE",
            format!("product {id} is inactive, deleted, or out of stock"),
        ),
        SyncError::AlreadyAdvertised { product_id, .. } => (
            "ALREADY_ADVERTISED",
            format!("product {product_id} already has a live listing; remove it before publishing again"),
        ),
        SyncError::AdNotFound(id) => ("NOT_FOUND", format!("ad record {id} does not exist")),
        SyncError::NoRemoteIdentifier => (
            "NO_IDENTIFIER",
            "the marketplace accepted the ad but returned no identifier; \
             the listing may exist remotely — run a migration to reconcile"
                .to_string(),
        ),
        SyncError::Db(e) => ("DB_ERROR", format!("local storage failure: {e}")),
        SyncError::Remote(remote) => remote_operator_message(remote),
    }
}

fn remote_operator_message(err: &OlxError) -> (&'static str, String) {
    let code = err.code();
    let message = match err {
        OlxError::Unauthorized => {
            "access token expired or rejected; generate a new one in the integration settings"
                .to_string()
        }
        OlxError::Forbidden(detail) => {
            format!("the account is not allowed to use autoupload: {detail}")
        }
        OlxError::NotFound(_) => "the marketplace no longer knows this resource".to_string(),
        OlxError::Gone { reason } => format!(
            "plan limitation reported by the marketplace ({})",
            reason.as_deref().unwrap_or("no reason given")
        ),
        OlxError::Validation { detail, .. } => format!("the marketplace rejected the ad: {detail}"),
        OlxError::CloudflareBlock => {
            "the marketplace API is behind an anti-bot challenge right now; try again later"
                .to_string()
        }
        OlxError::Timeout => "the marketplace did not answer in time; try again".to_string(),
        OlxError::Http(e) => format!("network failure talking to the marketplace: {e}"),
        OlxError::UnexpectedStatus { status, .. } => {
            format!("the marketplace returned an unexpected HTTP {status}")
        }
        OlxError::Deserialize { context, .. } => {
            format!("the marketplace answer for {context} could not be understood")
        }
        OlxError::Api {
            status_code,
            message,
        } => format!("marketplace error {status_code}: {message}"),
    };
    (code, message)
}
