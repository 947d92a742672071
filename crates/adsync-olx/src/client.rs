//! HTTP client for the marketplace autoupload REST API.
//!
//! Wraps `reqwest` with bearer-token auth, base-URL management, and the
//! failure classification every caller depends on: each response is turned
//! into either a typed value or an [`OlxError`] variant at this boundary.
//! No retry logic lives here — callers decide whether an operation is worth
//! repeating.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};

use crate::error::OlxError;
use crate::types::{
    AdDetail, AdPayload, BalanceInfo, CreateAdResponse, ImportStatus, PublishedAd,
    PublishedAdsResponse, TokenGrant,
};

const DEFAULT_BASE_URL: &str = "https://apps.olx.com.br/";

/// Client for the marketplace autoupload REST API.
///
/// Use [`OlxClient::new`] for production or [`OlxClient::with_base_url`] to
/// point at a mock server in tests.
pub struct OlxClient {
    client: Client,
    access_token: String,
    base_url: Url,
}

impl OlxClient {
    /// Creates a new client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`OlxError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(access_token: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, OlxError> {
        Self::with_base_url(access_token, timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (staging, or wiremock in
    /// tests).
    ///
    /// # Errors
    ///
    /// Returns [`OlxError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed, or [`OlxError::Api`] if `base_url` is not a valid URL.
    pub fn with_base_url(
        access_token: &str,
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, OlxError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Normalise: ensure the base URL ends with exactly one slash so that
        // Url::join appends path segments instead of replacing the last one.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| OlxError::Api {
            status_code: 0,
            message: format!("invalid base URL '{base_url}': {e}"),
        })?;

        Ok(Self {
            client,
            access_token: access_token.to_owned(),
            base_url,
        })
    }

    /// Returns a client identical to this one but carrying a new token.
    /// Used after an OAuth refresh grant.
    #[must_use]
    pub fn with_access_token(mut self, access_token: &str) -> Self {
        self.access_token = access_token.to_owned();
        self
    }

    /// Submits one ad to the import endpoint and resolves the response shape.
    ///
    /// The platform may answer with a resolved `ad_list`, an opaque import
    /// `token`, or a bare `uuid`/`id`; the returned [`CreateAdResponse`]
    /// carries both the resolved outcome and the raw body for the audit log.
    ///
    /// # Errors
    ///
    /// Any classified [`OlxError`]; see the error taxonomy.
    pub async fn create_ad(&self, payload: &AdPayload) -> Result<CreateAdResponse, OlxError> {
        let url = self.endpoint("autoupload/import")?;
        let body = serde_json::json!({ "ad_list": [payload] });

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let body = self.read_json(response, "createAd").await?;
        check_api_envelope(&body)?;
        Ok(CreateAdResponse::from_body(body))
    }

    /// Deletes a remote ad by its resolved id.
    ///
    /// # Errors
    ///
    /// [`OlxError::NotFound`] when the ad is already gone; otherwise any
    /// classified [`OlxError`]. Callers running the best-effort removal path
    /// treat both as acceptable.
    pub async fn delete_ad(&self, remote_id: &str) -> Result<(), OlxError> {
        let url = self.endpoint(&format!("autoupload/ads/{remote_id}"))?;

        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(transport)?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(classify_failure(response).await)
    }

    /// Fetches the account's ad balance / plan information.
    ///
    /// A `410` here is not necessarily fatal: accounts on the basic plan get
    /// `Gone { reason: PRODUCT_NOT_FOUND_BY_ACCOUNT }`, which token
    /// validation treats as "valid token, different plan".
    ///
    /// # Errors
    ///
    /// Any classified [`OlxError`].
    pub async fn get_balance(&self) -> Result<BalanceInfo, OlxError> {
        let url = self.endpoint("autoupload/balance")?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(transport)?;

        let body = self.read_json(response, "getBalance").await?;
        check_api_envelope(&body)?;
        serde_json::from_value(body).map_err(|e| OlxError::Deserialize {
            context: "getBalance".to_owned(),
            source: e,
        })
    }

    /// Lists currently published remote ads, up to `limit` entries.
    ///
    /// # Errors
    ///
    /// Any classified [`OlxError`].
    pub async fn list_published_ads(&self, limit: usize) -> Result<Vec<PublishedAd>, OlxError> {
        let mut url = self.endpoint("autoupload/published")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(transport)?;

        let body = self.read_json(response, "listPublishedAds").await?;
        check_api_envelope(&body)?;
        let parsed: PublishedAdsResponse =
            serde_json::from_value(body).map_err(|e| OlxError::Deserialize {
                context: "listPublishedAds".to_owned(),
                source: e,
            })?;
        Ok(parsed.ads)
    }

    /// Fetches detail (status, price) for a single remote ad.
    ///
    /// # Errors
    ///
    /// Any classified [`OlxError`].
    pub async fn get_ad_status(&self, remote_id: &str) -> Result<AdDetail, OlxError> {
        let url = self.endpoint(&format!("autoupload/ads/{remote_id}"))?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(transport)?;

        let body = self
            .read_json(response, &format!("getAdStatus({remote_id})"))
            .await?;
        check_api_envelope(&body)?;
        serde_json::from_value(body).map_err(|e| OlxError::Deserialize {
            context: format!("getAdStatus({remote_id})"),
            source: e,
        })
    }

    /// Polls the status of an asynchronous import by its opaque token.
    ///
    /// # Errors
    ///
    /// Any classified [`OlxError`].
    pub async fn get_import_status(&self, import_token: &str) -> Result<ImportStatus, OlxError> {
        let url = self.endpoint(&format!("autoupload/import/{import_token}"))?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(transport)?;

        let body = self.read_json(response, "getImportStatus").await?;
        check_api_envelope(&body)?;
        serde_json::from_value(body).map_err(|e| OlxError::Deserialize {
            context: "getImportStatus".to_owned(),
            source: e,
        })
    }

    /// Exchanges a refresh token for a new access token via the OAuth
    /// refresh grant.
    ///
    /// # Errors
    ///
    /// Any classified [`OlxError`]; an expired refresh token surfaces as
    /// [`OlxError::Unauthorized`].
    pub async fn refresh_access_token(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<TokenGrant, OlxError> {
        let url = self.endpoint("oauth/token")?;
        let body = serde_json::json!({
            "grant_type": "refresh_token",
            "client_id": client_id,
            "client_secret": client_secret,
            "refresh_token": refresh_token,
        });

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let body = self.read_json(response, "refreshAccessToken").await?;
        serde_json::from_value(body).map_err(|e| OlxError::Deserialize {
            context: "refreshAccessToken".to_owned(),
            source: e,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, OlxError> {
        self.base_url.join(path).map_err(|e| OlxError::Api {
            status_code: 0,
            message: format!("invalid endpoint path '{path}': {e}"),
        })
    }

    /// Reads the body of a response, returning parsed JSON for 2xx and a
    /// classified error otherwise.
    async fn read_json(
        &self,
        response: reqwest::Response,
        context: &str,
    ) -> Result<serde_json::Value, OlxError> {
        let status = response.status();
        if status.is_success() {
            let text = response.text().await.map_err(transport)?;
            return serde_json::from_str(&text).map_err(|e| OlxError::Deserialize {
                context: context.to_owned(),
                source: e,
            });
        }
        Err(classify_failure(response).await)
    }
}

/// Classifies a non-2xx response into the error taxonomy.
async fn classify_failure(response: reqwest::Response) -> OlxError {
    let status = response.status();
    let url = response.url().to_string();
    let text = response.text().await.unwrap_or_default();
    classify_status(status, &url, &text)
}

/// Maps a transport-level `reqwest` failure, splitting timeouts out so the
/// orchestrator can report them distinctly.
fn transport(err: reqwest::Error) -> OlxError {
    if err.is_timeout() {
        OlxError::Timeout
    } else {
        OlxError::Http(err)
    }
}

fn classify_status(status: StatusCode, url: &str, body: &str) -> OlxError {
    if is_challenge_page(body) {
        return OlxError::CloudflareBlock;
    }

    let json: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let message = json
        .as_ref()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("statusMessage"))
                .and_then(serde_json::Value::as_str)
        })
        .unwrap_or("no message")
        .to_string();

    match status.as_u16() {
        401 => OlxError::Unauthorized,
        403 => OlxError::Forbidden(message),
        404 => OlxError::NotFound(url.to_string()),
        410 => OlxError::Gone {
            reason: json.as_ref().and_then(|v| {
                v.get("reason")
                    .or_else(|| v.get("message"))
                    .and_then(serde_json::Value::as_str)
                    .map(ToString::to_string)
            }),
        },
        400 | 543 => OlxError::Validation {
            status: status.as_u16(),
            detail: json
                .as_ref()
                .map_or_else(|| message.clone(), extract_validation_detail),
        },
        code => OlxError::UnexpectedStatus {
            status: code,
            url: url.to_string(),
        },
    }
}

/// Anti-bot challenge pages come back as HTML, not JSON; detect them before
/// any status-based classification so a 403 challenge is not mistaken for a
/// real authorization failure.
fn is_challenge_page(body: &str) -> bool {
    let lowered = body.to_lowercase();
    lowered.contains("cf-ray")
        || lowered.contains("cloudflare")
        || lowered.contains("attention required")
        || lowered.contains("cf-browser-verification")
}

/// Checks a 2xx body for the platform's application-level error envelope
/// (`statusCode` below zero). `-6` is the documented "without permission"
/// code and maps to an authorization failure.
fn check_api_envelope(body: &serde_json::Value) -> Result<(), OlxError> {
    let Some(status_code) = body.get("statusCode").and_then(serde_json::Value::as_i64) else {
        return Ok(());
    };
    if status_code >= 0 {
        return Ok(());
    }

    let message = body
        .get("statusMessage")
        .or_else(|| body.get("message"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or("no message")
        .to_string();

    if status_code == -6 {
        return Err(OlxError::Forbidden(message));
    }
    Err(OlxError::Api {
        status_code,
        message,
    })
}

/// Pulls a human-readable summary out of a validation error body. The
/// platform nests field errors under `details`, either as an array of
/// `{field, message}` objects or a bare map.
fn extract_validation_detail(body: &serde_json::Value) -> String {
    if let Some(details) = body.get("details") {
        if let Some(entries) = details.as_array() {
            let parts: Vec<String> = entries
                .iter()
                .map(|entry| {
                    let field = entry
                        .get("field")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or("?");
                    let message = entry
                        .get("message")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or("invalid");
                    format!("{field}: {message}")
                })
                .collect();
            if !parts.is_empty() {
                return parts.join("; ");
            }
        }
        if let Some(map) = details.as_object() {
            let parts: Vec<String> = map
                .iter()
                .map(|(field, message)| {
                    let message = message.as_str().unwrap_or("invalid");
                    format!("{field}: {message}")
                })
                .collect();
            if !parts.is_empty() {
                return parts.join("; ");
            }
        }
    }

    body.get("message")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("payload rejected")
        .to_string()
}
