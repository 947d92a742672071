use thiserror::Error;

/// Errors returned by the marketplace autoupload client.
///
/// Every non-2xx response and transport failure is classified here once, so
/// callers branch on variants instead of re-parsing raw HTTP detail.
#[derive(Debug, Error)]
pub enum OlxError {
    /// 401 — access token invalid or expired.
    #[error("authentication failed: access token rejected")]
    Unauthorized,

    /// 403, or the platform's `statusCode: -6` "without permission" envelope.
    #[error("authorization failed: {0}")]
    Forbidden(String),

    /// 404 — endpoint or resource does not exist (e.g. ad already gone).
    #[error("not found: {0}")]
    NotFound(String),

    /// 410 — the platform signals a plan/availability condition rather than a
    /// missing resource. `reason` carries the platform's explanation (e.g.
    /// `PRODUCT_NOT_FOUND_BY_ACCOUNT` for accounts on the basic plan).
    #[error("gone: {}", reason.as_deref().unwrap_or("no reason given"))]
    Gone { reason: Option<String> },

    /// 400 or the platform's 543 — payload rejected. `detail` is extracted
    /// from the nested `details` structure when present.
    #[error("validation failed (HTTP {status}): {detail}")]
    Validation { status: u16, detail: String },

    /// An anti-bot challenge page was returned in place of the API response.
    #[error("request blocked by the edge challenge in front of the API")]
    CloudflareBlock,

    /// The request exceeded the client timeout.
    #[error("request timed out")]
    Timeout,

    /// Network-level failure from the underlying HTTP client.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Any other non-2xx status (5xx and unexpected 4xx).
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body could not be deserialized into the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The platform returned its application-level error envelope.
    #[error("marketplace API error {status_code}: {message}")]
    Api { status_code: i64, message: String },
}

impl OlxError {
    /// Short stable code used in reports and the sync log.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            OlxError::Unauthorized => "UNAUTHORIZED",
            OlxError::Forbidden(_) => "FORBIDDEN",
            OlxError::NotFound(_) => "NOT_FOUND",
            OlxError::Gone { .. } => "PLAN_LIMIT",
            OlxError::Validation { .. } => "VALIDATION",
            OlxError::CloudflareBlock => "CLOUDFLARE_BLOCK",
            OlxError::Timeout => "TIMEOUT_ERROR",
            OlxError::Http(_) => "NETWORK_ERROR",
            OlxError::UnexpectedStatus { .. } => "SERVER_ERROR",
            OlxError::Deserialize { .. } => "PARSE_ERROR",
            OlxError::Api { .. } => "API_ERROR",
        }
    }
}
