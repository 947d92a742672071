//! Marketplace autoupload API wire types.
//!
//! The create endpoint is the awkward one: depending on account plan and
//! import mode the platform answers with a resolved `ad_list`, an opaque
//! import `token`, or a bare `uuid`/`id`. [`CreateAdOutcome`] resolves that
//! heterogeneity once, at the client boundary, so call sites branch on a
//! tagged union instead of re-inspecting JSON.

use serde::{Deserialize, Deserializer, Serialize};

/// Ad submission payload for the autoupload import endpoint.
///
/// `external_id` is the store's own stock code; the platform echoes it back
/// so imports stay correlatable. `price_cents` is an integer per the wire
/// contract.
#[derive(Debug, Clone, Serialize)]
pub struct AdPayload {
    #[serde(rename = "id")]
    pub external_id: String,
    pub operation: String,
    pub category: String,
    pub subject: String,
    pub body: String,
    #[serde(rename = "price")]
    pub price_cents: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

/// One entry of the `ad_list` create-response shape.
///
/// Which id field is populated varies by plan; [`CreatedAd::resolved_id`]
/// applies the extraction priority.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedAd {
    #[serde(default)]
    pub list_id: Option<i64>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
}

impl CreatedAd {
    /// Extracts the usable remote id: `list_id` over `id` over `external_id`.
    #[must_use]
    pub fn resolved_id(&self) -> Option<String> {
        if let Some(list_id) = self.list_id {
            return Some(list_id.to_string());
        }
        if let Some(id) = self.id.as_deref().filter(|s| !s.is_empty()) {
            return Some(id.to_string());
        }
        self.external_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    }
}

/// The create response, resolved into one of the platform's answer shapes.
#[derive(Debug, Clone)]
pub enum CreateAdOutcome {
    /// Synchronous accept: one entry per submitted ad, ids possibly resolved.
    AdList(Vec<CreatedAd>),
    /// Asynchronous accept: poll the import status endpoint with this token.
    ImportToken(String),
    /// Bare `uuid`/`id` answer with no surrounding structure.
    DirectId(String),
    /// 2xx body that matched none of the known shapes. The raw payload on
    /// [`CreateAdResponse`] is all the caller has to go on.
    Unrecognized,
}

/// Create response plus the raw body, kept for the audit log.
#[derive(Debug, Clone)]
pub struct CreateAdResponse {
    pub outcome: CreateAdOutcome,
    pub raw: serde_json::Value,
}

impl CreateAdResponse {
    /// Resolves the outcome from a 2xx response body.
    ///
    /// Extraction order mirrors the platform's precedence: a non-empty
    /// `ad_list` wins, then an import `token`, then a bare `uuid`/`id`.
    #[must_use]
    pub fn from_body(raw: serde_json::Value) -> Self {
        let outcome = resolve_outcome(&raw);
        Self { outcome, raw }
    }
}

fn resolve_outcome(body: &serde_json::Value) -> CreateAdOutcome {
    if let Some(entries) = body.get("ad_list").and_then(serde_json::Value::as_array) {
        if !entries.is_empty() {
            let ads = entries
                .iter()
                .filter_map(|v| serde_json::from_value::<CreatedAd>(v.clone()).ok())
                .collect::<Vec<_>>();
            return CreateAdOutcome::AdList(ads);
        }
    }

    if let Some(token) = non_empty_str(body.get("token")) {
        return CreateAdOutcome::ImportToken(token.to_string());
    }

    if let Some(id) = non_empty_str(body.get("uuid")).or_else(|| non_empty_str(body.get("id"))) {
        return CreateAdOutcome::DirectId(id.to_string());
    }

    CreateAdOutcome::Unrecognized
}

fn non_empty_str(value: Option<&serde_json::Value>) -> Option<&str> {
    value
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Account balance / plan information from the balance endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceInfo {
    #[serde(default)]
    pub available: Option<i64>,
    #[serde(default)]
    pub used: Option<i64>,
    #[serde(default)]
    pub plan: Option<String>,
}

/// One currently published remote listing.
///
/// The listing endpoint omits `price` for some account plans; callers fetch
/// the ad detail to fill it in.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishedAd {
    #[serde(default)]
    pub list_id: Option<i64>,
    #[serde(default)]
    pub id: Option<String>,
    pub subject: String,
    #[serde(default, deserialize_with = "de_opt_price")]
    pub price: Option<f64>,
}

impl PublishedAd {
    /// The id usable for detail fetches and backfill, if any.
    #[must_use]
    pub fn remote_id(&self) -> Option<String> {
        if let Some(list_id) = self.list_id {
            return Some(list_id.to_string());
        }
        self.id
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    }
}

/// Wrapper for the published-ads listing response.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishedAdsResponse {
    #[serde(default)]
    pub ads: Vec<PublishedAd>,
}

/// Detail for a single remote ad.
#[derive(Debug, Clone, Deserialize)]
pub struct AdDetail {
    #[serde(default)]
    pub list_id: Option<i64>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de_opt_price")]
    pub price: Option<f64>,
}

/// Import status for an asynchronous create.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub list_id: Option<i64>,
    #[serde(default)]
    pub ad_id: Option<i64>,
}

impl ImportStatus {
    /// The resolved listing id, once the platform finished processing.
    #[must_use]
    pub fn resolved_id(&self) -> Option<String> {
        self.list_id.or(self.ad_id).map(|id| id.to_string())
    }
}

/// Tokens returned by the OAuth refresh grant.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Accepts a price sent either as a JSON number or a numeric string — the
/// platform is not consistent between endpoints.
fn de_opt_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Text(String),
    }

    let raw = Option::<Raw>::deserialize(deserializer)?;
    Ok(match raw {
        None => None,
        Some(Raw::Num(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().replace(',', ".").parse::<f64>().ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolved_id_prefers_list_id() {
        let ad = CreatedAd {
            list_id: Some(987_654),
            id: Some("uuid-123".to_string()),
            external_id: Some("IP11-01".to_string()),
            subject: None,
        };
        assert_eq!(ad.resolved_id().as_deref(), Some("987654"));
    }

    #[test]
    fn resolved_id_falls_back_to_id_then_external_id() {
        let ad = CreatedAd {
            list_id: None,
            id: Some("uuid-123".to_string()),
            external_id: Some("IP11-01".to_string()),
            subject: None,
        };
        assert_eq!(ad.resolved_id().as_deref(), Some("uuid-123"));

        let ad = CreatedAd {
            list_id: None,
            id: None,
            external_id: Some("IP11-01".to_string()),
            subject: None,
        };
        assert_eq!(ad.resolved_id().as_deref(), Some("IP11-01"));
    }

    #[test]
    fn resolved_id_ignores_empty_strings() {
        let ad = CreatedAd {
            list_id: None,
            id: Some(String::new()),
            external_id: None,
            subject: None,
        };
        assert!(ad.resolved_id().is_none());
    }

    #[test]
    fn create_response_resolves_ad_list_first() {
        let body = json!({
            "ad_list": [{"list_id": 42, "subject": "iPhone 11"}],
            "token": "should-not-win"
        });
        let response = CreateAdResponse::from_body(body);
        match response.outcome {
            CreateAdOutcome::AdList(ref ads) => {
                assert_eq!(ads.len(), 1);
                assert_eq!(ads[0].resolved_id().as_deref(), Some("42"));
            }
            ref other => panic!("expected AdList, got {other:?}"),
        }
    }

    #[test]
    fn create_response_resolves_import_token() {
        let response = CreateAdResponse::from_body(json!({"token": "tok-abc"}));
        assert!(
            matches!(response.outcome, CreateAdOutcome::ImportToken(ref t) if t == "tok-abc"),
            "got {:?}",
            response.outcome
        );
    }

    #[test]
    fn create_response_resolves_bare_uuid_and_id() {
        let response = CreateAdResponse::from_body(json!({"uuid": "u-1"}));
        assert!(matches!(response.outcome, CreateAdOutcome::DirectId(ref s) if s == "u-1"));

        let response = CreateAdResponse::from_body(json!({"id": "i-2"}));
        assert!(matches!(response.outcome, CreateAdOutcome::DirectId(ref s) if s == "i-2"));
    }

    #[test]
    fn create_response_empty_ad_list_falls_through_to_token() {
        let response = CreateAdResponse::from_body(json!({"ad_list": [], "token": "tok-x"}));
        assert!(matches!(response.outcome, CreateAdOutcome::ImportToken(ref t) if t == "tok-x"));
    }

    #[test]
    fn create_response_unknown_shape_is_unrecognized() {
        let response = CreateAdResponse::from_body(json!({"message": "accepted"}));
        assert!(matches!(response.outcome, CreateAdOutcome::Unrecognized));
        assert_eq!(response.raw["message"], "accepted");
    }

    #[test]
    fn published_ad_price_accepts_number_and_string() {
        let ad: PublishedAd =
            serde_json::from_value(json!({"list_id": 1, "subject": "x", "price": 1500.0}))
                .expect("number price");
        assert_eq!(ad.price, Some(1500.0));

        let ad: PublishedAd =
            serde_json::from_value(json!({"list_id": 1, "subject": "x", "price": "1500,00"}))
                .expect("string price");
        assert_eq!(ad.price, Some(1500.0));

        let ad: PublishedAd = serde_json::from_value(json!({"list_id": 1, "subject": "x"}))
            .expect("missing price");
        assert!(ad.price.is_none());
    }

    #[test]
    fn import_status_resolves_list_id_over_ad_id() {
        let status: ImportStatus =
            serde_json::from_value(json!({"status": "done", "list_id": 9, "ad_id": 8}))
                .expect("parse");
        assert_eq!(status.resolved_id().as_deref(), Some("9"));

        let status: ImportStatus =
            serde_json::from_value(json!({"status": "done", "ad_id": 8})).expect("parse");
        assert_eq!(status.resolved_id().as_deref(), Some("8"));
    }

    #[test]
    fn ad_payload_serializes_wire_field_names() {
        let payload = AdPayload {
            external_id: "IP11-01".to_string(),
            operation: "insert".to_string(),
            category: "3020".to_string(),
            subject: "iPhone 11 128GB".to_string(),
            body: "Seminovo".to_string(),
            price_cents: 150_000,
            images: vec![],
        };
        let json = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(json["id"], "IP11-01");
        assert_eq!(json["price"], 150_000);
        assert!(json.get("images").is_none(), "empty images are omitted");
    }
}
