//! Ad lifecycle orchestrator.
//!
//! Each operation reads the integration config fresh, talks to the remote
//! platform through the typed client, persists the resulting local state, and
//! writes exactly one sync-log entry describing the action, its outcome, and
//! the raw payloads involved. All failures are converted into an
//! [`ActionReport`] at this boundary.
//!
//! Consistency policy: local state is authoritative. Removal deletes the
//! local record unconditionally and treats remote deletion as best-effort;
//! the remote platform converges eventually (or an operator reconciles via
//! the migration matcher).

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;

use adsync_core::{AdStatus, AppConfig, Marketplace, Product};
use adsync_db::{MarketplaceConfigRow, NewAdRecord, NewSyncLog};
use adsync_olx::{BalanceInfo, CreateAdOutcome, OlxClient, OlxError};

use crate::error::{ActionReport, SyncError};
use crate::payload::{ad_title, build_payload, AdOverrides};

/// Remote-client and pacing knobs for orchestrator actions, extracted from
/// [`AppConfig`] so tests can point at a mock server with zero delays.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub import_poll_delay_ms: u64,
    pub candidate_limit: usize,
    pub detail_delay_ms: u64,
}

impl SyncSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.olx_base_url.clone(),
            request_timeout_secs: config.remote_request_timeout_secs,
            user_agent: config.remote_user_agent.clone(),
            import_poll_delay_ms: config.import_poll_delay_ms,
            candidate_limit: config.matcher_candidate_limit,
            detail_delay_ms: config.matcher_detail_delay_ms,
        }
    }
}

/// Result of exercising the token against the listing and balance endpoints.
#[derive(Debug, Clone, Copy)]
pub struct TokenValidation {
    /// The account is on the basic plan: the balance endpoint answers `410`
    /// with `PRODUCT_NOT_FOUND_BY_ACCOUNT`. The token itself is valid.
    pub plan_limited: bool,
}

/// Caller input for publishing a product as an ad.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub product_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Payloads and references accumulated while an action runs, flushed into
/// one sync-log entry when the action finishes.
#[derive(Debug, Default)]
struct ActionContext {
    request_payload: Option<serde_json::Value>,
    response_payload: Option<serde_json::Value>,
    ad_record_id: Option<i64>,
}

/// Loads the integration config, refreshes an expired token when the stored
/// credentials allow it, and builds the remote client.
///
/// # Errors
///
/// [`SyncError::NotConfigured`], [`SyncError::SyncDisabled`] or
/// [`SyncError::MissingToken`] before any remote call; refresh failures
/// surface as the classified remote error.
pub(crate) async fn load_olx_context(
    pool: &PgPool,
    settings: &SyncSettings,
) -> Result<(MarketplaceConfigRow, OlxClient), SyncError> {
    let config = adsync_db::get_config(pool, Marketplace::Olx)
        .await?
        .ok_or(SyncError::NotConfigured(Marketplace::Olx))?;

    if !config.sync_enabled {
        return Err(SyncError::SyncDisabled(Marketplace::Olx));
    }

    let access_token = config
        .access_token
        .as_deref()
        .ok_or(SyncError::MissingToken(Marketplace::Olx))?;

    let mut client = OlxClient::with_base_url(
        access_token,
        settings.request_timeout_secs,
        &settings.user_agent,
        &settings.base_url,
    )?;

    if config.token_expired(Utc::now()) {
        if let (Some(client_id), Some(client_secret), Some(refresh_token)) = (
            config.client_id.as_deref(),
            config.client_secret.as_deref(),
            config.refresh_token.as_deref(),
        ) {
            let grant = client
                .refresh_access_token(client_id, client_secret, refresh_token)
                .await?;
            let expires_at = grant
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs));
            adsync_db::store_refreshed_tokens(
                pool,
                Marketplace::Olx,
                &grant.access_token,
                grant.refresh_token.as_deref(),
                expires_at,
            )
            .await?;
            client = client.with_access_token(&grant.access_token);
            tracing::info!("refreshed expired marketplace access token");
        } else {
            // No refresh credentials; let the remote call surface the 401.
            tracing::warn!("stored token is expired and no refresh credentials are available");
        }
    }

    Ok((config, client))
}

/// Exercises the token: a listing call proves read access, then the balance
/// call distinguishes the plan. `410 PRODUCT_NOT_FOUND_BY_ACCOUNT` means the
/// token is fine and the account is simply on the basic plan — never an
/// authentication failure.
///
/// # Errors
///
/// Any classified remote error other than the basic-plan `410`.
pub async fn validate_token_permissions(client: &OlxClient) -> Result<TokenValidation, SyncError> {
    client.list_published_ads(1).await?;
    classify_balance_probe(client.get_balance().await)
}

fn classify_balance_probe(
    result: Result<BalanceInfo, OlxError>,
) -> Result<TokenValidation, SyncError> {
    match result {
        Ok(_) => Ok(TokenValidation {
            plan_limited: false,
        }),
        Err(OlxError::Gone { reason })
            if reason.as_deref() == Some("PRODUCT_NOT_FOUND_BY_ACCOUNT") =>
        {
            Ok(TokenValidation { plan_limited: true })
        }
        Err(err) => Err(err.into()),
    }
}

/// Publishes a product as a marketplace ad.
///
/// Pre-checks the one-live-ad invariant, validates token permissions, maps
/// the product to the wire payload, submits it, and disambiguates the
/// response shape. An import token puts the record in `processing` and
/// schedules one follow-up poll after the configured delay.
pub async fn publish_ad(
    pool: &PgPool,
    settings: &SyncSettings,
    request: &PublishRequest,
) -> ActionReport {
    let mut ctx = ActionContext::default();
    let result = publish_inner(pool, settings, request, &mut ctx).await;
    finish_action(pool, "create", result, ctx).await
}

async fn publish_inner(
    pool: &PgPool,
    settings: &SyncSettings,
    request: &PublishRequest,
    ctx: &mut ActionContext,
) -> Result<ActionReport, SyncError> {
    let product: Product = adsync_db::get_product(pool, request.product_id)
        .await?
        .ok_or(SyncError::ProductNotFound(request.product_id))?
        .into();

    if !product.is_listable() {
        return Err(SyncError::ProductNotListable(product.id));
    }

    // Friendly pre-check; the partial unique index backstops the race.
    if let Some(existing) =
        adsync_db::get_live_ad_for_product(pool, product.id, Marketplace::Olx).await?
    {
        return Err(SyncError::AlreadyAdvertised {
            product_id: product.id,
            ad_record_id: existing.id,
        });
    }

    let (_config, client) = load_olx_context(pool, settings).await?;
    let validation = validate_token_permissions(&client).await?;
    if validation.plan_limited {
        tracing::debug!("account is on the basic plan; proceeding without balance info");
    }

    let overrides = AdOverrides {
        title: request.title.clone(),
        description: request.description.clone(),
        category: request.category.clone(),
    };
    let payload = build_payload(&product, &overrides);
    ctx.request_payload = serde_json::to_value(&payload).ok();

    let record = adsync_db::insert_ad_record(
        pool,
        &NewAdRecord {
            product_id: product.id,
            integration: Marketplace::Olx,
            remote_ad_id: None,
            title: ad_title(&product, &overrides),
            description: Some(payload.body.clone()),
            price: product.price,
            status: AdStatus::Pending,
        },
    )
    .await?;
    ctx.ad_record_id = Some(record.id);

    let response = match client.create_ad(&payload).await {
        Ok(response) => response,
        Err(err) => {
            fail_record(pool, record.id, &err.to_string()).await;
            return Err(err.into());
        }
    };
    ctx.response_payload = Some(response.raw.clone());

    match response.outcome {
        CreateAdOutcome::AdList(ads) => {
            let Some(remote_id) = ads.iter().find_map(adsync_olx::CreatedAd::resolved_id) else {
                fail_record(pool, record.id, "no identifier in ad_list response").await;
                return Err(SyncError::NoRemoteIdentifier);
            };
            adsync_db::resolve_remote_id(pool, record.id, &remote_id).await?;
            adsync_db::touch_last_sync(pool, Marketplace::Olx).await?;
            Ok(ActionReport::ok("ad published")
                .with_ad_record(record.id)
                .with_remote_id(remote_id))
        }
        CreateAdOutcome::DirectId(remote_id) => {
            adsync_db::resolve_remote_id(pool, record.id, &remote_id).await?;
            adsync_db::touch_last_sync(pool, Marketplace::Olx).await?;
            Ok(ActionReport::ok("ad published")
                .with_ad_record(record.id)
                .with_remote_id(remote_id))
        }
        CreateAdOutcome::ImportToken(token) => {
            adsync_db::mark_processing(pool, record.id, &token).await?;
            adsync_db::touch_last_sync(pool, Marketplace::Olx).await?;
            tokio::time::sleep(Duration::from_millis(settings.import_poll_delay_ms)).await;
            Ok(poll_import_once(pool, &client, record.id, &token).await)
        }
        CreateAdOutcome::Unrecognized => {
            // The remote side effect may exist; the record stays as an error
            // for the matcher to reconcile instead of being silently papered
            // over.
            fail_record(pool, record.id, "unrecognized create response shape").await;
            Err(SyncError::NoRemoteIdentifier)
        }
    }
}

/// One follow-up poll after an async accept. Poll failures do not fail the
/// creation — the ad was accepted and stays `processing` for a later refresh.
async fn poll_import_once(
    pool: &PgPool,
    client: &OlxClient,
    record_id: i64,
    token: &str,
) -> ActionReport {
    match client.get_import_status(token).await {
        Ok(status) => {
            if let Some(remote_id) = status.resolved_id() {
                match adsync_db::resolve_remote_id(pool, record_id, &remote_id).await {
                    Ok(()) => ActionReport::ok("ad published (import resolved)")
                        .with_ad_record(record_id)
                        .with_remote_id(remote_id),
                    Err(err) => {
                        tracing::warn!(record_id, error = %err, "failed to store resolved id");
                        ActionReport::ok("import accepted; id resolution pending")
                            .with_ad_record(record_id)
                            .with_remote_id(token.to_string())
                    }
                }
            } else {
                ActionReport::ok("import accepted; still processing")
                    .with_ad_record(record_id)
                    .with_remote_id(token.to_string())
            }
        }
        Err(err) => {
            tracing::warn!(record_id, error = %err, "import status poll failed");
            ActionReport::ok("import accepted; status poll failed, refresh later")
                .with_ad_record(record_id)
                .with_remote_id(token.to_string())
        }
    }
}

/// Re-polls the remote side for a `processing` record and resolves it.
pub async fn refresh_ad_status(
    pool: &PgPool,
    settings: &SyncSettings,
    ad_record_id: i64,
) -> ActionReport {
    let ctx = ActionContext {
        ad_record_id: Some(ad_record_id),
        ..ActionContext::default()
    };
    let result = refresh_inner(pool, settings, ad_record_id).await;
    finish_action(pool, "refresh", result, ctx).await
}

async fn refresh_inner(
    pool: &PgPool,
    settings: &SyncSettings,
    ad_record_id: i64,
) -> Result<ActionReport, SyncError> {
    let record = adsync_db::get_ad_record(pool, ad_record_id)
        .await?
        .ok_or(SyncError::AdNotFound(ad_record_id))?;

    let status: AdStatus = record
        .status
        .parse()
        .map_err(|_| SyncError::AdNotFound(ad_record_id))?;

    match status {
        AdStatus::Processing => {
            let token = record
                .remote_ad_id
                .as_deref()
                .ok_or(SyncError::NoRemoteIdentifier)?;
            let (_config, client) = load_olx_context(pool, settings).await?;
            let import = client.get_import_status(token).await?;

            if let Some(remote_id) = import.resolved_id() {
                adsync_db::resolve_remote_id(pool, record.id, &remote_id).await?;
                return Ok(ActionReport::ok("import resolved")
                    .with_ad_record(record.id)
                    .with_remote_id(remote_id));
            }
            if matches!(import.status.as_deref(), Some("error" | "failed")) {
                adsync_db::transition_status(
                    pool,
                    record.id,
                    AdStatus::Processing,
                    AdStatus::Error,
                    Some("import failed on the marketplace side"),
                )
                .await?;
                return Ok(ActionReport::ok("import failed; record marked as error")
                    .with_ad_record(record.id));
            }
            Ok(ActionReport::ok("still processing").with_ad_record(record.id))
        }
        AdStatus::Advertised => {
            let remote_id = record
                .remote_ad_id
                .as_deref()
                .ok_or(SyncError::NoRemoteIdentifier)?;
            let (_config, client) = load_olx_context(pool, settings).await?;
            let detail = client.get_ad_status(remote_id).await?;
            Ok(ActionReport::ok(format!(
                "remote status: {}",
                detail.status.as_deref().unwrap_or("unknown")
            ))
            .with_ad_record(record.id)
            .with_remote_id(remote_id.to_string()))
        }
        other => Ok(
            ActionReport::ok(format!("status is {other}; nothing to refresh"))
                .with_ad_record(record.id),
        ),
    }
}

/// Removes an ad: remote deletion is attempted best-effort, local deletion is
/// unconditional and the only thing that can fail the action. Removing an
/// already-removed record reports success.
pub async fn remove_ad(pool: &PgPool, settings: &SyncSettings, ad_record_id: i64) -> ActionReport {
    let mut ctx = ActionContext {
        ad_record_id: Some(ad_record_id),
        ..ActionContext::default()
    };
    let result = remove_inner(pool, settings, ad_record_id, &mut ctx).await;
    finish_action(pool, "remove", result, ctx).await
}

async fn remove_inner(
    pool: &PgPool,
    settings: &SyncSettings,
    ad_record_id: i64,
    ctx: &mut ActionContext,
) -> Result<ActionReport, SyncError> {
    let Some(record) = adsync_db::get_ad_record(pool, ad_record_id).await? else {
        return Ok(ActionReport::ok("ad record already removed").with_ad_record(ad_record_id));
    };

    let mut remote_note = "no remote id to remove";
    if let Some(remote_id) = record.remote_ad_id.as_deref() {
        match load_olx_context(pool, settings).await {
            Ok((_config, client)) => match client.delete_ad(remote_id).await {
                Ok(()) => remote_note = "removed remotely",
                Err(err) => {
                    tracing::warn!(remote_id, error = %err, "remote removal failed; removing locally only");
                    ctx.response_payload =
                        Some(serde_json::json!({ "remote_error": err.to_string() }));
                    remote_note = "remote removal failed; removed locally only";
                }
            },
            Err(err) => {
                tracing::warn!(error = %err, "marketplace client unavailable; removing locally only");
                remote_note = "marketplace unavailable; removed locally only";
            }
        }
    }

    adsync_db::delete_ad_record(pool, record.id).await?;

    Ok(ActionReport::ok(format!("ad removed ({remote_note})")).with_ad_record(record.id))
}

/// Fetches account balance / plan information for the admin surfaces.
pub async fn check_balance(pool: &PgPool, settings: &SyncSettings) -> ActionReport {
    let ctx = ActionContext::default();
    let result = balance_inner(pool, settings).await;
    finish_action(pool, "balance", result, ctx).await
}

async fn balance_inner(pool: &PgPool, settings: &SyncSettings) -> Result<ActionReport, SyncError> {
    let (_config, client) = load_olx_context(pool, settings).await?;
    match client.get_balance().await {
        Ok(balance) => Ok(ActionReport::ok("balance fetched").with_debug(serde_json::json!({
            "available": balance.available,
            "used": balance.used,
            "plan": balance.plan,
        }))),
        Err(OlxError::Gone { reason })
            if reason.as_deref() == Some("PRODUCT_NOT_FOUND_BY_ACCOUNT") =>
        {
            Ok(ActionReport::ok(
                "account is on the basic plan; no balance information available",
            ))
        }
        Err(err) => Err(err.into()),
    }
}

/// Validates the stored token against the remote platform.
pub async fn check_token(pool: &PgPool, settings: &SyncSettings) -> ActionReport {
    let ctx = ActionContext::default();
    let result = check_token_inner(pool, settings).await;
    finish_action(pool, "check-token", result, ctx).await
}

async fn check_token_inner(
    pool: &PgPool,
    settings: &SyncSettings,
) -> Result<ActionReport, SyncError> {
    let (_config, client) = load_olx_context(pool, settings).await?;
    let validation = validate_token_permissions(&client).await?;
    if validation.plan_limited {
        Ok(ActionReport::ok(
            "token is valid; account is on the basic plan",
        ))
    } else {
        Ok(ActionReport::ok("token is valid"))
    }
}

/// Deletes every ad record and every sync-log entry. Irreversible; intended
/// only for operator-triggered resets, and deliberately not audited — an
/// entry describing the wipe would contradict the wipe.
pub async fn bulk_clear(pool: &PgPool) -> ActionReport {
    let ads = match adsync_db::clear_all_ads(pool).await {
        Ok(count) => count,
        Err(err) => return ActionReport::failure(&SyncError::from(err)),
    };
    let logs = match adsync_db::clear_sync_log(pool).await {
        Ok(count) => count,
        Err(err) => return ActionReport::failure(&SyncError::from(err)),
    };
    ActionReport::ok(format!("cleared {ads} ad records and {logs} log entries"))
        .with_debug(serde_json::json!({ "ads_deleted": ads, "logs_deleted": logs }))
}

/// Marks a record as failed, swallowing storage errors: the caller is already
/// on an error path and the original failure must win.
async fn fail_record(pool: &PgPool, record_id: i64, message: &str) {
    if let Err(err) = adsync_db::mark_ad_error(pool, record_id, message).await {
        tracing::warn!(record_id, error = %err, "failed to mark ad record as errored");
    }
}

/// Converts the inner result into the final report and writes the single
/// sync-log entry for the action. Log failures are logged and swallowed —
/// losing a diagnostic row must not flip a successful action into a failure.
async fn finish_action(
    pool: &PgPool,
    action: &str,
    result: Result<ActionReport, SyncError>,
    ctx: ActionContext,
) -> ActionReport {
    let mut report = match result {
        Ok(report) => report,
        Err(err) => ActionReport::failure(&err),
    };
    if report.ad_record_id.is_none() {
        report.ad_record_id = ctx.ad_record_id;
    }

    let entry = NewSyncLog {
        integration: Marketplace::Olx,
        action: action.to_string(),
        outcome: if report.success { "success" } else { "failure" }.to_string(),
        message: Some(report.message.clone()),
        request_payload: ctx.request_payload,
        response_payload: ctx.response_payload,
        ad_record_id: report.ad_record_id,
    };
    if let Err(err) = adsync_db::append_sync_log(pool, &entry).await {
        tracing::warn!(action, error = %err, "failed to append sync log entry");
    }

    report
}
