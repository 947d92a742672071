//! Reconciliation matcher: backfills remote ids for ad records created
//! before reliable id tracking, by fuzzy-matching local records against the
//! currently published remote listings.
//!
//! The score is a weighted blend of normalized title similarity and relative
//! price similarity. Weights and threshold are best-effort heuristics tuned
//! to favor titles (prices get discounted and edited) while still separating
//! same-name devices at different price points; they are a tie-break, not a
//! classifier.

use std::time::Duration;

use sqlx::PgPool;

use adsync_core::Marketplace;
use adsync_db::NewSyncLog;

use crate::error::{ActionReport, SyncError};
use crate::lifecycle::{load_olx_context, SyncSettings};

/// Minimum blended score a candidate must exceed to be accepted.
pub const MATCH_THRESHOLD: f64 = 0.5;

const TITLE_WEIGHT: f64 = 0.6;
const PRICE_WEIGHT: f64 = 0.4;

/// A remote listing reduced to the fields the matcher scores on.
#[derive(Debug, Clone)]
pub struct RemoteCandidate {
    pub remote_id: String,
    pub title: String,
    pub price: Option<f64>,
}

/// Lowercases, strips diacritics and punctuation, and collapses whitespace,
/// so `"iPhone 11 — 128GB  Preto"` and `"iphone 11 128gb preto"` compare
/// equal.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        let c = strip_diacritic(c);
        if c.is_alphanumeric() {
            for lower in c.to_lowercase() {
                out.push(lower);
            }
        } else {
            out.push(' ');
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Folds the accented characters that show up in Portuguese listings.
fn strip_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        other => other,
    }
}

/// Similarity of two titles after normalization, in `[0, 1]`.
///
/// Exact match scores `1.0`, containment `0.8`, anything else the fraction
/// of shared whitespace tokens over the larger token count.
#[must_use]
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_title(a);
    let b = normalize_title(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return 0.8;
    }

    let tokens_a: Vec<&str> = a.split_whitespace().collect();
    let tokens_b: Vec<&str> = b.split_whitespace().collect();
    let larger = tokens_a.len().max(tokens_b.len());
    if larger == 0 {
        return 0.0;
    }
    let shared = tokens_a.iter().filter(|t| tokens_b.contains(t)).count();
    #[allow(clippy::cast_precision_loss)]
    {
        shared as f64 / larger as f64
    }
}

/// Relative price similarity in `[0, 1]`: `1.0` for equal prices, falling
/// linearly with the difference relative to the local price, floored at zero.
#[must_use]
pub fn price_similarity(local: f64, remote: f64) -> f64 {
    let denominator = local.max(1.0);
    (1.0 - (remote - local).abs() / denominator).max(0.0)
}

/// Blended score of one candidate against a local record.
///
/// `local_titles` carries both the stored ad title and the product name; the
/// better-scoring of the two is used. A candidate with no known price
/// contributes zero on the price axis rather than being excluded.
#[must_use]
pub fn match_score(
    local_titles: &[&str],
    local_price: f64,
    remote_title: &str,
    remote_price: Option<f64>,
) -> f64 {
    let title = local_titles
        .iter()
        .map(|t| title_similarity(t, remote_title))
        .fold(0.0, f64::max);
    let price = remote_price.map_or(0.0, |remote| price_similarity(local_price, remote));
    TITLE_WEIGHT * title + PRICE_WEIGHT * price
}

/// Returns the best-scoring candidate and its score, without applying the
/// acceptance threshold.
#[must_use]
pub fn best_match<'a>(
    local_titles: &[&str],
    local_price: f64,
    candidates: &'a [RemoteCandidate],
) -> Option<(&'a RemoteCandidate, f64)> {
    candidates
        .iter()
        .map(|candidate| {
            (
                candidate,
                match_score(
                    local_titles,
                    local_price,
                    &candidate.title,
                    candidate.price,
                ),
            )
        })
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
}

/// Backfills remote ids for every unresolved ad record.
///
/// Enumerates at most `settings.candidate_limit` published remote listings,
/// fetches missing prices one by one with a fixed pause between requests,
/// then accepts the best candidate per record only above
/// [`MATCH_THRESHOLD`]. Unmatched records are left untouched and logged with
/// the best score seen, for operator review.
pub async fn migrate_unresolved(pool: &PgPool, settings: &SyncSettings) -> ActionReport {
    match migrate_inner(pool, settings).await {
        Ok(report) => report,
        Err(err) => {
            let report = ActionReport::failure(&err);
            log_migration(pool, "failure", &report.message, None).await;
            report
        }
    }
}

async fn migrate_inner(
    pool: &PgPool,
    settings: &SyncSettings,
) -> Result<ActionReport, SyncError> {
    let (_config, client) = load_olx_context(pool, settings).await?;

    let unresolved = adsync_db::list_unresolved_ads(pool, Marketplace::Olx).await?;
    if unresolved.is_empty() {
        return Ok(ActionReport::ok("no ad records need migration"));
    }

    let published = client.list_published_ads(settings.candidate_limit).await?;
    let mut candidates = Vec::with_capacity(published.len());
    for ad in published.into_iter().take(settings.candidate_limit) {
        let Some(remote_id) = ad.remote_id() else {
            continue;
        };
        let price = match ad.price {
            Some(price) => Some(price),
            None => {
                // One detail request per candidate; pace them so the burst
                // does not trip the platform rate limit.
                tokio::time::sleep(Duration::from_millis(settings.detail_delay_ms)).await;
                match client.get_ad_status(&remote_id).await {
                    Ok(detail) => detail.price,
                    Err(err) => {
                        tracing::warn!(remote_id, error = %err, "candidate detail fetch failed");
                        None
                    }
                }
            }
        };
        candidates.push(RemoteCandidate {
            remote_id,
            title: ad.subject,
            price,
        });
    }

    let total = unresolved.len();
    let mut resolved = 0usize;
    for record in unresolved {
        let product_name = adsync_db::get_product(pool, record.product_id)
            .await?
            .map(|p| p.name);
        let mut titles: Vec<&str> = vec![record.title.as_str()];
        if let Some(name) = product_name.as_deref() {
            titles.push(name);
        }
        let local_price = decimal_to_f64(record.price);

        let Some((candidate, score)) = best_match(&titles, local_price, &candidates) else {
            log_migration(
                pool,
                "skipped",
                "no published candidates to match against",
                Some(record.id),
            )
            .await;
            continue;
        };

        if score > MATCH_THRESHOLD {
            adsync_db::resolve_remote_id(pool, record.id, &candidate.remote_id).await?;
            resolved += 1;
            log_migration(
                pool,
                "success",
                &format!(
                    "matched \"{}\" to remote {} (score {score:.2})",
                    record.title, candidate.remote_id
                ),
                Some(record.id),
            )
            .await;
        } else {
            log_migration(
                pool,
                "skipped",
                &format!(
                    "no confident match for \"{}\" (best candidate {} scored {score:.2})",
                    record.title, candidate.remote_id
                ),
                Some(record.id),
            )
            .await;
        }
    }

    adsync_db::touch_last_sync(pool, Marketplace::Olx).await?;

    Ok(
        ActionReport::ok(format!("resolved {resolved} of {total} unresolved ads")).with_debug(
            serde_json::json!({ "resolved": resolved, "unresolved": total - resolved }),
        ),
    )
}

fn decimal_to_f64(value: rust_decimal::Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    value.to_f64().unwrap_or(0.0)
}

/// Best-effort audit write; a failed log insert must not fail the migration.
async fn log_migration(pool: &PgPool, outcome: &str, message: &str, ad_record_id: Option<i64>) {
    let entry = NewSyncLog {
        integration: Marketplace::Olx,
        action: "migrate".to_string(),
        outcome: outcome.to_string(),
        message: Some(message.to_string()),
        request_payload: None,
        response_payload: None,
        ad_record_id,
    };
    if let Err(err) = adsync_db::append_sync_log(pool, &entry).await {
        tracing::warn!(error = %err, "failed to append migration audit entry");
    }
}
