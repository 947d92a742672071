//! Mapping from a catalog product to the marketplace wire payload.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use adsync_core::{Condition, Product};
use adsync_olx::AdPayload;

/// The platform truncates ad subjects beyond this many characters; truncating
/// locally keeps the submitted title and the stored snapshot identical.
pub const SUBJECT_MAX_CHARS: usize = 70;

/// Platform category for mobile phones, used when the caller does not
/// override it.
pub const DEFAULT_CATEGORY: &str = "3020";

/// Caller-supplied overrides for an ad submission.
#[derive(Debug, Clone, Default)]
pub struct AdOverrides {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Builds the wire payload for a product, applying overrides and the subject
/// length limit.
#[must_use]
pub fn build_payload(product: &Product, overrides: &AdOverrides) -> AdPayload {
    let subject = overrides
        .title
        .clone()
        .unwrap_or_else(|| product.name.clone());
    let body = overrides
        .description
        .clone()
        .unwrap_or_else(|| ad_body(product));
    let category = overrides
        .category
        .clone()
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    AdPayload {
        external_id: product.code.clone(),
        operation: "insert".to_string(),
        category,
        subject: truncate_subject(&subject),
        body,
        price_cents: price_to_cents(product.price),
        images: product.photo_urls.clone(),
    }
}

/// The title stored on the ad record: the override when given, otherwise the
/// product name — truncated the same way the payload is.
#[must_use]
pub fn ad_title(product: &Product, overrides: &AdOverrides) -> String {
    truncate_subject(overrides.title.as_deref().unwrap_or(&product.name))
}

/// Truncates to [`SUBJECT_MAX_CHARS`] characters, never splitting a
/// multi-byte character.
fn truncate_subject(subject: &str) -> String {
    subject.chars().take(SUBJECT_MAX_CHARS).collect()
}

/// Composes a listing body when the caller gives none: the stored
/// description, or a summary built from the device attributes.
fn ad_body(product: &Product) -> String {
    if let Some(description) = product
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
    {
        return description.to_string();
    }

    let condition = match product.condition {
        Condition::New => "Novo, lacrado".to_string(),
        Condition::Used => match product.battery_health {
            Some(pct) => format!("Seminovo, bateria {pct}%"),
            None => "Seminovo".to_string(),
        },
    };
    let mut body = format!(
        "{condition}. Garantia de {} meses.",
        product.warranty_months
    );
    if product.includes_accessories {
        body.push_str(" Acompanha acessórios.");
    }
    body
}

/// Converts a decimal price in the store currency to integer cents.
fn price_to_cents(price: Decimal) -> i64 {
    (price * Decimal::from(100))
        .round()
        .to_i64()
        .unwrap_or(i64::MAX)
}
