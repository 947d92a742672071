use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Physical condition of a catalog device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    New,
    Used,
}

impl Condition {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::Used => "used",
        }
    }
}

/// A catalog item: one device listing in the store.
///
/// Owned by the catalog and mutated by admin tooling; ad records reference
/// products but never own them. `deleted_at` is a soft-delete marker —
/// listing queries exclude rows where it is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    /// Internal stock code, unique per store (e.g. `"IP11-128-PTO-01"`).
    pub code: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Decimal,
    /// Battery health percent for used devices; `None` for new stock.
    pub battery_health: Option<i16>,
    pub condition: Condition,
    pub warranty_months: i32,
    pub includes_accessories: bool,
    pub colors: Vec<String>,
    pub photo_urls: Vec<String>,
    pub stock_count: i32,
    pub is_active: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether the product can be advertised: active, in stock, not deleted.
    #[must_use]
    pub fn is_listable(&self) -> bool {
        self.is_active && self.deleted_at.is_none() && self.stock_count > 0
    }
}
