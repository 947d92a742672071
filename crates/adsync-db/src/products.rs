//! Database operations for the `products` catalog table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use adsync_core::{Condition, Product};

use crate::DbError;

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub battery_health: Option<i16>,
    /// `'new'` or `'used'`; anything else is treated as used on conversion.
    pub condition: String,
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

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let condition = if row.condition == "new" {
            Condition::New
        } else {
            Condition::Used
        };
        Product {
            id: row.id,
            code: row.code,
            name: row.name,
            slug: row.slug,
            description: row.description,
            price: row.price,
            battery_health: row.battery_health,
            condition,
            warranty_months: row.warranty_months,
            includes_accessories: row.includes_accessories,
            colors: row.colors,
            photo_urls: row.photo_urls,
            stock_count: row.stock_count,
            is_active: row.is_active,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Fields accepted when creating or updating a catalog product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub battery_health: Option<i16>,
    pub condition: Condition,
    pub warranty_months: i32,
    pub includes_accessories: bool,
    pub colors: Vec<String>,
    pub photo_urls: Vec<String>,
    pub stock_count: i32,
    pub is_active: bool,
}

const PRODUCT_COLUMNS: &str = "id, code, name, slug, description, price, battery_health, \
     condition, warranty_months, includes_accessories, colors, photo_urls, \
     stock_count, is_active, deleted_at, created_at, updated_at";

/// Upserts a product row keyed on `code`.
///
/// Conflicts update every mutable column and bump `updated_at`. Returns the
/// internal `id` of the upserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_product(pool: &PgPool, product: &NewProduct) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar::<_, i64>(
        "INSERT INTO products \
             (code, name, slug, description, price, battery_health, condition, \
              warranty_months, includes_accessories, colors, photo_urls, \
              stock_count, is_active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         ON CONFLICT (code) DO UPDATE SET \
             name                 = EXCLUDED.name, \
             slug                 = EXCLUDED.slug, \
             description          = EXCLUDED.description, \
             price                = EXCLUDED.price, \
             battery_health       = EXCLUDED.battery_health, \
             condition            = EXCLUDED.condition, \
             warranty_months      = EXCLUDED.warranty_months, \
             includes_accessories = EXCLUDED.includes_accessories, \
             colors               = EXCLUDED.colors, \
             photo_urls           = EXCLUDED.photo_urls, \
             stock_count          = EXCLUDED.stock_count, \
             is_active            = EXCLUDED.is_active, \
             updated_at           = NOW() \
         RETURNING id",
    )
    .bind(&product.code)
    .bind(&product.name)
    .bind(&product.slug)
    .bind(&product.description)
    .bind(product.price)
    .bind(product.battery_health)
    .bind(product.condition.as_str())
    .bind(product.warranty_months)
    .bind(product.includes_accessories)
    .bind(&product.colors)
    .bind(&product.photo_urls)
    .bind(product.stock_count)
    .bind(product.is_active)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Fetches a product by id, excluding soft-deleted rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, id: i64) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Lists active, non-deleted products, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_products(pool: &PgPool, limit: i64) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         WHERE is_active = TRUE AND deleted_at IS NULL \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
