//! Ad lifecycle commands: thin wrappers over the orchestrator that print the
//! action report and exit non-zero on failure.

use clap::Args;
use sqlx::PgPool;

use adsync_sync::{ActionReport, PublishRequest, SyncSettings};

#[derive(Debug, Args)]
pub struct PublishArgs {
    /// Catalog product id to advertise
    #[arg(long)]
    pub product: i64,
    /// Override the ad title (truncated to the platform limit)
    #[arg(long)]
    pub title: Option<String>,
    /// Override the ad description
    #[arg(long)]
    pub description: Option<String>,
    /// Override the platform category code
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// Ad record id to remove
    #[arg(long)]
    pub ad: i64,
}

#[derive(Debug, Args)]
pub struct RefreshArgs {
    /// Ad record id to refresh
    #[arg(long)]
    pub ad: i64,
}

pub async fn publish(pool: &PgPool, settings: &SyncSettings, args: PublishArgs) -> anyhow::Result<()> {
    let request = PublishRequest {
        product_id: args.product,
        title: args.title,
        description: args.description,
        category: args.category,
    };
    let report = adsync_sync::publish_ad(pool, settings, &request).await;
    finish(&report)
}

pub async fn remove(pool: &PgPool, settings: &SyncSettings, args: RemoveArgs) -> anyhow::Result<()> {
    let report = adsync_sync::remove_ad(pool, settings, args.ad).await;
    finish(&report)
}

pub async fn refresh(
    pool: &PgPool,
    settings: &SyncSettings,
    args: RefreshArgs,
) -> anyhow::Result<()> {
    let report = adsync_sync::refresh_ad_status(pool, settings, args.ad).await;
    finish(&report)
}

pub async fn migrate(pool: &PgPool, settings: &SyncSettings) -> anyhow::Result<()> {
    let report = adsync_sync::migrate_unresolved(pool, settings).await;
    finish(&report)
}

pub async fn balance(pool: &PgPool, settings: &SyncSettings) -> anyhow::Result<()> {
    let report = adsync_sync::check_balance(pool, settings).await;
    finish(&report)
}

pub async fn check_token(pool: &PgPool, settings: &SyncSettings) -> anyhow::Result<()> {
    let report = adsync_sync::check_token(pool, settings).await;
    finish(&report)
}

/// Prints a report and converts a failed action into a process failure.
pub(crate) fn finish(report: &ActionReport) -> anyhow::Result<()> {
    print_report(report);
    if report.success {
        Ok(())
    } else {
        anyhow::bail!(
            "{} ({})",
            report.message,
            report.code.as_deref().unwrap_or("UNKNOWN")
        )
    }
}

fn print_report(report: &ActionReport) {
    let marker = if report.success { "ok" } else { "failed" };
    println!("[{marker}] {}", report.message);
    if let Some(id) = report.ad_record_id {
        println!("  ad record: {id}");
    }
    if let Some(remote) = &report.remote_ad_id {
        println!("  remote id: {remote}");
    }
    if let Some(debug) = &report.debug {
        println!("  detail: {debug}");
    }
}
