//! Operator commands: sync log inspection, bulk reset, and integration
//! configuration.

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use sqlx::PgPool;

use adsync_core::Marketplace;
use adsync_db::UpsertMarketplaceConfig;

#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Maximum number of entries to show
    #[arg(long, default_value_t = 20)]
    pub limit: i64,
}

#[derive(Debug, Args)]
pub struct ClearAllArgs {
    /// Required confirmation; the reset is irreversible
    #[arg(long)]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the stored configuration (secrets shown as presence only)
    Show {
        #[arg(long, default_value = "olx")]
        integration: Marketplace,
    },
    /// Insert or replace the configuration for an integration
    Set {
        #[arg(long, default_value = "olx")]
        integration: Marketplace,
        #[arg(long)]
        client_id: Option<String>,
        #[arg(long)]
        client_secret: Option<String>,
        #[arg(long)]
        access_token: Option<String>,
        #[arg(long)]
        refresh_token: Option<String>,
        /// Token expiry as an RFC 3339 timestamp
        #[arg(long)]
        token_expires_at: Option<DateTime<Utc>>,
        #[arg(long, default_value_t = false)]
        sync_enabled: bool,
    },
}

pub async fn logs(pool: &PgPool, args: LogsArgs) -> anyhow::Result<()> {
    let rows = adsync_db::list_sync_log(pool, args.limit).await?;
    if rows.is_empty() {
        println!("sync log is empty");
        return Ok(());
    }
    for row in rows {
        println!(
            "{} [{}] {}/{} {}",
            row.created_at.format("%Y-%m-%d %H:%M:%S"),
            row.integration,
            row.action,
            row.outcome,
            row.message.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

pub async fn clear_all(pool: &PgPool, args: ClearAllArgs) -> anyhow::Result<()> {
    if !args.yes {
        anyhow::bail!("refusing to wipe ad records and sync log without --yes");
    }
    let report = adsync_sync::bulk_clear(pool).await;
    crate::ads::finish(&report)
}

pub async fn config(pool: &PgPool, args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show { integration } => show_config(pool, integration).await,
        ConfigCommand::Set {
            integration,
            client_id,
            client_secret,
            access_token,
            refresh_token,
            token_expires_at,
            sync_enabled,
        } => {
            adsync_db::upsert_config(
                pool,
                integration,
                &UpsertMarketplaceConfig {
                    client_id,
                    client_secret,
                    access_token,
                    refresh_token,
                    token_expires_at,
                    sync_enabled,
                },
            )
            .await?;
            println!("configuration for {integration} stored");
            show_config(pool, integration).await
        }
    }
}

async fn show_config(pool: &PgPool, integration: Marketplace) -> anyhow::Result<()> {
    let Some(row) = adsync_db::get_config(pool, integration).await? else {
        println!("no configuration stored for {integration}");
        return Ok(());
    };

    let presence = |value: &Option<String>| if value.is_some() { "set" } else { "unset" };
    println!("integration:      {}", row.integration);
    println!(
        "client id:        {}",
        row.client_id.as_deref().unwrap_or("unset")
    );
    println!("client secret:    {}", presence(&row.client_secret));
    println!("access token:     {}", presence(&row.access_token));
    println!("refresh token:    {}", presence(&row.refresh_token));
    println!(
        "token expires at: {}",
        row.token_expires_at
            .map_or_else(|| "unset".to_string(), |t| t.to_rfc3339())
    );
    println!("sync enabled:     {}", row.sync_enabled);
    println!(
        "last sync at:     {}",
        row.last_sync_at
            .map_or_else(|| "never".to_string(), |t| t.to_rfc3339())
    );
    Ok(())
}
