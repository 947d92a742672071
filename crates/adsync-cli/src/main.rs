mod ads;
mod admin;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "adsync-cli")]
#[command(about = "Marketplace ad syndication command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Publish a product as a marketplace ad
    Publish(ads::PublishArgs),
    /// Remove an ad (local delete is unconditional, remote is best-effort)
    Remove(ads::RemoveArgs),
    /// Re-poll the remote status of an ad record
    Refresh(ads::RefreshArgs),
    /// Backfill remote ids by matching against published listings
    Migrate,
    /// Show the account's ad balance / plan
    Balance,
    /// Validate the stored access token against the platform
    CheckToken,
    /// Show recent sync log entries
    Logs(admin::LogsArgs),
    /// Delete ALL ad records and sync log entries
    ClearAll(admin::ClearAllArgs),
    /// Show or update integration configuration
    Config(admin::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = adsync_core::load_app_config()?;
    let pool_config = adsync_db::PoolConfig::from_app_config(&config);
    let pool = adsync_db::connect_pool(&config.database_url, pool_config).await?;
    adsync_db::run_migrations(&pool).await?;
    let settings = adsync_sync::SyncSettings::from_app_config(&config);

    match cli.command {
        Commands::Publish(args) => ads::publish(&pool, &settings, args).await,
        Commands::Remove(args) => ads::remove(&pool, &settings, args).await,
        Commands::Refresh(args) => ads::refresh(&pool, &settings, args).await,
        Commands::Migrate => ads::migrate(&pool, &settings).await,
        Commands::Balance => ads::balance(&pool, &settings).await,
        Commands::CheckToken => ads::check_token(&pool, &settings).await,
        Commands::Logs(args) => admin::logs(&pool, args).await,
        Commands::ClearAll(args) => admin::clear_all(&pool, args).await,
        Commands::Config(args) => admin::config(&pool, args).await,
    }
}
