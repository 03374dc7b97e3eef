//! Administrative command handlers.
//!
//! CLI commands for migrations, statistics, cache checks and account
//! management (admin creation, Pro grants).

use crate::cache::Cache;
use crate::config::Config;
use crate::db::Repository;
use crate::error::AppResult;
use crate::jobs::create_job_channel;
use crate::services::AccountService;
use crate::state::AppState;
use clap::Subcommand;
use std::sync::Arc;
use tracing::info;

/// Administrative commands available via CLI.
#[derive(Subcommand, Debug)]
pub enum AdminCommands {
    /// Run database migrations
    Migrate,

    /// Show statistics
    Stats,

    /// Ping the cache server
    PingCache,

    /// Create an administrator, or promote an existing account
    CreateAdmin {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        name: Option<String>,
    },

    /// Grant Pro to an account
    GrantPro {
        #[arg(long)]
        email: String,

        /// Days until the grant expires; omit for no expiry
        #[arg(long)]
        days: Option<i64>,
    },

    /// Revoke Pro from an account
    RevokePro {
        #[arg(long)]
        email: String,
    },
}

/// Run an administrative command with the given configuration.
pub async fn run(config: Config, admin_command: AdminCommands) -> AppResult<()> {
    match admin_command {
        AdminCommands::Migrate => migrate(config).await,
        AdminCommands::Stats => stats(config).await,
        AdminCommands::PingCache => ping_cache(config).await,
        AdminCommands::CreateAdmin {
            email,
            password,
            name,
        } => {
            let account = account_service(&config)
                .await?
                .create_admin(&email, &password, name)
                .await?;
            info!(user_id = %account.id, "Administrator ready: {}", account.email);
            Ok(())
        }
        AdminCommands::GrantPro { email, days } => {
            let account = account_service(&config).await?.grant_pro(&email, days).await?;
            match account.pro_until {
                Some(until) => info!("Pro granted to {} until {}", account.email, until),
                None => info!("Pro granted to {} without expiry", account.email),
            }
            Ok(())
        }
        AdminCommands::RevokePro { email } => {
            let account = account_service(&config).await?.revoke_pro(&email).await?;
            info!("Pro revoked from {}", account.email);
            Ok(())
        }
    }
}

async fn connect(config: &Config) -> AppResult<Repository> {
    Repository::new(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
        config.database.acquire_timeout_seconds,
    )
    .await
}

/// Account service over the database, without cache or worker
async fn account_service(config: &Config) -> AppResult<AccountService> {
    let repository = Arc::new(connect(config).await?);
    let (job_sender, _) = create_job_channel();

    let state = AppState::build(repository.clone(), repository, None, job_sender, config);
    Ok(state.accounts)
}

/// Run database migrations.
async fn migrate(config: Config) -> AppResult<()> {
    info!("Running database migrations...");

    connect(&config).await?.run_migrations().await?;

    info!("Migrations completed successfully");
    Ok(())
}

/// Display statistics.
async fn stats(config: Config) -> AppResult<()> {
    info!("Fetching statistics...");

    let stats = account_service(&config).await?.stats_unchecked().await?;

    println!("\n=== qrfast Statistics ===");
    println!("Total users:     {}", stats.total_users);
    println!("Pro users:       {}", stats.pro_users);
    println!("New today:       {}", stats.new_users_today);
    println!("Total links:     {}", stats.total_links);
    println!("Total clicks:    {}", stats.total_clicks);
    println!("Links created, last 7 days:");
    for day in &stats.history {
        println!("  {}  {}", day.date, day.count);
    }
    println!();

    Ok(())
}

/// Ping the cache server.
async fn ping_cache(config: Config) -> AppResult<()> {
    info!("Pinging cache server...");

    let cache = Cache::new(
        &config.cache.url,
        config.cache.max_connections,
        config.cache.default_ttl_seconds,
    )?;

    let response = cache.ping().await?;

    info!("Cache server responded: {}", response);

    Ok(())
}
