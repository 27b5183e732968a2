use anyhow::Result;
use p2pool_mini_discord_bot::{run_onboarding_checks, Config, P2PoolBot};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables first so RUST_LOG from .env applies
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Run onboarding checks (validates Discord token and channel id)
    if let Err(e) = run_onboarding_checks() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    // Load and validate configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    match config.guild_id {
        Some(id) => tracing::info!("Commands will be synced to guild {}", id),
        None => tracing::info!("Commands will be synced globally, set GUILD_ID for faster testing"),
    }

    let bot = P2PoolBot::new(config)?;
    tracing::info!("✓ Observer client initialized");

    bot.start().await?;

    tracing::info!("Bot stopped");
    Ok(())
}
