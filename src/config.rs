use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Observer REST API serving the P2Pool mini sidechain
pub const OBSERVER_API_BASE: &str = "https://mini.p2pool.observer/api";

/// Observer realtime event feed
pub const OBSERVER_EVENTS_URL: &str = "wss://mini.p2pool.observer/api/events";

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub notification_channel_id: Option<u64>,
    pub guild_id: Option<u64>,

    // Observer endpoints
    pub api_base_url: String,
    pub events_url: String,
    pub api_timeout: Duration,

    // Notification delivery
    pub reconnect_delay: Duration,
    pub connect_timeout: Duration,
    pub ping_interval: Duration,
    pub polling_enabled: bool,
    pub poll_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            discord_token: var("DISCORD_TOKEN").context("DISCORD_TOKEN not found")?,
            notification_channel_id: parse_id(var("NOTIFICATION_CHANNEL_ID"))
                .context("NOTIFICATION_CHANNEL_ID must be an integer")?,
            guild_id: parse_id(var("GUILD_ID")).context("GUILD_ID must be an integer")?,

            api_base_url: var("P2POOL_API_URL").unwrap_or_else(|| OBSERVER_API_BASE.to_string()),
            events_url: var("P2POOL_EVENTS_URL")
                .unwrap_or_else(|| OBSERVER_EVENTS_URL.to_string()),
            api_timeout: Duration::from_secs(
                var("API_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),

            reconnect_delay: Duration::from_secs(
                var("WEBSOCKET_RECONNECT_DELAY_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
            connect_timeout: Duration::from_secs(
                var("WEBSOCKET_CONNECT_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
            ping_interval: Duration::from_secs(
                var("WEBSOCKET_PING_INTERVAL_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(20),
            ),
            polling_enabled: var("POLL_FALLBACK_ENABLED")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            poll_interval: Duration::from_secs(
                var("BLOCK_CHECK_INTERVAL_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.api_timeout.is_zero() {
            anyhow::bail!("API_TIMEOUT_SECS must be greater than 0");
        }

        if self.connect_timeout.is_zero() {
            anyhow::bail!("WEBSOCKET_CONNECT_TIMEOUT_SECS must be greater than 0");
        }

        if self.ping_interval.is_zero() {
            anyhow::bail!("WEBSOCKET_PING_INTERVAL_SECS must be greater than 0");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("BLOCK_CHECK_INTERVAL_SECS must be greater than 0");
        }

        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            anyhow::bail!("P2POOL_API_URL must be an http(s) URL");
        }

        if !self.events_url.starts_with("ws://") && !self.events_url.starts_with("wss://") {
            anyhow::bail!("P2POOL_EVENTS_URL must be a ws(s) URL");
        }

        Ok(())
    }
}

/// Discord snowflake; zero counts as unset
fn parse_id(raw: Option<String>) -> Result<Option<u64>> {
    let id = raw.map(|v| v.trim().parse::<u64>()).transpose()?;
    Ok(id.filter(|id| *id != 0))
}
