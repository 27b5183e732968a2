//! Discord client wiring: command registration and background notifiers.

use crate::commands::{self, Data};
use crate::config::Config;
use crate::listener::NotificationListener;
use crate::notifier::ChannelNotifier;
use crate::observer::ObserverClient;
use crate::poller::BlockPoller;
use anyhow::{Context as _, Result};
use poise::serenity_prelude as serenity;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;

pub struct P2PoolBot {
    config: Arc<Config>,
    observer: ObserverClient,
}

impl P2PoolBot {
    pub fn new(config: Config) -> Result<Self> {
        let observer = ObserverClient::new(&config.api_base_url, config.api_timeout)
            .context("Failed to create observer API client")?;
        Ok(Self {
            config: Arc::new(config),
            observer,
        })
    }

    /// Connect to Discord and serve until Ctrl-C
    pub async fn start(self) -> Result<()> {
        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        let config = self.config.clone();
        let observer = self.observer.clone();
        let shutdown = shutdown_tx.clone();

        let framework = poise::Framework::builder()
            .options(poise::FrameworkOptions {
                commands: commands::all(),
                ..Default::default()
            })
            .setup(move |ctx, ready, framework| {
                Box::pin(async move {
                    tracing::info!("Logged in as {} (ID: {})", ready.user.name, ready.user.id);

                    start_services(
                        || spawn_notifiers(&config, &observer, ctx.http.clone(), &shutdown),
                        register_commands(ctx, &framework.options().commands, config.guild_id),
                    )
                    .await;

                    Ok(Data { config, observer })
                })
            })
            .build();

        let mut client = serenity::ClientBuilder::new(
            &self.config.discord_token,
            serenity::GatewayIntents::non_privileged(),
        )
        .framework(framework)
        .await
        .context("Failed to build Discord client")?;

        let shard_manager = client.shard_manager.clone();

        tokio::select! {
            res = client.start() => res.context("Discord client stopped")?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown requested");
                let _ = shutdown_tx.send(());
                shard_manager.shutdown_all().await;
            }
        }

        Ok(())
    }
}

/// Spawn the notifiers before syncing commands; a failed sync is logged and the bot keeps running
async fn start_services<F>(spawn: impl FnOnce(), register: F)
where
    F: Future<Output = Result<()>>,
{
    spawn();

    if let Err(e) = register.await {
        tracing::error!("Failed to sync slash commands: {:#}", e);
    }
}

async fn register_commands(
    ctx: &serenity::Context,
    commands: &[poise::Command<Data, commands::Error>],
    guild_id: Option<u64>,
) -> Result<()> {
    match guild_id {
        Some(id) => {
            poise::builtins::register_in_guild(ctx, commands, serenity::GuildId::new(id))
                .await
                .context("guild registration failed")?;
            tracing::info!("Slash commands synced to guild {}", id);
        }
        None => {
            poise::builtins::register_globally(ctx, commands)
                .await
                .context("global registration failed")?;
            tracing::info!(
                "Slash commands synced globally, this might take up to an hour to show everywhere"
            );
        }
    }
    Ok(())
}

/// Start the WebSocket listener and, when enabled, the polling fallback
fn spawn_notifiers(
    config: &Config,
    observer: &ObserverClient,
    http: Arc<serenity::Http>,
    shutdown: &broadcast::Sender<()>,
) {
    let Some(channel_id) = config.notification_channel_id else {
        tracing::warn!("NOTIFICATION_CHANNEL_ID not set. New block notifications will not be sent.");
        return;
    };

    let notifier = Arc::new(ChannelNotifier::new(http, channel_id));

    let listener = NotificationListener::new(
        config.events_url.clone(),
        config.reconnect_delay,
        notifier.clone(),
    )
    .with_timeouts(config.connect_timeout, config.ping_interval);
    tokio::spawn(listener.run(shutdown.subscribe()));
    tracing::info!(channel_id, "Started WebSocket listener task");

    if config.polling_enabled {
        let poller = BlockPoller::new(observer.clone(), notifier, config.poll_interval);
        tokio::spawn(poller.run(shutdown.subscribe()));
        tracing::info!("Started polling fallback task");
    } else {
        tracing::info!("Polling fallback is available but not started, WebSocket is preferred");
    }
}
