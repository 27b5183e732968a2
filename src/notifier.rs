use crate::notice::Notice;
use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, CreateMessage, Http};
use std::sync::Arc;

/// Destination for block notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: Notice) -> anyhow::Result<()>;
}

#[async_trait]
impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    async fn notify(&self, notice: Notice) -> anyhow::Result<()> {
        (**self).notify(notice).await
    }
}

/// Posts notices as embeds into one Discord channel
pub struct ChannelNotifier {
    http: Arc<Http>,
    channel: ChannelId,
}

impl ChannelNotifier {
    pub fn new(http: Arc<Http>, channel_id: u64) -> Self {
        Self {
            http,
            channel: ChannelId::new(channel_id),
        }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, notice: Notice) -> anyhow::Result<()> {
        self.channel
            .send_message(&self.http, CreateMessage::new().embed(notice.into_embed()))
            .await?;
        Ok(())
    }
}
