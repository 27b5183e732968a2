use crate::config::Config;
use crate::observer::ObserverClient;
use crate::queries;
use std::sync::Arc;

/// Shared state handed to every command invocation
pub struct Data {
    pub config: Arc<Config>,
    pub observer: ObserverClient,
}

pub type Error = anyhow::Error;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Every registered slash command
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![miner_info(), latest_block()]
}

/// Get P2Pool stats for a specific Monero miner address.
#[poise::command(slash_command, ephemeral)]
pub async fn miner_info(
    ctx: Context<'_>,
    #[description = "The Monero wallet address of the miner"] miner_address: String,
) -> Result<(), Error> {
    tracing::info!(
        address = %miner_address,
        user = %ctx.author().name,
        "received /miner_info"
    );
    ctx.defer_ephemeral().await?;

    let notice = queries::miner_info(&ctx.data().observer, &miner_address).await;
    ctx.send(
        poise::CreateReply::default()
            .embed(notice.into_embed())
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Get information about the latest block on the P2Pool mini sidechain.
#[poise::command(slash_command, ephemeral)]
pub async fn latest_block(ctx: Context<'_>) -> Result<(), Error> {
    tracing::info!(user = %ctx.author().name, "received /latest_block");
    ctx.defer_ephemeral().await?;

    let notice = queries::latest_block(&ctx.data().observer).await;
    ctx.send(
        poise::CreateReply::default()
            .embed(notice.into_embed())
            .ephemeral(true),
    )
    .await?;

    Ok(())
}
