//! Request/response handlers behind the slash commands.
//!
//! Each call performs at most one request and always yields something to
//! show; failures are logged here and reduced to a generic notice.

use crate::notice::{self, BlockContext, Notice};
use crate::observer::{ObserverClient, ObserverError};

pub async fn miner_info(api: &ObserverClient, address: &str) -> Notice {
    let address = address.trim();

    match api.miner_info(address).await {
        Ok(Some(info)) => notice::miner_info(address, &info),
        Ok(None) => {
            tracing::info!(address, "miner not found on the pool");
            notice::miner_not_found(address)
        }
        Err(ObserverError::EmptyAddress) => notice::invalid_address(),
        Err(e) => {
            tracing::error!(address, error = %e, "error fetching miner info");
            notice::api_unavailable()
        }
    }
}

pub async fn latest_block(api: &ObserverClient) -> Notice {
    match api.pool_info().await {
        Ok(pool) => notice::latest_block(&pool, BlockContext::Query),
        Err(e) => {
            tracing::error!(error = %e, "error fetching pool info for latest block");
            notice::api_unavailable()
        }
    }
}
