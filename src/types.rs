use serde::{Deserialize, Serialize};
use std::fmt;

/// Block difficulty as reported by the observer (number, occasionally a string)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Difficulty {
    Value(u64),
    Text(String),
    /// Floats, integers past u64 and anything else; shown as raw JSON
    Other(serde_json::Value),
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Value(v) => write!(f, "{}", v),
            Difficulty::Text(s) => f.write_str(s),
            Difficulty::Other(v) => write!(f, "{}", v),
        }
    }
}

/// Per-window share counters of a miner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareCount {
    #[serde(default)]
    pub shares: u64,
    #[serde(default)]
    pub uncles: u64,
}

/// Miner data from `/miner_info/{address}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinerInfo {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub shares: Vec<ShareCount>,
    #[serde(default)]
    pub last_share_height: Option<u64>,
    #[serde(default)]
    pub last_share_timestamp: Option<u64>,
}

impl MinerInfo {
    /// True when the observer answered without any miner data
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.address.is_none()
            && self.shares.is_empty()
            && self.last_share_height.is_none()
            && self.last_share_timestamp.is_none()
    }

    pub fn total_shares(&self) -> u64 {
        self.shares.iter().map(|s| s.shares).sum()
    }

    pub fn total_uncles(&self) -> u64 {
        self.shares.iter().map(|s| s.uncles).sum()
    }
}

/// Monero mainchain block found by the pool
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MainBlock {
    #[serde(default)]
    pub height: Option<u64>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub reward: Option<u64>,
}

/// Sidechain block, shared by `pool_info` and the event feed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SideBlock {
    #[serde(default)]
    pub side_height: Option<u64>,
    #[serde(default)]
    pub height: Option<u64>,
    #[serde(default)]
    pub main_height: Option<u64>,
    #[serde(default)]
    pub main_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub miner_address: Option<String>,
    #[serde(default)]
    pub main_block: Option<MainBlock>,
}

impl SideBlock {
    /// Sidechain height, falling back to the plain height found blocks carry
    pub fn block_height(&self) -> Option<u64> {
        self.side_height.or(self.height)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LastFound {
    #[serde(default)]
    pub main_block: Option<MainBlock>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sidechain {
    #[serde(default)]
    pub last_block: Option<SideBlock>,
    #[serde(default)]
    pub last_found: Option<LastFound>,
}

/// Pool state from `/pool_info`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolInfo {
    #[serde(default)]
    pub sidechain: Option<Sidechain>,
}

impl PoolInfo {
    /// Current sidechain tip
    pub fn last_block(&self) -> Option<&SideBlock> {
        self.sidechain.as_ref()?.last_block.as_ref()
    }

    /// Last Monero block found by the pool
    pub fn last_found_main_block(&self) -> Option<&MainBlock> {
        self.sidechain.as_ref()?.last_found.as_ref()?.main_block.as_ref()
    }
}
