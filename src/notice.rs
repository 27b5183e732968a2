//! Rendering of observer data into Discord embeds.
//!
//! Renderers produce a plain [`Notice`] so they can be inspected without a
//! Discord connection; [`Notice::into_embed`] converts at the edge.

use crate::events::{BlockEvent, BlockEventKind};
use crate::types::{Difficulty, MinerInfo, PoolInfo};
use chrono::DateTime;
use poise::serenity_prelude::{Colour, CreateEmbed, CreateEmbedFooter};

pub const RED: u32 = 0xE74C3C;
pub const ORANGE: u32 = 0xE67E22;
pub const GREEN: u32 = 0x2ECC71;
pub const BLUE: u32 = 0x3498DB;
pub const TEAL: u32 = 0x1ABC9C;

const NA: &str = "N/A";
const API_FOOTER: &str = "Data from mini.p2pool.observer";
const REALTIME_FOOTER: &str = "Realtime via mini.p2pool.observer WebSocket";
const ATOMIC_UNITS_PER_XMR: f64 = 1e12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Embed contents before they are handed to serenity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub colour: u32,
    pub description: Option<String>,
    pub fields: Vec<NoticeField>,
    pub footer: Option<String>,
}

impl Notice {
    pub fn new(title: impl Into<String>, colour: u32) -> Self {
        Self {
            title: title.into(),
            colour,
            description: None,
            fields: Vec::new(),
            footer: None,
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(NoticeField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }

    /// Value of the first field with this name
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Every piece of text the embed will show
    pub fn text(&self) -> String {
        let mut out = self.title.clone();
        if let Some(d) = &self.description {
            out.push('\n');
            out.push_str(d);
        }
        for f in &self.fields {
            out.push('\n');
            out.push_str(&f.name);
            out.push_str(": ");
            out.push_str(&f.value);
        }
        if let Some(footer) = &self.footer {
            out.push('\n');
            out.push_str(footer);
        }
        out
    }

    pub fn into_embed(self) -> CreateEmbed {
        let mut embed = CreateEmbed::new()
            .title(self.title)
            .colour(Colour::new(self.colour));
        if let Some(description) = self.description {
            embed = embed.description(description);
        }
        for f in self.fields {
            embed = embed.field(f.name, f.value, f.inline);
        }
        if let Some(footer) = self.footer {
            embed = embed.footer(CreateEmbedFooter::new(footer));
        }
        embed
    }
}

/// Where a latest-block embed is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockContext {
    Query,
    Notification,
}

/// Keep `head` leading and `tail` trailing characters around an ellipsis
pub fn abbreviate(s: &str, head: usize, tail: usize) -> String {
    let count = s.chars().count();
    if count <= head + tail {
        return s.to_string();
    }
    let start: String = s.chars().take(head).collect();
    let end: String = s.chars().skip(count - tail).collect();
    format!("{}...{}", start, end)
}

fn short_id(id: &str) -> String {
    let prefix: String = id.chars().take(16).collect();
    format!("`{}...`", prefix)
}

fn or_na<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| NA.to_string())
}

/// Discord relative timestamp with the absolute UTC time underneath
pub fn format_timestamp(ts: u64) -> String {
    let relative = format!("<t:{}:R>", ts);
    match i64::try_from(ts).ok().and_then(|s| DateTime::from_timestamp(s, 0)) {
        Some(dt) => format!("{}\n{}", relative, dt.format("%Y-%m-%d %H:%M:%S UTC")),
        None => relative,
    }
}

fn format_difficulty(difficulty: Option<&Difficulty>) -> String {
    or_na(difficulty)
}

pub fn format_xmr(atomic: u64) -> String {
    format!("{:.6} XMR", atomic as f64 / ATOMIC_UNITS_PER_XMR)
}

pub fn miner_not_found(address: &str) -> Notice {
    Notice::new("Miner Not Found", RED).description(format!(
        "Could not retrieve information for miner: `{}`\nThe address might be invalid or not found on the pool.",
        address
    ))
}

pub fn miner_info(address: &str, info: &MinerInfo) -> Notice {
    if info.is_empty() {
        return miner_not_found(address);
    }

    let mut notice = Notice::new(
        format!("Miner Information: {}", abbreviate(address, 12, 6)),
        BLUE,
    )
    .field("Miner ID", or_na(info.id), true)
    .field(
        "Address",
        format!("`{}`", info.address.as_deref().unwrap_or(NA)),
        false,
    );

    notice = if info.shares.is_empty() {
        notice.field("Shares", "No share data found", true)
    } else {
        notice
            .field("Total Shares", info.total_shares().to_string(), true)
            .field("Total Uncles", info.total_uncles().to_string(), true)
    };

    notice
        .field(
            "Last Share Submitted",
            info.last_share_timestamp
                .filter(|ts| *ts > 0)
                .map(format_timestamp)
                .unwrap_or_else(|| NA.to_string()),
            true,
        )
        .field("Last Share Height", or_na(info.last_share_height), true)
        .footer(API_FOOTER)
}

pub fn latest_block(pool: &PoolInfo, context: BlockContext) -> Notice {
    if pool.sidechain.is_none() {
        return Notice::new("Error", RED)
            .description("Invalid or empty sidechain data received.");
    }

    let Some(block) = pool.last_block() else {
        return Notice::new("Latest Block Information", ORANGE)
            .description("Could not retrieve latest block information from the sidechain.");
    };

    let title = match context {
        BlockContext::Query => "Latest P2Pool Mini Sidechain Block",
        BlockContext::Notification => "🎉 New Block Found on P2Pool Mini!",
    };

    let mut notice = Notice::new(title, GREEN)
        .field("Sidechain Height", or_na(block.side_height), true)
        .field(
            "Block Hash (Main ID)",
            block.main_id.as_deref().map(short_id).unwrap_or_else(|| NA.into()),
            true,
        )
        .field(
            "Template ID",
            block.template_id.as_deref().map(short_id).unwrap_or_else(|| NA.into()),
            true,
        )
        .field(
            "Timestamp",
            block
                .timestamp
                .filter(|ts| *ts > 0)
                .map(format_timestamp)
                .unwrap_or_else(|| NA.into()),
            true,
        )
        .field("Difficulty", format_difficulty(block.difficulty.as_ref()), true)
        .field(
            "Found By (Sidechain)",
            block
                .miner_address
                .as_deref()
                .map(|a| format!("`{}`", abbreviate(a, 8, 4)))
                .unwrap_or_else(|| NA.into()),
            true,
        );

    if let Some(main) = pool.last_found_main_block() {
        notice = notice
            .field("--- Last Monero Block Found by Pool ---", "\u{200b}", false)
            .field("Mainnet Height", or_na(main.height), true)
            .field(
                "Mainnet Block ID",
                main.id.as_deref().map(short_id).unwrap_or_else(|| NA.into()),
                true,
            )
            .field(
                "Mainnet Reward",
                main.reward
                    .filter(|r| *r > 0)
                    .map(format_xmr)
                    .unwrap_or_else(|| NA.into()),
                true,
            );
    }

    notice.footer(API_FOOTER)
}

pub fn block_event(event: &BlockEvent) -> Notice {
    let block = &event.block;
    let mut notice = Notice::new(
        format!("🎉 New P2Pool Mini Block ({})!", event.kind.title()),
        TEAL,
    );

    match (block.side_height, block.height) {
        (Some(side), _) => notice = notice.field("Sidechain Height", side.to_string(), true),
        (None, Some(height)) => notice = notice.field("Height", height.to_string(), true),
        (None, None) => {}
    }
    if let Some(main_height) = block.main_height {
        notice = notice.field("Mainchain Height", main_height.to_string(), true);
    }

    match (event.kind, &block.id, &block.template_id) {
        (BlockEventKind::FoundBlock, Some(id), _) => {
            notice = notice.field("Main Block ID", short_id(id), true)
        }
        (_, _, Some(template_id)) => {
            notice = notice.field("Template ID", short_id(template_id), true)
        }
        _ => {}
    }

    if let Some(ts) = block.timestamp.filter(|ts| *ts > 0) {
        notice = notice.field("Timestamp", format_timestamp(ts), true);
    }
    if let Some(difficulty) = &block.difficulty {
        notice = notice.field("Difficulty", difficulty.to_string(), true);
    }
    if let Some(miner) = block.miner_address.as_deref().filter(|a| !a.is_empty()) {
        notice = notice.field("Found By", format!("`{}`", miner), true);
    }
    if event.kind == BlockEventKind::FoundBlock {
        if let Some(reward) = event.reward {
            notice = notice.field("Mainnet Reward", format_xmr(reward), true);
        }
    }

    notice.footer(REALTIME_FOOTER)
}

/// Generic failure shown to users; details only go to the logs
pub fn api_unavailable() -> Notice {
    Notice::new("Pool API Unavailable", RED)
        .description("Couldn't reach the pool API right now. Please try again later.")
}

pub fn invalid_address() -> Notice {
    Notice::new("Invalid Address", RED).description("Miner address cannot be empty.")
}
