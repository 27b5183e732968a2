use crate::types::{MainBlock, SideBlock};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockEventKind {
    SideBlock,
    FoundBlock,
}

impl BlockEventKind {
    /// The `type` tag and payload key used by the observer
    pub fn tag(&self) -> &'static str {
        match self {
            BlockEventKind::SideBlock => "side_block",
            BlockEventKind::FoundBlock => "found_block",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            BlockEventKind::SideBlock => "Side Block",
            BlockEventKind::FoundBlock => "Found Block",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "side_block" => Some(BlockEventKind::SideBlock),
            "found_block" => Some(BlockEventKind::FoundBlock),
            _ => None,
        }
    }
}

/// Block announcement worth a notification
#[derive(Debug, Clone)]
pub struct BlockEvent {
    pub kind: BlockEventKind,
    pub block: SideBlock,
    /// Mainnet reward in atomic units, found blocks only
    pub reward: Option<u64>,
}

impl BlockEvent {
    pub fn height(&self) -> u64 {
        self.block.block_height().unwrap_or_default()
    }
}

#[derive(Debug)]
pub enum ObserverMessage {
    Block(BlockEvent),
    Orphaned(Value),
    /// Any other `type`, or none at all
    Other(Option<String>),
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("'{0}' event had no associated block data")]
    MissingPayload(&'static str),
    #[error("could not determine block height from '{0}' event")]
    MissingHeight(&'static str),
}

/// Classify one frame from the observer event feed
pub fn parse_message(text: &str) -> Result<ObserverMessage, EventError> {
    let mut value: Value = serde_json::from_str(text)?;

    let tag = match value.get("type").and_then(Value::as_str) {
        Some(tag) => tag.to_string(),
        None => return Ok(ObserverMessage::Other(None)),
    };

    let Some(kind) = BlockEventKind::from_tag(&tag) else {
        return Ok(if tag == "orphaned_block" {
            ObserverMessage::Orphaned(value)
        } else {
            ObserverMessage::Other(Some(tag))
        });
    };

    let payload = value
        .get_mut(kind.tag())
        .map(Value::take)
        .filter(|p| !p.is_null() && p.as_object().map_or(true, |o| !o.is_empty()))
        .ok_or(EventError::MissingPayload(kind.tag()))?;

    let block: SideBlock = serde_json::from_value(payload)?;
    if block.block_height().is_none() {
        return Err(EventError::MissingHeight(kind.tag()));
    }

    let reward = match kind {
        BlockEventKind::FoundBlock => block
            .main_block
            .as_ref()
            .and_then(|m| m.reward)
            .or_else(|| {
                value
                    .get("main_block")
                    .cloned()
                    .and_then(|m| serde_json::from_value::<MainBlock>(m).ok())
                    .and_then(|m| m.reward)
            }),
        BlockEventKind::SideBlock => None,
    };

    Ok(ObserverMessage::Block(BlockEvent {
        kind,
        block,
        reward,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_block() {
        let msg = parse_message(
            r#"{"type":"found_block","found_block":{"height":12345,"timestamp":1700000000,
                "miner_address":"abc...","difficulty":50000}}"#,
        )
        .unwrap();

        let ObserverMessage::Block(event) = msg else {
            panic!("expected a block event");
        };
        assert_eq!(event.kind, BlockEventKind::FoundBlock);
        assert_eq!(event.height(), 12345);
        assert_eq!(event.block.timestamp, Some(1700000000));
        assert_eq!(event.block.miner_address.as_deref(), Some("abc..."));
        assert_eq!(event.reward, None);
    }

    #[test]
    fn test_found_block_reward_locations() {
        let top_level = parse_message(
            r#"{"type":"found_block","found_block":{"height":1},"main_block":{"reward":600000000000}}"#,
        )
        .unwrap();
        let nested = parse_message(
            r#"{"type":"found_block","found_block":{"height":1,"main_block":{"reward":5}}}"#,
        )
        .unwrap();

        assert!(matches!(top_level, ObserverMessage::Block(ref e) if e.reward == Some(600000000000)));
        assert!(matches!(nested, ObserverMessage::Block(ref e) if e.reward == Some(5)));
    }

    #[test]
    fn test_side_block_prefers_side_height() {
        let msg = parse_message(
            r#"{"type":"side_block","side_block":{"side_height":900,"main_height":3000000,
                "template_id":"ff","difficulty":"123"}}"#,
        )
        .unwrap();

        let ObserverMessage::Block(event) = msg else {
            panic!("expected a block event");
        };
        assert_eq!(event.kind, BlockEventKind::SideBlock);
        assert_eq!(event.height(), 900);
        assert_eq!(event.block.main_height, Some(3000000));
    }

    #[test]
    fn test_unusual_difficulty_does_not_drop_event() {
        for difficulty in ["1.5e20", "340282366920938463463374607431768211455", "-1"] {
            let text = format!(
                r#"{{"type":"side_block","side_block":{{"side_height":901,"difficulty":{}}}}}"#,
                difficulty
            );
            let msg = parse_message(&text).unwrap();
            assert!(
                matches!(msg, ObserverMessage::Block(ref e) if e.height() == 901),
                "{difficulty}"
            );
        }
    }

    #[test]
    fn test_other_types_are_not_block_events() {
        assert!(matches!(
            parse_message(r#"{"type":"orphaned_block","orphaned_block":{"side_height":1}}"#).unwrap(),
            ObserverMessage::Orphaned(_)
        ));
        assert!(matches!(
            parse_message(r#"{"type":"ping"}"#).unwrap(),
            ObserverMessage::Other(Some(ref t)) if t == "ping"
        ));
        assert!(matches!(
            parse_message(r#"{"side_block":{"side_height":1}}"#).unwrap(),
            ObserverMessage::Other(None)
        ));
    }

    #[test]
    fn test_malformed_messages() {
        assert!(matches!(parse_message("not json"), Err(EventError::Json(_))));
        assert!(matches!(
            parse_message(r#"{"type":"side_block"}"#),
            Err(EventError::MissingPayload("side_block"))
        ));
        assert!(matches!(
            parse_message(r#"{"type":"side_block","side_block":{}}"#),
            Err(EventError::MissingPayload("side_block"))
        ));
        assert!(matches!(
            parse_message(r#"{"type":"found_block","found_block":{"timestamp":5}}"#),
            Err(EventError::MissingHeight("found_block"))
        ));
        assert!(matches!(
            parse_message(r#"{"type":"side_block","side_block":{"side_height":"tall"}}"#),
            Err(EventError::Json(_))
        ));
    }
}
