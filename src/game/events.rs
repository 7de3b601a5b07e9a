//! Typed game events consumed outside the decision path

use serde::{Deserialize, Serialize};

use crate::core::types::{now_millis, PlayerId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEventType {
    GameStart,
    GameEnd,
    PropertyPurchased,
    PropertySold,
    RentPaid,
    SkillUsed,
    TradeProposed,
    TradeAccepted,
    TradeRejected,
    TurnEnd,
    Bankruptcy,
    Other,
}

impl GameEventType {
    /// Initial importance of a memory formed from this event
    pub fn base_importance(&self) -> f32 {
        match self {
            GameEventType::GameStart | GameEventType::GameEnd => 1.0,
            GameEventType::PropertyPurchased | GameEventType::PropertySold => 0.8,
            GameEventType::SkillUsed => 0.6,
            GameEventType::TurnEnd => 0.3,
            _ => 0.5,
        }
    }

    pub fn is_property_transaction(&self) -> bool {
        matches!(
            self,
            GameEventType::PropertyPurchased | GameEventType::PropertySold
        )
    }
}

/// A game event from the feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    pub event_type: GameEventType,
    /// Player who acted
    pub player_id: Option<PlayerId>,
    /// Player on the receiving end (trade partner, skill target, rent owner)
    #[serde(default)]
    pub target_id: Option<PlayerId>,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub timestamp: Timestamp,
}

impl GameEvent {
    pub fn new(event_type: GameEventType) -> Self {
        Self {
            event_type,
            player_id: None,
            target_id: None,
            payload: serde_json::Value::Null,
            timestamp: now_millis(),
        }
    }

    pub fn by(mut self, player: PlayerId) -> Self {
        self.player_id = Some(player);
        self
    }

    pub fn targeting(mut self, target: PlayerId) -> Self {
        self.target_id = Some(target);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Winner announced in a `GameEnd` payload
    pub fn winner(&self) -> Option<PlayerId> {
        self.payload
            .get("winner")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Turn named in the payload, if the feed provides one
    pub fn turn(&self) -> Option<u32> {
        self.payload
            .get("turn")
            .and_then(|v| v.as_u64())
            .map(|t| t as u32)
    }

    /// Colour group named in a property event payload
    pub fn group(&self) -> Option<&str> {
        self.payload.get("group").and_then(|v| v.as_str())
    }
}
