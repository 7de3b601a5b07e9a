//! Actions an opponent can return to the game

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::types::PlayerId;

/// Enumerated action types understood by the rules engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    RollDice,
    BuyProperty,
    SkipPurchase,
    PayRent,
    UseSkill,
    TradeRequest,
    EndTurn,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::RollDice => "roll_dice",
            ActionType::BuyProperty => "buy_property",
            ActionType::SkipPurchase => "skip_purchase",
            ActionType::PayRent => "pay_rent",
            ActionType::UseSkill => "use_skill",
            ActionType::TradeRequest => "trade_request",
            ActionType::EndTurn => "end_turn",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terms of a proposed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeProposal {
    pub target: PlayerId,
    /// Cells given away by the proposer
    pub offered_cells: Vec<usize>,
    /// Cells requested from the target
    pub requested_cells: Vec<usize>,
    /// Cash paid by the proposer (negative = cash requested)
    pub cash_offer: f64,
}

/// Type-specific parameters of an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    RollDice,
    BuyProperty { cell: usize, price: f64 },
    SkipPurchase { cell: usize },
    PayRent { owner: PlayerId, amount: f64 },
    UseSkill { skill_id: String, target: Option<PlayerId> },
    TradeRequest(TradeProposal),
    EndTurn,
}

impl ActionKind {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionKind::RollDice => ActionType::RollDice,
            ActionKind::BuyProperty { .. } => ActionType::BuyProperty,
            ActionKind::SkipPurchase { .. } => ActionType::SkipPurchase,
            ActionKind::PayRent { .. } => ActionType::PayRent,
            ActionKind::UseSkill { .. } => ActionType::UseSkill,
            ActionKind::TradeRequest(_) => ActionType::TradeRequest,
            ActionKind::EndTurn => ActionType::EndTurn,
        }
    }
}

/// A discriminated action for one acting player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub player_id: PlayerId,
    #[serde(flatten)]
    pub kind: ActionKind,
}

impl Action {
    pub fn new(player_id: PlayerId, kind: ActionKind) -> Self {
        Self { player_id, kind }
    }

    pub fn end_turn(player_id: PlayerId) -> Self {
        Self::new(player_id, ActionKind::EndTurn)
    }

    pub fn action_type(&self) -> ActionType {
        self.kind.action_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_serializes_with_type_tag() {
        let id = PlayerId::new();
        let action = Action::new(id, ActionKind::BuyProperty { cell: 4, price: 3000.0 });
        let json = serde_json::to_value(&action).expect("serialize");
        assert_eq!(json["type"], "buy_property");
        assert_eq!(json["cell"], 4);

        let back: Action = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, action);
    }

    #[test]
    fn test_action_type_mapping() {
        let id = PlayerId::new();
        assert_eq!(Action::end_turn(id).action_type(), ActionType::EndTurn);
        assert_eq!(ActionType::TradeRequest.to_string(), "trade_request");
    }
}
