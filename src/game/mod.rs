//! Game-facing types: the input snapshot, the action output and the event feed

pub mod action;
pub mod events;
pub mod state;

pub use action::{Action, ActionKind, ActionType, TradeProposal};
pub use events::{GameEvent, GameEventType};
pub use state::{
    BoardCell, CellKind, GameState, GameStateBuilder, MarketConditions, PlayerSnapshot, RentDue,
    Season, SkillState, SkillTag, TurnPhase, Zodiac,
};
