//! Per-opponent state: personality, strategy, emotion, memory and learning

pub mod emotion;
pub mod learning;
pub mod memory;
pub mod personality;
pub mod state;
pub mod store;
pub mod strategy;

pub use emotion::{EmotionalState, Mood};
pub use learning::LearningData;
pub use memory::{Memory, MemoryEvent, MemoryKind, Relationship, StrategicNote};
pub use personality::{
    load_personality, Archetype, InvestmentFocus, NegotiationApproach, Personality, TraitKind,
};
pub use state::{Difficulty, OpponentState};
pub use store::{SharedState, StatePatch, StateStore};
pub use strategy::{Strategy, StrategyFocus, StrategyWeights, TimeHorizon, WeightKind};
