//! Complete per-opponent state and its update rules

use serde::{Deserialize, Serialize};

use crate::core::config::EngineConfig;
use crate::core::types::{now_millis, unit, PlayerId, Timestamp};
use crate::evaluator::SituationAnalysis;
use crate::game::{GameEvent, GameEventType, GameState};
use crate::opponent::emotion::{EmotionalState, Standing};
use crate::opponent::learning::LearningData;
use crate::opponent::memory::{Memory, MemoryEvent, MemoryKind};
use crate::opponent::personality::Personality;
use crate::opponent::strategy::{rank_focuses, Strategy, StrategyFocus};

/// Learning cycles before a failing strategy may be abandoned
const MIN_CYCLES_BEFORE_ADAPTING: u32 = 10;
const FAILING_EFFECTIVENESS: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
    Expert,
}

impl Difficulty {
    /// Shift applied to adaptability before the personality is frozen
    pub fn adaptability_shift(&self) -> f32 {
        match self {
            Difficulty::Easy => -0.2,
            Difficulty::Normal => 0.0,
            Difficulty::Hard => 0.1,
            Difficulty::Expert => 0.2,
        }
    }

    pub fn learning_multiplier(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.5,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.5,
            Difficulty::Expert => 2.0,
        }
    }

    pub fn risk_shift(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.1,
            Difficulty::Normal => 0.0,
            Difficulty::Hard => -0.05,
            Difficulty::Expert => -0.1,
        }
    }
}

/// Everything the engine knows about one opponent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpponentState {
    pub id: PlayerId,
    pub name: String,
    pub difficulty: Difficulty,
    personality: Personality,
    pub strategy: Strategy,
    pub emotion: EmotionalState,
    pub memory: Memory,
    pub learning: LearningData,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl OpponentState {
    pub fn new(
        id: PlayerId,
        name: &str,
        personality: Personality,
        difficulty: Difficulty,
        config: &EngineConfig,
    ) -> Self {
        let mut personality = personality;
        personality.adaptability += difficulty.adaptability_shift();
        let personality = personality.sanitized();

        let mut strategy = Strategy::from_personality(&personality);
        strategy.risk_level = unit(strategy.risk_level + difficulty.risk_shift());

        let now = now_millis();
        Self {
            id,
            name: name.to_string(),
            difficulty,
            personality,
            strategy,
            emotion: EmotionalState::default(),
            memory: Memory::new(),
            learning: LearningData::new(config.learning_rate * difficulty.learning_multiplier()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Personality is immutable after creation
    pub fn personality(&self) -> &Personality {
        &self.personality
    }

    fn touch(&mut self) {
        self.updated_at = now_millis();
    }

    pub fn update_emotional_state(&mut self, analysis: &SituationAnalysis, config: &EngineConfig) {
        let standing = Standing {
            money_rank: analysis.economics.money_rank,
            player_count: analysis.players.len() + 1,
            max_threat: analysis.max_threat_severity(),
        };
        self.emotion
            .update(standing, self.personality.aggression, config.emotion_decay);
        self.touch();
    }

    /// Record this decision cycle's observation and age existing memories
    pub fn update_memory(&mut self, game: &GameState, config: &EngineConfig) {
        let kind = if game.round <= 1 && game.turn <= 1 {
            MemoryKind::Event(GameEventType::GameStart)
        } else {
            MemoryKind::TurnObserved
        };
        let cash = game.player(self.id).map(|p| p.cash).unwrap_or(0.0);
        let summary = format!(
            "turn {} round {}: {:?} with {:.0} cash",
            game.turn, game.round, game.phase, cash
        );

        self.memory.record(
            MemoryEvent::new(kind, game.turn, summary),
            config.memory_decay_rate,
            config.max_memory_events,
        );
        self.memory
            .decay_relationships(config.relationship_decay_rate);
        self.touch();
    }

    /// Fold a decision into the learning data, possibly switching strategy
    pub fn update_learning(&mut self, strategy_name: &str, confidence: f32) -> Option<StrategyFocus> {
        self.learning.record_decision(strategy_name, confidence);
        let switched = self.maybe_adapt_strategy();
        self.touch();
        switched
    }

    fn maybe_adapt_strategy(&mut self) -> Option<StrategyFocus> {
        let current = self.strategy.focus;
        let current_score = self.learning.effectiveness(current.name());

        if self.learning.games_played < MIN_CYCLES_BEFORE_ADAPTING
            || current_score >= FAILING_EFFECTIVENESS
            || self.learning.adaptation_rate <= 0.5
        {
            return None;
        }

        let next = self
            .learning
            .best_alternative(current.name())
            .filter(|(_, score)| *score > current_score)
            .and_then(|(name, _)| StrategyFocus::from_name(name))
            .or_else(|| {
                rank_focuses(&self.personality)
                    .into_iter()
                    .find(|f| *f != current)
            })?;

        self.strategy = self.strategy.with_focus(next);
        Some(next)
    }

    /// Apply an event from the game feed
    pub fn process_event(&mut self, event: &GameEvent, turn: u32, config: &EngineConfig) {
        let me = self.id;
        let actor = event.player_id;
        let target = event.target_id;
        let other = match (actor, target) {
            (Some(a), _) if a != me => Some(a),
            (_, Some(t)) if t != me => Some(t),
            _ => None,
        };

        let summary = match (actor, target) {
            (Some(a), Some(t)) => format!("{:?} by {} on {}", event.event_type, a, t),
            (Some(a), None) => format!("{:?} by {}", event.event_type, a),
            _ => format!("{:?}", event.event_type),
        };
        self.memory.record(
            MemoryEvent::new(MemoryKind::Event(event.event_type), turn, summary).about(other),
            config.memory_decay_rate,
            config.max_memory_events,
        );

        match event.event_type {
            GameEventType::TradeProposed if target == Some(me) => {
                if let Some(a) = actor {
                    self.memory.relationship_mut(a).nudge(0.05, 0.0, 0.02);
                }
            }
            GameEventType::TradeAccepted if actor == Some(me) || target == Some(me) => {
                if let Some(o) = other {
                    self.memory.relationship_mut(o).nudge(0.1, 0.0, 0.05);
                }
                self.emotion.nudge(0.05, 0.0, 0.05);
            }
            GameEventType::TradeRejected if target == Some(me) => {
                if let Some(a) = actor {
                    self.memory.relationship_mut(a).nudge(-0.1, 0.05, 0.0);
                }
                self.emotion.nudge(-0.02, 0.1, 0.0);
            }
            GameEventType::SkillUsed if target == Some(me) => {
                if let Some(a) = actor {
                    self.memory.relationship_mut(a).nudge(-0.05, 0.15, 0.0);
                }
                self.emotion.nudge(-0.03, 0.08, 0.0);
            }
            GameEventType::RentPaid if actor == Some(me) => {
                if let Some(t) = target {
                    self.memory.relationship_mut(t).nudge(0.0, 0.02, 0.0);
                }
                self.emotion.nudge(-0.02, 0.05, 0.0);
            }
            GameEventType::RentPaid if target == Some(me) => {
                self.emotion.nudge(0.02, 0.0, 0.05);
            }
            GameEventType::PropertyPurchased if actor == Some(me) => {
                self.emotion.nudge(0.03, 0.0, 0.1);
            }
            GameEventType::PropertyPurchased => {
                if let (Some(a), Some(group)) = (actor, event.group()) {
                    self.memory.note(
                        &format!("group:{}", group),
                        &format!("{} is buying into {}", a, group),
                        config.max_knowledge_notes,
                    );
                }
            }
            GameEventType::Bankruptcy => {
                if let Some(a) = actor.filter(|a| *a != me) {
                    self.memory.note(
                        &format!("bankrupt:{}", a),
                        "eliminated",
                        config.max_knowledge_notes,
                    );
                    self.memory.relationships.remove(&a);
                }
            }
            GameEventType::GameEnd => {
                let won = event.winner() == Some(me);
                self.learning.record_game_result(won);
                if won {
                    self.emotion.nudge(0.2, -0.2, 0.3);
                } else {
                    self.emotion.nudge(-0.1, 0.1, 0.0);
                }
            }
            _ => {}
        }

        self.touch();
    }

    /// Periodic decay with no new input
    pub fn decay(&mut self, config: &EngineConfig) {
        self.memory.decay_events(config.memory_decay_rate);
        self.memory
            .decay_relationships(config.relationship_decay_rate);
        self.emotion.decay(config.emotion_decay);
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opponent::personality::Archetype;
    use serde_json::json;

    fn opponent(difficulty: Difficulty) -> OpponentState {
        OpponentState::new(
            PlayerId::new(),
            "Rival",
            Personality::archetype(Archetype::Balanced),
            difficulty,
            &EngineConfig::default(),
        )
    }

    #[test]
    fn test_difficulty_shapes_creation() {
        let easy = opponent(Difficulty::Easy);
        let expert = opponent(Difficulty::Expert);
        assert!(easy.personality().adaptability < expert.personality().adaptability);
        assert!(easy.learning.learning_rate < expert.learning.learning_rate);
    }

    #[test]
    fn test_trade_rejection_lowers_trust() {
        let mut state = opponent(Difficulty::Normal);
        let rival = PlayerId::new();
        let event = GameEvent::new(GameEventType::TradeRejected)
            .by(rival)
            .targeting(state.id);

        state.process_event(&event, 3, &EngineConfig::default());

        assert!(state.memory.trust_in(rival) < 0.5);
        assert_eq!(state.memory.events.len(), 1);
        assert!(state.emotion.frustration > 0.0);
    }

    #[test]
    fn test_trade_proposal_raises_trust() {
        let mut state = opponent(Difficulty::Normal);
        let rival = PlayerId::new();
        let event = GameEvent::new(GameEventType::TradeProposed)
            .by(rival)
            .targeting(state.id);

        state.process_event(&event, 3, &EngineConfig::default());
        assert!(state.memory.trust_in(rival) > 0.5);
    }

    #[test]
    fn test_game_end_updates_win_rate() {
        let mut state = opponent(Difficulty::Normal);
        let event = GameEvent::new(GameEventType::GameEnd).with_payload(json!({ "winner": state.id }));
        state.process_event(&event, 40, &EngineConfig::default());
        assert_eq!(state.learning.games_completed, 1);
        assert_eq!(state.learning.win_rate, 1.0);
    }

    #[test]
    fn test_rival_purchase_becomes_note() {
        let mut state = opponent(Difficulty::Normal);
        let event = GameEvent::new(GameEventType::PropertyPurchased)
            .by(PlayerId::new())
            .with_payload(json!({ "group": "jade" }));
        state.process_event(&event, 2, &EngineConfig::default());
        assert_eq!(state.memory.knowledge[0].topic, "group:jade");
    }

    #[test]
    fn test_failing_strategy_is_abandoned() {
        let mut state = opponent(Difficulty::Normal);
        let original = state.strategy.focus;
        state.learning.adaptation_rate = 0.9;
        state
            .learning
            .strategy_effectiveness
            .insert(original.name().to_string(), 0.1);
        state.learning.games_played = 20;

        let switched = state.update_learning(original.name(), 0.45);
        assert!(switched.is_some());
        assert_ne!(state.strategy.focus, original);
    }

    #[test]
    fn test_young_opponent_keeps_strategy() {
        let mut state = opponent(Difficulty::Normal);
        let original = state.strategy.focus;
        assert!(state.update_learning(original.name(), 0.1).is_none());
        assert_eq!(state.strategy.focus, original);
    }
}
