//! Learning data: per-strategy effectiveness and adaptation rate

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::unit;

/// Effectiveness assumed for a strategy that has never been tried
pub const DEFAULT_EFFECTIVENESS: f32 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningData {
    /// Learning cycles recorded, one per decision
    pub games_played: u32,
    /// Finished games observed through the event feed
    pub games_completed: u32,
    pub wins: u32,
    pub win_rate: f32,
    pub strategy_effectiveness: AHashMap<String, f32>,
    pub adaptation_rate: f32,
    /// Step size for effectiveness updates
    pub learning_rate: f32,
}

impl LearningData {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            games_played: 0,
            games_completed: 0,
            wins: 0,
            win_rate: 0.0,
            strategy_effectiveness: AHashMap::new(),
            adaptation_rate: 0.5,
            learning_rate: unit(learning_rate),
        }
    }

    pub fn effectiveness(&self, strategy: &str) -> f32 {
        self.strategy_effectiveness
            .get(strategy)
            .copied()
            .unwrap_or(DEFAULT_EFFECTIVENESS)
    }

    /// Fold one decision's confidence into the learning data
    pub fn record_decision(&mut self, strategy: &str, confidence: f32) {
        self.games_played += 1;

        let current = self.effectiveness(strategy);
        let updated = unit(current + (confidence - 0.5) * self.learning_rate);
        self.strategy_effectiveness
            .insert(strategy.to_string(), updated);

        if confidence > 0.8 {
            self.adaptation_rate = unit(self.adaptation_rate + 0.05);
        } else if confidence < 0.4 {
            self.adaptation_rate = unit(self.adaptation_rate - 0.05);
        }
    }

    pub fn record_game_result(&mut self, won: bool) {
        self.games_completed += 1;
        if won {
            self.wins += 1;
        }
        self.win_rate = self.wins as f32 / self.games_completed as f32;
    }

    /// Best tried strategy other than `current`, with its effectiveness
    pub fn best_alternative(&self, current: &str) -> Option<(&str, f32)> {
        self.strategy_effectiveness
            .iter()
            .filter(|(name, _)| name.as_str() != current)
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(name, value)| (name.as_str(), *value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effectiveness_moves_with_confidence() {
        let mut learning = LearningData::new(0.2);
        learning.record_decision("wealth_accumulation", 0.9);
        assert!((learning.effectiveness("wealth_accumulation") - 0.58).abs() < 1e-6);

        learning.record_decision("wealth_accumulation", 0.1);
        assert!((learning.effectiveness("wealth_accumulation") - 0.5).abs() < 1e-6);
        assert_eq!(learning.games_played, 2);
    }

    #[test]
    fn test_adaptation_rate_thresholds() {
        let mut learning = LearningData::new(0.1);
        learning.record_decision("x", 0.85);
        assert!(learning.adaptation_rate > 0.5);

        let mut learning = LearningData::new(0.1);
        learning.record_decision("x", 0.3);
        assert!(learning.adaptation_rate < 0.5);

        let mut learning = LearningData::new(0.1);
        learning.record_decision("x", 0.6);
        assert_eq!(learning.adaptation_rate, 0.5);
    }

    #[test]
    fn test_effectiveness_stays_bounded() {
        let mut learning = LearningData::new(1.0);
        for _ in 0..20 {
            learning.record_decision("x", 1.0);
        }
        assert_eq!(learning.effectiveness("x"), 1.0);
    }

    #[test]
    fn test_win_rate() {
        let mut learning = LearningData::new(0.1);
        learning.record_game_result(true);
        learning.record_game_result(false);
        assert!((learning.win_rate - 0.5).abs() < f32::EPSILON);
    }
}
