//! Emotional state: mood label plus decaying affect scalars

use serde::{Deserialize, Serialize};

use crate::core::types::{now_millis, unit, Timestamp};

/// Threat severity above which the opponent reacts emotionally
pub const HIGH_THREAT: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Neutral,
    Confident,
    Excited,
    Cautious,
    Frustrated,
    Aggressive,
}

impl Mood {
    /// Multiplier applied to property purchase scores
    pub fn purchase_multiplier(&self) -> f32 {
        match self {
            Mood::Neutral => 1.0,
            Mood::Confident => 1.1,
            Mood::Excited => 1.15,
            Mood::Cautious => 0.9,
            Mood::Frustrated => 0.85,
            Mood::Aggressive => 1.05,
        }
    }

    /// Multiplier applied to offensive actions (skills, pressure trades)
    pub fn offensive_multiplier(&self) -> f32 {
        match self {
            Mood::Aggressive => 1.25,
            Mood::Frustrated => 1.1,
            Mood::Cautious => 0.85,
            _ => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalState {
    pub mood: Mood,
    pub confidence: f32,
    pub frustration: f32,
    pub excitement: f32,
    pub last_change: Timestamp,
}

impl Default for EmotionalState {
    fn default() -> Self {
        Self {
            mood: Mood::Neutral,
            confidence: 0.5,
            frustration: 0.0,
            excitement: 0.0,
            last_change: now_millis(),
        }
    }
}

/// Standing of the opponent as seen by the situation analysis
#[derive(Debug, Clone, Copy)]
pub struct Standing {
    /// 1-based rank by cash
    pub money_rank: usize,
    pub player_count: usize,
    /// Severity of the worst current threat
    pub max_threat: f32,
}

impl EmotionalState {
    /// Move mood and scalars according to standing, then decay unreinforced affect
    pub fn update(&mut self, standing: Standing, aggression: f32, decay: f32) {
        let previous = self.mood;

        if standing.money_rank <= 2 {
            self.confidence += 0.1;
            self.excitement += 0.05;
            self.mood = if self.excitement > 0.6 {
                Mood::Excited
            } else {
                Mood::Confident
            };
        } else if standing.money_rank * 2 > standing.player_count {
            self.confidence -= 0.1;
            self.frustration += 0.15;
            self.mood = if self.frustration > 0.5 {
                Mood::Frustrated
            } else {
                Mood::Cautious
            };
        }

        if standing.max_threat > HIGH_THREAT {
            self.mood = if aggression > 0.6 {
                Mood::Aggressive
            } else {
                Mood::Cautious
            };
        }

        self.frustration *= decay;
        self.excitement *= decay;
        self.clamp();

        if self.mood != previous {
            self.last_change = now_millis();
        }
    }

    /// Nudge scalars after a discrete event
    pub fn nudge(&mut self, confidence: f32, frustration: f32, excitement: f32) {
        self.confidence += confidence;
        self.frustration += frustration;
        self.excitement += excitement;
        self.clamp();
    }

    /// Fade affect without new input
    pub fn decay(&mut self, decay: f32) {
        self.frustration *= decay;
        self.excitement *= decay;
        if self.frustration < 0.05 && self.excitement < 0.05 && self.mood != Mood::Neutral {
            self.mood = Mood::Neutral;
            self.last_change = now_millis();
        }
        self.clamp();
    }

    /// Clamp externally supplied scalars into [0,1]
    pub fn sanitized(mut self) -> Self {
        self.clamp();
        self
    }

    fn clamp(&mut self) {
        self.confidence = unit(self.confidence);
        self.frustration = unit(self.frustration);
        self.excitement = unit(self.excitement);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(rank: usize, threat: f32) -> Standing {
        Standing {
            money_rank: rank,
            player_count: 4,
            max_threat: threat,
        }
    }

    #[test]
    fn test_leading_makes_confident() {
        let mut e = EmotionalState::default();
        e.update(standing(1, 0.0), 0.5, 0.9);
        assert_eq!(e.mood, Mood::Confident);
        assert!(e.confidence > 0.5);
    }

    #[test]
    fn test_trailing_makes_cautious_then_frustrated() {
        let mut e = EmotionalState::default();
        e.update(standing(4, 0.0), 0.5, 1.0);
        assert_eq!(e.mood, Mood::Cautious);
        for _ in 0..4 {
            e.update(standing(4, 0.0), 0.5, 1.0);
        }
        assert_eq!(e.mood, Mood::Frustrated);
        assert!(e.confidence < 0.5);
    }

    #[test]
    fn test_high_threat_depends_on_aggression() {
        let mut hot = EmotionalState::default();
        hot.update(standing(1, 0.9), 0.8, 0.9);
        assert_eq!(hot.mood, Mood::Aggressive);

        let mut calm = EmotionalState::default();
        calm.update(standing(1, 0.9), 0.3, 0.9);
        assert_eq!(calm.mood, Mood::Cautious);
    }

    #[test]
    fn test_unreinforced_emotion_fades() {
        let mut e = EmotionalState::default();
        e.nudge(0.0, 0.8, 0.8);
        for _ in 0..10 {
            e.update(standing(3, 0.0), 0.5, 0.5);
        }
        assert!(e.excitement < 0.01);
    }
}
