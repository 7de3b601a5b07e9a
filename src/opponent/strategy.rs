//! Mutable strategy profile: focus, horizon, risk and action-category weights

use serde::{Deserialize, Serialize};

use crate::core::types::{now_millis, unit, Timestamp};
use crate::opponent::personality::{InvestmentFocus, Personality};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyFocus {
    WealthAccumulation,
    PropertyMonopoly,
    OpponentElimination,
    RiskMinimization,
    Opportunistic,
}

impl StrategyFocus {
    pub const ALL: [StrategyFocus; 5] = [
        StrategyFocus::WealthAccumulation,
        StrategyFocus::PropertyMonopoly,
        StrategyFocus::OpponentElimination,
        StrategyFocus::RiskMinimization,
        StrategyFocus::Opportunistic,
    ];

    /// Key used for effectiveness tracking
    pub fn name(&self) -> &'static str {
        match self {
            StrategyFocus::WealthAccumulation => "wealth_accumulation",
            StrategyFocus::PropertyMonopoly => "property_monopoly",
            StrategyFocus::OpponentElimination => "opponent_elimination",
            StrategyFocus::RiskMinimization => "risk_minimization",
            StrategyFocus::Opportunistic => "opportunistic",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeHorizon {
    Short,
    Medium,
    Long,
}

/// Weights over action categories, each in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyWeights {
    pub money: f32,
    pub property: f32,
    pub blockade: f32,
    pub risk_avoidance: f32,
    pub opportunism: f32,
}

/// Names one entry of the strategy weight vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightKind {
    Money,
    Property,
    Blockade,
    RiskAvoidance,
    Opportunism,
}

impl StrategyWeights {
    pub fn get(&self, kind: WeightKind) -> f32 {
        match kind {
            WeightKind::Money => self.money,
            WeightKind::Property => self.property,
            WeightKind::Blockade => self.blockade,
            WeightKind::RiskAvoidance => self.risk_avoidance,
            WeightKind::Opportunism => self.opportunism,
        }
    }

    pub fn for_focus(focus: StrategyFocus) -> Self {
        let (money, property, blockade, risk_avoidance, opportunism) = match focus {
            StrategyFocus::WealthAccumulation => (0.8, 0.5, 0.2, 0.4, 0.4),
            StrategyFocus::PropertyMonopoly => (0.4, 0.9, 0.5, 0.3, 0.4),
            StrategyFocus::OpponentElimination => (0.3, 0.6, 0.9, 0.2, 0.5),
            StrategyFocus::RiskMinimization => (0.6, 0.3, 0.2, 0.9, 0.2),
            StrategyFocus::Opportunistic => (0.5, 0.5, 0.4, 0.3, 0.9),
        };
        Self {
            money,
            property,
            blockade,
            risk_avoidance,
            opportunism,
        }
    }

    pub fn sanitized(self) -> Self {
        Self {
            money: unit(self.money),
            property: unit(self.property),
            blockade: unit(self.blockade),
            risk_avoidance: unit(self.risk_avoidance),
            opportunism: unit(self.opportunism),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub focus: StrategyFocus,
    pub time_horizon: TimeHorizon,
    pub risk_level: f32,
    pub weights: StrategyWeights,
    pub adopted_at: Timestamp,
}

impl Strategy {
    pub fn new(focus: StrategyFocus, time_horizon: TimeHorizon, risk_level: f32) -> Self {
        Self {
            focus,
            time_horizon,
            risk_level: unit(risk_level),
            weights: StrategyWeights::for_focus(focus),
            adopted_at: now_millis(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.focus.name()
    }

    /// Initial strategy implied by a personality
    pub fn from_personality(personality: &Personality) -> Self {
        let focus = rank_focuses(personality)[0];
        let time_horizon = if personality.patience > 0.65 {
            TimeHorizon::Long
        } else if personality.patience < 0.35 {
            TimeHorizon::Short
        } else {
            TimeHorizon::Medium
        };
        Self::new(focus, time_horizon, personality.risk_tolerance)
    }

    /// Same horizon and risk, different focus
    pub fn with_focus(&self, focus: StrategyFocus) -> Self {
        Self::new(focus, self.time_horizon, self.risk_level)
    }
}

/// Strategy focuses ordered by how well they fit a personality
pub fn rank_focuses(personality: &Personality) -> Vec<StrategyFocus> {
    let roi_minded = matches!(
        personality.property.investment_focus,
        InvestmentFocus::ReturnOnInvestment | InvestmentFocus::RentalIncome
    );
    let monopoly_minded = personality.property.investment_focus == InvestmentFocus::Monopoly;

    let mut scored: Vec<(StrategyFocus, f32)> = vec![
        (
            StrategyFocus::WealthAccumulation,
            personality.patience * 0.4 + if roi_minded { 0.2 } else { 0.0 } + 0.1,
        ),
        (
            StrategyFocus::PropertyMonopoly,
            personality.risk_tolerance * 0.3
                + personality.patience * 0.2
                + if monopoly_minded { 0.4 } else { 0.0 },
        ),
        (
            StrategyFocus::OpponentElimination,
            personality.aggression * 0.8 + personality.risk_tolerance * 0.1,
        ),
        (
            StrategyFocus::RiskMinimization,
            (1.0 - personality.risk_tolerance) * 0.8,
        ),
        (
            StrategyFocus::Opportunistic,
            personality.adaptability * 0.5 + personality.risk_tolerance * 0.3,
        ),
    ];

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(focus, _)| focus).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opponent::personality::Archetype;

    #[test]
    fn test_focus_names_round_trip() {
        for focus in StrategyFocus::ALL {
            assert_eq!(StrategyFocus::from_name(focus.name()), Some(focus));
        }
    }

    #[test]
    fn test_aggressive_personality_hunts_opponents() {
        let strategy = Strategy::from_personality(&Personality::archetype(Archetype::Aggressive));
        assert_eq!(strategy.focus, StrategyFocus::OpponentElimination);
        assert_eq!(strategy.time_horizon, TimeHorizon::Short);
    }

    #[test]
    fn test_conservative_personality_minimizes_risk() {
        let strategy =
            Strategy::from_personality(&Personality::archetype(Archetype::Conservative));
        assert_eq!(strategy.focus, StrategyFocus::RiskMinimization);
        assert_eq!(strategy.time_horizon, TimeHorizon::Long);
    }

    #[test]
    fn test_weights_are_bounded() {
        for focus in StrategyFocus::ALL {
            let w = StrategyWeights::for_focus(focus);
            for v in [w.money, w.property, w.blockade, w.risk_avoidance, w.opportunism] {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }
}
