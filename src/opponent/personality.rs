//! Opponent personality, fixed once the opponent is created
//!
//! Personalities define trait values, property and skill preferences and
//! negotiation style. They can be built from an archetype or loaded from TOML.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::unit;
use crate::game::SkillTag;

/// Scalar personality traits, addressable by rule tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitKind {
    RiskTolerance,
    Aggression,
    Cooperation,
    Adaptability,
    Patience,
}

/// What the opponent looks for in a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentFocus {
    RentalIncome,
    ReturnOnInvestment,
    Monopoly,
    Speculation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyPreference {
    pub investment_focus: InvestmentFocus,
    /// Colour groups the opponent is drawn to
    #[serde(default)]
    pub favored_groups: Vec<String>,
    /// Largest share of cash the opponent will spend on one property
    pub max_price_ratio: f32,
}

impl Default for PropertyPreference {
    fn default() -> Self {
        Self {
            investment_focus: InvestmentFocus::RentalIncome,
            favored_groups: Vec::new(),
            max_price_ratio: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillPreference {
    #[serde(default)]
    pub preferred_tags: Vec<SkillTag>,
    /// How eagerly skills are used (0.0 = hoards, 1.0 = uses on cooldown)
    pub usage_frequency: f32,
    /// Keep skills for high-threat situations
    #[serde(default)]
    pub save_for_critical: bool,
}

impl Default for SkillPreference {
    fn default() -> Self {
        Self {
            preferred_tags: Vec::new(),
            usage_frequency: 0.5,
            save_for_critical: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationApproach {
    Cooperative,
    Competitive,
    Analytical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationStyle {
    pub approach: NegotiationApproach,
    /// How close to fair value offers are made
    pub fairness: f32,
    pub bluff_tendency: f32,
}

impl Default for NegotiationStyle {
    fn default() -> Self {
        Self {
            approach: NegotiationApproach::Analytical,
            fairness: 0.6,
            bluff_tendency: 0.2,
        }
    }
}

/// Complete personality of an opponent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Personality {
    /// Willingness to take financial risk (0.0 = averse, 1.0 = reckless)
    pub risk_tolerance: f32,
    /// Tendency to hurt rivals (0.0 = passive, 1.0 = ruthless)
    pub aggression: f32,
    /// Willingness to trade and ally
    pub cooperation: f32,
    /// How readily behaviour follows the situation instead of habit
    pub adaptability: f32,
    /// Willingness to wait for long-term payoffs
    pub patience: f32,
    #[serde(default)]
    pub property: PropertyPreference,
    #[serde(default)]
    pub skills: SkillPreference,
    #[serde(default)]
    pub negotiation: NegotiationStyle,
}

impl Default for Personality {
    fn default() -> Self {
        Self::archetype(Archetype::Balanced)
    }
}

/// Named starting points for personalities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Conservative,
    Aggressive,
    Balanced,
    Opportunist,
    Diplomat,
    Analyst,
}

impl Archetype {
    pub const ALL: [Archetype; 6] = [
        Archetype::Conservative,
        Archetype::Aggressive,
        Archetype::Balanced,
        Archetype::Opportunist,
        Archetype::Diplomat,
        Archetype::Analyst,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Archetype::Conservative => "conservative",
            Archetype::Aggressive => "aggressive",
            Archetype::Balanced => "balanced",
            Archetype::Opportunist => "opportunist",
            Archetype::Diplomat => "diplomat",
            Archetype::Analyst => "analyst",
        }
    }
}

impl Personality {
    pub fn archetype(archetype: Archetype) -> Self {
        let (risk_tolerance, aggression, cooperation, adaptability, patience) = match archetype {
            Archetype::Conservative => (0.2, 0.2, 0.5, 0.4, 0.8),
            Archetype::Aggressive => (0.8, 0.9, 0.2, 0.5, 0.3),
            Archetype::Balanced => (0.5, 0.5, 0.5, 0.5, 0.5),
            Archetype::Opportunist => (0.7, 0.5, 0.4, 0.8, 0.3),
            Archetype::Diplomat => (0.4, 0.2, 0.9, 0.6, 0.6),
            Archetype::Analyst => (0.4, 0.4, 0.5, 0.9, 0.7),
        };

        let property = PropertyPreference {
            investment_focus: match archetype {
                Archetype::Conservative => InvestmentFocus::RentalIncome,
                Archetype::Aggressive => InvestmentFocus::Monopoly,
                Archetype::Opportunist => InvestmentFocus::Speculation,
                Archetype::Analyst => InvestmentFocus::ReturnOnInvestment,
                Archetype::Balanced | Archetype::Diplomat => InvestmentFocus::RentalIncome,
            },
            favored_groups: Vec::new(),
            max_price_ratio: 0.3 + risk_tolerance * 0.5,
        };

        let skills = SkillPreference {
            preferred_tags: match archetype {
                Archetype::Aggressive => vec![SkillTag::Offensive, SkillTag::Control],
                Archetype::Conservative => vec![SkillTag::Defensive],
                Archetype::Diplomat => vec![SkillTag::Social],
                Archetype::Analyst | Archetype::Opportunist => vec![SkillTag::Economic],
                Archetype::Balanced => Vec::new(),
            },
            usage_frequency: 0.3 + aggression * 0.5,
            save_for_critical: archetype == Archetype::Conservative,
        };

        let negotiation = NegotiationStyle {
            approach: match archetype {
                Archetype::Diplomat | Archetype::Conservative => NegotiationApproach::Cooperative,
                Archetype::Aggressive | Archetype::Opportunist => NegotiationApproach::Competitive,
                Archetype::Balanced | Archetype::Analyst => NegotiationApproach::Analytical,
            },
            fairness: 0.3 + cooperation * 0.6,
            bluff_tendency: (aggression * 0.5_f32).min(0.5),
        };

        Self {
            risk_tolerance,
            aggression,
            cooperation,
            adaptability,
            patience,
            property,
            skills,
            negotiation,
        }
    }

    pub fn trait_value(&self, kind: TraitKind) -> f32 {
        match kind {
            TraitKind::RiskTolerance => self.risk_tolerance,
            TraitKind::Aggression => self.aggression,
            TraitKind::Cooperation => self.cooperation,
            TraitKind::Adaptability => self.adaptability,
            TraitKind::Patience => self.patience,
        }
    }

    /// Clamp every scalar into [0, 1]
    pub fn sanitized(mut self) -> Self {
        self.risk_tolerance = unit(self.risk_tolerance);
        self.aggression = unit(self.aggression);
        self.cooperation = unit(self.cooperation);
        self.adaptability = unit(self.adaptability);
        self.patience = unit(self.patience);
        self.property.max_price_ratio = unit(self.property.max_price_ratio);
        self.skills.usage_frequency = unit(self.skills.usage_frequency);
        self.negotiation.fairness = unit(self.negotiation.fairness);
        self.negotiation.bluff_tendency = unit(self.negotiation.bluff_tendency);
        self
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let personality: Personality = toml::from_str(contents)?;
        Ok(personality.sanitized())
    }
}

/// Load a personality preset from a TOML file
pub fn load_personality(path: &Path) -> Result<Personality> {
    let contents = fs::read_to_string(path)?;
    Personality::from_toml_str(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archetypes_are_bounded() {
        for archetype in Archetype::ALL {
            let p = Personality::archetype(archetype);
            for kind in [
                TraitKind::RiskTolerance,
                TraitKind::Aggression,
                TraitKind::Cooperation,
                TraitKind::Adaptability,
                TraitKind::Patience,
            ] {
                let v = p.trait_value(kind);
                assert!((0.0..=1.0).contains(&v), "{:?} {:?} = {}", archetype, kind, v);
            }
            assert!(p.property.max_price_ratio <= 1.0);
        }
    }

    #[test]
    fn test_aggressive_archetype() {
        let p = Personality::archetype(Archetype::Aggressive);
        assert!(p.aggression > 0.7, "Aggressive should have high aggression");
        assert!(p.cooperation < 0.5, "Aggressive should have low cooperation");
    }

    #[test]
    fn test_toml_personality_is_sanitized() {
        let p = Personality::from_toml_str(
            r#"
            risk_tolerance = 1.4
            aggression = -0.2
            cooperation = 0.5
            adaptability = 0.5
            patience = 0.5
            "#,
        )
        .expect("should parse");
        assert_eq!(p.risk_tolerance, 1.0);
        assert_eq!(p.aggression, 0.0);
        assert_eq!(p.negotiation.approach, NegotiationApproach::Analytical);
    }

    #[test]
    fn test_shipped_presets_parse() {
        for archetype in Archetype::ALL {
            let path = Path::new(env!("CARGO_MANIFEST_DIR"))
                .join("data/personalities")
                .join(format!("{}.toml", archetype.name()));
            let p = load_personality(&path).expect("shipped preset should load");
            assert!((0.0..=1.0).contains(&p.aggression));
        }
    }
}
