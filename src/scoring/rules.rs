//! Declarative skill tag rules
//!
//! Maps each [`SkillTag`] to a personality-trait multiplier and to the
//! strategy weight that governs it. The table is parsed and validated once
//! at load time; evaluation only does lookups.

use std::fs;
use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, RivalError};
use crate::game::SkillTag;
use crate::opponent::personality::{Personality, TraitKind};
use crate::opponent::strategy::{StrategyWeights, WeightKind};

/// Rule table shipped with the crate
pub const BUILTIN_RULES: &str = include_str!("../../data/skill_rules.toml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRule {
    pub tag: SkillTag,
    #[serde(rename = "trait")]
    pub trait_kind: TraitKind,
    pub base: f32,
    pub scale: f32,
    pub weight: WeightKind,
}

impl TagRule {
    pub fn multiplier(&self, personality: &Personality) -> f32 {
        self.base + self.scale * personality.trait_value(self.trait_kind)
    }
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<TagRule>,
}

#[derive(Debug, Clone)]
pub struct SkillRuleTable {
    rules: AHashMap<SkillTag, TagRule>,
}

impl SkillRuleTable {
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_RULES)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: RuleFile =
            toml::from_str(contents).map_err(|e| RivalError::RuleTable(e.to_string()))?;
        Self::from_rules(file.rules)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Validate and index a list of rules; every skill tag needs exactly one
    pub fn from_rules(rules: Vec<TagRule>) -> Result<Self> {
        let mut table = AHashMap::new();
        for rule in rules {
            if !rule.base.is_finite() || !rule.scale.is_finite() {
                return Err(RivalError::RuleTable(format!(
                    "non-finite multiplier for {:?}",
                    rule.tag
                )));
            }
            // Multiplier is linear in the trait, so checking both ends covers [0,1]
            if rule.base < 0.0 || rule.base + rule.scale < 0.0 {
                return Err(RivalError::RuleTable(format!(
                    "negative multiplier for {:?}",
                    rule.tag
                )));
            }
            if table.contains_key(&rule.tag) {
                return Err(RivalError::RuleTable(format!(
                    "duplicate rule for {:?}",
                    rule.tag
                )));
            }
            table.insert(rule.tag, rule);
        }
        if let Some(missing) = SkillTag::ALL.iter().find(|tag| !table.contains_key(*tag)) {
            return Err(RivalError::RuleTable(format!("no rule for {:?}", missing)));
        }
        Ok(Self { rules: table })
    }

    pub fn rule(&self, tag: SkillTag) -> Option<&TagRule> {
        self.rules.get(&tag)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Product of the trait multipliers of every tag; untagged skills get 1.0
    pub fn trait_multiplier(&self, tags: &[SkillTag], personality: &Personality) -> f32 {
        tags.iter()
            .filter_map(|tag| self.rule(*tag))
            .map(|rule| rule.multiplier(personality))
            .product()
    }

    /// Mean strategy weight over the tags that have a rule
    pub fn strategy_weight(&self, tags: &[SkillTag], weights: &StrategyWeights) -> Option<f32> {
        let values: Vec<f32> = tags
            .iter()
            .filter_map(|tag| self.rule(*tag))
            .map(|rule| weights.get(rule.weight))
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f32>() / values.len() as f32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opponent::personality::Archetype;

    #[test]
    fn test_builtin_covers_every_tag() {
        let table = SkillRuleTable::builtin().expect("builtin rules");
        for tag in SkillTag::ALL {
            assert!(table.rule(tag).is_some(), "missing rule for {:?}", tag);
        }
    }

    #[test]
    fn test_missing_tag_rejected() {
        let rules: Vec<TagRule> = SkillRuleTable::builtin()
            .expect("builtin rules")
            .rules
            .into_iter()
            .map(|(_, rule)| rule)
            .filter(|rule| rule.tag != SkillTag::Movement)
            .collect();
        let result = SkillRuleTable::from_rules(rules);
        assert!(matches!(result, Err(RivalError::RuleTable(msg)) if msg.contains("Movement")));
    }

    #[test]
    fn test_aggression_scales_offensive_skills() {
        let table = SkillRuleTable::builtin().expect("builtin rules");
        let meek = Personality::archetype(Archetype::Conservative);
        let brute = Personality::archetype(Archetype::Aggressive);
        let tags = [SkillTag::Offensive];
        assert!(table.trait_multiplier(&tags, &brute) > table.trait_multiplier(&tags, &meek));
        assert_eq!(table.trait_multiplier(&[], &brute), 1.0);
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let toml = r#"
            [[rules]]
            tag = "social"
            trait = "cooperation"
            base = 1.0
            scale = 0.0
            weight = "money"

            [[rules]]
            tag = "social"
            trait = "patience"
            base = 1.0
            scale = 0.0
            weight = "money"
        "#;
        assert!(matches!(
            SkillRuleTable::from_toml_str(toml),
            Err(RivalError::RuleTable(_))
        ));
    }

    #[test]
    fn test_unknown_trait_rejected() {
        let toml = r#"
            [[rules]]
            tag = "social"
            trait = "charisma"
            base = 1.0
            scale = 0.0
            weight = "money"
        "#;
        assert!(SkillRuleTable::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_negative_multiplier_rejected() {
        let toml = r#"
            [[rules]]
            tag = "defensive"
            trait = "risk_tolerance"
            base = 0.2
            scale = -0.5
            weight = "risk_avoidance"
        "#;
        assert!(matches!(
            SkillRuleTable::from_toml_str(toml),
            Err(RivalError::RuleTable(_))
        ));
    }
}
