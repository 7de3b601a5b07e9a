//! Personality, strategy and situation adjustment layer
//!
//! Applied to every candidate after base scoring. Each stage clamps to the
//! unit interval so no combination of traits can push a score out of range.

use crate::core::types::unit;
use crate::evaluator::decision::ScoredAction;
use crate::evaluator::situation::SituationAnalysis;
use crate::game::{ActionType, SkillTag};
use crate::opponent::emotion::HIGH_THREAT;
use crate::opponent::strategy::WeightKind;
use crate::opponent::OpponentState;
use crate::scoring::SkillRuleTable;

/// Liquidity below which purchases are halved
pub const LOW_LIQUIDITY: f32 = 0.2;
const DEFENSIVE_THREAT_BOOST: f32 = 1.3;

/// Maps a strategy weight in [0,1] onto a multiplier in [0.75, 1.25]
fn weight_multiplier(weight: f32) -> f32 {
    0.75 + 0.5 * unit(weight)
}

pub fn adjust_scores(
    candidates: &mut [ScoredAction],
    opponent: &OpponentState,
    analysis: &SituationAnalysis,
    rules: &SkillRuleTable,
) {
    let personality = opponent.personality();
    let weights = &opponent.strategy.weights;

    for candidate in candidates.iter_mut() {
        let mut score = unit(candidate.score);
        match candidate.action_type() {
            ActionType::BuyProperty => {
                score = unit(score * (0.85 + 0.3 * personality.risk_tolerance));
                score = unit(score * weight_multiplier(weights.get(WeightKind::Property)));
                if analysis.economics.liquidity_ratio < LOW_LIQUIDITY {
                    score = unit(score * 0.5);
                }
            }
            ActionType::SkipPurchase => {
                score = unit(score * (0.85 + 0.3 * (1.0 - personality.risk_tolerance)));
                score = unit(score * weight_multiplier(weights.get(WeightKind::RiskAvoidance)));
            }
            ActionType::UseSkill => {
                let tags = &candidate.tags;
                score = unit(score * rules.trait_multiplier(tags, personality));
                if let Some(weight) = rules.strategy_weight(tags, weights) {
                    score = unit(score * weight_multiplier(weight));
                }
                if tags.contains(&SkillTag::Offensive) {
                    score = unit(score * opponent.emotion.mood.offensive_multiplier());
                }
                if tags.contains(&SkillTag::Defensive)
                    && analysis.max_threat_severity() > HIGH_THREAT
                {
                    score = unit(score * DEFENSIVE_THREAT_BOOST);
                }
            }
            ActionType::TradeRequest => {
                score = unit(score * (0.7 + 0.6 * personality.cooperation));
                score = unit(score * weight_multiplier(weights.get(WeightKind::Opportunism)));
            }
            ActionType::RollDice | ActionType::PayRent | ActionType::EndTurn => {}
        }
        candidate.score = score;
    }
}
