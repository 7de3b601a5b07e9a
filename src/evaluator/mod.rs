//! Flat decision evaluator
//!
//! Enumerates candidate actions, scores them, passes them through the
//! adjustment layer and selects one with a seedable tie-break.

pub mod adjust;
pub mod candidates;
pub mod decision;
pub mod property;
pub mod reasoning;
pub mod selection;
pub mod situation;

use std::sync::Arc;

use rand::Rng;
use uuid::Uuid;

use crate::core::config::EngineConfig;
use crate::core::error::{Result, RivalError};
use crate::core::types::{now_millis, PlayerId};
use crate::game::GameState;
use crate::opponent::OpponentState;
use crate::scoring::SkillRuleTable;

pub use decision::{
    DecisionContext, DecisionResult, DecisionSource, ScoredAction, FALLBACK_CONFIDENCE,
};
pub use situation::{
    analyze_situation, EconomicMetrics, GamePhase, Opportunity, OpportunityKind,
    PlayerAssessment, SituationAnalysis, Threat, ThreatKind,
};

pub struct DecisionEvaluator {
    config: Arc<EngineConfig>,
    rules: Arc<SkillRuleTable>,
}

impl DecisionEvaluator {
    pub fn new(config: Arc<EngineConfig>, rules: Arc<SkillRuleTable>) -> Self {
        Self { config, rules }
    }

    pub fn analyze_situation(&self, game: &GameState, id: PlayerId) -> Result<SituationAnalysis> {
        analyze_situation(game, id)
    }

    /// Enumerate, score and adjust candidates, best first
    pub fn score_candidates(
        &self,
        opponent: &OpponentState,
        game: &GameState,
        analysis: &SituationAnalysis,
        context: &DecisionContext,
    ) -> Result<Vec<ScoredAction>> {
        if analysis.opponent_id != opponent.id {
            return Err(RivalError::EvaluationFailure(format!(
                "analysis for {} used to decide for {}",
                analysis.opponent_id, opponent.id
            )));
        }

        let mut candidates =
            candidates::enumerate_candidates(opponent, game, analysis, context, &self.config);
        if candidates.is_empty() {
            return Err(RivalError::NoCandidateActions(opponent.id));
        }
        adjust::adjust_scores(&mut candidates, opponent, analysis, &self.rules);
        selection::rank(&mut candidates);
        Ok(candidates)
    }

    pub fn make_decision<R: Rng + ?Sized>(
        &self,
        opponent: &OpponentState,
        game: &GameState,
        analysis: Arc<SituationAnalysis>,
        context: &DecisionContext,
        rng: &mut R,
    ) -> Result<DecisionResult> {
        let ranked = self.score_candidates(opponent, game, &analysis, context)?;
        Ok(self.select_from(opponent, ranked, analysis, rng))
    }

    /// Pick among already ranked candidates and build the result
    pub fn select_from<R: Rng + ?Sized>(
        &self,
        opponent: &OpponentState,
        mut ranked: Vec<ScoredAction>,
        analysis: Arc<SituationAnalysis>,
        rng: &mut R,
    ) -> DecisionResult {
        if ranked.is_empty() {
            return DecisionResult::fallback(opponent.id, "no candidate actions");
        }
        let adaptability = opponent.personality().adaptability;
        let chosen_index = selection::select(&ranked, adaptability, self.config.tie_margin, rng);
        let confidence = selection::confidence(&ranked, chosen_index, adaptability);

        let chosen = ranked.remove(chosen_index);
        let reasoning = reasoning::decision_reasoning(
            &chosen,
            &opponent.strategy,
            opponent.emotion.mood,
            confidence,
        );
        ranked.truncate(self.config.max_alternatives);

        DecisionResult {
            id: Uuid::new_v4(),
            opponent_id: opponent.id,
            action: chosen.action,
            confidence,
            reasoning,
            alternatives: ranked,
            analysis: Some(analysis),
            strategy: Some(opponent.strategy.clone()),
            source: DecisionSource::Evaluator,
            timestamp: now_millis(),
        }
    }
}
