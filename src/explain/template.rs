//! Deterministic explanations built from the decision and analysis

use async_trait::async_trait;

use crate::core::error::Result;
use crate::evaluator::reasoning::mood_label;
use crate::explain::{ExplanationRequest, Explainer};

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateExplainer;

impl TemplateExplainer {
    pub fn render(request: &ExplanationRequest<'_>) -> String {
        let decision = request.decision;
        let analysis = request.analysis;
        let mut text = format!(
            "{} chooses {} in the {} game ({} mood, confidence {:.0}%).",
            request.opponent.name,
            decision.action_type(),
            analysis.phase.name(),
            mood_label(request.opponent.emotion.mood),
            decision.confidence * 100.0
        );
        if let Some(threat) = analysis.threats.first() {
            text.push_str(&format!(" Biggest worry: {}.", threat.description));
        }
        if let Some(opportunity) = analysis.opportunities.first() {
            text.push_str(&format!(" Best opening: {}.", opportunity.description));
        }
        if let Some(alternative) = decision.alternatives.first() {
            text.push_str(&format!(
                " Runner-up was {} at {:.2}.",
                alternative.action_type(),
                alternative.score
            ));
        }
        text
    }
}

#[async_trait]
impl Explainer for TemplateExplainer {
    async fn explain(&self, request: &ExplanationRequest<'_>) -> Result<String> {
        Ok(Self::render(request))
    }
}
