//! Decision explanations
//!
//! Explanations are best-effort: the orchestrator bounds every call with a
//! timeout and keeps the templated reasoning when the explainer fails. The
//! chosen action and its confidence never depend on this module.

pub mod llm;
pub mod template;

use async_trait::async_trait;

use crate::core::error::Result;
use crate::evaluator::{DecisionResult, SituationAnalysis};
use crate::game::GameState;
use crate::opponent::OpponentState;

pub use llm::{ApiFormat, LlmExplainer, LlmSettings};
pub use template::TemplateExplainer;

/// Everything an explainer may look at
pub struct ExplanationRequest<'a> {
    pub opponent: &'a OpponentState,
    pub decision: &'a DecisionResult,
    pub game: &'a GameState,
    pub analysis: &'a SituationAnalysis,
}

#[async_trait]
pub trait Explainer: Send + Sync {
    async fn explain(&self, request: &ExplanationRequest<'_>) -> Result<String>;
}
