//! Decision inputs and outputs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::config::DecisionMode;
use crate::core::types::{now_millis, PlayerId, Timestamp, TreeId};
use crate::evaluator::situation::SituationAnalysis;
use crate::game::{Action, ActionType, SkillTag};
use crate::opponent::strategy::Strategy;

/// Confidence of every fallback decision
pub const FALLBACK_CONFIDENCE: f32 = 0.1;

/// Optional caller context for one decision
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecisionContext {
    /// Overrides the configured decision mode
    #[serde(default)]
    pub mode: Option<DecisionMode>,
    /// Action types the caller does not want; ending the turn is always allowed
    #[serde(default)]
    pub excluded: BTreeSet<ActionType>,
    /// Free-form tags passed through to explanations
    #[serde(default)]
    pub hints: BTreeMap<String, String>,
}

impl DecisionContext {
    pub fn with_mode(mut self, mode: DecisionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn excluding(mut self, action_type: ActionType) -> Self {
        self.excluded.insert(action_type);
        self
    }

    pub fn hint(mut self, key: &str, value: &str) -> Self {
        self.hints.insert(key.to_string(), value.to_string());
        self
    }

    pub fn allows(&self, action_type: ActionType) -> bool {
        action_type == ActionType::EndTurn || !self.excluded.contains(&action_type)
    }

    /// Stable serialization used in cache keys
    pub fn cache_repr(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A candidate action with its score and a short reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredAction {
    pub action: Action,
    pub score: f32,
    pub reasoning: String,
    /// Skill tags when the action uses a skill
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<SkillTag>,
}

impl ScoredAction {
    pub fn new(action: Action, score: f32, reasoning: impl Into<String>) -> Self {
        Self {
            action,
            score,
            reasoning: reasoning.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<SkillTag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn action_type(&self) -> ActionType {
        self.action.action_type()
    }
}

/// Which path produced a decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DecisionSource {
    Evaluator,
    Tree { tree_id: TreeId, path: Vec<usize> },
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResult {
    pub id: Uuid,
    pub opponent_id: PlayerId,
    pub action: Action,
    pub confidence: f32,
    pub reasoning: String,
    /// Runner-up candidates, best first
    pub alternatives: Vec<ScoredAction>,
    pub analysis: Option<Arc<SituationAnalysis>>,
    pub strategy: Option<Strategy>,
    pub source: DecisionSource,
    pub timestamp: Timestamp,
}

impl DecisionResult {
    /// The guaranteed-valid "end turn" decision used on any failure
    pub fn fallback(opponent_id: PlayerId, reason: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            opponent_id,
            action: Action::end_turn(opponent_id),
            confidence: FALLBACK_CONFIDENCE,
            reasoning: crate::evaluator::reasoning::fallback_reasoning(reason),
            alternatives: Vec::new(),
            analysis: None,
            strategy: None,
            source: DecisionSource::Fallback,
            timestamp: now_millis(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == DecisionSource::Fallback
    }

    pub fn action_type(&self) -> ActionType {
        self.action.action_type()
    }
}
