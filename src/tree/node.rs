//! Decision tree nodes
//!
//! Trees are stored as an arena of nodes addressed by index. Pruning
//! detaches a child from its parent; detached nodes stay in the arena but
//! are no longer reachable from the root.

use serde::{Deserialize, Serialize};

use crate::core::types::{unit, PlayerId, Timestamp, TreeId};
use crate::evaluator::GamePhase;
use crate::game::{ActionType, SkillTag};
use crate::opponent::personality::TraitKind;
use crate::opponent::strategy::WeightKind;

pub type NodeId = usize;

/// Success estimate a fresh node starts from
pub const INITIAL_SUCCESS_EMA: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameField {
    /// Coarse game phase as a number (early 0 .. endgame 3)
    PhaseCode,
    /// Turn step as a number (awaiting roll 0 .. turn end 4)
    TurnStep,
    Round,
    OwnershipRatio,
    EconomicHealth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerField {
    Cash,
    LiquidityRatio,
    MoneyRank,
    PropertyCount,
    CompleteGroups,
    MaxThreat,
    BestOpportunity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpponentField {
    Trait(TraitKind),
    Weight(WeightKind),
    Confidence,
    Frustration,
}

/// Where a condition reads its value from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "source", content = "field", rename_all = "snake_case")]
pub enum ContextField {
    Game(GameField),
    Player(PlayerField),
    Opponent(OpponentField),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
    Always,
}

impl Operator {
    pub fn apply(&self, left: f32, right: f32) -> bool {
        const EPS: f32 = 1e-4;
        match self {
            Operator::Gt => left > right,
            Operator::Ge => left >= right,
            Operator::Lt => left < right,
            Operator::Le => left <= right,
            Operator::Eq => (left - right).abs() < EPS,
            Operator::Ne => (left - right).abs() >= EPS,
            Operator::Always => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: ContextField,
    pub operator: Operator,
    pub value: f32,
}

impl Condition {
    pub fn new(field: ContextField, operator: Operator, value: f32) -> Self {
        Self {
            field,
            operator,
            value,
        }
    }

    pub fn always() -> Self {
        Self::new(ContextField::Game(GameField::Round), Operator::Always, 0.0)
    }

    pub fn holds(&self, actual: f32) -> bool {
        self.operator.apply(actual, self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedOutcome {
    pub probability: f32,
    pub benefit: f32,
    pub risk: f32,
    /// Turns until the payoff is expected
    pub timeline: u32,
}

impl ExpectedOutcome {
    pub fn new(probability: f32, benefit: f32, risk: f32, timeline: u32) -> Self {
        Self {
            probability: unit(probability),
            benefit: unit(benefit),
            risk: unit(risk),
            timeline,
        }
    }

    /// Confidence contribution of reaching this outcome
    pub fn confidence(&self) -> f32 {
        unit(self.probability * (1.0 - self.risk * 0.5) * (0.5 + self.benefit * 0.5))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLeaf {
    pub action_type: ActionType,
    /// Restricts skill leaves to skills with this tag
    pub skill_tag: Option<SkillTag>,
    pub expected: ExpectedOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Condition(Condition),
    Leaf(ActionLeaf),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStats {
    pub visits: u32,
    pub feedback: u32,
    pub successes: u32,
    pub success_ema: f32,
}

impl Default for NodeStats {
    fn default() -> Self {
        Self {
            visits: 0,
            feedback: 0,
            successes: 0,
            success_ema: INITIAL_SUCCESS_EMA,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: NodeId,
    pub label: String,
    pub kind: NodeKind,
    pub weight: f32,
    pub priority: f32,
    /// Never pruned and never reweighted
    pub protected: bool,
    pub children: Vec<NodeId>,
    pub stats: NodeStats,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn rank(&self) -> f32 {
        self.weight * self.priority
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeMetadata {
    pub built_at: Timestamp,
    /// Personality and strategy fingerprint the tree was built from
    pub fingerprint: u64,
    pub decisions: u32,
    pub successes: u32,
    pub avg_confidence: f32,
    pub executions: u32,
    /// Decision count at the last pruning pass
    pub pruned_at: u32,
}

impl TreeMetadata {
    pub fn success_rate(&self) -> f32 {
        if self.decisions == 0 {
            return 0.0;
        }
        self.successes as f32 / self.decisions as f32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub id: TreeId,
    pub opponent_id: PlayerId,
    pub phase: GamePhase,
    pub root: NodeId,
    pub nodes: Vec<TreeNode>,
    pub metadata: TreeMetadata,
}

impl DecisionTree {
    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id)
    }

    /// Nodes reachable from the root, in depth-first order
    pub fn reachable(&self) -> Vec<NodeId> {
        let mut seen = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.node(id) {
                seen.push(id);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        seen
    }

    pub fn leaf_count(&self) -> usize {
        self.reachable()
            .into_iter()
            .filter_map(|id| self.node(id))
            .filter(|n| n.is_leaf())
            .count()
    }

    pub fn find_by_label(&self, label: &str) -> Option<&TreeNode> {
        self.reachable()
            .into_iter()
            .filter_map(|id| self.node(id))
            .find(|n| n.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operators() {
        assert!(Operator::Gt.apply(0.6, 0.5));
        assert!(!Operator::Lt.apply(0.6, 0.5));
        assert!(Operator::Eq.apply(2.0, 2.0));
        assert!(Operator::Ne.apply(1.0, 2.0));
        assert!(Operator::Always.apply(f32::NAN, 0.0));
    }

    #[test]
    fn test_expected_outcome_confidence_is_bounded() {
        let best = ExpectedOutcome::new(1.0, 1.0, 0.0, 1);
        let worst = ExpectedOutcome::new(0.0, 0.0, 1.0, 1);
        assert_eq!(best.confidence(), 1.0);
        assert_eq!(worst.confidence(), 0.0);
    }
}
