//! Tree traversal against a decision context

use serde::{Deserialize, Serialize};

use crate::core::types::{unit, TreeId};
use crate::evaluator::{ScoredAction, SituationAnalysis};
use crate::game::GameState;
use crate::opponent::OpponentState;
use crate::tree::builder::turn_step_code;
use crate::tree::node::{
    ActionLeaf, ContextField, DecisionTree, GameField, NodeId, NodeKind, OpponentField,
    PlayerField,
};

pub const MIN_TREE_CONFIDENCE: f32 = 0.1;
pub const MAX_TREE_CONFIDENCE: f32 = 0.95;

/// Everything a condition may read
pub struct TreeContext<'a> {
    pub game: &'a GameState,
    pub analysis: &'a SituationAnalysis,
    pub opponent: &'a OpponentState,
}

impl TreeContext<'_> {
    pub fn value(&self, field: ContextField) -> f32 {
        let economics = &self.analysis.economics;
        match field {
            ContextField::Game(GameField::PhaseCode) => self.analysis.phase.code(),
            ContextField::Game(GameField::TurnStep) => turn_step_code(self.game.phase),
            ContextField::Game(GameField::Round) => self.game.round as f32,
            ContextField::Game(GameField::OwnershipRatio) => self.game.ownership_ratio(),
            ContextField::Game(GameField::EconomicHealth) => self.game.market.economic_health,
            ContextField::Player(PlayerField::Cash) => economics.cash as f32,
            ContextField::Player(PlayerField::LiquidityRatio) => economics.liquidity_ratio,
            ContextField::Player(PlayerField::MoneyRank) => economics.money_rank as f32,
            ContextField::Player(PlayerField::PropertyCount) => economics.property_count as f32,
            ContextField::Player(PlayerField::CompleteGroups) => economics.complete_groups as f32,
            ContextField::Player(PlayerField::MaxThreat) => self.analysis.max_threat_severity(),
            ContextField::Player(PlayerField::BestOpportunity) => self
                .analysis
                .opportunities
                .first()
                .map(|o| o.value)
                .unwrap_or(0.0),
            ContextField::Opponent(OpponentField::Trait(kind)) => {
                self.opponent.personality().trait_value(kind)
            }
            ContextField::Opponent(OpponentField::Weight(kind)) => {
                self.opponent.strategy.weights.get(kind)
            }
            ContextField::Opponent(OpponentField::Confidence) => self.opponent.emotion.confidence,
            ContextField::Opponent(OpponentField::Frustration) => {
                self.opponent.emotion.frustration
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub node: NodeId,
    pub label: String,
    pub satisfied: bool,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedDecision {
    pub tree_id: TreeId,
    /// The matched candidate, or `None` when traversal stopped before a leaf
    pub action: Option<ScoredAction>,
    pub confidence: f32,
    pub path: Vec<PathStep>,
}

impl OptimizedDecision {
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.path.iter().map(|s| s.node).collect()
    }

    pub fn reasoning(&self) -> String {
        let labels: Vec<&str> = self.path.iter().map(|s| s.label.as_str()).collect();
        format!("decision tree path {}", labels.join(" > "))
    }
}

/// Best available candidate matching a leaf
fn match_leaf<'a>(leaf: &ActionLeaf, available: &'a [ScoredAction]) -> Option<&'a ScoredAction> {
    available
        .iter()
        .filter(|c| c.action_type() == leaf.action_type)
        .filter(|c| leaf.skill_tag.map_or(true, |tag| c.tags.contains(&tag)))
        .max_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// Walk the tree from the root
///
/// Pure: the same tree, context and candidates always give the same result.
pub fn execute(
    tree: &DecisionTree,
    ctx: &TreeContext<'_>,
    available: &[ScoredAction],
) -> OptimizedDecision {
    let mut path = Vec::new();
    let mut action = None;
    let mut current = Some(tree.root);

    while let Some(id) = current.take() {
        let Some(node) = tree.node(id) else {
            break;
        };

        match &node.kind {
            NodeKind::Leaf(leaf) => {
                let matched = match_leaf(leaf, available);
                let confidence = match matched {
                    Some(c) => unit((leaf.expected.confidence() + c.score) / 2.0),
                    None => 0.0,
                };
                path.push(PathStep {
                    node: id,
                    label: node.label.clone(),
                    satisfied: matched.is_some(),
                    confidence,
                });
                action = matched.cloned();
            }
            NodeKind::Condition(condition) => {
                let satisfied = condition.holds(ctx.value(condition.field));
                path.push(PathStep {
                    node: id,
                    label: node.label.clone(),
                    satisfied,
                    confidence: if satisfied { unit(node.weight) } else { 0.0 },
                });
                if !satisfied {
                    break;
                }

                // First child wins ties so traversal stays deterministic
                let mut best: Option<(NodeId, f32)> = None;
                for child_id in &node.children {
                    let Some(child) = tree.node(*child_id) else {
                        continue;
                    };
                    let viable = match &child.kind {
                        NodeKind::Leaf(leaf) => match_leaf(leaf, available).is_some(),
                        NodeKind::Condition(c) => c.holds(ctx.value(c.field)),
                    };
                    if viable && best.map_or(true, |(_, rank)| child.rank() > rank) {
                        best = Some((*child_id, child.rank()));
                    }
                }
                current = best.map(|(child_id, _)| child_id);
            }
        }
    }

    let confidence = if path.is_empty() {
        MIN_TREE_CONFIDENCE
    } else {
        path.iter().map(|s| s.confidence).sum::<f32>() / path.len() as f32
    };

    OptimizedDecision {
        tree_id: tree.id,
        action,
        confidence: confidence.clamp(MIN_TREE_CONFIDENCE, MAX_TREE_CONFIDENCE),
        path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::core::types::PlayerId;
    use crate::evaluator::{analyze_situation, DecisionContext, DecisionEvaluator, GamePhase};
    use crate::game::{ActionType, BoardCell, PlayerSnapshot, TurnPhase};
    use crate::opponent::{Archetype, Difficulty, Personality};
    use crate::scoring::SkillRuleTable;
    use crate::tree::builder::build_personalized_tree;
    use std::sync::Arc;

    struct Fixture {
        game: GameState,
        state: OpponentState,
    }

    fn fixture(phase: TurnPhase, archetype: Archetype) -> Fixture {
        let me = PlayerId::new();
        let game = GameState::builder("g")
            .phase(phase)
            .player(PlayerSnapshot::new(me, "Me", 5000.0).at(4))
            .player(PlayerSnapshot::new(PlayerId::new(), "Rival", 5000.0))
            .cell(BoardCell::property(4, "Lot", 600.0, vec![80.0]))
            .board_len(20)
            .build();
        let state = OpponentState::new(
            me,
            "Me",
            Personality::archetype(archetype),
            Difficulty::Normal,
            &EngineConfig::default(),
        );
        Fixture { game, state }
    }

    fn run(f: &Fixture) -> OptimizedDecision {
        let analysis = analyze_situation(&f.game, f.state.id).expect("analysis");
        let evaluator = DecisionEvaluator::new(
            Arc::new(EngineConfig::default()),
            Arc::new(SkillRuleTable::builtin().expect("rules")),
        );
        let available = evaluator
            .score_candidates(&f.state, &f.game, &analysis, &DecisionContext::default())
            .expect("candidates");
        let tree = build_personalized_tree(&f.state, analysis.phase).expect("tree");
        let ctx = TreeContext {
            game: &f.game,
            analysis: &analysis,
            opponent: &f.state,
        };
        execute(&tree, &ctx, &available)
    }

    #[test]
    fn test_rolls_when_awaiting_roll() {
        let decision = run(&fixture(TurnPhase::AwaitingRoll, Archetype::Balanced));
        let action = decision.action.expect("leaf reached");
        assert_eq!(action.action_type(), ActionType::RollDice);
        assert_eq!(decision.path[0].label, "root");
    }

    #[test]
    fn test_confidence_within_tree_bounds() {
        for archetype in Archetype::ALL {
            let decision = run(&fixture(TurnPhase::PropertyDecision, archetype));
            assert!(decision.confidence >= MIN_TREE_CONFIDENCE);
            assert!(decision.confidence <= MAX_TREE_CONFIDENCE);
        }
    }

    #[test]
    fn test_phase_mismatch_stops_at_root() {
        let f = fixture(TurnPhase::AwaitingRoll, Archetype::Balanced);
        let analysis = analyze_situation(&f.game, f.state.id).expect("analysis");
        let tree = build_personalized_tree(&f.state, GamePhase::Endgame).expect("tree");
        let ctx = TreeContext {
            game: &f.game,
            analysis: &analysis,
            opponent: &f.state,
        };
        let decision = execute(&tree, &ctx, &[]);
        assert!(decision.action.is_none());
        assert_eq!(decision.path.len(), 1);
        assert!(!decision.path[0].satisfied);
        assert_eq!(decision.confidence, MIN_TREE_CONFIDENCE);
    }
}
