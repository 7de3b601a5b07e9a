//! Tree registry and feedback-driven optimization
//!
//! One tree per (opponent, game phase), built lazily. Feedback moves node
//! success averages and weights along the decision path, and periodic
//! pruning detaches branches that never fire or keep failing.

use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::config::EngineConfig;
use crate::core::error::{Result, RivalError};
use crate::core::types::{unit, PlayerId, TreeId};
use crate::evaluator::{GamePhase, ScoredAction};
use crate::opponent::OpponentState;
use crate::tree::builder::{build_personalized_tree, opponent_fingerprint};
use crate::tree::node::{DecisionTree, NodeId};
use crate::tree::traversal::{execute, OptimizedDecision, TreeContext};

/// Smoothing factor for node success averages and weights
pub const EMA_ALPHA: f32 = 0.2;
/// Visits before a failing node may be pruned
pub const MIN_VISITS_TO_JUDGE: u32 = 10;
/// Success average below which a well-visited node is pruned
pub const FAILING_EMA: f32 = 0.15;
/// Success rate below which an old tree is rebuilt
pub const REBUILD_SUCCESS_RATE: f32 = 0.3;

/// Outcome report for one tree decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeFeedback {
    pub success: bool,
    pub confidence: f32,
    /// Caller's estimate of how well the action turned out, in [0,1]
    pub estimated_outcome: f32,
    /// Nodes visited by the decision
    pub path: Vec<NodeId>,
}

impl TreeFeedback {
    /// Blend of the success flag and the estimated outcome
    pub fn outcome(&self) -> f32 {
        let flag = if self.success { 1.0 } else { 0.0 };
        0.5 * flag + 0.5 * unit(self.estimated_outcome)
    }
}

pub struct TreeOptimizer {
    config: Arc<EngineConfig>,
    trees: AHashMap<TreeId, DecisionTree>,
    index: AHashMap<(PlayerId, GamePhase), TreeId>,
}

impl TreeOptimizer {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            config,
            trees: AHashMap::new(),
            index: AHashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn tree(&self, id: TreeId) -> Option<&DecisionTree> {
        self.trees.get(&id)
    }

    /// Build a tree and register it for (opponent, phase), replacing any old one
    pub fn build_personalized_tree(
        &mut self,
        opponent: &OpponentState,
        phase: GamePhase,
    ) -> Result<TreeId> {
        let tree = build_personalized_tree(opponent, phase)?;
        let id = tree.id;
        if let Some(old) = self.index.insert((opponent.id, phase), id) {
            self.trees.remove(&old);
        }
        tracing::debug!(
            "Built {} tree {} for opponent {} ({} nodes)",
            phase.name(),
            id,
            opponent.id,
            tree.nodes.len()
        );
        self.trees.insert(id, tree);
        Ok(id)
    }

    /// Current tree for (opponent, phase), rebuilding when stale
    pub fn tree_for(&mut self, opponent: &OpponentState, phase: GamePhase) -> Result<TreeId> {
        let current = self
            .index
            .get(&(opponent.id, phase))
            .and_then(|id| self.trees.get(id))
            .map(|tree| (tree.id, self.is_stale(tree, opponent), tree.metadata.decisions));

        match current {
            Some((id, false, _)) => Ok(id),
            Some((_, true, decisions)) => {
                tracing::info!(
                    "Rebuilding {} tree for opponent {} after {} decisions",
                    phase.name(),
                    opponent.id,
                    decisions
                );
                self.build_personalized_tree(opponent, phase)
            }
            None => self.build_personalized_tree(opponent, phase),
        }
    }

    fn is_stale(&self, tree: &DecisionTree, opponent: &OpponentState) -> bool {
        if tree.metadata.fingerprint != opponent_fingerprint(opponent) {
            return true;
        }
        tree.metadata.decisions >= self.config.rebuild_after_decisions
            && tree.metadata.success_rate() < REBUILD_SUCCESS_RATE
    }

    /// Traverse a tree and record the visits
    pub fn execute_tree(
        &mut self,
        id: TreeId,
        ctx: &TreeContext<'_>,
        available: &[ScoredAction],
    ) -> Result<OptimizedDecision> {
        let tree = self.trees.get_mut(&id).ok_or(RivalError::UnknownTree(id))?;
        let decision = execute(tree, ctx, available);

        tree.metadata.executions += 1;
        for step in &decision.path {
            if let Some(node) = tree.node_mut(step.node) {
                node.stats.visits += 1;
            }
        }
        Ok(decision)
    }

    pub fn optimize_from_feedback(&mut self, id: TreeId, feedback: &TreeFeedback) -> Result<()> {
        let prune_after = self.config.prune_after_decisions;
        let tree = self.trees.get_mut(&id).ok_or(RivalError::UnknownTree(id))?;

        let meta = &mut tree.metadata;
        meta.decisions += 1;
        if feedback.success {
            meta.successes += 1;
        }
        meta.avg_confidence +=
            (unit(feedback.confidence) - meta.avg_confidence) / meta.decisions as f32;

        let outcome = feedback.outcome();
        for node_id in &feedback.path {
            let Some(node) = tree.node_mut(*node_id) else {
                continue;
            };
            node.stats.feedback += 1;
            if feedback.success {
                node.stats.successes += 1;
            }
            node.stats.success_ema =
                (1.0 - EMA_ALPHA) * node.stats.success_ema + EMA_ALPHA * outcome;
            if !node.protected {
                node.weight = unit((1.0 - EMA_ALPHA) * node.weight + EMA_ALPHA * outcome);
            }
        }

        if prune_after > 0 && tree.metadata.decisions - tree.metadata.pruned_at >= prune_after {
            let removed = prune(tree);
            tree.metadata.pruned_at = tree.metadata.decisions;
            if removed > 0 {
                tracing::debug!("Pruned {} nodes from tree {}", removed, id);
            }
        }
        Ok(())
    }

    /// Drop every tree of an opponent
    pub fn remove_opponent(&mut self, opponent: PlayerId) -> usize {
        let ids: Vec<TreeId> = self
            .index
            .iter()
            .filter(|((owner, _), _)| *owner == opponent)
            .map(|(_, id)| *id)
            .collect();
        self.index.retain(|(owner, _), _| *owner != opponent);
        for id in &ids {
            self.trees.remove(id);
        }
        ids.len()
    }
}

/// Detach unprotected children that never fired or keep failing.
/// A parent always keeps at least one child.
pub fn prune(tree: &mut DecisionTree) -> usize {
    let mut removed = 0;
    for parent_id in tree.reachable() {
        let Some(parent) = tree.node(parent_id) else {
            continue;
        };
        let doomed: Vec<NodeId> = parent
            .children
            .iter()
            .copied()
            .filter(|child_id| {
                tree.node(*child_id).map_or(false, |child| {
                    !child.protected
                        && (child.stats.visits == 0
                            || (child.stats.visits >= MIN_VISITS_TO_JUDGE
                                && child.stats.success_ema < FAILING_EMA))
                })
            })
            .collect();
        if doomed.is_empty() {
            continue;
        }

        if let Some(parent) = tree.node_mut(parent_id) {
            for child in doomed {
                if parent.children.len() <= 1 {
                    break;
                }
                parent.children.retain(|c| *c != child);
                removed += 1;
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opponent::strategy::StrategyFocus;
    use crate::opponent::{Archetype, Difficulty, Personality};

    fn opponent() -> OpponentState {
        OpponentState::new(
            PlayerId::new(),
            "Bot",
            Personality::archetype(Archetype::Aggressive),
            Difficulty::Normal,
            &EngineConfig::default(),
        )
    }

    fn optimizer(prune_after: u32) -> TreeOptimizer {
        let config = EngineConfig {
            prune_after_decisions: prune_after,
            ..EngineConfig::default()
        };
        TreeOptimizer::new(Arc::new(config))
    }

    #[test]
    fn test_tree_reused_until_fingerprint_changes() {
        let mut trees = optimizer(50);
        let mut state = opponent();
        let first = trees.tree_for(&state, GamePhase::Early).expect("tree");
        assert_eq!(trees.tree_for(&state, GamePhase::Early).expect("tree"), first);

        state.strategy = state.strategy.with_focus(StrategyFocus::RiskMinimization);
        let rebuilt = trees.tree_for(&state, GamePhase::Early).expect("tree");
        assert_ne!(rebuilt, first);
        assert_eq!(trees.len(), 1);
    }

    #[test]
    fn test_feedback_accumulates_and_reweights() {
        let mut trees = optimizer(1000);
        let state = opponent();
        let id = trees.tree_for(&state, GamePhase::Early).expect("tree");
        let branch = trees
            .tree(id)
            .and_then(|t| t.find_by_label("competitive"))
            .map(|n| (n.id, n.weight))
            .expect("competitive branch");

        let feedback = TreeFeedback {
            success: false,
            confidence: 0.4,
            estimated_outcome: 0.0,
            path: vec![0, branch.0],
        };
        trees.optimize_from_feedback(id, &feedback).expect("feedback");

        let tree = trees.tree(id).expect("tree");
        assert_eq!(tree.metadata.decisions, 1);
        assert!((tree.metadata.avg_confidence - 0.4).abs() < 1e-6);
        let node = tree.node(branch.0).expect("node");
        assert!((node.weight - branch.1 * 0.8).abs() < 1e-6);
        assert!((node.stats.success_ema - 0.4).abs() < 1e-6);
        // Root is protected
        assert_eq!(tree.node(0).map(|n| n.weight), Some(1.0));
    }

    #[test]
    fn test_unvisited_branches_are_pruned() {
        let mut trees = optimizer(2);
        let state = opponent();
        let id = trees.tree_for(&state, GamePhase::Early).expect("tree");
        let before = trees.tree(id).map(|t| t.reachable().len()).expect("tree");

        let feedback = TreeFeedback {
            success: true,
            confidence: 0.8,
            estimated_outcome: 1.0,
            path: vec![0],
        };
        trees.optimize_from_feedback(id, &feedback).expect("feedback");
        trees.optimize_from_feedback(id, &feedback).expect("feedback");

        let tree = trees.tree(id).expect("tree");
        assert!(tree.reachable().len() < before);
        assert!(tree.find_by_label("competitive").is_none());
        assert!(tree.find_by_label("roll").is_some());
        assert!(tree.find_by_label("end_turn").is_some());
    }

    #[test]
    fn test_unknown_tree() {
        let mut trees = optimizer(50);
        let feedback = TreeFeedback {
            success: true,
            confidence: 1.0,
            estimated_outcome: 1.0,
            path: vec![],
        };
        assert!(matches!(
            trees.optimize_from_feedback(TreeId::new(), &feedback),
            Err(RivalError::UnknownTree(_))
        ));
    }

    #[test]
    fn test_remove_opponent_drops_trees() {
        let mut trees = optimizer(50);
        let state = opponent();
        trees.tree_for(&state, GamePhase::Early).expect("tree");
        trees.tree_for(&state, GamePhase::Late).expect("tree");
        assert_eq!(trees.remove_opponent(state.id), 2);
        assert!(trees.is_empty());
    }
}
