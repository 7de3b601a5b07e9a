//! Personalized tree construction
//!
//! The root gates on the game phase the tree was built for. Baseline
//! branches (roll, rent, property decision, end turn) are always present and
//! protected; personality branches are added when traits or the current
//! strategy cross their thresholds.

use crate::core::error::{Result, RivalError};
use crate::core::types::{fingerprint, now_millis, unit, TreeId};
use crate::evaluator::GamePhase;
use crate::game::{ActionType, SkillTag, TurnPhase};
use crate::opponent::personality::{InvestmentFocus, TraitKind};
use crate::opponent::strategy::StrategyFocus;
use crate::opponent::OpponentState;
use crate::tree::node::{
    ActionLeaf, Condition, ContextField, DecisionTree, ExpectedOutcome, GameField, NodeId,
    NodeKind, NodeStats, OpponentField, Operator, PlayerField, TreeMetadata, TreeNode,
};

pub fn turn_step_code(phase: TurnPhase) -> f32 {
    match phase {
        TurnPhase::AwaitingRoll => 0.0,
        TurnPhase::PropertyDecision => 1.0,
        TurnPhase::RentDue => 2.0,
        TurnPhase::Action => 3.0,
        TurnPhase::TurnEnd => 4.0,
    }
}

/// Fingerprint of everything a tree is built from
pub fn opponent_fingerprint(opponent: &OpponentState) -> u64 {
    let p = opponent.personality();
    let w = &opponent.strategy.weights;
    let q = |v: f32| (unit(v) * 1000.0).round() as u32;
    fingerprint(&(
        [
            q(p.risk_tolerance),
            q(p.aggression),
            q(p.cooperation),
            q(p.adaptability),
            q(p.patience),
        ],
        opponent.strategy.focus.name(),
        [
            q(w.money),
            q(w.property),
            q(w.blockade),
            q(w.risk_avoidance),
            q(w.opportunism),
        ],
    ))
}

struct TreeBuilder {
    nodes: Vec<TreeNode>,
}

impl TreeBuilder {
    fn push(&mut self, label: &str, kind: NodeKind, weight: f32, priority: f32, protected: bool) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            id,
            label: label.to_string(),
            kind,
            weight: unit(weight),
            priority: unit(priority),
            protected,
            children: Vec::new(),
            stats: NodeStats::default(),
        });
        id
    }

    fn condition(
        &mut self,
        parent: NodeId,
        label: &str,
        condition: Condition,
        weight: f32,
        priority: f32,
        protected: bool,
    ) -> NodeId {
        let id = self.push(label, NodeKind::Condition(condition), weight, priority, protected);
        self.attach(parent, id);
        id
    }

    #[allow(clippy::too_many_arguments)]
    fn leaf(
        &mut self,
        parent: NodeId,
        label: &str,
        action_type: ActionType,
        skill_tag: Option<SkillTag>,
        expected: ExpectedOutcome,
        weight: f32,
        priority: f32,
        protected: bool,
    ) -> NodeId {
        let kind = NodeKind::Leaf(ActionLeaf {
            action_type,
            skill_tag,
            expected,
        });
        let id = self.push(label, kind, weight, priority, protected);
        self.attach(parent, id);
        id
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
    }
}

fn step_is(phase: TurnPhase) -> Condition {
    Condition::new(
        ContextField::Game(GameField::TurnStep),
        Operator::Eq,
        turn_step_code(phase),
    )
}

/// Build a tree for `opponent` in `phase`
pub fn build_personalized_tree(opponent: &OpponentState, phase: GamePhase) -> Result<DecisionTree> {
    let p = opponent.personality();
    let strategy = &opponent.strategy;
    let w = &strategy.weights;
    let focus = strategy.focus;

    let mut b = TreeBuilder { nodes: Vec::new() };
    let root = b.push(
        "root",
        NodeKind::Condition(Condition::new(
            ContextField::Game(GameField::PhaseCode),
            Operator::Eq,
            phase.code(),
        )),
        1.0,
        1.0,
        true,
    );

    // Baseline branches
    let roll = b.condition(root, "roll", step_is(TurnPhase::AwaitingRoll), 1.0, 1.0, true);
    b.leaf(
        roll,
        "roll:dice",
        ActionType::RollDice,
        None,
        ExpectedOutcome::new(0.9, 0.5, 0.2, 1),
        1.0,
        1.0,
        true,
    );

    let rent = b.condition(root, "rent", step_is(TurnPhase::RentDue), 1.0, 1.0, true);
    b.leaf(
        rent,
        "rent:pay",
        ActionType::PayRent,
        None,
        ExpectedOutcome::new(1.0, 0.3, 0.1, 0),
        1.0,
        1.0,
        true,
    );

    let purchase = b.condition(
        root,
        "purchase",
        step_is(TurnPhase::PropertyDecision),
        0.5,
        0.5,
        true,
    );
    b.leaf(
        purchase,
        "purchase:buy",
        ActionType::BuyProperty,
        None,
        ExpectedOutcome::new(0.6, 0.6, 1.0 - p.risk_tolerance, 5),
        0.5 + 0.5 * p.risk_tolerance,
        0.6,
        true,
    );
    b.leaf(
        purchase,
        "purchase:skip",
        ActionType::SkipPurchase,
        None,
        ExpectedOutcome::new(0.7, 0.2, 0.1, 0),
        0.5 + 0.5 * (1.0 - p.risk_tolerance),
        0.6,
        true,
    );

    // Personality branches
    let roi_minded = matches!(
        p.property.investment_focus,
        InvestmentFocus::ReturnOnInvestment | InvestmentFocus::RentalIncome
    );
    if focus == StrategyFocus::WealthAccumulation || roi_minded {
        let economic = b.condition(
            root,
            "economic",
            Condition::new(
                ContextField::Player(PlayerField::LiquidityRatio),
                Operator::Ge,
                0.3,
            ),
            w.money,
            0.8,
            false,
        );
        b.leaf(
            economic,
            "economic:buy",
            ActionType::BuyProperty,
            None,
            ExpectedOutcome::new(0.65, 0.7, 0.3, 6),
            w.money,
            0.8,
            false,
        );
        b.leaf(
            economic,
            "economic:skill",
            ActionType::UseSkill,
            Some(SkillTag::Economic),
            ExpectedOutcome::new(0.6, 0.5, 0.2, 2),
            w.money * 0.8,
            0.6,
            false,
        );
    }

    if focus == StrategyFocus::PropertyMonopoly {
        let property = b.condition(
            root,
            "property",
            Condition::new(
                ContextField::Player(PlayerField::BestOpportunity),
                Operator::Ge,
                0.5,
            ),
            w.property,
            0.9,
            false,
        );
        b.leaf(
            property,
            "property:buy",
            ActionType::BuyProperty,
            None,
            ExpectedOutcome::new(0.6, 0.8, 0.4, 8),
            w.property,
            0.9,
            false,
        );
        b.leaf(
            property,
            "property:trade",
            ActionType::TradeRequest,
            None,
            ExpectedOutcome::new(0.4, 0.9, 0.3, 4),
            w.property * 0.9,
            0.7,
            false,
        );
    }

    if focus == StrategyFocus::OpponentElimination || p.aggression > 0.7 {
        let competitive = b.condition(
            root,
            "competitive",
            Condition::new(
                ContextField::Opponent(OpponentField::Trait(TraitKind::Aggression)),
                Operator::Gt,
                0.4,
            ),
            w.blockade.max(p.aggression),
            0.85,
            false,
        );
        b.leaf(
            competitive,
            "competitive:strike",
            ActionType::UseSkill,
            Some(SkillTag::Offensive),
            ExpectedOutcome::new(0.55, 0.7, 0.5, 2),
            p.aggression,
            0.9,
            false,
        );
        b.leaf(
            competitive,
            "competitive:block",
            ActionType::BuyProperty,
            None,
            ExpectedOutcome::new(0.5, 0.6, 0.5, 6),
            w.blockade,
            0.7,
            false,
        );
    }

    if focus == StrategyFocus::RiskMinimization || p.risk_tolerance < 0.3 {
        let defensive = b.condition(
            root,
            "defensive",
            Condition::new(
                ContextField::Player(PlayerField::MaxThreat),
                Operator::Ge,
                0.5,
            ),
            w.risk_avoidance,
            1.0,
            false,
        );
        b.leaf(
            defensive,
            "defensive:shield",
            ActionType::UseSkill,
            Some(SkillTag::Defensive),
            ExpectedOutcome::new(0.7, 0.5, 0.1, 1),
            w.risk_avoidance,
            1.0,
            false,
        );
        b.leaf(
            defensive,
            "defensive:skip",
            ActionType::SkipPurchase,
            None,
            ExpectedOutcome::new(0.8, 0.3, 0.05, 0),
            w.risk_avoidance * 0.9,
            0.8,
            false,
        );
    }

    if p.cooperation > 0.6 {
        let social = b.condition(
            root,
            "social",
            Condition::new(
                ContextField::Opponent(OpponentField::Trait(TraitKind::Cooperation)),
                Operator::Gt,
                0.6,
            ),
            p.cooperation,
            0.75,
            false,
        );
        b.leaf(
            social,
            "social:trade",
            ActionType::TradeRequest,
            None,
            ExpectedOutcome::new(0.5, 0.7, 0.2, 3),
            p.cooperation,
            0.8,
            false,
        );
        b.leaf(
            social,
            "social:skill",
            ActionType::UseSkill,
            Some(SkillTag::Social),
            ExpectedOutcome::new(0.6, 0.4, 0.1, 2),
            p.cooperation * 0.8,
            0.6,
            false,
        );
    }

    b.leaf(
        root,
        "end_turn",
        ActionType::EndTurn,
        None,
        ExpectedOutcome::new(1.0, 0.1, 0.0, 0),
        0.1,
        0.1,
        true,
    );

    let tree = DecisionTree {
        id: TreeId::new(),
        opponent_id: opponent.id,
        phase,
        root,
        nodes: b.nodes,
        metadata: TreeMetadata {
            built_at: now_millis(),
            fingerprint: opponent_fingerprint(opponent),
            decisions: 0,
            successes: 0,
            avg_confidence: 0.0,
            executions: 0,
            pruned_at: 0,
        },
    };
    validate(&tree)?;
    Ok(tree)
}

fn validate(tree: &DecisionTree) -> Result<()> {
    for node in &tree.nodes {
        if !node.weight.is_finite() || !node.priority.is_finite() {
            return Err(RivalError::TreeBuildFailure(format!(
                "node {} has a non-finite weight",
                node.label
            )));
        }
        if let NodeKind::Condition(c) = &node.kind {
            if !c.value.is_finite() {
                return Err(RivalError::TreeBuildFailure(format!(
                    "node {} compares against a non-finite value",
                    node.label
                )));
            }
            if node.children.is_empty() {
                return Err(RivalError::TreeBuildFailure(format!(
                    "condition {} has no children",
                    node.label
                )));
            }
        }
    }
    if tree.leaf_count() == 0 {
        return Err(RivalError::TreeBuildFailure("tree has no leaves".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::core::types::PlayerId;
    use crate::opponent::{Archetype, Difficulty, Personality};

    fn opponent(archetype: Archetype) -> OpponentState {
        OpponentState::new(
            PlayerId::new(),
            "Bot",
            Personality::archetype(archetype),
            Difficulty::Normal,
            &EngineConfig::default(),
        )
    }

    #[test]
    fn test_baseline_branches_always_present() {
        for archetype in Archetype::ALL {
            let tree = build_personalized_tree(&opponent(archetype), GamePhase::Mid)
                .expect("tree builds");
            for label in ["roll", "rent", "purchase", "end_turn"] {
                assert!(tree.find_by_label(label).is_some(), "{:?} lacks {}", archetype, label);
            }
        }
    }

    #[test]
    fn test_branches_follow_personality() {
        let aggressive = build_personalized_tree(&opponent(Archetype::Aggressive), GamePhase::Early)
            .expect("tree");
        assert!(aggressive.find_by_label("competitive").is_some());
        assert!(aggressive.find_by_label("social").is_none());

        let diplomat = build_personalized_tree(&opponent(Archetype::Diplomat), GamePhase::Early)
            .expect("tree");
        assert!(diplomat.find_by_label("social").is_some());

        let conservative =
            build_personalized_tree(&opponent(Archetype::Conservative), GamePhase::Early)
                .expect("tree");
        assert!(conservative.find_by_label("defensive").is_some());
    }

    #[test]
    fn test_fingerprint_tracks_strategy() {
        let mut state = opponent(Archetype::Balanced);
        let before = opponent_fingerprint(&state);
        state.strategy = state.strategy.with_focus(StrategyFocus::PropertyMonopoly);
        assert_ne!(before, opponent_fingerprint(&state));
    }
}
