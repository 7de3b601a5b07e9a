//! Personalized decision trees: an alternate decision path to the evaluator

pub mod builder;
pub mod node;
pub mod optimizer;
pub mod traversal;

pub use builder::{build_personalized_tree, opponent_fingerprint};
pub use node::{
    ActionLeaf, Condition, ContextField, DecisionTree, ExpectedOutcome, NodeId, NodeKind,
    Operator, TreeMetadata, TreeNode,
};
pub use optimizer::{TreeFeedback, TreeOptimizer};
pub use traversal::{execute, OptimizedDecision, PathStep, TreeContext};
