use std::time::Duration;

use thiserror::Error;

use crate::core::types::{PlayerId, TreeId};

#[derive(Error, Debug)]
pub enum RivalError {
    #[error("Unknown opponent: {0}")]
    UnknownOpponent(PlayerId),

    #[error("Opponent already registered: {0}")]
    DuplicateOpponent(PlayerId),

    #[error("No candidate actions for opponent {0}")]
    NoCandidateActions(PlayerId),

    #[error("Evaluation failed: {0}")]
    EvaluationFailure(String),

    #[error("Explanation failed: {0}")]
    ExplanationFailure(String),

    #[error("Tree build failed: {0}")]
    TreeBuildFailure(String),

    #[error("Unknown decision tree: {0}")]
    UnknownTree(TreeId),

    #[error("Decision timed out after {0:?}")]
    DecisionTimeout(Duration),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rule table error: {0}")]
    RuleTable(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, RivalError>;
