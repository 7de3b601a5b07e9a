//! Engine configuration with documented constants
//!
//! All tunables of the decision core are collected here. Values can be
//! loaded from TOML; any key left out keeps its default.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, RivalError};

/// Which decision path the orchestrator uses by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DecisionMode {
    /// Flat candidate enumeration and weighted scoring
    #[default]
    Evaluator,
    /// Personalized decision tree, falling back to the evaluator
    Tree,
}

/// Configuration for the decision engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === DECISION CACHE ===
    /// How long a cached decision stays valid (milliseconds)
    ///
    /// Repeated requests for the same opponent, turn and context inside
    /// this window return the cached decision.
    pub cache_ttl_ms: u64,

    /// Maximum number of cached decisions
    ///
    /// When full, the oldest inserted entry is evicted.
    pub cache_capacity: usize,

    /// How long a cached situation analysis stays valid (milliseconds)
    pub analysis_ttl_ms: u64,

    /// Maximum number of cached situation analyses
    pub analysis_capacity: usize,

    // === MEMORY ===
    /// Maximum number of memory events kept per opponent
    ///
    /// Oldest events are dropped first once this is reached.
    pub max_memory_events: usize,

    /// Multiplicative decay applied to every memory event per cycle
    ///
    /// At 0.95 an event of importance 1.0 falls below the 0.1 pruning
    /// floor after 45 cycles without reinforcement.
    pub memory_decay_rate: f32,

    /// Multiplicative decay applied to relationship records per cycle
    pub relationship_decay_rate: f32,

    /// Maximum number of strategic knowledge notes per opponent
    pub max_knowledge_notes: usize,

    // === EMOTION & LEARNING ===
    /// Decay factor for frustration and excitement per cycle
    pub emotion_decay: f32,

    /// Base learning rate for strategy effectiveness updates
    ///
    /// Difficulty scales this at opponent creation time.
    pub learning_rate: f32,

    // === EVALUATION ===
    /// Minimum trade-scorer value for a trade request to become a candidate
    pub trade_threshold: f32,

    /// Maximum number of trade-request candidates per decision
    pub max_trade_candidates: usize,

    /// Score margin within which candidates count as tied for the random draw
    pub tie_margin: f32,

    /// Number of alternatives attached to a decision
    pub max_alternatives: usize,

    // === TIMEOUTS ===
    /// Bound on computing a single decision (milliseconds); the explanation
    /// call runs after it under its own bound
    pub decision_timeout_ms: u64,

    /// Bound on the optional explanation call (milliseconds), kept below
    /// `decision_timeout_ms`
    pub explanation_timeout_ms: u64,

    // === BACKGROUND WORK ===
    /// Interval of the expired-entry cache sweep (milliseconds)
    pub cache_sweep_interval_ms: u64,

    /// Interval of the state autosave (milliseconds)
    pub autosave_interval_ms: u64,

    /// Interval of the memory decay sweep (milliseconds)
    pub memory_decay_interval_ms: u64,

    // === DECISION TREES ===
    /// Default decision path
    pub decision_mode: DecisionMode,

    /// Decisions a tree must have served before pruning is considered
    pub prune_after_decisions: u32,

    /// Decisions after which a poorly performing tree is rebuilt
    pub rebuild_after_decisions: u32,

    // === RANDOMNESS ===
    /// Seed for reproducible selection; entropy is used when absent
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 30_000,
            cache_capacity: 1_000,
            analysis_ttl_ms: 10_000,
            analysis_capacity: 500,

            max_memory_events: 100,
            memory_decay_rate: 0.95,
            relationship_decay_rate: 0.98,
            max_knowledge_notes: 32,

            emotion_decay: 0.9,
            learning_rate: 0.1,

            trade_threshold: 0.5,
            max_trade_candidates: 2,
            tie_margin: 0.1,
            max_alternatives: 3,

            decision_timeout_ms: 5_000,
            explanation_timeout_ms: 1_500,

            cache_sweep_interval_ms: 60_000,
            autosave_interval_ms: 300_000,
            memory_decay_interval_ms: 120_000,

            decision_mode: DecisionMode::Evaluator,
            prune_after_decisions: 50,
            rebuild_after_decisions: 200,

            rng_seed: None,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 || self.analysis_capacity == 0 {
            return Err(RivalError::Config("cache capacities must be non-zero".into()));
        }
        if self.max_memory_events == 0 {
            return Err(RivalError::Config("max_memory_events must be non-zero".into()));
        }

        for (name, rate) in [
            ("memory_decay_rate", self.memory_decay_rate),
            ("relationship_decay_rate", self.relationship_decay_rate),
            ("emotion_decay", self.emotion_decay),
        ] {
            if !(rate > 0.0 && rate <= 1.0) {
                return Err(RivalError::Config(format!(
                    "{} ({}) must be in (0, 1]",
                    name, rate
                )));
            }
        }

        for (name, value) in [
            ("learning_rate", self.learning_rate),
            ("trade_threshold", self.trade_threshold),
            ("tie_margin", self.tie_margin),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(RivalError::Config(format!(
                    "{} ({}) must be in [0, 1]",
                    name, value
                )));
            }
        }

        if self.decision_timeout_ms == 0 {
            return Err(RivalError::Config("decision_timeout_ms must be non-zero".into()));
        }
        if self.explanation_timeout_ms >= self.decision_timeout_ms {
            return Err(RivalError::Config(format!(
                "explanation_timeout_ms ({}) must be below decision_timeout_ms ({})",
                self.explanation_timeout_ms, self.decision_timeout_ms
            )));
        }

        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn analysis_ttl(&self) -> Duration {
        Duration::from_millis(self.analysis_ttl_ms)
    }

    pub fn decision_timeout(&self) -> Duration {
        Duration::from_millis(self.decision_timeout_ms)
    }

    pub fn explanation_timeout(&self) -> Duration {
        Duration::from_millis(self.explanation_timeout_ms)
    }

    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.cache_sweep_interval_ms)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_millis(self.autosave_interval_ms)
    }

    pub fn memory_decay_interval(&self) -> Duration {
        Duration::from_millis(self.memory_decay_interval_ms)
    }
}
