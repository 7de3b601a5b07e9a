//! Decision orchestration
//!
//! The orchestrator owns the opponent registry, the decision and analysis
//! caches, the tree optimizer and running statistics. `decide` and
//! `decide_batch` never return an error: every failure on the decision path
//! becomes the low-confidence "end turn" fallback.

pub mod background;
pub mod cache;
pub mod stats;

use std::sync::Arc;
use std::time::Instant;

use ahash::AHashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time;
use uuid::Uuid;

use crate::core::config::{DecisionMode, EngineConfig};
use crate::core::error::{Result, RivalError};
use crate::core::types::{fingerprint, now_millis, PlayerId};
use crate::evaluator::reasoning::decision_reasoning;
use crate::evaluator::{
    DecisionContext, DecisionEvaluator, DecisionResult, DecisionSource, SituationAnalysis,
};
use crate::explain::{ExplanationRequest, Explainer};
use crate::game::{GameEvent, GameState};
use crate::opponent::{Archetype, Difficulty, OpponentState, Personality, StatePatch, StateStore};
use crate::persistence::StatePersistence;
use crate::scoring::SkillRuleTable;
use crate::tree::{TreeContext, TreeFeedback, TreeOptimizer};

pub use background::{BackgroundHandle, MaintenanceTask};
pub use cache::{AnalysisKey, DecisionKey, TtlCache};
pub use stats::OrchestratorStats;

/// How to register a new opponent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpponentConfig {
    /// Id to register under; a fresh one is generated when absent
    #[serde(default)]
    pub id: Option<PlayerId>,
    pub name: String,
    /// Explicit personality, taking precedence over `archetype`
    #[serde(default)]
    pub personality: Option<Personality>,
    #[serde(default)]
    pub archetype: Option<Archetype>,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Try the persistence collaborator before creating a fresh state
    #[serde(default)]
    pub restore: bool,
}

impl OpponentConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: PlayerId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_personality(mut self, personality: Personality) -> Self {
        self.personality = Some(personality);
        self
    }

    pub fn with_archetype(mut self, archetype: Archetype) -> Self {
        self.archetype = Some(archetype);
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn restoring(mut self) -> Self {
        self.restore = true;
        self
    }

    fn resolve_personality(&self) -> Personality {
        match (&self.personality, self.archetype) {
            (Some(personality), _) => personality.clone(),
            (None, Some(archetype)) => Personality::archetype(archetype),
            (None, None) => Personality::default(),
        }
    }
}

/// A decision plus the inputs the explainer needs afterwards
struct Computed {
    decision: DecisionResult,
    opponent: OpponentState,
    analysis: Arc<SituationAnalysis>,
}

pub struct Orchestrator {
    config: Arc<EngineConfig>,
    store: StateStore,
    evaluator: DecisionEvaluator,
    trees: Mutex<TreeOptimizer>,
    decisions: Mutex<TtlCache<DecisionKey, DecisionResult>>,
    analyses: Mutex<TtlCache<AnalysisKey, Arc<SituationAnalysis>>>,
    stats: RwLock<OrchestratorStats>,
    explainer: Option<Arc<dyn Explainer>>,
}

impl Orchestrator {
    /// Validates the config and loads the built-in skill rule table
    pub fn new(config: EngineConfig, persistence: Arc<dyn StatePersistence>) -> Result<Self> {
        Self::with_rules(config, persistence, SkillRuleTable::builtin()?)
    }

    pub fn with_rules(
        config: EngineConfig,
        persistence: Arc<dyn StatePersistence>,
        rules: SkillRuleTable,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        Ok(Self {
            store: StateStore::new(config.clone(), persistence),
            evaluator: DecisionEvaluator::new(config.clone(), Arc::new(rules)),
            trees: Mutex::new(TreeOptimizer::new(config.clone())),
            decisions: Mutex::new(TtlCache::new(config.cache_ttl(), config.cache_capacity)),
            analyses: Mutex::new(TtlCache::new(
                config.analysis_ttl(),
                config.analysis_capacity,
            )),
            stats: RwLock::new(OrchestratorStats::default()),
            explainer: None,
            config,
        })
    }

    /// Replace templated reasoning with explainer output when it answers in time
    pub fn with_explainer(mut self, explainer: Arc<dyn Explainer>) -> Self {
        self.explainer = Some(explainer);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub async fn create_opponent(&self, config: OpponentConfig) -> Result<PlayerId> {
        let id = config.id.unwrap_or_default();

        if config.restore {
            match self.store.load_state(id).await {
                Ok(_) => return Ok(id),
                Err(e) => tracing::warn!(
                    "Could not restore opponent {}, creating a fresh state: {}",
                    id,
                    e
                ),
            }
        }

        self.store
            .create_state(
                id,
                &config.name,
                config.resolve_personality(),
                config.difficulty,
            )
            .await?;
        Ok(id)
    }

    /// Save and unregister an opponent, dropping its trees and cache entries
    pub async fn remove_opponent(&self, id: PlayerId) -> Result<()> {
        self.store.remove(id).await?;
        let trees = self.trees.lock().await.remove_opponent(id);
        self.invalidate(id).await;
        tracing::info!("Removed opponent {} ({} trees dropped)", id, trees);
        Ok(())
    }

    async fn invalidate(&self, id: PlayerId) {
        self.decisions
            .lock()
            .await
            .retain_keys(|key| key.opponent != id);
        self.analyses
            .lock()
            .await
            .retain_keys(|key| key.opponent != id);
    }

    pub async fn get_state(&self, id: PlayerId) -> Result<OpponentState> {
        self.store.get_state(id).await
    }

    /// Patch mutable state; cached decisions for the opponent are dropped
    pub async fn update_state(&self, id: PlayerId, patch: StatePatch) -> Result<OpponentState> {
        let state = self.store.apply_patch(id, patch).await?;
        self.invalidate(id).await;
        Ok(state)
    }

    /// Decide the next action for one opponent
    pub async fn decide(
        &self,
        id: PlayerId,
        game: &GameState,
        context: Option<&DecisionContext>,
    ) -> DecisionResult {
        let started = Instant::now();
        let context = context.cloned().unwrap_or_default();
        let key = DecisionKey {
            opponent: id,
            game_id: game.game_id.clone(),
            turn: game.turn,
            phase: game.phase,
            context: context.cache_repr(),
        };

        self.stats.write().await.requests += 1;
        let cached = self.decisions.lock().await.get(&key, started);
        if let Some(hit) = cached {
            self.stats.write().await.cache_hits += 1;
            tracing::trace!("Decision cache hit for opponent {} turn {}", id, game.turn);
            return hit;
        }
        self.stats.write().await.cache_misses += 1;

        let timeout = self.config.decision_timeout();
        let outcome = match time::timeout(timeout, self.compute(id, game, &context)).await {
            Ok(result) => result,
            Err(_) => Err(RivalError::DecisionTimeout(timeout)),
        };

        let decision = match outcome {
            Ok(Computed {
                mut decision,
                opponent,
                analysis,
            }) => {
                // Outside the decision timeout: a slow explainer only loses
                // its text, never the decision
                if let Some(explainer) = &self.explainer {
                    self.explain(explainer.as_ref(), &opponent, &mut decision, game, &analysis)
                        .await;
                }
                self.decisions
                    .lock()
                    .await
                    .insert(key, decision.clone(), Instant::now());
                decision
            }
            Err(e) => {
                tracing::warn!("Falling back to end turn for opponent {}: {}", id, e);
                let mut stats = self.stats.write().await;
                stats.fallbacks += 1;
                if matches!(e, RivalError::DecisionTimeout(_)) {
                    stats.timeouts += 1;
                }
                DecisionResult::fallback(id, &e.to_string())
            }
        };

        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        {
            let mut stats = self.stats.write().await;
            stats.record_decision(latency_ms, decision.confidence);
            if matches!(decision.source, DecisionSource::Tree { .. }) {
                stats.tree_decisions += 1;
            }
        }

        tracing::debug!(
            "Opponent {} chose {} (confidence {:.2}, {:?}) in {:.1}ms",
            id,
            decision.action_type(),
            decision.confidence,
            decision.source,
            latency_ms
        );
        decision
    }

    /// One independent `decide` per id, run concurrently
    pub async fn decide_batch(
        self: &Arc<Self>,
        ids: &[PlayerId],
        game: &GameState,
        context: Option<&DecisionContext>,
    ) -> AHashMap<PlayerId, DecisionResult> {
        let game = Arc::new(game.clone());
        let context = context.cloned();

        let handles: Vec<(PlayerId, JoinHandle<DecisionResult>)> = ids
            .iter()
            .map(|&id| {
                let orchestrator = Arc::clone(self);
                let game = Arc::clone(&game);
                let context = context.clone();
                let handle = tokio::spawn(async move {
                    orchestrator.decide(id, &game, context.as_ref()).await
                });
                (id, handle)
            })
            .collect();

        let mut results = AHashMap::with_capacity(handles.len());
        for (id, handle) in handles {
            let decision = match handle.await {
                Ok(decision) => decision,
                Err(e) => {
                    tracing::warn!("Decision task for opponent {} failed: {}", id, e);
                    self.stats.write().await.fallbacks += 1;
                    DecisionResult::fallback(id, "decision task failed")
                }
            };
            results.insert(id, decision);
        }
        results
    }

    async fn compute(
        &self,
        id: PlayerId,
        game: &GameState,
        context: &DecisionContext,
    ) -> Result<Computed> {
        // Work on a snapshot so the opponent lock is not held across awaits
        let opponent = self.store.handle(id).await?.lock().await.clone();
        let analysis = self.analysis_for(game, id).await?;
        let mut rng = self.rng_for(id, game);

        let decision = match context.mode.unwrap_or(self.config.decision_mode) {
            DecisionMode::Evaluator => self.evaluator.make_decision(
                &opponent,
                game,
                analysis.clone(),
                context,
                &mut rng,
            )?,
            DecisionMode::Tree => {
                self.decide_with_tree(&opponent, game, analysis.clone(), context, &mut rng)
                    .await?
            }
        };

        self.apply_updates(id, game, &analysis, &decision).await;
        Ok(Computed {
            decision,
            opponent,
            analysis,
        })
    }

    async fn analysis_for(&self, game: &GameState, id: PlayerId) -> Result<Arc<SituationAnalysis>> {
        let key = AnalysisKey {
            game_id: game.game_id.clone(),
            turn: game.turn,
            phase: game.phase,
            opponent: id,
        };
        let cached = self.analyses.lock().await.get(&key, Instant::now());
        if let Some(analysis) = cached {
            return Ok(analysis);
        }

        let analysis = Arc::new(self.evaluator.analyze_situation(game, id)?);
        self.analyses
            .lock()
            .await
            .insert(key, analysis.clone(), Instant::now());
        Ok(analysis)
    }

    /// Seeded per (seed, opponent, game, turn) when a seed is configured
    fn rng_for(&self, id: PlayerId, game: &GameState) -> ChaCha8Rng {
        let seed = match self.config.rng_seed {
            Some(seed) => fingerprint(&(seed, id, game.game_id.as_str(), game.turn)),
            None => rand::random(),
        };
        ChaCha8Rng::seed_from_u64(seed)
    }

    async fn decide_with_tree(
        &self,
        opponent: &OpponentState,
        game: &GameState,
        analysis: Arc<SituationAnalysis>,
        context: &DecisionContext,
        rng: &mut ChaCha8Rng,
    ) -> Result<DecisionResult> {
        let ranked = self
            .evaluator
            .score_candidates(opponent, game, &analysis, context)?;

        let traversal = {
            let mut trees = self.trees.lock().await;
            match trees.tree_for(opponent, analysis.phase) {
                Ok(tree_id) => {
                    let ctx = TreeContext {
                        game,
                        analysis: &analysis,
                        opponent,
                    };
                    Some(trees.execute_tree(tree_id, &ctx, &ranked)?)
                }
                Err(RivalError::TreeBuildFailure(reason)) => {
                    tracing::warn!(
                        "Tree build failed for opponent {}, using evaluator: {}",
                        opponent.id,
                        reason
                    );
                    None
                }
                Err(e) => return Err(e),
            }
        };

        let Some(traversal) = traversal else {
            return Ok(self.evaluator.select_from(opponent, ranked, analysis, rng));
        };
        let Some(chosen) = traversal.action.clone() else {
            tracing::debug!(
                "Tree {} reached no leaf for opponent {}, using evaluator",
                traversal.tree_id,
                opponent.id
            );
            return Ok(self.evaluator.select_from(opponent, ranked, analysis, rng));
        };

        let reasoning = format!(
            "{} via {}",
            decision_reasoning(
                &chosen,
                &opponent.strategy,
                opponent.emotion.mood,
                traversal.confidence
            ),
            traversal.reasoning()
        );
        let alternatives = ranked
            .into_iter()
            .filter(|candidate| *candidate != chosen)
            .take(self.config.max_alternatives)
            .collect();

        Ok(DecisionResult {
            id: Uuid::new_v4(),
            opponent_id: opponent.id,
            action: chosen.action,
            confidence: traversal.confidence,
            reasoning,
            alternatives,
            analysis: Some(analysis),
            strategy: Some(opponent.strategy.clone()),
            source: DecisionSource::Tree {
                tree_id: traversal.tree_id,
                path: traversal.node_ids(),
            },
            timestamp: now_millis(),
        })
    }

    async fn explain(
        &self,
        explainer: &dyn Explainer,
        opponent: &OpponentState,
        decision: &mut DecisionResult,
        game: &GameState,
        analysis: &SituationAnalysis,
    ) {
        let timeout = self.config.explanation_timeout();
        let outcome = {
            let request = ExplanationRequest {
                opponent,
                decision: &*decision,
                game,
                analysis,
            };
            time::timeout(timeout, explainer.explain(&request)).await
        };

        match outcome {
            Ok(Ok(text)) => decision.reasoning = text,
            Ok(Err(e)) => {
                tracing::warn!("Explanation failed for opponent {}: {}", opponent.id, e);
                self.stats.write().await.explanation_failures += 1;
            }
            Err(_) => {
                tracing::warn!(
                    "Explanation for opponent {} timed out after {:?}",
                    opponent.id,
                    timeout
                );
                self.stats.write().await.explanation_failures += 1;
            }
        }
    }

    /// Emotion, memory and learning updates after a decision
    ///
    /// The decision is already made; a failure here (such as a concurrent
    /// removal) is logged and does not change it.
    async fn apply_updates(
        &self,
        id: PlayerId,
        game: &GameState,
        analysis: &SituationAnalysis,
        decision: &DecisionResult,
    ) {
        if let Err(e) = self.store.update_emotional_state(id, game, analysis).await {
            tracing::warn!("Emotion update failed for opponent {}: {}", id, e);
        }
        if let Err(e) = self.store.update_memory(id, game).await {
            tracing::warn!("Memory update failed for opponent {}: {}", id, e);
        }
        match self.store.update_learning_data(id, decision, game).await {
            // A new strategy makes cached decisions stale
            Ok(Some(_)) => self.invalidate(id).await,
            Ok(None) => {}
            Err(e) => tracing::warn!("Learning update failed for opponent {}: {}", id, e),
        }
    }

    /// Route outcome feedback to the tree that produced `decision`
    ///
    /// Returns `Ok(false)` for decisions that did not come from a tree.
    pub async fn record_feedback(
        &self,
        decision: &DecisionResult,
        success: bool,
        estimated_outcome: f32,
    ) -> Result<bool> {
        let DecisionSource::Tree { tree_id, path } = &decision.source else {
            return Ok(false);
        };
        let feedback = TreeFeedback {
            success,
            confidence: decision.confidence,
            estimated_outcome,
            path: path.clone(),
        };
        self.trees
            .lock()
            .await
            .optimize_from_feedback(*tree_id, &feedback)?;
        Ok(true)
    }

    /// Apply one game event to every registered opponent
    pub async fn process_event(&self, event: &GameEvent) -> usize {
        let mut applied = 0;
        for id in self.store.ids().await {
            match self.store.process_game_event(id, event).await {
                Ok(()) => applied += 1,
                // Removed between listing and update
                Err(RivalError::UnknownOpponent(_)) => {}
                Err(e) => tracing::warn!("Event {:?} failed for {}: {}", event.event_type, id, e),
            }
        }
        applied
    }

    /// Consume a game event feed until it closes or the orchestrator is dropped
    pub fn spawn_event_consumer(
        self: &Arc<Self>,
        mut events: mpsc::Receiver<GameEvent>,
    ) -> JoinHandle<()> {
        let orchestrator = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(orchestrator) = orchestrator.upgrade() else {
                    break;
                };
                orchestrator.process_event(&event).await;
            }
            tracing::debug!("Game event feed closed");
        })
    }

    /// Start the cache sweep, autosave and memory decay loops
    pub fn start_background(self: &Arc<Self>) -> BackgroundHandle {
        background::spawn(self)
    }

    /// Drop expired entries from both caches
    pub async fn sweep_caches(&self) -> usize {
        let now = Instant::now();
        let decisions = self.decisions.lock().await.sweep(now);
        let analyses = self.analyses.lock().await.sweep(now);
        decisions + analyses
    }

    /// Sweep expired cache entries and flush every opponent to persistence
    pub async fn cleanup(&self) -> usize {
        let removed = self.sweep_caches().await;
        let saved = self.store.save_all().await;
        tracing::info!(
            "Cleanup removed {} cache entries and saved {} opponents",
            removed,
            saved
        );
        removed
    }

    pub async fn stats(&self) -> OrchestratorStats {
        let mut stats = self.stats.read().await.clone();
        stats.active_opponents = self.store.len().await;
        stats.cached_decisions = self.decisions.lock().await.len();
        stats.cached_analyses = self.analyses.lock().await.len();
        stats.trees = self.trees.lock().await.len();
        stats
    }
}
