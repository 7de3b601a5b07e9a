//! Registry of per-opponent state
//!
//! The registry map supports concurrent reads and serialized writes; each
//! opponent's state sits behind its own lock so updates for one opponent
//! never wait on another.

use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::core::config::EngineConfig;
use crate::core::error::{Result, RivalError};
use crate::core::types::PlayerId;
use crate::evaluator::{DecisionResult, SituationAnalysis};
use crate::game::{GameEvent, GameState};
use crate::opponent::emotion::EmotionalState;
use crate::opponent::personality::Personality;
use crate::opponent::state::{Difficulty, OpponentState};
use crate::opponent::strategy::{Strategy, StrategyFocus};
use crate::persistence::StatePersistence;

pub type SharedState = Arc<Mutex<OpponentState>>;

/// Partial update of mutable opponent state
///
/// Personality is deliberately absent: it is frozen at creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatePatch {
    pub name: Option<String>,
    pub strategy: Option<Strategy>,
    pub strategy_focus: Option<StrategyFocus>,
    pub emotion: Option<EmotionalState>,
}

pub struct StateStore {
    states: RwLock<AHashMap<PlayerId, SharedState>>,
    persistence: Arc<dyn StatePersistence>,
    config: Arc<EngineConfig>,
}

impl StateStore {
    pub fn new(config: Arc<EngineConfig>, persistence: Arc<dyn StatePersistence>) -> Self {
        Self {
            states: RwLock::new(AHashMap::new()),
            persistence,
            config,
        }
    }

    /// Create and register a fresh state
    pub async fn create_state(
        &self,
        id: PlayerId,
        name: &str,
        personality: Personality,
        difficulty: Difficulty,
    ) -> Result<OpponentState> {
        let state = OpponentState::new(id, name, personality, difficulty, &self.config);
        self.insert(state.clone()).await?;
        tracing::info!(
            "Created opponent {} ({}) with {} strategy",
            name,
            id,
            state.strategy.name()
        );
        Ok(state)
    }

    /// Register an existing state
    pub async fn insert(&self, state: OpponentState) -> Result<()> {
        let mut states = self.states.write().await;
        if states.contains_key(&state.id) {
            return Err(RivalError::DuplicateOpponent(state.id));
        }
        states.insert(state.id, Arc::new(Mutex::new(state)));
        Ok(())
    }

    pub async fn handle(&self, id: PlayerId) -> Result<SharedState> {
        self.states
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RivalError::UnknownOpponent(id))
    }

    pub async fn contains(&self, id: PlayerId) -> bool {
        self.states.read().await.contains_key(&id)
    }

    pub async fn ids(&self) -> Vec<PlayerId> {
        self.states.read().await.keys().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }

    /// Clone of the current state
    pub async fn get_state(&self, id: PlayerId) -> Result<OpponentState> {
        let handle = self.handle(id).await?;
        let state = handle.lock().await;
        Ok(state.clone())
    }

    pub async fn apply_patch(&self, id: PlayerId, patch: StatePatch) -> Result<OpponentState> {
        let handle = self.handle(id).await?;
        let mut state = handle.lock().await;

        if let Some(name) = patch.name {
            state.name = name;
        }
        if let Some(strategy) = patch.strategy {
            state.strategy = strategy;
            state.strategy.risk_level = crate::core::types::unit(state.strategy.risk_level);
            state.strategy.weights = state.strategy.weights.clone().sanitized();
        }
        if let Some(focus) = patch.strategy_focus {
            state.strategy = state.strategy.with_focus(focus);
        }
        if let Some(emotion) = patch.emotion {
            state.emotion = emotion.sanitized();
        }
        state.updated_at = crate::core::types::now_millis();
        Ok(state.clone())
    }

    pub async fn update_emotional_state(
        &self,
        id: PlayerId,
        _game: &GameState,
        analysis: &SituationAnalysis,
    ) -> Result<()> {
        let handle = self.handle(id).await?;
        let mut state = handle.lock().await;
        state.update_emotional_state(analysis, &self.config);
        Ok(())
    }

    pub async fn update_memory(&self, id: PlayerId, game: &GameState) -> Result<()> {
        let handle = self.handle(id).await?;
        let mut state = handle.lock().await;
        state.update_memory(game, &self.config);
        Ok(())
    }

    /// Returns the new focus when the opponent abandoned its strategy
    pub async fn update_learning_data(
        &self,
        id: PlayerId,
        decision: &DecisionResult,
        game: &GameState,
    ) -> Result<Option<StrategyFocus>> {
        let handle = self.handle(id).await?;
        let mut state = handle.lock().await;
        let strategy_name = decision
            .strategy
            .as_ref()
            .map(|s| s.name())
            .unwrap_or_else(|| state.strategy.name());

        let switched = state.update_learning(strategy_name, decision.confidence);
        if let Some(focus) = switched {
            tracing::info!(
                "Opponent {} switched strategy to {} at turn {}",
                id,
                focus.name(),
                game.turn
            );
        }
        Ok(switched)
    }

    pub async fn process_game_event(&self, id: PlayerId, event: &GameEvent) -> Result<()> {
        let handle = self.handle(id).await?;
        let mut state = handle.lock().await;
        let turn = event.turn().unwrap_or(0);
        state.process_event(event, turn, &self.config);
        Ok(())
    }

    pub async fn save_state(&self, id: PlayerId) -> Result<()> {
        let snapshot = self.get_state(id).await?;
        self.persistence.save(id, &snapshot).await
    }

    /// Load a persisted state and register it, replacing any live state
    pub async fn load_state(&self, id: PlayerId) -> Result<OpponentState> {
        let state = self
            .persistence
            .load(id)
            .await?
            .ok_or_else(|| RivalError::Persistence(format!("no saved state for {}", id)))?;

        self.states
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(state.clone())));
        tracing::info!("Restored opponent {} from persistence", id);
        Ok(state)
    }

    /// Save then unregister; a failed save is logged and removal proceeds
    pub async fn remove(&self, id: PlayerId) -> Result<OpponentState> {
        let handle = self
            .states
            .write()
            .await
            .remove(&id)
            .ok_or(RivalError::UnknownOpponent(id))?;

        let state = handle.lock().await.clone();
        if let Err(e) = self.persistence.save(id, &state).await {
            tracing::warn!("Failed to save opponent {} on removal: {}", id, e);
        }
        Ok(state)
    }

    /// Save every registered state, returning how many saves succeeded
    pub async fn save_all(&self) -> usize {
        let handles: Vec<(PlayerId, SharedState)> = self
            .states
            .read()
            .await
            .iter()
            .map(|(id, h)| (*id, h.clone()))
            .collect();

        let mut saved = 0;
        for (id, handle) in handles {
            let snapshot = handle.lock().await.clone();
            match self.persistence.save(id, &snapshot).await {
                Ok(()) => saved += 1,
                Err(e) => tracing::warn!("Autosave failed for opponent {}: {}", id, e),
            }
        }
        saved
    }

    /// Apply periodic decay to every opponent
    pub async fn decay_all(&self) {
        let handles: Vec<SharedState> = self.states.read().await.values().cloned().collect();
        for handle in handles {
            handle.lock().await.decay(&self.config);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameEventType;
    use crate::persistence::InMemoryPersistence;

    fn store() -> (StateStore, Arc<InMemoryPersistence>) {
        let persistence = Arc::new(InMemoryPersistence::new());
        let store = StateStore::new(Arc::new(EngineConfig::default()), persistence.clone());
        (store, persistence)
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates() {
        let (store, _) = store();
        let id = PlayerId::new();
        store
            .create_state(id, "A", Personality::default(), Difficulty::Normal)
            .await
            .expect("create");
        let again = store
            .create_state(id, "A", Personality::default(), Difficulty::Normal)
            .await;
        assert!(matches!(again, Err(RivalError::DuplicateOpponent(_))));
    }

    #[tokio::test]
    async fn test_patched_emotion_is_clamped() {
        let (store, _) = store();
        let id = PlayerId::new();
        store
            .create_state(id, "A", Personality::default(), Difficulty::Normal)
            .await
            .expect("create");

        let patched = store
            .apply_patch(
                id,
                StatePatch {
                    emotion: Some(EmotionalState {
                        confidence: 5.0,
                        frustration: -3.0,
                        excitement: f32::NAN,
                        ..EmotionalState::default()
                    }),
                    ..Default::default()
                },
            )
            .await
            .expect("patch");

        assert_eq!(patched.emotion.confidence, 1.0);
        assert_eq!(patched.emotion.frustration, 0.0);
        assert_eq!(patched.emotion.excitement, 0.0);
        let stored = store.get_state(id).await.expect("state");
        assert_eq!(stored.emotion, patched.emotion);
    }

    #[tokio::test]
    async fn test_remove_saves_state() {
        let (store, persistence) = store();
        let id = PlayerId::new();
        store
            .create_state(id, "A", Personality::default(), Difficulty::Normal)
            .await
            .expect("create");

        store.remove(id).await.expect("remove");
        assert!(!store.contains(id).await);
        assert!(persistence.load(id).await.expect("load").is_some());

        let restored = store.load_state(id).await.expect("restore");
        assert_eq!(restored.name, "A");
        assert!(store.contains(id).await);
    }

    #[tokio::test]
    async fn test_events_append_memories() {
        let (store, _) = store();
        let id = PlayerId::new();
        store
            .create_state(id, "A", Personality::default(), Difficulty::Normal)
            .await
            .expect("create");

        for _ in 0..3 {
            store
                .process_game_event(id, &GameEvent::new(GameEventType::GameStart))
                .await
                .expect("event");
        }
        assert_eq!(store.get_state(id).await.expect("state").memory.events.len(), 3);
    }

    #[tokio::test]
    async fn test_patch_changes_strategy_not_personality() {
        let (store, _) = store();
        let id = PlayerId::new();
        let created = store
            .create_state(id, "A", Personality::default(), Difficulty::Normal)
            .await
            .expect("create");

        let patched = store
            .apply_patch(
                id,
                StatePatch {
                    strategy_focus: Some(StrategyFocus::RiskMinimization),
                    ..Default::default()
                },
            )
            .await
            .expect("patch");

        assert_eq!(patched.strategy.focus, StrategyFocus::RiskMinimization);
        assert_eq!(
            patched.personality().aggression,
            created.personality().aggression
        );
    }

    #[tokio::test]
    async fn test_unknown_opponent_errors() {
        let (store, _) = store();
        let result = store.get_state(PlayerId::new()).await;
        assert!(matches!(result, Err(RivalError::UnknownOpponent(_))));
    }
}
