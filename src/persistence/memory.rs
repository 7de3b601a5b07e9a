//! In-memory persistence, useful for tests and single-session games

use std::sync::Arc;

use ahash::AHashMap;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::error::Result;
use crate::core::types::PlayerId;
use crate::opponent::OpponentState;
use crate::persistence::StatePersistence;

/// Stores serialized states keyed by opponent id
#[derive(Debug, Clone, Default)]
pub struct InMemoryPersistence {
    states: Arc<RwLock<AHashMap<PlayerId, String>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.states.write().await.clear();
    }
}

#[async_trait]
impl StatePersistence for InMemoryPersistence {
    async fn save(&self, id: PlayerId, state: &OpponentState) -> Result<()> {
        // Serialized so a saved snapshot never aliases live state
        let json = serde_json::to_string(state)?;
        self.states.write().await.insert(id, json);
        Ok(())
    }

    async fn load(&self, id: PlayerId) -> Result<Option<OpponentState>> {
        let states = self.states.read().await;
        match states.get(&id) {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::opponent::{Difficulty, Personality};

    #[tokio::test]
    async fn test_save_then_load() {
        let store = InMemoryPersistence::new();
        let id = PlayerId::new();
        let state = OpponentState::new(
            id,
            "Saved",
            Personality::default(),
            Difficulty::Hard,
            &EngineConfig::default(),
        );

        store.save(id, &state).await.expect("save");
        let loaded = store.load(id).await.expect("load").expect("present");
        assert_eq!(loaded.id, id);
        assert_eq!(loaded.difficulty, Difficulty::Hard);
        assert_eq!(store.len().await, 1);

        store.clear().await;
        assert!(store.load(id).await.expect("load").is_none());
    }
}
