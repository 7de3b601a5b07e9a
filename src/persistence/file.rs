//! JSON-file persistence: one file per opponent under a directory

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::core::error::{Result, RivalError};
use crate::core::types::PlayerId;
use crate::opponent::OpponentState;
use crate::persistence::StatePersistence;

#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    dir: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: PlayerId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

#[async_trait]
impl StatePersistence for JsonFilePersistence {
    async fn save(&self, id: PlayerId, state: &OpponentState) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(state)?;

        // Write then rename so readers never see a torn file
        let path = self.path_for(id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn load(&self, id: PlayerId) -> Result<Option<OpponentState>> {
        match tokio::fs::read(self.path_for(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RivalError::Persistence(format!(
                "failed to read state for {}: {}",
                id, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::opponent::{Difficulty, Personality};

    #[tokio::test]
    async fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFilePersistence::new(dir.path().join("opponents"));
        let id = PlayerId::new();
        let mut state = OpponentState::new(
            id,
            "Disk",
            Personality::default(),
            Difficulty::Normal,
            &EngineConfig::default(),
        );
        state.learning.record_decision("wealth_accumulation", 0.9);

        store.save(id, &state).await.expect("save");
        let loaded = store.load(id).await.expect("load").expect("present");
        assert_eq!(loaded.learning.games_played, 1);

        // Saving again replaces the file rather than appending
        state.learning.record_decision("wealth_accumulation", 0.2);
        store.save(id, &state).await.expect("save");
        let reloaded = store.load(id).await.expect("load").expect("present");
        assert_eq!(reloaded.learning.games_played, 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFilePersistence::new(dir.path());
        assert!(store.load(PlayerId::new()).await.expect("load").is_none());
    }
}
