//! Persistence collaborator for opponent state
//!
//! Saving happens on opponent removal, on orchestrator cleanup and on the
//! autosave interval. Failures are reported to the caller, which logs them.

mod file;
mod memory;

use async_trait::async_trait;

use crate::core::error::Result;
use crate::core::types::PlayerId;
use crate::opponent::OpponentState;

pub use file::JsonFilePersistence;
pub use memory::InMemoryPersistence;

#[async_trait]
pub trait StatePersistence: Send + Sync {
    async fn save(&self, id: PlayerId, state: &OpponentState) -> Result<()>;

    /// `Ok(None)` when nothing has been saved for `id`
    async fn load(&self, id: PlayerId) -> Result<Option<OpponentState>>;
}
