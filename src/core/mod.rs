pub mod config;
pub mod error;
pub mod types;

pub use config::{DecisionMode, EngineConfig};
pub use error::{Result, RivalError};
pub use types::{now_millis, PlayerId, Timestamp, TreeId};
