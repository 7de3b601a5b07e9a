//! Periodic maintenance loops
//!
//! Each loop runs on its own interval and stops when the shutdown channel
//! flips to `true` or the orchestrator is dropped. Loops hold only a weak
//! reference and never take a per-opponent lock for longer than one update.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::core::config::EngineConfig;
use crate::orchestrator::Orchestrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceTask {
    /// Drop expired decision and analysis cache entries
    CacheSweep,
    /// Save every opponent through the persistence collaborator
    Autosave,
    /// Decay memories, relationships and emotion with no new input
    MemoryDecay,
}

impl MaintenanceTask {
    pub const ALL: [MaintenanceTask; 3] = [
        MaintenanceTask::CacheSweep,
        MaintenanceTask::Autosave,
        MaintenanceTask::MemoryDecay,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MaintenanceTask::CacheSweep => "cache sweep",
            MaintenanceTask::Autosave => "autosave",
            MaintenanceTask::MemoryDecay => "memory decay",
        }
    }

    /// Interval from config; zero is bumped to 1ms since `interval` rejects it
    pub fn period(&self, config: &EngineConfig) -> Duration {
        let period = match self {
            MaintenanceTask::CacheSweep => config.cache_sweep_interval(),
            MaintenanceTask::Autosave => config.autosave_interval(),
            MaintenanceTask::MemoryDecay => config.memory_decay_interval(),
        };
        period.max(Duration::from_millis(1))
    }

    async fn run_once(&self, orchestrator: &Orchestrator) {
        match self {
            MaintenanceTask::CacheSweep => {
                let removed = orchestrator.sweep_caches().await;
                tracing::trace!("Cache sweep removed {} expired entries", removed);
            }
            MaintenanceTask::Autosave => {
                let saved = orchestrator.store.save_all().await;
                tracing::debug!("Autosaved {} opponents", saved);
            }
            MaintenanceTask::MemoryDecay => {
                orchestrator.store.decay_all().await;
            }
        }
    }
}

/// Running maintenance loops
pub struct BackgroundHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl BackgroundHandle {
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Signal every loop to stop and wait for them
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!("Maintenance task ended abnormally: {}", e);
            }
        }
    }
}

pub(crate) fn spawn(orchestrator: &Arc<Orchestrator>) -> BackgroundHandle {
    let (shutdown, shutdown_rx) = watch::channel(false);
    let tasks = MaintenanceTask::ALL
        .iter()
        .map(|task| {
            let period = task.period(&orchestrator.config);
            tokio::spawn(run(
                *task,
                Arc::downgrade(orchestrator),
                period,
                shutdown_rx.clone(),
            ))
        })
        .collect();

    BackgroundHandle { shutdown, tasks }
}

async fn run(
    task: MaintenanceTask,
    orchestrator: Weak<Orchestrator>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    interval.tick().await;

    tracing::info!("Starting {} loop every {:?}", task.name(), period);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                let Some(orchestrator) = orchestrator.upgrade() else {
                    break;
                };
                task.run_once(&orchestrator).await;
            }
        }
    }

    tracing::debug!("{} loop stopped", task.name());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameEvent, GameEventType};
    use crate::orchestrator::OpponentConfig;
    use crate::persistence::{InMemoryPersistence, StatePersistence};

    fn fast_config() -> EngineConfig {
        EngineConfig {
            cache_sweep_interval_ms: 5,
            autosave_interval_ms: 5,
            memory_decay_interval_ms: 5,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_zero_interval_is_bumped() {
        let config = EngineConfig {
            autosave_interval_ms: 0,
            ..EngineConfig::default()
        };
        assert_eq!(
            MaintenanceTask::Autosave.period(&config),
            Duration::from_millis(1)
        );
    }

    #[tokio::test]
    async fn test_loops_decay_and_save_until_shutdown() {
        let persistence = Arc::new(InMemoryPersistence::new());
        let orchestrator = Arc::new(
            Orchestrator::new(fast_config(), persistence.clone()).expect("orchestrator"),
        );
        let id = orchestrator
            .create_opponent(OpponentConfig::new("Ada"))
            .await
            .expect("create");
        orchestrator
            .process_event(&GameEvent::new(GameEventType::GameStart))
            .await;

        let handle = orchestrator.start_background();
        assert_eq!(handle.task_count(), 3);
        time::sleep(Duration::from_millis(60)).await;
        handle.shutdown().await;

        let state = orchestrator.get_state(id).await.expect("state");
        assert!(state.memory.events[0].importance < 1.0);
        assert!(persistence.load(id).await.expect("load").is_some());
    }

    #[tokio::test]
    async fn test_dropped_orchestrator_ends_loops() {
        let orchestrator = Arc::new(
            Orchestrator::new(fast_config(), Arc::new(InMemoryPersistence::new()))
                .expect("orchestrator"),
        );
        let handle = orchestrator.start_background();
        drop(orchestrator);

        time::sleep(Duration::from_millis(30)).await;
        assert!(handle.tasks.iter().all(|t| t.is_finished()));
        handle.shutdown().await;
    }
}
