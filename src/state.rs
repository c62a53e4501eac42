use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceResult;
use crate::storage::{self, Storage, StorageResult};
use crate::timer::{PomodoroEvent, PomodoroTimer};
use crate::types::Task;

/// State shared by every MCP session in one process: the store and the
/// single Pomodoro clock.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Mutex<Storage>>,
    pub pomodoro: Arc<Mutex<PomodoroTimer>>,
}

impl AppState {
    pub fn load(data_dir: Option<PathBuf>) -> ServiceResult<Self> {
        let mut storage = Storage::new(data_dir)?;
        storage.initialize()?;
        Self::from_storage(storage)
    }

    pub fn from_storage(storage: Storage) -> ServiceResult<Self> {
        let timer = PomodoroTimer::new(storage.preferences().pomodoro)?;
        Ok(Self {
            storage: Arc::new(Mutex::new(storage)),
            pomodoro: Arc::new(Mutex::new(timer)),
        })
    }

    /// Write the current document without holding the lock during I/O.
    pub async fn persist(&self) -> StorageResult<()> {
        let (path, data) = self.storage.lock().await.snapshot_for_save();
        Storage::save_snapshot_async(path, data).await
    }

    /// Advance the shared Pomodoro by one second. A finished focus session is
    /// recorded as a completed task and saved.
    pub async fn tick_once(&self) -> StorageResult<(PomodoroEvent, Option<Task>)> {
        let (event, work_minutes) = {
            let mut timer = self.pomodoro.lock().await;
            (timer.tick(), timer.settings().work_minutes)
        };

        let PomodoroEvent::Finished { finished, next, .. } = event else {
            return Ok((event, None));
        };
        tracing::info!(finished = ?finished, next = ?next, "pomodoro session finished");
        if finished.is_break() {
            return Ok((event, None));
        }

        let task = self
            .storage
            .lock()
            .await
            .record_pomodoro(work_minutes, storage::today());
        self.persist().await?;
        Ok((event, Some(task)))
    }

    /// Drive the Pomodoro from a one-second interval until `token` is cancelled.
    pub fn spawn_ticker(&self, token: CancellationToken) -> JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!("pomodoro ticker stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        if let Err(e) = state.tick_once().await {
                            tracing::error!(error = %e, "failed to record pomodoro session");
                        }
                    }
                }
            }
        })
    }
}
