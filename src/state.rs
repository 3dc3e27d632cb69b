use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::engine::EngineConfig;
use crate::services::ProgressionService;
use crate::store::ProgressStore;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    progression: Arc<ProgressionService>,
}

impl AppState {
    pub fn new(progression: Arc<ProgressionService>) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            progression,
        }
    }

    pub fn from_store(store: Arc<dyn ProgressStore>, config: EngineConfig) -> Self {
        Self::new(Arc::new(ProgressionService::new(store, config)))
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn progression(&self) -> Arc<ProgressionService> {
        Arc::clone(&self.progression)
    }
}
