//! Handles to the configuration and external collaborators, built once at
//! process start and passed to the job and desk operations.

use shiftminus_core::config::ShiftConfig;
use shiftminus_core::traits::{DeadlineStore, Messenger, ShortfallStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct Services {
    pub config: Arc<ShiftConfig>,
    pub shortfalls: Arc<dyn ShortfallStore>,
    pub deadlines: Arc<dyn DeadlineStore>,
    pub messenger: Arc<dyn Messenger>,
}

impl Services {
    pub fn new(
        config: ShiftConfig,
        shortfalls: Arc<dyn ShortfallStore>,
        deadlines: Arc<dyn DeadlineStore>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            shortfalls,
            deadlines,
            messenger,
        }
    }
}
