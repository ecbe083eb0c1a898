use crate::services::runner::AgentRunner;
use crate::services::store::SharedStore;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub secret: Arc<str>,
    pub started_at: Instant,
    pub store: SharedStore,
    pub runner: AgentRunner,
}

impl AppState {
    pub fn new(secret: impl Into<Arc<str>>, runner: AgentRunner) -> Self {
        Self {
            secret: secret.into(),
            started_at: Instant::now(),
            store: SharedStore::new(),
            runner,
        }
    }
}
