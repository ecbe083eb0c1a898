use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::services::store::EncodedValues;

#[derive(Debug, Clone, Deserialize)]
pub struct SolveRequest {
    pub email: String,
    pub secret: String,
    pub url: String,
}

/// Everything a single agent run needs. Each run owns its own context,
/// so a later solve cannot change what an earlier run observes.
#[derive(Clone)]
pub struct SolveContext {
    pub run_id: Uuid,
    pub url: String,
    pub offset: u64,
    pub started_at: f64,
    pub encoded: EncodedValues,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Solved,
    Failed,
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub url: String,
    pub state: RunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<f64>,
}

impl RunRecord {
    pub fn running(ctx: &SolveContext) -> Self {
        Self {
            id: ctx.run_id,
            url: ctx.url.clone(),
            state: RunState::Running,
            error: None,
            started_at: ctx.started_at,
            finished_at: None,
        }
    }

    pub fn finish(&mut self, state: RunState, error: Option<String>) {
        self.state = state;
        self.error = error;
        self.finished_at = Some(unix_now());
    }

    pub fn is_running(&self) -> bool { self.state == RunState::Running }
}

/// Seconds since the epoch with sub-second precision.
pub fn unix_now() -> f64 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1e9
}
