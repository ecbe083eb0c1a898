use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::clients::agent::Agent;
use crate::domain::solve::{unix_now, RunRecord, RunState, SolveContext};
use crate::services::store::SharedStore;

pub const MAX_RUN_HISTORY: usize = 20;

/// A run's record, shared with the task executing it so the outcome can be
/// written without going through the runner's lock.
type SharedRecord = Arc<StdMutex<RunRecord>>;

fn lock(record: &SharedRecord) -> MutexGuard<'_, RunRecord> {
    record.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct Slot {
    /// Oldest first; the back entry is the current run.
    runs: VecDeque<SharedRecord>,
    handle: Option<JoinHandle<()>>,
}

impl Slot {
    fn push(&mut self, record: SharedRecord) {
        self.runs.push_back(record);
        while self.runs.len() > MAX_RUN_HISTORY {
            self.runs.pop_front();
        }
    }
}

/// Runs at most one agent at a time. Starting a new solve cancels the
/// one in flight before the store is reset.
#[derive(Clone)]
pub struct AgentRunner {
    agent: Arc<dyn Agent>,
    timeout: Duration,
    slot: Arc<Mutex<Slot>>,
}

impl AgentRunner {
    pub fn new(agent: Arc<dyn Agent>, timeout: Duration) -> Self {
        Self { agent, timeout, slot: Arc::new(Mutex::new(Slot::default())) }
    }

    /// Resets `store` for `url` and schedules the agent. Returns as soon as
    /// the task is spawned.
    pub async fn start(&self, store: &SharedStore, url: &str) -> RunRecord {
        let mut slot = self.slot.lock().await;

        if let Some(handle) = slot.handle.take() {
            // The task records its own outcome with no await in between, so
            // once it has stopped the record is either final or still running
            // because the abort landed first.
            handle.abort();
            let _ = handle.await;
            if let Some(prev) = slot.runs.back() {
                let mut prev = lock(prev);
                if prev.is_running() {
                    prev.finish(RunState::Cancelled, Some("superseded by a newer solve".into()));
                    warn!(run_id = %prev.id, url = %prev.url, "cancelled in-flight run");
                }
            }
        }

        let now = unix_now();
        let encoded = store.reset(url, now).await;
        let ctx = SolveContext {
            run_id: Uuid::new_v4(),
            url: url.to_string(),
            offset: 0,
            started_at: now,
            encoded,
        };
        let record = RunRecord::running(&ctx);
        let shared = Arc::new(StdMutex::new(record.clone()));
        slot.push(shared.clone());
        slot.handle = Some(tokio::spawn(execute(self.agent.clone(), shared, self.timeout, ctx)));
        record
    }

    pub async fn current(&self) -> Option<RunRecord> {
        self.slot.lock().await.runs.back().map(|r| lock(r).clone())
    }

    /// Recent runs, newest first.
    pub async fn history(&self) -> Vec<RunRecord> {
        self.slot.lock().await.runs.iter().rev().map(|r| lock(r).clone()).collect()
    }
}

async fn execute(agent: Arc<dyn Agent>, record: SharedRecord, timeout: Duration, ctx: SolveContext) {
    let run_id = ctx.run_id;
    let url = ctx.url.clone();

    let run = AssertUnwindSafe(agent.run(ctx)).catch_unwind();
    let (state, err) = match tokio::time::timeout(timeout, run).await {
        Ok(Ok(Ok(()))) => (RunState::Solved, None),
        Ok(Ok(Err(e))) => (RunState::Failed, Some(format!("{e:#}"))),
        Ok(Err(_)) => (RunState::Failed, Some("agent panicked".to_string())),
        Err(_) => (
            RunState::TimedOut,
            Some(format!("agent did not finish within {}ms", timeout.as_millis())),
        ),
    };

    match &err {
        None => info!(%run_id, %url, "solve finished"),
        Some(e) => error!(%run_id, %url, state = ?state, error = %e, "solve did not complete"),
    }

    let mut record = lock(&record);
    if record.is_running() {
        record.finish(state, err);
    }
}
