pub mod clients { pub mod agent; }
pub mod config;
pub mod telemetry;
pub mod state;
pub mod error;
pub mod domain { pub mod solve; }
pub mod services { pub mod runner; pub mod store; }
pub mod web { pub mod router; pub mod handlers; }

use std::sync::Arc;

use crate::clients::agent::{Agent, CommandAgent, UnconfiguredAgent};
use crate::services::runner::AgentRunner;
use crate::state::AppState;

pub fn build_app(cfg: crate::config::Config) -> anyhow::Result<(axum::Router, u16)> {
    let agent: Arc<dyn Agent> = match cfg.agent_command.as_deref() {
        Some(cmd) => Arc::new(CommandAgent::new(cmd)?),
        None => {
            tracing::warn!("AGENT_COMMAND not set; solves will be recorded as failed");
            Arc::new(UnconfiguredAgent)
        }
    };
    let runner = AgentRunner::new(agent, cfg.agent_timeout());
    let state = AppState::new(cfg.secret, runner);

    Ok((crate::web::router::build_router(state), cfg.port))
}
