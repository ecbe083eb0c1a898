use std::collections::VecDeque;
use std::process::Stdio;

use anyhow::{bail, Context};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{info, warn};

use crate::domain::solve::SolveContext;

const STDERR_TAIL: usize = 512;
const STDERR_TAIL_LINES: usize = 20;

/// The component that does the actual solving for a target URL.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn run(&self, ctx: SolveContext) -> anyhow::Result<()>;
}

/// Runs an external executable as `<program> [args..] <url>`.
///
/// The child sees `url` and `offset` in its environment, so existing agent
/// scripts keep working; the server's own environment is left untouched.
/// Dropping the run future kills the child.
pub struct CommandAgent {
    program: String,
    args: Vec<String>,
}

impl CommandAgent {
    pub fn new(command_line: &str) -> anyhow::Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next().context("agent command is empty")?;
        Ok(Self { program, args: parts.collect() })
    }

    pub fn from_parts(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }
}

#[async_trait]
impl Agent for CommandAgent {
    async fn run(&self, ctx: SolveContext) -> anyhow::Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&ctx.url)
            .env("url", &ctx.url)
            .env("offset", ctx.offset.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn agent `{}`", self.program))?;

        let stdout = child.stdout.take().context("agent stdout not captured")?;
        let stderr = child.stderr.take().context("agent stderr not captured")?;
        let run_id = ctx.run_id;

        let (status, _, stderr_tail) = tokio::join!(
            child.wait(),
            forward_lines(stdout, 0, |line| info!(%run_id, "agent: {line}")),
            forward_lines(stderr, STDERR_TAIL_LINES, |line| warn!(%run_id, "agent stderr: {line}")),
        );
        let status = status.context("failed to wait for agent")?;

        if !status.success() {
            let stderr = Vec::from(stderr_tail).join("\n");
            bail!("agent exited with {}: {}", status, tail(stderr.trim(), STDERR_TAIL));
        }
        Ok(())
    }
}

/// Hands every line of `reader` to `emit` and returns the last `keep`
/// lines.
async fn forward_lines<R, F>(reader: R, keep: usize, mut emit: F) -> VecDeque<String>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut kept = VecDeque::with_capacity(keep);
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        emit(&line);
        if keep == 0 {
            continue;
        }
        if kept.len() == keep {
            kept.pop_front();
        }
        kept.push_back(line);
    }
    kept
}

/// Stand-in when no agent command is configured; every run fails loudly.
pub struct UnconfiguredAgent;

#[async_trait]
impl Agent for UnconfiguredAgent {
    async fn run(&self, _ctx: SolveContext) -> anyhow::Result<()> {
        bail!("no agent command configured (set AGENT_COMMAND)")
    }
}

fn tail(s: &str, max_chars: usize) -> &str {
    match s.char_indices().rev().nth(max_chars.saturating_sub(1)) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
