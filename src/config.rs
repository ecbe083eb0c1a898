use serde::Deserialize;
use std::fmt;

#[derive(Clone, Deserialize)]
pub struct Config {
    pub secret: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub agent_command: Option<String>,
    #[serde(default = "default_timeout")]
    pub agent_timeout_secs: u64,
}
fn default_port() -> u16 { 7860 }
fn default_timeout() -> u64 { 1800 }

fn parse_timeout(raw: Option<String>) -> u64 {
    raw.and_then(|v| v.trim().parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(default_timeout())
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let secret = std::env::var("SECRET")
            .map_err(|_| anyhow::anyhow!("SECRET must be set"))?;
        let email = std::env::var("EMAIL").ok();
        let port = std::env::var("PORT")
            .ok().and_then(|v| v.parse().ok()).unwrap_or(default_port());
        let agent_command = std::env::var("AGENT_COMMAND")
            .ok().filter(|v| !v.trim().is_empty());
        let agent_timeout_secs = parse_timeout(std::env::var("AGENT_TIMEOUT_SECS").ok());
        Ok(Self { secret, email, port, agent_command, agent_timeout_secs })
    }

    pub fn agent_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.agent_timeout_secs)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("secret", &"<redacted>")
            .field("email", &self.email)
            .field("port", &self.port)
            .field("agent_command", &self.agent_command)
            .field("agent_timeout_secs", &self.agent_timeout_secs)
            .finish()
    }
}
