use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Reported as `serverInfo.name` during the MCP handshake
    #[serde(default = "default_server_name")]
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SandboxConfig {
    /// Path to the Seatbelt launcher
    #[serde(default = "default_executable")]
    pub executable: PathBuf,
    /// Shell that interprets the command string (`<shell> -c <command>`)
    #[serde(default = "default_shell")]
    pub shell: PathBuf,
    /// Profile used when a request does not name one
    #[serde(default = "default_profile")]
    pub default_profile: String,
    /// Timeout used when a request does not set one
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: i64,
    /// Where per-execution scratch dirs are created (system temp dir if unset).
    /// Supports ${ENV_VAR} substitution
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
    /// How long to keep reading output after a timeout kill
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,
}

fn default_server_name() -> String {
    "MacOS Sandbox MCP".to_string()
}

fn default_executable() -> PathBuf {
    PathBuf::from("/usr/bin/sandbox-exec")
}

fn default_shell() -> PathBuf {
    PathBuf::from("/bin/sh")
}

fn default_profile() -> String {
    crate::sandbox::DEFAULT_PROFILE.to_string()
}

fn default_timeout_secs() -> i64 {
    30
}

fn default_kill_grace_ms() -> u64 {
    500
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            shell: default_shell(),
            default_profile: default_profile(),
            default_timeout_secs: default_timeout_secs(),
            scratch_dir: None,
            kill_grace_ms: default_kill_grace_ms(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses TOML after expanding environment variables like ${TMPDIR}
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let expanded = shellexpand::env(content)?;
        let config: Config = toml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        crate::sandbox::profiles::resolve(&self.sandbox.default_profile)?;
        if self.sandbox.default_timeout_secs <= 0 {
            anyhow::bail!(
                "sandbox.default_timeout_secs must be > 0, got {}",
                self.sandbox.default_timeout_secs
            );
        }
        Ok(())
    }
}
