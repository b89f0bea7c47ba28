//! Shell configuration.
//!
//! Stored as TOML, edited by the preferences dialog and read-only here:
//! - Linux: `$XDG_CONFIG_HOME/teamradar/teamradar.toml` (or `~/.config/...`)
//! - macOS: `~/Library/Application Support/TeamRadar/teamradar.toml`
//! - Windows: `%APPDATA%/TeamRadar/teamradar.toml`
//!
//! `TEAMRADAR_CONFIG` overrides the path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use teamradar_supervisor::{Credentials, SupervisorConfig};

/// File name of the agent executable.
const AGENT_BINARY: &str = "teamradar";

/// Shell configuration.
#[derive(Clone, Deserialize)]
#[cfg_attr(test, derive(Debug))]
pub struct Config {
    /// Server URL passed to the agent.
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Agent executable. Defaults to `teamradar` next to this binary, then
    /// on `PATH`.
    #[serde(default)]
    pub agent_path: Option<PathBuf>,

    /// Connect once at startup.
    #[serde(default)]
    pub auto_connect: bool,

    /// Grace period for agent output after exit, in milliseconds.
    #[serde(default = "default_drain_grace_ms")]
    pub drain_grace_ms: u64,
}

fn default_drain_grace_ms() -> u64 {
    2000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            password: String::new(),
            agent_path: None,
            auto_connect: false,
            drain_grace_ms: default_drain_grace_ms(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.url, &self.user, &self.password)
    }

    pub fn agent_path(&self) -> PathBuf {
        self.agent_path.clone().unwrap_or_else(default_agent_path)
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            drain_grace: Duration::from_millis(self.drain_grace_ms),
            ..SupervisorConfig::new(self.agent_path())
        }
    }
}

/// The agent bundled next to the running executable, else a `PATH` lookup.
fn default_agent_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(AGENT_BINARY)))
        .filter(|candidate| candidate.is_file())
        .unwrap_or_else(|| PathBuf::from(AGENT_BINARY))
}

/// Returns the configuration file path.
pub fn config_path() -> anyhow::Result<PathBuf> {
    if let Some(path) = std::env::var_os("TEAMRADAR_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    #[cfg(target_os = "macos")]
    {
        let home = std::env::var_os("HOME").context("HOME is not set")?;
        Ok(PathBuf::from(home)
            .join("Library/Application Support/TeamRadar")
            .join("teamradar.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var_os("APPDATA").context("APPDATA is not set")?;
        Ok(PathBuf::from(appdata)
            .join("TeamRadar")
            .join("teamradar.toml"))
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        let base = match std::env::var_os("XDG_CONFIG_HOME") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => PathBuf::from(std::env::var_os("HOME").context("HOME is not set")?)
                .join(".config"),
        };
        Ok(base.join("teamradar").join("teamradar.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.url.is_empty());
        assert!(config.agent_path.is_none());
        assert!(!config.auto_connect);
        assert_eq!(config.drain_grace_ms, 2000);
        assert!(!config.credentials().is_complete());
    }

    #[test]
    fn config_full_toml() {
        let toml_str = r#"
url = "https://radar.example"
user = "alice"
password = "secret"
agent_path = "/opt/teamradar/teamradar"
auto_connect = true
drain_grace_ms = 500
"#;
        let config: Config = toml::from_str(toml_str).unwrap();

        assert_eq!(
            config.credentials(),
            Credentials::new("https://radar.example", "alice", "secret")
        );
        assert_eq!(
            config.agent_path(),
            PathBuf::from("/opt/teamradar/teamradar")
        );
        assert!(config.auto_connect);

        let sup = config.supervisor_config();
        assert_eq!(sup.program, PathBuf::from("/opt/teamradar/teamradar"));
        assert_eq!(sup.drain_grace, Duration::from_millis(500));
    }

    #[test]
    fn config_partial_toml() {
        let config: Config = toml::from_str(r#"url = "https://radar.example""#).unwrap();
        assert_eq!(config.url, "https://radar.example");
        assert_eq!(config.credentials().missing_field(), Some("user"));
        assert_eq!(config.drain_grace_ms, 2000);
    }

    #[test]
    fn default_agent_path_ends_with_binary_name() {
        let path = Config::default().agent_path();
        assert!(path.ends_with(AGENT_BINARY));
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_from(&tmp.path().join("absent.toml")).unwrap();
        assert!(config.url.is_empty());
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("teamradar.toml");
        std::fs::write(&path, "user = \"bob\"\npassword = \"pw\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.user, "bob");
        assert_eq!(config.credentials().missing_field(), Some("url"));
    }

    #[test]
    fn load_rejects_malformed_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("teamradar.toml");
        std::fs::write(&path, "url = [unterminated").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn config_path_not_empty() {
        let path = config_path().unwrap();
        assert!(path.to_string_lossy().contains("teamradar"));
    }
}
