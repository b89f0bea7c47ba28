//! Public types for the agent supervisor.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

/// Connection settings passed to the agent as positional arguments.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub url: String,
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(
        url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    /// Name of the first empty field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.url.is_empty() {
            Some("url")
        } else if self.user.is_empty() {
            Some("user")
        } else if self.password.is_empty() {
            Some("password")
        } else {
            None
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing_field().is_none()
    }

    /// Launch arguments, in the order the agent expects them.
    pub(crate) fn args(&self) -> [&str; 3] {
        [&self.url, &self.user, &self.password]
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Observable supervisor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// No agent process.
    Idle,
    /// Spawn in progress.
    Launching,
    /// Agent running, streams attached.
    Running,
    /// Termination requested, waiting for the process to exit.
    Terminating,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Launching => "launching",
            Self::Running => "running",
            Self::Terminating => "terminating",
        };
        f.write_str(s)
    }
}

/// Result of a connect/disconnect request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    /// Agent launched.
    Started { pid: Option<u32> },
    /// A credential is empty; the caller should show the settings.
    NeedsConfiguration { missing: &'static str },
    /// Termination signalled; cleanup follows the exit event.
    Terminating,
    /// Termination was already signalled; nothing changed.
    AlreadyTerminating,
    /// The agent had already exited; cleanup ran on this request.
    Stopped(ExitReason),
    /// Nothing to disconnect.
    NotRunning,
}

/// How an agent run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// A disconnect was requested for this run.
    Requested,
    /// The agent exited on its own.
    Exited { code: Option<i32> },
}

/// Termination event posted by the exit awaiter, once per launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentExit {
    pub(crate) generation: u64,
    pub pid: Option<u32>,
    pub status: Option<ExitStatus>,
    /// Termination was requested before the process was seen to exit.
    pub(crate) requested: bool,
}

/// Supervisor configuration.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Agent executable.
    pub program: PathBuf,
    /// How long to wait for the output pumps to reach EOF after the agent
    /// exits before cancelling them.
    pub drain_grace: Duration,
    /// How long [`shutdown`](crate::Supervisor::shutdown) waits after the
    /// termination request before killing the agent.
    pub kill_grace: Duration,
}

impl SupervisorConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            drain_grace: Duration::from_secs(2),
            kill_grace: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_order() {
        assert_eq!(Credentials::default().missing_field(), Some("url"));
        assert_eq!(
            Credentials::new("https://x", "", "").missing_field(),
            Some("user")
        );
        assert_eq!(
            Credentials::new("https://x", "me", "").missing_field(),
            Some("password")
        );
        assert!(Credentials::new("https://x", "me", "pw").is_complete());
    }

    #[test]
    fn args_order() {
        let creds = Credentials::new("u", "n", "p");
        assert_eq!(creds.args(), ["u", "n", "p"]);
    }

    #[test]
    fn debug_redacts_password() {
        let creds = Credentials::new("https://x", "me", "hunter2");
        let out = format!("{creds:?}");
        assert!(out.contains("me"));
        assert!(!out.contains("hunter2"));
    }

    #[test]
    fn state_display() {
        assert_eq!(SupervisorState::Idle.to_string(), "idle");
        assert_eq!(SupervisorState::Terminating.to_string(), "terminating");
    }

    #[test]
    fn default_drain_grace() {
        let config = SupervisorConfig::new("/usr/bin/teamradar");
        assert_eq!(config.drain_grace, Duration::from_secs(2));
        assert_eq!(config.kill_grace, Duration::from_secs(5));
    }
}
