//! Supervisor error types.

use std::path::PathBuf;

/// Errors produced while launching the agent.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("failed to spawn agent {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("agent {0} pipe was not captured")]
    MissingPipe(&'static str),
}
