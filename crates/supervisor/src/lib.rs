//! TeamRadar agent supervisor.
//!
//! Launches the external agent with the user's credentials, streams its
//! stdout through the line protocol into a [`NotificationSink`], drains its
//! stderr, and tracks the process through a single connect/disconnect
//! toggle. At most one agent is live per [`Supervisor`].

mod error;
mod pumps;
mod sink;
mod supervisor;
mod types;

pub use error::SupervisorError;
pub use sink::NotificationSink;
pub use supervisor::Supervisor;
pub use types::{
    AgentExit, Credentials, ExitReason, SupervisorConfig, SupervisorState, Toggle,
};
