//! Agent process supervisor.
//!
//! Owns at most one agent process. [`Supervisor::toggle`] either launches the
//! agent or asks it to stop. The OS exit is observed by a dedicated awaiter
//! task, which posts a single [`AgentExit`] back to the owner; the owner
//! passes it to [`Supervisor::handle_exit`] to finish cleanup.
//!
//! ```text
//! Idle ──toggle──▶ Launching ──spawned──▶ Running ──toggle──▶ Terminating
//!  ▲                   │                     │                    │
//!  └──── spawn error ──┘                     └──── exit event ────┴──▶ Idle
//! ```
//!
//! Every method must be called from within a tokio runtime.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SupervisorError;
use crate::pumps::{stderr_pump, stdout_pump};
use crate::sink::NotificationSink;
use crate::types::{
    AgentExit, Credentials, ExitReason, SupervisorConfig, SupervisorState, Toggle,
};

const EXIT_CHANNEL_CAPACITY: usize = 8;

/// Lifecycle owner for the agent process.
pub struct Supervisor {
    config: SupervisorConfig,
    sink: Arc<dyn NotificationSink>,
    state: State,
    /// Incremented per launch; tags exit events so stale ones are ignored.
    generation: u64,
    exit_tx: mpsc::Sender<AgentExit>,
    exit_rx: Option<mpsc::Receiver<AgentExit>>,
    state_tx: watch::Sender<SupervisorState>,
}

enum State {
    Idle,
    Launching,
    Running(AgentHandle),
    Terminating(AgentHandle),
}

impl State {
    fn observed(&self) -> SupervisorState {
        match self {
            Self::Idle => SupervisorState::Idle,
            Self::Launching => SupervisorState::Launching,
            Self::Running(_) => SupervisorState::Running,
            Self::Terminating(_) => SupervisorState::Terminating,
        }
    }
}

/// Supervisor-side view of a launched agent.
struct AgentHandle {
    generation: u64,
    pid: Option<u32>,
    /// Asks the awaiter to signal the process.
    terminate: CancellationToken,
    /// Asks the awaiter to kill the process outright.
    kill: CancellationToken,
    /// Filled by the awaiter once the process exited and its output drained.
    done: watch::Receiver<Option<AgentExit>>,
}

impl AgentHandle {
    fn exited(&self) -> Option<AgentExit> {
        *self.done.borrow()
    }
}

impl Supervisor {
    /// Creates an idle supervisor delivering notifications to `sink`.
    pub fn new(config: SupervisorConfig, sink: Arc<dyn NotificationSink>) -> Self {
        let (exit_tx, exit_rx) = mpsc::channel(EXIT_CHANNEL_CAPACITY);
        let (state_tx, _) = watch::channel(SupervisorState::Idle);

        Self {
            config,
            sink,
            state: State::Idle,
            generation: 0,
            exit_tx,
            exit_rx: Some(exit_rx),
            state_tx,
        }
    }

    /// Takes the exit event receiver. Can only be called once.
    ///
    /// Every event received here must be passed to [`handle_exit`](Self::handle_exit).
    pub fn take_exit_events(&mut self) -> Option<mpsc::Receiver<AgentExit>> {
        self.exit_rx.take()
    }

    pub fn state(&self) -> SupervisorState {
        self.state.observed()
    }

    /// Watches state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.state_tx.subscribe()
    }

    /// PID of the live agent, if any.
    pub fn pid(&self) -> Option<u32> {
        match &self.state {
            State::Running(h) | State::Terminating(h) => h.pid,
            State::Idle | State::Launching => None,
        }
    }

    /// The connect/disconnect action.
    ///
    /// When idle, launches the agent with `credentials`, or reports which
    /// credential is missing. Otherwise behaves as [`disconnect`](Self::disconnect)
    /// and `credentials` are not consulted.
    pub fn toggle(&mut self, credentials: &Credentials) -> Result<Toggle, SupervisorError> {
        match self.state {
            State::Idle => self.launch(credentials),
            _ => Ok(self.disconnect()),
        }
    }

    /// Asks the running agent to stop.
    ///
    /// Cleanup waits for the exit event unless the agent has already exited,
    /// in which case it happens here. Repeated calls while terminating are
    /// no-ops.
    pub fn disconnect(&mut self) -> Toggle {
        let terminating = matches!(self.state, State::Terminating(_));
        let Some(handle) = self.take_handle() else {
            return Toggle::NotRunning;
        };

        if let Some(exit) = handle.exited() {
            return Toggle::Stopped(self.finish(handle, exit));
        }

        if terminating {
            debug!(pid = ?handle.pid, "termination already requested");
            self.state = State::Terminating(handle);
            return Toggle::AlreadyTerminating;
        }

        info!(pid = ?handle.pid, "stopping agent");
        handle.terminate.cancel();
        self.set_state(State::Terminating(handle));
        Toggle::Terminating
    }

    /// Finishes cleanup for an exited agent.
    ///
    /// Returns `None` for events whose run was already cleaned up.
    pub fn handle_exit(&mut self, exit: AgentExit) -> Option<ExitReason> {
        let current = match &self.state {
            State::Running(h) | State::Terminating(h) => Some(h.generation),
            State::Idle | State::Launching => None,
        };
        if current != Some(exit.generation) {
            debug!(generation = exit.generation, "ignoring stale exit event");
            return None;
        }

        let handle = self.take_handle()?;
        Some(self.finish(handle, exit))
    }

    /// Stops the agent, if any, and waits for it to exit.
    ///
    /// An agent still running `kill_grace` after the termination request is
    /// killed.
    pub async fn shutdown(&mut self) -> Option<ExitReason> {
        match self.disconnect() {
            Toggle::Stopped(reason) => return Some(reason),
            Toggle::Terminating | Toggle::AlreadyTerminating => {}
            _ => return None,
        }

        let (mut done, kill, generation, pid) = match &self.state {
            State::Running(h) | State::Terminating(h) => {
                (h.done.clone(), h.kill.clone(), h.generation, h.pid)
            }
            State::Idle | State::Launching => return None,
        };

        let waited = tokio::time::timeout(self.config.kill_grace, wait_done(&mut done)).await;
        let exit = match waited {
            Ok(exit) => exit,
            Err(_) => {
                warn!(?pid, "agent still running after termination request, killing");
                kill.cancel();
                wait_done(&mut done).await
            }
        }
        .unwrap_or(AgentExit {
            generation,
            pid,
            status: None,
            requested: true,
        });

        let handle = self.take_handle()?;
        Some(self.finish(handle, exit))
    }

    fn launch(&mut self, credentials: &Credentials) -> Result<Toggle, SupervisorError> {
        if let Some(missing) = credentials.missing_field() {
            info!(missing, "credentials incomplete, agent not started");
            return Ok(Toggle::NeedsConfiguration { missing });
        }

        self.set_state(State::Launching);
        match self.spawn(credentials) {
            Ok(handle) => {
                let pid = handle.pid;
                info!(?pid, program = %self.config.program.display(), "agent started");
                self.set_state(State::Running(handle));
                Ok(Toggle::Started { pid })
            }
            Err(e) => {
                warn!(error = %e, "agent launch failed");
                self.set_state(State::Idle);
                Err(e)
            }
        }
    }

    fn spawn(&mut self, credentials: &Credentials) -> Result<AgentHandle, SupervisorError> {
        let program = &self.config.program;
        let mut child = Command::new(program)
            .args(credentials.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or(SupervisorError::MissingPipe("stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or(SupervisorError::MissingPipe("stderr"))?;
        let stdin = child.stdin.take();

        self.generation += 1;
        let generation = self.generation;
        let pid = child.id();

        let pumps_cancel = CancellationToken::new();
        let sink = Arc::clone(&self.sink);
        let stdout_cancel = pumps_cancel.clone();
        let pumps = [
            tokio::spawn(async move {
                let delivered = stdout_pump(stdout, sink, stdout_cancel).await;
                debug!(delivered, "stdout pump finished");
            }),
            tokio::spawn(stderr_pump(stderr, pumps_cancel.clone())),
        ];

        let terminate = CancellationToken::new();
        let kill = CancellationToken::new();
        let (done_tx, done_rx) = watch::channel(None);

        tokio::spawn(await_exit(Awaiter {
            child,
            stdin,
            generation,
            pid,
            terminate: terminate.clone(),
            kill: kill.clone(),
            pumps,
            pumps_cancel,
            drain_grace: self.config.drain_grace,
            done: done_tx,
            events: self.exit_tx.clone(),
        }));

        Ok(AgentHandle {
            generation,
            pid,
            terminate,
            kill,
            done: done_rx,
        })
    }

    fn take_handle(&mut self) -> Option<AgentHandle> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Running(h) | State::Terminating(h) => Some(h),
            other => {
                self.state = other;
                None
            }
        }
    }

    fn finish(&mut self, handle: AgentHandle, exit: AgentExit) -> ExitReason {
        let reason = if exit.requested {
            ExitReason::Requested
        } else {
            ExitReason::Exited {
                code: exit.status.and_then(|s| s.code()),
            }
        };

        info!(pid = ?handle.pid, ?reason, "agent stopped");
        self.set_state(State::Idle);
        reason
    }

    fn set_state(&mut self, state: State) {
        self.state = state;
        let observed = self.state.observed();
        debug!(state = %observed, "supervisor state changed");
        self.state_tx.send_replace(observed);
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let State::Running(h) | State::Terminating(h) = &self.state {
            h.terminate.cancel();
        }
    }
}

/// Everything the exit awaiter owns for one launch.
struct Awaiter {
    child: Child,
    /// Held open, never written, until the agent exits.
    stdin: Option<ChildStdin>,
    generation: u64,
    pid: Option<u32>,
    terminate: CancellationToken,
    kill: CancellationToken,
    pumps: [JoinHandle<()>; 2],
    pumps_cancel: CancellationToken,
    drain_grace: Duration,
    done: watch::Sender<Option<AgentExit>>,
    events: mpsc::Sender<AgentExit>,
}

/// Waits for the agent to exit, signalling it when asked, then drains its
/// output and posts the exit event.
async fn await_exit(mut awaiter: Awaiter) {
    let pid = awaiter.pid;
    let mut signalled = false;
    let mut killed = false;

    let status = loop {
        tokio::select! {
            status = awaiter.child.wait() => break status,
            _ = awaiter.terminate.cancelled(), if !signalled => {
                signalled = true;
                debug!(?pid, "asking agent to terminate");
                request_stop(&mut awaiter.child);
            }
            _ = awaiter.kill.cancelled(), if !killed => {
                killed = true;
                if let Err(e) = awaiter.child.start_kill() {
                    warn!(?pid, error = %e, "failed to kill agent");
                }
            }
        }
    };
    // A stop requested after the process was already gone does not count.
    let requested = awaiter.terminate.is_cancelled();

    let status = match status {
        Ok(status) => {
            info!(?pid, %status, "agent exited");
            Some(status)
        }
        Err(e) => {
            warn!(?pid, error = %e, "failed to wait for agent");
            None
        }
    };
    drop(awaiter.stdin.take());

    // A grandchild may still hold the pipes open; don't wait on it forever.
    let pumps = &mut awaiter.pumps;
    let drain = async move {
        for pump in pumps {
            let _ = pump.await;
        }
    };
    if tokio::time::timeout(awaiter.drain_grace, drain).await.is_err() {
        debug!(?pid, "agent output still open after exit, cancelling pumps");
        awaiter.pumps_cancel.cancel();
    }

    let exit = AgentExit {
        generation: awaiter.generation,
        pid,
        status,
        requested,
    };
    awaiter.done.send_replace(Some(exit));
    if let Err(e) = awaiter.events.try_send(exit) {
        debug!(?pid, error = %e, "exit event not queued");
    }
}

async fn wait_done(done: &mut watch::Receiver<Option<AgentExit>>) -> Option<AgentExit> {
    done.wait_for(Option::is_some).await.ok().and_then(|exit| *exit)
}

/// Sends SIGTERM so the agent can log out before exiting.
#[cfg(unix)]
fn request_stop(child: &mut Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    // Already reaped.
    let Some(pid) = child.id() else { return };
    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        warn!(pid, error = %e, "failed to signal agent");
    }
}

#[cfg(not(unix))]
fn request_stop(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        warn!(pid = ?child.id(), error = %e, "failed to signal agent");
    }
}
