//! Application orchestrator: wires configuration, supervisor and tray.
//!
//! Tray clicks, agent exit events and Ctrl-C are all handled on one task,
//! so supervisor state never needs locking.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use teamradar_supervisor::{
    AgentExit, Credentials, ExitReason, NotificationSink, Supervisor, SupervisorState, Toggle,
};
use teamradar_tray::{ConnectionStatus, TrayConfig, TrayEvent, TrayHandle};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::console;

/// Runs the shell until quit is requested.
pub async fn run(config: Config, config_path: PathBuf) -> anyhow::Result<()> {
    let (tray, event_tx, update_rx) = TrayHandle::new(TrayConfig::default());
    let title = tray.state().title.clone();
    console::spawn(title, update_rx, event_tx).context("failed to start console tray")?;

    let mut shell = Shell::new(&config, config_path, tray);
    let exits = shell
        .supervisor
        .take_exit_events()
        .context("exit events already taken")?;

    if config.auto_connect {
        shell.toggle();
    }

    info!("TeamRadar ready");
    shell.run(exits).await;
    Ok(())
}

/// Connect/disconnect logic between the tray and the supervisor.
struct Shell {
    supervisor: Supervisor,
    tray: TrayHandle,
    config_path: PathBuf,
}

impl Shell {
    fn new(config: &Config, config_path: PathBuf, tray: TrayHandle) -> Self {
        let notifier = tray.notifier();
        let sink: Arc<dyn NotificationSink> = Arc::new(move |content: &str| {
            info!(content, "agent notification");
            notifier.show(content);
        });

        Self {
            supervisor: Supervisor::new(config.supervisor_config(), sink),
            tray,
            config_path,
        }
    }

    /// Serves tray and exit events until quit, the tray going away, or
    /// Ctrl-C, then stops the agent.
    async fn run(&mut self, mut exits: mpsc::Receiver<AgentExit>) {
        loop {
            tokio::select! {
                Some(exit) = exits.recv() => self.on_exit(exit),
                event = self.tray.recv_event() => match event {
                    Some(TrayEvent::ToggleConnection) => self.toggle(),
                    Some(TrayEvent::OpenPreferences) => self.tray.show_preferences(None),
                    Some(TrayEvent::QuitRequested) => {
                        info!("quit requested via tray");
                        break;
                    }
                    None => {
                        info!("tray closed, shutting down");
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("SIGINT received, shutting down");
                    break;
                }
            }
        }

        self.shutdown().await;
    }

    /// Handles a click on the connect/disconnect item.
    fn toggle(&mut self) {
        // Settings are read fresh for every connect attempt.
        let credentials = if self.supervisor.state() == SupervisorState::Idle {
            self.load_credentials()
        } else {
            Credentials::default()
        };

        match self.supervisor.toggle(&credentials) {
            Ok(Toggle::Started { pid }) => {
                info!(?pid, "connected");
                self.tray.set_status(ConnectionStatus::Connected);
            }
            Ok(Toggle::NeedsConfiguration { missing }) => {
                self.tray.set_status(ConnectionStatus::Disconnected);
                self.tray.show_preferences(Some(missing));
            }
            Ok(Toggle::Terminating | Toggle::AlreadyTerminating) => {
                self.tray.set_status(ConnectionStatus::Disconnecting);
            }
            Ok(Toggle::Stopped(reason)) => self.on_stopped(reason),
            Ok(Toggle::NotRunning) => self.tray.set_status(ConnectionStatus::Disconnected),
            Err(e) => {
                error!(error = %e, "failed to start agent");
                self.tray.set_status(ConnectionStatus::Disconnected);
            }
        }
    }

    fn on_exit(&mut self, exit: AgentExit) {
        if let Some(reason) = self.supervisor.handle_exit(exit) {
            self.on_stopped(reason);
        }
    }

    fn on_stopped(&mut self, reason: ExitReason) {
        match reason {
            ExitReason::Requested => {
                info!("disconnected");
                self.tray.set_status(ConnectionStatus::Disconnected);
            }
            ExitReason::Exited { code } => {
                warn!(?code, "agent exited unexpectedly");
                self.tray.set_status(ConnectionStatus::Exited);
            }
        }
    }

    fn load_credentials(&self) -> Credentials {
        match Config::load_from(&self.config_path) {
            Ok(config) => config.credentials(),
            Err(e) => {
                warn!(error = %e, "failed to read configuration");
                Credentials::default()
            }
        }
    }

    async fn shutdown(&mut self) {
        info!("stopping agent...");
        if self.supervisor.shutdown().await.is_some() {
            self.tray.set_status(ConnectionStatus::Disconnected);
        }
        self.tray.shutdown();
    }
}
