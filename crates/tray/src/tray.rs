//! Tray handle, events, and update types.
//!
//! The platform layer (status item, notification center, preferences
//! window) runs its own event loop on the main thread. It sends
//! [`TrayEvent`]s through an unbounded tokio channel, which is safe to use
//! from a non-async thread, and receives [`TrayUpdate`]s on a std channel it
//! can poll between GUI events.

use std::sync::mpsc;

use tokio::sync::mpsc as async_mpsc;

use crate::menu::{ConnectionStatus, MenuAction, MenuState};

/// Configuration for the status item.
#[derive(Debug, Clone)]
pub struct TrayConfig {
    /// Title shown in the menu bar and on notifications.
    pub title: String,
}

impl Default for TrayConfig {
    fn default() -> Self {
        Self {
            title: "TeamRadar".into(),
        }
    }
}

/// Events emitted by the tray to the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayEvent {
    /// User clicked "Connect..." or "Disconnect".
    ToggleConnection,
    /// User clicked "Preferences...".
    OpenPreferences,
    /// User clicked "Quit".
    QuitRequested,
}

impl From<MenuAction> for TrayEvent {
    fn from(action: MenuAction) -> Self {
        match action {
            MenuAction::ToggleConnection => Self::ToggleConnection,
            MenuAction::OpenPreferences => Self::OpenPreferences,
            MenuAction::Quit => Self::QuitRequested,
        }
    }
}

/// Updates sent from the shell to the tray.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrayUpdate {
    /// Relabel the status line and toggle item.
    StatusChanged(ConnectionStatus),
    /// Show a user notification.
    ShowNotification { title: String, message: String },
    /// Open the preferences dialog; `missing` names the empty setting.
    ShowPreferences { missing: Option<String> },
    /// Request tray shutdown.
    Shutdown,
}

/// Cloneable sender for user notifications.
#[derive(Debug, Clone)]
pub struct Notifier {
    title: String,
    update_tx: mpsc::Sender<TrayUpdate>,
}

impl Notifier {
    /// Shows `message` under the tray title.
    pub fn show(&self, message: &str) {
        let update = TrayUpdate::ShowNotification {
            title: self.title.clone(),
            message: message.to_string(),
        };
        if self.update_tx.send(update).is_err() {
            tracing::debug!("tray gone, notification dropped");
        }
    }
}

/// Handle for communicating with the tray from the shell.
pub struct TrayHandle {
    title: String,
    update_tx: mpsc::Sender<TrayUpdate>,
    event_rx: async_mpsc::UnboundedReceiver<TrayEvent>,
    state: MenuState,
}

impl TrayHandle {
    /// Creates a new tray handle with its channel pair.
    ///
    /// Returns `(handle, event_sender, update_receiver)`; the sender and
    /// receiver are given to the platform event loop.
    pub fn new(
        config: TrayConfig,
    ) -> (
        Self,
        async_mpsc::UnboundedSender<TrayEvent>,
        mpsc::Receiver<TrayUpdate>,
    ) {
        let (update_tx, update_rx) = mpsc::channel();
        let (event_tx, event_rx) = async_mpsc::unbounded_channel();

        let handle = Self {
            title: config.title.clone(),
            update_tx,
            event_rx,
            state: MenuState {
                title: config.title,
                status: ConnectionStatus::Disconnected,
            },
        };

        (handle, event_tx, update_rx)
    }

    /// Updates the connection status. Unchanged statuses are not resent.
    pub fn set_status(&mut self, status: ConnectionStatus) {
        if self.state.status == status {
            return;
        }
        self.state.status = status;
        self.send(TrayUpdate::StatusChanged(status));
    }

    /// Returns a notifier that can be moved to another task.
    pub fn notifier(&self) -> Notifier {
        Notifier {
            title: self.title.clone(),
            update_tx: self.update_tx.clone(),
        }
    }

    /// Asks the tray to open the preferences dialog.
    pub fn show_preferences(&self, missing: Option<&str>) {
        self.send(TrayUpdate::ShowPreferences {
            missing: missing.map(str::to_string),
        });
    }

    /// Requests the tray to shut down.
    pub fn shutdown(&self) {
        self.send(TrayUpdate::Shutdown);
    }

    /// Waits for the next tray event. `None` once the tray is gone.
    pub async fn recv_event(&mut self) -> Option<TrayEvent> {
        self.event_rx.recv().await
    }

    /// Tries to receive a tray event (non-blocking).
    pub fn try_recv_event(&mut self) -> Option<TrayEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Returns the current menu state.
    pub fn state(&self) -> &MenuState {
        &self.state
    }

    fn send(&self, update: TrayUpdate) {
        if self.update_tx.send(update).is_err() {
            tracing::debug!("tray gone, update dropped");
        }
    }
}
