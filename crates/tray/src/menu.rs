//! Dynamic menu for the status item.

/// Actions that can be triggered from the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Connect, or disconnect when already connected.
    ToggleConnection,
    /// Open the preferences dialog.
    OpenPreferences,
    /// User requested to quit the application.
    Quit,
}

/// A single menu item.
#[derive(Debug, Clone)]
pub struct MenuItem {
    /// Display text.
    pub label: String,
    /// Whether the item is enabled (clickable).
    pub enabled: bool,
    /// Optional action triggered on click.
    pub action: Option<MenuAction>,
}

impl MenuItem {
    fn info(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: false,
            action: None,
        }
    }

    fn separator() -> Self {
        Self::info(String::new())
    }

    fn action(label: impl Into<String>, action: MenuAction) -> Self {
        Self {
            label: label.into(),
            enabled: true,
            action: Some(action),
        }
    }
}

/// Connection status as shown in the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
    Disconnecting,
    /// The agent stopped without being asked to.
    Exited,
}

impl ConnectionStatus {
    /// Text of the status line.
    pub fn status_label(self) -> &'static str {
        match self {
            Self::Disconnected => "Not connected.",
            Self::Connected => "No rooms.",
            Self::Disconnecting => "Disconnecting...",
            Self::Exited => "Agent exited.",
        }
    }

    /// Text of the connect/disconnect item.
    pub fn toggle_label(self) -> &'static str {
        match self {
            Self::Disconnected | Self::Exited => "Connect...",
            Self::Connected | Self::Disconnecting => "Disconnect",
        }
    }
}

/// Current state used to build the menu.
#[derive(Debug, Clone)]
pub struct MenuState {
    /// Status item title.
    pub title: String,
    pub status: ConnectionStatus,
}

impl Default for MenuState {
    fn default() -> Self {
        Self {
            title: "TeamRadar".into(),
            status: ConnectionStatus::Disconnected,
        }
    }
}

impl MenuState {
    /// Builds the menu items from the current state.
    pub fn build_menu(&self) -> Vec<MenuItem> {
        vec![
            MenuItem::info(self.status.status_label()),
            MenuItem::separator(),
            MenuItem::action(self.status.toggle_label(), MenuAction::ToggleConnection),
            MenuItem::action("Preferences...", MenuAction::OpenPreferences),
            MenuItem::separator(),
            MenuItem::action("Quit", MenuAction::Quit),
        ]
    }
}
