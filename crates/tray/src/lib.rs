//! Menu-bar item for TeamRadar.
//!
//! Models the status item's menu (connection status line, Connect/Disconnect
//! toggle, Preferences, Quit) and the channel interface between the shell
//! and whatever platform code draws it:
//! - [`TrayEvent`] — events from the tray to the shell (menu clicks)
//! - [`TrayUpdate`] — updates from the shell to the tray (labels,
//!   notifications, preferences requests)
//!
//! No widget code lives here; the platform layer owns the event loop and
//! renders [`MenuState::build_menu`].

mod menu;
mod tray;

pub use menu::{ConnectionStatus, MenuAction, MenuItem, MenuState};
pub use tray::{Notifier, TrayConfig, TrayEvent, TrayHandle, TrayUpdate};
