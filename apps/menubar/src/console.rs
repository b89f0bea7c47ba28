//! Terminal stand-in for the platform status item.
//!
//! Renders the menu and notifications on stdout, and maps typed commands
//! (`toggle`, `prefs`, `quit`) to tray events. Runs on plain threads because
//! both sides block. Closing stdin closes the tray, which quits the shell.

use std::io::BufRead;
use std::sync::mpsc;
use std::thread;

use teamradar_tray::{ConnectionStatus, MenuState, TrayEvent, TrayUpdate};
use tokio::sync::mpsc as async_mpsc;
use tracing::{debug, info, warn};

/// Spawns the renderer and the command reader.
///
/// The command reader owns `events`; it is dropped when stdin ends.
pub fn spawn(
    title: String,
    updates: mpsc::Receiver<TrayUpdate>,
    events: async_mpsc::UnboundedSender<TrayEvent>,
) -> std::io::Result<()> {
    let menu = MenuState {
        title,
        status: ConnectionStatus::Disconnected,
    };
    println!("{}", menu_text(&menu));

    thread::Builder::new()
        .name("tray-render".into())
        .spawn(move || render(menu, updates))?;
    thread::Builder::new()
        .name("tray-input".into())
        .spawn(move || read_commands(std::io::stdin().lock(), &events))?;
    Ok(())
}

fn render(mut menu: MenuState, updates: mpsc::Receiver<TrayUpdate>) {
    for update in updates {
        match update {
            TrayUpdate::StatusChanged(status) => {
                menu.status = status;
                info!(status = status.status_label(), "status item updated");
                println!("{}", menu_text(&menu));
            }
            TrayUpdate::ShowNotification { title, message } => {
                println!("[{title}] {message}");
            }
            TrayUpdate::ShowPreferences { missing } => match missing {
                Some(field) => warn!(field = %field, "setting missing; edit the configuration file"),
                None => info!("preferences requested; edit the configuration file"),
            },
            TrayUpdate::Shutdown => break,
        }
    }
}

/// Draws the menu as an indented list; actions are marked with `>`.
fn menu_text(menu: &MenuState) -> String {
    let mut text = format!("[{}]", menu.title);
    for item in menu.build_menu() {
        let line = match (item.action, item.label.is_empty()) {
            (Some(_), _) => format!("  > {}", item.label),
            (None, true) => "  ----".to_string(),
            (None, false) => format!("    {}", item.label),
        };
        text.push('\n');
        text.push_str(&line);
    }
    text
}

fn read_commands<R: BufRead>(input: R, events: &async_mpsc::UnboundedSender<TrayEvent>) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        let Some(event) = parse_command(&line) else {
            if !line.trim().is_empty() {
                warn!(command = line.trim(), "unknown command (try toggle, prefs, quit)");
            }
            continue;
        };
        if events.send(event).is_err() {
            break;
        }
    }
    debug!("command input closed");
}

fn parse_command(line: &str) -> Option<TrayEvent> {
    match line.trim() {
        "toggle" | "connect" | "disconnect" | "c" => Some(TrayEvent::ToggleConnection),
        "prefs" | "preferences" | "p" => Some(TrayEvent::OpenPreferences),
        "quit" | "q" => Some(TrayEvent::QuitRequested),
        _ => None,
    }
}
