//! Daemon event loop
//!
//! Consumes events from the hotkey thread. Moving windows between virtual
//! desktops is left to the desktop integration; here the requested action
//! is logged and `exit` ends the loop.

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::events::{DaemonEvent, ShortcutAction};

/// Why `run_events` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The exit shortcut was pressed
    ExitRequested,
    /// Every sender was dropped
    ChannelClosed,
}

/// Process daemon events until exit is requested or the channel closes
pub async fn run_events(mut event_rx: mpsc::Receiver<DaemonEvent>) -> LoopExit {
    info!("event loop started");

    while let Some(event) = event_rx.recv().await {
        match &event {
            DaemonEvent::ShortcutFired {
                action: ShortcutAction::Exit,
                hotkey,
            } => {
                info!(%hotkey, "exit shortcut pressed");
                return LoopExit::ExitRequested;
            }
            DaemonEvent::ShortcutFired { action, hotkey } => {
                info!(%action, %hotkey, "shortcut action requested");
            }
            DaemonEvent::RegistrationFailed { hotkey, reason } => {
                error!(%hotkey, %reason, "shortcut unavailable");
            }
            DaemonEvent::KeystrokeObserved { .. } => {
                debug!(%event, "keystroke");
            }
        }
    }

    info!("event channel closed");
    LoopExit::ChannelClosed
}
