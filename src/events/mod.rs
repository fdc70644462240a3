//! Events module for daemon notifications
//!
//! Structured events emitted by the hotkey thread and consumed by the
//! async side of the daemon.

use serde::{Deserialize, Serialize};

/// What a registered shortcut asks the daemon to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortcutAction {
    /// Move the active window to the virtual desktop on the right
    MoveWindowRight,
    /// Move the active window to the virtual desktop on the left
    MoveWindowLeft,
    /// Stop the daemon
    Exit,
}

impl std::fmt::Display for ShortcutAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShortcutAction::MoveWindowRight => write!(f, "move_window_right"),
            ShortcutAction::MoveWindowLeft => write!(f, "move_window_left"),
            ShortcutAction::Exit => write!(f, "exit"),
        }
    }
}

/// Events sent from the hotkey thread to the daemon loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DaemonEvent {
    /// A registered shortcut was pressed
    ShortcutFired {
        action: ShortcutAction,
        /// Human-readable combination, e.g. `Alt+Win+Right`
        hotkey: String,
    },

    /// The OS refused a shortcut binding
    RegistrationFailed { hotkey: String, reason: String },

    /// A key-down passed through the keystroke interceptor
    KeystrokeObserved {
        /// Virtual-key code
        key: u32,
        name: String,
        swallowed: bool,
    },
}

impl std::fmt::Display for DaemonEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DaemonEvent::ShortcutFired { action, hotkey } => {
                write!(f, "SHORTCUT_FIRED {} ({})", action, hotkey)
            }
            DaemonEvent::RegistrationFailed { hotkey, reason } => {
                write!(f, "REGISTRATION_FAILED {}: {}", hotkey, reason)
            }
            DaemonEvent::KeystrokeObserved { name, swallowed, .. } => {
                if *swallowed {
                    write!(f, "KEYSTROKE {} (swallowed)", name)
                } else {
                    write!(f, "KEYSTROKE {}", name)
                }
            }
        }
    }
}
