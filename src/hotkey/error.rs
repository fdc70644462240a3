//! Errors raised by hotkey registration and the listener thread

use super::keys::CombinationKey;

/// Errors that can occur while registering or tearing down hotkeys
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("failed to register hotkey {combination}: {reason}")]
    Registration {
        combination: CombinationKey,
        reason: String,
    },

    #[error("hotkey endpoint has not been created")]
    EndpointNotReady,

    #[error("failed to create hotkey endpoint: {0}")]
    EndpointCreation(String),

    #[error("hotkey id space exhausted")]
    IdsExhausted,

    #[error("shortcut manager has been disposed")]
    Disposed,

    #[error("hotkey teardown failed: {0}")]
    Teardown(String),

    #[error("hotkey listener is already running")]
    AlreadyRunning,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("message loop failed: {0}")]
    MessageLoop(String),

    #[error("global hotkeys are not supported on this platform")]
    Unsupported,
}
