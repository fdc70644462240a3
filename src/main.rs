//! virtual-win-keys: background daemon for global desktop shortcuts
//!
//! Registers the configured hotkeys on a dedicated message-pump thread,
//! optionally installs the low-level keystroke interceptor, and logs the
//! actions requested until Ctrl-C or the exit shortcut.

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use virtual_win_keys::config::Config;
use virtual_win_keys::daemon::{run_events, LoopExit};
use virtual_win_keys::events::DaemonEvent;
use virtual_win_keys::hotkey::HotkeyListener;
use virtual_win_keys::lifecycle::ShutdownSignal;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "virtual-win-keys starting"
    );

    // Load configuration
    let config = Config::load()?;
    let bindings = config.resolve_bindings()?;
    let intercept = config.intercept_settings()?;
    info!(
        path = %config.config_path.display(),
        bindings = bindings.len(),
        intercept = intercept.enabled,
        "configuration loaded"
    );

    let shutdown = ShutdownSignal::new();

    // Hotkey thread -> event loop
    let (event_tx, event_rx) = mpsc::channel::<DaemonEvent>(32);

    let listener = HotkeyListener::new(bindings, intercept, event_tx);
    match listener.start().await {
        Ok(()) => info!("hotkey listener started"),
        Err(e) => {
            error!(%e, "failed to start hotkey listener");
            warn!("continuing without hotkey support");
        }
    }

    tokio::select! {
        exit = run_events(event_rx) => {
            match exit {
                LoopExit::ExitRequested => info!("exit requested"),
                LoopExit::ChannelClosed => info!("event loop exited"),
            }
        }

        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    info!("shutting down...");
    listener.stop();
    info!("virtual-win-keys stopped");

    Ok(())
}
