//! Global hotkey listener
//!
//! Hosts the shortcut manager and keystroke interceptor on a dedicated
//! thread with its own Win32 message loop, and forwards what they observe
//! to the async side of the daemon.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};
#[cfg(target_os = "windows")]
use tracing::info;
use tracing::{debug, error, warn};

use super::endpoint::Endpoint;
use super::error::HotkeyError;
use super::keys::{CombinationKey, KeyCode};
use super::manager::{Registration, ShortcutManager};
use crate::events::{DaemonEvent, ShortcutAction};

/// A combination and the action it triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub combination: CombinationKey,
    pub action: ShortcutAction,
}

/// How the keystroke interceptor should behave, if at all
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterceptSettings {
    pub enabled: bool,
    /// Keys that are swallowed system-wide
    pub swallow: Vec<KeyCode>,
    /// Report every key-down as a `KeystrokeObserved` event
    pub log_keystrokes: bool,
}

/// Runs hotkey registration and keystroke interception on their own thread
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub struct HotkeyListener {
    bindings: Vec<Binding>,
    intercept: InterceptSettings,
    event_tx: mpsc::Sender<DaemonEvent>,
    running: Arc<AtomicBool>,
    thread_id: Arc<AtomicU32>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl HotkeyListener {
    /// Create a new hotkey listener
    pub fn new(
        bindings: Vec<Binding>,
        intercept: InterceptSettings,
        event_tx: mpsc::Sender<DaemonEvent>,
    ) -> Self {
        Self {
            bindings,
            intercept,
            event_tx,
            running: Arc::new(AtomicBool::new(false)),
            thread_id: Arc::new(AtomicU32::new(0)),
            thread: Mutex::new(None),
        }
    }

    /// Start the hotkey listener
    ///
    /// Spawns the `hotkey-pump` thread and resolves once every binding has
    /// been attempted. The thread runs until `stop()` is called.
    pub async fn start(&self) -> Result<(), HotkeyError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(HotkeyError::AlreadyRunning);
        }

        let result = self.spawn().await;
        if result.is_err() {
            self.running.store(false, Ordering::SeqCst);
        }
        result
    }

    #[cfg(target_os = "windows")]
    async fn spawn(&self) -> Result<(), HotkeyError> {
        let bindings = self.bindings.clone();
        let intercept = self.intercept.clone();
        let event_tx = self.event_tx.clone();
        let running = Arc::clone(&self.running);
        let (ready_tx, ready_rx) = oneshot::channel();

        let handle = std::thread::Builder::new()
            .name("hotkey-pump".to_string())
            .spawn(move || {
                info!("hotkey listener thread started");

                if let Err(e) = run_event_loop(&bindings, intercept, event_tx, ready_tx) {
                    error!(%e, "hotkey listener error");
                }

                running.store(false, Ordering::SeqCst);
                info!("hotkey listener thread stopped");
            })
            .map_err(|e| HotkeyError::ThreadSpawn(e.to_string()))?;

        let thread_id = wait_for_pump(ready_rx).await?;
        self.thread_id.store(thread_id, Ordering::SeqCst);
        *self.thread.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);

        Ok(())
    }

    #[cfg(not(target_os = "windows"))]
    async fn spawn(&self) -> Result<(), HotkeyError> {
        Err(HotkeyError::Unsupported)
    }

    /// Stop the hotkey listener and wait for its thread to finish
    pub fn stop(&self) {
        let handle = self.thread.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(handle) = handle else {
            return;
        };

        #[cfg(target_os = "windows")]
        if let Err(e) = crate::platform::post_quit(self.thread_id.load(Ordering::SeqCst)) {
            warn!(%e, "failed to signal hotkey thread");
        }

        if handle.join().is_err() {
            error!("hotkey thread panicked");
        }
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the listener is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the `hotkey-pump` thread
#[cfg(target_os = "windows")]
fn run_event_loop(
    bindings: &[Binding],
    intercept: InterceptSettings,
    event_tx: mpsc::Sender<DaemonEvent>,
    ready_tx: oneshot::Sender<u32>,
) -> Result<(), HotkeyError> {
    use crate::intercept::KeystrokeInterceptor;
    use crate::platform::{self, LowLevelKeyboardHook, MessageWindow};

    platform::ensure_message_queue();

    let mut manager = ShortcutManager::new(MessageWindow::new());
    let bound = register_bindings(&mut manager, bindings, &event_tx);
    info!(bound, requested = bindings.len(), "shortcuts registered");

    let mut interceptor = KeystrokeInterceptor::new(LowLevelKeyboardHook::new());
    if intercept.enabled {
        if let Err(e) = interceptor.initialize(keystroke_handler(&intercept, event_tx.clone())) {
            error!(%e, "continuing without keystroke interception");
        }
    }

    let _ = ready_tx.send(platform::current_thread_id());

    let result = platform::run_message_loop();

    interceptor.shutdown();
    manager.dispose();

    result.map_err(|e| HotkeyError::MessageLoop(e.message()))
}

/// Wait for the pump thread to report its id without blocking the runtime
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
async fn wait_for_pump(ready_rx: oneshot::Receiver<u32>) -> Result<u32, HotkeyError> {
    ready_rx.await.map_err(|_| {
        HotkeyError::ThreadSpawn("listener thread exited during startup".to_string())
    })
}

/// Register every binding, reporting refusals as events
///
/// Returns how many bindings are now active.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn register_bindings<E: Endpoint>(
    manager: &mut ShortcutManager<E>,
    bindings: &[Binding],
    event_tx: &mpsc::Sender<DaemonEvent>,
) -> usize {
    let mut bound = 0;

    for binding in bindings {
        let Binding { combination, action } = *binding;
        let tx = event_tx.clone();
        let callback = move || {
            let event = DaemonEvent::ShortcutFired {
                action,
                hotkey: combination.to_string(),
            };
            // Never block the message pump
            if tx.try_send(event).is_err() {
                warn!(%combination, "event channel unavailable, dropping shortcut");
            }
        };

        match manager.register(combination.modifiers, combination.key, callback) {
            Ok(Registration::Bound(id)) => {
                debug!(%combination, %action, %id, "binding active");
                bound += 1;
            }
            Ok(Registration::AlreadyRegistered) => {
                warn!(%combination, %action, "duplicate binding ignored");
            }
            Err(e) => {
                error!(%combination, %e, "failed to register shortcut");
                let _ = event_tx.try_send(DaemonEvent::RegistrationFailed {
                    hotkey: combination.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    bound
}

/// Build the handler that decides, per key-down, whether to swallow it
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn keystroke_handler(
    settings: &InterceptSettings,
    event_tx: mpsc::Sender<DaemonEvent>,
) -> impl FnMut(KeyCode) -> bool + 'static {
    let swallow: HashSet<KeyCode> = settings.swallow.iter().copied().collect();
    let log_keystrokes = settings.log_keystrokes;

    move |key| {
        let swallowed = swallow.contains(&key);
        if log_keystrokes {
            let _ = event_tx.try_send(DaemonEvent::KeystrokeObserved {
                key: key.0,
                name: key.to_string(),
                swallowed,
            });
        }
        swallowed
    }
}
