//! Low-level keystroke interceptor
//!
//! Installs one system-wide keyboard filter and asks a handler, for every
//! key-down, whether the keystroke should be swallowed.

use std::cell::RefCell;

use tracing::{error, info, warn};

use crate::hotkey::KeyCode;

/// Message type of a key-down in the low-level keyboard stream
pub const WM_KEYDOWN: u32 = 0x0100;

/// Decides per key-down whether to swallow the keystroke
pub type KeystrokeHandler = Box<dyn FnMut(KeyCode) -> bool>;

/// What the filter tells the OS about one keyboard event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookVerdict {
    /// Stop the keystroke here
    Swallow,
    /// Pass it to the next filter in the chain
    Forward,
}

/// Errors raised while installing or removing the keyboard filter
#[derive(Debug, thiserror::Error)]
pub enum InterceptError {
    #[error("keystroke interceptor is already initialized")]
    AlreadyInitialized,

    #[error("another keystroke interceptor is active on this thread")]
    HandlerSlotTaken,

    #[error("a low-level keyboard hook is already installed in this process")]
    AlreadyInstalled,

    #[error("failed to install keyboard hook: {0}")]
    Install(String),

    #[error("failed to uninstall keyboard hook: {0}")]
    Uninstall(String),
}

/// The OS side of the interceptor
pub trait KeyboardHook {
    fn install(&mut self) -> Result<(), InterceptError>;
    fn uninstall(&mut self) -> Result<(), InterceptError>;
    fn is_installed(&self) -> bool;
}

// Low-level hook callbacks run on the installing thread's message loop.
thread_local! {
    static ACTIVE_HANDLER: RefCell<Option<KeystrokeHandler>> = const { RefCell::new(None) };
}

/// Decide the fate of one low-level keyboard event
///
/// `read_key` is only called for key-down events with a non-negative hook
/// code; everything else is forwarded without consulting the handler.
pub fn filter_keystroke(code: i32, message: u32, read_key: impl FnOnce() -> KeyCode) -> HookVerdict {
    if code < 0 || message != WM_KEYDOWN {
        return HookVerdict::Forward;
    }
    let key = read_key();

    ACTIVE_HANDLER.with(|slot| {
        // A handler that re-enters the pump must not see its own events
        let Ok(mut slot) = slot.try_borrow_mut() else {
            return HookVerdict::Forward;
        };
        let swallow = match slot.as_mut() {
            Some(handler) => handler(key),
            None => false,
        };
        if swallow {
            HookVerdict::Swallow
        } else {
            HookVerdict::Forward
        }
    })
}

/// Owns the keyboard filter and its handler
pub struct KeystrokeInterceptor<H: KeyboardHook> {
    hook: H,
    active: bool,
}

impl<H: KeyboardHook> KeystrokeInterceptor<H> {
    pub fn new(hook: H) -> Self {
        Self { hook, active: false }
    }

    /// Store `handler` and install the filter
    pub fn initialize(
        &mut self,
        handler: impl FnMut(KeyCode) -> bool + 'static,
    ) -> Result<(), InterceptError> {
        if self.active {
            return Err(InterceptError::AlreadyInitialized);
        }

        ACTIVE_HANDLER.with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.is_some() {
                return Err(InterceptError::HandlerSlotTaken);
            }
            *slot = Some(Box::new(handler));
            Ok(())
        })?;

        if let Err(e) = self.hook.install() {
            error!(%e, "failed to install keystroke interceptor");
            clear_handler();
            return Err(e);
        }

        self.active = true;
        info!("keystroke interceptor installed");
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Uninstall the filter and drop the handler
    ///
    /// Uninstall failures are logged only. Calling this when inactive does
    /// nothing; `initialize` may be called again afterwards.
    pub fn shutdown(&mut self) {
        if !self.active {
            return;
        }

        if let Err(e) = self.hook.uninstall() {
            warn!(%e, "failed to uninstall keystroke interceptor");
        }
        clear_handler();
        self.active = false;
        info!("keystroke interceptor removed");
    }
}

impl<H: KeyboardHook> Drop for KeystrokeInterceptor<H> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn clear_handler() {
    ACTIVE_HANDLER.with(|slot| {
        // Dropping the handler can run arbitrary code, so take it out first
        let handler = slot.borrow_mut().take();
        drop(handler);
    });
}
