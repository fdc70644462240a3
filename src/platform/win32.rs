//! Win32 backends: message-only hotkey window, low-level keyboard hook and
//! the thread message pump.
//!
//! Everything here must run on the thread that pumps messages; none of the
//! handles are `Send`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

use tracing::{debug, error, warn};
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    RegisterHotKey, UnregisterHotKey, HOT_KEY_MODIFIERS,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW,
    PeekMessageW, PostThreadMessageW, RegisterClassW, SetWindowsHookExW, TranslateMessage,
    UnhookWindowsHookEx, HHOOK, HWND_MESSAGE, KBDLLHOOKSTRUCT, MSG, PM_NOREMOVE, WH_KEYBOARD_LL,
    WINDOW_EX_STYLE, WINDOW_STYLE, WM_HOTKEY, WM_QUIT, WM_USER, WNDCLASSW,
};

use crate::hotkey::{
    CombinationKey, Endpoint, HotkeyError, KeyCode, Modifiers, PayloadSink, RegistrationId,
};
use crate::intercept::{filter_keystroke, HookVerdict, InterceptError, KeyboardHook};

const CLASS_NAME: PCWSTR = w!("VirtualWinKeysHotkeyWindow");

static REGISTER_CLASS: Once = Once::new();

/// Set while a low-level keyboard hook from this process is live
static HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

thread_local! {
    /// Hotkey sinks keyed by the raw window handle they belong to
    static PAYLOAD_SINKS: RefCell<HashMap<isize, PayloadSink>> = RefCell::new(HashMap::new());
}

fn module_instance() -> windows::core::Result<HINSTANCE> {
    // SAFETY: a null name returns the handle of the running executable
    let module = unsafe { GetModuleHandleW(PCWSTR::null())? };
    Ok(HINSTANCE(module.0))
}

// ============================================================================
// Hotkey endpoint
// ============================================================================

/// Hidden message-only window that receives `WM_HOTKEY`
#[derive(Debug, Default)]
pub struct MessageWindow {
    hwnd: Option<HWND>,
}

impl MessageWindow {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self) -> Result<HWND, HotkeyError> {
        self.hwnd.ok_or(HotkeyError::EndpointNotReady)
    }
}

impl Endpoint for MessageWindow {
    fn open(&mut self, sink: PayloadSink) -> Result<(), HotkeyError> {
        if self.hwnd.is_some() {
            return Ok(());
        }

        let instance =
            module_instance().map_err(|e| HotkeyError::EndpointCreation(e.to_string()))?;

        REGISTER_CLASS.call_once(|| {
            let class = WNDCLASSW {
                lpfnWndProc: Some(hotkey_window_proc),
                hInstance: instance,
                lpszClassName: CLASS_NAME,
                ..Default::default()
            };
            // SAFETY: the class struct and its static name outlive the call
            if unsafe { RegisterClassW(&class) } == 0 {
                warn!("RegisterClassW failed, window creation will report the cause");
            }
        });

        // SAFETY: the class is registered above and HWND_MESSAGE makes the
        // window invisible and message-only
        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                CLASS_NAME,
                PCWSTR::null(),
                WINDOW_STYLE::default(),
                0,
                0,
                0,
                0,
                Some(HWND_MESSAGE),
                None,
                Some(instance),
                None,
            )
        }
        .map_err(|e| HotkeyError::EndpointCreation(e.to_string()))?;

        PAYLOAD_SINKS.with(|sinks| sinks.borrow_mut().insert(hwnd.0 as isize, sink));
        self.hwnd = Some(hwnd);

        debug!(hwnd = ?hwnd.0, "hotkey window created");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.hwnd.is_some()
    }

    fn bind(
        &self,
        id: RegistrationId,
        modifiers: Modifiers,
        key: KeyCode,
    ) -> Result<(), HotkeyError> {
        let hwnd = self.handle()?;
        // SAFETY: hwnd is a live window owned by this thread
        unsafe {
            RegisterHotKey(
                Some(hwnd),
                id.get() as i32,
                HOT_KEY_MODIFIERS(modifiers.bits()),
                key.0,
            )
        }
        .map_err(|e| HotkeyError::Registration {
            combination: CombinationKey::new(modifiers, key),
            reason: e.message(),
        })
    }

    fn release(&self, id: RegistrationId) -> Result<(), HotkeyError> {
        let hwnd = self.handle()?;
        // SAFETY: unregistering an unknown id only returns an error
        unsafe { UnregisterHotKey(Some(hwnd), id.get() as i32) }
            .map_err(|e| HotkeyError::Teardown(format!("UnregisterHotKey {}: {}", id, e.message())))
    }

    fn close(&mut self) -> Result<(), HotkeyError> {
        let Some(hwnd) = self.hwnd.take() else {
            return Ok(());
        };

        PAYLOAD_SINKS.with(|sinks| sinks.borrow_mut().remove(&(hwnd.0 as isize)));
        // SAFETY: the window was created by this thread and is destroyed once
        unsafe { DestroyWindow(hwnd) }
            .map_err(|e| HotkeyError::Teardown(format!("DestroyWindow: {}", e.message())))?;

        debug!(hwnd = ?hwnd.0, "hotkey window destroyed");
        Ok(())
    }
}

impl Drop for MessageWindow {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(%e, "failed to destroy hotkey window");
        }
    }
}

/// Window procedure for the hotkey window
///
/// Panics from the sink are caught so they never unwind into the OS.
unsafe extern "system" fn hotkey_window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg != WM_HOTKEY {
        return DefWindowProcW(hwnd, msg, wparam, lparam);
    }

    let sink = PAYLOAD_SINKS.with(|sinks| sinks.borrow().get(&(hwnd.0 as isize)).cloned());
    if let Some(sink) = sink {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| sink(lparam.0))) {
            error!(?panic, "panic in hotkey callback");
        }
    }

    LRESULT(0)
}

// ============================================================================
// Low-level keyboard hook
// ============================================================================

/// System-wide `WH_KEYBOARD_LL` hook; at most one per process
#[derive(Debug, Default)]
pub struct LowLevelKeyboardHook {
    hook: Option<HHOOK>,
}

impl LowLevelKeyboardHook {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyboardHook for LowLevelKeyboardHook {
    fn install(&mut self) -> Result<(), InterceptError> {
        if HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
            return Err(InterceptError::AlreadyInstalled);
        }

        let installed = module_instance().and_then(|instance| {
            // SAFETY: the hook procedure is a plain function that lives for
            // the whole process
            unsafe {
                SetWindowsHookExW(
                    WH_KEYBOARD_LL,
                    Some(low_level_keyboard_proc),
                    Some(instance),
                    0,
                )
            }
        });

        match installed {
            Ok(hook) => {
                self.hook = Some(hook);
                debug!("low-level keyboard hook installed");
                Ok(())
            }
            Err(e) => {
                HOOK_INSTALLED.store(false, Ordering::SeqCst);
                Err(InterceptError::Install(e.message()))
            }
        }
    }

    fn uninstall(&mut self) -> Result<(), InterceptError> {
        let Some(hook) = self.hook.take() else {
            return Ok(());
        };

        // SAFETY: the handle came from SetWindowsHookExW and is released once
        unsafe { UnhookWindowsHookEx(hook) }.map_err(|e| InterceptError::Uninstall(e.message()))?;
        // Only cleared once the OS has really dropped the hook
        HOOK_INSTALLED.store(false, Ordering::SeqCst);

        debug!("low-level keyboard hook removed");
        Ok(())
    }

    fn is_installed(&self) -> bool {
        self.hook.is_some()
    }
}

impl Drop for LowLevelKeyboardHook {
    fn drop(&mut self) {
        if let Err(e) = self.uninstall() {
            warn!(%e, "failed to remove keyboard hook");
        }
    }
}

/// Hook procedure for `WH_KEYBOARD_LL`
///
/// A non-zero return without calling the next hook swallows the keystroke.
unsafe extern "system" fn low_level_keyboard_proc(
    code: i32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let verdict = catch_unwind(AssertUnwindSafe(|| {
        filter_keystroke(code, wparam.0 as u32, || {
            // SAFETY: key-down messages with a non-negative code carry a
            // KBDLLHOOKSTRUCT in lparam
            let info = unsafe { &*(lparam.0 as *const KBDLLHOOKSTRUCT) };
            KeyCode(info.vkCode)
        })
    }))
    .unwrap_or_else(|panic| {
        error!(?panic, "panic in keystroke handler");
        HookVerdict::Forward
    });

    match verdict {
        HookVerdict::Swallow => LRESULT(1),
        HookVerdict::Forward => CallNextHookEx(None, code, wparam, lparam),
    }
}

// ============================================================================
// Message pump
// ============================================================================

pub fn current_thread_id() -> u32 {
    // SAFETY: no preconditions
    unsafe { GetCurrentThreadId() }
}

/// Make sure the calling thread has a message queue so `post_quit` works
pub fn ensure_message_queue() {
    let mut msg = MSG::default();
    // SAFETY: peeking without removal only forces queue creation
    let _ = unsafe { PeekMessageW(&mut msg, None, WM_USER, WM_USER, PM_NOREMOVE) };
}

/// Pump messages on the calling thread until `WM_QUIT` arrives
pub fn run_message_loop() -> windows::core::Result<()> {
    let mut msg = MSG::default();
    loop {
        // SAFETY: msg is a valid out pointer for the duration of the call
        let result = unsafe { GetMessageW(&mut msg, None, 0, 0) };
        match result.0 {
            -1 => return Err(windows::core::Error::from_win32()),
            0 => return Ok(()),
            _ => unsafe {
                let _ = TranslateMessage(&msg);
                let _ = DispatchMessageW(&msg);
            },
        }
    }
}

/// Ask the message loop on `thread_id` to exit
pub fn post_quit(thread_id: u32) -> windows::core::Result<()> {
    // SAFETY: posting to a thread without a queue just fails
    unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) }
}
