// Platform module - OS backends for the hotkey endpoint and keyboard hook

#[cfg(target_os = "windows")]
mod win32;

#[cfg(target_os = "windows")]
pub use win32::{
    current_thread_id, ensure_message_queue, post_quit, run_message_loop, LowLevelKeyboardHook,
    MessageWindow,
};

