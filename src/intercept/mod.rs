//! Keystroke interception module
//!
//! Independent of hotkey registration: observes every key-down on the
//! system through a low-level keyboard filter and can suppress keys.

mod interceptor;

pub use interceptor::{
    filter_keystroke, HookVerdict, InterceptError, KeyboardHook, KeystrokeHandler,
    KeystrokeInterceptor, WM_KEYDOWN,
};
