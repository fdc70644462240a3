//! virtual-win-keys: global hotkeys and keystroke interception
//!
//! Provides:
//! - Shortcut registration with the OS and callback dispatch (`hotkey`)
//! - A low-level keyboard filter that can swallow keys (`intercept`)
//! - Win32 backends for both (`platform`)
//! - The daemon plumbing around them (`config`, `events`, `lifecycle`)

pub mod config;
pub mod daemon;
pub mod events;
pub mod hotkey;
pub mod intercept;
pub mod lifecycle;
pub mod platform;
