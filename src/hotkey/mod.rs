//! Hotkey module for global shortcut registration and dispatch
//!
//! Binds modifier + key combinations with the OS through a hidden message
//! endpoint and routes each notification to the callback registered for it.

mod endpoint;
mod error;
mod keys;
mod listener;
mod manager;
mod registry;
mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use endpoint::{Endpoint, PayloadSink};
pub use error::HotkeyError;
pub use keys::{parse_combination, parse_key, CombinationKey, KeyCode, Modifiers};
pub use listener::{Binding, HotkeyListener, InterceptSettings};
pub use manager::{Callback, Registration, ShortcutManager};
pub use registry::{HotkeyRegistry, RegistrationId, MAX_REGISTRATION_ID};
pub use source::{decode_payload, HotkeyEvent, HotkeyEventSource};
