//! The OS-facing message endpoint that hotkey notifications arrive on

use std::rc::Rc;

use super::error::HotkeyError;
use super::keys::{KeyCode, Modifiers};
use super::registry::RegistrationId;

/// Receives the raw payload word of every hotkey notification
pub type PayloadSink = Rc<dyn Fn(isize)>;

/// A hidden, OS-addressable receiver for hotkey notifications
///
/// Implementations are single-threaded: every method, and every call into
/// the sink, happens on the thread that pumps the endpoint's messages.
pub trait Endpoint {
    /// Create the OS resource and route notifications to `sink`
    fn open(&mut self, sink: PayloadSink) -> Result<(), HotkeyError>;

    /// Whether `open` succeeded and `close` has not been called since
    fn is_open(&self) -> bool;

    /// Ask the OS to deliver `modifiers + key` to this endpoint under `id`
    fn bind(&self, id: RegistrationId, modifiers: Modifiers, key: KeyCode)
        -> Result<(), HotkeyError>;

    /// Release the binding for `id`; releasing an unknown id fails harmlessly
    fn release(&self, id: RegistrationId) -> Result<(), HotkeyError>;

    /// Destroy the OS resource; calling it on a closed endpoint is a no-op
    fn close(&mut self) -> Result<(), HotkeyError>;
}
