//! Hotkey id allocation and OS binding
//!
//! The registry knows nothing about callbacks or duplicate combinations; it
//! hands out ids and keeps every issued id bound until `unregister_all`.

use std::fmt;

use tracing::{debug, warn};

use super::endpoint::Endpoint;
use super::error::HotkeyError;
use super::keys::{CombinationKey, KeyCode, Modifiers};

/// Highest id the host accepts for application hotkeys
pub const MAX_REGISTRATION_ID: u32 = 0xBFFF;

/// Process-unique hotkey id, issued from 1 upward and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(u32);

impl RegistrationId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id allocator for OS hotkey bindings
#[derive(Debug, Default)]
pub struct HotkeyRegistry {
    /// Highest id bound so far
    last_issued: u32,
    /// Ids up to and including this one have been released
    released_through: u32,
}

impl HotkeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `modifiers + key` on `endpoint` under the next id
    ///
    /// The id is only consumed when the OS accepts the binding.
    pub fn register<E: Endpoint>(
        &mut self,
        endpoint: &E,
        modifiers: Modifiers,
        key: KeyCode,
    ) -> Result<RegistrationId, HotkeyError> {
        if !endpoint.is_open() {
            return Err(HotkeyError::EndpointNotReady);
        }

        let next = self.last_issued + 1;
        if next > MAX_REGISTRATION_ID {
            return Err(HotkeyError::IdsExhausted);
        }
        let id = RegistrationId(next);

        endpoint.bind(id, modifiers, key)?;
        self.last_issued = next;

        debug!(%id, combination = %CombinationKey::new(modifiers, key), "hotkey bound");
        Ok(id)
    }

    /// Release every id issued since the last bulk release, highest first
    ///
    /// Failures are logged and skipped. Returns how many releases succeeded.
    pub fn unregister_all<E: Endpoint>(&mut self, endpoint: &E) -> usize {
        let mut released = 0;

        for raw in (self.released_through + 1..=self.last_issued).rev() {
            let id = RegistrationId(raw);
            match endpoint.release(id) {
                Ok(()) => released += 1,
                Err(e) => warn!(%id, %e, "failed to release hotkey"),
            }
        }

        if self.last_issued > self.released_through {
            debug!(
                released,
                attempted = self.last_issued - self.released_through,
                "hotkeys released"
            );
        }
        self.released_through = self.last_issued;

        released
    }

    /// Highest id issued so far (0 when nothing has been registered)
    pub fn last_issued(&self) -> u32 {
        self.last_issued
    }

    /// Number of ids currently bound
    pub fn active(&self) -> u32 {
        self.last_issued - self.released_through
    }
}
