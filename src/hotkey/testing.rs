//! In-memory endpoint used by unit tests in place of an OS window

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use super::endpoint::{Endpoint, PayloadSink};
use super::error::HotkeyError;
use super::keys::{CombinationKey, KeyCode, Modifiers};
use super::registry::RegistrationId;

#[derive(Default)]
struct FakeState {
    sink: Option<PayloadSink>,
    opened: usize,
    closed: usize,
    bound: Vec<(u32, CombinationKey)>,
    released: Vec<u32>,
    refused: HashSet<CombinationKey>,
    failing_releases: HashSet<u32>,
    keep_sink_on_close: bool,
}

/// Records every call and lets tests fire notifications by hand
///
/// Clones share state, so a test can keep one while the code under test
/// owns the other.
#[derive(Clone, Default)]
pub struct FakeEndpoint {
    state: Rc<RefCell<FakeState>>,
}

impl FakeEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the OS refuse this combination, as if another app owned it
    pub fn refuse(&self, combination: CombinationKey) {
        self.state.borrow_mut().refused.insert(combination);
    }

    pub fn fail_release(&self, id: u32) {
        self.state.borrow_mut().failing_releases.insert(id);
    }

    /// Keep delivering notifications after `close`, like a window whose
    /// queue still holds messages
    pub fn keep_sink_on_close(&self) {
        self.state.borrow_mut().keep_sink_on_close = true;
    }

    /// Deliver a notification the way the OS packs it
    pub fn fire(&self, modifiers: Modifiers, key: KeyCode) {
        self.fire_raw(((key.0 << 16) | modifiers.bits()) as isize);
    }

    pub fn fire_raw(&self, payload: isize) {
        // Clone out so the sink may call back into the endpoint
        let sink = self.state.borrow().sink.clone();
        if let Some(sink) = sink {
            sink(payload);
        }
    }

    pub fn opened(&self) -> usize {
        self.state.borrow().opened
    }

    pub fn closed(&self) -> usize {
        self.state.borrow().closed
    }

    pub fn bound_ids(&self) -> Vec<u32> {
        self.state.borrow().bound.iter().map(|(id, _)| *id).collect()
    }

    pub fn bound(&self) -> Vec<(u32, CombinationKey)> {
        self.state.borrow().bound.clone()
    }

    pub fn released_ids(&self) -> Vec<u32> {
        self.state.borrow().released.clone()
    }
}

impl Endpoint for FakeEndpoint {
    fn open(&mut self, sink: PayloadSink) -> Result<(), HotkeyError> {
        let mut state = self.state.borrow_mut();
        state.sink = Some(sink);
        state.opened += 1;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.borrow().sink.is_some()
    }

    fn bind(
        &self,
        id: RegistrationId,
        modifiers: Modifiers,
        key: KeyCode,
    ) -> Result<(), HotkeyError> {
        let combination = CombinationKey::new(modifiers, key);
        let mut state = self.state.borrow_mut();
        if state.refused.contains(&combination) {
            return Err(HotkeyError::Registration {
                combination,
                reason: "hot key is already registered".to_string(),
            });
        }
        state.bound.push((id.get(), combination));
        Ok(())
    }

    fn release(&self, id: RegistrationId) -> Result<(), HotkeyError> {
        let mut state = self.state.borrow_mut();
        if state.failing_releases.contains(&id.get()) {
            return Err(HotkeyError::Teardown(format!("release of {} refused", id)));
        }
        state.released.push(id.get());
        Ok(())
    }

    fn close(&mut self) -> Result<(), HotkeyError> {
        let mut state = self.state.borrow_mut();
        if state.keep_sink_on_close {
            state.closed += 1;
            return Ok(());
        }
        if state.sink.take().is_some() {
            state.closed += 1;
        }
        Ok(())
    }
}
