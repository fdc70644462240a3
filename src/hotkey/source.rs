//! Hotkey event source
//!
//! Owns the hidden endpoint, decodes raw OS notifications into
//! `HotkeyEvent`s and hands each one to its single subscriber before
//! returning to the message loop.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{trace, warn};

use super::endpoint::{Endpoint, PayloadSink};
use super::error::HotkeyError;
use super::keys::{CombinationKey, KeyCode, Modifiers};

/// A hotkey notification decoded from the OS payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyEvent {
    pub modifiers: Modifiers,
    pub key: KeyCode,
}

impl HotkeyEvent {
    pub fn combination(&self) -> CombinationKey {
        CombinationKey::new(self.modifiers, self.key)
    }
}

/// Decode a hotkey payload: bits 0-15 are modifiers, bits 16-31 the key code
pub fn decode_payload(raw: isize) -> HotkeyEvent {
    let word = raw as u32;
    HotkeyEvent {
        modifiers: Modifiers::from_bits_truncate(word & 0xFFFF),
        key: KeyCode((word >> 16) & 0xFFFF),
    }
}

type Subscriber = Rc<dyn Fn(HotkeyEvent)>;

/// Lifecycle of the owned endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndpointState {
    NotCreated,
    Open,
    Closed,
}

/// Owns one endpoint and delivers its events to one subscriber
pub struct HotkeyEventSource<E: Endpoint> {
    endpoint: E,
    state: EndpointState,
    subscriber: Rc<RefCell<Option<Subscriber>>>,
}

impl<E: Endpoint> HotkeyEventSource<E> {
    /// Create a source whose events all go to `subscriber`
    ///
    /// The endpoint is not created until `endpoint()` is first called.
    pub fn new(endpoint: E, subscriber: impl Fn(HotkeyEvent) + 'static) -> Self {
        Self {
            endpoint,
            state: EndpointState::NotCreated,
            subscriber: Rc::new(RefCell::new(Some(Rc::new(subscriber)))),
        }
    }

    /// The endpoint, created on first use
    pub fn endpoint(&mut self) -> Result<&E, HotkeyError> {
        match self.state {
            EndpointState::Open => {}
            EndpointState::Closed => return Err(HotkeyError::Disposed),
            EndpointState::NotCreated => {
                self.endpoint.open(self.sink())?;
                self.state = EndpointState::Open;
            }
        }
        Ok(&self.endpoint)
    }

    /// The endpoint if it has been created and not yet closed
    pub fn open_endpoint(&self) -> Option<&E> {
        (self.state == EndpointState::Open).then_some(&self.endpoint)
    }

    pub fn is_closed(&self) -> bool {
        self.state == EndpointState::Closed
    }

    /// Destroy the endpoint and drop the subscriber; later calls do nothing
    pub fn close(&mut self) {
        if self.state == EndpointState::Closed {
            return;
        }
        if self.state == EndpointState::Open {
            if let Err(e) = self.endpoint.close() {
                warn!(%e, "failed to destroy hotkey endpoint");
            }
        }
        self.state = EndpointState::Closed;
        self.subscriber.borrow_mut().take();
    }

    fn sink(&self) -> PayloadSink {
        let subscriber = Rc::clone(&self.subscriber);
        Rc::new(move |raw| {
            let event = decode_payload(raw);
            trace!(?event, raw, "hotkey notification");
            // Release the borrow before calling out so the subscriber can close us
            let current = subscriber.borrow().clone();
            if let Some(current) = current {
                current(event);
            }
        })
    }
}

impl<E: Endpoint> Drop for HotkeyEventSource<E> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::testing::FakeEndpoint;
    use std::cell::Cell;

    fn recording_source() -> (
        HotkeyEventSource<FakeEndpoint>,
        FakeEndpoint,
        Rc<RefCell<Vec<HotkeyEvent>>>,
    ) {
        let fake = FakeEndpoint::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let source = HotkeyEventSource::new(fake.clone(), move |event| {
            sink.borrow_mut().push(event);
        });
        (source, fake, seen)
    }

    #[test]
    fn test_decode_payload_layout() {
        let event = decode_payload(0x0027_0009);
        assert_eq!(event.modifiers, Modifiers::ALT | Modifiers::META);
        assert_eq!(event.key, KeyCode::RIGHT);

        let event = decode_payload(0x0041_0000);
        assert!(event.modifiers.is_empty());
        assert_eq!(event.key, KeyCode(0x41));
    }

    #[test]
    fn test_decode_payload_truncates_unknown_modifier_bits() {
        // MOD_NOREPEAT (0x4000) is never reported as a modifier
        let event = decode_payload(0x0025_4002);
        assert_eq!(event.modifiers, Modifiers::CONTROL);
        assert_eq!(event.key, KeyCode::LEFT);
    }

    #[test]
    fn test_endpoint_created_lazily_once() {
        let (mut source, fake, _) = recording_source();
        assert_eq!(fake.opened(), 0);
        assert!(source.open_endpoint().is_none());

        source.endpoint().unwrap();
        source.endpoint().unwrap();
        assert_eq!(fake.opened(), 1);
        assert!(source.open_endpoint().is_some());
    }

    #[test]
    fn test_events_reach_subscriber() {
        let (mut source, fake, seen) = recording_source();
        source.endpoint().unwrap();

        fake.fire(Modifiers::ALT | Modifiers::META, KeyCode::RIGHT);
        fake.fire(Modifiers::SHIFT, KeyCode::F1);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].key, KeyCode::RIGHT);
        assert_eq!(seen[1].modifiers, Modifiers::SHIFT);
    }

    #[test]
    fn test_close_is_idempotent_and_final() {
        let (mut source, fake, seen) = recording_source();
        source.endpoint().unwrap();

        source.close();
        source.close();
        assert_eq!(fake.closed(), 1);
        assert!(source.is_closed());
        assert!(matches!(source.endpoint(), Err(HotkeyError::Disposed)));

        fake.fire(Modifiers::ALT, KeyCode::UP);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_close_detaches_subscriber_from_live_sink() {
        let (mut source, fake, seen) = recording_source();
        fake.keep_sink_on_close();
        source.endpoint().unwrap();

        fake.fire(Modifiers::ALT, KeyCode::UP);
        source.close();
        fake.fire(Modifiers::ALT, KeyCode::DOWN);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].key, KeyCode::UP);
    }

    #[test]
    fn test_close_without_open_never_touches_endpoint() {
        let (mut source, fake, _) = recording_source();
        source.close();
        assert_eq!(fake.opened(), 0);
        assert_eq!(fake.closed(), 0);
    }

    #[test]
    fn test_drop_closes_endpoint() {
        let fake = FakeEndpoint::new();
        let calls = Rc::new(Cell::new(0));
        {
            let counter = Rc::clone(&calls);
            let mut source =
                HotkeyEventSource::new(fake.clone(), move |_| counter.set(counter.get() + 1));
            source.endpoint().unwrap();
        }
        assert_eq!(fake.closed(), 1);
        fake.fire(Modifiers::ALT, KeyCode::UP);
        assert_eq!(calls.get(), 0);
    }
}
