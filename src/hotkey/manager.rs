//! Shortcut manager: combination to callback dispatch
//!
//! Registration and dispatch both happen on the thread that pumps the
//! endpoint's messages, so the tables use `Rc`/`RefCell` rather than locks.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, info};

use super::endpoint::Endpoint;
use super::error::HotkeyError;
use super::keys::{CombinationKey, KeyCode, Modifiers};
use super::registry::{HotkeyRegistry, RegistrationId};
use super::source::{HotkeyEvent, HotkeyEventSource};

/// Action run when a registered combination fires
pub type Callback = Rc<dyn Fn()>;

/// Largest key code a hotkey notification can report
const MAX_KEY_CODE: u32 = 0xFFFF;

type CallbackTable = Rc<RefCell<HashMap<CombinationKey, Callback>>>;

/// Outcome of a successful `register` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Newly bound with the OS under this id
    Bound(RegistrationId),
    /// Combination was already registered; the earlier callback is kept
    AlreadyRegistered,
}

/// Maps combinations to callbacks and owns the registry and event source
pub struct ShortcutManager<E: Endpoint> {
    callbacks: CallbackTable,
    registry: HotkeyRegistry,
    source: HotkeyEventSource<E>,
    disposed: bool,
}

impl<E: Endpoint> ShortcutManager<E> {
    /// Create a manager on top of `endpoint`
    ///
    /// The endpoint is opened on the first `register` call.
    pub fn new(endpoint: E) -> Self {
        let callbacks: CallbackTable = Rc::new(RefCell::new(HashMap::new()));

        let table = Rc::clone(&callbacks);
        let source = HotkeyEventSource::new(endpoint, move |event| dispatch(&table, event));

        Self {
            callbacks,
            registry: HotkeyRegistry::new(),
            source,
            disposed: false,
        }
    }

    /// Register `callback` for `modifiers + key`
    ///
    /// A combination that is already registered is left untouched and the
    /// new callback is dropped. If the OS refuses the binding the table is
    /// not changed.
    pub fn register(
        &mut self,
        modifiers: Modifiers,
        key: KeyCode,
        callback: impl Fn() + 'static,
    ) -> Result<Registration, HotkeyError> {
        if self.disposed {
            return Err(HotkeyError::Disposed);
        }

        let combination = CombinationKey::new(modifiers, key);
        // Notifications carry only 16 bits of key code
        if key.0 > MAX_KEY_CODE {
            return Err(HotkeyError::Registration {
                combination,
                reason: format!("key code {:#x} is out of range", key.0),
            });
        }
        if self.callbacks.borrow().contains_key(&combination) {
            debug!(%combination, "shortcut already registered, ignoring");
            return Ok(Registration::AlreadyRegistered);
        }

        let endpoint = self.source.endpoint()?;
        let id = self
            .registry
            .register(endpoint, combination.modifiers, combination.key)?;
        self.callbacks
            .borrow_mut()
            .insert(combination, Rc::new(callback));

        info!(%combination, %id, "shortcut registered");
        Ok(Registration::Bound(id))
    }

    /// Whether a callback is registered for `modifiers + key`
    pub fn is_registered(&self, modifiers: Modifiers, key: KeyCode) -> bool {
        self.callbacks
            .borrow()
            .contains_key(&CombinationKey::new(modifiers, key))
    }

    /// Number of registered combinations
    pub fn len(&self) -> usize {
        self.callbacks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Release every OS binding and destroy the endpoint
    ///
    /// Safe to call more than once. Does not interrupt a callback that is
    /// already running.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        let released = match self.source.open_endpoint() {
            Some(endpoint) => self.registry.unregister_all(endpoint),
            None => 0,
        };
        self.source.close();
        self.callbacks.borrow_mut().clear();

        info!(released, "shortcut manager disposed");
    }
}

impl<E: Endpoint> Drop for ShortcutManager<E> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn dispatch(callbacks: &CallbackTable, event: HotkeyEvent) {
    let combination = event.combination();
    // Clone out so the callback can register further shortcuts
    let callback = callbacks.borrow().get(&combination).cloned();

    match callback {
        Some(callback) => {
            debug!(%combination, "shortcut fired");
            callback();
        }
        None => debug!(%combination, "unregistered shortcut fired, ignoring"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::testing::FakeEndpoint;
    use std::cell::Cell;

    const ALT_WIN: Modifiers = Modifiers::ALT.union(Modifiers::META);

    fn counter() -> (Rc<Cell<u32>>, impl Fn() + 'static) {
        let count = Rc::new(Cell::new(0));
        let handle = Rc::clone(&count);
        (count, move || handle.set(handle.get() + 1))
    }

    fn manager() -> (ShortcutManager<FakeEndpoint>, FakeEndpoint) {
        let fake = FakeEndpoint::new();
        (ShortcutManager::new(fake.clone()), fake)
    }

    #[test]
    fn test_first_registration_opens_endpoint() {
        let (mut manager, fake) = manager();
        assert_eq!(fake.opened(), 0);

        manager.register(ALT_WIN, KeyCode::RIGHT, || {}).unwrap();
        manager.register(ALT_WIN, KeyCode::LEFT, || {}).unwrap();
        assert_eq!(fake.opened(), 1);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_routes_each_combination_to_its_callback() {
        let (mut manager, fake) = manager();
        let (right, on_right) = counter();
        let (left, on_left) = counter();

        manager.register(ALT_WIN, KeyCode::RIGHT, on_right).unwrap();
        manager.register(ALT_WIN, KeyCode::LEFT, on_left).unwrap();

        fake.fire(ALT_WIN, KeyCode::RIGHT);
        assert_eq!((right.get(), left.get()), (1, 0));

        fake.fire(ALT_WIN, KeyCode::LEFT);
        assert_eq!((right.get(), left.get()), (1, 1));

        // Never registered
        fake.fire(ALT_WIN, KeyCode::UP);
        assert_eq!((right.get(), left.get()), (1, 1));
    }

    #[test]
    fn test_duplicate_keeps_first_callback() {
        let (mut manager, fake) = manager();
        let (first, on_first) = counter();
        let (second, on_second) = counter();

        let a = manager.register(ALT_WIN, KeyCode::RIGHT, on_first).unwrap();
        let b = manager.register(ALT_WIN, KeyCode::RIGHT, on_second).unwrap();

        assert!(matches!(a, Registration::Bound(id) if id.get() == 1));
        assert_eq!(b, Registration::AlreadyRegistered);
        assert_eq!(manager.len(), 1);
        assert_eq!(fake.bound_ids(), vec![1]);

        fake.fire(ALT_WIN, KeyCode::RIGHT);
        fake.fire(ALT_WIN, KeyCode::RIGHT);
        assert_eq!(first.get(), 2);
        assert_eq!(second.get(), 0);
    }

    #[test]
    fn test_duplicates_consume_no_ids() {
        let (mut manager, fake) = manager();

        manager.register(Modifiers::CONTROL, KeyCode::F1, || {}).unwrap();
        manager.register(Modifiers::CONTROL, KeyCode::F1, || {}).unwrap();
        let next = manager.register(Modifiers::SHIFT, KeyCode::F1, || {}).unwrap();

        assert!(matches!(next, Registration::Bound(id) if id.get() == 2));
        let bound = fake.bound();
        assert_eq!(bound[1].1, CombinationKey::new(Modifiers::SHIFT, KeyCode::F1));
    }

    #[test]
    fn test_refused_registration_leaves_table_unchanged() {
        let (mut manager, fake) = manager();
        fake.refuse(CombinationKey::new(ALT_WIN, KeyCode::UP));
        let (count, on_up) = counter();

        let err = manager.register(ALT_WIN, KeyCode::UP, on_up).unwrap_err();
        assert!(matches!(err, HotkeyError::Registration { .. }));
        assert!(!manager.is_registered(ALT_WIN, KeyCode::UP));

        fake.fire(ALT_WIN, KeyCode::UP);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        let (mut manager, fake) = manager();
        manager.register(ALT_WIN, KeyCode::RIGHT, || {}).unwrap();

        fake.fire(Modifiers::empty(), KeyCode(0x41));
        fake.fire_raw(-1);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_dispose_releases_and_silences() {
        let (mut manager, fake) = manager();
        let (count, on_fire) = counter();
        manager.register(ALT_WIN, KeyCode::RIGHT, on_fire).unwrap();
        manager.register(ALT_WIN, KeyCode::LEFT, || {}).unwrap();

        manager.dispose();
        assert!(manager.is_disposed());
        assert_eq!(fake.released_ids(), vec![2, 1]);
        assert_eq!(fake.closed(), 1);

        fake.fire(ALT_WIN, KeyCode::RIGHT);
        assert_eq!(count.get(), 0);

        // Second dispose does not release again
        manager.dispose();
        assert_eq!(fake.released_ids(), vec![2, 1]);
        assert_eq!(fake.closed(), 1);
    }

    #[test]
    fn test_stray_modifier_bits_still_dispatch() {
        let (mut manager, fake) = manager();
        let (hits, on_fire) = counter();

        let noisy = Modifiers::from_bits_retain(0x4001);
        let outcome = manager.register(noisy, KeyCode::RIGHT, on_fire).unwrap();
        assert!(matches!(outcome, Registration::Bound(id) if id.get() == 1));
        assert_eq!(
            fake.bound()[0].1,
            CombinationKey::new(Modifiers::ALT, KeyCode::RIGHT)
        );
        assert!(manager.is_registered(Modifiers::ALT, KeyCode::RIGHT));

        fake.fire_raw((0x27 << 16) | 0x4001);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_wide_key_code_is_rejected() {
        let (mut manager, fake) = manager();

        let err = manager
            .register(Modifiers::ALT, KeyCode(0x1_0027), || {})
            .unwrap_err();
        assert!(matches!(err, HotkeyError::Registration { .. }));
        assert!(manager.is_empty());
        assert!(fake.bound_ids().is_empty());

        // No id was spent on the rejected key
        let next = manager.register(Modifiers::ALT, KeyCode::RIGHT, || {}).unwrap();
        assert!(matches!(next, Registration::Bound(id) if id.get() == 1));
    }

    #[test]
    fn test_no_callback_after_dispose_when_endpoint_keeps_delivering() {
        let (mut manager, fake) = manager();
        fake.keep_sink_on_close();
        let (count, on_fire) = counter();
        manager.register(ALT_WIN, KeyCode::RIGHT, on_fire).unwrap();

        fake.fire(ALT_WIN, KeyCode::RIGHT);
        manager.dispose();
        fake.fire(ALT_WIN, KeyCode::RIGHT);

        assert_eq!(count.get(), 1);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_register_after_dispose_is_rejected() {
        let (mut manager, fake) = manager();
        manager.dispose();

        let err = manager.register(ALT_WIN, KeyCode::RIGHT, || {}).unwrap_err();
        assert!(matches!(err, HotkeyError::Disposed));
        assert_eq!(fake.opened(), 0);
    }

    #[test]
    fn test_drop_disposes() {
        let fake = FakeEndpoint::new();
        {
            let mut manager = ShortcutManager::new(fake.clone());
            manager.register(ALT_WIN, KeyCode::RIGHT, || {}).unwrap();
        }
        assert_eq!(fake.released_ids(), vec![1]);
        assert_eq!(fake.closed(), 1);
    }

    #[test]
    fn test_callback_may_reenter_dispatch() {
        let (mut manager, fake) = manager();
        let (count, on_left) = counter();
        manager.register(ALT_WIN, KeyCode::LEFT, on_left).unwrap();

        let inner = fake.clone();
        manager
            .register(ALT_WIN, KeyCode::RIGHT, move || inner.fire(ALT_WIN, KeyCode::LEFT))
            .unwrap();

        fake.fire(ALT_WIN, KeyCode::RIGHT);
        assert_eq!(count.get(), 1);
    }
}
