//! Named-event fan-out for watch mode.
//!
//! Listeners are registered per event name and invoked synchronously by
//! [`EventTarget::dispatch`].
//!
//! # Snapshot Semantics
//!
//! Dispatch copies the listener list before invoking anything, so a
//! listener that adds or removes listeners only affects later dispatches.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A registered listener.
///
/// Identity is the `Arc` allocation: pass a clone of the same `Arc` to
/// [`EventTarget::remove_listener`] to unregister it.
pub type Listener<T> = Arc<dyn Fn(&CustomEvent<T>) + Send + Sync>;

/// An event carrying a typed `detail` payload.
#[derive(Debug)]
pub struct CustomEvent<T> {
    kind: String,
    detail: T,
    cancelable: bool,
    default_prevented: AtomicBool,
}

impl<T> CustomEvent<T> {
    /// Creates a non-cancelable event.
    #[must_use]
    pub fn new(kind: impl Into<String>, detail: T) -> Self {
        Self {
            kind: kind.into(),
            detail,
            cancelable: false,
            default_prevented: AtomicBool::new(false),
        }
    }

    /// Creates a cancelable event.
    #[must_use]
    pub fn cancelable(kind: impl Into<String>, detail: T) -> Self {
        Self {
            cancelable: true,
            ..Self::new(kind, detail)
        }
    }

    /// Event name.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Event payload.
    #[must_use]
    pub fn detail(&self) -> &T {
        &self.detail
    }

    /// Consumes the event, returning its payload.
    #[must_use]
    pub fn into_detail(self) -> T {
        self.detail
    }

    /// Suppresses the default action. No-op for non-cancelable events.
    pub fn prevent_default(&self) {
        if self.cancelable {
            self.default_prevented.store(true, Ordering::Release);
        }
    }

    /// Returns `true` if a listener suppressed the default action.
    #[must_use]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.load(Ordering::Acquire)
    }
}

/// Minimal named-event pub/sub.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use weft_event::{CustomEvent, EventTarget, Listener};
///
/// let target = EventTarget::<u32>::new();
/// let seen = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&seen);
/// let listener: Listener<u32> = Arc::new(move |e: &CustomEvent<u32>| {
///     counter.fetch_add(*e.detail() as usize, Ordering::SeqCst);
/// });
///
/// target.add_listener("build", Arc::clone(&listener));
/// assert!(target.dispatch(&CustomEvent::new("build", 5)));
/// target.remove_listener("build", &listener);
/// target.dispatch(&CustomEvent::new("build", 5));
///
/// assert_eq!(seen.load(Ordering::SeqCst), 5);
/// ```
pub struct EventTarget<T> {
    listeners: Mutex<HashMap<String, Vec<Listener<T>>>>,
}

impl<T> EventTarget<T> {
    /// Creates a target with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
        }
    }

    /// Appends a listener for `kind`.
    ///
    /// Registering the same listener twice makes it fire twice.
    pub fn add_listener(&self, kind: impl Into<String>, listener: Listener<T>) {
        self.listeners
            .lock()
            .entry(kind.into())
            .or_default()
            .push(listener);
    }

    /// Removes the first registration of `listener` for `kind`.
    ///
    /// Unknown kinds and unregistered listeners are ignored.
    pub fn remove_listener(&self, kind: &str, listener: &Listener<T>) {
        let mut listeners = self.listeners.lock();
        let Some(stack) = listeners.get_mut(kind) else {
            return;
        };
        if let Some(pos) = stack.iter().position(|l| same_listener(l, listener)) {
            stack.remove(pos);
        }
    }

    /// Invokes every listener registered for the event's kind, in
    /// registration order.
    ///
    /// Returns `false` only if a listener called
    /// [`CustomEvent::prevent_default`] on a cancelable event.
    pub fn dispatch(&self, event: &CustomEvent<T>) -> bool {
        let snapshot: Vec<Listener<T>> = {
            let listeners = self.listeners.lock();
            match listeners.get(event.kind()) {
                Some(stack) => stack.clone(),
                None => return true,
            }
        };

        for listener in snapshot {
            listener(event);
        }
        !event.default_prevented()
    }

    /// Number of listeners registered for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: &str) -> usize {
        self.listeners.lock().get(kind).map_or(0, Vec::len)
    }
}

impl<T> Default for EventTarget<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn same_listener<T>(a: &Listener<T>, b: &Listener<T>) -> bool {
    // Compare data pointers only; vtable pointers are not unique.
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;

    fn recorder(log: &Arc<PlMutex<Vec<String>>>, tag: &str) -> Listener<u32> {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        Arc::new(move |e: &CustomEvent<u32>| {
            log.lock().push(format!("{tag}:{}", e.detail()));
        })
    }

    #[test]
    fn dispatch_without_listeners_returns_true() {
        let target = EventTarget::<u32>::new();
        assert!(target.dispatch(&CustomEvent::new("build", 1)));
    }

    #[test]
    fn dispatch_in_registration_order() {
        let log = Arc::new(PlMutex::new(Vec::new()));
        let target = EventTarget::new();
        target.add_listener("build", recorder(&log, "a"));
        target.add_listener("build", recorder(&log, "b"));
        target.add_listener("other", recorder(&log, "c"));

        target.dispatch(&CustomEvent::new("build", 7));

        assert_eq!(*log.lock(), vec!["a:7", "b:7"]);
    }

    #[test]
    fn remove_only_first_matching_registration() {
        let log = Arc::new(PlMutex::new(Vec::new()));
        let target = EventTarget::new();
        let listener = recorder(&log, "x");
        target.add_listener("build", Arc::clone(&listener));
        target.add_listener("build", Arc::clone(&listener));

        target.remove_listener("build", &listener);
        assert_eq!(target.listener_count("build"), 1);

        target.dispatch(&CustomEvent::new("build", 1));
        assert_eq!(*log.lock(), vec!["x:1"]);
    }

    #[test]
    fn remove_unknown_is_noop() {
        let log = Arc::new(PlMutex::new(Vec::new()));
        let target = EventTarget::new();
        let listener = recorder(&log, "x");
        target.remove_listener("missing", &listener);
        target.add_listener("build", recorder(&log, "y"));
        target.remove_listener("build", &listener);
        assert_eq!(target.listener_count("build"), 1);
    }

    #[test]
    fn listener_added_during_dispatch_waits_for_next_pass() {
        let log = Arc::new(PlMutex::new(Vec::new()));
        let target = Arc::new(EventTarget::<u32>::new());

        let late = recorder(&log, "late");
        let weak = Arc::downgrade(&target);
        let adder: Listener<u32> = Arc::new(move |_: &CustomEvent<u32>| {
            if let Some(t) = weak.upgrade() {
                t.add_listener("build", Arc::clone(&late));
            }
        });
        target.add_listener("build", adder);

        target.dispatch(&CustomEvent::new("build", 1));
        assert!(log.lock().is_empty());

        target.dispatch(&CustomEvent::new("build", 2));
        assert_eq!(*log.lock(), vec!["late:2"]);
    }

    #[test]
    fn listener_removed_during_dispatch_still_runs_this_pass() {
        let log = Arc::new(PlMutex::new(Vec::new()));
        let target = Arc::new(EventTarget::<u32>::new());
        let victim = recorder(&log, "victim");

        let weak = Arc::downgrade(&target);
        let victim_ref = Arc::clone(&victim);
        let remover: Listener<u32> = Arc::new(move |_: &CustomEvent<u32>| {
            if let Some(t) = weak.upgrade() {
                t.remove_listener("build", &victim_ref);
            }
        });
        target.add_listener("build", remover);
        target.add_listener("build", victim);

        target.dispatch(&CustomEvent::new("build", 1));
        target.dispatch(&CustomEvent::new("build", 2));

        assert_eq!(*log.lock(), vec!["victim:1"]);
    }

    #[test]
    fn prevent_default_on_cancelable_event() {
        let target = EventTarget::<()>::new();
        target.add_listener("build", Arc::new(|e: &CustomEvent<()>| e.prevent_default()));

        assert!(!target.dispatch(&CustomEvent::cancelable("build", ())));
        assert!(target.dispatch(&CustomEvent::new("build", ())));
    }
}
