//! Coordinator-side bus with synchronous fan-out.

use super::Bus;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;
use weft_event::BusEvent;

/// Callback invoked for each published event.
pub type Subscriber = Arc<dyn Fn(&BusEvent) + Send + Sync>;

/// Handle returned by [`LocalBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Entry {
    id: SubscriptionId,
    once: bool,
    callback: Subscriber,
}

/// In-process bus.
///
/// Subscribers for an event run synchronously, in subscription order, on
/// the publishing thread. The subscriber list is snapshotted before
/// invocation, so a subscriber may subscribe or unsubscribe freely.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use weft_runtime::bus::{Bus, LocalBus};
///
/// let bus = LocalBus::new();
/// assert!(!bus.publish("bundled", vec![]));
///
/// let hits = Arc::new(AtomicUsize::new(0));
/// let h = Arc::clone(&hits);
/// bus.subscribe(
///     "bundled",
///     Arc::new(move |_: &weft_event::BusEvent| {
///         h.fetch_add(1, Ordering::SeqCst);
///     }),
/// );
///
/// assert!(bus.publish("bundled", vec![]));
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// ```
pub struct LocalBus {
    subscribers: Mutex<HashMap<String, Vec<Entry>>>,
    next_id: AtomicU64,
}

impl LocalBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Subscribes to every future publish of `event`.
    pub fn subscribe(&self, event: impl Into<String>, callback: Subscriber) -> SubscriptionId {
        self.insert(event.into(), callback, false)
    }

    /// Subscribes to the next publish of `event` only.
    pub fn once(&self, event: impl Into<String>, callback: Subscriber) -> SubscriptionId {
        self.insert(event.into(), callback, true)
    }

    /// Removes a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        for entries in subscribers.values_mut() {
            if let Some(pos) = entries.iter().position(|e| e.id == id) {
                entries.remove(pos);
                return true;
            }
        }
        false
    }

    /// Number of live subscriptions for `event`.
    #[must_use]
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.subscribers.lock().get(event).map_or(0, Vec::len)
    }

    fn insert(&self, event: String, callback: Subscriber, once: bool) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .entry(event)
            .or_default()
            .push(Entry { id, once, callback });
        id
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for LocalBus {
    fn publish(&self, event: &str, args: Vec<Value>) -> bool {
        let snapshot: Vec<Subscriber> = {
            let mut subscribers = self.subscribers.lock();
            let Some(entries) = subscribers.get_mut(event) else {
                return false;
            };
            let snapshot = entries.iter().map(|e| Arc::clone(&e.callback)).collect();
            entries.retain(|e| !e.once);
            snapshot
        };

        if snapshot.is_empty() {
            return false;
        }

        trace!(event, subscribers = snapshot.len(), "bus publish");
        let event = BusEvent::new(event, args);
        for callback in snapshot {
            callback(&event);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> Subscriber {
        let log = Arc::clone(log);
        Arc::new(move |e: &BusEvent| {
            log.lock().push(format!("{tag}:{}:{}", e.name, Value::Array(e.args.clone())));
        })
    }

    #[test]
    fn publish_without_subscribers_returns_false() {
        let bus = LocalBus::new();
        assert!(!bus.publish("nothing", vec![json!(1)]));
    }

    #[test]
    fn fan_out_in_subscription_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bus = LocalBus::new();
        bus.subscribe("foo", recorder(&log, "a"));
        bus.subscribe("foo", recorder(&log, "b"));
        bus.subscribe("bar", recorder(&log, "c"));

        assert!(bus.publish("foo", vec![json!(1), json!(2)]));

        assert_eq!(*log.lock(), vec!["a:foo:[1,2]", "b:foo:[1,2]"]);
    }

    #[test]
    fn once_fires_a_single_time() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bus = LocalBus::new();
        bus.once("ready", recorder(&log, "once"));

        assert!(bus.publish("ready", vec![]));
        assert!(!bus.publish("ready", vec![]));
        assert_eq!(log.lock().len(), 1);
        assert_eq!(bus.subscriber_count("ready"), 0);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bus = LocalBus::new();
        let id = bus.subscribe("foo", recorder(&log, "a"));

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert!(!bus.publish("foo", vec![]));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn subscriber_may_publish_reentrantly() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bus = Arc::new(LocalBus::new());
        bus.subscribe("inner", recorder(&log, "inner"));

        let weak = Arc::downgrade(&bus);
        bus.subscribe(
            "outer",
            Arc::new(move |_: &BusEvent| {
                if let Some(bus) = weak.upgrade() {
                    bus.publish("inner", vec![]);
                }
            }),
        );

        assert!(bus.publish("outer", vec![]));
        assert_eq!(*log.lock(), vec!["inner:inner:[]"]);
    }
}
