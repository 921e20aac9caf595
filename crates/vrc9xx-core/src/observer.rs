// ── Observer registry ──
//
// Per-facility list of (quantity, callback, last delivered value). Owned
// exclusively by the poller actor; callbacks run on the actor task and
// must not block.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::model::{Change, Facility, ObservedValue, Quantity};

/// Observer callback. Invoked with `{current, previous}` on every change.
pub type Callback = Box<dyn FnMut(Change) + Send>;

/// Opaque handle returned by `subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Observer {
    id: SubscriptionId,
    quantity: Quantity,
    callback: Callback,
    value: Option<ObservedValue>,
    /// The quantity stopped resolving; reset when it resolves again.
    missing: bool,
}

#[derive(Default)]
pub struct ObserverRegistry {
    next_id: u64,
    observers: HashMap<String, Vec<Observer>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer whose last known value is `current`.
    pub fn register(
        &mut self,
        serial: &str,
        quantity: Quantity,
        callback: Callback,
        current: Option<ObservedValue>,
    ) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        debug!(%serial, %quantity, subscription = %id, "observer registered");
        self.observers
            .entry(serial.to_owned())
            .or_default()
            .push(Observer {
                id,
                quantity,
                callback,
                missing: current.is_none(),
                value: current,
            });
        id
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        for observers in self.observers.values_mut() {
            if let Some(pos) = observers.iter().position(|o| o.id == id) {
                observers.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn len(&self) -> usize {
        self.observers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver the subscription replay `{current, previous: None}`.
    ///
    /// Returns `false` if the observer was removed in the meantime.
    pub fn replay(&mut self, id: SubscriptionId, current: Option<ObservedValue>) -> bool {
        let Some(observer) = self
            .observers
            .values_mut()
            .flat_map(|observers| observers.iter_mut())
            .find(|o| o.id == id)
        else {
            return false;
        };
        (observer.callback)(Change {
            current,
            previous: None,
        });
        true
    }

    /// Compare every observer of `facility` against its stored value and
    /// invoke the callbacks whose value changed (all of them if `force`).
    ///
    /// Returns the number of callbacks fired.
    pub fn notify(&mut self, facility: &Facility, force: bool) -> usize {
        let serial = facility.serial();
        let Some(observers) = self.observers.get_mut(serial) else {
            return 0;
        };

        let mut fired = 0;
        for observer in observers.iter_mut() {
            let Some(current) = observer.quantity.read(facility) else {
                if !observer.missing {
                    observer.missing = true;
                    warn!(
                        %serial,
                        quantity = %observer.quantity,
                        "observed value no longer present, skipping"
                    );
                }
                continue;
            };
            observer.missing = false;

            if force || observer.value.as_ref() != Some(&current) {
                let previous = observer.value.take();
                (observer.callback)(Change {
                    current: Some(current.clone()),
                    previous,
                });
                observer.value = Some(current);
                fired += 1;
            }
        }
        fired
    }
}
