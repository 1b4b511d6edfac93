//! Change notification fan-out for the extension registry.

use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Mutex, Weak},
};

use tracing::{debug, warn};

/// Callback invoked after every registry change.
pub type ObserverFn = dyn Fn() -> anyhow::Result<()> + Send + Sync;

/// Handle identifying one registration in an [`ObserverHub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

#[derive(Default)]
struct HubInner {
    next_id: u64,
    observers: Vec<(ObserverId, Arc<ObserverFn>)>,
}

/// Holds registered observers and invokes them on [`ObserverHub::notify`].
///
/// Observers run synchronously on the notifying thread, in registration
/// order, over a snapshot taken when the pass starts. Each registration is
/// separate: adding the same closure twice means it runs twice per change.
#[derive(Default)]
pub struct ObserverHub {
    inner: Mutex<HubInner>,
}

impl ObserverHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `observer` and return the id used to remove it.
    pub fn add_observer<F>(&self, observer: F) -> ObserverId
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let id = ObserverId(inner.next_id);
        inner.next_id += 1;
        inner.observers.push((id, Arc::new(observer)));
        debug!(%id, "observer registered");
        id
    }

    /// Remove a registration. Returns `false` if it was already gone.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let before = inner.observers.len();
        inner.observers.retain(|(existing, _)| *existing != id);
        before != inner.observers.len()
    }

    /// Register `observer` and return a handle that can unsubscribe it later.
    pub fn subscribe<F>(self: &Arc<Self>, observer: F) -> Subscription
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.add_observer(observer);
        Subscription {
            hub: Arc::downgrade(self),
            id,
        }
    }

    /// Invoke every observer registered when the pass starts.
    ///
    /// A failing or panicking observer is logged and skipped; the rest still
    /// run. Returns the number of observers that failed.
    pub fn notify(&self) -> usize {
        let snapshot: Vec<(ObserverId, Arc<ObserverFn>)> = {
            let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.observers.clone()
        };

        let mut failures = 0;
        for (id, observer) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| observer())) {
                Ok(Ok(())) => {},
                Ok(Err(e)) => {
                    failures += 1;
                    warn!(%id, error = %e, "manifest observer failed");
                },
                Err(_) => {
                    failures += 1;
                    warn!(%id, "manifest observer panicked");
                },
            }
        }
        failures
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .observers
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A live registration returned by [`ObserverHub::subscribe`].
///
/// Dropping the handle keeps the observer registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    hub: Weak<ObserverHub>,
    id: ObserverId,
}

impl Subscription {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Remove the observer. Safe to call after the hub is gone.
    pub fn unsubscribe(self) -> bool {
        self.hub
            .upgrade()
            .is_some_and(|hub| hub.remove_observer(self.id))
    }
}
