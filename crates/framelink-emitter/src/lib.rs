//! Synchronous publish/subscribe with wildcard subscriptions.
//!
//! Handlers are registered per kind or on the wildcard, which sees every
//! kind. [`EventEmitter::emit`] calls kind handlers first, then wildcard
//! handlers, each in registration order.
//!
//! Handlers are identified by pointer: unsubscribing needs the same
//! [`Handler`] (or [`WildcardHandler`]) `Arc` that was subscribed.
//!
//! A panicking handler is not caught; the panic unwinds through `emit`.
//! Handlers may subscribe or unsubscribe while an emit is running. The change
//! takes effect from the next emit, since each emit works on a snapshot.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

/// Handler for one notification kind.
pub type Handler<P> = Arc<dyn Fn(&P) + Send + Sync>;

/// Handler for every notification kind.
pub type WildcardHandler<K, P> = Arc<dyn Fn(&K, &P) + Send + Sync>;

/// Wrap a closure as a [`Handler`].
pub fn handler<P, F>(f: F) -> Handler<P>
where
    F: Fn(&P) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a [`WildcardHandler`].
pub fn wildcard_handler<K, P, F>(f: F) -> WildcardHandler<K, P>
where
    F: Fn(&K, &P) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Subscription table: per-kind handler lists plus the wildcard list.
pub struct HandlerMap<K, P> {
    by_kind: HashMap<K, Vec<Handler<P>>>,
    wildcard: Vec<WildcardHandler<K, P>>,
}

impl<K: Eq + Hash, P> HandlerMap<K, P> {
    pub fn new() -> Self {
        Self {
            by_kind: HashMap::new(),
            wildcard: Vec::new(),
        }
    }

    /// Add a handler for `kind`.
    pub fn on(mut self, kind: K, handler: Handler<P>) -> Self {
        self.by_kind.entry(kind).or_default().push(handler);
        self
    }

    /// Add a wildcard handler.
    pub fn on_all(mut self, handler: WildcardHandler<K, P>) -> Self {
        self.wildcard.push(handler);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.wildcard.is_empty() && self.by_kind.values().all(Vec::is_empty)
    }

    fn extend(&mut self, other: HandlerMap<K, P>) {
        for (kind, handlers) in other.by_kind {
            self.by_kind.entry(kind).or_default().extend(handlers);
        }
        self.wildcard.extend(other.wildcard);
    }
}

impl<K: Eq + Hash, P> Default for HandlerMap<K, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, P> fmt::Debug for HandlerMap<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMap")
            .field("kinds", &self.by_kind.len())
            .field("wildcard", &self.wildcard.len())
            .finish()
    }
}

/// Publish/subscribe hub keyed by notification kind `K` carrying payload `P`.
pub struct EventEmitter<K, P> {
    handlers: Mutex<HandlerMap<K, P>>,
}

impl<K: Eq + Hash + Clone, P> EventEmitter<K, P> {
    pub fn new() -> Self {
        Self::with_handlers(HandlerMap::new())
    }

    /// Create an emitter with handlers already registered.
    pub fn with_handlers(handlers: HandlerMap<K, P>) -> Self {
        Self {
            handlers: Mutex::new(handlers),
        }
    }

    /// Register every handler in `handlers` after the existing ones.
    pub fn extend(&self, handlers: HandlerMap<K, P>) {
        self.lock().extend(handlers);
    }

    /// Register `handler` for `kind`.
    pub fn subscribe(&self, kind: K, handler: Handler<P>) {
        self.lock().by_kind.entry(kind).or_default().push(handler);
    }

    /// Register `handler` for every kind.
    pub fn subscribe_all(&self, handler: WildcardHandler<K, P>) {
        self.lock().wildcard.push(handler);
    }

    /// Remove the first registration of `handler` for `kind`.
    ///
    /// Returns `false` if it was not registered.
    pub fn unsubscribe(&self, kind: &K, handler: &Handler<P>) -> bool {
        let mut handlers = self.lock();
        let Some(list) = handlers.by_kind.get_mut(kind) else {
            return false;
        };
        let Some(index) = list.iter().position(|existing| same_handler(existing, handler)) else {
            return false;
        };
        list.remove(index);
        if list.is_empty() {
            handlers.by_kind.remove(kind);
        }
        true
    }

    /// Remove the first wildcard registration of `handler`.
    pub fn unsubscribe_all(&self, handler: &WildcardHandler<K, P>) -> bool {
        let mut handlers = self.lock();
        match handlers
            .wildcard
            .iter()
            .position(|existing| same_handler(existing, handler))
        {
            Some(index) => {
                handlers.wildcard.remove(index);
                true
            }
            None => false,
        }
    }

    /// Invoke the handlers for `kind`, then the wildcard handlers.
    ///
    /// Returns the number of handlers invoked.
    pub fn emit(&self, kind: &K, payload: &P) -> usize {
        let (specific, wildcard) = {
            let handlers = self.lock();
            let specific: Vec<Handler<P>> =
                handlers.by_kind.get(kind).cloned().unwrap_or_default();
            (specific, handlers.wildcard.clone())
        };

        trace!(
            specific = specific.len(),
            wildcard = wildcard.len(),
            "emitting event"
        );

        for handler in &specific {
            handler(payload);
        }
        for handler in &wildcard {
            handler(kind, payload);
        }
        specific.len() + wildcard.len()
    }

    /// Drop every registration.
    pub fn clear(&self) {
        let mut handlers = self.lock();
        handlers.by_kind.clear();
        handlers.wildcard.clear();
    }

    /// Number of handlers registered for exactly `kind`.
    pub fn handler_count(&self, kind: &K) -> usize {
        self.lock().by_kind.get(kind).map_or(0, Vec::len)
    }

    /// Number of wildcard handlers.
    pub fn wildcard_count(&self) -> usize {
        self.lock().wildcard.len()
    }

    fn lock(&self) -> MutexGuard<'_, HandlerMap<K, P>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K: Eq + Hash + Clone, P> Default for EventEmitter<K, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone, P> fmt::Debug for EventEmitter<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("handlers", &*self.lock())
            .finish()
    }
}

fn same_handler<T: ?Sized>(left: &Arc<T>, right: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(left), Arc::as_ptr(right))
}
