//! Best-effort callback lists.
//!
//! A panicking callback is logged and skipped; the remaining callbacks still
//! run and the panic never reaches the caller of [`Listeners::notify`].

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(0);

/// Handle returned when subscribing, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

type Callback<E> = Box<dyn FnMut(&E)>;

/// An ordered list of callbacks receiving `&E`.
pub struct Listeners<E> {
    entries: Vec<(ListenerId, Callback<E>)>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<E> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. Callbacks run in subscription order.
    pub fn subscribe(&mut self, callback: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId::next();
        self.entries.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback. Returns false if it was not registered here.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    /// Call every listener with `event`, returning how many panicked.
    pub fn notify(&mut self, event: &E) -> usize {
        let mut failures = 0;
        for (id, callback) in &mut self.entries {
            let result = panic::catch_unwind(AssertUnwindSafe(|| callback(event)));
            if let Err(payload) = result {
                failures += 1;
                warn!(listener = ?id, reason = panic_message(&*payload), "listener panicked");
            }
        }
        failures
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic>"
    }
}
