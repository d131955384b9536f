//! Observer list used for buffer change notification.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// A change listener. Receives the path whose buffer changed.
pub type Listener = dyn Fn(&Path) + Send + Sync;

/// The registered listeners of one [`BufferMap`](crate::BufferMap).
#[derive(Default)]
pub(crate) struct Listeners {
    list: Arc<Mutex<ListenerList>>,
}

#[derive(Default)]
struct ListenerList {
    next_id: u64,
    entries: Vec<(u64, Arc<Listener>)>,
}

impl Listeners {
    pub(crate) fn add(&self, listener: Arc<Listener>) -> Subscription {
        let mut list = lock(&self.list);
        let id = list.next_id;
        list.next_id += 1;
        list.entries.push((id, listener));
        Subscription {
            id,
            list: Arc::downgrade(&self.list),
        }
    }

    /// Invokes every listener registered at the time of the call.
    ///
    /// The list lock is released before any listener runs. A panicking
    /// listener is logged and skipped; the rest still run.
    pub(crate) fn notify(&self, path: &Path) {
        let snapshot: Vec<Arc<Listener>> = lock(&self.list)
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            let result = panic::catch_unwind(AssertUnwindSafe(|| listener(path)));
            if result.is_err() {
                tracing::error!(path = %path.display(), "buffer change listener panicked");
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.list).entries.len()
    }
}

/// Registration guard returned by [`BufferMap::subscribe`](crate::BufferMap::subscribe).
///
/// The listener stays registered for as long as the guard lives. Dropping the
/// guard, or calling [`unsubscribe`](Self::unsubscribe), removes it.
#[must_use = "dropping a Subscription immediately unsubscribes its listener"]
pub struct Subscription {
    id: u64,
    list: Weak<Mutex<ListenerList>>,
}

impl Subscription {
    /// Removes the listener. Equivalent to dropping the guard.
    pub fn unsubscribe(self) {}

    /// Returns `true` while the listener is still registered.
    pub fn is_active(&self) -> bool {
        let Some(list) = self.list.upgrade() else {
            return false;
        };
        let registered = lock(&list).entries.iter().any(|(id, _)| *id == self.id);
        registered
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(list) = self.list.upgrade() {
            lock(&list).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
