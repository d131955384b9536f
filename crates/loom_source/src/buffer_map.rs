//! Authoritative in-memory map of every source buffer in a session.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::buffer::Buffer;
use crate::listeners::{Listeners, Subscription};

/// Content and dirty flag of one buffer.
struct Entry {
    content: String,
    dirty: bool,
}

/// The buffer store, owning the canonical text of every file to compile.
///
/// Content here is decoupled from disk: `load` hydrates a buffer without
/// counting as a change, while `set` and `remove` mark state changes and
/// notify subscribers with the affected path. Operations take `&self` so a
/// map can be shared as `Arc<BufferMap>` between an editor front end and the
/// recompile pipeline.
///
/// The internal lock is released before listeners run, so a listener may
/// call back into the map.
pub struct BufferMap {
    entries: Mutex<BTreeMap<PathBuf, Entry>>,
    listeners: Listeners,
}

impl BufferMap {
    /// Creates an empty buffer map.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            listeners: Listeners::default(),
        }
    }

    /// Returns the content of the buffer at `path`, if any.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.lock()
            .get(path.as_ref())
            .map(|entry| entry.content.clone())
    }

    /// Returns a full snapshot of the buffer at `path`, if any.
    pub fn buffer(&self, path: impl AsRef<Path>) -> Option<Buffer> {
        let path = path.as_ref();
        self.lock().get(path).map(|entry| Buffer {
            path: path.to_path_buf(),
            content: entry.content.clone(),
            dirty: entry.dirty,
        })
    }

    /// Stores `content` at `path`, marks it dirty and notifies subscribers.
    ///
    /// Setting content identical to what is stored is a complete no-op: the
    /// dirty flag is left alone and no one is notified. Returns `true` if the
    /// buffer changed.
    pub fn set(&self, path: impl Into<PathBuf>, content: impl Into<String>) -> bool {
        let path = path.into();
        let content = content.into();
        {
            let mut entries = self.lock();
            match entries.get_mut(&path) {
                Some(entry) if entry.content == content => return false,
                Some(entry) => {
                    entry.content = content;
                    entry.dirty = true;
                }
                None => {
                    entries.insert(
                        path.clone(),
                        Entry {
                            content,
                            dirty: true,
                        },
                    );
                }
            }
        }
        tracing::trace!(path = %path.display(), "buffer set");
        self.listeners.notify(&path);
        true
    }

    /// Hydrates `path` with `content` without marking it dirty or notifying.
    ///
    /// Used for the initial population from disk, which is not a change. An
    /// existing buffer is overwritten and left clean.
    pub fn load(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.lock().insert(
            path.into(),
            Entry {
                content: content.into(),
                dirty: false,
            },
        );
    }

    /// Deletes the buffer at `path`.
    ///
    /// Subscribers are notified only if a buffer existed. Returns `true` if
    /// one was removed.
    pub fn remove(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let removed = self.lock().remove(path).is_some();
        if removed {
            tracing::trace!(path = %path.display(), "buffer removed");
            self.listeners.notify(path);
        }
        removed
    }

    /// Returns a snapshot of every path and its content, ordered by path.
    pub fn get_all(&self) -> BTreeMap<PathBuf, String> {
        self.lock()
            .iter()
            .map(|(path, entry)| (path.clone(), entry.content.clone()))
            .collect()
    }

    /// Returns every known path, ordered.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().keys().cloned().collect()
    }

    /// Returns `true` if a buffer exists at `path`.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.lock().contains_key(path.as_ref())
    }

    /// Returns the number of buffers.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if there are no buffers.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns `true` if the buffer at `path` exists and is dirty.
    pub fn is_dirty(&self, path: impl AsRef<Path>) -> bool {
        self.lock()
            .get(path.as_ref())
            .is_some_and(|entry| entry.dirty)
    }

    /// Returns `true` if any buffer is dirty.
    pub fn has_any_dirty(&self) -> bool {
        self.lock().values().any(|entry| entry.dirty)
    }

    /// Returns the paths of all dirty buffers, ordered.
    pub fn dirty_paths(&self) -> Vec<PathBuf> {
        self.lock()
            .iter()
            .filter(|(_, entry)| entry.dirty)
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Clears the dirty flag of the buffer at `path`. Never notifies.
    pub fn mark_clean(&self, path: impl AsRef<Path>) {
        if let Some(entry) = self.lock().get_mut(path.as_ref()) {
            entry.dirty = false;
        }
    }

    /// Clears every dirty flag. Never notifies.
    pub fn mark_all_clean(&self) {
        for entry in self.lock().values_mut() {
            entry.dirty = false;
        }
    }

    /// Removes every buffer without emitting per-path notifications.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Registers `listener` to be called with the affected path on every
    /// `set` or `remove` that changed state.
    ///
    /// A panicking listener does not prevent the others from running.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Path) + Send + Sync + 'static,
    {
        self.listeners.add(Arc::new(listener))
    }

    /// Returns the number of registered listeners.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for BufferMap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BufferMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferMap")
            .field("paths", &self.paths())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
