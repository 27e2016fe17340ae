#[cfg(not(loom))]
use std::sync::{Arc, Mutex};

#[cfg(loom)]
use loom::sync::{Arc, Mutex};

use super::Fifo;

/// An unordered, internally-locked collection of FIFO handles.
///
/// Used by [`Fifo`] to track its mirrored destinations and sources. Safe to
/// mutate and iterate from any thread; iteration and mutation are both
/// serialized by the same lock.
pub(crate) struct BufferList<T> {
    entries: Mutex<Vec<Arc<Fifo<T>>>>,
}

impl<T> BufferList<T> {
    pub fn new() -> BufferList<T> {
        BufferList {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn append(&self, handle: Arc<Fifo<T>>) {
        self.entries.lock().unwrap().push(handle);
    }

    /// A clone of every entry, in append order, taken under one lock acquisition.
    pub fn snapshot(&self) -> Vec<Arc<Fifo<T>>> {
        self.entries.lock().unwrap().clone()
    }

    /// Removes and returns the entry that points at the same FIFO as `target`.
    pub fn pop_identity(&self, target: &Arc<Fifo<T>>) -> Option<Arc<Fifo<T>>> {
        let mut entries = self.entries.lock().unwrap();
        let pos = entries.iter().position(|e| Arc::ptr_eq(e, target))?;
        Some(entries.remove(pos))
    }

    /// Removes and returns every entry.
    pub fn drain(&self) -> Vec<Arc<Fifo<T>>> {
        std::mem::take(&mut *self.entries.lock().unwrap())
    }

    #[cfg(test)]
    pub fn contains(&self, target: &Arc<Fifo<T>>) -> bool {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .any(|e| Arc::ptr_eq(e, target))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}
