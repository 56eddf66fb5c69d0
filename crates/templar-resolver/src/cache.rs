//! Instantiation cache.
//!
//! Maps an [`InstantiationKey`] to the entity created for it. The first
//! caller for a key creates the entity while later callers for the same key
//! block on the slot and receive the same `Arc`; callers for different keys
//! only share the short critical section that finds or inserts a slot.
//!
//! A failed creation is delivered to every waiter and the slot is removed,
//! so a later call may try again. Successful entries are never evicted.

use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use templar_core::{InstantiationKey, ResolutionError};
use tracing::trace;

enum SlotState<V> {
    Pending(ThreadId),
    Ready(Arc<V>),
    Failed(ResolutionError),
}

struct Slot<V> {
    state: Mutex<SlotState<V>>,
    settled: Condvar,
}

impl<V> Slot<V> {
    fn pending() -> Self {
        Self {
            state: Mutex::new(SlotState::Pending(thread::current().id())),
            settled: Condvar::new(),
        }
    }
}

/// Process-wide deduplication of instantiations.
pub struct InstantiationCache<V> {
    slots: Mutex<FxHashMap<InstantiationKey, Arc<Slot<V>>>>,
}

impl<V> Default for InstantiationCache<V> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(FxHashMap::default()),
        }
    }
}

impl<V> std::fmt::Debug for InstantiationCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstantiationCache").field("slots", &self.slots.lock().len()).finish()
    }
}

impl<V> InstantiationCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entity for `key` if it has been created.
    pub fn get(&self, key: &InstantiationKey) -> Option<Arc<V>> {
        let slot = self.slots.lock().get(key).cloned()?;
        let state = slot.state.lock();
        match &*state {
            SlotState::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Return the entity for `key`, creating it with `create` if no caller
    /// has done so yet.
    ///
    /// Re-entering for a key whose creation is in progress on the same
    /// thread fails with [`ResolutionError::RecursiveInstantiation`].
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn get_or_create<F>(&self, key: &InstantiationKey, create: F) -> Result<Arc<V>, ResolutionError>
    where
        F: FnOnce() -> Result<V, ResolutionError>,
    {
        let existing = {
            let mut slots = self.slots.lock();
            match slots.get(key) {
                Some(slot) => Some(slot.clone()),
                None => {
                    slots.insert(key.clone(), Arc::new(Slot::pending()));
                    None
                }
            }
        };

        if let Some(slot) = existing {
            let mut state = slot.state.lock();
            loop {
                match &*state {
                    SlotState::Ready(value) => {
                        trace!(key = %key, "instantiation cache hit");
                        return Ok(value.clone());
                    }
                    SlotState::Failed(err) => return Err(err.clone()),
                    SlotState::Pending(owner) if *owner == thread::current().id() => {
                        return Err(ResolutionError::RecursiveInstantiation { key: key.to_string() });
                    }
                    SlotState::Pending(_) => slot.settled.wait(&mut state),
                }
            }
        }

        let mut guard = CreationGuard {
            cache: self,
            key,
            settled: false,
        };
        let outcome = create().map(Arc::new);
        guard.settle(match &outcome {
            Ok(value) => SlotState::Ready(value.clone()),
            Err(err) => SlotState::Failed(err.clone()),
        });
        outcome
    }

    /// Number of created entities.
    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every created entity, in no particular order.
    pub fn values(&self) -> Vec<Arc<V>> {
        let slots: Vec<Arc<Slot<V>>> = self.slots.lock().values().cloned().collect();
        slots
            .iter()
            .filter_map(|slot| match &*slot.state.lock() {
                SlotState::Ready(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Settles the creator's slot, also when `create` unwinds.
struct CreationGuard<'a, V> {
    cache: &'a InstantiationCache<V>,
    key: &'a InstantiationKey,
    settled: bool,
}

impl<V> CreationGuard<'_, V> {
    fn settle(&mut self, state: SlotState<V>) {
        self.settled = true;
        let failed = matches!(state, SlotState::Failed(_));
        let mut slots = self.cache.slots.lock();
        let Some(slot) = slots.get(self.key).cloned() else {
            return;
        };
        if failed {
            slots.remove(self.key);
        }
        drop(slots);
        *slot.state.lock() = state;
        slot.settled.notify_all();
    }
}

impl<V> Drop for CreationGuard<'_, V> {
    fn drop(&mut self) {
        if !self.settled {
            self.settle(SlotState::Failed(ResolutionError::Internal(format!(
                "instantiation of '{}' panicked",
                self.key
            ))));
        }
    }
}
