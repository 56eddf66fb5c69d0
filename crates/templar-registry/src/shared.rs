//! Snapshot-consistent access to a store that keeps growing.
//!
//! Readers take an `Arc` snapshot and resolve against it for the whole
//! call; registration builds the next store off to the side and swaps it
//! in, so a snapshot never observes a half-registered source text.

use std::sync::Arc;

use parking_lot::RwLock;
use templar_core::RegistrationError;
use templar_core::decl::Declaration;

use crate::DeclarationStore;

#[derive(Debug, Default)]
pub struct SharedStore {
    current: RwLock<Arc<DeclarationStore>>,
}

impl SharedStore {
    pub fn new(store: DeclarationStore) -> Self {
        Self {
            current: RwLock::new(Arc::new(store)),
        }
    }

    /// The store as of now. Later registrations do not affect it.
    pub fn snapshot(&self) -> Arc<DeclarationStore> {
        self.current.read().clone()
    }

    /// Register `text`; concurrent registrations are serialized.
    pub fn register_source(&self, text: &str) -> Result<Vec<Arc<Declaration>>, RegistrationError> {
        let mut current = self.current.write();
        let (next, added) = current.with_source(text)?;
        *current = Arc::new(next);
        Ok(added)
    }

    pub fn generation(&self) -> u64 {
        self.current.read().generation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_do_not_see_later_registrations() {
        let shared = SharedStore::default();
        shared.register_source("int first();").unwrap_or_else(|e| panic!("{e}"));
        let before = shared.snapshot();
        shared.register_source("int second();").unwrap_or_else(|e| panic!("{e}"));

        assert!(before.lookup("second", &[] as &[&str]).is_empty());
        assert_eq!(shared.snapshot().lookup("second", &[] as &[&str]).len(), 1);
        assert_eq!(shared.generation(), 2);
    }

    #[test]
    fn failed_registration_keeps_current_store() {
        let shared = SharedStore::default();
        shared.register_source("int keep();").unwrap_or_else(|e| panic!("{e}"));
        assert!(shared.register_source("int broken(;").is_err());
        assert_eq!(shared.generation(), 1);
        assert_eq!(shared.snapshot().lookup("keep", &[] as &[&str]).len(), 1);
    }

    #[test]
    fn concurrent_registration_is_serialized() {
        let shared = Arc::new(SharedStore::default());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || shared.register_source(&format!("int f{i}();")).is_ok())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap_or(false));
        }
        let snapshot = shared.snapshot();
        for i in 0..4 {
            assert_eq!(snapshot.lookup(&format!("f{i}"), &[] as &[&str]).len(), 1);
        }
    }
}
