//! Discoverable names of resolved entities.
//!
//! Once resolved, an entity can be found again under its display name with
//! arguments (`get_size<double>`, `ns::A<int,double>::sa<int,double,std::string>`),
//! without running deduction again.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use templar_core::split_scope;

use crate::entity::Entity;

#[derive(Default)]
struct Table {
    by_name: FxHashMap<String, Arc<Entity>>,
    /// Insertion order of `by_name` keys.
    order: Vec<String>,
}

#[derive(Default)]
pub(crate) struct Exposer {
    table: RwLock<Table>,
}

impl Exposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `entity` discoverable under `name`. The first entity exposed
    /// under a name keeps it.
    pub fn expose(&self, name: &str, entity: &Arc<Entity>) -> Arc<Entity> {
        if let Some(existing) = self.get(name) {
            return existing;
        }
        let mut table = self.table.write();
        if let Some(existing) = table.by_name.get(name) {
            return existing.clone();
        }
        table.by_name.insert(name.to_string(), entity.clone());
        table.order.push(name.to_string());
        entity.clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Entity>> {
        self.table.read().by_name.get(name).cloned()
    }

    /// Unqualified names exposed directly within `scope`.
    pub fn names_in(&self, scope: &str) -> Vec<String> {
        let wanted = split_scope(scope);
        self.table
            .read()
            .order
            .iter()
            .filter_map(|name| {
                let mut parts = split_scope(name);
                let last = parts.pop()?;
                (parts == wanted).then_some(last)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.table.read().order.len()
    }
}

impl std::fmt::Debug for Exposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exposer").field("names", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::engine_with;

    #[test]
    fn exposure_is_idempotent_and_scoped() {
        let engine = engine_with("namespace ns { template<class T> struct Box {}; }");
        let first = engine.resolve_class("ns::Box<int>", &[]).unwrap();
        let second = engine.resolve_class("ns::Box<double>", &[]).unwrap();
        let exposer = Exposer::new();

        let kept = exposer.expose("ns::Box<int>", &first);
        assert!(Arc::ptr_eq(&kept, &first));
        let again = exposer.expose("ns::Box<int>", &second);
        assert!(Arc::ptr_eq(&again, &first));
        exposer.expose("ns::Box<double>", &second);

        assert_eq!(exposer.len(), 2);
        assert_eq!(exposer.names_in("ns"), vec!["Box<int>", "Box<double>"]);
        assert!(exposer.names_in("").is_empty());
    }
}
