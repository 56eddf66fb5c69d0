//! Declaration store for the templar engine.
//!
//! Declarations arrive as source text, are parsed by `templar-parser`, and
//! are stored per namespace in a [`ScopeTree`]. The store answers scoped
//! name lookups, hands out specializations per primary template, and keeps
//! the explicit-instantiation records. [`SharedStore`] adds snapshot
//! semantics on top for concurrent use.
//!
//! ```
//! use templar_registry::DeclarationStore;
//!
//! let mut store = DeclarationStore::new();
//! store.register_source("namespace ns { template<class T> T twice(T x); }").unwrap();
//! assert_eq!(store.lookup("twice", &["ns"]).len(), 1);
//! ```

mod prelude;
mod scope_tree;
mod shared;
mod store;

pub use prelude::PRELUDE;
pub use scope_tree::{EnumeratorEntry, ResolutionResult, ScopeData, ScopeEdge, ScopeTree};
pub use shared::SharedStore;
pub use store::{DeclarationStore, specificity};

pub use petgraph::graph::NodeIndex;
