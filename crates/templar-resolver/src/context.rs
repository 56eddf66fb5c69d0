//! Resolution context.
//!
//! [`EngineCore`] is the state shared by every resolution call: the store
//! handle, the instantiation cache, the exposer and a few side tables.
//! A [`ResolutionContext`] is created per call and pins one store snapshot,
//! so a resolution never observes declarations registered after it began.
//!
//! Name lookup inside classes goes through [`ClassFrame`]s: the declaration
//! chosen for a class (primary template or specialization), its resolved
//! template bindings, bases and enclosing frame.

use std::cell::{Cell, OnceCell};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use templar_core::decl::{ClassDecl, Declaration};
use templar_core::{InstantiationKey, KeyArg, ResolutionError, TypeDescriptor, TypeHash};
use templar_registry::{DeclarationStore, SharedStore};

use crate::cache::InstantiationCache;
use crate::config::EngineConfig;
use crate::entity::Entity;
use crate::expose::Exposer;
use crate::instantiator::Instantiator;

/// Template parameter name to bound argument.
pub(crate) type Bindings = FxHashMap<String, KeyArg>;

// ============================================================================
// Shared state
// ============================================================================

/// Where a class identity came from, for classes the store cannot find by
/// id alone (members of template instances, member templates).
#[derive(Debug, Clone)]
pub(crate) struct Origin {
    pub decl: Arc<Declaration>,
    pub parent: Option<Arc<ClassFrame>>,
}

pub(crate) struct EngineCore {
    pub config: EngineConfig,
    pub store: SharedStore,
    pub cache: InstantiationCache<Entity>,
    pub exposer: Exposer,
    pub origins: RwLock<FxHashMap<TypeHash, Origin>>,
    pub reducers: RwLock<FxHashMap<TypeDescriptor, TypeDescriptor>>,
    /// Keys covered by explicit instantiation records, per store generation.
    pub explicit: Mutex<Option<(u64, Arc<FxHashSet<TypeHash>>)>>,
    /// Entities of forward-declared classes, per store generation.
    pub incomplete: RwLock<FxHashMap<InstantiationKey, (u64, Arc<Entity>)>>,
}

impl EngineCore {
    pub fn new(config: EngineConfig, store: DeclarationStore) -> Self {
        Self {
            config,
            store: SharedStore::new(store),
            cache: InstantiationCache::new(),
            exposer: Exposer::new(),
            origins: RwLock::new(FxHashMap::default()),
            reducers: RwLock::new(FxHashMap::default()),
            explicit: Mutex::new(None),
            incomplete: RwLock::new(FxHashMap::default()),
        }
    }
}

// ============================================================================
// Scopes
// ============================================================================

/// Lookup context of a class or class template instance.
#[derive(Debug)]
pub(crate) struct ClassFrame {
    /// The declaration chosen for the class: the primary template, a
    /// specialization, or a plain class.
    pub decl: Arc<Declaration>,
    pub ty: TypeDescriptor,
    pub bindings: Bindings,
    pub parent: Option<Arc<ClassFrame>>,
    /// Enclosing namespace path.
    pub namespace: Vec<String>,
    pub bases: Vec<TypeDescriptor>,
}

impl ClassFrame {
    pub fn identity(&self) -> TypeHash {
        self.ty.class_identity().unwrap_or(self.decl.id)
    }

    pub fn class(&self) -> Option<&ClassDecl> {
        self.decl.as_class()
    }

    /// Neither this class nor an enclosing one is a template instance.
    pub fn is_plain(&self) -> bool {
        self.ty.instance_key().is_none() && self.parent.as_ref().is_none_or(|p| p.is_plain())
    }

    pub fn display(&self) -> String {
        self.ty.to_string()
    }
}

/// Where a spelled name is looked up: a namespace, optionally a class
/// within it, and the template bindings of the innermost template.
#[derive(Debug, Clone, Default)]
pub(crate) struct Scope {
    pub namespace: Vec<String>,
    pub class: Option<Arc<ClassFrame>>,
    pub bindings: Bindings,
}

impl Scope {
    pub fn global() -> Self {
        Self::default()
    }

    pub fn namespace(path: Vec<String>) -> Self {
        Self {
            namespace: path,
            ..Self::default()
        }
    }

    pub fn of_class(frame: &Arc<ClassFrame>) -> Self {
        Self {
            namespace: frame.namespace.clone(),
            class: Some(frame.clone()),
            bindings: Bindings::default(),
        }
    }

    /// Scope of the declaration itself: its namespace and enclosing frame.
    pub fn of_declaration(decl: &Declaration, parent: Option<&Arc<ClassFrame>>) -> Self {
        match parent {
            Some(frame) => Self::of_class(frame),
            None => Self::namespace(decl.scope.clone()),
        }
    }

    pub fn with_bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// The argument bound to a template parameter name, innermost first.
    pub fn binding(&self, name: &str) -> Option<&KeyArg> {
        if let Some(arg) = self.bindings.get(name) {
            return Some(arg);
        }
        let mut frame = self.class.as_deref();
        while let Some(f) = frame {
            if let Some(arg) = f.bindings.get(name) {
                return Some(arg);
            }
            frame = f.parent.as_deref();
        }
        None
    }

    /// Names of every visible pack binding.
    pub fn pack_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut push = |bindings: &Bindings| {
            for (name, arg) in bindings {
                if matches!(arg, KeyArg::Pack(_)) && !names.contains(name) {
                    names.push(name.clone());
                }
            }
        };
        push(&self.bindings);
        let mut frame = self.class.as_deref();
        while let Some(f) = frame {
            push(&f.bindings);
            frame = f.parent.as_deref();
        }
        names
    }

    pub fn describe(&self) -> String {
        match &self.class {
            Some(frame) => frame.display(),
            None if self.namespace.is_empty() => "::".to_string(),
            None => self.namespace.join("::"),
        }
    }
}

// ============================================================================
// Per-call context
// ============================================================================

/// State of one resolution call.
pub(crate) struct ResolutionContext<'e> {
    pub core: &'e EngineCore,
    pub instantiator: &'e dyn Instantiator,
    pub store: Arc<DeclarationStore>,
    depth: Cell<usize>,
    pre_instantiated: OnceCell<Arc<FxHashSet<TypeHash>>>,
    collecting_explicit: Cell<bool>,
}

impl<'e> ResolutionContext<'e> {
    pub fn new(core: &'e EngineCore, instantiator: &'e dyn Instantiator) -> Self {
        Self {
            core,
            instantiator,
            store: core.store.snapshot(),
            depth: Cell::new(0),
            pre_instantiated: OnceCell::new(),
            collecting_explicit: Cell::new(false),
        }
    }

    /// Track nesting of instantiations; fails past the configured depth.
    pub fn enter(&self, key: &InstantiationKey) -> Result<DepthGuard<'_>, ResolutionError> {
        let depth = self.depth.get() + 1;
        if depth > self.core.config.max_depth {
            return Err(ResolutionError::RecursiveInstantiation { key: key.to_string() });
        }
        self.depth.set(depth);
        Ok(DepthGuard(&self.depth))
    }

    pub fn record_origin(&self, id: TypeHash, decl: &Arc<Declaration>, parent: Option<&Arc<ClassFrame>>) {
        if self.core.origins.read().contains_key(&id) {
            return;
        }
        self.core.origins.write().entry(id).or_insert_with(|| Origin {
            decl: decl.clone(),
            parent: parent.cloned(),
        });
    }

    pub fn recorded_origin(&self, id: TypeHash) -> Option<Origin> {
        self.core.origins.read().get(&id).cloned()
    }

    /// Whether an explicit instantiation record covers `instance`.
    pub fn is_pre_instantiated(&self, instance: TypeHash) -> bool {
        if let Some(set) = self.pre_instantiated.get() {
            return set.contains(&instance);
        }
        // resolving the records may instantiate classes, which asks again
        if self.collecting_explicit.replace(true) {
            return false;
        }
        let set = self.explicit_instances();
        self.collecting_explicit.set(false);
        let hit = set.contains(&instance);
        let _ = self.pre_instantiated.set(set);
        hit
    }

    fn explicit_instances(&self) -> Arc<FxHashSet<TypeHash>> {
        let generation = self.store.generation();
        if let Some((cached, set)) = &*self.core.explicit.lock() {
            if *cached == generation {
                return set.clone();
            }
        }
        let mut set = FxHashSet::default();
        for record in self.store.explicit_instantiations() {
            let scope = Scope::namespace(record.scope.clone());
            match self.resolve_type(&record.target, &scope) {
                Ok(ty) => {
                    if let Some(id) = ty.class_identity() {
                        set.insert(id);
                    }
                }
                Err(err) => tracing::debug!(target = %record.target, error = %err, "explicit instantiation record not resolvable"),
            }
        }
        let set = Arc::new(set);
        *self.core.explicit.lock() = Some((generation, set.clone()));
        set
    }

    /// Apply any registered type reducer to a result type.
    pub fn reduce(&self, ty: TypeDescriptor) -> TypeDescriptor {
        let reducers = self.core.reducers.read();
        if reducers.is_empty() {
            return ty;
        }
        match reducers.get(&ty.decay()) {
            Some(reduced) => {
                let mut out = reduced.clone();
                if !ty.top_cv().is_empty() {
                    out = out.with_cv(ty.top_cv());
                }
                if ty.is_reference() {
                    out = out.with_reference(ty.reference);
                }
                out
            }
            None => ty,
        }
    }
}

pub(crate) struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}
