//! The declaration store: every registered declaration, indexed by scope
//! and identity.
//!
//! Registration is additive and atomic. A source text either registers
//! completely or leaves the store untouched; existing declarations are
//! never changed except that a forward declaration is replaced by its
//! definition.

use std::sync::Arc;

use petgraph::graph::NodeIndex;
use rustc_hash::FxHashMap;
use templar_core::decl::{DeclKind, Declaration, ExplicitInstantiation, SourceItem};
use templar_core::{RegistrationError, TemplateArgName, TypeHash, TypeHead, TypeName, split_scope};
use tracing::{debug, trace};

use crate::scope_tree::{EnumeratorEntry, ResolutionResult, ScopeTree};

/// Where a qualified lookup currently stands.
#[derive(Debug, Clone)]
enum Cursor {
    Namespace(NodeIndex),
    Class(Arc<Declaration>),
}

#[derive(Debug, Clone, Default)]
pub struct DeclarationStore {
    tree: ScopeTree,
    by_id: FxHashMap<TypeHash, Arc<Declaration>>,
    /// Specializations per primary template id, most specific first.
    specializations: FxHashMap<TypeHash, Vec<Arc<Declaration>>>,
    explicit: Vec<ExplicitInstantiation>,
    generation: u64,
}

impl DeclarationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text` and register everything in it.
    pub fn register_source(&mut self, text: &str) -> Result<Vec<Arc<Declaration>>, RegistrationError> {
        let (next, added) = self.with_source(text)?;
        *self = next;
        Ok(added)
    }

    /// A copy of this store with `text` registered. `self` is left unchanged.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn with_source(&self, text: &str) -> Result<(DeclarationStore, Vec<Arc<Declaration>>), RegistrationError> {
        let items = templar_parser::parse_source(text)?;
        let mut next = self.clone();
        let mut added = Vec::new();
        let root = next.tree.root();
        next.register_items(items, &mut Vec::new(), root, &mut added)?;
        next.generation += 1;
        debug!(added = added.len(), generation = next.generation, "registered source");
        Ok((next, added))
    }

    fn register_items(
        &mut self,
        items: Vec<SourceItem>,
        path: &mut Vec<String>,
        node: NodeIndex,
        added: &mut Vec<Arc<Declaration>>,
    ) -> Result<(), RegistrationError> {
        for item in items {
            match item {
                SourceItem::Namespace { name, items } => {
                    let child = self.tree.get_or_create_child(node, &name);
                    path.push(name);
                    self.register_items(items, path, child, added)?;
                    path.pop();
                }
                SourceItem::UsingDirective(segments) => {
                    let target = self.find_namespace(&segments, node);
                    let target = target.unwrap_or_else(|| self.tree.get_or_create_path(&segments));
                    self.tree.add_using_directive(node, target);
                }
                SourceItem::Declaration(decl) => self.add_declaration(decl, path, node, added)?,
                SourceItem::ExplicitInstantiation { target, is_extern } => {
                    trace!(target = %target, "explicit instantiation recorded");
                    self.explicit.push(ExplicitInstantiation {
                        target,
                        is_extern,
                        scope: path.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn find_namespace(&self, segments: &[String], from: NodeIndex) -> Option<NodeIndex> {
        let (first, rest) = segments.split_first()?;
        let start = self.tree.resolve_namespace(first, from)?;
        self.tree.get_path_from(start, rest)
    }

    fn add_declaration(
        &mut self,
        decl: Declaration,
        path: &[String],
        node: NodeIndex,
        added: &mut Vec<Arc<Declaration>>,
    ) -> Result<(), RegistrationError> {
        if decl.name.is_empty() {
            return Ok(());
        }
        let decl = Arc::new(prepare(decl, path)?);

        if decl.is_specialization() {
            let candidates = self.tree.scope(node).and_then(|s| s.named(&decl.name)).unwrap_or_default();
            let primary = find_primary(&decl, candidates).ok_or_else(|| RegistrationError::UnknownPrimary {
                name: decl.qualified_name().to_string(),
            })?;
            let primary_id = primary.id;
            if self.insert_specialization(primary_id, decl.clone()) {
                self.index(&decl);
                added.push(decl);
            }
            return Ok(());
        }

        if let Some(existing) = self.by_id.get(&decl.id).cloned() {
            if !supersedes(&decl, &existing)? {
                trace!(name = %decl.qualified_name(), "redeclaration ignored");
                return Ok(());
            }
            if let Some(slot) = self
                .tree
                .scope_mut(node)
                .and_then(|s| s.decls.get_mut(&decl.name))
                .and_then(|decls| decls.iter_mut().find(|d| Arc::ptr_eq(d, &existing)))
            {
                *slot = decl.clone();
            }
        } else if let Some(scope) = self.tree.scope_mut(node) {
            scope.decls.entry(decl.name.clone()).or_default().push(decl.clone());
        }

        if let DeclKind::Enum(ref enumeration) = decl.kind {
            if !enumeration.scoped {
                if let Some(scope) = self.tree.scope_mut(node) {
                    for enumerator in &enumeration.enumerators {
                        scope.enumerators.insert(
                            enumerator.name.clone(),
                            EnumeratorEntry {
                                owner: decl.clone(),
                                value: enumerator.value,
                            },
                        );
                    }
                }
            }
        }

        trace!(name = %decl.qualified_name(), kind = decl.kind_name(), "declaration registered");
        self.index(&decl);
        added.push(decl);
        Ok(())
    }

    /// Returns false if an identical specialization is already present.
    fn insert_specialization(&mut self, primary: TypeHash, decl: Arc<Declaration>) -> bool {
        let list = self.specializations.entry(primary).or_default();
        if let Some(pos) = list.iter().position(|s| s.id == decl.id) {
            let incomplete = list[pos].as_class().is_some_and(|c| !c.complete);
            if incomplete && decl.as_class().is_some_and(|c| c.complete) {
                list[pos] = decl;
                return true;
            }
            return false;
        }
        let score = specificity(&decl);
        let at = list.iter().position(|s| specificity(s) < score).unwrap_or(list.len());
        list.insert(at, decl);
        true
    }

    /// Add a declaration and its members to the identity index.
    fn index(&mut self, decl: &Arc<Declaration>) {
        self.by_id.insert(decl.id, decl.clone());
        let Some(class) = decl.as_class() else {
            return;
        };
        for member in &class.members {
            if member.is_specialization() {
                let candidates: Vec<Arc<Declaration>> = class.members_named(&member.name).cloned().collect();
                if let Some(primary) = find_primary(member, &candidates) {
                    let primary_id = primary.id;
                    self.insert_specialization(primary_id, member.clone());
                }
            }
            self.index(member);
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Look up `name` (possibly qualified, possibly `::`-rooted) as seen from
    /// `scope`, a path of namespaces and classes.
    ///
    /// Unqualified names are searched in the enclosing classes, then each
    /// enclosing namespace outward (the innermost hit hides the rest), then
    /// through using directives. Specializations are never returned.
    pub fn lookup<S: AsRef<str>>(&self, name: &str, scope: &[S]) -> Vec<Arc<Declaration>> {
        let global = name.trim_start().starts_with("::");
        let mut parts: Vec<String> = split_scope(name).iter().map(|s| strip_args(s).to_string()).collect();
        let Some(last) = parts.pop() else {
            return Vec::new();
        };
        let (node, classes) = self.scope_position(scope);

        if parts.is_empty() {
            if !global {
                for class in classes.iter().rev() {
                    let members: Vec<_> = class.as_class().map(|c| c.members_named(&last).cloned().collect()).unwrap_or_default();
                    if !members.is_empty() {
                        return members;
                    }
                }
                return self.resolve_unqualified(&last, node);
            }
            return self.decls_in(self.tree.root(), &last);
        }

        let (head, rest) = if global {
            (Some(Cursor::Namespace(self.tree.root())), &parts[..])
        } else {
            (self.resolve_head(&parts[0], node, &classes), &parts[1..])
        };
        let mut cursor = head;
        for segment in rest {
            cursor = cursor.and_then(|c| self.step(&c, segment));
        }
        match cursor {
            Some(Cursor::Namespace(n)) => self.decls_in(n, &last),
            Some(Cursor::Class(class)) => class
                .as_class()
                .map(|c| c.members_named(&last).cloned().collect())
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Unqualified lookup from a namespace node. Hits from several using
    /// directives are merged.
    pub fn resolve_unqualified(&self, name: &str, from: NodeIndex) -> Vec<Arc<Declaration>> {
        match self.tree.resolve(name, from) {
            ResolutionResult::Found((_, decls)) => decls.to_vec(),
            ResolutionResult::Ambiguous(hits) => {
                let mut merged: Vec<Arc<Declaration>> = Vec::new();
                for (_, (_, decls)) in hits {
                    for decl in decls {
                        if !merged.iter().any(|d| d.id == decl.id) {
                            merged.push(decl.clone());
                        }
                    }
                }
                merged
            }
            ResolutionResult::NotFound => Vec::new(),
        }
    }

    /// Qualified lookup inside one namespace, including the namespaces it
    /// imports with using directives.
    pub fn decls_in(&self, node: NodeIndex, name: &str) -> Vec<Arc<Declaration>> {
        if let Some(decls) = self.tree.scope(node).and_then(|s| s.named(name)) {
            return decls.to_vec();
        }
        let mut found = Vec::new();
        for used in self.tree.using_directives(node) {
            if let Some(decls) = self.tree.scope(used).and_then(|s| s.named(name)) {
                found.extend(decls.iter().cloned());
            }
        }
        found
    }

    fn resolve_head(&self, name: &str, from: NodeIndex, classes: &[Arc<Declaration>]) -> Option<Cursor> {
        for class in classes.iter().rev() {
            if let Some(nested) = nested_class(class, name) {
                return Some(Cursor::Class(nested));
            }
        }
        let mut current = Some(from);
        while let Some(node) = current {
            if let Some(child) = self.tree.find_child(node, name) {
                return Some(Cursor::Namespace(child));
            }
            if let Some(class) = self.tree.scope(node).and_then(|s| s.named(name)).and_then(first_class) {
                return Some(Cursor::Class(class));
            }
            current = self.tree.find_parent(node);
        }
        if let Some(ns) = self.tree.resolve_namespace(name, from) {
            return Some(Cursor::Namespace(ns));
        }
        first_class(&self.resolve_unqualified(name, from)).map(Cursor::Class)
    }

    fn step(&self, cursor: &Cursor, segment: &str) -> Option<Cursor> {
        match cursor {
            Cursor::Namespace(node) => {
                if let Some(child) = self.tree.find_child(*node, segment) {
                    return Some(Cursor::Namespace(child));
                }
                first_class(&self.decls_in(*node, segment)).map(Cursor::Class)
            }
            Cursor::Class(class) => nested_class(class, segment).map(Cursor::Class),
        }
    }

    /// Split a scope path into its deepest namespace node and the classes
    /// nested below it.
    pub fn scope_position<S: AsRef<str>>(&self, scope: &[S]) -> (NodeIndex, Vec<Arc<Declaration>>) {
        let (node, depth) = self.tree.deepest_prefix(scope);
        let mut classes: Vec<Arc<Declaration>> = Vec::new();
        for segment in &scope[depth..] {
            let next = match classes.last() {
                Some(outer) => nested_class(outer, segment.as_ref()),
                None => self.tree.scope(node).and_then(|s| s.named(segment.as_ref())).and_then(first_class),
            };
            match next {
                Some(class) => classes.push(class),
                None => break,
            }
        }
        (node, classes)
    }

    /// An unscoped enumerator visible from `scope`.
    pub fn lookup_enumerator<S: AsRef<str>>(&self, name: &str, scope: &[S]) -> Option<EnumeratorEntry> {
        let (node, _) = self.tree.deepest_prefix(scope);
        self.tree.resolve_enumerator(name, node).cloned()
    }

    pub fn get(&self, id: TypeHash) -> Option<&Arc<Declaration>> {
        self.by_id.get(&id)
    }

    /// Specializations of a primary template, most specific first.
    pub fn specializations_of(&self, primary: TypeHash) -> &[Arc<Declaration>] {
        self.specializations.get(&primary).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn explicit_instantiations(&self) -> &[ExplicitInstantiation] {
        &self.explicit
    }

    pub fn tree(&self) -> &ScopeTree {
        &self.tree
    }

    pub fn namespace<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeIndex> {
        self.tree.get_path(path)
    }

    /// Bumped on every successful registration.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of indexed declarations, members included.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Assign scopes and identities, recursing into class members.
fn prepare(mut decl: Declaration, scope: &[String]) -> Result<Declaration, RegistrationError> {
    decl.scope = scope.to_vec();
    if let Some(header) = &decl.template {
        let allow_after_pack = decl.as_function().is_some() || decl.is_specialization();
        header.validate(allow_after_pack).map_err(|reason| RegistrationError::InvalidTemplate {
            name: decl.qualified_name().to_string(),
            reason,
        })?;
    }
    if let DeclKind::Class(class) = &mut decl.kind {
        let mut inner = scope.to_vec();
        inner.push(decl.name.clone());
        let members = std::mem::take(&mut class.members);
        class.members = members
            .into_iter()
            .filter(|m| !m.name.is_empty())
            .map(|m| prepare(Arc::unwrap_or_clone(m), &inner).map(Arc::new))
            .collect::<Result<_, _>>()?;
    }
    decl.id = decl.compute_id();
    Ok(decl)
}

/// Whether `new` replaces `existing` under the same identity.
fn supersedes(new: &Declaration, existing: &Declaration) -> Result<bool, RegistrationError> {
    match (new.as_class(), existing.as_class()) {
        (Some(new_class), Some(old_class)) => {
            if new_class.complete && old_class.complete && new.body != existing.body {
                return Err(RegistrationError::Duplicate {
                    name: new.qualified_name().to_string(),
                });
            }
            Ok(new_class.complete && !old_class.complete)
        }
        _ => Ok(new.body.is_defined() && !existing.body.is_defined()),
    }
}

/// The primary template a specialization belongs to.
fn find_primary<'a>(spec: &Declaration, candidates: &'a [Arc<Declaration>]) -> Option<&'a Arc<Declaration>> {
    let mut primaries = candidates
        .iter()
        .filter(|c| c.is_template() && std::mem::discriminant(&c.kind) == std::mem::discriminant(&spec.kind));
    match spec.as_function() {
        Some(func) => {
            let arity = func.params.len();
            let all: Vec<_> = primaries.collect();
            all.iter()
                .find(|c| c.as_function().is_some_and(|f| f.params.len() == arity))
                .or_else(|| all.first())
                .copied()
        }
        None => primaries.next(),
    }
}

fn first_class(decls: &[Arc<Declaration>]) -> Option<Arc<Declaration>> {
    decls.iter().find(|d| d.as_class().is_some() && !d.is_specialization()).cloned()
}

fn nested_class(class: &Declaration, name: &str) -> Option<Arc<Declaration>> {
    let members: Vec<_> = class.as_class()?.members_named(name).cloned().collect();
    first_class(&members)
}

fn strip_args(segment: &str) -> &str {
    segment.split('<').next().unwrap_or(segment).trim()
}

/// Structural specificity of a specialization pattern: the number of
/// concrete nodes, ignoring the specialization's own parameters. Full
/// specializations rank above every partial one.
pub fn specificity(decl: &Declaration) -> usize {
    let Some(pattern) = &decl.specialization else {
        return 0;
    };
    let params: Vec<&str> = decl
        .template
        .as_ref()
        .map(|h| h.params.iter().map(|p| p.name.as_str()).collect())
        .unwrap_or_default();
    if params.is_empty() {
        return usize::MAX;
    }
    pattern.iter().map(|arg| arg_specificity(arg, &params)).sum()
}

fn arg_specificity(arg: &TemplateArgName, params: &[&str]) -> usize {
    match arg {
        TemplateArgName::Type(ty) => type_specificity(ty, params),
        TemplateArgName::Int(_) | TemplateArgName::Bool(_) => 1,
        TemplateArgName::Expr(text) => usize::from(!params.iter().any(|p| text.contains(p))),
    }
}

fn type_specificity(ty: &TypeName, params: &[&str]) -> usize {
    let modifiers = ty.cv.bits().count_ones() as usize
        + ty.pointers.iter().map(|q| 1 + q.bits().count_ones() as usize).sum::<usize>()
        + usize::from(ty.reference != templar_core::RefKind::None);
    let head = match &ty.head {
        TypeHead::Builtin(_) => 1,
        TypeHead::Auto => 0,
        TypeHead::Path(_) if ty.as_identifier().is_some_and(|id| params.contains(&id)) => 0,
        TypeHead::Path(path) => {
            1 + path
                .segments
                .iter()
                .flat_map(|s| s.args.iter().flatten())
                .map(|a| arg_specificity(a, params))
                .sum::<usize>()
        }
        TypeHead::Function { ret, params: fn_params, .. } => {
            1 + type_specificity(ret, params) + fn_params.iter().map(|p| type_specificity(p, params)).sum::<usize>()
        }
    };
    modifiers + head
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(source: &str) -> DeclarationStore {
        let mut store = DeclarationStore::new();
        store.register_source(source).unwrap_or_else(|e| panic!("{e}"));
        store
    }

    fn names(decls: &[Arc<Declaration>]) -> Vec<String> {
        decls.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn members_get_scopes_and_ids() {
        let store = store("namespace TemplateHiding { struct Base { template<class T> int callme(T t); }; }");
        let base = store.lookup("TemplateHiding::Base", &[] as &[&str]);
        assert_eq!(base.len(), 1);
        let class = base[0].as_class().unwrap_or_else(|| panic!("class"));
        let method = &class.members[0];
        assert_eq!(method.scope, vec!["TemplateHiding", "Base"]);
        assert_eq!(method.id, method.compute_id());
        assert!(store.get(method.id).is_some());
    }

    #[test]
    fn inner_scope_hides_outer_overloads() {
        let store = store("int f(int); namespace ns { int f(double); int g(); }");
        assert_eq!(names(&store.lookup("f", &["ns"])), vec!["ns::f(double)"]);
        assert_eq!(store.lookup("f", &[] as &[&str]).len(), 1);
        assert_eq!(names(&store.lookup("::f", &["ns"])), vec!["f(int)"]);
    }

    #[test]
    fn using_directive_makes_names_visible() {
        let store = store("namespace lib { int helper(); } namespace app { using namespace lib; }");
        assert_eq!(store.lookup("helper", &["app"]).len(), 1);
        assert!(store.lookup("helper", &[] as &[&str]).is_empty());
        assert_eq!(store.lookup("app::helper", &[] as &[&str]).len(), 1);
    }

    #[test]
    fn lookup_from_class_scope_sees_members_first() {
        let store = store("typedef int value_type; struct S { typedef double value_type; void f(); };");
        let hit = store.lookup("value_type", &["S"]);
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].scope, vec!["S"]);
        assert_eq!(store.lookup("value_type", &[] as &[&str])[0].scope, Vec::<String>::new());
    }

    #[test]
    fn qualified_lookup_walks_nested_classes() {
        let store = store("namespace a { struct Outer { struct Inner { int x; }; }; }");
        let inner = store.lookup("a::Outer::Inner", &[] as &[&str]);
        assert_eq!(inner.len(), 1);
        assert_eq!(store.lookup("Outer::Inner::x", &["a"]).len(), 1);
    }

    #[test]
    fn specializations_are_ordered_and_hidden() {
        let store = store(
            "template<class T, class U> struct S { };
             template<class T> struct S<T, int> { };
             template<class T> struct S<T*, int> { };
             template<> struct S<int, int> { };",
        );
        let primary = store.lookup("S", &[] as &[&str]);
        assert_eq!(primary.len(), 1);
        let specs = store.specializations_of(primary[0].id);
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].to_string(), "S<int,int>");
        assert_eq!(specs[1].to_string(), "S<T*,int>");
        assert_eq!(specs[2].to_string(), "S<T,int>");
    }

    #[test]
    fn specialization_without_primary_is_rejected() {
        let mut store = DeclarationStore::new();
        let err = store.register_source("template<> struct Missing<int> { };").err();
        assert!(matches!(err, Some(RegistrationError::UnknownPrimary { name }) if name == "Missing"));
    }

    #[test]
    fn failed_registration_leaves_store_untouched() {
        let mut store = store("int keep();");
        let generation = store.generation();
        let err = store.register_source("int added(); template<class... A, class B> struct Bad {};");
        assert!(matches!(err, Err(RegistrationError::InvalidTemplate { .. })));
        assert!(store.lookup("added", &[] as &[&str]).is_empty());
        assert_eq!(store.generation(), generation);
    }

    #[test]
    fn forward_declaration_is_completed() {
        let store = store("struct Fwd; struct Fwd { int x; };");
        let found = store.lookup("Fwd", &[] as &[&str]);
        assert_eq!(found.len(), 1);
        assert!(found[0].as_class().is_some_and(|c| c.complete));
    }

    #[test]
    fn conflicting_definitions_are_duplicates() {
        let mut store = store("struct A { int x; };");
        assert!(matches!(
            store.register_source("struct A { double y; };"),
            Err(RegistrationError::Duplicate { .. })
        ));
        assert!(store.register_source("struct A;").is_ok());
    }

    #[test]
    fn unscoped_enumerators_are_visible_outside() {
        let store = store("namespace ns { enum Color { Red, Green = 5, Blue }; enum class Mode { On }; }");
        assert_eq!(store.lookup_enumerator("Blue", &["ns"]).map(|e| e.value), Some(6));
        assert!(store.lookup_enumerator("On", &["ns"]).is_none());
        assert!(store.lookup_enumerator("Red", &[] as &[&str]).is_none());
    }

    #[test]
    fn explicit_instantiations_keep_their_scope() {
        let store = store("namespace ns { template<class T> struct A {}; template class A<int>; }");
        let records = store.explicit_instantiations();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].scope, vec!["ns"]);
        assert_eq!(records[0].target.to_string(), "A<int>");
    }

    #[test]
    fn redeclared_function_keeps_one_entry() {
        let store = store("int f(int); int f(int x) { return x; }");
        let found = store.lookup("f", &[] as &[&str]);
        assert_eq!(found.len(), 1);
        assert!(found[0].body.is_defined());
    }
}
