//! The resolution engine.
//!
//! An [`Engine`] owns the declaration store, the instantiation cache and the
//! exposer for the life of the host. Every public call pins one store
//! snapshot, resolves against it and returns a shared [`Entity`].
//!
//! ```
//! use templar_core::Value;
//! use templar_resolver::Engine;
//!
//! let engine = Engine::new().unwrap();
//! engine.register_source("template<class T> T twice(T x); int twice(int x);").unwrap();
//!
//! let exact = engine.resolve_call("", "twice", &[], &[Value::Int(2)]).unwrap();
//! assert!(!exact.is_template_instance());
//! let generic = engine.resolve_call("", "twice", &[], &[Value::Float(2.0)]).unwrap();
//! assert_eq!(generic.qualified_name(), "twice<double>");
//! ```

use std::sync::Arc;

use templar_core::decl::{DeclKind, Declaration};
use templar_core::{
    InstantiationKey, RegistrationError, ResolutionError, TemplateArg, TypeDescriptor, TypeHead, TypeName,
    Value, split_scope,
};
use templar_registry::DeclarationStore;
use tracing::debug;

use crate::build::EntityParts;
use crate::config::EngineConfig;
use crate::context::{ClassFrame, EngineCore, ResolutionContext, Scope};
use crate::entity::{Entity, EntityKind};
use crate::instantiator::{Instantiator, NullInstantiator};
use crate::overload::{CallSite, CandidateSource};
use crate::type_resolver::Resolved;

/// Where a call is looked up.
enum CallScope {
    Namespace(Vec<String>),
    /// Member call on an object of the class.
    Object { frame: Arc<ClassFrame>, object: TypeDescriptor },
}

pub struct Engine<I: Instantiator = NullInstantiator> {
    core: EngineCore,
    instantiator: I,
}

impl Engine<NullInstantiator> {
    /// An engine with the default configuration that compiles nothing.
    pub fn new() -> Result<Self, ResolutionError> {
        Self::with_config(EngineConfig::default(), NullInstantiator)
    }
}

impl<I: Instantiator> Engine<I> {
    pub fn with_instantiator(instantiator: I) -> Result<Self, ResolutionError> {
        Self::with_config(EngineConfig::default(), instantiator)
    }

    pub fn with_config(config: EngineConfig, instantiator: I) -> Result<Self, ResolutionError> {
        let store = if config.prelude {
            DeclarationStore::with_prelude()?
        } else {
            DeclarationStore::new()
        };
        Ok(Self {
            core: EngineCore::new(config, store),
            instantiator,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.core.config
    }

    pub fn instantiator(&self) -> &I {
        &self.instantiator
    }

    /// Parse `text` and add its declarations. Resolutions already running
    /// keep their snapshot.
    pub fn register_source(&self, text: &str) -> Result<Vec<Arc<Declaration>>, RegistrationError> {
        let added = self.core.store.register_source(text)?;
        debug!(declarations = added.len(), generation = self.core.store.generation(), "source registered");
        Ok(added)
    }

    /// The current store snapshot.
    pub fn snapshot(&self) -> Arc<DeclarationStore> {
        self.core.store.snapshot()
    }

    pub(crate) fn context(&self) -> ResolutionContext<'_> {
        ResolutionContext::new(&self.core, &self.instantiator)
    }

    /// Canonical descriptor of a spelled type. Aliases resolve to their
    /// target and keep their spelling for display.
    pub fn resolve_type(&self, spelling: &str) -> Result<TypeDescriptor, ResolutionError> {
        let ctx = self.context();
        let spelled = templar_parser::parse_type(spelling)?;
        ctx.resolve_type(&spelled, &Scope::global()).map_err(|err| match err {
            ResolutionError::UnknownName { .. } => ResolutionError::UnresolvableArgument {
                token: spelling.to_string(),
            },
            other => other,
        })
    }

    /// The class (or enum, or alias) entity named by `name`, specialized with
    /// `explicit` when given.
    pub fn resolve_class(&self, name: &str, explicit: &[TemplateArg]) -> Result<Arc<Entity>, ResolutionError> {
        let ctx = self.context();
        let scope = Scope::global();
        let spelled = templar_parser::parse_type(name)?;
        let ty = self.named_type(&ctx, &spelled, explicit, &scope)?;
        if ty.is_class() || matches!(ty.base, templar_core::BaseType::Enum(_)) {
            return ctx.class_entity(&ty);
        }
        self.alias_entity(&ctx, &spelled, explicit, ty)
    }

    /// Class entity of a resolved type.
    pub fn class_of(&self, ty: &TypeDescriptor) -> Result<Arc<Entity>, ResolutionError> {
        self.context().class_entity(ty)
    }

    /// Resolve a call of `name` in `scope` with runtime `args`.
    ///
    /// `scope` is a namespace path (`""` for the global namespace) or a
    /// class type; for a class type the call is a member call on an object
    /// of that type, `const` included. `name` may carry its explicit
    /// arguments (`get_size<double>`). A name that denotes a class resolves
    /// to one of its constructors.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn resolve_call(
        &self,
        scope: &str,
        name: &str,
        explicit: &[TemplateArg],
        args: &[Value],
    ) -> Result<Arc<Entity>, ResolutionError> {
        let ctx = self.context();
        let (name, explicit) = split_explicit(name, explicit);
        let call_scope = self.call_scope(&ctx, scope)?;
        let lookup_scope = match &call_scope {
            CallScope::Namespace(path) => Scope::namespace(path.clone()),
            CallScope::Object { frame, .. } => Scope::of_class(frame),
        };
        let explicit_args = ctx.explicit_args(&explicit, &lookup_scope)?;
        let call_args = ctx.call_args(args)?;

        let site = CallSite {
            name: &name,
            explicit: &explicit_args,
            args: &call_args,
            constructs: None,
        };
        match call_scope {
            CallScope::Namespace(path) => {
                let decls = ctx.store.lookup(&name, &path);
                if decls.is_empty() {
                    return Err(ResolutionError::UnknownName {
                        name: name.clone(),
                        scope: lookup_scope.describe(),
                    });
                }
                if decls.iter().any(|decl| decl.is_type()) {
                    let spelled = templar_parser::parse_type(&name)?;
                    let ty = self.named_type(&ctx, &spelled, &explicit, &lookup_scope)?;
                    let frame = ctx.class_frame(&ty)?;
                    let site = CallSite { explicit: &[], ..site };
                    return ctx.resolve_constructor(&frame, &site);
                }
                if let Some(variable) = decls.iter().find(|decl| matches!(decl.kind, DeclKind::Variable(_))) {
                    return ctx.variable_entity(variable, None);
                }
                let sources: Vec<CandidateSource> = decls
                    .into_iter()
                    .filter(|decl| decl.as_function().is_some())
                    .map(|decl| CandidateSource {
                        decl,
                        owner: None,
                        implicit_object: false,
                    })
                    .collect();
                ctx.resolve_overload(&sources, &site)
            }
            CallScope::Object { frame, object } => {
                if name == frame.decl.name {
                    return ctx.resolve_constructor(&frame, &site);
                }
                let hits = ctx.member_lookup(&frame, &name)?;
                if hits.is_empty() {
                    if let Some(Resolved::Type(nested)) = ctx.member_type(&frame, &name)? {
                        let nested_frame = ctx.class_frame(&nested)?;
                        return ctx.resolve_constructor(&nested_frame, &site);
                    }
                    return Err(ResolutionError::UnknownName {
                        name: name.clone(),
                        scope: frame.display(),
                    });
                }
                if let Some(hit) = hits.iter().find(|hit| matches!(hit.decl.kind, DeclKind::Variable(_))) {
                    return ctx.variable_entity(&hit.decl, Some(&hit.frame));
                }
                let mut member_args = Vec::with_capacity(call_args.len() + 1);
                member_args.push(ctx.call_arg(&Value::instance(object))?);
                member_args.extend(call_args.iter().cloned());
                let sources: Vec<CandidateSource> = hits
                    .into_iter()
                    .filter(|hit| hit.decl.as_function().is_some())
                    .map(|hit| CandidateSource {
                        decl: hit.decl,
                        owner: Some(hit.frame),
                        implicit_object: true,
                    })
                    .collect();
                let site = CallSite { args: &member_args, ..site };
                ctx.resolve_overload(&sources, &site)
            }
        }
    }

    /// Resolve a constructor of the class named by `class`.
    pub fn resolve_constructor(
        &self,
        class: &str,
        explicit: &[TemplateArg],
        args: &[Value],
    ) -> Result<Arc<Entity>, ResolutionError> {
        let ctx = self.context();
        let spelled = templar_parser::parse_type(class)?;
        let ty = self.named_type(&ctx, &spelled, explicit, &Scope::global())?;
        let frame = ctx.class_frame(&ty)?;
        let call_args = ctx.call_args(args)?;
        let name = frame.decl.name.clone();
        let site = CallSite {
            name: &name,
            explicit: &[],
            args: &call_args,
            constructs: None,
        };
        ctx.resolve_constructor(&frame, &site)
    }

    /// Resolve `lhs op rhs` (or `op lhs` for one argument): member operators
    /// of the left operand, free operators in the global namespace and in
    /// the namespaces of class operands.
    pub fn resolve_operator(&self, op: &str, args: &[Value]) -> Result<Arc<Entity>, ResolutionError> {
        let ctx = self.context();
        let name = format!("operator{}", op.trim());
        let call_args = ctx.call_args(args)?;
        let mut sources: Vec<CandidateSource> = Vec::new();
        let mut namespaces: Vec<Vec<String>> = vec![Vec::new()];

        for (index, arg) in call_args.iter().enumerate() {
            if !arg.ty.is_class() || arg.ty.is_pointer() {
                continue;
            }
            let frame = ctx.class_frame(&arg.ty)?;
            if index == 0 {
                for hit in ctx.member_lookup(&frame, &name)? {
                    sources.push(CandidateSource {
                        decl: hit.decl,
                        owner: Some(hit.frame),
                        implicit_object: true,
                    });
                }
            }
            if !namespaces.contains(&frame.namespace) {
                namespaces.push(frame.namespace.clone());
            }
        }
        for namespace in &namespaces {
            for decl in ctx.store.lookup(&name, namespace) {
                let free = decl.as_function().is_some_and(|func| !func.is_member());
                if free && !sources.iter().any(|source| source.decl.id == decl.id) {
                    sources.push(CandidateSource {
                        decl,
                        owner: None,
                        implicit_object: false,
                    });
                }
            }
        }
        let site = CallSite {
            name: &name,
            explicit: &[],
            args: &call_args,
            constructs: None,
        };
        ctx.resolve_overload(&sources, &site)
    }

    /// The enumerator named by `spelling`, as a runtime value.
    pub fn enumerator(&self, spelling: &str) -> Result<Value, ResolutionError> {
        let ctx = self.context();
        let mut parts = split_scope(spelling);
        let name = parts.pop().unwrap_or_default();
        // through the enum itself, or the class an unscoped enum is nested in
        if let Ok(owner) = self.resolve_type(&parts.join("::")) {
            if let Some(value) = enumerator_of(&ctx, &owner, &name) {
                return Ok(value);
            }
        }
        let entry = ctx
            .store
            .lookup_enumerator(&name, &parts)
            .ok_or_else(|| ResolutionError::UnknownName {
                name: spelling.to_string(),
                scope: "enumerators".to_string(),
            })?;
        Ok(Value::Enumerator {
            ty: ctx.enum_type(&entry.owner, None),
            value: entry.value,
        })
    }

    /// Whether `ty` has a member `name`. Never fails.
    pub fn has_member(&self, ty: &TypeDescriptor, name: &str) -> bool {
        self.context().has_member(ty, name)
    }

    pub fn is_integral(&self, ty: &TypeDescriptor) -> bool {
        self.context().is_integral(ty)
    }

    pub fn is_floating(&self, ty: &TypeDescriptor) -> bool {
        self.context().is_floating(ty)
    }

    /// Present results of type `from` as `to`.
    pub fn add_type_reducer(&self, from: &str, to: &str) -> Result<(), ResolutionError> {
        let from = self.resolve_type(from)?;
        let to = self.resolve_type(to)?;
        debug!(from = %from, to = %to, "type reducer added");
        self.core.reducers.write().insert(from.decay(), to);
        Ok(())
    }

    /// An entity exposed under its display name with arguments.
    pub fn lookup_exposed(&self, name: &str) -> Option<Arc<Entity>> {
        self.core.exposer.get(name)
    }

    /// Exposed names directly within `scope`, oldest first.
    pub fn exposed_names(&self, scope: &str) -> Vec<String> {
        self.core.exposer.names_in(scope)
    }

    /// Number of entities created so far.
    pub fn cached_instances(&self) -> usize {
        self.core.cache.len()
    }

    /// Resolve a spelled type, applying `explicit` when it names a template.
    fn named_type(
        &self,
        ctx: &ResolutionContext<'_>,
        spelled: &TypeName,
        explicit: &[TemplateArg],
        scope: &Scope,
    ) -> Result<TypeDescriptor, ResolutionError> {
        if explicit.is_empty() {
            return ctx.resolve_type(spelled, scope);
        }
        let TypeHead::Path(path) = &spelled.head else {
            return Err(ResolutionError::NotATemplate { name: spelled.to_string() });
        };
        match ctx.resolve_path(path, scope)? {
            Resolved::Template(template) => {
                let args = ctx.explicit_args(explicit, scope)?;
                ctx.specialize(&template, &args)
            }
            _ => Err(ResolutionError::NotATemplate { name: spelled.to_string() }),
        }
    }

    fn alias_entity(
        &self,
        ctx: &ResolutionContext<'_>,
        spelled: &TypeName,
        explicit: &[TemplateArg],
        ty: TypeDescriptor,
    ) -> Result<Arc<Entity>, ResolutionError> {
        let not_alias = || ResolutionError::UnknownName {
            name: spelled.to_string(),
            scope: "type aliases".to_string(),
        };
        let TypeHead::Path(path) = &spelled.head else {
            return Err(not_alias());
        };
        let name: Vec<&str> = path.segments.iter().map(|segment| segment.name.as_str()).collect();
        let decl = ctx
            .store
            .lookup::<&str>(&name.join("::"), &[])
            .into_iter()
            .find(|decl| matches!(decl.kind, DeclKind::Alias(_)))
            .ok_or_else(not_alias)?;

        let scope = Scope::global();
        let mut args = match path.last().and_then(|segment| segment.args.as_ref()) {
            Some(spelled_args) => ctx.resolve_template_args(spelled_args, &scope)?,
            None => Vec::new(),
        };
        args.extend(ctx.explicit_args(explicit, &scope)?);
        let key = if args.is_empty() {
            InstantiationKey::plain(decl.id, decl.qualified_name().to_string())
        } else {
            InstantiationKey::new(decl.id, decl.qualified_name().to_string(), args)
        };
        let entity = ctx.core.cache.get_or_create(&key, || {
            ctx.build_entity(EntityParts {
                key: key.clone(),
                kind: EntityKind::Alias,
                declaration: decl.clone(),
                signature: None,
                result_type: Some(ctx.reduce(ty.clone())),
                ty: Some(ty.clone()),
                owner: None,
                frame: None,
            })
        })?;
        if !key.is_plain() {
            ctx.core.exposer.expose(entity.qualified_name(), &entity);
        }
        Ok(entity)
    }

    fn call_scope(&self, ctx: &ResolutionContext<'_>, scope: &str) -> Result<CallScope, ResolutionError> {
        if scope.trim().is_empty() {
            return Ok(CallScope::Namespace(Vec::new()));
        }
        let spelled = templar_parser::parse_type(scope)?;
        if let TypeHead::Path(path) = &spelled.head {
            if spelled.cv.is_empty() && spelled.pointers.is_empty() {
                if let Resolved::Namespace(namespace) = ctx.resolve_path(path, &Scope::global())? {
                    return Ok(CallScope::Namespace(namespace));
                }
            }
        }
        let object = ctx.resolve_type(&spelled, &Scope::global())?.strip_reference();
        if !object.is_class() || object.is_pointer() {
            return Err(ResolutionError::UnknownName {
                name: scope.to_string(),
                scope: "namespaces and classes".to_string(),
            });
        }
        let frame = ctx.class_frame(&object)?;
        Ok(CallScope::Object { frame, object })
    }
}

impl<I: Instantiator> std::fmt::Debug for Engine<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("generation", &self.core.store.generation())
            .field("instances", &self.core.cache.len())
            .field("exposed", &self.core.exposer.len())
            .finish()
    }
}

/// Split `name<args>` into the name and an explicit list. Operator names
/// are left alone.
fn split_explicit(name: &str, explicit: &[TemplateArg]) -> (String, Vec<TemplateArg>) {
    let name = name.trim();
    if !name.starts_with("operator") && name.ends_with('>') {
        if let Some(open) = name.find('<') {
            let mut args = vec![TemplateArg::Name(name[open + 1..name.len() - 1].to_string())];
            args.extend(explicit.iter().cloned());
            return (name[..open].trim_end().to_string(), args);
        }
    }
    (name.to_string(), explicit.to_vec())
}

fn enumerator_of(ctx: &ResolutionContext<'_>, owner: &TypeDescriptor, name: &str) -> Option<Value> {
    if let templar_core::BaseType::Enum(class) = &owner.base {
        let origin = ctx.origin(class.id).ok()?;
        let DeclKind::Enum(decl) = &origin.decl.kind else {
            return None;
        };
        let value = decl.enumerators.iter().find(|e| e.name == name)?.value;
        return Some(Value::Enumerator { ty: owner.clone(), value });
    }
    if !owner.is_class() || owner.is_pointer() {
        return None;
    }
    let frame = ctx.class_frame(owner).ok()?;
    frame.class()?.members.iter().find_map(|member| {
        let DeclKind::Enum(decl) = &member.kind else {
            return None;
        };
        if decl.scoped {
            return None;
        }
        let value = decl.enumerators.iter().find(|e| e.name == name)?.value;
        Some(Value::Enumerator {
            ty: ctx.enum_type(member, Some(&frame)),
            value,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::engine_with;

    #[test]
    fn explicit_arguments_in_the_name() {
        let engine = engine_with("template<class T> int get_size(); int get_size(int);");
        let a = engine.resolve_call("", "get_size<double>", &[], &[]).unwrap();
        let b = engine.resolve_call("", "get_size", &[TemplateArg::from("double")], &[]).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(engine.exposed_names(""), vec!["get_size<double>"]);
    }

    #[test]
    fn class_names_call_constructors() {
        let engine = engine_with("namespace ns { template<class T> struct Box { Box(T); }; }");
        let ctor = engine.resolve_call("ns", "Box<int>", &[], &[Value::Int(1)]).unwrap();
        assert_eq!(ctor.kind(), EntityKind::Constructor);
        assert_eq!(ctor.result_type().map(ToString::to_string).as_deref(), Some("ns::Box<int>"));
    }

    #[test]
    fn aliases_are_transparent() {
        let engine = engine_with("template<class T> struct Vec {}; typedef Vec<int> IntVec;");
        let via_alias = engine.resolve_class("IntVec", &[]).unwrap();
        let direct = engine.resolve_class("Vec", &[TemplateArg::from("int")]).unwrap();
        assert!(Arc::ptr_eq(&via_alias, &direct));
        let size = engine.resolve_class("size_t", &[]).unwrap();
        assert_eq!(size.kind(), EntityKind::Alias);
    }

    #[test]
    fn operators_find_members_and_free_functions() {
        let engine = engine_with(
            "namespace geo { struct V { V operator+(const V&) const; }; V operator*(const V&, double); }",
        );
        let v = engine.resolve_type("geo::V").unwrap();
        let plus = engine
            .resolve_operator("+", &[Value::instance(v.clone()), Value::instance(v.clone())])
            .unwrap();
        assert_eq!(plus.kind(), EntityKind::Method);
        let times = engine.resolve_operator("*", &[Value::instance(v), Value::Float(2.0)]).unwrap();
        assert_eq!(times.kind(), EntityKind::Function);
    }

    #[test]
    fn enumerators_resolve_with_their_type() {
        let engine = engine_with("namespace ns { enum Color { Red, Green = 5 }; enum class Mode { On = 1 }; }");
        let green = engine.enumerator("ns::Green").unwrap();
        assert!(matches!(green, Value::Enumerator { value: 5, .. }));
        let on = engine.enumerator("ns::Mode::On").unwrap();
        assert!(matches!(&on, Value::Enumerator { ty, value: 1 } if ty.to_string() == "ns::Mode"));
        assert!(engine.enumerator("ns::Blue").is_err());
    }

    #[test]
    fn reducers_shorten_result_types() {
        let engine = engine_with("template<class T> struct Expr {}; Expr<int> build(int);");
        engine.add_type_reducer("Expr<int>", "int").unwrap();
        let built = engine.resolve_call("", "build", &[], &[Value::Int(1)]).unwrap();
        assert_eq!(built.result_type().map(ToString::to_string).as_deref(), Some("int"));
    }

    #[test]
    fn unknown_tokens_are_unresolvable() {
        let engine = engine_with("");
        assert!(matches!(
            engine.resolve_type("NoSuchType"),
            Err(ResolutionError::UnresolvableArgument { .. })
        ));
        assert!(matches!(
            engine.resolve_call("", "nothing", &[], &[]),
            Err(ResolutionError::UnknownName { .. })
        ));
    }
}
