//! Spelled types to descriptors.
//!
//! A [`TypeName`] is resolved against a [`Scope`]: template bindings first,
//! then the enclosing class frames (injected class names, member types,
//! inherited member types), then the namespaces. Every segment of a path
//! yields a [`Resolved`] value, so `std::vector<int>::value_type` walks
//! namespace, template, instance and member type in turn.

use std::sync::Arc;

use templar_core::decl::{DeclKind, Declaration};
use templar_core::{
    ClassRef, InstantiationKey, KeyArg, PathSegment, PrimitiveKind, ResolutionError, TemplateArgName, TypeDescriptor,
    TypeHash, TypeHead, TypeName, TypePath, format_args,
};
use templar_registry::EnumeratorEntry;

use crate::context::{ClassFrame, ResolutionContext, Scope};
use crate::template::deduce::DeductionRequest;
use crate::template::substitution::apply_modifiers;

/// What one path segment names.
#[derive(Debug, Clone)]
pub(crate) enum Resolved {
    Type(TypeDescriptor),
    /// A non-type value (an enumerator or a bound non-type parameter).
    Value(TypeDescriptor),
    Template(TemplateRef),
    Namespace(Vec<String>),
    Pack(Vec<KeyArg>),
}

/// A template named without arguments, with the frame it is a member of.
#[derive(Debug, Clone)]
pub(crate) struct TemplateRef {
    pub decl: Arc<Declaration>,
    pub parent: Option<Arc<ClassFrame>>,
}

impl TemplateRef {
    /// Identity of the template. Member templates of a template instance get
    /// an identity per enclosing instance.
    pub fn ident(&self) -> TypeHash {
        match &self.parent {
            Some(parent) if !parent.is_plain() => TypeHash::from_member(parent.identity(), self.decl.id),
            _ => self.decl.id,
        }
    }

    pub fn name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}::{}", parent.display(), self.decl.name),
            None => self.decl.qualified_name().to_string(),
        }
    }

    /// Scope the template's own declaration is resolved in.
    pub fn scope(&self) -> Scope {
        Scope::of_declaration(&self.decl, self.parent.as_ref())
    }
}

impl ResolutionContext<'_> {
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn resolve_type(&self, ty: &TypeName, scope: &Scope) -> Result<TypeDescriptor, ResolutionError> {
        if ty.pack_expansion {
            return Err(ResolutionError::DeductionFailed {
                template: ty.to_string(),
                reason: "pack expansion outside of an argument list".to_string(),
            });
        }
        let base = match &ty.head {
            TypeHead::Builtin(kind) => TypeDescriptor::primitive(*kind),
            TypeHead::Auto => {
                return Err(ResolutionError::DeductionFailed {
                    template: ty.to_string(),
                    reason: "placeholder type has no declared form".to_string(),
                });
            }
            TypeHead::Function { ret, params, variadic } => {
                let ret = self.resolve_type(ret, scope)?;
                let params = self.resolve_type_list(params, scope)?;
                TypeDescriptor::function(ret, params, *variadic)
            }
            TypeHead::Path(path) => match self.resolve_path(path, scope)? {
                Resolved::Type(resolved) | Resolved::Value(resolved) => resolved,
                Resolved::Template(template) => {
                    let parameter = template
                        .decl
                        .template
                        .as_ref()
                        .and_then(|header| header.params.first())
                        .map(|p| p.name.clone())
                        .unwrap_or_default();
                    return Err(ResolutionError::UnderspecifiedTemplate {
                        template: template.name(),
                        parameter,
                    });
                }
                Resolved::Namespace(_) => {
                    return Err(ResolutionError::UnknownName {
                        name: path.to_string(),
                        scope: scope.describe(),
                    });
                }
                Resolved::Pack(_) => {
                    return Err(ResolutionError::DeductionFailed {
                        template: path.to_string(),
                        reason: "parameter pack used without expansion".to_string(),
                    });
                }
            },
        };
        apply_modifiers(base, ty)
    }

    /// Resolve a list of types, expanding `T...` entries in place.
    pub fn resolve_type_list(&self, types: &[TypeName], scope: &Scope) -> Result<Vec<TypeDescriptor>, ResolutionError> {
        let mut out = Vec::with_capacity(types.len());
        for ty in types {
            if ty.pack_expansion {
                out.extend(self.expand_pack_types(ty, scope)?);
            } else {
                out.push(self.resolve_type(ty, scope)?);
            }
        }
        Ok(out)
    }

    pub fn resolve_path(&self, path: &TypePath, scope: &Scope) -> Result<Resolved, ResolutionError> {
        let mut segments = path.segments.iter();
        let Some(first) = segments.next() else {
            return Err(ResolutionError::Internal("empty type path".to_string()));
        };
        let mut current = if path.global {
            self.member_of(Resolved::Namespace(Vec::new()), first, scope)?
        } else {
            let found = self.lookup_first(&first.name, first.args.is_some(), scope)?;
            self.with_args(found, first, scope)?
        };
        for segment in segments {
            current = self.member_of(current, segment, scope)?;
        }
        Ok(current)
    }

    fn lookup_first(&self, name: &str, has_args: bool, scope: &Scope) -> Result<Resolved, ResolutionError> {
        if let Some(arg) = scope.bindings.get(name) {
            return self.from_binding(arg);
        }
        let mut frame = scope.class.clone();
        while let Some(current) = frame {
            if let Some(arg) = current.bindings.get(name) {
                return self.from_binding(arg);
            }
            if current.decl.name == name {
                return Ok(if has_args {
                    Resolved::Template(self.primary_of(&current)?)
                } else {
                    Resolved::Type(current.ty.clone())
                });
            }
            if let Some(found) = self.member_type(&current, name)? {
                return Ok(found);
            }
            frame = current.parent.clone();
        }

        let decls = self.store.lookup(name, &scope.namespace);
        if !decls.is_empty() {
            return self.from_declarations(name, &decls, None, scope);
        }
        let tree = self.store.tree();
        let (node, _) = tree.deepest_prefix(&scope.namespace);
        if let Some(ns) = tree.resolve_namespace(name, node) {
            return Ok(Resolved::Namespace(tree.namespace_path(ns)));
        }
        if let Some(entry) = self.store.lookup_enumerator(name, &scope.namespace) {
            return Ok(Resolved::Value(enumerator_value(&entry)));
        }
        Err(ResolutionError::UnknownName {
            name: name.to_string(),
            scope: scope.describe(),
        })
    }

    fn member_of(&self, current: Resolved, segment: &PathSegment, scope: &Scope) -> Result<Resolved, ResolutionError> {
        let name = segment.name.as_str();
        let found = match current {
            Resolved::Namespace(path) => {
                let tree = self.store.tree();
                let node = self.store.namespace(&path).ok_or_else(|| ResolutionError::UnknownName {
                    name: path.join("::"),
                    scope: "::".to_string(),
                })?;
                let decls = self.store.decls_in(node, name);
                if !decls.is_empty() {
                    self.from_declarations(name, &decls, None, scope)?
                } else if let Some(child) = tree.find_child(node, name) {
                    Resolved::Namespace(tree.namespace_path(child))
                } else if let Some(entry) = tree.scope(node).and_then(|data| data.enumerators.get(name)) {
                    Resolved::Value(enumerator_value(entry))
                } else {
                    return Err(ResolutionError::UnknownName {
                        name: name.to_string(),
                        scope: if path.is_empty() { "::".to_string() } else { path.join("::") },
                    });
                }
            }
            Resolved::Type(ty) => self.member_of_type(&ty, name)?,
            Resolved::Template(template) => {
                return Err(ResolutionError::UnderspecifiedTemplate {
                    template: template.name(),
                    parameter: name.to_string(),
                });
            }
            Resolved::Value(_) | Resolved::Pack(_) => {
                return Err(ResolutionError::UnknownName {
                    name: name.to_string(),
                    scope: scope.describe(),
                });
            }
        };
        self.with_args(found, segment, scope)
    }

    fn member_of_type(&self, ty: &TypeDescriptor, name: &str) -> Result<Resolved, ResolutionError> {
        let not_found = || ResolutionError::UnknownName {
            name: name.to_string(),
            scope: ty.to_string(),
        };
        if ty.is_pointer() {
            return Err(not_found());
        }
        match &ty.base {
            templar_core::BaseType::Enum(class) => {
                let origin = self.origin(class.id)?;
                let DeclKind::Enum(decl) = &origin.decl.kind else {
                    return Err(not_found());
                };
                decl.enumerators
                    .iter()
                    .find(|e| e.name == name)
                    .map(|e| Resolved::Value(TypeDescriptor::value(PrimitiveKind::Int, e.value)))
                    .ok_or_else(not_found)
            }
            _ if ty.is_class() => {
                let frame = self.class_frame(ty)?;
                self.member_type(&frame, name)?.ok_or_else(not_found)
            }
            _ => Err(not_found()),
        }
    }

    /// A type, template or unscoped enumerator declared in `frame` or
    /// inherited from its bases.
    pub fn member_type(&self, frame: &Arc<ClassFrame>, name: &str) -> Result<Option<Resolved>, ResolutionError> {
        let Some(class) = frame.class() else {
            return Ok(None);
        };
        let declared: Vec<Arc<Declaration>> = class
            .members_named(name)
            .filter(|m| m.is_type() && !m.is_specialization())
            .cloned()
            .collect();
        if !declared.is_empty() {
            return self
                .from_declarations(name, &declared, Some(frame), &Scope::of_class(frame))
                .map(Some);
        }
        for member in &class.members {
            if let DeclKind::Enum(decl) = &member.kind {
                if decl.scoped {
                    continue;
                }
                if let Some(e) = decl.enumerators.iter().find(|e| e.name == name) {
                    return Ok(Some(Resolved::Value(TypeDescriptor::value(PrimitiveKind::Int, e.value))));
                }
            }
        }
        let scope = Scope::of_class(frame);
        for using in class.usings_named(name) {
            let base = self.resolve_type(&using.base, &scope)?;
            let base_frame = self.class_frame(&base)?;
            if let Some(found) = self.member_type(&base_frame, name)? {
                return Ok(Some(found));
            }
        }
        for base in &frame.bases {
            let base_frame = self.class_frame(base)?;
            if let Some(found) = self.member_type(&base_frame, name)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn from_binding(&self, arg: &KeyArg) -> Result<Resolved, ResolutionError> {
        Ok(match arg {
            KeyArg::Type(ty) if ty.as_value().is_some() => Resolved::Value(ty.clone()),
            KeyArg::Type(ty) => Resolved::Type(ty.clone()),
            KeyArg::Template(class) => {
                let origin = self.origin(class.id)?;
                Resolved::Template(TemplateRef {
                    decl: origin.decl,
                    parent: origin.parent,
                })
            }
            KeyArg::Pack(items) => Resolved::Pack(items.clone()),
        })
    }

    /// The template a frame was instantiated from, for `Name<...>` spelled
    /// inside its own body.
    fn primary_of(&self, frame: &Arc<ClassFrame>) -> Result<TemplateRef, ResolutionError> {
        if frame.decl.is_template() && !frame.decl.is_specialization() {
            return Ok(TemplateRef {
                decl: frame.decl.clone(),
                parent: frame.parent.clone(),
            });
        }
        match frame.ty.instance_key() {
            Some(key) => {
                let origin = self.origin(key.decl)?;
                Ok(TemplateRef {
                    decl: origin.decl,
                    parent: origin.parent,
                })
            }
            None => Err(ResolutionError::NotATemplate { name: frame.display() }),
        }
    }

    /// Pick the type declaration among `decls`.
    pub fn from_declarations(
        &self,
        name: &str,
        decls: &[Arc<Declaration>],
        parent: Option<&Arc<ClassFrame>>,
        scope: &Scope,
    ) -> Result<Resolved, ResolutionError> {
        let types: Vec<&Arc<Declaration>> = decls.iter().filter(|d| d.is_type()).collect();
        match types.as_slice() {
            [] => Err(ResolutionError::UnknownName {
                name: name.to_string(),
                scope: scope.describe(),
            }),
            [decl] => self.type_declaration(decl, parent),
            many => Err(ResolutionError::AmbiguousOverload {
                name: name.to_string(),
                candidates: many.iter().map(|d| d.to_string()).collect(),
            }),
        }
    }

    fn type_declaration(&self, decl: &Arc<Declaration>, parent: Option<&Arc<ClassFrame>>) -> Result<Resolved, ResolutionError> {
        if decl.is_template() {
            let template = TemplateRef {
                decl: decl.clone(),
                parent: parent.cloned(),
            };
            self.record_origin(template.ident(), decl, parent);
            return Ok(Resolved::Template(template));
        }
        match &decl.kind {
            DeclKind::Class(_) => Ok(Resolved::Type(self.class_type(decl, parent))),
            DeclKind::Enum(_) => Ok(Resolved::Type(self.enum_type(decl, parent))),
            DeclKind::Alias(alias) => {
                let scope = Scope::of_declaration(decl, parent);
                let target = self.resolve_type(&alias.target, &scope)?;
                let display = match parent {
                    Some(frame) => format!("{}::{}", frame.display(), decl.name),
                    None => decl.qualified_name().to_string(),
                };
                Ok(Resolved::Type(target.with_alias(display)))
            }
            _ => Err(ResolutionError::UnknownName {
                name: decl.name.clone(),
                scope: decl.scope.join("::"),
            }),
        }
    }

    /// Descriptor of a non-template class declaration, nested in `parent`.
    pub fn class_type(&self, decl: &Arc<Declaration>, parent: Option<&Arc<ClassFrame>>) -> TypeDescriptor {
        TypeDescriptor::class(self.nested_ref(decl, parent))
    }

    pub fn enum_type(&self, decl: &Arc<Declaration>, parent: Option<&Arc<ClassFrame>>) -> TypeDescriptor {
        TypeDescriptor::enumeration(self.nested_ref(decl, parent))
    }

    fn nested_ref(&self, decl: &Arc<Declaration>, parent: Option<&Arc<ClassFrame>>) -> ClassRef {
        match parent {
            Some(frame) if !frame.is_plain() => {
                let id = TypeHash::from_member(frame.identity(), decl.id);
                self.record_origin(id, decl, Some(frame));
                ClassRef::new(id, format!("{}::{}", frame.display(), decl.name))
            }
            Some(frame) => {
                self.record_origin(decl.id, decl, Some(frame));
                ClassRef::new(decl.id, decl.qualified_name().to_string())
            }
            None => ClassRef::new(decl.id, decl.qualified_name().to_string()),
        }
    }

    fn with_args(&self, found: Resolved, segment: &PathSegment, scope: &Scope) -> Result<Resolved, ResolutionError> {
        let Some(args) = &segment.args else {
            return Ok(found);
        };
        match found {
            Resolved::Template(template) => {
                let explicit = self.resolve_template_args(args, scope)?;
                self.specialize(&template, &explicit).map(Resolved::Type)
            }
            _ => Err(ResolutionError::NotATemplate {
                name: segment.name.clone(),
            }),
        }
    }

    /// `Template<explicit...>` as a type: a class instance, or the target of
    /// an alias template.
    pub fn specialize(&self, template: &TemplateRef, explicit: &[KeyArg]) -> Result<TypeDescriptor, ResolutionError> {
        let name = template.name();
        let Some(header) = template.decl.template.as_ref() else {
            return Err(ResolutionError::NotATemplate { name });
        };
        let scope = template.scope();
        let deduced = self.deduce(&DeductionRequest {
            template: &name,
            header,
            explicit,
            function: None,
            args: &[],
            scope: &scope,
        })?;
        match &template.decl.kind {
            DeclKind::Class(_) => {
                let ident = template.ident();
                self.record_origin(ident, &template.decl, template.parent.as_ref());
                Ok(TypeDescriptor::instance(InstantiationKey::new(ident, name, deduced.args)))
            }
            DeclKind::Alias(alias) => {
                let display = format!("{name}<{}>", format_args(&deduced.args));
                let target = self.resolve_type(&alias.target, &scope.with_bindings(deduced.bindings))?;
                Ok(target.with_alias(display))
            }
            _ => Err(ResolutionError::NotATemplate { name }),
        }
    }

    pub fn resolve_template_args(&self, args: &[TemplateArgName], scope: &Scope) -> Result<Vec<KeyArg>, ResolutionError> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            out.extend(self.resolve_template_arg(arg, scope)?);
        }
        Ok(out)
    }

    /// One spelled argument; a pack expansion may produce several.
    pub fn resolve_template_arg(&self, arg: &TemplateArgName, scope: &Scope) -> Result<Vec<KeyArg>, ResolutionError> {
        match arg {
            TemplateArgName::Int(value) => Ok(vec![KeyArg::Type(self.literal_type(*value)?)]),
            TemplateArgName::Bool(value) => Ok(vec![KeyArg::Type(TypeDescriptor::value(
                PrimitiveKind::Bool,
                i128::from(*value),
            ))]),
            TemplateArgName::Expr(text) => Ok(vec![KeyArg::Type(self.evaluate(text, scope)?)]),
            TemplateArgName::Type(ty) if ty.pack_expansion => self.expand_pack_args(ty, scope),
            TemplateArgName::Type(ty) => {
                if let (true, Some(path)) = (ty.is_bare(), ty.path()) {
                    return match self.resolve_path(path, scope)? {
                        Resolved::Type(resolved) | Resolved::Value(resolved) => Ok(vec![KeyArg::Type(resolved)]),
                        Resolved::Template(template) => Ok(vec![KeyArg::Template(self.template_class_ref(&template))]),
                        Resolved::Pack(items) => Ok(items),
                        Resolved::Namespace(_) => Err(ResolutionError::UnknownName {
                            name: path.to_string(),
                            scope: scope.describe(),
                        }),
                    };
                }
                Ok(vec![KeyArg::Type(self.resolve_type(ty, scope)?)])
            }
        }
    }

    pub fn template_class_ref(&self, template: &TemplateRef) -> ClassRef {
        let ident = template.ident();
        self.record_origin(ident, &template.decl, template.parent.as_ref());
        ClassRef::new(ident, template.name())
    }
}

fn enumerator_value(entry: &EnumeratorEntry) -> TypeDescriptor {
    TypeDescriptor::value(PrimitiveKind::Int, entry.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{engine_with, resolve};
    use templar_core::Qualifiers;

    #[test]
    fn builtin_and_modifiers() {
        let engine = engine_with("");
        let ty = resolve(&engine, "const char* const*");
        assert_eq!(ty.pointers, vec![Qualifiers::CONST, Qualifiers::empty()]);
        assert!(ty.cv.contains(Qualifiers::CONST));
        assert_eq!(ty.to_string(), "const char* const*");
    }

    #[test]
    fn namespaced_class_and_alias_share_identity() {
        let engine = engine_with(
            "namespace ns { class MyTemplatedMethodClass { public: int x; }; \
             typedef MyTemplatedMethodClass MyTMCTypedef_t; }",
        );
        let direct = resolve(&engine, "ns::MyTemplatedMethodClass");
        let aliased = resolve(&engine, "ns::MyTMCTypedef_t");
        assert_eq!(direct, aliased);
        assert_eq!(aliased.alias(), Some("ns::MyTMCTypedef_t"));
    }

    #[test]
    fn template_instance_and_member_alias() {
        let engine = engine_with(
            "namespace ns { template<class T> struct Box { typedef T value_type; }; }",
        );
        let boxed = resolve(&engine, "ns::Box<int>");
        assert_eq!(boxed.to_string(), "ns::Box<int>");
        let member = resolve(&engine, "ns::Box<double>::value_type");
        assert_eq!(member.as_primitive(), Some(PrimitiveKind::Double));
    }

    #[test]
    fn alias_template_resolves_to_its_target() {
        let engine = engine_with(
            "template<class T> struct Vec {}; template<class T> using Ptr = T*; \
             template<class T> using Same = Vec<T>;",
        );
        let ptr = resolve(&engine, "Ptr<int>");
        assert_eq!(ptr, TypeDescriptor::primitive(PrimitiveKind::Int).pointer_to());
        assert_eq!(resolve(&engine, "Same<int>"), resolve(&engine, "Vec<int>"));
    }

    #[test]
    fn unknown_names_and_missing_arguments() {
        let engine = engine_with("template<class T> struct Box {};");
        let ctx = engine.context();
        let missing = templar_parser::parse_type("Nope").unwrap();
        assert!(matches!(
            ctx.resolve_type(&missing, &Scope::global()),
            Err(ResolutionError::UnknownName { .. })
        ));
        let bare = templar_parser::parse_type("Box").unwrap();
        assert!(matches!(
            ctx.resolve_type(&bare, &Scope::global()),
            Err(ResolutionError::UnderspecifiedTemplate { .. })
        ));
    }

    #[test]
    fn default_arguments_complete_the_key() {
        let engine = engine_with("template<class T, class U = int> struct Pair {};");
        assert_eq!(resolve(&engine, "Pair<double>"), resolve(&engine, "Pair<double, int>"));
    }
}
