//! Classes as lookup frames, and name lookup inside them.
//!
//! A class type resolves to one cached class [`Entity`] whose frame holds
//! the chosen declaration, its template bindings and resolved bases.
//! Member lookup follows the hiding rule: the first class on the way up
//! the hierarchy that declares the name ends the search, and only its
//! using-declarations reach into the bases again.

use std::sync::Arc;

use templar_core::decl::{DeclKind, Declaration};
use templar_core::{BaseType, InstantiationKey, ResolutionError, TypeDescriptor, TypeHash, TypeHead};

use crate::build::EntityParts;
use crate::context::{Bindings, ClassFrame, Origin, ResolutionContext, Scope};
use crate::entity::{Entity, EntityKind};

/// A member found by lookup, with the frame it was declared in.
#[derive(Debug, Clone)]
pub(crate) struct MemberHit {
    pub decl: Arc<Declaration>,
    pub frame: Arc<ClassFrame>,
}

impl ResolutionContext<'_> {
    /// Declaration behind a class, enum or template identity.
    pub fn origin(&self, id: TypeHash) -> Result<Origin, ResolutionError> {
        if let Some(origin) = self.recorded_origin(id) {
            return Ok(origin);
        }
        let decl = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| ResolutionError::Internal(format!("no declaration with identity {id}")))?;
        let parent = self.enclosing_frame(&decl)?;
        Ok(Origin { decl, parent })
    }

    /// Frame of the plain class `decl` is nested in. Members of class
    /// templates only have a frame through a recorded origin.
    fn enclosing_frame(&self, decl: &Declaration) -> Result<Option<Arc<ClassFrame>>, ResolutionError> {
        let (_, classes) = self.store.scope_position(&decl.scope);
        let Some(outer) = classes.last() else {
            return Ok(None);
        };
        if classes.iter().any(|class| class.is_template()) {
            return Ok(None);
        }
        let ty = TypeDescriptor::class(templar_core::ClassRef::new(outer.id, outer.qualified_name().to_string()));
        self.class_frame(&ty).map(Some)
    }

    pub fn class_frame(&self, ty: &TypeDescriptor) -> Result<Arc<ClassFrame>, ResolutionError> {
        let entity = self.class_entity(ty)?;
        entity.frame.clone().ok_or_else(|| ResolutionError::UnknownName {
            name: ty.to_string(),
            scope: "class types".to_string(),
        })
    }

    /// The class or enum entity of `ty`'s base, created on first use.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn class_entity(&self, ty: &TypeDescriptor) -> Result<Arc<Entity>, ResolutionError> {
        let unqualified = ty.unqualified_base();
        let key = match &unqualified.base {
            BaseType::Class(class) | BaseType::Enum(class) => InstantiationKey::plain(class.id, class.name.clone()),
            BaseType::Instance(key) => (**key).clone(),
            _ => {
                return Err(ResolutionError::UnknownName {
                    name: ty.to_string(),
                    scope: "class types".to_string(),
                });
            }
        };
        if let Some(entity) = self.core.cache.get(&key) {
            return Ok(entity);
        }
        // a forward declaration may still get its definition
        if key.is_plain() {
            let origin = self.origin(key.decl)?;
            if origin.decl.as_class().is_some_and(|class| !class.complete) {
                return self.incomplete_entity(&key, &unqualified);
            }
        }
        let entity = self.core.cache.get_or_create(&key, || self.build_class(&key, &unqualified))?;
        if !key.is_plain() {
            self.core.exposer.expose(entity.qualified_name(), &entity);
        }
        Ok(entity)
    }

    /// Incomplete classes are shared within one store generation only; a
    /// later registration may define them.
    fn incomplete_entity(&self, key: &InstantiationKey, ty: &TypeDescriptor) -> Result<Arc<Entity>, ResolutionError> {
        let generation = self.store.generation();
        if let Some((cached, entity)) = self.core.incomplete.read().get(key) {
            if *cached == generation {
                return Ok(entity.clone());
            }
        }
        let entity = Arc::new(self.build_class(key, ty)?);
        let mut table = self.core.incomplete.write();
        match table.get(key) {
            Some((cached, existing)) if *cached == generation => Ok(existing.clone()),
            _ => {
                table.insert(key.clone(), (generation, entity.clone()));
                Ok(entity)
            }
        }
    }

    fn build_class(&self, key: &InstantiationKey, ty: &TypeDescriptor) -> Result<Entity, ResolutionError> {
        let _depth = self.enter(key)?;
        let origin = self.origin(key.decl)?;
        let owner = origin.parent.as_ref().map(|parent| parent.ty.clone());
        if matches!(origin.decl.kind, DeclKind::Enum(_)) {
            return self.build_entity(EntityParts {
                key: key.clone(),
                kind: EntityKind::Enum,
                declaration: origin.decl,
                signature: None,
                result_type: None,
                ty: Some(ty.clone()),
                owner,
                frame: None,
            });
        }

        let namespace = match &origin.parent {
            Some(parent) => parent.namespace.clone(),
            None => origin.decl.scope.clone(),
        };
        let (decl, bindings) = if key.is_plain() {
            (origin.decl.clone(), Bindings::default())
        } else {
            let scope = Scope::of_declaration(&origin.decl, origin.parent.as_ref());
            self.select_specialization(&origin.decl, key, &scope)?
        };

        // bases are looked up from inside the class, before it has any
        let provisional = Arc::new(ClassFrame {
            decl: decl.clone(),
            ty: ty.clone(),
            bindings: bindings.clone(),
            parent: origin.parent.clone(),
            namespace: namespace.clone(),
            bases: Vec::new(),
        });
        let scope = Scope::of_class(&provisional);
        let mut bases = Vec::new();
        for base in decl.as_class().map(|class| class.bases.as_slice()).unwrap_or_default() {
            bases.push(self.resolve_type(&base.ty, &scope)?.unqualified_base());
        }
        let frame = Arc::new(ClassFrame {
            decl: decl.clone(),
            ty: ty.clone(),
            bindings,
            parent: origin.parent.clone(),
            namespace,
            bases,
        });
        self.build_entity(EntityParts {
            key: key.clone(),
            kind: EntityKind::Class,
            declaration: decl,
            signature: None,
            result_type: None,
            ty: Some(ty.clone()),
            owner,
            frame: Some(frame),
        })
    }

    /// Non-type members named `name` visible in `frame`.
    ///
    /// Constructors never take part; they are found through
    /// [`constructors`](Self::constructors).
    pub fn member_lookup(&self, frame: &Arc<ClassFrame>, name: &str) -> Result<Vec<MemberHit>, ResolutionError> {
        let Some(class) = frame.class() else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<MemberHit> = class
            .members_named(name)
            .filter(|m| !m.is_type() && !m.is_constructor() && !m.is_specialization())
            .map(|decl| MemberHit {
                decl: decl.clone(),
                frame: frame.clone(),
            })
            .collect();
        let usings: Vec<_> = class.usings_named(name).collect();
        if !hits.is_empty() || !usings.is_empty() {
            let scope = Scope::of_class(frame);
            for using in usings {
                let base = self.resolve_type(&using.base, &scope)?;
                let base_frame = self.class_frame(&base)?;
                for hit in self.member_lookup(&base_frame, name)? {
                    if !hits.iter().any(|h| h.decl.id == hit.decl.id && h.frame.identity() == hit.frame.identity()) {
                        hits.push(hit);
                    }
                }
            }
            return Ok(hits);
        }
        for base in &frame.bases {
            let base_frame = self.class_frame(base)?;
            hits.extend(self.member_lookup(&base_frame, name)?);
        }
        Ok(hits)
    }

    /// Declared constructors plus those inherited with `using Base::Base;`.
    /// Copy and move constructors are not inherited.
    pub fn constructors(&self, frame: &Arc<ClassFrame>) -> Result<Vec<MemberHit>, ResolutionError> {
        let Some(class) = frame.class() else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<MemberHit> = class
            .constructors()
            .filter(|ctor| !ctor.is_specialization())
            .map(|decl| MemberHit {
                decl: decl.clone(),
                frame: frame.clone(),
            })
            .collect();
        let scope = Scope::of_class(frame);
        for using in class.inherited_constructors() {
            let base = self.resolve_type(&using.base, &scope)?;
            let base_frame = self.class_frame(&base)?;
            let base_name = base_frame.decl.name.clone();
            hits.extend(
                self.constructors(&base_frame)?
                    .into_iter()
                    .filter(|hit| !is_copy_or_move(&hit.decl, &base_name)),
            );
        }
        Ok(hits)
    }

    /// Entity of a data member, static data member or namespace variable.
    pub fn variable_entity(&self, decl: &Arc<Declaration>, owner: Option<&Arc<ClassFrame>>) -> Result<Arc<Entity>, ResolutionError> {
        let DeclKind::Variable(variable) = &decl.kind else {
            return Err(ResolutionError::Internal(format!("'{}' is not a variable", decl.name)));
        };
        let (id, name, scope) = match owner {
            Some(frame) => {
                let id = if frame.is_plain() {
                    decl.id
                } else {
                    TypeHash::from_member(frame.identity(), decl.id)
                };
                (id, format!("{}::{}", frame.display(), decl.name), Scope::of_class(frame))
            }
            None => (decl.id, decl.qualified_name().to_string(), Scope::namespace(decl.scope.clone())),
        };
        let key = InstantiationKey::plain(id, name);
        self.core.cache.get_or_create(&key, || {
            let ty = self.resolve_type(&variable.ty, &scope)?;
            self.build_entity(EntityParts {
                key: key.clone(),
                kind: EntityKind::Variable,
                declaration: decl.clone(),
                signature: None,
                result_type: Some(self.reduce(ty.clone())),
                ty: Some(ty),
                owner: owner.map(|frame| frame.ty.clone()),
                frame: None,
            })
        })
    }
}

pub(crate) fn is_copy_or_move(ctor: &Declaration, class_name: &str) -> bool {
    let Some(func) = ctor.as_function() else {
        return false;
    };
    match func.params.as_slice() {
        [param] => {
            param.ty.reference != templar_core::RefKind::None
                && matches!(&param.ty.head, TypeHead::Path(path)
                    if path.last().is_some_and(|segment| segment.name == class_name))
        }
        _ => false,
    }
}
