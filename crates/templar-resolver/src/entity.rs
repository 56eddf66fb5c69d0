//! Resolved entities.

use std::fmt;
use std::sync::Arc;

use templar_core::decl::Declaration;
use templar_core::{InstantiationKey, TypeDescriptor};

use crate::context::ClassFrame;
use crate::instantiator::CompiledHandle;

/// What an entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Function,
    Method,
    StaticMethod,
    Constructor,
    Class,
    Alias,
    Variable,
    Enum,
}

impl EntityKind {
    pub fn is_callable(self) -> bool {
        matches!(
            self,
            EntityKind::Function | EntityKind::Method | EntityKind::StaticMethod | EntityKind::Constructor
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Function => "function",
            EntityKind::Method => "method",
            EntityKind::StaticMethod => "static method",
            EntityKind::Constructor => "constructor",
            EntityKind::Class => "class",
            EntityKind::Alias => "alias",
            EntityKind::Variable => "variable",
            EntityKind::Enum => "enum",
        })
    }
}

/// Substituted parameter list of a callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<TypeDescriptor>,
    /// `None` for constructors and deduced (`auto`) returns.
    pub ret: Option<TypeDescriptor>,
    /// Trailing C-style ellipsis.
    pub variadic: bool,
    /// Parameters without defaults.
    pub required: usize,
}

impl Signature {
    /// Whether a call with `count` arguments fits the parameter list.
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.required && (self.variadic || count <= self.params.len())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{param}")?;
        }
        if self.variadic {
            f.write_str(if self.params.is_empty() { "..." } else { ",..." })?;
        }
        f.write_str(")")
    }
}

/// A concrete function, class, variable or enum produced for one key.
///
/// Entities are created once by the instantiation cache and shared by
/// reference afterwards; two resolutions of the same key return the same
/// `Arc`.
#[derive(Debug)]
pub struct Entity {
    pub(crate) key: Arc<InstantiationKey>,
    pub(crate) kind: EntityKind,
    pub(crate) declaration: Arc<Declaration>,
    pub(crate) display_name: String,
    pub(crate) qualified_name: String,
    pub(crate) signature: Option<Signature>,
    pub(crate) result_type: Option<TypeDescriptor>,
    pub(crate) ty: Option<TypeDescriptor>,
    pub(crate) owner: Option<TypeDescriptor>,
    pub(crate) frame: Option<Arc<ClassFrame>>,
    pub(crate) handle: CompiledHandle,
    pub(crate) pre_instantiated: bool,
}

impl Entity {
    pub fn key(&self) -> &InstantiationKey {
        &self.key
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// The declaration the entity was produced from (a specialization when
    /// one was selected).
    pub fn declaration(&self) -> &Arc<Declaration> {
        &self.declaration
    }

    /// Unqualified name with template arguments, e.g. `get_size<double>`.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// e.g. `ns::A<int,double>::sa<int>`.
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Name with aliases resolved, usable as a stable identifier.
    pub fn canonical_name(&self) -> String {
        self.key.canonical_name()
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// `ns::A<int,double>::sa<int,double>(int&&,double&&)`.
    pub fn signature_display(&self) -> String {
        match &self.signature {
            Some(signature) => format!("{}{signature}", self.qualified_name),
            None => self.qualified_name.clone(),
        }
    }

    /// Result type after type reducers.
    pub fn result_type(&self) -> Option<&TypeDescriptor> {
        self.result_type.as_ref()
    }

    /// The type a class, alias, enum or variable entity stands for.
    pub fn ty(&self) -> Option<&TypeDescriptor> {
        self.ty.as_ref()
    }

    /// Class type of a member.
    pub fn owner(&self) -> Option<&TypeDescriptor> {
        self.owner.as_ref()
    }

    pub fn handle(&self) -> CompiledHandle {
        self.handle
    }

    pub fn is_template_instance(&self) -> bool {
        !self.key.is_plain()
    }

    /// Covered by an explicit instantiation record.
    pub fn is_pre_instantiated(&self) -> bool {
        self.pre_instantiated
    }

    /// Whether a class entity has a definition.
    pub fn is_complete(&self) -> bool {
        self.frame
            .as_ref()
            .and_then(|frame| frame.decl.as_class())
            .is_some_and(|class| class.complete)
    }

    /// Names of class members, in declaration order and without duplicates.
    pub fn member_names(&self) -> Vec<String> {
        let Some(class) = self.frame.as_ref().and_then(|frame| frame.decl.as_class()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = Vec::new();
        let declared = class.members.iter().map(|m| m.name.as_str());
        let used = class
            .usings
            .iter()
            .filter(|u| !u.inherits_constructors())
            .map(|u| u.member.as_str());
        for name in declared.chain(used) {
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature_display())
    }
}
