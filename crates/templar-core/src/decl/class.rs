use std::sync::Arc;

use bitflags::bitflags;

use super::Declaration;
use crate::TypeName;

bitflags! {
    /// Engine-relevant properties of a class template.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClassTraits: u8 {
        /// Constructible from an ordered sequence of its element type.
        const SEQUENCE = 1 << 0;
        /// Wraps a host callable.
        const CALLABLE = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
}

/// A base class as spelled in the class head.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaseSpec {
    pub ty: TypeName,
    pub access: Access,
}

/// `using Base<T>::member;` inside a class body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsingDecl {
    pub base: TypeName,
    pub member: String,
}

impl UsingDecl {
    /// `using Base::Base;`, which inherits constructors and names no member.
    pub fn inherits_constructors(&self) -> bool {
        self.base
            .path()
            .and_then(|path| path.last())
            .is_some_and(|segment| segment.name == self.member)
    }
}

/// A class or struct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ClassDecl {
    pub is_struct: bool,
    pub bases: Vec<BaseSpec>,
    pub members: Vec<Arc<Declaration>>,
    pub usings: Vec<UsingDecl>,
    pub traits: ClassTraits,
    /// False for a forward declaration.
    pub complete: bool,
}

impl ClassDecl {
    pub fn members_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Arc<Declaration>> + 'a {
        self.members.iter().filter(move |m| m.name == name)
    }

    /// Using-declarations of members named `name`.
    pub fn usings_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a UsingDecl> + 'a {
        self.usings
            .iter()
            .filter(move |u| u.member == name && !u.inherits_constructors())
    }

    pub fn inherited_constructors(&self) -> impl Iterator<Item = &UsingDecl> {
        self.usings.iter().filter(|u| u.inherits_constructors())
    }

    pub fn constructors(&self) -> impl Iterator<Item = &Arc<Declaration>> {
        self.members.iter().filter(|m| m.is_constructor())
    }

    /// Whether any member or using-declaration introduces `name`.
    pub fn declares(&self, name: &str) -> bool {
        self.members_named(name).next().is_some() || self.usings_named(name).next().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Enumerator {
    pub name: String,
    pub value: i128,
}

/// An enumeration. Unscoped enumerators are also visible in the enclosing scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct EnumDecl {
    pub scoped: bool,
    pub underlying: Option<TypeName>,
    pub enumerators: Vec<Enumerator>,
}
