//! Declarations as registered in the store.
//!
//! A [`Declaration`] is immutable once registered. Class declarations own
//! their member declarations; templates carry a [`TemplateHeader`]; partial
//! and full specializations carry the spelled argument pattern they apply to.

mod class;
mod function;
mod template;

use std::fmt;
use std::sync::Arc;

pub use class::{Access, BaseSpec, ClassDecl, ClassTraits, EnumDecl, Enumerator, UsingDecl};
pub use function::{FunctionDecl, FunctionParam, FunctionRole};
pub use template::{Constraint, ParamKind, ParameterSpec, TemplateHeader};

use crate::{QualifiedName, TemplateArgName, TypeHash, TypeName};

/// Opaque reference to a declaration's definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BodyRef(pub Option<Arc<str>>);

impl BodyRef {
    pub fn text(text: impl Into<Arc<str>>) -> Self {
        Self(Some(text.into()))
    }

    /// Whether a definition (possibly empty) was provided.
    pub fn is_defined(&self) -> bool {
        self.0.is_some()
    }
}

/// `using X = T;` or `typedef T X;`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AliasDecl {
    pub target: TypeName,
}

/// A field or static data member or namespace-scope variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableDecl {
    pub ty: TypeName,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Function(FunctionDecl),
    Class(ClassDecl),
    Alias(AliasDecl),
    Variable(VariableDecl),
    Enum(EnumDecl),
}

/// A named declaration, generic or not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Declaration {
    /// Assigned by the store at registration.
    pub id: TypeHash,
    pub name: String,
    /// Enclosing namespaces and classes, outermost first.
    pub scope: Vec<String>,
    pub template: Option<TemplateHeader>,
    /// For specializations, the argument pattern after the name.
    pub specialization: Option<Vec<TemplateArgName>>,
    pub kind: DeclKind,
    pub body: BodyRef,
    pub access: Access,
}

impl Declaration {
    pub fn new(name: impl Into<String>, kind: DeclKind) -> Self {
        Self {
            id: TypeHash::EMPTY,
            name: name.into(),
            scope: Vec::new(),
            template: None,
            specialization: None,
            kind,
            body: BodyRef::default(),
            access: Access::Public,
        }
    }

    pub fn with_template(mut self, header: TemplateHeader) -> Self {
        self.template = Some(header);
        self
    }

    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(self.name.clone(), self.scope.clone())
    }

    pub fn is_template(&self) -> bool {
        self.template.as_ref().is_some_and(|h| !h.is_empty()) && self.specialization.is_none()
    }

    pub fn is_specialization(&self) -> bool {
        self.specialization.is_some()
    }

    pub fn as_function(&self) -> Option<&FunctionDecl> {
        match &self.kind {
            DeclKind::Function(func) => Some(func),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassDecl> {
        match &self.kind {
            DeclKind::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.as_function().is_some_and(|f| f.role == crate::decl::FunctionRole::Constructor)
    }

    /// Whether this declaration introduces a type name.
    pub fn is_type(&self) -> bool {
        matches!(self.kind, DeclKind::Class(_) | DeclKind::Alias(_) | DeclKind::Enum(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            DeclKind::Function(f) => match f.role {
                FunctionRole::Free => "function",
                FunctionRole::Method => "method",
                FunctionRole::Static => "static method",
                FunctionRole::Constructor => "constructor",
            },
            DeclKind::Class(_) => "class",
            DeclKind::Alias(_) => "alias",
            DeclKind::Variable(_) => "variable",
            DeclKind::Enum(_) => "enum",
        }
    }

    /// Deterministic identity from the qualified name and spelled signature.
    pub fn compute_id(&self) -> TypeHash {
        let qualified = self.qualified_name().to_string();
        let mut id = match &self.kind {
            DeclKind::Function(func) => {
                let params: Vec<TypeHash> = func
                    .params
                    .iter()
                    .map(|p| TypeHash::from_name(&p.ty.to_string()))
                    .collect();
                let owner = TypeHash::from_name(&self.scope.join("::"));
                match func.role {
                    FunctionRole::Free => TypeHash::from_function(&qualified, &params),
                    FunctionRole::Method | FunctionRole::Static => {
                        TypeHash::from_method(owner, &self.name, &params, func.is_const)
                    }
                    FunctionRole::Constructor => TypeHash::from_constructor(owner, &params),
                }
                .mix(TypeHash(u64::from(func.variadic)))
            }
            _ => TypeHash::from_name(&qualified),
        };
        if let Some(header) = &self.template {
            if self.as_function().is_some() || self.specialization.is_some() {
                id = id.mix(TypeHash::from_name(&header.signature()));
            }
        }
        if let Some(args) = &self.specialization {
            let spelled: Vec<String> = args.iter().map(ToString::to_string).collect();
            id = id.mix(TypeHash::from_name(&spelled.join(",")));
        }
        id
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())?;
        if let Some(args) = &self.specialization {
            f.write_str("<")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        if let Some(func) = self.as_function() {
            f.write_str("(")?;
            for (i, param) in func.params.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", param.ty)?;
            }
            if func.variadic {
                f.write_str(if func.params.is_empty() { "..." } else { ",..." })?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// An explicit instantiation directive (`template class A<int>;`), optionally `extern`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExplicitInstantiation {
    pub target: TypeName,
    pub is_extern: bool,
    pub scope: Vec<String>,
}

/// One top-level item of parsed source text, before the store assigns
/// scopes and identities.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceItem {
    Namespace { name: String, items: Vec<SourceItem> },
    /// `using namespace a::b;`
    UsingDirective(Vec<String>),
    Declaration(Declaration),
    ExplicitInstantiation { target: TypeName, is_extern: bool },
}
