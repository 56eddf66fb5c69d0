//! Unresolved type spellings.
//!
//! A [`TypeName`] is what the parser produces for a type as written in source
//! (`const std::vector<T>&`, `Args&&...`, `double(*)(int)`). Names inside it
//! are not yet bound to declarations; the resolver turns it into a
//! [`TypeDescriptor`](crate::TypeDescriptor) or a pattern once the lookup
//! scope and template parameters are known.

use std::fmt;

use crate::{PrimitiveKind, Qualifiers, RefKind};

/// A spelled type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    pub cv: Qualifiers,
    pub head: TypeHead,
    /// Pointer levels, innermost first.
    pub pointers: Vec<Qualifiers>,
    pub reference: RefKind,
    /// Followed by `...` (pack expansion).
    pub pack_expansion: bool,
}

/// The part of a spelled type that names something.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeHead {
    Builtin(PrimitiveKind),
    Path(TypePath),
    /// `ret(params)`; with pointer levels this is a function pointer.
    Function {
        ret: Box<TypeName>,
        params: Vec<TypeName>,
        variadic: bool,
    },
    /// `auto` or `decltype(auto)` return placeholder.
    Auto,
}

/// A possibly qualified name like `::std::vector<int>::iterator`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypePath {
    /// Leading `::`.
    pub global: bool,
    pub segments: Vec<PathSegment>,
}

/// One `name<args>` component of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment {
    pub name: String,
    pub args: Option<Vec<TemplateArgName>>,
}

/// A spelled template argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateArgName {
    Type(TypeName),
    Int(i128),
    Bool(bool),
    /// An expression the engine does not evaluate, kept verbatim.
    Expr(String),
}

impl TypeName {
    pub fn new(head: TypeHead) -> Self {
        Self {
            cv: Qualifiers::empty(),
            head,
            pointers: Vec::new(),
            reference: RefKind::None,
            pack_expansion: false,
        }
    }

    pub fn builtin(kind: PrimitiveKind) -> Self {
        Self::new(TypeHead::Builtin(kind))
    }

    /// A single unqualified name without arguments.
    pub fn simple(name: impl Into<String>) -> Self {
        Self::new(TypeHead::Path(TypePath {
            global: false,
            segments: vec![PathSegment { name: name.into(), args: None }],
        }))
    }

    pub fn path(&self) -> Option<&TypePath> {
        match &self.head {
            TypeHead::Path(path) => Some(path),
            _ => None,
        }
    }

    /// The identifier when this is a bare, unqualified, argument-free name.
    pub fn as_identifier(&self) -> Option<&str> {
        let path = self.path()?;
        match path.segments.as_slice() {
            [segment] if !path.global && segment.args.is_none() => Some(&segment.name),
            _ => None,
        }
    }

    /// Whether there are no modifiers around the head.
    pub fn is_bare(&self) -> bool {
        self.cv.is_empty() && self.pointers.is_empty() && self.reference == RefKind::None && !self.pack_expansion
    }

    /// Whether `ident` appears anywhere in this spelling.
    pub fn mentions(&self, ident: &str) -> bool {
        match &self.head {
            TypeHead::Builtin(_) | TypeHead::Auto => false,
            TypeHead::Path(path) => path.segments.iter().any(|segment| {
                segment.name == ident
                    || segment.args.iter().flatten().any(|arg| match arg {
                        TemplateArgName::Type(ty) => ty.mentions(ident),
                        TemplateArgName::Expr(text) => text.split(|c: char| !c.is_alphanumeric() && c != '_').any(|w| w == ident),
                        TemplateArgName::Int(_) | TemplateArgName::Bool(_) => false,
                    })
            }),
            TypeHead::Function { ret, params, .. } => ret.mentions(ident) || params.iter().any(|p| p.mentions(ident)),
        }
    }
}

impl TypePath {
    /// Last segment of the path.
    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }
}

fn write_cv_prefix(f: &mut fmt::Formatter<'_>, cv: Qualifiers) -> fmt::Result {
    if cv.contains(Qualifiers::CONST) {
        f.write_str("const ")?;
    }
    if cv.contains(Qualifiers::VOLATILE) {
        f.write_str("volatile ")?;
    }
    Ok(())
}

fn write_pointers(f: &mut fmt::Formatter<'_>, pointers: &[Qualifiers]) -> fmt::Result {
    for level in pointers {
        f.write_str("*")?;
        if level.contains(Qualifiers::CONST) {
            f.write_str(" const")?;
        }
        if level.contains(Qualifiers::VOLATILE) {
            f.write_str(" volatile")?;
        }
    }
    Ok(())
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.head {
            TypeHead::Function { ret, params, variadic } => {
                write!(f, "{ret}")?;
                if !self.pointers.is_empty() {
                    f.write_str("(")?;
                    write_pointers(f, &self.pointers)?;
                    f.write_str(")")?;
                }
                f.write_str("(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{param}")?;
                }
                if *variadic {
                    f.write_str(if params.is_empty() { "..." } else { ",..." })?;
                }
                f.write_str(")")?;
            }
            head => {
                write_cv_prefix(f, self.cv)?;
                match head {
                    TypeHead::Builtin(kind) => f.write_str(kind.name())?,
                    TypeHead::Path(path) => write!(f, "{path}")?,
                    TypeHead::Auto => f.write_str("auto")?,
                    TypeHead::Function { .. } => {}
                }
                write_pointers(f, &self.pointers)?;
            }
        }
        match self.reference {
            RefKind::None => {}
            RefKind::LValue => f.write_str("&")?,
            RefKind::RValue => f.write_str("&&")?,
        }
        if self.pack_expansion {
            f.write_str("...")?;
        }
        Ok(())
    }
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.global {
            f.write_str("::")?;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("::")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(args) = &self.args {
            f.write_str("<")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

impl fmt::Display for TemplateArgName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateArgName::Type(ty) => write!(f, "{ty}"),
            TemplateArgName::Int(value) => write!(f, "{value}"),
            TemplateArgName::Bool(value) => write!(f, "{value}"),
            TemplateArgName::Expr(text) => f.write_str(text),
        }
    }
}
