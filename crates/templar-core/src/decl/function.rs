use crate::TypeName;

/// How a function is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionRole {
    Free,
    Method,
    Static,
    Constructor,
}

/// One function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionParam {
    pub name: Option<String>,
    pub ty: TypeName,
    pub has_default: bool,
}

impl FunctionParam {
    pub fn new(ty: TypeName) -> Self {
        Self {
            name: None,
            ty,
            has_default: false,
        }
    }
}

/// A function, method, or constructor declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionDecl {
    pub params: Vec<FunctionParam>,
    /// `None` for constructors.
    pub ret: Option<TypeName>,
    /// C-style `...` after the named parameters.
    pub variadic: bool,
    pub role: FunctionRole,
    pub is_const: bool,
    pub is_explicit: bool,
}

impl FunctionDecl {
    pub fn new(role: FunctionRole, ret: Option<TypeName>, params: Vec<FunctionParam>) -> Self {
        Self {
            params,
            ret,
            variadic: false,
            role,
            is_const: false,
            is_explicit: false,
        }
    }

    /// Index of the parameter that expands a pack (`Args&&... args`).
    pub fn pack_param(&self) -> Option<usize> {
        self.params.iter().position(|p| p.ty.pack_expansion)
    }

    /// Number of parameters without defaults, excluding a pack expansion.
    pub fn required_params(&self) -> usize {
        self.params
            .iter()
            .filter(|p| !p.has_default && !p.ty.pack_expansion)
            .count()
    }

    pub fn is_member(&self) -> bool {
        matches!(self.role, FunctionRole::Method | FunctionRole::Constructor)
    }
}
