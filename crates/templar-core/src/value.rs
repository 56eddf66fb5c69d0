//! Inputs from the dynamically-typed calling environment.

use crate::TypeDescriptor;

/// A runtime call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An untyped integer; its width is chosen at resolution time.
    Int(i128),
    Float(f64),
    Bool(bool),
    Str(String),
    /// The host's null / `nullptr`.
    Null,
    /// An ordered sequence, convertible to a sequence container.
    List(Vec<Value>),
    /// A host object that already carries an exact target type (an lvalue).
    Typed(TypeDescriptor),
    /// An instance of a target-language class.
    Instance { ty: TypeDescriptor, rvalue: bool },
    /// A named enumerator.
    Enumerator { ty: TypeDescriptor, value: i128 },
    /// A host callable.
    Callable { arity: usize },
}

impl Value {
    /// An lvalue instance of `ty`.
    pub fn instance(ty: TypeDescriptor) -> Self {
        Value::Instance { ty, rvalue: false }
    }

    /// An instance passed through `std::move`.
    pub fn moved(ty: TypeDescriptor) -> Self {
        Value::Instance { ty, rvalue: true }
    }

    pub fn typed(ty: TypeDescriptor) -> Self {
        Value::Typed(ty)
    }

    pub fn str(text: impl Into<String>) -> Self {
        Value::Str(text.into())
    }

    /// Short description for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Value::Int(v) => v.to_string(),
            Value::Float(v) => format!("{v:?}"),
            Value::Bool(v) => v.to_string(),
            Value::Str(s) => format!("{s:?}"),
            Value::Null => "nullptr".to_string(),
            Value::List(items) => {
                let items: Vec<String> = items.iter().map(Value::describe).collect();
                format!("[{}]", items.join(", "))
            }
            Value::Typed(ty) | Value::Instance { ty, .. } | Value::Enumerator { ty, .. } => ty.to_string(),
            Value::Callable { arity } => format!("<callable/{arity}>"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(i128::from(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i128::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

/// An explicit template-argument token, as supplied in `name[args]`.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateArg {
    /// A spelled type, or a comma-separated list of them.
    Name(String),
    Int(i128),
    Bool(bool),
    /// An already resolved type (a class object or alias entity from the host).
    Type(TypeDescriptor),
}

impl TemplateArg {
    pub fn describe(&self) -> String {
        match self {
            TemplateArg::Name(name) => name.clone(),
            TemplateArg::Int(v) => v.to_string(),
            TemplateArg::Bool(v) => v.to_string(),
            TemplateArg::Type(ty) => ty.to_string(),
        }
    }
}

impl From<&str> for TemplateArg {
    fn from(v: &str) -> Self {
        TemplateArg::Name(v.to_string())
    }
}

impl From<String> for TemplateArg {
    fn from(v: String) -> Self {
        TemplateArg::Name(v)
    }
}

impl From<i32> for TemplateArg {
    fn from(v: i32) -> Self {
        TemplateArg::Int(i128::from(v))
    }
}

impl From<i64> for TemplateArg {
    fn from(v: i64) -> Self {
        TemplateArg::Int(i128::from(v))
    }
}

impl From<bool> for TemplateArg {
    fn from(v: bool) -> Self {
        TemplateArg::Bool(v)
    }
}

impl From<TypeDescriptor> for TemplateArg {
    fn from(v: TypeDescriptor) -> Self {
        TemplateArg::Type(v)
    }
}
