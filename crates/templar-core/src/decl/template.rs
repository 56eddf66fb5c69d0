//! Template headers: parameter lists, defaults and constraints.

use std::fmt;

use crate::{TemplateArgName, TypeName};

/// Kind of a template parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// `typename T`
    Type,
    /// `int N`, with the spelled underlying type.
    NonType(TypeName),
    /// `template<class> class C`
    Template,
    /// `typename... Ts` or `int... Ns`, with the element kind.
    Pack(Box<ParamKind>),
}

impl ParamKind {
    pub fn is_pack(&self) -> bool {
        matches!(self, ParamKind::Pack(_))
    }

    /// Kind of a single element (the kind itself for non-packs).
    pub fn element(&self) -> &ParamKind {
        match self {
            ParamKind::Pack(inner) => inner,
            other => other,
        }
    }

    fn write_signature(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Type => f.write_str("typename"),
            ParamKind::NonType(ty) => write!(f, "{ty}"),
            ParamKind::Template => f.write_str("template"),
            ParamKind::Pack(inner) => {
                inner.write_signature(f)?;
                f.write_str("...")
            }
        }
    }
}

/// One template parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParamKind,
    pub default: Option<TemplateArgName>,
    pub position: usize,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            position: 0,
        }
    }

    pub fn with_default(mut self, default: TemplateArgName) -> Self {
        self.default = Some(default);
        self
    }
}

/// A predicate on deduced arguments (enable_if-style).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constraint {
    Integral(String),
    Floating(String),
    HasMember { param: String, member: String },
}

/// `template<...>` header of a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TemplateHeader {
    pub params: Vec<ParameterSpec>,
    pub constraints: Vec<Constraint>,
}

impl TemplateHeader {
    /// Build a header, numbering parameter positions.
    pub fn new(mut params: Vec<ParameterSpec>) -> Self {
        for (position, param) in params.iter_mut().enumerate() {
            param.position = position;
        }
        Self {
            params,
            constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn pack_index(&self) -> Option<usize> {
        self.params.iter().position(|p| p.kind.is_pack())
    }

    pub fn is_variadic(&self) -> bool {
        self.pack_index().is_some()
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Check structural invariants. Function templates may declare
    /// deducible parameters after a pack; class and alias templates may not.
    pub fn validate(&self, allow_after_pack: bool) -> Result<(), String> {
        for (i, param) in self.params.iter().enumerate() {
            if !param.name.is_empty() && self.params[..i].iter().any(|p| p.name == param.name) {
                return Err(format!("duplicate parameter name '{}'", param.name));
            }
        }
        let packs = self.params.iter().filter(|p| p.kind.is_pack()).count();
        if packs > 1 {
            return Err("more than one parameter pack".to_string());
        }
        if let Some(pack) = self.pack_index() {
            if self.params[pack].default.is_some() {
                return Err("a parameter pack cannot have a default".to_string());
            }
            if !allow_after_pack && self.params[pack + 1..].iter().any(|p| p.default.is_none()) {
                return Err("parameter pack followed by a non-defaulted parameter".to_string());
            }
        }
        Ok(())
    }

    /// Shape of the header, e.g. `<typename,int,typename...>`; part of the
    /// identity of function templates.
    pub fn signature(&self) -> String {
        struct Sig<'a>(&'a TemplateHeader);
        impl fmt::Display for Sig<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("<")?;
                for (i, param) in self.0.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    param.kind.write_signature(f)?;
                }
                f.write_str(">")
            }
        }
        Sig(self).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PrimitiveKind;

    fn pack(name: &str) -> ParameterSpec {
        ParameterSpec::new(name, ParamKind::Pack(Box::new(ParamKind::Type)))
    }

    #[test]
    fn positions_are_numbered() {
        let header = TemplateHeader::new(vec![ParameterSpec::new("A", ParamKind::Type), pack("Other")]);
        assert_eq!(header.params[1].position, 1);
        assert_eq!(header.pack_index(), Some(1));
        assert_eq!(header.signature(), "<typename,typename...>");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let header = TemplateHeader::new(vec![
            ParameterSpec::new("T", ParamKind::Type),
            ParameterSpec::new("T", ParamKind::NonType(TypeName::builtin(PrimitiveKind::Int))),
        ]);
        assert!(header.validate(true).is_err());
    }

    #[test]
    fn trailing_parameter_after_pack() {
        let header = TemplateHeader::new(vec![
            ParameterSpec::new("A", ParamKind::Type),
            pack("Other"),
            ParameterSpec::new("B", ParamKind::Type),
        ]);
        assert!(header.validate(true).is_ok());
        assert!(header.validate(false).is_err());

        let defaulted = TemplateHeader::new(vec![
            pack("Ts"),
            ParameterSpec::new("B", ParamKind::Type).with_default(TemplateArgName::Int(0)),
        ]);
        assert!(defaulted.validate(false).is_ok());
    }

    #[test]
    fn two_packs_are_rejected() {
        let header = TemplateHeader::new(vec![pack("A"), pack("B")]);
        assert!(header.validate(true).is_err());
    }
}
