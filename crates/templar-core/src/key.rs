//! Instantiation keys: declaration identity plus an ordered argument signature.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::{ClassRef, TypeDescriptor, TypeHash};

/// One resolved template argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyArg {
    /// A type or a non-type value.
    Type(TypeDescriptor),
    /// A template used as a template-template argument.
    Template(ClassRef),
    /// The contents of a parameter pack, possibly empty.
    Pack(Vec<KeyArg>),
}

impl KeyArg {
    pub fn as_type(&self) -> Option<&TypeDescriptor> {
        match self {
            KeyArg::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_pack(&self) -> Option<&[KeyArg]> {
        match self {
            KeyArg::Pack(items) => Some(items),
            _ => None,
        }
    }

    pub fn type_hash(&self) -> TypeHash {
        match self {
            KeyArg::Type(ty) => ty.type_hash(),
            KeyArg::Template(template) => template.id,
            KeyArg::Pack(items) => {
                let hashes: Vec<TypeHash> = items.iter().map(KeyArg::type_hash).collect();
                TypeHash::from_template_instance(TypeHash::from_name("<pack>"), &hashes)
            }
        }
    }

    /// Iterate the argument with packs flattened in place.
    pub fn flatten(&self) -> Box<dyn Iterator<Item = &KeyArg> + '_> {
        match self {
            KeyArg::Pack(items) => Box::new(items.iter().flat_map(KeyArg::flatten)),
            other => Box::new(std::iter::once(other)),
        }
    }

    fn write_spelling(&self, f: &mut fmt::Formatter<'_>, canonical: bool) -> fmt::Result {
        match self {
            KeyArg::Type(ty) => ty.write_spelling(f, canonical),
            KeyArg::Template(template) => f.write_str(&template.name),
            KeyArg::Pack(_) => write_arg_list(f, std::slice::from_ref(self), canonical),
        }
    }
}

impl From<TypeDescriptor> for KeyArg {
    fn from(ty: TypeDescriptor) -> Self {
        KeyArg::Type(ty)
    }
}

impl fmt::Display for KeyArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_spelling(f, false)
    }
}

/// Write `a,b,c` with packs flattened and no spaces after commas.
pub(crate) fn write_arg_list(f: &mut fmt::Formatter<'_>, args: &[KeyArg], canonical: bool) -> fmt::Result {
    let mut first = true;
    for arg in args.iter().flat_map(KeyArg::flatten) {
        if !first {
            f.write_str(",")?;
        }
        first = false;
        arg.write_spelling(f, canonical)?;
    }
    Ok(())
}

/// Display form of an explicit argument list, e.g. `int,double`.
pub fn format_args(args: &[KeyArg]) -> String {
    struct Args<'a>(&'a [KeyArg]);
    impl fmt::Display for Args<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write_arg_list(f, self.0, false)
        }
    }
    Args(args).to_string()
}

/// Declaration identity plus resolved arguments.
///
/// Keys with no arguments identify plain (non-template) declarations. The
/// `name` is carried for display and excluded from equality.
#[derive(Clone)]
pub struct InstantiationKey {
    pub decl: TypeHash,
    pub name: Arc<str>,
    pub args: Vec<KeyArg>,
}

impl InstantiationKey {
    pub fn new(decl: TypeHash, name: impl Into<Arc<str>>, args: Vec<KeyArg>) -> Self {
        Self { decl, name: name.into(), args }
    }

    /// Key of a non-template declaration.
    pub fn plain(decl: TypeHash, name: impl Into<Arc<str>>) -> Self {
        Self::new(decl, name, Vec::new())
    }

    pub fn is_plain(&self) -> bool {
        self.args.is_empty()
    }

    /// Unqualified part of the name.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    /// Identity hash of the instance.
    pub fn instance_hash(&self) -> TypeHash {
        if self.args.is_empty() {
            return self.decl;
        }
        let hashes: Vec<TypeHash> = self.args.iter().map(KeyArg::type_hash).collect();
        TypeHash::from_template_instance(self.decl, &hashes)
    }

    /// Arguments with packs flattened.
    pub fn flat_args(&self) -> Vec<&KeyArg> {
        self.args.iter().flat_map(KeyArg::flatten).collect()
    }

    /// `name<args>` with aliases resolved and no spaces after commas.
    pub fn canonical_name(&self) -> String {
        Spelling { key: self, canonical: true }.to_string()
    }

    pub(crate) fn write_spelling(&self, f: &mut fmt::Formatter<'_>, canonical: bool) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.args.is_empty() {
            return Ok(());
        }
        f.write_str("<")?;
        write_arg_list(f, &self.args, canonical)?;
        f.write_str(">")
    }
}

struct Spelling<'a> {
    key: &'a InstantiationKey,
    canonical: bool,
}

impl fmt::Display for Spelling<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.key.write_spelling(f, self.canonical)
    }
}

impl PartialEq for InstantiationKey {
    fn eq(&self, other: &Self) -> bool {
        self.decl == other.decl && self.args == other.args
    }
}

impl Eq for InstantiationKey {}

impl Hash for InstantiationKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.decl.hash(state);
        self.args.hash(state);
    }
}

impl fmt::Debug for InstantiationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstantiationKey({})", self.canonical_name())
    }
}

impl fmt::Display for InstantiationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_spelling(f, false)
    }
}
