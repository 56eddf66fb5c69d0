//! Canonical type descriptors.
//!
//! A [`TypeDescriptor`] is the resolved form of a type or non-type value:
//! a base identity plus cv-qualifiers, pointer levels and a reference kind.
//! Alias spellings are carried for presentation only and never take part in
//! equality or hashing, so `MyTMCTypedef_t` and `MyTemplatedMethodClass`
//! produce the same [`InstantiationKey`](crate::InstantiationKey).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bitflags::bitflags;

use crate::{InstantiationKey, PrimitiveKind, TypeHash};

bitflags! {
    /// cv-qualifiers of one level of a type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Qualifiers: u8 {
        const CONST = 1 << 0;
        const VOLATILE = 1 << 1;
    }
}

impl Qualifiers {
    fn write_prefix(self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contains(Qualifiers::CONST) {
            f.write_str("const ")?;
        }
        if self.contains(Qualifiers::VOLATILE) {
            f.write_str("volatile ")?;
        }
        Ok(())
    }

    fn write_suffix(self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contains(Qualifiers::CONST) {
            f.write_str(" const")?;
        }
        if self.contains(Qualifiers::VOLATILE) {
            f.write_str(" volatile")?;
        }
        Ok(())
    }
}

/// Reference kind of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RefKind {
    #[default]
    None,
    LValue,
    RValue,
}

impl RefKind {
    /// Reference collapsing: applying `outer` to a type that already carries
    /// `self`. Any lvalue reference wins.
    pub fn collapse(self, outer: RefKind) -> RefKind {
        match (self, outer) {
            (RefKind::None, outer) => outer,
            (inner, RefKind::None) => inner,
            (RefKind::RValue, RefKind::RValue) => RefKind::RValue,
            _ => RefKind::LValue,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            RefKind::None => "",
            RefKind::LValue => "&",
            RefKind::RValue => "&&",
        }
    }
}

/// Identity of a declared class or enum. Compared by id only.
#[derive(Clone)]
pub struct ClassRef {
    pub id: TypeHash,
    pub name: Arc<str>,
}

impl ClassRef {
    pub fn new(id: TypeHash, name: impl Into<Arc<str>>) -> Self {
        Self { id, name: name.into() }
    }

    /// Reference a class by its qualified name.
    pub fn named(qualified: &str) -> Self {
        Self::new(TypeHash::from_name(qualified), qualified)
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClassRef {}

impl Hash for ClassRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassRef({})", self.name)
    }
}

/// A fixed-width literal used as a non-type template argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NonTypeValue {
    pub kind: PrimitiveKind,
    pub value: i128,
}

impl fmt::Display for NonTypeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.value) {
            (PrimitiveKind::Bool, 0) => f.write_str("false"),
            (PrimitiveKind::Bool, _) => f.write_str("true"),
            (_, value) => write!(f, "{value}"),
        }
    }
}

/// A function type `ret(params...)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub ret: TypeDescriptor,
    pub params: Vec<TypeDescriptor>,
    pub variadic: bool,
}

/// Base identity of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BaseType {
    Primitive(PrimitiveKind),
    Class(ClassRef),
    Enum(ClassRef),
    Instance(Arc<InstantiationKey>),
    Function(Arc<FunctionType>),
    /// Non-type argument.
    Value(NonTypeValue),
    /// A braced list whose elements share this element type.
    InitList(Box<TypeDescriptor>),
    /// A host callable accepting this many arguments.
    Callable(usize),
    Nullptr,
}

/// Presentation spelling carried alongside a descriptor. Always compares equal.
#[derive(Clone, Default)]
struct DisplayAlias(Option<Arc<str>>);

impl PartialEq for DisplayAlias {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl Eq for DisplayAlias {}

impl Hash for DisplayAlias {
    fn hash<H: Hasher>(&self, _: &mut H) {}
}

impl fmt::Debug for DisplayAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(alias) => write!(f, "{alias:?}"),
            None => f.write_str("-"),
        }
    }
}

/// Canonical description of a type or non-type value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    pub base: BaseType,
    /// cv-qualifiers of the base type.
    pub cv: Qualifiers,
    /// Pointer levels, innermost first, each with its own cv-qualifiers.
    pub pointers: Vec<Qualifiers>,
    pub reference: RefKind,
    alias: DisplayAlias,
}

impl TypeDescriptor {
    pub fn new(base: BaseType) -> Self {
        Self {
            base,
            cv: Qualifiers::empty(),
            pointers: Vec::new(),
            reference: RefKind::None,
            alias: DisplayAlias::default(),
        }
    }

    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::new(BaseType::Primitive(kind))
    }

    pub fn void() -> Self {
        Self::primitive(PrimitiveKind::Void)
    }

    pub fn class(class: ClassRef) -> Self {
        Self::new(BaseType::Class(class))
    }

    pub fn enumeration(class: ClassRef) -> Self {
        Self::new(BaseType::Enum(class))
    }

    pub fn instance(key: InstantiationKey) -> Self {
        Self::new(BaseType::Instance(Arc::new(key)))
    }

    pub fn function(ret: TypeDescriptor, params: Vec<TypeDescriptor>, variadic: bool) -> Self {
        Self::new(BaseType::Function(Arc::new(FunctionType { ret, params, variadic })))
    }

    pub fn value(kind: PrimitiveKind, value: i128) -> Self {
        Self::new(BaseType::Value(NonTypeValue { kind, value }))
    }

    pub fn init_list(element: TypeDescriptor) -> Self {
        Self::new(BaseType::InitList(Box::new(element)))
    }

    pub fn callable(arity: usize) -> Self {
        Self::new(BaseType::Callable(arity))
    }

    pub fn nullptr() -> Self {
        Self::new(BaseType::Nullptr)
    }

    fn modified(&self) -> Self {
        Self {
            alias: DisplayAlias::default(),
            ..self.clone()
        }
    }

    /// Add cv-qualifiers at the top level (the outermost pointer, or the base).
    pub fn with_cv(&self, quals: Qualifiers) -> Self {
        let mut out = self.modified();
        match out.pointers.last_mut() {
            Some(level) => *level |= quals,
            None => out.cv |= quals,
        }
        out
    }

    pub fn with_const(&self) -> Self {
        self.with_cv(Qualifiers::CONST)
    }

    pub fn pointer_to(&self) -> Self {
        let mut out = self.modified();
        out.reference = RefKind::None;
        out.pointers.push(Qualifiers::empty());
        out
    }

    pub fn lvalue_ref(&self) -> Self {
        self.with_reference(RefKind::LValue)
    }

    pub fn rvalue_ref(&self) -> Self {
        self.with_reference(RefKind::RValue)
    }

    /// Apply a reference with collapsing rules.
    pub fn with_reference(&self, reference: RefKind) -> Self {
        let mut out = self.modified();
        out.reference = out.reference.collapse(reference);
        out
    }

    pub fn strip_reference(&self) -> Self {
        if self.reference == RefKind::None {
            return self.clone();
        }
        let mut out = self.modified();
        out.reference = RefKind::None;
        out
    }

    /// Drop top-level cv-qualifiers (as done for by-value parameters).
    pub fn strip_top_cv(&self) -> Self {
        if self.top_cv().is_empty() {
            return self.clone();
        }
        let mut out = self.modified();
        match out.pointers.last_mut() {
            Some(level) => *level = Qualifiers::empty(),
            None => out.cv = Qualifiers::empty(),
        }
        out
    }

    /// Strip reference and top-level cv.
    pub fn decay(&self) -> Self {
        self.strip_reference().strip_top_cv()
    }

    /// The pointed-to type of a pointer.
    pub fn pointee(&self) -> Option<Self> {
        if self.pointers.is_empty() {
            return None;
        }
        let mut out = self.modified();
        out.reference = RefKind::None;
        out.pointers.pop();
        Some(out)
    }

    /// Innermost type with all pointer levels, references and cv removed.
    pub fn unqualified_base(&self) -> Self {
        Self::new(self.base.clone())
    }

    pub fn top_cv(&self) -> Qualifiers {
        self.pointers.last().copied().unwrap_or(self.cv)
    }

    pub fn is_const(&self) -> bool {
        self.top_cv().contains(Qualifiers::CONST)
    }

    pub fn is_pointer(&self) -> bool {
        !self.pointers.is_empty()
    }

    pub fn pointer_depth(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_reference(&self) -> bool {
        self.reference != RefKind::None
    }

    pub fn is_lvalue_ref(&self) -> bool {
        self.reference == RefKind::LValue
    }

    pub fn is_rvalue_ref(&self) -> bool {
        self.reference == RefKind::RValue
    }

    /// Builtin kind of a non-pointer builtin type.
    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match (&self.base, self.pointers.is_empty()) {
            (BaseType::Primitive(kind), true) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        self.as_primitive() == Some(PrimitiveKind::Void)
    }

    /// Non-type value carried by this descriptor.
    pub fn as_value(&self) -> Option<NonTypeValue> {
        match self.base {
            BaseType::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn instance_key(&self) -> Option<&Arc<InstantiationKey>> {
        match &self.base {
            BaseType::Instance(key) => Some(key),
            _ => None,
        }
    }

    /// Whether the base is a class type (plain or instantiated), not an enum.
    pub fn is_class(&self) -> bool {
        matches!(self.base, BaseType::Class(_) | BaseType::Instance(_))
    }

    /// Identity of the base class or enum.
    pub fn class_identity(&self) -> Option<TypeHash> {
        match &self.base {
            BaseType::Class(class) | BaseType::Enum(class) => Some(class.id),
            BaseType::Instance(key) => Some(key.instance_hash()),
            _ => None,
        }
    }

    /// Attach a presentation spelling. Modifier methods drop it again.
    pub fn with_alias(mut self, alias: impl Into<Arc<str>>) -> Self {
        self.alias = DisplayAlias(Some(alias.into()));
        self
    }

    pub fn without_alias(&self) -> Self {
        self.modified()
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.0.as_deref()
    }

    /// Spelling with every alias resolved.
    pub fn canonical_name(&self) -> String {
        Spelling { ty: self, canonical: true }.to_string()
    }

    /// Structural identity hash.
    pub fn type_hash(&self) -> TypeHash {
        let base = match &self.base {
            BaseType::Primitive(kind) => TypeHash::from_name(kind.name()),
            BaseType::Class(class) | BaseType::Enum(class) => class.id,
            BaseType::Instance(key) => key.instance_hash(),
            BaseType::Function(func) => {
                let params: Vec<TypeHash> = func.params.iter().map(TypeDescriptor::type_hash).collect();
                TypeHash::from_function("<fn>", &params)
                    .mix(func.ret.type_hash())
                    .mix(TypeHash(u64::from(func.variadic)))
            }
            BaseType::Value(value) => TypeHash::from_value(value.kind.name(), value.value),
            BaseType::InitList(element) => TypeHash::from_name("<init-list>").mix(element.type_hash()),
            BaseType::Callable(arity) => TypeHash::from_name("<callable>").mix(TypeHash(*arity as u64)),
            BaseType::Nullptr => TypeHash::from_name("std::nullptr_t"),
        };
        let mut hash = base.mix(TypeHash(u64::from(self.cv.bits()) | 0x10));
        for level in &self.pointers {
            hash = hash.mix(TypeHash(u64::from(level.bits()) | 0x100));
        }
        hash.mix(TypeHash(self.reference as u64 | 0x1000))
    }

    pub(crate) fn write_spelling(&self, f: &mut fmt::Formatter<'_>, canonical: bool) -> fmt::Result {
        if !canonical {
            if let Some(alias) = self.alias() {
                return f.write_str(alias);
            }
        }
        match &self.base {
            BaseType::Value(value) => return write!(f, "{value}"),
            BaseType::Callable(arity) => return write!(f, "<callable/{arity}>"),
            BaseType::InitList(element) => {
                f.write_str("std::initializer_list<")?;
                element.write_spelling(f, canonical)?;
                return f.write_str(">");
            }
            BaseType::Function(func) => {
                func.ret.write_spelling(f, canonical)?;
                if !self.pointers.is_empty() {
                    f.write_str("(")?;
                    for level in &self.pointers {
                        f.write_str("*")?;
                        level.write_suffix(f)?;
                    }
                    f.write_str(")")?;
                }
                f.write_str("(")?;
                for (i, param) in func.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    param.write_spelling(f, canonical)?;
                }
                if func.variadic {
                    f.write_str(if func.params.is_empty() { "..." } else { ",..." })?;
                }
                f.write_str(")")?;
                return f.write_str(self.reference.suffix());
            }
            _ => {}
        }
        self.cv.write_prefix(f)?;
        match &self.base {
            BaseType::Primitive(kind) => f.write_str(kind.name())?,
            BaseType::Class(class) | BaseType::Enum(class) => f.write_str(&class.name)?,
            BaseType::Instance(key) => key.write_spelling(f, canonical)?,
            BaseType::Nullptr => f.write_str("std::nullptr_t")?,
            BaseType::Value(_) | BaseType::Callable(_) | BaseType::InitList(_) | BaseType::Function(_) => {}
        }
        for level in &self.pointers {
            f.write_str("*")?;
            level.write_suffix(f)?;
        }
        f.write_str(self.reference.suffix())
    }
}

struct Spelling<'a> {
    ty: &'a TypeDescriptor,
    canonical: bool,
}

impl fmt::Display for Spelling<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ty.write_spelling(f, self.canonical)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_spelling(f, false)
    }
}

impl From<PrimitiveKind> for TypeDescriptor {
    fn from(kind: PrimitiveKind) -> Self {
        TypeDescriptor::primitive(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyArg;

    #[test]
    fn alias_does_not_affect_equality() {
        let class = TypeDescriptor::class(ClassRef::named("MyTemplatedMethodClass"));
        let aliased = class.clone().with_alias("MyTMCTypedef_t");
        assert_eq!(class, aliased);
        assert_eq!(class.type_hash(), aliased.type_hash());
        assert_eq!(aliased.to_string(), "MyTMCTypedef_t");
        assert_eq!(aliased.canonical_name(), "MyTemplatedMethodClass");
    }

    #[test]
    fn modifiers_drop_alias() {
        let aliased = TypeDescriptor::primitive(PrimitiveKind::UnsignedLong).with_alias("size_t");
        assert_eq!(aliased.with_const().lvalue_ref().to_string(), "const unsigned long&");
    }

    #[test]
    fn pointer_and_cv_spelling() {
        let char_ptr = TypeDescriptor::primitive(PrimitiveKind::Char).with_const().pointer_to();
        assert_eq!(char_ptr.to_string(), "const char*");
        assert!(!char_ptr.is_const());
        assert_eq!(char_ptr.with_const().to_string(), "const char* const");
        assert_eq!(char_ptr.pointee().map(|t| t.to_string()), Some("const char".to_string()));
    }

    #[test]
    fn reference_collapsing() {
        let int = TypeDescriptor::primitive(PrimitiveKind::Int);
        assert_eq!(int.lvalue_ref().rvalue_ref().reference, RefKind::LValue);
        assert_eq!(int.rvalue_ref().rvalue_ref().reference, RefKind::RValue);
        assert_eq!(int.rvalue_ref().lvalue_ref().reference, RefKind::LValue);
    }

    #[test]
    fn cv_and_reference_participate_in_equality() {
        let int = TypeDescriptor::primitive(PrimitiveKind::Int);
        assert_ne!(int, int.with_const());
        assert_ne!(int, int.lvalue_ref());
        assert_ne!(int.type_hash(), int.pointer_to().type_hash());
        assert_eq!(int.with_const().lvalue_ref().decay(), int);
    }

    #[test]
    fn function_spelling() {
        let vec = TypeDescriptor::instance(InstantiationKey::new(
            TypeHash::from_name("std::vector"),
            "std::vector",
            vec![KeyArg::Type(PrimitiveKind::Double.into())],
        ));
        let func = TypeDescriptor::function(PrimitiveKind::Double.into(), vec![vec], false);
        assert_eq!(func.to_string(), "double(std::vector<double>)");
        assert_eq!(func.pointer_to().to_string(), "double(*)(std::vector<double>)");
    }

    #[test]
    fn non_type_values_compare_by_kind_and_value() {
        assert_eq!(TypeDescriptor::value(PrimitiveKind::Int, 4), TypeDescriptor::value(PrimitiveKind::Int, 4));
        assert_ne!(TypeDescriptor::value(PrimitiveKind::Int, 4), TypeDescriptor::value(PrimitiveKind::Int, 8));
        assert_eq!(TypeDescriptor::value(PrimitiveKind::Bool, 1).to_string(), "true");
    }
}
