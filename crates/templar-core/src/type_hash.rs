//! Deterministic hash-based identity for declarations and types.
//!
//! [`TypeHash`] is a 64-bit hash computed from qualified names and spelled
//! signatures. The same declaration registered twice (or referenced before it
//! is registered) always maps to the same identity, so the store never needs
//! a secondary name-to-id table.
//!
//! # Examples
//!
//! ```
//! use templar_core::TypeHash;
//!
//! let a = TypeHash::from_name("ns::Widget");
//! assert_eq!(a, TypeHash::from_name("ns::Widget"));
//!
//! let f1 = TypeHash::from_function("foo", &[TypeHash::from_name("int")]);
//! let f2 = TypeHash::from_function("foo", &[TypeHash::from_name("double")]);
//! assert_ne!(f1, f2);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
pub mod hash_constants {
    /// Separator constant for ordered components.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type and scope hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for free function hashes.
    pub const FUNCTION: u64 = 0x5ea77ffbcdf5f302;

    /// Domain marker for member function hashes.
    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for constructor hashes.
    pub const CONSTRUCTOR: u64 = 0x9a7f3d5e2b8c4601;

    /// Domain marker for members reached through a class instance.
    pub const MEMBER: u64 = 0x3e9f5d2a8c7b1403;

    /// Domain marker for non-type argument values.
    pub const VALUE: u64 = 0x1a095090689d4647;

    /// Position mixing constants so that argument order matters.
    pub const PARAM_MARKERS: [u64; 16] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
        0x7c3e9f2a5b8d1403,
        0x5d8c7b4a3e9f2106,
        0x3f1e9d8c7b5a4203,
        0x1a2b3c4d5e6f7089,
        0x9f8e7d6c5b4a3210,
        0x2468ace013579bdf,
        0xfdb97531eca86420,
        0x123456789abcdef0,
    ];
}

/// A deterministic 64-bit identity for a declaration, type, or instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

#[inline]
fn marker(i: usize) -> u64 {
    hash_constants::PARAM_MARKERS
        .get(i)
        .copied()
        .unwrap_or_else(|| hash_constants::PARAM_MARKERS[0].wrapping_add(i as u64))
}

#[inline]
fn fold(seed: u64, parts: &[TypeHash]) -> u64 {
    let mut hash = seed;
    for (i, part) in parts.iter().enumerate() {
        // wrapping_mul keeps the fold order-sensitive
        hash = hash.wrapping_mul(hash_constants::SEP).wrapping_add(marker(i) ^ part.0);
    }
    hash
}

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Hash of a qualified type or scope name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash of a free function from its qualified name and parameter hashes.
    #[inline]
    pub fn from_function(name: &str, param_hashes: &[TypeHash]) -> Self {
        TypeHash(fold(hash_constants::FUNCTION ^ xxh64(name.as_bytes(), 0), param_hashes))
    }

    /// Hash of a member function. Const member functions overload against
    /// their non-const siblings, so constness is part of the identity.
    #[inline]
    pub fn from_method(owner: TypeHash, name: &str, param_hashes: &[TypeHash], is_const: bool) -> Self {
        let seed = hash_constants::METHOD ^ owner.0 ^ xxh64(name.as_bytes(), 0) ^ u64::from(is_const);
        TypeHash(fold(seed, param_hashes))
    }

    /// Hash of a constructor from its owner and parameter hashes.
    #[inline]
    pub fn from_constructor(owner: TypeHash, param_hashes: &[TypeHash]) -> Self {
        TypeHash(fold(hash_constants::CONSTRUCTOR ^ owner.0, param_hashes))
    }

    /// Hash of a template instance from the template identity and argument hashes.
    #[inline]
    pub fn from_template_instance(template: TypeHash, args: &[TypeHash]) -> Self {
        TypeHash(fold(template.0, args))
    }

    /// Identity of a member declaration as seen through a specific class instance.
    ///
    /// `Base<int>::get3` and `Base<double>::get3` share one declaration but
    /// must not share cache entries.
    #[inline]
    pub fn from_member(owner_instance: TypeHash, member: TypeHash) -> Self {
        TypeHash(fold(hash_constants::MEMBER ^ owner_instance.0, &[member]))
    }

    /// Hash of a non-type argument value.
    #[inline]
    pub fn from_value(kind: &str, value: i128) -> Self {
        let bits = value as u128;
        let lo = TypeHash(bits as u64);
        let hi = TypeHash((bits >> 64) as u64);
        TypeHash(fold(hash_constants::VALUE ^ xxh64(kind.as_bytes(), 0), &[lo, hi]))
    }

    /// Fold another hash into this one, order-sensitive.
    #[inline]
    pub fn mix(self, other: TypeHash) -> Self {
        TypeHash(fold(self.0, &[other]))
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_hash_determinism() {
        assert_eq!(TypeHash::from_name("int"), TypeHash::from_name("int"));
        assert_eq!(
            TypeHash::from_name("TemplateHiding::Base"),
            TypeHash::from_name("TemplateHiding::Base")
        );
    }

    #[test]
    fn type_hash_uniqueness() {
        let int_hash = TypeHash::from_name("int");
        let long_hash = TypeHash::from_name("long");
        let class_hash = TypeHash::from_name("MyTemplatedMethodClass");

        assert_ne!(int_hash, long_hash);
        assert_ne!(int_hash, class_hash);
        assert_ne!(long_hash, class_hash);
    }

    #[test]
    fn function_hash_parameter_order_matters() {
        let int_hash = TypeHash::from_name("int");
        let double_hash = TypeHash::from_name("double");

        let f1 = TypeHash::from_function("foo", &[int_hash, double_hash]);
        let f2 = TypeHash::from_function("foo", &[double_hash, int_hash]);
        assert_ne!(f1, f2);
    }

    #[test]
    fn method_constness_distinguishes_overloads() {
        let owner = TypeHash::from_name("S");
        let plain = TypeHash::from_method(owner, "get", &[], false);
        let constant = TypeHash::from_method(owner, "get", &[], true);
        assert_ne!(plain, constant);
    }

    #[test]
    fn method_vs_function_distinction() {
        let int_hash = TypeHash::from_name("int");
        let owner = TypeHash::from_name("S");
        assert_ne!(
            TypeHash::from_function("callme", &[int_hash]),
            TypeHash::from_method(owner, "callme", &[int_hash], false)
        );
    }

    #[test]
    fn constructor_hash_includes_owner() {
        let a = TypeHash::from_constructor(TypeHash::from_name("A"), &[]);
        let b = TypeHash::from_constructor(TypeHash::from_name("B"), &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn member_hash_depends_on_instance() {
        let member = TypeHash::from_name("get3");
        let base_int = TypeHash::from_name("Base<int>");
        let base_double = TypeHash::from_name("Base<double>");
        assert_ne!(
            TypeHash::from_member(base_int, member),
            TypeHash::from_member(base_double, member)
        );
    }

    #[test]
    fn value_hash_distinguishes_kind_and_value() {
        assert_ne!(TypeHash::from_value("int", 3), TypeHash::from_value("int", 4));
        assert_ne!(TypeHash::from_value("int", 3), TypeHash::from_value("long", 3));
        assert_ne!(TypeHash::from_value("long", -1), TypeHash::from_value("long", i128::from(u64::MAX)));
    }

    #[test]
    fn template_instance_order_matters() {
        let template = TypeHash::from_name("std::map");
        let int_hash = TypeHash::from_name("int");
        let double_hash = TypeHash::from_name("double");
        assert_ne!(
            TypeHash::from_template_instance(template, &[int_hash, double_hash]),
            TypeHash::from_template_instance(template, &[double_hash, int_hash])
        );
    }
}
