//! Core types for the templar template-resolution engine.
//!
//! This crate holds everything the other layers share: identities
//! ([`TypeHash`]), the type descriptor model ([`TypeDescriptor`],
//! [`InstantiationKey`]), spelled types ([`TypeName`]), declarations
//! ([`decl`]), runtime inputs ([`Value`], [`TemplateArg`]) and the error
//! taxonomy.

pub mod decl;
mod descriptor;
mod error;
mod key;
mod primitive;
mod qualified_name;
mod span;
mod type_hash;
mod type_name;
mod value;

pub use descriptor::{BaseType, ClassRef, FunctionType, NonTypeValue, Qualifiers, RefKind, TypeDescriptor};
pub use error::{CompileError, ParseError, RegistrationError, ResolutionError};
pub use key::{InstantiationKey, KeyArg, format_args};
pub use primitive::PrimitiveKind;
pub use qualified_name::{QualifiedName, split_scope};
pub use span::Span;
pub use type_hash::{TypeHash, hash_constants};
pub use type_name::{PathSegment, TemplateArgName, TypeHead, TypeName, TypePath};
pub use value::{TemplateArg, Value};
