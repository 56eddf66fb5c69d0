//! Templar
//!
//! Resolves calls from a dynamically-typed host against generic
//! declarations of a statically-typed target language, and hands each
//! concrete instantiation to the host's compiler exactly once.
//!
//! ```
//! use templar::prelude::*;
//!
//! let engine = Engine::new().unwrap();
//! engine
//!     .register_source("namespace ns { template<class T> struct Box { T get() const; }; }")
//!     .unwrap();
//!
//! let boxed = engine.resolve_class("ns::Box", &[TemplateArg::from("int")]).unwrap();
//! assert_eq!(boxed.qualified_name(), "ns::Box<int>");
//! let get = engine.resolve_call("ns::Box<int>", "get", &[], &[]).unwrap();
//! assert_eq!(get.signature_display(), "ns::Box<int>::get()");
//! ```
//!
//! ## Crates
//!
//! - [`core`]: type descriptors, identities, declarations and errors
//! - [`parser`]: type spellings and declaration source
//! - [`registry`]: the declaration store
//! - [`resolver`]: deduction, overload resolution and the engine

pub use templar_core as core;
pub use templar_parser as parser;
pub use templar_registry as registry;
pub use templar_resolver as resolver;

pub use templar_core::{
    CompileError, InstantiationKey, KeyArg, ParseError, PrimitiveKind, RegistrationError, ResolutionError,
    TemplateArg, TypeDescriptor, TypeHash, Value,
};
pub use templar_resolver::{
    CompiledHandle, Engine, EngineConfig, Entity, EntityKind, InstantiationRequest, Instantiator, NullInstantiator,
    Signature,
};

/// Everything a host needs to drive an [`Engine`].
pub mod prelude {
    pub use templar_core::{CompileError, ResolutionError, TemplateArg, TypeDescriptor, Value};
    pub use templar_resolver::{
        CompiledHandle, Engine, EngineConfig, Entity, EntityKind, InstantiationRequest, Instantiator,
        NullInstantiator,
    };
}
