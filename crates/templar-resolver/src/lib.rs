//! Templar Resolver
//!
//! Resolves host calls against registered generic declarations and
//! produces one shared entity per concrete instantiation.
//!
//! ## Pipeline
//!
//! - **Arguments**: runtime values become typed call arguments; integer
//!   widths are chosen from the configured ladder
//! - **Deduction**: template parameters are bound from explicit arguments,
//!   call arguments and defaults
//! - **Selection**: partial and full specializations compete by
//!   specificity; function overloads by conversion rank
//! - **Instantiation**: the chosen key is built once through the host's
//!   [`Instantiator`] and exposed under its display name
//!
//! ## Modules
//!
//! - `argument`: runtime values as call arguments
//! - `cache`: single-flight instantiation cache
//! - `consteval`: constant expressions in template arguments
//! - `conversion`: implicit conversion ranks
//! - `engine`: the public facade
//! - `lookup`: class frames and member lookup
//! - `overload`: candidate building and best-match selection
//! - `template`: deduction, pattern matching and specialization choice
//! - `type_resolver`: spelled types to descriptors

mod argument;
mod build;
mod cache;
mod config;
mod consteval;
mod context;
mod conversion;
mod engine;
mod entity;
mod expose;
mod instantiator;
mod lookup;
mod overload;
mod probe;
mod template;
mod type_resolver;

pub use argument::{CallArg, Category};
pub use cache::InstantiationCache;
pub use config::EngineConfig;
pub use conversion::{ArgRank, ConversionRank};
pub use engine::Engine;
pub use entity::{Entity, EntityKind, Signature};
pub use instantiator::{CompiledHandle, InstantiationRequest, Instantiator, NullInstantiator};

// Re-export the error taxonomy from core for convenience
pub use templar_core::{CompileError, RegistrationError, ResolutionError};

#[cfg(test)]
pub(crate) mod test_support {
    use templar_core::TypeDescriptor;

    use crate::context::Scope;
    use crate::engine::Engine;

    /// An engine with the prelude and `source` registered.
    pub fn engine_with(source: &str) -> Engine {
        let engine = Engine::new().unwrap();
        if !source.trim().is_empty() {
            engine.register_source(source).unwrap();
        }
        engine
    }

    /// Resolve `spelling` in the global namespace without remapping errors.
    pub fn resolve(engine: &Engine, spelling: &str) -> TypeDescriptor {
        let ctx = engine.context();
        let spelled = templar_parser::parse_type(spelling).unwrap();
        ctx.resolve_type(&spelled, &Scope::global()).unwrap()
    }
}
