//! The compiler seam.
//!
//! The engine decides *what* to instantiate; an [`Instantiator`] produces the
//! concrete code for it. A rejection ([`CompileError`]) is a normal outcome:
//! during overload resolution it removes the candidate and selection runs
//! again over the rest.

use templar_core::decl::Declaration;
use templar_core::{CompileError, InstantiationKey};

use crate::entity::{EntityKind, Signature};

/// Opaque handle to compiled code, owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompiledHandle(pub u64);

/// Everything the compiler needs to produce one entity.
#[derive(Debug)]
pub struct InstantiationRequest<'a> {
    pub key: &'a InstantiationKey,
    /// The declaration chosen for the key: the primary template, a partial
    /// or full specialization, or a plain declaration.
    pub declaration: &'a Declaration,
    pub kind: EntityKind,
    /// Qualified display name, e.g. `ns::A<int,double>::sa`.
    pub display_name: &'a str,
    pub signature: Option<&'a Signature>,
    /// The key is covered by an explicit instantiation record.
    pub pre_instantiated: bool,
}

/// Produces compiled entities. Called at most once per key.
pub trait Instantiator: Send + Sync {
    fn instantiate(&self, request: &InstantiationRequest<'_>) -> Result<CompiledHandle, CompileError>;
}

/// Accepts everything; the handle is the key's identity hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullInstantiator;

impl Instantiator for NullInstantiator {
    fn instantiate(&self, request: &InstantiationRequest<'_>) -> Result<CompiledHandle, CompileError> {
        Ok(CompiledHandle(request.key.instance_hash().as_u64()))
    }
}

impl<F> Instantiator for F
where
    F: Fn(&InstantiationRequest<'_>) -> Result<CompiledHandle, CompileError> + Send + Sync,
{
    fn instantiate(&self, request: &InstantiationRequest<'_>) -> Result<CompiledHandle, CompileError> {
        self(request)
    }
}
