//! Entity construction through the [`Instantiator`](crate::Instantiator).

use std::sync::Arc;

use templar_core::decl::Declaration;
use templar_core::{InstantiationKey, ResolutionError, TypeDescriptor, split_scope};
use tracing::{debug, warn};

use crate::context::{ClassFrame, ResolutionContext};
use crate::entity::{Entity, EntityKind, Signature};
use crate::instantiator::{CompiledHandle, InstantiationRequest};

/// Everything an entity is made of except its compiled handle.
pub(crate) struct EntityParts {
    pub key: InstantiationKey,
    pub kind: EntityKind,
    pub declaration: Arc<Declaration>,
    pub signature: Option<Signature>,
    pub result_type: Option<TypeDescriptor>,
    pub ty: Option<TypeDescriptor>,
    pub owner: Option<TypeDescriptor>,
    pub frame: Option<Arc<ClassFrame>>,
}

impl ResolutionContext<'_> {
    /// Hand `parts` to the instantiator and wrap the result.
    ///
    /// Classes without a definition have nothing to compile and get a null
    /// handle.
    pub fn build_entity(&self, parts: EntityParts) -> Result<Entity, ResolutionError> {
        let qualified_name = parts.key.to_string();
        let display_name = split_scope(&qualified_name).pop().unwrap_or_else(|| qualified_name.clone());
        let pre_instantiated = !parts.key.is_plain() && self.is_pre_instantiated(parts.key.instance_hash());

        let incomplete = parts.kind == EntityKind::Class
            && parts
                .frame
                .as_ref()
                .and_then(|frame| frame.class())
                .is_some_and(|class| !class.complete);
        let handle = if incomplete {
            CompiledHandle(0)
        } else {
            let request = InstantiationRequest {
                key: &parts.key,
                declaration: &parts.declaration,
                kind: parts.kind,
                display_name: &qualified_name,
                signature: parts.signature.as_ref(),
                pre_instantiated,
            };
            match self.instantiator.instantiate(&request) {
                Ok(handle) => handle,
                Err(err) => {
                    warn!(key = %parts.key, kind = %parts.kind, error = %err, "instantiation rejected");
                    return Err(err.into());
                }
            }
        };
        debug!(key = %parts.key, kind = %parts.kind, pre_instantiated, "entity created");

        Ok(Entity {
            key: Arc::new(parts.key),
            kind: parts.kind,
            declaration: parts.declaration,
            display_name,
            qualified_name,
            signature: parts.signature,
            result_type: parts.result_type,
            ty: parts.ty,
            owner: parts.owner,
            frame: parts.frame,
            handle,
            pre_instantiated,
        })
    }
}
