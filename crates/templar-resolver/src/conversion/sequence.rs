//! Initializer lists into sequence containers.

use templar_core::decl::ClassTraits;
use templar_core::{KeyArg, ResolutionError, TypeDescriptor, Value};

use super::{ArgRank, ConversionRank};
use crate::context::{ClassFrame, ResolutionContext};
use crate::type_resolver::Resolved;

impl ResolutionContext<'_> {
    /// A list converts to a sequence class when every element converts to
    /// the element type.
    pub(super) fn rank_list(&self, arg: &crate::argument::CallArg, target: &TypeDescriptor) -> Result<Option<ArgRank>, ResolutionError> {
        let Value::List(items) = &arg.value else {
            return Ok(None);
        };
        if !target.is_class() || target.is_pointer() {
            return Ok(None);
        }
        let Ok(frame) = self.class_frame(target) else {
            return Ok(None);
        };
        if !frame.class().is_some_and(|class| class.traits.contains(ClassTraits::SEQUENCE)) {
            return Ok(None);
        }
        let Some(element) = self.sequence_element(&frame)? else {
            return Ok(None);
        };
        for item in items {
            let item = self.call_arg(item)?;
            if self.rank(&item, &element, true)?.is_none() {
                return Ok(None);
            }
        }
        Ok(Some(ArgRank::new(ConversionRank::Standard)))
    }

    /// The `value_type` member, or else the first template argument.
    fn sequence_element(&self, frame: &std::sync::Arc<ClassFrame>) -> Result<Option<TypeDescriptor>, ResolutionError> {
        if let Some(Resolved::Type(ty)) = self.member_type(frame, "value_type")? {
            return Ok(Some(ty));
        }
        Ok(frame
            .ty
            .instance_key()
            .and_then(|key| key.flat_args().into_iter().find_map(KeyArg::as_type).cloned()))
    }
}
