//! Template machinery.
//!
//! - [`deduce`]: filling a template parameter list from explicit arguments,
//!   call arguments and defaults
//! - [`pattern`]: matching spelled patterns against resolved types
//! - [`specialization`]: choosing the partial specialization for a key
//! - [`substitution`]: applying bindings to spelled types

pub(crate) mod deduce;
pub(crate) mod pattern;
pub(crate) mod specialization;
pub(crate) mod substitution;

use templar_core::decl::ParameterSpec;

/// Binding name of a template parameter. Unnamed parameters bind by
/// position.
pub(crate) fn param_key(param: &ParameterSpec) -> String {
    if param.name.is_empty() {
        format!("#{}", param.position)
    } else {
        param.name.clone()
    }
}
