//! Substituting bindings into spelled types.

use templar_core::{KeyArg, RefKind, ResolutionError, TypeDescriptor, TypeName};

use crate::context::{ResolutionContext, Scope};

/// Apply the cv, pointer and reference modifiers of `ty` to a resolved base.
///
/// cv-qualifiers of the spelling go on the base level before any pointer
/// level is added; a reference on a reference collapses.
pub(crate) fn apply_modifiers(base: TypeDescriptor, ty: &TypeName) -> Result<TypeDescriptor, ResolutionError> {
    if base.as_value().is_some() {
        if ty.pointers.is_empty() && ty.reference == RefKind::None {
            return Ok(base);
        }
        return Err(ResolutionError::DeductionFailed {
            template: ty.to_string(),
            reason: "a non-type value cannot be modified".to_string(),
        });
    }
    let mut out = base;
    if !ty.pointers.is_empty() {
        if out.is_reference() {
            return Err(ResolutionError::DeductionFailed {
                template: ty.to_string(),
                reason: format!("pointer to reference '{out}'"),
            });
        }
        if !ty.cv.is_empty() {
            out = out.with_cv(ty.cv);
        }
        for quals in &ty.pointers {
            out = out.pointer_to();
            if !quals.is_empty() {
                out = out.with_cv(*quals);
            }
        }
    } else if !ty.cv.is_empty() && !out.is_reference() {
        out = out.with_cv(ty.cv);
    }
    if ty.reference != RefKind::None {
        out = out.with_reference(ty.reference);
    }
    Ok(out)
}

impl ResolutionContext<'_> {
    /// Expand `pattern...` as a template argument list.
    pub fn expand_pack_args(&self, pattern: &TypeName, scope: &Scope) -> Result<Vec<KeyArg>, ResolutionError> {
        let mut element = pattern.clone();
        element.pack_expansion = false;
        if element.is_bare() {
            if let Some(KeyArg::Pack(items)) = element.as_identifier().and_then(|name| scope.binding(name)) {
                return Ok(items.clone());
            }
        }
        Ok(self
            .expand_pack_types(pattern, scope)?
            .into_iter()
            .map(KeyArg::Type)
            .collect())
    }

    /// Expand `pattern...` over every bound pack it mentions. All mentioned
    /// packs must have the same length.
    pub fn expand_pack_types(&self, pattern: &TypeName, scope: &Scope) -> Result<Vec<TypeDescriptor>, ResolutionError> {
        let mut element = pattern.clone();
        element.pack_expansion = false;

        let packs: Vec<(String, Vec<KeyArg>)> = scope
            .pack_names()
            .into_iter()
            .filter(|name| element.mentions(name))
            .filter_map(|name| {
                let items = scope.binding(&name).and_then(KeyArg::as_pack)?.to_vec();
                Some((name, items))
            })
            .collect();
        let Some(len) = packs.first().map(|(_, items)| items.len()) else {
            return Err(ResolutionError::DeductionFailed {
                template: pattern.to_string(),
                reason: "expansion names no parameter pack".to_string(),
            });
        };
        if packs.iter().any(|(_, items)| items.len() != len) {
            return Err(ResolutionError::DeductionFailed {
                template: pattern.to_string(),
                reason: "parameter packs of different lengths".to_string(),
            });
        }

        let mut out = Vec::with_capacity(len);
        for index in 0..len {
            let mut element_scope = scope.clone();
            for (name, items) in &packs {
                element_scope.bindings.insert(name.clone(), items[index].clone());
            }
            out.push(self.resolve_type(&element, &element_scope)?);
        }
        Ok(out)
    }
}
