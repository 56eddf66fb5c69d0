//! Arithmetic and enum conversions.

use templar_core::{ClassRef, PrimitiveKind, ResolutionError, Value};
use templar_core::decl::DeclKind;

use super::{ArgRank, ConversionRank};
use crate::context::ResolutionContext;

/// Rank a conversion between builtin kinds.
///
/// Runtime integers carry their value, so they convert to any integral
/// kind that holds it. Floating values never narrow to integers.
pub(super) fn rank_primitive(value: &Value, from: PrimitiveKind, to: PrimitiveKind) -> Option<ArgRank> {
    if from == to {
        return Some(ArgRank::EXACT);
    }
    if from == PrimitiveKind::Void || to == PrimitiveKind::Void {
        return None;
    }
    let rank = match value {
        Value::Int(v) if to.is_integral() => {
            if !to.fits(*v) {
                return None;
            }
            if from.promotes_to(to) {
                ConversionRank::Promotion
            } else {
                ConversionRank::Standard
            }
        }
        _ if from.is_floating() && to.is_integral() => return None,
        _ if from.promotes_to(to) => ConversionRank::Promotion,
        _ => ConversionRank::Standard,
    };
    Some(ArgRank::new(rank))
}

impl ResolutionContext<'_> {
    /// Unscoped enumerators promote to `int` and convert to any other
    /// arithmetic kind. Scoped enumerators do not convert.
    pub(super) fn rank_enum(&self, enumeration: &ClassRef, to: PrimitiveKind) -> Result<Option<ArgRank>, ResolutionError> {
        let origin = self.origin(enumeration.id)?;
        let DeclKind::Enum(decl) = &origin.decl.kind else {
            return Ok(None);
        };
        if decl.scoped || to == PrimitiveKind::Void {
            return Ok(None);
        }
        let rank = if to == PrimitiveKind::Int {
            ConversionRank::Promotion
        } else {
            ConversionRank::Standard
        };
        Ok(Some(ArgRank::new(rank)))
    }
}
