//! Implicit conversions from call arguments to parameter types.
//!
//! Every viable argument/parameter pair gets an [`ArgRank`]. Tiers, best
//! first:
//! 1. exact match, including added `const` on a pointee or reference
//! 2. promotion: widening that represents every source value exactly
//! 3. standard conversion: other numeric conversions, derived to base,
//!    `nullptr` to pointer, a list into a sequence container
//! 4. user-defined: one converting constructor, conversion operator or
//!    callable wrapper
//! 5. fallback: untyped pointer slots (`void*`) and pointers to classes
//!    without a definition
//!
//! Within a tier, the qualification count breaks ties the way reference
//! binding does: `T&` over `const T&` for lvalues, `T&&` over `const T&`
//! for rvalues.

mod class;
mod primitive;
mod sequence;

use templar_core::{BaseType, PrimitiveKind, RefKind, ResolutionError, TypeDescriptor, Value};

use crate::argument::CallArg;
use crate::context::ResolutionContext;

/// Quality tier of one implicit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConversionRank {
    Exact,
    Promotion,
    Standard,
    UserDefined,
    Fallback,
}

/// Rank of one argument against one parameter. Orders best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArgRank {
    pub rank: ConversionRank,
    /// Qualifications added while binding; fewer is better.
    pub qualification: u8,
}

impl ArgRank {
    pub const EXACT: ArgRank = ArgRank::new(ConversionRank::Exact);
    pub const FALLBACK: ArgRank = ArgRank::new(ConversionRank::Fallback);

    pub const fn new(rank: ConversionRank) -> Self {
        Self { rank, qualification: 0 }
    }

    fn qualified(self, added: u8) -> Self {
        Self {
            qualification: self.qualification.saturating_add(added),
            ..self
        }
    }
}

impl ResolutionContext<'_> {
    /// Rank `arg` against `param`, or `None` if it does not convert.
    /// User-defined conversions are only considered with `allow_user`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn rank(&self, arg: &CallArg, param: &TypeDescriptor, allow_user: bool) -> Result<Option<ArgRank>, ResolutionError> {
        match param.reference {
            RefKind::None => self.rank_value(arg, &param.strip_top_cv(), allow_user),
            _ => self.reference_binding(arg, param, allow_user),
        }
    }

    fn reference_binding(
        &self,
        arg: &CallArg,
        param: &TypeDescriptor,
        allow_user: bool,
    ) -> Result<Option<ArgRank>, ResolutionError> {
        let target = param.strip_reference();
        let same = arg.ty.decay() == target.decay();
        match param.reference {
            RefKind::LValue if !target.is_const() => {
                // only lvalues of the type itself or a derived class
                if !arg.is_lvalue() || !target.top_cv().contains(arg.ty.top_cv()) {
                    return Ok(None);
                }
                if same {
                    return Ok(Some(ArgRank::EXACT.qualified(u8::from(arg.ty.top_cv() != target.top_cv()))));
                }
                let derived = arg.ty.is_class() && target.is_class() && self.is_base_of(&target.decay(), &arg.ty.decay())?;
                Ok(derived.then_some(ArgRank::new(ConversionRank::Standard)))
            }
            RefKind::LValue => {
                let rank = self.rank_value(arg, &target.strip_top_cv(), allow_user)?;
                Ok(rank.map(|r| r.qualified(u8::from(!(arg.is_lvalue() && arg.ty.is_const())))))
            }
            _ => {
                if arg.is_lvalue() && same {
                    return Ok(None);
                }
                self.rank_value(arg, &target.strip_top_cv(), allow_user)
            }
        }
    }

    /// Rank a by-value conversion to `target`, which carries no reference
    /// and no top-level cv.
    fn rank_value(&self, arg: &CallArg, target: &TypeDescriptor, allow_user: bool) -> Result<Option<ArgRank>, ResolutionError> {
        let source = arg.ty.decay();
        if source == *target {
            return Ok(Some(ArgRank::EXACT));
        }
        if self.is_fallback_param(target) {
            let untyped = source.is_pointer()
                || source.is_class()
                || matches!(source.base, BaseType::Nullptr | BaseType::Function(_));
            return Ok(untyped.then_some(ArgRank::FALLBACK));
        }
        match &source.base {
            BaseType::InitList(_) => return self.rank_list(arg, target),
            BaseType::Callable(arity) => return self.rank_callable(*arity, target, allow_user),
            BaseType::Nullptr => {
                return Ok(target.is_pointer().then_some(ArgRank::new(ConversionRank::Standard)));
            }
            _ => {}
        }
        if matches!(arg.value, Value::Str(_)) && is_char_pointer(target) {
            return Ok(Some(ArgRank::new(ConversionRank::Standard)));
        }
        // a bound instance passes by address
        if matches!(arg.value, Value::Instance { .. }) && source.is_class() && !source.is_pointer() && target.pointer_depth() == 1 {
            return self.rank_pointer(&source.pointer_to(), target);
        }
        if source.is_pointer() || target.is_pointer() {
            return self.rank_pointer(&source, target);
        }
        match (&source.base, &target.base) {
            (BaseType::Primitive(from), BaseType::Primitive(to)) => Ok(primitive::rank_primitive(&arg.value, *from, *to)),
            (BaseType::Enum(enumeration), BaseType::Primitive(to)) => self.rank_enum(enumeration, *to),
            _ if source.is_class() && target.is_class() && self.is_base_of(target, &source)? => {
                Ok(Some(ArgRank::new(ConversionRank::Standard)))
            }
            _ if allow_user => self.user_conversion(arg, &source, target),
            _ => Ok(None),
        }
    }

    /// Parameters that take anything pointer-like, ranked last: `void*`
    /// at any depth and pointers to classes without a definition.
    pub fn is_fallback_param(&self, param: &TypeDescriptor) -> bool {
        let param = param.strip_reference();
        if !param.is_pointer() {
            return false;
        }
        match &param.base {
            BaseType::Primitive(PrimitiveKind::Void) => true,
            BaseType::Class(_) | BaseType::Instance(_) => self
                .class_entity(&param.unqualified_base())
                .map(|entity| !entity.is_complete())
                .unwrap_or(true),
            _ => false,
        }
    }
}

/// `char*` or `const char*`.
fn is_char_pointer(ty: &TypeDescriptor) -> bool {
    ty.pointer_depth() == 1 && ty.base == BaseType::Primitive(PrimitiveKind::Char)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{engine_with, resolve};

    const SOURCE: &str = "
        struct Base {}; struct Derived : Base {}; struct Opaque;
        struct FromInt { FromInt(int); }; struct Strict { explicit Strict(int); };
        enum Color { Red }; enum class Scoped { A };
    ";

    fn rank_of(engine: &crate::Engine, value: Value, param: &str) -> Option<ConversionRank> {
        let ctx = engine.context();
        let arg = ctx.call_arg(&value).unwrap();
        ctx.rank(&arg, &resolve(engine, param), true).unwrap().map(|r| r.rank)
    }

    #[test]
    fn runtime_integers_rank_by_fit() {
        let engine = engine_with(SOURCE);
        assert_eq!(rank_of(&engine, Value::Int(3), "int"), Some(ConversionRank::Exact));
        assert_eq!(rank_of(&engine, Value::Int(3), "long"), Some(ConversionRank::Promotion));
        assert_eq!(rank_of(&engine, Value::Int(3), "unsigned short"), Some(ConversionRank::Standard));
        assert_eq!(rank_of(&engine, Value::Int(3), "double"), Some(ConversionRank::Standard));
        assert_eq!(rank_of(&engine, Value::Int(1 << 40), "int"), None);
        assert_eq!(rank_of(&engine, Value::Float(1.5), "int"), None);
        assert_eq!(rank_of(&engine, Value::Float(1.5), "float"), Some(ConversionRank::Standard));
    }

    #[test]
    fn references_bind_by_category() {
        let engine = engine_with(SOURCE);
        let int = resolve(&engine, "int");
        let ctx = engine.context();
        let lvalue = ctx.call_arg(&Value::typed(int.clone())).unwrap();
        let rvalue = ctx.call_arg(&Value::Int(1)).unwrap();
        let by_ref = resolve(&engine, "int&");
        let by_const_ref = resolve(&engine, "const int&");
        let by_rvalue_ref = resolve(&engine, "int&&");

        assert!(ctx.rank(&rvalue, &by_ref, true).unwrap().is_none());
        assert!(ctx.rank(&lvalue, &by_rvalue_ref, true).unwrap().is_none());
        let plain = ctx.rank(&lvalue, &by_ref, true).unwrap();
        let constant = ctx.rank(&lvalue, &by_const_ref, true).unwrap();
        assert!(plain < constant);
        let moved = ctx.rank(&rvalue, &by_rvalue_ref, true).unwrap();
        let bound = ctx.rank(&rvalue, &by_const_ref, true).unwrap();
        assert!(moved < bound);
    }

    #[test]
    fn class_conversions() {
        let engine = engine_with(SOURCE);
        let derived = resolve(&engine, "Derived");
        assert_eq!(rank_of(&engine, Value::instance(derived.clone()), "Base&"), Some(ConversionRank::Standard));
        assert_eq!(
            rank_of(&engine, Value::typed(derived.pointer_to()), "const Base*"),
            Some(ConversionRank::Standard)
        );
        assert_eq!(rank_of(&engine, Value::Int(4), "FromInt"), Some(ConversionRank::UserDefined));
        assert_eq!(rank_of(&engine, Value::Int(4), "Strict"), None);
        assert_eq!(rank_of(&engine, Value::Null, "Base*"), Some(ConversionRank::Standard));
    }

    #[test]
    fn untyped_slots_are_fallback() {
        let engine = engine_with(SOURCE);
        let base = resolve(&engine, "Base");
        assert_eq!(rank_of(&engine, Value::typed(base.pointer_to()), "void*"), Some(ConversionRank::Fallback));
        assert_eq!(rank_of(&engine, Value::instance(base), "Opaque*"), Some(ConversionRank::Fallback));
        assert_eq!(rank_of(&engine, Value::Int(1), "void*"), None);
    }

    #[test]
    fn enumerators_promote_unless_scoped() {
        let engine = engine_with(SOURCE);
        let color = Value::Enumerator {
            ty: resolve(&engine, "Color"),
            value: 0,
        };
        let scoped = Value::Enumerator {
            ty: resolve(&engine, "Scoped"),
            value: 0,
        };
        assert_eq!(rank_of(&engine, color.clone(), "Color"), Some(ConversionRank::Exact));
        assert_eq!(rank_of(&engine, color.clone(), "int"), Some(ConversionRank::Promotion));
        assert_eq!(rank_of(&engine, color, "double"), Some(ConversionRank::Standard));
        assert_eq!(rank_of(&engine, scoped, "int"), None);
    }
}
