//! Pointer, class and callable conversions.

use templar_core::decl::ClassTraits;
use templar_core::{BaseType, KeyArg, ResolutionError, TypeDescriptor, Value};

use super::{ArgRank, ConversionRank};
use crate::argument::{CallArg, Category};
use crate::context::{ResolutionContext, Scope};

impl ResolutionContext<'_> {
    /// Pointer to pointer conversions of equal depth: added `const` on the
    /// pointee is exact, derived to base is standard. A function converts
    /// to a pointer to it.
    pub(super) fn rank_pointer(&self, source: &TypeDescriptor, target: &TypeDescriptor) -> Result<Option<ArgRank>, ResolutionError> {
        if matches!(source.base, BaseType::Function(_)) && !source.is_pointer() {
            return Ok((source.pointer_to() == *target).then_some(ArgRank::EXACT));
        }
        if !source.is_pointer() || source.pointer_depth() != target.pointer_depth() {
            return Ok(None);
        }
        // inner pointer levels must match exactly
        let depth = source.pointer_depth();
        if source.pointers[..depth - 1] != target.pointers[..depth - 1] || !target.cv.contains(source.cv) {
            return Ok(None);
        }
        let added = u8::from(target.cv != source.cv);
        if source.base == target.base {
            return Ok(Some(ArgRank::EXACT.qualified(added)));
        }
        let source_class = source.unqualified_base();
        let target_class = target.unqualified_base();
        let derived = depth == 1
            && source_class.is_class()
            && target_class.is_class()
            && self.is_base_of(&target_class, &source_class)?;
        Ok(derived.then_some(ArgRank::new(ConversionRank::Standard).qualified(added)))
    }

    /// Whether `base` is a proper base class of `derived`, at any depth.
    pub fn is_base_of(&self, base: &TypeDescriptor, derived: &TypeDescriptor) -> Result<bool, ResolutionError> {
        let Some(wanted) = base.class_identity() else {
            return Ok(false);
        };
        if derived.class_identity().is_none_or(|id| id == wanted) {
            return Ok(false);
        }
        let frame = self.class_frame(derived)?;
        for direct in &frame.bases {
            if direct.class_identity() == Some(wanted) || self.is_base_of(base, direct)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Host callables convert to function pointers of the same arity and
    /// to callable wrapper classes such as `std::function<R(Args...)>`.
    pub(super) fn rank_callable(&self, arity: usize, target: &TypeDescriptor, allow_user: bool) -> Result<Option<ArgRank>, ResolutionError> {
        if !allow_user {
            return Ok(None);
        }
        let accepts = |function: &templar_core::FunctionType| function.params.len() == arity || function.variadic;
        let viable = match &target.base {
            BaseType::Function(function) => target.pointer_depth() == 1 && accepts(function),
            _ if target.is_class() && !target.is_pointer() => {
                let Ok(frame) = self.class_frame(target) else {
                    return Ok(None);
                };
                let callable = frame.class().is_some_and(|class| class.traits.contains(ClassTraits::CALLABLE));
                let signature = target
                    .instance_key()
                    .and_then(|key| key.flat_args().into_iter().find_map(KeyArg::as_type).cloned());
                callable
                    && match signature.as_ref().map(|ty| &ty.base) {
                        Some(BaseType::Function(function)) => accepts(function),
                        _ => true,
                    }
            }
            _ => false,
        };
        Ok(viable.then_some(ArgRank::new(ConversionRank::UserDefined)))
    }

    /// One user-defined conversion: a converting constructor of the target
    /// or a conversion operator of the source.
    pub(super) fn user_conversion(
        &self,
        arg: &CallArg,
        source: &TypeDescriptor,
        target: &TypeDescriptor,
    ) -> Result<Option<ArgRank>, ResolutionError> {
        let converts = (target.is_class() && self.converting_constructor(arg, target)?)
            || (source.is_class() && self.conversion_operator(source, target)?);
        Ok(converts.then_some(ArgRank::new(ConversionRank::UserDefined)))
    }

    fn converting_constructor(&self, arg: &CallArg, target: &TypeDescriptor) -> Result<bool, ResolutionError> {
        let Ok(frame) = self.class_frame(target) else {
            return Ok(false);
        };
        for hit in self.constructors(&frame)? {
            let Some(func) = hit.decl.as_function() else {
                continue;
            };
            if func.is_explicit || hit.decl.is_template() || func.params.is_empty() || func.required_params() > 1 {
                continue;
            }
            let Ok(param) = self.resolve_type(&func.params[0].ty, &Scope::of_class(&hit.frame)) else {
                continue;
            };
            // copy and move constructors convert nothing new
            if param.decay().unqualified_base() == target.unqualified_base() {
                continue;
            }
            if self.rank(arg, &param, false)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn conversion_operator(&self, source: &TypeDescriptor, target: &TypeDescriptor) -> Result<bool, ResolutionError> {
        let Ok(frame) = self.class_frame(source) else {
            return Ok(false);
        };
        let Some(class) = frame.class() else {
            return Ok(false);
        };
        let scope = Scope::of_class(&frame);
        for member in &class.members {
            let Some(ret) = member.as_function().and_then(|func| func.ret.as_ref()) else {
                continue;
            };
            if !member.name.starts_with("operator ") || member.is_template() {
                continue;
            }
            let Ok(produced) = self.resolve_type(ret, &scope) else {
                continue;
            };
            let converted = CallArg {
                value: Value::typed(produced.clone()),
                ty: produced.strip_reference(),
                category: if produced.is_lvalue_ref() {
                    Category::LValue
                } else {
                    Category::RValue
                },
            };
            if self.rank(&converted, target, false)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{engine_with, resolve};

    const SOURCE: &str = "
        struct A {}; struct B : A {}; struct C : B {};
        struct Flag { operator bool() const; };
        typedef void (*callback)(int, int);
    ";

    #[test]
    fn base_classes_are_transitive() {
        let engine = engine_with(SOURCE);
        let ctx = engine.context();
        let (a, b, c) = (resolve(&engine, "A"), resolve(&engine, "B"), resolve(&engine, "C"));
        assert!(ctx.is_base_of(&a, &c).unwrap());
        assert!(ctx.is_base_of(&b, &c).unwrap());
        assert!(!ctx.is_base_of(&c, &a).unwrap());
        assert!(!ctx.is_base_of(&a, &a).unwrap());
    }

    #[test]
    fn pointer_qualification_only_adds_const() {
        let engine = engine_with(SOURCE);
        let ctx = engine.context();
        let int_ptr = resolve(&engine, "int*");
        let const_ptr = resolve(&engine, "const int*");
        let added = ctx.rank_pointer(&int_ptr, &const_ptr).unwrap().unwrap();
        assert_eq!(added.rank, ConversionRank::Exact);
        assert_eq!(added.qualification, 1);
        assert!(ctx.rank_pointer(&const_ptr, &int_ptr).unwrap().is_none());
        assert!(ctx.rank_pointer(&int_ptr, &resolve(&engine, "int**")).unwrap().is_none());
    }

    #[test]
    fn conversion_operators_and_callables() {
        let engine = engine_with(SOURCE);
        let ctx = engine.context();
        let flag = ctx.call_arg(&Value::instance(resolve(&engine, "Flag"))).unwrap();
        let rank = ctx.rank(&flag, &resolve(&engine, "bool"), true).unwrap().unwrap();
        assert_eq!(rank.rank, ConversionRank::UserDefined);
        assert!(ctx.rank(&flag, &resolve(&engine, "bool"), false).unwrap().is_none());

        let pointer = resolve(&engine, "callback");
        assert!(ctx.rank_callable(2, &pointer, true).unwrap().is_some());
        assert!(ctx.rank_callable(1, &pointer, true).unwrap().is_none());
        let wrapper = resolve(&engine, "std::function<int(double)>");
        assert!(ctx.rank_callable(1, &wrapper, true).unwrap().is_some());
        assert!(ctx.rank_callable(3, &wrapper, true).unwrap().is_none());
    }
}
