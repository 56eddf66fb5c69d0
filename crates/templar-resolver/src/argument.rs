//! Runtime values and explicit template-argument tokens to descriptors.

use templar_core::{KeyArg, PrimitiveKind, ResolutionError, TemplateArg, TemplateArgName, TypeDescriptor, Value};
use tracing::trace;

use crate::context::{ResolutionContext, Scope};

/// Value category of a call argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    LValue,
    RValue,
}

/// A call argument with its resolved type.
#[derive(Debug, Clone)]
pub struct CallArg {
    pub value: Value,
    /// Type of the argument expression, never a reference.
    pub ty: TypeDescriptor,
    pub category: Category,
}

impl CallArg {
    pub fn is_lvalue(&self) -> bool {
        self.category == Category::LValue
    }
}

impl ResolutionContext<'_> {
    pub fn call_args(&self, values: &[Value]) -> Result<Vec<CallArg>, ResolutionError> {
        values.iter().map(|value| self.call_arg(value)).collect()
    }

    pub fn call_arg(&self, value: &Value) -> Result<CallArg, ResolutionError> {
        let category = match value {
            Value::Typed(ty) if !ty.is_rvalue_ref() => Category::LValue,
            Value::Instance { rvalue: false, .. } => Category::LValue,
            _ => Category::RValue,
        };
        Ok(CallArg {
            value: value.clone(),
            ty: self.value_type(value)?,
            category,
        })
    }

    /// Type of a runtime value.
    ///
    /// Integers take the first kind of the integral ladder that holds them.
    /// Lists become an initializer list of their common element type, or of
    /// `void` when the elements disagree.
    pub fn value_type(&self, value: &Value) -> Result<TypeDescriptor, ResolutionError> {
        Ok(match value {
            Value::Int(v) => TypeDescriptor::primitive(self.integral_kind(*v)?),
            Value::Float(_) => TypeDescriptor::primitive(self.core.config.float_type),
            Value::Bool(_) => TypeDescriptor::primitive(PrimitiveKind::Bool),
            Value::Str(_) => self.string_type(),
            Value::Null => TypeDescriptor::nullptr(),
            Value::List(items) => TypeDescriptor::init_list(self.common_element(items)?),
            Value::Typed(ty) | Value::Instance { ty, .. } | Value::Enumerator { ty, .. } => ty.strip_reference(),
            Value::Callable { arity } => TypeDescriptor::callable(*arity),
        })
    }

    fn common_element(&self, items: &[Value]) -> Result<TypeDescriptor, ResolutionError> {
        if items.is_empty() {
            return Ok(TypeDescriptor::void());
        }
        if items.iter().all(|item| matches!(item, Value::Int(_))) {
            // widest rung any element needs
            let mut widest = 0usize;
            let ladder = &self.core.config.integral_ladder;
            for item in items {
                if let Value::Int(v) = item {
                    let kind = self.integral_kind(*v)?;
                    widest = widest.max(ladder.iter().position(|k| *k == kind).unwrap_or(0));
                }
            }
            return Ok(ladder
                .get(widest)
                .map(|kind| TypeDescriptor::primitive(*kind))
                .unwrap_or_else(TypeDescriptor::void));
        }
        let mut types = items.iter().map(|item| self.value_type(item).map(|ty| ty.decay()));
        let Some(first) = types.next().transpose()? else {
            return Ok(TypeDescriptor::void());
        };
        for ty in types {
            if ty? != first {
                return Ok(TypeDescriptor::void());
            }
        }
        Ok(first)
    }

    /// Smallest kind of the integral ladder that represents `value` exactly.
    pub fn integral_kind(&self, value: i128) -> Result<PrimitiveKind, ResolutionError> {
        self.core
            .config
            .integral_ladder
            .iter()
            .copied()
            .find(|kind| kind.fits(value))
            .ok_or(ResolutionError::AmbiguousNumericWidth { value })
    }

    /// A literal non-type argument.
    pub fn literal_type(&self, value: i128) -> Result<TypeDescriptor, ResolutionError> {
        Ok(TypeDescriptor::value(self.integral_kind(value)?, value))
    }

    /// The type runtime strings resolve to: the configured spelling when
    /// it names a type, otherwise `const char*`.
    pub fn string_type(&self) -> TypeDescriptor {
        let fallback = || TypeDescriptor::primitive(PrimitiveKind::Char).with_const().pointer_to();
        let Ok(spelled) = templar_parser::parse_type(&self.core.config.string_type) else {
            return fallback();
        };
        match self.resolve_type(&spelled, &Scope::global()) {
            Ok(ty) => ty,
            Err(err) => {
                trace!(spelling = %self.core.config.string_type, error = %err, "string type not declared");
                fallback()
            }
        }
    }

    /// Explicit template arguments as supplied by the host. A name token
    /// may hold a comma-separated list.
    pub fn explicit_args(&self, args: &[TemplateArg], scope: &Scope) -> Result<Vec<KeyArg>, ResolutionError> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                TemplateArg::Name(text) => {
                    let spelled = templar_parser::parse_template_args(text)
                        .map_err(|_| ResolutionError::UnresolvableArgument { token: text.clone() })?;
                    for item in &spelled {
                        out.extend(self.explicit_arg(item, scope)?);
                    }
                }
                TemplateArg::Int(value) => out.push(KeyArg::Type(self.literal_type(*value)?)),
                TemplateArg::Bool(value) => {
                    out.push(KeyArg::Type(TypeDescriptor::value(PrimitiveKind::Bool, i128::from(*value))));
                }
                TemplateArg::Type(ty) => out.push(KeyArg::Type(ty.clone())),
            }
        }
        Ok(out)
    }

    fn explicit_arg(&self, arg: &TemplateArgName, scope: &Scope) -> Result<Vec<KeyArg>, ResolutionError> {
        self.resolve_template_arg(arg, scope).map_err(|err| match err {
            ResolutionError::UnknownName { .. } | ResolutionError::NotATemplate { .. } | ResolutionError::Parse(_) => {
                ResolutionError::UnresolvableArgument { token: arg.to_string() }
            }
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::engine_with;
    use crate::{Engine, EngineConfig, NullInstantiator};

    #[test]
    fn integers_take_the_smallest_ladder_rung() {
        let engine = engine_with("");
        let ctx = engine.context();
        assert_eq!(ctx.integral_kind(3).unwrap(), PrimitiveKind::Int);
        assert_eq!(ctx.integral_kind(100_000_000_000).unwrap(), PrimitiveKind::Long);
        assert_eq!(ctx.integral_kind(i128::from(u64::MAX)).unwrap(), PrimitiveKind::UnsignedLong);
        assert!(matches!(
            ctx.integral_kind(i128::from(u64::MAX) + 1),
            Err(ResolutionError::AmbiguousNumericWidth { .. })
        ));
    }

    #[test]
    fn categories_follow_the_value() {
        let engine = engine_with("struct W {};");
        let ctx = engine.context();
        let w = TypeDescriptor::class(templar_core::ClassRef::named("W"));
        assert!(ctx.call_arg(&Value::instance(w.clone())).unwrap().is_lvalue());
        assert!(!ctx.call_arg(&Value::moved(w.clone())).unwrap().is_lvalue());
        assert!(!ctx.call_arg(&Value::typed(w.rvalue_ref())).unwrap().is_lvalue());
        assert_eq!(ctx.call_arg(&Value::typed(w.lvalue_ref())).unwrap().ty, w);
        assert!(!ctx.call_arg(&Value::Int(1)).unwrap().is_lvalue());
    }

    #[test]
    fn strings_fall_back_to_char_pointers() {
        let engine = engine_with("");
        let ctx = engine.context();
        assert_eq!(ctx.value_type(&Value::str("x")).unwrap().to_string(), "std::string");

        let bare = Engine::with_config(EngineConfig::default().with_prelude(false), NullInstantiator).unwrap();
        let ctx = bare.context();
        assert_eq!(ctx.value_type(&Value::str("x")).unwrap().to_string(), "const char*");
    }

    #[test]
    fn lists_carry_their_element_type() {
        let engine = engine_with("");
        let ctx = engine.context();
        let ints = ctx.value_type(&Value::List(vec![Value::Int(1), Value::Int(1 << 40)])).unwrap();
        assert_eq!(ints, TypeDescriptor::init_list(TypeDescriptor::primitive(PrimitiveKind::Long)));
        let mixed = ctx.value_type(&Value::List(vec![Value::Int(1), Value::str("a")])).unwrap();
        assert_eq!(mixed, TypeDescriptor::init_list(TypeDescriptor::void()));
    }

    #[test]
    fn explicit_tokens_split_and_resolve() {
        let engine = engine_with("namespace ns { typedef double real; }");
        let ctx = engine.context();
        let args = ctx
            .explicit_args(&[TemplateArg::from("std::vector<float>, ns::real"), TemplateArg::Int(5)], &Scope::global())
            .unwrap();
        assert_eq!(args.len(), 3);
        assert_eq!(args[1], KeyArg::Type(TypeDescriptor::primitive(PrimitiveKind::Double)));
        assert_eq!(args[2], KeyArg::Type(TypeDescriptor::value(PrimitiveKind::Int, 5)));

        let err = ctx.explicit_args(&[TemplateArg::from("NoSuchType")], &Scope::global()).unwrap_err();
        assert!(matches!(err, ResolutionError::UnresolvableArgument { token } if token == "NoSuchType"));
    }
}
