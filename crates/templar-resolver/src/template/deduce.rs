//! Template argument deduction.
//!
//! Arguments are assigned in four steps:
//! 1. explicit arguments fill parameters left to right (parameters after a
//!    pack can only be filled from the right end of the explicit list)
//! 2. for function templates, the remaining parameters are deduced from the
//!    call arguments
//! 3. defaults fill what is left, resolved with everything bound so far; an
//!    unfilled pack is empty
//! 4. constraints (`enable_if` conditions) are checked on the result

use templar_core::decl::{Constraint, FunctionDecl, ParamKind, ParameterSpec, TemplateHeader};
use templar_core::{
    BaseType, KeyArg, NonTypeValue, PrimitiveKind, RefKind, ResolutionError, TemplateArgName, TypeDescriptor, TypeHead,
    TypeName, format_args,
};
use tracing::trace;

use crate::argument::{CallArg, Category};
use crate::context::{Bindings, ResolutionContext, Scope};
use crate::template::param_key;
use crate::template::pattern::PatternMatcher;
use crate::type_resolver::Resolved;

pub(crate) struct DeductionRequest<'a> {
    /// Display name of the template, for diagnostics.
    pub template: &'a str,
    pub header: &'a TemplateHeader,
    pub explicit: &'a [KeyArg],
    /// Set for function templates; `args` are then its call arguments.
    pub function: Option<&'a FunctionDecl>,
    pub args: &'a [CallArg],
    /// Scope of the template's declaration.
    pub scope: &'a Scope,
}

/// A complete argument list, one entry per parameter (packs as
/// [`KeyArg::Pack`]), and the same arguments by parameter name.
#[derive(Debug, Clone)]
pub(crate) struct Deduced {
    pub args: Vec<KeyArg>,
    pub bindings: Bindings,
}

impl ResolutionContext<'_> {
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn deduce(&self, request: &DeductionRequest<'_>) -> Result<Deduced, ResolutionError> {
        let mut state = Deduction {
            ctx: self,
            request,
            bindings: Bindings::default(),
        };
        state.assign_explicit()?;
        if let Some(function) = request.function {
            state.deduce_from_call(function)?;
        }
        state.fill_remaining()?;
        state.check_constraints()?;

        let mut args = Vec::with_capacity(request.header.params.len());
        for param in &request.header.params {
            match state.bindings.get(&param_key(param)) {
                Some(arg) => args.push(arg.clone()),
                None => {
                    return Err(ResolutionError::Internal(format!(
                        "parameter '{}' of '{}' left unbound",
                        param_key(param),
                        request.template
                    )));
                }
            }
        }
        trace!(template = request.template, args = %format_args(&args), "deduced template arguments");
        Ok(Deduced {
            args,
            bindings: state.bindings,
        })
    }
}

struct Deduction<'c, 'e, 'r> {
    ctx: &'c ResolutionContext<'e>,
    request: &'r DeductionRequest<'r>,
    bindings: Bindings,
}

impl Deduction<'_, '_, '_> {
    fn header(&self) -> &TemplateHeader {
        self.request.header
    }

    /// The declaration scope plus everything bound so far.
    fn scope(&self) -> Scope {
        let mut scope = self.request.scope.clone();
        scope
            .bindings
            .extend(self.bindings.iter().map(|(k, v)| (k.clone(), v.clone())));
        scope
    }

    fn bound(&self, param: &ParameterSpec) -> bool {
        self.bindings.contains_key(&param_key(param))
    }

    fn assign_explicit(&mut self) -> Result<(), ResolutionError> {
        let header = self.request.header;
        let explicit = self.request.explicit;
        let params = &header.params;
        match header.pack_index() {
            None => {
                if explicit.len() > params.len() {
                    return Err(ResolutionError::ArgumentCountMismatch {
                        template: self.request.template.to_string(),
                        expected: params.len(),
                        got: explicit.len(),
                    });
                }
                for (param, arg) in params.iter().zip(explicit) {
                    let value = self.check_kind(param, &param.kind, arg)?;
                    self.bindings.insert(param_key(param), value);
                }
            }
            Some(pack) => {
                let lead = pack.min(explicit.len());
                for (param, arg) in params[..pack].iter().zip(&explicit[..lead]) {
                    let value = self.check_kind(param, &param.kind, arg)?;
                    self.bindings.insert(param_key(param), value);
                }
                let rest = &explicit[lead..];
                let trailing = &params[pack + 1..];
                let filled = trailing.len().min(rest.len());
                let (pack_items, trailing_items) = rest.split_at(rest.len() - filled);
                for (param, arg) in trailing[trailing.len() - filled..].iter().zip(trailing_items) {
                    let value = self.check_kind(param, &param.kind, arg)?;
                    self.bindings.insert(param_key(param), value);
                }
                if !pack_items.is_empty() {
                    let pack_param = &params[pack];
                    let mut items = Vec::with_capacity(pack_items.len());
                    for item in pack_items {
                        items.push(self.check_kind(pack_param, pack_param.kind.element(), item)?);
                    }
                    self.bindings.insert(param_key(pack_param), KeyArg::Pack(items));
                }
            }
        }
        Ok(())
    }

    fn check_kind(&self, param: &ParameterSpec, kind: &ParamKind, arg: &KeyArg) -> Result<KeyArg, ResolutionError> {
        let mismatch = |expected: &'static str| ResolutionError::ArgumentKindMismatch {
            template: self.request.template.to_string(),
            parameter: param_key(param),
            expected,
        };
        match (kind, arg) {
            (ParamKind::Type, KeyArg::Type(ty)) if ty.as_value().is_none() => Ok(arg.clone()),
            (ParamKind::Type, _) => Err(mismatch("type")),
            (ParamKind::NonType(declared), KeyArg::Type(ty)) => match ty.as_value() {
                Some(value) => self.convert_value(param, declared, value).map(KeyArg::Type),
                None => Err(mismatch("value")),
            },
            (ParamKind::NonType(_), _) => Err(mismatch("value")),
            (ParamKind::Template, KeyArg::Template(_)) => Ok(arg.clone()),
            (ParamKind::Template, _) => Err(mismatch("template")),
            (ParamKind::Pack(inner), _) => self.check_kind(param, inner, arg),
        }
    }

    /// Convert a non-type argument to the declared parameter type.
    fn convert_value(
        &self,
        param: &ParameterSpec,
        declared: &TypeName,
        value: NonTypeValue,
    ) -> Result<TypeDescriptor, ResolutionError> {
        if matches!(declared.head, TypeHead::Auto) {
            return Ok(TypeDescriptor::value(value.kind, value.value));
        }
        let ty = self.ctx.resolve_type(declared, &self.scope())?;
        let kind = match &ty.base {
            BaseType::Primitive(kind) if ty.pointers.is_empty() => *kind,
            BaseType::Enum(_) if ty.pointers.is_empty() => PrimitiveKind::Int,
            _ => {
                return Err(ResolutionError::ArgumentKindMismatch {
                    template: self.request.template.to_string(),
                    parameter: param_key(param),
                    expected: "value of integral type",
                });
            }
        };
        if kind == PrimitiveKind::Bool {
            return Ok(TypeDescriptor::value(kind, i128::from(value.value != 0)));
        }
        if !kind.fits(value.value) {
            return Err(ResolutionError::ValueOutOfRange {
                value: value.value,
                kind: kind.name().to_string(),
            });
        }
        Ok(TypeDescriptor::value(kind, value.value))
    }

    /// Parameters that call deduction may still bind. Parameters after the
    /// header's pack can only be given explicitly.
    fn deducible(&self) -> Vec<&ParameterSpec> {
        let header = self.header();
        let pack = header.pack_index();
        header
            .params
            .iter()
            .enumerate()
            .filter(|(i, p)| pack.is_none_or(|pk| *i <= pk) && !self.bound(p) && !p.name.is_empty())
            .map(|(_, p)| p)
            .collect()
    }

    fn mentions_deducible(&self, ty: &TypeName) -> bool {
        self.deducible().iter().any(|p| ty.mentions(&p.name))
    }

    fn deduce_from_call(&mut self, function: &FunctionDecl) -> Result<(), ResolutionError> {
        let args = self.request.args;
        let pack_param = function.pack_param();
        let after_pack = pack_param.map_or(0, |p| function.params.len() - p - 1);

        for (index, param) in function.params.iter().enumerate() {
            if param.ty.pack_expansion {
                let end = args.len().saturating_sub(after_pack);
                let elements = args.get(index..end).unwrap_or(&[]);
                self.deduce_pack(&param.ty, elements)?;
                continue;
            }
            let position = match pack_param {
                Some(pack) if index > pack => match args.len().checked_sub(function.params.len() - index) {
                    Some(position) if position >= pack => position,
                    _ => continue,
                },
                _ => index,
            };
            let Some(arg) = args.get(position) else {
                continue;
            };
            if !self.mentions_deducible(&param.ty) {
                continue;
            }
            self.deduce_param(&param.ty, arg)?;
        }
        Ok(())
    }

    fn deduce_pack(&mut self, pattern: &TypeName, elements: &[CallArg]) -> Result<(), ResolutionError> {
        let header = self.request.header;
        let Some(pack) = header.pack_index().map(|i| &header.params[i]) else {
            return Ok(());
        };
        let mut element = pattern.clone();
        element.pack_expansion = false;
        let key = param_key(pack);
        if !element.mentions(&pack.name) || self.bindings.contains_key(&key) {
            return Ok(());
        }
        let mut items = Vec::with_capacity(elements.len());
        for arg in elements {
            self.deduce_param(&element, arg)?;
            match self.bindings.remove(&key) {
                Some(item) => items.push(item),
                None => {
                    return Err(ResolutionError::DeductionFailed {
                        template: self.request.template.to_string(),
                        reason: format!("cannot deduce pack element from '{}'", arg.ty),
                    });
                }
            }
        }
        self.bindings.insert(key, KeyArg::Pack(items));
        Ok(())
    }

    fn fail(&self, reason: String) -> ResolutionError {
        ResolutionError::DeductionFailed {
            template: self.request.template.to_string(),
            reason,
        }
    }

    /// Deduce from one parameter/argument pair.
    fn deduce_param(&mut self, pattern: &TypeName, arg: &CallArg) -> Result<(), ResolutionError> {
        if matches!(arg.ty.base, BaseType::Callable(_) | BaseType::Nullptr) {
            return Err(self.fail(format!("'{}' does not determine a type for '{pattern}'", arg.value.describe())));
        }

        // forwarding reference: an lvalue deduces an lvalue reference
        if pattern.reference == RefKind::RValue && pattern.cv.is_empty() && pattern.pointers.is_empty() {
            let forwarded = pattern
                .as_identifier()
                .filter(|name| self.deducible().iter().any(|p| p.name == *name && matches!(p.kind.element(), ParamKind::Type)))
                .map(str::to_string);
            if let Some(name) = forwarded {
                if matches!(arg.ty.base, BaseType::InitList(_)) {
                    return Err(self.fail("an initializer list does not deduce a forwarding reference".to_string()));
                }
                let deduced = match arg.category {
                    Category::LValue => arg.ty.lvalue_ref(),
                    Category::RValue => arg.ty.clone(),
                };
                self.bindings.insert(name, KeyArg::Type(deduced));
                return Ok(());
            }
        }

        let mut p = pattern.clone();
        p.reference = RefKind::None;
        let a = if pattern.reference == RefKind::None {
            match p.pointers.last_mut() {
                Some(level) => *level = templar_core::Qualifiers::empty(),
                None => p.cv = templar_core::Qualifiers::empty(),
            }
            arg.ty.decay()
        } else {
            // a reference may add cv the argument lacks
            let a = arg.ty.strip_reference();
            let top = a.top_cv();
            match p.pointers.last_mut() {
                Some(level) => *level = level.intersection(top),
                None => p.cv = p.cv.intersection(top),
            }
            a
        };

        if let BaseType::InitList(element) = &a.base {
            return self.deduce_from_list(&p, element);
        }
        let matched = self.run_matcher(|matcher| matcher.match_type(&p, &a))?;
        if !matched {
            return Err(self.fail(format!("'{a}' does not match '{p}'")));
        }
        Ok(())
    }

    /// Only a sequence container pattern deduces from a list, through its
    /// first argument.
    fn deduce_from_list(&mut self, pattern: &TypeName, element: &TypeDescriptor) -> Result<(), ResolutionError> {
        let refuse = || format!("an initializer list does not deduce '{pattern}'");
        let Some(path) = pattern.path() else {
            return Err(self.fail(refuse()));
        };
        let Some(first) = path
            .last()
            .and_then(|segment| segment.args.as_ref())
            .and_then(|args| args.first())
        else {
            return Err(self.fail(refuse()));
        };
        let TemplateArgName::Type(first) = first.clone() else {
            return Err(self.fail(refuse()));
        };
        let mut head = path.clone();
        if let Some(segment) = head.segments.last_mut() {
            segment.args = None;
        }
        let sequence = match self.ctx.resolve_path(&head, &self.scope()) {
            Ok(Resolved::Template(template)) => template
                .decl
                .as_class()
                .is_some_and(|class| class.traits.contains(templar_core::decl::ClassTraits::SEQUENCE)),
            _ => false,
        };
        if !sequence || element.is_void() {
            return Err(self.fail(refuse()));
        }
        let element = element.clone();
        if !self.run_matcher(|matcher| matcher.match_type(&first, &element))? {
            return Err(self.fail(refuse()));
        }
        Ok(())
    }

    fn run_matcher<F>(&mut self, run: F) -> Result<bool, ResolutionError>
    where
        F: FnOnce(&mut PatternMatcher<'_, '_>) -> Result<bool, ResolutionError>,
    {
        let header = self.request.header;
        let pack = header.pack_index();
        let params: Vec<&ParameterSpec> = header
            .params
            .iter()
            .enumerate()
            .filter(|(i, _)| pack.is_none_or(|pk| *i <= pk))
            .map(|(_, p)| p)
            .collect();
        let bindings = std::mem::take(&mut self.bindings);
        let mut matcher = PatternMatcher::new(self.ctx, params, self.request.scope, bindings).for_deduction();
        let outcome = run(&mut matcher);
        self.bindings = matcher.into_bindings();
        outcome
    }

    fn fill_remaining(&mut self) -> Result<(), ResolutionError> {
        let header = self.request.header;
        for param in &header.params {
            let key = param_key(param);
            if self.bindings.contains_key(&key) {
                continue;
            }
            if param.kind.is_pack() {
                self.bindings.insert(key, KeyArg::Pack(Vec::new()));
                continue;
            }
            let Some(default) = &param.default else {
                return Err(ResolutionError::UnderspecifiedTemplate {
                    template: self.request.template.to_string(),
                    parameter: key,
                });
            };
            let resolved = self.ctx.resolve_template_arg(default, &self.scope())?;
            let Some(first) = resolved.into_iter().next() else {
                return Err(ResolutionError::UnderspecifiedTemplate {
                    template: self.request.template.to_string(),
                    parameter: key,
                });
            };
            let value = self.check_kind(param, &param.kind, &first)?;
            self.bindings.insert(key, value);
        }
        Ok(())
    }

    fn check_constraints(&self) -> Result<(), ResolutionError> {
        for constraint in &self.header().constraints {
            let (param, satisfied) = match constraint {
                Constraint::Integral(param) => (param, self.bound_type(param).is_some_and(|t| self.ctx.is_integral(&t))),
                Constraint::Floating(param) => (param, self.bound_type(param).is_some_and(|t| self.ctx.is_floating(&t))),
                Constraint::HasMember { param, member } => (
                    param,
                    self.bound_type(param).is_some_and(|t| self.ctx.has_member(&t, member)),
                ),
            };
            if !satisfied {
                return Err(self.fail(format!("requirement on '{param}' is not satisfied")));
            }
        }
        Ok(())
    }

    fn bound_type(&self, name: &str) -> Option<TypeDescriptor> {
        self.bindings.get(name).and_then(KeyArg::as_type).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::engine_with;
    use templar_core::Value;

    fn header_of(engine: &crate::Engine, name: &str) -> TemplateHeader {
        let store = engine.snapshot();
        store.lookup(name, &[] as &[&str])[0].template.clone().unwrap()
    }

    fn int() -> TypeDescriptor {
        TypeDescriptor::primitive(PrimitiveKind::Int)
    }

    #[test]
    fn explicit_arguments_fill_left_to_right() {
        let engine = engine_with("template<class T, class U = double> struct P {};");
        let ctx = engine.context();
        let header = header_of(&engine, "P");
        let scope = Scope::global();
        let deduced = ctx
            .deduce(&DeductionRequest {
                template: "P",
                header: &header,
                explicit: &[KeyArg::Type(int())],
                function: None,
                args: &[],
                scope: &scope,
            })
            .unwrap();
        assert_eq!(
            deduced.args,
            vec![KeyArg::Type(int()), KeyArg::Type(TypeDescriptor::primitive(PrimitiveKind::Double))]
        );
    }

    #[test]
    fn too_many_arguments_without_pack() {
        let engine = engine_with("template<class T> struct One {};");
        let ctx = engine.context();
        let header = header_of(&engine, "One");
        let scope = Scope::global();
        let err = ctx
            .deduce(&DeductionRequest {
                template: "One",
                header: &header,
                explicit: &[KeyArg::Type(int()), KeyArg::Type(int())],
                function: None,
                args: &[],
                scope: &scope,
            })
            .unwrap_err();
        assert!(matches!(err, ResolutionError::ArgumentCountMismatch { expected: 1, got: 2, .. }));
    }

    #[test]
    fn parameter_after_pack_needs_an_explicit_argument() {
        let engine = engine_with("template<class A, class... B, class C> void odd();");
        let ctx = engine.context();
        let header = header_of(&engine, "odd");
        let scope = Scope::global();
        let request = |explicit: &[KeyArg]| {
            ctx.deduce(&DeductionRequest {
                template: "Odd",
                header: &header,
                explicit,
                function: None,
                args: &[],
                scope: &scope,
            })
        };
        assert!(matches!(
            request(&[KeyArg::Type(int())]),
            Err(ResolutionError::UnderspecifiedTemplate { .. })
        ));
        let deduced = request(&[KeyArg::Type(int()), KeyArg::Type(int())]).unwrap();
        assert_eq!(deduced.args[1], KeyArg::Pack(Vec::new()));
    }

    #[test]
    fn non_type_values_are_range_checked() {
        let engine = engine_with("template<unsigned char N> struct Small {};");
        let ctx = engine.context();
        let header = header_of(&engine, "Small");
        let scope = Scope::global();
        let err = ctx
            .deduce(&DeductionRequest {
                template: "Small",
                header: &header,
                explicit: &[KeyArg::Type(TypeDescriptor::value(PrimitiveKind::Int, 300))],
                function: None,
                args: &[],
                scope: &scope,
            })
            .unwrap_err();
        assert!(matches!(err, ResolutionError::ValueOutOfRange { value: 300, .. }));
    }

    #[test]
    fn forwarding_reference_keeps_lvalue_category() {
        let engine = engine_with("template<class T> void fwd(T&& x);");
        let ctx = engine.context();
        let store = engine.snapshot();
        let decl = store.lookup("fwd", &[] as &[&str])[0].clone();
        let header = decl.template.clone().unwrap();
        let function = decl.as_function().unwrap();
        let scope = Scope::global();
        let args = ctx.call_args(&[Value::typed(int())]).unwrap();
        let deduced = ctx
            .deduce(&DeductionRequest {
                template: "fwd",
                header: &header,
                explicit: &[],
                function: Some(function),
                args: &args,
                scope: &scope,
            })
            .unwrap();
        assert_eq!(deduced.args, vec![KeyArg::Type(int().lvalue_ref())]);

        let args = ctx.call_args(&[Value::Int(3)]).unwrap();
        let deduced = ctx
            .deduce(&DeductionRequest {
                template: "fwd",
                header: &header,
                explicit: &[],
                function: Some(function),
                args: &args,
                scope: &scope,
            })
            .unwrap();
        assert_eq!(deduced.args, vec![KeyArg::Type(int())]);
    }

    #[test]
    fn const_references_deduce_the_unqualified_type() {
        let engine = engine_with("template<class T> int view(const T& x);");
        let ctx = engine.context();
        let store = engine.snapshot();
        let decl = store.lookup("view", &[] as &[&str])[0].clone();
        let header = decl.template.clone().unwrap();
        let function = decl.as_function().unwrap();
        let scope = Scope::global();
        for value in [Value::Int(1), Value::typed(int()), Value::typed(int().with_const())] {
            let args = ctx.call_args(&[value]).unwrap();
            let deduced = ctx
                .deduce(&DeductionRequest {
                    template: "view",
                    header: &header,
                    explicit: &[],
                    function: Some(function),
                    args: &args,
                    scope: &scope,
                })
                .unwrap();
            assert_eq!(deduced.args, vec![KeyArg::Type(int())]);
        }
    }
}
