//! Matching spelled patterns against resolved types.
//!
//! A pattern is a [`TypeName`] that mentions template parameters, like
//! `const T*`, `std::vector<T>` or `R(Args...)`. Matching peels the
//! pattern from the outside in (reference, pointer levels, cv) and binds
//! each parameter the first time it is met; later occurrences must agree.
//!
//! The same matcher serves two callers with slightly different rules:
//! - specialization selection needs an exact structural match
//! - call deduction tolerates trailing defaulted class arguments and may
//!   match a base class of the argument

use templar_core::decl::{ParamKind, ParameterSpec};
use templar_core::{
    BaseType, ClassRef, KeyArg, ResolutionError, TemplateArgName, TypeDescriptor, TypeHead, TypeName, TypePath,
};

use crate::context::{Bindings, ResolutionContext, Scope};
use crate::type_resolver::Resolved;

pub(crate) struct PatternMatcher<'c, 'e> {
    ctx: &'c ResolutionContext<'e>,
    params: Vec<&'c ParameterSpec>,
    scope: &'c Scope,
    bindings: Bindings,
    deduction: bool,
}

impl<'c, 'e> PatternMatcher<'c, 'e> {
    pub fn new(ctx: &'c ResolutionContext<'e>, params: Vec<&'c ParameterSpec>, scope: &'c Scope, bindings: Bindings) -> Self {
        Self {
            ctx,
            params,
            scope,
            bindings,
            deduction: false,
        }
    }

    /// Relax matching for call deduction.
    pub fn for_deduction(mut self) -> Self {
        self.deduction = true;
        self
    }

    pub fn into_bindings(self) -> Bindings {
        self.bindings
    }

    fn param(&self, name: &str) -> Option<&'c ParameterSpec> {
        self.params.iter().copied().find(|p| !p.name.is_empty() && p.name == name)
    }

    /// Whether the pattern still mentions an unbound parameter.
    fn is_dependent(&self, ty: &TypeName) -> bool {
        self.params
            .iter()
            .any(|p| !p.name.is_empty() && !self.bindings.contains_key(&p.name) && ty.mentions(&p.name))
    }

    fn is_dependent_text(&self, text: &str) -> bool {
        self.params.iter().any(|p| {
            !p.name.is_empty()
                && !self.bindings.contains_key(&p.name)
                && text.split(|c: char| !c.is_alphanumeric() && c != '_').any(|w| w == p.name)
        })
    }

    fn resolution_scope(&self) -> Scope {
        let mut scope = self.scope.clone();
        scope
            .bindings
            .extend(self.bindings.iter().map(|(k, v)| (k.clone(), v.clone())));
        scope
    }

    fn bind(&mut self, name: &str, value: KeyArg) -> bool {
        match self.bindings.get(name) {
            Some(existing) => same_arg(existing, &value),
            None => {
                self.bindings.insert(name.to_string(), value);
                true
            }
        }
    }

    pub fn match_type(&mut self, pattern: &TypeName, arg: &TypeDescriptor) -> Result<bool, ResolutionError> {
        if !self.is_dependent(pattern) {
            return match self.ctx.resolve_type(pattern, &self.resolution_scope()) {
                Ok(resolved) => Ok(same_type(&resolved, arg)),
                Err(err) => soft(err),
            };
        }
        if pattern.reference != arg.reference {
            return Ok(false);
        }

        let mut rest = arg.strip_reference().without_alias();
        let depth = pattern.pointers.len();
        let levels = rest.pointers.len();
        if levels < depth {
            return Ok(false);
        }
        for (j, quals) in pattern.pointers.iter().enumerate() {
            if !rest.pointers[levels - depth + j].contains(*quals) {
                return Ok(false);
            }
        }
        rest.pointers.truncate(levels - depth);
        if !rest.top_cv().contains(pattern.cv) {
            return Ok(false);
        }
        match rest.pointers.last_mut() {
            Some(level) => level.remove(pattern.cv),
            None => rest.cv.remove(pattern.cv),
        }

        match &pattern.head {
            TypeHead::Builtin(kind) => Ok(rest == TypeDescriptor::primitive(*kind)),
            TypeHead::Auto => Ok(true),
            TypeHead::Function { ret, params, variadic } => match &rest.base {
                BaseType::Function(function) if rest.pointers.is_empty() && rest.cv.is_empty() => {
                    Ok(function.variadic == *variadic
                        && self.match_type(ret, &function.ret)?
                        && self.match_list(params, &function.params)?)
                }
                _ => Ok(false),
            },
            TypeHead::Path(path) => self.match_path(path, &rest),
        }
    }

    /// Match a parameter list that may contain `T...` entries.
    fn match_list(&mut self, patterns: &[TypeName], args: &[TypeDescriptor]) -> Result<bool, ResolutionError> {
        let mut index = 0;
        for (i, pattern) in patterns.iter().enumerate() {
            if pattern.pack_expansion {
                let remaining = patterns.len() - i - 1;
                let take = args.len().saturating_sub(index + remaining);
                let items: Vec<KeyArg> = args[index..index + take].iter().cloned().map(KeyArg::Type).collect();
                if !self.match_pack(pattern, &items)? {
                    return Ok(false);
                }
                index += take;
                continue;
            }
            let Some(arg) = args.get(index) else {
                return Ok(false);
            };
            if !self.match_type(pattern, arg)? {
                return Ok(false);
            }
            index += 1;
        }
        Ok(index == args.len())
    }

    /// Match `pattern...` against a run of arguments, binding the pack.
    fn match_pack(&mut self, pattern: &TypeName, items: &[KeyArg]) -> Result<bool, ResolutionError> {
        let mut element = pattern.clone();
        element.pack_expansion = false;
        let pack = self
            .params
            .iter()
            .copied()
            .find(|p| p.kind.is_pack() && !p.name.is_empty() && element.mentions(&p.name));
        let Some(pack) = pack.filter(|p| !self.bindings.contains_key(&p.name)) else {
            // already bound, or no pack of ours: compare the expansion
            let scope = self.resolution_scope();
            return Ok(self
                .ctx
                .expand_pack_args(pattern, &scope)
                .is_ok_and(|expanded| expanded.len() == items.len() && expanded.iter().zip(items).all(|(a, b)| same_arg(a, b))));
        };
        let key = pack.name.clone();
        let bare = element.is_bare() && element.as_identifier() == Some(key.as_str());

        let mut collected = Vec::with_capacity(items.len());
        for item in items {
            let matched = match item {
                _ if bare => self.bind(&key, item.clone()),
                KeyArg::Type(ty) => self.match_type(&element, ty)?,
                _ => false,
            };
            if !matched {
                return Ok(false);
            }
            match self.bindings.remove(&key) {
                Some(value) => collected.push(value),
                None => return Ok(false),
            }
        }
        self.bindings.insert(key, KeyArg::Pack(collected));
        Ok(true)
    }

    fn match_path(&mut self, path: &TypePath, inner: &TypeDescriptor) -> Result<bool, ResolutionError> {
        let Some(last) = path.last() else {
            return Ok(false);
        };

        if path.segments.len() == 1 && !path.global {
            if let Some(param) = self.param(&last.name) {
                return match (&last.args, param.kind.element()) {
                    (None, ParamKind::Type) => {
                        Ok(inner.as_value().is_none() && self.bind(&param.name, KeyArg::Type(inner.clone())))
                    }
                    (None, ParamKind::NonType(_)) => {
                        Ok(inner.as_value().is_some() && self.bind(&param.name, KeyArg::Type(inner.clone())))
                    }
                    (Some(args), ParamKind::Template) => {
                        let Some(key) = inner.instance_key().cloned() else {
                            return Ok(false);
                        };
                        let template = ClassRef::new(key.decl, key.name.clone());
                        if !self.bind(&param.name, KeyArg::Template(template)) {
                            return Ok(false);
                        }
                        let flat: Vec<KeyArg> = key.flat_args().into_iter().cloned().collect();
                        self.match_args(args, &flat)
                    }
                    _ => Ok(false),
                };
            }
        }

        let Some(args) = &last.args else {
            // `typename T::type` and friends do not take part in deduction
            return Ok(self.deduction);
        };
        let mut head = path.clone();
        if let Some(segment) = head.segments.last_mut() {
            segment.args = None;
        }
        let template = match self.ctx.resolve_path(&head, &self.resolution_scope()) {
            Ok(Resolved::Template(template)) => template,
            Ok(_) => return Ok(false),
            Err(err) => return soft(err),
        };

        if let Some(key) = inner.instance_key() {
            if key.decl == template.ident() {
                let flat: Vec<KeyArg> = key.flat_args().into_iter().cloned().collect();
                return self.match_args(args, &flat);
            }
        }
        if self.deduction && inner.is_class() {
            let Ok(frame) = self.ctx.class_frame(inner) else {
                return Ok(false);
            };
            for base in &frame.bases {
                let saved = self.bindings.clone();
                if self.match_path(path, base)? {
                    return Ok(true);
                }
                self.bindings = saved;
            }
        }
        Ok(false)
    }

    /// Match spelled template arguments against resolved ones.
    pub fn match_args(&mut self, patterns: &[TemplateArgName], args: &[KeyArg]) -> Result<bool, ResolutionError> {
        let mut index = 0;
        for (i, pattern) in patterns.iter().enumerate() {
            if let TemplateArgName::Type(ty) = pattern {
                if ty.pack_expansion {
                    let remaining = patterns.len() - i - 1;
                    let take = args.len().saturating_sub(index + remaining);
                    if !self.match_pack(ty, &args[index..index + take])? {
                        return Ok(false);
                    }
                    index += take;
                    continue;
                }
            }
            let Some(arg) = args.get(index) else {
                return Ok(false);
            };
            if !self.match_arg(pattern, arg)? {
                return Ok(false);
            }
            index += 1;
        }
        Ok(index == args.len() || self.deduction)
    }

    fn match_arg(&mut self, pattern: &TemplateArgName, arg: &KeyArg) -> Result<bool, ResolutionError> {
        match (pattern, arg) {
            (TemplateArgName::Int(value), KeyArg::Type(ty)) => Ok(ty.as_value().is_some_and(|v| v.value == *value)),
            (TemplateArgName::Bool(value), KeyArg::Type(ty)) => {
                Ok(ty.as_value().is_some_and(|v| v.value == i128::from(*value)))
            }
            (TemplateArgName::Type(spelled), KeyArg::Type(ty)) => self.match_type(spelled, ty),
            (TemplateArgName::Type(spelled), KeyArg::Template(class)) => {
                if let Some(name) = spelled.as_identifier().filter(|_| spelled.is_bare()) {
                    if let Some(param) = self.param(name) {
                        if matches!(param.kind.element(), ParamKind::Template) {
                            return Ok(self.bind(name, arg.clone()));
                        }
                    }
                }
                match spelled.path().map(|p| self.ctx.resolve_path(p, &self.resolution_scope())) {
                    Some(Ok(Resolved::Template(template))) => Ok(template.ident() == class.id),
                    _ => Ok(false),
                }
            }
            (TemplateArgName::Expr(text), KeyArg::Type(ty)) => {
                if self.is_dependent_text(text) {
                    return Ok(self.deduction);
                }
                match self.ctx.evaluate(text, &self.resolution_scope()) {
                    Ok(value) => Ok(same_type(&value, ty)),
                    Err(_) => Ok(false),
                }
            }
            _ => Ok(false),
        }
    }
}

/// Equality that compares non-type values by value only.
pub(crate) fn same_type(a: &TypeDescriptor, b: &TypeDescriptor) -> bool {
    match (a.as_value(), b.as_value()) {
        (Some(x), Some(y)) => x.value == y.value,
        (None, None) => a == b,
        _ => false,
    }
}

pub(crate) fn same_arg(a: &KeyArg, b: &KeyArg) -> bool {
    match (a, b) {
        (KeyArg::Type(x), KeyArg::Type(y)) => same_type(x, y),
        (KeyArg::Pack(x), KeyArg::Pack(y)) => x.len() == y.len() && x.iter().zip(y).all(|(a, b)| same_arg(a, b)),
        _ => a == b,
    }
}

/// Resolution errors inside a pattern only mean "no match", except the
/// ones that must stop the whole resolution.
fn soft(err: ResolutionError) -> Result<bool, ResolutionError> {
    match err {
        ResolutionError::AmbiguousSpecialization { .. }
        | ResolutionError::RecursiveInstantiation { .. }
        | ResolutionError::Internal(_) => Err(err),
        _ => Ok(false),
    }
}
