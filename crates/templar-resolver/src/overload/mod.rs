//! Overload resolution for calls from the host.
//!
//! ## Algorithm
//!
//! 1. Every visible declaration under the name becomes a candidate source
//! 2. Templates are deduced; a failed deduction discards the candidate
//! 3. Parameter types are substituted and each argument is ranked; an
//!    argument that does not convert discards the candidate
//! 4. The best candidate is chosen (see [`ranking`])
//! 5. The winner is instantiated; if the compiler rejects it, it is
//!    removed and selection runs again over the rest

mod ranking;

pub(crate) use ranking::find_best_match;

use std::sync::Arc;

use templar_core::decl::{Declaration, FunctionRole};
use templar_core::{InstantiationKey, KeyArg, ResolutionError, TypeDescriptor, TypeHash, TypeHead};
use tracing::{debug, trace, warn};

use crate::argument::CallArg;
use crate::build::EntityParts;
use crate::context::{ClassFrame, ResolutionContext, Scope};
use crate::conversion::{ArgRank, ConversionRank};
use crate::entity::{Entity, EntityKind, Signature};
use crate::template::deduce::DeductionRequest;

/// A declaration taking part in overload resolution.
#[derive(Debug, Clone)]
pub(crate) struct CandidateSource {
    pub decl: Arc<Declaration>,
    /// Frame the declaration is a member of.
    pub owner: Option<Arc<ClassFrame>>,
    /// The first call argument is the object a member is reached through.
    pub implicit_object: bool,
}

/// One call as seen by the resolver.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallSite<'a> {
    pub name: &'a str,
    pub explicit: &'a [KeyArg],
    pub args: &'a [CallArg],
    /// Class a constructor call creates.
    pub constructs: Option<&'a TypeDescriptor>,
}

/// A viable candidate: substituted parameters and per-argument ranks.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub source: CandidateSource,
    /// Deduced template arguments, one per template parameter.
    pub template_args: Option<Vec<KeyArg>>,
    pub params: Vec<TypeDescriptor>,
    pub ret: Option<TypeDescriptor>,
    pub required: usize,
    pub c_variadic: bool,
    pub has_pack: bool,
    /// Takes untyped slots (`void*`, `...`); ranks below everything else
    /// even without arguments.
    pub greedy: bool,
    /// Implicit object first when the candidate is a method.
    pub ranks: Vec<ArgRank>,
}

impl Candidate {
    pub fn is_template(&self) -> bool {
        self.template_args.is_some()
    }

    pub fn describe(&self) -> String {
        let params: Vec<String> = self.params.iter().map(ToString::to_string).collect();
        format!("{}({})", callable_name(&self.source), params.join(","))
    }
}

/// Errors that end resolution instead of discarding one candidate.
fn is_hard_failure(err: &ResolutionError) -> bool {
    matches!(
        err,
        ResolutionError::RecursiveInstantiation { .. }
            | ResolutionError::AmbiguousSpecialization { .. }
            | ResolutionError::Registration(_)
            | ResolutionError::Internal(_)
    )
}

fn callable_name(source: &CandidateSource) -> String {
    match &source.owner {
        Some(frame) => format!("{}::{}", frame.display(), source.decl.name),
        None => source.decl.qualified_name().to_string(),
    }
}

fn describe_args(args: &[CallArg]) -> String {
    args.iter().map(|arg| arg.value.describe()).collect::<Vec<_>>().join(", ")
}

impl ResolutionContext<'_> {
    /// Pick and instantiate the best of `sources` for `site`.
    ///
    /// With a single source its own failure is reported; with several, a
    /// call nothing accepts is [`ResolutionError::NoMatchingOverload`].
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn resolve_overload(&self, sources: &[CandidateSource], site: &CallSite<'_>) -> Result<Arc<Entity>, ResolutionError> {
        let mut viable = Vec::with_capacity(sources.len());
        let mut last_error = None;
        for source in sources {
            match self.build_candidate(source, site) {
                Ok(candidate) => viable.push(candidate),
                Err(err) if is_hard_failure(&err) => return Err(err),
                Err(err) => {
                    trace!(candidate = %source.decl, error = %err, "candidate discarded");
                    last_error = Some(err);
                }
            }
        }
        debug!(name = site.name, sources = sources.len(), candidates = viable.len(), "overload candidates");

        if viable.is_empty() {
            return Err(match last_error {
                Some(err) if sources.len() == 1 => err,
                _ => ResolutionError::NoMatchingOverload {
                    name: site.name.to_string(),
                    args: describe_args(site.args),
                },
            });
        }

        loop {
            let best = find_best_match(&viable, site.name)?;
            match self.instantiate_candidate(&viable[best], site) {
                Ok(entity) => {
                    debug!(name = site.name, winner = %entity.signature_display(), "overload resolved");
                    return Ok(entity);
                }
                Err(ResolutionError::Compile(err)) => {
                    let rejected = viable.remove(best);
                    warn!(candidate = %rejected.describe(), error = %err, remaining = viable.len(), "candidate rejected by compiler");
                    if viable.is_empty() {
                        return Err(err.into());
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn build_candidate(&self, source: &CandidateSource, site: &CallSite<'_>) -> Result<Candidate, ResolutionError> {
        let decl = &source.decl;
        let func = decl
            .as_function()
            .ok_or_else(|| ResolutionError::Internal(format!("'{decl}' is not callable")))?;
        let mut scope = Scope::of_declaration(decl, source.owner.as_ref());
        let (object, args) = match site.args.split_first() {
            Some((object, rest)) if source.implicit_object => (Some(object), rest),
            _ => (None, site.args),
        };

        let template_args = match &decl.template {
            Some(header) if decl.is_template() => {
                let name = callable_name(source);
                let deduced = match self.deduce(&DeductionRequest {
                    template: &name,
                    header,
                    explicit: site.explicit,
                    function: Some(func),
                    args,
                    scope: &scope,
                }) {
                    Err(ResolutionError::UnderspecifiedTemplate { .. })
                        if self.core.config.explicit_completion && !args.is_empty() =>
                    {
                        let mut completed = site.explicit.to_vec();
                        completed.extend(args.iter().map(|arg| KeyArg::Type(arg.ty.decay())));
                        trace!(template = %name, explicit = completed.len(), "completing explicit arguments from the call");
                        self.deduce(&DeductionRequest {
                            template: &name,
                            header,
                            explicit: &completed,
                            function: Some(func),
                            args,
                            scope: &scope,
                        })?
                    }
                    other => other?,
                };
                scope.bindings = deduced.bindings;
                Some(deduced.args)
            }
            _ if !site.explicit.is_empty() => {
                return Err(ResolutionError::NotATemplate { name: callable_name(source) });
            }
            _ => None,
        };

        let mut params = Vec::with_capacity(func.params.len());
        let mut required = 0;
        for param in &func.params {
            if param.ty.pack_expansion {
                let expanded = self.expand_pack_types(&param.ty, &scope)?;
                required += expanded.len();
                params.extend(expanded);
            } else {
                params.push(self.resolve_type(&param.ty, &scope)?);
                required += usize::from(!param.has_default);
            }
        }
        let ret = match &func.ret {
            Some(ty) if !matches!(ty.head, TypeHead::Auto) => Some(self.resolve_type(ty, &scope)?),
            _ => None,
        };

        if args.len() < required || (!func.variadic && args.len() > params.len()) {
            return Err(ResolutionError::ArgumentCountMismatch {
                template: callable_name(source),
                expected: params.len(),
                got: args.len(),
            });
        }

        let mut ranks = Vec::with_capacity(args.len() + 1);
        if let (FunctionRole::Method, Some(object)) = (func.role, object) {
            // const objects only reach const methods
            let const_object = object.ty.is_const();
            if const_object && !func.is_const {
                return Err(ResolutionError::NoMatchingOverload {
                    name: callable_name(source),
                    args: format!("const object {}", object.ty),
                });
            }
            ranks.push(ArgRank {
                rank: ConversionRank::Exact,
                qualification: u8::from(func.is_const && !const_object),
            });
        }
        for (index, arg) in args.iter().enumerate() {
            let Some(param) = params.get(index) else {
                ranks.push(ArgRank::FALLBACK);
                continue;
            };
            match self.rank(arg, param, true)? {
                Some(rank) => ranks.push(rank),
                None => {
                    return Err(ResolutionError::NoMatchingOverload {
                        name: callable_name(source),
                        args: describe_args(args),
                    });
                }
            }
        }

        Ok(Candidate {
            source: source.clone(),
            has_pack: func.pack_param().is_some(),
            greedy: func.variadic || params.iter().any(|param| self.is_fallback_param(param)),
            template_args,
            params,
            ret,
            required,
            c_variadic: func.variadic,
            ranks,
        })
    }

    fn instantiate_candidate(&self, candidate: &Candidate, site: &CallSite<'_>) -> Result<Arc<Entity>, ResolutionError> {
        let source = &candidate.source;
        let declaration = match &candidate.template_args {
            Some(args) => self
                .function_specialization(&source.decl, args)
                .unwrap_or_else(|| source.decl.clone()),
            None => source.decl.clone(),
        };
        let id = match &source.owner {
            Some(frame) if !frame.is_plain() => TypeHash::from_member(frame.identity(), source.decl.id),
            _ => source.decl.id,
        };
        let name = callable_name(source);
        let key = match &candidate.template_args {
            Some(args) => InstantiationKey::new(id, name, args.clone()),
            None => InstantiationKey::plain(id, name),
        };
        let role = source.decl.as_function().map_or(FunctionRole::Free, |func| func.role);
        let kind = match role {
            FunctionRole::Free => EntityKind::Function,
            FunctionRole::Method => EntityKind::Method,
            FunctionRole::Static => EntityKind::StaticMethod,
            FunctionRole::Constructor => EntityKind::Constructor,
        };
        let owner_ty = source.owner.as_ref().map(|frame| frame.ty.clone());
        let result_type = match role {
            FunctionRole::Constructor => site.constructs.cloned().or_else(|| owner_ty.clone()),
            _ => candidate.ret.clone().map(|ret| self.reduce(ret)),
        };
        let signature = Signature {
            params: candidate.params.clone(),
            ret: candidate.ret.clone(),
            variadic: candidate.c_variadic,
            required: candidate.required,
        };
        let function_type = TypeDescriptor::function(
            candidate.ret.clone().unwrap_or_else(TypeDescriptor::void),
            candidate.params.clone(),
            candidate.c_variadic,
        );

        let entity = self.core.cache.get_or_create(&key, || {
            let _depth = self.enter(&key)?;
            self.build_entity(EntityParts {
                key: key.clone(),
                kind,
                declaration,
                signature: Some(signature),
                result_type,
                ty: Some(function_type),
                owner: owner_ty,
                frame: None,
            })
        })?;
        if !key.is_plain() {
            self.core.exposer.expose(entity.qualified_name(), &entity);
        }
        Ok(entity)
    }

    /// Constructors of `frame`'s class for `site`. A class without declared
    /// constructors has an implicit default and copy constructor; a copy
    /// constructor is implicit as long as none is declared.
    pub fn resolve_constructor(&self, frame: &Arc<ClassFrame>, site: &CallSite<'_>) -> Result<Arc<Entity>, ResolutionError> {
        let mut sources: Vec<CandidateSource> = self
            .constructors(frame)?
            .into_iter()
            .map(|hit| CandidateSource {
                decl: hit.decl,
                owner: Some(hit.frame),
                implicit_object: false,
            })
            .collect();
        let class_name = frame.decl.name.as_str();
        let own = |source: &CandidateSource| source.owner.as_ref().is_some_and(|owner| Arc::ptr_eq(owner, frame));
        let declares_any = sources.iter().any(own);
        let declares_copy = sources
            .iter()
            .any(|source| own(source) && crate::lookup::is_copy_or_move(&source.decl, class_name));
        if !declares_any {
            sources.push(self.implicit_constructor(frame, None)?);
        }
        if !declares_copy {
            sources.push(self.implicit_constructor(frame, Some(&format!("const {class_name}&")))?);
        }
        let site = CallSite {
            constructs: Some(&frame.ty),
            ..*site
        };
        self.resolve_overload(&sources, &site)
    }

    fn implicit_constructor(&self, frame: &Arc<ClassFrame>, param: Option<&str>) -> Result<CandidateSource, ResolutionError> {
        let params = match param {
            Some(spelling) => vec![templar_core::decl::FunctionParam::new(templar_parser::parse_type(spelling)?)],
            None => Vec::new(),
        };
        let mut decl = Declaration::new(
            frame.decl.name.clone(),
            templar_core::decl::DeclKind::Function(templar_core::decl::FunctionDecl::new(
                FunctionRole::Constructor,
                None,
                params,
            )),
        );
        decl.scope = frame.decl.scope.clone();
        decl.scope.push(frame.decl.name.clone());
        decl.id = decl.compute_id();
        Ok(CandidateSource {
            decl: Arc::new(decl),
            owner: Some(frame.clone()),
            implicit_object: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::engine_with;
    use templar_core::Value;

    #[test]
    fn exact_beats_promotion_beats_fallback() {
        let engine = engine_with(
            "int pick(int); int pick(long long); int pick(void*); \
             int only_greedy(void*); int only_wide(long long);",
        );
        let chosen = engine.resolve_call("", "pick", &[], &[Value::Int(3)]).unwrap();
        assert_eq!(chosen.signature_display(), "pick(int)");
        let wide = engine.resolve_call("", "only_wide", &[], &[Value::Int(3)]).unwrap();
        assert_eq!(wide.signature_display(), "only_wide(long long)");
        let err = engine.resolve_call("", "only_greedy", &[], &[Value::Int(3)]).unwrap_err();
        assert!(matches!(err, ResolutionError::ArgumentCountMismatch { .. } | ResolutionError::NoMatchingOverload { .. }));
    }

    #[test]
    fn non_template_wins_a_tie() {
        let engine = engine_with("int foo(int); template<class T> int foo(T);");
        let chosen = engine.resolve_call("", "foo", &[], &[Value::Int(3)]).unwrap();
        assert!(!chosen.is_template_instance());
        let generic = engine.resolve_call("", "foo", &[], &[Value::Float(3.0)]).unwrap();
        assert_eq!(generic.qualified_name(), "foo<double>");
    }

    #[test]
    fn dominance_decides_mixed_ranks() {
        let engine = engine_with("int mix(int, double); int mix(long long, short);");
        let chosen = engine.resolve_call("", "mix", &[], &[Value::Int(1), Value::Float(1.0)]).unwrap();
        assert_eq!(chosen.signature_display(), "mix(int,double)");

        let engine = engine_with("int tie(int, long long); int tie(long long, int);");
        let err = engine.resolve_call("", "tie", &[], &[Value::Int(1), Value::Int(1)]).unwrap_err();
        assert!(matches!(err, ResolutionError::AmbiguousOverload { candidates, .. } if candidates.len() == 2));
    }

    #[test]
    fn nothing_viable_reports_the_call() {
        let engine = engine_with("int f(int); int f(int, int);");
        let err = engine.resolve_call("", "f", &[], &[Value::str("x")]).unwrap_err();
        assert!(matches!(err, ResolutionError::NoMatchingOverload { name, .. } if name == "f"));
    }

    #[test]
    fn rejected_winners_fall_back_to_the_next_candidate() {
        use crate::{CompiledHandle, Engine, EngineConfig, InstantiationRequest};
        use templar_core::CompileError;

        let reject_templates = |request: &InstantiationRequest<'_>| {
            if request.key.is_plain() {
                Ok(CompiledHandle(1))
            } else {
                Err(CompileError::new(request.display_name, "static assertion failed"))
            }
        };
        let engine = Engine::with_config(EngineConfig::default(), reject_templates).unwrap();
        engine
            .register_source("template<class T> int g(T); int g(double);")
            .unwrap();
        let chosen = engine.resolve_call("", "g", &[], &[Value::Int(1)]).unwrap();
        assert_eq!(chosen.signature_display(), "g(double)");

        engine.register_source("template<class T> int lone(T);").unwrap();
        let err = engine.resolve_call("", "lone", &[], &[Value::Int(1)]).unwrap_err();
        assert!(matches!(err, ResolutionError::Compile(_)));
    }

    #[test]
    fn const_objects_reach_const_methods_only() {
        let engine = engine_with("struct S { int get(); int get() const; int touch(); };");
        let mutable = engine.resolve_call("S", "get", &[], &[]).unwrap();
        assert_eq!(mutable.signature_display(), "S::get()");
        assert_eq!(mutable.declaration().as_function().map(|f| f.is_const), Some(false));
        let constant = engine.resolve_call("const S", "get", &[], &[]).unwrap();
        assert_eq!(constant.declaration().as_function().map(|f| f.is_const), Some(true));
        assert!(engine.resolve_call("const S", "touch", &[], &[]).is_err());
    }

    #[test]
    fn implicit_constructors() {
        let engine = engine_with("struct P { int x; }; struct Q { Q(int); };");
        let default = engine.resolve_constructor("P", &[], &[]).unwrap();
        assert_eq!(default.kind(), EntityKind::Constructor);
        assert!(engine.resolve_constructor("Q", &[], &[]).is_err());
        let q = engine.resolve_type("Q").unwrap();
        let copy = engine.resolve_constructor("Q", &[], &[Value::instance(q)]).unwrap();
        assert_eq!(copy.signature().map(|s| s.params.len()), Some(1));
    }
}
