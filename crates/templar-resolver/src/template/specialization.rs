//! Choosing between a primary template and its specializations.

use std::sync::Arc;

use templar_core::decl::{Declaration, ParameterSpec, TemplateHeader};
use templar_core::{InstantiationKey, KeyArg, ResolutionError};
use templar_registry::specificity;
use tracing::debug;

use crate::context::{Bindings, ResolutionContext, Scope};
use crate::template::param_key;
use crate::template::pattern::PatternMatcher;

impl ResolutionContext<'_> {
    /// The declaration that defines class instance `key`, with its bindings.
    ///
    /// Every specialization whose argument pattern matches the key exactly
    /// is a candidate; the most specific one wins. Two equally specific
    /// matches are an error. Without a match the primary template is used.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn select_specialization(
        &self,
        primary: &Arc<Declaration>,
        key: &InstantiationKey,
        scope: &Scope,
    ) -> Result<(Arc<Declaration>, Bindings), ResolutionError> {
        let flat: Vec<KeyArg> = key.flat_args().into_iter().cloned().collect();
        let mut matches: Vec<(usize, Arc<Declaration>, Bindings)> = Vec::new();
        for candidate in self.store.specializations_of(primary.id) {
            let Some(bindings) = self.match_specialization(candidate, &flat, scope)? else {
                continue;
            };
            matches.push((specificity(candidate), candidate.clone(), bindings));
        }

        let Some(best) = matches.iter().map(|(score, _, _)| *score).max() else {
            return Ok((primary.clone(), positional_bindings(primary, key)));
        };
        let mut winners: Vec<(usize, Arc<Declaration>, Bindings)> =
            matches.into_iter().filter(|(score, _, _)| *score == best).collect();
        if winners.len() > 1 {
            return Err(ResolutionError::AmbiguousSpecialization {
                template: key.to_string(),
                candidates: winners.iter().map(|(_, decl, _)| decl.to_string()).collect(),
            });
        }
        let Some((_, chosen, bindings)) = winners.pop() else {
            return Err(ResolutionError::Internal(format!("no specialization left for '{key}'")));
        };
        debug!(key = %key, specialization = %chosen, "selected specialization");
        Ok((chosen, bindings))
    }

    fn match_specialization(
        &self,
        candidate: &Arc<Declaration>,
        args: &[KeyArg],
        scope: &Scope,
    ) -> Result<Option<Bindings>, ResolutionError> {
        let Some(pattern) = &candidate.specialization else {
            return Ok(None);
        };
        let header: TemplateHeader = candidate.template.clone().unwrap_or_default();
        let params: Vec<&ParameterSpec> = header.params.iter().collect();
        let mut matcher = PatternMatcher::new(self, params, scope, Bindings::default());
        if !matcher.match_args(pattern, args)? {
            return Ok(None);
        }
        let mut bindings = matcher.into_bindings();
        for param in &header.params {
            let name = param_key(param);
            if bindings.contains_key(&name) {
                continue;
            }
            if param.kind.is_pack() {
                bindings.insert(name, KeyArg::Pack(Vec::new()));
            } else {
                // a parameter the pattern never mentions cannot be deduced
                return Ok(None);
            }
        }
        Ok(Some(bindings))
    }

    /// A full specialization of function template `primary` for `args`.
    pub fn function_specialization(&self, primary: &Arc<Declaration>, args: &[KeyArg]) -> Option<Arc<Declaration>> {
        let flat: Vec<KeyArg> = args.iter().flat_map(KeyArg::flatten).cloned().collect();
        let scope = Scope::namespace(primary.scope.clone());
        self.store
            .specializations_of(primary.id)
            .iter()
            .filter(|candidate| candidate.template.as_ref().is_none_or(TemplateHeader::is_empty))
            .find(|candidate| {
                matches!(self.match_specialization(candidate, &flat, &scope), Ok(Some(_)))
            })
            .cloned()
    }
}

/// Bindings of the primary template: parameters in order.
fn positional_bindings(primary: &Declaration, key: &InstantiationKey) -> Bindings {
    let mut bindings = Bindings::default();
    if let Some(header) = &primary.template {
        for (param, arg) in header.params.iter().zip(&key.args) {
            bindings.insert(param_key(param), arg.clone());
        }
    }
    bindings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::engine_with;

    const SOURCE: &str = "
        template<class T, class U> struct S { int primary; };
        template<class T> struct S<T*, int> { int pointer_int; };
        template<class T, class U> struct S<T*, U> { int pointer_any; };
        template<> struct S<char, char> { int full; };
        template<class T> struct S<T, T*> { int left; };
        template<class T> struct S<T*, T> { int right; };
    ";

    fn chosen(engine: &crate::Engine, spelling: &str) -> Result<Vec<String>, ResolutionError> {
        engine.resolve_class(spelling, &[]).map(|entity| entity.member_names())
    }

    #[test]
    fn most_specific_partial_specialization_wins() {
        let engine = engine_with(SOURCE);
        assert_eq!(chosen(&engine, "S<double*, int>").unwrap(), vec!["pointer_int"]);
        assert_eq!(chosen(&engine, "S<double*, long>").unwrap(), vec!["pointer_any"]);
        assert_eq!(chosen(&engine, "S<char, char>").unwrap(), vec!["full"]);
        assert_eq!(chosen(&engine, "S<int, double>").unwrap(), vec!["primary"]);
    }

    #[test]
    fn equally_specific_matches_are_ambiguous() {
        let engine = engine_with(SOURCE);
        // S<T*, int>, S<T*, U> and S<T*, T> all match; the first is the
        // only one with the highest score
        assert_eq!(chosen(&engine, "S<int*, int>").unwrap(), vec!["pointer_int"]);
        let engine = engine_with(
            "template<class A, class B> struct R {}; \
             template<class T, class U> struct R<T*, U> { int left; }; \
             template<class T, class U> struct R<T, U*> { int right; };",
        );
        assert!(matches!(
            chosen(&engine, "R<int*, int*>"),
            Err(ResolutionError::AmbiguousSpecialization { .. })
        ));
    }
}
