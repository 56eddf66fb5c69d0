//! Rank-based selection among viable candidates.
//!
//! Candidates compare by, in order:
//! 1. worst per-argument rank
//! 2. per-argument dominance: at least as good everywhere, better somewhere
//! 3. non-template over template
//! 4. no pack or C-style ellipsis over variadic
//!
//! Anything these rules leave tied is ambiguous.

use std::cmp::Ordering;

use templar_core::ResolutionError;

use super::Candidate;
use crate::conversion::ArgRank;

/// Index of the candidate strictly better than every other one.
///
/// # Returns
///
/// * `Ok(index)` - the unique best candidate
/// * `Err(ResolutionError::AmbiguousOverload)` - no candidate beats all others
pub(crate) fn find_best_match(viable: &[Candidate], name: &str) -> Result<usize, ResolutionError> {
    if viable.len() == 1 {
        return Ok(0);
    }

    // the winner, if any, is among those with the best worst rank
    let best_worst = viable.iter().map(worst_rank).min();
    let contenders: Vec<usize> = (0..viable.len())
        .filter(|&i| Some(worst_rank(&viable[i])) == best_worst)
        .collect();

    for &i in &contenders {
        let beats_all = (0..viable.len())
            .filter(|&j| j != i)
            .all(|j| compare(&viable[i], &viable[j]) == Ordering::Less);
        if beats_all {
            return Ok(i);
        }
    }

    Err(ResolutionError::AmbiguousOverload {
        name: name.to_string(),
        candidates: contenders.iter().map(|&i| viable[i].describe()).collect(),
    })
}

/// `Less` when `a` is the better candidate.
fn compare(a: &Candidate, b: &Candidate) -> Ordering {
    worst_rank(a)
        .cmp(&worst_rank(b))
        .then_with(|| dominance(&a.ranks, &b.ranks))
        .then_with(|| a.is_template().cmp(&b.is_template()))
        .then_with(|| is_variadic(a).cmp(&is_variadic(b)))
}

/// Worst rank of a candidate. Without arguments a greedy candidate still
/// ranks as a fallback.
fn worst_rank(candidate: &Candidate) -> ArgRank {
    let floor = if candidate.greedy { ArgRank::FALLBACK } else { ArgRank::EXACT };
    candidate.ranks.iter().copied().max().map_or(floor, |worst| worst.max(floor))
}

fn dominance(a: &[ArgRank], b: &[ArgRank]) -> Ordering {
    if a.len() != b.len() {
        return Ordering::Equal;
    }
    let mut better = false;
    let mut worse = false;
    for (x, y) in a.iter().zip(b) {
        match x.cmp(y) {
            Ordering::Less => better = true,
            Ordering::Greater => worse = true,
            Ordering::Equal => {}
        }
    }
    match (better, worse) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn is_variadic(candidate: &Candidate) -> bool {
    candidate.has_pack || candidate.c_variadic
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::ConversionRank;
    use crate::overload::CandidateSource;
    use std::sync::Arc;
    use templar_core::decl::{DeclKind, Declaration, FunctionDecl, FunctionRole};
    use templar_core::{KeyArg, TypeDescriptor};

    fn candidate(name: &str, ranks: &[ConversionRank]) -> Candidate {
        let decl = Declaration::new(name, DeclKind::Function(FunctionDecl::new(FunctionRole::Free, None, Vec::new())));
        Candidate {
            source: CandidateSource {
                decl: Arc::new(decl),
                owner: None,
                implicit_object: false,
            },
            template_args: None,
            params: Vec::new(),
            ret: None,
            required: 0,
            c_variadic: false,
            has_pack: false,
            greedy: false,
            ranks: ranks.iter().map(|r| ArgRank::new(*r)).collect(),
        }
    }

    fn templated(mut c: Candidate) -> Candidate {
        c.template_args = Some(vec![KeyArg::Type(TypeDescriptor::void())]);
        c
    }

    use ConversionRank::*;

    #[test]
    fn single_viable_returns_it() {
        assert_eq!(find_best_match(&[candidate("f", &[Standard])], "f").unwrap(), 0);
    }

    #[test]
    fn better_worst_rank_wins() {
        let viable = [candidate("a", &[Exact, Standard]), candidate("b", &[Promotion, Promotion])];
        assert_eq!(find_best_match(&viable, "f").unwrap(), 1);
    }

    #[test]
    fn template_loses_an_exact_tie() {
        let viable = [templated(candidate("a", &[Exact])), candidate("b", &[Exact])];
        assert_eq!(find_best_match(&viable, "f").unwrap(), 1);
    }

    #[test]
    fn packs_lose_to_fixed_parameters() {
        let mut pack = templated(candidate("a", &[Exact]));
        pack.has_pack = true;
        let fixed = templated(candidate("b", &[Exact]));
        assert_eq!(find_best_match(&[pack, fixed], "f").unwrap(), 1);
    }

    #[test]
    fn greedy_candidates_lose_without_arguments() {
        let mut greedy = candidate("a", &[]);
        greedy.greedy = true;
        let plain = templated(candidate("b", &[]));
        assert_eq!(find_best_match(&[greedy, plain], "f").unwrap(), 1);
    }

    #[test]
    fn crossing_ranks_are_ambiguous() {
        let viable = [candidate("a", &[Exact, Promotion]), candidate("b", &[Promotion, Exact])];
        let err = find_best_match(&viable, "f").unwrap_err();
        assert!(matches!(err, ResolutionError::AmbiguousOverload { candidates, .. } if candidates.len() == 2));
    }
}
