//! Unification-based pattern matching between query argument lists and a
//! table of ground fact/derivation argument lists.

use crate::term::{Substitution, Term};

/// The result of matching a query's argument list against a fact table.
#[derive(Debug, Clone)]
pub enum Matched {
    /// The query contained no variables (under the incoming substitution)
    /// and at least one fact matched; callers can short-circuit on this
    /// without enumerating further matches.
    Total,
    /// One extended substitution per matching fact. Empty means no match.
    Bindings(Vec<Substitution>),
}

/// Unify `query` against `fact`, extending `bindings`. Returns `None` if
/// the pair cannot unify.
#[must_use]
pub fn unify_term(query: &Term, fact: &Term, bindings: &Substitution) -> Option<Substitution> {
    match query {
        Term::Variable { symbol, .. } => match bindings.get(symbol) {
            Some(bound) => {
                if bound.equal(fact) {
                    Some(bindings.clone())
                } else {
                    None
                }
            }
            None => Some(bindings.extended(symbol.clone(), fact.copy())),
        },
        Term::Compound {
            symbol: qs,
            children: qc,
            ..
        } => match fact {
            Term::Compound {
                symbol: fs,
                children: fc,
                ..
            } if qs == fs && qc.len() == fc.len() => {
                let mut current = bindings.clone();
                for (q, f) in qc.iter().zip(fc) {
                    current = unify_term(q, f, &current)?;
                }
                Some(current)
            }
            _ => None,
        },
    }
}

/// Unify a whole argument list pairwise, threading bindings left to right.
#[must_use]
pub fn unify_args(query: &[Term], fact: &[Term], bindings: &Substitution) -> Option<Substitution> {
    if query.len() != fact.len() {
        return None;
    }
    let mut current = bindings.clone();
    for (q, f) in query.iter().zip(fact) {
        current = unify_term(q, f, &current)?;
    }
    Some(current)
}

/// Match `args` against every row of `table` under the incoming
/// `bindings`. If `args`, once `bindings` is applied, is already fully
/// ground, this degenerates to a boolean existence check (returning
/// `Total` on the first hit rather than one entry per matching row);
/// otherwise every matching row contributes one extended substitution.
#[must_use]
pub fn unify_all(args: &[Term], table: &[Vec<Term>], bindings: &Substitution) -> Matched {
    let already_ground = args.iter().all(|a| a.substitute(bindings).is_ground());
    if already_ground {
        for row in table {
            if unify_args(args, row, bindings).is_some() {
                return Matched::Total;
            }
        }
        Matched::Bindings(Vec::new())
    } else {
        let mut out = Vec::new();
        for row in table {
            if let Some(extended) = unify_args(args, row, bindings) {
                out.push(extended);
            }
        }
        Matched::Bindings(out)
    }
}

/// Whether no row of `table` unifies with `args` under `bindings`; used
/// for evaluating a negated atom, where range-restriction guarantees
/// `args` is already fully ground under `bindings`.
#[must_use]
pub fn none_match(args: &[Term], table: &[Vec<Term>], bindings: &Substitution) -> bool {
    !table
        .iter()
        .any(|row| unify_args(args, row, bindings).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceSpan;

    fn here() -> SourceSpan {
        SourceSpan::new("", 1, 1)
    }

    fn atom(symbol: &str, children: Vec<Term>) -> Term {
        Term::compound(symbol, children, here())
    }

    fn var(symbol: &str) -> Term {
        Term::variable(symbol, here())
    }

    fn c(symbol: &str) -> Term {
        atom(symbol, vec![])
    }

    #[test]
    fn unify_term_binds_unbound_variable() {
        let bindings = Substitution::new();
        let result = unify_term(&var("x"), &c("a"), &bindings).unwrap();
        assert!(result.get("x").unwrap().equal(&c("a")));
    }

    #[test]
    fn unify_term_rejects_conflicting_binding() {
        let mut bindings = Substitution::new();
        bindings.bind("x".into(), c("a"));
        assert!(unify_term(&var("x"), &c("b"), &bindings).is_none());
    }

    #[test]
    fn unify_term_recurses_into_compound_children() {
        let q = atom("foo", vec![var("x"), c("b")]);
        let f = atom("foo", vec![c("a"), c("b")]);
        let result = unify_term(&q, &f, &Substitution::new()).unwrap();
        assert!(result.get("x").unwrap().equal(&c("a")));
    }

    #[test]
    fn unify_all_returns_total_for_ground_query_with_a_match() {
        let table = vec![vec![c("a")], vec![c("b")]];
        let result = unify_all(&[c("a")], &table, &Substitution::new());
        assert!(matches!(result, Matched::Total));
    }

    #[test]
    fn unify_all_fans_out_bindings_for_variable_query() {
        let table = vec![vec![c("a")], vec![c("b")]];
        let result = unify_all(&[var("x")], &table, &Substitution::new());
        match result {
            Matched::Bindings(list) => assert_eq!(list.len(), 2),
            Matched::Total => panic!("expected fanned bindings"),
        }
    }

    #[test]
    fn none_match_detects_absence() {
        let table = vec![vec![c("a")]];
        assert!(!none_match(&[c("a")], &table, &Substitution::new()));
        assert!(none_match(&[c("z")], &table, &Substitution::new()));
    }
}
