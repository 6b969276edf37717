//! The stratified semi-naive fixpoint.
//!
//! `local` is a single map shared across one entire top-level derivation
//! call tree, not scoped per predicate: when evaluating predicate `p`'s
//! rules touches a mutually-recursive partner `q`, `q`'s derived facts
//! accumulate in the very same map `p` is writing into, and the caller
//! commits every key touched — not only `p` — into the database's
//! `derived` cache once the whole derivation settles.

use std::collections::HashMap;
use std::rc::Rc;

use super::literal::{Literal, Rule};
use super::unify::{self, Matched};
use crate::config::EvaluationLimits;
use crate::error::{GdlError, Result};
use crate::term::{PredicateKey, Substitution, Term};

/// Ground argument lists for every stored predicate, keyed by
/// `(symbol, arity)`. Used for `facts`, `derived`, and the `local` map
/// that accumulates during one derivation.
pub type FactTable = HashMap<PredicateKey, Vec<Vec<Term>>>;

/// The read-only context a derivation runs against: the database's
/// current facts, rules, and already-committed derivations. `derived` is
/// a snapshot — this pass never mutates the caller's cache directly, it
/// only ever writes into its own `local` map, which the caller merges in
/// afterward.
pub struct EvalContext<'a> {
    /// Stored ground facts.
    pub facts: &'a FactTable,
    /// Stored rules, keyed by head predicate.
    pub rules: &'a HashMap<PredicateKey, Vec<Rule>>,
    /// Already-committed derived facts from prior queries.
    pub derived: &'a FactTable,
    /// Iteration cap for the fixpoint loop.
    pub limits: &'a EvaluationLimits,
}

/// Run the fixpoint for `key` from scratch and return the `local` map it
/// produced. The caller is responsible for merging every key in the
/// result into the database's `derived` cache.
pub fn derive(ctx: &EvalContext, key: &PredicateKey) -> Result<FactTable> {
    let mut local = FactTable::new();
    let stack: Vec<PredicateKey> = Vec::new();
    process_rule(ctx, key, &mut local, &stack)?;
    Ok(local)
}

/// Evaluate every rule for `key` to a fixpoint, writing new facts into
/// `local[key]`. `stack` holds the predicates currently being expanded
/// higher up the call tree (used to avoid re-entering a predicate that is
/// already being derived).
fn process_rule(
    ctx: &EvalContext,
    key: &PredicateKey,
    local: &mut FactTable,
    stack: &[PredicateKey],
) -> Result<()> {
    let Some(rules) = ctx.rules.get(key) else {
        return Ok(());
    };
    if rules.is_empty() {
        return Ok(());
    }

    let mut inner_stack = stack.to_vec();
    inner_stack.push(key.clone());

    let mut iterations = 0usize;
    loop {
        let before: usize = local.values().map(Vec::len).sum();
        for rule in rules {
            let bindings_list = evaluate_body(ctx, &rule.body, local, &inner_stack)?;
            let head_args = rule.head.children();
            let entry = local.entry(key.clone()).or_default();
            for bindings in &bindings_list {
                let instantiated: Vec<Term> =
                    head_args.iter().map(|a| a.substitute(bindings)).collect();
                if !entry.iter().any(|existing| same_args(existing, &instantiated)) {
                    entry.push(instantiated);
                }
            }
        }
        let after: usize = local.values().map(Vec::len).sum();
        iterations += 1;
        if after == before {
            break;
        }
        if iterations > ctx.limits.max_iterations {
            return Err(GdlError::EvaluationDidNotConverge {
                symbol: key.0.to_string(),
                arity: key.1,
                limit: ctx.limits.max_iterations,
            });
        }
    }
    Ok(())
}

fn same_args(a: &[Term], b: &[Term]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equal(y))
}

/// Evaluate a rule body against the starting candidate `[{}]`, narrowing
/// and fanning the candidate list literal by literal, left to right
/// (bodies are pre-reordered so `not`/`distinct` only ever see variables
/// already bound by a preceding positive literal).
fn evaluate_body(
    ctx: &EvalContext,
    body: &[Literal],
    local: &mut FactTable,
    stack: &[PredicateKey],
) -> Result<Vec<Substitution>> {
    let mut candidates = vec![Substitution::new()];
    for literal in body {
        if candidates.is_empty() {
            break;
        }
        candidates = evaluate_literal(ctx, literal, candidates, local, stack)?;
    }
    Ok(candidates)
}

fn evaluate_literal(
    ctx: &EvalContext,
    literal: &Literal,
    candidates: Vec<Substitution>,
    local: &mut FactTable,
    stack: &[PredicateKey],
) -> Result<Vec<Substitution>> {
    match literal {
        Literal::Positive(atom) => {
            let key = atom.predicate_key();
            ensure_available(ctx, &key, local, stack)?;
            let table = combined_table(ctx, &key, local);
            let mut next = Vec::new();
            for candidate in candidates {
                match unify::unify_all(atom.children(), &table, &candidate) {
                    Matched::Total => next.push(candidate),
                    Matched::Bindings(list) => next.extend(list),
                }
            }
            Ok(next)
        }
        Literal::Not(atom) => {
            let key = atom.predicate_key();
            ensure_available(ctx, &key, local, stack)?;
            let table = combined_table(ctx, &key, local);
            Ok(candidates
                .into_iter()
                .filter(|candidate| unify::none_match(atom.children(), &table, candidate))
                .collect())
        }
        Literal::Distinct(a, b) => Ok(candidates
            .into_iter()
            .filter(|candidate| !a.substitute(candidate).equal(&b.substitute(candidate)))
            .collect()),
        Literal::Or(left, right) => {
            let left_results = evaluate_literal(ctx, left, candidates.clone(), local, stack)?;
            let right_results = evaluate_literal(ctx, right, candidates, local, stack)?;
            let mut shared_vars = Vec::new();
            left.collect_variables(&mut shared_vars);
            right.collect_variables(&mut shared_vars);

            let mut merged = left_results;
            for candidate in right_results {
                let duplicate = merged
                    .iter()
                    .any(|existing| agree_on(existing, &candidate, &shared_vars));
                if !duplicate {
                    merged.push(candidate);
                }
            }
            Ok(merged)
        }
    }
}

fn agree_on(a: &Substitution, b: &Substitution, vars: &[Rc<str>]) -> bool {
    vars.iter().all(|v| match (a.get(v), b.get(v)) {
        (Some(x), Some(y)) => x.equal(y),
        (None, None) => true,
        _ => false,
    })
}

/// If `key` has rules, has no committed derivation yet, and is not
/// already being expanded higher up the call tree, run its fixpoint into
/// `local` before reading from it.
fn ensure_available(
    ctx: &EvalContext,
    key: &PredicateKey,
    local: &mut FactTable,
    stack: &[PredicateKey],
) -> Result<()> {
    let has_rules = ctx.rules.get(key).is_some_and(|r| !r.is_empty());
    if has_rules && !ctx.derived.contains_key(key) && !stack.contains(key) {
        process_rule(ctx, key, local, stack)?;
    }
    Ok(())
}

fn combined_table(ctx: &EvalContext, key: &PredicateKey, local: &FactTable) -> Vec<Vec<Term>> {
    let mut table = Vec::new();
    if let Some(facts) = ctx.facts.get(key) {
        table.extend(facts.iter().cloned());
    }
    if let Some(derived) = ctx.derived.get(key) {
        table.extend(derived.iter().cloned());
    }
    if let Some(local_rows) = local.get(key) {
        table.extend(local_rows.iter().cloned());
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceSpan;
    use crate::term::Term;

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

    fn key(symbol: &str, arity: usize) -> PredicateKey {
        (Rc::from(symbol), arity)
    }

    #[test]
    fn derives_transitive_closure() {
        // link(3,4) link(2,3) link(1,2)
        // path(x,y) <= path(x,z), link(z,y)
        // path(x,y) <= link(x,y)
        let mut facts = FactTable::new();
        facts.insert(
            key("link", 2),
            vec![
                vec![c("3"), c("4")],
                vec![c("2"), c("3")],
                vec![c("1"), c("2")],
            ],
        );
        let mut rules = HashMap::new();
        rules.insert(
            key("path", 2),
            vec![
                Rule::new(
                    atom("path", vec![var("x"), var("y")]),
                    &[
                        atom("path", vec![var("x"), var("z")]),
                        atom("link", vec![var("z"), var("y")]),
                    ],
                ),
                Rule::new(
                    atom("path", vec![var("x"), var("y")]),
                    &[atom("link", vec![var("x"), var("y")])],
                ),
            ],
        );
        let derived = FactTable::new();
        let limits = EvaluationLimits::default();
        let ctx = EvalContext {
            facts: &facts,
            rules: &rules,
            derived: &derived,
            limits: &limits,
        };
        let local = derive(&ctx, &key("path", 2)).unwrap();
        let paths = &local[&key("path", 2)];
        assert!(paths.iter().any(|row| same_args(row, &[c("1"), c("4")])));
        assert_eq!(paths.len(), 6); // 3+2+1 pairs
    }

    #[test]
    fn mutual_recursion_terminates_and_merges_both_keys() {
        // s(1) s(2) t(1)
        // p(x) <= q(x), s(x)
        // q(x) <= p(x), t(x)
        // q(x) <= t(x)
        let mut facts = FactTable::new();
        facts.insert(key("s", 1), vec![vec![c("1")], vec![c("2")]]);
        facts.insert(key("t", 1), vec![vec![c("1")]]);
        let mut rules = HashMap::new();
        rules.insert(
            key("p", 1),
            vec![Rule::new(
                atom("p", vec![var("x")]),
                &[atom("q", vec![var("x")]), atom("s", vec![var("x")])],
            )],
        );
        rules.insert(
            key("q", 1),
            vec![
                Rule::new(
                    atom("q", vec![var("x")]),
                    &[atom("p", vec![var("x")]), atom("t", vec![var("x")])],
                ),
                Rule::new(atom("q", vec![var("x")]), &[atom("t", vec![var("x")])]),
            ],
        );
        let derived = FactTable::new();
        let limits = EvaluationLimits::default();
        let ctx = EvalContext {
            facts: &facts,
            rules: &rules,
            derived: &derived,
            limits: &limits,
        };
        let local = derive(&ctx, &key("p", 1)).unwrap();
        let ps = &local[&key("p", 1)];
        assert_eq!(ps.len(), 1);
        assert!(same_args(&ps[0], &[c("1")]));
        assert!(local.contains_key(&key("q", 1)));
    }

    #[test]
    fn self_referential_rule_with_no_base_case_derives_nothing() {
        let facts = FactTable::new();
        let mut rules = HashMap::new();
        rules.insert(
            key("p", 1),
            vec![Rule::new(
                atom("p", vec![var("x")]),
                &[atom("p", vec![var("x")])],
            )],
        );
        let derived = FactTable::new();
        let limits = EvaluationLimits::default();
        let ctx = EvalContext {
            facts: &facts,
            rules: &rules,
            derived: &derived,
            limits: &limits,
        };
        let local = derive(&ctx, &key("p", 1)).unwrap();
        assert!(local.get(&key("p", 1)).map_or(true, Vec::is_empty));
    }
}
