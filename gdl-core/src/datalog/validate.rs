//! Fact/rule validation: rejecting facts with variables or reserved
//! words, enforcing range-restriction, and detecting cycles in the rule
//! graph that pass through a negated edge.

use std::collections::HashMap;

use super::literal::{Literal, Rule};
use crate::error::{GdlError, Result};
use crate::reserved;
use crate::term::{PredicateKey, Term};

/// Reject a fact argument list containing a variable or a reserved-word
/// literal at any depth.
pub fn validate_fact_args(args: &[Term]) -> Result<()> {
    for arg in args {
        validate_fact_term(arg)?;
    }
    Ok(())
}

fn validate_fact_term(term: &Term) -> Result<()> {
    if term.is_variable() {
        return Err(GdlError::FactContainsVariable(term.loc().clone()));
    }
    if reserved::is_reserved(term.symbol()) {
        return Err(GdlError::FactReservedWord {
            symbol: term.symbol().to_string(),
            span: term.loc().clone(),
        });
    }
    for child in term.children() {
        validate_fact_term(child)?;
    }
    Ok(())
}

/// Reject a rule head containing `not`, `distinct`, `or`, or `<=` at any
/// depth. Game predicates (`legal`, `next`, `goal`, ...) are ordinary,
/// allowed rule heads.
pub fn validate_rule_head(head: &Term) -> Result<()> {
    let symbol = head.symbol().as_ref();
    if matches!(symbol, "not" | "distinct" | "or" | reserved::RULE_ARROW) {
        return Err(GdlError::RuleHeadReservedWord {
            symbol: symbol.to_string(),
            span: head.loc().clone(),
        });
    }
    for child in head.children() {
        validate_rule_head(child)?;
    }
    Ok(())
}

/// Every variable in the head, or under any `not`/`distinct` in the body,
/// must also appear in some positive body literal.
pub fn check_range_restriction(head: &Term, body: &[Literal]) -> Result<()> {
    let mut positive = Vec::new();
    for literal in body {
        literal.positive_variables(&mut positive);
    }

    let mut head_occurrences = Vec::new();
    head.collect_variable_occurrences(&mut head_occurrences);
    for (name, span) in &head_occurrences {
        if !positive.contains(name) {
            return Err(GdlError::NegativeVariable {
                variable: name.to_string(),
                span: span.clone(),
            });
        }
    }

    for literal in body {
        let mut occurrences = Vec::new();
        literal.negative_variable_occurrences(&mut occurrences);
        for (name, span) in occurrences {
            if !positive.contains(&name) {
                return Err(GdlError::NegativeVariable {
                    variable: name.to_string(),
                    span,
                });
            }
        }
    }
    Ok(())
}

/// Whether accepting a rule with this head and body would close a cycle
/// in the rule-dependency graph that passes through at least one negated
/// edge. `existing_rules` is the database's current rule table (the
/// candidate rule is not in it yet).
pub fn would_create_negative_cycle(
    head_key: &PredicateKey,
    body: &[Literal],
    existing_rules: &HashMap<PredicateKey, Vec<Rule>>,
) -> bool {
    let mut candidate_edges = Vec::new();
    for literal in body {
        literal.cycle_edges(&mut candidate_edges);
    }

    let mut visiting = vec![head_key.clone()];
    dfs_has_negative_cycle(head_key, &candidate_edges, existing_rules, &mut visiting, false)
}

fn dfs_has_negative_cycle(
    origin: &PredicateKey,
    from_origin_edges: &[(PredicateKey, bool)],
    existing_rules: &HashMap<PredicateKey, Vec<Rule>>,
    path: &mut Vec<PredicateKey>,
    crossed_negative: bool,
) -> bool {
    for (target, is_negative) in from_origin_edges {
        let crossed = crossed_negative || *is_negative;
        if target == origin {
            if crossed {
                return true;
            }
            continue;
        }
        if path.contains(target) {
            // Revisiting a non-origin node already on the path can't close
            // a cycle back to `origin` through this branch.
            continue;
        }
        path.push(target.clone());
        let next_edges = outgoing_edges(target, existing_rules);
        if dfs_has_negative_cycle(origin, &next_edges, existing_rules, path, crossed) {
            return true;
        }
        path.pop();
    }
    false
}

fn outgoing_edges(
    key: &PredicateKey,
    existing_rules: &HashMap<PredicateKey, Vec<Rule>>,
) -> Vec<(PredicateKey, bool)> {
    let mut edges = Vec::new();
    if let Some(rules) = existing_rules.get(key) {
        for rule in rules {
            for literal in &rule.body {
                literal.cycle_edges(&mut edges);
            }
        }
    }
    edges
}
