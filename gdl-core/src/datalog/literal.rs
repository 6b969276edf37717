//! Rule bodies as a tagged `Literal` variant, built from the raw term
//! trees the parser produces once a `(<= head body...)` form is accepted
//! into the database.

use std::rc::Rc;

use crate::error::SourceSpan;
use crate::term::{PredicateKey, Term};

/// One element of a rule body.
#[derive(Debug, Clone)]
pub enum Literal {
    /// `p(t1,...,tn)` — matches facts/derivations of predicate `(p,n)`.
    Positive(Term),
    /// `not p(t1,...,tn)` — succeeds iff the positive form has no match.
    Not(Term),
    /// `distinct(a,b)` — succeeds iff `a` and `b` are structurally unequal
    /// after substitution.
    Distinct(Term, Term),
    /// `or(L1,L2)` — succeeds iff either branch succeeds.
    Or(Box<Literal>, Box<Literal>),
}

impl Literal {
    /// Classify a raw body term into its literal variant.
    #[must_use]
    pub fn from_term(term: &Term) -> Literal {
        if term.is_variable() {
            return Literal::Positive(term.copy());
        }
        match (term.symbol().as_ref(), term.children()) {
            ("not", [inner]) => Literal::Not(inner.copy()),
            ("distinct", [a, b]) => Literal::Distinct(a.copy(), b.copy()),
            ("or", [a, b]) => Literal::Or(
                Box::new(Literal::from_term(a)),
                Box::new(Literal::from_term(b)),
            ),
            _ => Literal::Positive(term.copy()),
        }
    }

    /// Whether `not` or `distinct` appears anywhere in this literal's
    /// subtree (used to decide body-reordering: these literals are moved
    /// after every purely positive literal, per group preserving input
    /// order).
    #[must_use]
    pub fn needs_bound_variables(&self) -> bool {
        match self {
            Literal::Positive(_) => false,
            Literal::Not(_) | Literal::Distinct(_, _) => true,
            Literal::Or(a, b) => a.needs_bound_variables() || b.needs_bound_variables(),
        }
    }

    /// Predicate keys this literal references for the dependency index
    /// (`requirements`): descends through `not` and `or`, and into
    /// constant-headed children of `distinct`.
    pub fn requirement_keys(&self, out: &mut Vec<PredicateKey>) {
        match self {
            Literal::Positive(t) | Literal::Not(t) => out.push(t.predicate_key()),
            Literal::Or(a, b) => {
                a.requirement_keys(out);
                b.requirement_keys(out);
            }
            Literal::Distinct(a, b) => {
                if a.is_constant() {
                    out.push(a.predicate_key());
                }
                if b.is_constant() {
                    out.push(b.predicate_key());
                }
            }
        }
    }

    /// Edges for the negative-cycle walk: `(key, is_negative)` pairs.
    /// `distinct` contributes no edge here — it never references a
    /// predicate's rule/fact table, only compares two substituted terms.
    pub fn cycle_edges(&self, out: &mut Vec<(PredicateKey, bool)>) {
        match self {
            Literal::Positive(t) => out.push((t.predicate_key(), false)),
            Literal::Not(t) => out.push((t.predicate_key(), true)),
            Literal::Or(a, b) => {
                a.cycle_edges(out);
                b.cycle_edges(out);
            }
            Literal::Distinct(_, _) => {}
        }
    }

    /// Every variable occurring anywhere in this literal, deduplicated in
    /// first-occurrence order.
    pub fn collect_variables(&self, out: &mut Vec<Rc<str>>) {
        match self {
            Literal::Positive(t) | Literal::Not(t) => t.collect_variables(out),
            Literal::Distinct(a, b) => {
                a.collect_variables(out);
                b.collect_variables(out);
            }
            Literal::Or(a, b) => {
                a.collect_variables(out);
                b.collect_variables(out);
            }
        }
    }

    /// Occurrences of variables that must already be bound by a positive
    /// literal before this one is safe to evaluate: every occurrence under
    /// `not`/`distinct` (range-restriction). `or`
    /// inherits from both branches since either may execute.
    pub fn negative_variable_occurrences(&self, out: &mut Vec<(Rc<str>, SourceSpan)>) {
        match self {
            Literal::Positive(_) => {}
            Literal::Not(t) => t.collect_variable_occurrences(out),
            Literal::Distinct(a, b) => {
                a.collect_variable_occurrences(out);
                b.collect_variable_occurrences(out);
            }
            Literal::Or(a, b) => {
                a.negative_variable_occurrences(out);
                b.negative_variable_occurrences(out);
            }
        }
    }

    /// Variables bound positively by this literal: its own atom's
    /// variables, or — for `or` — the variables of either branch, since
    /// whichever one succeeds binds them the same way.
    pub fn positive_variables(&self, out: &mut Vec<Rc<str>>) {
        match self {
            Literal::Positive(t) => t.collect_variables(out),
            Literal::Or(a, b) => {
                a.positive_variables(out);
                b.positive_variables(out);
            }
            Literal::Not(_) | Literal::Distinct(_, _) => {}
        }
    }
}

/// A stored rule: a head atom and its (already reordered) body.
#[derive(Debug, Clone)]
pub struct Rule {
    /// The head atom, e.g. `(path ?x ?y)`.
    pub head: Term,
    /// Body literals, positive literals first (see
    /// [`Literal::needs_bound_variables`]).
    pub body: Vec<Literal>,
}

impl Rule {
    /// Build a rule from a raw head term and raw body terms, reordering
    /// the body so literals needing bound variables come last while
    /// preserving relative order within each group.
    #[must_use]
    pub fn new(head: Term, raw_body: &[Term]) -> Rule {
        let mut literals: Vec<Literal> = raw_body.iter().map(Literal::from_term).collect();
        literals.sort_by_key(Literal::needs_bound_variables);
        Rule { head, body: literals }
    }

    /// This rule's head predicate key.
    #[must_use]
    pub fn key(&self) -> PredicateKey {
        self.head.predicate_key()
    }
}
