//! The GDL term tree: variables and compound (functor) terms, structural
//! equality, deep copy, substitution, and canonical rendering.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::SourceSpan;
use crate::reserved;

/// A predicate signature: symbol plus arity.
pub type PredicateKey = (Rc<str>, usize);

/// A GDL term: a variable or a compound (a symbol applied to zero or more
/// child terms). A compound with zero children is an atom; the GDL surface
/// syntax does not distinguish atoms from other constants beyond arity.
#[derive(Debug, Clone)]
pub enum Term {
    /// A logic variable, written `?name` in the surface syntax.
    Variable {
        /// Variable name, without the leading `?`.
        symbol: Rc<str>,
        /// Where this occurrence came from, for diagnostics.
        loc: SourceSpan,
    },
    /// A functor applied to zero or more children.
    Compound {
        /// Functor symbol.
        symbol: Rc<str>,
        /// Child terms, left to right.
        children: Vec<Term>,
        /// Where this occurrence came from, for diagnostics.
        loc: SourceSpan,
    },
}

impl Term {
    /// Build a variable term.
    pub fn variable(symbol: impl Into<Rc<str>>, loc: SourceSpan) -> Term {
        Term::Variable {
            symbol: symbol.into(),
            loc,
        }
    }

    /// Build a compound term (an atom, when `children` is empty).
    pub fn compound(symbol: impl Into<Rc<str>>, children: Vec<Term>, loc: SourceSpan) -> Term {
        Term::Compound {
            symbol: symbol.into(),
            children,
            loc,
        }
    }

    /// The head symbol, ignoring the leading `?` on variables.
    #[must_use]
    pub fn symbol(&self) -> &Rc<str> {
        match self {
            Term::Variable { symbol, .. } | Term::Compound { symbol, .. } => symbol,
        }
    }

    /// Child terms; always empty for a variable.
    #[must_use]
    pub fn children(&self) -> &[Term] {
        match self {
            Term::Variable { .. } => &[],
            Term::Compound { children, .. } => children,
        }
    }

    /// Source location of this occurrence.
    #[must_use]
    pub fn loc(&self) -> &SourceSpan {
        match self {
            Term::Variable { loc, .. } | Term::Compound { loc, .. } => loc,
        }
    }

    /// Number of children. Zero for a variable or an atom.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.children().len()
    }

    /// The `(symbol, arity)` pair identifying this term's predicate.
    #[must_use]
    pub fn predicate_key(&self) -> PredicateKey {
        (Rc::clone(self.symbol()), self.arity())
    }

    /// Symbol begins with `?`.
    #[must_use]
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable { .. })
    }

    /// Not a variable. Arity-0 constants are atoms, arity>0 are functors.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        !self.is_variable()
    }

    /// Whether the head symbol is one of the reserved words (`not`,
    /// `distinct`, `or`, `<=`, or a GDL game predicate).
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.is_constant() && reserved::is_reserved(self.symbol())
    }

    /// Deep clone, preserving source locations.
    #[must_use]
    pub fn copy(&self) -> Term {
        self.clone()
    }

    /// Structural equality: head symbol and recursive equality of children.
    /// Source locations are ignored.
    #[must_use]
    pub fn equal(&self, other: &Term) -> bool {
        match (self, other) {
            (Term::Variable { symbol: a, .. }, Term::Variable { symbol: b, .. }) => a == b,
            (
                Term::Compound {
                    symbol: a,
                    children: ac,
                    ..
                },
                Term::Compound {
                    symbol: b,
                    children: bc,
                    ..
                },
            ) => a == b && ac.len() == bc.len() && ac.iter().zip(bc).all(|(x, y)| x.equal(y)),
            _ => false,
        }
    }

    /// Replace every variable bound in `sub` with a deep copy of its
    /// binding; recurse into compound children. Unbound variables and
    /// constants pass through unchanged (but still copied).
    #[must_use]
    pub fn substitute(&self, sub: &Substitution) -> Term {
        match self {
            Term::Variable { symbol, loc } => match sub.get(symbol) {
                Some(bound) => bound.copy(),
                None => Term::Variable {
                    symbol: Rc::clone(symbol),
                    loc: loc.clone(),
                },
            },
            Term::Compound {
                symbol,
                children,
                loc,
            } => Term::Compound {
                symbol: Rc::clone(symbol),
                children: children.iter().map(|c| c.substitute(sub)).collect(),
                loc: loc.clone(),
            },
        }
    }

    /// Whether this term, after substitution would be irrelevant, contains
    /// no variables anywhere in its subtree.
    #[must_use]
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Variable { .. } => false,
            Term::Compound { children, .. } => children.iter().all(Term::is_ground),
        }
    }

    /// Collect the names of every variable occurring anywhere in this term,
    /// in first-occurrence order, without duplicates.
    pub fn collect_variables(&self, out: &mut Vec<Rc<str>>) {
        match self {
            Term::Variable { symbol, .. } => {
                if !out.iter().any(|v| v == symbol) {
                    out.push(Rc::clone(symbol));
                }
            }
            Term::Compound { children, .. } => {
                for c in children {
                    c.collect_variables(out);
                }
            }
        }
    }

    /// Like [`Term::collect_variables`], but keeps every occurrence (no
    /// dedup) paired with its source location, for pointing a diagnostic
    /// at the specific offending occurrence rather than the rule as a
    /// whole.
    pub fn collect_variable_occurrences(&self, out: &mut Vec<(Rc<str>, SourceSpan)>) {
        match self {
            Term::Variable { symbol, loc } => out.push((Rc::clone(symbol), loc.clone())),
            Term::Compound { children, .. } => {
                for c in children {
                    c.collect_variable_occurrences(out);
                }
            }
        }
    }

    /// Canonical S-expression rendering: parentheses iff arity>0, children
    /// space-separated, variables re-prefixed with `?`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buf = String::new();
        self.render_into(&mut buf);
        buf
    }

    fn render_into(&self, buf: &mut String) {
        match self {
            Term::Variable { symbol, .. } => {
                buf.push('?');
                buf.push_str(symbol);
            }
            Term::Compound {
                symbol, children, ..
            } => {
                if children.is_empty() {
                    buf.push_str(symbol);
                } else {
                    buf.push('(');
                    buf.push_str(symbol);
                    for c in children {
                        buf.push(' ');
                        c.render_into(buf);
                    }
                    buf.push(')');
                }
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// A mapping from variable name to a ground (or partially ground) term,
/// built up incrementally while unifying a query against a fact or rule
/// body. Bindings are cloned on branch so that fanning a candidate list
/// out never aliases sibling candidates.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    bindings: HashMap<Rc<str>, Term>,
}

impl Substitution {
    /// An empty substitution.
    #[must_use]
    pub fn new() -> Self {
        Substitution::default()
    }

    /// The term bound to `variable`, if any.
    #[must_use]
    pub fn get(&self, variable: &str) -> Option<&Term> {
        self.bindings.get(variable)
    }

    /// Whether `variable` is already bound.
    #[must_use]
    pub fn is_bound(&self, variable: &str) -> bool {
        self.bindings.contains_key(variable)
    }

    /// Extend this substitution with a new binding, overwriting any prior
    /// binding for the same variable.
    pub fn bind(&mut self, variable: Rc<str>, value: Term) {
        self.bindings.insert(variable, value);
    }

    /// A copy of this substitution with one additional binding; used when
    /// fanning a candidate binding out into several extensions.
    #[must_use]
    pub fn extended(&self, variable: Rc<str>, value: Term) -> Substitution {
        let mut next = self.clone();
        next.bind(variable, value);
        next
    }

    /// Overlay `other`'s bindings on top of `self`'s, returning the merged
    /// result. Used when a recursive `compare` call extends the bindings a
    /// caller passed in.
    #[must_use]
    pub fn merged_with(&self, other: &Substitution) -> Substitution {
        let mut merged = self.clone();
        for (k, v) in &other.bindings {
            merged.bindings.insert(Rc::clone(k), v.copy());
        }
        merged
    }

    /// Iterate over `(variable, term)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &Term)> {
        self.bindings.iter()
    }

    /// Number of bound variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no variables are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
