//! The fact/rule store: insertion, dependency-aware cache invalidation,
//! query evaluation, and copy-on-write forking for independent successor
//! states.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::config::EvaluationLimits;
use crate::datalog::eval::{self, EvalContext, FactTable};
use crate::datalog::literal::Rule;
use crate::datalog::unify::{self, Matched};
use crate::datalog::validate;
use crate::error::{GdlError, Result};
use crate::term::{PredicateKey, Substitution, Term};

/// The outcome of [`Database::query`].
#[derive(Debug, Clone)]
pub enum QueryResult {
    /// The query had no variables, or matched/failed outright.
    Boolean(bool),
    /// One binding per match, for the variables occurring in the query.
    Bindings(Vec<Substitution>),
}

impl QueryResult {
    /// Treat the result as a boolean: `true` for any non-empty match.
    #[must_use]
    pub fn is_true(&self) -> bool {
        match self {
            QueryResult::Boolean(b) => *b,
            QueryResult::Bindings(list) => !list.is_empty(),
        }
    }

    /// The binding list, empty if this was a plain boolean result.
    #[must_use]
    pub fn bindings(&self) -> &[Substitution] {
        match self {
            QueryResult::Boolean(_) => &[],
            QueryResult::Bindings(list) => list,
        }
    }
}

/// An in-memory Datalog-with-negation store. Facts and rules are
/// insert-only from callers; derived facts are cached lazily and
/// invalidated transitively on any mutation to a predicate they depend
/// on. A [`Database`] is a single-owner value — `fork` produces an
/// independent copy-on-write snapshot for evolving one branch (a
/// successor game state) without disturbing the original.
#[derive(Debug, Clone)]
pub struct Database {
    facts: HashMap<PredicateKey, Rc<Vec<Vec<Term>>>>,
    rules: HashMap<PredicateKey, Rc<Vec<Rule>>>,
    derived: FactTable,
    /// `requirements[q]` = the set of predicate keys with a rule whose
    /// body references `q` — i.e. the predicates to invalidate when `q`
    /// changes.
    requirements: HashMap<PredicateKey, HashSet<PredicateKey>>,
    limits: EvaluationLimits,
}

impl Default for Database {
    fn default() -> Self {
        Database {
            facts: HashMap::new(),
            rules: HashMap::new(),
            derived: FactTable::new(),
            requirements: HashMap::new(),
            limits: EvaluationLimits::default(),
        }
    }
}

impl Database {
    /// An empty database with the default evaluation limits.
    #[must_use]
    pub fn new() -> Self {
        Database::default()
    }

    /// An empty database with custom evaluation limits.
    #[must_use]
    pub fn with_limits(limits: EvaluationLimits) -> Self {
        Database {
            limits,
            ..Database::default()
        }
    }

    /// Ground facts stored for `key`, if any.
    #[must_use]
    pub fn facts_for(&self, key: &PredicateKey) -> &[Vec<Term>] {
        self.facts.get(key).map_or(&[], |rows| rows.as_slice())
    }

    /// Whether `key` names a stored fact predicate, rule predicate, or
    /// both.
    #[must_use]
    pub fn has_predicate(&self, key: &PredicateKey) -> bool {
        self.facts.contains_key(key) || self.rules.contains_key(key)
    }

    /// Append `args` as a new fact under `(symbol, args.len())`,
    /// rejecting variables or reserved words anywhere in `args`.
    pub fn define_fact(&mut self, symbol: impl Into<Rc<str>>, args: Vec<Term>) -> Result<()> {
        validate::validate_fact_args(&args)?;
        let key: PredicateKey = (symbol.into(), args.len());
        trace!(predicate = %key.0, arity = key.1, "define_fact");
        let entry = self.facts.entry(key.clone()).or_insert_with(|| Rc::new(Vec::new()));
        Rc::make_mut(entry).push(args);
        self.invalidate(&key);
        Ok(())
    }

    /// Remove every fact stored for `key` (used by `next()` to drop the
    /// previous turn's `true/1` and `does/2` tables before installing the
    /// successor state).
    pub fn remove_facts(&mut self, key: &PredicateKey) {
        self.facts.remove(key);
        self.invalidate(key);
    }

    /// Accept a rule `head :- body`, validating it and updating the
    /// dependency index.
    pub fn define_rule(&mut self, head: Term, raw_body: Vec<Term>) -> Result<()> {
        validate::validate_rule_head(&head)?;
        let rule = Rule::new(head, &raw_body);
        validate::check_range_restriction(&rule.head, &rule.body)?;
        let key = rule.key();

        if validate::would_create_negative_cycle(&key, &rule.body, &self.plain_rules()) {
            return Err(GdlError::NegativeCycle(rule.head.loc().clone()));
        }

        debug!(predicate = %key.0, arity = key.1, "define_rule");
        let mut referenced = Vec::new();
        for literal in &rule.body {
            literal.requirement_keys(&mut referenced);
        }
        for dependency in referenced {
            self.requirements.entry(dependency).or_default().insert(key.clone());
        }

        let entry = self.rules.entry(key.clone()).or_insert_with(|| Rc::new(Vec::new()));
        Rc::make_mut(entry).push(rule);
        self.invalidate(&key);
        Ok(())
    }

    /// Answer a single query term. `key` must name a stored fact or rule
    /// predicate.
    pub fn query(&mut self, term: &Term) -> Result<QueryResult> {
        let key = term.predicate_key();
        if !self.has_predicate(&key) {
            return Err(GdlError::UnknownPredicate {
                symbol: key.0.to_string(),
                arity: key.1,
                span: term.loc().clone(),
            });
        }

        let fact_table = self.facts_for(&key).to_vec();
        let fact_match = unify::unify_all(term.children(), &fact_table, &Substitution::new());
        if matches!(fact_match, Matched::Total) {
            return Ok(QueryResult::Boolean(true));
        }
        let mut fact_bindings = match fact_match {
            Matched::Bindings(list) => list,
            Matched::Total => unreachable!(),
        };

        if self.rules.contains_key(&key) && !self.derived.contains_key(&key) {
            let local = self.derive(&key)?;
            for (derived_key, rows) in local {
                self.derived.insert(derived_key, rows);
            }
        }

        let derived_table = self.derived.get(&key).cloned().unwrap_or_default();
        let rule_match = unify::unify_all(term.children(), &derived_table, &Substitution::new());
        if matches!(rule_match, Matched::Total) {
            return Ok(QueryResult::Boolean(true));
        }
        let mut rule_bindings = match rule_match {
            Matched::Bindings(list) => list,
            Matched::Total => unreachable!(),
        };

        if fact_bindings.is_empty() && rule_bindings.is_empty() {
            return Ok(QueryResult::Boolean(false));
        }
        fact_bindings.append(&mut rule_bindings);
        Ok(QueryResult::Bindings(fact_bindings))
    }

    fn derive(&self, key: &PredicateKey) -> Result<FactTable> {
        let facts = self.plain_facts();
        let rules = self.plain_rules();
        let ctx = EvalContext {
            facts: &facts,
            rules: &rules,
            derived: &self.derived,
            limits: &self.limits,
        };
        eval::derive(&ctx, key)
    }

    fn plain_facts(&self) -> FactTable {
        self.facts
            .iter()
            .map(|(k, v)| (k.clone(), v.as_ref().clone()))
            .collect()
    }

    fn plain_rules(&self) -> HashMap<PredicateKey, Vec<Rule>> {
        self.rules
            .iter()
            .map(|(k, v)| (k.clone(), v.as_ref().clone()))
            .collect()
    }

    /// Drop the derived-fact cache for `key` and every predicate that
    /// transitively requires it.
    fn invalidate(&mut self, key: &PredicateKey) {
        let affected = self.collect_requirements(key);
        if self.derived.remove(key).is_some() {
            trace!(predicate = %key.0, arity = key.1, "invalidate derived");
        }
        for dependent in affected {
            self.derived.remove(&dependent);
        }
    }

    fn collect_requirements(&self, key: &PredicateKey) -> HashSet<PredicateKey> {
        let mut seen = HashSet::new();
        let mut stack = vec![key.clone()];
        while let Some(current) = stack.pop() {
            if let Some(dependents) = self.requirements.get(&current) {
                for dependent in dependents {
                    if seen.insert(dependent.clone()) {
                        stack.push(dependent.clone());
                    }
                }
            }
        }
        seen
    }

    /// An independent snapshot sharing per-predicate fact/rule lists with
    /// `self` until one side mutates a given predicate (copy-on-write).
    /// The derived-fact cache starts empty in the fork.
    #[must_use]
    pub fn fork(&self) -> Database {
        Database {
            facts: self.facts.clone(),
            rules: self.rules.clone(),
            derived: FactTable::new(),
            requirements: self.requirements.clone(),
            limits: self.limits,
        }
    }

    /// A hash over the multiset of facts per predicate key, independent
    /// of insertion order, used to give two databases with identical
    /// initial facts the same identity regardless of load order.
    #[must_use]
    pub fn fact_digest(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        let mut keys: Vec<&PredicateKey> = self.facts.keys().collect();
        keys.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        for key in keys {
            key.0.hash(&mut hasher);
            key.1.hash(&mut hasher);
            let mut rendered: Vec<String> = self.facts[key]
                .iter()
                .map(|row| {
                    row.iter()
                        .map(Term::render)
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect();
            rendered.sort();
            for r in rendered {
                r.hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}
