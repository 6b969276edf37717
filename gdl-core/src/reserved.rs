//! Table of reserved GDL symbols and the arity the parser enforces for each.
//!
//! Centralizing this here keeps arity checks out of the lexer, parser, and
//! validator as scattered string comparisons.

/// The rule arrow. Variadic — `(<= head body1 body2 ...)` needs a head and
/// at least one body literal, so it is checked separately from the fixed
/// arities below.
pub const RULE_ARROW: &str = "<=";

/// The fixed arity required for a reserved symbol, if it has one.
///
/// Returns `None` both for non-reserved symbols and for `RULE_ARROW`, which
/// has no single required arity.
#[must_use]
pub fn required_arity(symbol: &str) -> Option<usize> {
    match symbol {
        "not" => Some(1),
        "distinct" => Some(2),
        "or" => Some(2),
        "role" => Some(1),
        "init" => Some(1),
        "true" => Some(1),
        "does" => Some(2),
        "legal" => Some(2),
        "next" => Some(1),
        "goal" => Some(2),
        "terminal" => Some(0),
        _ => None,
    }
}

/// Whether `symbol` is a reserved word, including the rule arrow.
#[must_use]
pub fn is_reserved(symbol: &str) -> bool {
    symbol == RULE_ARROW || required_arity(symbol).is_some()
}

/// Whether `symbol` is one of the GDL game predicates (a subset of the
/// reserved words, excluding the logical connectives and the rule arrow).
#[must_use]
pub fn is_game_predicate(symbol: &str) -> bool {
    matches!(
        symbol,
        "role" | "init" | "true" | "does" | "legal" | "next" | "goal" | "terminal"
    )
}
