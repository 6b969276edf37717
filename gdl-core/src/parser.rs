//! Token stream to term trees: parentheses grouping, reserved-arity
//! checks, and the double-`not` nesting rule.

use crate::error::{GdlError, Result};
use crate::lexer::Token;
use crate::reserved;
use crate::term::Term;

/// Parse a full token stream into the top-level term trees it contains
/// (facts, rules as `<=` compounds, or bare query terms).
pub fn parse(tokens: &[Token]) -> Result<Vec<Term>> {
    let mut pos = 0;
    let mut terms = Vec::new();
    while pos < tokens.len() {
        let (term, next_pos) = parse_term(tokens, pos, false)?;
        terms.push(term);
        pos = next_pos;
    }
    Ok(terms)
}

/// Parse exactly one term starting at `pos`, returning it and the index
/// just past its last token. `inside_not` is true when this call is
/// parsing the direct (sole) child of a `not` compound, the only position
/// where a nested `not` is rejected.
fn parse_term(tokens: &[Token], pos: usize, inside_not: bool) -> Result<(Term, usize)> {
    let token = tokens.get(pos).ok_or_else(|| {
        GdlError::MissingClose(
            tokens
                .last()
                .map(Token::span)
                .unwrap_or_else(|| crate::error::SourceSpan::new("", 1, 1)),
        )
    })?;

    if token.is_close_paren() {
        return Err(GdlError::UnexpectedClose(token.span()));
    }

    if !token.is_open_paren() {
        return Ok((leaf_term(token), pos + 1));
    }

    // `(` — the next token must name the functor.
    let symbol_token = tokens
        .get(pos + 1)
        .ok_or_else(|| GdlError::MissingClose(token.span()))?;
    if !symbol_token.is_constant() {
        return Err(GdlError::ExpectedConstant(symbol_token.span()));
    }
    if inside_not && symbol_token.value == "not" {
        return Err(GdlError::DoubleNot(symbol_token.span()));
    }

    let symbol = symbol_token.value.clone();
    let mut children = Vec::new();
    let mut cursor = pos + 2;
    loop {
        let next = tokens
            .get(cursor)
            .ok_or_else(|| GdlError::MissingClose(symbol_token.span()))?;
        if next.is_close_paren() {
            cursor += 1;
            break;
        }
        let child_inside_not = children.is_empty() && symbol == "not";
        let (child, next_cursor) = parse_term(tokens, cursor, child_inside_not)?;
        children.push(child);
        cursor = next_cursor;
    }

    if symbol == reserved::RULE_ARROW {
        if children.len() < 2 {
            return Err(GdlError::BadPredicateArity {
                symbol,
                arity: children.len(),
                span: symbol_token.span(),
            });
        }
    } else if let Some(expected) = reserved::required_arity(&symbol) {
        if children.len() != expected {
            return Err(GdlError::BadPredicateArity {
                symbol,
                arity: children.len(),
                span: symbol_token.span(),
            });
        }
    }

    let term = Term::compound(symbol, children, symbol_token.span());
    Ok((term, cursor))
}

fn leaf_term(token: &Token) -> Term {
    if token.is_variable() {
        Term::variable(token.value.trim_start_matches('?'), token.span())
    } else {
        Term::compound(token.value.clone(), vec![], token.span())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_str(src: &str) -> Result<Vec<Term>> {
        parse(&lex(src, None))
    }

    #[test]
    fn parses_a_fact() {
        let terms = parse_str("(foo a b c)").unwrap();
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].render(), "(foo a b c)");
    }

    #[test]
    fn parses_an_atom() {
        let terms = parse_str("terminal").unwrap();
        assert_eq!(terms[0].render(), "terminal");
    }

    #[test]
    fn parses_a_variable() {
        let terms = parse_str("?x").unwrap();
        assert!(terms[0].is_variable());
        assert_eq!(terms[0].render(), "?x");
    }

    #[test]
    fn parses_nested_compounds() {
        let terms = parse_str("(bar 1 (x 2 3))").unwrap();
        assert_eq!(terms[0].render(), "(bar 1 (x 2 3))");
    }

    #[test]
    fn rejects_unexpected_close() {
        let err = parse_str(")").unwrap_err();
        assert!(matches!(err, GdlError::UnexpectedClose(_)));
    }

    #[test]
    fn rejects_missing_close() {
        let err = parse_str("(foo a").unwrap_err();
        assert!(matches!(err, GdlError::MissingClose(_)));
    }

    #[test]
    fn rejects_non_constant_after_open_paren() {
        let err = parse_str("(?x a)").unwrap_err();
        assert!(matches!(err, GdlError::ExpectedConstant(_)));
    }

    #[test]
    fn rejects_double_not() {
        let err = parse_str("(not (not (foo ?x)))").unwrap_err();
        assert!(matches!(err, GdlError::DoubleNot(_)));
    }

    #[test]
    fn allows_not_nested_deeper_than_direct_child() {
        let terms = parse_str("(foo (not (bar ?x)) (not (baz ?y)))").unwrap();
        assert_eq!(terms.len(), 1);
    }

    #[test]
    fn rejects_wrong_arity_for_reserved_predicate() {
        let err = parse_str("(terminal a)").unwrap_err();
        assert!(matches!(err, GdlError::BadPredicateArity { .. }));
    }

    #[test]
    fn rejects_rule_with_no_body() {
        let err = parse_str("(<= (foo ?x))").unwrap_err();
        assert!(matches!(err, GdlError::BadPredicateArity { .. }));
    }

    #[test]
    fn parses_a_rule() {
        let terms =
            parse_str("(<= (path ?x ?y) (path ?x ?z) (link ?z ?y))").unwrap();
        assert_eq!(
            terms[0].render(),
            "(<= (path ?x ?y) (path ?x ?z) (link ?z ?y))"
        );
    }
}
