//! Character stream to token stream: GDL's surface syntax is whitespace-
//! separated symbols, parenthesis grouping, and `;`-to-end-of-line comments.

use crate::error::SourceSpan;
use crate::reserved;

/// One lexical token: its literal text (already lower-cased) plus enough
/// source-location context to render a caret diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lower-cased token text. For parentheses this is `"("` or `")"`.
    pub value: String,
    /// Source file name, if lexing from a named file.
    pub file: Option<String>,
    /// The full text of the line this token starts on.
    pub line_text: String,
    /// 1-based line number.
    pub lineno: usize,
    /// 1-based column number.
    pub column: usize,
}

impl Token {
    /// Location of this token, for use in `GdlError` variants.
    #[must_use]
    pub fn span(&self) -> SourceSpan {
        SourceSpan {
            file: self.file.clone(),
            line_text: self.line_text.clone(),
            lineno: self.lineno,
            column: self.column,
        }
    }

    /// Whether this token is `(`.
    #[must_use]
    pub fn is_open_paren(&self) -> bool {
        self.value == "("
    }

    /// Whether this token is `)`.
    #[must_use]
    pub fn is_close_paren(&self) -> bool {
        self.value == ")"
    }

    /// Whether this token's text begins with `?`.
    #[must_use]
    pub fn is_variable(&self) -> bool {
        self.value.starts_with('?')
    }

    /// Whether this token is neither a variable nor a parenthesis.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        !self.is_variable() && !self.is_open_paren() && !self.is_close_paren()
    }

    /// Whether this token's text names a reserved word (see [`reserved`]).
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.is_constant() && reserved::is_reserved(&self.value)
    }
}

/// Scan `source` into a flat token stream. `file` is attached to every
/// token's location for diagnostics; pass `None` for anonymous sources
/// (e.g. a query string typed at a prompt).
#[must_use]
pub fn lex(source: &str, file: Option<&str>) -> Vec<Token> {
    let mut tokens = Vec::new();
    for (line_idx, raw_line) in source.lines().enumerate() {
        lex_line(raw_line, line_idx + 1, file, &mut tokens);
    }
    tokens
}

fn lex_line(raw_line: &str, lineno: usize, file: Option<&str>, tokens: &mut Vec<Token>) {
    let mut buf = String::new();
    let mut buf_start_col = 0usize;

    macro_rules! flush {
        () => {
            if !buf.is_empty() {
                tokens.push(Token {
                    value: buf.to_lowercase(),
                    file: file.map(str::to_string),
                    line_text: raw_line.to_string(),
                    lineno,
                    column: buf_start_col + 1,
                });
                buf.clear();
            }
        };
    }

    for (col, ch) in raw_line.char_indices() {
        if ch == ';' {
            break;
        } else if ch.is_whitespace() {
            flush!();
        } else if ch == '(' || ch == ')' {
            flush!();
            tokens.push(Token {
                value: ch.to_string(),
                file: file.map(str::to_string),
                line_text: raw_line.to_string(),
                lineno,
                column: col + 1,
            });
        } else {
            if buf.is_empty() {
                buf_start_col = col;
            }
            buf.push(ch);
        }
    }
    flush!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.value.as_str()).collect()
    }

    #[test]
    fn lexes_parens_and_symbols() {
        let tokens = lex("(foo ?x bar)", None);
        assert_eq!(values(&tokens), vec!["(", "foo", "?x", "bar", ")"]);
    }

    #[test]
    fn lower_cases_symbols() {
        let tokens = lex("(Foo BAR)", None);
        assert_eq!(values(&tokens), vec!["(", "foo", "bar", ")"]);
    }

    #[test]
    fn strips_line_comments() {
        let tokens = lex("(foo a) ; a trailing comment\n(bar b)", None);
        assert_eq!(values(&tokens), vec!["(", "foo", "a", ")", "(", "bar", "b", ")"]);
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = lex("  (foo)", None);
        let open = &tokens[0];
        assert_eq!(open.lineno, 1);
        assert_eq!(open.column, 3);
        let foo = &tokens[1];
        assert_eq!(foo.column, 4);
    }

    #[test]
    fn classifies_tokens() {
        let tokens = lex("(not ?x)", None);
        assert!(tokens[0].is_open_paren());
        assert!(tokens[1].is_constant());
        assert!(tokens[1].is_reserved());
        assert!(tokens[2].is_variable());
        assert!(tokens[3].is_close_paren());
    }
}
