//! Error types for the GDL core engine

use std::fmt;

use thiserror::Error;

/// A location in GDL source text, carried by tokens and terms for
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    /// Source file name, if the text came from a file.
    pub file: Option<String>,
    /// The full text of the line the span starts on.
    pub line_text: String,
    /// 1-based line number.
    pub lineno: usize,
    /// 1-based column number.
    pub column: usize,
}

impl SourceSpan {
    /// Create a span for text that did not come from a named file.
    pub fn new(line_text: impl Into<String>, lineno: usize, column: usize) -> Self {
        SourceSpan {
            file: None,
            line_text: line_text.into(),
            lineno,
            column,
        }
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = format!("{}: ", self.lineno);
        let nspaces = prefix.len() + self.column.saturating_sub(1);
        writeln!(f, "{}{}", prefix, self.line_text.trim_end())?;
        write!(f, "{:>width$}", "^", width = nspaces + 1)
    }
}

/// Main error type for GDL core operations.
#[derive(Error, Debug)]
pub enum GdlError {
    // -- Syntax --
    /// A constant was expected but something else was found.
    #[error("A constant was expected.\n{0}")]
    ExpectedConstant(SourceSpan),
    /// An unexpected closing parenthesis was encountered.
    #[error("Unexpected closed parenthesis.\n{0}")]
    UnexpectedClose(SourceSpan),
    /// A closing parenthesis is missing.
    #[error("Missing closed parenthesis.\n{0}")]
    MissingClose(SourceSpan),
    /// `not` was nested directly inside another `not`.
    #[error("Double negatives aren't not disallowed.\n{0}")]
    DoubleNot(SourceSpan),
    /// A reserved predicate was used with the wrong arity.
    #[error("The built-in predicate '{symbol}/{arity}' has the wrong arity.\n{span}")]
    BadPredicateArity {
        /// Offending symbol.
        symbol: String,
        /// Arity it was used with.
        arity: usize,
        /// Location of the offending term.
        span: SourceSpan,
    },

    // -- Validation --
    /// A fact contained a variable.
    #[error("Variables are not allowed in facts.\n{0}")]
    FactContainsVariable(SourceSpan),
    /// A fact contained a reserved word.
    #[error("Reserved keyword '{symbol}' is not allowed in facts.\n{span}")]
    FactReservedWord {
        /// Offending symbol.
        symbol: String,
        /// Location of the offending term.
        span: SourceSpan,
    },
    /// A rule head contained a reserved word.
    #[error("Reserved keyword '{symbol}' is not allowed in the head of a rule.\n{span}")]
    RuleHeadReservedWord {
        /// Offending symbol.
        symbol: String,
        /// Location of the offending term.
        span: SourceSpan,
    },
    /// A variable under negation/distinct was not bound positively.
    #[error("'?{variable}' must appear in a positive literal in the body.\n{span}")]
    NegativeVariable {
        /// Offending variable name (without the leading `?`).
        variable: String,
        /// Location of the offending term.
        span: SourceSpan,
    },
    /// Defining this rule would close a cycle through a negated edge.
    #[error("Literal in rule creates a recursive cycle with at least one negative edge.\n{0}")]
    NegativeCycle(SourceSpan),

    // -- Query --
    /// The predicate queried is neither a fact nor a rule.
    #[error("No such predicate '{symbol}/{arity}'.\n{span}")]
    UnknownPredicate {
        /// Queried symbol.
        symbol: String,
        /// Queried arity.
        arity: usize,
        /// Location of the query term, if known.
        span: SourceSpan,
    },

    // -- Game --
    /// The loaded game defines no players via `role/1`.
    #[error("Players must be defined with 'role/1'.")]
    NoPlayers,
    /// A move was submitted by an unknown player.
    #[error("No such player: '{0}'")]
    NoSuchPlayer(String),
    /// A player already moved this turn.
    #[error("'{0}' has already moved this turn")]
    DoubleMove(String),
    /// A submitted move is not legal for the player.
    #[error("Not a legal move: '(does {player} {move_term})'")]
    IllegalMove {
        /// Player who attempted the move.
        player: String,
        /// Rendered move term.
        move_term: String,
    },
    /// A top-level `true` fact was given; initial facts must use `init`.
    #[error("'true' facts may not be asserted directly; use 'init' instead.")]
    TrueNotAllowed,
    /// `next()` was called before every player had moved.
    #[error("Cannot advance: not every player has moved this turn.")]
    NoMoves,

    // -- Engineering backstop --
    /// The fixpoint loop exceeded its configured iteration cap.
    #[error("Evaluation of '{symbol}/{arity}' did not converge within {limit} iterations.")]
    EvaluationDidNotConverge {
        /// Predicate symbol being evaluated.
        symbol: String,
        /// Predicate arity being evaluated.
        arity: usize,
        /// The configured cap that was exceeded.
        limit: usize,
    },
}

/// Result type alias for GDL core operations.
pub type Result<T> = std::result::Result<T, GdlError>;
