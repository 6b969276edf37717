//! gdl-core — a Datalog-with-negation engine for Game Description Language,
//! plus the turn-based state machine GDL programs describe.
//!
//! Load a game with [`StateMachine::store`], drive it turn by turn with
//! [`StateMachine::submit_move`]/[`StateMachine::next`], and inspect
//! legality/scoring/termination along the way. [`Database`] is the lower-
//! level Datalog store underneath, usable on its own for plain queries.

#![warn(missing_docs)]

pub mod config;
pub mod database;
pub mod datalog;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod reserved;
pub mod state_machine;
pub mod term;

pub use config::EvaluationLimits;
pub use database::{Database, QueryResult};
pub use error::{GdlError, Result};
pub use state_machine::{LegalResult, ScoreResult, StateMachine};
pub use term::{PredicateKey, Substitution, Term};

/// Version of this crate, as declared in its `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn reexports_cover_the_common_surface() {
        let mut db = Database::new();
        db.define_fact("foo", vec![]).unwrap();
        assert!(db.has_predicate(&(std::rc::Rc::from("foo"), 0)));
    }
}
