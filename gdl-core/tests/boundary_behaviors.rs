//! The boundary behaviors named in the engine's invariant list: each one
//! ending in a specific `GdlError` variant rather than a panic or a wrong
//! silent answer.

use gdl_core::{Database, GdlError, StateMachine};

fn atom(symbol: &str) -> gdl_core::Term {
    gdl_core::Term::compound(symbol, vec![], here())
}

fn var(symbol: &str) -> gdl_core::Term {
    gdl_core::Term::variable(symbol, here())
}

fn here() -> gdl_core::error::SourceSpan {
    gdl_core::error::SourceSpan::new("", 1, 1)
}

#[test]
fn query_against_unknown_predicate_errors() {
    let mut db = Database::new();
    let err = db.query(&atom("mystery")).unwrap_err();
    assert!(matches!(err, GdlError::UnknownPredicate { .. }));
}

#[test]
fn fact_with_a_variable_errors() {
    let mut db = Database::new();
    let err = db.define_fact("foo", vec![var("x")]).unwrap_err();
    assert!(matches!(err, GdlError::FactContainsVariable(_)));
}

#[test]
fn unbound_negative_variable_errors() {
    let mut db = Database::new();
    let head = gdl_core::Term::compound("p", vec![var("x")], here());
    let body = vec![gdl_core::Term::compound(
        "not",
        vec![gdl_core::Term::compound("q", vec![var("x")], here())],
        here(),
    )];
    let err = db.define_rule(head, body).unwrap_err();
    assert!(matches!(err, GdlError::NegativeVariable { .. }));
}

#[test]
fn negative_cycle_errors() {
    let mut db = Database::new();
    db.define_rule(
        gdl_core::Term::compound("p_", vec![var("x")], here()),
        vec![gdl_core::Term::compound("q_", vec![var("x")], here())],
    )
    .unwrap();
    db.define_rule(
        gdl_core::Term::compound("r_", vec![var("x")], here()),
        vec![gdl_core::Term::compound("p_", vec![var("x")], here())],
    )
    .unwrap();
    let err = db
        .define_rule(
            gdl_core::Term::compound("q_", vec![var("x")], here()),
            vec![
                gdl_core::Term::compound("x_", vec![var("x")], here()),
                gdl_core::Term::compound(
                    "not",
                    vec![gdl_core::Term::compound("r_", vec![var("x")], here())],
                    here(),
                ),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, GdlError::NegativeCycle(_)));
}

#[test]
fn next_without_every_player_moved_errors() {
    let fsm = StateMachine::store("(role x) (role o) (init (score 0))", None).unwrap();
    let err = fsm.next().unwrap_err();
    assert!(matches!(err, GdlError::NoMoves));
}

#[test]
fn store_without_role_facts_errors() {
    let err = StateMachine::store("(init (cell a))", None).unwrap_err();
    assert!(matches!(err, GdlError::NoPlayers));
}

#[test]
fn define_fact_is_idempotent_for_boolean_queries() {
    let mut db = Database::new();
    let p_a = gdl_core::Term::compound("p", vec![atom("a")], here());
    db.define_fact("p", vec![atom("a")]).unwrap();
    assert!(db.query(&p_a).unwrap().is_true());
    db.define_fact("p", vec![atom("a")]).unwrap();
    assert!(db.query(&p_a).unwrap().is_true());
}
