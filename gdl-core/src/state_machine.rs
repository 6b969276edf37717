//! Lifting the Datalog database into GDL's turn-based game semantics:
//! `role`/`init`/`true`/`does`/`legal`/`next`/`goal`/`terminal`.

use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use tracing::debug;

use crate::database::{Database, QueryResult};
use crate::error::{GdlError, Result, SourceSpan};
use crate::lexer;
use crate::parser;
use crate::reserved;
use crate::term::{PredicateKey, Term};

/// The outcome of [`StateMachine::legal`].
#[derive(Debug, Clone)]
pub enum LegalResult {
    /// Both player and move were ground: whether that move is legal.
    Bool(bool),
    /// Move left variable, player ground: renderings of each legal move.
    Moves(Vec<String>),
    /// Both left variable: legal move renderings per player.
    ByPlayer(HashMap<String, Vec<String>>),
}

/// The outcome of [`StateMachine::score`].
#[derive(Debug, Clone)]
pub enum ScoreResult {
    /// A ground player's goal value.
    Single(i64),
    /// Goal values for every player.
    ByPlayer(HashMap<String, i64>),
}

/// A GDL game position: a [`Database`] plus the turn-cycle bookkeeping
/// (who's playing, who has moved this turn) layered on top of it.
#[derive(Debug, Clone)]
pub struct StateMachine {
    db: Database,
    players: Vec<Rc<str>>,
    moves_submitted: HashSet<Rc<str>>,
}

impl StateMachine {
    /// Parse `source` and load it as a complete game description:
    /// `(<= head body...)` forms become rules, everything else a fact.
    /// `init` facts are rewritten to `true`; a literal `true` fact at top
    /// level is rejected. `role/1` facts name the players.
    pub fn store(source: &str, file: Option<&str>) -> Result<StateMachine> {
        let tokens = lexer::lex(source, file);
        let terms = parser::parse(&tokens)?;
        let mut db = Database::new();

        for term in terms {
            match term {
                Term::Compound { symbol, mut children, .. }
                    if symbol.as_ref() == reserved::RULE_ARROW =>
                {
                    let head = children.remove(0);
                    db.define_rule(head, children)?;
                }
                Term::Compound { symbol, children, .. } => {
                    let fact_symbol: Rc<str> = if symbol.as_ref() == "init" {
                        Rc::from("true")
                    } else if symbol.as_ref() == "true" {
                        return Err(GdlError::TrueNotAllowed);
                    } else {
                        symbol
                    };
                    db.define_fact(fact_symbol, children)?;
                }
                Term::Variable { loc, .. } => return Err(GdlError::ExpectedConstant(loc)),
            }
        }

        let role_key: PredicateKey = (Rc::from("role"), 1);
        let players: Vec<Rc<str>> = db
            .facts_for(&role_key)
            .iter()
            .filter_map(|row| row.first())
            .map(|t| Rc::clone(t.symbol()))
            .collect();
        if players.is_empty() {
            return Err(GdlError::NoPlayers);
        }

        debug!(players = players.len(), "store loaded game");
        Ok(StateMachine {
            db,
            players,
            moves_submitted: HashSet::new(),
        })
    }

    /// The players named by `role/1`, in the order they were declared.
    #[must_use]
    pub fn players(&self) -> &[Rc<str>] {
        &self.players
    }

    /// Submit `player`'s move for this turn. Checks player membership,
    /// a single move per turn, and legality (in that order) before
    /// asserting `(does player move)`.
    pub fn submit_move(&mut self, player: &str, move_source: &str) -> Result<()> {
        if !self.players.iter().any(|p| p.as_ref() == player) {
            return Err(GdlError::NoSuchPlayer(player.to_string()));
        }
        if self.moves_submitted.iter().any(|p| p.as_ref() == player) {
            return Err(GdlError::DoubleMove(player.to_string()));
        }

        let move_term = parse_single_term(move_source)?;
        let loc = move_term.loc().clone();
        let player_term = atom(player, loc.clone());

        let legal_query = Term::compound(
            "legal",
            vec![player_term.copy(), move_term.copy()],
            loc,
        );
        if !self.db.query(&legal_query)?.is_true() {
            return Err(GdlError::IllegalMove {
                player: player.to_string(),
                move_term: move_term.render(),
            });
        }

        self.db.define_fact("does", vec![player_term, move_term])?;
        self.moves_submitted.insert(Rc::from(player));
        Ok(())
    }

    /// Query legality. See [`LegalResult`] for the return shapes.
    pub fn legal(&mut self, player: Option<&str>, move_source: Option<&str>) -> Result<LegalResult> {
        match (player, move_source) {
            (Some(p), Some(m)) => {
                let move_term = parse_single_term(m)?;
                let loc = move_term.loc().clone();
                let q = Term::compound("legal", vec![atom(p, loc.clone()), move_term], loc);
                Ok(LegalResult::Bool(self.db.query(&q)?.is_true()))
            }
            (Some(p), None) => Ok(LegalResult::Moves(self.legal_moves_for(p)?)),
            (None, _) => {
                let mut map = HashMap::new();
                for p in self.players.clone() {
                    map.insert(p.to_string(), self.legal_moves_for(&p)?);
                }
                Ok(LegalResult::ByPlayer(map))
            }
        }
    }

    fn legal_moves_for(&mut self, player: &str) -> Result<Vec<String>> {
        let loc = SourceSpan::new("", 1, 1);
        let move_var = Term::variable("move", loc.clone());
        let q = Term::compound("legal", vec![atom(player, loc.clone()), move_var], loc);
        let result = self.db.query(&q)?;
        Ok(result
            .bindings()
            .iter()
            .filter_map(|b| b.get("move").map(Term::render))
            .collect())
    }

    /// Query `goal(player, ?score)`. See [`ScoreResult`] for the return
    /// shapes. A malformed game with no matching `goal` fact for a player
    /// scores 0 rather than erroring — `goal/2` is an ordinary rule head
    /// like any other, so an incomplete definition is a game-authoring
    /// bug, not a parse or evaluation failure.
    pub fn score(&mut self, player: Option<&str>) -> Result<ScoreResult> {
        match player {
            Some(p) => Ok(ScoreResult::Single(self.score_for(p)?)),
            None => {
                let mut map = HashMap::new();
                for p in self.players.clone() {
                    map.insert(p.to_string(), self.score_for(&p)?);
                }
                Ok(ScoreResult::ByPlayer(map))
            }
        }
    }

    fn score_for(&mut self, player: &str) -> Result<i64> {
        let loc = SourceSpan::new("", 1, 1);
        let score_var = Term::variable("score", loc.clone());
        let q = Term::compound("goal", vec![atom(player, loc.clone()), score_var], loc);
        let result = self.db.query(&q)?;
        Ok(result
            .bindings()
            .first()
            .and_then(|b| b.get("score"))
            .map_or(0, |t| t.symbol().parse::<i64>().unwrap_or(0)))
    }

    /// Query `terminal/0`.
    pub fn is_terminal(&mut self) -> Result<bool> {
        let q = Term::compound("terminal", vec![], SourceSpan::new("", 1, 1));
        Ok(self.db.query(&q)?.is_true())
    }

    /// Advance to the successor state. Every player must have moved this
    /// turn. Returns a fresh `StateMachine` wrapping a forked `Database`
    /// with `true/1` and `does/2` replaced by the bindings of `next/1`.
    pub fn next(&self) -> Result<StateMachine> {
        if self.moves_submitted.len() != self.players.len() {
            return Err(GdlError::NoMoves);
        }

        let loc = SourceSpan::new("", 1, 1);
        let state_var = Term::variable("state", loc.clone());
        let q = Term::compound("next", vec![state_var], loc);
        let mut scratch = self.db.clone();
        let result = scratch.query(&q)?;
        let states: Vec<Term> = result
            .bindings()
            .iter()
            .filter_map(|b| b.get("state").map(Term::copy))
            .collect();

        let true_key: PredicateKey = (Rc::from("true"), 1);
        let does_key: PredicateKey = (Rc::from("does"), 2);
        let mut successor = self.db.fork();
        successor.remove_facts(&true_key);
        successor.remove_facts(&does_key);
        for state in states {
            successor.define_fact("true", vec![state])?;
        }

        debug!(players = self.players.len(), "advanced to next state");
        Ok(StateMachine {
            db: successor,
            players: self.players.clone(),
            moves_submitted: HashSet::new(),
        })
    }

    /// The underlying database, for inspection beyond the GDL operations
    /// above.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Answer an arbitrary query term against the underlying database, not
    /// limited to the fixed `legal`/`goal`/`terminal` shapes above.
    pub fn query(&mut self, term: &Term) -> Result<QueryResult> {
        self.db.query(term)
    }
}

/// Two states are equal when their fact multisets and turn bookkeeping
/// match, regardless of insertion order (see [`Database::fact_digest`]).
impl PartialEq for StateMachine {
    fn eq(&self, other: &Self) -> bool {
        self.db.fact_digest() == other.db.fact_digest()
            && self.players == other.players
            && self.moves_submitted == other.moves_submitted
    }
}

impl Eq for StateMachine {}

impl Hash for StateMachine {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.db.fact_digest().hash(state);
    }
}

fn atom(symbol: &str, loc: SourceSpan) -> Term {
    Term::compound(symbol.to_string(), vec![], loc)
}

fn parse_single_term(source: &str) -> Result<Term> {
    let tokens = lexer::lex(source, None);
    let terms = parser::parse(&tokens)?;
    terms
        .into_iter()
        .next()
        .ok_or_else(|| GdlError::MissingClose(SourceSpan::new(source, 1, 1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIC_TAC_TOE_FRAGMENT: &str = "
        (role x) (role o)
        (init (control x))
        (init (cell 0 0 b)) (init (cell 0 1 b)) (init (cell 1 0 b)) (init (cell 1 1 b))

        (<= (legal ?p (mark ?m ?n))
            (true (cell ?m ?n b))
            (true (control ?p)))
        (<= (legal ?p noop)
            (role ?p)
            (true (control ?other))
            (distinct ?p ?other))

        (<= (next (cell ?m ?n x))
            (does x (mark ?m ?n)))
        (<= (next (cell ?m ?n o))
            (does o (mark ?m ?n)))
        (<= (next (cell ?m ?n ?w))
            (true (cell ?m ?n ?w))
            (distinct ?w b))
        (<= (next (cell ?m ?n b))
            (true (cell ?m ?n b))
            (does x (mark ?j ?k))
            (distinct ?m ?j))
        (<= (next (cell ?m ?n b))
            (true (cell ?m ?n b))
            (does x (mark ?j ?k))
            (distinct ?n ?k))

        (<= (next (control o)) (true (control x)))
        (<= (next (control x)) (true (control o)))

        terminal
    ";

    #[test]
    fn store_requires_roles() {
        let err = StateMachine::store("(foo a)", None).unwrap_err();
        assert!(matches!(err, GdlError::NoPlayers));
    }

    #[test]
    fn store_rejects_literal_true_fact() {
        let err = StateMachine::store("(role x) (true (cell 0 0 b))", None).unwrap_err();
        assert!(matches!(err, GdlError::TrueNotAllowed));
    }

    #[test]
    fn store_rewrites_init_to_true() {
        let fsm = StateMachine::store("(role x) (init (score 0))", None).unwrap();
        let key: PredicateKey = (Rc::from("true"), 1);
        assert_eq!(fsm.database().facts_for(&key).len(), 1);
    }

    #[test]
    fn move_checks_player_membership_and_double_move() {
        let mut fsm = StateMachine::store(TIC_TAC_TOE_FRAGMENT, None).unwrap();
        let err = fsm.submit_move("z", "(mark 0 0)").unwrap_err();
        assert!(matches!(err, GdlError::NoSuchPlayer(_)));

        fsm.submit_move("x", "(mark 0 0)").unwrap();
        let err = fsm.submit_move("x", "(mark 0 1)").unwrap_err();
        assert!(matches!(err, GdlError::DoubleMove(_)));
    }

    #[test]
    fn move_rejects_illegal_move() {
        let mut fsm = StateMachine::store(TIC_TAC_TOE_FRAGMENT, None).unwrap();
        // control starts with x, so o has no legal mark this turn.
        let err = fsm.submit_move("o", "(mark 0 0)").unwrap_err();
        assert!(matches!(err, GdlError::IllegalMove { .. }));
    }

    // S6 — turn advance.
    #[test]
    fn next_advances_control_and_marks_cell() {
        let mut fsm = StateMachine::store(TIC_TAC_TOE_FRAGMENT, None).unwrap();
        fsm.submit_move("x", "(mark 0 0)").unwrap();
        fsm.submit_move("o", "noop").unwrap();
        let fsm2 = fsm.next().unwrap();

        let true_key: PredicateKey = (Rc::from("true"), 1);
        let rendered: Vec<String> = fsm2
            .database()
            .facts_for(&true_key)
            .iter()
            .map(|row| row[0].render())
            .collect();
        assert!(rendered.contains(&"(cell 0 0 x)".to_string()));
        assert!(rendered.contains(&"(control o)".to_string()));

        let does_key: PredicateKey = (Rc::from("does"), 2);
        assert!(fsm2.database().facts_for(&does_key).is_empty());
    }

    #[test]
    fn next_without_all_moves_errors() {
        let mut fsm = StateMachine::store(TIC_TAC_TOE_FRAGMENT, None).unwrap();
        fsm.submit_move("x", "(mark 0 0)").unwrap();
        let err = fsm.next().unwrap_err();
        assert!(matches!(err, GdlError::NoMoves));
    }
}
