//! The Datalog-with-negation core: rule bodies as tagged literals,
//! unification, the semi-naive fixpoint, and rule/fact validation.

pub mod eval;
pub mod literal;
pub mod unify;
pub mod validate;

pub use literal::{Literal, Rule};
pub use unify::Matched;
