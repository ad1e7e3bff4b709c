//! An evaluator for the untyped lambda calculus.
//!
//! Terms are written fully parenthesized, `(λx.(f x))` or `(\x.(f x))`, and
//! reduced in normal order under a step budget. Names bound with `name: term`
//! are looked up when reduction reaches them, so redefining a name changes
//! every later evaluation that mentions it.

pub mod env;
pub mod error;
pub mod parser;
pub mod prelude;
pub mod reducer;
pub mod session;
pub mod term;

pub use error::{EvalError, ParseError};
pub use session::{Config, Outcome, Session};
pub use term::Term;
