//! SMT-LIB term construction and formatting.
//!
//! This crate provides the symbolic expression layer consumed by the IR
//! semantics encoder:
//!
//! - [`Sort`] and [`Term`]: an SMT-LIB2 AST over booleans, bitvectors,
//!   IEEE 754 floats, arrays, tuples, and uninterpreted functions.
//! - [`build`]: smart constructors that perform local constant folding, so
//!   that encoders can ask `Term::as_bool_lit` and get an answer whenever the
//!   operands were concrete.
//! - [`bvops`] / [`fpops`]: derived combinators (saturating arithmetic,
//!   overflow predicates, bit counting, funnel shifts, NaN-aware min/max)
//!   expressed in terms of the core AST.
//! - [`Command`], [`Script`], and the `Display` impls in [`formatter`]:
//!   emission of solver-ready SMT-LIB2 text.
//!
//! Terms are plain data. Nothing in this crate talks to a solver.

pub mod build;
pub mod bvops;
pub mod command;
pub mod formatter;
pub mod fpops;
pub mod script;
pub mod sort;
pub mod term;

pub use command::Command;
pub use script::Script;
pub use sort::Sort;
pub use term::{Conjunction, RoundingMode, Term};
