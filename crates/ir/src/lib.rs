//! SSA IR semantics encoder.
//!
//! This crate turns typed SSA functions into SMT terms: every instruction
//! becomes a (value, non-poison) pair, undefined behavior and compiler
//! preconditions accumulate in the threaded [`state::State`], and memory is
//! abstracted behind [`memory::MemoryModel`]. The output of
//! [`state::encode_function`] is a self-contained summary a refinement
//! checker can compare across two versions of a function.

pub mod approx;
pub mod attrs;
pub mod fp;
pub mod instr;
pub mod memory;
pub mod state;
pub mod ty;
pub mod value;

pub use state::{encode_function, EncodedFn, State};
pub use ty::Type;
pub use value::{Function, StateValue, ValueId};

/// Unroll bound for byte-comparison loops (memcmp/bcmp).
pub const MEMCMP_UNROLL_CNT: u32 = 8;

/// Unroll bound for strlen's byte scan.
pub const STRLEN_UNROLL_CNT: u32 = 8;

/// Bit width of varargs ledger counters.
pub const VARARG_BITS: u32 = 8;
