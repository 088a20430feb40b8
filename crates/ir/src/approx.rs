//! Bounded unrolling of data-dependent loops.
//!
//! Library routines like memcmp and strlen loop over a symbolic byte count.
//! [`unroll_loop`] unrolls such a loop a fixed number of iterations; if the
//! continuation condition is still symbolic at the bound, the remainder is
//! cut off by an assumed precondition and the encoding is flagged as an
//! approximation. Loops whose continuation folds to a constant are encoded
//! exactly, even past the nominal bound.

use tracing::trace;
use tv_smtlib::build::{and2, implies, not, tru};
use tv_smtlib::Term;

use crate::state::State;
use crate::value::StateValue;

/// Iterations a constant-continuation loop may run before we assume the
/// input IR is malformed.
const MAX_EXACT_UNROLL: u32 = 1 << 12;

/// One unrolled iteration: the condition to keep looping, the UB-freedom
/// condition of this iteration's body, and the loop's result if it exits
/// here.
pub struct LoopStep {
    pub cont: Term,
    pub ub: Term,
    pub value: StateValue,
}

/// Unroll a loop up to `bound` iterations.
///
/// `body` is invoked with the iteration index and must produce that
/// iteration's [`LoopStep`]. Each iteration's UB is guarded by the
/// conjunction of the preceding continuation conditions, so UB in an
/// iteration the loop never reaches does not leak out.
pub fn unroll_loop(
    s: &mut State,
    name: &str,
    bound: u32,
    body: &mut dyn FnMut(&mut State, u32) -> LoopStep,
) -> StateValue {
    let mut prefix = tru();
    let mut iters: Vec<(Term, StateValue)> = Vec::new();
    let mut i = 0;
    loop {
        let step = body(s, i);
        let ub = implies(prefix.clone(), step.ub);
        s.add_ub(ub);
        let exact_exit = step.cont.is_false();
        iters.push((step.cont.clone(), step.value));
        if exact_exit {
            break;
        }
        if step.cont.is_true() {
            // constant trip count: keep going past the nominal bound
            assert!(
                i < MAX_EXACT_UNROLL,
                "loop {name} ran {MAX_EXACT_UNROLL} constant iterations"
            );
            i += 1;
            continue;
        }
        prefix = and2(prefix, step.cont.clone());
        i += 1;
        if i >= bound {
            trace!(name, bound, "loop cut off at unroll bound");
            s.does_approximation(name);
            s.add_pre(implies(prefix.clone(), not(step.cont)));
            break;
        }
    }
    // select the value of the first iteration that exits
    let mut it = iters.into_iter().rev();
    let (_, mut result) = it.next().unwrap_or_else(|| unreachable!());
    for (cont, value) in it {
        result = StateValue::mk_if(&cont, result, value);
    }
    result
}
