//! The scalar floating-point encoding pipeline.
//!
//! Every FP instruction funnels its lanes through [`fm_poison`]: `nsz` sign
//! scrambling and input denormal flushing first, then the rounded
//! computation, then value-rewriting fast-math flags (as uninterpreted
//! functions, marking the encoding approximate), then the `nnan`/`ninf`
//! poison conditions and output flushing. Keeping the order fixed here is
//! what keeps the per-instruction encoders short.

use tracing::trace;
use tv_smtlib::build::{and2, and_many, eq, ite, not, tru};
use tv_smtlib::fpops::{rm, FloatFormat};
use tv_smtlib::{RoundingMode, Term};

use crate::attrs::{FastMathFlags, FpDenormalKind, FpRounding};
use crate::state::State;
use crate::value::StateValue;

// ---------------------------------------------------------------------------
// Denormals and signed zeros
// ---------------------------------------------------------------------------

/// Flush a subnormal value according to the function's denormal mode.
pub fn handle_subnormal(kind: FpDenormalKind, fmt: FloatFormat, v: Term) -> Term {
    match kind {
        FpDenormalKind::Ieee => v,
        FpDenormalKind::PositiveZero => ite(
            Term::FpIsSubnormal(Box::new(v.clone())),
            fmt.pos_zero(),
            v,
        ),
        FpDenormalKind::PreserveSign => ite(
            Term::FpIsSubnormal(Box::new(v.clone())),
            ite(
                Term::FpIsNegative(Box::new(v.clone())),
                fmt.neg_zero(),
                fmt.pos_zero(),
            ),
            v,
        ),
    }
}

/// Under `nsz`, a zero may be read with either sign. The choice variable is
/// memoized per term so one value keeps one sign within the encoding.
fn nsz_scramble(s: &mut State, fmt: FloatFormat, v: Term) -> Term {
    let choice = s.anyzero_choice(&v);
    ite(
        Term::FpIsZero(Box::new(v.clone())),
        ite(choice, fmt.neg_zero(), fmt.pos_zero()),
        v,
    )
}

// ---------------------------------------------------------------------------
// Rounding
// ---------------------------------------------------------------------------

/// Compute a value under the instruction's rounding-mode operand.
///
/// Returns the value and an extra non-poison condition. A `Fixed` mode
/// computes at that mode but requires the dynamic register to agree; a
/// `Dynamic` mode selects over all five modes of the register.
pub fn round_value(
    s: &mut State,
    rounding: FpRounding,
    compute: &dyn Fn(Term) -> Term,
) -> (Term, Term) {
    match rounding {
        FpRounding::Default => (compute(rm(RoundingMode::Rne)), tru()),
        FpRounding::Fixed(mode) => {
            let np = eq(s.fp_rounding_var(), Term::RoundMode(mode));
            (compute(rm(mode)), np)
        }
        FpRounding::Dynamic => {
            let reg = s.fp_rounding_var();
            let mut value = compute(rm(RoundingMode::Rtz));
            for mode in [
                RoundingMode::Rtn,
                RoundingMode::Rtp,
                RoundingMode::Rna,
                RoundingMode::Rne,
            ] {
                value = ite(
                    eq(reg.clone(), Term::RoundMode(mode)),
                    compute(rm(mode)),
                    value,
                );
            }
            (value, tru())
        }
    }
}

// ---------------------------------------------------------------------------
// Fast-math poison conditions
// ---------------------------------------------------------------------------

/// Non-poison conditions `nnan`/`ninf` impose on a set of input values.
pub fn fmf_input_np(fmf: FastMathFlags, inputs: &[Term]) -> Term {
    let mut conds = Vec::new();
    for v in inputs {
        if fmf.contains(FastMathFlags::NNAN) {
            conds.push(not(Term::FpIsNaN(Box::new(v.clone()))));
        }
        if fmf.contains(FastMathFlags::NINF) {
            conds.push(not(Term::FpIsInfinite(Box::new(v.clone()))));
        }
    }
    and_many(conds)
}

/// Non-poison conditions `nnan`/`ninf` impose on the result value.
pub fn fmf_output_np(fmf: FastMathFlags, out: &Term) -> Term {
    fmf_input_np(fmf, std::slice::from_ref(out))
}

// ---------------------------------------------------------------------------
// The pipeline
// ---------------------------------------------------------------------------

/// Encode one scalar FP operation with fast-math flags, rounding, and
/// denormal handling applied in the canonical order.
///
/// `inputs` are the scalar operand lanes with their own non-poison
/// conditions; `compute` receives the massaged input values plus a rounding
/// mode. `only_input` restricts `nnan`/`ninf` to the inputs (conversions
/// whose flags speak about the source only).
#[allow(clippy::too_many_arguments)]
pub fn fm_poison(
    s: &mut State,
    op_name: &str,
    fmf: FastMathFlags,
    rounding: FpRounding,
    denormal: FpDenormalKind,
    fmt: FloatFormat,
    inputs: &[StateValue],
    compute: &dyn Fn(&[Term], Term) -> Term,
    only_input: bool,
) -> StateValue {
    let mut np = and_many(inputs.iter().map(|i| i.non_poison.clone()).collect());
    let raw: Vec<Term> = inputs.iter().map(|i| i.value.clone()).collect();
    np = and2(np, fmf_input_np(fmf, &raw));

    let mut vals = raw;
    if fmf.contains(FastMathFlags::NSZ) {
        vals = vals
            .into_iter()
            .map(|v| nsz_scramble(s, fmt, v))
            .collect();
    }
    vals = vals
        .into_iter()
        .map(|v| handle_subnormal(denormal, fmt, v))
        .collect();

    let (mut value, rm_np) = round_value(s, rounding, &|mode| compute(&vals, mode));
    np = and2(np, rm_np);

    if fmf.has_approx_flags() {
        trace!(op = op_name, "fast-math value rewrite approximated");
        s.does_approximation(op_name);
        value = Term::App(format!("fp.{op_name}.approx"), vals.clone());
    }

    if !only_input {
        np = and2(np, fmf_output_np(fmf, &value));
        if fmf.contains(FastMathFlags::NSZ) {
            value = nsz_scramble(s, fmt, value);
        }
        value = handle_subnormal(denormal, fmt, value);
    }

    StateValue::new(value, np)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::UfMemory;
    use crate::ty::Type;
    use crate::value::Function;
    use tv_smtlib::build::var;
    use tv_smtlib::fpops::FloatFormat;

    fn state(f: &Function) -> State<'_> {
        State::new(f, Box::new(UfMemory::new()))
    }

    fn fadd(vals: &[Term], mode: Term) -> Term {
        Term::FpAdd(
            Box::new(mode),
            Box::new(vals[0].clone()),
            Box::new(vals[1].clone()),
        )
    }

    #[test]
    fn ieee_denormals_pass_through() {
        let v = var("x");
        assert_eq!(
            handle_subnormal(FpDenormalKind::Ieee, FloatFormat::FLOAT, v.clone()),
            v
        );
    }

    #[test]
    fn flush_modes_produce_selects() {
        let v = var("x");
        let pz = handle_subnormal(FpDenormalKind::PositiveZero, FloatFormat::FLOAT, v.clone());
        assert!(matches!(pz, Term::Ite(..)));
        let ps = handle_subnormal(FpDenormalKind::PreserveSign, FloatFormat::FLOAT, v);
        assert!(matches!(ps, Term::Ite(..)));
        assert_ne!(pz, ps);
    }

    #[test]
    fn default_rounding_is_nearest_even() {
        let f = Function::new("f", Type::Void);
        let mut s = state(&f);
        let (v, np) = round_value(&mut s, FpRounding::Default, &|mode| {
            Term::FpSqrt(Box::new(mode), Box::new(var("x")))
        });
        assert!(np.is_true());
        assert_eq!(
            v,
            Term::FpSqrt(Box::new(rm(RoundingMode::Rne)), Box::new(var("x")))
        );
    }

    #[test]
    fn fixed_rounding_constrains_the_register() {
        let f = Function::new("f", Type::Void);
        let mut s = state(&f);
        let (_, np) = round_value(&mut s, FpRounding::Fixed(RoundingMode::Rtp), &|mode| {
            Term::FpSqrt(Box::new(mode), Box::new(var("x")))
        });
        assert!(!np.is_true());
    }

    #[test]
    fn dynamic_rounding_selects_over_all_modes() {
        let f = Function::new("f", Type::Void);
        let mut s = state(&f);
        let (v, np) = round_value(&mut s, FpRounding::Dynamic, &|mode| {
            Term::FpSqrt(Box::new(mode), Box::new(var("x")))
        });
        assert!(np.is_true());
        // four selects wrapping the RTZ base case
        let mut depth = 0;
        let mut cur = &v;
        while let Term::Ite(_, _, e) = cur {
            depth += 1;
            cur = e;
        }
        assert_eq!(depth, 4);
    }

    #[test]
    fn nnan_poisons_nan_inputs() {
        let np = fmf_input_np(FastMathFlags::NNAN, &[var("x")]);
        assert_eq!(np, not(Term::FpIsNaN(Box::new(var("x")))));
        assert!(fmf_input_np(FastMathFlags::none(), &[var("x")]).is_true());
    }

    #[test]
    fn plain_add_has_no_extra_conditions() {
        let f = Function::new("f", Type::Void);
        let mut s = state(&f);
        let sv = fm_poison(
            &mut s,
            "fadd",
            FastMathFlags::none(),
            FpRounding::Default,
            FpDenormalKind::Ieee,
            FloatFormat::FLOAT,
            &[
                StateValue::defined(var("a")),
                StateValue::defined(var("b")),
            ],
            &fadd,
            false,
        );
        assert!(sv.non_poison.is_true());
        assert_eq!(sv.value, fadd(&[var("a"), var("b")], rm(RoundingMode::Rne)));
        assert!(s.approximations().is_empty());
    }

    #[test]
    fn reassoc_rewrites_the_value_and_marks_approximation() {
        let f = Function::new("f", Type::Void);
        let mut s = state(&f);
        let sv = fm_poison(
            &mut s,
            "fadd",
            FastMathFlags::REASSOC,
            FpRounding::Default,
            FpDenormalKind::Ieee,
            FloatFormat::FLOAT,
            &[
                StateValue::defined(var("a")),
                StateValue::defined(var("b")),
            ],
            &fadd,
            false,
        );
        assert_eq!(
            sv.value,
            Term::App("fp.fadd.approx".into(), vec![var("a"), var("b")])
        );
        assert!(s.approximations().contains("fadd"));
    }

    #[test]
    fn nsz_scrambles_zeros_consistently() {
        let f = Function::new("f", Type::Void);
        let mut s = state(&f);
        let a = nsz_scramble(&mut s, FloatFormat::FLOAT, var("x"));
        let b = nsz_scramble(&mut s, FloatFormat::FLOAT, var("x"));
        assert_eq!(a, b);
    }
}
