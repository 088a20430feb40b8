//! Floating-point arithmetic.
//!
//! Every kind here routes its lanes through [`crate::fp::fm_poison`], which
//! owns the fast-math, rounding, and denormal pipeline; this module only
//! says which SMT operation sits in the middle.

use tv_smtlib::fpops::{self, FloatFormat};
use tv_smtlib::{RoundingMode, Term};

use crate::attrs::{FastMathFlags, FpExceptions, FpRounding};
use crate::fp::fm_poison;
use crate::instr::{fp_fmt, map_lanes, rauw_id};
use crate::state::State;
use crate::ty::{all_constraints, Type};
use crate::value::{Function, StateValue, ValueId};

// ---------------------------------------------------------------------------
// FpBinOp
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpBinOpKind {
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
    /// IEEE minNum/maxNum: NaN loses against a number.
    FMin,
    FMax,
    /// NaN-propagating minimum/maximum with -0 < +0.
    FMinimum,
    FMaximum,
    CopySign,
}

impl FpBinOpKind {
    fn name(self) -> &'static str {
        match self {
            FpBinOpKind::FAdd => "fadd",
            FpBinOpKind::FSub => "fsub",
            FpBinOpKind::FMul => "fmul",
            FpBinOpKind::FDiv => "fdiv",
            FpBinOpKind::FRem => "frem",
            FpBinOpKind::FMin => "fmin",
            FpBinOpKind::FMax => "fmax",
            FpBinOpKind::FMinimum => "fminimum",
            FpBinOpKind::FMaximum => "fmaximum",
            FpBinOpKind::CopySign => "copysign",
        }
    }

    fn apply(self, fmt: FloatFormat, a: Term, b: Term, mode: Term) -> Term {
        let bx = Box::new;
        match self {
            FpBinOpKind::FAdd => Term::FpAdd(bx(mode), bx(a), bx(b)),
            FpBinOpKind::FSub => Term::FpSub(bx(mode), bx(a), bx(b)),
            FpBinOpKind::FMul => Term::FpMul(bx(mode), bx(a), bx(b)),
            FpBinOpKind::FDiv => Term::FpDiv(bx(mode), bx(a), bx(b)),
            FpBinOpKind::FRem => Term::FpRem(bx(a), bx(b)),
            FpBinOpKind::FMin => fpops::minnum(a, b),
            FpBinOpKind::FMax => fpops::maxnum(a, b),
            FpBinOpKind::FMinimum => fpops::minimum(a, b, fmt),
            FpBinOpKind::FMaximum => fpops::maximum(a, b, fmt),
            FpBinOpKind::CopySign => fpops::copysign(a, b, fmt),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FpBinOp {
    pub kind: FpBinOpKind,
    pub a: ValueId,
    pub b: ValueId,
    pub fmf: FastMathFlags,
    pub rounding: FpRounding,
    pub exceptions: FpExceptions,
}

impl FpBinOp {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.a, self.b]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.a, from, to);
        rauw_id(&mut self.b, from, to);
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        all_constraints(vec![
            ty.enforce_float_or_vector_float(),
            ty.enforce_same(f.ty(self.a)),
            ty.enforce_same(f.ty(self.b)),
        ])
    }

    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        let a = s.eval(self.a);
        let b = s.eval(self.b);
        let denormal = s.function().attrs.denormal;
        let (kind, fmf, rounding) = (self.kind, self.fmf, self.rounding);
        map_lanes(s, ty, &[a, b], &mut |s, elem, ins| {
            let fmt = fp_fmt(elem);
            fm_poison(
                s,
                kind.name(),
                fmf,
                rounding,
                denormal,
                fmt,
                ins,
                &|vals, mode| kind.apply(fmt, vals[0].clone(), vals[1].clone(), mode),
                false,
            )
        })
    }
}

impl std::fmt::Display for FpBinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}{}, {}", self.kind.name(), self.fmf, self.a, self.b)
    }
}

// ---------------------------------------------------------------------------
// FpUnaryOp
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpUnaryOpKind {
    FNeg,
    FAbs,
    Sqrt,
    Ceil,
    Floor,
    /// Round toward zero.
    Trunc,
    /// Round half away from zero.
    Round,
    RoundEven,
    /// Round using the instruction's rounding operand.
    Rint,
}

impl FpUnaryOpKind {
    fn name(self) -> &'static str {
        match self {
            FpUnaryOpKind::FNeg => "fneg",
            FpUnaryOpKind::FAbs => "fabs",
            FpUnaryOpKind::Sqrt => "sqrt",
            FpUnaryOpKind::Ceil => "ceil",
            FpUnaryOpKind::Floor => "floor",
            FpUnaryOpKind::Trunc => "trunc",
            FpUnaryOpKind::Round => "round",
            FpUnaryOpKind::RoundEven => "roundeven",
            FpUnaryOpKind::Rint => "rint",
        }
    }

    fn apply(self, v: Term, mode: Term) -> Term {
        let bx = Box::new;
        let fixed = |m: RoundingMode, v: Term| {
            Term::FpRoundToIntegral(bx(fpops::rm(m)), bx(v))
        };
        match self {
            FpUnaryOpKind::FNeg => Term::FpNeg(bx(v)),
            FpUnaryOpKind::FAbs => Term::FpAbs(bx(v)),
            FpUnaryOpKind::Sqrt => Term::FpSqrt(bx(mode), bx(v)),
            FpUnaryOpKind::Ceil => fixed(RoundingMode::Rtp, v),
            FpUnaryOpKind::Floor => fixed(RoundingMode::Rtn, v),
            FpUnaryOpKind::Trunc => fixed(RoundingMode::Rtz, v),
            FpUnaryOpKind::Round => fixed(RoundingMode::Rna, v),
            FpUnaryOpKind::RoundEven => fixed(RoundingMode::Rne, v),
            FpUnaryOpKind::Rint => Term::FpRoundToIntegral(bx(mode), bx(v)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FpUnaryOp {
    pub kind: FpUnaryOpKind,
    pub a: ValueId,
    pub fmf: FastMathFlags,
    pub rounding: FpRounding,
    pub exceptions: FpExceptions,
}

impl FpUnaryOp {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.a]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.a, from, to);
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        all_constraints(vec![
            ty.enforce_float_or_vector_float(),
            ty.enforce_same(f.ty(self.a)),
        ])
    }

    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        let a = s.eval(self.a);
        let denormal = s.function().attrs.denormal;
        let (kind, fmf, rounding) = (self.kind, self.fmf, self.rounding);
        map_lanes(s, ty, &[a], &mut |s, elem, ins| {
            let fmt = fp_fmt(elem);
            fm_poison(
                s,
                kind.name(),
                fmf,
                rounding,
                denormal,
                fmt,
                ins,
                &|vals, mode| kind.apply(vals[0].clone(), mode),
                false,
            )
        })
    }
}

impl std::fmt::Display for FpUnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}{}", self.kind.name(), self.fmf, self.a)
    }
}

// ---------------------------------------------------------------------------
// FpTernaryOp
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpTernaryOpKind {
    /// Fused multiply-add, rounded once.
    Fma,
    /// `llvm.fmuladd`: the target picks fused or separate rounding, so the
    /// encoding picks nondeterministically.
    FMulAdd,
}

impl FpTernaryOpKind {
    fn name(self) -> &'static str {
        match self {
            FpTernaryOpKind::Fma => "fma",
            FpTernaryOpKind::FMulAdd => "fmuladd",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FpTernaryOp {
    pub kind: FpTernaryOpKind,
    pub a: ValueId,
    pub b: ValueId,
    pub c: ValueId,
    pub fmf: FastMathFlags,
    pub rounding: FpRounding,
    pub exceptions: FpExceptions,
}

impl FpTernaryOp {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.a, self.b, self.c]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.a, from, to);
        rauw_id(&mut self.b, from, to);
        rauw_id(&mut self.c, from, to);
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        all_constraints(vec![
            ty.enforce_float_or_vector_float(),
            ty.enforce_same(f.ty(self.a)),
            ty.enforce_same(f.ty(self.b)),
            ty.enforce_same(f.ty(self.c)),
        ])
    }

    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        let a = s.eval(self.a);
        let b = s.eval(self.b);
        let c = s.eval(self.c);
        let denormal = s.function().attrs.denormal;
        let (kind, fmf, rounding) = (self.kind, self.fmf, self.rounding);
        let fused_choice = match kind {
            FpTernaryOpKind::FMulAdd => {
                Some(s.fresh_quant_var("fmuladd.fused", tv_smtlib::Sort::Bool))
            }
            FpTernaryOpKind::Fma => None,
        };
        map_lanes(s, ty, &[a, b, c], &mut |s, elem, ins| {
            let fmt = fp_fmt(elem);
            let fused_choice = fused_choice.clone();
            fm_poison(
                s,
                kind.name(),
                fmf,
                rounding,
                denormal,
                fmt,
                ins,
                &move |vals, mode| {
                    let bx = Box::new;
                    let fused = Term::FpFma(
                        bx(mode.clone()),
                        bx(vals[0].clone()),
                        bx(vals[1].clone()),
                        bx(vals[2].clone()),
                    );
                    match &fused_choice {
                        None => fused,
                        Some(choice) => {
                            let mul = Term::FpMul(
                                bx(mode.clone()),
                                bx(vals[0].clone()),
                                bx(vals[1].clone()),
                            );
                            let separate =
                                Term::FpAdd(bx(mode), bx(mul), bx(vals[2].clone()));
                            tv_smtlib::build::ite(choice.clone(), fused, separate)
                        }
                    }
                },
                false,
            )
        })
    }
}

impl std::fmt::Display for FpTernaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}{}, {}, {}",
            self.kind.name(),
            self.fmf,
            self.a,
            self.b,
            self.c
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::ParamAttrs;
    use crate::memory::UfMemory;
    use crate::value::Function;
    use tv_smtlib::build::var;

    fn setup() -> (Function, ValueId, ValueId) {
        let mut f = Function::new("f", Type::Float(FloatFormat::FLOAT));
        let mut nu = ParamAttrs::default();
        nu.noundef = true;
        let a = f.add_input("a", Type::Float(FloatFormat::FLOAT), nu.clone());
        let b = f.add_input("b", Type::Float(FloatFormat::FLOAT), nu);
        (f, a, b)
    }

    fn state(f: &Function) -> State<'_> {
        State::new(f, Box::new(UfMemory::new()))
    }

    fn fadd(f: &Function, a: ValueId, b: ValueId, fmf: FastMathFlags) -> FpBinOp {
        let _ = f;
        FpBinOp {
            kind: FpBinOpKind::FAdd,
            a,
            b,
            fmf,
            rounding: FpRounding::Default,
            exceptions: FpExceptions::Ignore,
        }
    }

    #[test]
    fn plain_fadd_rounds_to_nearest_even() {
        let (f, a, b) = setup();
        let mut s = state(&f);
        let sv = fadd(&f, a, b, FastMathFlags::none())
            .encode(&mut s, &Type::Float(FloatFormat::FLOAT));
        assert_eq!(
            sv.value,
            Term::FpAdd(
                Box::new(fpops::rm(RoundingMode::Rne)),
                Box::new(var("%a")),
                Box::new(var("%b")),
            )
        );
        assert!(sv.non_poison.is_true());
    }

    #[test]
    fn nnan_fadd_constrains_inputs_and_output() {
        let (f, a, b) = setup();
        let mut s = state(&f);
        let sv = fadd(&f, a, b, FastMathFlags::NNAN)
            .encode(&mut s, &Type::Float(FloatFormat::FLOAT));
        assert!(!sv.non_poison.is_true());
        // no UB and no approximation; nnan is pure poison
        assert!(s.approximations().is_empty());
        assert!(s.finish().ub.is_true());
    }

    #[test]
    fn nsz_introduces_nondeterminism_without_ub() {
        let (f, a, b) = setup();
        let mut s = state(&f);
        let sv = fadd(&f, a, b, FastMathFlags::NSZ)
            .encode(&mut s, &Type::Float(FloatFormat::FLOAT));
        assert!(sv.non_poison.is_true());
        let enc = s.finish();
        assert!(enc.ub.is_true());
        assert!(enc.quant_vars.iter().any(|(n, _)| n.starts_with("anyzero")));
    }

    #[test]
    fn fneg_keeps_the_value_shape() {
        let (f, a, _) = setup();
        let mut s = state(&f);
        let i = FpUnaryOp {
            kind: FpUnaryOpKind::FNeg,
            a,
            fmf: FastMathFlags::none(),
            rounding: FpRounding::Default,
            exceptions: FpExceptions::Ignore,
        };
        let sv = i.encode(&mut s, &Type::Float(FloatFormat::FLOAT));
        assert_eq!(sv.value, Term::FpNeg(Box::new(var("%a"))));
    }

    #[test]
    fn fma_rounds_once() {
        let (mut f, a, b) = setup();
        let c = f.add_input("c", Type::Float(FloatFormat::FLOAT), ParamAttrs::default());
        let mut s = state(&f);
        let i = FpTernaryOp {
            kind: FpTernaryOpKind::Fma,
            a,
            b,
            c,
            fmf: FastMathFlags::none(),
            rounding: FpRounding::Default,
            exceptions: FpExceptions::Ignore,
        };
        let sv = i.encode(&mut s, &Type::Float(FloatFormat::FLOAT));
        assert!(matches!(sv.value, Term::FpFma(..)));
    }

    #[test]
    fn fmuladd_chooses_between_fused_and_separate() {
        let (mut f, a, b) = setup();
        let c = f.add_input("c", Type::Float(FloatFormat::FLOAT), ParamAttrs::default());
        let mut s = state(&f);
        let i = FpTernaryOp {
            kind: FpTernaryOpKind::FMulAdd,
            a,
            b,
            c,
            fmf: FastMathFlags::none(),
            rounding: FpRounding::Default,
            exceptions: FpExceptions::Ignore,
        };
        let sv = i.encode(&mut s, &Type::Float(FloatFormat::FLOAT));
        assert!(matches!(sv.value, Term::Ite(..)));
    }

    #[test]
    fn vector_fp_ops_map_lanes() {
        let mut f = Function::new("f", Type::Void);
        let ty = Type::vec_of(Type::Float(FloatFormat::FLOAT), 2);
        let a = f.add_input("a", ty.clone(), ParamAttrs::default());
        let b = f.add_input("b", ty.clone(), ParamAttrs::default());
        let mut s = state(&f);
        let sv = fadd(&f, a, b, FastMathFlags::none()).encode(&mut s, &ty);
        assert_ne!(sv.extract_lane(0).value, sv.extract_lane(1).value);
    }
}
