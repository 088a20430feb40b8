//! Target-specific vector intrinsics.
//!
//! The ops with simple lane semantics are encoded exactly, including the
//! hardware's out-of-range shift behavior (zero or sign fill, never UB or
//! poison). Everything else becomes an uninterpreted function per output
//! lane and is flagged as an approximation.

use tv_smtlib::build::{
    and2, and_many, ashr, bv, bv_ones, bv_smax, bv_smin, bv_zero, bvadd, bvand, bvmul, bvneg, eq,
    extract, ite, lshr, sext, shl, slt, tru, ult, zext,
};
use tv_smtlib::bvops::{sadd_sat, smax, smin, zext_or_trunc};
use tv_smtlib::Term;

use crate::instr::{map_lanes, rauw_id};
use crate::state::State;
use crate::ty::{all_constraints, Type};
use crate::value::{np_all, Function, StateValue, ValueId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum X86Op {
    /// Unsigned round-up average (`pavgb`/`pavgw`).
    PAvg,
    /// Negate/zero/keep `a` by the sign of `b` (`psignb`/`psignw`/`psignd`).
    PSign,
    /// High half of the signed widening product (`pmulhw`).
    PMulHS,
    /// High half of the unsigned widening product (`pmulhuw`).
    PMulHU,
    /// Whole-register shifts: every lane shifted by the count in `b`'s first
    /// 64-bit lane; counts of at least the lane width fill with zeros
    /// (`psll`/`psrl`) or sign bits (`psra`).
    PSll,
    PSrl,
    PSra,
    /// Per-lane variable shifts (`psllv`/`psrlv`/`psrav`), same fill rules.
    PSllV,
    PSrlV,
    PSraV,
    /// Horizontal pair products: `a[2i]*b[2i] + a[2i+1]*b[2i+1]` widened to
    /// twice the input lane width (`pmaddwd`).
    PMaddWd,
    /// Unsigned-by-signed byte pair products with saturating 16-bit add
    /// (`pmaddubsw`).
    PMaddUbSw,
    /// Signed saturating narrow of `a` then `b` (`packsswb`/`packssdw`).
    PackSS,
    /// Unsigned saturating narrow of signed inputs (`packuswb`/`packusdw`).
    PackUS,
    /// Byte shuffle with zeroing on a set index MSB (`pshufb`).
    PShufB,
    /// Anything else: opaque, deterministic per input.
    Generic(String),
}

impl X86Op {
    fn name(&self) -> &str {
        match self {
            X86Op::PAvg => "pavg",
            X86Op::PSign => "psign",
            X86Op::PMulHS => "pmulh",
            X86Op::PMulHU => "pmulhu",
            X86Op::PSll => "psll",
            X86Op::PSrl => "psrl",
            X86Op::PSra => "psra",
            X86Op::PSllV => "psllv",
            X86Op::PSrlV => "psrlv",
            X86Op::PSraV => "psrav",
            X86Op::PMaddWd => "pmaddwd",
            X86Op::PMaddUbSw => "pmaddubsw",
            X86Op::PackSS => "packss",
            X86Op::PackUS => "packus",
            X86Op::PShufB => "pshufb",
            X86Op::Generic(n) => n,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct X86Intrin {
    pub op: X86Op,
    pub a: ValueId,
    pub b: Option<ValueId>,
}

impl X86Intrin {
    pub fn operands(&self) -> Vec<ValueId> {
        let mut ops = vec![self.a];
        ops.extend(self.b);
        ops
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.a, from, to);
        if let Some(b) = &mut self.b {
            rauw_id(b, from, to);
        }
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        let mut cs = vec![ty.enforce_vector(), f.ty(self.a).enforce_vector()];
        if let Some(b) = self.b {
            cs.push(f.ty(b).enforce_vector());
        }
        all_constraints(cs)
    }

    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        let a = s.eval(self.a);
        let b = self.b.map(|b| s.eval(b));
        let binary = |b: Option<StateValue>| -> StateValue {
            b.unwrap_or_else(|| panic!("{} is binary", self.op.name()))
        };
        match &self.op {
            X86Op::PAvg
            | X86Op::PSign
            | X86Op::PMulHS
            | X86Op::PMulHU
            | X86Op::PSllV
            | X86Op::PSrlV
            | X86Op::PSraV => {
                let op = self.op.clone();
                let inputs = [a, binary(b)];
                map_lanes(s, ty, &inputs, &mut |_, elem, ins| {
                    let w = elem.bits();
                    let (x, y) = (ins[0].value.clone(), ins[1].value.clone());
                    StateValue::new(
                        lane_op(&op, w, x, y),
                        and2(ins[0].non_poison.clone(), ins[1].non_poison.clone()),
                    )
                })
            }
            X86Op::PSll | X86Op::PSrl | X86Op::PSra => {
                self.encode_reg_shift(ty, &a, &binary(b))
            }
            X86Op::PMaddWd | X86Op::PMaddUbSw => self.encode_pmadd(s, ty, &a, &binary(b)),
            X86Op::PackSS | X86Op::PackUS => self.encode_pack(s, ty, &a, &binary(b)),
            X86Op::PShufB => self.encode_pshufb(ty, &a, &binary(b)),
            X86Op::Generic(name) => {
                let what = format!("x86.{name}");
                s.does_approximation(&what);
                let mut inputs = Vec::new();
                let aty = s.function().ty(self.a).clone();
                inputs.push(a.value.clone());
                let mut np = np_all(&aty, &a.non_poison);
                if let (Some(bsv), Some(bid)) = (&b, self.b) {
                    let bty = s.function().ty(bid).clone();
                    inputs.push(bsv.value.clone());
                    np = and2(np, np_all(&bty, &bsv.non_poison));
                }
                let n = ty.num_children();
                let lanes = (0..n)
                    .map(|i| {
                        let v = Term::App(format!("{what}.{i}"), inputs.clone());
                        StateValue::new(v, np.clone())
                    })
                    .collect();
                StateValue::aggregate(lanes)
            }
        }
    }

    /// All lanes shifted by the count packed in `b`'s first 64-bit lane.
    fn encode_reg_shift(&self, ty: &Type, a: &StateValue, b: &StateValue) -> StateValue {
        let n = ty.num_children();
        let w = ty.child(0).bits();
        let cnt = b.extract_lane(0);
        let in_range = ult(cnt.value.clone(), bv(w as i128, 64));
        let amt = zext_or_trunc(cnt.value.clone(), 64, w);
        let mut out = Vec::with_capacity(n as usize);
        for i in 0..n {
            let lane = a.extract_lane(i);
            let x = lane.value;
            let v = match self.op {
                X86Op::PSll => ite(in_range.clone(), shl(x, amt.clone()), bv_zero(w)),
                X86Op::PSrl => ite(in_range.clone(), lshr(x, amt.clone()), bv_zero(w)),
                X86Op::PSra => ite(
                    in_range.clone(),
                    ashr(x.clone(), amt.clone()),
                    ashr(x, bv(w as i128 - 1, w)),
                ),
                _ => unreachable!(),
            };
            out.push(StateValue::new(
                v,
                and2(lane.non_poison, cnt.non_poison.clone()),
            ));
        }
        StateValue::aggregate(out)
    }

    /// Adjacent-pair widening multiply-add. The result has half as many
    /// lanes as the inputs, each twice as wide.
    fn encode_pmadd(&self, s: &mut State, ty: &Type, a: &StateValue, b: &StateValue) -> StateValue {
        let n = ty.num_children();
        let in_ty = s.function().ty(self.a).clone();
        let w = in_ty.child(0).bits();
        let mut out = Vec::with_capacity(n as usize);
        for i in 0..n {
            let (a0, a1) = (a.extract_lane(2 * i), a.extract_lane(2 * i + 1));
            let (b0, b1) = (b.extract_lane(2 * i), b.extract_lane(2 * i + 1));
            let v = match self.op {
                X86Op::PMaddWd => bvadd(
                    bvmul(sext(w, a0.value.clone()), sext(w, b0.value.clone())),
                    bvmul(sext(w, a1.value.clone()), sext(w, b1.value.clone())),
                ),
                X86Op::PMaddUbSw => sadd_sat(
                    bvmul(zext(w, a0.value.clone()), sext(w, b0.value.clone())),
                    bvmul(zext(w, a1.value.clone()), sext(w, b1.value.clone())),
                    2 * w,
                ),
                _ => unreachable!(),
            };
            let np = and_many(vec![a0.non_poison, a1.non_poison, b0.non_poison, b1.non_poison]);
            out.push(StateValue::new(v, np));
        }
        StateValue::aggregate(out)
    }

    /// Saturating narrow: `a`'s lanes then `b`'s lanes, each clamped into
    /// the output lane's range.
    fn encode_pack(&self, s: &mut State, ty: &Type, a: &StateValue, b: &StateValue) -> StateValue {
        let in_ty = s.function().ty(self.a).clone();
        let n = in_ty.num_children();
        let w = in_ty.child(0).bits();
        let half = ty.child(0).bits();
        debug_assert_eq!(half * 2, w);
        let signed = self.op == X86Op::PackSS;
        let mut out = Vec::with_capacity(2 * n as usize);
        for src in [a, b] {
            for i in 0..n {
                let lane = src.extract_lane(i);
                let clamped = if signed {
                    let hi = sext(half, bv_smax(half));
                    let lo = sext(half, bv_smin(half));
                    smin(smax(lane.value, lo), hi)
                } else {
                    let hi = zext(half, bv_ones(half));
                    smin(smax(lane.value, bv_zero(w)), hi)
                };
                out.push(StateValue::new(extract(half - 1, 0, clamped), lane.non_poison));
            }
        }
        StateValue::aggregate(out)
    }

    fn encode_pshufb(&self, ty: &Type, a: &StateValue, idx: &StateValue) -> StateValue {
        let n = ty.num_children();
        let mut out = Vec::with_capacity(n as usize);
        for i in 0..n {
            let sel = idx.extract_lane(i);
            let low = bvand(sel.value.clone(), bv(n as i128 - 1, 8));
            let mut v = bv(0, 8);
            let mut np = tru();
            for j in 0..n {
                let m = eq(low.clone(), bv(j as i128, 8));
                let lane = a.extract_lane(j);
                v = ite(m.clone(), lane.value, v);
                np = ite(m, lane.non_poison, np);
            }
            // a set index MSB zeroes the output byte regardless of `a`
            let zeroed = slt(sel.value.clone(), bv(0, 8));
            out.push(StateValue::new(
                ite(zeroed.clone(), bv(0, 8), v),
                and2(sel.non_poison, ite(zeroed, tru(), np)),
            ));
        }
        StateValue::aggregate(out)
    }
}

/// Same-shape lane semantics for the elementwise ops.
fn lane_op(op: &X86Op, w: u32, x: Term, y: Term) -> Term {
    match op {
        X86Op::PAvg => {
            // (a + b + 1) >> 1, computed one bit wider
            let sum = bvadd(bvadd(zext(1, x), zext(1, y)), bv(1, w + 1));
            extract(w, 1, sum)
        }
        X86Op::PSign => ite(
            slt(y.clone(), bv(0, w)),
            bvneg(x.clone()),
            ite(eq(y.clone(), bv(0, w)), bv(0, w), x.clone()),
        ),
        X86Op::PMulHS => extract(2 * w - 1, w, bvmul(sext(w, x), sext(w, y))),
        X86Op::PMulHU => extract(2 * w - 1, w, bvmul(zext(w, x), zext(w, y))),
        X86Op::PSllV => ite(ult(y.clone(), bv(w as i128, w)), shl(x, y), bv_zero(w)),
        X86Op::PSrlV => ite(ult(y.clone(), bv(w as i128, w)), lshr(x, y), bv_zero(w)),
        X86Op::PSraV => ite(
            ult(y.clone(), bv(w as i128, w)),
            ashr(x.clone(), y),
            ashr(x, bv(w as i128 - 1, w)),
        ),
        _ => unreachable!(),
    }
}

impl std::fmt::Display for X86Intrin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x86.{} {}", self.op.name(), self.a)?;
        if let Some(b) = self.b {
            write!(f, ", {b}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::UfMemory;
    use crate::value::{Constant, Function};

    fn state(f: &Function) -> State<'_> {
        State::new(f, Box::new(UfMemory::new()))
    }

    fn vec_const(f: &mut Function, elem: Type, vals: &[i128]) -> ValueId {
        let ty = Type::vec_of(elem.clone(), vals.len() as u32);
        let lanes = vals
            .iter()
            .map(|&v| f.add_constant(elem.clone(), Constant::Int(v)))
            .collect();
        f.add_constant(ty, Constant::Agg(lanes))
    }

    #[test]
    fn pavg_rounds_up() {
        let vty = Type::vec_of(Type::Int(8), 2);
        let mut f = Function::new("f", vty.clone());
        let a = vec_const(&mut f, Type::Int(8), &[1, 1]);
        let b = vec_const(&mut f, Type::Int(8), &[2, 2]);
        let mut s = state(&f);
        let i = X86Intrin { op: X86Op::PAvg, a, b: Some(b) };
        let sv = i.encode(&mut s, &vty);
        // (1 + 2 + 1) >> 1 == 2
        assert_eq!(sv.extract_lane(0).value, bv(2, 8));
    }

    #[test]
    fn psign_zeroes_on_zero_control() {
        let vty = Type::vec_of(Type::Int(16), 2);
        let mut f = Function::new("f", vty.clone());
        let a = vec_const(&mut f, Type::Int(16), &[42, 42]);
        let b = vec_const(&mut f, Type::Int(16), &[0, -1]);
        let mut s = state(&f);
        let i = X86Intrin { op: X86Op::PSign, a, b: Some(b) };
        let sv = i.encode(&mut s, &vty);
        assert_eq!(sv.extract_lane(0).value, bv(0, 16));
        assert_eq!(sv.extract_lane(1).value, bv(-42, 16));
    }

    #[test]
    fn oversized_variable_shift_fills_with_zero() {
        let vty = Type::vec_of(Type::Int(16), 2);
        let mut f = Function::new("f", vty.clone());
        let a = vec_const(&mut f, Type::Int(16), &[-1, -1]);
        let b = vec_const(&mut f, Type::Int(16), &[1, 16]);
        let mut s = state(&f);
        let i = X86Intrin { op: X86Op::PSrlV, a, b: Some(b) };
        let sv = i.encode(&mut s, &vty);
        assert_eq!(sv.extract_lane(0).value, bv(0x7fff, 16));
        assert_eq!(sv.extract_lane(1).value, bv(0, 16));
    }

    #[test]
    fn oversized_arithmetic_shift_fills_with_sign() {
        let vty = Type::vec_of(Type::Int(16), 1);
        let mut f = Function::new("f", vty.clone());
        let a = vec_const(&mut f, Type::Int(16), &[-1]);
        let b = vec_const(&mut f, Type::Int(16), &[999]);
        let mut s = state(&f);
        let i = X86Intrin { op: X86Op::PSraV, a, b: Some(b) };
        let sv = i.encode(&mut s, &vty);
        assert_eq!(sv.extract_lane(0).value, bv(-1, 16));
    }

    #[test]
    fn whole_register_shift_takes_the_first_count_lane() {
        let vty = Type::vec_of(Type::Int(32), 2);
        let mut f = Function::new("f", vty.clone());
        let a = vec_const(&mut f, Type::Int(32), &[8, 16]);
        let b = vec_const(&mut f, Type::Int(64), &[2, 77]);
        let mut s = state(&f);
        let i = X86Intrin { op: X86Op::PSrl, a, b: Some(b) };
        let sv = i.encode(&mut s, &vty);
        assert_eq!(sv.extract_lane(0).value, bv(2, 32));
        assert_eq!(sv.extract_lane(1).value, bv(4, 32));
    }

    #[test]
    fn pmaddwd_sums_adjacent_products() {
        let out_ty = Type::vec_of(Type::Int(32), 1);
        let mut f = Function::new("f", out_ty.clone());
        let a = vec_const(&mut f, Type::Int(16), &[3, 4]);
        let b = vec_const(&mut f, Type::Int(16), &[10, 100]);
        let mut s = state(&f);
        let i = X86Intrin { op: X86Op::PMaddWd, a, b: Some(b) };
        let sv = i.encode(&mut s, &out_ty);
        assert_eq!(sv.extract_lane(0).value, bv(430, 32));
    }

    #[test]
    fn packss_saturates_out_of_range_lanes() {
        let out_ty = Type::vec_of(Type::Int(8), 4);
        let mut f = Function::new("f", out_ty.clone());
        let a = vec_const(&mut f, Type::Int(16), &[300, -300]);
        let b = vec_const(&mut f, Type::Int(16), &[5, -5]);
        let mut s = state(&f);
        let i = X86Intrin { op: X86Op::PackSS, a, b: Some(b) };
        let sv = i.encode(&mut s, &out_ty);
        assert_eq!(sv.extract_lane(0).value, bv(127, 8));
        assert_eq!(sv.extract_lane(1).value, bv(-128, 8));
        assert_eq!(sv.extract_lane(2).value, bv(5, 8));
    }

    #[test]
    fn packus_clamps_negatives_to_zero() {
        let out_ty = Type::vec_of(Type::Int(8), 2);
        let mut f = Function::new("f", out_ty.clone());
        let a = vec_const(&mut f, Type::Int(16), &[-7]);
        let b = vec_const(&mut f, Type::Int(16), &[400]);
        let mut s = state(&f);
        let i = X86Intrin { op: X86Op::PackUS, a, b: Some(b) };
        let sv = i.encode(&mut s, &out_ty);
        assert_eq!(sv.extract_lane(0).value, bv(0, 8));
        assert_eq!(sv.extract_lane(1).value, bv(-1, 8));
    }

    #[test]
    fn pshufb_msb_zeroes_the_lane() {
        let vty = Type::vec_of(Type::Int(8), 2);
        let mut f = Function::new("f", vty.clone());
        let a = vec_const(&mut f, Type::Int(8), &[7, 7]);
        let b = vec_const(&mut f, Type::Int(8), &[-128, 1]);
        let mut s = state(&f);
        let i = X86Intrin { op: X86Op::PShufB, a, b: Some(b) };
        let sv = i.encode(&mut s, &vty);
        assert_eq!(sv.extract_lane(0).value, bv(0, 8));
        assert!(sv.extract_lane(0).non_poison.is_true());
        assert_eq!(sv.extract_lane(1).value, bv(7, 8));
    }

    #[test]
    fn unknown_intrinsics_are_approximated() {
        let vty = Type::vec_of(Type::Int(32), 4);
        let mut f = Function::new("f", vty.clone());
        let a = vec_const(&mut f, Type::Int(32), &[0, 0, 0, 0]);
        let mut s = state(&f);
        let i = X86Intrin {
            op: X86Op::Generic("avx2.permd".into()),
            a,
            b: None,
        };
        let _ = i.encode(&mut s, &vty);
        assert!(s.approximations().contains("x86.avx2.permd"));
    }
}
