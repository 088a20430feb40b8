//! Conversion instructions.
//!
//! Integer casts are lane-wise. Bitcast stays lane-wise as long as the two
//! layouts agree on lane boundaries (a ptr-vector to ptr-vector cast is a
//! plain no-op); only when boundaries move does it reinterpret the flattened
//! bit pattern of the whole value, and poison then spreads to every result
//! lane.

use tv_smtlib::build::{self, and2, eq, extract, not, pack, sext, sge, zext};
use tv_smtlib::bvops::zext_or_trunc;
use tv_smtlib::{RoundingMode, Term};

use crate::attrs::{FastMathFlags, FpExceptions, FpRounding};
use crate::fp::{fm_poison, round_value};
use crate::instr::{fp_fmt, map_lanes, rauw_id};
use crate::state::State;
use crate::ty::{all_constraints, Type};
use crate::value::{np_all, Function, StateValue, ValueId};

// ---------------------------------------------------------------------------
// Integer and pointer conversions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvKind {
    SExt,
    /// `nneg` makes a set sign bit poison.
    ZExt { nneg: bool },
    /// The wrap flags make a lossy truncation poison.
    Trunc { nsw: bool, nuw: bool },
    BitCast,
    PtrToInt,
    IntToPtr,
}

impl ConvKind {
    fn name(self) -> &'static str {
        match self {
            ConvKind::SExt => "sext",
            ConvKind::ZExt { .. } => "zext",
            ConvKind::Trunc { .. } => "trunc",
            ConvKind::BitCast => "bitcast",
            ConvKind::PtrToInt => "ptrtoint",
            ConvKind::IntToPtr => "inttoptr",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub kind: ConvKind,
    pub a: ValueId,
}

impl Conversion {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.a]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.a, from, to);
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        let aty = f.ty(self.a);
        match self.kind {
            ConvKind::SExt | ConvKind::ZExt { .. } => all_constraints(vec![
                ty.enforce_int_or_vector_int(),
                aty.enforce_int_or_vector_int(),
                ty.enforce_same_shape(aty),
                Term::BoolLit(ty.scalar_bits() > aty.scalar_bits()),
            ]),
            ConvKind::Trunc { .. } => all_constraints(vec![
                ty.enforce_int_or_vector_int(),
                aty.enforce_int_or_vector_int(),
                ty.enforce_same_shape(aty),
                Term::BoolLit(ty.scalar_bits() < aty.scalar_bits()),
            ]),
            ConvKind::BitCast => ty.enforce_same_bits(aty),
            ConvKind::PtrToInt => all_constraints(vec![
                ty.enforce_int_or_vector_int(),
                aty.enforce_ptr_or_vector_ptr(),
                ty.enforce_same_shape(aty),
            ]),
            ConvKind::IntToPtr => all_constraints(vec![
                ty.enforce_ptr_or_vector_ptr(),
                aty.enforce_int_or_vector_int(),
                ty.enforce_same_shape(aty),
            ]),
        }
    }

    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        let a = s.eval(self.a);
        let from_ty = s.function().ty(self.a).clone();
        if self.kind == ConvKind::BitCast {
            if *ty == from_ty {
                // same layout, nothing to reinterpret
                return a;
            }
            if lane_aligned(ty, &from_ty) {
                let mut lanes = Vec::with_capacity(ty.num_children() as usize);
                for i in 0..ty.num_children() {
                    let lane = a.extract_lane(i);
                    if ty.is_padding(i) {
                        lanes.push(lane);
                        continue;
                    }
                    let bits = from_ty.child(i).to_int_term(&lane.value);
                    lanes.push(StateValue::new(
                        ty.child(i).from_int_term(&bits),
                        lane.non_poison,
                    ));
                }
                return StateValue::aggregate(lanes);
            }
            let bits = from_ty.to_int_term(&a.value);
            let value = ty.from_int_term(&bits);
            let np = splat_np(ty, np_all(&from_ty, &a.non_poison));
            return StateValue::new(value, np);
        }
        let kind = self.kind;
        let from_bits = from_ty.scalar_bits();
        map_lanes(s, ty, &[a], &mut |s, elem, ins| {
            let v = ins[0].value.clone();
            let mut np = ins[0].non_poison.clone();
            let to = elem.bits();
            let value = match kind {
                ConvKind::SExt => sext(to - from_bits, v),
                ConvKind::ZExt { nneg } => {
                    if nneg {
                        np = and2(np, sge(v.clone(), build::bv_zero(from_bits)));
                    }
                    zext(to - from_bits, v)
                }
                ConvKind::Trunc { nsw, nuw } => {
                    let t = extract(to - 1, 0, v.clone());
                    if nuw {
                        np = and2(np, eq(zext(from_bits - to, t.clone()), v.clone()));
                    }
                    if nsw {
                        np = and2(np, eq(sext(from_bits - to, t.clone()), v));
                    }
                    t
                }
                ConvKind::PtrToInt => {
                    let int = s.memory.ptr_to_int(&v);
                    zext_or_trunc(int, crate::ty::POINTER_BITS, to)
                }
                ConvKind::IntToPtr => {
                    let wide = zext_or_trunc(v, from_bits, crate::ty::POINTER_BITS);
                    s.memory.int_to_ptr(&wide)
                }
                ConvKind::BitCast => unreachable!("handled above"),
            };
            StateValue::new(value, np)
        })
    }
}

impl std::fmt::Display for Conversion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind.name(), self.a)
    }
}

/// Lane boundaries of the two layouts coincide, so a bitcast can convert
/// lane by lane and keep non-poison lane-granular.
fn lane_aligned(to: &Type, from: &Type) -> bool {
    to.is_aggregate()
        && from.is_aggregate()
        && to.num_children() == from.num_children()
        && (0..to.num_children()).all(|i| {
            !to.child(i).is_aggregate()
                && !from.child(i).is_aggregate()
                && to.child(i).bits() == from.child(i).bits()
                && to.is_padding(i) == from.is_padding(i)
        })
}

/// Replicate a collapsed non-poison bit over the result's lane structure.
fn splat_np(ty: &Type, cond: Term) -> Term {
    if !ty.is_aggregate() {
        return cond;
    }
    let lanes = (0..ty.num_children())
        .map(|i| splat_np(ty.child(i), cond.clone()))
        .collect();
    pack(lanes)
}

// ---------------------------------------------------------------------------
// FP conversions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpConvKind {
    FpExt,
    FpTrunc,
    /// Poison when the truncated value does not fit the target width.
    FpToSInt,
    FpToUInt,
    SIntToFp,
    UIntToFp,
}

impl FpConvKind {
    fn name(self) -> &'static str {
        match self {
            FpConvKind::FpExt => "fpext",
            FpConvKind::FpTrunc => "fptrunc",
            FpConvKind::FpToSInt => "fptosi",
            FpConvKind::FpToUInt => "fptoui",
            FpConvKind::SIntToFp => "sitofp",
            FpConvKind::UIntToFp => "uitofp",
        }
    }

    fn from_float(self) -> bool {
        matches!(
            self,
            FpConvKind::FpExt | FpConvKind::FpTrunc | FpConvKind::FpToSInt | FpConvKind::FpToUInt
        )
    }

    fn to_float(self) -> bool {
        !matches!(self, FpConvKind::FpToSInt | FpConvKind::FpToUInt)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FpConversion {
    pub kind: FpConvKind,
    pub a: ValueId,
    pub fmf: FastMathFlags,
    pub rounding: FpRounding,
    pub exceptions: FpExceptions,
}

impl FpConversion {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.a]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.a, from, to);
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        let aty = f.ty(self.a);
        let src = if self.kind.from_float() {
            aty.enforce_float_or_vector_float()
        } else {
            aty.enforce_int_or_vector_int()
        };
        let dst = if self.kind.to_float() {
            ty.enforce_float_or_vector_float()
        } else {
            ty.enforce_int_or_vector_int()
        };
        all_constraints(vec![src, dst, ty.enforce_same_shape(aty)])
    }

    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        let a = s.eval(self.a);
        let denormal = s.function().attrs.denormal;
        let (kind, fmf, rounding) = (self.kind, self.fmf, self.rounding);
        let src_ty = s.function().ty(self.a).clone();
        map_lanes(s, ty, &[a], &mut |s, elem, ins| match kind {
            FpConvKind::FpExt | FpConvKind::FpTrunc => {
                let fmt = fp_fmt(elem);
                fm_poison(
                    s,
                    kind.name(),
                    fmf,
                    rounding,
                    denormal,
                    fmt,
                    ins,
                    &|vals, mode| {
                        Term::FpToFp(
                            fmt.exp_bits,
                            fmt.sig_bits,
                            Box::new(mode),
                            Box::new(vals[0].clone()),
                        )
                    },
                    // fpext is exact; flags speak about the input value
                    kind == FpConvKind::FpExt,
                )
            }
            FpConvKind::FpToSInt | FpConvKind::FpToUInt => {
                let w = elem.bits();
                let src_fmt = fp_fmt(src_ty.child(0));
                let v = ins[0].value.clone();
                let signed = kind == FpConvKind::FpToSInt;
                let rtz = tv_smtlib::fpops::rm(RoundingMode::Rtz);
                let conv = if signed {
                    Term::FpToSBv(w, Box::new(rtz.clone()), Box::new(v.clone()))
                } else {
                    Term::FpToUBv(w, Box::new(rtz.clone()), Box::new(v.clone()))
                };
                // in range iff the truncated value survives a round trip
                let back = if signed {
                    Term::SBvToFp(
                        src_fmt.exp_bits,
                        src_fmt.sig_bits,
                        Box::new(rtz.clone()),
                        Box::new(conv.clone()),
                    )
                } else {
                    Term::UBvToFp(
                        src_fmt.exp_bits,
                        src_fmt.sig_bits,
                        Box::new(rtz.clone()),
                        Box::new(conv.clone()),
                    )
                };
                let truncated =
                    Term::FpRoundToIntegral(Box::new(rtz), Box::new(v.clone()));
                let in_range = and2(
                    not(Term::FpIsNaN(Box::new(v.clone()))),
                    Term::FpEq(Box::new(back), Box::new(truncated)),
                );
                StateValue::new(conv, and2(ins[0].non_poison.clone(), in_range))
            }
            FpConvKind::SIntToFp | FpConvKind::UIntToFp => {
                let fmt = fp_fmt(elem);
                let v = ins[0].value.clone();
                let signed = kind == FpConvKind::SIntToFp;
                let (value, rm_np) = round_value(s, rounding, &|mode| {
                    if signed {
                        Term::SBvToFp(
                            fmt.exp_bits,
                            fmt.sig_bits,
                            Box::new(mode),
                            Box::new(v.clone()),
                        )
                    } else {
                        Term::UBvToFp(
                            fmt.exp_bits,
                            fmt.sig_bits,
                            Box::new(mode),
                            Box::new(v.clone()),
                        )
                    }
                });
                StateValue::new(value, and2(ins[0].non_poison.clone(), rm_np))
            }
        })
    }
}

impl std::fmt::Display for FpConversion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}{}", self.kind.name(), self.fmf, self.a)
    }
}
