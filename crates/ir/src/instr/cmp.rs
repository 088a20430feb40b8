//! Comparison instructions.

use tv_smtlib::build::{
    self, and2, bool_to_bv1, eq, ite, ne, not, or2, sge, sgt, sle, slt, uge, ugt, ule, ult,
};
use tv_smtlib::{Sort, Term};

use crate::attrs::FastMathFlags;
use crate::fp::fmf_input_np;
use crate::instr::{map_lanes, rauw_id};
use crate::state::State;
use crate::ty::{all_constraints, Type};
use crate::value::{Function, StateValue, ValueId};

// ---------------------------------------------------------------------------
// ICmp
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ICmpCond {
    Eq,
    Ne,
    SLE,
    SLT,
    SGE,
    SGT,
    ULE,
    ULT,
    UGE,
    UGT,
    /// Unconstrained predicate: a nondeterministic choice over the ten
    /// concrete conditions. Used when relating functions that differ only
    /// in the predicate.
    Any,
}

impl ICmpCond {
    fn name(self) -> &'static str {
        match self {
            ICmpCond::Eq => "eq",
            ICmpCond::Ne => "ne",
            ICmpCond::SLE => "sle",
            ICmpCond::SLT => "slt",
            ICmpCond::SGE => "sge",
            ICmpCond::SGT => "sgt",
            ICmpCond::ULE => "ule",
            ICmpCond::ULT => "ult",
            ICmpCond::UGE => "uge",
            ICmpCond::UGT => "ugt",
            ICmpCond::Any => "any",
        }
    }

    fn apply(self, a: Term, b: Term) -> Term {
        match self {
            ICmpCond::Eq => eq(a, b),
            ICmpCond::Ne => ne(a, b),
            ICmpCond::SLE => sle(a, b),
            ICmpCond::SLT => slt(a, b),
            ICmpCond::SGE => sge(a, b),
            ICmpCond::SGT => sgt(a, b),
            ICmpCond::ULE => ule(a, b),
            ICmpCond::ULT => ult(a, b),
            ICmpCond::UGE => uge(a, b),
            ICmpCond::UGT => ugt(a, b),
            ICmpCond::Any => unreachable!("expanded by the caller"),
        }
    }

    fn is_relational(self) -> bool {
        !matches!(self, ICmpCond::Eq | ICmpCond::Ne)
    }

    const ALL_CONCRETE: [ICmpCond; 10] = [
        ICmpCond::Eq,
        ICmpCond::Ne,
        ICmpCond::SLE,
        ICmpCond::SLT,
        ICmpCond::SGE,
        ICmpCond::SGT,
        ICmpCond::ULE,
        ICmpCond::ULT,
        ICmpCond::UGE,
        ICmpCond::UGT,
    ];
}

/// How pointer operands are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PtrCmpMode {
    /// Compare the numeric pointer value.
    #[default]
    Integral,
    /// Relational comparison of pointers into different blocks is poison.
    Provenance,
    /// Compare block offsets only.
    OffsetOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ICmp {
    pub cond: ICmpCond,
    pub a: ValueId,
    pub b: ValueId,
    pub ptr_mode: PtrCmpMode,
}

impl ICmp {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.a, self.b]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.a, from, to);
        rauw_id(&mut self.b, from, to);
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        let aty = f.ty(self.a);
        let elem_ok = match aty {
            Type::Int(_) | Type::Ptr => true,
            Type::Vector(elem, _) => elem.is_int() || elem.is_ptr(),
            _ => false,
        };
        all_constraints(vec![
            Term::BoolLit(elem_ok),
            aty.enforce_same(f.ty(self.b)),
            Term::BoolLit(ty.scalar_bits() == 1),
            ty.enforce_same_shape(aty),
        ])
    }

    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        let a = s.eval(self.a);
        let b = s.eval(self.b);
        let aty = s.function().ty(self.a).clone();
        let any_sel = match self.cond {
            ICmpCond::Any => Some(s.fresh_quant_var("icmp.cond", Sort::BitVec(4))),
            _ => None,
        };
        let (cond, ptr_mode) = (self.cond, self.ptr_mode);
        let is_ptr = aty.child(0).is_ptr();
        map_lanes(s, ty, &[a, b], &mut |s, _, ins| {
            let mut np = and2(ins[0].non_poison.clone(), ins[1].non_poison.clone());
            let (av, bv) = if is_ptr {
                match ptr_mode {
                    PtrCmpMode::Integral => (
                        s.memory.ptr_to_int(&ins[0].value),
                        s.memory.ptr_to_int(&ins[1].value),
                    ),
                    PtrCmpMode::OffsetOnly => (
                        s.memory.ptr_offset(&ins[0].value),
                        s.memory.ptr_offset(&ins[1].value),
                    ),
                    PtrCmpMode::Provenance => {
                        if cond.is_relational() || cond == ICmpCond::Any {
                            let same_block = eq(
                                s.memory.block_id(&ins[0].value),
                                s.memory.block_id(&ins[1].value),
                            );
                            np = and2(np, same_block);
                        }
                        (
                            s.memory.ptr_to_int(&ins[0].value),
                            s.memory.ptr_to_int(&ins[1].value),
                        )
                    }
                }
            } else {
                (ins[0].value.clone(), ins[1].value.clone())
            };
            let bit = match &any_sel {
                None => cond.apply(av, bv),
                Some(sel) => {
                    let mut out = build::fls();
                    for (i, c) in ICmpCond::ALL_CONCRETE.iter().enumerate() {
                        out = ite(
                            eq(sel.clone(), build::bv(i as i128, 4)),
                            c.apply(av.clone(), bv.clone()),
                            out,
                        );
                    }
                    out
                }
            };
            StateValue::new(bool_to_bv1(bit), np)
        })
    }
}

impl std::fmt::Display for ICmp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "icmp {} {}, {}", self.cond.name(), self.a, self.b)
    }
}

// ---------------------------------------------------------------------------
// FCmp
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum FCmpCond {
    False,
    OEQ,
    OGT,
    OGE,
    OLT,
    OLE,
    ONE,
    ORD,
    UEQ,
    UGT,
    UGE,
    ULT,
    ULE,
    UNE,
    UNO,
    True,
}

impl FCmpCond {
    fn name(self) -> &'static str {
        match self {
            FCmpCond::False => "false",
            FCmpCond::OEQ => "oeq",
            FCmpCond::OGT => "ogt",
            FCmpCond::OGE => "oge",
            FCmpCond::OLT => "olt",
            FCmpCond::OLE => "ole",
            FCmpCond::ONE => "one",
            FCmpCond::ORD => "ord",
            FCmpCond::UEQ => "ueq",
            FCmpCond::UGT => "ugt",
            FCmpCond::UGE => "uge",
            FCmpCond::ULT => "ult",
            FCmpCond::ULE => "ule",
            FCmpCond::UNE => "une",
            FCmpCond::UNO => "uno",
            FCmpCond::True => "true",
        }
    }

    fn apply(self, a: Term, b: Term) -> Term {
        let bx = Box::new;
        let unordered = or2(
            Term::FpIsNaN(bx(a.clone())),
            Term::FpIsNaN(bx(b.clone())),
        );
        let ordered = not(unordered.clone());
        let cmp = |mk: fn(Box<Term>, Box<Term>) -> Term| mk(bx(a.clone()), bx(b.clone()));
        match self {
            FCmpCond::False => build::fls(),
            FCmpCond::True => build::tru(),
            FCmpCond::ORD => ordered,
            FCmpCond::UNO => unordered,
            FCmpCond::OEQ => cmp(Term::FpEq),
            FCmpCond::OGT => cmp(Term::FpGt),
            FCmpCond::OGE => cmp(Term::FpGeq),
            FCmpCond::OLT => cmp(Term::FpLt),
            FCmpCond::OLE => cmp(Term::FpLeq),
            FCmpCond::ONE => and2(ordered, not(cmp(Term::FpEq))),
            FCmpCond::UEQ => or2(unordered, cmp(Term::FpEq)),
            FCmpCond::UGT => or2(unordered, cmp(Term::FpGt)),
            FCmpCond::UGE => or2(unordered, cmp(Term::FpGeq)),
            FCmpCond::ULT => or2(unordered, cmp(Term::FpLt)),
            FCmpCond::ULE => or2(unordered, cmp(Term::FpLeq)),
            FCmpCond::UNE => or2(unordered, not(cmp(Term::FpEq))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FCmp {
    pub cond: FCmpCond,
    pub a: ValueId,
    pub b: ValueId,
    pub fmf: FastMathFlags,
}

impl FCmp {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.a, self.b]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.a, from, to);
        rauw_id(&mut self.b, from, to);
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        let aty = f.ty(self.a);
        all_constraints(vec![
            aty.enforce_float_or_vector_float(),
            aty.enforce_same(f.ty(self.b)),
            Term::BoolLit(ty.scalar_bits() == 1),
            ty.enforce_same_shape(aty),
        ])
    }

    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        let a = s.eval(self.a);
        let b = s.eval(self.b);
        let (cond, fmf) = (self.cond, self.fmf);
        map_lanes(s, ty, &[a, b], &mut |_, _, ins| {
            let np = and2(
                and2(ins[0].non_poison.clone(), ins[1].non_poison.clone()),
                // flags only speak about the operands here
                fmf_input_np(fmf, &[ins[0].value.clone(), ins[1].value.clone()]),
            );
            let bit = cond.apply(ins[0].value.clone(), ins[1].value.clone());
            StateValue::new(bool_to_bv1(bit), np)
        })
    }
}

impl std::fmt::Display for FCmp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fcmp {}{} {}, {}", self.fmf, self.cond.name(), self.a, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::ParamAttrs;
    use crate::memory::UfMemory;
    use crate::value::{Constant, Function};
    use tv_smtlib::build::{bv, var};
    use tv_smtlib::fpops::FloatFormat;

    fn state(f: &Function) -> State<'_> {
        State::new(f, Box::new(UfMemory::new()))
    }

    #[test]
    fn icmp_on_literals_folds() {
        let mut f = Function::new("f", Type::Int(1));
        let a = f.add_constant(Type::Int(8), Constant::Int(-1));
        let b = f.add_constant(Type::Int(8), Constant::Int(1));
        let mut s = state(&f);
        let slt = ICmp { cond: ICmpCond::SLT, a, b, ptr_mode: PtrCmpMode::default() };
        assert_eq!(slt.encode(&mut s, &Type::Int(1)).value, bv(1, 1));
        let ult = ICmp { cond: ICmpCond::ULT, a, b, ptr_mode: PtrCmpMode::default() };
        assert_eq!(ult.encode(&mut s, &Type::Int(1)).value, bv(0, 1));
    }

    #[test]
    fn icmp_any_reads_a_selector() {
        let mut f = Function::new("f", Type::Int(1));
        let a = f.add_input("a", Type::Int(8), ParamAttrs::default());
        let b = f.add_input("b", Type::Int(8), ParamAttrs::default());
        let mut s = state(&f);
        let i = ICmp { cond: ICmpCond::Any, a, b, ptr_mode: PtrCmpMode::default() };
        let _ = i.encode(&mut s, &Type::Int(1));
        let enc = s.finish();
        assert!(enc.quant_vars.iter().any(|(n, so)| {
            n.starts_with("icmp.cond") && *so == Sort::BitVec(4)
        }));
    }

    #[test]
    fn provenance_relational_ptr_cmp_adds_poison() {
        let mut f = Function::new("f", Type::Int(1));
        let mut nu = ParamAttrs::default();
        nu.noundef = true;
        let a = f.add_input("a", Type::Ptr, nu.clone());
        let b = f.add_input("b", Type::Ptr, nu);
        let mut s = state(&f);
        let i = ICmp { cond: ICmpCond::ULT, a, b, ptr_mode: PtrCmpMode::Provenance };
        let sv = i.encode(&mut s, &Type::Int(1));
        assert!(!sv.non_poison.is_true());
        let j = ICmp { cond: ICmpCond::Eq, a, b, ptr_mode: PtrCmpMode::Provenance };
        let sv = j.encode(&mut s, &Type::Int(1));
        assert!(sv.non_poison.is_true());
    }

    #[test]
    fn fcmp_ord_uno_partition() {
        let mut f = Function::new("f", Type::Int(1));
        let mut nu = ParamAttrs::default();
        nu.noundef = true;
        let a = f.add_input("a", Type::Float(FloatFormat::FLOAT), nu.clone());
        let b = f.add_input("b", Type::Float(FloatFormat::FLOAT), nu);
        let mut s = state(&f);
        let ord = FCmp { cond: FCmpCond::ORD, a, b, fmf: FastMathFlags::none() };
        let uno = FCmp { cond: FCmpCond::UNO, a, b, fmf: FastMathFlags::none() };
        let vo = ord.encode(&mut s, &Type::Int(1)).value;
        let vu = uno.encode(&mut s, &Type::Int(1)).value;
        assert_ne!(vo, vu);
    }

    #[test]
    fn fcmp_nnan_constrains_operands_only() {
        let mut f = Function::new("f", Type::Int(1));
        let mut nu = ParamAttrs::default();
        nu.noundef = true;
        let a = f.add_input("a", Type::Float(FloatFormat::FLOAT), nu.clone());
        let b = f.add_input("b", Type::Float(FloatFormat::FLOAT), nu);
        let mut s = state(&f);
        let i = FCmp { cond: FCmpCond::OEQ, a, b, fmf: FastMathFlags::NNAN };
        let sv = i.encode(&mut s, &Type::Int(1));
        assert_eq!(
            sv.non_poison,
            and2(
                not(Term::FpIsNaN(Box::new(var("%a")))),
                not(Term::FpIsNaN(Box::new(var("%b")))),
            )
        );
    }

    #[test]
    fn vector_icmp_produces_i1_lanes() {
        let mut f = Function::new("f", Type::Void);
        let vty = Type::vec_of(Type::Int(8), 2);
        let a = f.add_input("a", vty.clone(), ParamAttrs::default());
        let b = f.add_input("b", vty, ParamAttrs::default());
        let mut s = state(&f);
        let i = ICmp { cond: ICmpCond::Eq, a, b, ptr_mode: PtrCmpMode::default() };
        let sv = i.encode(&mut s, &Type::vec_of(Type::Int(1), 2));
        assert_ne!(sv.extract_lane(0).value, sv.extract_lane(1).value);
    }
}
