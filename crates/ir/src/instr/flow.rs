//! Control flow, phi, freeze, and assumptions.

use tv_smtlib::build::{and_many, bv, bv1_to_bool, eq, ite, ne, not, tru};
use tv_smtlib::Term;

use crate::instr::rauw_id;
use crate::state::State;
use crate::ty::{all_constraints, Type, POINTER_BITS};
use crate::value::{np_all, BlockId, Function, StateValue, ValueId};

// ---------------------------------------------------------------------------
// Freeze
// ---------------------------------------------------------------------------

/// `freeze`: poison lanes become an arbitrary fixed value, everything else
/// passes through. Padding stays poison.
#[derive(Debug, Clone, PartialEq)]
pub struct Freeze {
    pub a: ValueId,
}

impl Freeze {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.a]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.a, from, to);
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        ty.enforce_same(f.ty(self.a))
    }

    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        let a = s.eval(self.a);
        freeze_value(s, ty, a)
    }
}

fn freeze_value(s: &mut State, ty: &Type, sv: StateValue) -> StateValue {
    if !ty.is_aggregate() {
        if sv.non_poison.is_true() {
            return sv;
        }
        let nondet = s.fresh_quant_var("freeze", ty.sort());
        return StateValue::defined(ite(sv.non_poison, sv.value, nondet));
    }
    let mut lanes = Vec::with_capacity(ty.num_children() as usize);
    for i in 0..ty.num_children() {
        let lane = sv.extract_lane(i);
        if ty.is_padding(i) {
            lanes.push(lane);
        } else {
            lanes.push(freeze_value(s, ty.child(i), lane));
        }
    }
    StateValue::aggregate(lanes)
}

impl std::fmt::Display for Freeze {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "freeze {}", self.a)
    }
}

// ---------------------------------------------------------------------------
// Phi
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Phi {
    pub incoming: Vec<(BlockId, ValueId)>,
}

impl Phi {
    pub fn operands(&self) -> Vec<ValueId> {
        self.incoming.iter().map(|(_, v)| *v).collect()
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        for (_, v) in &mut self.incoming {
            rauw_id(v, from, to);
        }
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        all_constraints(
            self.incoming
                .iter()
                .map(|(_, v)| ty.enforce_same(f.ty(*v)))
                .collect(),
        )
    }

    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        assert!(!self.incoming.is_empty(), "phi needs at least one incoming value");
        let cur = s.cur_block();
        let mut acc = StateValue::poison(ty.zero_term());
        for (pred, v) in &self.incoming {
            let cond = s.edge_cond(*pred, cur);
            let val = s.eval(*v);
            acc = StateValue::mk_if(&cond, val, acc);
        }
        acc
    }
}

impl std::fmt::Display for Phi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "phi ")?;
        for (i, (b, v)) in self.incoming.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[ {v}, {b} ]")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Branch / Switch / Return / Unreachable
// ---------------------------------------------------------------------------

/// Conditional or unconditional branch. Branching on poison is UB.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub cond: Option<ValueId>,
    pub then_bb: BlockId,
    pub else_bb: BlockId,
}

impl Branch {
    pub fn jump(to: BlockId) -> Self {
        Branch { cond: None, then_bb: to, else_bb: to }
    }

    pub fn operands(&self) -> Vec<ValueId> {
        self.cond.into_iter().collect()
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        if let Some(c) = &mut self.cond {
            rauw_id(c, from, to);
        }
    }

    pub fn type_constraints(&self, f: &Function, _ty: &Type) -> Term {
        match self.cond {
            Some(c) => f.ty(c).enforce_same(&Type::Int(1)),
            None => Term::BoolLit(true),
        }
    }

    pub fn encode(&self, s: &mut State, _ty: &Type) -> StateValue {
        match self.cond {
            None => s.add_jump(self.then_bb, tru()),
            Some(c) => {
                let sv = s.eval(c);
                s.add_ub(sv.non_poison);
                let taken = bv1_to_bool(sv.value);
                s.add_jump(self.then_bb, taken.clone());
                s.add_jump(self.else_bb, not(taken));
            }
        }
        StateValue::defined(Type::Void.zero_term())
    }
}

impl std::fmt::Display for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.cond {
            None => write!(f, "br {}", self.then_bb),
            Some(c) => write!(f, "br {c}, {}, {}", self.then_bb, self.else_bb),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    pub val: ValueId,
    pub default_bb: BlockId,
    pub cases: Vec<(i128, BlockId)>,
}

impl Switch {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.val]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.val, from, to);
    }

    pub fn type_constraints(&self, f: &Function, _ty: &Type) -> Term {
        f.ty(self.val).enforce_int()
    }

    pub fn encode(&self, s: &mut State, _ty: &Type) -> StateValue {
        let sv = s.eval(self.val);
        let w = s.function().ty(self.val).bits();
        s.add_ub(sv.non_poison);
        let mut misses = Vec::with_capacity(self.cases.len());
        for (case, target) in &self.cases {
            let hit = eq(sv.value.clone(), bv(*case, w));
            misses.push(ne(sv.value.clone(), bv(*case, w)));
            s.add_jump(*target, hit);
        }
        s.add_jump(self.default_bb, and_many(misses));
        StateValue::defined(Type::Void.zero_term())
    }
}

impl std::fmt::Display for Switch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "switch {}, {} [", self.val, self.default_bb)?;
        for (i, (c, b)) in self.cases.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{c}: {b}")?;
        }
        write!(f, "]")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Return {
    pub val: Option<ValueId>,
}

impl Return {
    pub fn operands(&self) -> Vec<ValueId> {
        self.val.into_iter().collect()
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        if let Some(v) = &mut self.val {
            rauw_id(v, from, to);
        }
    }

    pub fn type_constraints(&self, f: &Function, _ty: &Type) -> Term {
        match self.val {
            Some(v) => f.ret_ty.enforce_same(f.ty(v)),
            None => f.ret_ty.enforce_same(&Type::Void),
        }
    }

    pub fn encode(&self, s: &mut State, _ty: &Type) -> StateValue {
        let sv = match self.val {
            Some(v) => s.eval(v),
            None => StateValue::defined(Type::Void.zero_term()),
        };
        if s.function().attrs.ret_noundef {
            let rty = match self.val {
                Some(v) => s.function().ty(v).clone(),
                None => Type::Void,
            };
            s.add_ub(np_all(&rty, &sv.non_poison));
        }
        s.add_return(sv);
        StateValue::defined(Type::Void.zero_term())
    }
}

impl std::fmt::Display for Return {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.val {
            Some(v) => write!(f, "ret {v}"),
            None => write!(f, "ret void"),
        }
    }
}

/// Reaching `unreachable` is immediate UB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unreachable;

impl Unreachable {
    pub fn operands(&self) -> Vec<ValueId> {
        Vec::new()
    }

    pub fn rauw(&mut self, _from: ValueId, _to: ValueId) {}

    pub fn type_constraints(&self, _f: &Function, _ty: &Type) -> Term {
        Term::BoolLit(true)
    }

    pub fn encode(&self, s: &mut State, _ty: &Type) -> StateValue {
        s.add_ub(Term::BoolLit(false));
        s.kill_path();
        StateValue::defined(Type::Void.zero_term())
    }
}

impl std::fmt::Display for Unreachable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unreachable")
    }
}

// ---------------------------------------------------------------------------
// Assume
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssumeKind {
    /// `llvm.assume(c)`: UB if `c` is poison or false.
    AndNonPoison,
    /// The operand must be a well-defined (non-poison) value.
    WellDefined,
    /// Pointer alignment assumption.
    Align { align: u64 },
    /// Pointer dereferenceability assumption.
    Dereferenceable { bytes: u64 },
    NonNull,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assume {
    pub val: ValueId,
    pub kind: AssumeKind,
}

impl Assume {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.val]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.val, from, to);
    }

    pub fn type_constraints(&self, f: &Function, _ty: &Type) -> Term {
        match self.kind {
            AssumeKind::AndNonPoison => f.ty(self.val).enforce_same(&Type::Int(1)),
            AssumeKind::WellDefined => Term::BoolLit(true),
            _ => f.ty(self.val).enforce_same(&Type::Ptr),
        }
    }

    pub fn encode(&self, s: &mut State, _ty: &Type) -> StateValue {
        let sv = s.eval(self.val);
        let vty = s.function().ty(self.val).clone();
        match self.kind {
            AssumeKind::AndNonPoison => {
                s.add_ub(sv.non_poison);
                s.add_ub(bv1_to_bool(sv.value));
            }
            AssumeKind::WellDefined => {
                s.add_ub(np_all(&vty, &sv.non_poison));
            }
            AssumeKind::Align { align } => {
                let aligned = s.memory.is_aligned(&sv.value, align);
                s.add_ub(sv.non_poison);
                s.add_ub(aligned);
            }
            AssumeKind::Dereferenceable { bytes } => {
                let n = bv(bytes as i128, POINTER_BITS);
                let ok = s.memory.is_dereferenceable(&sv.value, &n, 1);
                s.add_ub(sv.non_poison);
                s.add_ub(ok);
            }
            AssumeKind::NonNull => {
                s.add_ub(sv.non_poison);
                s.add_ub(ne(sv.value, bv(0, POINTER_BITS)));
            }
        }
        StateValue::defined(Type::Void.zero_term())
    }
}

impl std::fmt::Display for Assume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            AssumeKind::AndNonPoison => write!(f, "assume {}", self.val),
            AssumeKind::WellDefined => write!(f, "assume_welldefined {}", self.val),
            AssumeKind::Align { align } => write!(f, "assume_align {}, {align}", self.val),
            AssumeKind::Dereferenceable { bytes } => {
                write!(f, "assume_dereferenceable {}, {bytes}", self.val)
            }
            AssumeKind::NonNull => write!(f, "assume_nonnull {}", self.val),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::ParamAttrs;
    use crate::memory::UfMemory;
    use crate::value::{Constant, Function};
    use tv_smtlib::build::var;

    fn state(f: &Function) -> State<'_> {
        State::new(f, Box::new(UfMemory::new()))
    }

    #[test]
    fn freeze_of_defined_value_is_identity() {
        let mut f = Function::new("f", Type::Int(8));
        let mut nu = ParamAttrs::default();
        nu.noundef = true;
        let a = f.add_input("a", Type::Int(8), nu);
        let mut s = state(&f);
        let i = Freeze { a };
        let sv = i.encode(&mut s, &Type::Int(8));
        assert_eq!(sv.value, var("%a"));
        assert!(sv.non_poison.is_true());
    }

    #[test]
    fn freeze_replaces_possible_poison_with_nondet() {
        let mut f = Function::new("f", Type::Int(8));
        let a = f.add_input("a", Type::Int(8), ParamAttrs::default());
        let mut s = state(&f);
        let sv = Freeze { a }.encode(&mut s, &Type::Int(8));
        assert!(sv.non_poison.is_true());
        assert!(matches!(sv.value, Term::Ite(..)));
        let enc = s.finish();
        assert!(enc.quant_vars.iter().any(|(n, _)| n.starts_with("freeze")));
    }

    #[test]
    fn branch_on_poison_is_ub() {
        let mut f = Function::new("f", Type::Void);
        let bb0 = f.add_block("entry");
        let bb1 = f.add_block("next");
        let p = f.add_constant(Type::Int(1), Constant::Poison);
        let mut s = state(&f);
        s.begin_block(bb0);
        let br = Branch { cond: Some(p), then_bb: bb1, else_bb: bb1 };
        let _ = br.encode(&mut s, &Type::Void);
        assert!(s.finish().ub.is_false());
    }

    #[test]
    fn phi_selects_by_incoming_edge() {
        let mut f = Function::new("f", Type::Int(8));
        let bb0 = f.add_block("entry");
        let bb1 = f.add_block("a");
        let bb2 = f.add_block("join");
        let c1 = f.add_constant(Type::Int(8), Constant::Int(1));
        let c2 = f.add_constant(Type::Int(8), Constant::Int(2));
        let mut s = state(&f);
        s.begin_block(bb0);
        s.add_jump(bb1, var("c"));
        s.add_jump(bb2, not(var("c")));
        s.begin_block(bb1);
        s.add_jump(bb2, tru());
        s.begin_block(bb2);
        let phi = Phi { incoming: vec![(bb0, c2), (bb1, c1)] };
        let sv = phi.encode(&mut s, &Type::Int(8));
        assert!(matches!(sv.value, Term::Ite(..)));
    }

    #[test]
    fn switch_default_excludes_all_cases() {
        let mut f = Function::new("f", Type::Void);
        let bb0 = f.add_block("entry");
        let c1 = f.add_block("one");
        let dfl = f.add_block("default");
        let mut nu = ParamAttrs::default();
        nu.noundef = true;
        let v = f.add_input("v", Type::Int(8), nu);
        let mut s = state(&f);
        s.begin_block(bb0);
        let sw = Switch { val: v, default_bb: dfl, cases: vec![(1, c1)] };
        let _ = sw.encode(&mut s, &Type::Void);
        assert_eq!(s.edge_cond(bb0, c1), eq(var("%v"), bv(1, 8)));
        assert_eq!(s.edge_cond(bb0, dfl), ne(var("%v"), bv(1, 8)));
    }

    #[test]
    fn unreachable_is_ub_when_reached() {
        let mut f = Function::new("f", Type::Void);
        let bb0 = f.add_block("entry");
        let bb1 = f.add_block("dead");
        let mut s = state(&f);
        s.begin_block(bb0);
        s.add_jump(bb1, var("c"));
        s.begin_block(bb1);
        let _ = Unreachable.encode(&mut s, &Type::Void);
        assert_eq!(s.finish().ub, not(var("c")));
    }

    #[test]
    fn assume_false_is_ub() {
        let mut f = Function::new("f", Type::Void);
        let z = f.add_constant(Type::Int(1), Constant::Int(0));
        let mut s = state(&f);
        let a = Assume { val: z, kind: AssumeKind::AndNonPoison };
        let _ = a.encode(&mut s, &Type::Void);
        assert!(s.finish().ub.is_false());
    }
}
