//! Variadic-argument instructions.
//!
//! The actual ledger lives in [`State`]; these instructions resolve their
//! pointer operand (a poison va_list pointer is UB) and delegate.

use tv_smtlib::Term;

use crate::instr::rauw_id;
use crate::state::State;
use crate::ty::Type;
use crate::value::{Function, StateValue, ValueId};

#[derive(Debug, Clone, PartialEq)]
pub struct VaStart {
    pub ptr: ValueId,
}

impl VaStart {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.ptr]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.ptr, from, to);
    }

    pub fn type_constraints(&self, f: &Function, _ty: &Type) -> Term {
        f.ty(self.ptr).enforce_same(&Type::Ptr)
    }

    pub fn encode(&self, s: &mut State, _ty: &Type) -> StateValue {
        let p = s.eval_and_add_poison_ub(self.ptr);
        s.va_start(&p.value);
        StateValue::defined(Type::Void.zero_term())
    }
}

impl std::fmt::Display for VaStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "va_start {}", self.ptr)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VaEnd {
    pub ptr: ValueId,
}

impl VaEnd {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.ptr]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.ptr, from, to);
    }

    pub fn type_constraints(&self, f: &Function, _ty: &Type) -> Term {
        f.ty(self.ptr).enforce_same(&Type::Ptr)
    }

    pub fn encode(&self, s: &mut State, _ty: &Type) -> StateValue {
        let p = s.eval_and_add_poison_ub(self.ptr);
        s.va_end(&p.value);
        StateValue::defined(Type::Void.zero_term())
    }
}

impl std::fmt::Display for VaEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "va_end {}", self.ptr)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VaCopy {
    pub dst: ValueId,
    pub src: ValueId,
}

impl VaCopy {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.dst, self.src]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.dst, from, to);
        rauw_id(&mut self.src, from, to);
    }

    pub fn type_constraints(&self, f: &Function, _ty: &Type) -> Term {
        tv_smtlib::build::and2(
            f.ty(self.dst).enforce_same(&Type::Ptr),
            f.ty(self.src).enforce_same(&Type::Ptr),
        )
    }

    pub fn encode(&self, s: &mut State, _ty: &Type) -> StateValue {
        let dst = s.eval_and_add_poison_ub(self.dst);
        let src = s.eval_and_add_poison_ub(self.src);
        s.va_copy(&dst.value, &src.value);
        StateValue::defined(Type::Void.zero_term())
    }
}

impl std::fmt::Display for VaCopy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "va_copy {}, {}", self.dst, self.src)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VaArg {
    pub ptr: ValueId,
}

impl VaArg {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.ptr]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.ptr, from, to);
    }

    pub fn type_constraints(&self, f: &Function, _ty: &Type) -> Term {
        f.ty(self.ptr).enforce_same(&Type::Ptr)
    }

    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        let p = s.eval_and_add_poison_ub(self.ptr);
        s.va_arg(&p.value, ty)
    }
}

impl std::fmt::Display for VaArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "va_arg {}", self.ptr)
    }
}
