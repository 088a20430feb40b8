//! Function calls, including the allocation families.
//!
//! Unknown callees are modeled as uninterpreted functions over the argument
//! values *and* their poison bits, so two call sites only collapse when both
//! the values and the definedness of every argument agree. malloc-family
//! callees get first-class semantics instead of a UF.

use tv_smtlib::build::{
    and2, bool_to_bv1, bv, bv_zero, bvmul, eq, fls, implies, ite, ne, not, or2, unpack,
};
use tv_smtlib::bvops::zext_or_trunc;
use tv_smtlib::{Sort, Term};

use crate::attrs::{AllocKind, AllocSpec, FnAttrs, ParamAttrs};
use crate::instr::rauw_id;
use crate::state::State;
use crate::ty::{all_constraints, Type, POINTER_BITS};
use crate::value::{np_all, Function, StateValue, ValueId};

/// Alignment guaranteed by the allocation functions.
const ALLOC_ALIGN: u64 = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub callee: String,
    pub args: Vec<ValueId>,
    /// Per-argument call-site attributes, parallel to `args`.
    pub arg_attrs: Vec<ParamAttrs>,
    pub attrs: FnAttrs,
    /// Inline-assembly call sites: arbitrary side effects, never dedupable.
    pub is_asm: bool,
}

impl Call {
    pub fn new(callee: impl Into<String>, args: Vec<ValueId>) -> Self {
        let arg_attrs = vec![ParamAttrs::default(); args.len()];
        Call {
            callee: callee.into(),
            args,
            arg_attrs,
            attrs: FnAttrs::default(),
            is_asm: false,
        }
    }

    pub fn operands(&self) -> Vec<ValueId> {
        self.args.clone()
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        for a in &mut self.args {
            rauw_id(a, from, to);
        }
    }

    pub fn type_constraints(&self, f: &Function, _ty: &Type) -> Term {
        let mut cs = Vec::new();
        if let Some(spec) = self.attrs.alloc {
            if let Some(&a) = self.args.get(spec.size_arg) {
                cs.push(f.ty(a).enforce_int());
            }
            if let Some(&a) = spec.count_arg.and_then(|i| self.args.get(i)) {
                cs.push(f.ty(a).enforce_int());
            }
        }
        all_constraints(cs)
    }

    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        let mut inputs = Vec::new();
        let mut arg_svs = Vec::with_capacity(self.args.len());
        for (i, &a) in self.args.iter().enumerate() {
            let sv = s.eval(a);
            let aty = s.function().ty(a).clone();
            let attrs = self.arg_attrs.get(i).cloned().unwrap_or_default();
            self.encode_arg_attrs(s, &sv, &aty, &attrs);
            flatten_arg(&aty, &sv, &mut inputs);
            arg_svs.push(sv);
        }
        self.check_caller_attrs(s);

        if let Some(spec) = self.attrs.alloc {
            return self.encode_alloc(s, ty, spec, &arg_svs);
        }

        if self.is_asm {
            // asm bodies are opaque: treat as an arbitrary read/write call
            // and flag the encoding
            s.does_approximation("asm");
        }
        let sv = shape_return(s.add_fn_call(&self.callee, inputs, ty, &self.attrs), ty);
        if let Some(i) = self.arg_attrs.iter().position(|a| a.returned) {
            // the callee promises to hand this argument back; pin the
            // summary to it and use the argument directly
            require_returned(s, ty, &sv, &arg_svs[i]);
            return arg_svs[i].clone();
        }
        sv
    }

    fn encode_arg_attrs(&self, s: &mut State, sv: &StateValue, aty: &Type, attrs: &ParamAttrs) {
        if attrs.noundef {
            s.add_ub(np_all(aty, &sv.non_poison));
        }
        if attrs.nonnull {
            s.add_ub(ne(sv.value.clone(), bv_zero(POINTER_BITS)));
        }
        if let Some(bytes) = attrs.dereferenceable {
            s.add_ub(sv.non_poison.clone());
            let n = bv(bytes as i128, POINTER_BITS);
            let d = s.memory.is_dereferenceable(&sv.value, &n, 1);
            s.add_ub(d);
        }
        if let Some(align) = attrs.align {
            let a = s.memory.is_aligned(&sv.value, align);
            s.add_ub(a);
        }
    }

    /// A callee may only perform accesses the caller's own attributes admit,
    /// unless the callee is argument-memory-only (its accesses then go
    /// through pointers the caller handed it).
    fn check_caller_attrs(&self, s: &mut State) {
        let caller = s.function().attrs.clone();
        let callee = &self.attrs;
        if caller.no_write && !(callee.no_write || callee.arg_mem_only) {
            s.add_ub(fls());
        }
        if caller.no_read && !(callee.no_read || callee.arg_mem_only) {
            s.add_ub(fls());
        }
        let callee_frees = !callee.no_free
            || matches!(
                callee.alloc.map(|a| a.kind),
                Some(AllocKind::Free) | Some(AllocKind::Realloc { .. })
            );
        if caller.no_free && callee_frees {
            s.add_ub(fls());
        }
    }

    fn encode_alloc(
        &self,
        s: &mut State,
        ty: &Type,
        spec: AllocSpec,
        args: &[StateValue],
    ) -> StateValue {
        let null = bv_zero(POINTER_BITS);
        match spec.kind {
            AllocKind::Alloc { zeroed } => {
                let size = self.alloc_size(s, spec, args);
                let (ptr, ok) = s.memory.alloc(&size, ALLOC_ALIGN, true);
                if zeroed {
                    let byte = StateValue::defined(bv(0, 8));
                    let set = s.memory.memset(&ptr, &byte, &size, 1);
                    s.add_ub(or2(not(ok.clone()), set));
                }
                if self.attrs.ret_nonnull {
                    s.add_pre(ok);
                    StateValue::defined(ptr)
                } else {
                    // the allocator may report exhaustion even when the
                    // model could satisfy the request
                    let succeeds = s.fresh_quant_var("alloc.ok", Sort::Bool);
                    StateValue::defined(ite(and2(ok, succeeds), ptr, null))
                }
            }
            AllocKind::Realloc { free_always } => {
                let old = &args[0];
                s.add_ub(old.non_poison.clone());
                let size = self.alloc_size(s, spec, args);
                let (ptr, ok) = s.memory.alloc(&size, ALLOC_ALIGN, true);
                let copied = s.memory.memcpy(&ptr, &old.value, &size, 1, 1, false);
                let old_null = eq(old.value.clone(), null.clone());
                s.add_ub(or2(not(ok.clone()), or2(old_null.clone(), copied)));
                let freed = s.memory.free(&old.value);
                let free_ok = or2(old_null, freed);
                if free_always {
                    s.add_ub(free_ok);
                } else {
                    // the old block is released on success, and also by
                    // realloc(p, 0) regardless of the result
                    let releases = or2(ok.clone(), eq(size, bv_zero(POINTER_BITS)));
                    s.add_ub(implies(releases, free_ok));
                }
                StateValue::defined(ite(ok, ptr, null))
            }
            AllocKind::Free => {
                let p = &args[0];
                let p_null = eq(p.value.clone(), null);
                s.add_ub(or2(p_null.clone(), p.non_poison.clone()));
                let freed = s.memory.free(&p.value);
                s.add_ub(or2(p_null, freed));
                StateValue::defined(ty.zero_term())
            }
        }
    }

    /// Allocation size in bytes; poison size arguments are UB.
    fn alloc_size(&self, s: &mut State, spec: AllocSpec, args: &[StateValue]) -> Term {
        let sz = &args[spec.size_arg];
        s.add_ub(sz.non_poison.clone());
        let w = s.function().ty(self.args[spec.size_arg]).bits();
        let mut size = zext_or_trunc(sz.value.clone(), w, POINTER_BITS);
        if let Some(ci) = spec.count_arg {
            let cnt = &args[ci];
            s.add_ub(cnt.non_poison.clone());
            let cw = s.function().ty(self.args[ci]).bits();
            size = bvmul(size, zext_or_trunc(cnt.value.clone(), cw, POINTER_BITS));
        }
        size
    }
}

/// Push one uninterpreted-function input per lane: the lane value followed
/// by its poison bit. Padding lanes carry no information.
fn flatten_arg(ty: &Type, sv: &StateValue, inputs: &mut Vec<Term>) {
    if !ty.is_aggregate() {
        inputs.push(sv.value.clone());
        inputs.push(bool_to_bv1(sv.non_poison.clone()));
        return;
    }
    for i in 0..ty.num_children() {
        if ty.is_padding(i) {
            continue;
        }
        flatten_arg(ty.child(i), &sv.extract_lane(i), inputs);
    }
}

/// Lane-wise agreement between a call's return summary and its `returned`
/// argument; a callee that returns anything else is UB.
fn require_returned(s: &mut State, ty: &Type, ret: &StateValue, arg: &StateValue) {
    if !ty.is_aggregate() {
        s.add_ub(eq(ret.value.clone(), arg.value.clone()));
        s.add_ub(eq(ret.non_poison.clone(), arg.non_poison.clone()));
        return;
    }
    for i in 0..ty.num_children() {
        if ty.is_padding(i) {
            continue;
        }
        require_returned(s, ty.child(i), &ret.extract_lane(i), &arg.extract_lane(i));
    }
}

/// Rebuild an aggregate return value lane-by-lane from the call's UF terms;
/// padding slots come back as poison.
fn shape_return(sv: StateValue, ty: &Type) -> StateValue {
    if !ty.is_aggregate() {
        return sv;
    }
    let mut lanes = Vec::with_capacity(ty.num_children() as usize);
    for i in 0..ty.num_children() {
        if ty.is_padding(i) {
            lanes.push(StateValue::poison(ty.child(i).zero_term()));
            continue;
        }
        let lane = StateValue::new(
            unpack(i as usize, sv.value.clone()),
            sv.non_poison.clone(),
        );
        lanes.push(shape_return(lane, ty.child(i)));
    }
    StateValue::aggregate(lanes)
}

impl std::fmt::Display for Call {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "call {}{}(", if self.is_asm { "asm " } else { "" }, self.callee)?;
        for (i, a) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{a}")?;
        }
        write!(f, ")")
    }
}
