//! Memory-touching instructions.
//!
//! Address operands are poison-sensitive: dereferencing (or sizing a region
//! with) a poison value is UB, so every access first folds the operand's
//! non-poison predicate into the UB set. Byte counts that may be zero relax
//! the pointer requirements per the usual libc degenerate-size rules.

use tv_smtlib::build::{and2, and_many, bv, bvadd, concat, eq, fls, ite, ne, or2, ugt, ult};
use tv_smtlib::bvops::zext_or_trunc;
use tv_smtlib::{Sort, Term};

use crate::approx::{unroll_loop, LoopStep};
use crate::instr::{map_lanes, rauw_id};
use crate::memory::scaled_offset;
use crate::state::State;
use crate::ty::{all_constraints, Type, POINTER_BITS};
use crate::value::{Function, StateValue, ValueId};
use crate::{MEMCMP_UNROLL_CNT, STRLEN_UNROLL_CNT};

/// Stores wider than this are recorded as an approximation and skipped;
/// encoding them byte-precisely swamps the solver.
const MAX_STORE_BITS: u32 = 128 * 8;

/// UB conditions for a direct access from the enclosing function, per its
/// declared memory-access attributes.
fn access_ub(s: &mut State, is_write: bool) {
    let attrs = &s.function().attrs;
    if (is_write && attrs.no_write) || (!is_write && attrs.no_read) {
        s.add_ub(fls());
    }
}

// ---------------------------------------------------------------------------
// Alloc (stack allocation)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Alloc {
    pub size: ValueId,
    pub align: u64,
}

impl Alloc {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.size]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.size, from, to);
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        and2(ty.enforce_same(&Type::Ptr), f.ty(self.size).enforce_int())
    }

    pub fn encode(&self, s: &mut State, _ty: &Type) -> StateValue {
        let size = s.eval_and_add_poison_ub(self.size);
        let w = s.function().ty(self.size).bits();
        let bytes = zext_or_trunc(size.value, w, POINTER_BITS);
        let (ptr, ok) = s.memory.alloc(&bytes, self.align, false);
        s.add_ub(ok);
        StateValue::defined(ptr)
    }
}

impl std::fmt::Display for Alloc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "alloca {}, align {}", self.size, self.align)
    }
}

// ---------------------------------------------------------------------------
// Gep
// ---------------------------------------------------------------------------

/// Pointer arithmetic. Each index is scaled by its element size in bytes;
/// an out-of-bounds `inbounds` gep yields poison, never UB.
#[derive(Debug, Clone, PartialEq)]
pub struct Gep {
    pub ptr: ValueId,
    pub inbounds: bool,
    /// (element size in bytes, index operand) per gep level.
    pub indices: Vec<(u64, ValueId)>,
}

impl Gep {
    pub fn operands(&self) -> Vec<ValueId> {
        let mut ops = vec![self.ptr];
        ops.extend(self.indices.iter().map(|(_, v)| *v));
        ops
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.ptr, from, to);
        for (_, v) in &mut self.indices {
            rauw_id(v, from, to);
        }
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        let mut cs = vec![
            ty.enforce_ptr_or_vector_ptr(),
            ty.enforce_same_shape(f.ty(self.ptr)),
        ];
        for (_, v) in &self.indices {
            cs.push(f.ty(*v).enforce_int_or_vector_int());
        }
        all_constraints(cs)
    }

    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        let lanes = match ty {
            Type::Vector(_, n) => Some(*n),
            _ => None,
        };
        let mut inputs = vec![splat(s.eval(self.ptr), s.function().ty(self.ptr), lanes)];
        let mut idx_bits = Vec::with_capacity(self.indices.len());
        for (_, v) in &self.indices {
            let vty = s.function().ty(*v).clone();
            idx_bits.push(vty.scalar_bits());
            inputs.push(splat(s.eval(*v), &vty, lanes));
        }
        let scales: Vec<u64> = self.indices.iter().map(|(sz, _)| *sz).collect();
        let inbounds = self.inbounds;
        map_lanes(s, ty, &inputs, &mut |s, _, ins| {
            let ptr = &ins[0];
            let mut offset = bv(0, POINTER_BITS);
            let mut np = ptr.non_poison.clone();
            for (i, idx) in ins[1..].iter().enumerate() {
                np = and2(np, idx.non_poison.clone());
                offset = bvadd(offset, scaled_offset(idx.value.clone(), idx_bits[i], scales[i]));
            }
            if inbounds {
                np = and2(np, s.memory.inbounds(&ptr.value, &offset));
            }
            let out = s.memory.ptr_add(&ptr.value, &offset);
            StateValue::new(out, np)
        })
    }
}

/// Broadcast a scalar operand over the lanes of a vector gep.
fn splat(sv: StateValue, ty: &Type, lanes: Option<u32>) -> StateValue {
    match lanes {
        Some(n) if !ty.is_vector() => {
            StateValue::aggregate(vec![sv; n as usize])
        }
        _ => sv,
    }
}

impl std::fmt::Display for Gep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gep{} {}", if self.inbounds { " inbounds" } else { "" }, self.ptr)?;
        for (sz, v) in &self.indices {
            write!(f, ", {sz} x {v}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Load / Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Load {
    pub ptr: ValueId,
    pub align: u64,
}

impl Load {
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
        access_ub(s, false);
        let (sv, ub) = s.memory.load(&p.value, ty, self.align);
        s.add_ub(ub);
        sv
    }
}

impl std::fmt::Display for Load {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "load {}, align {}", self.ptr, self.align)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    pub ptr: ValueId,
    pub val: ValueId,
    pub align: u64,
}

impl Store {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.val, self.ptr]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.ptr, from, to);
        rauw_id(&mut self.val, from, to);
    }

    pub fn type_constraints(&self, f: &Function, _ty: &Type) -> Term {
        f.ty(self.ptr).enforce_same(&Type::Ptr)
    }

    pub fn encode(&self, s: &mut State, _ty: &Type) -> StateValue {
        let p = s.eval_and_add_poison_ub(self.ptr);
        // storing poison is fine; loading it back yields poison
        let v = s.eval(self.val);
        access_ub(s, true);
        let vty = s.function().ty(self.val).clone();
        if vty.bits() > MAX_STORE_BITS {
            s.does_approximation("store.large");
            return StateValue::defined(Type::Void.zero_term());
        }
        let ub = s.memory.store(&p.value, &v, &vty, self.align);
        s.add_ub(ub);
        StateValue::defined(Type::Void.zero_term())
    }
}

impl std::fmt::Display for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "store {}, {}, align {}", self.val, self.ptr, self.align)
    }
}

// ---------------------------------------------------------------------------
// Memset / MemsetPattern / FillPoison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Memset {
    pub ptr: ValueId,
    pub val: ValueId,
    pub bytes: ValueId,
    pub align: u64,
}

impl Memset {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.ptr, self.val, self.bytes]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.ptr, from, to);
        rauw_id(&mut self.val, from, to);
        rauw_id(&mut self.bytes, from, to);
    }

    pub fn type_constraints(&self, f: &Function, _ty: &Type) -> Term {
        and2(
            f.ty(self.ptr).enforce_same(&Type::Ptr),
            f.ty(self.bytes).enforce_int(),
        )
    }

    pub fn encode(&self, s: &mut State, _ty: &Type) -> StateValue {
        let p = s.eval(self.ptr);
        let v = s.eval(self.val);
        let n = s.eval_and_add_poison_ub(self.bytes);
        let nw = s.function().ty(self.bytes).bits();
        let size = zext_or_trunc(n.value, nw, POINTER_BITS);
        // size 0 permits a null or poison pointer
        let degenerate = eq(size.clone(), bv(0, POINTER_BITS));
        s.add_ub(or2(degenerate.clone(), p.non_poison.clone()));
        access_ub(s, true);
        let ub = s.memory.memset(&p.value, &v, &size, self.align);
        s.add_ub(or2(degenerate, ub));
        StateValue::defined(Type::Void.zero_term())
    }
}

impl std::fmt::Display for Memset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "memset {}, {}, {}, align {}", self.ptr, self.val, self.bytes, self.align)
    }
}

/// `memset_pattern{4,8,16}`: cycle a fixed-width pattern over a region.
/// The byte count must be a multiple of the pattern width; both pointers
/// must be dereferenceable even when the count is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct MemsetPattern {
    pub ptr: ValueId,
    pub pattern: ValueId,
    pub bytes: ValueId,
    pub pattern_bytes: u32,
}

impl MemsetPattern {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.ptr, self.pattern, self.bytes]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.ptr, from, to);
        rauw_id(&mut self.pattern, from, to);
        rauw_id(&mut self.bytes, from, to);
    }

    pub fn type_constraints(&self, f: &Function, _ty: &Type) -> Term {
        all_constraints(vec![
            f.ty(self.ptr).enforce_same(&Type::Ptr),
            f.ty(self.pattern).enforce_same(&Type::Ptr),
            f.ty(self.bytes).enforce_int(),
        ])
    }

    pub fn encode(&self, s: &mut State, _ty: &Type) -> StateValue {
        let p = s.eval_and_add_poison_ub(self.ptr);
        let pat = s.eval_and_add_poison_ub(self.pattern);
        let n = s.eval_and_add_poison_ub(self.bytes);
        let nw = s.function().ty(self.bytes).bits();
        let size = zext_or_trunc(n.value, nw, POINTER_BITS);
        access_ub(s, true);
        let ub = s.memory.memset_pattern(&p.value, &pat.value, &size, self.pattern_bytes);
        s.add_ub(ub);
        StateValue::defined(Type::Void.zero_term())
    }
}

impl std::fmt::Display for MemsetPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "memset_pattern{} {}, {}, {}",
            self.pattern_bytes, self.ptr, self.pattern, self.bytes
        )
    }
}

/// Mark a local block's contents as poison (fresh alloca contents).
#[derive(Debug, Clone, PartialEq)]
pub struct FillPoison {
    pub ptr: ValueId,
}

impl FillPoison {
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
        let local = s.memory.is_local(&p.value);
        s.add_ub(local);
        s.memory.fill_poison(&p.value);
        StateValue::defined(Type::Void.zero_term())
    }
}

impl std::fmt::Display for FillPoison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fill_poison {}", self.ptr)
    }
}

// ---------------------------------------------------------------------------
// Memcpy / Memcmp / Strlen
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Memcpy {
    pub dst: ValueId,
    pub src: ValueId,
    pub bytes: ValueId,
    pub dst_align: u64,
    pub src_align: u64,
    /// memmove when true, memcpy when false.
    pub can_overlap: bool,
}

impl Memcpy {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.dst, self.src, self.bytes]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.dst, from, to);
        rauw_id(&mut self.src, from, to);
        rauw_id(&mut self.bytes, from, to);
    }

    pub fn type_constraints(&self, f: &Function, _ty: &Type) -> Term {
        all_constraints(vec![
            f.ty(self.dst).enforce_same(&Type::Ptr),
            f.ty(self.src).enforce_same(&Type::Ptr),
            f.ty(self.bytes).enforce_int(),
        ])
    }

    pub fn encode(&self, s: &mut State, _ty: &Type) -> StateValue {
        let dst = s.eval(self.dst);
        let src = s.eval(self.src);
        let n = s.eval_and_add_poison_ub(self.bytes);
        let nw = s.function().ty(self.bytes).bits();
        let size = zext_or_trunc(n.value, nw, POINTER_BITS);
        let degenerate = eq(size.clone(), bv(0, POINTER_BITS));
        s.add_ub(or2(
            degenerate.clone(),
            and2(dst.non_poison.clone(), src.non_poison.clone()),
        ));
        access_ub(s, true);
        access_ub(s, false);
        let ub = s.memory.memcpy(
            &dst.value,
            &src.value,
            &size,
            self.dst_align,
            self.src_align,
            self.can_overlap,
        );
        s.add_ub(or2(degenerate, ub));
        StateValue::defined(Type::Void.zero_term())
    }
}

impl std::fmt::Display for Memcpy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}, {}, {}",
            if self.can_overlap { "memmove" } else { "memcpy" },
            self.dst,
            self.src,
            self.bytes
        )
    }
}

/// `memcmp` / `bcmp` as a bounded byte scan.
///
/// When bytes differ, the result magnitude is a nondeterministic nonzero
/// value; for memcmp its sign is fixed by the unsigned order of the first
/// differing byte pair, for bcmp the sign is nondeterministic too. Comparing
/// a pointer against itself folds every byte comparison to true, so the
/// result is identically zero regardless of the count.
#[derive(Debug, Clone, PartialEq)]
pub struct Memcmp {
    pub a: ValueId,
    pub b: ValueId,
    pub num: ValueId,
    pub is_bcmp: bool,
}

impl Memcmp {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.a, self.b, self.num]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.a, from, to);
        rauw_id(&mut self.b, from, to);
        rauw_id(&mut self.num, from, to);
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        all_constraints(vec![
            ty.enforce_same(&Type::Int(32)),
            f.ty(self.a).enforce_same(&Type::Ptr),
            f.ty(self.b).enforce_same(&Type::Ptr),
            f.ty(self.num).enforce_int(),
        ])
    }

    pub fn encode(&self, s: &mut State, _ty: &Type) -> StateValue {
        let a = s.eval(self.a);
        let b = s.eval(self.b);
        let n = s.eval_and_add_poison_ub(self.num);
        let nw = s.function().ty(self.num).bits();
        let size = zext_or_trunc(n.value.clone(), nw, POINTER_BITS);
        let degenerate = eq(size.clone(), bv(0, POINTER_BITS));
        let deref_a = s.memory.is_dereferenceable(&a.value, &size, 1);
        let deref_b = s.memory.is_dereferenceable(&b.value, &size, 1);
        s.add_ub(or2(
            degenerate.clone(),
            and_many(vec![a.non_poison.clone(), b.non_poison.clone(), deref_a, deref_b]),
        ));
        if s.function().attrs.no_read {
            // only a zero count compares no bytes
            s.add_ub(degenerate.clone());
        }
        let name = if self.is_bcmp { "bcmp" } else { "memcmp" };
        let is_bcmp = self.is_bcmp;
        let num = n.value;
        let r = unroll_loop(s, name, MEMCMP_UNROLL_CNT, &mut |s, i| {
            let off = bv(i as i128, POINTER_BITS);
            let pa = s.memory.ptr_add(&a.value, &off);
            let pb = s.memory.ptr_add(&b.value, &off);
            let byte_a = s.memory.raw_load(&pa);
            let byte_b = s.memory.raw_load(&pb);
            let bytes_eq = s.memory.byte_eq(&byte_a, &byte_b);
            let differ = if is_bcmp {
                let r = s.fresh_quant_var("bcmp.nonzero", Sort::BitVec(32));
                s.add_pre(ne(r.clone(), bv(0, 32)));
                r
            } else {
                // sign bit from the first differing byte pair, nonzero
                // nondeterministic magnitude below it
                let mag = s.fresh_quant_var("memcmp.nonzero", Sort::BitVec(31));
                s.add_pre(ne(mag.clone(), bv(0, 31)));
                ite(
                    ult(byte_a.clone(), byte_b.clone()),
                    concat(bv(1, 1), mag.clone()),
                    concat(bv(0, 1), mag),
                )
            };
            LoopStep {
                cont: and2(bytes_eq.clone(), ugt(num.clone(), bv(i as i128 + 1, nw))),
                ub: Term::BoolLit(true),
                value: StateValue::defined(ite(bytes_eq, bv(0, 32), differ)),
            }
        });
        // a zero count reads nothing and compares equal
        StateValue::new(
            ite(degenerate.clone(), bv(0, 32), r.value),
            or2(degenerate, r.non_poison),
        )
    }
}

impl std::fmt::Display for Memcmp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}, {}, {}",
            if self.is_bcmp { "bcmp" } else { "memcmp" },
            self.a,
            self.b,
            self.num
        )
    }
}

/// `strlen` as a bounded scan for the first NUL byte. Every byte up to and
/// including the NUL must be dereferenceable.
#[derive(Debug, Clone, PartialEq)]
pub struct Strlen {
    pub ptr: ValueId,
}

impl Strlen {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.ptr]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.ptr, from, to);
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        and2(ty.enforce_int(), f.ty(self.ptr).enforce_same(&Type::Ptr))
    }

    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        let p = s.eval_and_add_poison_ub(self.ptr);
        access_ub(s, false);
        let w = ty.bits();
        unroll_loop(s, "strlen", STRLEN_UNROLL_CNT, &mut |s, i| {
            let off = bv(i as i128, POINTER_BITS);
            let len = bv(i as i128 + 1, POINTER_BITS);
            let addr = s.memory.ptr_add(&p.value, &off);
            let byte = s.memory.raw_load(&addr);
            let deref = s.memory.is_dereferenceable(&p.value, &len, 1);
            LoopStep {
                cont: ne(byte, bv(0, 8)),
                ub: deref,
                value: StateValue::defined(bv(i as i128, w)),
            }
        })
    }
}

impl std::fmt::Display for Strlen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "strlen {}", self.ptr)
    }
}

// ---------------------------------------------------------------------------
// Lifetime
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Lifetime {
    pub start: bool,
    pub ptr: ValueId,
}

impl Lifetime {
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
        let local = s.memory.is_local(&p.value);
        s.add_ub(local);
        if self.start {
            s.memory.start_lifetime(&p.value);
        } else {
            s.memory.end_lifetime(&p.value);
        }
        StateValue::defined(Type::Void.zero_term())
    }
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "lifetime_{} {}",
            if self.start { "start" } else { "end" },
            self.ptr
        )
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

    fn defined_ptr(f: &mut Function, name: &str) -> ValueId {
        let mut attrs = ParamAttrs::default();
        attrs.noundef = true;
        f.add_input(name, Type::Ptr, attrs)
    }

    #[test]
    fn load_of_poison_pointer_is_ub() {
        let mut f = Function::new("f", Type::Int(8));
        let p = f.add_constant(Type::Ptr, Constant::Poison);
        let mut s = state(&f);
        let _ = Load { ptr: p, align: 1 }.encode(&mut s, &Type::Int(8));
        assert!(s.finish().ub.is_false());
    }

    #[test]
    fn store_in_no_write_function_is_ub() {
        let mut f = Function::new("f", Type::Void);
        f.attrs.no_write = true;
        let p = defined_ptr(&mut f, "p");
        let v = f.add_constant(Type::Int(8), Constant::Int(7));
        let mut s = state(&f);
        let _ = Store { ptr: p, val: v, align: 1 }.encode(&mut s, &Type::Void);
        assert!(s.finish().ub.is_false());
    }

    #[test]
    fn memcmp_of_a_pointer_with_itself_is_zero() {
        let mut f = Function::new("f", Type::Int(32));
        let p = defined_ptr(&mut f, "p");
        let n = f.add_input("n", Type::Int(64), ParamAttrs::default());
        let mut s = state(&f);
        let cmp = Memcmp { a: p, b: p, num: n, is_bcmp: false };
        let sv = cmp.encode(&mut s, &Type::Int(32));
        assert_eq!(sv.value, bv(0, 32));
        assert!(sv.non_poison.is_true());
    }

    #[test]
    fn memcmp_with_constant_count_is_exact() {
        let mut f = Function::new("f", Type::Int(32));
        let a = defined_ptr(&mut f, "a");
        let b = defined_ptr(&mut f, "b");
        let n = f.add_constant(Type::Int(64), Constant::Int(2));
        let mut s = state(&f);
        let cmp = Memcmp { a, b, num: n, is_bcmp: false };
        let _ = cmp.encode(&mut s, &Type::Int(32));
        // trip count bounded by the constant, no cutoff assumption needed
        assert!(s.approximations().is_empty());
    }

    #[test]
    fn memcmp_with_zero_count_returns_zero() {
        let mut f = Function::new("f", Type::Int(32));
        let a = defined_ptr(&mut f, "a");
        let b = defined_ptr(&mut f, "b");
        let n = f.add_constant(Type::Int(64), Constant::Int(0));
        let mut s = state(&f);
        let cmp = Memcmp { a, b, num: n, is_bcmp: false };
        let sv = cmp.encode(&mut s, &Type::Int(32));
        assert_eq!(sv.value, bv(0, 32));
        assert!(sv.non_poison.is_true());
        assert!(s.finish().ub.is_true());
    }

    #[test]
    fn memcmp_in_a_no_read_function_is_ub() {
        let mut f = Function::new("f", Type::Int(32));
        f.attrs.no_read = true;
        let a = defined_ptr(&mut f, "a");
        let b = defined_ptr(&mut f, "b");
        let n = f.add_constant(Type::Int(64), Constant::Int(2));
        let mut s = state(&f);
        let cmp = Memcmp { a, b, num: n, is_bcmp: false };
        let _ = cmp.encode(&mut s, &Type::Int(32));
        assert!(s.finish().ub.is_false());
    }

    #[test]
    fn strlen_in_a_no_read_function_is_ub() {
        let mut f = Function::new("f", Type::Int(64));
        f.attrs.no_read = true;
        let p = defined_ptr(&mut f, "p");
        let mut s = state(&f);
        let _ = Strlen { ptr: p }.encode(&mut s, &Type::Int(64));
        assert!(s.finish().ub.is_false());
    }

    #[test]
    fn memcmp_with_symbolic_count_is_an_approximation() {
        let mut f = Function::new("f", Type::Int(32));
        let a = defined_ptr(&mut f, "a");
        let b = defined_ptr(&mut f, "b");
        let n = f.add_input("n", Type::Int(64), ParamAttrs::default());
        let mut s = state(&f);
        let cmp = Memcmp { a, b, num: n, is_bcmp: false };
        let _ = cmp.encode(&mut s, &Type::Int(32));
        assert!(s.approximations().contains("memcmp"));
    }

    #[test]
    fn strlen_with_symbolic_memory_hits_the_bound() {
        let mut f = Function::new("f", Type::Int(64));
        let p = defined_ptr(&mut f, "p");
        let mut s = state(&f);
        let sv = Strlen { ptr: p }.encode(&mut s, &Type::Int(64));
        assert!(s.approximations().contains("strlen"));
        assert!(matches!(sv.value, Term::Ite(..)));
    }

    #[test]
    fn memset_size_zero_permits_poison_pointer() {
        let mut f = Function::new("f", Type::Void);
        let p = f.add_constant(Type::Ptr, Constant::Poison);
        let v = f.add_constant(Type::Int(8), Constant::Int(0));
        let n = f.add_constant(Type::Int(64), Constant::Int(0));
        let mut s = state(&f);
        let ms = Memset { ptr: p, val: v, bytes: n, align: 1 };
        let _ = ms.encode(&mut s, &Type::Void);
        assert!(s.finish().ub.is_true());
    }

    #[test]
    fn gep_inbounds_folds_violation_into_poison() {
        let mut f = Function::new("f", Type::Ptr);
        let p = defined_ptr(&mut f, "p");
        let i = f.add_input("i", Type::Int(64), ParamAttrs::default());
        let mut s = state(&f);
        let gep = Gep { ptr: p, inbounds: true, indices: vec![(4, i)] };
        let sv = gep.encode(&mut s, &Type::Ptr);
        assert!(!sv.non_poison.is_true());
        // gep never adds UB on its own
        assert!(s.finish().ub.is_true());
    }

    #[test]
    fn vector_gep_splats_a_scalar_base() {
        let mut f = Function::new("f", Type::vec_of(Type::Ptr, 2));
        let p = defined_ptr(&mut f, "p");
        let mut iattrs = ParamAttrs::default();
        iattrs.noundef = true;
        let i = f.add_input("i", Type::vec_of(Type::Int(32), 2), iattrs);
        let mut s = state(&f);
        let gep = Gep { ptr: p, inbounds: false, indices: vec![(8, i)] };
        let sv = gep.encode(&mut s, &Type::vec_of(Type::Ptr, 2));
        assert!(matches!(sv.value, Term::Pack(_)));
    }

    #[test]
    fn alloca_size_is_poison_sensitive() {
        let mut f = Function::new("f", Type::Ptr);
        let n = f.add_input("n", Type::Int(64), ParamAttrs::default());
        let mut s = state(&f);
        let _ = Alloc { size: n, align: 8 }.encode(&mut s, &Type::Ptr);
        assert_eq!(s.finish().ub, var("np_%n"));
    }
}
