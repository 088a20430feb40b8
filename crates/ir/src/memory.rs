//! The memory and pointer contract.
//!
//! Instruction encoding never manipulates memory directly; it goes through
//! [`MemoryModel`]. Methods are pure with respect to the symbolic state:
//! mutating operations return the condition that must hold for the access to
//! be UB-free, and the caller feeds that into the state's UB accumulator.
//!
//! [`UfMemory`] is the reference model: every query is answered with a
//! deterministic uninterpreted function over the pointer and the current
//! write epoch. It gives loads/stores no actual semantics, but it is
//! deterministic — two reads of the same address in the same epoch produce
//! the same term — which is exactly what the unit tests and the string/
//! memory loop encoders need.

use crate::ty::{Type, BITS_PER_BYTE, POINTER_BITS};
use crate::value::StateValue;
use tv_smtlib::build::{self, and2, bvadd, bvand, bvmul, eq};
use tv_smtlib::bvops::zext_or_trunc;
use tv_smtlib::Term;

pub trait MemoryModel {
    /// Allocate a block. Returns the pointer and the condition under which
    /// the allocation succeeded (heap allocation may fail).
    fn alloc(&mut self, size: &Term, align: u64, heap: bool) -> (Term, Term);

    /// Free a block. Returns the UB-freedom condition (valid heap pointer or
    /// null).
    fn free(&mut self, ptr: &Term) -> Term;

    /// Typed load. Returns the loaded value and the UB-freedom condition.
    fn load(&mut self, ptr: &Term, ty: &Type, align: u64) -> (StateValue, Term);

    /// Typed store. Returns the UB-freedom condition.
    fn store(&mut self, ptr: &Term, v: &StateValue, ty: &Type, align: u64) -> Term;

    /// Fill `size` bytes with a (possibly symbolic) byte value.
    fn memset(&mut self, ptr: &Term, byte: &StateValue, size: &Term, align: u64) -> Term;

    /// Fill `size` bytes by cycling a pattern of `pattern_bytes` bytes read
    /// from `pattern`.
    fn memset_pattern(
        &mut self,
        ptr: &Term,
        pattern: &Term,
        size: &Term,
        pattern_bytes: u32,
    ) -> Term;

    /// Copy `size` bytes; `can_overlap` distinguishes memmove from memcpy.
    fn memcpy(
        &mut self,
        dst: &Term,
        src: &Term,
        size: &Term,
        dst_align: u64,
        src_align: u64,
        can_overlap: bool,
    ) -> Term;

    /// Read one raw byte, without a dereferenceability check.
    fn raw_load(&mut self, ptr: &Term) -> Term;

    /// Whether two raw bytes compare equal. The default is object equality;
    /// a precise model refines this for pointer bytes (where a pointer byte
    /// equals the integer byte only for null vs. zero).
    fn byte_eq(&mut self, a: &Term, b: &Term) -> Term {
        eq(a.clone(), b.clone())
    }

    /// Mark the whole block as holding poison.
    fn fill_poison(&mut self, ptr: &Term);

    fn start_lifetime(&mut self, ptr: &Term);

    fn end_lifetime(&mut self, ptr: &Term);

    /// Pointer plus a byte offset (64-bit).
    fn ptr_add(&self, ptr: &Term, offset: &Term) -> Term;

    fn is_block_alive(&self, ptr: &Term) -> Term;

    fn is_dereferenceable(&mut self, ptr: &Term, bytes: &Term, align: u64) -> Term;

    fn is_aligned(&self, ptr: &Term, align: u64) -> Term;

    /// Whether the pointer targets a stack/local block of this function.
    fn is_local(&self, ptr: &Term) -> Term;

    fn is_const_global(&self, ptr: &Term) -> Term;

    /// Whether `ptr + offset` stays within the pointee block (inbounds GEP).
    fn inbounds(&self, ptr: &Term, offset: &Term) -> Term;

    /// Byte offset of the pointer within its block.
    fn ptr_offset(&self, ptr: &Term) -> Term;

    /// Identity of the pointed-to block.
    fn block_id(&self, ptr: &Term) -> Term;

    fn ptr_to_int(&self, ptr: &Term) -> Term;

    fn int_to_ptr(&self, v: &Term) -> Term;

    /// Monotone counter bumped by every write; used to key call summaries
    /// and load results to the memory version they observed.
    fn write_epoch(&self) -> u32;

    /// An external callee may have written arbitrary memory.
    fn havoc(&mut self) {}
}

// ---------------------------------------------------------------------------
// UfMemory
// ---------------------------------------------------------------------------

/// Reference model backed by uninterpreted functions.
#[derive(Debug, Default)]
pub struct UfMemory {
    epoch: u32,
    allocs: u32,
}

impl UfMemory {
    pub fn new() -> Self {
        Self::default()
    }

    fn epoch_term(&self) -> Term {
        build::bv(self.epoch as i128, 32)
    }

    fn deref_cond(&self, ptr: &Term, bytes: &Term, align: u64) -> Term {
        and2(
            Term::App("mem.deref".into(), vec![ptr.clone(), bytes.clone()]),
            self.is_aligned(ptr, align),
        )
    }

    /// Load one child of `ty` at byte offset `off`.
    fn load_value(&self, ptr: &Term, ty: &Type, off: u32) -> StateValue {
        match ty {
            Type::Vector(..) | Type::Struct(_) => {
                let mut lanes = Vec::new();
                let mut off = off;
                for i in 0..ty.num_children() {
                    let child = ty.child(i);
                    lanes.push(self.load_value(ptr, child, off));
                    off += child.bits() / BITS_PER_BYTE;
                }
                StateValue::aggregate(lanes)
            }
            scalar => {
                let p = self.ptr_add(ptr, &build::bv(off as i128, POINTER_BITS));
                let args = vec![p, self.epoch_term()];
                let bits = Term::App(format!("mem.load.i{}", scalar.bits()), args.clone());
                let value = match scalar {
                    Type::Float(_) | Type::Ptr | Type::Int(_) => scalar.from_int_term(&bits),
                    _ => bits,
                };
                StateValue::new(value, Term::App("mem.init".into(), args))
            }
        }
    }
}

impl MemoryModel for UfMemory {
    fn alloc(&mut self, size: &Term, _align: u64, heap: bool) -> (Term, Term) {
        let id = build::bv(self.allocs as i128, 32);
        self.allocs += 1;
        let ptr = Term::App("mem.alloc".into(), vec![id.clone(), size.clone()]);
        let ok = if heap {
            Term::App("mem.alloc_ok".into(), vec![id])
        } else {
            build::tru()
        };
        (ptr, ok)
    }

    fn free(&mut self, ptr: &Term) -> Term {
        self.epoch += 1;
        Term::App("mem.free_ok".into(), vec![ptr.clone()])
    }

    fn load(&mut self, ptr: &Term, ty: &Type, align: u64) -> (StateValue, Term) {
        let bytes = build::bv((ty.bits() / BITS_PER_BYTE) as i128, POINTER_BITS);
        let ub = self.deref_cond(ptr, &bytes, align);
        (self.load_value(ptr, ty, 0), ub)
    }

    fn store(&mut self, ptr: &Term, _v: &StateValue, ty: &Type, align: u64) -> Term {
        self.epoch += 1;
        let bytes = build::bv((ty.bits() / BITS_PER_BYTE) as i128, POINTER_BITS);
        self.deref_cond(ptr, &bytes, align)
    }

    fn memset(&mut self, ptr: &Term, _byte: &StateValue, size: &Term, align: u64) -> Term {
        self.epoch += 1;
        self.deref_cond(ptr, size, align)
    }

    fn memset_pattern(
        &mut self,
        ptr: &Term,
        pattern: &Term,
        size: &Term,
        pattern_bytes: u32,
    ) -> Term {
        self.epoch += 1;
        let pat_size = build::bv(pattern_bytes as i128, POINTER_BITS);
        and2(
            self.deref_cond(ptr, size, 1),
            self.deref_cond(pattern, &pat_size, 1),
        )
    }

    fn memcpy(
        &mut self,
        dst: &Term,
        src: &Term,
        size: &Term,
        dst_align: u64,
        src_align: u64,
        _can_overlap: bool,
    ) -> Term {
        self.epoch += 1;
        and2(
            self.deref_cond(dst, size, dst_align),
            self.deref_cond(src, size, src_align),
        )
    }

    fn raw_load(&mut self, ptr: &Term) -> Term {
        Term::App("mem.byte".into(), vec![ptr.clone(), self.epoch_term()])
    }

    /// Reads here are deterministic UF applications, so identical terms are
    /// equal bytes even though generic equality keeps applications opaque.
    fn byte_eq(&mut self, a: &Term, b: &Term) -> Term {
        if a == b {
            return build::tru();
        }
        eq(a.clone(), b.clone())
    }

    fn fill_poison(&mut self, _ptr: &Term) {
        self.epoch += 1;
    }

    fn start_lifetime(&mut self, _ptr: &Term) {
        self.epoch += 1;
    }

    fn end_lifetime(&mut self, _ptr: &Term) {
        self.epoch += 1;
    }

    fn ptr_add(&self, ptr: &Term, offset: &Term) -> Term {
        bvadd(ptr.clone(), offset.clone())
    }

    fn is_block_alive(&self, ptr: &Term) -> Term {
        Term::App("mem.alive".into(), vec![ptr.clone(), self.epoch_term()])
    }

    fn is_dereferenceable(&mut self, ptr: &Term, bytes: &Term, align: u64) -> Term {
        self.deref_cond(ptr, bytes, align)
    }

    fn is_aligned(&self, ptr: &Term, align: u64) -> Term {
        if align <= 1 {
            return build::tru();
        }
        eq(
            bvand(ptr.clone(), build::bv(align as i128 - 1, POINTER_BITS)),
            build::bv_zero(POINTER_BITS),
        )
    }

    fn is_local(&self, ptr: &Term) -> Term {
        Term::App("mem.local".into(), vec![ptr.clone()])
    }

    fn is_const_global(&self, ptr: &Term) -> Term {
        Term::App("mem.const_global".into(), vec![ptr.clone()])
    }

    fn inbounds(&self, ptr: &Term, offset: &Term) -> Term {
        Term::App("mem.inbounds".into(), vec![ptr.clone(), offset.clone()])
    }

    fn ptr_offset(&self, ptr: &Term) -> Term {
        Term::App("ptr.offset".into(), vec![ptr.clone()])
    }

    fn block_id(&self, ptr: &Term) -> Term {
        Term::App("ptr.bid".into(), vec![ptr.clone()])
    }

    fn ptr_to_int(&self, ptr: &Term) -> Term {
        ptr.clone()
    }

    fn int_to_ptr(&self, v: &Term) -> Term {
        v.clone()
    }

    fn write_epoch(&self) -> u32 {
        self.epoch
    }

    fn havoc(&mut self) {
        self.epoch += 1;
    }
}

/// Scale an index term by a constant element size, in pointer width.
pub fn scaled_offset(idx: Term, idx_bits: u32, elem_bytes: u64) -> Term {
    let idx64 = if idx_bits >= POINTER_BITS {
        zext_or_trunc(idx, idx_bits, POINTER_BITS)
    } else {
        build::sext(POINTER_BITS - idx_bits, idx)
    };
    bvmul(idx64, build::bv(elem_bytes as i128, POINTER_BITS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tv_smtlib::build::{bv, var};

    #[test]
    fn raw_load_is_deterministic_within_epoch() {
        let mut m = UfMemory::new();
        let a = m.raw_load(&var("p"));
        let b = m.raw_load(&var("p"));
        assert_eq!(a, b);
        // byte equality of identical reads folds to true
        assert!(m.byte_eq(&a, &b).is_true());
    }

    #[test]
    fn stores_advance_the_epoch() {
        let mut m = UfMemory::new();
        let before = m.raw_load(&var("p"));
        let _ = m.store(
            &var("q"),
            &StateValue::defined(bv(0, 8)),
            &Type::Int(8),
            1,
        );
        let after = m.raw_load(&var("p"));
        assert_ne!(before, after);
        assert_eq!(m.write_epoch(), 1);
    }

    #[test]
    fn aligned_checks_fold_for_trivial_alignment() {
        let m = UfMemory::new();
        assert!(m.is_aligned(&var("p"), 1).is_true());
        assert!(!m.is_aligned(&var("p"), 8).is_true());
        assert!(m.is_aligned(&bv(16, 64), 8).is_true());
        assert!(m.is_aligned(&bv(12, 64), 8).is_false());
    }

    #[test]
    fn typed_load_of_vector_splits_lanes() {
        let mut m = UfMemory::new();
        let (sv, _ub) = m.load(&var("p"), &Type::vec_of(Type::Int(8), 2), 1);
        let lane0 = sv.extract_lane(0);
        let lane1 = sv.extract_lane(1);
        assert_ne!(lane0.value, lane1.value);
    }

    #[test]
    fn alloc_returns_distinct_pointers() {
        let mut m = UfMemory::new();
        let (p0, _) = m.alloc(&bv(8, 64), 8, true);
        let (p1, ok1) = m.alloc(&bv(8, 64), 8, true);
        assert_ne!(p0, p1);
        assert!(!ok1.is_true());
        let (_, ok_stack) = m.alloc(&bv(8, 64), 8, false);
        assert!(ok_stack.is_true());
    }

    #[test]
    fn scaled_offset_sign_extends_narrow_indices() {
        assert_eq!(scaled_offset(bv(-1, 32), 32, 4), bv(-4, 64));
        assert_eq!(scaled_offset(bv(3, 64), 64, 8), bv(24, 64));
    }
}
