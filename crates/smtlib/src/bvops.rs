//! Derived bitvector combinators.
//!
//! These are not SMT-LIB primitives; each expands into core AST through the
//! folding constructors in [`crate::build`], so literal operands produce
//! literal results. Functions take the operand width explicitly where the
//! expansion needs it — terms themselves are width-agnostic.

use crate::build::*;
use crate::term::Term;

// ---------------------------------------------------------------------------
// Overflow predicates
// ---------------------------------------------------------------------------

/// `a + b` does not overflow signed arithmetic.
pub fn add_no_soverflow(a: Term, b: Term) -> Term {
    eq(
        bvadd(sext(1, a.clone()), sext(1, b.clone())),
        sext(1, bvadd(a, b)),
    )
}

/// `a + b` does not overflow unsigned arithmetic (`b <= ~a`).
pub fn add_no_uoverflow(a: Term, b: Term) -> Term {
    ule(b, bvnot(a))
}

/// `a - b` does not overflow signed arithmetic.
pub fn sub_no_soverflow(a: Term, b: Term) -> Term {
    eq(
        bvsub(sext(1, a.clone()), sext(1, b.clone())),
        sext(1, bvsub(a, b)),
    )
}

/// `a - b` does not wrap unsigned arithmetic.
pub fn sub_no_uoverflow(a: Term, b: Term) -> Term {
    uge(a, b)
}

/// `a * b` does not overflow signed arithmetic at width `w`.
pub fn mul_no_soverflow(a: Term, b: Term, w: u32) -> Term {
    eq(
        bvmul(sext(w, a.clone()), sext(w, b.clone())),
        sext(w, bvmul(a, b)),
    )
}

/// `a * b` does not overflow unsigned arithmetic at width `w`.
pub fn mul_no_uoverflow(a: Term, b: Term, w: u32) -> Term {
    eq(
        extract(2 * w - 1, w, bvmul(zext(w, a), zext(w, b))),
        bv_zero(w),
    )
}

// ---------------------------------------------------------------------------
// Exactness predicates
// ---------------------------------------------------------------------------

/// Signed division leaves no remainder.
pub fn sdiv_exact(a: Term, b: Term) -> Term {
    eq(bvsrem(a, b.clone()), bv_zero_like(&b))
}

/// Unsigned division leaves no remainder.
pub fn udiv_exact(a: Term, b: Term) -> Term {
    eq(bvurem(a, b.clone()), bv_zero_like(&b))
}

/// Arithmetic right shift drops no set bits.
pub fn ashr_exact(a: Term, b: Term) -> Term {
    eq(shl(ashr(a.clone(), b.clone()), b), a)
}

/// Logical right shift drops no set bits.
pub fn lshr_exact(a: Term, b: Term) -> Term {
    eq(shl(lshr(a.clone(), b.clone()), b), a)
}

/// A zero whose width matches a literal operand, or a symbolic `bvsub x x`
/// is avoided by requiring the caller to know widths in the non-literal
/// case; the remainder predicates above are only built for same-width
/// operands, so comparing against `b - b` is never needed.
fn bv_zero_like(t: &Term) -> Term {
    match t.as_bv_lit() {
        Some((_, w)) => bv_zero(w),
        // width is unknown; `bvxor t t` is a zero of the right width
        None => bvxor(t.clone(), t.clone()),
    }
}

// ---------------------------------------------------------------------------
// Saturating arithmetic
// ---------------------------------------------------------------------------

pub fn sadd_sat(a: Term, b: Term, w: u32) -> Term {
    ite(
        add_no_soverflow(a.clone(), b.clone()),
        bvadd(a.clone(), b),
        ite(slt(a, bv_zero(w)), bv_smin(w), bv_smax(w)),
    )
}

pub fn uadd_sat(a: Term, b: Term, w: u32) -> Term {
    ite(
        add_no_uoverflow(a.clone(), b.clone()),
        bvadd(a, b),
        bv_ones(w),
    )
}

pub fn ssub_sat(a: Term, b: Term, w: u32) -> Term {
    ite(
        sub_no_soverflow(a.clone(), b.clone()),
        bvsub(a.clone(), b),
        ite(slt(a, bv_zero(w)), bv_smin(w), bv_smax(w)),
    )
}

pub fn usub_sat(a: Term, b: Term, w: u32) -> Term {
    ite(
        sub_no_uoverflow(a.clone(), b.clone()),
        bvsub(a, b),
        bv_zero(w),
    )
}

/// Saturating signed shift left. The caller is responsible for the
/// `b < w` side condition; this only saturates value overflow.
pub fn sshl_sat(a: Term, b: Term, w: u32) -> Term {
    let shifted = shl(a.clone(), b.clone());
    ite(
        eq(ashr(shifted.clone(), b), a.clone()),
        shifted,
        ite(slt(a, bv_zero(w)), bv_smin(w), bv_smax(w)),
    )
}

/// Saturating unsigned shift left.
pub fn ushl_sat(a: Term, b: Term, w: u32) -> Term {
    let shifted = shl(a.clone(), b.clone());
    ite(eq(lshr(shifted.clone(), b), a), shifted, bv_ones(w))
}

// ---------------------------------------------------------------------------
// Bit counting
// ---------------------------------------------------------------------------

/// Trailing-zero count; `w` for the all-zero input.
pub fn cttz(x: Term, w: u32) -> Term {
    let mut r = bv(w as i128, w);
    for i in (0..w).rev() {
        r = ite(
            eq(extract(i, i, x.clone()), bv_one(1)),
            bv(i as i128, w),
            r,
        );
    }
    r
}

/// Leading-zero count; `w` for the all-zero input.
pub fn ctlz(x: Term, w: u32) -> Term {
    let mut r = bv(w as i128, w);
    for i in 0..w {
        r = ite(
            eq(extract(i, i, x.clone()), bv_one(1)),
            bv((w - 1 - i) as i128, w),
            r,
        );
    }
    r
}

/// Population count.
pub fn ctpop(x: Term, w: u32) -> Term {
    let mut sum = bv_zero(w);
    for i in 0..w {
        sum = bvadd(sum, zext(w - 1, extract(i, i, x.clone())));
    }
    sum
}

/// Byte-order reversal; `w` must be a multiple of 8.
pub fn bswap(x: Term, w: u32) -> Term {
    assert!(w % 8 == 0 && w > 0, "bswap requires a whole number of bytes");
    let parts = (0..w / 8)
        .map(|i| extract(8 * i + 7, 8 * i, x.clone()))
        .collect();
    concat_many(parts)
}

/// Bit-order reversal.
pub fn bitreverse(x: Term, w: u32) -> Term {
    let parts = (0..w).map(|i| extract(i, i, x.clone())).collect();
    concat_many(parts)
}

// ---------------------------------------------------------------------------
// Funnel shifts
// ---------------------------------------------------------------------------

/// Funnel shift left: top `w` bits of `(a ++ b) << (c mod w)`.
pub fn fshl(a: Term, b: Term, c: Term, w: u32) -> Term {
    let sh = zext(w, bvurem(c, bv(w as i128, w)));
    extract(2 * w - 1, w, shl(concat(a, b), sh))
}

/// Funnel shift right: low `w` bits of `(a ++ b) >> (c mod w)`.
pub fn fshr(a: Term, b: Term, c: Term, w: u32) -> Term {
    let sh = zext(w, bvurem(c, bv(w as i128, w)));
    extract(w - 1, 0, lshr(concat(a, b), sh))
}

// ---------------------------------------------------------------------------
// Min / max / abs
// ---------------------------------------------------------------------------

pub fn smin(a: Term, b: Term) -> Term {
    ite(sle(a.clone(), b.clone()), a, b)
}

pub fn smax(a: Term, b: Term) -> Term {
    ite(sge(a.clone(), b.clone()), a, b)
}

pub fn umin(a: Term, b: Term) -> Term {
    ite(ule(a.clone(), b.clone()), a, b)
}

pub fn umax(a: Term, b: Term) -> Term {
    ite(uge(a.clone(), b.clone()), a, b)
}

pub fn abs(a: Term, w: u32) -> Term {
    ite(slt(a.clone(), bv_zero(w)), bvneg(a.clone()), a)
}

// ---------------------------------------------------------------------------
// Fixed-point multiplication
// ---------------------------------------------------------------------------

/// `(a * b) >> scale` in double-width signed arithmetic, truncated to `w`.
pub fn smul_fix(a: Term, b: Term, scale: u32, w: u32) -> Term {
    let full = ashr(
        bvmul(sext(w, a), sext(w, b)),
        bv(scale as i128, 2 * w),
    );
    extract(w - 1, 0, full)
}

/// Whether [`smul_fix`] would truncate significant bits.
pub fn smul_fix_no_overflow(a: Term, b: Term, scale: u32, w: u32) -> Term {
    let full = ashr(
        bvmul(sext(w, a.clone()), sext(w, b.clone())),
        bv(scale as i128, 2 * w),
    );
    eq(sext(w, smul_fix(a, b, scale, w)), full)
}

/// Saturating form of [`smul_fix`].
pub fn smul_fix_sat(a: Term, b: Term, scale: u32, w: u32) -> Term {
    let full = ashr(
        bvmul(sext(w, a.clone()), sext(w, b.clone())),
        bv(scale as i128, 2 * w),
    );
    ite(
        smul_fix_no_overflow(a.clone(), b.clone(), scale, w),
        smul_fix(a, b, scale, w),
        ite(
            slt(full, bv_zero(2 * w)),
            bv_smin(w),
            bv_smax(w),
        ),
    )
}

/// Unsigned fixed-point multiply.
pub fn umul_fix(a: Term, b: Term, scale: u32, w: u32) -> Term {
    let full = lshr(
        bvmul(zext(w, a), zext(w, b)),
        bv(scale as i128, 2 * w),
    );
    extract(w - 1, 0, full)
}

/// Whether [`umul_fix`] would truncate significant bits.
pub fn umul_fix_no_overflow(a: Term, b: Term, scale: u32, w: u32) -> Term {
    let full = lshr(
        bvmul(zext(w, a.clone()), zext(w, b.clone())),
        bv(scale as i128, 2 * w),
    );
    eq(zext(w, umul_fix(a, b, scale, w)), full)
}

/// Saturating form of [`umul_fix`].
pub fn umul_fix_sat(a: Term, b: Term, scale: u32, w: u32) -> Term {
    ite(
        umul_fix_no_overflow(a.clone(), b.clone(), scale, w),
        umul_fix(a, b, scale, w),
        bv_ones(w),
    )
}

// ---------------------------------------------------------------------------
// Width adjustment
// ---------------------------------------------------------------------------

/// Zero-extend or truncate `t` from `from` to `to` bits.
pub fn zext_or_trunc(t: Term, from: u32, to: u32) -> Term {
    use std::cmp::Ordering;
    match to.cmp(&from) {
        Ordering::Greater => zext(to - from, t),
        Ordering::Less => extract(to - 1, 0, t),
        Ordering::Equal => t,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn overflow_predicates_fold() {
        assert_eq!(add_no_soverflow(bv(127, 8), bv(1, 8)), fls());
        assert_eq!(add_no_soverflow(bv(100, 8), bv(27, 8)), tru());
        assert_eq!(add_no_uoverflow(bv(255, 8), bv(1, 8)), fls());
        assert_eq!(sub_no_soverflow(bv(-128, 8), bv(1, 8)), fls());
        assert_eq!(sub_no_uoverflow(bv(0, 8), bv(1, 8)), fls());
        assert_eq!(mul_no_soverflow(bv(16, 8), bv(8, 8), 8), fls());
        assert_eq!(mul_no_uoverflow(bv(16, 8), bv(8, 8), 8), tru());
        assert_eq!(mul_no_uoverflow(bv(16, 8), bv(16, 8), 8), fls());
    }

    #[test]
    fn exactness_folds() {
        assert_eq!(sdiv_exact(bv(-8, 8), bv(2, 8)), tru());
        assert_eq!(sdiv_exact(bv(-7, 8), bv(2, 8)), fls());
        assert_eq!(udiv_exact(bv(8, 8), bv(4, 8)), tru());
        assert_eq!(ashr_exact(bv(-4, 8), bv(1, 8)), tru());
        assert_eq!(lshr_exact(bv(5, 8), bv(1, 8)), fls());
    }

    #[test]
    fn saturating_add_sub() {
        assert_eq!(sadd_sat(bv(127, 8), bv(10, 8), 8), bv(127, 8));
        assert_eq!(sadd_sat(bv(-128, 8), bv(-10, 8), 8), bv(-128, 8));
        assert_eq!(sadd_sat(bv(1, 8), bv(2, 8), 8), bv(3, 8));
        assert_eq!(uadd_sat(bv(250, 8), bv(10, 8), 8), bv(255, 8));
        assert_eq!(ssub_sat(bv(-100, 8), bv(100, 8), 8), bv(-128, 8));
        assert_eq!(usub_sat(bv(3, 8), bv(5, 8), 8), bv(0, 8));
        assert_eq!(usub_sat(bv(5, 8), bv(3, 8), 8), bv(2, 8));
    }

    #[test]
    fn saturating_shifts() {
        assert_eq!(sshl_sat(bv(1, 8), bv(2, 8), 8), bv(4, 8));
        assert_eq!(sshl_sat(bv(64, 8), bv(2, 8), 8), bv(127, 8));
        assert_eq!(sshl_sat(bv(-65, 8), bv(2, 8), 8), bv(-128, 8));
        assert_eq!(ushl_sat(bv(128, 8), bv(1, 8), 8), bv(255, 8));
    }

    #[test]
    fn bit_counting() {
        assert_eq!(cttz(bv(8, 8), 8), bv(3, 8));
        assert_eq!(cttz(bv(0, 8), 8), bv(8, 8));
        assert_eq!(cttz(bv(1, 8), 8), bv(0, 8));
        assert_eq!(ctlz(bv(1, 8), 8), bv(7, 8));
        assert_eq!(ctlz(bv(0, 8), 8), bv(8, 8));
        assert_eq!(ctlz(bv(-1, 8), 8), bv(0, 8));
        assert_eq!(ctpop(bv(0b1011, 8), 8), bv(3, 8));
    }

    #[test]
    fn byte_and_bit_reversal() {
        assert_eq!(bswap(bv(0x1234, 16), 16), bv(0x3412, 16));
        assert_eq!(bitreverse(bv(0b0000_0001, 8), 8), bv(0b1000_0000u8 as i128, 8));
        assert_eq!(bitreverse(bv(0b1100_0000u8 as i128, 8), 8), bv(0b0000_0011, 8));
    }

    #[test]
    fn funnel_shifts() {
        // fshl(0x12, 0x34, 4) over i8 = 0x23
        assert_eq!(fshl(bv(0x12, 8), bv(0x34, 8), bv(4, 8), 8), bv(0x23, 8));
        // fshr(0x12, 0x34, 4) over i8 = 0x23
        assert_eq!(fshr(bv(0x12, 8), bv(0x34, 8), bv(4, 8), 8), bv(0x23, 8));
        // shift amounts reduce modulo the width
        assert_eq!(fshl(bv(0x12, 8), bv(0x34, 8), bv(12, 8), 8), bv(0x23, 8));
        // zero shift is identity on the first operand
        assert_eq!(fshl(bv(0x12, 8), bv(0x34, 8), bv(0, 8), 8), bv(0x12, 8));
    }

    #[test]
    fn min_max_abs() {
        assert_eq!(smin(bv(-1, 8), bv(1, 8)), bv(-1, 8));
        assert_eq!(umin(bv(-1, 8), bv(1, 8)), bv(1, 8));
        assert_eq!(smax(bv(-1, 8), bv(1, 8)), bv(1, 8));
        assert_eq!(umax(bv(-1, 8), bv(1, 8)), bv(-1, 8));
        assert_eq!(abs(bv(-5, 8), 8), bv(5, 8));
        assert_eq!(abs(bv(5, 8), 8), bv(5, 8));
        // INT_MIN wraps; the caller encodes the poison side condition
        assert_eq!(abs(bv(-128, 8), 8), bv(-128, 8));
    }

    #[test]
    fn fixed_point_multiply() {
        // 1.5 * 1.5 in Q4.4: 0x18 * 0x18 >> 4 = 0x24 (2.25)
        assert_eq!(smul_fix(bv(0x18, 8), bv(0x18, 8), 4, 8), bv(0x24, 8));
        assert_eq!(smul_fix_no_overflow(bv(0x18, 8), bv(0x18, 8), 4, 8), tru());
        assert_eq!(smul_fix_sat(bv(0x70, 8), bv(0x70, 8), 4, 8), bv(127, 8));
        assert_eq!(umul_fix(bv(0x18, 8), bv(0x18, 8), 4, 8), bv(0x24, 8));
        assert_eq!(umul_fix_sat(bv(0xF0, 8), bv(0xF0, 8), 4, 8), bv(255, 8));
    }

    #[test]
    fn width_adjustment() {
        assert_eq!(zext_or_trunc(bv(0x1FF, 9), 9, 8), bv(0xFF, 8));
        assert_eq!(zext_or_trunc(bv(0xFF, 8), 8, 9), bv(0xFF, 9));
        assert_eq!(zext_or_trunc(var("x"), 8, 8), var("x"));
    }

    proptest! {
        #[test]
        fn prop_cttz_matches_native(x in any::<u8>()) {
            let expected = if x == 0 { 8 } else { x.trailing_zeros() };
            prop_assert_eq!(cttz(bv(x as i128, 8), 8), bv(expected as i128, 8));
        }

        #[test]
        fn prop_ctpop_matches_native(x in any::<u8>()) {
            prop_assert_eq!(ctpop(bv(x as i128, 8), 8), bv(x.count_ones() as i128, 8));
        }

        #[test]
        fn prop_fshl_matches_rotate_when_equal(x in any::<u8>(), c in 0u8..8) {
            let expected = x.rotate_left(c as u32);
            prop_assert_eq!(
                fshl(bv(x as i128, 8), bv(x as i128, 8), bv(c as i128, 8), 8),
                bv(expected as i128, 8)
            );
        }

        #[test]
        fn prop_sadd_sat_matches_native(a in any::<i8>(), b in any::<i8>()) {
            let expected = a.saturating_add(b);
            prop_assert_eq!(
                sadd_sat(bv(a as i128, 8), bv(b as i128, 8), 8),
                bv(expected as i128, 8)
            );
        }
    }
}
