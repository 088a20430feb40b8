//! Smart constructors with local constant folding.
//!
//! Every constructor here is semantics-preserving: it either builds the
//! corresponding AST node or returns an equivalent smaller term. Encoders
//! rely on the folding being applied eagerly — a guard such as
//! `ult(shift_amount, width)` over literal operands must come back as a
//! `BoolLit` so that downstream code can branch on it structurally.

use crate::term::Term;

// ---------------------------------------------------------------------------
// Bitvector literal arithmetic helpers
// ---------------------------------------------------------------------------

/// Mask for a `w`-bit value inside a `u128`.
fn mask(w: u32) -> u128 {
    if w >= 128 {
        u128::MAX
    } else {
        (1u128 << w) - 1
    }
}

/// Normalize a literal to its unsigned `w`-bit representation.
fn norm(v: i128, w: u32) -> u128 {
    (v as u128) & mask(w)
}

/// Interpret a normalized `w`-bit value as signed.
fn signed(v: u128, w: u32) -> i128 {
    let v = v & mask(w);
    if w < 128 && (v >> (w - 1)) & 1 == 1 {
        (v | !mask(w)) as i128
    } else {
        v as i128
    }
}

/// Bitvector literal, stored in the signed canonical form the folding
/// layer produces so that structural equality matches denotation.
pub fn bv(v: i128, w: u32) -> Term {
    Term::BitVecLit(signed(norm(v, w), w), w)
}

pub fn bv_zero(w: u32) -> Term {
    Term::BitVecLit(0, w)
}

pub fn bv_one(w: u32) -> Term {
    Term::BitVecLit(signed(1, w), w)
}

/// All-ones literal (unsigned maximum).
pub fn bv_ones(w: u32) -> Term {
    Term::BitVecLit(signed(mask(w), w), w)
}

/// Signed minimum (`1000...0`).
pub fn bv_smin(w: u32) -> Term {
    Term::BitVecLit(signed(1u128 << (w - 1), w), w)
}

/// Signed maximum (`0111...1`).
pub fn bv_smax(w: u32) -> Term {
    Term::BitVecLit((mask(w) >> 1) as i128, w)
}

// ---------------------------------------------------------------------------
// Boolean
// ---------------------------------------------------------------------------

pub fn tru() -> Term {
    Term::BoolLit(true)
}

pub fn fls() -> Term {
    Term::BoolLit(false)
}

/// Named constant reference.
pub fn var(name: impl Into<String>) -> Term {
    Term::Const(name.into())
}

pub fn not(t: Term) -> Term {
    match t {
        Term::BoolLit(b) => Term::BoolLit(!b),
        Term::Not(inner) => *inner,
        other => Term::Not(Box::new(other)),
    }
}

/// Binary AND with identity/absorption folding.
pub fn and2(a: Term, b: Term) -> Term {
    and_many(vec![a, b])
}

/// n-ary AND; drops `true`, collapses on `false`, flattens nested ANDs.
pub fn and_many(terms: Vec<Term>) -> Term {
    let mut out: Vec<Term> = Vec::with_capacity(terms.len());
    for t in terms {
        match t {
            Term::BoolLit(true) => {}
            Term::BoolLit(false) => return Term::BoolLit(false),
            Term::And(inner) => {
                for i in inner {
                    if i.is_false() {
                        return Term::BoolLit(false);
                    }
                    if !i.is_true() && !out.contains(&i) {
                        out.push(i);
                    }
                }
            }
            other => {
                if !out.contains(&other) {
                    out.push(other);
                }
            }
        }
    }
    match out.len() {
        0 => Term::BoolLit(true),
        1 => out.pop().unwrap_or(Term::BoolLit(true)),
        _ => Term::And(out),
    }
}

/// Binary OR with identity/absorption folding.
pub fn or2(a: Term, b: Term) -> Term {
    or_many(vec![a, b])
}

/// n-ary OR; drops `false`, collapses on `true`, flattens nested ORs.
pub fn or_many(terms: Vec<Term>) -> Term {
    let mut out: Vec<Term> = Vec::with_capacity(terms.len());
    for t in terms {
        match t {
            Term::BoolLit(false) => {}
            Term::BoolLit(true) => return Term::BoolLit(true),
            Term::Or(inner) => {
                for i in inner {
                    if i.is_true() {
                        return Term::BoolLit(true);
                    }
                    if !i.is_false() && !out.contains(&i) {
                        out.push(i);
                    }
                }
            }
            other => {
                if !out.contains(&other) {
                    out.push(other);
                }
            }
        }
    }
    match out.len() {
        0 => Term::BoolLit(false),
        1 => out.pop().unwrap_or(Term::BoolLit(false)),
        _ => Term::Or(out),
    }
}

pub fn implies(a: Term, b: Term) -> Term {
    if a.is_false() || b.is_true() || a == b {
        return Term::BoolLit(true);
    }
    if a.is_true() {
        return b;
    }
    if b.is_false() {
        return not(a);
    }
    Term::Implies(Box::new(a), Box::new(b))
}

// ---------------------------------------------------------------------------
// Core
// ---------------------------------------------------------------------------

/// Equality with structural folding. Identical terms fold to `true`; this is
/// sound because `=` is object equality even on floats.
pub fn eq(a: Term, b: Term) -> Term {
    if a == b && !matches!(a, Term::App(..)) {
        return Term::BoolLit(true);
    }
    match (&a, &b) {
        (Term::BoolLit(x), Term::BoolLit(y)) => return Term::BoolLit(x == y),
        (Term::BitVecLit(x, wx), Term::BitVecLit(y, wy)) if wx == wy => {
            return Term::BoolLit(norm(*x, *wx) == norm(*y, *wy));
        }
        _ => {}
    }
    Term::Eq(Box::new(a), Box::new(b))
}

pub fn ne(a: Term, b: Term) -> Term {
    not(eq(a, b))
}

pub fn distinct(terms: Vec<Term>) -> Term {
    Term::Distinct(terms)
}

/// If-then-else with constant-condition and equal-branch folding.
pub fn ite(cond: Term, then_t: Term, else_t: Term) -> Term {
    match cond {
        Term::BoolLit(true) => then_t,
        Term::BoolLit(false) => else_t,
        cond if then_t == else_t => {
            let _ = cond;
            then_t
        }
        cond => {
            // (ite c true false) is c; (ite c false true) is (not c)
            if then_t.is_true() && else_t.is_false() {
                return cond;
            }
            if then_t.is_false() && else_t.is_true() {
                return not(cond);
            }
            Term::Ite(Box::new(cond), Box::new(then_t), Box::new(else_t))
        }
    }
}

// ---------------------------------------------------------------------------
// Bitvector arithmetic
// ---------------------------------------------------------------------------

/// Fold a binary op over two literals, else build `mk`.
fn bv_binop(
    a: Term,
    b: Term,
    fold: impl Fn(u128, u128, u32) -> u128,
    mk: impl Fn(Box<Term>, Box<Term>) -> Term,
) -> Term {
    if let (Some((x, wx)), Some((y, wy))) = (a.as_bv_lit(), b.as_bv_lit()) {
        if wx == wy {
            let r = fold(norm(x, wx), norm(y, wx), wx) & mask(wx);
            return Term::BitVecLit(signed(r, wx), wx);
        }
    }
    mk(Box::new(a), Box::new(b))
}

pub fn bvadd(a: Term, b: Term) -> Term {
    if a.as_bv_lit().map(|(v, w)| norm(v, w)) == Some(0) {
        return b;
    }
    if b.as_bv_lit().map(|(v, w)| norm(v, w)) == Some(0) {
        return a;
    }
    bv_binop(a, b, |x, y, _| x.wrapping_add(y), Term::BvAdd)
}

pub fn bvsub(a: Term, b: Term) -> Term {
    if b.as_bv_lit().map(|(v, w)| norm(v, w)) == Some(0) {
        return a;
    }
    bv_binop(a, b, |x, y, _| x.wrapping_sub(y), Term::BvSub)
}

pub fn bvmul(a: Term, b: Term) -> Term {
    for (lit, other) in [(&a, &b), (&b, &a)] {
        if let Some((v, w)) = lit.as_bv_lit() {
            match norm(v, w) {
                0 => return bv_zero(w),
                1 => return other.clone(),
                _ => {}
            }
        }
    }
    bv_binop(a, b, |x, y, _| x.wrapping_mul(y), Term::BvMul)
}

pub fn bvneg(a: Term) -> Term {
    if let Some((v, w)) = a.as_bv_lit() {
        return Term::BitVecLit(signed(norm(v, w).wrapping_neg(), w), w);
    }
    Term::BvNeg(Box::new(a))
}

/// Signed division; folds only for a nonzero literal divisor. Division
/// overflow wraps, matching SMT `bvsdiv` on `INT_MIN / -1`.
pub fn bvsdiv(a: Term, b: Term) -> Term {
    if let (Some((x, wx)), Some((y, wy))) = (a.as_bv_lit(), b.as_bv_lit()) {
        if wx == wy {
            let (xs, ys) = (signed(norm(x, wx), wx), signed(norm(y, wx), wx));
            if ys != 0 {
                let q = xs.checked_div(ys).unwrap_or(xs);
                return Term::BitVecLit(signed(norm(q, wx), wx), wx);
            }
        }
    }
    Term::BvSDiv(Box::new(a), Box::new(b))
}

pub fn bvudiv(a: Term, b: Term) -> Term {
    if let (Some((x, wx)), Some((y, wy))) = (a.as_bv_lit(), b.as_bv_lit()) {
        if wx == wy {
            let (xu, yu) = (norm(x, wx), norm(y, wx));
            if yu != 0 {
                return Term::BitVecLit(signed(xu / yu, wx), wx);
            }
        }
    }
    Term::BvUDiv(Box::new(a), Box::new(b))
}

pub fn bvsrem(a: Term, b: Term) -> Term {
    if let (Some((x, wx)), Some((y, wy))) = (a.as_bv_lit(), b.as_bv_lit()) {
        if wx == wy {
            let (xs, ys) = (signed(norm(x, wx), wx), signed(norm(y, wx), wx));
            if ys != 0 {
                let r = xs.checked_rem(ys).unwrap_or(0);
                return Term::BitVecLit(signed(norm(r, wx), wx), wx);
            }
        }
    }
    Term::BvSRem(Box::new(a), Box::new(b))
}

pub fn bvurem(a: Term, b: Term) -> Term {
    if let (Some((x, wx)), Some((y, wy))) = (a.as_bv_lit(), b.as_bv_lit()) {
        if wx == wy {
            let (xu, yu) = (norm(x, wx), norm(y, wx));
            if yu != 0 {
                return Term::BitVecLit(signed(xu % yu, wx), wx);
            }
        }
    }
    Term::BvURem(Box::new(a), Box::new(b))
}

// ---------------------------------------------------------------------------
// Bitvector comparison
// ---------------------------------------------------------------------------

fn bv_cmp(
    a: Term,
    b: Term,
    fold: impl Fn(u128, u128, u32) -> bool,
    mk: impl Fn(Box<Term>, Box<Term>) -> Term,
) -> Term {
    if let (Some((x, wx)), Some((y, wy))) = (a.as_bv_lit(), b.as_bv_lit()) {
        if wx == wy {
            return Term::BoolLit(fold(norm(x, wx), norm(y, wx), wx));
        }
    }
    mk(Box::new(a), Box::new(b))
}

pub fn slt(a: Term, b: Term) -> Term {
    bv_cmp(a, b, |x, y, w| signed(x, w) < signed(y, w), Term::BvSLt)
}

pub fn sle(a: Term, b: Term) -> Term {
    bv_cmp(a, b, |x, y, w| signed(x, w) <= signed(y, w), Term::BvSLe)
}

pub fn sgt(a: Term, b: Term) -> Term {
    bv_cmp(a, b, |x, y, w| signed(x, w) > signed(y, w), Term::BvSGt)
}

pub fn sge(a: Term, b: Term) -> Term {
    bv_cmp(a, b, |x, y, w| signed(x, w) >= signed(y, w), Term::BvSGe)
}

pub fn ult(a: Term, b: Term) -> Term {
    bv_cmp(a, b, |x, y, _| x < y, Term::BvULt)
}

pub fn ule(a: Term, b: Term) -> Term {
    bv_cmp(a, b, |x, y, _| x <= y, Term::BvULe)
}

pub fn ugt(a: Term, b: Term) -> Term {
    bv_cmp(a, b, |x, y, _| x > y, Term::BvUGt)
}

pub fn uge(a: Term, b: Term) -> Term {
    bv_cmp(a, b, |x, y, _| x >= y, Term::BvUGe)
}

// ---------------------------------------------------------------------------
// Bitvector bitwise
// ---------------------------------------------------------------------------

pub fn bvand(a: Term, b: Term) -> Term {
    for (lit, other) in [(&a, &b), (&b, &a)] {
        if let Some((v, w)) = lit.as_bv_lit() {
            let n = norm(v, w);
            if n == 0 {
                return bv_zero(w);
            }
            if n == mask(w) {
                return other.clone();
            }
        }
    }
    bv_binop(a, b, |x, y, _| x & y, Term::BvAnd)
}

pub fn bvor(a: Term, b: Term) -> Term {
    for (lit, other) in [(&a, &b), (&b, &a)] {
        if let Some((v, w)) = lit.as_bv_lit() {
            let n = norm(v, w);
            if n == 0 {
                return other.clone();
            }
            if n == mask(w) {
                return bv_ones(w);
            }
        }
    }
    bv_binop(a, b, |x, y, _| x | y, Term::BvOr)
}

pub fn bvxor(a: Term, b: Term) -> Term {
    bv_binop(a, b, |x, y, _| x ^ y, Term::BvXor)
}

pub fn bvnot(a: Term) -> Term {
    if let Some((v, w)) = a.as_bv_lit() {
        return Term::BitVecLit(signed(!norm(v, w) & mask(w), w), w);
    }
    Term::BvNot(Box::new(a))
}

/// Shift left; out-of-range literal shifts produce zero, as SMT defines.
pub fn shl(a: Term, b: Term) -> Term {
    bv_binop(
        a,
        b,
        |x, y, w| if y >= w as u128 { 0 } else { x << y },
        Term::BvShl,
    )
}

pub fn lshr(a: Term, b: Term) -> Term {
    bv_binop(
        a,
        b,
        |x, y, w| if y >= w as u128 { 0 } else { x >> y },
        Term::BvLShr,
    )
}

pub fn ashr(a: Term, b: Term) -> Term {
    bv_binop(
        a,
        b,
        |x, y, w| {
            let sh = if y >= w as u128 { w - 1 } else { y as u32 };
            (signed(x, w) >> sh) as u128
        },
        Term::BvAShr,
    )
}

// ---------------------------------------------------------------------------
// Bitvector structure
// ---------------------------------------------------------------------------

pub fn zext(n: u32, a: Term) -> Term {
    if n == 0 {
        return a;
    }
    if let Some((v, w)) = a.as_bv_lit() {
        return Term::BitVecLit(norm(v, w) as i128, w + n);
    }
    Term::ZeroExtend(n, Box::new(a))
}

pub fn sext(n: u32, a: Term) -> Term {
    if n == 0 {
        return a;
    }
    if let Some((v, w)) = a.as_bv_lit() {
        return Term::BitVecLit(signed(norm(v, w), w), w + n);
    }
    Term::SignExtend(n, Box::new(a))
}

pub fn extract(hi: u32, lo: u32, a: Term) -> Term {
    debug_assert!(hi >= lo);
    if let Some((v, w)) = a.as_bv_lit() {
        let nw = hi - lo + 1;
        let r = (norm(v, w) >> lo) & mask(nw);
        return Term::BitVecLit(signed(r, nw), nw);
    }
    // trimming a concat of known widths
    if let (Term::Concat(h, l), Some((_, lw))) = (&a, concat_low_width(&a)) {
        if hi < lw {
            return extract(hi, lo, (**l).clone());
        }
        if lo >= lw {
            return extract(hi - lw, lo - lw, (**h).clone());
        }
    }
    Term::Extract(hi, lo, Box::new(a))
}

/// Width of the low half of a concat, when it is a literal.
fn concat_low_width(t: &Term) -> Option<((), u32)> {
    if let Term::Concat(_, l) = t {
        if let Some((_, w)) = l.as_bv_lit() {
            return Some(((), w));
        }
    }
    None
}

pub fn concat(hi: Term, lo: Term) -> Term {
    if let (Some((x, wx)), Some((y, wy))) = (hi.as_bv_lit(), lo.as_bv_lit()) {
        if wx + wy <= 128 {
            let r = (norm(x, wx) << wy) | norm(y, wy);
            return Term::BitVecLit(signed(r, wx + wy), wx + wy);
        }
    }
    Term::Concat(Box::new(hi), Box::new(lo))
}

/// Concatenate a list, first element highest.
pub fn concat_many(mut parts: Vec<Term>) -> Term {
    let mut acc = match parts.pop() {
        Some(t) => t,
        None => return bv_zero(0),
    };
    while let Some(hi) = parts.pop() {
        acc = concat(hi, acc);
    }
    acc
}

// ---------------------------------------------------------------------------
// i1 <-> Bool
// ---------------------------------------------------------------------------

/// A 1-bit vector from a boolean (comparison results are stored as `i1`).
pub fn bool_to_bv1(t: Term) -> Term {
    match t.as_bool_lit() {
        Some(b) => bv(b as i128, 1),
        None => ite(t, bv_one(1), bv_zero(1)),
    }
}

/// Truth of a 1-bit vector.
pub fn bv1_to_bool(t: Term) -> Term {
    eq(t, bv_one(1))
}

// ---------------------------------------------------------------------------
// Tuples
// ---------------------------------------------------------------------------

pub fn pack(lanes: Vec<Term>) -> Term {
    Term::Pack(lanes)
}

/// Tuple projection; folds through `Pack` and through ITEs of `Pack`s so
/// lane-wise encoders see through freshly built aggregates.
pub fn unpack(i: usize, t: Term) -> Term {
    match t {
        Term::Pack(mut lanes) => {
            assert!(i < lanes.len(), "tuple projection out of range");
            lanes.swap_remove(i)
        }
        Term::Ite(c, a, b) => ite(*c, unpack(i, *a), unpack(i, *b)),
        other => Term::Unpack(i, Box::new(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn not_folds() {
        assert_eq!(not(tru()), fls());
        assert_eq!(not(not(var("p"))), var("p"));
    }

    #[test]
    fn and_identity_and_absorption() {
        assert_eq!(and2(tru(), var("p")), var("p"));
        assert_eq!(and2(var("p"), fls()), fls());
        assert_eq!(and_many(vec![]), tru());
    }

    #[test]
    fn and_flattens_nested() {
        let inner = Term::And(vec![var("a"), var("b")]);
        assert_eq!(
            and2(inner, var("c")),
            Term::And(vec![var("a"), var("b"), var("c")])
        );
    }

    #[test]
    fn or_identity_and_absorption() {
        assert_eq!(or2(fls(), var("p")), var("p"));
        assert_eq!(or2(var("p"), tru()), tru());
        assert_eq!(or_many(vec![]), fls());
    }

    #[test]
    fn implies_folds() {
        assert_eq!(implies(fls(), var("p")), tru());
        assert_eq!(implies(tru(), var("p")), var("p"));
        assert_eq!(implies(var("p"), var("p")), tru());
        assert_eq!(implies(var("p"), fls()), not(var("p")));
    }

    #[test]
    fn eq_structural_fold() {
        assert_eq!(eq(var("x"), var("x")), tru());
        assert_eq!(eq(bv(3, 8), bv(3, 8)), tru());
        assert_eq!(eq(bv(3, 8), bv(4, 8)), fls());
        // -1 and 255 are the same 8-bit value
        assert_eq!(eq(bv(-1, 8), bv(255, 8)), tru());
    }

    #[test]
    fn eq_does_not_fold_uninterpreted_apps() {
        let f = Term::App("f".into(), vec![var("x")]);
        assert!(matches!(eq(f.clone(), f), Term::Eq(..)));
    }

    #[test]
    fn ite_folds() {
        assert_eq!(ite(tru(), bv(1, 8), bv(2, 8)), bv(1, 8));
        assert_eq!(ite(fls(), bv(1, 8), bv(2, 8)), bv(2, 8));
        assert_eq!(ite(var("c"), bv(1, 8), bv(1, 8)), bv(1, 8));
        assert_eq!(ite(var("c"), tru(), fls()), var("c"));
        assert_eq!(ite(var("c"), fls(), tru()), not(var("c")));
    }

    #[test]
    fn add_sub_mul_fold() {
        assert_eq!(bvadd(bv(200, 8), bv(100, 8)), bv(44, 8));
        assert_eq!(bvadd(bv_zero(8), var("x")), var("x"));
        assert_eq!(bvsub(bv(1, 8), bv(2, 8)), bv(-1, 8));
        assert_eq!(bvmul(bv(16, 8), bv(16, 8)), bv(0, 8));
        assert_eq!(bvmul(bv_one(8), var("x")), var("x"));
        assert_eq!(bvneg(bv(1, 8)), bv(-1, 8));
    }

    #[test]
    fn div_rem_fold_nonzero_divisor() {
        assert_eq!(bvsdiv(bv(-7, 8), bv(2, 8)), bv(-3, 8));
        assert_eq!(bvudiv(bv(7, 8), bv(2, 8)), bv(3, 8));
        assert_eq!(bvsrem(bv(-7, 8), bv(2, 8)), bv(-1, 8));
        assert_eq!(bvurem(bv(7, 8), bv(2, 8)), bv(1, 8));
        // INT_MIN / -1 wraps to INT_MIN
        assert_eq!(bvsdiv(bv(-128, 8), bv(-1, 8)), bv(-128, 8));
        // zero divisor is left symbolic
        assert!(matches!(bvudiv(bv(7, 8), bv(0, 8)), Term::BvUDiv(..)));
    }

    #[test]
    fn comparisons_fold() {
        assert_eq!(slt(bv(-1, 8), bv(0, 8)), tru());
        assert_eq!(ult(bv(-1, 8), bv(0, 8)), fls()); // -1 is 255 unsigned
        assert_eq!(uge(bv(255, 8), bv(1, 8)), tru());
        assert_eq!(sge(bv(-128, 8), bv(127, 8)), fls());
    }

    #[test]
    fn shifts_fold_with_smt_out_of_range() {
        assert_eq!(shl(bv(1, 8), bv(3, 8)), bv(8, 8));
        assert_eq!(shl(bv(1, 8), bv(8, 8)), bv(0, 8));
        assert_eq!(lshr(bv(-1, 8), bv(4, 8)), bv(15, 8));
        assert_eq!(ashr(bv(-128, 8), bv(7, 8)), bv(-1, 8));
        assert_eq!(ashr(bv(-128, 8), bv(200, 8)), bv(-1, 8));
    }

    #[test]
    fn bitwise_folds() {
        assert_eq!(bvand(bv_zero(8), var("x")), bv_zero(8));
        assert_eq!(bvand(bv_ones(8), var("x")), var("x"));
        assert_eq!(bvor(bv_zero(8), var("x")), var("x"));
        assert_eq!(bvxor(bv(0b1100, 8), bv(0b1010, 8)), bv(0b0110, 8));
        assert_eq!(bvnot(bv_zero(8)), bv_ones(8));
    }

    #[test]
    fn structure_folds() {
        assert_eq!(zext(8, bv(-1, 8)), bv(255, 16));
        assert_eq!(sext(8, bv(-1, 8)), bv(-1, 16));
        assert_eq!(extract(3, 0, bv(0xAB, 8)), bv(0xB, 4));
        assert_eq!(concat(bv(0xA, 4), bv(0xB, 4)), bv(0xAB, 8));
        assert_eq!(concat_many(vec![bv(1, 4), bv(2, 4), bv(3, 4)]), bv(0x123, 12));
    }

    #[test]
    fn extract_through_concat() {
        let c = concat(var("hi"), bv(0xB, 4));
        assert_eq!(extract(3, 0, c.clone()), bv(0xB, 4));
        assert_eq!(extract(7, 4, c), var("hi"));
    }

    #[test]
    fn bool_bv1_round_trip() {
        assert_eq!(bool_to_bv1(tru()), bv_one(1));
        assert_eq!(bv1_to_bool(bv_one(1)), tru());
        assert_eq!(bv1_to_bool(bv_zero(1)), fls());
    }

    #[test]
    fn unpack_sees_through_pack_and_ite() {
        let p = pack(vec![var("a"), var("b")]);
        assert_eq!(unpack(1, p.clone()), var("b"));
        let q = pack(vec![var("c"), var("d")]);
        let t = Term::Ite(Box::new(var("cond")), Box::new(p), Box::new(q));
        assert_eq!(
            unpack(0, t),
            ite(var("cond"), var("a"), var("c"))
        );
    }

    #[test]
    fn smin_smax_literals() {
        assert_eq!(bv_smin(8), bv(-128, 8));
        assert_eq!(bv_smax(8), bv(127, 8));
        assert_eq!(bv_ones(8), bv(255, 8));
    }

    proptest! {
        #[test]
        fn prop_add_matches_wrapping(a in any::<u8>(), b in any::<u8>()) {
            let r = bvadd(bv(a as i128, 8), bv(b as i128, 8));
            let (v, w) = r.as_bv_lit().unwrap();
            prop_assert_eq!(w, 8);
            prop_assert_eq!(norm(v, 8) as u8, a.wrapping_add(b));
        }

        #[test]
        fn prop_signed_norm_round_trip(v in any::<i8>()) {
            prop_assert_eq!(signed(norm(v as i128, 8), 8), v as i128);
        }

        #[test]
        fn prop_ult_matches_unsigned(a in any::<u8>(), b in any::<u8>()) {
            let r = ult(bv(a as i128, 8), bv(b as i128, 8));
            prop_assert_eq!(r.as_bool_lit().unwrap(), a < b);
        }
    }
}
