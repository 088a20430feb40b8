//! Derived floating-point combinators.
//!
//! SMT-LIB's FP theory has no `fp.min`/`fp.max` with the zero and NaN
//! behavior LLVM-like IRs need, and no sign-transfer primitive; these are
//! assembled here from comparisons, classification predicates, and bit-level
//! reinterpretation.

use crate::build::{concat, extract, ite, or2};
use crate::term::{RoundingMode, Term};

/// An IEEE 754 interchange format: exponent and significand widths, the
/// significand including the hidden bit (SMT-LIB convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FloatFormat {
    pub exp_bits: u32,
    pub sig_bits: u32,
}

impl FloatFormat {
    pub const HALF: FloatFormat = FloatFormat::new(5, 11);
    pub const BFLOAT: FloatFormat = FloatFormat::new(8, 8);
    pub const FLOAT: FloatFormat = FloatFormat::new(8, 24);
    pub const DOUBLE: FloatFormat = FloatFormat::new(11, 53);
    pub const QUAD: FloatFormat = FloatFormat::new(15, 113);

    pub const fn new(exp_bits: u32, sig_bits: u32) -> Self {
        Self { exp_bits, sig_bits }
    }

    /// Total bit width of the interchange encoding.
    pub const fn total_bits(self) -> u32 {
        self.exp_bits + self.sig_bits
    }

    pub fn nan(self) -> Term {
        Term::FpNaN(self.exp_bits, self.sig_bits)
    }

    pub fn pos_inf(self) -> Term {
        Term::FpPosInf(self.exp_bits, self.sig_bits)
    }

    pub fn neg_inf(self) -> Term {
        Term::FpNegInf(self.exp_bits, self.sig_bits)
    }

    pub fn pos_zero(self) -> Term {
        Term::FpPosZero(self.exp_bits, self.sig_bits)
    }

    pub fn neg_zero(self) -> Term {
        Term::FpNegZero(self.exp_bits, self.sig_bits)
    }

    /// Reinterpret an IEEE bit pattern in this format.
    pub fn from_bits(self, bits: Term) -> Term {
        Term::BvToFp(self.exp_bits, self.sig_bits, Box::new(bits))
    }
}

/// Rounding-mode literal term.
pub fn rm(mode: RoundingMode) -> Term {
    Term::RoundMode(mode)
}

pub fn fp_is_nan(x: Term) -> Term {
    Term::FpIsNaN(Box::new(x))
}

pub fn fp_lt(a: Term, b: Term) -> Term {
    Term::FpLt(Box::new(a), Box::new(b))
}

pub fn fp_gt(a: Term, b: Term) -> Term {
    Term::FpGt(Box::new(a), Box::new(b))
}

/// `minnum`: the lesser operand; a NaN operand yields the other one, and a
/// tie between `-0.0` and `+0.0` yields the negative zero.
pub fn minnum(a: Term, b: Term) -> Term {
    ite(
        fp_is_nan(a.clone()),
        b.clone(),
        ite(
            fp_is_nan(b.clone()),
            a.clone(),
            ite(
                fp_lt(a.clone(), b.clone()),
                a.clone(),
                ite(
                    fp_gt(a.clone(), b.clone()),
                    b.clone(),
                    ite(Term::FpIsNegative(Box::new(a.clone())), a, b),
                ),
            ),
        ),
    )
}

/// `maxnum`: dual of [`minnum`]; ties between zeros yield `+0.0`.
pub fn maxnum(a: Term, b: Term) -> Term {
    ite(
        fp_is_nan(a.clone()),
        b.clone(),
        ite(
            fp_is_nan(b.clone()),
            a.clone(),
            ite(
                fp_gt(a.clone(), b.clone()),
                a.clone(),
                ite(
                    fp_lt(a.clone(), b.clone()),
                    b.clone(),
                    ite(Term::FpIsPositive(Box::new(a.clone())), a, b),
                ),
            ),
        ),
    )
}

/// `minimum`: NaN-propagating minimum with `-0.0 < +0.0`.
pub fn minimum(a: Term, b: Term, fmt: FloatFormat) -> Term {
    ite(
        or2(fp_is_nan(a.clone()), fp_is_nan(b.clone())),
        fmt.nan(),
        ite(
            fp_lt(a.clone(), b.clone()),
            a.clone(),
            ite(
                fp_gt(a.clone(), b.clone()),
                b.clone(),
                ite(Term::FpIsNegative(Box::new(a.clone())), a, b),
            ),
        ),
    )
}

/// `maximum`: NaN-propagating maximum with `+0.0 > -0.0`.
pub fn maximum(a: Term, b: Term, fmt: FloatFormat) -> Term {
    ite(
        or2(fp_is_nan(a.clone()), fp_is_nan(b.clone())),
        fmt.nan(),
        ite(
            fp_gt(a.clone(), b.clone()),
            a.clone(),
            ite(
                fp_lt(a.clone(), b.clone()),
                b.clone(),
                ite(Term::FpIsPositive(Box::new(a.clone())), a, b),
            ),
        ),
    )
}

/// `copysign(a, b)`: magnitude of `a` with the sign bit of `b`, transferred
/// at the bit level so NaN payloads and signs survive.
pub fn copysign(a: Term, b: Term, fmt: FloatFormat) -> Term {
    let w = fmt.total_bits();
    let a_bits = Term::FpToIeeeBv(Box::new(a));
    let b_bits = Term::FpToIeeeBv(Box::new(b));
    let sign = extract(w - 1, w - 1, b_bits);
    let magnitude = extract(w - 2, 0, a_bits);
    fmt.from_bits(concat(sign, magnitude))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::var;

    #[test]
    fn format_bit_widths() {
        assert_eq!(FloatFormat::HALF.total_bits(), 16);
        assert_eq!(FloatFormat::BFLOAT.total_bits(), 16);
        assert_eq!(FloatFormat::FLOAT.total_bits(), 32);
        assert_eq!(FloatFormat::DOUBLE.total_bits(), 64);
        assert_eq!(FloatFormat::QUAD.total_bits(), 128);
    }

    #[test]
    fn literal_builders() {
        assert_eq!(FloatFormat::FLOAT.nan(), Term::FpNaN(8, 24));
        assert_eq!(FloatFormat::DOUBLE.neg_zero(), Term::FpNegZero(11, 53));
    }

    #[test]
    fn minnum_prefers_non_nan() {
        let t = minnum(var("a"), var("b"));
        // outermost test must be the NaN check on the first operand
        match t {
            Term::Ite(c, then_b, _) => {
                assert_eq!(*c, fp_is_nan(var("a")));
                assert_eq!(*then_b, var("b"));
            }
            other => panic!("expected ite, got {other:?}"),
        }
    }

    #[test]
    fn minimum_propagates_nan() {
        let t = minimum(var("a"), var("b"), FloatFormat::FLOAT);
        match t {
            Term::Ite(_, then_b, _) => assert_eq!(*then_b, FloatFormat::FLOAT.nan()),
            other => panic!("expected ite, got {other:?}"),
        }
    }

    #[test]
    fn copysign_splices_sign_bit() {
        let t = copysign(var("a"), var("b"), FloatFormat::FLOAT);
        match t {
            Term::BvToFp(8, 24, inner) => match *inner {
                Term::Concat(sign, magnitude) => {
                    assert_eq!(*sign, extract(31, 31, Term::FpToIeeeBv(Box::new(var("b")))));
                    assert_eq!(
                        *magnitude,
                        extract(30, 0, Term::FpToIeeeBv(Box::new(var("a"))))
                    );
                }
                other => panic!("expected concat, got {other:?}"),
            },
            other => panic!("expected bit reinterpretation, got {other:?}"),
        }
    }
}
