use crate::sort::Sort;

/// IEEE 754 rounding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundingMode {
    /// Round to nearest, ties to even
    Rne,
    /// Round to nearest, ties away from zero
    Rna,
    /// Round toward positive infinity
    Rtp,
    /// Round toward negative infinity
    Rtn,
    /// Round toward zero
    Rtz,
}

impl RoundingMode {
    pub const ALL: [RoundingMode; 5] = [
        RoundingMode::Rne,
        RoundingMode::Rna,
        RoundingMode::Rtp,
        RoundingMode::Rtn,
        RoundingMode::Rtz,
    ];

    /// SMT-LIB spelling of the mode.
    pub fn smt_name(self) -> &'static str {
        match self {
            RoundingMode::Rne => "RNE",
            RoundingMode::Rna => "RNA",
            RoundingMode::Rtp => "RTP",
            RoundingMode::Rtn => "RTN",
            RoundingMode::Rtz => "RTZ",
        }
    }
}

/// SMT-LIB term (expression) representation.
///
/// Constructed through the smart constructors in [`crate::build`], which
/// perform local constant folding; direct enum construction is reserved for
/// tests and for the folding layer itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    // === Literals ===
    /// Boolean literal
    BoolLit(bool),
    /// Bitvector literal with value and width
    BitVecLit(i128, u32),

    // === Variables ===
    /// Named constant/variable reference
    Const(String),

    // === Boolean operations ===
    /// Logical NOT
    Not(Box<Term>),
    /// Logical AND (n-ary)
    And(Vec<Term>),
    /// Logical OR (n-ary)
    Or(Vec<Term>),
    /// Logical implication: `(=> a b)`
    Implies(Box<Term>, Box<Term>),

    // === Core ===
    /// Equality: `(= a b)`
    Eq(Box<Term>, Box<Term>),
    /// Distinct: `(distinct a b ...)`
    Distinct(Vec<Term>),
    /// If-then-else: `(ite cond then else)`
    Ite(Box<Term>, Box<Term>, Box<Term>),

    // === Bitvector arithmetic ===
    /// `(bvadd a b)`
    BvAdd(Box<Term>, Box<Term>),
    /// `(bvsub a b)`
    BvSub(Box<Term>, Box<Term>),
    /// `(bvmul a b)`
    BvMul(Box<Term>, Box<Term>),
    /// `(bvsdiv a b)` — signed division
    BvSDiv(Box<Term>, Box<Term>),
    /// `(bvudiv a b)` — unsigned division
    BvUDiv(Box<Term>, Box<Term>),
    /// `(bvsrem a b)` — signed remainder
    BvSRem(Box<Term>, Box<Term>),
    /// `(bvurem a b)` — unsigned remainder
    BvURem(Box<Term>, Box<Term>),
    /// `(bvneg a)` — two's complement negation
    BvNeg(Box<Term>),

    // === Bitvector comparison (signed) ===
    /// `(bvslt a b)` — signed less-than
    BvSLt(Box<Term>, Box<Term>),
    /// `(bvsle a b)` — signed less-or-equal
    BvSLe(Box<Term>, Box<Term>),
    /// `(bvsgt a b)` — signed greater-than
    BvSGt(Box<Term>, Box<Term>),
    /// `(bvsge a b)` — signed greater-or-equal
    BvSGe(Box<Term>, Box<Term>),

    // === Bitvector comparison (unsigned) ===
    /// `(bvult a b)` — unsigned less-than
    BvULt(Box<Term>, Box<Term>),
    /// `(bvule a b)` — unsigned less-or-equal
    BvULe(Box<Term>, Box<Term>),
    /// `(bvugt a b)` — unsigned greater-than
    BvUGt(Box<Term>, Box<Term>),
    /// `(bvuge a b)` — unsigned greater-or-equal
    BvUGe(Box<Term>, Box<Term>),

    // === Bitvector bitwise ===
    /// `(bvand a b)`
    BvAnd(Box<Term>, Box<Term>),
    /// `(bvor a b)`
    BvOr(Box<Term>, Box<Term>),
    /// `(bvxor a b)`
    BvXor(Box<Term>, Box<Term>),
    /// `(bvnot a)`
    BvNot(Box<Term>),
    /// `(bvshl a b)` — shift left
    BvShl(Box<Term>, Box<Term>),
    /// `(bvlshr a b)` — logical shift right
    BvLShr(Box<Term>, Box<Term>),
    /// `(bvashr a b)` — arithmetic shift right
    BvAShr(Box<Term>, Box<Term>),

    // === Bitvector structure ===
    /// `((_ zero_extend n) a)`
    ZeroExtend(u32, Box<Term>),
    /// `((_ sign_extend n) a)`
    SignExtend(u32, Box<Term>),
    /// `((_ extract hi lo) a)`
    Extract(u32, u32, Box<Term>),
    /// `(concat a b)`
    Concat(Box<Term>, Box<Term>),

    // === Array operations ===
    /// `(select array index)`
    Select(Box<Term>, Box<Term>),
    /// `(store array index value)`
    Store(Box<Term>, Box<Term>, Box<Term>),

    // === Tuples ===
    /// Tuple constructor; lane `i` is recovered with [`Term::Unpack`]
    Pack(Vec<Term>),
    /// Tuple projection: `Unpack(i, Pack(vs))` folds to `vs[i]`
    Unpack(usize, Box<Term>),

    // === Quantifiers ===
    /// `(forall ((x Sort) ...) body)`
    Forall(Vec<(String, Sort)>, Box<Term>),
    /// `(exists ((x Sort) ...) body)`
    Exists(Vec<(String, Sort)>, Box<Term>),

    // === Function application ===
    /// `(f arg1 arg2 ...)`
    App(String, Vec<Term>),

    // === Rounding mode ===
    /// Rounding-mode literal: RNE, RNA, RTP, RTN, RTZ
    RoundMode(RoundingMode),

    // === Floating-point literals ===
    /// IEEE 754 NaN: `(_ NaN eb sb)`
    FpNaN(u32, u32),
    /// Positive infinity: `(_ +oo eb sb)`
    FpPosInf(u32, u32),
    /// Negative infinity: `(_ -oo eb sb)`
    FpNegInf(u32, u32),
    /// Positive zero: `(_ +zero eb sb)`
    FpPosZero(u32, u32),
    /// Negative zero: `(_ -zero eb sb)`
    FpNegZero(u32, u32),

    // === Floating-point arithmetic ===
    /// `(fp.add rm x y)`
    FpAdd(Box<Term>, Box<Term>, Box<Term>),
    /// `(fp.sub rm x y)`
    FpSub(Box<Term>, Box<Term>, Box<Term>),
    /// `(fp.mul rm x y)`
    FpMul(Box<Term>, Box<Term>, Box<Term>),
    /// `(fp.div rm x y)`
    FpDiv(Box<Term>, Box<Term>, Box<Term>),
    /// `(fp.fma rm x y z)` — fused `x * y + z`, rounded once
    FpFma(Box<Term>, Box<Term>, Box<Term>, Box<Term>),
    /// `(fp.sqrt rm x)`
    FpSqrt(Box<Term>, Box<Term>),
    /// `(fp.rem x y)` — IEEE remainder (no rounding mode)
    FpRem(Box<Term>, Box<Term>),
    /// `(fp.roundToIntegral rm x)`
    FpRoundToIntegral(Box<Term>, Box<Term>),
    /// `(fp.abs x)`
    FpAbs(Box<Term>),
    /// `(fp.neg x)`
    FpNeg(Box<Term>),

    // === Floating-point comparison ===
    /// `(fp.eq x y)` — IEEE 754 equality
    FpEq(Box<Term>, Box<Term>),
    /// `(fp.lt x y)`
    FpLt(Box<Term>, Box<Term>),
    /// `(fp.leq x y)`
    FpLeq(Box<Term>, Box<Term>),
    /// `(fp.gt x y)`
    FpGt(Box<Term>, Box<Term>),
    /// `(fp.geq x y)`
    FpGeq(Box<Term>, Box<Term>),

    // === Floating-point predicates ===
    /// `(fp.isNaN x)`
    FpIsNaN(Box<Term>),
    /// `(fp.isInfinite x)`
    FpIsInfinite(Box<Term>),
    /// `(fp.isZero x)`
    FpIsZero(Box<Term>),
    /// `(fp.isNegative x)`
    FpIsNegative(Box<Term>),
    /// `(fp.isPositive x)`
    FpIsPositive(Box<Term>),
    /// `(fp.isSubnormal x)`
    FpIsSubnormal(Box<Term>),
    /// `(fp.isNormal x)`
    FpIsNormal(Box<Term>),

    // === Floating-point conversion ===
    /// `((_ to_fp e s) rm x)` with `x` a float — format conversion
    FpToFp(u32, u32, Box<Term>, Box<Term>),
    /// `((_ to_fp e s) rm x)` with `x` a signed bitvector
    SBvToFp(u32, u32, Box<Term>, Box<Term>),
    /// `((_ to_fp_unsigned e s) rm x)`
    UBvToFp(u32, u32, Box<Term>, Box<Term>),
    /// `((_ fp.to_sbv w) rm x)`
    FpToSBv(u32, Box<Term>, Box<Term>),
    /// `((_ fp.to_ubv w) rm x)`
    FpToUBv(u32, Box<Term>, Box<Term>),
    /// `((_ to_fp e s) x)` with `x` an IEEE-754 bit pattern — reinterpret
    BvToFp(u32, u32, Box<Term>),
    /// `(fp.to_ieee_bv x)` — reinterpret a float as its bit pattern
    FpToIeeeBv(Box<Term>),
}

impl Term {
    /// `true` iff this is the literal `true`.
    pub fn is_true(&self) -> bool {
        matches!(self, Term::BoolLit(true))
    }

    /// `true` iff this is the literal `false`.
    pub fn is_false(&self) -> bool {
        matches!(self, Term::BoolLit(false))
    }

    /// The boolean literal value, if this term is one.
    pub fn as_bool_lit(&self) -> Option<bool> {
        match self {
            Term::BoolLit(b) => Some(*b),
            _ => None,
        }
    }

    /// The bitvector literal `(value, width)`, if this term is one.
    pub fn as_bv_lit(&self) -> Option<(i128, u32)> {
        match self {
            Term::BitVecLit(v, w) => Some((*v, *w)),
            _ => None,
        }
    }

    /// Whether the term is a literal of any kind. Loop unrollers use this to
    /// detect that a continuation condition has collapsed to a constant.
    pub fn is_const(&self) -> bool {
        matches!(
            self,
            Term::BoolLit(_)
                | Term::BitVecLit(..)
                | Term::FpNaN(..)
                | Term::FpPosInf(..)
                | Term::FpNegInf(..)
                | Term::FpPosZero(..)
                | Term::FpNegZero(..)
                | Term::RoundMode(_)
        )
    }
}

/// A conjunction under construction.
///
/// Accumulates boolean terms, dropping `true` and collapsing to `false`
/// eagerly, and renders into a single [`Term`] at the end. Encoders thread
/// one of these per verification condition they accumulate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conjunction {
    terms: Vec<Term>,
    poisoned: bool,
}

impl Conjunction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one conjunct. `true` is a no-op; `false` absorbs the whole
    /// conjunction.
    pub fn add(&mut self, t: Term) {
        if self.poisoned || t.is_true() {
            return;
        }
        if t.is_false() {
            self.poisoned = true;
            self.terms.clear();
            return;
        }
        if !self.terms.contains(&t) {
            self.terms.push(t);
        }
    }

    /// Merge another conjunction into this one.
    pub fn extend(&mut self, other: Conjunction) {
        if other.poisoned {
            self.poisoned = true;
            self.terms.clear();
            return;
        }
        for t in other.terms {
            self.add(t);
        }
    }

    /// `true` iff no conjunct has been added (the conjunction is trivially
    /// `true`).
    pub fn is_trivially_true(&self) -> bool {
        !self.poisoned && self.terms.is_empty()
    }

    /// `true` iff the conjunction has collapsed to `false`.
    pub fn is_trivially_false(&self) -> bool {
        self.poisoned
    }

    /// Render the accumulated conjunction as a single term.
    pub fn finish(self) -> Term {
        if self.poisoned {
            return Term::BoolLit(false);
        }
        match self.terms.len() {
            0 => Term::BoolLit(true),
            1 => {
                let mut terms = self.terms;
                terms.pop().unwrap_or(Term::BoolLit(true))
            }
            _ => Term::And(self.terms),
        }
    }

    /// Render without consuming.
    pub fn peek(&self) -> Term {
        self.clone().finish()
    }
}
