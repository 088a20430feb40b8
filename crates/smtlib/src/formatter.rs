//! SMT-LIB2 text formatting for AST types.
//!
//! Implements `Display` for [`Sort`], [`Term`], [`Command`], and [`Script`],
//! producing valid SMT-LIB2 output that can be parsed by solvers such as Z3.
//! Tuple terms are emitted against an assumed datatype with constructor
//! `tup.mk` and selectors `tup.sel<i>`; declaring that datatype is the
//! consumer's responsibility.

use std::fmt;

use crate::command::Command;
use crate::script::Script;
use crate::sort::Sort;
use crate::term::Term;

// ---------------------------------------------------------------------------
// Sort
// ---------------------------------------------------------------------------

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::BitVec(width) => write!(f, "(_ BitVec {width})"),
            Sort::Float(e, s) => write!(f, "(_ FloatingPoint {e} {s})"),
            Sort::RoundingMode => write!(f, "RoundingMode"),
            Sort::Array(index, element) => write!(f, "(Array {index} {element})"),
            Sort::Tuple(elems) => {
                write!(f, "(Tup")?;
                for e in elems {
                    write!(f, " {e}")?;
                }
                write!(f, ")")
            }
            Sort::Uninterpreted(name) => write!(f, "{name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Term
// ---------------------------------------------------------------------------

/// Format a bitvector literal. Negative values are converted to their
/// two's-complement unsigned representation for the given bit-width.
fn fmt_bv_lit(value: i128, width: u32, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let unsigned = if width >= 128 {
        value as u128
    } else {
        (value as u128) & ((1u128 << width) - 1)
    };
    write!(f, "(_ bv{unsigned} {width})")
}

/// Write a binary SMT-LIB operator: `(op lhs rhs)`.
fn fmt_binop(op: &str, lhs: &Term, rhs: &Term, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({op} {lhs} {rhs})")
}

/// Write a unary SMT-LIB operator: `(op arg)`.
fn fmt_unop(op: &str, arg: &Term, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({op} {arg})")
}

/// Write sorted variable bindings: `((x Sort) (y Sort) ...)`.
fn fmt_sorted_vars(vars: &[(String, Sort)], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "(")?;
    for (i, (name, sort)) in vars.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "({name} {sort})")?;
    }
    write!(f, ")")
}

/// Write a space-separated list of terms.
fn fmt_term_list(terms: &[Term], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, t) in terms.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{t}")?;
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // --- Literals ---
            Term::BoolLit(true) => write!(f, "true"),
            Term::BoolLit(false) => write!(f, "false"),
            Term::BitVecLit(value, width) => fmt_bv_lit(*value, *width, f),

            // --- Variables ---
            Term::Const(name) => write!(f, "{name}"),

            // --- Boolean operations ---
            Term::Not(inner) => fmt_unop("not", inner, f),
            Term::And(terms) => {
                if terms.is_empty() {
                    write!(f, "true")
                } else {
                    write!(f, "(and ")?;
                    fmt_term_list(terms, f)?;
                    write!(f, ")")
                }
            }
            Term::Or(terms) => {
                if terms.is_empty() {
                    write!(f, "false")
                } else {
                    write!(f, "(or ")?;
                    fmt_term_list(terms, f)?;
                    write!(f, ")")
                }
            }
            Term::Implies(lhs, rhs) => fmt_binop("=>", lhs, rhs, f),

            // --- Core ---
            Term::Eq(lhs, rhs) => fmt_binop("=", lhs, rhs, f),
            Term::Distinct(terms) => {
                write!(f, "(distinct ")?;
                fmt_term_list(terms, f)?;
                write!(f, ")")
            }
            Term::Ite(cond, then_branch, else_branch) => {
                write!(f, "(ite {cond} {then_branch} {else_branch})")
            }

            // --- Bitvector arithmetic ---
            Term::BvAdd(a, b) => fmt_binop("bvadd", a, b, f),
            Term::BvSub(a, b) => fmt_binop("bvsub", a, b, f),
            Term::BvMul(a, b) => fmt_binop("bvmul", a, b, f),
            Term::BvSDiv(a, b) => fmt_binop("bvsdiv", a, b, f),
            Term::BvUDiv(a, b) => fmt_binop("bvudiv", a, b, f),
            Term::BvSRem(a, b) => fmt_binop("bvsrem", a, b, f),
            Term::BvURem(a, b) => fmt_binop("bvurem", a, b, f),
            Term::BvNeg(a) => fmt_unop("bvneg", a, f),

            // --- Bitvector comparison ---
            Term::BvSLt(a, b) => fmt_binop("bvslt", a, b, f),
            Term::BvSLe(a, b) => fmt_binop("bvsle", a, b, f),
            Term::BvSGt(a, b) => fmt_binop("bvsgt", a, b, f),
            Term::BvSGe(a, b) => fmt_binop("bvsge", a, b, f),
            Term::BvULt(a, b) => fmt_binop("bvult", a, b, f),
            Term::BvULe(a, b) => fmt_binop("bvule", a, b, f),
            Term::BvUGt(a, b) => fmt_binop("bvugt", a, b, f),
            Term::BvUGe(a, b) => fmt_binop("bvuge", a, b, f),

            // --- Bitvector bitwise ---
            Term::BvAnd(a, b) => fmt_binop("bvand", a, b, f),
            Term::BvOr(a, b) => fmt_binop("bvor", a, b, f),
            Term::BvXor(a, b) => fmt_binop("bvxor", a, b, f),
            Term::BvNot(a) => fmt_unop("bvnot", a, f),
            Term::BvShl(a, b) => fmt_binop("bvshl", a, b, f),
            Term::BvLShr(a, b) => fmt_binop("bvlshr", a, b, f),
            Term::BvAShr(a, b) => fmt_binop("bvashr", a, b, f),

            // --- Bitvector structure ---
            Term::ZeroExtend(n, a) => write!(f, "((_ zero_extend {n}) {a})"),
            Term::SignExtend(n, a) => write!(f, "((_ sign_extend {n}) {a})"),
            Term::Extract(hi, lo, a) => write!(f, "((_ extract {hi} {lo}) {a})"),
            Term::Concat(a, b) => fmt_binop("concat", a, b, f),

            // --- Array operations ---
            Term::Select(arr, idx) => fmt_binop("select", arr, idx, f),
            Term::Store(arr, idx, val) => write!(f, "(store {arr} {idx} {val})"),

            // --- Tuples ---
            Term::Pack(lanes) => {
                write!(f, "(tup.mk ")?;
                fmt_term_list(lanes, f)?;
                write!(f, ")")
            }
            Term::Unpack(i, t) => write!(f, "((_ tup.sel {i}) {t})"),

            // --- Quantifiers ---
            Term::Forall(vars, body) => {
                write!(f, "(forall ")?;
                fmt_sorted_vars(vars, f)?;
                write!(f, " {body})")
            }
            Term::Exists(vars, body) => {
                write!(f, "(exists ")?;
                fmt_sorted_vars(vars, f)?;
                write!(f, " {body})")
            }

            // --- Function application ---
            Term::App(name, args) => {
                if args.is_empty() {
                    write!(f, "{name}")
                } else {
                    write!(f, "({name} ")?;
                    fmt_term_list(args, f)?;
                    write!(f, ")")
                }
            }

            // --- Rounding mode ---
            Term::RoundMode(mode) => write!(f, "{}", mode.smt_name()),

            // --- Floating-point literals ---
            Term::FpNaN(e, s) => write!(f, "(_ NaN {e} {s})"),
            Term::FpPosInf(e, s) => write!(f, "(_ +oo {e} {s})"),
            Term::FpNegInf(e, s) => write!(f, "(_ -oo {e} {s})"),
            Term::FpPosZero(e, s) => write!(f, "(_ +zero {e} {s})"),
            Term::FpNegZero(e, s) => write!(f, "(_ -zero {e} {s})"),

            // --- Floating-point arithmetic ---
            Term::FpAdd(rm, x, y) => write!(f, "(fp.add {rm} {x} {y})"),
            Term::FpSub(rm, x, y) => write!(f, "(fp.sub {rm} {x} {y})"),
            Term::FpMul(rm, x, y) => write!(f, "(fp.mul {rm} {x} {y})"),
            Term::FpDiv(rm, x, y) => write!(f, "(fp.div {rm} {x} {y})"),
            Term::FpFma(rm, x, y, z) => write!(f, "(fp.fma {rm} {x} {y} {z})"),
            Term::FpSqrt(rm, x) => write!(f, "(fp.sqrt {rm} {x})"),
            Term::FpRem(x, y) => fmt_binop("fp.rem", x, y, f),
            Term::FpRoundToIntegral(rm, x) => {
                write!(f, "(fp.roundToIntegral {rm} {x})")
            }
            Term::FpAbs(x) => fmt_unop("fp.abs", x, f),
            Term::FpNeg(x) => fmt_unop("fp.neg", x, f),

            // --- Floating-point comparison ---
            Term::FpEq(x, y) => fmt_binop("fp.eq", x, y, f),
            Term::FpLt(x, y) => fmt_binop("fp.lt", x, y, f),
            Term::FpLeq(x, y) => fmt_binop("fp.leq", x, y, f),
            Term::FpGt(x, y) => fmt_binop("fp.gt", x, y, f),
            Term::FpGeq(x, y) => fmt_binop("fp.geq", x, y, f),

            // --- Floating-point predicates ---
            Term::FpIsNaN(x) => fmt_unop("fp.isNaN", x, f),
            Term::FpIsInfinite(x) => fmt_unop("fp.isInfinite", x, f),
            Term::FpIsZero(x) => fmt_unop("fp.isZero", x, f),
            Term::FpIsNegative(x) => fmt_unop("fp.isNegative", x, f),
            Term::FpIsPositive(x) => fmt_unop("fp.isPositive", x, f),
            Term::FpIsSubnormal(x) => fmt_unop("fp.isSubnormal", x, f),
            Term::FpIsNormal(x) => fmt_unop("fp.isNormal", x, f),

            // --- Floating-point conversion ---
            Term::FpToFp(e, s, rm, x) | Term::SBvToFp(e, s, rm, x) => {
                write!(f, "((_ to_fp {e} {s}) {rm} {x})")
            }
            Term::UBvToFp(e, s, rm, x) => {
                write!(f, "((_ to_fp_unsigned {e} {s}) {rm} {x})")
            }
            Term::FpToSBv(w, rm, x) => write!(f, "((_ fp.to_sbv {w}) {rm} {x})"),
            Term::FpToUBv(w, rm, x) => write!(f, "((_ fp.to_ubv {w}) {rm} {x})"),
            Term::BvToFp(e, s, x) => write!(f, "((_ to_fp {e} {s}) {x})"),
            Term::FpToIeeeBv(x) => fmt_unop("fp.to_ieee_bv", x, f),
        }
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetLogic(logic) => write!(f, "(set-logic {logic})"),
            Command::SetOption(key, value) => write!(f, "(set-option :{key} {value})"),
            Command::DeclareSort(name, arity) => {
                write!(f, "(declare-sort {name} {arity})")
            }
            Command::DeclareConst(name, sort) => {
                write!(f, "(declare-const {name} {sort})")
            }
            Command::DeclareFun(name, param_sorts, return_sort) => {
                write!(f, "(declare-fun {name} (")?;
                for (i, s) in param_sorts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{s}")?;
                }
                write!(f, ") {return_sort})")
            }
            Command::Assert(term) => write!(f, "(assert {term})"),
            Command::CheckSat => write!(f, "(check-sat)"),
            Command::GetModel => write!(f, "(get-model)"),
            Command::Push(n) => write!(f, "(push {n})"),
            Command::Pop(n) => write!(f, "(pop {n})"),
            Command::Comment(text) => write!(f, ";; {text}"),
            Command::Exit => write!(f, "(exit)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cmd) in self.commands().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{cmd}")?;
        }
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use crate::command::Command;
    use crate::script::Script;
    use crate::sort::Sort;
    use crate::term::{RoundingMode, Term};

    fn c(name: &str) -> Term {
        Term::Const(name.into())
    }

    fn b(t: Term) -> Box<Term> {
        Box::new(t)
    }

    // -----------------------------------------------------------------------
    // Sort formatting
    // -----------------------------------------------------------------------

    #[test]
    fn sort_basics() {
        assert_eq!(Sort::Bool.to_string(), "Bool");
        assert_eq!(Sort::BitVec(32).to_string(), "(_ BitVec 32)");
        assert_eq!(Sort::Float(8, 24).to_string(), "(_ FloatingPoint 8 24)");
        assert_eq!(Sort::RoundingMode.to_string(), "RoundingMode");
        assert_eq!(Sort::Uninterpreted("Blk".into()).to_string(), "Blk");
    }

    #[test]
    fn sort_array() {
        let s = Sort::Array(Box::new(Sort::BitVec(64)), Box::new(Sort::BitVec(8)));
        assert_eq!(s.to_string(), "(Array (_ BitVec 64) (_ BitVec 8))");
    }

    #[test]
    fn sort_tuple() {
        let s = Sort::Tuple(vec![Sort::BitVec(32), Sort::Bool]);
        assert_eq!(s.to_string(), "(Tup (_ BitVec 32) Bool)");
    }

    // -----------------------------------------------------------------------
    // Term formatting — literals, booleans, core
    // -----------------------------------------------------------------------

    #[test]
    fn term_literals() {
        assert_eq!(Term::BoolLit(true).to_string(), "true");
        assert_eq!(Term::BitVecLit(42, 32).to_string(), "(_ bv42 32)");
        // -1 in 8-bit two's complement = 255
        assert_eq!(Term::BitVecLit(-1, 8).to_string(), "(_ bv255 8)");
        assert_eq!(Term::BitVecLit(-128, 8).to_string(), "(_ bv128 8)");
    }

    #[test]
    fn term_boolean_ops() {
        assert_eq!(Term::Not(b(c("p"))).to_string(), "(not p)");
        assert_eq!(Term::And(vec![c("a"), c("b")]).to_string(), "(and a b)");
        assert_eq!(Term::And(vec![]).to_string(), "true");
        assert_eq!(Term::Or(vec![]).to_string(), "false");
        assert_eq!(Term::Implies(b(c("p")), b(c("q"))).to_string(), "(=> p q)");
    }

    #[test]
    fn term_core() {
        assert_eq!(Term::Eq(b(c("x")), b(c("y"))).to_string(), "(= x y)");
        assert_eq!(
            Term::Distinct(vec![c("a"), c("b"), c("c")]).to_string(),
            "(distinct a b c)"
        );
        assert_eq!(
            Term::Ite(b(c("c")), b(c("t")), b(c("e"))).to_string(),
            "(ite c t e)"
        );
    }

    // -----------------------------------------------------------------------
    // Term formatting — bitvectors
    // -----------------------------------------------------------------------

    #[test]
    fn term_bv_arith() {
        assert_eq!(Term::BvAdd(b(c("x")), b(c("y"))).to_string(), "(bvadd x y)");
        assert_eq!(Term::BvSDiv(b(c("a")), b(c("b"))).to_string(), "(bvsdiv a b)");
        assert_eq!(Term::BvURem(b(c("a")), b(c("b"))).to_string(), "(bvurem a b)");
        assert_eq!(Term::BvNeg(b(c("x"))).to_string(), "(bvneg x)");
    }

    #[test]
    fn term_bv_cmp() {
        assert_eq!(Term::BvSLt(b(c("a")), b(c("b"))).to_string(), "(bvslt a b)");
        assert_eq!(Term::BvUGe(b(c("a")), b(c("b"))).to_string(), "(bvuge a b)");
    }

    #[test]
    fn term_bv_bitwise_and_shifts() {
        assert_eq!(Term::BvXor(b(c("a")), b(c("b"))).to_string(), "(bvxor a b)");
        assert_eq!(Term::BvShl(b(c("a")), b(c("b"))).to_string(), "(bvshl a b)");
        assert_eq!(Term::BvAShr(b(c("a")), b(c("b"))).to_string(), "(bvashr a b)");
    }

    #[test]
    fn term_bv_structure() {
        assert_eq!(
            Term::ZeroExtend(8, b(c("x"))).to_string(),
            "((_ zero_extend 8) x)"
        );
        assert_eq!(
            Term::Extract(7, 0, b(c("x"))).to_string(),
            "((_ extract 7 0) x)"
        );
        assert_eq!(
            Term::Concat(b(c("hi")), b(c("lo"))).to_string(),
            "(concat hi lo)"
        );
    }

    // -----------------------------------------------------------------------
    // Term formatting — arrays, tuples, quantifiers, apps
    // -----------------------------------------------------------------------

    #[test]
    fn term_arrays() {
        assert_eq!(
            Term::Select(b(c("mem")), b(c("p"))).to_string(),
            "(select mem p)"
        );
        assert_eq!(
            Term::Store(b(c("mem")), b(c("p")), b(c("v"))).to_string(),
            "(store mem p v)"
        );
    }

    #[test]
    fn term_tuples() {
        assert_eq!(Term::Pack(vec![c("a"), c("b")]).to_string(), "(tup.mk a b)");
        assert_eq!(Term::Unpack(1, b(c("v"))).to_string(), "((_ tup.sel 1) v)");
    }

    #[test]
    fn term_quantifiers() {
        let t = Term::Exists(
            vec![("x".into(), Sort::BitVec(8))],
            b(Term::Eq(b(c("x")), b(c("y")))),
        );
        assert_eq!(t.to_string(), "(exists ((x (_ BitVec 8))) (= x y))");
        let t = Term::Forall(vec![("p".into(), Sort::Bool)], b(c("p")));
        assert_eq!(t.to_string(), "(forall ((p Bool)) p)");
    }

    #[test]
    fn term_app() {
        assert_eq!(Term::App("f".into(), vec![]).to_string(), "f");
        assert_eq!(
            Term::App("f".into(), vec![c("x"), c("y")]).to_string(),
            "(f x y)"
        );
    }

    // -----------------------------------------------------------------------
    // Term formatting — floating-point
    // -----------------------------------------------------------------------

    #[test]
    fn term_fp_literals() {
        assert_eq!(Term::FpNaN(8, 24).to_string(), "(_ NaN 8 24)");
        assert_eq!(Term::FpPosInf(11, 53).to_string(), "(_ +oo 11 53)");
        assert_eq!(Term::FpNegZero(8, 24).to_string(), "(_ -zero 8 24)");
        assert_eq!(Term::RoundMode(RoundingMode::Rne).to_string(), "RNE");
    }

    #[test]
    fn term_fp_arith() {
        let rne = Term::RoundMode(RoundingMode::Rne);
        assert_eq!(
            Term::FpAdd(b(rne.clone()), b(c("x")), b(c("y"))).to_string(),
            "(fp.add RNE x y)"
        );
        assert_eq!(
            Term::FpFma(b(rne.clone()), b(c("x")), b(c("y")), b(c("z"))).to_string(),
            "(fp.fma RNE x y z)"
        );
        assert_eq!(
            Term::FpSqrt(b(rne.clone()), b(c("x"))).to_string(),
            "(fp.sqrt RNE x)"
        );
        assert_eq!(
            Term::FpRoundToIntegral(b(rne), b(c("x"))).to_string(),
            "(fp.roundToIntegral RNE x)"
        );
        assert_eq!(Term::FpRem(b(c("x")), b(c("y"))).to_string(), "(fp.rem x y)");
        assert_eq!(Term::FpNeg(b(c("x"))).to_string(), "(fp.neg x)");
    }

    #[test]
    fn term_fp_cmp_and_predicates() {
        assert_eq!(Term::FpEq(b(c("x")), b(c("y"))).to_string(), "(fp.eq x y)");
        assert_eq!(Term::FpLeq(b(c("x")), b(c("y"))).to_string(), "(fp.leq x y)");
        assert_eq!(Term::FpIsNaN(b(c("x"))).to_string(), "(fp.isNaN x)");
        assert_eq!(
            Term::FpIsSubnormal(b(c("x"))).to_string(),
            "(fp.isSubnormal x)"
        );
    }

    #[test]
    fn term_fp_conversions() {
        let rne = Term::RoundMode(RoundingMode::Rne);
        assert_eq!(
            Term::FpToFp(11, 53, b(rne.clone()), b(c("x"))).to_string(),
            "((_ to_fp 11 53) RNE x)"
        );
        assert_eq!(
            Term::UBvToFp(8, 24, b(rne.clone()), b(c("x"))).to_string(),
            "((_ to_fp_unsigned 8 24) RNE x)"
        );
        assert_eq!(
            Term::FpToSBv(32, b(rne), b(c("x"))).to_string(),
            "((_ fp.to_sbv 32) RNE x)"
        );
        assert_eq!(
            Term::BvToFp(8, 24, b(c("bits"))).to_string(),
            "((_ to_fp 8 24) bits)"
        );
        assert_eq!(Term::FpToIeeeBv(b(c("x"))).to_string(), "(fp.to_ieee_bv x)");
    }

    // -----------------------------------------------------------------------
    // Command and Script formatting
    // -----------------------------------------------------------------------

    #[test]
    fn cmd_basics() {
        assert_eq!(
            Command::SetLogic("QF_FPBV".into()).to_string(),
            "(set-logic QF_FPBV)"
        );
        assert_eq!(
            Command::DeclareConst("x".into(), Sort::BitVec(32)).to_string(),
            "(declare-const x (_ BitVec 32))"
        );
        assert_eq!(
            Command::DeclareFun("f".into(), vec![Sort::BitVec(8)], Sort::Bool).to_string(),
            "(declare-fun f ((_ BitVec 8)) Bool)"
        );
        assert_eq!(Command::CheckSat.to_string(), "(check-sat)");
        assert_eq!(Command::Push(1).to_string(), "(push 1)");
        assert_eq!(
            Command::Comment("note".into()).to_string(),
            ";; note"
        );
    }

    #[test]
    fn script_multiple_commands() {
        let s = Script::with_commands(vec![
            Command::SetLogic("QF_BV".into()),
            Command::DeclareConst("x".into(), Sort::BitVec(32)),
            Command::Assert(Term::Eq(b(c("x")), b(Term::BitVecLit(42, 32)))),
            Command::CheckSat,
            Command::Exit,
        ]);
        assert_eq!(
            s.to_string(),
            "\
(set-logic QF_BV)\n\
(declare-const x (_ BitVec 32))\n\
(assert (= x (_ bv42 32)))\n\
(check-sat)\n\
(exit)"
        );
    }
}
