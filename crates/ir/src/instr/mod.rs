//! The instruction catalog.
//!
//! [`Instr`] is a closed enum over every instruction kind the encoder
//! understands; each family lives in its own submodule and exposes a struct
//! with the family's operands and flags. Adding a kind means adding a
//! variant here, so `match` exhaustiveness keeps the dispatch honest.

pub mod agg;
pub mod call;
pub mod cmp;
pub mod conv;
pub mod flow;
pub mod fp_ops;
pub mod int_ops;
pub mod mem_ops;
pub mod simd;
pub mod vararg;

use tv_smtlib::Term;

use crate::state::State;
use crate::ty::Type;
use crate::value::{Function, StateValue, ValueId};

pub use agg::{ExtractElement, ExtractValue, InsertElement, InsertValue, Select, ShuffleVector};
pub use call::Call;
pub use cmp::{FCmp, FCmpCond, ICmp, ICmpCond, PtrCmpMode};
pub use conv::{ConvKind, Conversion, FpConvKind, FpConversion};
pub use flow::{Assume, AssumeKind, Branch, Freeze, Phi, Return, Switch, Unreachable};
pub use fp_ops::{FpBinOp, FpBinOpKind, FpTernaryOp, FpTernaryOpKind, FpUnaryOp, FpUnaryOpKind};
pub use int_ops::{
    BinOp, BinOpKind, Reduction, ReductionKind, TernaryOp, TernaryOpKind, UnaryOp, UnaryOpKind,
};
pub use mem_ops::{
    Alloc, FillPoison, Gep, Lifetime, Load, Memcmp, Memcpy, Memset, MemsetPattern, Store, Strlen,
};
pub use simd::{X86Intrin, X86Op};
pub use vararg::{VaArg, VaCopy, VaEnd, VaStart};

// ---------------------------------------------------------------------------
// Instr
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    BinOp(BinOp),
    UnaryOp(UnaryOp),
    TernaryOp(TernaryOp),
    Reduction(Reduction),
    FpBinOp(FpBinOp),
    FpUnaryOp(FpUnaryOp),
    FpTernaryOp(FpTernaryOp),
    Conversion(Conversion),
    FpConversion(FpConversion),
    ICmp(ICmp),
    FCmp(FCmp),
    Select(Select),
    ExtractValue(ExtractValue),
    InsertValue(InsertValue),
    ExtractElement(ExtractElement),
    InsertElement(InsertElement),
    ShuffleVector(ShuffleVector),
    Alloc(Alloc),
    Gep(Gep),
    Load(Load),
    Store(Store),
    Memset(Memset),
    MemsetPattern(MemsetPattern),
    FillPoison(FillPoison),
    Memcpy(Memcpy),
    Memcmp(Memcmp),
    Strlen(Strlen),
    Lifetime(Lifetime),
    Call(Call),
    Freeze(Freeze),
    Phi(Phi),
    Branch(Branch),
    Switch(Switch),
    Return(Return),
    Assume(Assume),
    Unreachable(Unreachable),
    VaStart(VaStart),
    VaEnd(VaEnd),
    VaCopy(VaCopy),
    VaArg(VaArg),
    X86Intrin(X86Intrin),
}

macro_rules! dispatch {
    ($on:expr, $i:ident => $body:expr) => {
        match $on {
            Instr::BinOp($i) => $body,
            Instr::UnaryOp($i) => $body,
            Instr::TernaryOp($i) => $body,
            Instr::Reduction($i) => $body,
            Instr::FpBinOp($i) => $body,
            Instr::FpUnaryOp($i) => $body,
            Instr::FpTernaryOp($i) => $body,
            Instr::Conversion($i) => $body,
            Instr::FpConversion($i) => $body,
            Instr::ICmp($i) => $body,
            Instr::FCmp($i) => $body,
            Instr::Select($i) => $body,
            Instr::ExtractValue($i) => $body,
            Instr::InsertValue($i) => $body,
            Instr::ExtractElement($i) => $body,
            Instr::InsertElement($i) => $body,
            Instr::ShuffleVector($i) => $body,
            Instr::Alloc($i) => $body,
            Instr::Gep($i) => $body,
            Instr::Load($i) => $body,
            Instr::Store($i) => $body,
            Instr::Memset($i) => $body,
            Instr::MemsetPattern($i) => $body,
            Instr::FillPoison($i) => $body,
            Instr::Memcpy($i) => $body,
            Instr::Memcmp($i) => $body,
            Instr::Strlen($i) => $body,
            Instr::Lifetime($i) => $body,
            Instr::Call($i) => $body,
            Instr::Freeze($i) => $body,
            Instr::Phi($i) => $body,
            Instr::Branch($i) => $body,
            Instr::Switch($i) => $body,
            Instr::Return($i) => $body,
            Instr::Assume($i) => $body,
            Instr::Unreachable($i) => $body,
            Instr::VaStart($i) => $body,
            Instr::VaEnd($i) => $body,
            Instr::VaCopy($i) => $body,
            Instr::VaArg($i) => $body,
            Instr::X86Intrin($i) => $body,
        }
    };
}

impl Instr {
    /// Value operands, in order.
    pub fn operands(&self) -> Vec<ValueId> {
        dispatch!(self, i => i.operands())
    }

    /// Replace every operand use of `from` with `to`.
    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        dispatch!(self, i => i.rauw(from, to))
    }

    /// Whether a poison operand makes the result poison. False for the
    /// kinds that consume poison as UB (memory, calls, control flow) or
    /// launder it (freeze, select, phi).
    pub fn propagates_poison(&self) -> bool {
        matches!(
            self,
            Instr::BinOp(_)
                | Instr::UnaryOp(_)
                | Instr::TernaryOp(_)
                | Instr::Reduction(_)
                | Instr::FpBinOp(_)
                | Instr::FpUnaryOp(_)
                | Instr::FpTernaryOp(_)
                | Instr::Conversion(_)
                | Instr::FpConversion(_)
                | Instr::ICmp(_)
                | Instr::FCmp(_)
                | Instr::ExtractValue(_)
                | Instr::InsertValue(_)
                | Instr::ExtractElement(_)
                | Instr::InsertElement(_)
                | Instr::ShuffleVector(_)
                | Instr::Gep(_)
                | Instr::X86Intrin(_)
        )
    }

    /// Static typing constraints; folds to a boolean literal.
    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        dispatch!(self, i => i.type_constraints(f, ty))
    }

    /// Encode the instruction, with `ty` the result type.
    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        dispatch!(self, i => i.encode(s, ty))
    }
}

impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        dispatch!(self, i => i.fmt(f))
    }
}

// ---------------------------------------------------------------------------
// Lane mapping
// ---------------------------------------------------------------------------

/// Apply a scalar encoder to each lane of a vector type, or directly for a
/// scalar type. Inputs must all share the lane structure of `ty`.
pub(crate) fn map_lanes(
    s: &mut State,
    ty: &Type,
    inputs: &[StateValue],
    f: &mut dyn FnMut(&mut State, &Type, &[StateValue]) -> StateValue,
) -> StateValue {
    match ty {
        Type::Vector(elem, n) => {
            let mut lanes = Vec::with_capacity(*n as usize);
            for i in 0..*n {
                let ins: Vec<StateValue> =
                    inputs.iter().map(|sv| sv.extract_lane(i)).collect();
                lanes.push(f(s, elem, &ins));
            }
            StateValue::aggregate(lanes)
        }
        scalar => f(s, scalar, inputs),
    }
}

/// Float format of a scalar lane type; instruction typing guarantees this
/// is only reached for float types.
pub(crate) fn fp_fmt(elem: &Type) -> tv_smtlib::fpops::FloatFormat {
    elem.float_format()
        .unwrap_or_else(|| panic!("FP operation on non-float type {elem}"))
}

/// Swap a single id in place.
pub(crate) fn rauw_id(slot: &mut ValueId, from: ValueId, to: ValueId) {
    if *slot == from {
        *slot = to;
    }
}
