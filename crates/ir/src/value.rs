//! Values, the function arena, and the (value, non-poison) pair.
//!
//! Every value — function input, constant, or instruction result — lives in
//! the arena owned by [`Function`] and is referred to by [`ValueId`].
//! Instructions hold ids, never references, so replace-all-uses-with is a
//! plain id swap and the arena can grow without invalidating anything.

use crate::attrs::{FnAttrs, ParamAttrs};
use crate::instr::Instr;
use crate::ty::Type;
use tv_smtlib::build::{ite, pack, unpack};
use tv_smtlib::Term;

/// Index of a value in its function's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub u32);

impl std::fmt::Display for ValueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Index of a basic block in its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// StateValue
// ---------------------------------------------------------------------------

/// A symbolic value paired with its non-poison condition.
///
/// For aggregates both components are tuple terms with one slot per lane;
/// for scalars `non_poison` is a boolean.
#[derive(Debug, Clone, PartialEq)]
pub struct StateValue {
    pub value: Term,
    pub non_poison: Term,
}

impl StateValue {
    pub fn new(value: Term, non_poison: Term) -> Self {
        Self { value, non_poison }
    }

    /// A never-poison value.
    pub fn defined(value: Term) -> Self {
        Self {
            value,
            non_poison: Term::BoolLit(true),
        }
    }

    /// A poison value carrying a placeholder bit pattern.
    pub fn poison(value: Term) -> Self {
        Self {
            value,
            non_poison: Term::BoolLit(false),
        }
    }

    /// Component-wise if-then-else.
    pub fn mk_if(cond: &Term, then_v: StateValue, else_v: StateValue) -> StateValue {
        StateValue {
            value: ite(cond.clone(), then_v.value, else_v.value),
            non_poison: ite(cond.clone(), then_v.non_poison, else_v.non_poison),
        }
    }

    /// Assemble an aggregate from per-lane values.
    pub fn aggregate(lanes: Vec<StateValue>) -> StateValue {
        let (vals, nps) = lanes.into_iter().map(|l| (l.value, l.non_poison)).unzip();
        StateValue {
            value: pack(vals),
            non_poison: pack(nps),
        }
    }

    /// Project lane `i` out of an aggregate.
    pub fn extract_lane(&self, i: u32) -> StateValue {
        StateValue {
            value: unpack(i as usize, self.value.clone()),
            non_poison: unpack(i as usize, self.non_poison.clone()),
        }
    }

    /// AND an extra condition into the non-poison component.
    pub fn and_np(self, cond: Term) -> StateValue {
        StateValue {
            value: self.value,
            non_poison: tv_smtlib::build::and2(self.non_poison, cond),
        }
    }
}

/// Collapse a (possibly per-lane) non-poison term to a single boolean:
/// the conjunction over all non-padding lanes.
pub fn np_all(ty: &Type, np: &Term) -> Term {
    if !ty.is_aggregate() {
        return np.clone();
    }
    let mut parts = Vec::new();
    for i in 0..ty.num_children() {
        if ty.is_padding(i) {
            continue;
        }
        parts.push(np_all(ty.child(i), &unpack(i as usize, np.clone())));
    }
    tv_smtlib::build::and_many(parts)
}

// ---------------------------------------------------------------------------
// Constants and value definitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Integer constant (also used for `i1` booleans).
    Int(i128),
    /// Float constant as its IEEE bit pattern.
    Fp(i128),
    /// Null pointer.
    Null,
    /// Poison of the value's type.
    Poison,
    /// Undef: every read yields a fresh arbitrary (but non-poison) value.
    Undef,
    /// Aggregate constant built from other values.
    Agg(Vec<ValueId>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueDef {
    /// A function input.
    Input { attrs: ParamAttrs },
    Constant(Constant),
    Instr(Instr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub name: String,
    pub ty: Type,
    pub def: ValueDef,
}

// ---------------------------------------------------------------------------
// Function
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub name: String,
    /// Instruction values in program order.
    pub instrs: Vec<ValueId>,
}

/// A function: the value arena plus basic-block structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Function {
    pub name: String,
    pub ret_ty: Type,
    pub attrs: FnAttrs,
    /// Whether the function takes variadic arguments.
    pub is_var_args: bool,
    values: Vec<Value>,
    blocks: Vec<Block>,
}

impl Function {
    pub fn new(name: impl Into<String>, ret_ty: Type) -> Self {
        Self {
            name: name.into(),
            ret_ty,
            ..Default::default()
        }
    }

    pub fn add_value(&mut self, v: Value) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(v);
        id
    }

    /// Convenience: add an input value.
    pub fn add_input(&mut self, name: impl Into<String>, ty: Type, attrs: ParamAttrs) -> ValueId {
        self.add_value(Value {
            name: name.into(),
            ty,
            def: ValueDef::Input { attrs },
        })
    }

    /// Convenience: add a constant value.
    pub fn add_constant(&mut self, ty: Type, c: Constant) -> ValueId {
        let name = format!("c{}", self.values.len());
        self.add_value(Value {
            name,
            ty,
            def: ValueDef::Constant(c),
        })
    }

    pub fn add_block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block {
            name: name.into(),
            instrs: Vec::new(),
        });
        id
    }

    /// Append an instruction to a block, returning its result id.
    pub fn add_instr(&mut self, block: BlockId, name: impl Into<String>, ty: Type, i: Instr) -> ValueId {
        let id = self.add_value(Value {
            name: name.into(),
            ty,
            def: ValueDef::Instr(i),
        });
        self.blocks[block.0 as usize].instrs.push(id);
        id
    }

    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.0 as usize]
    }

    pub fn value_mut(&mut self, id: ValueId) -> &mut Value {
        &mut self.values[id.0 as usize]
    }

    pub fn ty(&self, id: ValueId) -> &Type {
        &self.values[id.0 as usize].ty
    }

    pub fn values(&self) -> impl Iterator<Item = (ValueId, &Value)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (ValueId(i as u32), v))
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 as usize]
    }

    /// Replace every use of `from` with `to` across all instructions.
    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        assert!(from != to, "cannot replace a value with itself");
        for v in &mut self.values {
            if let ValueDef::Instr(i) = &mut v.def {
                i.rauw(from, to);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tv_smtlib::build::{bv, fls, tru, var};

    #[test]
    fn mk_if_folds_on_constant_cond() {
        let a = StateValue::defined(bv(1, 8));
        let b = StateValue::defined(bv(2, 8));
        assert_eq!(StateValue::mk_if(&tru(), a.clone(), b.clone()), a);
        assert_eq!(StateValue::mk_if(&fls(), a, b.clone()), b);
    }

    #[test]
    fn aggregate_lane_round_trip() {
        let lanes = vec![
            StateValue::new(var("a"), var("ap")),
            StateValue::new(var("b"), var("bp")),
        ];
        let agg = StateValue::aggregate(lanes.clone());
        assert_eq!(agg.extract_lane(0), lanes[0]);
        assert_eq!(agg.extract_lane(1), lanes[1]);
    }

    #[test]
    fn and_np_merges_conditions() {
        let sv = StateValue::defined(var("x")).and_np(var("c"));
        assert_eq!(sv.non_poison, var("c"));
        let sv = StateValue::poison(var("x")).and_np(var("c"));
        assert!(sv.non_poison.is_false());
    }

    #[test]
    fn arena_ids_are_stable() {
        let mut f = Function::new("f", Type::Int(32));
        let a = f.add_input("a", Type::Int(32), ParamAttrs::default());
        let c = f.add_constant(Type::Int(32), Constant::Int(7));
        assert_eq!(a, ValueId(0));
        assert_eq!(c, ValueId(1));
        assert_eq!(f.value(a).name, "a");
        assert_eq!(f.ty(c), &Type::Int(32));
    }
}
