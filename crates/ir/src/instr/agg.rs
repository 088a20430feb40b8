//! Select and aggregate/vector element instructions.

use tv_smtlib::build::{and2, bv, bv1_to_bool, eq, ult};
use tv_smtlib::Term;

use crate::instr::{map_lanes, rauw_id};
use crate::state::State;
use crate::ty::{all_constraints, Type};
use crate::value::{Function, StateValue, ValueId};

/// AND an extra scalar condition into every non-padding lane of a
/// (possibly aggregate) non-poison term.
fn and_np_lanes(ty: &Type, np: &Term, cond: &Term) -> Term {
    if !ty.is_aggregate() {
        return and2(np.clone(), cond.clone());
    }
    let lanes = (0..ty.num_children())
        .map(|i| {
            let lane = tv_smtlib::build::unpack(i as usize, np.clone());
            if ty.is_padding(i) {
                lane
            } else {
                and_np_lanes(ty.child(i), &lane, cond)
            }
        })
        .collect();
    tv_smtlib::build::pack(lanes)
}

// ---------------------------------------------------------------------------
// Select
// ---------------------------------------------------------------------------

/// `select cond, a, b`. A poison condition poisons the result; the value
/// read from the unselected arm is dropped entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub cond: ValueId,
    pub tval: ValueId,
    pub fval: ValueId,
}

impl Select {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.cond, self.tval, self.fval]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.cond, from, to);
        rauw_id(&mut self.tval, from, to);
        rauw_id(&mut self.fval, from, to);
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        let cty = f.ty(self.cond);
        let cond_ok = match cty {
            Type::Int(1) => true,
            Type::Vector(elem, n) => {
                **elem == Type::Int(1) && ty.is_vector() && ty.num_children() == *n
            }
            _ => false,
        };
        all_constraints(vec![
            Term::BoolLit(cond_ok),
            ty.enforce_same(f.ty(self.tval)),
            ty.enforce_same(f.ty(self.fval)),
        ])
    }

    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        let cond = s.eval(self.cond);
        let t = s.eval(self.tval);
        let e = s.eval(self.fval);
        if s.function().ty(self.cond).is_vector() {
            return map_lanes(s, ty, &[cond, t, e], &mut |_, elem, ins| {
                let c = bv1_to_bool(ins[0].value.clone());
                let sel = StateValue::mk_if(&c, ins[1].clone(), ins[2].clone());
                StateValue::new(
                    sel.value,
                    and_np_lanes(elem, &sel.non_poison, &ins[0].non_poison),
                )
            });
        }
        let c = bv1_to_bool(cond.value);
        let sel = StateValue::mk_if(&c, t, e);
        StateValue::new(
            sel.value,
            and_np_lanes(ty, &sel.non_poison, &cond.non_poison),
        )
    }
}

impl std::fmt::Display for Select {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "select {}, {}, {}", self.cond, self.tval, self.fval)
    }
}

// ---------------------------------------------------------------------------
// ExtractValue / InsertValue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractValue {
    pub agg: ValueId,
    pub idxs: Vec<u32>,
}

impl ExtractValue {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.agg]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.agg, from, to);
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        let mut cur = f.ty(self.agg);
        for &i in &self.idxs {
            if !cur.is_aggregate() || i >= cur.num_children() {
                return Term::BoolLit(false);
            }
            cur = cur.child(i);
        }
        ty.enforce_same(cur)
    }

    pub fn encode(&self, s: &mut State, _ty: &Type) -> StateValue {
        let mut sv = s.eval(self.agg);
        let mut cur = s.function().ty(self.agg).clone();
        for &i in &self.idxs {
            // reading padding yields poison
            if cur.is_padding(i) {
                return StateValue::poison(cur.child(i).zero_term());
            }
            sv = sv.extract_lane(i);
            cur = cur.child(i).clone();
        }
        sv
    }
}

impl std::fmt::Display for ExtractValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "extractvalue {}", self.agg)?;
        for i in &self.idxs {
            write!(f, ", {i}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertValue {
    pub agg: ValueId,
    pub elem: ValueId,
    pub idxs: Vec<u32>,
}

impl InsertValue {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.agg, self.elem]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.agg, from, to);
        rauw_id(&mut self.elem, from, to);
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        let mut cur = f.ty(self.agg);
        for &i in &self.idxs {
            if !cur.is_aggregate() || i >= cur.num_children() {
                return Term::BoolLit(false);
            }
            cur = cur.child(i);
        }
        all_constraints(vec![
            ty.enforce_same(f.ty(self.agg)),
            cur.enforce_same(f.ty(self.elem)),
        ])
    }

    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        let agg = s.eval(self.agg);
        let elem = s.eval(self.elem);
        insert_at(ty, &agg, &elem, &self.idxs)
    }
}

fn insert_at(ty: &Type, agg: &StateValue, elem: &StateValue, idxs: &[u32]) -> StateValue {
    let Some((&i, rest)) = idxs.split_first() else {
        return elem.clone();
    };
    let lanes = (0..ty.num_children())
        .map(|j| {
            let lane = agg.extract_lane(j);
            if j == i {
                insert_at(ty.child(j), &lane, elem, rest)
            } else {
                lane
            }
        })
        .collect();
    StateValue::aggregate(lanes)
}

impl std::fmt::Display for InsertValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "insertvalue {}, {}", self.agg, self.elem)?;
        for i in &self.idxs {
            write!(f, ", {i}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ExtractElement / InsertElement
// ---------------------------------------------------------------------------

/// `extractelement`: an out-of-range index yields poison.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractElement {
    pub vec: ValueId,
    pub idx: ValueId,
}

impl ExtractElement {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.vec, self.idx]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.vec, from, to);
        rauw_id(&mut self.idx, from, to);
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        let vty = f.ty(self.vec);
        all_constraints(vec![
            vty.enforce_vector(),
            f.ty(self.idx).enforce_int(),
            ty.enforce_same(vty.child(0)),
        ])
    }

    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        let v = s.eval(self.vec);
        let idx = s.eval(self.idx);
        let n = s.function().ty(self.vec).num_children();
        let w = s.function().ty(self.idx).bits();
        let in_range = ult(idx.value.clone(), bv(n as i128, w));
        let mut out = StateValue::poison(ty.zero_term());
        for i in (0..n).rev() {
            out = StateValue::mk_if(
                &eq(idx.value.clone(), bv(i as i128, w)),
                v.extract_lane(i),
                out,
            );
        }
        let np = and2(and2(out.non_poison, idx.non_poison), in_range);
        StateValue::new(out.value, np)
    }
}

impl std::fmt::Display for ExtractElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "extractelement {}, {}", self.vec, self.idx)
    }
}

/// `insertelement`: an out-of-range index poisons the whole vector.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertElement {
    pub vec: ValueId,
    pub elem: ValueId,
    pub idx: ValueId,
}

impl InsertElement {
    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.vec, self.elem, self.idx]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.vec, from, to);
        rauw_id(&mut self.elem, from, to);
        rauw_id(&mut self.idx, from, to);
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        all_constraints(vec![
            ty.enforce_vector(),
            ty.enforce_same(f.ty(self.vec)),
            f.ty(self.elem).enforce_same(ty.child(0)),
            f.ty(self.idx).enforce_int(),
        ])
    }

    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        let v = s.eval(self.vec);
        let elem = s.eval(self.elem);
        let idx = s.eval(self.idx);
        let n = ty.num_children();
        let w = s.function().ty(self.idx).bits();
        let ok = and2(
            idx.non_poison.clone(),
            ult(idx.value.clone(), bv(n as i128, w)),
        );
        let lanes = (0..n)
            .map(|i| {
                let here = eq(idx.value.clone(), bv(i as i128, w));
                let lane = StateValue::mk_if(&here, elem.clone(), v.extract_lane(i));
                lane.and_np(ok.clone())
            })
            .collect();
        StateValue::aggregate(lanes)
    }
}

impl std::fmt::Display for InsertElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "insertelement {}, {}, {}", self.vec, self.elem, self.idx)
    }
}

// ---------------------------------------------------------------------------
// ShuffleVector
// ---------------------------------------------------------------------------

/// Constant-mask shuffle; [`ShuffleVector::POISON_LANE`] marks a poison
/// output lane.
#[derive(Debug, Clone, PartialEq)]
pub struct ShuffleVector {
    pub a: ValueId,
    pub b: ValueId,
    pub mask: Vec<u32>,
}

impl ShuffleVector {
    pub const POISON_LANE: u32 = u32::MAX;

    pub fn operands(&self) -> Vec<ValueId> {
        vec![self.a, self.b]
    }

    pub fn rauw(&mut self, from: ValueId, to: ValueId) {
        rauw_id(&mut self.a, from, to);
        rauw_id(&mut self.b, from, to);
    }

    pub fn type_constraints(&self, f: &Function, ty: &Type) -> Term {
        let aty = f.ty(self.a);
        let n = aty.num_children();
        let mask_ok = self
            .mask
            .iter()
            .all(|&m| m == Self::POISON_LANE || m < 2 * n);
        all_constraints(vec![
            aty.enforce_vector(),
            aty.enforce_same(f.ty(self.b)),
            ty.enforce_vector(),
            Term::BoolLit(mask_ok && ty.num_children() as usize == self.mask.len()),
            ty.child(0).enforce_same(aty.child(0)),
        ])
    }

    pub fn encode(&self, s: &mut State, ty: &Type) -> StateValue {
        let a = s.eval(self.a);
        let b = s.eval(self.b);
        let n = s.function().ty(self.a).num_children();
        let lanes = self
            .mask
            .iter()
            .map(|&m| {
                if m == Self::POISON_LANE {
                    StateValue::poison(ty.child(0).zero_term())
                } else if m < n {
                    a.extract_lane(m)
                } else {
                    b.extract_lane(m - n)
                }
            })
            .collect();
        StateValue::aggregate(lanes)
    }
}

impl std::fmt::Display for ShuffleVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "shufflevector {}, {}, <", self.a, self.b)?;
        for (i, m) in self.mask.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if *m == Self::POISON_LANE {
                write!(f, "poison")?;
            } else {
                write!(f, "{m}")?;
            }
        }
        write!(f, ">")
    }
}
