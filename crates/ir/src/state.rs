//! The symbolic state threaded through instruction encoding.
//!
//! [`State`] owns everything an instruction can touch while being encoded:
//! the value environment, the UB and precondition accumulators, the memory
//! model, block domains, the varargs ledger, and the registry of fresh
//! variables. Encoders never emit SMT commands themselves; they produce
//! terms and hand side conditions to the state, and [`encode_function`]
//! assembles the final [`EncodedFn`].

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, trace};
use tv_smtlib::build::{self, and2, and_many, eq, fls, implies, ite, ne, not, or2, tru, var};
use tv_smtlib::{Conjunction, Sort, Term};

use crate::attrs::FnAttrs;
use crate::memory::MemoryModel;
use crate::ty::{Type, POINTER_BITS};
use crate::value::{np_all, BlockId, Constant, Function, StateValue, ValueDef, ValueId};
use crate::VARARG_BITS;

// ---------------------------------------------------------------------------
// Varargs ledger
// ---------------------------------------------------------------------------

/// One tracked `va_list`. All fields are symbolic and are updated by guarded
/// if-then-else when an operation may touch this entry.
#[derive(Debug, Clone)]
pub struct VarArgEntry {
    pub ptr: Term,
    /// Between `va_start`/`va_copy` and `va_end`.
    pub alive: Term,
    /// Index of the next argument to fetch (`VARARG_BITS` wide).
    pub next_arg: Term,
    /// Number of variadic arguments available through this list.
    pub num_args: Term,
    /// Initialized by `va_start` (as opposed to `va_copy`).
    pub is_va_start: Term,
}

// ---------------------------------------------------------------------------
// Encoding result
// ---------------------------------------------------------------------------

/// Everything [`encode_function`] produces for one function.
#[derive(Debug)]
pub struct EncodedFn {
    /// The returned value, selected across return sites; `None` for void.
    pub ret: Option<StateValue>,
    /// Disjunction of the domains of all executed return sites.
    pub ret_domain: Term,
    /// Conjunction that must hold for the execution to be UB-free.
    pub ub: Term,
    /// Side conditions assumed rather than checked.
    pub precondition: Term,
    /// Static type checks; false means the function is ill-typed.
    pub typing: Term,
    /// Universally quantified variables (undef, nondet choices).
    pub quant_vars: Vec<(String, Sort)>,
    /// Free constants to declare (inputs, fresh UF results).
    pub decls: Vec<(String, Sort)>,
    /// Names of approximations applied; non-empty encodings are sound only
    /// one way.
    pub approximations: BTreeSet<String>,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

pub struct State<'a> {
    f: &'a Function,
    pub memory: Box<dyn MemoryModel>,

    values: HashMap<ValueId, StateValue>,
    ub: Conjunction,
    pre: Conjunction,
    typing: Conjunction,
    quant_vars: Vec<(String, Sort)>,
    decls: Vec<(String, Sort)>,
    approx: BTreeSet<String>,
    fresh: u32,

    cur_block: BlockId,
    /// Path condition of the block being encoded.
    domain: Term,
    /// Accumulated edge conditions, keyed by (source, target).
    jumps: HashMap<(u32, u32), Term>,
    returns: Vec<(Term, StateValue)>,

    /// Lazily created dynamic rounding-mode register.
    fp_rounding: Option<Term>,
    /// Memoized "is some lane of this FP value a zero" choice variables.
    anyzero: Vec<(Term, Term)>,

    pub varargs: Vec<VarArgEntry>,
    /// Count of variadic arguments the caller passed, if fixed.
    va_num_args: Option<Term>,
}

impl<'a> State<'a> {
    pub fn new(f: &'a Function, memory: Box<dyn MemoryModel>) -> Self {
        let mut s = State {
            f,
            memory,
            values: HashMap::new(),
            ub: Conjunction::new(),
            pre: Conjunction::new(),
            typing: Conjunction::new(),
            quant_vars: Vec::new(),
            decls: Vec::new(),
            approx: BTreeSet::new(),
            fresh: 0,
            cur_block: BlockId(0),
            domain: tru(),
            jumps: HashMap::new(),
            returns: Vec::new(),
            fp_rounding: None,
            anyzero: Vec::new(),
            varargs: Vec::new(),
            va_num_args: None,
        };
        s.seed_inputs();
        s
    }

    pub fn function(&self) -> &'a Function {
        self.f
    }

    /// Declare one free constant per input (plus a poison choice variable
    /// unless the input is `noundef`) and record attribute assumptions.
    fn seed_inputs(&mut self) {
        let ids: Vec<ValueId> = self
            .f
            .values()
            .filter(|(_, v)| matches!(v.def, ValueDef::Input { .. }))
            .map(|(id, _)| id)
            .collect();
        for id in ids {
            let v = self.f.value(id);
            let ValueDef::Input { attrs } = v.def.clone() else {
                continue;
            };
            let name = format!("%{}", v.name);
            self.decls.push((name.clone(), v.ty.sort()));
            let value = var(name.clone());

            let mut non_poison = if attrs.noundef {
                tru()
            } else {
                let np_name = format!("np_{name}");
                self.decls.push((np_name.clone(), v.ty.np_sort()));
                var(np_name)
            };
            if attrs.nonnull {
                non_poison = and2(non_poison, ne(value.clone(), build::bv_zero(POINTER_BITS)));
            }
            if let Some(bytes) = attrs.dereferenceable {
                let n = build::bv(bytes as i128, POINTER_BITS);
                let align = attrs.align.unwrap_or(1);
                let cond = self.memory.is_dereferenceable(&value, &n, align);
                self.pre.add(cond);
            } else if let Some(align) = attrs.align {
                let cond = self.memory.is_aligned(&value, align);
                self.pre.add(cond);
            }
            self.values.insert(id, StateValue::new(value, non_poison));
        }
    }

    // -----------------------------------------------------------------------
    // Fresh names
    // -----------------------------------------------------------------------

    fn fresh_name(&mut self, prefix: &str) -> String {
        let n = self.fresh;
        self.fresh += 1;
        format!("{prefix}#{n}")
    }

    /// A fresh free constant, declared in the output.
    pub fn fresh_var(&mut self, prefix: &str, sort: Sort) -> Term {
        let name = self.fresh_name(prefix);
        self.decls.push((name.clone(), sort));
        var(name)
    }

    /// A fresh universally quantified variable (nondeterministic choice).
    pub fn fresh_quant_var(&mut self, prefix: &str, sort: Sort) -> Term {
        let name = self.fresh_name(prefix);
        self.quant_vars.push((name.clone(), sort));
        var(name)
    }

    // -----------------------------------------------------------------------
    // Accumulators
    // -----------------------------------------------------------------------

    /// Require `cond` for UB-freedom, on the current path only.
    pub fn add_ub(&mut self, cond: Term) {
        let guarded = implies(self.domain.clone(), cond);
        if guarded.is_false() {
            trace!(block = %self.cur_block, "unconditional UB");
        }
        self.ub.add(guarded);
    }

    /// Assume `cond` instead of checking it.
    pub fn add_pre(&mut self, cond: Term) {
        self.pre.add(implies(self.domain.clone(), cond));
    }

    pub fn add_typing(&mut self, cond: Term) {
        self.typing.add(cond);
    }

    /// Record that the encoding of `what` is approximate.
    pub fn does_approximation(&mut self, what: &str) {
        if self.approx.insert(what.to_string()) {
            debug!(what, "approximate encoding");
        }
    }

    pub fn approximations(&self) -> &BTreeSet<String> {
        &self.approx
    }

    // -----------------------------------------------------------------------
    // Value environment
    // -----------------------------------------------------------------------

    /// Evaluate a value id to its (value, non-poison) pair.
    ///
    /// Instruction results must already be in the environment; constants are
    /// built on demand. `undef` yields a fresh quantified variable per use,
    /// so two uses of the same undef value may read differently.
    pub fn eval(&mut self, id: ValueId) -> StateValue {
        if let Some(sv) = self.values.get(&id) {
            return sv.clone();
        }
        let v = self.f.value(id);
        let sv = match &v.def {
            ValueDef::Constant(c) => self.eval_constant(&c.clone(), &v.ty.clone()),
            ValueDef::Input { .. } => unreachable!("inputs are seeded at construction"),
            ValueDef::Instr(_) => {
                panic!("instruction {} used before it was encoded", v.name)
            }
        };
        // undef stays uncached so each use gets a fresh choice
        if !matches!(&v.def, ValueDef::Constant(Constant::Undef)) {
            self.values.insert(id, sv.clone());
        }
        sv
    }

    fn eval_constant(&mut self, c: &Constant, ty: &Type) -> StateValue {
        match c {
            Constant::Int(i) => StateValue::defined(build::bv(*i, ty.bits())),
            Constant::Fp(bits) => {
                let fmt = ty
                    .float_format()
                    .unwrap_or_else(|| panic!("FP constant of non-float type {ty}"));
                StateValue::defined(fmt.from_bits(build::bv(*bits, fmt.total_bits())))
            }
            Constant::Null => StateValue::defined(build::bv_zero(POINTER_BITS)),
            Constant::Poison => StateValue {
                value: ty.zero_term(),
                non_poison: poison_np(ty),
            },
            Constant::Undef => {
                let v = self.fresh_quant_var("undef", ty.sort());
                StateValue::defined_shaped(v, ty)
            }
            Constant::Agg(elems) => {
                let lanes = elems.iter().map(|&e| self.eval(e)).collect();
                StateValue::aggregate(lanes)
            }
        }
    }

    /// Evaluate and add the value's full non-poison condition to UB, the
    /// common pattern for operands whose poison is immediate UB.
    pub fn eval_and_add_poison_ub(&mut self, id: ValueId) -> StateValue {
        let sv = self.eval(id);
        let ty = self.f.ty(id).clone();
        self.add_ub(np_all(&ty, &sv.non_poison));
        sv
    }

    pub fn set_value(&mut self, id: ValueId, sv: StateValue) {
        self.values.insert(id, sv);
    }

    // -----------------------------------------------------------------------
    // Control flow
    // -----------------------------------------------------------------------

    pub fn begin_block(&mut self, b: BlockId) {
        self.cur_block = b;
        self.domain = if b.0 == 0 {
            tru()
        } else {
            let mut conds = Vec::new();
            for ((_, dst), cond) in &self.jumps {
                if *dst == b.0 {
                    conds.push(cond.clone());
                }
            }
            build::or_many(conds)
        };
    }

    pub fn cur_block(&self) -> BlockId {
        self.cur_block
    }

    pub fn domain(&self) -> &Term {
        &self.domain
    }

    /// Record a jump from the current block under an extra condition.
    pub fn add_jump(&mut self, dst: BlockId, cond: Term) {
        let edge = and2(self.domain.clone(), cond);
        let key = (self.cur_block.0, dst.0);
        let entry = self.jumps.remove(&key).unwrap_or_else(fls);
        self.jumps.insert(key, or2(entry, edge));
    }

    /// Condition under which control flowed along `pred -> dst`. Used by phi.
    pub fn edge_cond(&self, pred: BlockId, dst: BlockId) -> Term {
        self.jumps
            .get(&(pred.0, dst.0))
            .cloned()
            .unwrap_or_else(fls)
    }

    pub fn add_return(&mut self, sv: StateValue) {
        self.returns.push((self.domain.clone(), sv));
    }

    /// Execution does not continue past this point on the current path.
    pub fn kill_path(&mut self) {
        self.domain = fls();
    }

    // -----------------------------------------------------------------------
    // FP environment
    // -----------------------------------------------------------------------

    /// The dynamic rounding-mode register, created on first use.
    pub fn fp_rounding_var(&mut self) -> Term {
        if let Some(rm) = &self.fp_rounding {
            return rm.clone();
        }
        let name = "fp.rounding_mode".to_string();
        self.decls.push((name.clone(), Sort::RoundingMode));
        let rm = var(name);
        self.fp_rounding = Some(rm.clone());
        rm
    }

    /// Nondeterministic "treat this zero as the other sign" choice for `nsz`,
    /// memoized per value term so repeated uses agree.
    pub fn anyzero_choice(&mut self, v: &Term) -> Term {
        for (key, choice) in &self.anyzero {
            if key == v {
                return choice.clone();
            }
        }
        let choice = self.fresh_quant_var("anyzero", Sort::Bool);
        self.anyzero.push((v.clone(), choice.clone()));
        choice
    }

    // -----------------------------------------------------------------------
    // Function calls
    // -----------------------------------------------------------------------

    /// Model a call to an unknown function as uninterpreted functions over
    /// the inputs. Calls that may read memory are additionally keyed by the
    /// current write epoch; pure calls with equal inputs therefore collapse
    /// to equal terms structurally.
    pub fn add_fn_call(
        &mut self,
        name: &str,
        mut inputs: Vec<Term>,
        ret_ty: &Type,
        attrs: &FnAttrs,
    ) -> StateValue {
        if !attrs.no_read {
            inputs.push(build::bv(self.memory.write_epoch() as i128, 32));
        }
        let ub_ok = Term::App(format!("fc.{name}.ub"), inputs.clone());
        self.add_ub(ub_ok);
        if !attrs.no_write {
            self.memory.havoc();
        }
        if attrs.no_return {
            self.kill_path();
        }
        if matches!(ret_ty, Type::Void) {
            return StateValue::defined(ret_ty.zero_term());
        }
        let value = Term::App(format!("fc.{name}"), inputs.clone());
        let mut non_poison = if attrs.ret_noundef {
            tru()
        } else {
            Term::App(format!("fc.{name}.np"), inputs)
        };
        if attrs.ret_nonnull {
            non_poison = and2(
                non_poison,
                ne(value.clone(), build::bv_zero(POINTER_BITS)),
            );
        }
        StateValue::new(value, non_poison)
    }

    // -----------------------------------------------------------------------
    // Varargs
    // -----------------------------------------------------------------------

    /// Number of variadic arguments the caller passed.
    pub fn va_num_args(&mut self) -> Term {
        if let Some(n) = &self.va_num_args {
            return n.clone();
        }
        let n = self.fresh_var("va.num_args", Sort::BitVec(VARARG_BITS));
        self.va_num_args = Some(n.clone());
        n
    }

    /// Pin the variadic argument count (e.g. when the caller is known).
    pub fn set_va_num_args(&mut self, n: Term) {
        self.va_num_args = Some(n);
    }

    /// Make sure `ptr` is covered by some ledger entry. Unknown pointers get
    /// a synthesized entry with uninterpreted fields; it is UB to use a
    /// va_list pointer that is local to this function yet was never handed
    /// to `va_start`/`va_copy`.
    pub fn ensure_varargs_ptr(&mut self, ptr: &Term) {
        let mut matched = Vec::new();
        for e in &self.varargs {
            if &e.ptr == ptr {
                return;
            }
            matched.push(eq(ptr.clone(), e.ptr.clone()));
        }
        let known = build::or_many(matched);
        let local = self.memory.is_local(ptr);
        self.add_ub(or2(known, not(local)));
        self.varargs.push(VarArgEntry {
            ptr: ptr.clone(),
            alive: Term::App("va.alive".into(), vec![ptr.clone()]),
            next_arg: Term::App("va.next".into(), vec![ptr.clone()]),
            num_args: Term::App("va.num".into(), vec![ptr.clone()]),
            is_va_start: Term::App("va.from_start".into(), vec![ptr.clone()]),
        });
    }

    pub fn va_start(&mut self, ptr: &Term) {
        // va_start only has defined behavior inside a variadic function
        self.add_ub(Term::BoolLit(self.f.is_var_args));
        let num = self.va_num_args();
        self.write_va_entry(ptr, tru(), build::bv_zero(VARARG_BITS), num, tru());
    }

    pub fn va_end(&mut self, ptr: &Term) {
        self.ensure_varargs_ptr(ptr);
        let mut conds = Vec::new();
        for e in &mut self.varargs {
            let m = eq(ptr.clone(), e.ptr.clone());
            conds.push(implies(m.clone(), e.alive.clone()));
            e.alive = ite(m, fls(), e.alive.clone());
        }
        let ub = and_many(conds);
        self.add_ub(ub);
    }

    pub fn va_copy(&mut self, dst: &Term, src: &Term) {
        self.ensure_varargs_ptr(src);
        // read the source entry through guarded selects
        let mut alive = fls();
        let mut next = build::bv_zero(VARARG_BITS);
        let mut num = build::bv_zero(VARARG_BITS);
        for e in &self.varargs {
            let m = eq(src.clone(), e.ptr.clone());
            alive = ite(m.clone(), e.alive.clone(), alive);
            next = ite(m.clone(), e.next_arg.clone(), next);
            num = ite(m, e.num_args.clone(), num);
        }
        self.add_ub(alive.clone());
        self.write_va_entry(dst, tru(), next, num, fls());
    }

    /// Fetch the next variadic argument through `ptr`.
    pub fn va_arg(&mut self, ptr: &Term, ty: &Type) -> StateValue {
        self.ensure_varargs_ptr(ptr);
        let fetched = self.fresh_quant_var("va.arg", ty.sort());
        let one = build::bv_one(VARARG_BITS);
        let mut conds = Vec::new();
        for e in &mut self.varargs {
            let m = eq(ptr.clone(), e.ptr.clone());
            let in_range = build::ult(e.next_arg.clone(), e.num_args.clone());
            conds.push(implies(m.clone(), and2(e.alive.clone(), in_range)));
            e.next_arg = ite(
                m,
                build::bvadd(e.next_arg.clone(), one.clone()),
                e.next_arg.clone(),
            );
        }
        let ub = and_many(conds);
        self.add_ub(ub);
        StateValue::defined_shaped(fetched, ty)
    }

    /// Guarded update of every entry matching `ptr`, inserting a new entry
    /// when none matches structurally.
    fn write_va_entry(&mut self, ptr: &Term, alive: Term, next: Term, num: Term, from_start: Term) {
        let mut seen = false;
        for e in &mut self.varargs {
            let m = eq(ptr.clone(), e.ptr.clone());
            if m.is_true() {
                seen = true;
            }
            e.alive = ite(m.clone(), alive.clone(), e.alive.clone());
            e.next_arg = ite(m.clone(), next.clone(), e.next_arg.clone());
            e.num_args = ite(m.clone(), num.clone(), e.num_args.clone());
            e.is_va_start = ite(m, from_start.clone(), e.is_va_start.clone());
        }
        if !seen {
            self.varargs.push(VarArgEntry {
                ptr: ptr.clone(),
                alive,
                next_arg: next,
                num_args: num,
                is_va_start: from_start,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Finish
    // -----------------------------------------------------------------------

    pub fn finish(self) -> EncodedFn {
        let ret = if matches!(self.f.ret_ty, Type::Void) {
            None
        } else {
            let mut it = self.returns.iter();
            it.next().map(|(_, first)| {
                let mut acc = first.clone();
                for (dom, sv) in it {
                    acc = StateValue::mk_if(dom, sv.clone(), acc);
                }
                acc
            })
        };
        let ret_domain = build::or_many(self.returns.iter().map(|(d, _)| d.clone()).collect());
        EncodedFn {
            ret,
            ret_domain,
            ub: self.ub.finish(),
            precondition: self.pre.finish(),
            typing: self.typing.finish(),
            quant_vars: self.quant_vars,
            decls: self.decls,
            approximations: self.approx,
        }
    }
}

fn poison_np(ty: &Type) -> Term {
    if !ty.is_aggregate() {
        return fls();
    }
    let lanes = (0..ty.num_children())
        .map(|i| poison_np(ty.child(i)))
        .collect();
    build::pack(lanes)
}

impl StateValue {
    /// A never-poison value whose non-poison component matches the shape of
    /// `ty` (per-lane `true` tuples for aggregates).
    pub fn defined_shaped(value: Term, ty: &Type) -> StateValue {
        StateValue::new(value, true_np(ty))
    }
}

fn true_np(ty: &Type) -> Term {
    if !ty.is_aggregate() {
        return tru();
    }
    let lanes = (0..ty.num_children())
        .map(|i| true_np(ty.child(i)))
        .collect();
    build::pack(lanes)
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Encode every block of `f` in order, producing the function summary.
pub fn encode_function(f: &Function, memory: Box<dyn MemoryModel>) -> EncodedFn {
    let mut s = State::new(f, memory);
    for b in 0..f.blocks().len() {
        let bid = BlockId(b as u32);
        s.begin_block(bid);
        trace!(block = %bid, "encoding block");
        for idx in 0..f.block(bid).instrs.len() {
            let id = f.block(bid).instrs[idx];
            let ValueDef::Instr(instr) = f.value(id).def.clone() else {
                continue;
            };
            let ty = f.value(id).ty.clone();
            s.add_typing(instr.type_constraints(f, &ty));
            let sv = instr.encode(&mut s, &ty);
            s.set_value(id, sv);
        }
    }
    s.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::ParamAttrs;
    use crate::memory::UfMemory;
    use crate::ty::Type;
    use tv_smtlib::build::bv;

    fn empty_fn() -> Function {
        Function::new("f", Type::Void)
    }

    fn state(f: &Function) -> State<'_> {
        State::new(f, Box::new(UfMemory::new()))
    }

    #[test]
    fn ub_is_guarded_by_the_block_domain() {
        let f = empty_fn();
        let mut s = state(&f);
        s.add_ub(var("c"));
        // entry domain is true, so the condition lands unguarded
        let enc = s.finish();
        assert_eq!(enc.ub, var("c"));
    }

    #[test]
    fn killed_paths_stop_contributing_ub() {
        let f = empty_fn();
        let mut s = state(&f);
        s.kill_path();
        s.add_ub(fls());
        let enc = s.finish();
        assert!(enc.ub.is_true());
    }

    #[test]
    fn inputs_are_seeded_with_poison_vars() {
        let mut f = Function::new("f", Type::Int(32));
        let a = f.add_input("a", Type::Int(32), ParamAttrs::default());
        let mut nu = ParamAttrs::default();
        nu.noundef = true;
        let b = f.add_input("b", Type::Int(32), nu);
        let mut s = state(&f);
        let sa = s.eval(a);
        let sb = s.eval(b);
        assert_eq!(sa.value, var("%a"));
        assert_eq!(sa.non_poison, var("np_%a"));
        assert!(sb.non_poison.is_true());
    }

    #[test]
    fn undef_reads_fresh_each_use() {
        let mut f = empty_fn();
        let u = f.add_constant(Type::Int(8), Constant::Undef);
        let mut s = state(&f);
        let a = s.eval(u);
        let b = s.eval(u);
        assert_ne!(a.value, b.value);
        assert!(a.non_poison.is_true());
    }

    #[test]
    fn constants_fold_to_literals() {
        let mut f = empty_fn();
        let c = f.add_constant(Type::Int(16), Constant::Int(-2));
        let p = f.add_constant(Type::Int(16), Constant::Poison);
        let mut s = state(&f);
        assert_eq!(s.eval(c).value, bv(-2, 16));
        assert!(s.eval(p).non_poison.is_false());
    }

    #[test]
    fn edge_conditions_feed_block_domains() {
        let mut f = empty_fn();
        let bb0 = f.add_block("entry");
        let bb1 = f.add_block("then");
        assert_eq!(bb0, BlockId(0));
        let mut s = state(&f);
        s.begin_block(bb0);
        s.add_jump(bb1, var("c"));
        assert_eq!(s.edge_cond(bb0, bb1), var("c"));
        s.begin_block(bb1);
        assert_eq!(*s.domain(), var("c"));
    }

    #[test]
    fn pure_calls_with_equal_inputs_collapse() {
        let f = empty_fn();
        let mut s = state(&f);
        let mut attrs = FnAttrs::default();
        attrs.no_read = true;
        attrs.no_write = true;
        let a = s.add_fn_call("g", vec![var("x")], &Type::Int(32), &attrs);
        let b = s.add_fn_call("g", vec![var("x")], &Type::Int(32), &attrs);
        assert_eq!(a.value, b.value);
    }

    #[test]
    fn impure_calls_are_keyed_by_the_write_epoch() {
        let f = empty_fn();
        let mut s = state(&f);
        let attrs = FnAttrs::default();
        let a = s.add_fn_call("g", vec![var("x")], &Type::Int(32), &attrs);
        let b = s.add_fn_call("g", vec![var("x")], &Type::Int(32), &attrs);
        assert_ne!(a.value, b.value);
    }

    #[test]
    fn third_vararg_fetch_is_ub_with_two_args() {
        let mut f = empty_fn();
        f.is_var_args = true;
        let mut s = state(&f);
        s.set_va_num_args(bv(2, VARARG_BITS));
        let p = var("p");
        s.va_start(&p);
        let _ = s.va_arg(&p, &Type::Int(32));
        let _ = s.va_arg(&p, &Type::Int(32));
        let _ = s.va_arg(&p, &Type::Int(32));
        let enc = s.finish();
        // next_arg reaches 2 with num_args == 2, so the bound check folds
        assert!(enc.ub.is_false());
    }

    #[test]
    fn two_vararg_fetches_with_two_args_are_fine() {
        let mut f = empty_fn();
        f.is_var_args = true;
        let mut s = state(&f);
        s.set_va_num_args(bv(2, VARARG_BITS));
        let p = var("p");
        s.va_start(&p);
        let _ = s.va_arg(&p, &Type::Int(32));
        let _ = s.va_arg(&p, &Type::Int(32));
        let enc = s.finish();
        assert!(enc.ub.is_true());
    }

    #[test]
    fn va_end_kills_the_list() {
        let mut f = empty_fn();
        f.is_var_args = true;
        let mut s = state(&f);
        let p = var("p");
        s.va_start(&p);
        s.va_end(&p);
        let _ = s.va_arg(&p, &Type::Int(32));
        let enc = s.finish();
        assert!(enc.ub.is_false());
    }

    #[test]
    fn anyzero_choices_are_memoized() {
        let f = empty_fn();
        let mut s = state(&f);
        let a = s.anyzero_choice(&var("x"));
        let b = s.anyzero_choice(&var("x"));
        let c = s.anyzero_choice(&var("y"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
