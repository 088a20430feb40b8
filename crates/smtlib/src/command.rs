use crate::sort::Sort;
use crate::term::Term;

/// One top-level SMT-LIB2 command.
///
/// Only the commands an encoded-function dump needs are represented:
/// declarations for the free and quantified constants, assertions for the
/// accumulated conjunctions, and the solver-control bookends.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `(set-logic LOGIC)`
    SetLogic(String),
    /// `(set-option :key value)`
    SetOption(String, String),
    /// `(declare-sort name arity)`
    DeclareSort(String, u32),
    /// `(declare-const name sort)`
    DeclareConst(String, Sort),
    /// `(declare-fun name (param_sorts...) return_sort)`
    DeclareFun(String, Vec<Sort>, Sort),
    /// `(assert term)`
    Assert(Term),
    /// `(push n)` / `(pop n)`
    Push(u32),
    Pop(u32),
    /// `(check-sat)`
    CheckSat,
    /// `(get-model)`
    GetModel,
    /// `;; comment` — emitted verbatim, used to label dump sections
    Comment(String),
    /// `(exit)`
    Exit,
}
