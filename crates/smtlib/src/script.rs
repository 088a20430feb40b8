use crate::command::Command;
use crate::sort::Sort;
use crate::term::Term;

/// An SMT-LIB script: a sequence of commands.
#[derive(Debug, Clone, Default)]
pub struct Script {
    commands: Vec<Command>,
}

impl Script {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn with_commands(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    pub fn push(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    pub fn extend(&mut self, cmds: impl IntoIterator<Item = Command>) {
        self.commands.extend(cmds);
    }

    /// Shorthand for `push(Command::DeclareConst(..))`.
    pub fn declare_const(&mut self, name: impl Into<String>, sort: Sort) {
        self.commands.push(Command::DeclareConst(name.into(), sort));
    }

    /// Shorthand for `push(Command::Assert(..))`; trivially true assertions
    /// are dropped.
    pub fn assert(&mut self, term: Term) {
        if !term.is_true() {
            self.commands.push(Command::Assert(term));
        }
    }

    pub fn comment(&mut self, text: impl Into<String>) {
        self.commands.push(Command::Comment(text.into()));
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{tru, var};

    #[test]
    fn new_creates_empty_script() {
        let script = Script::new();
        assert!(script.is_empty());
        assert_eq!(script.len(), 0);
        assert!(script.commands().is_empty());
    }

    #[test]
    fn push_adds_command() {
        let mut script = Script::new();
        script.push(Command::CheckSat);
        script.push(Command::GetModel);
        assert_eq!(script.len(), 2);
        assert_eq!(script.commands()[0], Command::CheckSat);
    }

    #[test]
    fn declare_const_shorthand() {
        let mut script = Script::new();
        script.declare_const("x", Sort::BitVec(32));
        assert_eq!(
            script.commands()[0],
            Command::DeclareConst("x".into(), Sort::BitVec(32))
        );
    }

    #[test]
    fn assert_drops_trivial_truth() {
        let mut script = Script::new();
        script.assert(tru());
        assert!(script.is_empty());
        script.assert(var("p"));
        assert_eq!(script.len(), 1);
    }

    #[test]
    fn extend_preserves_order() {
        let mut script = Script::new();
        script.push(Command::SetLogic("QF_FPBV".to_string()));
        script.extend(vec![Command::CheckSat, Command::Exit]);
        assert_eq!(script.len(), 3);
        assert!(matches!(&script.commands()[0], Command::SetLogic(_)));
        assert_eq!(script.commands()[2], Command::Exit);
    }

    #[test]
    fn into_commands_returns_vec() {
        let mut script = Script::new();
        script.comment("header");
        script.push(Command::CheckSat);
        let cmds = script.into_commands();
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[1], Command::CheckSat);
    }
}
