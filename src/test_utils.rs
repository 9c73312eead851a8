//! Test utilities shared across modules.
//!
//! Scripted stand-ins for the two interactive boundaries: the subprocess
//! runner and the terminal prompter. Both record what they were asked so
//! tests can assert on the exact command sequence.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;

use crate::command::{CommandFailure, CommandResult, CommandRunner};
use crate::prompt::Prompter;
use crate::signal::SignalHandler;

/// Returns queued results in order and records every invocation.
///
/// Once the queue is exhausted every call fails, which surfaces an
/// unexpected extra command as a test failure instead of a hang.
pub struct ScriptedRunner {
    results: RefCell<VecDeque<CommandResult>>,
    calls: RefCell<Vec<(String, Vec<String>)>>,
}

impl ScriptedRunner {
    pub fn new(results: Vec<CommandResult>) -> Self {
        Self {
            results: RefCell::new(results.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Each call rendered as `program arg1 arg2 ...`.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|(program, args)| {
                std::iter::once(program.as_str())
                    .chain(args.iter().map(String::as_str))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    /// Each call's argument vector, without the program.
    pub fn call_args(&self) -> Vec<Vec<String>> {
        self.calls.borrow().iter().map(|(_, a)| a.clone()).collect()
    }

    /// Number of scripted results not yet consumed.
    pub fn remaining(&self) -> usize {
        self.results.borrow().len()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[&str], _cwd: &Path) -> CommandResult {
        self.calls.borrow_mut().push((
            program.to_string(),
            args.iter().map(|a| a.to_string()).collect(),
        ));
        self.results.borrow_mut().pop_front().unwrap_or_else(|| {
            CommandResult::failed("no scripted result", CommandFailure::NonZeroExit(1))
        })
    }
}

/// Answers prompts from queues and records the questions asked.
///
/// Exhausted queues answer `false` to confirmations, dismiss selections
/// and accept the default for text input.
#[derive(Default)]
pub struct ScriptedPrompter {
    confirms: RefCell<VecDeque<bool>>,
    selections: RefCell<VecDeque<Option<usize>>>,
    inputs: RefCell<VecDeque<String>>,
    questions: RefCell<Vec<String>>,
    interrupt: Option<(usize, SignalHandler)>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_confirms(self, answers: &[bool]) -> Self {
        self.confirms.borrow_mut().extend(answers.iter().copied());
        self
    }

    pub fn with_selections(self, answers: &[Option<usize>]) -> Self {
        self.selections.borrow_mut().extend(answers.iter().copied());
        self
    }

    pub fn with_inputs(self, answers: &[&str]) -> Self {
        self.inputs
            .borrow_mut()
            .extend(answers.iter().map(|s| s.to_string()));
        self
    }

    /// Simulate Ctrl+C while the `index`-th question (0-based) is pending.
    pub fn with_interrupt_at(mut self, index: usize, signal: SignalHandler) -> Self {
        self.interrupt = Some((index, signal));
        self
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.borrow().clone()
    }

    fn ask(&self, question: &str) {
        let mut questions = self.questions.borrow_mut();
        if let Some((index, signal)) = &self.interrupt {
            if questions.len() == *index {
                signal.request_shutdown();
            }
        }
        questions.push(question.to_string());
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, question: &str, _default: bool) -> bool {
        self.ask(question);
        self.confirms.borrow_mut().pop_front().unwrap_or(false)
    }

    fn select(&self, question: &str, _options: &[&str]) -> Option<usize> {
        self.ask(question);
        self.selections.borrow_mut().pop_front().flatten()
    }

    fn input(&self, question: &str, default: &str) -> String {
        self.ask(question);
        self.inputs
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_runner_returns_results_in_order() {
        let runner = ScriptedRunner::new(vec![CommandResult::ok("a"), CommandResult::ok("b")]);
        assert_eq!(runner.run("git", &["one"], Path::new(".")).stdout, "a");
        assert_eq!(runner.run("git", &["two"], Path::new(".")).stdout, "b");
        assert_eq!(runner.calls(), vec!["git one", "git two"]);
        assert_eq!(runner.remaining(), 0);
    }

    #[test]
    fn test_scripted_runner_fails_when_exhausted() {
        let runner = ScriptedRunner::new(vec![]);
        assert!(!runner.run("git", &["status"], Path::new(".")).success);
    }

    #[test]
    fn test_scripted_prompter_defaults_when_exhausted() {
        let prompter = ScriptedPrompter::new();
        assert!(!prompter.confirm("ok?", true));
        assert_eq!(prompter.select("pick", &["a"]), None);
        assert_eq!(prompter.input("name", "dflt"), "dflt");
        assert_eq!(prompter.questions().len(), 3);
    }

    #[test]
    fn test_scripted_prompter_interrupts_at_question() {
        let signal = SignalHandler::detached();
        let prompter = ScriptedPrompter::new().with_interrupt_at(1, signal.clone());
        prompter.confirm("first", true);
        assert!(!signal.is_shutdown_requested());
        prompter.input("second", "x");
        assert!(signal.is_shutdown_requested());
    }
}
