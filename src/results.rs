//! Per-run record of which workflow steps succeeded.

use serde::Serialize;

/// One step of the push workflow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    GitInit,
    BranchSync,
    Staging,
    Commit,
    Push,
    BrowserOpen,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::GitInit,
        Step::BranchSync,
        Step::Staging,
        Step::Commit,
        Step::Push,
        Step::BrowserOpen,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Step::GitInit => "Git initialization",
            Step::BranchSync => "Branch sync",
            Step::Staging => "Staging",
            Step::Commit => "Commit",
            Step::Push => "Push",
            Step::BrowserOpen => "Browser open",
        }
    }
}

/// Step outcomes, created at run start and filled in as steps complete.
///
/// A step that never ran stays `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionResults {
    pub git_init: bool,
    pub branch_sync: bool,
    pub staging: bool,
    pub commit: bool,
    pub push: bool,
    pub browser_open: bool,
}

impl ExecutionResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, step: Step) -> bool {
        match step {
            Step::GitInit => self.git_init,
            Step::BranchSync => self.branch_sync,
            Step::Staging => self.staging,
            Step::Commit => self.commit,
            Step::Push => self.push,
            Step::BrowserOpen => self.browser_open,
        }
    }

    pub fn record(&mut self, step: Step, succeeded: bool) {
        let slot = match step {
            Step::GitInit => &mut self.git_init,
            Step::BranchSync => &mut self.branch_sync,
            Step::Staging => &mut self.staging,
            Step::Commit => &mut self.commit,
            Step::Push => &mut self.push,
            Step::BrowserOpen => &mut self.browser_open,
        };
        *slot = succeeded;
    }

    /// Every step paired with its outcome, in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (Step, bool)> + '_ {
        Step::ALL.iter().map(move |step| (*step, self.get(*step)))
    }

    pub fn completed_count(&self) -> usize {
        self.iter().filter(|(_, ok)| *ok).count()
    }
}
