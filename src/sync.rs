//! Branch synchronization.
//!
//! Compares the local branch with its upstream using a single
//! `git status --branch` query and, when the remote has commits the local
//! branch lacks, lets the operator pick how to reconcile them.
//!
//! The resolver never picks a strategy on its own and never retries. A
//! `false` from [`BranchSyncResolver::resolve_divergence`] means the caller
//! must stop before committing or pushing.
//!
//! A pull that stops on conflicts is never left half-applied without the
//! operator choosing to: they either finish it by hand or it is aborted.

use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{info, warn};

use crate::command::{CommandResult, CommandRunner};
use crate::output::{print_info, print_warning};
use crate::prompt::Prompter;
use crate::signal::SignalHandler;

static TRACKING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^## (?P<head>.+?)(?:\.\.\.(?P<upstream>\S+))?(?: \[(?P<track>[^\]]+)\])?$")
        .expect("tracking line pattern is valid")
});

static AHEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ahead (\d+)").expect("ahead pattern is valid"));

static BEHIND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"behind (\d+)").expect("behind pattern is valid"));

const REBASE_PULL_ARGS: &[&str] = &["pull", "--rebase", "--autostash"];
const MERGE_PULL_ARGS: &[&str] = &["pull", "--no-rebase", "--autostash"];
const FORCE_PUSH_ARGS: &[&str] = &["push", "--force-with-lease"];
const REBASE_ABORT_ARGS: &[&str] = &["rebase", "--abort"];
const MERGE_ABORT_ARGS: &[&str] = &["merge", "--abort"];

/// Marker git prints for each conflicting path.
const CONFLICT_MARKER: &str = "CONFLICT";

const CONFLICT_CHOICES: &[&str] = &[
    "Resolve the conflicts myself now, then continue",
    "Abort and restore the branch to its state before the pull",
];

/// Branch tracking metadata from the first line of `git status --branch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingStatus {
    pub branch: String,
    pub upstream: Option<String>,
    pub ahead: u32,
    pub behind: u32,
    /// The upstream ref is configured but no longer exists on the remote.
    pub upstream_gone: bool,
}

/// How the local branch relates to its upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divergence {
    Synchronized,
    Ahead(u32),
    Behind(u32),
    Diverged { ahead: u32, behind: u32 },
    NoUpstream,
}

impl Divergence {
    /// Whether the operator has to choose a strategy before pushing.
    ///
    /// Being only behind is treated the same as having diverged so the
    /// remote commits are integrated before the push.
    pub fn needs_resolution(&self) -> bool {
        matches!(self, Divergence::Behind(_) | Divergence::Diverged { .. })
    }
}

impl TrackingStatus {
    pub fn divergence(&self) -> Divergence {
        if self.upstream.is_none() || self.upstream_gone {
            return Divergence::NoUpstream;
        }
        match (self.ahead, self.behind) {
            (0, 0) => Divergence::Synchronized,
            (ahead, 0) => Divergence::Ahead(ahead),
            (0, behind) => Divergence::Behind(behind),
            (ahead, behind) => Divergence::Diverged { ahead, behind },
        }
    }
}

/// Parse the `## ...` header line of `git status --porcelain=v1 --branch`.
///
/// Returns `None` for anything that is not a branch header.
pub fn parse_tracking_line(line: &str) -> Option<TrackingStatus> {
    let caps = TRACKING_LINE.captures(line.trim_end())?;
    let track = caps.name("track").map(|m| m.as_str()).unwrap_or("");

    let count = |re: &Regex| -> u32 {
        re.captures(track)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };

    Some(TrackingStatus {
        branch: caps["head"].to_string(),
        upstream: caps.name("upstream").map(|m| m.as_str().to_string()),
        ahead: count(&AHEAD),
        behind: count(&BEHIND),
        upstream_gone: track == "gone",
    })
}

/// The four ways to reconcile a diverged branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    RebasePull,
    MergePull,
    ForcePush,
    Skip,
}

impl SyncStrategy {
    /// Menu order.
    pub const ALL: [SyncStrategy; 4] = [
        SyncStrategy::RebasePull,
        SyncStrategy::MergePull,
        SyncStrategy::ForcePush,
        SyncStrategy::Skip,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SyncStrategy::RebasePull => "Rebase: pull and replay local commits on top (git pull --rebase)",
            SyncStrategy::MergePull => "Merge: pull and create a merge commit (git pull --no-rebase)",
            SyncStrategy::ForcePush => "Force push: overwrite the remote branch (--force-with-lease)",
            SyncStrategy::Skip => "Skip: resolve manually later",
        }
    }

    /// The git arguments this strategy runs, if any.
    pub fn git_args(&self) -> Option<&'static [&'static str]> {
        match self {
            SyncStrategy::RebasePull => Some(REBASE_PULL_ARGS),
            SyncStrategy::MergePull => Some(MERGE_PULL_ARGS),
            SyncStrategy::ForcePush => Some(FORCE_PUSH_ARGS),
            SyncStrategy::Skip => None,
        }
    }

    /// Whether the strategy needs a second, explicit confirmation.
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, SyncStrategy::ForcePush)
    }

    /// The git arguments that undo a pull stopped on conflicts.
    pub fn abort_args(&self) -> Option<&'static [&'static str]> {
        match self {
            SyncStrategy::RebasePull => Some(REBASE_ABORT_ARGS),
            SyncStrategy::MergePull => Some(MERGE_ABORT_ARGS),
            SyncStrategy::ForcePush | SyncStrategy::Skip => None,
        }
    }

    /// Ref that exists while a pull stopped on conflicts is unfinished.
    fn pending_ref(&self) -> &'static str {
        match self {
            SyncStrategy::RebasePull => "REBASE_HEAD",
            _ => "MERGE_HEAD",
        }
    }

    /// What finishes the operation once conflicts are fixed.
    fn finish_hint(&self) -> &'static str {
        match self {
            SyncStrategy::RebasePull => "git add <files> && git rebase --continue",
            _ => "git add <files> && git commit",
        }
    }
}

/// Whether a failed pull stopped because of merge conflicts.
pub fn is_conflict(result: &CommandResult) -> bool {
    result.stdout.contains(CONFLICT_MARKER) || result.stderr.contains(CONFLICT_MARKER)
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStrategy::RebasePull => "rebase-pull",
            SyncStrategy::MergePull => "merge-pull",
            SyncStrategy::ForcePush => "force-push",
            SyncStrategy::Skip => "skip",
        };
        f.write_str(name)
    }
}

/// Detects and resolves divergence between a branch and its upstream.
pub struct BranchSyncResolver<'a> {
    runner: &'a dyn CommandRunner,
    repo: &'a Path,
    signal: SignalHandler,
}

impl<'a> BranchSyncResolver<'a> {
    pub fn new(runner: &'a dyn CommandRunner, repo: &'a Path) -> Self {
        Self {
            runner,
            repo,
            signal: SignalHandler::detached(),
        }
    }

    /// Stop before running any command once Ctrl+C has been pressed.
    pub fn with_signal_handler(mut self, signal: SignalHandler) -> Self {
        self.signal = signal;
        self
    }

    fn interrupted(&self) -> bool {
        if self.signal.is_shutdown_requested() {
            info!("interrupted before running a sync command");
            return true;
        }
        false
    }

    /// Query tracking metadata. `None` when the status query fails.
    pub fn tracking_status(&self) -> Option<TrackingStatus> {
        let result = self
            .runner
            .run("git", &["status", "--porcelain=v1", "--branch"], self.repo);
        if !result.success {
            return None;
        }
        result.stdout.lines().next().and_then(parse_tracking_line)
    }

    /// Phase 1: whether the branch needs a resolution before pushing.
    ///
    /// Query failures and missing upstreams count as not diverged; the push
    /// step sets up tracking on its own.
    pub fn detect_divergence(&self) -> bool {
        let Some(status) = self.tracking_status() else {
            return false;
        };

        match status.divergence() {
            Divergence::Diverged { ahead, behind } => {
                warn!(
                    branch = %status.branch,
                    ahead, behind, "local and remote branches have diverged"
                );
                true
            }
            Divergence::Behind(behind) => {
                warn!(branch = %status.branch, behind, "local branch is behind its upstream");
                true
            }
            Divergence::Ahead(ahead) => {
                info!(branch = %status.branch, ahead, "local branch is ahead, safe to push");
                false
            }
            Divergence::Synchronized | Divergence::NoUpstream => false,
        }
    }

    /// Phase 2: ask for a strategy and run it.
    ///
    /// Returns `false` when the menu is dismissed, the force-push
    /// confirmation is declined, or the strategy's command fails.
    pub fn resolve_divergence(&self, prompter: &dyn Prompter) -> bool {
        let labels: Vec<&str> = SyncStrategy::ALL.iter().map(|s| s.label()).collect();
        let Some(index) = prompter.select(
            "The remote branch has commits your local branch does not. How do you want to proceed?",
            &labels,
        ) else {
            info!("divergence resolution dismissed");
            return false;
        };

        match SyncStrategy::ALL.get(index) {
            Some(strategy) => self.execute(*strategy, prompter),
            None => false,
        }
    }

    /// Run one strategy.
    pub fn execute(&self, strategy: SyncStrategy, prompter: &dyn Prompter) -> bool {
        if strategy.requires_confirmation()
            && !prompter.confirm(
                "Force push will overwrite remote history (aborts if the remote moved). Continue?",
                false,
            )
        {
            info!(%strategy, "force push declined");
            return false;
        }

        let Some(args) = strategy.git_args() else {
            info!(%strategy, "leaving divergence for manual resolution");
            return true;
        };
        if self.interrupted() {
            return false;
        }

        let result = self.runner.run("git", args, self.repo);
        if result.success {
            return true;
        }

        warn!(%strategy, error = %result.message(), "sync strategy failed");
        if strategy.abort_args().is_some() && is_conflict(&result) {
            return self.handle_conflict(strategy, prompter);
        }
        false
    }

    /// A pull stopped on conflicts: finish it by hand or abort it.
    ///
    /// Returns `true` only once the operator reports the conflicts resolved
    /// and git no longer has the operation pending.
    fn handle_conflict(&self, strategy: SyncStrategy, prompter: &dyn Prompter) -> bool {
        print_warning(&format!("The {} stopped on merge conflicts", strategy));

        let choice =
            prompter.select("How do you want to handle the conflicts?", CONFLICT_CHOICES);
        if choice == Some(0) {
            print_info(&format!(
                "Fix the conflicting files in another terminal, then run: {}",
                strategy.finish_hint()
            ));
            while prompter.confirm("Conflicts resolved and the operation finished?", false) {
                if !self.is_pending(strategy) {
                    info!(%strategy, "conflicts resolved manually");
                    return true;
                }
                print_warning(&format!(
                    "git still reports the {} in progress ({} exists)",
                    strategy,
                    strategy.pending_ref()
                ));
            }

            if !prompter.confirm("Abort it and restore the branch?", false) {
                print_info(&format!(
                    "Left in progress. Finish with `{}` or undo with `git {}`",
                    strategy.finish_hint(),
                    strategy.abort_args().unwrap_or_default().join(" ")
                ));
                return false;
            }
        }

        self.abort(strategy);
        false
    }

    fn is_pending(&self, strategy: SyncStrategy) -> bool {
        self.runner
            .run(
                "git",
                &["rev-parse", "-q", "--verify", strategy.pending_ref()],
                self.repo,
            )
            .success
    }

    fn abort(&self, strategy: SyncStrategy) {
        let Some(args) = strategy.abort_args() else {
            return;
        };
        let result = self.runner.run("git", args, self.repo);
        if result.success {
            print_info(&format!("Aborted the {}; the branch is back where it was", strategy));
        } else {
            print_warning(&format!(
                "Could not abort the {}: {}. Run `git {}` by hand",
                strategy,
                result.message(),
                args.join(" ")
            ));
        }
    }
}
