use crate::classify::{classify, DirectoryAnalysis};
use crate::command::CommandRunner;
use crate::config::Config;
use crate::error::{AutopushError, Result};
use crate::gh::{self, RepoVisibility};
use crate::git::{self, PushResult, DEFAULT_REMOTE};
use crate::locks;
use crate::output::{
    print_directory_analysis, print_error, print_execution_summary, print_info, print_interrupted,
    print_nothing_to_commit, print_phase_banner, print_phase_footer, print_success,
    print_warning, BannerColor, GRAY, RESET,
};
use crate::platform::PlatformDescriptor;
use crate::progress::CommandSpinner;
use crate::prompt::{print_action, Prompter};
use crate::results::{ExecutionResults, Step};
use crate::signal::SignalHandler;
use crate::sync::BranchSyncResolver;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ============================================================================
// Options and outcome
// ============================================================================

/// Per-invocation choices from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Commit message; prompts with a timestamped default when `None`.
    pub message: Option<String>,
    /// Branch to push; prompts with the current branch when `None`.
    pub branch: Option<String>,
    /// Push with `--force-with-lease` (after an explicit confirmation).
    pub force: bool,
    /// Answer yes to step confirmations. Never answers risky prompts.
    pub assume_yes: bool,
    /// Open the repository page after pushing (also gated by config).
    pub open_browser: bool,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every step ran.
    Completed,
    /// The working tree was clean and no push was requested.
    NothingToCommit,
    /// The operator declined a step or pressed Ctrl+C.
    Aborted(String),
    /// A git or gh command failed.
    Failed(String),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed | RunOutcome::NothingToCommit)
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Early exit from the step sequence.
type StepResult<T> = std::result::Result<T, RunOutcome>;

/// Commit message suggested when none is given: `<prefix>: <timestamp>`.
pub fn default_commit_message(prefix: &str, now: DateTime<Local>) -> String {
    format!("{}: {}", prefix, now.format("%Y-%m-%d %H:%M:%S"))
}

/// Check that the repository path exists and is a directory.
pub fn validate_repo_path(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(AutopushError::PathNotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(AutopushError::NotADirectory(path.to_path_buf()));
    }
    Ok(path.to_path_buf())
}

// ============================================================================
// Runner
// ============================================================================

/// Drives one push run: analysis, init, sync, stage, commit, push, browser.
pub struct Runner<'a> {
    commands: &'a dyn CommandRunner,
    prompter: &'a dyn Prompter,
    config: Config,
    platform: PlatformDescriptor,
    signal: SignalHandler,
    show_progress: bool,
    results: ExecutionResults,
}

impl<'a> Runner<'a> {
    pub fn new(
        commands: &'a dyn CommandRunner,
        prompter: &'a dyn Prompter,
        config: Config,
        platform: PlatformDescriptor,
    ) -> Self {
        Self {
            commands,
            prompter,
            config,
            platform,
            signal: SignalHandler::detached(),
            show_progress: true,
            results: ExecutionResults::new(),
        }
    }

    pub fn with_signal_handler(mut self, signal: SignalHandler) -> Self {
        self.signal = signal;
        self
    }

    /// Toggle spinners around network commands.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn results(&self) -> &ExecutionResults {
        &self.results
    }

    /// Run every step and print the summary. Never panics on command failure.
    pub fn run(&mut self, path: &Path, options: &RunOptions) -> RunOutcome {
        let outcome = match self.run_steps(path, options) {
            Ok(outcome) | Err(outcome) => outcome,
        };

        match &outcome {
            RunOutcome::Completed => print_phase_banner("DONE", BannerColor::Green),
            RunOutcome::NothingToCommit => print_phase_banner("UP TO DATE", BannerColor::Green),
            RunOutcome::Aborted(reason) => {
                print_phase_banner("STOPPED", BannerColor::Yellow);
                print_info(reason);
            }
            RunOutcome::Failed(reason) => {
                print_phase_banner("FAILED", BannerColor::Red);
                print_error(reason);
            }
        }
        print_execution_summary(&self.results);
        info!(?outcome, "run finished");
        outcome
    }

    fn run_steps(&mut self, path: &Path, options: &RunOptions) -> StepResult<RunOutcome> {
        let repo = validate_repo_path(path).map_err(|e| RunOutcome::Failed(e.to_string()))?;

        let analysis = self.analyze(&repo)?;
        self.init_repository(&repo, &analysis, options)?;
        self.clear_stale_locks(&repo)?;
        self.sync_branch(&repo)?;

        self.checkpoint()?;
        let changes = git::changed_files(self.commands, &repo)
            .map_err(|e| RunOutcome::Failed(e.to_string()))?;

        if changes.is_empty() {
            return self.push_clean_tree(&repo, options);
        }

        println!("Changed files:");
        for line in &changes {
            println!("  {GRAY}{}{RESET}", line);
        }
        println!();

        self.stage(&repo, options)?;
        self.commit(&repo, options)?;
        self.push(&repo, options)?;
        self.open_browser(&repo, options);
        Ok(RunOutcome::Completed)
    }

    /// Stop if Ctrl+C was pressed. Called before each step and again after
    /// every prompt, since an interrupted read still returns an answer.
    fn checkpoint(&self) -> StepResult<()> {
        if self.signal.is_shutdown_requested() {
            print_interrupted();
            return Err(RunOutcome::Aborted("Interrupted by Ctrl+C".to_string()));
        }
        Ok(())
    }

    /// A step confirmation that `--yes` answers.
    fn confirm(&self, question: &str, options: &RunOptions) -> bool {
        if options.assume_yes {
            debug!(question, "auto-confirmed");
            return true;
        }
        self.prompter.confirm(question, true)
    }

    fn with_spinner<T>(
        &self,
        label: &str,
        operation: impl FnOnce() -> T,
        failure: impl FnOnce(&T) -> Option<String>,
    ) -> T {
        if !self.show_progress {
            return operation();
        }
        let mut spinner = CommandSpinner::new(label);
        let value = operation();
        match failure(&value) {
            None => spinner.finish_success(),
            Some(error) => spinner.finish_error(&error),
        }
        value
    }

    // ------------------------------------------------------------------------
    // Steps
    // ------------------------------------------------------------------------

    fn analyze(&self, repo: &Path) -> StepResult<DirectoryAnalysis> {
        self.checkpoint()?;
        print_phase_banner("ANALYSIS", BannerColor::Cyan);
        let analysis = classify(repo, &self.platform);
        print_directory_analysis(repo, &analysis, &self.platform);

        if analysis.warning_message.is_some() {
            let proceed = self.prompter.confirm("Continue anyway?", false);
            self.checkpoint()?;
            if !proceed {
                return Err(RunOutcome::Aborted(format!(
                    "Stopped at {} ({})",
                    repo.display(),
                    analysis.folder_type
                )));
            }
        }
        Ok(analysis)
    }

    fn init_repository(
        &mut self,
        repo: &Path,
        analysis: &DirectoryAnalysis,
        options: &RunOptions,
    ) -> StepResult<()> {
        if analysis.is_git_repo {
            return Ok(());
        }
        self.checkpoint()?;
        print_phase_banner("INIT", BannerColor::Cyan);

        let question = "Initialize a git repository here?";
        let accepted = if analysis.git_init_recommended {
            self.confirm(question, options)
        } else {
            self.prompter.confirm(question, false)
        };
        self.checkpoint()?;
        if !accepted {
            return Err(RunOutcome::Aborted(
                "Not a git repository and initialization was declined".to_string(),
            ));
        }

        git::init(self.commands, repo).map_err(|e| RunOutcome::Failed(e.to_string()))?;
        self.results.record(Step::GitInit, true);
        print_success("Initialized git repository");
        Ok(())
    }

    /// Offer to remove lock files left behind by a crashed git process.
    ///
    /// Removal always needs an explicit answer; `--yes` does not cover it.
    fn clear_stale_locks(&self, repo: &Path) -> StepResult<()> {
        let found = locks::find_lock_files(repo);
        if found.is_empty() {
            return Ok(());
        }
        self.checkpoint()?;
        print_phase_banner("LOCKS", BannerColor::Yellow);
        for lock in &found {
            print_warning(&format!("Lock file found: {}", lock.display()));
        }

        match locks::running_git_processes(self.commands, self.platform.family, repo) {
            Some(0) => print_info("No git process is running, so these locks look stale"),
            Some(count) => print_warning(&format!(
                "{} git process(es) running; a lock may still be in use",
                count
            )),
            None => print_warning("Could not check for running git processes"),
        }

        let choice = self.prompter.select(
            "How do you want to handle the lock files?",
            &[
                "Confirm each lock file before removing it",
                "Remove all of them",
                "Leave them (git commands may fail)",
            ],
        );
        self.checkpoint()?;

        let chosen: Vec<PathBuf> = match choice {
            Some(0) => found
                .into_iter()
                .filter(|lock| {
                    self.prompter
                        .confirm(&format!("Remove {}?", lock.display()), false)
                })
                .collect(),
            Some(1) => found,
            _ => {
                print_info("Lock files left in place");
                return Ok(());
            }
        };
        self.checkpoint()?;

        let failures = locks::remove_lock_files(&chosen);
        for (lock, error) in &failures {
            print_error(&format!("Could not remove {}: {}", lock.display(), error));
        }
        let removed = chosen.len() - failures.len();
        if removed > 0 {
            print_success(&format!("Removed {} lock file(s)", removed));
        }
        Ok(())
    }

    fn sync_branch(&mut self, repo: &Path) -> StepResult<()> {
        self.checkpoint()?;
        let commands = self.commands;

        if !git::has_upstream(commands, repo) {
            debug!("no upstream configured, skipping divergence check");
            self.results.record(Step::BranchSync, true);
            return Ok(());
        }

        print_phase_banner("SYNC", BannerColor::Cyan);
        let fetched = self.with_spinner(
            "Fetching from remote",
            || git::fetch(commands, repo),
            |r| (!r.success).then(|| r.message()),
        );
        if !fetched.success {
            print_warning("Fetch failed; divergence is checked against the last known remote state");
        }

        let resolver =
            BranchSyncResolver::new(commands, repo).with_signal_handler(self.signal.clone());
        if resolver.detect_divergence() && !resolver.resolve_divergence(self.prompter) {
            self.checkpoint()?;
            return Err(RunOutcome::Aborted(
                "Branch divergence was not resolved".to_string(),
            ));
        }

        self.results.record(Step::BranchSync, true);
        Ok(())
    }

    fn stage(&mut self, repo: &Path, options: &RunOptions) -> StepResult<()> {
        self.checkpoint()?;
        print_phase_banner("STAGE", BannerColor::Cyan);
        let accepted = self.confirm("Stage all changes?", options);
        self.checkpoint()?;
        if !accepted {
            return Err(RunOutcome::Aborted("Staging declined".to_string()));
        }

        git::add_all(self.commands, repo).map_err(|e| RunOutcome::Failed(e.to_string()))?;
        self.results.record(Step::Staging, true);
        print_success("Staged all changes");
        Ok(())
    }

    fn commit(&mut self, repo: &Path, options: &RunOptions) -> StepResult<()> {
        self.checkpoint()?;
        print_phase_banner("COMMIT", BannerColor::Cyan);
        let accepted = self.confirm("Create a commit?", options);
        self.checkpoint()?;
        if !accepted {
            return Err(RunOutcome::Aborted("Commit declined".to_string()));
        }

        let message = match options.message.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => self.prompter.input(
                "Commit message",
                &default_commit_message(&self.config.default_commit_message, Local::now()),
            ),
        };
        self.checkpoint()?;

        git::ensure_identity(self.commands, repo)
            .and_then(|_| git::commit(self.commands, repo, &message))
            .map_err(|e| RunOutcome::Failed(e.to_string()))?;

        self.results.record(Step::Commit, true);
        print_success(&format!("Committed: {}", message));
        Ok(())
    }

    /// Nothing changed: offer to push what is already committed.
    fn push_clean_tree(&mut self, repo: &Path, options: &RunOptions) -> StepResult<RunOutcome> {
        print_nothing_to_commit();
        self.results.record(Step::Staging, true);
        self.results.record(Step::Commit, true);

        let accepted = self.confirm("Push the current state to the remote?", options);
        self.checkpoint()?;
        if !accepted {
            print_info("Push skipped");
            self.results.record(Step::Push, true);
            return Ok(RunOutcome::NothingToCommit);
        }

        self.push(repo, options)?;
        self.open_browser(repo, options);
        Ok(RunOutcome::Completed)
    }

    fn choose_branch(&self, repo: &Path, options: &RunOptions) -> String {
        if let Some(branch) = options.branch.as_deref().map(str::trim) {
            if !branch.is_empty() {
                return branch.to_string();
            }
        }

        let current = git::current_branch(self.commands, repo);
        if options.assume_yes {
            return current;
        }
        self.prompter.input("Branch to push", &current)
    }

    fn push(&mut self, repo: &Path, options: &RunOptions) -> StepResult<()> {
        self.checkpoint()?;
        print_phase_banner("PUSH", BannerColor::Cyan);
        let commands = self.commands;

        let branch = self.choose_branch(repo, options);
        self.checkpoint()?;
        let local = git::local_branches(commands, repo);
        if !local.is_empty() {
            print_action(&format!("Local branches: {}", local.join(", ")));
        }
        let refspec = if local.iter().any(|b| b == &branch) {
            branch.clone()
        } else {
            print_warning(&format!(
                "Branch '{}' does not exist locally; the current HEAD will be pushed as a new remote branch",
                branch
            ));
            format!("HEAD:{}", branch)
        };

        if !git::has_remote(commands, repo, DEFAULT_REMOTE) {
            self.create_remote(repo, options)?;
        }

        let question = format!("Push '{}' to {}?", branch, DEFAULT_REMOTE);
        let accepted = self.confirm(&question, options);
        self.checkpoint()?;
        if !accepted {
            return Err(RunOutcome::Aborted("Push declined".to_string()));
        }
        if options.force {
            let forced = self.prompter.confirm(
                "Force push (with lease) may overwrite remote commits. Continue?",
                false,
            );
            self.checkpoint()?;
            if !forced {
                return Err(RunOutcome::Aborted("Force push declined".to_string()));
            }
        }

        let label = format!("Pushing {}", branch);
        let result = self.with_spinner(
            &label,
            || git::push_branch(commands, repo, &refspec, options.force),
            |r| match r {
                PushResult::Error(e) => Some(e.clone()),
                _ => None,
            },
        );

        match result {
            PushResult::Success => print_success(&format!("Pushed {}", branch)),
            PushResult::SuccessWithUpstream => print_success(&format!(
                "Pushed {} and set upstream to {}/{}",
                branch, DEFAULT_REMOTE, branch
            )),
            PushResult::AlreadyUpToDate => print_info("Remote is already up to date"),
            PushResult::Error(e) => {
                return Err(RunOutcome::Failed(format!("Push failed: {}", e)));
            }
        }

        self.results.record(Step::Push, true);
        Ok(())
    }

    /// No `origin` remote: create a GitHub repository with gh.
    fn create_remote(&self, repo: &Path, options: &RunOptions) -> StepResult<()> {
        let commands = self.commands;
        print_warning(&format!("No '{}' remote is configured", DEFAULT_REMOTE));

        if !gh::is_gh_installed(commands, repo) {
            return Err(RunOutcome::Failed(
                "No remote configured and the GitHub CLI (gh) is not installed".to_string(),
            ));
        }
        if !gh::is_gh_authenticated(commands, repo) {
            return Err(RunOutcome::Failed(
                "No remote configured and gh is not authenticated. Run 'gh auth login' first"
                    .to_string(),
            ));
        }

        let suggested = gh::repo_name_for(repo).unwrap_or_default();
        let name = if options.assume_yes && !suggested.is_empty() {
            suggested
        } else {
            self.prompter.input("GitHub repository name", &suggested)
        };
        self.checkpoint()?;
        if name.trim().is_empty() {
            return Err(RunOutcome::Aborted("No repository name given".to_string()));
        }

        let accepted = self.confirm(&format!("Create GitHub repository '{}'?", name), options);
        self.checkpoint()?;
        if !accepted {
            return Err(RunOutcome::Aborted(
                "Repository creation declined".to_string(),
            ));
        }

        let visibility = if options.assume_yes {
            RepoVisibility::Private
        } else {
            match self.prompter.select("Repository visibility", &["Private", "Public"]) {
                Some(0) => RepoVisibility::Private,
                Some(_) => RepoVisibility::Public,
                None => {
                    return Err(RunOutcome::Aborted(
                        "Repository creation cancelled".to_string(),
                    ))
                }
            }
        };
        self.checkpoint()?;

        let created = self.with_spinner(
            &format!("Creating {}", name),
            || gh::create_repo(commands, repo, &name, visibility),
            |r| r.as_ref().err().map(|e| e.to_string()),
        );
        created.map_err(|e| RunOutcome::Failed(e.to_string()))?;
        print_success(&format!("Created GitHub repository '{}'", name));
        Ok(())
    }

    /// Best effort; a failure here never fails the run.
    fn open_browser(&mut self, repo: &Path, options: &RunOptions) {
        if !options.open_browser || !self.config.auto_open_browser {
            debug!("browser open disabled");
            return;
        }
        if self.signal.is_shutdown_requested() {
            return;
        }
        print_phase_footer(BannerColor::Cyan);

        let commands = self.commands;
        if !gh::is_gh_installed(commands, repo) {
            print_warning("GitHub CLI (gh) not found; skipping browser open");
            return;
        }
        if let Some(url) = gh::repo_url(commands, repo) {
            print_action(&url);
        }
        if gh::open_in_browser(commands, repo) {
            self.results.record(Step::BrowserOpen, true);
        } else {
            print_warning("Could not open the repository in a browser");
        }
    }
}
