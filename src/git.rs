use std::path::Path;

use crate::command::{CommandResult, CommandRunner};
use crate::error::{AutopushError, Result};

/// Name of the git metadata directory.
pub const GIT_DIR_NAME: &str = ".git";

/// Remote the push step targets.
pub const DEFAULT_REMOTE: &str = "origin";

/// Branch assumed when git cannot report one.
pub const FALLBACK_BRANCH: &str = "main";

/// Check whether `path` has git metadata directly under it.
///
/// Works for both a `.git` directory and the `.git` file used by worktrees
/// and submodules.
pub fn has_git_directory(path: &Path) -> bool {
    path.join(GIT_DIR_NAME).exists()
}

/// Run a git command and return its trimmed stdout, or a `GitError`.
fn run_git(runner: &dyn CommandRunner, repo: &Path, args: &[&str]) -> Result<String> {
    let result = runner.run("git", args, repo);
    if !result.success {
        return Err(AutopushError::GitError(format!(
            "git {} failed: {}",
            args.first().unwrap_or(&""),
            result.message()
        )));
    }
    Ok(result.stdout.trim().to_string())
}

/// Run `git init` in the repository directory.
pub fn init(runner: &dyn CommandRunner, repo: &Path) -> Result<()> {
    run_git(runner, repo, &["init"]).map(|_| ())
}

/// Porcelain status lines for every changed or untracked path.
pub fn changed_files(runner: &dyn CommandRunner, repo: &Path) -> Result<Vec<String>> {
    let result = runner.run("git", &["status", "--porcelain"], repo);
    if !result.success {
        return Err(AutopushError::GitError(result.message()));
    }

    Ok(result
        .stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// Stage everything in the working tree.
pub fn add_all(runner: &dyn CommandRunner, repo: &Path) -> Result<()> {
    run_git(runner, repo, &["add", "."]).map(|_| ())
}

/// Create a commit with the given message.
pub fn commit(runner: &dyn CommandRunner, repo: &Path, message: &str) -> Result<()> {
    run_git(runner, repo, &["commit", "-m", message]).map(|_| ())
}

/// Identity written to the local repository config when none is set.
pub const FALLBACK_IDENTITY: [(&str, &str); 2] = [
    ("user.name", "Auto Committer"),
    ("user.email", "autocommit@example.com"),
];

/// Make sure `git commit` will find a user name and email.
///
/// Missing values are set in the repository's local config only, so a
/// global identity is never overwritten.
pub fn ensure_identity(runner: &dyn CommandRunner, repo: &Path) -> Result<()> {
    for (key, fallback) in FALLBACK_IDENTITY {
        let current = runner.run("git", &["config", key], repo);
        if current.success && !current.stdout.trim().is_empty() {
            continue;
        }
        tracing::warn!(key, fallback, "git identity not configured, using fallback");
        run_git(runner, repo, &["config", "--local", key, fallback])?;
    }
    Ok(())
}

/// Get the current branch name.
///
/// Falls back to `main` when HEAD is detached or the query fails.
pub fn current_branch(runner: &dyn CommandRunner, repo: &Path) -> String {
    match run_git(runner, repo, &["branch", "--show-current"]) {
        Ok(branch) if !branch.is_empty() => branch,
        _ => FALLBACK_BRANCH.to_string(),
    }
}

/// List local branch names.
pub fn local_branches(runner: &dyn CommandRunner, repo: &Path) -> Vec<String> {
    run_git(runner, repo, &["branch", "--format=%(refname:short)"])
        .map(|out| {
            out.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Check whether a remote with the given name is configured.
pub fn has_remote(runner: &dyn CommandRunner, repo: &Path, name: &str) -> bool {
    runner.run("git", &["remote", "get-url", name], repo).success
}

/// Check whether the current branch has an upstream tracking branch.
pub fn has_upstream(runner: &dyn CommandRunner, repo: &Path) -> bool {
    runner
        .run(
            "git",
            &["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"],
            repo,
        )
        .success
}

/// Refresh remote-tracking refs so ahead/behind counts are current.
pub fn fetch(runner: &dyn CommandRunner, repo: &Path) -> CommandResult {
    runner.run("git", &["fetch", "--quiet"], repo)
}

/// Result type for push operations
#[derive(Debug, Clone, PartialEq)]
pub enum PushResult {
    /// Push succeeded
    Success,
    /// Push succeeded only after setting up upstream tracking
    SuccessWithUpstream,
    /// Branch already up-to-date on remote
    AlreadyUpToDate,
    /// Push failed with error message
    Error(String),
}

impl PushResult {
    pub fn is_success(&self) -> bool {
        !matches!(self, PushResult::Error(_))
    }
}

fn push_args<'a>(branch: &'a str, force: bool, set_upstream: bool) -> Vec<&'a str> {
    let mut args = vec!["push"];
    if set_upstream {
        args.push("-u");
    }
    if force {
        args.push("--force-with-lease");
    }
    args.push(DEFAULT_REMOTE);
    args.push(branch);
    args
}

/// Push a branch to `origin`.
///
/// Runs `git push origin <branch>` first. If that fails it retries once
/// with `-u` so a branch without tracking gets its upstream set. With
/// `force`, both attempts use `--force-with-lease`.
pub fn push_branch(runner: &dyn CommandRunner, repo: &Path, branch: &str, force: bool) -> PushResult {
    let first = runner.run("git", &push_args(branch, force, false), repo);
    if first.success {
        // git push reports this on stderr
        if first.stderr.contains("Everything up-to-date") {
            return PushResult::AlreadyUpToDate;
        }
        return PushResult::Success;
    }

    tracing::debug!(branch, error = %first.message(), "push failed, retrying with upstream");

    let retry = runner.run("git", &push_args(branch, force, true), repo);
    if retry.success {
        return PushResult::SuccessWithUpstream;
    }

    PushResult::Error(retry.message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandFailure;
    use crate::test_utils::ScriptedRunner;
    use tempfile::TempDir;

    fn fail(stderr: &str) -> CommandResult {
        CommandResult::failed(stderr, CommandFailure::NonZeroExit(1))
    }

    #[test]
    fn test_has_git_directory() {
        let dir = TempDir::new().unwrap();
        assert!(!has_git_directory(dir.path()));
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        assert!(has_git_directory(dir.path()));
    }

    #[test]
    fn test_has_git_directory_accepts_gitfile() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".git"), "gitdir: ../.git/worktrees/x").unwrap();
        assert!(has_git_directory(dir.path()));
    }

    #[test]
    fn test_changed_files_skips_blank_lines() {
        let runner = ScriptedRunner::new(vec![CommandResult::ok(" M src/lib.rs\n?? new.txt\n\n")]);
        let files = changed_files(&runner, Path::new(".")).unwrap();
        assert_eq!(files, vec![" M src/lib.rs", "?? new.txt"]);
        assert_eq!(runner.calls(), vec!["git status --porcelain"]);
    }

    #[test]
    fn test_changed_files_propagates_failure() {
        let runner = ScriptedRunner::new(vec![fail("fatal: not a git repository")]);
        let err = changed_files(&runner, Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("not a git repository"));
    }

    #[test]
    fn test_commit_passes_message_as_single_argument() {
        let runner = ScriptedRunner::new(vec![CommandResult::ok("")]);
        commit(&runner, Path::new("."), "fix: handle \"quotes\"; rm -rf").unwrap();
        let args = runner.call_args();
        assert_eq!(args[0], vec!["commit", "-m", "fix: handle \"quotes\"; rm -rf"]);
    }

    #[test]
    fn test_ensure_identity_keeps_existing_values() {
        let runner = ScriptedRunner::new(vec![
            CommandResult::ok("Jane Doe\n"),
            CommandResult::ok("jane@example.com\n"),
        ]);
        ensure_identity(&runner, Path::new(".")).unwrap();
        assert_eq!(
            runner.calls(),
            vec!["git config user.name", "git config user.email"]
        );
    }

    #[test]
    fn test_ensure_identity_fills_missing_values_locally() {
        let runner = ScriptedRunner::new(vec![
            fail(""),
            CommandResult::ok(""),
            CommandResult::ok("jane@example.com\n"),
        ]);
        ensure_identity(&runner, Path::new(".")).unwrap();
        assert_eq!(
            runner.calls(),
            vec![
                "git config user.name",
                "git config --local user.name Auto Committer",
                "git config user.email",
            ]
        );
    }

    #[test]
    fn test_current_branch_falls_back_to_main() {
        let runner = ScriptedRunner::new(vec![CommandResult::ok("\n")]);
        assert_eq!(current_branch(&runner, Path::new(".")), "main");

        let runner = ScriptedRunner::new(vec![fail("fatal")]);
        assert_eq!(current_branch(&runner, Path::new(".")), "main");

        let runner = ScriptedRunner::new(vec![CommandResult::ok("feature/x\n")]);
        assert_eq!(current_branch(&runner, Path::new(".")), "feature/x");
    }

    #[test]
    fn test_local_branches_parses_names() {
        let runner = ScriptedRunner::new(vec![CommandResult::ok("main\nfeature/a\n")]);
        assert_eq!(
            local_branches(&runner, Path::new(".")),
            vec!["main", "feature/a"]
        );
    }

    #[test]
    fn test_push_success_on_first_attempt() {
        let runner = ScriptedRunner::new(vec![CommandResult::ok("")]);
        let result = push_branch(&runner, Path::new("."), "main", false);
        assert_eq!(result, PushResult::Success);
        assert_eq!(runner.calls(), vec!["git push origin main"]);
    }

    #[test]
    fn test_push_reports_up_to_date() {
        let mut ok = CommandResult::ok("");
        ok.stderr = "Everything up-to-date\n".to_string();
        let runner = ScriptedRunner::new(vec![ok]);
        let result = push_branch(&runner, Path::new("."), "main", false);
        assert_eq!(result, PushResult::AlreadyUpToDate);
    }

    #[test]
    fn test_push_falls_back_to_upstream_once() {
        let runner = ScriptedRunner::new(vec![fail("no upstream"), CommandResult::ok("")]);
        let result = push_branch(&runner, Path::new("."), "feature", false);
        assert_eq!(result, PushResult::SuccessWithUpstream);
        assert_eq!(
            runner.calls(),
            vec!["git push origin feature", "git push -u origin feature"]
        );
    }

    #[test]
    fn test_push_error_after_fallback_fails() {
        let runner = ScriptedRunner::new(vec![fail("first"), fail("permission denied")]);
        let result = push_branch(&runner, Path::new("."), "main", false);
        assert_eq!(result, PushResult::Error("permission denied".to_string()));
        assert!(!result.is_success());
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn test_force_push_uses_lease() {
        let runner = ScriptedRunner::new(vec![CommandResult::ok("")]);
        push_branch(&runner, Path::new("."), "main", true);
        assert_eq!(
            runner.calls(),
            vec!["git push --force-with-lease origin main"]
        );
    }

    #[test]
    fn test_push_result_variants_are_distinct() {
        assert_ne!(PushResult::Success, PushResult::AlreadyUpToDate);
        assert_ne!(PushResult::Success, PushResult::SuccessWithUpstream);
        assert!(PushResult::AlreadyUpToDate.is_success());
    }
}
