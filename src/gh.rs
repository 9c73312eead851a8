//! GitHub CLI (gh) integration.
//!
//! Used when a repository has no `origin` remote yet (to create one on
//! GitHub) and after a successful push (to open the repository page).

use std::path::Path;

use crate::command::CommandRunner;
use crate::error::{AutopushError, Result};

/// Visibility of a newly created GitHub repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoVisibility {
    Private,
    Public,
}

impl RepoVisibility {
    pub fn flag(&self) -> &'static str {
        match self {
            RepoVisibility::Private => "--private",
            RepoVisibility::Public => "--public",
        }
    }
}

/// Check if the GitHub CLI (gh) is installed and available in PATH
pub fn is_gh_installed(runner: &dyn CommandRunner, cwd: &Path) -> bool {
    runner.run("gh", &["--version"], cwd).success
}

/// Check if the user is authenticated with GitHub CLI
///
/// Uses `gh auth status` which returns exit code 0 if authenticated.
pub fn is_gh_authenticated(runner: &dyn CommandRunner, cwd: &Path) -> bool {
    runner.run("gh", &["auth", "status"], cwd).success
}

/// Derive a GitHub repository name from the directory name.
///
/// Whitespace becomes `-`; characters GitHub rejects are dropped.
pub fn repo_name_for(path: &Path) -> Option<String> {
    let raw = path.file_name()?.to_str()?;
    let name: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();

    if name.is_empty() || name.chars().all(|c| c == '.') {
        None
    } else {
        Some(name)
    }
}

/// Create a GitHub repository from the local one and register it as `origin`.
///
/// Runs `gh repo create <name> --private|--public --source . --remote origin`.
pub fn create_repo(
    runner: &dyn CommandRunner,
    repo: &Path,
    name: &str,
    visibility: RepoVisibility,
) -> Result<()> {
    let result = runner.run(
        "gh",
        &[
            "repo",
            "create",
            name,
            visibility.flag(),
            "--source",
            ".",
            "--remote",
            crate::git::DEFAULT_REMOTE,
        ],
        repo,
    );

    if !result.success {
        return Err(AutopushError::GhError(format!(
            "Failed to create repository '{}': {}",
            name,
            result.message()
        )));
    }

    Ok(())
}

/// URL of the GitHub repository backing `repo`, if gh can resolve it.
pub fn repo_url(runner: &dyn CommandRunner, repo: &Path) -> Option<String> {
    let result = runner.run("gh", &["repo", "view", "--json", "url"], repo);
    if !result.success {
        return None;
    }

    // Expected format: {"url":"https://github.com/owner/name"}
    let parsed: serde_json::Value = serde_json::from_str(result.stdout.trim()).ok()?;
    parsed
        .get("url")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Open the repository page in the default browser.
pub fn open_in_browser(runner: &dyn CommandRunner, repo: &Path) -> bool {
    runner.run("gh", &["repo", "view", "--web"], repo).success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandFailure, CommandResult};
    use crate::test_utils::ScriptedRunner;

    #[test]
    fn test_repo_name_from_directory() {
        assert_eq!(
            repo_name_for(Path::new("/home/me/my project")).as_deref(),
            Some("my-project")
        );
        assert_eq!(
            repo_name_for(Path::new("/work/api_server.v2")).as_deref(),
            Some("api_server.v2")
        );
        assert_eq!(repo_name_for(Path::new("/work/プロジェクト")), None);
        assert_eq!(repo_name_for(Path::new("/")), None);
    }

    #[test]
    fn test_create_repo_builds_expected_command() {
        let runner = ScriptedRunner::new(vec![CommandResult::ok("")]);
        create_repo(&runner, Path::new("."), "demo", RepoVisibility::Private).unwrap();
        assert_eq!(
            runner.calls(),
            vec!["gh repo create demo --private --source . --remote origin"]
        );
    }

    #[test]
    fn test_create_repo_failure_is_gh_error() {
        let runner = ScriptedRunner::new(vec![CommandResult::failed(
            "name already exists on this account",
            CommandFailure::NonZeroExit(1),
        )]);
        let err = create_repo(&runner, Path::new("."), "demo", RepoVisibility::Public).unwrap_err();
        assert!(matches!(err, AutopushError::GhError(_)));
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_repo_url_parses_json() {
        let runner = ScriptedRunner::new(vec![CommandResult::ok(
            "{\"url\":\"https://github.com/me/demo\"}\n",
        )]);
        assert_eq!(
            repo_url(&runner, Path::new(".")).as_deref(),
            Some("https://github.com/me/demo")
        );
    }

    #[test]
    fn test_repo_url_none_on_garbage() {
        let runner = ScriptedRunner::new(vec![CommandResult::ok("not json")]);
        assert_eq!(repo_url(&runner, Path::new(".")), None);
    }

    #[test]
    fn test_prerequisite_checks_use_exit_status() {
        let runner = ScriptedRunner::new(vec![
            CommandResult::ok("gh version 2.40.0"),
            CommandResult::failed("not logged in", CommandFailure::NonZeroExit(1)),
        ]);
        assert!(is_gh_installed(&runner, Path::new(".")));
        assert!(!is_gh_authenticated(&runner, Path::new(".")));
    }
}
