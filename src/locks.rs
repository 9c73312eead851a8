//! Stale git lock files.
//!
//! A git process that crashed or was killed can leave `index.lock` and
//! friends behind, after which every `git add` or `git commit` fails with
//! "Unable to create ... File exists". These helpers find such files and
//! tell whether a live git process might still own them.

use std::fs;
use std::path::{Path, PathBuf};

use crate::command::CommandRunner;
use crate::git::GIT_DIR_NAME;
use crate::platform::PlatformFamily;

/// Lock files directly under `.git`.
const TOP_LEVEL_LOCKS: &[&str] = &["index.lock", "HEAD.lock", "config.lock"];

/// Directory under `.git` whose ref lock files are also collected.
const BRANCH_REFS_DIR: &str = "refs/heads";

const LOCK_EXTENSION: &str = "lock";

const TASKLIST_ARGS: &[&str] = &["/FI", "IMAGENAME eq git.exe", "/NH"];
const PS_ARGS: &[&str] = &["-A", "-o", "comm="];

/// Lock files present in the repository's git directory, in a stable order.
///
/// Returns an empty list when `.git` is missing or is a worktree file.
pub fn find_lock_files(repo: &Path) -> Vec<PathBuf> {
    let git_dir = repo.join(GIT_DIR_NAME);
    if !git_dir.is_dir() {
        return Vec::new();
    }

    let mut locks: Vec<PathBuf> = TOP_LEVEL_LOCKS
        .iter()
        .map(|name| git_dir.join(name))
        .filter(|path| path.is_file())
        .collect();

    let mut ref_locks = Vec::new();
    collect_ref_locks(&git_dir.join(BRANCH_REFS_DIR), &mut ref_locks);
    ref_locks.sort();
    locks.extend(ref_locks);
    locks
}

fn collect_ref_locks(dir: &Path, found: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_ref_locks(&path, found);
        } else if path.extension().is_some_and(|ext| ext == LOCK_EXTENSION) {
            found.push(path);
        }
    }
}

/// Remove the given lock files, returning the ones that could not be removed.
pub fn remove_lock_files(locks: &[PathBuf]) -> Vec<(PathBuf, std::io::Error)> {
    locks
        .iter()
        .filter_map(|path| match fs::remove_file(path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "removed git lock file");
                None
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => Some((path.clone(), e)),
        })
        .collect()
}

/// Process listing command for a platform family.
fn process_list_command(family: PlatformFamily) -> (&'static str, &'static [&'static str]) {
    match family {
        PlatformFamily::Windows => ("tasklist", TASKLIST_ARGS),
        _ => ("ps", PS_ARGS),
    }
}

/// Count process names in a listing that belong to git.
pub fn count_git_processes(listing: &str, family: PlatformFamily) -> usize {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| match family {
            PlatformFamily::Windows => line.to_lowercase().starts_with("git.exe"),
            _ => {
                let name = line.rsplit('/').next().unwrap_or(line);
                name == "git" || name.starts_with("git-")
            }
        })
        .count()
}

/// Number of git processes currently running.
///
/// `None` when the process listing itself could not be obtained.
pub fn running_git_processes(
    runner: &dyn CommandRunner,
    family: PlatformFamily,
    cwd: &Path,
) -> Option<usize> {
    let (program, args) = process_list_command(family);
    let result = runner.run(program, args, cwd);
    if !result.success {
        tracing::debug!(program, error = %result.message(), "process listing failed");
        return None;
    }
    Some(count_git_processes(&result.stdout, family))
}
