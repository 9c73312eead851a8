//! Directory classification.
//!
//! Decides what kind of directory the user pointed at before anything is
//! initialized. The result is advisory only: every filesystem failure
//! degrades to a conservative default and [`classify`] never errors.

use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::git::has_git_directory;
use crate::platform::{PlatformDescriptor, PlatformFamily};

// ============================================================================
// Static tables
// ============================================================================

/// Sensitive path components shared by every Unix-like platform.
const UNIX_SYSTEM_FRAGMENTS: &[&str] = &[
    "/bin",
    "/sbin",
    "/etc",
    "/proc",
    "/sys",
    "/dev",
    "/boot",
    "/usr/bin",
    "/usr/sbin",
    "/usr/lib",
    "/var/lib",
    "/lib",
];

const MACOS_SYSTEM_FRAGMENTS: &[&str] = &["/system", "/library", "/applications", "/private"];

const WSL_SYSTEM_FRAGMENTS: &[&str] = &["/mnt/c/windows", "/mnt/c/program files"];

/// Windows fragments, written with `/` since separators are normalized first.
const WINDOWS_SYSTEM_FRAGMENTS: &[&str] = &[
    "/windows",
    "/program files",
    "/program files (x86)",
    "/programdata",
    "/system32",
    "/$recycle.bin",
];

/// Extensions that mark a file as source or project configuration.
const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "ts", "jsx", "tsx", "java", "c", "cpp", "h", "hpp", "cs", "go", "rb",
    "php", "swift", "kt", "scala", "html", "css", "scss", "vue", "json", "yaml", "yml", "toml",
    "md", "sh",
];

/// Project manifests and build files recognized by exact name.
const MANIFEST_FILES: &[&str] = &[
    "package.json",
    "Cargo.toml",
    "pyproject.toml",
    "requirements.txt",
    "setup.py",
    "pom.xml",
    "build.gradle",
    "go.mod",
    "Gemfile",
    "composer.json",
    "Makefile",
    "CMakeLists.txt",
    "Dockerfile",
];

/// Conventional source directory names.
const SOURCE_DIRS: &[&str] = &["src", "lib", "app", "components", "modules"];

/// Sensitive path fragments checked for a platform family.
pub fn system_fragments(family: PlatformFamily) -> Vec<&'static str> {
    match family {
        PlatformFamily::Windows => WINDOWS_SYSTEM_FRAGMENTS.to_vec(),
        PlatformFamily::MacOs => [UNIX_SYSTEM_FRAGMENTS, MACOS_SYSTEM_FRAGMENTS].concat(),
        PlatformFamily::Wsl => [UNIX_SYSTEM_FRAGMENTS, WSL_SYSTEM_FRAGMENTS].concat(),
        PlatformFamily::Linux | PlatformFamily::Unknown => UNIX_SYSTEM_FRAGMENTS.to_vec(),
    }
}

// ============================================================================
// Result types
// ============================================================================

/// The single label assigned to a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderType {
    ExistingGitRepo,
    SystemFolder,
    NestedInRepo,
    EmptyFolder,
    SourceProject,
    GeneralFolder,
}

impl FolderType {
    pub fn label(&self) -> &'static str {
        match self {
            FolderType::ExistingGitRepo => "existing_git_repo",
            FolderType::SystemFolder => "system_folder",
            FolderType::NestedInRepo => "nested_in_repo",
            FolderType::EmptyFolder => "empty_folder",
            FolderType::SourceProject => "source_project",
            FolderType::GeneralFolder => "general_folder",
        }
    }
}

impl fmt::Display for FolderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of classifying one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryAnalysis {
    pub is_git_repo: bool,
    pub is_empty: bool,
    pub has_source_files: bool,
    pub is_system_folder: bool,
    pub is_nested_repo: bool,
    pub folder_type: FolderType,
    pub git_init_recommended: bool,
    pub warning_message: Option<String>,
    pub action_recommendation: String,
}

/// The independent facts the rule table is evaluated against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryFacts {
    pub is_git_repo: bool,
    pub is_system_folder: bool,
    pub is_nested_repo: bool,
    pub is_empty: bool,
    pub has_source_files: bool,
}

// ============================================================================
// Rule table
// ============================================================================

/// One row of the classification table.
pub struct Rule {
    pub folder_type: FolderType,
    pub matches: fn(&DirectoryFacts) -> bool,
    pub git_init_recommended: bool,
    pub recommendation: &'static str,
    pub warning: Option<&'static str>,
}

fn is_git_repo(f: &DirectoryFacts) -> bool {
    f.is_git_repo
}

fn is_system_folder(f: &DirectoryFacts) -> bool {
    f.is_system_folder
}

fn is_nested_repo(f: &DirectoryFacts) -> bool {
    f.is_nested_repo
}

fn is_empty(f: &DirectoryFacts) -> bool {
    f.is_empty
}

fn has_sources(f: &DirectoryFacts) -> bool {
    f.has_source_files
}

fn always(_: &DirectoryFacts) -> bool {
    true
}

/// Classification rules in priority order. The first matching row wins.
pub const RULES: &[Rule] = &[
    Rule {
        folder_type: FolderType::ExistingGitRepo,
        matches: is_git_repo,
        git_init_recommended: false,
        recommendation: "Already a git repository. Continue with staging and commit.",
        warning: None,
    },
    Rule {
        folder_type: FolderType::SystemFolder,
        matches: is_system_folder,
        git_init_recommended: false,
        recommendation: "Choose a project directory instead of a system location.",
        warning: Some(
            "This looks like a system directory. Initializing a git repository here is not recommended.",
        ),
    },
    Rule {
        folder_type: FolderType::NestedInRepo,
        matches: is_nested_repo,
        git_init_recommended: false,
        recommendation:
            "Work from the parent repository, or confirm that a separate nested repository is intended.",
        warning: Some(
            "This directory is inside another git repository. A nested repository is usually a mistake; consider a submodule instead.",
        ),
    },
    Rule {
        folder_type: FolderType::EmptyFolder,
        matches: is_empty,
        git_init_recommended: true,
        recommendation: "Empty folder. Initialize a git repository, then add files.",
        warning: None,
    },
    Rule {
        folder_type: FolderType::SourceProject,
        matches: has_sources,
        git_init_recommended: true,
        recommendation: "Source project detected. Initializing a git repository is recommended.",
        warning: None,
    },
    Rule {
        folder_type: FolderType::GeneralFolder,
        matches: always,
        git_init_recommended: true,
        recommendation: "No source files detected. You can still initialize a git repository here.",
        warning: None,
    },
];

/// Apply the rule table to a set of facts.
pub fn analyze_facts(facts: DirectoryFacts) -> DirectoryAnalysis {
    // The last rule always matches, so the fallback is never taken.
    let rule = RULES
        .iter()
        .find(|rule| (rule.matches)(&facts))
        .unwrap_or(&RULES[RULES.len() - 1]);

    DirectoryAnalysis {
        is_git_repo: facts.is_git_repo,
        is_empty: facts.is_empty,
        has_source_files: facts.has_source_files,
        is_system_folder: facts.is_system_folder,
        is_nested_repo: facts.is_nested_repo,
        folder_type: rule.folder_type,
        git_init_recommended: rule.git_init_recommended,
        warning_message: rule.warning.map(str::to_string),
        action_recommendation: rule.recommendation.to_string(),
    }
}

// ============================================================================
// Probes
// ============================================================================

/// Classify a directory for the given platform.
pub fn classify(path: &Path, platform: &PlatformDescriptor) -> DirectoryAnalysis {
    let path = absolute_path(path);
    let is_git_repo = has_git_directory(&path);

    let facts = DirectoryFacts {
        is_git_repo,
        is_system_folder: is_system_path(&path.to_string_lossy(), platform.family),
        is_nested_repo: !is_git_repo && has_git_ancestor(&path),
        is_empty: is_empty_dir(&path),
        has_source_files: has_source_files(&path),
    };

    analyze_facts(facts)
}

fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Whether a path contains a sensitive system location for the platform.
///
/// Comparison is case-insensitive and separators are normalized to `/`. A
/// fragment matches anywhere in the path, but only on whole components:
/// `/home/me/etc` is a system path, `/home/me/etcetera` is not.
pub fn is_system_path(path: &str, family: PlatformFamily) -> bool {
    let normalized = path.replace('\\', "/").to_lowercase();
    let bounded = format!("/{}/", normalized.trim_matches('/'));

    system_fragments(family)
        .iter()
        .any(|fragment| bounded.contains(&format!("{}/", fragment)))
}

/// Walk ancestors up to the filesystem root looking for git metadata.
fn has_git_ancestor(path: &Path) -> bool {
    path.ancestors().skip(1).any(has_git_directory)
}

fn is_empty_dir(path: &Path) -> bool {
    match fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => false,
    }
}

/// Inspect direct children only for source files, manifests or source dirs.
fn has_source_files(path: &Path) -> bool {
    let Ok(entries) = fs::read_dir(path) else {
        return false;
    };

    entries.flatten().any(|entry| {
        let child = entry.path();
        let Some(name) = child.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        if child.is_dir() {
            return SOURCE_DIRS.contains(&name);
        }

        if MANIFEST_FILES.contains(&name) {
            return true;
        }

        child
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_ascii_lowercase();
                SOURCE_EXTENSIONS.contains(&ext.as_str())
            })
    })
}
