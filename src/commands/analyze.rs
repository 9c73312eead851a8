//! Analyze command handler.
//!
//! Runs the directory classifier without touching git and prints the
//! result, either as a report or as JSON.

use crate::classify::{classify, DirectoryAnalysis};
use crate::error::Result;
use crate::output::print_directory_analysis;
use crate::platform::PlatformDescriptor;
use crate::runner::validate_repo_path;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// JSON shape of `autopush analyze --json`.
#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub path: PathBuf,
    pub platform: &'a PlatformDescriptor,
    #[serde(flatten)]
    pub analysis: &'a DirectoryAnalysis,
}

pub fn analyze_to_json(path: &Path, platform: &PlatformDescriptor) -> Result<String> {
    let path = validate_repo_path(path)?;
    let analysis = classify(&path, platform);
    let report = AnalysisReport {
        path,
        platform,
        analysis: &analysis,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn analyze_command(path: &Path, json: bool) -> Result<()> {
    let platform = PlatformDescriptor::detect();

    if json {
        println!("{}", analyze_to_json(path, &platform)?);
        return Ok(());
    }

    let path = validate_repo_path(path)?;
    let analysis = classify(&path, &platform);
    print_directory_analysis(&path, &analysis, &platform);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AutopushError;
    use crate::platform::PlatformFamily;
    use tempfile::TempDir;

    #[test]
    fn test_json_report_for_source_project() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        let platform = PlatformDescriptor::for_family(PlatformFamily::Linux);

        let json = analyze_to_json(dir.path(), &platform).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["folder_type"], "source_project");
        assert_eq!(value["has_source_files"], true);
        assert_eq!(value["git_init_recommended"], true);
        assert_eq!(value["platform"]["family"], "linux");
        assert!(value["warning_message"].is_null());
    }

    #[test]
    fn test_json_report_for_missing_path_errors() {
        let dir = TempDir::new().unwrap();
        let platform = PlatformDescriptor::for_family(PlatformFamily::Linux);
        let err = analyze_to_json(&dir.path().join("gone"), &platform).unwrap_err();
        assert!(matches!(err, AutopushError::PathNotFound(_)));
    }
}
