//! Host platform detection.
//!
//! The platform only influences which sensitive path fragments the
//! directory classifier checks. Detection goes through [`PlatformProbe`] so
//! tests can pin a platform instead of depending on the host.

use serde::Serialize;
use std::fmt;
use std::fs;

/// Substrings in the Linux kernel version text that identify WSL.
const WSL_MARKERS: &[&str] = &["microsoft", "wsl"];

/// Kernel version text on Linux hosts.
const PROC_VERSION_PATH: &str = "/proc/version";

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    Windows,
    #[serde(rename = "macos")]
    MacOs,
    Linux,
    Wsl,
    Unknown,
}

impl PlatformFamily {
    pub fn name(&self) -> &'static str {
        match self {
            PlatformFamily::Windows => "windows",
            PlatformFamily::MacOs => "macos",
            PlatformFamily::Linux => "linux",
            PlatformFamily::Wsl => "wsl",
            PlatformFamily::Unknown => "unknown",
        }
    }

    /// Whether paths on this platform use Unix separators.
    pub fn is_unix_like(&self) -> bool {
        !matches!(self, PlatformFamily::Windows)
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable description of the host, computed once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformDescriptor {
    pub family: PlatformFamily,
    pub shell_hint: String,
}

impl PlatformDescriptor {
    /// Build a descriptor for a known family with its default shell hint.
    pub fn for_family(family: PlatformFamily) -> Self {
        let shell_hint = match family {
            PlatformFamily::Windows => "PowerShell or cmd.exe",
            PlatformFamily::MacOs => "zsh",
            PlatformFamily::Linux => "bash",
            PlatformFamily::Wsl => "bash (WSL); Windows paths are under /mnt/<drive>",
            PlatformFamily::Unknown => "sh",
        };
        Self {
            family,
            shell_hint: shell_hint.to_string(),
        }
    }

    /// Detect the current host.
    pub fn detect() -> Self {
        detect_with(&HostProbe)
    }
}

/// Source of the raw facts platform detection needs.
pub trait PlatformProbe {
    /// Operating system identifier, as in `std::env::consts::OS`.
    fn os(&self) -> &str;

    /// Kernel version text (Linux only); `None` when unavailable.
    fn kernel_version(&self) -> Option<String>;
}

/// Probe that reads the real host.
pub struct HostProbe;

impl PlatformProbe for HostProbe {
    fn os(&self) -> &str {
        std::env::consts::OS
    }

    fn kernel_version(&self) -> Option<String> {
        fs::read_to_string(PROC_VERSION_PATH).ok()
    }
}

/// Detect the platform using the given probe.
pub fn detect_with(probe: &dyn PlatformProbe) -> PlatformDescriptor {
    let family = match probe.os() {
        "windows" => PlatformFamily::Windows,
        "macos" => PlatformFamily::MacOs,
        "linux" => {
            let is_wsl = probe
                .kernel_version()
                .map(|text| {
                    let text = text.to_lowercase();
                    WSL_MARKERS.iter().any(|marker| text.contains(marker))
                })
                .unwrap_or(false);
            if is_wsl {
                PlatformFamily::Wsl
            } else {
                PlatformFamily::Linux
            }
        }
        _ => PlatformFamily::Unknown,
    };
    PlatformDescriptor::for_family(family)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProbe {
        os: &'static str,
        kernel: Option<&'static str>,
    }

    impl PlatformProbe for FixedProbe {
        fn os(&self) -> &str {
            self.os
        }

        fn kernel_version(&self) -> Option<String> {
            self.kernel.map(str::to_string)
        }
    }

    #[test]
    fn test_detects_windows_and_macos() {
        let windows = detect_with(&FixedProbe {
            os: "windows",
            kernel: None,
        });
        assert_eq!(windows.family, PlatformFamily::Windows);

        let mac = detect_with(&FixedProbe {
            os: "macos",
            kernel: None,
        });
        assert_eq!(mac.family, PlatformFamily::MacOs);
    }

    #[test]
    fn test_detects_plain_linux() {
        let linux = detect_with(&FixedProbe {
            os: "linux",
            kernel: Some("Linux version 6.5.0-generic (buildd@ubuntu) (gcc 12.3.0)"),
        });
        assert_eq!(linux.family, PlatformFamily::Linux);
    }

    #[test]
    fn test_detects_wsl_from_kernel_marker() {
        let wsl = detect_with(&FixedProbe {
            os: "linux",
            kernel: Some("Linux version 5.15.90.1-microsoft-standard-WSL2"),
        });
        assert_eq!(wsl.family, PlatformFamily::Wsl);

        let wsl1 = detect_with(&FixedProbe {
            os: "linux",
            kernel: Some("Linux version 4.4.0-19041-Microsoft"),
        });
        assert_eq!(wsl1.family, PlatformFamily::Wsl);
    }

    #[test]
    fn test_detects_wsl_from_wsl_marker_alone() {
        let wsl = detect_with(&FixedProbe {
            os: "linux",
            kernel: Some("Linux version 6.6.36.3-WSL2-custom (root@build) (gcc 13.2.0)"),
        });
        assert_eq!(wsl.family, PlatformFamily::Wsl);
    }

    #[test]
    fn test_linux_without_kernel_text_is_linux() {
        let linux = detect_with(&FixedProbe {
            os: "linux",
            kernel: None,
        });
        assert_eq!(linux.family, PlatformFamily::Linux);
    }

    #[test]
    fn test_unrecognized_os_is_unknown() {
        let other = detect_with(&FixedProbe {
            os: "freebsd",
            kernel: None,
        });
        assert_eq!(other.family, PlatformFamily::Unknown);
        assert!(other.family.is_unix_like());
    }

    #[test]
    fn test_family_serializes_lowercase() {
        let json = serde_json::to_string(&PlatformFamily::MacOs).unwrap();
        assert_eq!(json, "\"macos\"");
        let json = serde_json::to_string(&PlatformFamily::Wsl).unwrap();
        assert_eq!(json, "\"wsl\"");
    }

    #[test]
    fn test_host_detection_does_not_panic() {
        let descriptor = PlatformDescriptor::detect();
        assert!(!descriptor.shell_hint.is_empty());
    }
}
