use crate::command::{DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_TIMEOUT_SECS};
use crate::error::{AutopushError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// The base config directory name under ~/.config/
const CONFIG_DIR_NAME: &str = "autopush";

/// The filename for the configuration file.
const CONFIG_FILENAME: &str = "config.toml";

/// Prefix of the generated commit message; a timestamp is appended.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Auto commit";

// ============================================================================
// Configuration
// ============================================================================

/// User preferences for a push run.
///
/// Missing fields in a config file fall back to their defaults, so a
/// partial file is valid.
///
/// # Example
///
/// ```toml
/// default_commit_message = "Auto commit"
/// auto_open_browser = true
/// debug_logging = false
/// command_timeout_secs = 300
/// max_output_bytes = 10485760
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Prefix of the suggested commit message.
    #[serde(default = "default_commit_message")]
    pub default_commit_message: String,

    /// Open the GitHub repository page after a successful push.
    #[serde(default = "default_true")]
    pub auto_open_browser: bool,

    /// Emit debug-level diagnostics on stderr.
    #[serde(default)]
    pub debug_logging: bool,

    /// Upper bound on how long a single git/gh command may run.
    #[serde(default = "default_timeout")]
    pub command_timeout_secs: u64,

    /// Upper bound on captured output per stream of a single command.
    #[serde(default = "default_max_output")]
    pub max_output_bytes: usize,
}

fn default_commit_message() -> String {
    DEFAULT_COMMIT_MESSAGE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_output() -> usize {
    DEFAULT_MAX_OUTPUT_BYTES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_commit_message: default_commit_message(),
            auto_open_browser: true,
            debug_logging: false,
            command_timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroTimeout,
    ZeroOutputLimit,
    BlankCommitMessage,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroTimeout => {
                write!(f, "`command_timeout_secs` must be greater than zero")
            }
            ConfigError::ZeroOutputLimit => {
                write!(f, "`max_output_bytes` must be greater than zero")
            }
            ConfigError::BlankCommitMessage => {
                write!(f, "`default_commit_message` must not be blank")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validate a configuration for consistency.
pub fn validate_config(config: &Config) -> std::result::Result<(), ConfigError> {
    if config.command_timeout_secs == 0 {
        return Err(ConfigError::ZeroTimeout);
    }
    if config.max_output_bytes == 0 {
        return Err(ConfigError::ZeroOutputLimit);
    }
    if config.default_commit_message.trim().is_empty() {
        return Err(ConfigError::BlankCommitMessage);
    }
    Ok(())
}

/// Keys accepted by `config set`.
pub const VALID_KEYS: &[&str] = &[
    "default_commit_message",
    "auto_open_browser",
    "debug_logging",
    "command_timeout_secs",
    "max_output_bytes",
];

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(AutopushError::Config(format!(
            "Invalid value for '{}': expected true or false, got '{}'",
            key, value
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        AutopushError::Config(format!(
            "Invalid value for '{}': expected a non-negative integer, got '{}'",
            key, value
        ))
    })
}

impl Config {
    /// Set one key from its string form, then validate the result.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let mut updated = self.clone();
        match key {
            "default_commit_message" => updated.default_commit_message = value.to_string(),
            "auto_open_browser" => updated.auto_open_browser = parse_bool(key, value)?,
            "debug_logging" => updated.debug_logging = parse_bool(key, value)?,
            "command_timeout_secs" => updated.command_timeout_secs = parse_number(key, value)?,
            "max_output_bytes" => updated.max_output_bytes = parse_number(key, value)?,
            _ => {
                return Err(AutopushError::Config(format!(
                    "Unknown config key '{}'. Valid keys: {}",
                    key,
                    VALID_KEYS.join(", ")
                )))
            }
        }
        validate_config(&updated).map_err(|e| AutopushError::Config(e.to_string()))?;
        *self = updated;
        Ok(())
    }
}

// ============================================================================
// Config File Management
// ============================================================================

/// Generate config file content with explanatory comments.
pub fn generate_config_with_comments(config: &Config) -> String {
    format!(
        r#"# autopush configuration

# Commit message suggested when -m/--message is not given.
# A timestamp is appended, e.g. "Auto commit: 2024-05-01 12:00:00".
default_commit_message = {}

# Open the GitHub repository page after a successful push (needs gh).
auto_open_browser = {}

# Print debug diagnostics on stderr (RUST_LOG overrides this).
debug_logging = {}

# Maximum seconds a single git/gh command may run before it is stopped.
command_timeout_secs = {}

# Maximum bytes of output captured per stream of a single command.
max_output_bytes = {}
"#,
        toml::Value::String(config.default_commit_message.clone()),
        config.auto_open_browser,
        config.debug_logging,
        config.command_timeout_secs,
        config.max_output_bytes
    )
}

/// Get the autopush config directory path (~/.config/autopush/).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AutopushError::Config("Could not determine home directory".to_string()))?;
    Ok(config_dir_at(&home))
}

fn config_dir_at(home: &Path) -> PathBuf {
    home.join(".config").join(CONFIG_DIR_NAME)
}

/// Get the path to the config file.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILENAME))
}

/// Load the configuration from `~/.config/autopush/config.toml`.
///
/// Creates the file with defaults and comments when it does not exist.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

/// Load a configuration from a specific path, creating it if missing.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        save_config_to(path, &Config::default())?;
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content).map_err(|e| {
        AutopushError::Config(format!(
            "Failed to parse config file at {:?}: {}",
            path, e
        ))
    })?;

    validate_config(&config).map_err(|e| {
        AutopushError::Config(format!("Invalid config file at {:?}: {}", path, e))
    })?;

    Ok(config)
}

/// Save the configuration to `~/.config/autopush/config.toml`.
pub fn save_config(config: &Config) -> Result<()> {
    save_config_to(&config_path()?, config)
}

/// Save a configuration with comments, creating parent directories.
pub fn save_config_to(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, generate_config_with_comments(config))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.default_commit_message, "Auto commit");
        assert!(config.auto_open_browser);
        assert!(!config.debug_logging);
        assert_eq!(config.command_timeout_secs, 300);
        assert_eq!(config.max_output_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_config_dir_at_layout() {
        let home = Path::new("/home/someone");
        assert_eq!(
            config_dir_at(home),
            PathBuf::from("/home/someone/.config/autopush")
        );
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("debug_logging = true").unwrap();
        assert!(config.debug_logging);
        assert!(config.auto_open_browser);
        assert_eq!(config.default_commit_message, "Auto commit");
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_generated_file_parses_back() {
        let config = Config {
            default_commit_message: "WIP \"sync\"".to_string(),
            auto_open_browser: false,
            debug_logging: true,
            command_timeout_secs: 60,
            max_output_bytes: 4096,
        };
        let parsed: Config = toml::from_str(&generate_config_with_comments(&config)).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_generated_file_escapes_control_characters() {
        let config = Config {
            default_commit_message: "Sync\u{7}\tbuild\\out\u{1b}[0m".to_string(),
            ..Default::default()
        };
        let parsed: Config = toml::from_str(&generate_config_with_comments(&config)).unwrap();
        assert_eq!(parsed.default_commit_message, config.default_commit_message);
    }

    #[test]
    fn test_load_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".config").join("autopush").join("config.toml");

        let config = load_config_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("# autopush configuration"));
    }

    #[test]
    fn test_load_reads_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "auto_open_browser = false\ncommand_timeout_secs = 30\n").unwrap();

        let config = load_config_from(&path).unwrap();
        assert!(!config.auto_open_browser);
        assert_eq!(config.command_timeout_secs, 30);
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "auto_open_browser = \"maybe\"").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, AutopushError::Config(_)));
    }

    #[test]
    fn test_load_rejects_zero_timeout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "command_timeout_secs = 0").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("command_timeout_secs"));
    }

    #[test]
    fn test_validate_config_rules() {
        assert!(validate_config(&Config::default()).is_ok());

        let blank = Config {
            default_commit_message: "   ".to_string(),
            ..Default::default()
        };
        assert_eq!(validate_config(&blank), Err(ConfigError::BlankCommitMessage));

        let no_output = Config {
            max_output_bytes: 0,
            ..Default::default()
        };
        assert_eq!(validate_config(&no_output), Err(ConfigError::ZeroOutputLimit));
    }

    #[test]
    fn test_set_value_updates_fields() {
        let mut config = Config::default();
        config.set_value("auto_open_browser", "false").unwrap();
        config.set_value("command_timeout_secs", "120").unwrap();
        config.set_value("default_commit_message", "Sync").unwrap();
        assert!(!config.auto_open_browser);
        assert_eq!(config.command_timeout_secs, 120);
        assert_eq!(config.default_commit_message, "Sync");
    }

    #[test]
    fn test_set_value_rejects_bad_input_without_mutating() {
        let mut config = Config::default();
        assert!(config.set_value("unknown_key", "1").is_err());
        assert!(config.set_value("debug_logging", "perhaps").is_err());
        assert!(config.set_value("command_timeout_secs", "0").is_err());
        assert!(config.set_value("max_output_bytes", "-5").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            debug_logging: true,
            ..Default::default()
        };
        save_config_to(&path, &config).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), config);
    }
}
