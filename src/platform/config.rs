// loganon - platform/config.rs
//
// Config directory resolution and config.toml loading with startup
// validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for loganon configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/loganon/ or %APPDATA%\loganon\config\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be
    /// determined.
    pub fn resolve() -> Self {
        match ProjectDirs::from("", "", constants::APP_ID) {
            Some(proj_dirs) => {
                let config_dir = proj_dirs.config_dir().to_path_buf();
                tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
                Self { config_dir }
            }
            None => {
                tracing::warn!("Could not determine platform directories, using current directory");
                Self {
                    config_dir: PathBuf::from("."),
                }
            }
        }
    }

    /// Use `dir` instead of the platform directory (`--config-dir`).
    pub fn with_config_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: dir.into(),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored so a newer config file still loads
/// with an older binary.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub parsing: ParsingSection,
    pub anonymization: AnonymizationSection,
    pub logging: LoggingSection,
}

/// `[parsing]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ParsingSection {
    /// Skipped-line errors retained per table.
    pub max_parse_errors: Option<usize>,
    /// Longest accepted input line in bytes.
    pub max_line_bytes: Option<usize>,
}

/// `[anonymization]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct AnonymizationSection {
    /// Token used by the placeholder policy when a request gives none.
    pub placeholder: Option<String>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    // -- Parsing --
    pub max_parse_errors: usize,
    pub max_line_bytes: usize,

    // -- Anonymization --
    pub placeholder: String,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
    pub log_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_parse_errors: constants::MAX_PARSE_ERRORS_PER_FILE,
            max_line_bytes: constants::DEFAULT_MAX_LINE_BYTES,
            placeholder: constants::DEFAULT_PLACEHOLDER.to_string(),
            log_level: None,
            log_file: None,
        }
    }
}

/// Load and validate `config.toml` from `config_dir`.
///
/// Returns the validated config plus a list of non-fatal warnings. A
/// missing file gives defaults with no warnings; an unreadable or
/// unparseable one gives defaults with a warning. Configuration problems
/// never stop a run.
pub fn load_config(config_dir: &Path) -> (AppConfig, Vec<String>) {
    let config_path = config_dir.join(constants::CONFIG_FILE_NAME);
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(&config_path) {
        Ok(c) => c,
        Err(e) => {
            let msg = format!(
                "Could not read config file '{}': {e}. Using defaults.",
                config_path.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!(
                "Failed to parse config file '{}': {e}. Using defaults.",
                config_path.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");

    let config = validate(raw, &mut warnings);
    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }
    (config, warnings)
}

/// Check every field against its named limits, accumulating all problems.
fn validate(raw: RawConfig, warnings: &mut Vec<String>) -> AppConfig {
    let mut config = AppConfig::default();

    // -- Parsing: max_parse_errors --
    if let Some(max) = raw.parsing.max_parse_errors {
        if max <= constants::ABSOLUTE_MAX_PARSE_ERRORS {
            config.max_parse_errors = max;
        } else {
            warnings.push(format!(
                "[parsing] max_parse_errors = {max} is out of range (0-{}). Using default ({}).",
                constants::ABSOLUTE_MAX_PARSE_ERRORS,
                constants::MAX_PARSE_ERRORS_PER_FILE,
            ));
        }
    }

    // -- Parsing: max_line_bytes --
    if let Some(bytes) = raw.parsing.max_line_bytes {
        if (constants::MIN_MAX_LINE_BYTES..=constants::ABSOLUTE_MAX_LINE_BYTES).contains(&bytes) {
            config.max_line_bytes = bytes;
        } else {
            warnings.push(format!(
                "[parsing] max_line_bytes = {bytes} is out of range ({}-{}). Using default ({}).",
                constants::MIN_MAX_LINE_BYTES,
                constants::ABSOLUTE_MAX_LINE_BYTES,
                constants::DEFAULT_MAX_LINE_BYTES,
            ));
        }
    }

    // -- Anonymization: placeholder --
    if let Some(placeholder) = raw.anonymization.placeholder {
        if placeholder.contains(['\n', '\r']) {
            warnings.push(format!(
                "[anonymization] placeholder must be a single line. Using default (\"{}\").",
                constants::DEFAULT_PLACEHOLDER,
            ));
        } else if placeholder.chars().count() > constants::MAX_PLACEHOLDER_LENGTH {
            warnings.push(format!(
                "[anonymization] placeholder is longer than {} characters. Using default (\"{}\").",
                constants::MAX_PLACEHOLDER_LENGTH,
                constants::DEFAULT_PLACEHOLDER,
            ));
        } else {
            config.placeholder = placeholder;
        }
    }

    // -- Logging: level --
    if let Some(level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level);
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    // -- Logging: file --
    if let Some(file) = raw.logging.file {
        if !file.is_empty() {
            config.log_file = Some(file);
        }
    }

    config
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(content: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(constants::CONFIG_FILE_NAME), content).unwrap();
        dir
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let (config, warnings) = load_config(dir.path());
        assert_eq!(config, AppConfig::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_valid_values_are_applied() {
        let dir = write_config(
            "[parsing]\nmax_parse_errors = 5\nmax_line_bytes = 4096\n\
             [anonymization]\nplaceholder = \"<anon>\"\n\
             [logging]\nlevel = \"debug\"\nfile = \"loganon.log\"\n",
        );
        let (config, warnings) = load_config(dir.path());
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(config.max_parse_errors, 5);
        assert_eq!(config.max_line_bytes, 4096);
        assert_eq!(config.placeholder, "<anon>");
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.log_file.as_deref(), Some("loganon.log"));
    }

    #[test]
    fn test_out_of_range_values_warn_and_fall_back() {
        let dir = write_config(
            "[parsing]\nmax_line_bytes = 10\n\
             [anonymization]\nplaceholder = \"a\\nb\"\n\
             [logging]\nlevel = \"loud\"\n",
        );
        let (config, warnings) = load_config(dir.path());
        assert_eq!(warnings.len(), 3);
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_unparseable_file_warns() {
        let dir = write_config("[parsing\n");
        let (config, warnings) = load_config(dir.path());
        assert_eq!(config, AppConfig::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Failed to parse"));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let dir = write_config("[ui]\ntheme = \"dark\"\n[parsing]\nmax_parse_errors = 7\n");
        let (config, warnings) = load_config(dir.path());
        assert!(warnings.is_empty());
        assert_eq!(config.max_parse_errors, 7);
    }

    #[test]
    fn test_config_dir_override() {
        let paths = PlatformPaths::with_config_dir("/tmp/x");
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/x/config.toml"));
    }
}
