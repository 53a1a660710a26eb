// loganon - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "loganon";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "loganon";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Format string limits
// =============================================================================

/// Maximum number of columns a format string may declare.
pub const MAX_COLUMNS: usize = 1_024;

/// Maximum accepted length of a format string in bytes.
pub const MAX_FORMAT_STRING_LENGTH: usize = 16 * 1024; // 16 KB

/// Delimiter used when a format string names a single column and therefore
/// never shows one.
pub const DEFAULT_DELIMITER: char = ',';

/// Prefix for positional column names (`col0`, `col1`, ...).
pub const POSITIONAL_COLUMN_PREFIX: &str = "col";

// =============================================================================
// Parsing limits
// =============================================================================

/// Maximum number of skipped-line errors retained per table. Lines beyond
/// this are still skipped and counted, just not kept.
pub const MAX_PARSE_ERRORS_PER_FILE: usize = 1_000;

/// Hard upper bound on the retained parse errors (config cannot exceed it).
pub const ABSOLUTE_MAX_PARSE_ERRORS: usize = 100_000;

/// Maximum size of a single input line in bytes. Longer lines are skipped
/// as malformed rather than buffered without bound.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024; // 1 MB

/// Minimum user-configurable line size limit.
pub const MIN_MAX_LINE_BYTES: usize = 1_024;

/// Maximum user-configurable line size limit.
pub const ABSOLUTE_MAX_LINE_BYTES: usize = 64 * 1024 * 1024; // 64 MB

// =============================================================================
// Anonymization defaults
// =============================================================================

/// Replacement token used by the placeholder removal policy when none is given.
pub const DEFAULT_PLACEHOLDER: &str = "REDACTED";

/// Maximum length of a configured placeholder token, in characters.
pub const MAX_PLACEHOLDER_LENGTH: usize = 256;

/// Mask character used by the prefix bucketing when none is given.
pub const DEFAULT_MASK_CHAR: char = '*';

/// Maximum regex pattern length to prevent ReDoS.
pub const MAX_REGEX_PATTERN_LENGTH: usize = 4_096;

// =============================================================================
// Preview
// =============================================================================

/// Rows shown by `preview` when no limit is given.
pub const DEFAULT_PREVIEW_ROWS: usize = 20;

/// Lines read from the top of a file when suggesting a format string.
/// The first non-blank one is used.
pub const FORMAT_SNIFF_LINES: usize = 16;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Maximum size of a job TOML file in bytes.
pub const MAX_JOB_FILE_SIZE: u64 = 64 * 1024; // 64 KB

/// Suffix of the uniquely named in-progress temp file.
pub const TEMP_FILE_SUFFIX: &str = ".tmp";
