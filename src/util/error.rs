// loganon - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation; every error keeps its causal chain
// for diagnostic logging.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all loganon operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum LogAnonError {
    /// The format string could not be tokenized.
    Format(FormatError),

    /// A log line could not be parsed. Normally recovered by skipping the
    /// line; surfaced only by APIs that parse a single line.
    Parse(ParseError),

    /// The anonymization request is invalid.
    Anonymize(AnonymizeError),

    /// The transformed table could not be serialised or written.
    Write(WriteError),

    /// Configuration or job file loading failed.
    Config(ConfigError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },

    /// Input and output resolve to the same file.
    SameInputOutput { path: PathBuf },
}

impl fmt::Display for LogAnonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format(e) => write!(f, "Format error: {e}"),
            Self::Parse(e) => write!(f, "Parse error: {e}"),
            Self::Anonymize(e) => write!(f, "Anonymization error: {e}"),
            Self::Write(e) => write!(f, "Write error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
            Self::SameInputOutput { path } => write!(
                f,
                "Input and output are the same file '{}'; refusing to overwrite the source",
                path.display()
            ),
        }
    }
}

impl std::error::Error for LogAnonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Format(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::Anonymize(e) => Some(e),
            Self::Write(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io { source, .. } => Some(source),
            Self::SameInputOutput { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Format errors
// ---------------------------------------------------------------------------

/// Errors raised while parsing a format string into a `FormatSpec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The format string declares no columns.
    Empty,

    /// The format string exceeds the maximum accepted length.
    TooLong { length: usize, max: usize },

    /// A quoted label was never closed.
    UnbalancedQuote { position: usize },

    /// A `{label:width}` group was never closed, or a `}` has no `{`.
    UnbalancedBrace { position: usize },

    /// Two different delimiter characters separate the labels.
    MixedDelimiters { expected: char, found: char, position: usize },

    /// The delimiter cannot be used for splitting lines.
    UnsupportedDelimiter { delimiter: char },

    /// A fixed-width group has a missing, zero, or non-numeric width.
    InvalidWidth { column: String, raw: String },

    /// A width-less (rest-of-line) group that is not the final group.
    RestNotLast { column: String },

    /// Fixed-width groups were mixed with free text outside braces.
    StrayText { position: usize },

    /// The same label appears twice.
    DuplicateColumn { name: String },

    /// More columns than the configured limit.
    TooManyColumns { count: usize, max: usize },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "format string declares no columns"),
            Self::TooLong { length, max } => {
                write!(f, "format string is {length} bytes, exceeds maximum of {max}")
            }
            Self::UnbalancedQuote { position } => {
                write!(f, "unterminated quote starting at position {position}")
            }
            Self::UnbalancedBrace { position } => {
                write!(f, "unbalanced brace at position {position}")
            }
            Self::MixedDelimiters {
                expected,
                found,
                position,
            } => write!(
                f,
                "mixed delimiters: expected {expected:?} but found {found:?} at position {position}"
            ),
            Self::UnsupportedDelimiter { delimiter } => write!(
                f,
                "delimiter {delimiter:?} is not supported (must be a single ASCII character \
                 other than a quote or line break)"
            ),
            Self::InvalidWidth { column, raw } => {
                write!(f, "column '{column}' has invalid width '{raw}'")
            }
            Self::RestNotLast { column } => write!(
                f,
                "column '{column}' has no width but is not the last column"
            ),
            Self::StrayText { position } => write!(
                f,
                "text outside a {{label:width}} group at position {position}"
            ),
            Self::DuplicateColumn { name } => write!(f, "duplicate column name '{name}'"),
            Self::TooManyColumns { count, max } => {
                write!(f, "format declares {count} columns, maximum is {max}")
            }
        }
    }
}

impl std::error::Error for FormatError {}

impl From<FormatError> for LogAnonError {
    fn from(e: FormatError) -> Self {
        Self::Format(e)
    }
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

/// Errors related to tokenizing a single log line.
#[derive(Debug)]
pub enum ParseError {
    /// The line's field count does not match the format's column count.
    FieldCount {
        line_number: u64,
        expected: usize,
        found: usize,
    },

    /// The line exceeds the configured maximum line size.
    LineTooLong {
        line_number: u64,
        length: usize,
        max: usize,
    },

    /// The csv reader rejected the line.
    Csv { line_number: u64, source: csv::Error },
}

impl ParseError {
    /// Line number (1-based) the error refers to; 0 when tokenizing a
    /// standalone line.
    pub fn line_number(&self) -> u64 {
        match self {
            Self::FieldCount { line_number, .. }
            | Self::LineTooLong { line_number, .. }
            | Self::Csv { line_number, .. } => *line_number,
        }
    }

    /// Return the same error re-attributed to `line_number`.
    pub fn at_line(self, line_number: u64) -> Self {
        match self {
            Self::FieldCount {
                expected, found, ..
            } => Self::FieldCount {
                line_number,
                expected,
                found,
            },
            Self::LineTooLong { length, max, .. } => Self::LineTooLong {
                line_number,
                length,
                max,
            },
            Self::Csv { source, .. } => Self::Csv {
                line_number,
                source,
            },
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldCount {
                line_number,
                expected,
                found,
            } => write!(
                f,
                "line {line_number}: expected {expected} fields, found {found}"
            ),
            Self::LineTooLong {
                line_number,
                length,
                max,
            } => write!(
                f,
                "line {line_number}: {length} bytes exceeds maximum of {max}"
            ),
            Self::Csv {
                line_number,
                source,
            } => write!(f, "line {line_number}: {source}"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Csv { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ParseError> for LogAnonError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

// ---------------------------------------------------------------------------
// Anonymize errors
// ---------------------------------------------------------------------------

/// Errors related to an anonymization request or a table edit.
#[derive(Debug)]
pub enum AnonymizeError {
    /// No strategy is registered for the requested method.
    UnsupportedMethod { name: String },

    /// A column index is out of range or a column name is unknown.
    ColumnNotFound { column: String },

    /// A row index is out of range.
    RowNotFound { row: usize, len: usize },

    /// An edited cell value cannot be written back as a single line.
    InvalidValue {
        row: usize,
        column: usize,
        reason: &'static str,
    },

    /// The request targets no columns.
    NoColumns,

    /// A method parameter is out of range or inconsistent.
    InvalidParameters {
        method: &'static str,
        reason: String,
    },

    /// A removal pattern failed to compile.
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

impl fmt::Display for AnonymizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedMethod { name } => {
                write!(f, "no anonymization method registered for '{name}'")
            }
            Self::ColumnNotFound { column } => write!(f, "column '{column}' not found"),
            Self::RowNotFound { row, len } => {
                write!(f, "row {row} out of range (table has {len} rows)")
            }
            Self::InvalidValue {
                row,
                column,
                reason,
            } => write!(f, "invalid value for row {row}, column {column}: {reason}"),
            Self::NoColumns => write!(f, "no target columns selected"),
            Self::InvalidParameters { method, reason } => {
                write!(f, "invalid parameters for {method}: {reason}")
            }
            Self::InvalidPattern { pattern, source } => {
                write!(f, "invalid removal pattern '{pattern}': {source}")
            }
        }
    }
}

impl std::error::Error for AnonymizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidPattern { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<AnonymizeError> for LogAnonError {
    fn from(e: AnonymizeError) -> Self {
        Self::Anonymize(e)
    }
}

// ---------------------------------------------------------------------------
// Write errors
// ---------------------------------------------------------------------------

/// Errors related to serialising and writing the output file.
#[derive(Debug)]
pub enum WriteError {
    /// A value does not fit its fixed-width column.
    FieldTooWide {
        column: String,
        width: usize,
        length: usize,
    },

    /// CSV serialisation error.
    Csv { source: csv::Error },

    /// I/O error writing the output file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldTooWide {
                column,
                width,
                length,
            } => write!(
                f,
                "value of {length} chars does not fit column '{column}' (width {width})"
            ),
            Self::Csv { source } => write!(f, "CSV serialisation error: {source}"),
            Self::Io { path, source } => {
                write!(f, "output I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Csv { source } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<WriteError> for LogAnonError {
    fn from(e: WriteError) -> Self {
        Self::Write(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration and job file loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A required field is missing or empty.
    MissingField { path: PathBuf, field: &'static str },

    /// The file exceeds the maximum allowed size.
    FileTooLarge { path: PathBuf, size: u64, max_size: u64 },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::MissingField { path, field } => {
                write!(f, "'{}': missing required field '{field}'", path.display())
            }
            Self::FileTooLarge {
                path,
                size,
                max_size,
            } => write!(
                f,
                "'{}' is {size} bytes, exceeds maximum of {max_size} bytes",
                path.display()
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for LogAnonError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for loganon results.
pub type Result<T> = std::result::Result<T, LogAnonError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_io_error_keeps_source_chain() {
        let err = LogAnonError::Io {
            path: PathBuf::from("in.log"),
            operation: "open",
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("open"));
        assert!(err.to_string().contains("in.log"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_parse_error_at_line_relabels() {
        let err = ParseError::FieldCount {
            line_number: 0,
            expected: 3,
            found: 2,
        }
        .at_line(7);
        assert_eq!(err.line_number(), 7);
        assert_eq!(err.to_string(), "line 7: expected 3 fields, found 2");
    }

    #[test]
    fn test_anonymize_error_wraps_into_top_level() {
        let err: LogAnonError = AnonymizeError::ColumnNotFound {
            column: "9".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            LogAnonError::Anonymize(AnonymizeError::ColumnNotFound { .. })
        ));
        assert!(err.to_string().starts_with("Anonymization error"));
    }
}
