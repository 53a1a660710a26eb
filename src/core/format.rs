// loganon - core/format.rs
//
// Format strings: parsing into an immutable `FormatSpec`, and the
// line-level tokenize/serialize pair built on it.
// Core layer: works on strings only, never touches the filesystem.
//
// Two layouts are understood:
//
//   Delimited    time,node,x,y         labels separated by one delimiter char
//                "src ip";port          labels may be double-quoted
//   Fixed-width  {time:19}{node:6}{msg} `{label:width}` groups, the last one
//                                       may omit the width to take the rest

use crate::core::model::LogRecord;
use crate::util::constants;
use crate::util::error::{FormatError, ParseError, WriteError};
use std::collections::HashSet;

// =============================================================================
// FormatSpec
// =============================================================================

/// How a single column is cut out of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRule {
    /// Bounded by the format's delimiter.
    Delimited,
    /// Exactly `width` characters, right-padded with spaces.
    Fixed { width: usize },
    /// Everything left on the line (final fixed-width column only).
    Rest,
}

/// One named column of a `FormatSpec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    /// Label as written in the format string; empty for positional columns.
    pub label: String,
    pub rule: ColumnRule,
}

/// Overall line layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Delimited { delimiter: u8 },
    FixedWidth,
}

/// Parsed, immutable representation of a format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    source: String,
    layout: Layout,
    columns: Vec<ColumnSpec>,
}

impl FormatSpec {
    /// Parse a format string.
    ///
    /// A string starting with `{` is read as a fixed-width layout; anything
    /// else is read as delimited labels. Unlabelled columns are named
    /// positionally (`col0`, `col1`, ...).
    pub fn parse(format: &str) -> Result<Self, FormatError> {
        if format.len() > constants::MAX_FORMAT_STRING_LENGTH {
            return Err(FormatError::TooLong {
                length: format.len(),
                max: constants::MAX_FORMAT_STRING_LENGTH,
            });
        }

        let trimmed = format.trim_end_matches(['\r', '\n']);
        if trimmed.trim().is_empty() {
            return Err(FormatError::Empty);
        }

        let (layout, raw_columns) = if trimmed.trim_start().starts_with('{') {
            (Layout::FixedWidth, parse_fixed_width(trimmed)?)
        } else {
            let (delimiter, labels) = parse_delimited(trimmed)?;
            let columns = labels
                .into_iter()
                .map(|name| (name, ColumnRule::Delimited))
                .collect();
            (Layout::Delimited { delimiter }, columns)
        };

        if raw_columns.is_empty() {
            return Err(FormatError::Empty);
        }
        if raw_columns.len() > constants::MAX_COLUMNS {
            return Err(FormatError::TooManyColumns {
                count: raw_columns.len(),
                max: constants::MAX_COLUMNS,
            });
        }

        let mut seen = HashSet::with_capacity(raw_columns.len());
        let mut columns = Vec::with_capacity(raw_columns.len());
        for (idx, (label, rule)) in raw_columns.into_iter().enumerate() {
            let name = if label.is_empty() {
                format!("{}{idx}", constants::POSITIONAL_COLUMN_PREFIX)
            } else {
                label.clone()
            };
            if !seen.insert(name.clone()) {
                return Err(FormatError::DuplicateColumn { name });
            }
            columns.push(ColumnSpec { name, label, rule });
        }

        tracing::debug!(
            columns = columns.len(),
            layout = ?layout,
            "Format string parsed"
        );

        Ok(Self {
            source: trimmed.to_string(),
            layout,
            columns,
        })
    }

    /// The format string this spec was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Index of the column called `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Delimiter character, for delimited layouts.
    pub fn delimiter(&self) -> Option<char> {
        match self.layout {
            Layout::Delimited { delimiter } => Some(delimiter as char),
            Layout::FixedWidth => None,
        }
    }

    /// True when `record` is this format's own header: each field equals
    /// its column's label. A positional column matches an empty field (or
    /// its generated name). At least one column must be labelled.
    pub fn is_header(&self, record: &LogRecord) -> bool {
        record.len() == self.columns.len()
            && self.columns.iter().any(|col| !col.label.is_empty())
            && record
                .fields()
                .iter()
                .zip(&self.columns)
                .all(|(field, col)| {
                    let field = field.trim();
                    if col.label.is_empty() {
                        field.is_empty() || field == col.name
                    } else {
                        field == col.label
                    }
                })
    }

    /// Split one line into a record.
    ///
    /// Fails with `ParseError::FieldCount` when the line does not yield
    /// exactly one field per column. The returned error carries line
    /// number 0; callers attach the real number with `ParseError::at_line`.
    pub fn tokenize(&self, line: &str) -> Result<LogRecord, ParseError> {
        match self.layout {
            Layout::Delimited { delimiter } => {
                tokenize_delimited(line, delimiter, self.columns.len())
            }
            Layout::FixedWidth => tokenize_fixed(line, &self.columns),
        }
    }

    /// Render one record as a line (no terminator). Exact inverse of
    /// `tokenize` for values without line breaks.
    pub fn serialize_record(&self, record: &LogRecord) -> Result<String, WriteError> {
        match self.layout {
            Layout::Delimited { delimiter } => serialize_delimited(record, delimiter),
            Layout::FixedWidth => serialize_fixed(record, &self.columns),
        }
    }

    /// The column names rendered in this format's own layout.
    pub fn header_line(&self) -> Result<String, WriteError> {
        let names: LogRecord = self.column_names().into_iter().collect();
        self.serialize_record(&names)
    }
}

/// Suggest a format string from the first line of a file.
///
/// The line itself is the suggestion: a header such as `time,node,x,y`
/// parses straight into a spec with those column names. Returns `None` for
/// a blank line.
pub fn infer_format_string(first_line: &str) -> Option<String> {
    let line = first_line
        .trim_start_matches('\u{feff}')
        .trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

impl std::str::FromStr for FormatSpec {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Free-function form of `FormatSpec::tokenize`.
pub fn tokenize(line: &str, spec: &FormatSpec) -> Result<LogRecord, ParseError> {
    spec.tokenize(line)
}

// =============================================================================
// Format string parsing
// =============================================================================

fn is_label_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Locate the delimiter: the first character outside quotes that is neither
/// a label character nor a space. Falls back to a space when labels are only
/// space-separated, and to the default delimiter for a single label.
fn find_delimiter(format: &str) -> Result<char, FormatError> {
    let mut in_quote: Option<usize> = None;
    let mut saw_inner_space = false;
    let body = format.trim();
    let offset = format.len() - format.trim_start().len();

    for (pos, c) in body.char_indices() {
        if in_quote.is_some() {
            if c == '"' {
                in_quote = None;
            }
            continue;
        }
        match c {
            '"' => in_quote = Some(pos + offset),
            ' ' => saw_inner_space = true,
            c if is_label_char(c) => {}
            c => return Ok(c),
        }
    }

    if let Some(start) = in_quote {
        return Err(FormatError::UnbalancedQuote { position: start });
    }
    Ok(if saw_inner_space {
        ' '
    } else {
        constants::DEFAULT_DELIMITER
    })
}

fn parse_delimited(format: &str) -> Result<(u8, Vec<String>), FormatError> {
    let delimiter = find_delimiter(format)?;
    if !delimiter.is_ascii() || matches!(delimiter, '"' | '\r' | '\n') {
        return Err(FormatError::UnsupportedDelimiter { delimiter });
    }

    // With a space delimiter the string must not be trimmed: leading or
    // trailing spaces denote empty columns.
    let body = if delimiter == ' ' { format } else { format.trim() };
    let mut labels = Vec::new();
    let mut current = String::new();
    let mut chars = body.char_indices().peekable();
    let mut closed_quote = false;

    while let Some((pos, c)) = chars.next() {
        if c == delimiter {
            labels.push(std::mem::take(&mut current).trim().to_string());
            closed_quote = false;
            continue;
        }
        if closed_quote {
            if c == ' ' {
                continue;
            }
            return Err(FormatError::UnbalancedQuote { position: pos });
        }
        if c == '"' && current.trim().is_empty() {
            current.clear();
            let mut terminated = false;
            while let Some((_, q)) = chars.next() {
                if q == '"' {
                    if matches!(chars.peek(), Some((_, '"'))) {
                        chars.next();
                        current.push('"');
                    } else {
                        terminated = true;
                        break;
                    }
                } else {
                    current.push(q);
                }
            }
            if !terminated {
                return Err(FormatError::UnbalancedQuote { position: pos });
            }
            // Quoted labels keep their inner spaces; guard them from trim().
            labels_push_guard(&mut current);
            closed_quote = true;
            continue;
        }
        if is_label_char(c) || c == ' ' {
            current.push(c);
            continue;
        }
        return Err(FormatError::MixedDelimiters {
            expected: delimiter,
            found: c,
            position: pos,
        });
    }
    labels.push(current.trim().to_string());

    let labels = labels.into_iter().map(unguard).collect();
    Ok((delimiter as u8, labels))
}

// Quoted labels may have significant surrounding spaces. They are wrapped in
// NUL markers while the unquoted path trims, then unwrapped.
const QUOTE_GUARD: char = '\0';

fn labels_push_guard(label: &mut String) {
    label.insert(0, QUOTE_GUARD);
    label.push(QUOTE_GUARD);
}

fn unguard(label: String) -> String {
    match label
        .strip_prefix(QUOTE_GUARD)
        .and_then(|l| l.strip_suffix(QUOTE_GUARD))
    {
        Some(inner) => inner.to_string(),
        None => label,
    }
}

fn parse_fixed_width(format: &str) -> Result<Vec<(String, ColumnRule)>, FormatError> {
    let body = format.trim_end();
    let mut columns: Vec<(String, ColumnRule)> = Vec::new();
    let mut pos = body.len() - body.trim_start().len();

    while pos < body.len() {
        let rest = &body[pos..];
        if !rest.starts_with('{') {
            if rest.starts_with('}') {
                return Err(FormatError::UnbalancedBrace { position: pos });
            }
            return Err(FormatError::StrayText { position: pos });
        }
        let close = match rest.find('}') {
            Some(i) => i,
            None => return Err(FormatError::UnbalancedBrace { position: pos }),
        };
        let inner = &rest[1..close];
        if let Some(nested) = inner.find('{') {
            return Err(FormatError::UnbalancedBrace {
                position: pos + 1 + nested,
            });
        }

        if let Some((prev_label, ColumnRule::Rest)) = columns.last() {
            return Err(FormatError::RestNotLast {
                column: prev_label.clone(),
            });
        }

        let column = match inner.rsplit_once(':') {
            Some((label, raw_width)) => {
                let label = label.trim().to_string();
                let raw_width = raw_width.trim();
                match raw_width.parse::<usize>() {
                    Ok(width) if width > 0 => (label, ColumnRule::Fixed { width }),
                    _ => {
                        return Err(FormatError::InvalidWidth {
                            column: label,
                            raw: raw_width.to_string(),
                        })
                    }
                }
            }
            None => (inner.trim().to_string(), ColumnRule::Rest),
        };
        columns.push(column);
        pos += close + 1;
    }

    Ok(columns)
}

// =============================================================================
// Tokenize / serialize
// =============================================================================

fn tokenize_delimited(line: &str, delimiter: u8, expected: usize) -> Result<LogRecord, ParseError> {
    // csv yields no record at all for empty input; a lone empty field is
    // what an empty line means for a one-column spec.
    if line.is_empty() {
        return check_count(LogRecord::new(vec![String::new()]), expected);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    let mut record = csv::StringRecord::new();
    let mut fields: Vec<String> = Vec::with_capacity(expected);
    let mut records = 0usize;
    loop {
        match reader.read_record(&mut record) {
            Ok(true) => {
                records += 1;
                fields.extend(record.iter().map(str::to_string));
            }
            Ok(false) => break,
            Err(e) => {
                return Err(ParseError::Csv {
                    line_number: 0,
                    source: e,
                })
            }
        }
    }

    // Stray terminators inside the line split it into several records;
    // that is never a well-formed row.
    if records > 1 {
        return Err(ParseError::FieldCount {
            line_number: 0,
            expected,
            found: fields.len(),
        });
    }
    check_count(LogRecord::new(fields), expected)
}

fn check_count(record: LogRecord, expected: usize) -> Result<LogRecord, ParseError> {
    if record.len() == expected {
        Ok(record)
    } else {
        Err(ParseError::FieldCount {
            line_number: 0,
            expected,
            found: record.len(),
        })
    }
}

fn tokenize_fixed(line: &str, columns: &[ColumnSpec]) -> Result<LogRecord, ParseError> {
    let mut rest = line;
    let mut fields = Vec::with_capacity(columns.len());
    let last = columns.len() - 1;

    for (idx, column) in columns.iter().enumerate() {
        match column.rule {
            ColumnRule::Fixed { width } => {
                let split = rest
                    .char_indices()
                    .nth(width)
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len());
                let (value, remainder) = rest.split_at(split);
                // Only the final column may be cut short (trailing padding
                // is commonly stripped by editors).
                if idx != last && value.chars().count() < width {
                    let found = if value.is_empty() { idx } else { idx + 1 };
                    return Err(ParseError::FieldCount {
                        line_number: 0,
                        expected: columns.len(),
                        found,
                    });
                }
                fields.push(value.trim_end_matches(' ').to_string());
                rest = remainder;
            }
            ColumnRule::Rest | ColumnRule::Delimited => {
                fields.push(rest.to_string());
                rest = "";
            }
        }
    }

    if !rest.is_empty() {
        return Err(ParseError::FieldCount {
            line_number: 0,
            expected: columns.len(),
            found: columns.len() + 1,
        });
    }
    Ok(LogRecord::new(fields))
}

fn serialize_delimited(record: &LogRecord, delimiter: u8) -> Result<String, WriteError> {
    // A lone empty field is quoted so the row is not an empty line.
    if record.len() == 1 && record.get(0) == Some("") {
        return Ok("\"\"".to_string());
    }
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(record.fields())
        .map_err(|e| WriteError::Csv { source: e })?;
    let mut bytes = writer.into_inner().map_err(|e| WriteError::Csv {
        source: csv::Error::from(std::io::Error::new(e.error().kind(), e.error().to_string())),
    })?;

    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn serialize_fixed(record: &LogRecord, columns: &[ColumnSpec]) -> Result<String, WriteError> {
    let mut line = String::new();
    for (value, column) in record.fields().iter().zip(columns) {
        match column.rule {
            ColumnRule::Fixed { width } => {
                let length = value.chars().count();
                if length > width {
                    return Err(WriteError::FieldTooWide {
                        column: column.name.clone(),
                        width,
                        length,
                    });
                }
                line.push_str(value);
                line.extend(std::iter::repeat(' ').take(width - length));
            }
            ColumnRule::Rest | ColumnRule::Delimited => line.push_str(value),
        }
    }
    Ok(line)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[&str]) -> LogRecord {
        fields.iter().copied().collect()
    }

    #[test]
    fn test_parse_comma_labels() {
        let spec = FormatSpec::parse("a,b,c").unwrap();
        assert_eq!(spec.column_names(), vec!["a", "b", "c"]);
        assert_eq!(spec.delimiter(), Some(','));
        assert_eq!(spec.layout(), Layout::Delimited { delimiter: b',' });
    }

    #[test]
    fn test_parse_other_delimiters() {
        assert_eq!(FormatSpec::parse("time;node;x").unwrap().delimiter(), Some(';'));
        assert_eq!(FormatSpec::parse("time\tnode").unwrap().delimiter(), Some('\t'));
        assert_eq!(FormatSpec::parse("time node x").unwrap().delimiter(), Some(' '));
        assert_eq!(
            FormatSpec::parse("time node x").unwrap().column_names(),
            vec!["time", "node", "x"]
        );
    }

    #[test]
    fn test_parse_trims_spaces_around_labels() {
        let spec = FormatSpec::parse(" src ip , dst ,port\n").unwrap();
        assert_eq!(spec.column_names(), vec!["src ip", "dst", "port"]);
    }

    #[test]
    fn test_parse_single_column_uses_default_delimiter() {
        let spec = FormatSpec::parse("message").unwrap();
        assert_eq!(spec.column_count(), 1);
        assert_eq!(spec.delimiter(), Some(constants::DEFAULT_DELIMITER));
    }

    #[test]
    fn test_parse_positional_names_for_unlabelled_columns() {
        let spec = FormatSpec::parse("a,,c,").unwrap();
        assert_eq!(spec.column_names(), vec!["a", "col1", "c", "col3"]);
    }

    #[test]
    fn test_parse_quoted_labels() {
        let spec = FormatSpec::parse(r#""x,y";"say ""hi""";z"#).unwrap();
        assert_eq!(spec.delimiter(), Some(';'));
        assert_eq!(spec.column_names(), vec!["x,y", "say \"hi\"", "z"]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(FormatSpec::parse(""), Err(FormatError::Empty));
        assert_eq!(FormatSpec::parse("   \n"), Err(FormatError::Empty));
        assert!(matches!(
            FormatSpec::parse(r#""open,b"#),
            Err(FormatError::UnbalancedQuote { .. })
        ));
        assert!(matches!(
            FormatSpec::parse("a,b;c"),
            Err(FormatError::MixedDelimiters {
                expected: ',',
                found: ';',
                ..
            })
        ));
        assert!(matches!(
            FormatSpec::parse("a→b"),
            Err(FormatError::UnsupportedDelimiter { delimiter: '→' })
        ));
        assert!(matches!(
            FormatSpec::parse("a,b,a"),
            Err(FormatError::DuplicateColumn { .. })
        ));
    }

    #[test]
    fn test_parse_too_many_columns() {
        let format = vec!["c"; constants::MAX_COLUMNS + 1]
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{c}{i}"))
            .collect::<Vec<_>>()
            .join(",");
        assert!(matches!(
            FormatSpec::parse(&format),
            Err(FormatError::TooManyColumns { .. })
        ));
    }

    #[test]
    fn test_parse_fixed_width() {
        let spec = FormatSpec::parse("{time:8}{node:4}{msg}").unwrap();
        assert_eq!(spec.layout(), Layout::FixedWidth);
        assert_eq!(spec.column_names(), vec!["time", "node", "msg"]);
        assert_eq!(spec.columns()[0].rule, ColumnRule::Fixed { width: 8 });
        assert_eq!(spec.columns()[2].rule, ColumnRule::Rest);
        assert_eq!(spec.delimiter(), None);
    }

    #[test]
    fn test_parse_fixed_width_errors() {
        assert!(matches!(
            FormatSpec::parse("{time:8}{node:4"),
            Err(FormatError::UnbalancedBrace { .. })
        ));
        assert!(matches!(
            FormatSpec::parse("{time:8}}"),
            Err(FormatError::UnbalancedBrace { .. })
        ));
        assert!(matches!(
            FormatSpec::parse("{time:zero}"),
            Err(FormatError::InvalidWidth { .. })
        ));
        assert!(matches!(
            FormatSpec::parse("{time:0}"),
            Err(FormatError::InvalidWidth { .. })
        ));
        assert!(matches!(
            FormatSpec::parse("{msg}{time:8}"),
            Err(FormatError::RestNotLast { .. })
        ));
        assert!(matches!(
            FormatSpec::parse("{time:8} x"),
            Err(FormatError::StrayText { .. })
        ));
    }

    #[test]
    fn test_tokenize_delimited() {
        let spec = FormatSpec::parse("a,b,c").unwrap();
        assert_eq!(spec.tokenize("1,2,3").unwrap(), record(&["1", "2", "3"]));
        assert_eq!(spec.tokenize("1,,").unwrap(), record(&["1", "", ""]));
        assert_eq!(
            spec.tokenize(r#""x,y","say ""hi""",z"#).unwrap(),
            record(&["x,y", "say \"hi\"", "z"])
        );
    }

    #[test]
    fn test_tokenize_field_count_mismatch() {
        let spec = FormatSpec::parse("a,b,c").unwrap();
        match spec.tokenize("1,2") {
            Err(ParseError::FieldCount {
                expected, found, ..
            }) => {
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("Expected FieldCount, got: {other:?}"),
        }
        assert!(spec.tokenize("1,2,3,4").is_err());
    }

    #[test]
    fn test_tokenize_single_column_empty_line() {
        let spec = FormatSpec::parse("message").unwrap();
        assert_eq!(spec.tokenize("").unwrap(), record(&[""]));
    }

    #[test]
    fn test_tokenize_fixed_width() {
        let spec = FormatSpec::parse("{time:5}{node:3}{msg}").unwrap();
        assert_eq!(
            spec.tokenize("12:00n1 hello world").unwrap(),
            record(&["12:00", "n1", "hello world"])
        );
        assert!(matches!(
            spec.tokenize("12:0"),
            Err(ParseError::FieldCount { found: 1, .. })
        ));
    }

    #[test]
    fn test_tokenize_fixed_width_last_column_may_be_short() {
        let spec = FormatSpec::parse("{a:3}{b:4}").unwrap();
        assert_eq!(spec.tokenize("xy z").unwrap(), record(&["xy", "z"]));
        assert!(matches!(
            spec.tokenize("abcdefgh"),
            Err(ParseError::FieldCount { found: 3, .. })
        ));
    }

    #[test]
    fn test_serialize_round_trip_delimited() {
        let spec = FormatSpec::parse("a;b;c").unwrap();
        let records = [
            record(&["1", "2", "3"]),
            record(&["", "", ""]),
            record(&["semi;colon", "quote\"d", " padded "]),
            record(&["new\nline", "x", "y"]),
        ];
        for original in records {
            let line = spec.serialize_record(&original).unwrap();
            assert_eq!(spec.tokenize(&line).unwrap(), original, "line: {line:?}");
        }
    }

    #[test]
    fn test_serialize_round_trip_single_empty_field() {
        let spec = FormatSpec::parse("only").unwrap();
        let original = record(&[""]);
        let line = spec.serialize_record(&original).unwrap();
        assert_eq!(line, "\"\"");
        assert_eq!(spec.tokenize(&line).unwrap(), original);
    }

    #[test]
    fn test_serialize_round_trip_fixed_width() {
        let spec = FormatSpec::parse("{a:4}{b:2}{rest}").unwrap();
        let original = record(&["ab", "c", "tail  text"]);
        let line = spec.serialize_record(&original).unwrap();
        assert_eq!(line, "ab  c tail  text");
        assert_eq!(spec.tokenize(&line).unwrap(), original);
    }

    #[test]
    fn test_serialize_fixed_width_overflow() {
        let spec = FormatSpec::parse("{a:2}{b:2}").unwrap();
        assert!(matches!(
            spec.serialize_record(&record(&["abc", "d"])),
            Err(WriteError::FieldTooWide { width: 2, length: 3, .. })
        ));
    }

    #[test]
    fn test_is_header() {
        let spec = FormatSpec::parse("a,b,c").unwrap();
        assert!(spec.is_header(&spec.tokenize("a,b,c").unwrap()));
        assert!(!spec.is_header(&spec.tokenize("1,2,3").unwrap()));
    }

    #[test]
    fn test_is_header_with_unlabelled_column() {
        let spec = FormatSpec::parse("time,,x").unwrap();
        assert_eq!(spec.columns()[1].label, "");
        assert_eq!(spec.columns()[1].name, "col1");
        assert!(spec.is_header(&spec.tokenize("time,,x").unwrap()));
        assert!(spec.is_header(&spec.tokenize("time,col1,x").unwrap()));
        assert!(!spec.is_header(&spec.tokenize("1,,2").unwrap()));

        let fixed = FormatSpec::parse("{ts:4}{:3}{msg}").unwrap();
        assert!(fixed.is_header(&fixed.tokenize("ts     msg").unwrap()));
    }

    #[test]
    fn test_is_header_needs_a_labelled_column() {
        let spec = FormatSpec::parse(",,").unwrap();
        assert!(!spec.is_header(&spec.tokenize(",,").unwrap()));
    }

    #[test]
    fn test_header_line() {
        let spec = FormatSpec::parse("time; \"src ip\" ;port").unwrap();
        assert_eq!(spec.header_line().unwrap(), "time;src ip;port");

        let fixed = FormatSpec::parse("{ts:4}{msg}").unwrap();
        assert_eq!(fixed.header_line().unwrap(), "ts  msg");
    }

    #[test]
    fn test_infer_format_string() {
        assert_eq!(
            infer_format_string("\u{feff}time,node,x\r\n").as_deref(),
            Some("time,node,x")
        );
        assert_eq!(infer_format_string("   \n"), None);
        let inferred = infer_format_string("a;b").unwrap();
        assert_eq!(FormatSpec::parse(&inferred).unwrap().column_count(), 2);
    }
}
