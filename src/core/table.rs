// loganon - core/table.rs
//
// In-memory table of parsed log records backing the interactive view and
// the anonymization strategies.
// Core layer: reads from any BufRead, never opens files itself.
//
// Rows carry a stable id (their position at load time). Positions shift
// as rows are removed; ids never do, which is what makes repeated
// removal of the same ids a no-op.

use crate::core::format::FormatSpec;
use crate::core::model::LogRecord;
use crate::util::constants;
use crate::util::error::{AnonymizeError, ParseError, WriteError};
use std::collections::HashSet;
use std::io::{self, BufRead};
use std::sync::Arc;

/// Stable identity of a row within one loaded table.
pub type RowId = usize;

/// Limits applied while loading a table.
#[derive(Debug, Clone)]
pub struct ParseConfig {
    pub max_parse_errors: usize,
    pub max_line_bytes: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_parse_errors: constants::MAX_PARSE_ERRORS_PER_FILE,
            max_line_bytes: constants::DEFAULT_MAX_LINE_BYTES,
        }
    }
}

/// Ordered parsed records plus the format that produced them.
///
/// Invariant: every record has exactly `spec.column_count()` fields, and
/// `row_ids` is parallel to `records` and strictly increasing.
#[derive(Debug)]
pub struct LogTable {
    spec: Arc<FormatSpec>,
    header: Option<String>,
    records: Vec<LogRecord>,
    row_ids: Vec<RowId>,
    skipped: usize,
    parse_errors: Vec<ParseError>,
    version: u64,
}

impl PartialEq for LogTable {
    fn eq(&self, other: &Self) -> bool {
        self.spec == other.spec
            && self.header == other.header
            && self.records == other.records
            && self.row_ids == other.row_ids
    }
}

impl LogTable {
    /// Empty table for `spec`.
    pub fn new(spec: Arc<FormatSpec>) -> Self {
        Self {
            spec,
            header: None,
            records: Vec::new(),
            row_ids: Vec::new(),
            skipped: 0,
            parse_errors: Vec::new(),
            version: 0,
        }
    }

    /// Build a table from records already in memory.
    ///
    /// Fails with `ParseError::FieldCount` (line number = 1-based record
    /// position) on the first record whose width does not match the format.
    pub fn from_records(
        spec: Arc<FormatSpec>,
        records: Vec<LogRecord>,
    ) -> Result<Self, ParseError> {
        let expected = spec.column_count();
        if let Some((idx, bad)) = records
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != expected)
        {
            return Err(ParseError::FieldCount {
                line_number: idx as u64 + 1,
                expected,
                found: bad.len(),
            });
        }
        let mut table = Self::new(spec);
        table.row_ids = (0..records.len()).collect();
        table.records = records;
        Ok(table)
    }

    /// Read `reader` line by line, tokenizing each line with `spec`.
    ///
    /// - A first non-blank line equal to the format's column names is kept as
    ///   the header rather than as a record.
    /// - Empty lines are ignored, as are whitespace-only lines that do not
    ///   tokenize.
    /// - Lines that do not tokenize (wrong field count, too long) are
    ///   skipped and counted; their errors are retained up to
    ///   `config.max_parse_errors`.
    ///
    /// Invalid UTF-8 is replaced lossily. Only read failures are errors.
    pub fn load<R: BufRead>(
        mut reader: R,
        spec: Arc<FormatSpec>,
        config: &ParseConfig,
    ) -> io::Result<Self> {
        let mut table = Self::new(spec);
        let mut buf = Vec::new();
        let mut line_number: u64 = 0;
        let mut first_content_line = true;

        while let Some(total) = read_line_bounded(&mut reader, &mut buf, config.max_line_bytes)? {
            line_number += 1;

            if total > config.max_line_bytes {
                table.note_skipped(
                    ParseError::LineTooLong {
                        line_number,
                        length: total,
                        max: config.max_line_bytes,
                    },
                    config,
                );
                first_content_line = false;
                continue;
            }

            let line = String::from_utf8_lossy(&buf);
            if line.is_empty() {
                continue;
            }
            // Whitespace-only lines are rows when they tokenize (blank
            // fixed-width rows, one-column rows); otherwise they are ignored.
            let whitespace_only = line.trim().is_empty();

            match table.spec.tokenize(&line) {
                Ok(record) => {
                    if first_content_line && table.spec.is_header(&record) {
                        table.header = Some(line.into_owned());
                    } else {
                        table.row_ids.push(table.records.len() + table.skipped);
                        table.records.push(record);
                    }
                }
                Err(_) if whitespace_only => continue,
                Err(e) => table.note_skipped(e.at_line(line_number), config),
            }
            first_content_line = false;
        }

        tracing::debug!(
            lines = line_number,
            rows = table.records.len(),
            skipped = table.skipped,
            header = table.header.is_some(),
            "Table loaded"
        );

        Ok(table)
    }

    fn note_skipped(&mut self, error: ParseError, config: &ParseConfig) {
        self.skipped += 1;
        if self.parse_errors.len() < config.max_parse_errors {
            tracing::debug!(error = %error, "Skipping malformed line");
            self.parse_errors.push(error);
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn spec(&self) -> &Arc<FormatSpec> {
        &self.spec
    }

    /// Column names, in order.
    pub fn columns(&self) -> Vec<&str> {
        self.spec.column_names()
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Stable row ids, parallel to `records()`.
    pub fn row_ids(&self) -> &[RowId] {
        &self.row_ids
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Header line consumed at load, if any. Re-emitted by `serialize`.
    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    pub fn had_header(&self) -> bool {
        self.header.is_some()
    }

    /// Number of malformed lines skipped while loading.
    pub fn skipped_lines(&self) -> usize {
        self.skipped
    }

    /// Errors for skipped lines (capped; see `ParseConfig`).
    pub fn parse_errors(&self) -> &[ParseError] {
        &self.parse_errors
    }

    /// Mutation counter; bumped by every change to the rows.
    pub fn version(&self) -> u64 {
        self.version
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Remove the rows with the given stable ids.
    ///
    /// Unknown or already-removed ids are ignored, so repeating a call is a
    /// no-op. Survivors keep their relative order. Runs in linear time in
    /// the table size. Returns the number of rows removed.
    pub fn remove_rows(&mut self, ids: impl IntoIterator<Item = RowId>) -> usize {
        let doomed: HashSet<RowId> = ids.into_iter().collect();
        if doomed.is_empty() {
            return 0;
        }
        let mut drop_mask = Vec::with_capacity(self.row_ids.len());
        drop_mask.extend(self.row_ids.iter().map(|id| doomed.contains(id)));
        self.compact(&drop_mask)
    }

    /// Remove the rows currently at `positions` (e.g. a view selection).
    ///
    /// Out-of-range positions are ignored. Returns the number removed.
    pub fn remove_positions(&mut self, positions: impl IntoIterator<Item = usize>) -> usize {
        let len = self.records.len();
        let mut drop_mask = vec![false; len];
        for pos in positions {
            if pos < len {
                drop_mask[pos] = true;
            }
        }
        self.compact(&drop_mask)
    }

    /// Keep only the rows for which `keep` returns true, in order.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&LogRecord) -> bool,
    {
        let drop_mask: Vec<bool> = self.records.iter().map(|r| !keep(r)).collect();
        self.compact(&drop_mask)
    }

    // Mark-and-compact: a single pass over both parallel vectors.
    fn compact(&mut self, drop_mask: &[bool]) -> usize {
        let removed = drop_mask.iter().filter(|d| **d).count();
        if removed == 0 {
            return 0;
        }

        let mut idx = 0;
        self.records.retain(|_| {
            let keep = !drop_mask[idx];
            idx += 1;
            keep
        });
        let mut idx = 0;
        self.row_ids.retain(|_| {
            let keep = !drop_mask[idx];
            idx += 1;
            keep
        });

        self.version += 1;
        tracing::debug!(removed, remaining = self.records.len(), "Rows removed");
        removed
    }

    /// Overwrite one cell. Values containing line breaks are rejected.
    pub fn set_value(
        &mut self,
        row: usize,
        column: usize,
        value: impl Into<String>,
    ) -> Result<(), AnonymizeError> {
        let value = value.into();
        if value.contains(['\n', '\r']) {
            return Err(AnonymizeError::InvalidValue {
                row,
                column,
                reason: "value must not contain line breaks",
            });
        }
        let len = self.records.len();
        let record = self
            .records
            .get_mut(row)
            .ok_or(AnonymizeError::RowNotFound { row, len })?;
        let cell = record
            .get_mut(column)
            .ok_or_else(|| AnonymizeError::ColumnNotFound {
                column: column.to_string(),
            })?;
        *cell = value;
        self.version += 1;
        Ok(())
    }

    /// Rewrite every value of `column` in place with `f`, returning how many
    /// values actually changed.
    pub(crate) fn map_column<F>(&mut self, column: usize, mut f: F) -> usize
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut changed = 0;
        for record in &mut self.records {
            if let Some(cell) = record.get_mut(column) {
                if let Some(replacement) = f(cell) {
                    if *cell != replacement {
                        *cell = replacement;
                        changed += 1;
                    }
                }
            }
        }
        if changed > 0 {
            self.version += 1;
        }
        changed
    }

    // -------------------------------------------------------------------------
    // Output
    // -------------------------------------------------------------------------

    /// Render the table as lines using `spec`, header first when the input
    /// had one.
    pub fn serialize(&self, spec: &FormatSpec) -> Result<Vec<String>, WriteError> {
        let mut lines = Vec::with_capacity(self.records.len() + 1);
        if let Some(header) = &self.header {
            lines.push(header.clone());
        }
        for record in &self.records {
            lines.push(spec.serialize_record(record)?);
        }
        Ok(lines)
    }
}

/// Read one `\n`-terminated line into `buf`, keeping at most `max` bytes.
///
/// Returns the full length of the line excluding the `\n` or `\r\n`
/// terminator, which is larger than `buf.len()` when the line was cut, or
/// `None` at end of input.
fn read_line_bounded<R: BufRead>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max: usize,
) -> io::Result<Option<usize>> {
    buf.clear();
    let mut total = 0usize;
    let mut saw_any = false;
    let mut last_byte = None;

    loop {
        let available = match reader.fill_buf() {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            return Ok(saw_any.then(|| strip_cr(buf, total, last_byte)));
        }
        saw_any = true;

        let (line_part, used, done) = match available.iter().position(|&b| b == b'\n') {
            Some(i) => (&available[..i], i + 1, true),
            None => (available, available.len(), false),
        };
        let room = max.saturating_sub(buf.len());
        buf.extend_from_slice(&line_part[..line_part.len().min(room)]);
        total += line_part.len();
        if let Some(&b) = line_part.last() {
            last_byte = Some(b);
        }
        reader.consume(used);

        if done {
            return Ok(Some(strip_cr(buf, total, last_byte)));
        }
    }
}

fn strip_cr(buf: &mut Vec<u8>, total: usize, last_byte: Option<u8>) -> usize {
    if last_byte != Some(b'\r') {
        return total;
    }
    let total = total - 1;
    buf.truncate(total);
    total
}

// =============================================================================
// Tests
// =============================================================================
