// loganon - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no
// platform dependencies.
//
// These types are the shared vocabulary across all layers.

use serde::Serialize;
use std::path::PathBuf;

// =============================================================================
// Log Record (one parsed line)
// =============================================================================

/// The field values of a single parsed log line, in column order.
///
/// A record inside a `LogTable` always has exactly as many fields as the
/// table's `FormatSpec` has columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(transparent)]
pub struct LogRecord {
    fields: Vec<String>,
}

impl LogRecord {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// All field values in column order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Value at `column`, or `None` if out of range.
    pub fn get(&self, column: usize) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    pub(crate) fn get_mut(&mut self, column: usize) -> Option<&mut String> {
        self.fields.get_mut(column)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for LogRecord {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(Into::into).collect(),
        }
    }
}

// =============================================================================
// Run Summary
// =============================================================================

/// Completion status of one pipeline run, returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Records parsed from the input (after skipping malformed lines).
    pub rows_read: usize,

    /// Records written to the output.
    pub rows_processed: usize,

    /// Records deleted by the anonymization method.
    pub rows_removed: usize,

    /// Malformed input lines that were skipped.
    pub rows_skipped: usize,

    /// Where the output was written.
    pub output: PathBuf,
}
