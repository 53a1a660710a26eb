// loganon - app/pipeline.rs
//
// Load -> anonymize -> save, as one synchronous operation.
//
// Everything that can be checked without touching the disk (format string,
// column names, method parameters, input/output clash) is checked first,
// so a bad request fails before any file is read or written.

use crate::app::writer;
use crate::core::anonymize::{
    build_strategy, AnonymityMethod, AnonymityStrategy, ColumnSelector, MethodParams,
};
use crate::core::format::{self, FormatSpec};
use crate::core::model::RunSummary;
use crate::core::table::{LogTable, ParseConfig};
use crate::platform::config::AppConfig;
use crate::platform::fs;
use crate::util::constants;
use crate::util::error::{LogAnonError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything needed for one anonymization run.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub input: PathBuf,
    pub format: String,
    pub output: PathBuf,
    pub method: AnonymityMethod,
    pub params: MethodParams,
    pub columns: ColumnSelector,
    pub parse: ParseConfig,
}

impl PipelineRequest {
    /// Request with default parsing limits.
    pub fn new(
        input: impl Into<PathBuf>,
        format: impl Into<String>,
        output: impl Into<PathBuf>,
        params: MethodParams,
        columns: ColumnSelector,
    ) -> Self {
        Self {
            input: input.into(),
            format: format.into(),
            output: output.into(),
            method: params.method(),
            params,
            columns,
            parse: ParseConfig::default(),
        }
    }

    pub fn with_parse_config(mut self, parse: ParseConfig) -> Self {
        self.parse = parse;
        self
    }
}

impl From<&AppConfig> for ParseConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_parse_errors: config.max_parse_errors,
            max_line_bytes: config.max_line_bytes,
        }
    }
}

/// Parse `format` into a shareable spec.
pub fn parse_format(format: &str) -> Result<Arc<FormatSpec>> {
    Ok(Arc::new(FormatSpec::parse(format)?))
}

/// Suggest a format string for `path`: its first non-blank line.
///
/// Returns `None` when the top of the file is blank.
pub fn suggest_format(path: &Path) -> Result<Option<String>> {
    let lines = fs::read_first_lines(path, constants::FORMAT_SNIFF_LINES).map_err(|source| {
        LogAnonError::Io {
            path: path.to_path_buf(),
            operation: "read",
            source,
        }
    })?;
    let suggestion = lines.iter().find_map(|l| format::infer_format_string(l));
    tracing::debug!(
        path = %path.display(),
        found = suggestion.is_some(),
        "Format suggestion"
    );
    Ok(suggestion)
}

/// Load `path` into a table using `spec`.
pub fn load_with_spec(path: &Path, spec: Arc<FormatSpec>, config: &ParseConfig) -> Result<LogTable> {
    let reader = fs::open_input(path).map_err(|source| LogAnonError::Io {
        path: path.to_path_buf(),
        operation: "open",
        source,
    })?;
    let table = LogTable::load(reader, spec, config).map_err(|source| LogAnonError::Io {
        path: path.to_path_buf(),
        operation: "read",
        source,
    })?;

    if table.skipped_lines() > 0 {
        tracing::warn!(
            path = %path.display(),
            skipped = table.skipped_lines(),
            "Malformed lines skipped"
        );
    }
    Ok(table)
}

/// Load `path` into a table using the format string `format`.
pub fn load_table(path: &Path, format: &str, config: &ParseConfig) -> Result<LogTable> {
    load_with_spec(path, parse_format(format)?, config)
}

/// Load a file for interactive viewing and editing before a run.
pub fn preview(input: &Path, format: &str, config: &ParseConfig) -> Result<LogTable> {
    let table = load_table(input, format, config)?;
    tracing::info!(
        path = %input.display(),
        rows = table.len(),
        columns = table.spec().column_count(),
        header = table.had_header(),
        "Preview loaded"
    );
    Ok(table)
}

/// Run a full request: parse, validate, load, anonymize and write.
pub fn run(request: &PipelineRequest) -> Result<RunSummary> {
    tracing::info!(
        input = %request.input.display(),
        output = %request.output.display(),
        method = %request.method,
        "Anonymization run started"
    );

    let spec = parse_format(&request.format)?;
    let (columns, strategy) = prepare(request, &spec)?;
    let table = load_with_spec(&request.input, spec, &request.parse)?;
    finish(table, &columns, strategy.as_ref(), &request.output)
}

/// Anonymize and write a table that is already loaded (and possibly
/// edited). Columns are resolved against the table's own spec; the
/// request's format string is not re-parsed.
pub fn anonymize_table(table: LogTable, request: &PipelineRequest) -> Result<RunSummary> {
    let spec = Arc::clone(table.spec());
    let (columns, strategy) = prepare(request, &spec)?;
    finish(table, &columns, strategy.as_ref(), &request.output)
}

/// Checks that need no file access.
fn prepare(
    request: &PipelineRequest,
    spec: &FormatSpec,
) -> Result<(Vec<usize>, Box<dyn AnonymityStrategy>)> {
    if fs::same_file(&request.input, &request.output) {
        return Err(LogAnonError::SameInputOutput {
            path: request.output.clone(),
        });
    }
    let columns = request.columns.resolve(spec)?;
    let strategy = build_strategy(request.method, &request.params)?;
    Ok((columns, strategy))
}

fn finish(
    table: LogTable,
    columns: &[usize],
    strategy: &dyn AnonymityStrategy,
    output: &Path,
) -> Result<RunSummary> {
    let rows_read = table.len();
    let rows_skipped = table.skipped_lines();

    let table = strategy.apply(table, columns)?;
    let lines = table.serialize(table.spec())?;
    writer::write_lines_atomic(output, &lines)?;

    let summary = RunSummary {
        rows_read,
        rows_processed: table.len(),
        rows_removed: rows_read - table.len(),
        rows_skipped,
        output: output.to_path_buf(),
    };
    tracing::info!(
        output = %output.display(),
        method = %strategy.method(),
        rows_read = summary.rows_read,
        rows_written = summary.rows_processed,
        rows_removed = summary.rows_removed,
        rows_skipped = summary.rows_skipped,
        "Anonymization run complete"
    );
    Ok(summary)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::anonymize::{ColumnRef, RemovingMethod};
    use crate::core::bucket::Bucketing;
    use crate::util::error::{AnonymizeError, FormatError};
    use tempfile::TempDir;

    fn blank(columns: &[usize]) -> (MethodParams, ColumnSelector) {
        (
            MethodParams::Removing(RemovingMethod::Blank),
            columns.iter().map(|c| ColumnRef::Index(*c)).collect(),
        )
    }

    fn request(dir: &TempDir, input: &str, format: &str, columns: &[usize]) -> PipelineRequest {
        let in_path = dir.path().join("in.log");
        std::fs::write(&in_path, input).unwrap();
        let (params, selector) = blank(columns);
        PipelineRequest::new(in_path, format, dir.path().join("out.log"), params, selector)
    }

    #[test]
    fn test_run_blanks_column_and_keeps_header() {
        let dir = TempDir::new().unwrap();
        let req = request(&dir, "a,b,c\n1,2,3\n4,5,6\n", "a,b,c", &[1]);
        let summary = run(&req).unwrap();

        assert_eq!(summary.rows_read, 2);
        assert_eq!(summary.rows_processed, 2);
        assert_eq!(summary.rows_removed, 0);
        assert_eq!(summary.rows_skipped, 0);
        assert_eq!(
            std::fs::read_to_string(&req.output).unwrap(),
            "a,b,c\n1,,3\n4,,6\n"
        );
    }

    #[test]
    fn test_run_counts_skipped_lines() {
        let dir = TempDir::new().unwrap();
        let req = request(&dir, "1,2\n4,5,6\n", "a,b,c", &[0]);
        let summary = run(&req).unwrap();
        assert_eq!(summary.rows_skipped, 1);
        assert_eq!(summary.rows_processed, 1);
        assert_eq!(std::fs::read_to_string(&req.output).unwrap(), ",5,6\n");
    }

    #[test]
    fn test_run_reports_removed_rows() {
        let dir = TempDir::new().unwrap();
        let mut req = request(&dir, "x,1\n,2\ny,3\n", "who,n", &[0]);
        req.params = MethodParams::Removing(RemovingMethod::DeleteRows);
        let summary = run(&req).unwrap();
        assert_eq!(summary.rows_removed, 2);
        assert_eq!(std::fs::read_to_string(&req.output).unwrap(), ",2\n");
    }

    #[test]
    fn test_missing_input_leaves_existing_output() {
        let dir = TempDir::new().unwrap();
        let (params, selector) = blank(&[0]);
        let out = dir.path().join("out.log");
        std::fs::write(&out, "previous\n").unwrap();
        let req = PipelineRequest::new(dir.path().join("missing.log"), "a", &out, params, selector);

        let err = run(&req).unwrap_err();
        assert!(matches!(err, LogAnonError::Io { operation: "open", .. }));
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "previous\n");
    }

    #[test]
    fn test_invalid_requests_fail_before_io() {
        let dir = TempDir::new().unwrap();
        let (params, selector) = blank(&[0]);
        // The input does not exist; each error must come from validation.
        let missing = dir.path().join("missing.log");
        let out = dir.path().join("out.log");

        let req = PipelineRequest::new(&missing, "", &out, params.clone(), selector.clone());
        assert!(matches!(run(&req), Err(LogAnonError::Format(FormatError::Empty))));

        let req = PipelineRequest::new(
            &missing,
            "a,b",
            &out,
            params.clone(),
            ColumnSelector::new(vec![ColumnRef::Name("zz".into())]),
        );
        assert!(matches!(
            run(&req),
            Err(LogAnonError::Anonymize(AnonymizeError::ColumnNotFound { .. }))
        ));

        let req = PipelineRequest::new(
            &missing,
            "a,b",
            &out,
            MethodParams::Aggregation(Bucketing::Range { width: 0.0 }),
            selector.clone(),
        );
        assert!(matches!(
            run(&req),
            Err(LogAnonError::Anonymize(AnonymizeError::InvalidParameters { .. }))
        ));

        let mut req = PipelineRequest::new(&missing, "a,b", &out, params, selector);
        req.method = AnonymityMethod::Aggregation;
        assert!(matches!(
            run(&req),
            Err(LogAnonError::Anonymize(AnonymizeError::UnsupportedMethod { .. }))
        ));
        assert!(!out.exists());
    }

    #[test]
    fn test_same_input_and_output_rejected() {
        let dir = TempDir::new().unwrap();
        let mut req = request(&dir, "1\n", "n", &[0]);
        req.output = req.input.clone();
        assert!(matches!(run(&req), Err(LogAnonError::SameInputOutput { .. })));
        assert_eq!(std::fs::read_to_string(&req.input).unwrap(), "1\n");
    }

    #[test]
    fn test_anonymize_edited_table() {
        let dir = TempDir::new().unwrap();
        let req = request(&dir, "who,n\nann,1\nbob,2\n", "who,n", &[0]);

        let mut table = preview(&req.input, &req.format, &req.parse).unwrap();
        table.remove_positions([1]);
        table.set_value(0, 1, "9").unwrap();

        let summary = anonymize_table(table, &req).unwrap();
        assert_eq!(summary.rows_processed, 1);
        assert_eq!(std::fs::read_to_string(&req.output).unwrap(), "who,n\n,9\n");
    }

    #[test]
    fn test_suggest_format_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.log");
        std::fs::write(&path, "\n\ntime;node\n1;a\n").unwrap();
        assert_eq!(suggest_format(&path).unwrap().as_deref(), Some("time;node"));

        std::fs::write(&path, "").unwrap();
        assert_eq!(suggest_format(&path).unwrap(), None);
    }

    #[test]
    fn test_parse_config_from_app_config() {
        let config = AppConfig {
            max_parse_errors: 3,
            max_line_bytes: 2048,
            ..AppConfig::default()
        };
        let parse = ParseConfig::from(&config);
        assert_eq!(parse.max_parse_errors, 3);
        assert_eq!(parse.max_line_bytes, 2048);
    }
}
