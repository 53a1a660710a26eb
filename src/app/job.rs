// loganon - app/job.rs
//
// Job files: a whole anonymization request described in TOML, so a run
// can be repeated without retyping its flags.
//
//   [job]
//   input = "in.log"
//   output = "out.log"
//   format = "time,node,x,y"      # optional; first line of input otherwise
//
//   [anonymization]
//   method = "removing"
//   columns = ["node", 3]
//
//   [anonymization.removing]
//   policy = "placeholder"
//   value = "REDACTED"
//
// Relative paths are resolved against the directory holding the job file.

use crate::app::pipeline::{self, PipelineRequest};
use crate::core::anonymize::{
    AnonymityMethod, ColumnRef, ColumnSelector, MethodParams, RemovingMethod,
};
use crate::core::bucket::Bucketing;
use crate::core::table::ParseConfig;
use crate::util::constants;
use crate::util::error::{ConfigError, FormatError, LogAnonError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// =============================================================================
// TOML deserialization structures (raw input)
// =============================================================================

/// Raw job definition as deserialized from a .toml file.
#[derive(Debug, Deserialize)]
pub struct JobDefinition {
    pub job: JobMeta,
    pub anonymization: AnonymizationDef,
}

#[derive(Debug, Deserialize)]
pub struct JobMeta {
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnonymizationDef {
    pub method: String,
    #[serde(default)]
    pub columns: Vec<ColumnRef>,
    #[serde(default)]
    pub removing: Option<RemovingDef>,
    #[serde(default)]
    pub aggregation: Option<Bucketing>,
}

#[derive(Debug, Deserialize)]
pub struct RemovingDef {
    pub policy: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
}

// =============================================================================
// Parse and validate
// =============================================================================

/// Parse a TOML string into a `JobDefinition`.
///
/// `source_path` is used for error messages only.
pub fn parse_job_toml(content: &str, source_path: &Path) -> Result<JobDefinition> {
    toml::from_str(content).map_err(|source| {
        LogAnonError::from(ConfigError::TomlParse {
            path: source_path.to_path_buf(),
            source,
        })
    })
}

/// Validate a `JobDefinition` and turn it into a request.
///
/// `base_dir` anchors relative paths. A missing format string is left
/// empty; `load_job` fills it from the input file.
pub fn validate_job(
    def: JobDefinition,
    source_path: &Path,
    base_dir: &Path,
    default_placeholder: &str,
) -> Result<PipelineRequest> {
    if def.job.input.trim().is_empty() {
        return Err(missing(source_path, "job.input"));
    }
    if def.job.output.trim().is_empty() {
        return Err(missing(source_path, "job.output"));
    }

    let method: AnonymityMethod = def.anonymization.method.parse()?;
    let params = match method {
        AnonymityMethod::Removing => {
            if def.anonymization.aggregation.is_some() {
                tracing::warn!(
                    path = %source_path.display(),
                    "[anonymization.aggregation] ignored for method 'removing'"
                );
            }
            let policy = match def.anonymization.removing {
                Some(raw) => RemovingMethod::from_parts(
                    &raw.policy,
                    raw.value,
                    raw.pattern,
                    default_placeholder,
                )?,
                None => RemovingMethod::default(),
            };
            MethodParams::Removing(policy)
        }
        AnonymityMethod::Aggregation => {
            if def.anonymization.removing.is_some() {
                tracing::warn!(
                    path = %source_path.display(),
                    "[anonymization.removing] ignored for method 'aggregation'"
                );
            }
            MethodParams::Aggregation(def.anonymization.aggregation.unwrap_or_default())
        }
    };

    let request = PipelineRequest {
        input: resolve(base_dir, &def.job.input),
        format: def.job.format.unwrap_or_default(),
        output: resolve(base_dir, &def.job.output),
        method,
        params,
        columns: ColumnSelector::new(def.anonymization.columns),
        parse: ParseConfig::default(),
    };
    Ok(request)
}

fn missing(path: &Path, field: &'static str) -> LogAnonError {
    LogAnonError::from(ConfigError::MissingField {
        path: path.to_path_buf(),
        field,
    })
}

fn resolve(base_dir: &Path, raw: &str) -> PathBuf {
    let path = Path::new(raw.trim());
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

// =============================================================================
// Loading from disk
// =============================================================================

/// Read, parse and validate the job file at `path`.
///
/// When the job names no format, the input's first line is used.
pub fn load_job(path: &Path, default_placeholder: &str) -> Result<PipelineRequest> {
    let metadata = std::fs::metadata(path).map_err(|source| {
        LogAnonError::from(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    })?;
    if metadata.len() > constants::MAX_JOB_FILE_SIZE {
        return Err(ConfigError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size: constants::MAX_JOB_FILE_SIZE,
        }
        .into());
    }

    let content = std::fs::read_to_string(path).map_err(|source| {
        LogAnonError::from(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    })?;

    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let def = parse_job_toml(&content, path)?;
    let mut request = validate_job(def, path, base_dir, default_placeholder)?;

    if request.format.trim().is_empty() {
        request.format = pipeline::suggest_format(&request.input)?.ok_or(FormatError::Empty)?;
        tracing::debug!(input = %request.input.display(), "Job format taken from first line");
    }

    tracing::info!(
        path = %path.display(),
        method = %request.method,
        columns = request.columns.refs().len(),
        "Job loaded"
    );
    Ok(request)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::error::AnonymizeError;
    use tempfile::TempDir;

    const JOB: &str = r#"
[job]
input = "in.log"
output = "out/anon.log"
format = "time,node,x,y"

[anonymization]
method = "removing"
columns = ["node", 3]

[anonymization.removing]
policy = "placeholder"
"#;

    fn validate(content: &str) -> Result<PipelineRequest> {
        let path = Path::new("/jobs/job.toml");
        let def = parse_job_toml(content, path)?;
        validate_job(def, path, Path::new("/jobs"), "<anon>")
    }

    #[test]
    fn test_validate_full_job() {
        let request = validate(JOB).unwrap();
        assert_eq!(request.input, PathBuf::from("/jobs/in.log"));
        assert_eq!(request.output, PathBuf::from("/jobs/out/anon.log"));
        assert_eq!(request.format, "time,node,x,y");
        assert_eq!(request.method, AnonymityMethod::Removing);
        assert_eq!(
            request.params,
            MethodParams::Removing(RemovingMethod::Placeholder {
                value: "<anon>".to_string()
            })
        );
        assert_eq!(
            request.columns.refs(),
            &[ColumnRef::Name("node".to_string()), ColumnRef::Index(3)]
        );
    }

    #[test]
    fn test_aggregation_job() {
        let request = validate(
            "[job]\ninput = \"/abs/in.log\"\noutput = \"o.log\"\n\
             [anonymization]\nmethod = \"aggregation\"\ncolumns = [\"x\"]\n\
             [anonymization.aggregation]\nkind = \"round\"\nstep = 10.0\n",
        )
        .unwrap();
        assert_eq!(request.input, PathBuf::from("/abs/in.log"));
        assert_eq!(
            request.params,
            MethodParams::Aggregation(Bucketing::Round { step: 10.0 })
        );
        assert!(request.format.is_empty());
    }

    #[test]
    fn test_method_section_defaults() {
        let request = validate(
            "[job]\ninput = \"i\"\noutput = \"o\"\n[anonymization]\nmethod = \"aggregation\"\n",
        )
        .unwrap();
        assert_eq!(request.params, MethodParams::Aggregation(Bucketing::Identity));
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            validate("[job]\ninput = \"\"\noutput = \"o\"\n[anonymization]\nmethod = \"removing\"\n"),
            Err(LogAnonError::Config(ConfigError::MissingField { field: "job.input", .. }))
        ));
        assert!(matches!(
            validate("[job]\ninput = \"i\"\noutput = \"o\"\n[anonymization]\nmethod = \"k-anonymity\"\n"),
            Err(LogAnonError::Anonymize(AnonymizeError::UnsupportedMethod { .. }))
        ));
        assert!(matches!(
            validate("[job]\ninput = \"i\"\n"),
            Err(LogAnonError::Config(ConfigError::TomlParse { .. }))
        ));
        assert!(matches!(
            validate(
                "[job]\ninput = \"i\"\noutput = \"o\"\n[anonymization]\nmethod = \"removing\"\n\
                 [anonymization.removing]\npolicy = \"delete-rows-matching\"\n"
            ),
            Err(LogAnonError::Anonymize(AnonymizeError::InvalidParameters { .. }))
        ));
    }

    #[test]
    fn test_load_job_infers_format_from_input() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("in.log"), "who;n\nann;1\n").unwrap();
        let job = dir.path().join("job.toml");
        std::fs::write(
            &job,
            "[job]\ninput = \"in.log\"\noutput = \"out.log\"\n\
             [anonymization]\nmethod = \"removing\"\ncolumns = [\"who\"]\n",
        )
        .unwrap();

        let request = load_job(&job, "X").unwrap();
        assert_eq!(request.format, "who;n");
        assert_eq!(request.input, dir.path().join("in.log"));
    }

    #[test]
    fn test_load_job_rejects_oversized_file() {
        let dir = TempDir::new().unwrap();
        let job = dir.path().join("job.toml");
        let padding = "#".repeat(constants::MAX_JOB_FILE_SIZE as usize + 1);
        std::fs::write(&job, padding).unwrap();
        assert!(matches!(
            load_job(&job, "X"),
            Err(LogAnonError::Config(ConfigError::FileTooLarge { .. }))
        ));
    }

    #[test]
    fn test_load_job_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_job(&dir.path().join("none.toml"), "X"),
            Err(LogAnonError::Config(ConfigError::Io { .. }))
        ));
    }
}
