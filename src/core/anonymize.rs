// loganon - core/anonymize.rs
//
// Anonymization methods and the strategies that carry them out.
//
// A strategy consumes a `LogTable` and hands back the transformed table.
// Strategies are built once per request by `build_strategy`, which is the
// only place a method name is mapped to an implementation.

use crate::core::bucket::Bucketing;
use crate::core::format::FormatSpec;
use crate::core::table::LogTable;
use crate::util::constants;
use crate::util::error::AnonymizeError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Methods and their parameters
// =============================================================================

/// The anonymization methods a user can choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnonymityMethod {
    Aggregation,
    Removing,
}

impl AnonymityMethod {
    /// Every method, in presentation order.
    pub fn all() -> &'static [AnonymityMethod] {
        &[AnonymityMethod::Aggregation, AnonymityMethod::Removing]
    }

    /// Machine name, as accepted by `from_str` and in job files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Aggregation => "aggregation",
            Self::Removing => "removing",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Aggregation => "Aggregation",
            Self::Removing => "Removing",
        }
    }
}

impl fmt::Display for AnonymityMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnonymityMethod {
    type Err = AnonymizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AnonymizeError::UnsupportedMethod {
                name: wanted.to_string(),
            })
    }
}

/// What Removing does with the targeted values.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum RemovingMethod {
    /// Replace each value with the empty string.
    #[default]
    Blank,

    /// Replace each value with a fixed token.
    Placeholder {
        #[serde(default = "default_placeholder")]
        value: String,
    },

    /// Delete every row in which a targeted column is non-empty.
    DeleteRows,

    /// Delete every row in which a targeted value matches `pattern`.
    DeleteRowsMatching { pattern: String },
}

fn default_placeholder() -> String {
    constants::DEFAULT_PLACEHOLDER.to_string()
}

impl RemovingMethod {
    /// Kebab-case names of every policy, as accepted in job files.
    pub fn kinds() -> &'static [&'static str] {
        &["blank", "placeholder", "delete-rows", "delete-rows-matching"]
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Blank => "blank",
            Self::Placeholder { .. } => "placeholder",
            Self::DeleteRows => "delete-rows",
            Self::DeleteRowsMatching { .. } => "delete-rows-matching",
        }
    }

    /// True for policies that delete rows rather than rewrite values.
    pub fn deletes_rows(&self) -> bool {
        matches!(self, Self::DeleteRows | Self::DeleteRowsMatching { .. })
    }

    /// Build a policy from its loose parts (CLI flags, job file keys).
    ///
    /// `value` falls back to `default_placeholder`; `pattern` is required
    /// by `delete-rows-matching` and ignored elsewhere.
    pub fn from_parts(
        policy: &str,
        value: Option<String>,
        pattern: Option<String>,
        default_placeholder: &str,
    ) -> Result<Self, AnonymizeError> {
        match policy.trim().to_ascii_lowercase().as_str() {
            "blank" => Ok(Self::Blank),
            "placeholder" => Ok(Self::Placeholder {
                value: value.unwrap_or_else(|| default_placeholder.to_string()),
            }),
            "delete-rows" => Ok(Self::DeleteRows),
            "delete-rows-matching" => match pattern {
                Some(pattern) => Ok(Self::DeleteRowsMatching { pattern }),
                None => Err(AnonymizeError::InvalidParameters {
                    method: "removing",
                    reason: "policy 'delete-rows-matching' needs a pattern".to_string(),
                }),
            },
            other => Err(AnonymizeError::InvalidParameters {
                method: "removing",
                reason: format!(
                    "unknown policy '{other}' (expected one of: {})",
                    Self::kinds().join(", ")
                ),
            }),
        }
    }
}

/// Method-specific parameters of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodParams {
    Aggregation(Bucketing),
    Removing(RemovingMethod),
}

impl MethodParams {
    /// The method these parameters belong to.
    pub fn method(&self) -> AnonymityMethod {
        match self {
            Self::Aggregation(_) => AnonymityMethod::Aggregation,
            Self::Removing(_) => AnonymityMethod::Removing,
        }
    }

    /// Default parameters for `method`.
    pub fn default_for(method: AnonymityMethod) -> Self {
        match method {
            AnonymityMethod::Aggregation => Self::Aggregation(Bucketing::default()),
            AnonymityMethod::Removing => Self::Removing(RemovingMethod::default()),
        }
    }
}

// =============================================================================
// Column selection
// =============================================================================

/// A column named by position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Name(n) => f.write_str(n),
        }
    }
}

/// All-digit input is an index; anything else is a name.
impl From<&str> for ColumnRef {
    fn from(s: &str) -> Self {
        let s = s.trim();
        match s.parse::<usize>() {
            Ok(i) => Self::Index(i),
            Err(_) => Self::Name(s.to_string()),
        }
    }
}

impl FromStr for ColumnRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// The target columns of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSelector {
    refs: Vec<ColumnRef>,
}

impl ColumnSelector {
    pub fn new(refs: Vec<ColumnRef>) -> Self {
        Self { refs }
    }

    pub fn refs(&self) -> &[ColumnRef] {
        &self.refs
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Resolve against `spec` into sorted, de-duplicated column indices.
    pub fn resolve(&self, spec: &FormatSpec) -> Result<Vec<usize>, AnonymizeError> {
        if self.refs.is_empty() {
            return Err(AnonymizeError::NoColumns);
        }
        let mut indices = Vec::with_capacity(self.refs.len());
        for column in &self.refs {
            let idx = match column {
                ColumnRef::Index(i) if *i < spec.column_count() => *i,
                ColumnRef::Name(name) => match spec.column_index(name) {
                    Some(i) => i,
                    None => {
                        return Err(AnonymizeError::ColumnNotFound {
                            column: name.clone(),
                        })
                    }
                },
                ColumnRef::Index(i) => {
                    return Err(AnonymizeError::ColumnNotFound {
                        column: i.to_string(),
                    })
                }
            };
            indices.push(idx);
        }
        indices.sort_unstable();
        indices.dedup();
        Ok(indices)
    }
}

impl FromIterator<ColumnRef> for ColumnSelector {
    fn from_iter<I: IntoIterator<Item = ColumnRef>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

// =============================================================================
// Strategies
// =============================================================================

/// One anonymization method, ready to run.
///
/// `apply` is deterministic: equal tables and columns give equal results.
pub trait AnonymityStrategy: fmt::Debug {
    fn method(&self) -> AnonymityMethod;

    /// Transform `table` on the given column indices.
    fn apply(&self, table: LogTable, columns: &[usize]) -> Result<LogTable, AnonymizeError>;
}

/// Build the strategy for `method` from its parameters.
///
/// Parameters are validated here, so a strategy that was built can always
/// run.
pub fn build_strategy(
    method: AnonymityMethod,
    params: &MethodParams,
) -> Result<Box<dyn AnonymityStrategy>, AnonymizeError> {
    let strategy: Box<dyn AnonymityStrategy> = match (method, params) {
        (AnonymityMethod::Removing, MethodParams::Removing(policy)) => {
            Box::new(RemovingStrategy::new(policy.clone())?)
        }
        (AnonymityMethod::Aggregation, MethodParams::Aggregation(bucketing)) => {
            Box::new(AggregationStrategy::new(bucketing.clone())?)
        }
        (method, params) => {
            return Err(AnonymizeError::UnsupportedMethod {
                name: format!("{method} with {} parameters", params.method()),
            })
        }
    };
    tracing::debug!(method = %method, "Strategy built");
    Ok(strategy)
}

fn check_columns(table: &LogTable, columns: &[usize]) -> Result<(), AnonymizeError> {
    if columns.is_empty() {
        return Err(AnonymizeError::NoColumns);
    }
    let count = table.spec().column_count();
    match columns.iter().find(|c| **c >= count) {
        Some(bad) => Err(AnonymizeError::ColumnNotFound {
            column: bad.to_string(),
        }),
        None => Ok(()),
    }
}

fn column_names(table: &LogTable, columns: &[usize]) -> Vec<String> {
    let names = table.columns();
    columns
        .iter()
        .filter_map(|c| names.get(*c).map(|n| n.to_string()))
        .collect()
}

/// Blanks, replaces or deletes the targeted data.
#[derive(Debug)]
pub struct RemovingStrategy {
    kind: &'static str,
    action: RemovingAction,
}

// A policy with its pattern already compiled.
#[derive(Debug)]
enum RemovingAction {
    Blank,
    Placeholder(String),
    DeleteRows,
    DeleteRowsMatching(Regex),
}

impl RemovingStrategy {
    pub fn new(policy: RemovingMethod) -> Result<Self, AnonymizeError> {
        let kind = policy.kind();
        let action = match policy {
            RemovingMethod::Blank => RemovingAction::Blank,
            RemovingMethod::Placeholder { value } => {
                if value.contains(['\n', '\r']) {
                    return Err(AnonymizeError::InvalidParameters {
                        method: "removing",
                        reason: "placeholder must not contain line breaks".to_string(),
                    });
                }
                RemovingAction::Placeholder(value)
            }
            RemovingMethod::DeleteRows => RemovingAction::DeleteRows,
            RemovingMethod::DeleteRowsMatching { pattern } => {
                RemovingAction::DeleteRowsMatching(compile_pattern(&pattern)?)
            }
        };
        Ok(Self { kind, action })
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, AnonymizeError> {
    if pattern.is_empty() {
        return Err(AnonymizeError::InvalidParameters {
            method: "removing",
            reason: "row pattern is empty".to_string(),
        });
    }
    if pattern.len() > constants::MAX_REGEX_PATTERN_LENGTH {
        return Err(AnonymizeError::InvalidParameters {
            method: "removing",
            reason: format!(
                "row pattern is {} bytes, limit is {}",
                pattern.len(),
                constants::MAX_REGEX_PATTERN_LENGTH
            ),
        });
    }
    Regex::new(pattern).map_err(|source| AnonymizeError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

impl AnonymityStrategy for RemovingStrategy {
    fn method(&self) -> AnonymityMethod {
        AnonymityMethod::Removing
    }

    fn apply(&self, mut table: LogTable, columns: &[usize]) -> Result<LogTable, AnonymizeError> {
        check_columns(&table, columns)?;
        let before = table.len();

        let changed = match &self.action {
            RemovingAction::Blank => columns
                .iter()
                .map(|c| table.map_column(*c, |_| Some(String::new())))
                .sum::<usize>(),
            RemovingAction::Placeholder(value) => columns
                .iter()
                .map(|c| table.map_column(*c, |_| Some(value.clone())))
                .sum::<usize>(),
            RemovingAction::DeleteRows => table.retain_rows(|record| {
                columns
                    .iter()
                    .all(|c| record.get(*c).map_or(true, str::is_empty))
            }),
            RemovingAction::DeleteRowsMatching(matcher) => table.retain_rows(|record| {
                !columns
                    .iter()
                    .any(|c| record.get(*c).is_some_and(|v| matcher.is_match(v)))
            }),
        };

        tracing::debug!(
            policy = self.kind,
            columns = ?column_names(&table, columns),
            changed,
            rows_before = before,
            rows_after = table.len(),
            "Removing applied"
        );
        Ok(table)
    }
}

/// Replaces each targeted value with its bucket.
#[derive(Debug)]
pub struct AggregationStrategy {
    bucketing: Bucketing,
}

impl AggregationStrategy {
    pub fn new(bucketing: Bucketing) -> Result<Self, AnonymizeError> {
        bucketing.validate()?;
        Ok(Self { bucketing })
    }
}

impl AnonymityStrategy for AggregationStrategy {
    fn method(&self) -> AnonymityMethod {
        AnonymityMethod::Aggregation
    }

    fn apply(&self, mut table: LogTable, columns: &[usize]) -> Result<LogTable, AnonymizeError> {
        check_columns(&table, columns)?;

        let mut uninterpretable = 0usize;
        let mut changed = 0usize;
        for column in columns {
            changed += table.map_column(*column, |value| {
                let bucketed = self.bucketing.apply(value);
                if bucketed.is_none() {
                    uninterpretable += 1;
                }
                bucketed
            });
        }

        tracing::debug!(
            kind = self.bucketing.kind(),
            columns = ?column_names(&table, columns),
            changed,
            uninterpretable,
            "Aggregation applied"
        );
        Ok(table)
    }
}

// =============================================================================
// Tests
// =============================================================================
