// loganon - core/bucket.rs
//
// Aggregation functions: each one maps a single cell value to a coarser
// value that identifies a group rather than an individual.
//
// A value the function cannot interpret (text in a numeric column, a
// timestamp in another format) yields `None` and is left as it was.

use crate::util::constants;
use crate::util::error::AnonymizeError;
use chrono::format::{Item, StrftimeItems};
use chrono::{Duration, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// How Aggregation coarsens a value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Bucketing {
    /// Leave values unchanged.
    #[default]
    Identity,

    /// Round a number to the nearest multiple of `step`.
    Round { step: f64 },

    /// Replace a number with the `lower-upper` interval of size `width`
    /// containing it.
    Range { width: f64 },

    /// Keep the first `keep` characters and mask the rest.
    Prefix {
        keep: usize,
        #[serde(default = "default_mask")]
        mask: char,
    },

    /// Floor a timestamp (parsed with strftime `format`) to the start of its
    /// `seconds`-long window.
    TimeWindow { format: String, seconds: u64 },
}

fn default_mask() -> char {
    constants::DEFAULT_MASK_CHAR
}

impl Bucketing {
    /// Kebab-case names of every kind, as accepted in job files.
    pub fn kinds() -> &'static [&'static str] {
        &["identity", "round", "range", "prefix", "time-window"]
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Round { .. } => "round",
            Self::Range { .. } => "range",
            Self::Prefix { .. } => "prefix",
            Self::TimeWindow { .. } => "time-window",
        }
    }

    /// Reject parameters no value could be bucketed with.
    pub fn validate(&self) -> Result<(), AnonymizeError> {
        let invalid = |reason: String| AnonymizeError::InvalidParameters {
            method: "aggregation",
            reason,
        };
        match self {
            Self::Identity | Self::Prefix { .. } => Ok(()),
            Self::Round { step } if !(step.is_finite() && *step > 0.0) => {
                Err(invalid(format!("round step must be positive, got {step}")))
            }
            Self::Range { width } if !(width.is_finite() && *width > 0.0) => {
                Err(invalid(format!("range width must be positive, got {width}")))
            }
            Self::Round { .. } | Self::Range { .. } => Ok(()),
            Self::TimeWindow { seconds: 0, .. } => {
                Err(invalid("time window must be at least one second".to_string()))
            }
            Self::TimeWindow { format, .. } => {
                if format.trim().is_empty() {
                    return Err(invalid("time window needs a timestamp format".to_string()));
                }
                if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                    return Err(invalid(format!("invalid timestamp format '{format}'")));
                }
                Ok(())
            }
        }
    }

    /// Bucket one value. `None` means the value could not be interpreted.
    pub fn apply(&self, value: &str) -> Option<String> {
        match self {
            Self::Identity => Some(value.to_string()),
            Self::Round { step } => {
                let number = parse_number(value)?;
                let rounded = (number / step).round() * step;
                Some(format_number(rounded, decimals_of(*step)))
            }
            Self::Range { width } => {
                let number = parse_number(value)?;
                let lower = (number / width).floor() * width;
                let decimals = decimals_of(*width);
                Some(format!(
                    "{}-{}",
                    format_number(lower, decimals),
                    format_number(lower + width, decimals)
                ))
            }
            Self::Prefix { keep, mask } => Some(
                value
                    .chars()
                    .enumerate()
                    .map(|(i, c)| if i < *keep { c } else { *mask })
                    .collect(),
            ),
            Self::TimeWindow { format, seconds } => {
                let parsed = NaiveDateTime::parse_from_str(value.trim(), format).ok()?;
                let window = i64::try_from(*seconds).ok()?;
                let timestamp = Utc.from_utc_datetime(&parsed).timestamp();
                let floored = parsed
                    .with_nanosecond(0)?
                    .checked_sub_signed(Duration::seconds(timestamp.rem_euclid(window)))?;
                Some(floored.format(format).to_string())
            }
        }
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Decimal places needed to print multiples of `step` without float noise.
fn decimals_of(step: f64) -> usize {
    let text = step.to_string();
    text.split_once('.').map(|(_, frac)| frac.len()).unwrap_or(0)
}

fn format_number(value: f64, decimals: usize) -> String {
    let text = format!("{value:.decimals$}");
    // "-0" and "-0.00" read as a separate bucket from "0"; fold them.
    if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
        text[1..].to_string()
    } else {
        text
    }
}

// =============================================================================
// Tests
// =============================================================================
