//! Schema-agnostic accessors over a flat key-path form submission.
//!
//! ODK/Ona exports one JSON object per submission whose keys are the
//! slash-separated question paths (`farmer/phone_number`). Repeat groups
//! are arrays of objects keyed the same way. Absence is normal: every
//! accessor returns `None` (or the supplied default) for a missing key,
//! an explicit `null`, or a blank answer.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use tracing::warn;

use crate::{AppError, Result};

/// Message reported when the webhook body carries no submission.
pub const EMPTY_BODY_MESSAGE: &str = "The Submission Request Body Is Empty";

/// One submission, or one entry of a repeat group inside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submission {
    fields: Map<String, Value>,
}

impl Submission {
    /// Wrap an already-parsed field map.
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Parse a raw webhook body.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Input` when the body is blank, `{}`, not JSON,
    /// or not a JSON object.
    pub fn parse(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(AppError::Input(EMPTY_BODY_MESSAGE.into()));
        }

        let value: Value = serde_json::from_slice(body)?;
        let Value::Object(fields) = value else {
            return Err(AppError::Input(
                "submission body must be a JSON object".into(),
            ));
        };
        if fields.is_empty() {
            return Err(AppError::Input(EMPTY_BODY_MESSAGE.into()));
        }

        Ok(Self { fields })
    }

    /// Underlying field map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Raw value at `path` when present, non-null and not a blank string.
    #[must_use]
    pub fn value(&self, path: &str) -> Option<&Value> {
        match self.fields.get(path)? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            other => Some(other),
        }
    }

    /// Answer rendered as trimmed text.
    #[must_use]
    pub fn text(&self, path: &str) -> Option<String> {
        match self.value(path)? {
            Value::String(s) => Some(s.trim().to_owned()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Choice code of a select question.
    ///
    /// `select_multiple` answers are space separated; only the first
    /// choice is used as the code.
    #[must_use]
    pub fn code(&self, path: &str) -> Option<String> {
        let text = self.text(path)?;
        let mut choices = text.split_whitespace();
        let first = choices.next()?.to_owned();
        let dropped: Vec<&str> = choices.collect();
        if !dropped.is_empty() {
            warn!(path, code = %first, ?dropped, "multiple choices answered; only the first is saved");
        }
        Some(first)
    }

    /// Numeric answer. Ona exports numbers as strings, so both forms are
    /// accepted.
    #[must_use]
    pub fn number(&self, path: &str) -> Option<f64> {
        match self.value(path)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Whole-number answer. Fractional and out-of-range values are
    /// rejected rather than rounded or saturated.
    #[must_use]
    pub fn integer(&self, path: &str) -> Option<i64> {
        let n = match self.value(path)? {
            Value::Number(n) => {
                if let Some(whole) = n.as_i64() {
                    return Some(whole);
                }
                n.as_f64()?
            }
            Value::String(s) => {
                let s = s.trim();
                if let Ok(whole) = s.parse::<i64>() {
                    return Some(whole);
                }
                s.parse::<f64>().ok()?
            }
            _ => return None,
        };
        whole_f64(n)
    }

    /// Date answer. Accepts `YYYY-MM-DD` and ODK `dateTime` strings.
    #[must_use]
    pub fn date(&self, path: &str) -> Option<NaiveDate> {
        let raw = self.value(path)?.as_str()?.trim();
        let day = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }

    /// Date answer, or `default` when absent or unparseable.
    #[must_use]
    pub fn date_or(&self, path: &str, default: NaiveDate) -> NaiveDate {
        self.date(path).unwrap_or(default)
    }

    /// Entries of the repeat group at `path`. Non-object elements are
    /// skipped; a missing group yields no entries.
    #[must_use]
    pub fn repeat(&self, path: &str) -> Vec<Submission> {
        match self.fields.get(path) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_object().cloned().map(Submission::new))
                .collect(),
            _ => Vec::new(),
        }
    }
}

// i64::MAX is not representable as f64; the cast rounds it up to 2^63.
#[allow(clippy::cast_precision_loss)]
const I64_UPPER: f64 = i64::MAX as f64;
#[allow(clippy::cast_precision_loss)]
const I64_LOWER: f64 = i64::MIN as f64;

#[allow(clippy::float_cmp)]
fn whole_f64(n: f64) -> Option<i64> {
    if n.is_finite() && n.fract() == 0.0 && (I64_LOWER..I64_UPPER).contains(&n) {
        #[allow(clippy::cast_possible_truncation)]
        let whole = n as i64;
        Some(whole)
    } else {
        None
    }
}
