//! Field normalization.
//!
//! Request bodies arrive as loosely typed JSON: numbers sent as strings,
//! dates in half a dozen shapes, booleans as `0`/`1`. The functions in this
//! module turn such an input bag into the canonical field set of a record
//! kind, or into the full list of per-field failures. Nothing here performs
//! I/O and nothing panics on malformed input.

mod codes;
mod date;
mod flag;
mod numeric;
mod records;
mod resident_id;

pub use codes::{CoverageType, Sex};
pub use date::{format_date, normalize_date, DateError, DateInput};
pub use flag::normalize_flag;
pub use numeric::{parse_decimal, parse_integer};
pub use records::{
    normalize, normalize_card, normalize_patient, normalize_payment, normalize_record_id,
    normalize_vital, CanonicalFields, RecordKind,
};
pub use resident_id::{join_resident_id, split_resident_id, ResidentIdSplit};

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// A single field that failed normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

pub type FieldErrors = Vec<FieldError>;

/// Read access to a raw JSON object that collects failures as it goes.
///
/// `null`, missing keys and blank strings all read as absent.
pub(crate) struct InputBag<'a> {
    fields: &'a Map<String, Value>,
    errors: FieldErrors,
}

impl<'a> InputBag<'a> {
    pub fn new(value: &'a Value) -> Result<Self, FieldErrors> {
        match value {
            Value::Object(fields) => Ok(Self {
                fields,
                errors: Vec::new(),
            }),
            _ => Err(vec![FieldError::new("body", "expected a JSON object")]),
        }
    }

    pub fn value(&self, field: &str) -> Option<&'a Value> {
        match self.fields.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(v) => Some(v),
        }
    }

    /// Text content of a field. Numbers are accepted and rendered as text.
    pub fn text(&mut self, field: &'static str) -> Option<String> {
        match self.value(field)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => {
                self.reject(field, "expected a string");
                None
            }
        }
    }

    pub fn required_text(&mut self, field: &'static str) -> Option<String> {
        if self.value(field).is_none() {
            self.reject(field, "is required");
            return None;
        }
        self.text(field)
    }

    /// Applies `parse` to the text of a field, recording its error.
    pub fn parsed<T>(
        &mut self,
        field: &'static str,
        parse: impl FnOnce(&str) -> Result<T, String>,
    ) -> Option<T> {
        let raw = self.text(field)?;
        match parse(&raw) {
            Ok(value) => Some(value),
            Err(reason) => {
                self.reject(field, reason);
                None
            }
        }
    }

    pub fn date(&mut self, field: &'static str) -> Option<chrono::NaiveDate> {
        let value = self.value(field)?;
        match normalize_date(value) {
            Ok(date) => Some(date),
            Err(e) => {
                self.reject(field, e.to_string());
                None
            }
        }
    }

    pub fn flag(&mut self, field: &'static str) -> bool {
        let Some(value) = self.value(field) else {
            return false;
        };
        match normalize_flag(value) {
            Ok(flag) => flag,
            Err(reason) => {
                self.reject(field, reason);
                false
            }
        }
    }

    pub fn reject(&mut self, field: &str, reason: impl Into<String>) {
        self.errors.push(FieldError::new(field, reason));
    }

    /// Returns `value` when every field read so far was valid.
    pub fn finish<T>(self, value: impl FnOnce() -> Option<T>) -> Result<T, FieldErrors> {
        if !self.errors.is_empty() {
            return Err(self.errors);
        }
        value().ok_or_else(|| vec![FieldError::new("body", "incomplete input")])
    }
}
