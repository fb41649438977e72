//! Decoding of persistence rows into records.
//!
//! Rows come back as JSON objects, either from the local SQLite store or from
//! the remote service. The remote side reports column names in upper case and
//! may hand back dates as timestamps or objects, so lookups ignore case and
//! date columns go through the same normalizer as request bodies.

use super::models::{FamilyCardRecord, PatientRecord, PaymentRecord, VitalRecord};
use crate::normalize::{normalize_date, normalize_flag, CoverageType, Sex};
use crate::persistence::{Row, StorageError};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

struct RowReader<'a> {
    row: &'a Row,
    table: &'static str,
}

impl<'a> RowReader<'a> {
    fn new(row: &'a Row, table: &'static str) -> Self {
        Self { row, table }
    }

    fn raw(&self, column: &str) -> Option<&'a Value> {
        self.row
            .get(column)
            .or_else(|| {
                self.row
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(column))
                    .map(|(_, value)| value)
            })
            .filter(|value| !value.is_null())
    }

    /// Like `raw`, but blank strings count as absent.
    fn present(&self, column: &str) -> Option<&'a Value> {
        self.raw(column).filter(|value| match value {
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
    }

    fn error(&self, column: &str, reason: impl std::fmt::Display) -> StorageError {
        StorageError::Decode {
            what: self.table,
            reason: format!("column {}: {}", column, reason),
        }
    }

    fn opt_i64(&self, column: &str) -> Result<Option<i64>, StorageError> {
        match self.raw(column) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.error(column, format!("{} is not an integer", n))),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| self.error(column, format!("'{}' is not an integer", s))),
            Some(other) => Err(self.error(column, format!("unexpected value {}", other))),
        }
    }

    fn i64(&self, column: &str) -> Result<i64, StorageError> {
        self.opt_i64(column)?
            .ok_or_else(|| self.error(column, "missing"))
    }

    fn opt_f64(&self, column: &str) -> Result<Option<f64>, StorageError> {
        match self.raw(column) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.error(column, format!("{} is not a number", n))),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| self.error(column, format!("'{}' is not a number", s))),
            Some(other) => Err(self.error(column, format!("unexpected value {}", other))),
        }
    }

    fn opt_text(&self, column: &str) -> Result<Option<String>, StorageError> {
        match self.raw(column) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(self.error(column, format!("unexpected value {}", other))),
        }
    }

    fn text(&self, column: &str) -> Result<String, StorageError> {
        self.opt_text(column)?
            .ok_or_else(|| self.error(column, "missing"))
    }

    fn flag(&self, column: &str) -> Result<bool, StorageError> {
        match self.raw(column) {
            None => Ok(false),
            Some(value) => normalize_flag(value).map_err(|reason| self.error(column, reason)),
        }
    }

    fn opt_date(&self, column: &str) -> Result<Option<NaiveDate>, StorageError> {
        match self.present(column) {
            None => Ok(None),
            Some(value) => normalize_date(value)
                .map(Some)
                .map_err(|e| self.error(column, e)),
        }
    }

    fn date(&self, column: &str) -> Result<NaiveDate, StorageError> {
        self.opt_date(column)?
            .ok_or_else(|| self.error(column, "missing"))
    }

    fn opt_timestamp(&self, column: &str) -> Result<Option<NaiveDateTime>, StorageError> {
        let Some(value) = self.present(column) else {
            return Ok(None);
        };
        let Value::String(s) = value else {
            return Err(self.error(column, format!("unexpected value {}", value)));
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Some(dt.naive_utc()));
        }
        TIMESTAMP_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
            .map(Some)
            .ok_or_else(|| self.error(column, format!("'{}' is not a timestamp", s)))
    }

    fn opt_code<T>(
        &self,
        column: &str,
        parse: fn(&str) -> Option<T>,
    ) -> Result<Option<T>, StorageError> {
        match self.present(column) {
            None => Ok(None),
            Some(_) => {
                let code = self.text(column)?;
                parse(code.trim())
                    .map(Some)
                    .ok_or_else(|| self.error(column, format!("unknown code '{}'", code)))
            }
        }
    }
}

impl PatientRecord {
    pub(crate) fn from_row(row: &Row) -> Result<Self, StorageError> {
        let r = RowReader::new(row, "person");
        Ok(Self {
            id: r.i64("pcode")?,
            name: r.text("pname")?,
            birth_date: r.opt_date("pbirth")?,
            id_prefix: r.opt_text("pidnum")?,
            id_suffix: r.opt_text("pidnum2")?,
            sex: r.opt_code("sex", Sex::parse)?,
            relation: r.opt_text("relation")?,
            family_code: r.opt_text("fcode")?,
            disabled: r.flag("crippled")?,
            benefit_restricted: r.flag("bohun")?,
            consent: r.flag("agree")?,
            last_checked: r.opt_timestamp("lastcheck")?,
        })
    }
}

impl FamilyCardRecord {
    pub(crate) fn from_row(row: &Row) -> Result<Self, StorageError> {
        let r = RowReader::new(row, "card");
        Ok(Self {
            family_code: r.text("fcode")?,
            head_name: r.opt_text("fname")?,
            head_id: r.opt_text("fidnum")?,
            begin_date: r.opt_date("begindate")?,
            end_date: r.opt_date("enddate")?,
            coverage: r.opt_code("caretype", CoverageType::parse)?,
            card_number: r.opt_text("cardnum")?,
            company: r.opt_text("company")?,
        })
    }
}

impl VitalRecord {
    pub(crate) fn from_row(row: &Row) -> Result<Self, StorageError> {
        let r = RowReader::new(row, "checkperson");
        Ok(Self {
            id: r.i64("id")?,
            patient_id: r.i64("pcode")?,
            measured_at: r.opt_timestamp("measured_at")?,
            weight: r.opt_f64("weight")?,
            height: r.opt_f64("height")?,
            temperature: r.opt_f64("temperatur")?,
            pulse: r.opt_i64("pulse")?,
            systolic: r.opt_i64("systolic")?,
            diastolic: r.opt_i64("diastolic")?,
        })
    }
}

impl PaymentRecord {
    pub(crate) fn from_row(row: &Row) -> Result<Self, StorageError> {
        let r = RowReader::new(row, "feelog");
        Ok(Self {
            id: r.i64("id")?,
            patient_id: r.i64("pcode")?,
            visit_date: r.date("visidate")?,
            outstanding: r.opt_i64("misu")?.unwrap_or(0),
            settled_full: r.opt_i64("whanbul")?.unwrap_or(0),
            settled_partial: r.opt_i64("whansu")?.unwrap_or(0),
        })
    }
}
