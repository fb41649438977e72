use crate::normalize::{CoverageType, Sex};
use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Canonical patient fields. Optional fields are written as NULL when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientFields {
    pub name: String,
    pub birth_date: NaiveDate,
    pub id_prefix: Option<String>,
    pub id_suffix: Option<String>,
    pub sex: Sex,
    pub relation: Option<String>,
    pub family_code: Option<String>,
    pub disabled: bool,
    pub benefit_restricted: bool,
    pub consent: bool,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PatientRecord {
    #[serde(rename = "pcode")]
    pub id: i64,
    #[serde(rename = "pname")]
    pub name: String,
    #[serde(rename = "pbirth")]
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "pidnum")]
    pub id_prefix: Option<String>,
    #[serde(rename = "pidnum2")]
    pub id_suffix: Option<String>,
    pub sex: Option<Sex>,
    pub relation: Option<String>,
    #[serde(rename = "fcode")]
    pub family_code: Option<String>,
    #[serde(rename = "crippled")]
    pub disabled: bool,
    #[serde(rename = "bohun")]
    pub benefit_restricted: bool,
    #[serde(rename = "agree")]
    pub consent: bool,
    #[serde(rename = "lastcheck")]
    pub last_checked: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardFields {
    pub family_code: String,
    pub head_name: Option<String>,
    pub head_id: Option<String>,
    pub begin_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub coverage: Option<CoverageType>,
    pub card_number: Option<String>,
    pub company: Option<String>,
}

/// The insurance card slot of a family. There is at most one per family code.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FamilyCardRecord {
    #[serde(rename = "fcode")]
    pub family_code: String,
    #[serde(rename = "fname")]
    pub head_name: Option<String>,
    #[serde(rename = "fidnum")]
    pub head_id: Option<String>,
    #[serde(rename = "begindate")]
    pub begin_date: Option<NaiveDate>,
    #[serde(rename = "enddate")]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "caretype")]
    pub coverage: Option<CoverageType>,
    #[serde(rename = "cardnum")]
    pub card_number: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VitalFields {
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub temperature: Option<f64>,
    pub pulse: Option<i64>,
    pub systolic: Option<i64>,
    pub diastolic: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct VitalRecord {
    pub id: i64,
    #[serde(rename = "pcode")]
    pub patient_id: i64,
    pub measured_at: Option<NaiveDateTime>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    #[serde(rename = "temperatur")]
    pub temperature: Option<f64>,
    pub pulse: Option<i64>,
    pub systolic: Option<i64>,
    pub diastolic: Option<i64>,
}

/// Amounts are in won. Absent amounts are recorded as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentFields {
    pub patient_id: i64,
    pub visit_date: Option<NaiveDate>,
    pub outstanding: Option<i64>,
    pub settled_full: Option<i64>,
    pub settled_partial: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    pub id: i64,
    pub patient_id: i64,
    pub visit_date: NaiveDate,
    pub outstanding: i64,
    pub settled_full: i64,
    pub settled_partial: i64,
}

impl PaymentRecord {
    pub fn total(&self) -> i128 {
        self.outstanding as i128 + self.settled_full as i128 + self.settled_partial as i128
    }
}

// The total is derived on every serialization and never stored.
impl Serialize for PaymentRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PaymentRecord", 7)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("pcode", &self.patient_id)?;
        state.serialize_field("visidate", &self.visit_date)?;
        state.serialize_field("misu", &self.outstanding)?;
        state.serialize_field("whanbul", &self.settled_full)?;
        state.serialize_field("whansu", &self.settled_partial)?;
        state.serialize_field("total", &self.total())?;
        state.end()
    }
}
