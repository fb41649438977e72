//! Record kinds handled by the front desk.
//!
//! Each kind has a canonical field set (what a write carries after
//! normalization) and a record (what a read returns, including
//! server-assigned columns). Serialized names follow the legacy column names
//! the front-desk UI already speaks.

mod models;
mod row;

pub use models::{
    CardFields, FamilyCardRecord, PatientFields, PatientRecord, PaymentFields, PaymentRecord,
    VitalFields, VitalRecord,
};
