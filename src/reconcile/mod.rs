//! Upsert reconciliation.
//!
//! The [`Reconciler`] takes canonical field sets, decides how each one merges
//! with what is stored (see [`statements`] for the policy of every record
//! kind), runs the resulting statements against the persistence boundary and
//! hands back the record as stored.

pub mod statements;

pub use statements::{ConflictPolicy, Target, WritePlan};

use crate::persistence::{Persistence, QueryResult, Row, Statement, StorageError};
use crate::records::{
    CardFields, FamilyCardRecord, PatientFields, PatientRecord, PaymentFields, PaymentRecord,
    VitalFields, VitalRecord,
};
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tracing::debug;

/// Outcome of a write aimed at a record that may not exist.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteResult<T> {
    Written { record: T, is_new: bool },
    NotFound,
}

impl<T> WriteResult<T> {
    pub fn into_record(self) -> Option<T> {
        match self {
            WriteResult::Written { record, .. } => Some(record),
            WriteResult::NotFound => None,
        }
    }
}

type Decoder<T> = fn(&Row) -> Result<T, StorageError>;

pub struct Reconciler {
    persistence: Arc<dyn Persistence>,
}

impl Reconciler {
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self { persistence }
    }

    pub fn backend_name(&self) -> &'static str {
        self.persistence.backend_name()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    async fn first_row<T>(
        &self,
        statement: Statement,
        decode: Decoder<T>,
    ) -> Result<Option<T>, StorageError> {
        let result = self.persistence.execute(&statement).await?;
        result.rows.first().map(decode).transpose()
    }

    async fn all_rows<T>(
        &self,
        statement: Statement,
        decode: Decoder<T>,
    ) -> Result<Vec<T>, StorageError> {
        let result = self.persistence.execute(&statement).await?;
        result.rows.iter().map(decode).collect()
    }

    // =========================================================================
    // Patients
    // =========================================================================

    /// Creates a patient, or fully replaces an existing one.
    pub async fn save_patient(
        &self,
        target: Target<i64>,
        fields: &PatientFields,
    ) -> Result<WriteResult<PatientRecord>, StorageError> {
        let statement = statements::patient_write(fields, &target);
        let written = self.first_row(statement, PatientRecord::from_row).await?;
        match (written, target) {
            (Some(record), target) => {
                debug!("Saved patient {}", record.id);
                Ok(WriteResult::Written {
                    record,
                    is_new: target == Target::New,
                })
            }
            (None, Target::Existing(_)) => Ok(WriteResult::NotFound),
            (None, Target::New) => Err(StorageError::Decode {
                what: "person",
                reason: "insert returned no row".to_string(),
            }),
        }
    }

    pub async fn get_patient(&self, pcode: i64) -> Result<Option<PatientRecord>, StorageError> {
        self.first_row(statements::patient_by_id(pcode), PatientRecord::from_row)
            .await
    }

    /// Deletes the patient row only. Vitals, payments and the family card are
    /// kept.
    pub async fn delete_patient(&self, pcode: i64) -> Result<Option<PatientRecord>, StorageError> {
        self.first_row(statements::patient_delete(pcode), PatientRecord::from_row)
            .await
    }

    pub async fn search_patients(&self, keyword: &str) -> Result<Vec<PatientRecord>, StorageError> {
        self.all_rows(statements::patient_search(keyword), PatientRecord::from_row)
            .await
    }

    pub async fn search_patients_by_name(
        &self,
        name: &str,
    ) -> Result<Vec<PatientRecord>, StorageError> {
        self.all_rows(
            statements::patient_search_by_name(name),
            PatientRecord::from_row,
        )
        .await
    }

    // =========================================================================
    // Family cards
    // =========================================================================

    /// Registers the family when it is new and overwrites its card. The flag
    /// reports whether the family itself was created.
    pub async fn save_card(
        &self,
        fields: &CardFields,
    ) -> Result<(FamilyCardRecord, bool), StorageError> {
        let plan = statements::card_write(fields);
        let results = self
            .persistence
            .execute_in_transaction(&plan.statements)
            .await?;

        let family_created = results.first().map(|r| r.row_count > 0).unwrap_or(false);
        let card_row = results
            .last()
            .and_then(|result: &QueryResult| result.rows.first())
            .ok_or_else(|| StorageError::Decode {
                what: "card",
                reason: "upsert returned no row".to_string(),
            })?;
        let record = FamilyCardRecord::from_row(card_row)?;
        debug!(
            "Saved card for family {} (new family: {})",
            record.family_code, family_created
        );
        Ok((record, family_created))
    }

    /// Overwrites the card of a family that already has one.
    pub async fn update_card(
        &self,
        fields: &CardFields,
    ) -> Result<WriteResult<FamilyCardRecord>, StorageError> {
        let written = self
            .first_row(statements::card_update(fields), FamilyCardRecord::from_row)
            .await?;
        Ok(match written {
            Some(record) => WriteResult::Written {
                record,
                is_new: false,
            },
            None => WriteResult::NotFound,
        })
    }

    pub async fn get_card(
        &self,
        family_code: &str,
    ) -> Result<Option<FamilyCardRecord>, StorageError> {
        self.first_row(
            statements::card_by_family(family_code),
            FamilyCardRecord::from_row,
        )
        .await
    }

    // =========================================================================
    // Vitals
    // =========================================================================

    /// Records a new observation. `NotFound` when the patient does not exist.
    pub async fn append_vital(
        &self,
        patient_id: i64,
        fields: &VitalFields,
    ) -> Result<WriteResult<VitalRecord>, StorageError> {
        let written = self
            .first_row(
                statements::vital_append(patient_id, fields),
                VitalRecord::from_row,
            )
            .await?;
        Ok(match written {
            Some(record) => WriteResult::Written {
                record,
                is_new: true,
            },
            None => WriteResult::NotFound,
        })
    }

    /// Corrects the patient's most recent observation. `NotFound` when there
    /// is none.
    pub async fn update_latest_vital(
        &self,
        patient_id: i64,
        fields: &VitalFields,
    ) -> Result<WriteResult<VitalRecord>, StorageError> {
        let written = self
            .first_row(
                statements::vital_update_latest(patient_id, fields),
                VitalRecord::from_row,
            )
            .await?;
        Ok(match written {
            Some(record) => WriteResult::Written {
                record,
                is_new: false,
            },
            None => WriteResult::NotFound,
        })
    }

    pub async fn latest_vital(&self, patient_id: i64) -> Result<Option<VitalRecord>, StorageError> {
        self.first_row(statements::latest_vital(patient_id), VitalRecord::from_row)
            .await
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Appends a payment. `NotFound` when the patient does not exist.
    pub async fn append_payment(
        &self,
        fields: &PaymentFields,
    ) -> Result<WriteResult<PaymentRecord>, StorageError> {
        let written = self
            .first_row(
                statements::payment_append(fields, self.today()),
                PaymentRecord::from_row,
            )
            .await?;
        Ok(match written {
            Some(record) => WriteResult::Written {
                record,
                is_new: true,
            },
            None => WriteResult::NotFound,
        })
    }

    /// Most recent payments first, at most [`statements::HISTORY_LIMIT`].
    pub async fn payment_history(
        &self,
        patient_id: i64,
    ) -> Result<Vec<PaymentRecord>, StorageError> {
        self.all_rows(
            statements::payment_history(patient_id),
            PaymentRecord::from_row,
        )
        .await
    }
}
