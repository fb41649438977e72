//! Patient registration routes.
//!
//! - `POST /patients` creates a patient, or replaces one when the body has a `pcode`
//! - `GET|PUT|DELETE /patients/{id}`
//! - `GET /patients?keyword=` searches names and resident id prefixes
//! - `GET /patients/search?pname=` searches names only

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::error::{path_id, ClinicError};
use super::state::{GuardedReconciler, ServerState};
use crate::normalize::{normalize_patient, FieldError};
use crate::reconcile::{Target, WriteResult};
use crate::records::PatientRecord;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct KeywordQuery {
    #[serde(default)]
    pub keyword: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    #[serde(default)]
    pub pname: Option<String>,
}

#[derive(Serialize)]
struct PatientResponse {
    patient: PatientRecord,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SavedPatientResponse {
    patient: PatientRecord,
    is_new: bool,
}

#[derive(Serialize)]
struct PatientsResponse {
    patients: Vec<PatientRecord>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

// =============================================================================
// Handlers
// =============================================================================

async fn save_patient(
    State(reconciler): State<GuardedReconciler>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return ClinicError::from(rejection).into_response(),
    };
    let (pcode, fields) = match normalize_patient(&body) {
        Ok(normalized) => normalized,
        Err(errors) => return ClinicError::Validation(errors).into_response(),
    };
    let target = pcode.map(Target::Existing).unwrap_or(Target::New);

    match reconciler.save_patient(target, &fields).await {
        Ok(WriteResult::Written { record, is_new }) => {
            if is_new {
                info!("Registered patient {}", record.id);
            }
            Json(SavedPatientResponse {
                patient: record,
                is_new,
            })
            .into_response()
        }
        Ok(WriteResult::NotFound) => {
            ClinicError::not_found("Patient", pcode.unwrap_or_default()).into_response()
        }
        Err(e) => ClinicError::storage("save patient", e).into_response(),
    }
}

async fn get_patient(
    State(reconciler): State<GuardedReconciler>,
    Path(id): Path<String>,
) -> Response {
    let pcode = match path_id("pcode", &id) {
        Ok(pcode) => pcode,
        Err(e) => return e.into_response(),
    };

    match reconciler.get_patient(pcode).await {
        Ok(Some(patient)) => Json(PatientResponse { patient }).into_response(),
        Ok(None) => ClinicError::not_found("Patient", pcode).into_response(),
        Err(e) => ClinicError::storage("load patient", e).into_response(),
    }
}

async fn update_patient(
    State(reconciler): State<GuardedReconciler>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let pcode = match path_id("pcode", &id) {
        Ok(pcode) => pcode,
        Err(e) => return e.into_response(),
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return ClinicError::from(rejection).into_response(),
    };
    let fields = match normalize_patient(&body) {
        Ok((Some(body_pcode), _)) if body_pcode != pcode => {
            return ClinicError::Validation(vec![FieldError::new(
                "pcode",
                format!("does not match patient {} in the path", pcode),
            )])
            .into_response()
        }
        Ok((_, fields)) => fields,
        Err(errors) => return ClinicError::Validation(errors).into_response(),
    };

    match reconciler
        .save_patient(Target::Existing(pcode), &fields)
        .await
    {
        Ok(WriteResult::Written { record, .. }) => {
            Json(PatientResponse { patient: record }).into_response()
        }
        Ok(WriteResult::NotFound) => ClinicError::not_found("Patient", pcode).into_response(),
        Err(e) => ClinicError::storage("update patient", e).into_response(),
    }
}

async fn delete_patient(
    State(reconciler): State<GuardedReconciler>,
    Path(id): Path<String>,
) -> Response {
    let pcode = match path_id("pcode", &id) {
        Ok(pcode) => pcode,
        Err(e) => return e.into_response(),
    };

    match reconciler.delete_patient(pcode).await {
        Ok(Some(patient)) => {
            info!("Deleted patient {} ({})", patient.id, patient.name);
            Json(MessageResponse {
                message: format!("Patient {} deleted", pcode),
            })
            .into_response()
        }
        Ok(None) => ClinicError::not_found("Patient", pcode).into_response(),
        Err(e) => ClinicError::storage("delete patient", e).into_response(),
    }
}

async fn search_patients(
    State(reconciler): State<GuardedReconciler>,
    query: Result<Query<KeywordQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return ClinicError::from(rejection).into_response(),
    };
    let keyword = query.keyword.unwrap_or_default();
    let keyword = keyword.trim();
    debug!("Searching patients for '{}'", keyword);

    match reconciler.search_patients(keyword).await {
        Ok(patients) => Json(PatientsResponse { patients }).into_response(),
        Err(e) => ClinicError::storage("search patients", e).into_response(),
    }
}

async fn search_patients_by_name(
    State(reconciler): State<GuardedReconciler>,
    query: Result<Query<NameQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return ClinicError::from(rejection).into_response(),
    };
    let name = query.pname.unwrap_or_default();
    let name = name.trim();
    if name.is_empty() {
        return ClinicError::Validation(vec![FieldError::new("pname", "is required")])
            .into_response();
    }

    match reconciler.search_patients_by_name(name).await {
        Ok(patients) => Json(PatientsResponse { patients }).into_response(),
        Err(e) => ClinicError::storage("search patients", e).into_response(),
    }
}

// =============================================================================
// Router
// =============================================================================

pub fn patient_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(search_patients).post(save_patient))
        .route("/search", get(search_patients_by_name))
        .route(
            "/{id}",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
}
