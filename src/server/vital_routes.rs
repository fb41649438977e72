use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use super::error::{path_id, ClinicError};
use super::state::{GuardedReconciler, ServerState};
use crate::normalize::normalize_vital;
use crate::reconcile::WriteResult;
use crate::records::{VitalFields, VitalRecord};

#[derive(Serialize)]
struct VitalResponse {
    vital: VitalRecord,
}

fn read_request(
    id: &str,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(i64, VitalFields), ClinicError> {
    let patient_id = path_id("pcode", id)?;
    let Json(body) = body?;
    let fields = normalize_vital(&body).map_err(ClinicError::Validation)?;
    Ok((patient_id, fields))
}

async fn create_vital(
    State(reconciler): State<GuardedReconciler>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let (patient_id, fields) = match read_request(&id, body) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    match reconciler.append_vital(patient_id, &fields).await {
        Ok(WriteResult::Written { record, .. }) => {
            Json(VitalResponse { vital: record }).into_response()
        }
        Ok(WriteResult::NotFound) => ClinicError::not_found("Patient", patient_id).into_response(),
        Err(e) => ClinicError::storage("save vital signs", e).into_response(),
    }
}

/// Overwrites the patient's most recent measurement.
async fn update_vital(
    State(reconciler): State<GuardedReconciler>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let (patient_id, fields) = match read_request(&id, body) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    match reconciler.update_latest_vital(patient_id, &fields).await {
        Ok(WriteResult::Written { record, .. }) => {
            Json(VitalResponse { vital: record }).into_response()
        }
        Ok(WriteResult::NotFound) => {
            ClinicError::NotFound(format!("No vital signs recorded for patient {}", patient_id))
                .into_response()
        }
        Err(e) => ClinicError::storage("update vital signs", e).into_response(),
    }
}

async fn latest_vital(
    State(reconciler): State<GuardedReconciler>,
    Path(id): Path<String>,
) -> Response {
    let patient_id = match path_id("pcode", &id) {
        Ok(patient_id) => patient_id,
        Err(e) => return e.into_response(),
    };

    match reconciler.latest_vital(patient_id).await {
        Ok(Some(vital)) => Json(VitalResponse { vital }).into_response(),
        Ok(None) => {
            ClinicError::NotFound(format!("No vital signs recorded for patient {}", patient_id))
                .into_response()
        }
        Err(e) => ClinicError::storage("load vital signs", e).into_response(),
    }
}

pub fn vital_routes() -> Router<ServerState> {
    Router::new().route(
        "/{patient_id}",
        get(latest_vital).post(create_vital).put(update_vital),
    )
}
