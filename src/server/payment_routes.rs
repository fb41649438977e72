//! Billing routes. Entries are append-only; the total is computed when a
//! record is serialized.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::error::{path_id, ClinicError};
use super::state::{GuardedReconciler, ServerState};
use crate::normalize::normalize_payment;
use crate::reconcile::WriteResult;
use crate::records::PaymentRecord;

#[derive(Serialize)]
struct PaymentResponse {
    payment: PaymentRecord,
}

#[derive(Serialize)]
struct PaymentsResponse {
    payments: Vec<PaymentRecord>,
}

async fn save_payment(
    State(reconciler): State<GuardedReconciler>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return ClinicError::from(rejection).into_response(),
    };
    let fields = match normalize_payment(&body) {
        Ok(fields) => fields,
        Err(errors) => return ClinicError::Validation(errors).into_response(),
    };

    match reconciler.append_payment(&fields).await {
        Ok(WriteResult::Written { record, .. }) => {
            debug!(
                "Recorded payment {} for patient {}",
                record.id, record.patient_id
            );
            Json(PaymentResponse { payment: record }).into_response()
        }
        Ok(WriteResult::NotFound) => {
            ClinicError::not_found("Patient", fields.patient_id).into_response()
        }
        Err(e) => ClinicError::storage("save payment", e).into_response(),
    }
}

async fn payment_history(
    State(reconciler): State<GuardedReconciler>,
    Path(id): Path<String>,
) -> Response {
    let patient_id = match path_id("pcode", &id) {
        Ok(patient_id) => patient_id,
        Err(e) => return e.into_response(),
    };

    match reconciler.payment_history(patient_id).await {
        Ok(payments) => Json(PaymentsResponse { payments }).into_response(),
        Err(e) => ClinicError::storage("load payment history", e).into_response(),
    }
}

pub fn payment_routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(save_payment))
        .route("/history/{patient_id}", get(payment_history))
}
