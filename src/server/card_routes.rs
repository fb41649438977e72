//! Family insurance card routes.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::error::ClinicError;
use super::state::{GuardedReconciler, ServerState};
use crate::normalize::{normalize_card, FieldError};
use crate::reconcile::WriteResult;
use crate::records::FamilyCardRecord;

#[derive(Serialize)]
struct CardResponse {
    card: FamilyCardRecord,
}

async fn save_card(
    State(reconciler): State<GuardedReconciler>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return ClinicError::from(rejection).into_response(),
    };
    let fields = match normalize_card(&body) {
        Ok(fields) => fields,
        Err(errors) => return ClinicError::Validation(errors).into_response(),
    };

    match reconciler.save_card(&fields).await {
        Ok((record, family_created)) => {
            if family_created {
                info!("Registered family {}", record.family_code);
            }
            Json(CardResponse { card: record }).into_response()
        }
        Err(e) => ClinicError::storage("save card", e).into_response(),
    }
}

/// The family code comes from the path; a body may repeat it but not
/// contradict it.
async fn update_card(
    State(reconciler): State<GuardedReconciler>,
    Path(family_code): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(mut body) = match body {
        Ok(body) => body,
        Err(rejection) => return ClinicError::from(rejection).into_response(),
    };
    if let Value::Object(map) = &mut body {
        match map.get("fcode").and_then(Value::as_str).map(str::trim) {
            Some(given) if !given.is_empty() && given != family_code => {
                return ClinicError::Validation(vec![FieldError::new(
                    "fcode",
                    format!("does not match family {} in the path", family_code),
                )])
                .into_response()
            }
            _ => {
                map.insert("fcode".to_string(), Value::String(family_code.clone()));
            }
        }
    }
    let fields = match normalize_card(&body) {
        Ok(fields) => fields,
        Err(errors) => return ClinicError::Validation(errors).into_response(),
    };

    match reconciler.update_card(&fields).await {
        Ok(WriteResult::Written { record, .. }) => {
            Json(CardResponse { card: record }).into_response()
        }
        Ok(WriteResult::NotFound) => ClinicError::not_found("Card", &family_code).into_response(),
        Err(e) => ClinicError::storage("update card", e).into_response(),
    }
}

async fn get_card(
    State(reconciler): State<GuardedReconciler>,
    Path(family_code): Path<String>,
) -> Response {
    match reconciler.get_card(&family_code).await {
        Ok(Some(card)) => Json(CardResponse { card }).into_response(),
        Ok(None) => ClinicError::not_found("Card", &family_code).into_response(),
        Err(e) => ClinicError::storage("load card", e).into_response(),
    }
}

pub fn card_routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(save_card))
        .route("/{fcode}", get(get_card).put(update_card))
}
