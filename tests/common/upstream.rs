//! Stand-in for the remote database service.
//!
//! Speaks the same protocol as the real service (`POST /api/query`,
//! `POST /api/transaction`, `GET /health`) and runs the statements against
//! an in-memory SQLite database.

#![allow(dead_code)]

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use deskpro_server::persistence::{Persistence, SqlitePersistence, Statement};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Deserialize)]
struct TransactionBody {
    statements: Vec<Statement>,
}

#[derive(Clone)]
struct UpstreamState {
    db: Arc<SqlitePersistence>,
    failure: Option<StatusCode>,
    requests: Arc<AtomicUsize>,
}

impl UpstreamState {
    fn failure_response(&self) -> Option<Response> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.failure.map(|status| {
            (status, Json(json!({"message": "database is in maintenance"}))).into_response()
        })
    }
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn query(State(state): State<UpstreamState>, Json(statement): Json<Statement>) -> Response {
    if let Some(response) = state.failure_response() {
        return response;
    }
    match state.db.execute(&statement).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()}))).into_response(),
    }
}

async fn transaction(
    State(state): State<UpstreamState>,
    Json(body): Json<TransactionBody>,
) -> Response {
    if let Some(response) = state.failure_response() {
        return response;
    }
    match state.db.execute_in_transaction(&body.statements).await {
        Ok(results) => Json(json!({ "results": results })).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()}))).into_response(),
    }
}

pub struct FakeUpstream {
    pub base_url: String,
    requests: Arc<AtomicUsize>,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl FakeUpstream {
    /// A healthy service with an empty clinic database
    pub async fn spawn() -> Self {
        Self::spawn_with(None).await
    }

    /// A service whose health probe succeeds but whose queries all fail
    /// with `status`
    pub async fn spawn_failing(status: StatusCode) -> Self {
        Self::spawn_with(Some(status)).await
    }

    async fn spawn_with(failure: Option<StatusCode>) -> Self {
        let requests = Arc::new(AtomicUsize::new(0));
        let state = UpstreamState {
            db: Arc::new(SqlitePersistence::in_memory().expect("Failed to open in-memory db")),
            failure,
            requests: requests.clone(),
        };
        let app = Router::new()
            .route("/health", get(health))
            .route("/api/query", post(query))
            .route("/api/transaction", post(transaction))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Upstream failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            requests,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Number of query and transaction requests received so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for FakeUpstream {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
