use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State, middleware, response::IntoResponse, routing::get, Json, Router,
};
use serde::Serialize;
use tower_http::services::ServeDir;
use tracing::info;

use super::card_routes::card_routes;
use super::patient_routes::patient_routes;
use super::payment_routes::payment_routes;
use super::vital_routes::vital_routes;
use super::{log_requests, state::ServerState, ServerConfig};
use crate::persistence::Persistence;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub backend: &'static str,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        backend: state.reconciler.backend_name(),
    };
    Json(stats)
}

pub fn make_app(config: ServerConfig, persistence: Arc<dyn Persistence>) -> Router {
    let state = ServerState::new(config.clone(), persistence);

    let api_routes: Router<ServerState> = Router::new()
        .nest("/patients", patient_routes())
        .nest("/cards", card_routes())
        .nest("/vitals", vital_routes())
        .nest("/payments", payment_routes());

    let home_router: Router<ServerState> = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new().route("/", get(home)),
    };

    home_router
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .with_state(state)
}

/// Serves the app until `shutdown` resolves.
pub async fn run_server<F>(
    config: ServerConfig,
    persistence: Arc<dyn Persistence>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let port = config.port;
    let app = make_app(config, persistence);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
