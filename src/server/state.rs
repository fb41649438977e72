use axum::extract::FromRef;

use crate::persistence::Persistence;
use crate::reconcile::Reconciler;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedReconciler = Arc<Reconciler>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub reconciler: GuardedReconciler,
}

impl ServerState {
    pub fn new(config: ServerConfig, persistence: Arc<dyn Persistence>) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            reconciler: Arc::new(Reconciler::new(persistence)),
        }
    }
}

impl FromRef<ServerState> for GuardedReconciler {
    fn from_ref(input: &ServerState) -> Self {
        input.reconciler.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
