//! Application state shared by handlers and middleware

use std::sync::Arc;

use super::proxy::Forwarder;
use crate::domain::{AccessPipeline, TokenStore};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AccessPipeline>,
    pub forwarder: Arc<dyn Forwarder>,
    /// Probed by the readiness check
    pub token_store: Arc<dyn TokenStore>,
}

impl AppState {
    pub fn new(
        pipeline: AccessPipeline,
        forwarder: Arc<dyn Forwarder>,
        token_store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            forwarder,
            token_store,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}
