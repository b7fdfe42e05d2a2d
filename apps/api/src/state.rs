use std::sync::Arc;

use crate::analysis::service::AnalysisService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub analysis: Arc<AnalysisService>,
}
