//! Combines the per-module API routers into the unified application router.

use axum::Router;
use std::sync::Arc;

use crate::shared::state::AppState;

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crate::leads::configure_lead_routes())
        .merge(crate::activities::configure_activity_routes())
        .merge(crate::analytics::configure_analytics_routes())
        .merge(crate::calls::configure_call_routes())
        .merge(crate::workflows::configure_workflow_routes())
}
