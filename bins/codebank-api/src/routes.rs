use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(handlers::health_check))
        .route("/metrics", get(handlers::scrape_metrics))
        .route(
            "/api/problems",
            get(handlers::list_problems).post(handlers::create_problem),
        )
        .route(
            "/api/problems/:id",
            get(handlers::get_problem)
                .put(handlers::update_problem)
                .delete(handlers::delete_problem),
        )
        .route("/api/problems/:id/submissions", get(handlers::list_submissions))
        .route("/api/execute", post(handlers::execute_code))
        .route("/api/submit", post(handlers::submit_solution))
}
