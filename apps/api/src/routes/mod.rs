pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::ingestion::handlers as ingestion_handlers;
use crate::notifications::handlers as notification_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // The multipart body may legitimately carry a full batch of resumes;
    // intake streams it to staging, so this bounds the wire, not memory.
    let body_limit = state.config.max_files_per_batch * state.config.max_file_size_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Bulk upload API
        .route(
            "/api/v1/bulk-resume-upload",
            post(ingestion_handlers::handle_bulk_upload)
                .route_layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/api/v1/bulk-upload-jobs/:job_id/status",
            get(ingestion_handlers::handle_job_status),
        )
        .route(
            "/api/v1/bulk-upload-jobs/:job_id/error-report",
            get(ingestion_handlers::handle_error_report),
        )
        // Notifications API
        .route(
            "/api/v1/notifications/:user_id",
            get(notification_handlers::handle_list_notifications),
        )
        .route(
            "/api/v1/notifications/:id/read",
            patch(notification_handlers::handle_mark_read),
        )
        .with_state(state)
}
