use axum::{Router, extract::DefaultBodyLimit, http::StatusCode, response::IntoResponse, routing::get};

use crate::{modules, web::AppState};

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config().max_upload_bytes;

    Router::new()
        .route("/healthz", get(healthz))
        .merge(modules::grader::router())
        .merge(modules::extractor::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}
