pub mod diag;
pub mod frases;
pub mod health;
pub mod listing;
pub mod upload;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let max_upload = state.config.max_upload_size as usize;

    let routes = Router::new()
        .route("/health", get(health::health))
        .route("/upload-comprovante", post(upload::upload_comprovante))
        .route("/list", get(listing::list_query))
        .route("/lista/{user_id}/{month}", get(listing::list_path))
        .route("/frases/{tag}", get(frases::frase))
        // Diagnostic endpoints, not part of the stable contract.
        .route("/diag/credentials", get(diag::credentials))
        .route("/diag/storage", get(diag::storage));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let x_request_id = http::HeaderName::from_static("x-request-id");

    routes
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_upload))
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
