//! HTTP front end of the Web2Cit service.
//!
//! | Route | |
//! |---|---|
//! | `GET /` | home page |
//! | `GET /translate` | query-string entrypoint |
//! | `GET /health` | liveness |
//! | `GET /home.js`, `/results.js`, `/style.css` | static assets |
//! | anything else | path-based entrypoint, `/[debug/][sandbox/<user>/]<url>` |
use std::any::Any;

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;
use tracing::error;

pub mod config;
pub mod handlers;
pub mod state;
pub mod views;

pub use config::{ServerArgs, WikiSettings};
pub use state::{AppState, builtin_catalog};

const STATIC_FILES: [&str; 3] = ["home.js", "results.js", "style.css"];

pub fn build_app(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::home))
        .route("/translate", get(handlers::translate))
        .route("/health", get(handlers::health));
    for file in STATIC_FILES {
        router = router.route_service(
            &format!("/{}", file),
            ServeFile::new(state.static_dir.join(file)),
        );
    }
    router
        .fallback(handlers::legacy)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn handle_panic(_panic: Box<dyn Any + Send + 'static>) -> Response {
    error!("Request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}
