//! Axum router construction for the talk server.
//!
//! Routes are matched on method and path; `{title}` segments are
//! percent-decoded by the `Path` extractor before reaching a handler.
//! Paths that match no route fall through to
//! [`dispatch::fallback`], which answers `405` under `/talks` and serves
//! static files everywhere else.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::dispatch;
use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the talk server.
///
/// The router includes:
/// - `GET /talks` -- talk list with conditional long polling
/// - `GET /talks/{title}` -- single talk
/// - `PUT /talks/{title}` -- create or replace a talk
/// - `DELETE /talks/{title}` -- delete a talk
/// - `POST /talks/{title}/comments` -- add a comment
/// - anything else -- static files from the configured root
///
/// CORS is configured to allow any origin for development.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    let api = Router::new()
        .route("/talks", get(handlers::list_talks))
        .route(
            "/talks/{title}",
            get(handlers::get_talk)
                .put(handlers::put_talk)
                .delete(handlers::delete_talk),
        )
        .route("/talks/{title}/comments", post(handlers::post_comment))
        .method_not_allowed_fallback(dispatch::method_not_allowed)
        .fallback(dispatch::fallback);

    dispatch::with_panic_boundary(api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
