//! Request dispatch boundary.
//!
//! Wraps the `/talks` routes with the behaviour that sits between the wire
//! and the handlers:
//!
//! - a handler that panics is turned into a `500` whose body carries the
//!   panic message, and the process keeps serving,
//! - a path under `/talks` with no route for its method answers `405`,
//! - every other path is handed to the static file server rooted at the
//!   configured directory.

use std::any::Any;
use std::convert::Infallible;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;

use crate::error::ApiError;
use crate::state::AppState;

/// Path prefix owned by the talk API.
pub const TALKS_PREFIX: &str = "/talks";

/// Whether `path` belongs to the talk API rather than the static files.
pub fn is_talks_path(path: &str) -> bool {
    path == TALKS_PREFIX
        || path
            .strip_prefix(TALKS_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Install the panic boundary on a router.
pub fn with_panic_boundary<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(CatchPanicLayer::custom(panic_response))
}

/// Map a caught panic payload to a `500` response.
fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let description = payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|s| (*s).to_owned()))
        .unwrap_or_else(|| String::from("handler panicked"));
    ApiError::Internal(description).into_response()
}

/// Route a request that matched no registered route.
///
/// `/talks` paths answer `405`; anything else goes to the static files.
pub async fn fallback(State(state): State<Arc<AppState>>, request: Request) -> Response {
    if is_talks_path(request.uri().path()) {
        return unsupported(request.method(), request.uri().path());
    }
    serve_static(&state, request).await
}

/// Answer a known `/talks` path requested with an unsupported method.
pub async fn method_not_allowed(request: Request) -> Response {
    unsupported(request.method(), request.uri().path())
}

fn unsupported(method: &Method, path: &str) -> Response {
    ApiError::UnsupportedMethod {
        method: method.to_string(),
        path: path.to_owned(),
    }
    .into_response()
}

async fn serve_static(state: &AppState, request: Request) -> Response {
    let result: Result<_, Infallible> = ServeDir::new(state.static_root()).oneshot(request).await;
    match result {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
