//! REST endpoint handlers for the talk API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/talks` | All talks, conditional on `If-None-Match`, may stall on `Prefer: wait=N` |
//! | `GET` | `/talks/{title}` | Single talk |
//! | `PUT` | `/talks/{title}` | Create or replace a talk |
//! | `DELETE` | `/talks/{title}` | Delete a talk (idempotent) |
//! | `POST` | `/talks/{title}/comments` | Append a comment |

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use skillshare_types::{Comment, TalkSubmission};

use crate::error::ApiError;
use crate::state::{AppState, PollOutcome, PollRequest, PollResolution};
use crate::store::{Snapshot, decode_body};

// ---------------------------------------------------------------------------
// Conditional request headers
// ---------------------------------------------------------------------------

/// Versions named by an `If-None-Match` value such as `"3"` or
/// `"3", W/"4"`. Tags that are not quoted decimal numbers are skipped.
pub fn parse_if_none_match(value: &str) -> Vec<u64> {
    value
        .split(',')
        .filter_map(|tag| {
            let tag = tag.trim();
            let tag = tag.strip_prefix("W/").unwrap_or(tag);
            tag.strip_prefix('"')?.strip_suffix('"')?.parse().ok()
        })
        .collect()
}

/// The `wait=<seconds>` preference of a `Prefer` value, if any.
pub fn parse_prefer_wait(value: &str) -> Option<Duration> {
    value
        .split([',', ';'])
        .filter_map(|pref| pref.trim().strip_prefix("wait="))
        .find_map(|secs| secs.trim().parse().ok())
        .map(Duration::from_secs)
}

/// Build a [`PollRequest`] from request headers.
pub fn poll_request(headers: &HeaderMap) -> PollRequest {
    let known_versions = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(parse_if_none_match)
        .unwrap_or_default();
    let wait = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_prefer_wait);
    PollRequest {
        known_versions,
        wait,
    }
}

/// `200` with the talk array and its `ETag`.
fn snapshot_response(snapshot: &Snapshot) -> Response {
    (
        StatusCode::OK,
        [(header::ETAG, snapshot.etag())],
        Json(snapshot.talks.as_slice()),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /talks
// ---------------------------------------------------------------------------

/// Return all talks, or `304` if the client already has the current
/// version. With `Prefer: wait=N` a current client is held until the
/// next change or for `N` seconds.
pub async fn list_talks(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let request = poll_request(&headers);
    match state.poll(&request) {
        PollOutcome::Fresh(snapshot) => snapshot_response(&snapshot),
        PollOutcome::NotModified => StatusCode::NOT_MODIFIED.into_response(),
        PollOutcome::Waiting(pending) => match pending.resolve().await {
            PollResolution::Woken(snapshot) => snapshot_response(&snapshot),
            PollResolution::TimedOut => StatusCode::NOT_MODIFIED.into_response(),
        },
    }
}

// ---------------------------------------------------------------------------
// /talks/{title}
// ---------------------------------------------------------------------------

/// Return a single talk.
pub async fn get_talk(
    State(state): State<Arc<AppState>>,
    Path(title): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.talk(&title)?))
}

/// Create a talk, or replace it (dropping its comments).
///
/// Body: `{"presenter": string, "summary": string}`.
pub async fn put_talk(
    State(state): State<Arc<AppState>>,
    Path(title): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let submission: TalkSubmission = decode_body(&body)?;
    state.put_talk(&title, &submission)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a talk. Succeeds whether or not the talk existed.
pub async fn delete_talk(
    State(state): State<Arc<AppState>>,
    Path(title): Path<String>,
) -> StatusCode {
    state.delete_talk(&title);
    StatusCode::NO_CONTENT
}

// ---------------------------------------------------------------------------
// POST /talks/{title}/comments
// ---------------------------------------------------------------------------

/// Append a comment to a talk.
///
/// Body: `{"author": string, "message": string}`.
pub async fn post_comment(
    State(state): State<Arc<AppState>>,
    Path(title): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let comment: Comment = decode_body(&body)?;
    state.add_comment(&title, &comment)?;
    Ok(StatusCode::NO_CONTENT)
}
