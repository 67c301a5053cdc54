//! Integration tests for the talk API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. Long-poll timing runs on Tokio's paused clock.

#![allow(clippy::unwrap_used, clippy::panic, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use axum::routing::get;
use serde_json::{Value, json};
use skillshare_server::config::PollConfig;
use skillshare_server::dispatch;
use skillshare_server::router::build_router;
use skillshare_server::state::AppState;
use tower::ServiceExt;

fn make_state() -> Arc<AppState> {
    Arc::new(AppState::new())
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_to_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn put_talk(title: &str, body: &Value) -> Request<Body> {
    Request::put(format!("/talks/{title}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_comment(title: &str, body: &Value) -> Request<Body> {
    Request::post(format!("/talks/{title}/comments"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_talks(etag: Option<&str>, prefer: Option<&str>) -> Request<Body> {
    let mut builder = Request::get("/talks");
    if let Some(tag) = etag {
        builder = builder.header(header::IF_NONE_MATCH, tag);
    }
    if let Some(pref) = prefer {
        builder = builder.header("prefer", pref);
    }
    builder.body(Body::empty()).unwrap()
}

fn etag_of(response: &Response) -> String {
    response.headers()[header::ETAG].to_str().unwrap().to_owned()
}

// =========================================================================
// Talk resources
// =========================================================================

#[tokio::test]
async fn put_then_get_round_trips() {
    let router = build_router(make_state());

    let response = send(&router, put_talk("X", &json!({"presenter": "A", "summary": "B"}))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&router, Request::get("/talks/X").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    assert_eq!(
        body_to_json(response).await,
        json!({"title": "X", "presenter": "A", "summary": "B", "comments": []})
    );
}

#[tokio::test]
async fn titles_are_percent_decoded() {
    let state = make_state();
    let router = build_router(Arc::clone(&state));

    let response = send(
        &router,
        put_talk("How%20to%20Idle", &json!({"presenter": "Maureen", "summary": "Idling"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(state.talk("How to Idle").unwrap().presenter, "Maureen");
}

#[tokio::test]
async fn get_missing_talk_is_404() {
    let router = build_router(make_state());
    let response = send(&router, Request::get("/talks/nope").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_to_json(response).await;
    assert_eq!(json["status"], 404);
    assert_eq!(json["error"], "No talk 'nope' found");
}

#[tokio::test]
async fn put_with_malformed_json_is_400() {
    let state = make_state();
    let router = build_router(Arc::clone(&state));

    let request = Request::put("/talks/X").body(Body::from("{presenter")).unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.version(), 0);
}

#[tokio::test]
async fn put_with_invalid_fields_is_400() {
    let state = make_state();
    let router = build_router(Arc::clone(&state));

    for body in [
        json!({"presenter": "A"}),
        json!({"presenter": 1, "summary": "B"}),
        json!({"presenter": "", "summary": "B"}),
        json!(["A", "B"]),
    ] {
        let response = send(&router, put_talk("X", &body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
    }
    assert_eq!(state.version(), 0);
}

#[tokio::test]
async fn put_replace_resets_comments() {
    let state = make_state();
    let router = build_router(Arc::clone(&state));

    send(&router, put_talk("X", &json!({"presenter": "A", "summary": "B"}))).await;
    send(&router, post_comment("X", &json!({"author": "c", "message": "m"}))).await;
    send(&router, put_talk("X", &json!({"presenter": "A2", "summary": "B2"}))).await;

    let talk = state.talk("X").unwrap();
    assert_eq!(talk.presenter, "A2");
    assert!(talk.comments.is_empty());
    assert_eq!(state.version(), 3);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let state = make_state();
    let router = build_router(Arc::clone(&state));
    send(&router, put_talk("X", &json!({"presenter": "A", "summary": "B"}))).await;

    for _ in 0..2 {
        let request = Request::delete("/talks/X").body(Body::empty()).unwrap();
        let response = send(&router, request).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
    assert_eq!(state.version(), 2);

    let request = Request::delete("/talks/never-existed").body(Body::empty()).unwrap();
    assert_eq!(send(&router, request).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(state.version(), 2);
}

// =========================================================================
// Comments
// =========================================================================

#[tokio::test]
async fn comments_are_appended_in_order() {
    let router = build_router(make_state());
    send(&router, put_talk("X", &json!({"presenter": "A", "summary": "B"}))).await;

    let c1 = json!({"author": "Iman", "message": "first"});
    let c2 = json!({"author": "Jamal", "message": "second"});
    for comment in [&c1, &c2] {
        let response = send(&router, post_comment("X", comment)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let response = send(&router, Request::get("/talks/X").body(Body::empty()).unwrap()).await;
    let json = body_to_json(response).await;
    assert_eq!(json["comments"], json!([c1, c2]));
}

#[tokio::test]
async fn comment_on_missing_talk_is_404_without_version_bump() {
    let state = make_state();
    let router = build_router(Arc::clone(&state));

    let response = send(
        &router,
        post_comment("DoesNotExist", &json!({"author": "a", "message": "b"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(state.version(), 0);
}

#[tokio::test]
async fn invalid_comment_is_400() {
    let state = make_state();
    let router = build_router(Arc::clone(&state));
    send(&router, put_talk("X", &json!({"presenter": "A", "summary": "B"}))).await;

    let response = send(&router, post_comment("X", &json!({"author": "a"}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::post("/talks/X/comments").body(Body::from("not json")).unwrap();
    assert_eq!(send(&router, request).await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.version(), 1);
}

// =========================================================================
// Conditional GET and long polling
// =========================================================================

#[tokio::test]
async fn list_returns_snapshot_with_etag() {
    let router = build_router(make_state());
    send(&router, put_talk("b", &json!({"presenter": "P", "summary": "S"}))).await;
    send(&router, put_talk("a", &json!({"presenter": "P", "summary": "S"}))).await;

    let response = send(&router, get_talks(None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(etag_of(&response), "\"2\"");

    let json = body_to_json(response).await;
    let titles: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["a", "b"]);
}

#[tokio::test]
async fn stale_tag_gets_immediate_snapshot() {
    let router = build_router(make_state());
    send(&router, put_talk("X", &json!({"presenter": "P", "summary": "S"}))).await;

    let response = send(&router, get_talks(Some("\"0\""), Some("wait=90"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(etag_of(&response), "\"1\"");
}

#[tokio::test(start_paused = true)]
async fn current_tag_without_wait_is_304_immediately() {
    let router = build_router(make_state());

    let started = tokio::time::Instant::now();
    let response = send(&router, get_talks(Some("\"0\""), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn long_poll_wakes_on_mutation() {
    let state = make_state();
    let router = build_router(Arc::clone(&state));

    let poller = {
        let router = router.clone();
        tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            let response = send(&router, get_talks(Some("\"0\""), Some("wait=5"))).await;
            (response, started.elapsed())
        })
    };

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(state.pending_waiters(), 1);
    send(&router, put_talk("X", &json!({"presenter": "A", "summary": "B"}))).await;

    let (response, elapsed) = poller.await.unwrap();
    assert!(elapsed < Duration::from_secs(5));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(etag_of(&response), "\"1\"");
    let json = body_to_json(response).await;
    assert_eq!(json[0]["title"], "X");
    assert_eq!(state.pending_waiters(), 0);
}

#[tokio::test(start_paused = true)]
async fn long_poll_times_out_with_304() {
    let state = make_state();
    let router = build_router(Arc::clone(&state));

    let started = tokio::time::Instant::now();
    let response = send(&router, get_talks(Some("\"0\""), Some("wait=5"))).await;
    let elapsed = started.elapsed();

    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert!(elapsed >= Duration::from_secs(5));
    assert!(elapsed < Duration::from_secs(6));
    assert!(body_bytes(response).await.is_empty());
    assert_eq!(state.pending_waiters(), 0);
}

#[tokio::test(start_paused = true)]
async fn wait_is_capped_by_config() {
    let state = Arc::new(AppState::with_config(
        PollConfig { max_wait_secs: 3 },
        "./public".into(),
    ));
    let router = build_router(state);

    let started = tokio::time::Instant::now();
    let response = send(&router, get_talks(Some("\"0\""), Some("wait=90"))).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn all_waiters_receive_the_same_snapshot() {
    let state = make_state();
    let router = build_router(Arc::clone(&state));

    let pollers: Vec<_> = (0..3)
        .map(|_| {
            let router = router.clone();
            tokio::spawn(async move {
                let response = send(&router, get_talks(Some("\"0\""), Some("wait=30"))).await;
                (response.status(), etag_of(&response))
            })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(state.pending_waiters(), 3);
    send(&router, put_talk("X", &json!({"presenter": "A", "summary": "B"}))).await;

    for poller in pollers {
        assert_eq!(poller.await.unwrap(), (StatusCode::OK, String::from("\"1\"")));
    }
}

#[tokio::test(start_paused = true)]
async fn abandoned_long_poll_frees_waiter() {
    let state = make_state();
    let router = build_router(Arc::clone(&state));

    let poller = {
        let router = router.clone();
        tokio::spawn(async move { send(&router, get_talks(Some("\"0\""), Some("wait=60"))).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(state.pending_waiters(), 1);

    // Dropping the in-flight request is what the server sees when the
    // client closes its connection.
    poller.abort();
    let _ = poller.await;
    assert_eq!(state.pending_waiters(), 0);
}

#[tokio::test]
async fn released_waiters_answer_304() {
    let state = make_state();
    let router = build_router(Arc::clone(&state));

    let poller = {
        let router = router.clone();
        tokio::spawn(async move { send(&router, get_talks(Some("\"0\""), Some("wait=60"))).await })
    };
    while state.pending_waiters() == 0 {
        tokio::task::yield_now().await;
    }
    state.release_waiters();

    let response = poller.await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
}

// =========================================================================
// Dispatch boundary
// =========================================================================

#[tokio::test]
async fn unsupported_method_under_talks_is_405() {
    let router = build_router(make_state());

    let request = Request::patch("/talks/X").body(Body::empty()).unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let request = Request::post("/talks").body(Body::empty()).unwrap();
    assert_eq!(send(&router, request).await.status(), StatusCode::METHOD_NOT_ALLOWED);

    let request = Request::get("/talks/X/comments/extra").body(Body::empty()).unwrap();
    assert_eq!(send(&router, request).await.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn other_paths_go_to_static_files() {
    let router = build_router(Arc::new(AppState::with_config(
        PollConfig::default(),
        "/nonexistent-static-root".into(),
    )));

    let request = Request::get("/index.html").body(Body::empty()).unwrap();
    assert_eq!(send(&router, request).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn static_files_are_served_from_root() {
    let root = std::env::temp_dir().join(format!("skillshare-static-{}", std::process::id()));
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("index.html"), "<h1>Skill Sharing</h1>").unwrap();

    let router = build_router(Arc::new(AppState::with_config(
        PollConfig::default(),
        root.clone(),
    )));
    let request = Request::get("/index.html").body(Body::empty()).unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"<h1>Skill Sharing</h1>");

    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn handler_panic_becomes_500_and_server_keeps_serving() {
    async fn boom() -> StatusCode {
        panic!("store exploded")
    }
    let router: Router = dispatch::with_panic_boundary(Router::new().route("/talks/boom", get(boom)));

    let request = Request::get("/talks/boom").body(Body::empty()).unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_to_json(response).await;
    assert_eq!(json["error"], "store exploded");

    let request = Request::get("/talks/boom").body(Body::empty()).unwrap();
    assert_eq!(
        send(&router, request).await.status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
