//! Middleware orchestration tests: rewrite, sign, bounded refresh-retry,
//! failure policy.

mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, HOST};
use axum::http::{request::Parts, Request, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::routing::any;
use axum::Router;
use tower::ServiceExt;

use common::FakeToolkit;
use spnego_gateway::auth::toolkit::SpnegoToolkit;
use spnego_gateway::config::schema::{FailurePolicy, SpnegoOutConfig};
use spnego_gateway::http::middleware::{spnego_out_middleware, SpnegoGateway};

type Seen = Arc<Mutex<Option<Parts>>>;

/// Records what the next handler in the chain received.
async fn recorder(State(seen): State<Seen>, req: Request<Body>) -> StatusCode {
    let (parts, _body) = req.into_parts();
    *seen.lock().unwrap() = Some(parts);
    StatusCode::OK
}

fn build_app(config: SpnegoOutConfig, toolkit: Arc<FakeToolkit>) -> (Router, Seen) {
    let gateway = Arc::new(
        SpnegoGateway::new(config, toolkit as Arc<dyn SpnegoToolkit>).unwrap(),
    );
    let seen: Seen = Arc::new(Mutex::new(None));
    let app = Router::new()
        .route("/{*path}", any(recorder))
        .route("/", any(recorder))
        .with_state(seen.clone())
        .layer(from_fn_with_state(gateway, spnego_out_middleware));
    (app, seen)
}

fn get(path_and_query: &str) -> Request<Body> {
    Request::builder().uri(path_and_query).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn rewritten_and_signed_on_first_attempt() {
    let toolkit = Arc::new(FakeToolkit::default());
    let (app, seen) = build_app(common::keytab_config("first-attempt"), toolkit.clone());

    let response = app
        .oneshot(get("/spnegohttp/foo.com:12345/a/b/c?x=1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parts = seen.lock().unwrap().take().unwrap();
    assert_eq!(parts.uri.authority().unwrap().as_str(), "foo.com:12345");
    assert_eq!(parts.uri.path(), "/a/b/c");
    assert_eq!(parts.uri.query(), Some("x=1"));
    assert_eq!(parts.headers.get(HOST).unwrap(), "foo.com:12345");
    // initial acquire produced credential 0
    assert_eq!(parts.headers.get(AUTHORIZATION).unwrap(), "Negotiate fake-token-0");
    assert_eq!(toolkit.acquire_calls.load(Ordering::SeqCst), 1);
    assert_eq!(toolkit.sign_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn sign_failure_triggers_one_refresh_and_one_retry() {
    let toolkit = Arc::new(FakeToolkit::default());
    let (app, seen) = build_app(common::keytab_config("refresh-retry"), toolkit.clone());
    toolkit.reject_next_signs(1);

    let response = app
        .oneshot(get("/svc/upstream.example.com:9000/api"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parts = seen.lock().unwrap().take().unwrap();
    // second sign attempt used the refreshed credential (id 1)
    assert_eq!(parts.headers.get(AUTHORIZATION).unwrap(), "Negotiate fake-token-1");
    // exactly one refresh on top of the startup acquire, exactly two sign attempts
    assert_eq!(toolkit.acquire_calls.load(Ordering::SeqCst), 2);
    assert_eq!(toolkit.sign_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn both_attempts_failing_forwards_unsigned() {
    let toolkit = Arc::new(FakeToolkit::default());
    let (app, seen) = build_app(common::keytab_config("fail-open"), toolkit.clone());
    toolkit.reject_next_signs(2);

    let response = app.oneshot(get("/svc/upstream.example.com/api")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parts = seen.lock().unwrap().take().unwrap();
    assert!(parts.headers.get(AUTHORIZATION).is_none());
    assert_eq!(parts.uri.path(), "/api");
    assert_eq!(toolkit.sign_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn fail_closed_returns_bad_gateway_instead_of_forwarding() {
    let toolkit = Arc::new(FakeToolkit::default());
    let mut config = common::keytab_config("fail-closed");
    config.failure_policy = FailurePolicy::FailClosed;
    let (app, seen) = build_app(config, toolkit.clone());
    toolkit.reject_next_signs(2);

    let response = app.oneshot(get("/svc/upstream.example.com/api")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(seen.lock().unwrap().is_none(), "next handler must not run");
}

#[tokio::test]
async fn spn_override_applies_to_mapped_host_only() {
    let toolkit = Arc::new(FakeToolkit::default());
    let mut config = common::keytab_config("spn-override");
    config.spn_overrides.insert(
        "upstream.example.com:9000".into(),
        "HTTP/alias.example.com".into(),
    );
    let (app, _seen) = build_app(config, toolkit.clone());

    app.clone()
        .oneshot(get("/svc/upstream.example.com:9000/api"))
        .await
        .unwrap();
    app.oneshot(get("/svc/other.example.com/api")).await.unwrap();

    let spns = toolkit.seen_spns.lock().unwrap().clone();
    assert_eq!(
        spns,
        vec![Some("HTTP/alias.example.com".to_string()), None]
    );
}

#[tokio::test]
async fn out_of_bounds_segment_forwards_original_request() {
    let toolkit = Arc::new(FakeToolkit::default());
    let mut config = common::keytab_config("oob");
    config.target_host_segment = 3;
    let (app, seen) = build_app(config, toolkit.clone());

    let request = Request::builder()
        .uri("/a/b")
        .header(HOST, "origin.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parts = seen.lock().unwrap().take().unwrap();
    assert_eq!(parts.uri.path(), "/a/b");
    assert!(parts.uri.authority().is_none());
    // signing still happened, against the original Host header
    assert!(parts.headers.get(AUTHORIZATION).is_some());
}

#[tokio::test]
async fn segment_zero_signs_without_rerouting() {
    let toolkit = Arc::new(FakeToolkit::default());
    let mut config = common::keytab_config("segment-zero");
    config.target_host_segment = 0;
    config
        .spn_overrides
        .insert("origin.example.com".into(), "HTTP/mapped".into());
    let (app, seen) = build_app(config, toolkit.clone());

    let request = Request::builder()
        .uri("/keep/this/path")
        .header(HOST, "origin.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parts = seen.lock().unwrap().take().unwrap();
    assert_eq!(parts.uri.path(), "/keep/this/path");
    assert!(parts.headers.get(AUTHORIZATION).is_some());
    assert_eq!(
        toolkit.seen_spns.lock().unwrap().as_slice(),
        &[Some("HTTP/mapped".to_string())]
    );
}

#[tokio::test]
async fn startup_acquire_failure_heals_on_first_request() {
    let toolkit = Arc::new(FakeToolkit::default());
    toolkit.fail_acquire.store(true, Ordering::SeqCst);
    let (app, seen) = build_app(common::keytab_config("late-heal"), toolkit.clone());
    // store is empty; the keytab becomes usable before the first request
    toolkit.fail_acquire.store(false, Ordering::SeqCst);

    let response = app.oneshot(get("/svc/upstream.example.com/api")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parts = seen.lock().unwrap().take().unwrap();
    // first attempt had no credential and never reached the toolkit; the
    // per-request refresh then produced credential 1
    assert_eq!(parts.headers.get(AUTHORIZATION).unwrap(), "Negotiate fake-token-1");
    assert_eq!(toolkit.sign_calls.load(Ordering::SeqCst), 1);
    assert_eq!(toolkit.acquire_calls.load(Ordering::SeqCst), 2);
}
