//! Integration tests for the streaming reverse proxy
//!
//! Each test wires the router to a wiremock backend and drives it with
//! tower's `oneshot`, checking model rewriting, passthrough behavior, and
//! error conversion.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;
use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

use rellama::config::ConfigStore;
use rellama::proxy::{AppState, create_router};

/// Build a router forwarding to `backend_url` with the given redirects.
///
/// The TempDir must stay alive for the duration of the test so the config
/// file is not deleted out from under the store.
fn router_for(backend_url: &str, redirects: &[(&str, &str)]) -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let config = ConfigStore::new(dir.path().join("config.json"));
    config.set_url(backend_url).unwrap();
    for (source, destination) in redirects {
        config.set_redirect(source, destination).unwrap();
    }

    let state = Arc::new(AppState {
        config: Arc::new(config),
        client: reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap(),
    });

    (dir, create_router(state))
}

async fn body_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_generate_body_model_is_rewritten() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/api/generate"))
        .and(matchers::body_json(serde_json::json!({
            "model": "bar",
            "prompt": "hi"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"done\":true}\n"))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, app) = router_for(&server.uri(), &[("foo", "bar")]);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/generate")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"model":"foo","prompt":"hi"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_tags_body_is_not_rewritten() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/api/tags"))
        .and(matchers::body_json(serde_json::json!({ "model": "foo" })))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, app) = router_for(&server.uri(), &[("foo", "bar")]);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/tags")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"model":"foo"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_status_and_headers_forwarded_unchanged() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("GET"))
        .and(matchers::path("/api/version"))
        .respond_with(
            ResponseTemplate::new(418)
                .insert_header("x-backend-flavor", "teapot")
                .set_body_string("short and stout"),
        )
        .mount(&server)
        .await;

    let (_dir, app) = router_for(&server.uri(), &[]);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/version")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(
        response.headers().get("x-backend-flavor").unwrap(),
        "teapot"
    );
    assert_eq!(body_string(response.into_body()).await, "short and stout");
}

#[tokio::test]
async fn test_ndjson_stream_relayed_in_order() {
    let lines = "{\"response\":\"a\",\"done\":false}\n\
                 {\"response\":\"b\",\"done\":false}\n\
                 {\"response\":\"c\",\"done\":true}\n";

    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/x-ndjson")
                .set_body_string(lines),
        )
        .mount(&server)
        .await;

    let (_dir, app) = router_for(&server.uri(), &[]);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/generate")
                .body(Body::from(r#"{"model":"m","prompt":"p"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, lines);
}

#[tokio::test]
async fn test_unparseable_generate_body_forwarded_as_is() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/api/generate"))
        .and(matchers::body_string("definitely not json"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, app) = router_for(&server.uri(), &[("foo", "bar")]);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/generate")
                .body(Body::from("definitely not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    // The backend's rejection comes through, not a proxy-side failure.
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_api_prefix_is_stripped_case_insensitively() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("GET"))
        .and(matchers::path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"models\":[]}"))
        .expect(2)
        .mount(&server)
        .await;

    let (_dir, app) = router_for(&server.uri(), &[]);

    for uri in ["/api/tags", "/API/tags"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "uri {uri}");
    }
}

#[tokio::test]
async fn test_repeated_request_header_values_all_forwarded() {
    struct BothCookies;

    impl wiremock::Match for BothCookies {
        fn matches(&self, request: &wiremock::Request) -> bool {
            let values: Vec<_> = request.headers.get_all("cookie").iter().collect();
            values.len() == 2 && values[0] == "a=1" && values[1] == "b=2"
        }
    }

    let server = MockServer::start().await;
    Mock::given(matchers::method("GET"))
        .and(matchers::path("/api/tags"))
        .and(BothCookies)
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"models\":[]}"))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, app) = router_for(&server.uri(), &[]);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/tags")
                .header("cookie", "a=1")
                .header("cookie", "b=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unreachable_backend_returns_500_with_error_text() {
    // Port 9 (discard) is a safe nothing-listens-here target.
    let (_dir, app) = router_for("http://127.0.0.1:9", &[]);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/tags")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = body_string(response.into_body()).await;
    assert!(text.contains("Network error"), "body was: {text}");
}
