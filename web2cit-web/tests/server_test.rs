//! Integration tests for the HTTP server.
//!
//! Drives the router in-process with tower's `oneshot`, against the
//! recorded fixtures in `fixtures/example.json`.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt; // for oneshot()

use web2cit_translate::{JsonEnvelope, StaticEngine, StorageRoots};
use web2cit_web::handlers::HealthResponse;
use web2cit_web::{AppState, build_app, builtin_catalog};

const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../fixtures/example.json");

fn engine() -> StaticEngine {
    StaticEngine::from_file(Path::new(FIXTURES)).unwrap()
}

fn app(engine: &StaticEngine) -> axum::Router {
    let state = AppState::new(Arc::new(engine.clone()), builtin_catalog().unwrap()).unwrap();
    build_app(state)
}

async fn get(engine: &StaticEngine, uri: &str) -> Response {
    get_with_language(engine, uri, None).await
}

async fn get_with_language(engine: &StaticEngine, uri: &str, language: Option<&str>) -> Response {
    let mut request = Request::builder().uri(uri);
    if let Some(language) = language {
        request = request.header(header::ACCEPT_LANGUAGE, language);
    }
    app(engine)
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn content_type(response: &Response) -> &str {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let response = get(&engine(), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, "0.1.0");
}

#[tokio::test]
async fn home_page_is_localized() {
    let response = get(&engine(), "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(content_type(&response).starts_with("text/html"));
    let html = body_text(response).await;
    assert!(html.contains("<html lang=\"en\">"));
    assert!(html.contains("value=\"Extract\""));

    let response = get_with_language(&engine(), "/", Some("es-ES,es;q=0.9")).await;
    let html = body_text(response).await;
    assert!(html.contains("<html lang=\"es\">"));
    assert!(html.contains("value=\"Extraer\""));
}

#[tokio::test]
async fn serves_static_assets() {
    for path in ["/home.js", "/results.js", "/style.css"] {
        let response = get(&engine(), path).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", path);
    }
}

#[tokio::test]
async fn translate_json_end_to_end() {
    let engine = engine();
    let response = get(&engine, "/translate?url=https://example.com/article&format=json").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["info"]["apiVersion"], json!("1.0"));
    assert_eq!(
        body["info"]["config"],
        json!([
            {"path": "Web2Cit/data/com/example/templates.json", "revid": 101},
            {"path": "Web2Cit/data/com/example/patterns.json", "revid": 102}
        ])
    );
    let target = &body["data"]["targets"][0];
    assert_eq!(target["path"], json!("/article"));
    assert_eq!(target["pattern"], json!("/article*"));
    assert_eq!(
        target["results"][0]["template"],
        json!({"path": "/article", "label": "News article"})
    );
    assert_eq!(target["results"][0]["fields"].as_array().unwrap().len(), 2);
    assert!(body["data"].get("score").is_none());
    assert!(body.get("error").is_none());

    // the payload decodes back into the public types
    let envelope: JsonEnvelope = serde_json::from_value(body).unwrap();
    let field = &envelope.data.unwrap().targets[0].results[0].fields[1];
    assert_eq!(field.name, "title");
    assert_eq!(field.output, Some(vec!["Example".to_string()]));
    assert_eq!(engine.translate_calls(), 1);
}

#[tokio::test]
async fn tests_mode_reports_scores() {
    let response = get(
        &engine(),
        "/translate?url=https://example.com/article&format=json&tests=true",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["score"], json!(1.0));
    assert_eq!(body["data"]["targets"][0]["score"], json!(1.0));
    assert_eq!(
        body["data"]["targets"][0]["results"][0]["fields"][1],
        json!({"name": "title", "output": ["Example"], "test": ["Example"], "score": 1.0})
    );
    assert_eq!(body["info"]["config"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn mediawiki_rejects_debug_and_tests() {
    let engine = engine();
    for query in ["debug=true", "tests=true"] {
        let uri = format!(
            "/translate?url=https://example.com/article&format=mediawiki&{}",
            query
        );
        let response = get(&engine, &uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["name"], json!("IncompatibleOptionsError"));
        assert!(body.get("info").is_none());
    }
    assert_eq!(engine.translate_calls(), 0);
}

#[tokio::test]
async fn mediawiki_lists_citations() {
    let response = get(
        &engine(),
        "/translate?url=https://example.com/article&format=mediawiki",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body[0]["title"], json!("Example"));
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_sibling_paths_are_reported_per_target() {
    let response = get(&engine(), "/translate?domain=example.com&format=json").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let targets = body["data"]["targets"].as_array().unwrap();
    assert_eq!(targets.len(), 2);
    assert_eq!(targets[0]["path"], json!("/article"));
    assert!(targets[0].get("error").is_none());
    assert_eq!(targets[0]["results"].as_array().unwrap().len(), 1);
    assert_eq!(targets[1]["path"], json!("article"));
    assert_eq!(targets[1]["error"]["name"], json!("Invalid path error"));
}

#[tokio::test]
async fn unparseable_url_is_plain_text_400() {
    let response = get(&engine(), "/translate?url=not%20a%20url").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(content_type(&response).starts_with("text/plain"));
    let text = body_text(response).await;
    assert!(text.starts_with("Invalid target \"not a url\""), "{}", text);

    let response = get_with_language(&engine(), "/translate?url=not%20a%20url", Some("es")).await;
    let text = body_text(response).await;
    assert!(text.starts_with("Destino no válido \"not a url\""), "{}", text);
}

#[tokio::test]
async fn invalid_queries() {
    let response = get(&engine(), "/translate?format=json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["info"], json!({"apiVersion": "1.0"}));
    assert_eq!(body["error"]["name"], json!("InvalidQueryError"));

    let response = get(
        &engine(),
        "/translate?url=https://example.com/&domain=example.com&format=mediawiki",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["name"], json!("InvalidQueryError"));

    let response = get(&engine(), "/translate?url=a&url=b").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(content_type(&response).starts_with("text/plain"));
}

#[tokio::test]
async fn invalid_domain_is_400() {
    let response = get(&engine(), "/translate?domain=bad_domain&format=json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["name"], json!("InvalidDomainError"));
}

#[tokio::test]
async fn no_translation_is_404() {
    let engine = engine();
    let response = get(&engine, "/translate?domain=example.com&path=/nothing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(content_type(&response).starts_with("text/html"));
    let html = body_text(response).await;
    assert!(html.contains("No citation could be produced for example.com."));

    let response = get(
        &engine,
        "/translate?domain=example.com&path=/nothing&format=json",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(
        body["data"]["targets"][0]["error"]["name"],
        json!("NoApplicableTemplateError")
    );
}

#[tokio::test]
async fn no_valid_paths_is_404() {
    let engine = engine();
    let response = get(&engine, "/translate?domain=example.com&path=article&format=json").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(
        body["data"]["targets"][0]["error"]["name"],
        json!("Invalid path error")
    );
    assert!(body["info"].get("config").is_none());
    assert_eq!(engine.translate_calls(), 0);

    let response = get(&engine, "/translate?domain=example.com&path=article").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(content_type(&response).starts_with("text/plain"));
}

#[tokio::test]
async fn upstream_status_is_reemitted() {
    let response = get(&engine(), "/translate?url=https://example.com/down&format=json").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(
        body["data"]["targets"][0]["error"]["name"],
        json!("HTTPResponseError")
    );
}

#[tokio::test]
async fn sandbox_reads_user_configuration() {
    let engine = engine();
    let response = get(
        &engine,
        "/translate?url=https://example.com/article&format=json&sandbox=Alice",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["info"]["config"],
        json!([{"path": "User:Alice/Web2Cit/data/com/example/templates.json", "revid": 201}])
    );
    // no sandbox patterns yet
    assert!(body["data"]["targets"][0].get("pattern").is_none());

    let specs = engine.opened_specs();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].storage, StorageRoots::default().sandboxed("Alice"));
    assert_eq!(specs[0].name, "example.com");
}

#[tokio::test]
async fn citoid_requests_skip_the_fallback_template() {
    let engine = engine();
    let response = get(&engine, "/translate?url=https://www.example.org/&format=json").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(
        &engine,
        "/translate?url=https://www.example.org/&format=json&citoid=true",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn html_url_requests_redirect_to_legacy_path() {
    let engine = engine();
    let response = get(
        &engine,
        "/translate?url=https://example.com/article%23intro&debug=true&sandbox=Alice",
    )
    .await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers()[header::LOCATION],
        "/debug/sandbox/Alice/https://example.com/article"
    );
    assert_eq!(engine.translate_calls(), 0);

    // escaped path characters survive the round trip through the legacy path
    let response = get(&engine, "/translate?url=https://example.com/a%252Fb%3Fc%3D%252F").await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers()[header::LOCATION],
        "/https://example.com/a%252Fb?c=%2F"
    );

    // tests mode and domain queries are served directly
    let response = get(&engine, "/translate?url=https://example.com/article&tests=true").await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = get(&engine, "/translate?domain=example.com&path=/article").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn legacy_path_renders_results() {
    let response = get(&engine(), "/debug/https://example.com/article").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    // auto-escaping turns slashes into &#x2f;
    assert!(html.contains("<link rel=\"canonical\" href=\"https:&#x2f;&#x2f;example.com&#x2f;article\">"));
    assert!(html.contains("<meta property=\"z:title\" content=\"Example\">"));
    assert!(html.contains("<meta property=\"so:author\" content=\"Doe, Jane\">"));
    assert!(html.contains("<meta property=\"z:tags\" content=\"example\">"));
    assert!(!html.contains("property=\"z:key\""));
    assert!(html.contains("Debug information"));
    assert!(html.contains("revid 101"));
    assert!(html.contains("Template #1: News article"));
    assert!(html.contains("Pattern &quot;Articles&quot;: &#x2f;article*"));
    assert!(html.contains("Web2Cit&#x2f;data&#x2f;com&#x2f;example&#x2f;templates.json?action=edit\" target=\"_blank\">(edit)</a>"));
    // expected values only show in tests mode
    assert!(!html.contains("tests.json?action=edit"));

    let response = get(&engine(), "/translate?url=https://example.com/article&tests=true").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Web2Cit&#x2f;data&#x2f;com&#x2f;example&#x2f;templates.json?action=edit"));
    assert!(html.contains("Web2Cit&#x2f;data&#x2f;com&#x2f;example&#x2f;tests.json?action=edit\" target=\"_blank\">(edit)</a>"));
}

#[tokio::test]
async fn legacy_path_rejects_other_methods() {
    let response = app(&engine())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/https://example.com/article")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
