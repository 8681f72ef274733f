//! End-to-end batch translation through the router against a mocked translator API

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use translation_proxy::core::credentials::SecretKey;
use translation_proxy::server::api::{create_router, AppState};
use translation_proxy::{Credentials, ProxyConfig};

fn credentials() -> Credentials {
    Credentials {
        translator_key: SecretKey::new("translator-key"),
        translator_region: "eastus".to_string(),
        tts_key: SecretKey::new("tts-key"),
    }
}

async fn translation(server: &MockServer, text: &str, translated: &str, delay: Duration) {
    Mock::given(method("POST"))
        .and(path("/translate"))
        .and(query_param("to", "pt"))
        .and(body_json(json!([{ "Text": text }])))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "translations": [{ "text": translated, "to": "pt" }] }]))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

async fn post_batch(config: &ProxyConfig, body: Value) -> (StatusCode, Value) {
    let app = create_router(AppState::from_config(config, &credentials()).unwrap());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/translate/batch")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_partial_failure_with_timeout() {
    let server = MockServer::start().await;
    translation(&server, "hello", "olá", Duration::ZERO).await;
    translation(&server, "world", "mundo", Duration::from_secs(3)).await;

    let config = ProxyConfig {
        translator_endpoint: server.uri(),
        item_timeout_ms: 300,
        ..Default::default()
    };

    let (status, body) = post_batch(&config, json!({ "texts": ["hello", "world"], "targetLang": "pt" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["results"][0],
        json!({ "index": 0, "success": true, "originalText": "hello", "translatedText": "olá" })
    );
    assert_eq!(body["results"][1]["index"], json!(1));
    assert_eq!(body["results"][1]["success"], json!(false));
    assert!(body["results"][1]["error"].is_string());
    assert_eq!(
        body["summary"],
        json!({ "total": 2, "successful": 1, "failed": 1, "successRatePercent": "50.00%" })
    );
}

#[tokio::test]
async fn test_upstream_error_status_is_reported_per_item() {
    let server = MockServer::start().await;
    translation(&server, "hello", "olá", Duration::ZERO).await;
    Mock::given(method("POST"))
        .and(body_json(json!([{ "Text": "bad" }])))
        .respond_with(ResponseTemplate::new(429).set_body_string("too many requests"))
        .mount(&server)
        .await;

    let config = ProxyConfig {
        translator_endpoint: server.uri(),
        ..Default::default()
    };

    let (status, body) = post_batch(&config, json!({ "texts": ["bad", "hello"], "targetLang": "pt" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["statusCode"], json!(429));
    assert_eq!(body["results"][1]["translatedText"], json!("olá"));
    assert_eq!(body["summary"]["successRatePercent"], json!("50.00%"));
}

#[tokio::test]
async fn test_oversized_batch_never_reaches_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "translations": [{ "text": "x" }] }])))
        .expect(0)
        .mount(&server)
        .await;

    let config = ProxyConfig {
        translator_endpoint: server.uri(),
        ..Default::default()
    };
    let texts: Vec<String> = (0..26).map(|i| format!("text {}", i)).collect();

    let (status, body) = post_batch(&config, json!({ "texts": texts, "targetLang": "pt" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("25"));
}
