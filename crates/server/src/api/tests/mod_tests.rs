use super::*;
use async_trait::async_trait;
use axum::{body, body::Body, http::Request};
use relay::{
    notification::NotificationSettings,
    provider::{Destination, MessagingProvider, ProviderError, ProviderReply},
    RelayContext,
};
use shared::protocol::ResponseStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tower::ServiceExt;

const TOKEN: &str = "7937:never-shown";

struct StubProvider {
    reply: Option<ProviderReply>,
    calls: AtomicUsize,
    texts: Mutex<Vec<String>>,
}

impl StubProvider {
    fn new(reply: Option<ProviderReply>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        })
    }

    fn ok() -> Arc<Self> {
        Self::new(Some(ProviderReply {
            ok: true,
            description: None,
        }))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessagingProvider for StubProvider {
    async fn send_message(
        &self,
        _destination: &Destination,
        text: &str,
    ) -> Result<ProviderReply, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().await.push(text.to_string());
        self.reply
            .clone()
            .ok_or_else(|| ProviderError::Http("connection refused".into()))
    }
}

fn test_app_with(provider: Arc<StubProvider>, bot_token: Option<&str>, path: &str) -> Router {
    let state = AppState {
        relay: RelayContext {
            provider,
            bot_token: bot_token.map(str::to_string),
            chat_id: Some("7704061401".into()),
            notification: NotificationSettings::default(),
        },
    };
    build_router(Arc::new(state), path)
}

fn test_app(provider: Arc<StubProvider>) -> Router {
    test_app_with(provider, Some(TOKEN), "/api/telegram")
}

fn post_json(path: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn read_envelope(response: axum::response::Response) -> (StatusCode, RelayResponse, String) {
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let raw = String::from_utf8(bytes.to_vec()).expect("utf8");
    let envelope: RelayResponse = serde_json::from_str(&raw).expect("json envelope");
    (status, envelope, raw)
}

#[tokio::test]
async fn healthz_reports_ok() {
    let app = test_app(StubProvider::ok());
    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn well_formed_submission_is_relayed() {
    let provider = StubProvider::ok();
    let app = test_app(provider.clone());

    let response = app
        .oneshot(post_json(
            "/api/telegram",
            serde_json::json!({ "name": "Ann", "contact": "ann@example.com", "message": "Hi" }),
        ))
        .await
        .expect("response");
    let (status, envelope, _) = read_envelope(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(envelope, RelayResponse::success("Заявка отправлена!"));
    assert_eq!(provider.calls(), 1);
    let texts = provider.texts.lock().await;
    assert!(texts[0].contains("Ann"));
    assert!(texts[0].contains("ann@example.com"));
}

#[tokio::test]
async fn empty_name_is_rejected_without_provider_call() {
    let provider = StubProvider::ok();
    let app = test_app(provider.clone());

    let response = app
        .oneshot(post_json(
            "/api/telegram",
            serde_json::json!({ "name": "", "contact": "123456" }),
        ))
        .await
        .expect("response");
    let (status, envelope, _) = read_envelope(response).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(envelope.status, ResponseStatus::Error);
    assert_eq!(envelope.message, "Имя и контакт обязательны");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn provider_rejection_is_reported_generically() {
    let provider = StubProvider::new(Some(ProviderReply {
        ok: false,
        description: Some("chat not found".into()),
    }));
    let app = test_app(provider.clone());

    let response = app
        .oneshot(post_json(
            "/api/telegram",
            serde_json::json!({ "name": "Ann", "contact": "ann@example.com" }),
        ))
        .await
        .expect("response");
    let (status, envelope, raw) = read_envelope(response).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        envelope.message,
        Notice::DeliveryFailed.text(Language::Ru)
    );
    assert!(!raw.contains("chat not found"));
    assert!(!raw.contains(TOKEN));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn transport_failure_is_a_server_error() {
    let provider = StubProvider::new(None);
    let app = test_app(provider.clone());

    let response = app
        .oneshot(post_json(
            "/api/telegram",
            serde_json::json!({ "name": "Ann", "phone": "89001234567" }),
        ))
        .await
        .expect("response");
    let (status, _, raw) = read_envelope(response).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!raw.contains("connection refused"));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn missing_credentials_fail_without_provider_call() {
    let provider = StubProvider::ok();
    let app = test_app_with(provider.clone(), None, "/api/telegram");

    let response = app
        .oneshot(post_json(
            "/api/telegram",
            serde_json::json!({ "name": "Ann", "contact": "ann@example.com" }),
        ))
        .await
        .expect("response");
    let (status, envelope, _) = read_envelope(response).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(envelope.status, ResponseStatus::Error);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn responses_follow_submission_language() {
    let app = test_app(StubProvider::ok());

    let ok = app
        .clone()
        .oneshot(post_json(
            "/api/telegram",
            serde_json::json!({ "name": "Ann", "email": "ann@example.com", "language": "en" }),
        ))
        .await
        .expect("response");
    let (_, envelope, _) = read_envelope(ok).await;
    assert_eq!(envelope.message, "Your request has been sent!");

    let invalid = app
        .oneshot(post_json(
            "/api/telegram",
            serde_json::json!({ "name": "Ann", "language": "en" }),
        ))
        .await
        .expect("response");
    let (status, envelope, _) = read_envelope(invalid).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(envelope.message, "Name and contact are required");
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let provider = StubProvider::ok();
    let app = test_app(provider.clone());

    let request = Request::post("/api/telegram")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let (status, envelope, _) = read_envelope(app.oneshot(request).await.expect("response")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(envelope.status, ResponseStatus::Error);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn other_methods_are_not_allowed() {
    let app = test_app(StubProvider::ok());

    let response = app
        .oneshot(
            Request::get("/api/telegram")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let response_headers = response.headers().clone();
    let (status, envelope, _) = read_envelope(response).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        response_headers["access-control-allow-headers"],
        "Content-Type"
    );
    assert_eq!(envelope, RelayResponse::error("Method not allowed"));
}

#[tokio::test]
async fn preflight_is_answered_with_permissive_cors() {
    let app = test_app(StubProvider::ok());

    let preflight = Request::options("/api/telegram")
        .header("origin", "https://portfolio.example")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(preflight).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
    let methods = response.headers()["access-control-allow-methods"]
        .to_str()
        .expect("methods");
    assert!(methods.contains("POST"));
    assert!(methods.contains("OPTIONS"));
    let headers = response.headers()["access-control-allow-headers"]
        .to_str()
        .expect("headers")
        .to_ascii_lowercase();
    assert!(headers.contains("content-type"));

    let bare = Request::options("/api/telegram")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(bare).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-methods"],
        "POST, OPTIONS"
    );
}

#[tokio::test]
async fn cross_origin_post_carries_cors_headers() {
    let app = test_app(StubProvider::ok());

    let mut request = post_json(
        "/api/telegram",
        serde_json::json!({ "name": "Ann", "contact": "ann@example.com" }),
    );
    request
        .headers_mut()
        .insert("origin", "https://portfolio.example".parse().expect("header"));
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
    assert_eq!(
        response.headers()["access-control-allow-methods"],
        "POST, OPTIONS"
    );
    assert_eq!(
        response.headers()["access-control-allow-headers"],
        "Content-Type"
    );
}

fn oversized_submission() -> String {
    serde_json::json!({
        "name": "Ann",
        "contact": "ann@example.com",
        "message": "x".repeat(MAX_BODY_BYTES),
    })
    .to_string()
}

#[tokio::test]
async fn oversized_body_is_refused_with_envelope() {
    let provider = StubProvider::ok();
    let app = test_app(provider.clone());

    let body = oversized_submission();
    let request = Request::post("/api/telegram")
        .header("content-type", "application/json")
        .header("content-length", body.len())
        .body(Body::from(body))
        .expect("request");
    let (status, envelope, _) = read_envelope(app.oneshot(request).await.expect("response")).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        envelope,
        RelayResponse::error(Notice::BodyTooLarge.text(Language::Ru))
    );
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn oversized_chunked_body_is_refused_with_envelope() {
    let provider = StubProvider::ok();
    let app = test_app(provider.clone());

    let body = oversized_submission().into_bytes();
    let (head, tail) = body.split_at(body.len() / 2);
    let chunks = vec![
        Ok::<_, std::io::Error>(head.to_vec()),
        Ok(tail.to_vec()),
    ];
    let request = Request::post("/api/telegram")
        .header("content-type", "application/json")
        .body(Body::from_stream(futures::stream::iter(chunks)))
        .expect("request");
    let (status, envelope, _) = read_envelope(app.oneshot(request).await.expect("response")).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(envelope.status, ResponseStatus::Error);
    assert_eq!(envelope.message, Notice::BodyTooLarge.text(Language::Ru));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn overlong_name_gets_its_own_notice() {
    let provider = StubProvider::ok();
    let app = test_app(provider.clone());

    let response = app
        .oneshot(post_json(
            "/api/telegram",
            serde_json::json!({ "name": "A".repeat(4100), "contact": "ann@example.com", "language": "en" }),
        ))
        .await
        .expect("response");
    let (status, envelope, _) = read_envelope(response).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(envelope.message, "Name or contact is too long");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn relay_path_is_configurable() {
    let provider = StubProvider::ok();
    let app = test_app_with(provider.clone(), Some(TOKEN), "/contact");

    let response = app
        .clone()
        .oneshot(post_json(
            "/contact",
            serde_json::json!({ "name": "Ann", "contact": "ann@example.com" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json(
            "/api/telegram",
            serde_json::json!({ "name": "Ann", "contact": "ann@example.com" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(provider.calls(), 1);
}
