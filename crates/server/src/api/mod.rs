use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::{
        header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    routing::{get, post},
    Json, Router,
};
use relay::{relay, RelayError};
use shared::{
    domain::Language,
    protocol::{Notice, RelayResponse, SubmissionRequest},
};
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::warn;

use crate::app_state::AppState;

pub(crate) const MAX_BODY_BYTES: usize = 16 * 1024;

type Reply = (StatusCode, Json<RelayResponse>);

pub(crate) fn build_router(state: Arc<AppState>, relay_path: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/healthz", get(healthz))
        .route(
            relay_path,
            post(submit)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> Reply {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(RelayResponse::error(
            Notice::MethodNotAllowed.text(Language::default()),
        )),
    )
}

async fn submit(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubmissionRequest>, JsonRejection>,
) -> Reply {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_reply(&rejection),
    };

    let submission = request.into_submission();
    let language = submission.language;
    match relay(&state.relay, &submission).await {
        Ok(()) => (
            StatusCode::OK,
            Json(RelayResponse::success(Notice::Sent.text(language))),
        ),
        Err(err) => error_reply(&err, language),
    }
}

fn rejection_reply(rejection: &JsonRejection) -> Reply {
    warn!(
        error = %rejection.body_text(),
        status = %rejection.status(),
        "unreadable submission body"
    );
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(RelayResponse::error(
                Notice::BodyTooLarge.text(Language::default()),
            )),
        );
    }
    (
        StatusCode::BAD_REQUEST,
        Json(RelayResponse::error(
            Notice::MissingFields.text(Language::default()),
        )),
    )
}

// Relay errors are already logged with detail; the client only sees a localized notice.
fn error_reply(err: &RelayError, language: Language) -> Reply {
    if let RelayError::ValidationFailed(error) = err {
        return (
            StatusCode::BAD_REQUEST,
            Json(RelayResponse::error(Notice::from(*error).text(language))),
        );
    }
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(RelayResponse::error(Notice::DeliveryFailed.text(language))),
    )
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
