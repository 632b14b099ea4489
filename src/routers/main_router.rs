use std::{any::Any, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer,
    timeout::TimeoutLayer,
};

use crate::{
    docs::openapi_json,
    errors::code_error::{CodeError, code_err},
    handlers::{fallback::fallback_handler, root::root_handler, verify::verify_handler},
    init::state::ServerState,
};

use super::middleware::logging::log_middleware;

const MAX_REQUEST_SIZE: usize = 1024 * 16; // 16KB, a JSON body with one address

fn panic_to_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else {
        String::from("handler panicked")
    };

    code_err(CodeError::INTERNAL_SERVER_ERROR, detail).into_response()
}

fn request_timeout_layer(request_timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout)
}

pub fn build_router(state: Arc<ServerState>, request_timeout: Duration) -> axum::Router {
    let log_middleware = from_fn_with_state(state.clone(), log_middleware);
    let compression_middleware = CompressionLayer::new().gzip(true);
    let cors_layer = CorsLayer::very_permissive();

    Router::new()
        .route("/", get(root_handler))
        .route("/verify", post(verify_handler))
        .route("/api-docs/openapi.json", get(openapi_json))
        .fallback(fallback_handler)
        .layer(CatchPanicLayer::custom(panic_to_response))
        .layer(request_timeout_layer(request_timeout))
        .layer(compression_middleware)
        .layer(log_middleware)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_SIZE))
        .layer(cors_layer)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, header::CONTENT_TYPE},
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::init::config::VerifierConfig;

    fn test_router() -> Router {
        let state = Arc::new(
            ServerState::builder()
                .app_name_version("email-verifier test".to_owned())
                .server_start_time(tokio::time::Instant::now())
                .verifier_config(VerifierConfig::default())
                .build()
                .unwrap(),
        );
        build_router(state, Duration::from_secs(60))
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        assert!(response.headers().get("x-error-detail").is_none());
        assert!(response.headers().get("x-server-name").is_some());

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    fn post_verify(body: &'static str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/verify")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn health_check() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, json) = send(test_router(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "email_verifier");
    }

    #[tokio::test]
    async fn verify_rejects_bad_bodies() {
        let cases = [
            ("", "No JSON data provided"),
            ("{}", "No JSON data provided"),
            (r#"{"foo": "bar"}"#, "Email field is required"),
            (r#"{"email": 5}"#, "Email must be a string"),
            (r#"["a@b.com"]"#, "JSON body must be an object"),
        ];

        for (body, expected) in cases {
            let (status, json) = send(test_router(), post_verify(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body:?}");
            assert_eq!(json["error"], expected, "body {body:?}");
            assert_eq!(json["success"], false);
        }
    }

    #[tokio::test]
    async fn verify_bad_syntax_is_invalid_without_network() {
        let (status, json) =
            send(test_router(), post_verify(r#"{"email": "not-an-email"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!({
                "email": "not-an-email",
                "syntax": false,
                "mx": false,
                "smtp_accepts": false,
                "catch_all": false,
                "status": "invalid",
            })
        );
    }

    #[tokio::test]
    async fn verify_does_not_require_json_content_type() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/verify")
            .body(Body::from(r#"{"email": "nope"}"#))
            .unwrap();
        let (status, json) = send(test_router(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "invalid");
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let request = Request::builder()
            .uri("/wp-login.php")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(test_router(), request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Invalid path!");
    }

    #[tokio::test]
    async fn openapi_lists_verify() {
        let request = Request::builder()
            .uri("/api-docs/openapi.json")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(test_router(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert!(json["paths"]["/verify"]["post"].is_object());
    }

    #[tokio::test]
    async fn get_on_verify_is_not_allowed() {
        let request = Request::builder()
            .uri("/verify")
            .body(Body::empty())
            .unwrap();
        let response = test_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn slow_request_times_out_with_408() {
        let router: Router = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "done"
                }),
            )
            .layer(request_timeout_layer(Duration::from_millis(20)));

        let request = Request::builder().uri("/slow").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let body = format!(r#"{{"email": "{}@example.com"}}"#, "a".repeat(MAX_REQUEST_SIZE));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/verify")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = test_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(response.headers().get("x-server-name").is_some());
    }
}
