use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request, Response, StatusCode},
    middleware::Next,
};
use tokio::time::Instant;
use tracing::{Level, debug};

use crate::{
    build_info::{AXUM_VERSION, BUILD_TIME},
    init::state::ServerState,
};

const ERROR_HEADERS: [&str; 5] = [
    "x-error-log-level",
    "x-error-status-code",
    "x-error-code",
    "x-error-message",
    "x-error-detail",
];

// tracing needs the level at compile time, hence one arm per level
macro_rules! log_codeerror {
    ($level:expr, $($field:tt)*) => {
        let level: Level = $level;
        if level == Level::ERROR {
            tracing::error!($($field)*)
        } else if level == Level::WARN {
            tracing::warn!($($field)*)
        } else if level == Level::INFO {
            tracing::info!($($field)*)
        } else if level == Level::DEBUG {
            tracing::debug!($($field)*)
        } else {
            tracing::trace!($($field)*)
        }
    };
}

pub async fn log_middleware(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let start = Instant::now();

    state.add_responses_handled();

    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let client_ip = client_ip(
        request.headers(),
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr),
    );

    tracing::info!(kind = %"RECV", method = %method, path = %path, client_ip = ?client_ip);

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if response.status() == StatusCode::OK {
        tracing::info!(kind = %"RESP", method = %method, path = %path, client_ip = ?client_ip, duration = ?duration);
    } else {
        let headers = response.headers();

        let log_level = header_value_to_str(headers.get("x-error-log-level"))
            .and_then(|l| l.parse::<Level>().ok())
            .unwrap_or_else(|| default_log_level(response.status()));
        let status_code = response.status().as_u16();
        let error_code = header_value_to_str(headers.get("x-error-code")).unwrap_or("");
        let message = header_value_to_str(headers.get("x-error-message")).unwrap_or("");
        let detail = header_value_to_str(headers.get("x-error-detail")).unwrap_or("");

        log_codeerror!(
            log_level,
            kind = %"ERSP",
            method = %method,
            path = %path,
            client_ip = ?client_ip,
            status_code = %status_code,
            duration = ?duration,
            error_code = %error_code,
            message = %message,
            detail = %detail
        );

        let headers = response.headers_mut();
        for name in ERROR_HEADERS {
            headers.remove(name);
        }
    }

    let headers = response.headers_mut();
    headers.insert("x-server-built-time", HeaderValue::from_static(BUILD_TIME));
    headers.insert("x-server-name", HeaderValue::from_static(AXUM_VERSION));

    response
}

/// First `x-forwarded-for` hop if present and parseable, else the socket peer.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim);

    match forwarded {
        Some(candidate) => match candidate.parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(e) => {
                debug!(error = ?e, candidate, "Could not parse x-forwarded-for into IpAddr");
                peer.map(|addr| addr.ip())
            }
        },
        None => peer.map(|addr| addr.ip()),
    }
}

/// Level for responses that did not come from a `CodeError` (extractor rejections, 405s).
fn default_log_level(status: StatusCode) -> Level {
    if status.is_server_error() {
        Level::ERROR
    } else if status.is_client_error() {
        Level::INFO
    } else {
        Level::DEBUG
    }
}

fn header_value_to_str(value: Option<&HeaderValue>) -> Option<&str> {
    value.and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_header_wins_over_peer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();

        assert_eq!(
            client_ip(&headers, Some(peer)),
            Some("203.0.113.7".parse().unwrap())
        );
    }

    #[test]
    fn garbage_forwarded_header_falls_back_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        let peer: SocketAddr = "192.0.2.1:5000".parse().unwrap();

        assert_eq!(
            client_ip(&headers, Some(peer)),
            Some("192.0.2.1".parse().unwrap())
        );
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }

    #[test]
    fn plain_rejections_are_not_errors() {
        assert_eq!(default_log_level(StatusCode::METHOD_NOT_ALLOWED), Level::INFO);
        assert_eq!(default_log_level(StatusCode::PAYLOAD_TOO_LARGE), Level::INFO);
        assert_eq!(default_log_level(StatusCode::REQUEST_TIMEOUT), Level::INFO);
        assert_eq!(default_log_level(StatusCode::INTERNAL_SERVER_ERROR), Level::ERROR);
        assert_eq!(default_log_level(StatusCode::NO_CONTENT), Level::DEBUG);
    }
}
