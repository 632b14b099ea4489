use std::sync::Arc;

use axum::{Json, body::Bytes, extract::State, response::IntoResponse};
use tracing::info;

use crate::{
    domain::verification::VerificationResult,
    dto::requests::verify_request::VerifyRequest,
    errors::code_error::{CodeError, CodeErrorResp, HandlerResponse, code_err},
    init::state::ServerState,
    util::time::now::tokio_now,
};

/// Body is taken as raw bytes; `VerifyRequest::from_body` owns the 400 taxonomy. Malformed,
/// non-`application/json` and non-object bodies all answer 400, not 500.
#[utoipa::path(
    post,
    path = "/verify",
    tag = "verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Verification finished", body = VerificationResult),
        (status = 400, description = "Missing or malformed input", body = CodeErrorResp),
        (status = 500, description = "Internal server error", body = CodeErrorResp)
    )
)]
pub async fn verify_handler(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> HandlerResponse<impl IntoResponse> {
    let start = tokio_now();
    let request = VerifyRequest::from_body(&body)?;

    info!(email = %request.email, "Verifying email");

    let result: VerificationResult = state
        .verify_email(&request.email)
        .await
        .map_err(|e| code_err(CodeError::INTERNAL_SERVER_ERROR, e))?;

    info!(
        email = %result.email,
        status = ?result.status,
        elapsed = ?start.elapsed(),
        "Verification finished"
    );

    Ok(Json(result))
}
