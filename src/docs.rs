//! OpenAPI document served at `/api-docs/openapi.json`.
//!
//! Utoipa only exposes operations listed in `#[openapi(paths(...))]`; handlers still carry
//! their own `#[utoipa::path(...)]` attributes.

use axum::{Json, response::IntoResponse};
use utoipa::OpenApi;

use crate::domain::verification::{VerificationResult, VerificationStatus};
use crate::dto::{
    requests::verify_request::VerifyRequest, responses::health_response::HealthResponse,
};
use crate::errors::code_error::CodeErrorResp;
use crate::handlers::{root, verify};

#[derive(OpenApi)]
#[openapi(
    paths(
        root::root_handler,
        verify::verify_handler,
    ),
    components(
        schemas(
            CodeErrorResp,
            HealthResponse,
            VerifyRequest,
            VerificationResult,
            VerificationStatus,
        )
    ),
    tags(
        (name = "server", description = "Service status"),
        (name = "verify", description = "Email address verification")
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
