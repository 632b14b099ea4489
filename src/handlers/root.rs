use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    build_info::BUILD_TIME, dto::responses::health_response::HealthResponse,
    init::state::ServerState, util::time::duration_formatter::format_duration,
};

#[utoipa::path(
    get,
    path = "/",
    tag = "server",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn root_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            service: "email_verifier",
            server_uptime: format_duration(state.get_uptime()),
            build_time: BUILD_TIME,
        }),
    )
}
