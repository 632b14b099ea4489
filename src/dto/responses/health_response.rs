use serde_derive::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
    #[schema(example = "email_verifier")]
    pub service: &'static str,
    pub server_uptime: String,
    pub build_time: &'static str,
}
