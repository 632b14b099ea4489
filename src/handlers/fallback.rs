use axum::response::IntoResponse;

use crate::errors::code_error::{CodeError, HandlerResponse};

pub async fn fallback_handler() -> HandlerResponse<impl IntoResponse> {
    Err::<(), _>(CodeError::INVALID_PATH.into())
}
