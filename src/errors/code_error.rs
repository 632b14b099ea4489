use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde_derive::Serialize;
use std::error::Error;
use std::fmt;
use tracing::Level;
use utoipa::ToSchema;

pub type HandlerResponse<T> = Result<T, CodeErrorResp>;

#[derive(Debug)]
pub struct CodeError {
    pub success: bool,
    pub error_code: u16,
    pub http_status_code: StatusCode,
    pub message: &'static str,
    pub log_level: Level,
}

impl CodeError {
    pub const NO_JSON_DATA: CodeError = CodeError {
        success: false,
        error_code: 0,
        http_status_code: StatusCode::BAD_REQUEST,
        message: "No JSON data provided",
        log_level: Level::INFO,
    };
    pub const JSON_NOT_AN_OBJECT: CodeError = CodeError {
        success: false,
        error_code: 1,
        http_status_code: StatusCode::BAD_REQUEST,
        message: "JSON body must be an object",
        log_level: Level::INFO,
    };
    pub const EMAIL_REQUIRED: CodeError = CodeError {
        success: false,
        error_code: 2,
        http_status_code: StatusCode::BAD_REQUEST,
        message: "Email field is required",
        log_level: Level::INFO,
    };
    pub const EMAIL_NOT_A_STRING: CodeError = CodeError {
        success: false,
        error_code: 3,
        http_status_code: StatusCode::BAD_REQUEST,
        message: "Email must be a string",
        log_level: Level::INFO,
    };
    pub const INTERNAL_SERVER_ERROR: CodeError = CodeError {
        success: false,
        error_code: 4,
        http_status_code: StatusCode::INTERNAL_SERVER_ERROR,
        message: "Internal server error",
        log_level: Level::ERROR,
    };
    pub const INVALID_PATH: CodeError = CodeError {
        success: false,
        error_code: 5,
        http_status_code: StatusCode::NOT_FOUND,
        message: "Invalid path!",
        log_level: Level::DEBUG,
    };
}

pub fn code_err(cerr: CodeError, e: impl ToString) -> CodeErrorResp {
    CodeErrorResp {
        success: cerr.success,
        error_code: cerr.error_code,
        http_status_code: cerr.http_status_code,
        error: cerr.message.to_string(),
        message: e.to_string(),
        log_level: cerr.log_level,
    }
}

impl From<CodeError> for CodeErrorResp {
    fn from(cerr: CodeError) -> Self {
        code_err(cerr, "")
    }
}

/// Error body. `error` is the fixed description, `message` the detail of this occurrence.
#[derive(Serialize, Debug, ToSchema)]
pub struct CodeErrorResp {
    pub success: bool,
    pub error_code: u16,
    #[serde(skip)]
    pub http_status_code: StatusCode,
    pub error: String,
    pub message: String,
    #[serde(skip)]
    pub log_level: Level,
}

impl fmt::Display for CodeErrorResp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl Error for CodeErrorResp {}

// Log fields travel to the logging middleware as headers; it strips them before the
// response leaves the server.
impl IntoResponse for CodeErrorResp {
    fn into_response(self) -> axum::response::Response {
        let mut response = (self.http_status_code, axum::Json(&self)).into_response();
        let headers = response.headers_mut();

        let pairs: [(&'static str, String); 5] = [
            ("x-error-log-level", self.log_level.to_string()),
            ("x-error-status-code", self.http_status_code.as_u16().to_string()),
            ("x-error-code", self.error_code.to_string()),
            ("x-error-message", self.error.clone()),
            ("x-error-detail", self.message.clone()),
        ];
        for (name, value) in pairs {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(name, value);
            }
        }

        response
    }
}
