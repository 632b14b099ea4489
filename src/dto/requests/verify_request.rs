use serde_json::Value;
use utoipa::ToSchema;

use crate::errors::code_error::CodeError;

#[derive(ToSchema)]
pub struct VerifyRequest {
    #[schema(example = "test@example.com")]
    pub email: String,
}

impl VerifyRequest {
    /// Validates a raw request body. Any JSON is accepted at the transport level so that each
    /// kind of bad input gets its own 400 instead of a generic rejection. Unparseable bodies,
    /// non-JSON content types and non-object JSON are client errors here, never a 500.
    pub fn from_body(body: &[u8]) -> Result<Self, CodeError> {
        let data: Value = serde_json::from_slice(body).map_err(|_| CodeError::NO_JSON_DATA)?;

        if is_falsy(&data) {
            return Err(CodeError::NO_JSON_DATA);
        }

        let Value::Object(map) = data else {
            return Err(CodeError::JSON_NOT_AN_OBJECT);
        };

        match map.get("email") {
            None => Err(CodeError::EMAIL_REQUIRED),
            Some(email) if is_falsy(email) => Err(CodeError::EMAIL_REQUIRED),
            Some(Value::String(email)) => Ok(VerifyRequest {
                email: email.clone(),
            }),
            Some(_) => Err(CodeError::EMAIL_NOT_A_STRING),
        }
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
