use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

/// Uniform JSON error envelope: `{error, code, details?}`. `details` is only
/// serialised for dev-mode deployments.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    details: Option<Value>,
    dev_mode: bool,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, dev_mode: bool) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
            dev_mode,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.message,
            "code": self.status.as_u16(),
        });
        if self.dev_mode {
            if let Some(details) = self.details {
                body["details"] = details;
            }
        }
        (self.status, Json(body)).into_response()
    }
}
