//! Uniform JSON envelope for passport and admin endpoints.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

/// `{"success": bool, "message": string, "data": any}`.
///
/// Business failures are reported with `success: false` and status 200;
/// transport and server failures go through [`crate::error::AppError`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultData {
    pub success: bool,
    pub message: String,
    pub data: Value,
}

impl ResultData {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Value::Null,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: Value::Null,
        }
    }

    /// Reports the outcome of a boolean operation.
    pub fn status(success: bool, ok_message: &str, fail_message: &str) -> Self {
        if success {
            Self::ok(ok_message)
        } else {
            Self::fail(fail_message)
        }
    }

    pub fn with_data(mut self, data: impl Serialize) -> Self {
        self.data = serde_json::to_value(data).unwrap_or(Value::Null);
        self
    }
}

impl IntoResponse for ResultData {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
