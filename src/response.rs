use std::collections::HashMap;

use serde::Serialize;
use validator::ValidationErrors;

use crate::error::AppError;
use crate::validation::field_error_map;

/// The structured outcome every operation returns: a numeric status, a
/// human-readable message, a success flag and an optional payload. Callers
/// distinguish "something changed" (success with a non-zero payload),
/// "nothing to do" (success with a zero-effect payload) and failures (typed
/// by status code).
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub message: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<HashMap<String, Vec<String>>>,
}

impl<T> ApiResponse<T> {
    pub fn ok(status_code: u16, message: impl Into<String>, data: T) -> Self {
        Self {
            status_code,
            message: message.into(),
            success: true,
            data: Some(data),
            errors: None,
        }
    }

    pub fn ok_message(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            success: true,
            data: None,
            errors: None,
        }
    }

    pub fn from_error(error: &AppError, context: &str) -> Self {
        error.log_and_record(context);
        Self {
            status_code: error.status_code(),
            message: error.to_string(),
            success: false,
            data: None,
            errors: None,
        }
    }

    pub fn from_validation_errors(errors: &ValidationErrors) -> Self {
        Self {
            status_code: 400,
            message: "Validation failed".to_string(),
            success: false,
            data: None,
            errors: Some(field_error_map(errors)),
        }
    }
}
