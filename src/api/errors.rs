// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::encoders::EncoderError;
use crate::vision::ImageError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    BadRequest(String),
    InvalidImage(String),
    UnsupportedEncoder {
        name: String,
        supported: Vec<String>,
    },
    NotImplemented(String),
    OutOfDeviceMemory,
    ModelUnavailable {
        model: String,
        message: String,
    },
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::BadRequest(msg) => ("bad_request", format!("Bad request: {}", msg), None),
            ApiError::InvalidImage(msg) => ("invalid_image", msg.clone(), None),
            ApiError::UnsupportedEncoder { name, supported } => {
                let mut details = HashMap::new();
                details.insert(
                    "supported".to_string(),
                    serde_json::Value::Array(
                        supported
                            .iter()
                            .map(|s| serde_json::Value::String(s.clone()))
                            .collect(),
                    ),
                );
                (
                    "unsupported_encoder",
                    format!(
                        "Encoder '{}' not found among implemented. Please, use one of the following: {:?}",
                        name, supported
                    ),
                    Some(details),
                )
            }
            ApiError::NotImplemented(msg) => ("not_implemented", msg.clone(), None),
            ApiError::OutOfDeviceMemory => {
                ("out_of_memory", "CUDA out of memory".to_string(), None)
            }
            ApiError::ModelUnavailable { model, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "model".to_string(),
                    serde_json::Value::String(model.clone()),
                );
                ("model_unavailable", message.clone(), Some(details))
            }
            ApiError::InternalError(msg) => ("internal_error", msg.clone(), None),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidImage(_) => 400,
            ApiError::NotImplemented(_) => 501,
            ApiError::UnsupportedEncoder { .. }
            | ApiError::OutOfDeviceMemory
            | ApiError::InternalError(_) => 500,
            ApiError::ModelUnavailable { .. } => 503,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::InvalidImage(msg) => write!(f, "Invalid image: {}", msg),
            ApiError::UnsupportedEncoder { name, .. } => {
                write!(f, "Encoder '{}' not supported", name)
            }
            ApiError::NotImplemented(msg) => write!(f, "Not implemented: {}", msg),
            ApiError::OutOfDeviceMemory => write!(f, "CUDA out of memory"),
            ApiError::ModelUnavailable { message, .. } => {
                write!(f, "Model unavailable: {}", message)
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response())).into_response()
    }
}

impl From<EncoderError> for ApiError {
    fn from(err: EncoderError) -> Self {
        match err {
            EncoderError::UnsupportedEncoder { name, supported } => {
                ApiError::UnsupportedEncoder { name, supported }
            }
            EncoderError::OutOfDeviceMemory => ApiError::OutOfDeviceMemory,
            EncoderError::ModelNotFound { model, path } => ApiError::ModelUnavailable {
                message: format!("Model '{}' weights not found at {}", model, path.display()),
                model,
            },
            e @ EncoderError::NotImplemented { .. } => ApiError::NotImplemented(e.to_string()),
            EncoderError::InvalidInput(msg) => ApiError::BadRequest(msg),
            e @ (EncoderError::InvalidShape(_) | EncoderError::Inference(_)) => {
                ApiError::InternalError(e.to_string())
            }
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        ApiError::InvalidImage(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
