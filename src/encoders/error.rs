// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types shared by every encoder and the encoder builder

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("Encoder '{name}' not found among implemented. Please, use one of the following: {supported:?}")]
    UnsupportedEncoder {
        name: String,
        supported: Vec<String>,
    },

    #[error("CUDA out of memory")]
    OutOfDeviceMemory,

    #[error("Model '{model}' weights not found at {}", path.display())]
    ModelNotFound { model: String, path: PathBuf },

    #[error("Encoder '{encoder}' does not implement {operation}")]
    NotImplemented {
        encoder: String,
        operation: &'static str,
    },

    #[error("Invalid embedding shape {0:?}: every dimension must be a positive integer")]
    InvalidShape(Vec<usize>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

impl EncoderError {
    /// Classifies an error message coming from the compute runtime.
    ///
    /// ONNX Runtime reports allocation failures as plain text, so device memory
    /// exhaustion is recognised by message and turned into `OutOfDeviceMemory`.
    pub fn from_runtime(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_out_of_memory(&message) {
            EncoderError::OutOfDeviceMemory
        } else {
            EncoderError::Inference(message)
        }
    }

    pub fn not_implemented(encoder: impl Into<String>, operation: &'static str) -> Self {
        EncoderError::NotImplemented {
            encoder: encoder.into(),
            operation,
        }
    }
}

fn is_out_of_memory(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("out of memory")
        || lower.contains("cudaerrormemoryallocation")
        || lower.contains("failed to allocate memory")
        || lower.contains("bad_alloc")
}
