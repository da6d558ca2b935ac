// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Compute device selection for ONNX sessions
//!
//! `Auto` tries the CUDA execution provider first and falls back to CPU when
//! CUDA cannot be initialized. Runtime errors are classified so that device
//! memory exhaustion surfaces as [`EncoderError::OutOfDeviceMemory`].

use crate::encoders::EncoderError;
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Which device the operator asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DevicePreference {
    /// Accelerator if present, else CPU
    #[default]
    Auto,
    Cpu,
    Cuda,
}

/// Where a session actually ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cuda,
    Cpu,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cuda => write!(f, "cuda"),
            Device::Cpu => write!(f, "cpu"),
        }
    }
}

/// Creates an ONNX Runtime session for `model_path` on the preferred device
pub fn create_session(
    model_path: &Path,
    preference: DevicePreference,
    intra_threads: usize,
) -> Result<(Session, Device), EncoderError> {
    match preference {
        DevicePreference::Cpu => Ok((cpu_session(model_path, intra_threads)?, Device::Cpu)),
        DevicePreference::Cuda => Ok((cuda_session(model_path, intra_threads)?, Device::Cuda)),
        DevicePreference::Auto => match cuda_session(model_path, intra_threads) {
            Ok(session) => {
                info!("CUDA execution provider initialized for {}", model_path.display());
                Ok((session, Device::Cuda))
            }
            // Exhausted device memory is reported, not hidden behind a CPU fallback
            Err(EncoderError::OutOfDeviceMemory) => Err(EncoderError::OutOfDeviceMemory),
            Err(e) => {
                warn!("CUDA execution provider failed: {}", e);
                warn!("Falling back to CPU execution provider");
                Ok((cpu_session(model_path, intra_threads)?, Device::Cpu))
            }
        },
    }
}

fn cuda_session(model_path: &Path, intra_threads: usize) -> Result<Session, EncoderError> {
    Session::builder()
        .map_err(runtime_error)?
        .with_execution_providers([CUDAExecutionProvider::default().build().error_on_failure()])
        .map_err(runtime_error)?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(runtime_error)?
        .with_intra_threads(intra_threads)
        .map_err(runtime_error)?
        .commit_from_file(model_path)
        .map_err(runtime_error)
}

fn cpu_session(model_path: &Path, intra_threads: usize) -> Result<Session, EncoderError> {
    Session::builder()
        .map_err(runtime_error)?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .map_err(runtime_error)?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(runtime_error)?
        .with_intra_threads(intra_threads)
        .map_err(runtime_error)?
        .commit_from_file(model_path)
        .map_err(runtime_error)
}

pub(crate) fn runtime_error<E: fmt::Display>(error: E) -> EncoderError {
    EncoderError::from_runtime(error.to_string())
}
