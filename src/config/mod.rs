// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server and encoder configuration

use crate::encoders::stub::{DEFAULT_EMBEDDING, DEFAULT_RANDOM_SHAPE};
use crate::encoders::vclip::VCLIP_WEIGHTS_DIR;
use crate::encoders::DevicePreference;
use std::path::PathBuf;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_CLIP_MODEL_DIR: &str = "./models/clip-vit-large-patch14-onnx";

/// clip-vit-large-patch14 projection size
pub const CLIP_EMBEDDING_SIZE: usize = 768;

/// ViT-B/32 projection size
pub const VCLIP_EMBEDDING_SIZE: usize = 512;

/// Top-level configuration for the HTTP server
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Socket address to bind (e.g. "0.0.0.0:5000")
    pub listen_addr: String,
    pub encoders: EncoderConfig,
}

/// Everything the encoder builder needs to construct an encoder
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    /// Vector returned by the `default` encoder
    pub default_embedding: Vec<f32>,
    /// Shape sampled by the `random` encoder
    pub random_shape: Vec<usize>,
    /// Directory holding the CLIP ONNX export
    pub clip_model_dir: PathBuf,
    pub clip_embedding_size: usize,
    /// Directory holding the VCLIP backbone and fine-tuned checkpoint
    pub vclip_weights_dir: PathBuf,
    pub vclip_embedding_size: usize,
    pub device: DevicePreference,
    /// ONNX Runtime intra-op threads per session
    pub intra_threads: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            encoders: EncoderConfig::default(),
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            default_embedding: DEFAULT_EMBEDDING.to_vec(),
            random_shape: DEFAULT_RANDOM_SHAPE.to_vec(),
            clip_model_dir: PathBuf::from(DEFAULT_CLIP_MODEL_DIR),
            clip_embedding_size: CLIP_EMBEDDING_SIZE,
            vclip_weights_dir: PathBuf::from(VCLIP_WEIGHTS_DIR),
            vclip_embedding_size: VCLIP_EMBEDDING_SIZE,
            device: DevicePreference::Auto,
            intra_threads: 4,
        }
    }
}

impl ServerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("Invalid listen address: {}", self.listen_addr));
        }
        self.encoders.validate()
    }
}

impl EncoderConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_embedding.is_empty() {
            return Err("Default embedding must not be empty".to_string());
        }
        if self.random_shape.is_empty() || self.random_shape.contains(&0) {
            return Err(format!(
                "Random embedding shape must be a list of positive integers, got {:?}",
                self.random_shape
            ));
        }
        if self.clip_embedding_size == 0 || self.vclip_embedding_size == 0 {
            return Err("Embedding sizes must be greater than 0".to_string());
        }
        if self.intra_threads == 0 {
            return Err("Intra threads must be greater than 0".to_string());
        }
        Ok(())
    }
}
