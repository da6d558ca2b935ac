// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Encoder builder
//!
//! A registry mapping encoder names to constructors. Every request builds a
//! fresh, loaded encoder through [`EncoderBuilder::build`].

use crate::config::EncoderConfig;
use crate::encoders::clip::{ClipCentroidEncoder, ClipEncoder};
use crate::encoders::onnx_clip::{ClipModelFiles, OnnxClipModel};
use crate::encoders::stub::{DefaultEncoder, RandomEncoder};
use crate::encoders::vclip::VClipEncoder;
use crate::encoders::{Encoder, EncoderError, EncoderParams};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};

/// Names of the built-in encoders, in registration order
pub const SUPPORTED_ENCODERS: [&str; 5] = ["default", "random", "clip", "clip-centroid", "vclip"];

/// Built-in encoder kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderKind {
    Default,
    Random,
    Clip,
    ClipCentroid,
    VClip,
}

impl EncoderKind {
    pub const ALL: [EncoderKind; 5] = [
        EncoderKind::Default,
        EncoderKind::Random,
        EncoderKind::Clip,
        EncoderKind::ClipCentroid,
        EncoderKind::VClip,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EncoderKind::Default => SUPPORTED_ENCODERS[0],
            EncoderKind::Random => SUPPORTED_ENCODERS[1],
            EncoderKind::Clip => SUPPORTED_ENCODERS[2],
            EncoderKind::ClipCentroid => SUPPORTED_ENCODERS[3],
            EncoderKind::VClip => SUPPORTED_ENCODERS[4],
        }
    }

    /// Constructs and loads an encoder of this kind
    pub fn construct(self, config: &EncoderConfig) -> Result<Box<dyn Encoder>, EncoderError> {
        let mut encoder = self.instantiate(config)?;
        encoder.load()?;
        Ok(encoder)
    }

    /// Constructs an encoder of this kind without touching its weights
    pub fn instantiate(self, config: &EncoderConfig) -> Result<Box<dyn Encoder>, EncoderError> {
        let encoder: Box<dyn Encoder> = match self {
            EncoderKind::Default => Box::new(DefaultEncoder::new(config.default_embedding.clone())),
            EncoderKind::Random => Box::new(RandomEncoder::new(config.random_shape.clone())?),
            EncoderKind::Clip => Box::new(ClipEncoder::with_backend(Box::new(clip_model(config)))),
            EncoderKind::ClipCentroid => {
                Box::new(ClipCentroidEncoder::with_backend(Box::new(clip_model(config))))
            }
            EncoderKind::VClip => Box::new(VClipEncoder::new(
                config.vclip_weights_dir.clone(),
                config.vclip_embedding_size,
                config.device,
                config.intra_threads,
            )),
        };
        Ok(encoder)
    }

    /// Output description of this kind under `config`
    pub fn params(self, config: &EncoderConfig) -> Result<EncoderParams, EncoderError> {
        Ok(self.instantiate(config)?.get_params())
    }
}

fn clip_model(config: &EncoderConfig) -> OnnxClipModel {
    OnnxClipModel::new(
        EncoderKind::Clip.as_str(),
        ClipModelFiles::in_dir(&config.clip_model_dir),
        config.clip_embedding_size,
        config.device,
        config.intra_threads,
    )
}

impl FromStr for EncoderKind {
    type Err = EncoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EncoderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EncoderError::UnsupportedEncoder {
                name: s.to_string(),
                supported: SUPPORTED_ENCODERS.iter().map(|n| n.to_string()).collect(),
            })
    }
}

impl fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constructor stored in the registry
pub type EncoderConstructor =
    Arc<dyn Fn(&EncoderConfig) -> Result<Box<dyn Encoder>, EncoderError> + Send + Sync>;

/// Maps encoder names to constructors
#[derive(Clone)]
pub struct EncoderBuilder {
    config: Arc<EncoderConfig>,
    registry: Vec<(String, EncoderConstructor)>,
}

impl fmt::Debug for EncoderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderBuilder")
            .field("config", &self.config)
            .field("encoders", &self.supported_encoders())
            .finish()
    }
}

impl EncoderBuilder {
    /// Builder with every built-in encoder registered
    pub fn new(config: EncoderConfig) -> Self {
        let mut builder = Self::empty(config);
        for kind in EncoderKind::ALL {
            builder.register(kind.as_str(), move |config: &EncoderConfig| kind.construct(config));
        }
        builder
    }

    /// Builder with no encoders registered
    pub fn empty(config: EncoderConfig) -> Self {
        Self {
            config: Arc::new(config),
            registry: Vec::new(),
        }
    }

    /// Registers `constructor` under `name`, replacing any previous entry
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&EncoderConfig) -> Result<Box<dyn Encoder>, EncoderError> + Send + Sync + 'static,
    {
        let name = name.into();
        let constructor: EncoderConstructor = Arc::new(constructor);
        match self.registry.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = constructor,
            None => self.registry.push((name, constructor)),
        }
        self
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Registered encoder names, in registration order
    pub fn supported_encoders(&self) -> Vec<&str> {
        self.registry.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_supported(&self, name: &str) -> bool {
        self.registry.iter().any(|(n, _)| n == name)
    }

    /// Builds a loaded encoder by name
    ///
    /// # Errors
    /// - `UnsupportedEncoder` if `name` is not registered
    /// - `OutOfDeviceMemory` if the compute device ran out of memory while loading
    /// - `ModelNotFound` if the encoder's weights are missing
    pub fn build(&self, name: &str) -> Result<Box<dyn Encoder>, EncoderError> {
        let constructor = self
            .registry
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.clone())
            .ok_or_else(|| EncoderError::UnsupportedEncoder {
                name: name.to_string(),
                supported: self.supported_encoders().into_iter().map(String::from).collect(),
            })?;

        match constructor(&self.config) {
            Ok(encoder) => {
                info!("Built encoder '{}'", name);
                Ok(encoder)
            }
            Err(EncoderError::OutOfDeviceMemory) => {
                error!("Device ran out of memory while building encoder '{}'", name);
                Err(EncoderError::OutOfDeviceMemory)
            }
            Err(e) => {
                error!("Failed to build encoder '{}': {}", name, e);
                Err(e)
            }
        }
    }
}
