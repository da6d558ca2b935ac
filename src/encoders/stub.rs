// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Stub encoders that need no model weights

use crate::encoders::{
    Embedding, EmbeddingSize, Encoder, EncoderError, EncoderKind, EncoderParams,
};
use image::DynamicImage;
use ndarray::{ArrayD, IxDyn};
use rand::Rng;

/// Embedding returned by `default` unless configured otherwise
pub const DEFAULT_EMBEDDING: [f32; 4] = [1.0, 2.0, 3.0, 4.0];

/// Shape sampled by `random` unless configured otherwise
pub const DEFAULT_RANDOM_SHAPE: [usize; 1] = [768];

/// Always returns the same embedding, whatever the input
#[derive(Debug, Clone)]
pub struct DefaultEncoder {
    embedding: Vec<f32>,
}

impl DefaultEncoder {
    pub fn new(embedding: Vec<f32>) -> Self {
        Self { embedding }
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }
}

impl Default for DefaultEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING.to_vec())
    }
}

impl Encoder for DefaultEncoder {
    fn name(&self) -> &'static str {
        EncoderKind::Default.as_str()
    }

    fn encode_text(&mut self, _text: &str) -> Result<Embedding, EncoderError> {
        Ok(Embedding::from_vec(self.embedding.clone()))
    }

    fn encode_image(&mut self, _image: &DynamicImage) -> Result<Embedding, EncoderError> {
        Ok(Embedding::from_vec(self.embedding.clone()))
    }

    fn encode_video(&mut self, _frames: &[DynamicImage]) -> Result<Embedding, EncoderError> {
        Ok(Embedding::from_vec(self.embedding.clone()))
    }

    fn get_params(&self) -> EncoderParams {
        EncoderParams {
            model_name: "default".to_string(),
            embedding_size: EmbeddingSize::Length(self.embedding.len()),
            embedding_list: false,
        }
    }
}

/// Samples a fresh uniform `[0, 1)` embedding of a fixed shape on every call
#[derive(Debug, Clone)]
pub struct RandomEncoder {
    shape: Vec<usize>,
}

impl RandomEncoder {
    /// Fails unless `shape` is a non-empty list of positive dimensions
    pub fn new(shape: Vec<usize>) -> Result<Self, EncoderError> {
        if shape.is_empty() || shape.contains(&0) {
            return Err(EncoderError::InvalidShape(shape));
        }
        Ok(Self { shape })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn sample(&self) -> Embedding {
        let mut rng = rand::thread_rng();
        let array = ArrayD::from_shape_fn(IxDyn(&self.shape), |_| rng.gen::<f32>());
        Embedding::from_array(array)
    }
}

impl Encoder for RandomEncoder {
    fn name(&self) -> &'static str {
        EncoderKind::Random.as_str()
    }

    fn encode_text(&mut self, _text: &str) -> Result<Embedding, EncoderError> {
        Ok(self.sample())
    }

    fn encode_image(&mut self, _image: &DynamicImage) -> Result<Embedding, EncoderError> {
        Ok(self.sample())
    }

    fn encode_video(&mut self, _frames: &[DynamicImage]) -> Result<Embedding, EncoderError> {
        Ok(self.sample())
    }

    fn get_params(&self) -> EncoderParams {
        EncoderParams {
            model_name: "random".to_string(),
            embedding_size: EmbeddingSize::Shape(self.shape.clone()),
            embedding_list: false,
        }
    }
}
