// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! CLIP encoders
//!
//! `clip` returns one embedding per input (with a leading batch axis, or one
//! row per frame for video). `clip-centroid` summarizes any number of frames
//! into their elementwise mean.

use crate::encoders::{
    Embedding, EmbeddingSize, Encoder, EncoderError, EncoderKind, EncoderParams,
};
use image::DynamicImage;
use tracing::debug;

/// Image/text towers of a joint embedding model
///
/// Implemented by [`OnnxClipModel`](crate::encoders::OnnxClipModel); tests
/// substitute backends that return known vectors.
pub trait ClipBackend: Send {
    fn load(&mut self) -> Result<(), EncoderError>;

    fn unload(&mut self);

    fn image_features(&mut self, image: &DynamicImage) -> Result<Vec<f32>, EncoderError>;

    fn text_features(&mut self, text: &str) -> Result<Vec<f32>, EncoderError>;

    fn embedding_size(&self) -> usize;
}

/// Encodes every frame with the image tower
fn frame_features(
    backend: &mut dyn ClipBackend,
    frames: &[DynamicImage],
) -> Result<Embedding, EncoderError> {
    if frames.is_empty() {
        return Err(EncoderError::InvalidInput("no frames to encode".to_string()));
    }

    let rows = frames
        .iter()
        .map(|frame| backend.image_features(frame))
        .collect::<Result<Vec<_>, _>>()?;
    debug!("Encoded {} frame embeddings", rows.len());
    Embedding::from_rows(rows)
}

/// Image + text CLIP encoder
pub struct ClipEncoder {
    backend: Box<dyn ClipBackend>,
}

impl ClipEncoder {
    pub fn with_backend(backend: Box<dyn ClipBackend>) -> Self {
        Self { backend }
    }
}

impl Encoder for ClipEncoder {
    fn name(&self) -> &'static str {
        EncoderKind::Clip.as_str()
    }

    fn load(&mut self) -> Result<(), EncoderError> {
        self.backend.load()
    }

    fn unload(&mut self) -> Result<(), EncoderError> {
        self.backend.unload();
        Ok(())
    }

    fn encode_text(&mut self, text: &str) -> Result<Embedding, EncoderError> {
        let features = self.backend.text_features(text)?;
        Embedding::from_rows(vec![features])
    }

    fn encode_image(&mut self, image: &DynamicImage) -> Result<Embedding, EncoderError> {
        let features = self.backend.image_features(image)?;
        Embedding::from_rows(vec![features])
    }

    /// One row per frame; callers must expect a list, not a single vector
    fn encode_video(&mut self, frames: &[DynamicImage]) -> Result<Embedding, EncoderError> {
        frame_features(self.backend.as_mut(), frames)
    }

    fn get_params(&self) -> EncoderParams {
        EncoderParams {
            model_name: "clip".to_string(),
            embedding_size: EmbeddingSize::Length(self.backend.embedding_size()),
            embedding_list: true,
        }
    }
}

/// CLIP encoder that averages per-frame embeddings into a centroid
pub struct ClipCentroidEncoder {
    backend: Box<dyn ClipBackend>,
}

impl ClipCentroidEncoder {
    pub fn with_backend(backend: Box<dyn ClipBackend>) -> Self {
        Self { backend }
    }
}

impl Encoder for ClipCentroidEncoder {
    fn name(&self) -> &'static str {
        EncoderKind::ClipCentroid.as_str()
    }

    fn load(&mut self) -> Result<(), EncoderError> {
        self.backend.load()
    }

    fn unload(&mut self) -> Result<(), EncoderError> {
        self.backend.unload();
        Ok(())
    }

    fn encode_text(&mut self, text: &str) -> Result<Embedding, EncoderError> {
        Ok(Embedding::from_vec(self.backend.text_features(text)?))
    }

    /// A single image is a one-frame clip
    fn encode_image(&mut self, image: &DynamicImage) -> Result<Embedding, EncoderError> {
        self.encode_video(std::slice::from_ref(image))
    }

    fn encode_video(&mut self, frames: &[DynamicImage]) -> Result<Embedding, EncoderError> {
        frame_features(self.backend.as_mut(), frames)?.mean_rows()
    }

    fn get_params(&self) -> EncoderParams {
        EncoderParams {
            model_name: "clipcentroid".to_string(),
            embedding_size: EmbeddingSize::Length(self.backend.embedding_size()),
            embedding_list: false,
        }
    }
}
