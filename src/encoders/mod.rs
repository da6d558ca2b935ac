// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding encoders
//!
//! Every model the server can route to implements [`Encoder`]. Encoders are
//! built per request by [`EncoderBuilder`], loaded once, used for a single
//! encode call and then unloaded.
//!
//! Available encoders:
//! - `default`: fixed vector, ignores its input
//! - `random`: freshly sampled vector of a configured shape
//! - `clip`: CLIP image/text towers via ONNX Runtime
//! - `clip-centroid`: CLIP image tower, mean-pooled across frames
//! - `vclip`: fine-tuned video CLIP checkpoint

pub mod builder;
pub mod clip;
pub mod device;
pub mod error;
pub mod onnx_clip;
pub mod stub;
pub mod vclip;

pub use builder::{EncoderBuilder, EncoderConstructor, EncoderKind, SUPPORTED_ENCODERS};
pub use clip::{ClipBackend, ClipCentroidEncoder, ClipEncoder};
pub use device::{Device, DevicePreference};
pub use error::EncoderError;
pub use onnx_clip::{ClipModelFiles, OnnxClipModel};
pub use stub::{DefaultEncoder, RandomEncoder};
pub use vclip::VClipEncoder;

use image::DynamicImage;
use ndarray::{Array1, Array2, ArrayD, ArrayViewD, Axis};
use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

/// Common capability contract for all encoders
///
/// Operations an encoder does not support keep the default body, which
/// returns [`EncoderError::NotImplemented`].
pub trait Encoder: Send {
    /// Registry name of this encoder (e.g. "clip-centroid")
    fn name(&self) -> &'static str;

    /// Acquires model weights and places them on the compute device
    fn load(&mut self) -> Result<(), EncoderError> {
        Ok(())
    }

    /// Releases device memory held by the encoder
    fn unload(&mut self) -> Result<(), EncoderError> {
        Ok(())
    }

    fn encode_text(&mut self, _text: &str) -> Result<Embedding, EncoderError> {
        Err(EncoderError::not_implemented(self.name(), "encode_text"))
    }

    fn encode_image(&mut self, _image: &DynamicImage) -> Result<Embedding, EncoderError> {
        Err(EncoderError::not_implemented(self.name(), "encode_image"))
    }

    /// Encodes a sequence of already-decoded video frames
    fn encode_video(&mut self, _frames: &[DynamicImage]) -> Result<Embedding, EncoderError> {
        Err(EncoderError::not_implemented(self.name(), "encode_video"))
    }

    /// Describes the output shape for downstream collection setup
    fn get_params(&self) -> EncoderParams;
}

/// Output description of an encoder
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncoderParams {
    pub model_name: String,
    pub embedding_size: EmbeddingSize,
    /// True when the encoder returns a list of vectors rather than one vector
    pub embedding_list: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EmbeddingSize {
    Length(usize),
    Shape(Vec<usize>),
}

/// An embedding of any rank, serialized as nested JSON lists
///
/// A single vector serializes as `[..]`, a per-frame or batched result as
/// `[[..], ..]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(ArrayD<f32>);

impl Embedding {
    pub fn from_vec(values: Vec<f32>) -> Self {
        Self(Array1::from(values).into_dyn())
    }

    /// Stacks equally sized rows into a `[rows, dim]` embedding
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, EncoderError> {
        let dim = rows.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = rows.iter().position(|row| row.len() != dim) {
            return Err(EncoderError::InvalidInput(format!(
                "row {} has {} values, expected {}",
                bad,
                rows[bad].len(),
                dim
            )));
        }

        let count = rows.len();
        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        let array = Array2::from_shape_vec((count, dim), flat)
            .map_err(|e| EncoderError::InvalidInput(e.to_string()))?;
        Ok(Self(array.into_dyn()))
    }

    pub fn from_array(array: ArrayD<f32>) -> Self {
        Self(array)
    }

    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn as_array(&self) -> &ArrayD<f32> {
        &self.0
    }

    /// Elementwise mean over the first axis
    pub fn mean_rows(&self) -> Result<Self, EncoderError> {
        if self.0.ndim() == 0 || self.0.len_of(Axis(0)) == 0 {
            return Err(EncoderError::InvalidInput(
                "cannot average an empty embedding list".to_string(),
            ));
        }
        self.0
            .mean_axis(Axis(0))
            .map(Self)
            .ok_or_else(|| EncoderError::InvalidInput("cannot average embeddings".to_string()))
    }

    /// Flattens the embedding into a plain vector (row-major)
    pub fn to_vec(&self) -> Vec<f32> {
        self.0.iter().copied().collect()
    }
}

impl Serialize for Embedding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_nested(self.0.view(), serializer)
    }
}

struct Nested<'a>(ArrayViewD<'a, f32>);

impl Serialize for Nested<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_nested(self.0.view(), serializer)
    }
}

fn serialize_nested<S: Serializer>(view: ArrayViewD<'_, f32>, serializer: S) -> Result<S::Ok, S::Error> {
    if view.ndim() == 0 {
        return serializer.serialize_f32(view.iter().next().copied().unwrap_or_default());
    }

    let mut seq = serializer.serialize_seq(Some(view.len_of(Axis(0))))?;
    for sub in view.outer_iter() {
        seq.serialize_element(&Nested(sub))?;
    }
    seq.end()
}
