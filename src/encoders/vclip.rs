// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Video-CLIP encoder
//!
//! A ViT-B/32 CLIP backbone whose image tower was fine-tuned on 40-frame
//! clips. The weights directory holds the backbone export and the fine-tuned
//! image tower checkpoint:
//!
//! ```text
//! <weights_dir>/
//!   ViT-B-32/text_model.onnx
//!   ViT-B-32/tokenizer.json
//!   100batch_40frames_32.onnx
//! ```

use crate::encoders::clip::ClipBackend;
use crate::encoders::onnx_clip::{ClipModelFiles, OnnxClipModel};
use crate::encoders::{
    DevicePreference, Embedding, EmbeddingSize, Encoder, EncoderError, EncoderKind, EncoderParams,
};
use image::DynamicImage;
use std::path::{Path, PathBuf};

/// Default location of the VCLIP weights
pub const VCLIP_WEIGHTS_DIR: &str = "/weights";

/// Backbone architecture directory inside the weights dir
pub const VCLIP_BACKBONE: &str = "ViT-B-32";

/// Fine-tuned image tower checkpoint inside the weights dir
pub const VCLIP_CHECKPOINT: &str = "100batch_40frames_32.onnx";

/// Files making up a VCLIP export rooted at `weights_dir`
pub fn vclip_files(weights_dir: impl AsRef<Path>) -> ClipModelFiles {
    let weights_dir = weights_dir.as_ref();
    let backbone = weights_dir.join(VCLIP_BACKBONE);
    ClipModelFiles {
        vision_model: weights_dir.join(VCLIP_CHECKPOINT),
        text_model: backbone.join("text_model.onnx"),
        tokenizer: backbone.join("tokenizer.json"),
    }
}

pub struct VClipEncoder {
    weights_dir: PathBuf,
    backend: Box<dyn ClipBackend>,
}

impl VClipEncoder {
    pub fn new(
        weights_dir: impl Into<PathBuf>,
        embedding_size: usize,
        preference: DevicePreference,
        intra_threads: usize,
    ) -> Self {
        let weights_dir = weights_dir.into();
        let model = OnnxClipModel::new(
            EncoderKind::VClip.as_str(),
            vclip_files(&weights_dir),
            embedding_size,
            preference,
            intra_threads,
        );
        Self {
            weights_dir,
            backend: Box::new(model),
        }
    }

    pub fn with_backend(weights_dir: impl Into<PathBuf>, backend: Box<dyn ClipBackend>) -> Self {
        Self {
            weights_dir: weights_dir.into(),
            backend,
        }
    }

    pub fn weights_dir(&self) -> &Path {
        &self.weights_dir
    }
}

impl Encoder for VClipEncoder {
    fn name(&self) -> &'static str {
        EncoderKind::VClip.as_str()
    }

    fn load(&mut self) -> Result<(), EncoderError> {
        self.backend.load()
    }

    fn unload(&mut self) -> Result<(), EncoderError> {
        self.backend.unload();
        Ok(())
    }

    fn encode_text(&mut self, text: &str) -> Result<Embedding, EncoderError> {
        Embedding::from_rows(vec![self.backend.text_features(text)?])
    }

    fn encode_image(&mut self, image: &DynamicImage) -> Result<Embedding, EncoderError> {
        Embedding::from_rows(vec![self.backend.image_features(image)?])
    }

    fn get_params(&self) -> EncoderParams {
        EncoderParams {
            model_name: "vclip".to_string(),
            embedding_size: EmbeddingSize::Length(self.backend.embedding_size()),
            embedding_list: true,
        }
    }
}
