// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX CLIP model wrapper
//!
//! Runs the two towers of an exported CLIP model with ONNX Runtime:
//! - `vision_model.onnx`: `pixel_values [batch, 3, 224, 224]` -> `image_embeds [batch, dim]`
//! - `text_model.onnx`: `input_ids`, `attention_mask [batch, 77]` -> `text_embeds [batch, dim]`
//!
//! Sessions are created on the preferred device (CUDA with CPU fallback) when
//! the model is loaded and dropped again on unload.

use crate::encoders::clip::ClipBackend;
use crate::encoders::device::{create_session, runtime_error};
use crate::encoders::{Device, DevicePreference, EncoderError};
use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::{Array2, Array4};
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, error, info};

/// CLIP input resolution
pub const CLIP_IMAGE_SIZE: u32 = 224;

/// CLIP text context length
pub const CLIP_CONTEXT_LENGTH: usize = 77;

const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Locations of the files that make up one CLIP export
#[derive(Debug, Clone, PartialEq)]
pub struct ClipModelFiles {
    pub vision_model: PathBuf,
    pub text_model: PathBuf,
    pub tokenizer: PathBuf,
}

impl ClipModelFiles {
    /// Standard layout of an exported model directory
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            vision_model: dir.join("vision_model.onnx"),
            text_model: dir.join("text_model.onnx"),
            tokenizer: dir.join("tokenizer.json"),
        }
    }

    /// Returns the first file that does not exist
    pub fn first_missing(&self) -> Option<&Path> {
        [&self.vision_model, &self.text_model, &self.tokenizer]
            .into_iter()
            .find(|path| !path.exists())
            .map(PathBuf::as_path)
    }
}

struct LoadedClip {
    vision: Session,
    text: Session,
    tokenizer: Tokenizer,
    device: Device,
}

/// CLIP image/text towers backed by ONNX Runtime
pub struct OnnxClipModel {
    model_name: String,
    files: ClipModelFiles,
    embedding_size: usize,
    preference: DevicePreference,
    intra_threads: usize,
    loaded: Option<LoadedClip>,
}

impl std::fmt::Debug for OnnxClipModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClipModel")
            .field("model_name", &self.model_name)
            .field("files", &self.files)
            .field("embedding_size", &self.embedding_size)
            .field("device", &self.device())
            .finish_non_exhaustive()
    }
}

impl OnnxClipModel {
    pub fn new(
        model_name: impl Into<String>,
        files: ClipModelFiles,
        embedding_size: usize,
        preference: DevicePreference,
        intra_threads: usize,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            files,
            embedding_size,
            preference,
            intra_threads,
            loaded: None,
        }
    }

    /// Device the sessions were placed on, once loaded
    pub fn device(&self) -> Option<Device> {
        self.loaded.as_ref().map(|l| l.device)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    fn loaded_mut(&mut self) -> Result<&mut LoadedClip, EncoderError> {
        let model_name = self.model_name.clone();
        self.loaded
            .as_mut()
            .ok_or_else(|| EncoderError::Inference(format!("model '{}' is not loaded", model_name)))
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<(), EncoderError> {
        if embedding.len() != self.embedding_size {
            return Err(EncoderError::Inference(format!(
                "Unexpected embedding dimension: {} (expected {})",
                embedding.len(),
                self.embedding_size
            )));
        }
        Ok(())
    }
}

impl ClipBackend for OnnxClipModel {
    fn load(&mut self) -> Result<(), EncoderError> {
        if self.loaded.is_some() {
            return Ok(());
        }

        if let Some(missing) = self.files.first_missing() {
            error!(
                "Model '{}' is missing {}; encoder cannot be used",
                self.model_name,
                missing.display()
            );
            return Err(EncoderError::ModelNotFound {
                model: self.model_name.clone(),
                path: missing.to_path_buf(),
            });
        }

        info!("Loading CLIP model '{}'", self.model_name);
        let (vision, device) =
            create_session(&self.files.vision_model, self.preference, self.intra_threads)?;
        // Keep both towers on the same device
        let text_preference = match device {
            Device::Cuda => DevicePreference::Cuda,
            Device::Cpu => DevicePreference::Cpu,
        };
        let (text, _) = create_session(&self.files.text_model, text_preference, self.intra_threads)?;
        let tokenizer = load_tokenizer(&self.files.tokenizer)?;

        info!("CLIP model '{}' loaded on {}", self.model_name, device);
        self.loaded = Some(LoadedClip {
            vision,
            text,
            tokenizer,
            device,
        });
        Ok(())
    }

    fn unload(&mut self) {
        if self.loaded.take().is_some() {
            debug!("CLIP model '{}' unloaded", self.model_name);
        }
    }

    fn image_features(&mut self, image: &DynamicImage) -> Result<Vec<f32>, EncoderError> {
        let pixel_values = preprocess_image(image);
        let loaded = self.loaded_mut()?;

        let input_name = loaded
            .vision
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "pixel_values".to_string());

        let embedding = {
            let outputs = loaded
                .vision
                .run(ort::inputs![input_name => Value::from_array(pixel_values).map_err(runtime_error)?])
                .map_err(runtime_error)?;

            // Fine-tuned exports also emit attention weights; the embedding is always first
            let features = outputs[0].try_extract_array::<f32>().map_err(runtime_error)?;
            first_row(features.view())?
        };

        self.check_dimension(&embedding)?;
        Ok(embedding)
    }

    fn text_features(&mut self, text: &str) -> Result<Vec<f32>, EncoderError> {
        let loaded = self.loaded_mut()?;

        let encoding = loaded
            .tokenizer
            .encode(text, true)
            .map_err(|e| EncoderError::Inference(format!("Tokenization failed: {}", e)))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let len = input_ids.len();

        let input_ids_array = Array2::from_shape_vec((1, len), input_ids)
            .map_err(|e| EncoderError::Inference(e.to_string()))?;
        let attention_mask_array = Array2::from_shape_vec((1, len), attention_mask)
            .map_err(|e| EncoderError::Inference(e.to_string()))?;

        let input_names: Vec<String> = loaded.text.inputs.iter().map(|i| i.name.clone()).collect();

        let embedding = {
            let input_ids_value = Value::from_array(input_ids_array).map_err(runtime_error)?;
            let outputs = if input_names.len() >= 2 {
                let attention_mask_value =
                    Value::from_array(attention_mask_array).map_err(runtime_error)?;
                loaded
                    .text
                    .run(ort::inputs![
                        input_names[0].clone() => input_ids_value,
                        input_names[1].clone() => attention_mask_value
                    ])
                    .map_err(runtime_error)?
            } else {
                // OpenAI-style exports take token ids only
                let name = input_names
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "input_ids".to_string());
                loaded
                    .text
                    .run(ort::inputs![name => input_ids_value])
                    .map_err(runtime_error)?
            };

            let features = outputs[0].try_extract_array::<f32>().map_err(runtime_error)?;
            first_row(features.view())?
        };

        self.check_dimension(&embedding)?;
        Ok(embedding)
    }

    fn embedding_size(&self) -> usize {
        self.embedding_size
    }
}

fn load_tokenizer(path: &Path) -> Result<Tokenizer, EncoderError> {
    let mut tokenizer = Tokenizer::from_file(path)
        .map_err(|e| EncoderError::Inference(format!("Failed to load tokenizer: {}", e)))?;

    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::Fixed(CLIP_CONTEXT_LENGTH),
        ..Default::default()
    }));
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: CLIP_CONTEXT_LENGTH,
            ..Default::default()
        }))
        .map_err(|e| EncoderError::Inference(format!("Failed to configure truncation: {}", e)))?;

    Ok(tokenizer)
}

/// Extracts the first embedding of a `[batch, dim]` output
fn first_row(features: ndarray::ArrayViewD<'_, f32>) -> Result<Vec<f32>, EncoderError> {
    match features.shape() {
        [_, _] | [_] => {}
        shape => {
            return Err(EncoderError::Inference(format!(
                "Model outputs unexpected dimensions: {:?} (expected [batch, dim])",
                shape
            )))
        }
    }

    let row: Vec<f32> = if features.ndim() == 2 {
        features.outer_iter().next().map(|r| r.iter().copied().collect()).unwrap_or_default()
    } else {
        features.iter().copied().collect()
    };

    if row.iter().any(|v| !v.is_finite()) {
        return Err(EncoderError::Inference(
            "embedding contains non-finite values".to_string(),
        ));
    }
    Ok(row)
}

/// CLIP image preprocessing
///
/// Center-crop the largest square, resize it to 224x224 (bicubic), scale to
/// [0, 1], normalize with the CLIP mean/std, NCHW layout.
///
/// Cropping before resizing keeps the intermediate buffer at 224x224 no matter
/// how extreme the aspect ratio is.
pub fn preprocess_image(image: &DynamicImage) -> Array4<f32> {
    let size = CLIP_IMAGE_SIZE;
    let (w, h) = (image.width(), image.height());

    let side = w.min(h).max(1);
    let (left, top) = (w.saturating_sub(side) / 2, h.saturating_sub(side) / 2);
    let square = image.crop_imm(left, top, side, side);
    let resized = square.resize_exact(size, size, FilterType::CatmullRom).to_rgb8();

    let mut array = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
    for y in 0..size {
        for x in 0..size {
            let pixel = resized.get_pixel(x, y);
            for c in 0..3 {
                let value = pixel[c] as f32 / 255.0;
                array[[0, c, y as usize, x as usize]] = (value - CLIP_MEAN[c]) / CLIP_STD[c];
            }
        }
    }

    array
}
