// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Tests against real ONNX exports
//!
//! Ignored by default. Run with the exports in place:
//!
//! ```text
//! CLIP_MODEL_DIR=/models/clip-vit-large-patch14-onnx \
//! VCLIP_WEIGHTS_DIR=/weights \
//!     cargo test --test encoders_tests -- --ignored
//! ```

use clip_embed_server::{
    config::{EncoderConfig, DEFAULT_CLIP_MODEL_DIR},
    encoders::{DevicePreference, EncoderBuilder},
};
use image::{DynamicImage, Rgb, RgbImage};
use std::path::PathBuf;

fn config() -> EncoderConfig {
    let mut config = EncoderConfig {
        device: DevicePreference::Cpu,
        ..Default::default()
    };
    config.clip_model_dir = std::env::var("CLIP_MODEL_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CLIP_MODEL_DIR));
    if let Ok(dir) = std::env::var("VCLIP_WEIGHTS_DIR") {
        config.vclip_weights_dir = PathBuf::from(dir);
    }
    config
}

fn solid(r: u8, g: u8, b: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(320, 240, Rgb([r, g, b])))
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (na * nb)
}

#[test]
#[ignore]
fn test_clip_text_and_image_shapes() {
    let builder = EncoderBuilder::new(config());
    let mut encoder = builder.build("clip").unwrap();

    let text = encoder.encode_text("a photo of a red square").unwrap();
    assert_eq!(text.shape(), &[1, 768]);

    let image = encoder.encode_image(&solid(255, 0, 0)).unwrap();
    assert_eq!(image.shape(), &[1, 768]);
    assert!(image.to_vec().iter().all(|v| v.is_finite()));

    encoder.unload().unwrap();
}

#[test]
#[ignore]
fn test_clip_text_matches_image_content() {
    let builder = EncoderBuilder::new(config());
    let mut encoder = builder.build("clip").unwrap();

    let red = encoder.encode_image(&solid(255, 0, 0)).unwrap().to_vec();
    let red_text = encoder.encode_text("a plain red image").unwrap().to_vec();
    let blue_text = encoder.encode_text("a plain blue image").unwrap().to_vec();

    assert!(cosine(&red, &red_text) > cosine(&red, &blue_text));
}

#[test]
#[ignore]
fn test_clip_centroid_of_identical_frames() {
    let builder = EncoderBuilder::new(config());
    let mut clip = builder.build("clip").unwrap();
    let mut centroid = builder.build("clip-centroid").unwrap();

    let frame = solid(0, 128, 255);
    let single = clip.encode_image(&frame).unwrap().to_vec();
    let mean = centroid
        .encode_video(&[frame.clone(), frame.clone(), frame])
        .unwrap();

    assert_eq!(mean.shape(), &[768]);
    for (a, b) in single.iter().zip(mean.to_vec()) {
        assert!((a - b).abs() < 1e-4);
    }
}

#[test]
#[ignore]
fn test_vclip_shapes() {
    let builder = EncoderBuilder::new(config());
    let mut encoder = builder.build("vclip").unwrap();

    assert_eq!(encoder.encode_text("a dog running").unwrap().shape(), &[1, 512]);
    assert_eq!(
        encoder.encode_image(&solid(10, 200, 10)).unwrap().shape(),
        &[1, 512]
    );
}
