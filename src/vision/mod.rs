// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image payload handling for the encoding endpoints

pub mod image_utils;

pub use image_utils::{
    decode_base64_image, decode_frames, decode_image_bytes, detect_format, ImageError, ImageInfo,
};
