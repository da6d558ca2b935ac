// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::api::{start_server, EncoderInfo};
use crate::config::{
    EncoderConfig, ServerConfig, CLIP_EMBEDDING_SIZE, DEFAULT_CLIP_MODEL_DIR, DEFAULT_LISTEN_ADDR,
    VCLIP_EMBEDDING_SIZE,
};
use crate::encoders::vclip::VCLIP_WEIGHTS_DIR;
use crate::encoders::{DevicePreference, EncoderKind};

/// Multimodal embedding server
#[derive(Parser, Debug)]
#[command(name = "clip-embed-server")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Serves text, image and video-frame embeddings over HTTP", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub server: ServerArgs,

    /// Defaults to `serve`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve,

    /// Print the built-in encoders and their output parameters as JSON
    Encoders,
}

/// Server and encoder settings
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(long, env = "EMBED_LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: String,

    /// Directory with vision_model.onnx, text_model.onnx and tokenizer.json
    #[arg(long, env = "CLIP_MODEL_DIR", default_value = DEFAULT_CLIP_MODEL_DIR)]
    pub clip_model_dir: PathBuf,

    /// VCLIP weights directory (ViT-B-32 export plus fine-tuned checkpoint)
    #[arg(long, env = "VCLIP_WEIGHTS_DIR", default_value = VCLIP_WEIGHTS_DIR)]
    pub vclip_weights_dir: PathBuf,

    /// Compute device for ONNX sessions
    #[arg(long, env = "EMBED_DEVICE", value_enum, default_value_t = DevicePreference::Auto)]
    pub device: DevicePreference,

    /// Comma-separated vector returned by the `default` encoder
    #[arg(long, env = "DEFAULT_EMBEDDING", value_delimiter = ',', default_value = "1,2,3,4")]
    pub default_embedding: Vec<f32>,

    /// Comma-separated shape sampled by the `random` encoder
    #[arg(long, env = "RANDOM_EMBEDDING_SHAPE", value_delimiter = ',', default_value = "768")]
    pub random_shape: Vec<usize>,

    /// ONNX Runtime intra-op threads per session
    #[arg(long, env = "ORT_INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,
}

impl ServerArgs {
    pub fn into_config(self) -> ServerConfig {
        ServerConfig {
            listen_addr: self.listen_addr,
            encoders: EncoderConfig {
                default_embedding: self.default_embedding,
                random_shape: self.random_shape,
                clip_model_dir: self.clip_model_dir,
                clip_embedding_size: CLIP_EMBEDDING_SIZE,
                vclip_weights_dir: self.vclip_weights_dir,
                vclip_embedding_size: VCLIP_EMBEDDING_SIZE,
                device: self.device,
                intra_threads: self.intra_threads,
            },
        }
    }
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.server.into_config();
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => start_server(config).await,
        Commands::Encoders => print_encoders(&config.encoders),
    }
}

fn print_encoders(config: &EncoderConfig) -> Result<()> {
    let encoders = EncoderKind::ALL
        .into_iter()
        .map(|kind| {
            Ok(EncoderInfo {
                name: kind.as_str().to_string(),
                params: Some(kind.params(config)?),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    println!("{}", serde_json::to_string_pretty(&encoders)?);
    Ok(())
}
