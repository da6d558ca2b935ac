// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use clip_embed_server::cli::{execute, Cli, Commands};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // Keep stdout clean for machine-readable subcommands
    if !matches!(cli.command, Some(Commands::Encoders)) {
        println!("Starting {}", clip_embed_server::version::get_version_string());
        println!("BUILD VERSION: {}", clip_embed_server::version::VERSION);
        println!();
    }

    execute(cli).await
}
