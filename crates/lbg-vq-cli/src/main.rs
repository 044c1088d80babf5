//! # lbg-vq
//!
//! Command-line driver for LBG codebook training.
//!
//! ## Usage
//!
//! ```text
//! lbg-vq train  --input vectors.txt --output codebook.txt --size 128
//! lbg-vq encode --codebook codebook.txt --input vectors.txt   > indices.txt
//! lbg-vq decode --codebook codebook.txt --indices indices.txt > vectors.txt
//! ```
//!
//! Vector files hold one whitespace-separated vector per line. Training
//! flags fall back to the `LBG_*` environment variables.

use std::io::{self, BufWriter};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lbg_vq::TrainConfig;
use lbg_vq_cli::{decode, encode, train, Cli, Command};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lbg_vq=info,lbg_vq_cli=info")),
        )
        .with_writer(io::stderr)
        .init();

    match Cli::parse().command {
        Command::Train { input, output, params } => {
            let config = params.apply(TrainConfig::from_env());
            train(&input, &output, config)?;
            Ok(())
        }
        Command::Encode { codebook, input } => {
            encode(&codebook, &input, BufWriter::new(io::stdout().lock()))
        }
        Command::Decode { codebook, indices } => {
            decode(&codebook, &indices, BufWriter::new(io::stdout().lock()))
        }
    }
}
