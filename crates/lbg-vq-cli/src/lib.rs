//! Command handlers behind the `lbg-vq` binary.
//!
//! Training parameters resolve in three layers: [`TrainConfig::default`],
//! then the `LBG_*` environment variables ([`TrainConfig::from_env`]),
//! then explicit flags.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use lbg_vq::persist::{load_codebook, load_vectors, save_codebook, write_vectors};
use lbg_vq::{CancelToken, LbgTrainer, NoopObserver, Quantizer, TrainConfig, TrainReport};

// ─────────────────────────────────────────────
// Arguments
// ─────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "lbg-vq")]
#[command(about = "Train LBG vector quantization codebooks and encode/decode with them")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Train a codebook from a vector file
    Train {
        /// Training vectors, one per line
        #[arg(long)]
        input: PathBuf,

        /// Where to write the codebook
        #[arg(long)]
        output: PathBuf,

        #[command(flatten)]
        params: TrainArgs,
    },

    /// Print the nearest codeword index for every input vector
    Encode {
        #[arg(long)]
        codebook: PathBuf,

        #[arg(long)]
        input: PathBuf,
    },

    /// Print the codeword for every index
    Decode {
        #[arg(long)]
        codebook: PathBuf,

        /// One codeword index per line
        #[arg(long)]
        indices: PathBuf,
    },
}

/// Training flags. Unset flags keep the value from the base config.
#[derive(Debug, Clone, Default, Args)]
pub struct TrainArgs {
    /// Target codebook size [env: LBG_TARGET_SIZE]
    #[arg(long)]
    pub size: Option<usize>,

    /// Relative distortion change that ends a refine phase [env: LBG_EPSILON]
    #[arg(long)]
    pub epsilon: Option<f64>,

    /// Maximum Lloyd iterations per split level [env: LBG_MAX_ITERATIONS]
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Split perturbation magnitude [env: LBG_PERTURBATION]
    #[arg(long)]
    pub perturbation: Option<f64>,

    /// Extra perturbation on the first coordinate [env: LBG_SYMMETRY_OFFSET]
    #[arg(long)]
    pub symmetry_offset: Option<f64>,
}

impl TrainArgs {
    /// Overlay the flags that were given on top of `base`.
    pub fn apply(&self, base: TrainConfig) -> TrainConfig {
        TrainConfig {
            target_size:     self.size.unwrap_or(base.target_size),
            epsilon:         self.epsilon.unwrap_or(base.epsilon),
            max_iterations:  self.max_iterations.unwrap_or(base.max_iterations),
            perturbation:    self.perturbation.unwrap_or(base.perturbation),
            symmetry_offset: self.symmetry_offset.unwrap_or(base.symmetry_offset),
        }
    }
}

// ─────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────

/// Train on the vectors in `input` and write the codebook to `output`.
pub fn train(input: &Path, output: &Path, config: TrainConfig) -> Result<TrainReport> {
    let store = load_vectors(input)
        .with_context(|| format!("failed to load training vectors from {}", input.display()))?;
    if store.is_empty() {
        tracing::warn!(path = %input.display(), "no training vectors found");
    }

    let trainer = LbgTrainer::new(config).context("invalid training configuration")?;
    let report = trainer.train_with(&store, &mut NoopObserver, &CancelToken::new())?;

    save_codebook(&report.codebook, output)
        .with_context(|| format!("failed to write codebook to {}", output.display()))?;

    tracing::info!(
        path = %output.display(),
        size = report.codebook.size(),
        dim = report.codebook.dimension(),
        distortion = format!("{:.4}", report.final_distortion),
        "Codebook written"
    );
    Ok(report)
}

/// Write the codeword index of every vector in `input`, one per line.
pub fn encode<W: Write>(codebook: &Path, input: &Path, mut out: W) -> Result<()> {
    let q = open_quantizer(codebook)?;
    let store = load_vectors(input)
        .with_context(|| format!("failed to load vectors from {}", input.display()))?;

    let vectors: Vec<&[f64]> = store.iter().collect();
    let indices = q.encode_batch(&vectors).context("encoding failed")?;

    for index in indices {
        writeln!(out, "{index}")?;
    }
    out.flush()?;
    Ok(())
}

/// Write the codeword for every index in `indices`, one vector per line.
pub fn decode<W: Write>(codebook: &Path, indices: &Path, out: W) -> Result<()> {
    let q = open_quantizer(codebook)?;
    let indices = read_indices(indices)?;
    let words = q.decode_batch(&indices).context("decoding failed")?;
    write_vectors(&words, out)?;
    Ok(())
}

fn open_quantizer(path: &Path) -> Result<Quantizer> {
    let codebook = load_codebook(path)
        .with_context(|| format!("failed to load codebook from {}", path.display()))?;
    Ok(Quantizer::new(codebook))
}

/// Read one index per line from `path`, skipping blank lines.
pub fn read_indices(path: &Path) -> Result<Vec<usize>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    parse_indices(BufReader::new(file), &path.display().to_string())
}

/// Parse one index per line. Errors name `source` and the 1-based line.
pub fn parse_indices<R: BufRead>(input: R, source: &str) -> Result<Vec<usize>> {
    let mut indices = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match trimmed.parse() {
            Ok(index) => indices.push(index),
            Err(e) => bail!("{source}:{}: bad index `{trimmed}`: {e}", i + 1),
        }
    }
    Ok(indices)
}
