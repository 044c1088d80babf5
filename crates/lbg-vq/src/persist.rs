//! Plain-text codebook and vector files.
//!
//! ## Codebook format
//!
//! ```text
//! K D
//! c0_0 c0_1 … c0_{D-1}
//! …
//! c{K-1}_0 … c{K-1}_{D-1}
//! ```
//!
//! Values use Rust's shortest round-trip float formatting, so a saved
//! codebook loads back bit-for-bit.
//!
//! ## Vector format
//!
//! One vector per line, whitespace-separated. Blank lines and lines
//! starting with `#` are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::{Codebook, Result, VectorStore, VqError};

/// Write `codebook` in the text format.
pub fn write_codebook<W: Write>(codebook: &Codebook, mut out: W) -> Result<()> {
    writeln!(out, "{} {}", codebook.size(), codebook.dimension())?;
    for word in codebook.iter() {
        write_row(&mut out, word)?;
    }
    out.flush()?;
    Ok(())
}

/// Read a codebook written by [`write_codebook`].
pub fn read_codebook<R: BufRead>(input: R) -> Result<Codebook> {
    let mut lines = input.lines().enumerate();

    let (size, dim) = match lines.next() {
        Some((_, header)) => {
            let header = header?;
            let mut fields = header.split_whitespace();
            let size = parse_field::<usize>(fields.next(), 1, "codebook size")?;
            let dim = parse_field::<usize>(fields.next(), 1, "vector dimension")?;
            if fields.next().is_some() {
                return Err(format_err(1, "header must be `K D`"));
            }
            (size, dim)
        }
        None => return Err(format_err(1, "missing header")),
    };

    // The header is untrusted; grow on demand past a modest reservation.
    let mut codewords = Vec::with_capacity(size.min(1024));
    let mut last_line = 1;
    for (i, line) in lines {
        let line_no = i + 1;
        last_line = line_no;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if codewords.len() == size {
            return Err(format_err(line_no, "more codewords than the header declares"));
        }
        let row = parse_row(&line, line_no)?;
        if row.len() != dim {
            return Err(format_err(
                line_no,
                format!("expected {dim} values, found {}", row.len()),
            ));
        }
        codewords.push(row);
    }
    if codewords.len() != size {
        return Err(format_err(
            last_line + 1,
            format!("header declares {size} codewords, found {}", codewords.len()),
        ));
    }
    Codebook::from_codewords(dim, codewords)
}

pub fn save_codebook(codebook: &Codebook, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    write_codebook(codebook, BufWriter::new(File::create(path)?))?;
    debug!(path = %path.display(), size = codebook.size(), "codebook saved");
    Ok(())
}

pub fn load_codebook(path: impl AsRef<Path>) -> Result<Codebook> {
    let path = path.as_ref();
    let codebook = read_codebook(BufReader::new(File::open(path)?))?;
    debug!(path = %path.display(), size = codebook.size(), "codebook loaded");
    Ok(codebook)
}

/// Read one vector per line into a [`VectorStore`].
///
/// A row whose length differs from the first row is a format error.
pub fn read_vectors<R: BufRead>(input: R) -> Result<VectorStore> {
    let mut vectors: Vec<Vec<f64>> = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let row = parse_row(trimmed, i + 1)?;
        if let Some(first) = vectors.first() {
            if row.len() != first.len() {
                return Err(format_err(
                    i + 1,
                    format!("expected {} values, found {}", first.len(), row.len()),
                ));
            }
        }
        vectors.push(row);
    }
    VectorStore::new(vectors)
}

pub fn load_vectors(path: impl AsRef<Path>) -> Result<VectorStore> {
    let path = path.as_ref();
    let store = read_vectors(BufReader::new(File::open(path)?))?;
    debug!(path = %path.display(), vectors = store.len(), dim = store.dimension(), "vectors loaded");
    Ok(store)
}

/// Write vectors one per line in the format [`read_vectors`] accepts.
pub fn write_vectors<W: Write, V: AsRef<[f64]>>(vectors: &[V], mut out: W) -> Result<()> {
    for v in vectors {
        write_row(&mut out, v.as_ref())?;
    }
    out.flush()?;
    Ok(())
}

fn write_row<W: Write>(out: &mut W, row: &[f64]) -> Result<()> {
    let mut first = true;
    for x in row {
        if !first {
            out.write_all(b" ")?;
        }
        write!(out, "{x:?}")?;
        first = false;
    }
    out.write_all(b"\n")?;
    Ok(())
}

fn parse_row(line: &str, line_no: usize) -> Result<Vec<f64>> {
    line.split_whitespace()
        .map(|tok| {
            tok.parse::<f64>()
                .map_err(|e| format_err(line_no, format!("bad number `{tok}`: {e}")))
        })
        .collect()
}

fn parse_field<T: std::str::FromStr>(tok: Option<&str>, line_no: usize, what: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let tok = tok.ok_or_else(|| format_err(line_no, format!("missing {what}")))?;
    tok.parse::<T>()
        .map_err(|e| format_err(line_no, format!("bad {what} `{tok}`: {e}")))
}

fn format_err(line: usize, reason: impl Into<String>) -> VqError {
    VqError::Format {
        line,
        reason: reason.into(),
    }
}
