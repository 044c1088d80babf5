//! Grayscale image ⇄ block-vector conversion.
//!
//! Images are cut into `b × b` blocks scanned row-major, each block
//! flattened row-major into a vector of dimension `b²`. This is the usual
//! supplier of training vectors for image VQ.

use tracing::info;

use crate::{Codebook, Result, VectorStore, VqError};

/// An 8-bit grayscale image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl GrayImage {
    /// # Errors
    ///
    /// [`VqError::InvalidImage`] if `pixels.len() != width * height`.
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self> {
        if width.checked_mul(height) != Some(pixels.len()) {
            return Err(VqError::InvalidImage(format!(
                "{width}x{height} image needs {} pixels, got {}",
                width.saturating_mul(height),
                pixels.len()
            )));
        }
        Ok(Self { width, height, pixels })
    }

    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }
}

/// Block layout of a decomposed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrid {
    pub block_size: usize,
    pub blocks_x: usize,
    pub blocks_y: usize,
}

impl BlockGrid {
    pub fn block_count(&self) -> usize {
        self.blocks_x * self.blocks_y
    }

    /// Dimension of each block vector.
    pub fn dimension(&self) -> usize {
        self.block_size * self.block_size
    }
}

/// Cut `image` into `block_size × block_size` vectors.
///
/// Edges that do not fill a whole block are cropped.
pub fn image_to_vectors(image: &GrayImage, block_size: usize) -> Result<(VectorStore, BlockGrid)> {
    if block_size == 0 {
        return Err(VqError::InvalidImage("block size must be at least 1".into()));
    }
    let dim = block_dimension(block_size)?;
    let grid = BlockGrid {
        block_size,
        blocks_x: image.width / block_size,
        blocks_y: image.height / block_size,
    };
    let (used_w, used_h) = (grid.blocks_x * block_size, grid.blocks_y * block_size);
    if used_w != image.width || used_h != image.height {
        info!(
            width = image.width,
            height = image.height,
            block_size,
            cropped_width = used_w,
            cropped_height = used_h,
            "image not a multiple of block size, cropping"
        );
    }

    let mut flat = Vec::with_capacity(grid.block_count() * dim);
    for by in 0..grid.blocks_y {
        for bx in 0..grid.blocks_x {
            for row in 0..block_size {
                let start = (by * block_size + row) * image.width + bx * block_size;
                flat.extend(image.pixels[start..start + block_size].iter().map(|&p| f64::from(p)));
            }
        }
    }

    let store = if flat.is_empty() {
        VectorStore::empty(dim)
    } else {
        VectorStore::from_flat(&flat, dim)?
    };
    Ok((store, grid))
}

/// Reassemble block vectors into an image, rounding and clamping to `0..=255`.
pub fn vectors_to_image<V: AsRef<[f64]>>(grid: &BlockGrid, vectors: &[V]) -> Result<GrayImage> {
    if vectors.len() != grid.block_count() {
        return Err(VqError::InvalidImage(format!(
            "grid has {} blocks, got {} vectors",
            grid.block_count(),
            vectors.len()
        )));
    }
    let b = grid.block_size;
    let dim = block_dimension(b)?;
    let width = grid.blocks_x * b;
    let mut image = GrayImage::filled(width, grid.blocks_y * b, 0);

    for (i, v) in vectors.iter().enumerate() {
        let v = v.as_ref();
        if v.len() != dim {
            return Err(VqError::DimensionMismatch {
                expected: dim,
                got: v.len(),
            });
        }
        let (bx, by) = (i % grid.blocks_x, i / grid.blocks_x);
        for (row, values) in v.chunks_exact(b).enumerate() {
            let start = (by * b + row) * width + bx * b;
            for (dst, &x) in image.pixels[start..start + b].iter_mut().zip(values) {
                *dst = to_pixel(x);
            }
        }
    }
    Ok(image)
}

/// Lay codewords out as tiles in a near-square grid for inspection.
///
/// Values are stretched from the global codeword min/max to `0..=255`;
/// a flat codebook renders as mid-gray.
pub fn codebook_mosaic(codebook: &Codebook, block_size: usize) -> Result<GrayImage> {
    match block_size.checked_mul(block_size) {
        Some(dim) if dim == codebook.dimension() => {}
        _ => {
            return Err(VqError::DimensionMismatch {
                expected: block_size.saturating_mul(block_size),
                got: codebook.dimension(),
            })
        }
    }
    if codebook.is_empty() {
        return Ok(GrayImage::filled(0, 0, 0));
    }

    let k = codebook.size();
    let cols = (k as f64).sqrt().ceil() as usize;
    let rows = k.div_ceil(cols);
    let width = cols * block_size;
    let mut image = GrayImage::filled(width, rows * block_size, 0);

    let (lo, hi) = codebook
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)));
    let scale = if hi > lo { 255.0 / (hi - lo) } else { 0.0 };

    for (i, word) in codebook.iter().enumerate() {
        let (gx, gy) = (i % cols, i / cols);
        for (row, values) in word.chunks_exact(block_size).enumerate() {
            let start = (gy * block_size + row) * width + gx * block_size;
            for (dst, &x) in image.pixels[start..start + block_size].iter_mut().zip(values) {
                *dst = if scale > 0.0 { to_pixel((x - lo) * scale) } else { 128 };
            }
        }
    }
    Ok(image)
}

/// Peak signal-to-noise ratio in dB between two 8-bit images.
///
/// Identical images give `f64::INFINITY`.
pub fn psnr(original: &GrayImage, reconstructed: &GrayImage) -> Result<f64> {
    if original.width != reconstructed.width || original.height != reconstructed.height {
        return Err(VqError::InvalidImage(format!(
            "size mismatch: {}x{} vs {}x{}",
            original.width, original.height, reconstructed.width, reconstructed.height
        )));
    }
    if original.pixels.is_empty() {
        return Err(VqError::InvalidImage("empty image".into()));
    }
    let sse: f64 = original
        .pixels
        .iter()
        .zip(&reconstructed.pixels)
        .map(|(&a, &b)| {
            let d = f64::from(a) - f64::from(b);
            d * d
        })
        .sum();
    let mse = sse / original.pixels.len() as f64;
    if mse == 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(10.0 * (255.0 * 255.0 / mse).log10())
}

fn block_dimension(block_size: usize) -> Result<usize> {
    block_size
        .checked_mul(block_size)
        .ok_or_else(|| VqError::InvalidImage(format!("block size {block_size} is too large")))
}

fn to_pixel(x: f64) -> u8 {
    x.round().clamp(0.0, 255.0) as u8
}
