//! # reduce: adaptive size-budget reducer
//!
//! Shrinks an encoded image until its byte length fits a budget. Each pass estimates how
//! much to shrink from the ratio of current size to budget, on the assumption that encoded
//! size grows roughly with pixel area. This is an approximation, so the pass repeats on the
//! freshly encoded bytes (and their current dimensions) until the result fits.
//!
//! The loop is bounded: [`ReduceError::NonConvergence`] is returned once the iteration cap
//! is reached, or as soon as the image is down to a single pixel and still too large.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use tracing::{debug, info, warn};

use crate::contract::ImageCodec;

/// Fixed emoji upload ceiling imposed by the platform, in bytes.
pub const DEFAULT_BUDGET_BYTES: usize = 256_000;

pub const DEFAULT_MAX_ITERATIONS: u32 = 16;

#[derive(Debug, thiserror::Error)]
pub enum ReduceError {
    #[error("could not decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("could not encode image as {format:?}: {source}")]
    Encode {
        format: ImageFormat,
        #[source]
        source: image::ImageError,
    },
    #[error(
        "image did not fit {budget} bytes after {iterations} reductions (last size {last_len} bytes)"
    )]
    NonConvergence {
        iterations: u32,
        last_len: usize,
        budget: usize,
    },
}

/// [`ImageCodec`] backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageRsCodec;

impl ImageCodec for ImageRsCodec {
    fn decode(
        &self,
        bytes: &[u8],
        format: Option<ImageFormat>,
    ) -> Result<DynamicImage, image::ImageError> {
        match format {
            Some(format) => image::load_from_memory_with_format(bytes, format),
            None => image::load_from_memory(bytes),
        }
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: ImageFormat,
    ) -> Result<Vec<u8>, image::ImageError> {
        let mut out = Vec::new();
        // JPEG has no alpha channel.
        if format == ImageFormat::Jpeg && image.color().has_alpha() {
            DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut Cursor::new(&mut out), format)?;
        } else {
            image.write_to(&mut Cursor::new(&mut out), format)?;
        }
        Ok(out)
    }
}

pub struct SizeBudgetReducer {
    codec: Box<dyn ImageCodec>,
    max_iterations: u32,
}

impl Default for SizeBudgetReducer {
    fn default() -> Self {
        Self::new(Box::new(ImageRsCodec))
    }
}

impl SizeBudgetReducer {
    pub fn new(codec: Box<dyn ImageCodec>) -> Self {
        Self {
            codec,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Returns `bytes` re-encoded to at most `budget_bytes`.
    ///
    /// Input already within budget is returned untouched without being decoded.
    /// `format_hint` is a format name or extension (`png`, `jpeg`, `gif`); when absent or
    /// unknown the format is guessed from the bytes, falling back to PNG.
    pub fn reduce(
        &self,
        bytes: Vec<u8>,
        format_hint: Option<&str>,
        budget_bytes: usize,
    ) -> Result<Vec<u8>, ReduceError> {
        if bytes.len() <= budget_bytes {
            return Ok(bytes);
        }

        let hinted = format_hint.and_then(ImageFormat::from_extension);
        let format = hinted
            .or_else(|| image::guess_format(&bytes).ok())
            .unwrap_or(ImageFormat::Png);
        info!(
            len = bytes.len(),
            budget = budget_bytes,
            ?format,
            "[REDUCE] Payload over budget, reducing"
        );

        let mut current = bytes;
        let mut iterations = 0;
        while current.len() > budget_bytes {
            if iterations == self.max_iterations {
                warn!(
                    iterations,
                    len = current.len(),
                    budget = budget_bytes,
                    "[REDUCE] Iteration cap reached"
                );
                return Err(non_convergence(iterations, &current, budget_bytes));
            }

            // The input is sniffed like any upload; later passes decode our own output.
            let image = self
                .codec
                .decode(&current, (iterations > 0).then_some(format))
                .map_err(ReduceError::Decode)?;
            let (width, height) = image.dimensions();
            if width <= 1 && height <= 1 {
                warn!(
                    iterations,
                    len = current.len(),
                    budget = budget_bytes,
                    "[REDUCE] Image cannot shrink any further"
                );
                return Err(non_convergence(iterations, &current, budget_bytes));
            }

            let factor = reduction_factor(current.len(), budget_bytes);
            let reduced = downsample(&image, factor);
            current = self
                .codec
                .encode(&reduced, format)
                .map_err(|source| ReduceError::Encode { format, source })?;
            iterations += 1;
            debug!(
                iteration = iterations,
                factor,
                width = reduced.width(),
                height = reduced.height(),
                len = current.len(),
                "[REDUCE] Re-encoded"
            );
        }

        info!(
            iterations,
            len = current.len(),
            budget = budget_bytes,
            "[REDUCE] Payload fits budget"
        );
        Ok(current)
    }
}

/// Reduces with the default `image`-crate codec and iteration cap.
pub fn reduce(
    bytes: Vec<u8>,
    format_hint: Option<&str>,
    budget_bytes: usize,
) -> Result<Vec<u8>, ReduceError> {
    SizeBudgetReducer::default().reduce(bytes, format_hint, budget_bytes)
}

/// MIME type of an encoded image, sniffed from its magic bytes.
pub fn mime_type(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}

/// Integer divisor for both dimensions: `ceil(sqrt(len / budget))`.
///
/// The square root turns the size ratio into a per-axis ratio, treating encoded size as a
/// proxy for pixel area.
pub fn reduction_factor(len: usize, budget_bytes: usize) -> u32 {
    let ratio = len as f64 / budget_bytes.max(1) as f64;
    (ratio.sqrt().ceil() as u32).max(1)
}

fn downsample(image: &DynamicImage, factor: u32) -> DynamicImage {
    let width = image.width().div_ceil(factor).max(1);
    let height = image.height().div_ceil(factor).max(1);
    image.resize_exact(width, height, FilterType::Triangle)
}

fn non_convergence(iterations: u32, current: &[u8], budget: usize) -> ReduceError {
    ReduceError::NonConvergence {
        iterations,
        last_len: current.len(),
        budget,
    }
}
