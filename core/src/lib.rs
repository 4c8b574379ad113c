//! Core types shared across the depth workspace.
//!
//! This crate contains:
//! - a dense 4-D [`Tensor`] in `(batch, channel, height, width)` layout,
//! - pinhole camera intrinsics and rigid pose helpers ([`CameraIntrinsics`], [`PoseVector`]),
//! - the shared [`Error`] / [`Result`] types,
//! - global rayon thread-pool initialization.

pub mod geometry;
pub mod runtime;
pub mod tensor;

pub use geometry::*;
pub use runtime::*;
pub use tensor::*;

/// Numeric floor applied before every reciprocal or normalizing division.
///
/// Depth, inverse depth and per-scale means are clamped to this value so that
/// degenerate inputs produce large finite numbers instead of infinities.
pub const EPSILON: f32 = 1e-6;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Runtime error: {0}")]
    RuntimeError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    pub fn invalid_parameters(msg: impl Into<String>) -> Self {
        Self::InvalidParameters(msg.into())
    }

    pub fn dimension_mismatch(msg: impl Into<String>) -> Self {
        Self::DimensionMismatch(msg.into())
    }
}
