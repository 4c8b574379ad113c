//! Inverse depth post-processing and evaluation
//!
//! This crate turns raw multi-scale inverse depth predictions into the
//! quantities a self-supervised monocular depth pipeline needs:
//! - conversion between depth and inverse depth ([`depth2inv`], [`inv2depth`]),
//! - scale-invariant smoothness terms for training ([`calc_smoothness`]),
//! - flip test-time augmentation ([`post_process_inv_depth`]),
//! - standard accuracy metrics against ground truth ([`compute_depth_metrics`]),
//! - re-projection of sparse depth through a rigid transform ([`transform_depth`]),
//! - colormapped visualization ([`viz_inv_depth`]).
//!
//! All maps use the `(batch, 1, height, width)` layout of [`cv_core::Tensor`].
//! Pixels with depth `<= 0` are invalid.

pub mod convert;
pub mod evaluate;
pub mod fusion;
pub mod metrics;
pub mod smoothness;
pub mod sparse;
pub mod transform;
pub mod viz;

pub use convert::*;
pub use evaluate::*;
pub use fusion::*;
pub use metrics::*;
pub use smoothness::*;
pub use sparse::*;
pub use transform::*;
pub use viz::*;

pub use cv_core::{DepthMap, Error, InverseDepthMap, Result, EPSILON};

/// Clamp from below at [`EPSILON`], letting NaN through unchanged.
#[inline]
pub(crate) fn clamp_eps(v: f32) -> f32 {
    if v < EPSILON {
        EPSILON
    } else {
        v
    }
}

pub(crate) fn ensure_single_channel(map: &cv_core::Tensor, what: &str) -> Result<()> {
    if !map.shape().is_single_channel() {
        return Err(Error::dimension_mismatch(format!(
            "{what} must have exactly one channel, got shape {}",
            map.shape()
        )));
    }
    Ok(())
}
