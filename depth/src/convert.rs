//! Depth <-> inverse depth conversion.
//!
//! The two directions are deliberately asymmetric. [`depth2inv`] maps invalid
//! depth (`<= 0`) to an inverse depth of exactly `0`, while [`inv2depth`] has no
//! such rule: an inverse depth of `0` becomes the large finite depth
//! `1 / EPSILON`, never back to `0`. Callers that need to keep track of invalid
//! pixels must do so from the depth side.

use crate::clamp_eps;
use cv_core::{DepthMap, InverseDepthMap};

/// `1 / max(depth, EPSILON)`, with every `depth <= 0` pixel forced to `0`.
pub fn depth2inv(depth: &DepthMap) -> InverseDepthMap {
    depth.map(|d| if d <= 0.0 { 0.0 } else { 1.0 / clamp_eps(d) })
}

/// `1 / max(inv_depth, EPSILON)`. No zeroing.
pub fn inv2depth(inv_depth: &InverseDepthMap) -> DepthMap {
    inv_depth.map(|v| 1.0 / clamp_eps(v))
}

/// [`depth2inv`] over every scale, order preserved.
pub fn depth2inv_seq(depths: &[DepthMap]) -> Vec<InverseDepthMap> {
    depths.iter().map(depth2inv).collect()
}

/// [`inv2depth`] over every scale, order preserved.
pub fn inv2depth_seq(inv_depths: &[InverseDepthMap]) -> Vec<DepthMap> {
    inv_depths.iter().map(inv2depth).collect()
}
