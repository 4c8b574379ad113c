use crate::Result;
use cv_core::{DepthMap, InverseDepthMap, Tensor};

/// Number of output scales of a disparity decoder.
pub const NUM_SCALES: usize = 4;

/// An encoder/decoder predicting disparity from an RGB batch.
pub trait DisparityBackbone {
    /// Run on a `(B, 3, H, W)` image batch in `[0, 1]`.
    ///
    /// Returns [`NUM_SCALES`] sigmoid disparity maps `(B, 1, h_i, w_i)`, finest
    /// first.
    fn forward(&mut self, rgb: &Tensor) -> Result<Vec<Tensor>>;
}

impl<B: DisparityBackbone + ?Sized> DisparityBackbone for Box<B> {
    fn forward(&mut self, rgb: &Tensor) -> Result<Vec<Tensor>> {
        (**self).forward(rgb)
    }
}

/// Map a sigmoid disparity in `[0, 1]` to `(scaled_disp, depth)`.
///
/// `scaled_disp = 1 / max_depth + (1 / min_depth - 1 / max_depth) * disp`,
/// so a disparity of 0 lands at `max_depth` and 1 at `min_depth`.
pub fn disp_to_depth(disp: &Tensor, min_depth: f32, max_depth: f32) -> (InverseDepthMap, DepthMap) {
    let min_disp = 1.0 / max_depth;
    let max_disp = 1.0 / min_depth;
    let scaled = disp.map(|d| min_disp + (max_disp - min_disp) * d);
    let depth = scaled.map(|s| 1.0 / s);
    (scaled, depth)
}
