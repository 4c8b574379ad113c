//! Colormapped inverse depth.

use cv_core::{InverseDepthMap, EPSILON};
use cv_imgproc::Colormap;
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// Parameters of [`viz_inv_depth`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VizOptions {
    /// Fixed normalizer; when `None` the `percentile` of the map is used.
    pub normalizer: Option<f32>,
    /// In `[0, 100]`.
    pub percentile: f32,
    pub colormap: Colormap,
    /// Leave zero pixels out of the percentile.
    pub filter_zeros: bool,
    /// Treat zero pixels as missing: excluded from the percentile and drawn black.
    pub zero_to_nan: bool,
}

impl Default for VizOptions {
    fn default() -> Self {
        Self {
            normalizer: None,
            percentile: 95.0,
            colormap: Colormap::Hsv,
            filter_zeros: false,
            zero_to_nan: false,
        }
    }
}

impl VizOptions {
    pub fn with_normalizer(mut self, normalizer: f32) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn with_percentile(mut self, percentile: f32) -> Self {
        self.percentile = percentile;
        self
    }

    pub fn with_colormap(mut self, colormap: Colormap) -> Self {
        self.colormap = colormap;
        self
    }

    pub fn with_filter_zeros(mut self, filter_zeros: bool) -> Self {
        self.filter_zeros = filter_zeros;
        self
    }

    pub fn with_zero_to_nan(mut self, zero_to_nan: bool) -> Self {
        self.zero_to_nan = zero_to_nan;
        self
    }
}

/// Linearly interpolated percentile, `q` in `[0, 100]`. `0.0` for no values.
pub fn percentile(values: &[f32], q: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f32::total_cmp);

    let rank = (q.clamp(0.0, 100.0) as f64 / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = (rank - lo as f64) as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Render a `(1, 1, H, W)` inverse depth map as an RGB image.
///
/// Values are divided by `normalizer + EPSILON`, clipped to `[0, 1]` and
/// mapped through the colormap. NaN pixels, and zero pixels when
/// `zero_to_nan` is set, are drawn black.
pub fn viz_inv_depth(inv_depth: &InverseDepthMap, options: &VizOptions) -> crate::Result<RgbImage> {
    crate::ensure_single_channel(inv_depth, "Inverse depth")?;
    let shape = inv_depth.shape();
    if shape.batch != 1 {
        return Err(crate::Error::InvalidInput(format!(
            "Can only visualize one inverse depth map at a time, got {shape}"
        )));
    }
    if !(0.0..=100.0).contains(&options.percentile) {
        return Err(crate::Error::invalid_parameters(format!(
            "Percentile {} outside [0, 100]",
            options.percentile
        )));
    }

    let values = inv_depth.as_slice();
    let is_missing = |v: f32| v.is_nan() || (options.zero_to_nan && v == 0.0);
    let normalizer = match options.normalizer {
        Some(n) => n,
        None => {
            let drop_zeros = options.filter_zeros || options.zero_to_nan;
            let kept: Vec<f32> = values
                .iter()
                .copied()
                .filter(|&v| !is_missing(v) && !(drop_zeros && v <= 0.0))
                .collect();
            percentile(&kept, options.percentile)
        }
    };
    let scale = 1.0 / (normalizer + EPSILON);

    let (height, width) = shape.hw();
    let mut image = RgbImage::new(width as u32, height as u32);
    for (pixel, &v) in image.pixels_mut().zip(values) {
        *pixel = if is_missing(v) {
            Rgb([0, 0, 0])
        } else {
            Rgb(options.colormap.apply_u8((v * scale).clamp(0.0, 1.0)))
        };
    }
    tracing::trace!(normalizer, colormap = ?options.colormap, "rendered inverse depth");
    Ok(image)
}
