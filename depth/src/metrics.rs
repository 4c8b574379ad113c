//! Depth accuracy metrics against ground truth.

use cv_core::{DepthMap, Tensor};
use cv_imgproc::{interpolate, pad_to, Interpolation};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Order of the values in [`DepthMetrics::as_array`].
pub const METRIC_NAMES: [&str; 7] = ["abs_rel", "sq_rel", "rmse", "rmse_log", "a1", "a2", "a3"];

/// Garg et al. evaluation crop as fractions of (height, width).
const GARG_CROP_ROWS: (f64, f64) = (0.408_108_11, 0.991_891_89);
const GARG_CROP_COLS: (f64, f64) = (0.035_947_71, 0.964_052_29);

/// How a prediction is brought to ground-truth resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScaleMode {
    /// Bilinear resampling with aligned corners.
    Resize,
    /// Zero-pad: anchor at the bottom edge, centered horizontally.
    ///
    /// Undoes a crop that removed the top rows and equal amounts of both sides.
    #[default]
    TopCenter,
}

impl FromStr for ScaleMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "resize" => Ok(Self::Resize),
            "top-center" => Ok(Self::TopCenter),
            other => Err(crate::Error::invalid_parameters(format!(
                "Depth scale function '{other}' not implemented"
            ))),
        }
    }
}

/// Evaluation crop applied on top of the depth range mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropMode {
    #[default]
    None,
    Garg,
}

impl FromStr for CropMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "" | "none" => Ok(Self::None),
            "garg" => Ok(Self::Garg),
            other => Err(crate::Error::invalid_parameters(format!(
                "Unknown crop '{other}'"
            ))),
        }
    }
}

/// Parameters of [`compute_depth_metrics`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Ground truth must be strictly above this to count as valid.
    pub min_depth: f32,
    /// Ground truth must be strictly below this to count as valid.
    pub max_depth: f32,
    pub crop: CropMode,
    pub scale_output: ScaleMode,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            min_depth: 0.0,
            max_depth: 80.0,
            crop: CropMode::None,
            scale_output: ScaleMode::TopCenter,
        }
    }
}

impl MetricsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_depth_range(mut self, min_depth: f32, max_depth: f32) -> Self {
        self.min_depth = min_depth;
        self.max_depth = max_depth;
        self
    }

    pub fn with_crop(mut self, crop: CropMode) -> Self {
        self.crop = crop;
        self
    }

    pub fn with_scale_output(mut self, scale_output: ScaleMode) -> Self {
        self.scale_output = scale_output;
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        if !(self.min_depth.is_finite() && self.max_depth.is_finite()) {
            return Err(crate::Error::invalid_parameters(
                "Depth range must be finite",
            ));
        }
        if self.min_depth < 0.0 || self.min_depth >= self.max_depth {
            return Err(crate::Error::invalid_parameters(format!(
                "Invalid depth range [{}, {}]",
                self.min_depth, self.max_depth
            )));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| crate::Error::Parse(format!("Invalid metrics config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// The seven standard depth metrics, averaged over a batch.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DepthMetrics {
    pub abs_rel: f64,
    pub sq_rel: f64,
    pub rmse: f64,
    pub rmse_log: f64,
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
}

impl DepthMetrics {
    /// Values in [`METRIC_NAMES`] order.
    pub fn as_array(&self) -> [f64; 7] {
        [
            self.abs_rel,
            self.sq_rel,
            self.rmse,
            self.rmse_log,
            self.a1,
            self.a2,
            self.a3,
        ]
    }

    pub fn from_array(values: [f64; 7]) -> Self {
        let [abs_rel, sq_rel, rmse, rmse_log, a1, a2, a3] = values;
        Self {
            abs_rel,
            sq_rel,
            rmse,
            rmse_log,
            a1,
            a2,
            a3,
        }
    }

    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> {
        METRIC_NAMES.into_iter().zip(self.as_array())
    }
}

impl fmt::Display for DepthMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.named().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{name}={value:.4}")?;
        }
        Ok(())
    }
}

/// Bring `pred` to the resolution of `gt`.
pub fn scale_depth(pred: &DepthMap, gt: &DepthMap, mode: ScaleMode) -> crate::Result<DepthMap> {
    let (ps, gs) = (pred.shape(), gt.shape());
    if (ps.batch, ps.channels) != (gs.batch, gs.channels) {
        return Err(crate::Error::dimension_mismatch(format!(
            "Prediction {ps} and ground truth {gs} differ in batch or channels"
        )));
    }

    match mode {
        ScaleMode::Resize => interpolate(pred, gs.height, gs.width, Interpolation::Linear),
        ScaleMode::TopCenter => {
            if ps.height > gs.height || ps.width > gs.width {
                return Err(crate::Error::InvalidInput(format!(
                    "Cannot uncrop prediction {ps} into smaller ground truth {gs}"
                )));
            }
            let top = gs.height - ps.height;
            let left = (gs.width - ps.width) / 2;
            Ok(pad_to(pred, gs.height, gs.width, top, left))
        }
    }
}

/// Half-open `(row, col)` bounds of the Garg crop for a `height x width` map.
pub fn garg_crop(height: usize, width: usize) -> ((usize, usize), (usize, usize)) {
    let h = height as f64;
    let w = width as f64;
    (
        (
            (GARG_CROP_ROWS.0 * h) as usize,
            (GARG_CROP_ROWS.1 * h) as usize,
        ),
        (
            (GARG_CROP_COLS.0 * w) as usize,
            (GARG_CROP_COLS.1 * w) as usize,
        ),
    )
}

/// Lower median (the smaller middle element for even counts).
fn lower_median(values: &mut [f64]) -> f64 {
    let mid = (values.len() - 1) / 2;
    let (_, median, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    *median
}

/// Metrics of one batch item, or `None` if it has no valid pixel.
fn item_metrics(
    config: &MetricsConfig,
    gt: &[f32],
    pred: &[f32],
    width: usize,
    crop: Option<((usize, usize), (usize, usize))>,
    use_gt_scale: bool,
) -> Option<[f64; 7]> {
    let (min_depth, max_depth) = (config.min_depth, config.max_depth);
    let in_crop = |i: usize| match crop {
        Some(((y1, y2), (x1, x2))) => {
            let (y, x) = (i / width, i % width);
            y >= y1 && y < y2 && x >= x1 && x < x2
        }
        None => true,
    };

    let (gt_valid, mut pred_valid): (Vec<f64>, Vec<f64>) = gt
        .iter()
        .zip(pred)
        .enumerate()
        .filter(|&(i, (&g, _))| g > min_depth && g < max_depth && in_crop(i))
        .map(|(_, (&g, &p))| (g as f64, p as f64))
        .unzip();

    if gt_valid.is_empty() {
        return None;
    }

    if use_gt_scale {
        // Selection reorders its input; the pairs below must stay aligned.
        let ratio = lower_median(&mut gt_valid.clone()) / lower_median(&mut pred_valid.clone());
        pred_valid.iter_mut().for_each(|p| *p *= ratio);
    }
    let (lo, hi) = (min_depth as f64, max_depth as f64);
    pred_valid.iter_mut().for_each(|p| *p = p.clamp(lo, hi));

    let n = gt_valid.len() as f64;
    // abs_rel, sq_rel, squared error, squared log error, a1, a2, a3
    let mut acc = [0.0f64; 7];
    for (&g, &p) in gt_valid.iter().zip(&pred_valid) {
        let thresh = (g / p).max(p / g);
        let diff = g - p;
        acc[0] += diff.abs() / g;
        acc[1] += diff * diff / g;
        acc[2] += diff * diff;
        acc[3] += (g.ln() - p.ln()).powi(2);
        acc[4] += f64::from(u8::from(thresh < 1.25));
        acc[5] += f64::from(u8::from(thresh < 1.25f64.powi(2)));
        acc[6] += f64::from(u8::from(thresh < 1.25f64.powi(3)));
    }

    Some([
        acc[0] / n,
        acc[1] / n,
        (acc[2] / n).sqrt(),
        (acc[3] / n).sqrt(),
        acc[4] / n,
        acc[5] / n,
        acc[6] / n,
    ])
}

/// Compute batch-averaged depth metrics of `pred` against `gt`.
///
/// Each item is scaled to ground-truth resolution, masked to valid ground
/// truth (inside `(min_depth, max_depth)` and the optional crop), optionally
/// median-scaled (`use_gt_scale`), clamped to the depth range and scored.
///
/// Items without a single valid pixel contribute zero, but the sum is still
/// divided by the full batch size, so such items pull every metric towards
/// zero (including the accuracies `a1..a3`).
pub fn compute_depth_metrics(
    config: &MetricsConfig,
    gt: &DepthMap,
    pred: &DepthMap,
    use_gt_scale: bool,
) -> crate::Result<DepthMetrics> {
    crate::ensure_single_channel(gt, "Ground truth depth")?;
    let batch_size = gt.shape().batch;
    if batch_size == 0 {
        return Err(crate::Error::InvalidInput(
            "Cannot compute metrics of an empty batch".into(),
        ));
    }

    let pred: Tensor = scale_depth(pred, gt, config.scale_output)?;
    let (height, width) = gt.shape().hw();
    let crop = match config.crop {
        CropMode::Garg => Some(garg_crop(height, width)),
        CropMode::None => None,
    };

    let per_item: Vec<Option<[f64; 7]>> = (0..batch_size)
        .into_par_iter()
        .map(|b| item_metrics(config, gt.item(b), pred.item(b), width, crop, use_gt_scale))
        .collect();

    let skipped = per_item.iter().filter(|m| m.is_none()).count();
    if skipped > 0 {
        tracing::debug!(skipped, batch_size, "batch items without valid ground truth");
    }

    let mut sum = [0.0f64; 7];
    for metrics in per_item.into_iter().flatten() {
        for (s, v) in sum.iter_mut().zip(metrics) {
            *s += v;
        }
    }
    Ok(DepthMetrics::from_array(sum.map(|s| s / batch_size as f64)))
}
