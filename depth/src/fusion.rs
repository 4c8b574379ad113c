//! Flip test-time augmentation.

use cv_core::{InverseDepthMap, Tensor};
use cv_imgproc::flip_lr;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How two inverse depth predictions are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuseMethod {
    #[default]
    Mean,
    Max,
    Min,
}

impl FromStr for FuseMethod {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "mean" => Ok(Self::Mean),
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            other => Err(crate::Error::invalid_parameters(format!(
                "Unknown post-process method '{other}'"
            ))),
        }
    }
}

/// Fuse two inverse depth maps of identical shape.
pub fn fuse_inv_depth(
    inv_depth: &InverseDepthMap,
    inv_depth_hat: &InverseDepthMap,
    method: FuseMethod,
) -> crate::Result<InverseDepthMap> {
    match method {
        FuseMethod::Mean => Ok(inv_depth.add(inv_depth_hat)?.scale(0.5)),
        FuseMethod::Max => inv_depth.maximum(inv_depth_hat),
        FuseMethod::Min => inv_depth.minimum(inv_depth_hat),
    }
}

/// Per-column blend weight of the flipped prediction.
///
/// With `x` running uniformly over `[0, 1]` across the width, the weight is
/// `1 - clamp(20 * (x - 0.05), 0, 1)`: one over the leftmost 5%, falling to
/// zero at 10%, zero elsewhere.
pub fn blend_mask(width: usize) -> Vec<f32> {
    let step = if width > 1 {
        1.0 / (width - 1) as f32
    } else {
        0.0
    };
    (0..width)
        .map(|w| {
            let x = w as f32 * step;
            1.0 - (20.0 * (x - 0.05)).clamp(0.0, 1.0)
        })
        .collect()
}

/// Combine a prediction with the prediction made on the mirrored image.
///
/// `inv_depth_flipped` is mirrored back and fused with `inv_depth`. Near the
/// left border the result follows the mirrored prediction, near the right
/// border the original one, and the fused map in between, which removes the
/// disocclusion band each single prediction shows on one side.
pub fn post_process_inv_depth(
    inv_depth: &InverseDepthMap,
    inv_depth_flipped: &InverseDepthMap,
    method: FuseMethod,
) -> crate::Result<InverseDepthMap> {
    inv_depth.ensure_same_shape(inv_depth_flipped)?;
    let inv_depth_hat = flip_lr(inv_depth_flipped);
    let fused = fuse_inv_depth(inv_depth, &inv_depth_hat, method)?;

    let width = inv_depth.shape().width;
    let mask = blend_mask(width);
    let mut out = Tensor::zeros(inv_depth.shape());
    if width == 0 {
        return Ok(out);
    }

    out.as_mut_slice()
        .par_chunks_mut(width)
        .zip(inv_depth.as_slice().par_chunks(width))
        .zip(inv_depth_hat.as_slice().par_chunks(width))
        .zip(fused.as_slice().par_chunks(width))
        .for_each(|(((row, orig), hat), fused)| {
            for w in 0..width {
                let m = mask[w];
                let m_hat = mask[width - 1 - w];
                row[w] = m_hat * orig[w] + m * hat[w] + (1.0 - m - m_hat) * fused[w];
            }
        });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_core::TensorShape;

    fn random_like(shape: TensorShape, seed: u32) -> Tensor {
        Tensor::from_fn(shape, |b, c, h, w| {
            let x = (b * 131 + c * 71 + h * 37 + w * 17) as u32 ^ seed;
            (x.wrapping_mul(2654435761) % 1000) as f32 / 1000.0 + 0.01
        })
    }

    #[test]
    fn fuse_is_commutative() {
        let shape = TensorShape::map(2, 5, 13);
        let a = random_like(shape, 1);
        let b = random_like(shape, 7);
        for method in [FuseMethod::Mean, FuseMethod::Max, FuseMethod::Min] {
            assert_eq!(
                fuse_inv_depth(&a, &b, method).unwrap(),
                fuse_inv_depth(&b, &a, method).unwrap()
            );
        }
    }

    #[test]
    fn fuse_shape_mismatch_fails() {
        let a = Tensor::ones(TensorShape::map(1, 2, 2));
        let b = Tensor::ones(TensorShape::map(1, 2, 3));
        assert!(fuse_inv_depth(&a, &b, FuseMethod::Mean).is_err());
    }

    #[test]
    fn unknown_method_is_rejected() {
        assert!(matches!(
            "median".parse::<FuseMethod>(),
            Err(crate::Error::InvalidParameters(_))
        ));
        assert_eq!("max".parse::<FuseMethod>().unwrap(), FuseMethod::Max);
    }

    #[test]
    fn blend_mask_ramps_down_over_the_left_border() {
        let mask = blend_mask(101);
        assert_eq!(mask[0], 1.0);
        assert!(mask.windows(2).all(|w| w[1] <= w[0]));
        assert!(mask[11..].iter().all(|&m| m == 0.0));
        assert!(mask.iter().all(|m| (0.0..=1.0).contains(m)));
    }

    #[test]
    fn constant_maps_stay_constant_at_every_width() {
        for width in [1, 2, 20, 101] {
            let shape = TensorShape::map(1, 2, width);
            let inv = Tensor::full(shape, 0.25);
            for method in [FuseMethod::Mean, FuseMethod::Max, FuseMethod::Min] {
                let pp = post_process_inv_depth(&inv, &inv, method).unwrap();
                assert!(
                    pp.as_slice().iter().all(|&v| (v - 0.25).abs() < 1e-6),
                    "width {width}, {method:?}"
                );
            }
        }
    }

    #[test]
    fn borders_follow_single_predictions() {
        let shape = TensorShape::map(1, 3, 40);
        let inv = random_like(shape, 3);
        let flipped = random_like(shape, 11);
        let hat = flip_lr(&flipped);
        let pp = post_process_inv_depth(&inv, &flipped, FuseMethod::Mean).unwrap();

        for h in 0..3 {
            let left = pp.index(0, 0, h, 0).unwrap();
            let right = pp.index(0, 0, h, 39).unwrap();
            assert!((left - hat.index(0, 0, h, 0).unwrap()).abs() < 1e-6);
            assert!((right - inv.index(0, 0, h, 39).unwrap()).abs() < 1e-6);

            let fused = 0.5 * (inv.index(0, 0, h, 20).unwrap() + hat.index(0, 0, h, 20).unwrap());
            assert!((pp.index(0, 0, h, 20).unwrap() - fused).abs() < 1e-6);
        }
    }

    #[test]
    fn identical_predictions_are_unchanged() {
        let shape = TensorShape::map(2, 4, 30);
        let inv = random_like(shape, 5);
        let flipped = flip_lr(&inv);
        let pp = post_process_inv_depth(&inv, &flipped, FuseMethod::Max).unwrap();
        for (a, b) in pp.as_slice().iter().zip(inv.as_slice()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
