//! Edge-aware smoothness terms for multi-scale inverse depth.

use crate::clamp_eps;
use cv_core::{InverseDepthMap, Tensor};
use cv_imgproc::{gradient_x, gradient_y};
use rayon::prelude::*;

/// Divide every `(b, c)` plane of every scale by its own spatial mean.
///
/// The mean is clamped at `EPSILON`, so an all-zero plane stays all-zero.
pub fn inv_depths_normalize(inv_depths: &[InverseDepthMap]) -> Vec<InverseDepthMap> {
    inv_depths.iter().map(normalize_one).collect()
}

fn normalize_one(inv_depth: &InverseDepthMap) -> InverseDepthMap {
    let means = inv_depth.plane_means();
    let plane = inv_depth.shape().plane_len();
    let mut out = inv_depth.clone();
    if plane == 0 {
        return out;
    }

    out.as_mut_slice()
        .par_chunks_mut(plane)
        .zip(means.par_iter())
        .for_each(|(values, &mean)| {
            let denom = clamp_eps(mean);
            values.iter_mut().for_each(|v| *v /= denom);
        });
    out
}

/// `exp(-mean_c |grad|)`, collapsing the channel axis of an image gradient.
fn edge_weight(image_gradient: &Tensor) -> Tensor {
    let shape = image_gradient.shape();
    let out_shape = shape.with_channels(1);
    let plane = shape.plane_len();
    let channels = shape.channels.max(1) as f32;
    let mut out = Tensor::zeros(out_shape);
    if plane == 0 {
        return out;
    }

    out.as_mut_slice()
        .par_chunks_mut(plane)
        .enumerate()
        .for_each(|(b, weights)| {
            let item = image_gradient.item(b);
            for (i, w) in weights.iter_mut().enumerate() {
                let sum: f32 = (0..shape.channels).map(|c| item[c * plane + i].abs()).sum();
                *w = (-sum / channels).exp();
            }
        });
    out
}

/// Edge-aware smoothness of `num_scales` inverse depth maps.
///
/// Each inverse depth map is mean-normalized, differentiated along x and y,
/// and multiplied by `exp(-mean_c |image gradient|)`, so depth discontinuities
/// are penalized less where the color image has strong edges. Returns
/// `(smoothness_x, smoothness_y)`; the x terms are one column narrower and the
/// y terms one row shorter than the inputs.
pub fn calc_smoothness(
    inv_depths: &[InverseDepthMap],
    images: &[Tensor],
    num_scales: usize,
) -> crate::Result<(Vec<Tensor>, Vec<Tensor>)> {
    if num_scales > inv_depths.len() || num_scales > images.len() {
        return Err(crate::Error::InvalidInput(format!(
            "Requested {num_scales} scales but got {} inverse depth maps and {} images",
            inv_depths.len(),
            images.len()
        )));
    }

    let norm = inv_depths_normalize(&inv_depths[..num_scales]);
    let mut smoothness_x = Vec::with_capacity(num_scales);
    let mut smoothness_y = Vec::with_capacity(num_scales);

    for (i, (inv_depth, image)) in norm.iter().zip(images).enumerate() {
        crate::ensure_single_channel(inv_depth, "Inverse depth")?;
        let (ds, is) = (inv_depth.shape(), image.shape());
        if (ds.batch, ds.height, ds.width) != (is.batch, is.height, is.width) {
            return Err(crate::Error::dimension_mismatch(format!(
                "Scale {i}: inverse depth {ds} does not match image {is}"
            )));
        }

        let weight_x = edge_weight(&gradient_x(image)?);
        let weight_y = edge_weight(&gradient_y(image)?);
        smoothness_x.push(gradient_x(inv_depth)?.mul(&weight_x)?);
        smoothness_y.push(gradient_y(inv_depth)?.mul(&weight_y)?);
    }

    tracing::trace!(num_scales, "computed smoothness terms");
    Ok((smoothness_x, smoothness_y))
}

/// Scalar smoothness loss:
/// `weight * sum_i (mean|sx_i| + mean|sy_i|) / 2^i / num_scales`.
///
/// Coarser scales (higher `i`) contribute geometrically less.
pub fn smoothness_loss(smoothness_x: &[Tensor], smoothness_y: &[Tensor], weight: f32) -> f32 {
    let num_scales = smoothness_x.len().min(smoothness_y.len());
    if num_scales == 0 {
        return 0.0;
    }
    let abs_mean = |t: &Tensor| t.map(f32::abs).mean();
    let total: f32 = smoothness_x
        .iter()
        .zip(smoothness_y)
        .enumerate()
        .map(|(i, (sx, sy))| (abs_mean(sx) + abs_mean(sy)) / 2f32.powi(i as i32))
        .sum();
    weight * total / num_scales as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_core::TensorShape;

    #[test]
    fn normalized_planes_have_unit_mean() {
        let t = Tensor::from_fn(TensorShape::new(2, 1, 4, 5), |b, _, h, w| {
            (b + 1) as f32 * (h * 5 + w + 1) as f32
        });
        let norm = inv_depths_normalize(&[t]);
        for m in norm[0].plane_means() {
            assert!((m - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn normalize_zero_plane_stays_zero() {
        let t: Tensor = Tensor::zeros(TensorShape::map(1, 3, 3));
        let norm = inv_depths_normalize(&[t.clone()]);
        assert_eq!(norm[0], t);
    }

    #[test]
    fn flat_image_gives_unit_weights() {
        let image = Tensor::full(TensorShape::new(1, 3, 4, 4), 0.5);
        let inv = Tensor::from_fn(TensorShape::map(1, 4, 4), |_, _, _, w| (w + 1) as f32);
        let (sx, sy) = calc_smoothness(&[inv.clone()], &[image], 1).unwrap();

        let expected = gradient_x(&inv_depths_normalize(&[inv])[0]).unwrap();
        for (a, b) in sx[0].as_slice().iter().zip(expected.as_slice()) {
            assert!((a - b).abs() < 1e-6);
        }
        assert!(sy[0].as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn image_edges_suppress_smoothness() {
        // Vertical color edge between columns 1 and 2.
        let image = Tensor::from_fn(TensorShape::new(1, 3, 2, 4), |_, _, _, w| {
            if w < 2 { 0.0 } else { 3.0 }
        });
        let inv = Tensor::from_fn(TensorShape::map(1, 2, 4), |_, _, _, w| (w * w + 1) as f32);
        let (sx, _) = calc_smoothness(&[inv.clone()], &[image], 1).unwrap();
        let raw = gradient_x(&inv_depths_normalize(&[inv])[0]).unwrap();

        let edge = sx[0].index(0, 0, 0, 1).unwrap();
        let raw_edge = raw.index(0, 0, 0, 1).unwrap();
        assert!((edge - raw_edge * (-3.0f32).exp()).abs() < 1e-6);
        assert_eq!(sx[0].index(0, 0, 0, 0).unwrap(), raw.index(0, 0, 0, 0).unwrap());
    }

    #[test]
    fn too_many_scales_is_an_error() {
        let inv = Tensor::ones(TensorShape::map(1, 2, 2));
        let image = Tensor::ones(TensorShape::new(1, 3, 2, 2));
        assert!(calc_smoothness(&[inv], &[image], 2).is_err());
    }

    #[test]
    fn loss_weights_coarser_scales_less() {
        let s = Tensor::full(TensorShape::map(1, 2, 2), -1.0);
        let loss = smoothness_loss(&[s.clone(), s.clone()], &[s.clone(), s], 0.5);
        // ((1 + 1) / 1 + (1 + 1) / 2) / 2 * 0.5
        assert!((loss - 0.75).abs() < 1e-6);
        assert_eq!(smoothness_loss(&[], &[], 1.0), 0.0);
    }
}
