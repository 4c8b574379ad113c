//! Re-projection of a depth map through a rigid transform.

use crate::sparse::{SparsePoint, SparsePointSet};
use cv_core::{DepthMap, PoseVector, RigidTransform, RotationMode, Tensor};
use nalgebra::{Matrix3, Point3, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What to keep when two points land on the same pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// The point that comes last in collated order overwrites the others.
    #[default]
    LastWriteWins,
    /// The smallest depth wins (z-buffer).
    KeepNearest,
}

impl FromStr for CollisionPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "last-write-wins" | "last" => Ok(Self::LastWriteWins),
            "keep-nearest" | "nearest" => Ok(Self::KeepNearest),
            other => Err(crate::Error::invalid_parameters(format!(
                "Unknown collision policy '{other}'"
            ))),
        }
    }
}

/// A sparse point after re-projection: target pixel and new depth.
#[derive(Debug, Clone, Copy)]
struct Projected {
    batch: usize,
    row: usize,
    col: usize,
    depth: f32,
}

/// Back-project, move and re-project one point.
///
/// Pixels are handled as `(row, col)` pairs, so the row goes through the first
/// axis of `K`. Returns `None` when the point ends up behind the camera or
/// outside the `height x width` image.
fn project_point(
    point: &SparsePoint,
    k: &Matrix3<f64>,
    k_inv: &Matrix3<f64>,
    transform: &RigidTransform,
    height: usize,
    width: usize,
) -> Option<Projected> {
    let d = f64::from(point.depth);
    let pixel = Vector3::new(point.row as f64 * d, point.col as f64 * d, d);
    let camera = transform.transform_point(&Point3::from(k_inv * pixel)).coords;
    let z = camera.z;
    if !(z > 0.0) {
        return None;
    }

    // Normalized by the camera-frame depth, not by the third row of `K * X`.
    let image = k * camera;
    let row = (image.x / z).round_ties_even();
    let col = (image.y / z).round_ties_even();
    if !(row >= 0.0 && col >= 0.0 && row < height as f64 && col < width as f64) {
        return None;
    }

    Some(Projected {
        batch: point.batch,
        row: row as usize,
        col: col as usize,
        depth: z as f32,
    })
}

/// [`transform_depth_with_policy`] with [`CollisionPolicy::LastWriteWins`].
pub fn transform_depth(
    depth: &DepthMap,
    intrinsics: &[Matrix3<f64>],
    pose: &PoseVector,
) -> crate::Result<DepthMap> {
    transform_depth_with_policy(depth, intrinsics, pose, CollisionPolicy::LastWriteWins)
}

/// Re-project every valid pixel of `depth` into the frame given by `pose`.
///
/// Each pixel with `depth > 0` is lifted to 3-D with `K^-1`, moved by the
/// rigid transform of `pose` (Euler rotation), projected back with `K` and
/// rounded to the nearest pixel. Points outside the image or with a
/// non-positive new depth are dropped. The result has the shape of `depth`
/// and is zero wherever no point landed.
///
/// Only `intrinsics[0]` is used, for every batch item. A singular `K` is not an
/// error: it yields an all-zero map.
pub fn transform_depth_with_policy(
    depth: &DepthMap,
    intrinsics: &[Matrix3<f64>],
    pose: &PoseVector,
    policy: CollisionPolicy,
) -> crate::Result<DepthMap> {
    crate::ensure_single_channel(depth, "Depth")?;
    let k = intrinsics.first().ok_or_else(|| {
        crate::Error::InvalidInput("At least one intrinsics matrix is required".into())
    })?;

    let shape = depth.shape();
    let (height, width) = shape.hw();
    let mut out = Tensor::zeros(shape);

    let Some(k_inv) = k.try_inverse() else {
        tracing::warn!("singular intrinsics, transformed depth is empty");
        return Ok(out);
    };

    let points = SparsePointSet::from_depth(depth)?;
    if points.is_empty() {
        tracing::debug!("no valid depth to transform");
        return Ok(out);
    }

    let transform = pose.to_transform(RotationMode::Euler);
    let projected: Vec<Projected> = points
        .points()
        .par_iter()
        .filter_map(|p| {
            project_point(
                p,
                k,
                &k_inv,
                &transform,
                height,
                width,
            )
        })
        .collect();

    // Sequential so that collisions resolve in collated order.
    for p in &projected {
        let target = out.index_mut(p.batch, 0, p.row, p.col)?;
        match policy {
            CollisionPolicy::LastWriteWins => *target = p.depth,
            CollisionPolicy::KeepNearest => {
                if *target == 0.0 || p.depth < *target {
                    *target = p.depth;
                }
            }
        }
    }

    if projected.is_empty() {
        tracing::warn!(points = points.len(), "every transformed point left the image");
    }
    tracing::debug!(
        points = points.len(),
        rasterized = projected.len(),
        ?policy,
        "transformed depth"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_core::{CameraIntrinsics, TensorShape};

    fn single_pixel(height: usize, width: usize, row: usize, col: usize, value: f32) -> DepthMap {
        let mut depth = Tensor::zeros(TensorShape::map(1, height, width));
        *depth.index_mut(0, 0, row, col).unwrap() = value;
        depth
    }

    fn kitti_like() -> Matrix3<f64> {
        CameraIntrinsics::new(50.0, 50.0, 6.0, 8.0).matrix()
    }

    #[test]
    fn identity_pose_keeps_pixels_in_place() {
        let depth = single_pixel(12, 16, 5, 9, 7.5);
        for k in [Matrix3::identity(), kitti_like()] {
            let out = transform_depth(&depth, &[k], &PoseVector::zeros()).unwrap();
            for (a, b) in out.as_slice().iter().zip(depth.as_slice()) {
                assert!((a - b).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn identity_pose_preserves_a_dense_map() {
        let depth = Tensor::from_fn(TensorShape::map(2, 6, 7), |b, _, h, w| {
            1.0 + (b * 42 + h * 7 + w) as f32 * 0.25
        });
        let out = transform_depth(&depth, &[kitti_like()], &PoseVector::zeros()).unwrap();
        for (a, b) in out.as_slice().iter().zip(depth.as_slice()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn translation_along_optical_axis_changes_depth() {
        let depth = single_pixel(4, 4, 0, 0, 2.0);
        let pose = PoseVector::new(Vector3::new(0.0, 0.0, 1.5), Vector3::zeros());
        let out = transform_depth(&depth, &[Matrix3::identity()], &pose).unwrap();
        // The pixel at the principal point stays put.
        assert!((out.index(0, 0, 0, 0).unwrap() - 3.5).abs() < 1e-6);
    }

    #[test]
    fn points_leaving_the_image_are_dropped() {
        let depth = single_pixel(4, 4, 1, 1, 1.0);
        let pose = PoseVector::new(Vector3::new(10.0, 0.0, 0.0), Vector3::zeros());
        let out = transform_depth(&depth, &[Matrix3::identity()], &pose).unwrap();
        assert!(out.as_slice().iter().all(|&v| v == 0.0));

        let behind = PoseVector::new(Vector3::new(0.0, 0.0, -5.0), Vector3::zeros());
        let out = transform_depth(&depth, &[Matrix3::identity()], &behind).unwrap();
        assert!(out.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn collisions_follow_policy() {
        // Both pixels of the same row land on the principal point once the
        // scene is pushed far away, nearer one first in collated order.
        let depth = Tensor::from_vec(vec![1.0, 3.0], TensorShape::map(1, 1, 2)).unwrap();
        let pose = PoseVector::new(Vector3::new(0.0, 0.0, 1000.0), Vector3::zeros());
        let k = [Matrix3::identity()];

        let last = transform_depth_with_policy(&depth, &k, &pose, CollisionPolicy::LastWriteWins)
            .unwrap();
        let nearest =
            transform_depth_with_policy(&depth, &k, &pose, CollisionPolicy::KeepNearest).unwrap();
        assert!((last.index(0, 0, 0, 0).unwrap() - 1003.0).abs() < 1e-3);
        assert!((nearest.index(0, 0, 0, 0).unwrap() - 1001.0).abs() < 1e-3);
        assert_eq!(last.index(0, 0, 0, 1).unwrap(), 0.0);
    }

    #[test]
    fn projection_divides_by_camera_depth() {
        let depth = single_pixel(6, 6, 2, 2, 1.0);
        let k = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, 2.0));
        let out = transform_depth(&depth, &[k], &PoseVector::zeros()).unwrap();
        assert!((out.index(0, 0, 4, 4).unwrap() - 0.5).abs() < 1e-6);
        assert_eq!(out.as_slice().iter().filter(|&&v| v != 0.0).count(), 1);
    }

    #[test]
    fn singular_intrinsics_give_empty_map() {
        let depth = single_pixel(3, 3, 1, 1, 2.0);
        let out = transform_depth(&depth, &[Matrix3::zeros()], &PoseVector::zeros()).unwrap();
        assert!(out.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn missing_intrinsics_is_an_error() {
        let depth = single_pixel(3, 3, 1, 1, 2.0);
        assert!(transform_depth(&depth, &[], &PoseVector::zeros()).is_err());
    }

    #[test]
    fn only_first_intrinsics_are_used() {
        let depth = single_pixel(8, 8, 2, 3, 4.0);
        let ignored = CameraIntrinsics::new(500.0, 500.0, 1.0, 1.0).matrix();
        let pose = PoseVector::zeros();
        let a = transform_depth(&depth, &[Matrix3::identity()], &pose).unwrap();
        let b = transform_depth(&depth, &[Matrix3::identity(), ignored], &pose).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn policy_parses() {
        assert_eq!(
            "keep-nearest".parse::<CollisionPolicy>().unwrap(),
            CollisionPolicy::KeepNearest
        );
        assert!("z-buffer".parse::<CollisionPolicy>().is_err());
    }
}
