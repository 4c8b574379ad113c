use nalgebra::{Matrix3, Point3, Rotation3, Vector3, Vector6};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pinhole camera intrinsics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }
}

/// Rotation convention for the last three entries of a [`PoseVector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RotationMode {
    /// `R = Rx(a) * Ry(b) * Rz(c)` for angles `(a, b, c)`.
    #[default]
    Euler,
    /// Rodrigues rotation of the scaled axis `(a, b, c)`.
    AxisAngle,
}

impl FromStr for RotationMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "euler" => Ok(Self::Euler),
            "axis-angle" | "axisangle" => Ok(Self::AxisAngle),
            other => Err(crate::Error::invalid_parameters(format!(
                "Unknown rotation mode '{other}'"
            ))),
        }
    }
}

/// Rigid-body transform `x' = R x + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl RigidTransform {
    pub fn new(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation * point.coords + self.translation)
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::new(Matrix3::identity(), Vector3::zeros())
    }
}

/// Six-element rigid pose: `[tx, ty, tz, r0, r1, r2]`.
///
/// The rotation part is interpreted according to a [`RotationMode`]. The zero
/// vector is the identity transform under every mode.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseVector(pub Vector6<f64>);

impl PoseVector {
    pub fn zeros() -> Self {
        Self(Vector6::zeros())
    }

    pub fn new(translation: Vector3<f64>, rotation: Vector3<f64>) -> Self {
        Self(Vector6::new(
            translation.x,
            translation.y,
            translation.z,
            rotation.x,
            rotation.y,
            rotation.z,
        ))
    }

    pub fn from_slice(values: &[f64]) -> crate::Result<Self> {
        if values.len() != 6 {
            return Err(crate::Error::InvalidInput(format!(
                "Pose vector needs 6 elements, got {}",
                values.len()
            )));
        }
        Ok(Self(Vector6::from_column_slice(values)))
    }

    pub fn translation(&self) -> Vector3<f64> {
        Vector3::new(self.0[0], self.0[1], self.0[2])
    }

    pub fn rotation_params(&self) -> Vector3<f64> {
        Vector3::new(self.0[3], self.0[4], self.0[5])
    }

    pub fn rotation_matrix(&self, mode: RotationMode) -> Matrix3<f64> {
        let r = self.rotation_params();
        match mode {
            RotationMode::Euler => {
                let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), r.x);
                let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), r.y);
                let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), r.z);
                (rx * ry * rz).into_inner()
            }
            RotationMode::AxisAngle => Rotation3::from_scaled_axis(r).into_inner(),
        }
    }

    pub fn to_transform(&self, mode: RotationMode) -> RigidTransform {
        RigidTransform::new(self.rotation_matrix(mode), self.translation())
    }

    pub fn is_identity(&self) -> bool {
        self.0.iter().all(|&v| v == 0.0)
    }
}

impl fmt::Display for PoseVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = &self.0;
        write!(
            f,
            "t=({:.4}, {:.4}, {:.4}) r=({:.4}, {:.4}, {:.4})",
            v[0], v[1], v[2], v[3], v[4], v[5]
        )
    }
}
