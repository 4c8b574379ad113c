use crate::backbone::{disp_to_depth, DisparityBackbone, NUM_SCALES};
use crate::{Error, Result};
use cv_core::{DepthMap, InverseDepthMap, PoseVector, Tensor};
use cv_depth::{evaluate_depth, transform_depth, DepthEvaluation, MetricsConfig};
use cv_imgproc::flip_lr;
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// ResNet backbone variant, written `"XY"` with `X` the depth (18, 34 or 50)
/// and an optional `"pt"` suffix for ImageNet-pretrained weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResNetVersion {
    pub num_layers: u32,
    pub pretrained: bool,
}

impl ResNetVersion {
    pub const LAYERS: [u32; 3] = [18, 34, 50];

    pub fn new(num_layers: u32, pretrained: bool) -> Result<Self> {
        if !Self::LAYERS.contains(&num_layers) {
            return Err(Error::invalid_parameters(format!(
                "ResNet version {num_layers} not available"
            )));
        }
        Ok(Self {
            num_layers,
            pretrained,
        })
    }
}

impl FromStr for ResNetVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::invalid_parameters(format!("Invalid ResNet version '{s}'"));
        let num_layers = s
            .get(..2)
            .and_then(|layers| layers.parse().ok())
            .ok_or_else(invalid)?;
        let pretrained = match s.get(2..) {
            Some("") => false,
            Some("pt") => true,
            _ => return Err(invalid()),
        };
        Self::new(num_layers, pretrained)
    }
}

impl TryFrom<String> for ResNetVersion {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ResNetVersion> for String {
    fn from(version: ResNetVersion) -> Self {
        version.to_string()
    }
}

impl fmt::Display for ResNetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.num_layers)?;
        if self.pretrained {
            write!(f, "pt")?;
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_min_depth() -> f32 {
    0.1
}

fn default_max_depth() -> f32 {
    100.0
}

/// Parameters of a [`DepthNet`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthNetConfig {
    pub version: ResNetVersion,
    /// Scale sigmoid disparities to `[1 / max_depth, 1 / min_depth]`.
    #[serde(default = "default_true")]
    pub scale_output: bool,
    /// Own a learnable pose that re-projects supervision depth.
    #[serde(default)]
    pub adjust_depth: bool,
    #[serde(default = "default_min_depth")]
    pub min_depth: f32,
    #[serde(default = "default_max_depth")]
    pub max_depth: f32,
}

impl DepthNetConfig {
    pub fn new(version: ResNetVersion) -> Self {
        Self {
            version,
            scale_output: true,
            adjust_depth: false,
            min_depth: default_min_depth(),
            max_depth: default_max_depth(),
        }
    }

    pub fn with_scale_output(mut self, scale_output: bool) -> Self {
        self.scale_output = scale_output;
        self
    }

    pub fn with_adjust_depth(mut self, adjust_depth: bool) -> Self {
        self.adjust_depth = adjust_depth;
        self
    }

    pub fn with_depth_range(mut self, min_depth: f32, max_depth: f32) -> Self {
        self.min_depth = min_depth;
        self.max_depth = max_depth;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min_depth > 0.0 && self.min_depth < self.max_depth) {
            return Err(Error::invalid_parameters(format!(
                "Invalid output depth range [{}, {}]",
                self.min_depth, self.max_depth
            )));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Parse(format!("Invalid depth network config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }
}

/// Inverse depth network: a disparity backbone plus output scaling and an
/// optional learnable depth-alignment pose.
pub struct DepthNet<B> {
    backbone: B,
    config: DepthNetConfig,
    pose: Option<PoseVector>,
    training: bool,
}

impl<B: DisparityBackbone> DepthNet<B> {
    /// Starts in training mode; the pose, if enabled, is the identity.
    pub fn new(backbone: B, config: DepthNetConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!(
            version = %config.version,
            adjust_depth = config.adjust_depth,
            "created depth network"
        );
        Ok(Self {
            backbone,
            config,
            pose: config.adjust_depth.then(PoseVector::zeros),
            training: true,
        })
    }

    pub fn config(&self) -> &DepthNetConfig {
        &self.config
    }

    pub fn backbone(&self) -> &B {
        &self.backbone
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    pub fn train(&mut self) {
        self.training = true;
    }

    pub fn eval(&mut self) {
        self.training = false;
    }

    /// Current depth-alignment pose, `None` unless `adjust_depth` is enabled.
    pub fn pose(&self) -> Option<&PoseVector> {
        self.pose.as_ref()
    }

    /// Mutable pose for the optimizer.
    pub fn pose_mut(&mut self) -> Option<&mut PoseVector> {
        self.pose.as_mut()
    }

    /// Inverse depth maps: [`NUM_SCALES`] in training mode, one otherwise.
    pub fn forward(&mut self, rgb: &Tensor) -> Result<Vec<InverseDepthMap>> {
        self.infer(rgb, self.training)
    }

    fn infer(&mut self, rgb: &Tensor, training: bool) -> Result<Vec<InverseDepthMap>> {
        let shape = rgb.shape();
        if shape.channels != 3 {
            return Err(Error::dimension_mismatch(format!(
                "Expected an RGB batch, got shape {shape}"
            )));
        }

        let disps = self.backbone.forward(rgb)?;
        if disps.len() < NUM_SCALES {
            return Err(Error::RuntimeError(format!(
                "Backbone returned {} disparity maps, expected {NUM_SCALES}",
                disps.len()
            )));
        }
        for (i, disp) in disps.iter().enumerate() {
            let ds = disp.shape();
            if ds.channels != 1 || ds.batch != shape.batch {
                return Err(Error::dimension_mismatch(format!(
                    "Disparity scale {i} has shape {ds} for input {shape}"
                )));
            }
        }

        let keep = if training { NUM_SCALES } else { 1 };
        let inv_depths = disps
            .into_iter()
            .take(keep)
            .map(|disp| {
                if self.config.scale_output {
                    disp_to_depth(&disp, self.config.min_depth, self.config.max_depth).0
                } else {
                    disp
                }
            })
            .collect();
        Ok(inv_depths)
    }

    /// Re-project supervision depth with the current pose.
    ///
    /// Returns `depth` unchanged when the network has no pose.
    pub fn adjust_depth(&self, depth: &DepthMap, intrinsics: &[Matrix3<f64>]) -> Result<DepthMap> {
        match &self.pose {
            Some(pose) => transform_depth(depth, intrinsics, pose),
            None => Ok(depth.clone()),
        }
    }

    /// Evaluate on a batch with flip test-time augmentation.
    ///
    /// Runs inference on `rgb` and its mirror regardless of the current mode.
    pub fn evaluate(
        &mut self,
        rgb: &Tensor,
        gt: &DepthMap,
        config: &MetricsConfig,
    ) -> Result<DepthEvaluation> {
        let inv_depth = self.single_scale(rgb)?;
        let inv_depth_flipped = self.single_scale(&flip_lr(rgb))?;
        evaluate_depth(config, gt, &inv_depth, &inv_depth_flipped)
    }

    fn single_scale(&mut self, rgb: &Tensor) -> Result<InverseDepthMap> {
        self.infer(rgb, false)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::RuntimeError("Network produced no inverse depth".into()))
    }
}

impl<B> fmt::Debug for DepthNet<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepthNet")
            .field("config", &self.config)
            .field("pose", &self.pose)
            .field("training", &self.training)
            .finish_non_exhaustive()
    }
}
