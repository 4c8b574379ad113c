use crate::{
    compute_depth_metrics, inv2depth, post_process_inv_depth, DepthMetrics, FuseMethod,
    MetricsConfig,
};
use cv_core::{DepthMap, InverseDepthMap};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Names of the four evaluation modes, in [`DepthEvaluation::modes`] order.
pub const EVALUATION_MODES: [&str; 4] = ["depth", "depth_pp", "depth_gt", "depth_pp_gt"];

/// Metrics of a raw and a flip-augmented prediction, with and without median scaling.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DepthEvaluation {
    pub depth: DepthMetrics,
    pub depth_pp: DepthMetrics,
    pub depth_gt: DepthMetrics,
    pub depth_pp_gt: DepthMetrics,
}

impl DepthEvaluation {
    pub fn modes(&self) -> impl Iterator<Item = (&'static str, DepthMetrics)> {
        EVALUATION_MODES
            .into_iter()
            .zip([self.depth, self.depth_pp, self.depth_gt, self.depth_pp_gt])
    }
}

impl fmt::Display for DepthEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, metrics) in self.modes() {
            writeln!(f, "{name:>12}: {metrics}")?;
        }
        Ok(())
    }
}

/// Evaluate a prediction and its flipped counterpart against ground truth.
///
/// `inv_depth_flipped` is the prediction made on the horizontally mirrored
/// image. The post-processed modes fuse both with [`FuseMethod::Mean`].
pub fn evaluate_depth(
    config: &MetricsConfig,
    gt: &DepthMap,
    inv_depth: &InverseDepthMap,
    inv_depth_flipped: &InverseDepthMap,
) -> crate::Result<DepthEvaluation> {
    let depth = inv2depth(inv_depth);
    let inv_depth_pp = post_process_inv_depth(inv_depth, inv_depth_flipped, FuseMethod::Mean)?;
    let depth_pp = inv2depth(&inv_depth_pp);

    let evaluation = DepthEvaluation {
        depth: compute_depth_metrics(config, gt, &depth, false)?,
        depth_pp: compute_depth_metrics(config, gt, &depth_pp, false)?,
        depth_gt: compute_depth_metrics(config, gt, &depth, true)?,
        depth_pp_gt: compute_depth_metrics(config, gt, &depth_pp, true)?,
    };
    tracing::debug!(
        abs_rel = evaluation.depth.abs_rel,
        abs_rel_pp = evaluation.depth_pp.abs_rel,
        "evaluated depth"
    );
    Ok(evaluation)
}
