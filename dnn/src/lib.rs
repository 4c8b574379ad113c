//! Deep Neural Network module
//!
//! This crate wraps an external encoder/decoder that predicts disparity
//! and turns its output into the inverse depth maps used for training and
//! evaluation. The backbone itself is supplied by the caller through the
//! [`DisparityBackbone`] trait.

pub mod backbone;
pub mod net;

pub use backbone::{disp_to_depth, DisparityBackbone, NUM_SCALES};
pub use net::{DepthNet, DepthNetConfig, ResNetVersion};

pub use cv_core::{Error, Result};
