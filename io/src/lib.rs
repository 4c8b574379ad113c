//! Depth map file I/O
//!
//! Supports reading and writing depth maps in two formats:
//! - NPZ (compressed numpy archive with a `depth` array and optional extras)
//! - PNG (16-bit single channel, depth scaled by 256)

pub mod depth;

pub use depth::{load_depth, write_depth, DepthExtras, DepthFormat, PNG_DEPTH_SCALE};

pub use cv_core::{Error, Result};
