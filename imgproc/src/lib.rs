//! Image processing primitives over BCHW tensors.
//!
//! Everything here works plane by plane, so batch items and channels never
//! share state and are processed in parallel.

pub mod colormap;
pub mod geometry;
pub mod gradient;
pub mod resize;

pub use colormap::*;
pub use geometry::*;
pub use gradient::*;
pub use resize::*;

pub use cv_core::{Error, Result};
