//! Depth map persistence.

use crate::{Error, Result};
use cv_core::{DepthMap, Tensor, TensorShape};
use image::{DynamicImage, ImageBuffer, Luma, RgbImage};
use nalgebra::Matrix3;
use ndarray::{Array2, Array3, ArrayD};
use ndarray_npy::{NpzReader, NpzWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Stored PNG value per unit of depth.
pub const PNG_DEPTH_SCALE: f32 = 256.0;

/// Supported depth file formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthFormat {
    Npz,
    Png,
}

impl DepthFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("npz") => Ok(Self::Npz),
            Some("png") => Ok(Self::Png),
            _ => Err(Error::UnsupportedFormat(format!(
                "Depth extension not supported: {}",
                path.display()
            ))),
        }
    }
}

/// Optional arrays stored next to the depth in an `.npz` archive.
///
/// Ignored when writing `.png`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthExtras<'a> {
    pub intrinsics: Option<&'a Matrix3<f64>>,
    pub rgb: Option<&'a RgbImage>,
    pub viz: Option<&'a RgbImage>,
    pub depth_input: Option<&'a DepthMap>,
}

impl<'a> DepthExtras<'a> {
    pub fn with_intrinsics(mut self, intrinsics: &'a Matrix3<f64>) -> Self {
        self.intrinsics = Some(intrinsics);
        self
    }

    pub fn with_rgb(mut self, rgb: &'a RgbImage) -> Self {
        self.rgb = Some(rgb);
        self
    }

    pub fn with_viz(mut self, viz: &'a RgbImage) -> Self {
        self.viz = Some(viz);
        self
    }

    pub fn with_depth_input(mut self, depth_input: &'a DepthMap) -> Self {
        self.depth_input = Some(depth_input);
        self
    }
}

/// Load a depth map as a `(1, 1, H, W)` tensor.
///
/// `.npz` files must hold an array named `depth` (f32 or f64) whose leading
/// axes, if any, have size one. `.png` files must be single channel with a
/// maximum stored value above 255; values are divided by [`PNG_DEPTH_SCALE`].
pub fn load_depth(path: impl AsRef<Path>) -> Result<DepthMap> {
    let path = path.as_ref();
    let depth = match DepthFormat::from_path(path)? {
        DepthFormat::Npz => load_npz(path)?,
        DepthFormat::Png => load_png(path)?,
    };
    tracing::debug!(path = %path.display(), shape = %depth.shape(), "loaded depth");
    Ok(depth)
}

fn load_npz(path: &Path) -> Result<DepthMap> {
    let mut npz = NpzReader::new(File::open(path)?)
        .map_err(|e| Error::Parse(format!("{}: {e}", path.display())))?;

    let mut last_err = None;
    for name in ["depth", "depth.npy"] {
        match npz.by_name::<ndarray::OwnedRepr<f32>, ndarray::IxDyn>(name) {
            Ok(array) => return array_to_depth(array),
            Err(e) => last_err = Some(e),
        }
        match npz.by_name::<ndarray::OwnedRepr<f64>, ndarray::IxDyn>(name) {
            Ok(array) => return array_to_depth(array.mapv(|v| v as f32)),
            Err(e) => last_err = Some(e),
        }
    }
    Err(Error::Parse(format!(
        "{}: no readable 'depth' array ({})",
        path.display(),
        last_err.map(|e| e.to_string()).unwrap_or_default()
    )))
}

fn array_to_depth(array: ArrayD<f32>) -> Result<DepthMap> {
    let dims = array.shape();
    if dims.len() < 2 || dims[..dims.len() - 2].iter().any(|&d| d != 1) {
        return Err(Error::dimension_mismatch(format!(
            "Expected a single depth map, got array of shape {dims:?}"
        )));
    }
    let (height, width) = (dims[dims.len() - 2], dims[dims.len() - 1]);
    let data = array.iter().copied().collect();
    Tensor::from_vec(data, TensorShape::map(1, height, width))
}

fn load_png(path: &Path) -> Result<DepthMap> {
    let ((width, height), stored): ((u32, u32), Vec<u16>) = match image::open(path)? {
        DynamicImage::ImageLuma16(buf) => (buf.dimensions(), buf.into_raw()),
        DynamicImage::ImageLuma8(buf) => (
            buf.dimensions(),
            buf.into_raw().into_iter().map(u16::from).collect(),
        ),
        other => {
            return Err(Error::UnsupportedFormat(format!(
                "{}: depth PNG must be single channel, got {:?}",
                path.display(),
                other.color()
            )))
        }
    };

    let max = stored.iter().copied().max().unwrap_or(0);
    if max <= 255 {
        return Err(Error::Parse(format!(
            "{}: maximum stored value {max} <= 255, not a scaled depth PNG",
            path.display()
        )));
    }

    let data = stored.into_iter().map(|v| v as f32 / PNG_DEPTH_SCALE).collect();
    Tensor::from_vec(data, TensorShape::map(1, height as usize, width as usize))
}

/// Write a `(1, 1, H, W)` depth map.
///
/// The format follows the extension. An unsupported extension or a malformed
/// map or extra fails before a file is created. PNG stores `depth * 256`
/// truncated and saturated to the `u16` range.
pub fn write_depth(
    path: impl AsRef<Path>,
    depth: &DepthMap,
    extras: &DepthExtras<'_>,
) -> Result<()> {
    let path = path.as_ref();
    let format = DepthFormat::from_path(path)?;
    let array = map_to_array(depth)?;

    match format {
        DepthFormat::Npz => NpzArrays::new(array, extras)?.write(path)?,
        DepthFormat::Png => write_png(path, &array)?,
    }
    tracing::debug!(path = %path.display(), ?format, "wrote depth");
    Ok(())
}

/// Everything stored in a depth archive, converted up front.
struct NpzArrays {
    depth: Array2<f32>,
    intrinsics: Option<Array2<f64>>,
    rgb: Option<Array3<u8>>,
    viz: Option<Array3<u8>>,
    depth_input: Option<Array2<f32>>,
}

impl NpzArrays {
    fn new(depth: Array2<f32>, extras: &DepthExtras<'_>) -> Result<Self> {
        Ok(Self {
            depth,
            intrinsics: extras
                .intrinsics
                .map(|k| Array2::from_shape_fn((3, 3), |(r, c)| k[(r, c)])),
            rgb: extras.rgb.map(image_to_array).transpose()?,
            viz: extras.viz.map(image_to_array).transpose()?,
            depth_input: extras.depth_input.map(map_to_array).transpose()?,
        })
    }

    fn write(&self, path: &Path) -> Result<()> {
        let npz_err =
            |e: ndarray_npy::WriteNpzError| Error::RuntimeError(format!("{}: {e}", path.display()));
        let mut npz = NpzWriter::new_compressed(BufWriter::new(File::create(path)?));

        npz.add_array("depth", &self.depth).map_err(npz_err)?;
        if let Some(k) = &self.intrinsics {
            npz.add_array("intrinsics", k).map_err(npz_err)?;
        }
        if let Some(rgb) = &self.rgb {
            npz.add_array("rgb", rgb).map_err(npz_err)?;
        }
        if let Some(viz) = &self.viz {
            npz.add_array("viz", viz).map_err(npz_err)?;
        }
        if let Some(input) = &self.depth_input {
            npz.add_array("depth_input", input).map_err(npz_err)?;
        }
        npz.finish().map_err(npz_err)?;
        Ok(())
    }
}

fn map_to_array(map: &DepthMap) -> Result<Array2<f32>> {
    let shape = map.shape();
    if (shape.batch, shape.channels) != (1, 1) {
        return Err(Error::InvalidInput(format!(
            "Can only write one single-channel depth map, got {shape}"
        )));
    }
    let (height, width) = shape.hw();
    let plane = map.plane(0, 0).to_vec();
    Array2::from_shape_vec((height, width), plane).map_err(|e| Error::RuntimeError(e.to_string()))
}

fn image_to_array(image: &RgbImage) -> Result<Array3<u8>> {
    let (width, height) = image.dimensions();
    Array3::from_shape_vec((height as usize, width as usize, 3), image.as_raw().clone())
        .map_err(|e| Error::RuntimeError(e.to_string()))
}

fn write_png(path: &Path, depth: &Array2<f32>) -> Result<()> {
    let (height, width) = depth.dim();
    let data: Vec<u16> = depth
        .iter()
        .map(|&d| (d * PNG_DEPTH_SCALE).trunc().clamp(0.0, u16::MAX as f32) as u16)
        .collect();
    let buf: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_raw(width as u32, height as u32, data)
            .ok_or_else(|| Error::RuntimeError("Depth buffer does not match its size".into()))?;
    buf.save(path)?;
    Ok(())
}
