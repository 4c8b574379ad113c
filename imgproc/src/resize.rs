use crate::gradient::per_plane;
use cv_core::Tensor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Interpolation {
    Nearest,
    /// Bilinear with aligned corners: the corner pixels of source and
    /// destination coincide.
    #[default]
    Linear,
}

/// Resample every plane of `src` to `height x width`.
pub fn interpolate(
    src: &Tensor,
    height: usize,
    width: usize,
    interpolation: Interpolation,
) -> crate::Result<Tensor> {
    let shape = src.shape();
    let out_shape = shape.with_hw(height, width);
    if out_shape.plane_len() > 0 && shape.plane_len() == 0 {
        return Err(crate::Error::InvalidInput(format!(
            "Cannot interpolate empty tensor {shape} to {height}x{width}"
        )));
    }
    if shape.hw() == (height, width) {
        return Ok(src.clone());
    }

    Ok(match interpolation {
        Interpolation::Nearest => resize_nearest(src, height, width),
        Interpolation::Linear => resize_linear(src, height, width),
    })
}

fn resize_nearest(src: &Tensor, height: usize, width: usize) -> Tensor {
    let shape = src.shape();
    let (src_h, src_w) = shape.hw();
    let sy = src_h as f64 / height as f64;
    let sx = src_w as f64 / width as f64;

    per_plane(src, shape.with_hw(height, width), |plane, out| {
        for (y, row) in out.chunks_exact_mut(width).enumerate() {
            let iy = ((y as f64 * sy).floor() as usize).min(src_h - 1);
            for (x, o) in row.iter_mut().enumerate() {
                let ix = ((x as f64 * sx).floor() as usize).min(src_w - 1);
                *o = plane[iy * src_w + ix];
            }
        }
    })
}

/// Source coordinate of destination index `i` under aligned corners.
fn align_corners_coord(i: usize, src_len: usize, dst_len: usize) -> (usize, usize, f32) {
    let scale = if dst_len > 1 {
        (src_len - 1) as f64 / (dst_len - 1) as f64
    } else {
        0.0
    };
    let f = i as f64 * scale;
    let i0 = (f.floor() as usize).min(src_len - 1);
    let i1 = (i0 + 1).min(src_len - 1);
    (i0, i1, (f - i0 as f64) as f32)
}

fn resize_linear(src: &Tensor, height: usize, width: usize) -> Tensor {
    let shape = src.shape();
    let (src_h, src_w) = shape.hw();
    let xs: Vec<_> = (0..width)
        .map(|x| align_corners_coord(x, src_w, width))
        .collect();

    per_plane(src, shape.with_hw(height, width), |plane, out| {
        for (y, row) in out.chunks_exact_mut(width).enumerate() {
            let (y0, y1, dy) = align_corners_coord(y, src_h, height);
            let top = &plane[y0 * src_w..(y0 + 1) * src_w];
            let bottom = &plane[y1 * src_w..(y1 + 1) * src_w];
            for (o, &(x0, x1, dx)) in row.iter_mut().zip(&xs) {
                let v0 = top[x0] * (1.0 - dx) + top[x1] * dx;
                let v1 = bottom[x0] * (1.0 - dx) + bottom[x1] * dx;
                *o = v0 * (1.0 - dy) + v1 * dy;
            }
        }
    })
}
