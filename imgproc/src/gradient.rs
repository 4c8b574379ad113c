use cv_core::{Tensor, TensorShape};
use rayon::prelude::*;

/// Horizontal forward difference: `out[.., w] = src[.., w] - src[.., w + 1]`.
///
/// The result is one column narrower than the input.
pub fn gradient_x(src: &Tensor) -> crate::Result<Tensor> {
    let shape = src.shape();
    if shape.width == 0 {
        return Err(crate::Error::InvalidInput(
            "gradient_x needs a non-empty width".into(),
        ));
    }
    let out_shape = shape.with_hw(shape.height, shape.width - 1);
    let out_w = out_shape.width;

    Ok(per_plane(src, out_shape, |plane, out| {
        for (src_row, out_row) in plane
            .chunks_exact(shape.width)
            .zip(out.chunks_exact_mut(out_w))
        {
            for (w, o) in out_row.iter_mut().enumerate() {
                *o = src_row[w] - src_row[w + 1];
            }
        }
    }))
}

/// Vertical forward difference: `out[.., h, :] = src[.., h, :] - src[.., h + 1, :]`.
///
/// The result is one row shorter than the input.
pub fn gradient_y(src: &Tensor) -> crate::Result<Tensor> {
    let shape = src.shape();
    if shape.height == 0 {
        return Err(crate::Error::InvalidInput(
            "gradient_y needs a non-empty height".into(),
        ));
    }
    let out_shape = shape.with_hw(shape.height - 1, shape.width);
    let width = shape.width;

    Ok(per_plane(src, out_shape, |plane, out| {
        for (h, out_row) in out.chunks_exact_mut(width).enumerate() {
            let top = &plane[h * width..(h + 1) * width];
            let bottom = &plane[(h + 1) * width..(h + 2) * width];
            for ((o, &a), &b) in out_row.iter_mut().zip(top).zip(bottom) {
                *o = a - b;
            }
        }
    }))
}

/// Run `f(src_plane, out_plane)` for every `(b, c)` plane in parallel.
pub(crate) fn per_plane<F>(src: &Tensor, out_shape: TensorShape, f: F) -> Tensor
where
    F: Fn(&[f32], &mut [f32]) + Sync,
{
    let mut out = Tensor::zeros(out_shape);
    let in_plane = src.shape().plane_len();
    let out_plane = out_shape.plane_len();
    if in_plane == 0 || out_plane == 0 {
        return out;
    }

    out.as_mut_slice()
        .par_chunks_mut(out_plane)
        .zip(src.as_slice().par_chunks(in_plane))
        .for_each(|(dst, plane)| f(plane, dst));
    out
}
