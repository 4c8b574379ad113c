use crate::gradient::per_plane;
use cv_core::Tensor;

/// Mirror every plane horizontally.
pub fn flip_lr(src: &Tensor) -> Tensor {
    let width = src.shape().width;
    per_plane(src, src.shape(), |plane, out| {
        for (src_row, out_row) in plane.chunks_exact(width).zip(out.chunks_exact_mut(width)) {
            for (o, &v) in out_row.iter_mut().zip(src_row.iter().rev()) {
                *o = v;
            }
        }
    })
}

/// Copy `src` into a zero canvas of `height x width`, with its top-left corner
/// at `(top, left)`. Parts falling outside the canvas are dropped.
pub fn pad_to(src: &Tensor, height: usize, width: usize, top: usize, left: usize) -> Tensor {
    let shape = src.shape();
    let out_shape = shape.with_hw(height, width);
    let copy_h = shape.height.min(height.saturating_sub(top));
    let copy_w = shape.width.min(width.saturating_sub(left));

    per_plane(src, out_shape, |plane, out| {
        for h in 0..copy_h {
            let src_row = &plane[h * shape.width..h * shape.width + copy_w];
            let start = (top + h) * width + left;
            out[start..start + copy_w].copy_from_slice(src_row);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_core::TensorShape;

    #[test]
    fn flip_lr_reverses_rows() {
        let t = Tensor::from_fn(TensorShape::new(1, 1, 2, 3), |_, _, h, w| (h * 3 + w) as f32);
        let f = flip_lr(&t);
        assert_eq!(f.as_slice(), &[2.0, 1.0, 0.0, 5.0, 4.0, 3.0]);
        assert_eq!(flip_lr(&f), t);
    }

    #[test]
    fn pad_to_places_block() {
        let ones = Tensor::ones(TensorShape::map(1, 2, 2));
        let padded = pad_to(&ones, 4, 4, 2, 1);
        for h in 0..4 {
            for w in 0..4 {
                let expected = if (2..4).contains(&h) && (1..3).contains(&w) { 1.0 } else { 0.0 };
                assert_eq!(padded.index(0, 0, h, w).unwrap(), expected);
            }
        }
    }

    #[test]
    fn pad_to_clips_overflow() {
        let ones = Tensor::ones(TensorShape::map(1, 3, 3));
        let padded = pad_to(&ones, 2, 2, 1, 1);
        assert_eq!(padded.as_slice(), &[0.0, 0.0, 0.0, 1.0]);
    }
}
