use cv_core::{Tensor, TensorShape};
use cv_imgproc::*;

fn ramp(batch: usize, channels: usize, height: usize, width: usize) -> Tensor {
    Tensor::from_fn(TensorShape::new(batch, channels, height, width), |b, c, h, w| {
        (b * 1000 + c * 100 + h * 10 + w) as f32
    })
}

#[test]
fn test_gradients_of_linear_ramp() {
    let t = ramp(2, 3, 5, 7);
    let gx = gradient_x(&t).unwrap();
    let gy = gradient_y(&t).unwrap();
    assert_eq!(gx.shape(), TensorShape::new(2, 3, 5, 6));
    assert_eq!(gy.shape(), TensorShape::new(2, 3, 4, 7));
    assert!(gx.as_slice().iter().all(|&v| v == -1.0));
    assert!(gy.as_slice().iter().all(|&v| v == -10.0));
}

#[test]
fn test_gradient_of_single_column_is_empty() {
    let t = ramp(1, 1, 4, 1);
    let gx = gradient_x(&t).unwrap();
    assert_eq!(gx.shape().width, 0);
    assert!(gx.as_slice().is_empty());
    assert!(gradient_x(&ramp(1, 1, 4, 0)).is_err());
}

#[test]
fn test_flip_commutes_with_gradient_sign() {
    let t = ramp(1, 2, 3, 6);
    let flipped_gx = gradient_x(&flip_lr(&t)).unwrap();
    let gx = gradient_x(&t).unwrap();
    // Mirroring reverses the difference direction.
    for (a, b) in flipped_gx.as_slice().iter().zip(gx.as_slice()) {
        assert_eq!(*a, -*b);
    }
}

#[test]
fn test_linear_interpolation_keeps_corners() {
    let t = ramp(1, 1, 4, 6);
    let up = interpolate(&t, 10, 16, Interpolation::Linear).unwrap();
    assert_eq!(up.shape(), TensorShape::map(1, 10, 16));
    assert!((up.index(0, 0, 0, 0).unwrap() - 0.0).abs() < 1e-5);
    assert!((up.index(0, 0, 9, 15).unwrap() - 35.0).abs() < 1e-4);
    assert!((up.index(0, 0, 0, 15).unwrap() - 5.0).abs() < 1e-4);

    let down = interpolate(&up, 4, 6, Interpolation::Linear).unwrap();
    for (a, b) in down.as_slice().iter().zip(t.as_slice()) {
        assert!((a - b).abs() < 1e-3);
    }
}

#[test]
fn test_nearest_interpolation_downsamples() {
    let t = ramp(1, 1, 4, 4);
    let down = interpolate(&t, 2, 2, Interpolation::Nearest).unwrap();
    assert_eq!(down.as_slice(), &[0.0, 2.0, 20.0, 22.0]);
}

#[test]
fn test_pad_to_clips_overflow() {
    let t = Tensor::ones(TensorShape::map(1, 3, 3));
    let padded = pad_to(&t, 4, 4, 2, 2);
    let total: f32 = padded.as_slice().iter().sum();
    assert_eq!(total, 4.0);
    assert_eq!(padded.index(0, 0, 3, 3).unwrap(), 1.0);
    assert_eq!(padded.index(0, 0, 1, 3).unwrap(), 0.0);
}

#[test]
fn test_colormaps_cover_range() {
    for cmap in [Colormap::Hsv, Colormap::Jet, Colormap::Turbo, Colormap::Gray] {
        for i in 0..=20 {
            let rgb = cmap.apply(i as f32 / 20.0);
            assert!(rgb.iter().all(|c| (-1e-3..=1.0 + 1e-3).contains(c)), "{cmap:?}");
        }
    }
    assert_eq!(Colormap::Gray.apply_u8(1.0), [255, 255, 255]);
    assert_eq!("TURBO".parse::<Colormap>().unwrap(), Colormap::Turbo);
    assert!("viridis".parse::<Colormap>().is_err());
}
