use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Named colormaps for scalar-to-RGB visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    /// Matplotlib's segmented `hsv` map: red at 0 through green and blue,
    /// back to red (with a trace of blue) at 1.
    #[default]
    Hsv,
    Jet,
    /// Polynomial fit of the Turbo colormap.
    Turbo,
    Gray,
}

impl FromStr for Colormap {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hsv" => Ok(Self::Hsv),
            "jet" => Ok(Self::Jet),
            "turbo" => Ok(Self::Turbo),
            "gray" | "grey" => Ok(Self::Gray),
            other => Err(crate::Error::invalid_parameters(format!(
                "Unknown colormap '{other}'"
            ))),
        }
    }
}

impl Colormap {
    /// Map `t` (clamped to `[0, 1]`) to linear RGB in `[0, 1]`.
    pub fn apply(&self, t: f32) -> [f32; 3] {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Colormap::Hsv => HSV_SEGMENTS.map(|channel| segmented(channel, t)),
            Colormap::Jet => [
                (1.5 - (4.0 * t - 3.0).abs()).clamp(0.0, 1.0),
                (1.5 - (4.0 * t - 2.0).abs()).clamp(0.0, 1.0),
                (1.5 - (4.0 * t - 1.0).abs()).clamp(0.0, 1.0),
            ],
            Colormap::Turbo => turbo(t),
            Colormap::Gray => [t, t, t],
        }
    }

    pub fn apply_u8(&self, t: f32) -> [u8; 3] {
        self.apply(t).map(|c| (c * 255.0).round() as u8)
    }
}

/// `(x, value)` anchors per channel, linearly interpolated in between.
type Segments = &'static [(f32, f32)];

const HSV_SEGMENTS: [Segments; 3] = [
    &[
        (0.0, 1.0),
        (0.158_730, 1.0),
        (0.174_603, 0.968_750),
        (0.333_333, 0.031_250),
        (0.349_206, 0.0),
        (0.666_667, 0.0),
        (0.682_540, 0.031_250),
        (0.841_270, 0.968_750),
        (0.857_143, 1.0),
        (1.0, 1.0),
    ],
    &[
        (0.0, 0.0),
        (0.158_730, 0.937_500),
        (0.174_603, 1.0),
        (0.507_937, 1.0),
        (0.666_667, 0.062_500),
        (0.682_540, 0.0),
        (1.0, 0.0),
    ],
    &[
        (0.0, 0.0),
        (0.333_333, 0.0),
        (0.349_206, 0.062_500),
        (0.507_937, 1.0),
        (0.841_270, 1.0),
        (0.857_143, 0.937_500),
        (1.0, 0.093_750),
    ],
];

fn segmented(anchors: Segments, t: f32) -> f32 {
    let upper = anchors.iter().position(|&(x, _)| x >= t).unwrap_or(anchors.len() - 1);
    if upper == 0 {
        return anchors[0].1;
    }
    let (x0, y0) = anchors[upper - 1];
    let (x1, y1) = anchors[upper];
    y0 + (y1 - y0) * (t - x0) / (x1 - x0)
}

fn turbo(t: f32) -> [f32; 3] {
    let r = 0.135_721_38
        + t * (4.615_392_6
            + t * (-42.660_322_58 + t * (132.131_082_34 + t * (-152.942_393_96 + t * 59.286_379_43))));
    let g = 0.091_402_61
        + t * (2.194_188_39
            + t * (4.842_966_58 + t * (-14.185_033_33 + t * (4.277_298_57 + t * 2.829_566_04))));
    let b = 0.106_673_3
        + t * (12.641_946_08
            + t * (-60.582_048_36 + t * (110.362_767_71 + t * (-89.903_109_12 + t * 27.348_249_73))));
    [r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0)]
}
