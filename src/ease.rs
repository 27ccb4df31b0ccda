/// Timing functions for host opacity transitions, named after their CSS keywords.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ease {
    Linear,
    EaseIn,
    EaseOut,
    #[default]
    EaseInOut,
}

impl Ease {
    /// Eased progress for `t`, clamped to `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseIn => cubic_bezier(0.42, 0.0, 1.0, 1.0, t),
            Self::EaseOut => cubic_bezier(0.0, 0.0, 0.58, 1.0, t),
            Self::EaseInOut => cubic_bezier(0.42, 0.0, 0.58, 1.0, t),
        }
    }
}

/// Evaluates a CSS `cubic-bezier(x1, y1, x2, y2)` at input progress `x`.
fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64, x: f64) -> f64 {
    fn coord(p1: f64, p2: f64, s: f64) -> f64 {
        let inv = 1.0 - s;
        3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
    }

    // x(s) is monotonic for x1, x2 in [0, 1]; bisection converges unconditionally.
    let (mut lo, mut hi) = (0.0, 1.0);
    let mut s = x;
    for _ in 0..40 {
        let cx = coord(x1, x2, s);
        if (cx - x).abs() < 1e-7 {
            break;
        }
        if cx < x {
            lo = s;
        } else {
            hi = s;
        }
        s = 0.5 * (lo + hi);
    }
    coord(y1, y2, s)
}
